pub mod admin;
pub mod app;
pub mod auth;
pub mod bookings;
pub mod config;
pub mod error;
pub mod integrations;
pub mod speakers;
pub mod state;
pub mod storage;
