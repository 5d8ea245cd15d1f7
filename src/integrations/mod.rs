//! Outbound integrations. Each has a real client and a logging stand-in used
//! when the provider is not configured.

pub mod calendar;
pub mod mail;
pub mod sms;

pub use calendar::{CalendarClient, CalendarEvent, SimulatedCalendar};
pub use mail::{LogMailer, Mailer, OutgoingMail, SmtpMailer};
pub use sms::{LogSms, SmsSender, TwilioSms};
