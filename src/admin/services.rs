use tracing::warn;

use crate::{
    bookings::{
        qr::{format_date, QrPayload},
        repo_types::BookingDetails,
    },
    error::ApiError,
};

/// Parse the scanned QR text. Anything that is not a complete payload is rejected.
pub fn parse_payload(raw: &str) -> Result<QrPayload, ApiError> {
    serde_json::from_str::<QrPayload>(raw).map_err(|e| {
        warn!(error = %e, "malformed qr payload");
        ApiError::validation("Invalid or malformed QR code payload.")
    })
}

/// The scanned ticket must describe the booking it points at.
pub fn cross_check(payload: &QrPayload, booking: &BookingDetails) -> Result<(), ApiError> {
    let matches = payload.user_id == booking.user_id
        && payload.speaker_id == booking.speaker_id
        && payload.date == format_date(booking.session_date)
        && payload.hour == booking.hour;
    if matches {
        Ok(())
    } else {
        warn!(booking_id = booking.id, "qr payload does not match booking");
        Err(ApiError::validation("QR code does not match the booking record."))
    }
}

/// Share of checked-in bookings, rounded to a whole percent.
pub fn percentage(total: i64, checked_in: i64) -> i64 {
    if total <= 0 {
        return 0;
    }
    (checked_in as f64 / total as f64 * 100.0).round() as i64
}
