use std::io::Cursor;

use anyhow::Context;
use base64ct::{Base64, Encoding};
use image::{ImageFormat, Luma};
use qrcode::QrCode;
use serde::{Deserialize, Serialize};
use time::{format_description::FormatItem, macros::format_description, Date};
use uuid::Uuid;

const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");
const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Ticket content encoded into the QR image and scanned at check-in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrPayload {
    pub booking_id: i64,
    pub user_id: Uuid,
    pub speaker_id: Uuid,
    pub date: String,   // YYYY-MM-DD
    pub hour: i16,
}

impl QrPayload {
    pub fn new(booking_id: i64, user_id: Uuid, speaker_id: Uuid, date: Date, hour: i16) -> Self {
        Self {
            booking_id,
            user_id,
            speaker_id,
            date: format_date(date),
            hour,
        }
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        serde_json::to_string(self).context("serialize qr payload")
    }
}

pub fn format_date(date: Date) -> String {
    date.format(DATE_FORMAT)
        .unwrap_or_else(|_| date.to_string())
}

/// Render `content` as a QR code PNG.
pub fn render_png(content: &str) -> anyhow::Result<Vec<u8>> {
    let code = QrCode::new(content.as_bytes()).context("encode qr")?;
    let img = code
        .render::<Luma<u8>>()
        .min_dimensions(300, 300)
        .build();

    let mut out = Vec::new();
    img.write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
        .context("write qr png")?;
    Ok(out)
}

pub fn png_data_url(png: &[u8]) -> String {
    format!("{}{}", PNG_DATA_URL_PREFIX, Base64::encode_string(png))
}

/// Inverse of [`png_data_url`]; `None` for anything that is not a base64 PNG data URL.
pub fn png_from_data_url(url: &str) -> Option<Vec<u8>> {
    let b64 = url.strip_prefix(PNG_DATA_URL_PREFIX)?;
    Base64::decode_vec(b64).ok()
}

pub fn render_data_url(content: &str) -> anyhow::Result<String> {
    render_png(content).map(|png| png_data_url(&png))
}
