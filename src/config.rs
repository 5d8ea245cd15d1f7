use std::str::FromStr;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// How incoming requests are authenticated. Chosen once at boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// Bearer JWT plus role checks.
    Token,
    /// No token check; a fixed demo identity is picked from the request path.
    Demo,
}

impl FromStr for AuthMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "token" | "jwt" => Ok(Self::Token),
            "demo" => Ok(Self::Demo),
            other => anyhow::bail!("unknown AUTH_MODE `{other}` (expected `token` or `demo`)"),
        }
    }
}

/// How one-time verification codes are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OtpMode {
    /// Any well-formed 6-digit code verifies the account.
    Demo,
    /// The code must match the one issued at signup and be unexpired.
    Strict,
}

impl FromStr for OtpMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "demo" => Ok(Self::Demo),
            "strict" => Ok(Self::Strict),
            other => anyhow::bail!("unknown OTP_MODE `{other}` (expected `demo` or `strict`)"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmsConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub jwt: JwtConfig,
    pub auth_mode: AuthMode,
    pub otp_mode: OtpMode,
    pub otp_ttl_minutes: i64,
    pub storage: Option<StorageConfig>,
    pub sms: Option<SmsConfig>,
    pub smtp: Option<SmtpConfig>,
    pub calendar_enabled: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "speaker-booking".into()),
            audience: std::env::var("JWT_AUDIENCE")
                .unwrap_or_else(|_| "speaker-booking-users".into()),
            ttl_minutes: parse_or("JWT_TTL_MINUTES", 60 * 24)?,
        };

        let storage = match std::env::var("MINIO_ENDPOINT") {
            Ok(endpoint) => Some(StorageConfig {
                endpoint,
                bucket: std::env::var("MINIO_BUCKET").context("MINIO_BUCKET must be set")?,
                access_key: std::env::var("MINIO_ACCESS_KEY")
                    .context("MINIO_ACCESS_KEY must be set")?,
                secret_key: std::env::var("MINIO_SECRET_KEY")
                    .context("MINIO_SECRET_KEY must be set")?,
                region: std::env::var("MINIO_REGION").unwrap_or_else(|_| "us-east-1".into()),
            }),
            Err(_) => None,
        };

        let sms = match (
            std::env::var("TWILIO_ACCOUNT_SID"),
            std::env::var("TWILIO_AUTH_TOKEN"),
            std::env::var("TWILIO_PHONE_NUMBER"),
        ) {
            (Ok(account_sid), Ok(auth_token), Ok(from_number)) => Some(SmsConfig {
                account_sid,
                auth_token,
                from_number,
            }),
            _ => None,
        };

        let smtp = match std::env::var("SMTP_HOST") {
            Ok(host) => Some(SmtpConfig {
                host,
                port: parse_or("SMTP_PORT", 587)?,
                username: std::env::var("SMTP_USERNAME").unwrap_or_default(),
                password: std::env::var("SMTP_PASSWORD").unwrap_or_default(),
                from: std::env::var("MAIL_FROM")
                    .unwrap_or_else(|_| "Speaker Booking <noreply@speaker-booking.local>".into()),
            }),
            Err(_) => None,
        };

        Ok(Self {
            database_url,
            db_max_connections: parse_or("DB_MAX_CONNECTIONS", 10)?,
            jwt,
            auth_mode: parse_or("AUTH_MODE", AuthMode::Token)?,
            otp_mode: parse_or("OTP_MODE", OtpMode::Demo)?,
            otp_ttl_minutes: parse_or("OTP_TTL_MINUTES", 10)?,
            storage,
            sms,
            smtp,
            calendar_enabled: parse_or("CALENDAR_ENABLED", true)?,
        })
    }
}

fn parse_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("invalid {key} value `{raw}`: {e}")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_mode_parses_known_values() {
        assert_eq!("demo".parse::<AuthMode>().unwrap(), AuthMode::Demo);
        assert_eq!(" Token ".parse::<AuthMode>().unwrap(), AuthMode::Token);
        assert_eq!("jwt".parse::<AuthMode>().unwrap(), AuthMode::Token);
        assert!("open".parse::<AuthMode>().is_err());
    }

    #[test]
    fn otp_mode_parses_known_values() {
        assert_eq!("STRICT".parse::<OtpMode>().unwrap(), OtpMode::Strict);
        assert_eq!("demo".parse::<OtpMode>().unwrap(), OtpMode::Demo);
        let err = "sometimes".parse::<OtpMode>().unwrap_err();
        assert!(err.to_string().contains("OTP_MODE"));
    }

    #[test]
    fn parse_or_falls_back_when_unset() {
        let v: u32 = parse_or("SPEAKER_BOOKING_SURELY_UNSET_KEY", 42).unwrap();
        assert_eq!(v, 42);
    }
}
