use lazy_static::lazy_static;
use rand::Rng;
use regex::Regex;
use time::OffsetDateTime;

use crate::{auth::repo_types::Identity, config::OtpMode, error::ApiError};

pub const OTP_LENGTH: usize = 6;

/// Code handed back to clients when verification runs under the demo policy.
pub const DEMO_OTP_HINT: &str = "123456";

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn is_well_formed_otp(code: &str) -> bool {
    lazy_static! {
        static ref OTP_RE: Regex = Regex::new(r"^\d{6}$").unwrap();
    }
    OTP_RE.is_match(code)
}

pub fn generate_otp() -> String {
    let mut rng = rand::thread_rng();
    (0..OTP_LENGTH)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

/// Decide whether `submitted` verifies `identity` under the given policy.
pub fn check_otp(
    mode: OtpMode,
    identity: &Identity,
    submitted: &str,
    now: OffsetDateTime,
) -> Result<(), ApiError> {
    if identity.otp_verified {
        return Err(ApiError::validation("Account already verified."));
    }
    if !is_well_formed_otp(submitted) {
        return Err(ApiError::validation("Invalid OTP format. Must be 6 digits."));
    }
    match mode {
        OtpMode::Demo => Ok(()),
        OtpMode::Strict => {
            let (Some(code), Some(expires_at)) = (&identity.otp_code, identity.otp_expires_at)
            else {
                return Err(ApiError::validation("No verification code is pending."));
            };
            if now > expires_at {
                return Err(ApiError::validation("Verification code has expired."));
            }
            if code != submitted {
                return Err(ApiError::validation("Invalid OTP."));
            }
            Ok(())
        }
    }
}
