use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::{
    repo_types::{Identity, NewIdentity, Role},
    services::is_valid_email,
};
use crate::error::ApiError;

pub const MIN_PASSWORD_LEN: usize = 8;

/// Request body for signup.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub phone: String,
    #[serde(default)]
    pub role: Option<String>,
}

impl SignupRequest {
    pub fn validate(self) -> Result<NewIdentity, ApiError> {
        let email = self.email.trim().to_lowercase();
        let full_name = self.full_name.trim().to_string();
        let phone = self.phone.trim().to_string();

        if email.is_empty() || self.password.is_empty() || full_name.is_empty() || phone.is_empty()
        {
            return Err(ApiError::validation(
                "Email, password, full name, and phone number are required.",
            ));
        }
        if !is_valid_email(&email) {
            return Err(ApiError::validation("Invalid email"));
        }
        if self.password.len() < MIN_PASSWORD_LEN {
            return Err(ApiError::validation("Password too short"));
        }

        let role = self
            .role
            .as_deref()
            .and_then(Role::parse_lenient)
            .unwrap_or(Role::Attendee);

        Ok(NewIdentity {
            email,
            password: self.password,
            full_name,
            phone,
            role,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupResponse {
    pub message: String,
    pub user_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub demo_otp: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    pub email: String,
    pub otp: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Response returned after a successful login.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    pub user: PublicUser,
}

/// Public part of the identity returned to the client.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub verified: bool,
}

impl From<Identity> for PublicUser {
    fn from(i: Identity) -> Self {
        Self {
            id: i.id,
            email: i.email,
            full_name: i.full_name,
            role: i.role,
            verified: i.otp_verified,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(role: Option<&str>) -> SignupRequest {
        SignupRequest {
            email: "  A@X.com ".into(),
            password: "password123".into(),
            full_name: " Ada ".into(),
            phone: "+15550100".into(),
            role: role.map(str::to_string),
        }
    }

    #[test]
    fn signup_normalizes_and_defaults_role() {
        let new = request(None).validate().unwrap();
        assert_eq!(new.email, "a@x.com");
        assert_eq!(new.full_name, "Ada");
        assert_eq!(new.role, Role::Attendee);
    }

    #[test]
    fn signup_role_parsing_is_lenient() {
        assert_eq!(request(Some("SPEAKER")).validate().unwrap().role, Role::Speaker);
        assert_eq!(request(Some("USER")).validate().unwrap().role, Role::Attendee);
        assert_eq!(request(Some("admin")).validate().unwrap().role, Role::Admin);
        assert_eq!(request(Some("wizard")).validate().unwrap().role, Role::Attendee);
    }

    #[test]
    fn signup_rejects_missing_fields_and_short_password() {
        let mut r = request(None);
        r.phone = "  ".into();
        assert!(matches!(r.validate(), Err(ApiError::Validation(_))));

        let mut r = request(None);
        r.password = "short".into();
        let err = r.validate().unwrap_err();
        assert_eq!(err.to_string(), "Password too short");

        let mut r = request(None);
        r.email = "not-an-email".into();
        assert_eq!(r.validate().unwrap_err().to_string(), "Invalid email");
    }

    #[test]
    fn signup_request_reads_camel_case() {
        let body = r#"{"email":"a@x.com","password":"password123","fullName":"A","phone":"1"}"#;
        let parsed: SignupRequest = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.full_name, "A");
        assert!(parsed.role.is_none());
    }

    #[test]
    fn signup_response_omits_demo_otp_when_absent() {
        let res = SignupResponse {
            message: "ok".into(),
            user_id: Uuid::new_v4(),
            demo_otp: None,
        };
        let json = serde_json::to_value(&res).unwrap();
        assert!(json.get("demoOtp").is_none());
        assert!(json.get("userId").is_some());
    }
}
