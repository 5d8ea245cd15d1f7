use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Account role. Stored as the `user_role` Postgres enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Attendee,
    Speaker,
    Admin,
}

impl Role {
    /// Lenient parse used at signup; accepts the legacy `USER` spelling for attendees.
    pub fn parse_lenient(raw: &str) -> Option<Role> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "attendee" | "user" => Some(Role::Attendee),
            "speaker" => Some(Role::Speaker),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Attendee => "attendee",
            Role::Speaker => "speaker",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Account record in the `profiles` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Identity {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,        // argon2 PHC string
    pub full_name: String,
    pub phone: String,
    pub role: Role,
    pub otp_verified: bool,
    #[serde(skip_serializing)]
    pub otp_code: Option<String>,
    #[serde(skip_serializing)]
    pub otp_expires_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}

/// Validated signup input, ready to insert.
#[derive(Debug, Clone)]
pub struct NewIdentity {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub phone: String,
    pub role: Role,
}
