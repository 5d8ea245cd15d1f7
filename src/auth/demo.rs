use tracing::info;
use uuid::Uuid;

use super::{password::hash_password, repo_types::{Identity, Role}};
use crate::speakers::repo_types::SpeakerProfile;

pub const DEMO_ATTENDEE_ID: Uuid = Uuid::from_u128(0x6d0c_0001_0000_4000_8000_000000000001);
pub const DEMO_SPEAKER_ID: Uuid = Uuid::from_u128(0x6d0c_0002_0000_4000_8000_000000000002);
pub const DEMO_ADMIN_ID: Uuid = Uuid::from_u128(0x6d0c_0003_0000_4000_8000_000000000003);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoIdentity {
    pub id: Uuid,
    pub email: &'static str,
    pub full_name: &'static str,
    pub role: Role,
}

pub const DEMO_ATTENDEE: DemoIdentity = DemoIdentity {
    id: DEMO_ATTENDEE_ID,
    email: "demo@example.com",
    full_name: "Demo User",
    role: Role::Attendee,
};

pub const DEMO_SPEAKER: DemoIdentity = DemoIdentity {
    id: DEMO_SPEAKER_ID,
    email: "demo-speaker@example.com",
    full_name: "Demo Speaker",
    role: Role::Speaker,
};

pub const DEMO_ADMIN: DemoIdentity = DemoIdentity {
    id: DEMO_ADMIN_ID,
    email: "demo-admin@example.com",
    full_name: "Demo Admin",
    role: Role::Admin,
};

/// Pick the demo identity that makes sense for a request path.
pub fn identity_for_path(path: &str) -> &'static DemoIdentity {
    if path.contains("/speakers/me")
        || path.contains("/speakers/slots")
        || path.contains("/bookings/speaker")
    {
        &DEMO_SPEAKER
    } else if path.contains("/admin") {
        &DEMO_ADMIN
    } else {
        &DEMO_ATTENDEE
    }
}

/// Make sure the fixed demo identities exist so demo requests satisfy foreign keys.
pub async fn ensure_demo_identities(db: &sqlx::PgPool) -> anyhow::Result<()> {
    // Demo accounts never log in with a password; the hash only fills the column.
    let hash = hash_password(&Uuid::new_v4().to_string())?;
    for demo in [&DEMO_ATTENDEE, &DEMO_SPEAKER, &DEMO_ADMIN] {
        Identity::upsert_verified(db, demo.id, demo.email, &hash, demo.full_name, demo.role)
            .await?;
    }
    SpeakerProfile::ensure_exists(db, DEMO_SPEAKER_ID).await?;
    info!("demo identities ready");
    Ok(())
}
