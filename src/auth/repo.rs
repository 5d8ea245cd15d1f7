use sqlx::{PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::{Identity, NewIdentity, Role};

const IDENTITY_COLUMNS: &str = "id, email, password_hash, full_name, phone, role, \
     otp_verified, otp_code, otp_expires_at, created_at";

impl Identity {
    /// Find an identity by (lowercased) email.
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<Identity>> {
        let identity = sqlx::query_as::<_, Identity>(&format!(
            "SELECT {IDENTITY_COLUMNS} FROM profiles WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(identity)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Identity>> {
        let identity = sqlx::query_as::<_, Identity>(&format!(
            "SELECT {IDENTITY_COLUMNS} FROM profiles WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(identity)
    }

    /// Insert an unverified identity carrying a pending verification code.
    pub async fn create_tx(
        tx: &mut Transaction<'_, Postgres>,
        new: &NewIdentity,
        password_hash: &str,
        otp_code: &str,
        otp_expires_at: OffsetDateTime,
    ) -> Result<Identity, sqlx::Error> {
        sqlx::query_as::<_, Identity>(&format!(
            r#"
            INSERT INTO profiles (email, password_hash, full_name, phone, role,
                                  otp_verified, otp_code, otp_expires_at)
            VALUES ($1, $2, $3, $4, $5, FALSE, $6, $7)
            RETURNING {IDENTITY_COLUMNS}
            "#
        ))
        .bind(&new.email)
        .bind(password_hash)
        .bind(&new.full_name)
        .bind(&new.phone)
        .bind(new.role)
        .bind(otp_code)
        .bind(otp_expires_at)
        .fetch_one(&mut **tx)
        .await
    }

    pub async fn mark_verified(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE profiles
               SET otp_verified = TRUE, otp_code = NULL, otp_expires_at = NULL
             WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Insert or refresh a verified identity with a fixed id.
    pub async fn upsert_verified(
        db: &PgPool,
        id: Uuid,
        email: &str,
        password_hash: &str,
        full_name: &str,
        role: Role,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO profiles (id, email, password_hash, full_name, phone, role, otp_verified)
            VALUES ($1, $2, $3, $4, '', $5, TRUE)
            ON CONFLICT (id) DO UPDATE
               SET role = EXCLUDED.role, otp_verified = TRUE
            "#,
        )
        .bind(id)
        .bind(email)
        .bind(password_hash)
        .bind(full_name)
        .bind(role)
        .execute(db)
        .await?;
        Ok(())
    }
}
