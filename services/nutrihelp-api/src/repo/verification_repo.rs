use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::info;

use crate::domain::{EmailVerificationToken, SmsVerificationCode};

pub struct VerificationRepo {
    pool: PgPool,
}

impl VerificationRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Initialize verification tables
    pub async fn init_tables(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS email_verification_tokens (
                id BIGSERIAL PRIMARY KEY,
                user_email TEXT NOT NULL,
                token TEXT NOT NULL UNIQUE,
                expires_at TIMESTAMPTZ NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                verified_at TIMESTAMPTZ
            )"
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS sms_verification_codes (
                id BIGSERIAL PRIMARY KEY,
                email TEXT NOT NULL,
                phone TEXT NOT NULL,
                code TEXT NOT NULL,
                expires_at TIMESTAMPTZ NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                consumed_at TIMESTAMPTZ
            )"
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_sms_codes_email
             ON sms_verification_codes(email, created_at DESC)"
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn insert_email_token(
        &self,
        email: &str,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<i64, sqlx::Error> {
        let row = sqlx::query(
            "INSERT INTO email_verification_tokens (user_email, token, expires_at)
             VALUES ($1, $2, $3)
             RETURNING id"
        )
        .bind(email)
        .bind(token)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get("id"))
    }

    pub async fn find_email_token(
        &self,
        token: &str,
    ) -> Result<Option<EmailVerificationToken>, sqlx::Error> {
        let row = sqlx::query(
            "SELECT id, user_email, token, expires_at, created_at, verified_at
             FROM email_verification_tokens
             WHERE token = $1"
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| EmailVerificationToken {
            id: r.get("id"),
            user_email: r.get("user_email"),
            token: r.get("token"),
            expires_at: r.get("expires_at"),
            created_at: r.get("created_at"),
            verified_at: r.get("verified_at"),
        }))
    }

    /// Mark a token verified; false if it was already used
    pub async fn mark_email_verified(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE email_verification_tokens
             SET verified_at = now()
             WHERE id = $1 AND verified_at IS NULL"
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Look up the phone number registered for an email
    pub async fn find_contact_number(&self, email: &str) -> Result<Option<String>, sqlx::Error> {
        let row = sqlx::query(
            "SELECT contact_number
             FROM users
             WHERE email = $1
             LIMIT 1"
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row
            .and_then(|r| r.get::<Option<String>, _>("contact_number"))
            .filter(|phone| !phone.trim().is_empty()))
    }

    pub async fn insert_sms_code(
        &self,
        email: &str,
        phone: &str,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<i64, sqlx::Error> {
        let row = sqlx::query(
            "INSERT INTO sms_verification_codes (email, phone, code, expires_at)
             VALUES ($1, $2, $3, $4)
             RETURNING id"
        )
        .bind(email)
        .bind(phone)
        .bind(code)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get("id"))
    }

    /// Most recent unconsumed code for an email
    pub async fn latest_pending_sms_code(
        &self,
        email: &str,
    ) -> Result<Option<SmsVerificationCode>, sqlx::Error> {
        let row = sqlx::query(
            "SELECT id, email, phone, code, expires_at, created_at, consumed_at
             FROM sms_verification_codes
             WHERE email = $1 AND consumed_at IS NULL
             ORDER BY created_at DESC
             LIMIT 1"
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(row_to_sms_code))
    }

    pub async fn consume_sms_code(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE sms_verification_codes
             SET consumed_at = now()
             WHERE id = $1 AND consumed_at IS NULL"
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete expired, unused tokens and codes. Returns rows removed.
    pub async fn purge_expired(&self) -> Result<u64, sqlx::Error> {
        let tokens = sqlx::query(
            "DELETE FROM email_verification_tokens
             WHERE expires_at < now() AND verified_at IS NULL"
        )
        .execute(&self.pool)
        .await?
        .rows_affected();

        let codes = sqlx::query(
            "DELETE FROM sms_verification_codes
             WHERE expires_at < now() AND consumed_at IS NULL"
        )
        .execute(&self.pool)
        .await?
        .rows_affected();

        info!("Purged {} expired email tokens and {} SMS codes", tokens, codes);

        Ok(tokens + codes)
    }
}

fn row_to_sms_code(row: &PgRow) -> SmsVerificationCode {
    SmsVerificationCode {
        id: row.get("id"),
        email: row.get("email"),
        phone: row.get("phone"),
        code: row.get("code"),
        expires_at: row.get("expires_at"),
        created_at: row.get("created_at"),
        consumed_at: row.get("consumed_at"),
    }
}
