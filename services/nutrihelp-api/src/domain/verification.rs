use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailVerificationToken {
    pub id: i64,
    pub user_email: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub verified_at: Option<DateTime<Utc>>,
}

impl EmailVerificationToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmsVerificationCode {
    pub id: i64,
    pub email: String,
    pub phone: String,
    pub code: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub consumed_at: Option<DateTime<Utc>>,
}

impl SmsVerificationCode {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Result of issuing an email verification link.
#[derive(Debug, Clone)]
pub struct IssuedEmailToken {
    pub token: String,
    pub verify_url: String,
    pub expires_at: DateTime<Utc>,
}

/// Result of issuing an SMS code.
#[derive(Debug, Clone)]
pub struct IssuedSmsCode {
    pub phone: String,
    pub code: String,
    pub expires_at: DateTime<Utc>,
}
