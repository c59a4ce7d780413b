use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::config::Config;
use crate::domain::{EmailVerificationToken, IssuedEmailToken, IssuedSmsCode, SmsVerificationCode};
use crate::errors::ApiError;
use crate::repo::VerificationRepo;

pub struct VerificationService;

impl VerificationService {
    /// Issue an email verification token, store it and announce the link
    pub async fn send_email_link(
        pool: &PgPool,
        config: &Config,
        email: &str,
    ) -> Result<IssuedEmailToken, ApiError> {
        let token = generate_token();
        let expires_at = expiry(Utc::now(), config.email_token_ttl_secs);

        let repo = VerificationRepo::new(pool.clone());
        let id = repo.insert_email_token(email, &token, expires_at).await?;
        info!("Stored email verification token id={} for {}", id, email);

        let verify_url = verify_url(&config.verify_base_url, &token);
        announce_email_link(email, &verify_url);

        Ok(IssuedEmailToken {
            token,
            verify_url,
            expires_at,
        })
    }

    /// Confirm an email verification token. Returns the verified address.
    pub async fn confirm_email_token(pool: &PgPool, token: &str) -> Result<String, ApiError> {
        if !is_well_formed_token(token) {
            return Err(ApiError::validation("Malformed verification token"));
        }

        let repo = VerificationRepo::new(pool.clone());
        let record = check_email_token(repo.find_email_token(token).await?, Utc::now())?;

        if !repo.mark_email_verified(record.id).await? {
            return Err(ApiError::conflict("Email already verified"));
        }

        info!("Verified email {}", record.user_email);

        Ok(record.user_email)
    }

    /// Generate an SMS code for the phone registered to `email`
    pub async fn send_sms_code(
        pool: &PgPool,
        config: &Config,
        email: &str,
    ) -> Result<IssuedSmsCode, ApiError> {
        let repo = VerificationRepo::new(pool.clone());
        let phone = repo
            .find_contact_number(email)
            .await?
            .ok_or_else(|| ApiError::not_found("Phone number not found for the given email."))?;

        let code = generate_sms_code();
        let expires_at = expiry(Utc::now(), config.sms_code_ttl_secs);
        repo.insert_sms_code(email, &phone, &code, expires_at).await?;

        announce_sms_code(email, &phone, &code);

        Ok(IssuedSmsCode {
            phone,
            code,
            expires_at,
        })
    }

    /// Check a submitted SMS code against the latest pending one
    pub async fn confirm_sms_code(pool: &PgPool, email: &str, code: &str) -> Result<(), ApiError> {
        let repo = VerificationRepo::new(pool.clone());
        let pending = check_sms_code(repo.latest_pending_sms_code(email).await?, code, Utc::now())?;

        if !repo.consume_sms_code(pending.id).await? {
            return Err(ApiError::conflict("Verification code already used"));
        }

        info!("Verified SMS code for {}", email);

        Ok(())
    }
}

/// Decide whether a stored email token can still be confirmed at `now`
pub fn check_email_token(
    record: Option<EmailVerificationToken>,
    now: DateTime<Utc>,
) -> Result<EmailVerificationToken, ApiError> {
    let record = record.ok_or_else(|| ApiError::not_found("Invalid verification token"))?;

    if record.verified_at.is_some() {
        return Err(ApiError::conflict("Email already verified"));
    }
    if record.is_expired(now) {
        return Err(ApiError::gone("Verification token expired"));
    }

    Ok(record)
}

/// Decide whether `submitted` confirms the latest pending SMS code at `now`
pub fn check_sms_code(
    pending: Option<SmsVerificationCode>,
    submitted: &str,
    now: DateTime<Utc>,
) -> Result<SmsVerificationCode, ApiError> {
    let pending = pending.ok_or_else(|| ApiError::not_found("No pending verification code"))?;

    if pending.consumed_at.is_some() {
        return Err(ApiError::conflict("Verification code already used"));
    }
    if pending.is_expired(now) {
        return Err(ApiError::gone("Verification code expired"));
    }
    if pending.code != submitted {
        return Err(ApiError::validation("Invalid verification code"));
    }

    Ok(pending)
}

/// 32 lowercase hex characters
pub fn generate_token() -> String {
    Uuid::new_v4().simple().to_string()
}

pub fn is_well_formed_token(token: &str) -> bool {
    token.len() == 32 && token.chars().all(|c| c.is_ascii_hexdigit())
}

/// Six digits, never starting with zero
pub fn generate_sms_code() -> String {
    rand::thread_rng().gen_range(100_000..1_000_000).to_string()
}

pub fn verify_url(base: &str, token: &str) -> String {
    format!("{}/verify-email/{}", base.trim_end_matches('/'), token)
}

fn expiry(now: DateTime<Utc>, ttl_secs: u64) -> DateTime<Utc> {
    let secs = i64::try_from(ttl_secs).unwrap_or(i64::MAX).min(i64::MAX / 1000);
    now.checked_add_signed(Duration::seconds(secs))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

// Delivery goes to the log until a mail/SMS provider is wired in.
fn announce_email_link(email: &str, verify_url: &str) {
    info!(email = %email, verify_url = %verify_url, "DEV verification link");
}

fn announce_sms_code(email: &str, phone: &str, code: &str) {
    info!(email = %email, phone = %phone, code = %code, "SMS verification code generated");
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn tokens_are_32_hex_chars_and_unique() {
        let a = generate_token();
        let b = generate_token();

        assert!(is_well_formed_token(&a));
        assert!(is_well_formed_token(&b));
        assert_ne!(a, b);
    }

    #[rstest]
    #[case("")]
    #[case("abc")]
    #[case("zzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzz")]
    #[case("0123456789abcdef0123456789abcdef0")]
    fn malformed_tokens_are_rejected(#[case] token: &str) {
        assert!(!is_well_formed_token(token));
    }

    #[rstest]
    fn sms_codes_are_six_digits() {
        for _ in 0..200 {
            let code = generate_sms_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
            assert!(!code.starts_with('0'));
        }
    }

    #[rstest]
    #[case("http://localhost:80/api", "http://localhost:80/api/verify-email/abc")]
    #[case("http://localhost:80/api/", "http://localhost:80/api/verify-email/abc")]
    fn verify_url_joins_without_double_slash(#[case] base: &str, #[case] expected: &str) {
        assert_eq!(verify_url(base, "abc"), expected);
    }

    fn email_token(expires_in: i64, verified: bool) -> EmailVerificationToken {
        let now = Utc::now();
        EmailVerificationToken {
            id: 1,
            user_email: "user@example.com".into(),
            token: generate_token(),
            expires_at: now + Duration::seconds(expires_in),
            created_at: now,
            verified_at: verified.then_some(now),
        }
    }

    fn sms_code(expires_in: i64, consumed: bool) -> SmsVerificationCode {
        let now = Utc::now();
        SmsVerificationCode {
            id: 7,
            email: "user@example.com".into(),
            phone: "+61400000000".into(),
            code: "482913".into(),
            expires_at: now + Duration::seconds(expires_in),
            created_at: now,
            consumed_at: consumed.then_some(now),
        }
    }

    fn status_of<T>(result: Result<T, ApiError>) -> u16 {
        match result {
            Ok(_) => 200,
            Err(err) => err.resolve().status.as_u16(),
        }
    }

    #[rstest]
    #[case(None, 404)]
    #[case(Some(email_token(300, true)), 409)]
    #[case(Some(email_token(300, false)), 200)]
    #[case(Some(email_token(-1, false)), 410)]
    #[case(Some(email_token(-1, true)), 409)]
    fn email_token_rules(#[case] record: Option<EmailVerificationToken>, #[case] status: u16) {
        assert_eq!(status_of(check_email_token(record, Utc::now())), status);
    }

    #[rstest]
    #[case(None, "482913", 404)]
    #[case(Some(sms_code(300, false)), "482913", 200)]
    #[case(Some(sms_code(300, false)), "111111", 400)]
    #[case(Some(sms_code(-1, false)), "482913", 410)]
    #[case(Some(sms_code(-1, false)), "111111", 410)]
    #[case(Some(sms_code(300, true)), "482913", 409)]
    fn sms_code_rules(
        #[case] pending: Option<SmsVerificationCode>,
        #[case] submitted: &str,
        #[case] status: u16,
    ) {
        assert_eq!(status_of(check_sms_code(pending, submitted, Utc::now())), status);
    }

    #[rstest]
    fn expiry_boundary_counts_as_expired() {
        let record = email_token(0, false);
        let at_expiry = record.expires_at;

        let err = check_email_token(Some(record), at_expiry).unwrap_err();
        assert_eq!(err.resolve().message, "Verification token expired");
    }

    #[rstest]
    fn expiry_adds_ttl() {
        let now = Utc::now();
        assert_eq!(expiry(now, 300) - now, Duration::seconds(300));
    }
}
