//! Passwords and account-link tokens
//!
//! Argon2id hashing plus the HMAC tokens embedded in activation and
//! password-reset links. Link tokens are single-use without any server
//! state: the signature binds the account fields the action flips
//! (`is_active` for activation, the password hash for resets), so acting
//! on the link invalidates it.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

use crate::domain::User;
use crate::error::{Result, ServiceError};

const SIGNATURE_LEN: usize = 32;
const CLOCK_SKEW_SECS: i64 = 60;

type HmacSha256 = Hmac<Sha256>;

pub struct PasswordService;

impl PasswordService {
    pub fn hash(password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|err| ServiceError::internal(format!("password hashing failed: {err}")))?;
        Ok(hash.to_string())
    }

    pub fn verify(password: &str, hash: &str) -> bool {
        match PasswordHash::new(hash) {
            Ok(parsed) => Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok(),
            Err(_) => false,
        }
    }

    pub fn validate(password: &str) -> Result<()> {
        if password.len() < 8 {
            return Err(ServiceError::validation(
                "This password is too short. It must contain at least 8 characters.",
            ));
        }
        if password.chars().all(|c| c.is_ascii_digit()) {
            return Err(ServiceError::validation("This password is entirely numeric."));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenPurpose {
    Activation,
    PasswordReset,
}

impl TokenPurpose {
    fn as_str(self) -> &'static str {
        match self {
            TokenPurpose::Activation => "activation",
            TokenPurpose::PasswordReset => "password-reset",
        }
    }
}

/// Issues and checks the `<timestamp>-<signature>` tokens used in account
/// links. Stateless on the server side.
pub struct AccountToken {
    secret: String,
    max_age: Duration,
}

impl AccountToken {
    pub fn new(secret: impl Into<String>, max_age_secs: i64) -> Self {
        Self { secret: secret.into(), max_age: Duration::seconds(max_age_secs) }
    }

    pub fn issue(&self, user: &User, purpose: TokenPurpose) -> String {
        self.issue_at(user, purpose, Utc::now())
    }

    pub fn verify(&self, user: &User, purpose: TokenPurpose, token: &str) -> bool {
        self.verify_at(user, purpose, token, Utc::now())
    }

    fn issue_at(&self, user: &User, purpose: TokenPurpose, at: DateTime<Utc>) -> String {
        let ts = encode_base36(at.timestamp());
        let signature = self.signature(user, purpose, &ts);
        format!("{ts}-{signature}")
    }

    fn verify_at(
        &self,
        user: &User,
        purpose: TokenPurpose,
        token: &str,
        now: DateTime<Utc>,
    ) -> bool {
        let Some((ts, signature)) = token.split_once('-') else {
            return false;
        };
        let Ok(issued) = i64::from_str_radix(ts, 36) else {
            return false;
        };
        let age = now.timestamp() - issued;
        if age > self.max_age.num_seconds() || age < -CLOCK_SKEW_SECS {
            return false;
        }
        let expected = self.signature(user, purpose, ts);
        expected.as_bytes().ct_eq(signature.as_bytes()).into()
    }

    fn signature(&self, user: &User, purpose: TokenPurpose, ts: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(
            format!(
                "{}:{}:{}:{}:{}",
                user.id,
                purpose.as_str(),
                user.is_active,
                user.password_hash,
                ts
            )
            .as_bytes(),
        );
        let digest = hex::encode(mac.finalize().into_bytes());
        digest[..SIGNATURE_LEN].to_string()
    }
}

fn encode_base36(mut value: i64) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value <= 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    out.into_iter().map(char::from).collect()
}

/// Opaque user reference for links, so raw ids never appear in URLs.
pub fn encode_uid(user_id: i64) -> String {
    URL_SAFE_NO_PAD.encode(user_id.to_string())
}

pub fn decode_uid(encoded: &str) -> Option<i64> {
    let bytes = URL_SAFE_NO_PAD.decode(encoded).ok()?;
    String::from_utf8(bytes).ok()?.parse().ok()
}
