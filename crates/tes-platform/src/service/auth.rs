//! Token Issuer
//!
//! RS256 access/refresh pairs. The signing keypair is loaded from PEM
//! files at startup and generated on first run, so a fresh deployment
//! comes up without any manual key ceremony. Refresh tokens carry a jti
//! that the blacklist keys on; access tokens are stateless.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, ServiceError};

pub const TOKEN_TYPE_ACCESS: &str = "access";
pub const TOKEN_TYPE_REFRESH: &str = "refresh";

const RSA_KEY_BITS: usize = 2048;

/// Key material and token policy for the issuer.
#[derive(Clone)]
pub struct AuthConfig {
    pub rsa_private_key: String,
    pub rsa_public_key: String,
    pub issuer: String,
    pub access_token_ttl_secs: i64,
    pub refresh_token_ttl_secs: i64,
}

impl AuthConfig {
    /// Load the PEM keypair from the given paths, generating and
    /// persisting a fresh 2048-bit pair when the private key is missing.
    /// With no paths the pair is generated in memory only.
    pub fn load_or_generate_rsa_keys(
        private_key_path: Option<&Path>,
        public_key_path: Option<&Path>,
    ) -> Result<Self> {
        let (private_pem, public_pem) = match private_key_path {
            Some(private_path) if private_path.exists() => {
                let private_pem = fs::read_to_string(private_path).map_err(|err| {
                    ServiceError::configuration(format!(
                        "failed to read private key {}: {err}",
                        private_path.display()
                    ))
                })?;
                let public_pem = match public_key_path {
                    Some(public_path) if public_path.exists() => fs::read_to_string(public_path)
                        .map_err(|err| {
                            ServiceError::configuration(format!(
                                "failed to read public key {}: {err}",
                                public_path.display()
                            ))
                        })?,
                    other => {
                        // Recover the public half from the private key and
                        // persist it if we were given a destination.
                        let private_key = RsaPrivateKey::from_pkcs8_pem(&private_pem)
                            .map_err(|err| {
                                ServiceError::configuration(format!("invalid private key PEM: {err}"))
                            })?;
                        let public_pem = encode_public_pem(&RsaPublicKey::from(&private_key))?;
                        if let Some(public_path) = other {
                            write_pem(public_path, &public_pem)?;
                        }
                        public_pem
                    }
                };
                (private_pem, public_pem)
            }
            _ => {
                let (private_pem, public_pem) = generate_keypair()?;
                if let Some(private_path) = private_key_path {
                    write_pem(private_path, &private_pem)?;
                }
                if let Some(public_path) = public_key_path {
                    write_pem(public_path, &public_pem)?;
                }
                (private_pem, public_pem)
            }
        };

        Ok(Self {
            rsa_private_key: private_pem,
            rsa_public_key: public_pem,
            issuer: "tessera".to_string(),
            access_token_ttl_secs: 24 * 60 * 60,
            refresh_token_ttl_secs: 28 * 24 * 60 * 60,
        })
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    pub fn with_access_ttl_secs(mut self, secs: i64) -> Self {
        self.access_token_ttl_secs = secs;
        self
    }

    pub fn with_refresh_ttl_secs(mut self, secs: i64) -> Self {
        self.refresh_token_ttl_secs = secs;
        self
    }
}

fn generate_keypair() -> Result<(String, String)> {
    let mut rng = rand::thread_rng();
    let private_key = RsaPrivateKey::new(&mut rng, RSA_KEY_BITS)
        .map_err(|err| ServiceError::configuration(format!("RSA key generation failed: {err}")))?;
    let private_pem = private_key
        .to_pkcs8_pem(LineEnding::LF)
        .map_err(|err| ServiceError::configuration(format!("failed to encode private key: {err}")))?
        .to_string();
    let public_pem = encode_public_pem(&RsaPublicKey::from(&private_key))?;
    Ok((private_pem, public_pem))
}

fn encode_public_pem(public_key: &RsaPublicKey) -> Result<String> {
    public_key
        .to_public_key_pem(LineEnding::LF)
        .map_err(|err| ServiceError::configuration(format!("failed to encode public key: {err}")))
}

fn write_pem(path: &Path, pem: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| {
            ServiceError::configuration(format!("failed to create {}: {err}", parent.display()))
        })?;
    }
    fs::write(path, pem).map_err(|err| {
        ServiceError::configuration(format!("failed to write {}: {err}", path.display()))
    })
}

/// Claims carried by both token types. `token_type` keeps an access token
/// from ever passing as a refresh token and vice versa.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub user_id: i64,
    pub jti: String,
    pub token_type: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
}

/// A freshly minted pair plus the bookkeeping the blacklist needs.
#[derive(Debug, Clone)]
pub struct IssuedTokens {
    pub access: String,
    pub refresh: String,
    pub refresh_jti: String,
    pub issued_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
}

pub struct AuthService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl AuthService {
    pub fn new(config: &AuthConfig) -> Result<Self> {
        let encoding_key = EncodingKey::from_rsa_pem(config.rsa_private_key.as_bytes())
            .map_err(|err| ServiceError::configuration(format!("invalid private key PEM: {err}")))?;
        let decoding_key = DecodingKey::from_rsa_pem(config.rsa_public_key.as_bytes())
            .map_err(|err| ServiceError::configuration(format!("invalid public key PEM: {err}")))?;
        Ok(Self {
            encoding_key,
            decoding_key,
            issuer: config.issuer.clone(),
            access_ttl: Duration::seconds(config.access_token_ttl_secs),
            refresh_ttl: Duration::seconds(config.refresh_token_ttl_secs),
        })
    }

    /// Mint an access/refresh pair for the user. Each token gets its own
    /// jti; the refresh jti is what the caller records for revocation.
    pub fn issue_pair(&self, user_id: i64) -> Result<IssuedTokens> {
        let issued_at = Utc::now();
        let refresh_jti = Uuid::new_v4().to_string();
        let refresh_expires_at = issued_at + self.refresh_ttl;

        let access = self.sign(TokenClaims {
            user_id,
            jti: Uuid::new_v4().to_string(),
            token_type: TOKEN_TYPE_ACCESS.to_string(),
            iat: issued_at.timestamp(),
            exp: (issued_at + self.access_ttl).timestamp(),
            iss: self.issuer.clone(),
        })?;
        let refresh = self.sign(TokenClaims {
            user_id,
            jti: refresh_jti.clone(),
            token_type: TOKEN_TYPE_REFRESH.to_string(),
            iat: issued_at.timestamp(),
            exp: refresh_expires_at.timestamp(),
            iss: self.issuer.clone(),
        })?;

        Ok(IssuedTokens { access, refresh, refresh_jti, issued_at, refresh_expires_at })
    }

    pub fn verify_access(&self, token: &str) -> Result<TokenClaims> {
        let claims = self
            .decode(token)
            .map_err(|_| ServiceError::unauthorized("Given token not valid for any token type"))?;
        if claims.token_type != TOKEN_TYPE_ACCESS {
            return Err(ServiceError::unauthorized("Given token not valid for any token type"));
        }
        Ok(claims)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<TokenClaims> {
        let claims = self
            .decode(token)
            .map_err(|_| ServiceError::unauthorized("Token is invalid or expired"))?;
        if claims.token_type != TOKEN_TYPE_REFRESH {
            return Err(ServiceError::unauthorized("Token is invalid or expired"));
        }
        Ok(claims)
    }

    fn sign(&self, claims: TokenClaims) -> Result<String> {
        encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)
            .map_err(|err| ServiceError::internal(format!("token signing failed: {err}")))
    }

    fn decode(&self, token: &str) -> std::result::Result<TokenClaims, jsonwebtoken::errors::Error> {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[&self.issuer]);
        Ok(decode::<TokenClaims>(token, &self.decoding_key, &validation)?.claims)
    }
}

/// Pull the token out of an `Authorization: Bearer <token>` header value.
pub fn extract_bearer_token(header_value: &str) -> Option<&str> {
    header_value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> AuthConfig {
        AuthConfig {
            rsa_private_key: include_str!("../../testdata/jwt_test_key.pem").to_string(),
            rsa_public_key: include_str!("../../testdata/jwt_test_key.pub.pem").to_string(),
            issuer: "tessera".to_string(),
            access_token_ttl_secs: 3600,
            refresh_token_ttl_secs: 7200,
        }
    }

    #[test]
    fn issues_verifiable_pair() {
        let service = AuthService::new(&test_config()).unwrap();
        let tokens = service.issue_pair(42).unwrap();

        let access = service.verify_access(&tokens.access).unwrap();
        assert_eq!(access.user_id, 42);
        assert_eq!(access.token_type, TOKEN_TYPE_ACCESS);
        assert_eq!(access.iss, "tessera");

        let refresh = service.verify_refresh(&tokens.refresh).unwrap();
        assert_eq!(refresh.user_id, 42);
        assert_eq!(refresh.jti, tokens.refresh_jti);
    }

    #[test]
    fn token_types_do_not_cross() {
        let service = AuthService::new(&test_config()).unwrap();
        let tokens = service.issue_pair(7).unwrap();

        let err = service.verify_access(&tokens.refresh).unwrap_err();
        assert_eq!(err.to_string(), "Given token not valid for any token type");

        let err = service.verify_refresh(&tokens.access).unwrap_err();
        assert_eq!(err.to_string(), "Token is invalid or expired");
    }

    #[test]
    fn tampered_token_is_rejected() {
        let service = AuthService::new(&test_config()).unwrap();
        let tokens = service.issue_pair(7).unwrap();

        let mut tampered = tokens.access.into_bytes();
        let mid = tampered.len() / 2;
        tampered[mid] = if tampered[mid] == b'a' { b'b' } else { b'a' };
        let tampered = String::from_utf8(tampered).unwrap();

        assert!(service.verify_access(&tampered).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        // Leeway in validation is 60s, so push exp well past it.
        let config = test_config().with_access_ttl_secs(-120);
        let service = AuthService::new(&config).unwrap();
        let tokens = service.issue_pair(7).unwrap();
        assert!(service.verify_access(&tokens.access).is_err());
    }

    #[test]
    fn foreign_issuer_is_rejected() {
        let service = AuthService::new(&test_config()).unwrap();
        let other = AuthService::new(&test_config().with_issuer("someone-else")).unwrap();
        let tokens = other.issue_pair(7).unwrap();
        assert!(service.verify_access(&tokens.access).is_err());
    }

    #[test]
    fn generates_and_reloads_keypair() {
        let dir = tempfile::tempdir().unwrap();
        let private_path = dir.path().join("keys/priv.pem");
        let public_path = dir.path().join("keys/pub.pem");

        let first =
            AuthConfig::load_or_generate_rsa_keys(Some(&private_path), Some(&public_path)).unwrap();
        assert!(private_path.exists());
        assert!(public_path.exists());

        let second =
            AuthConfig::load_or_generate_rsa_keys(Some(&private_path), Some(&public_path)).unwrap();
        assert_eq!(first.rsa_private_key, second.rsa_private_key);
        assert_eq!(first.rsa_public_key, second.rsa_public_key);

        // The generated pair must actually sign and verify.
        let service = AuthService::new(&second).unwrap();
        let tokens = service.issue_pair(1).unwrap();
        assert!(service.verify_access(&tokens.access).is_ok());
    }

    #[test]
    fn bearer_extraction() {
        assert_eq!(extract_bearer_token("Bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(extract_bearer_token("Bearer "), None);
        assert_eq!(extract_bearer_token("Token abc"), None);
        assert_eq!(extract_bearer_token("abc"), None);
    }
}
