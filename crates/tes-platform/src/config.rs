//! Application Configuration
//!
//! All settings come from `TESSERA_*` environment variables with
//! development-friendly defaults. Binaries call [`AppConfig::from_env`]
//! once at startup and pass the pieces down.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub api_port: u16,
    pub monitor_port: u16,
    pub jwt_private_key_path: String,
    pub jwt_public_key_path: String,
    pub jwt_issuer: String,
    pub access_token_ttl_secs: i64,
    pub refresh_token_ttl_secs: i64,
    /// Secret for one-time account tokens (activation / password reset).
    pub secret_key: String,
    pub onetime_token_ttl_secs: i64,
    /// Base URL the activation/reset links in emails point at.
    pub frontend_base_url: String,
    pub create_events_per_minute: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "postgres://localhost:5432/tessera".to_string(),
            api_port: 8080,
            monitor_port: 9090,
            jwt_private_key_path: "authorization/priv.pem".to_string(),
            jwt_public_key_path: "authorization/pub.pem".to_string(),
            jwt_issuer: "tessera".to_string(),
            access_token_ttl_secs: 86_400,            // 1 day
            refresh_token_ttl_secs: 4 * 7 * 86_400,   // 4 weeks
            secret_key: "tessera-dev-secret".to_string(),
            onetime_token_ttl_secs: 86_400,           // 1 day
            frontend_base_url: "http://localhost:3000".to_string(),
            create_events_per_minute: 10,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            database_url: env_or("TESSERA_DATABASE_URL", &defaults.database_url),
            api_port: env_or_parse("TESSERA_API_PORT", defaults.api_port),
            monitor_port: env_or_parse("TESSERA_MONITOR_PORT", defaults.monitor_port),
            jwt_private_key_path: env_or("TESSERA_JWT_PRIVATE_KEY_PATH", &defaults.jwt_private_key_path),
            jwt_public_key_path: env_or("TESSERA_JWT_PUBLIC_KEY_PATH", &defaults.jwt_public_key_path),
            jwt_issuer: env_or("TESSERA_JWT_ISSUER", &defaults.jwt_issuer),
            access_token_ttl_secs: env_or_parse("TESSERA_ACCESS_TOKEN_TTL_SECS", defaults.access_token_ttl_secs),
            refresh_token_ttl_secs: env_or_parse("TESSERA_REFRESH_TOKEN_TTL_SECS", defaults.refresh_token_ttl_secs),
            secret_key: env_or("TESSERA_SECRET_KEY", &defaults.secret_key),
            onetime_token_ttl_secs: env_or_parse("TESSERA_ONETIME_TOKEN_TTL_SECS", defaults.onetime_token_ttl_secs),
            frontend_base_url: env_or("TESSERA_FRONTEND_BASE_URL", &defaults.frontend_base_url),
            create_events_per_minute: env_or_parse("TESSERA_CREATE_EVENTS_PER_MINUTE", defaults.create_events_per_minute),
        }
    }

    /// True when the one-time token secret is still the insecure default.
    pub fn uses_default_secret(&self) -> bool {
        self.secret_key == Self::default().secret_key
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_or_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_development_friendly() {
        let config = AppConfig::default();
        assert_eq!(config.api_port, 8080);
        assert_eq!(config.access_token_ttl_secs, 86_400);
        assert_eq!(config.refresh_token_ttl_secs, 2_419_200);
        assert!(config.uses_default_secret());
    }
}
