pub mod auth;
pub mod checks;
pub mod notify;
pub mod password;

pub use auth::{
    extract_bearer_token, AuthConfig, AuthService, IssuedTokens, TokenClaims, TOKEN_TYPE_ACCESS,
    TOKEN_TYPE_REFRESH,
};
pub use notify::NotifyService;
pub use password::{decode_uid, encode_uid, AccountToken, PasswordService, TokenPurpose};
