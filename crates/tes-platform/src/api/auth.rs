//! Account and token endpoints
//!
//! Registration (user and organizer), email activation, login, logout,
//! password change and reset, and refresh-token rotation. Everything
//! except `/token-refresh` answers in the `{status, message, payload}`
//! envelope; refresh returns the bare pair for drop-in client use.

use std::sync::Arc;
use std::sync::OnceLock;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use utoipa::ToSchema;

use crate::api::common::ApiEnvelope;
use crate::api::middleware::{Authenticated, ValidJson};
use crate::domain::{User, UserRole};
use crate::error::{Result, ServiceError};
use crate::naming::derive_username;
use crate::repository::{RefreshTokenRepository, UserRepository};
use crate::service::{
    decode_uid, encode_uid, AccountToken, AuthService, NotifyService, PasswordService,
    TokenPurpose,
};

const MAX_USERNAME_ATTEMPTS: usize = 5;

#[derive(Clone)]
pub struct AuthApiState {
    pub user_repo: Arc<UserRepository>,
    pub refresh_repo: Arc<RefreshTokenRepository>,
    pub auth_service: Arc<AuthService>,
    pub account_tokens: Arc<AccountToken>,
    pub notify: Arc<NotifyService>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    /// Username or email address.
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LogoutRequest {
    pub refresh: Option<String>,
    /// Revoke every refresh token for the account.
    #[serde(default)]
    pub all: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PasswordResetRequest {
    pub email: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PasswordResetConfirmRequest {
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TokenRefreshRequest {
    pub refresh: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TokenPairResponse {
    pub access: String,
    pub refresh: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub is_active: bool,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            role: user.role.as_str().to_string(),
            is_active: user.is_active,
        }
    }
}

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid regex"))
}

fn validate_email(email: &str) -> Result<()> {
    if email_regex().is_match(email) {
        Ok(())
    } else {
        Err(ServiceError::validation("Enter a valid email address."))
    }
}

fn require_not_blank(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(ServiceError::validation(format!("{field}: This field may not be blank.")))
    } else {
        Ok(())
    }
}

async fn register(
    state: &AuthApiState,
    request: RegisterRequest,
    role: UserRole,
) -> Result<(StatusCode, Json<ApiEnvelope>)> {
    require_not_blank("firstName", &request.first_name)?;
    require_not_blank("lastName", &request.last_name)?;
    validate_email(&request.email)?;
    PasswordService::validate(&request.password)?;

    if state.user_repo.email_exists(&request.email).await? {
        return Err(ServiceError::duplicate("user", "email"));
    }

    let mut username = None;
    for _ in 0..MAX_USERNAME_ATTEMPTS {
        let candidate = derive_username(&request.email);
        if !state.user_repo.username_exists(&candidate).await? {
            username = Some(candidate);
            break;
        }
    }
    let username =
        username.ok_or_else(|| ServiceError::internal("could not allocate a unique username"))?;

    let password_hash = PasswordService::hash(&request.password)?;
    let user = state
        .user_repo
        .insert(&User::new(
            username,
            request.email.trim().to_lowercase(),
            request.first_name.trim(),
            request.last_name.trim(),
            role,
            password_hash,
        ))
        .await?;

    let uid = encode_uid(user.id);
    let token = state.account_tokens.issue(&user, TokenPurpose::Activation);
    state.notify.send_activation_email(&user, &uid, &token).await;

    info!(user_id = user.id, role = user.role.as_str(), "account registered");
    Ok((
        StatusCode::CREATED,
        Json(ApiEnvelope::success(
            "Registration successful. Please check your email to activate your account.",
            json!({"user": UserResponse::from(&user)}),
        )),
    ))
}

/// Register a regular account. The username is derived from the email and
/// the account stays inactive until the emailed link is opened.
#[utoipa::path(
    post,
    path = "/api/auth/register-user",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created, activation email queued", body = ApiEnvelope),
        (status = 400, description = "Validation failed or email already registered", body = ApiEnvelope)
    )
)]
pub async fn register_user(
    State(state): State<AuthApiState>,
    ValidJson(request): ValidJson<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiEnvelope>)> {
    register(&state, request, UserRole::User).await
}

/// Register an organizer account.
#[utoipa::path(
    post,
    path = "/api/auth/register-organizer",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Organizer account created, activation email queued", body = ApiEnvelope),
        (status = 400, description = "Validation failed or email already registered", body = ApiEnvelope)
    )
)]
pub async fn register_organizer(
    State(state): State<AuthApiState>,
    ValidJson(request): ValidJson<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiEnvelope>)> {
    register(&state, request, UserRole::Organizer).await
}

/// Activate an account through the emailed link. The token is bound to
/// the inactive state, so a second visit fails.
#[utoipa::path(
    post,
    path = "/api/auth/activate-account/{uid}/{token}",
    tag = "auth",
    params(
        ("uid" = String, Path, description = "Opaque user reference from the email"),
        ("token" = String, Path, description = "One-time activation token")
    ),
    responses(
        (status = 200, description = "Account activated", body = ApiEnvelope),
        (status = 403, description = "Link is invalid, expired, or already used", body = ApiEnvelope)
    )
)]
pub async fn activate_account(
    State(state): State<AuthApiState>,
    Path((uid, token)): Path<(String, String)>,
) -> Result<Json<ApiEnvelope>> {
    let invalid = || ServiceError::forbidden("Activation link is invalid");

    let user_id = decode_uid(&uid).ok_or_else(invalid)?;
    let user = state.user_repo.find_by_id(user_id).await?.ok_or_else(invalid)?;
    if !state.account_tokens.verify(&user, TokenPurpose::Activation, &token) {
        return Err(invalid());
    }

    state.user_repo.activate(user.id).await?;
    info!(user_id = user.id, "account activated");
    Ok(Json(ApiEnvelope::success("Account activated successfully", json!({}))))
}

/// Log in with username or email. Issues an access/refresh pair.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = ApiEnvelope),
        (status = 400, description = "Wrong password", body = ApiEnvelope),
        (status = 403, description = "Account not activated", body = ApiEnvelope),
        (status = 404, description = "No such account", body = ApiEnvelope)
    )
)]
pub async fn login(
    State(state): State<AuthApiState>,
    ValidJson(request): ValidJson<LoginRequest>,
) -> Result<Json<ApiEnvelope>> {
    let user = state
        .user_repo
        .find_by_username_or_email(&request.username)
        .await?
        .ok_or_else(|| ServiceError::not_found("User", &request.username))?;

    if !user.is_active {
        return Err(ServiceError::forbidden("Account is not active. Please verify your email."));
    }
    if !PasswordService::verify(&request.password, &user.password_hash) {
        return Err(ServiceError::validation("Invalid login credentials"));
    }

    let tokens = state.auth_service.issue_pair(user.id)?;
    state
        .refresh_repo
        .insert(&tokens.refresh_jti, user.id, tokens.issued_at, tokens.refresh_expires_at)
        .await?;

    info!(user_id = user.id, "login");
    Ok(Json(ApiEnvelope::success(
        "Login successful",
        json!({"token": {"access": tokens.access, "refresh": tokens.refresh}}),
    )))
}

/// Revoke the presented refresh token, or all of the caller's tokens.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "auth",
    request_body = LogoutRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Logged out", body = ApiEnvelope),
        (status = 401, description = "Refresh token invalid", body = ApiEnvelope),
        (status = 403, description = "Not authenticated", body = ApiEnvelope)
    )
)]
pub async fn logout(
    State(state): State<AuthApiState>,
    Authenticated(user): Authenticated,
    ValidJson(request): ValidJson<LogoutRequest>,
) -> Result<Json<ApiEnvelope>> {
    if request.all {
        let revoked = state.refresh_repo.blacklist_all_for_user(user.id).await?;
        info!(user_id = user.id, revoked, "logout all sessions");
        return Ok(Json(ApiEnvelope::success(
            "Logged out from all sessions",
            json!({"revoked": revoked}),
        )));
    }

    let refresh = request
        .refresh
        .as_deref()
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ServiceError::validation("refresh: This field is required."))?;
    let claims = state.auth_service.verify_refresh(refresh)?;
    if claims.user_id != user.id {
        return Err(ServiceError::unauthorized("Token is invalid or expired"));
    }
    state.refresh_repo.blacklist(&claims.jti).await?;

    info!(user_id = user.id, "logout");
    Ok(Json(ApiEnvelope::success("Logged out successfully", json!({}))))
}

/// Change the password of the authenticated account. Every refresh token
/// is revoked on success.
#[utoipa::path(
    post,
    path = "/api/auth/change-password",
    tag = "auth",
    request_body = ChangePasswordRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Password changed", body = ApiEnvelope),
        (status = 400, description = "New passwords do not match or fail policy", body = ApiEnvelope),
        (status = 403, description = "Old password is wrong", body = ApiEnvelope)
    )
)]
pub async fn change_password(
    State(state): State<AuthApiState>,
    Authenticated(user): Authenticated,
    ValidJson(request): ValidJson<ChangePasswordRequest>,
) -> Result<Json<ApiEnvelope>> {
    if !PasswordService::verify(&request.old_password, &user.password_hash) {
        return Err(ServiceError::forbidden("Old password is incorrect"));
    }
    if request.new_password != request.confirm_password {
        return Err(ServiceError::validation("The two password fields didn't match."));
    }
    PasswordService::validate(&request.new_password)?;

    let password_hash = PasswordService::hash(&request.new_password)?;
    state.user_repo.update_password(user.id, &password_hash).await?;
    state.refresh_repo.blacklist_all_for_user(user.id).await?;

    info!(user_id = user.id, "password changed");
    Ok(Json(ApiEnvelope::success("Password changed successfully", json!({}))))
}

/// Request a password-reset email for an active account.
#[utoipa::path(
    post,
    path = "/api/auth/password-reset",
    tag = "auth",
    request_body = PasswordResetRequest,
    responses(
        (status = 200, description = "Reset email queued", body = ApiEnvelope),
        (status = 400, description = "No active account with this email", body = ApiEnvelope)
    )
)]
pub async fn password_reset(
    State(state): State<AuthApiState>,
    ValidJson(request): ValidJson<PasswordResetRequest>,
) -> Result<Json<ApiEnvelope>> {
    let user = state
        .user_repo
        .find_by_email(&request.email)
        .await?
        .filter(|user| user.is_active)
        .ok_or_else(|| {
            ServiceError::validation("No active account found with the given email.")
        })?;

    let uid = encode_uid(user.id);
    let token = state.account_tokens.issue(&user, TokenPurpose::PasswordReset);
    state.notify.send_password_reset_email(&user, &uid, &token).await;

    info!(user_id = user.id, "password reset requested");
    Ok(Json(ApiEnvelope::success("Password reset email has been sent.", json!({}))))
}

/// Set a new password through the emailed link. The token is bound to the
/// old password hash, so it dies the moment it is used.
#[utoipa::path(
    post,
    path = "/api/auth/password-reset-confirm/{uid}/{token}",
    tag = "auth",
    params(
        ("uid" = String, Path, description = "Opaque user reference from the email"),
        ("token" = String, Path, description = "One-time reset token")
    ),
    request_body = PasswordResetConfirmRequest,
    responses(
        (status = 200, description = "Password reset", body = ApiEnvelope),
        (status = 400, description = "New passwords do not match or fail policy", body = ApiEnvelope),
        (status = 403, description = "Link is invalid, expired, or already used", body = ApiEnvelope)
    )
)]
pub async fn password_reset_confirm(
    State(state): State<AuthApiState>,
    Path((uid, token)): Path<(String, String)>,
    ValidJson(request): ValidJson<PasswordResetConfirmRequest>,
) -> Result<Json<ApiEnvelope>> {
    let invalid = || ServiceError::forbidden("Password reset link is invalid");

    let user_id = decode_uid(&uid).ok_or_else(invalid)?;
    let user = state.user_repo.find_by_id(user_id).await?.ok_or_else(invalid)?;
    if !state.account_tokens.verify(&user, TokenPurpose::PasswordReset, &token) {
        return Err(invalid());
    }

    if request.new_password != request.confirm_password {
        return Err(ServiceError::validation("The two password fields didn't match."));
    }
    PasswordService::validate(&request.new_password)?;

    let password_hash = PasswordService::hash(&request.new_password)?;
    state.user_repo.update_password(user.id, &password_hash).await?;
    state.refresh_repo.blacklist_all_for_user(user.id).await?;

    info!(user_id = user.id, "password reset completed");
    Ok(Json(ApiEnvelope::success("Password has been reset successfully", json!({}))))
}

/// Rotate a refresh token: the presented token is blacklisted and a fresh
/// pair is issued. Unlike the rest of the auth surface this returns the
/// bare pair, not the envelope.
#[utoipa::path(
    post,
    path = "/api/auth/token-refresh",
    tag = "auth",
    request_body = TokenRefreshRequest,
    responses(
        (status = 200, description = "New token pair", body = TokenPairResponse),
        (status = 401, description = "Token invalid, expired, or revoked", body = ApiEnvelope)
    )
)]
pub async fn token_refresh(
    State(state): State<AuthApiState>,
    ValidJson(request): ValidJson<TokenRefreshRequest>,
) -> Result<Json<TokenPairResponse>> {
    let claims = state.auth_service.verify_refresh(&request.refresh)?;
    if !state.refresh_repo.is_active(&claims.jti).await? {
        return Err(ServiceError::unauthorized("Token is invalid or expired"));
    }
    let user = state
        .user_repo
        .find_by_id(claims.user_id)
        .await?
        .filter(|user| user.is_active)
        .ok_or_else(|| ServiceError::unauthorized("Token is invalid or expired"))?;

    state.refresh_repo.blacklist(&claims.jti).await?;
    let tokens = state.auth_service.issue_pair(user.id)?;
    state
        .refresh_repo
        .insert(&tokens.refresh_jti, user.id, tokens.issued_at, tokens.refresh_expires_at)
        .await?;

    Ok(Json(TokenPairResponse { access: tokens.access, refresh: tokens.refresh }))
}

pub fn auth_router(state: AuthApiState) -> Router {
    Router::new()
        .route("/register-user", post(register_user))
        .route("/register-organizer", post(register_organizer))
        .route("/activate-account/:uid/:token", post(activate_account))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/change-password", post(change_password))
        .route("/password-reset", post(password_reset))
        .route("/password-reset-confirm/:uid/:token", post(password_reset_confirm))
        .route("/token-refresh", post(token_refresh))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation() {
        assert!(validate_email("ada@example.com").is_ok());
        assert!(validate_email("ada.lovelace+tag@mail.example.co").is_ok());
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("a@b").is_err());
        assert!(validate_email("a b@example.com").is_err());

        let err = validate_email("nope").unwrap_err();
        assert_eq!(err.to_string(), "Enter a valid email address.");
    }

    #[test]
    fn blank_fields_are_named_in_the_message() {
        let err = require_not_blank("firstName", "   ").unwrap_err();
        assert_eq!(err.to_string(), "firstName: This field may not be blank.");
        assert!(require_not_blank("lastName", "Lovelace").is_ok());
    }

    #[test]
    fn user_response_hides_nothing_it_should_show() {
        let mut user =
            User::new("ada_x1y2z3", "ada@example.com", "Ada", "Lovelace", UserRole::Organizer, "h");
        user.id = 7;
        let response = UserResponse::from(&user);
        assert_eq!(response.id, 7);
        assert_eq!(response.role, "ORGANIZER");
        assert!(!response.is_active);

        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("firstName").is_some());
        assert!(json.get("passwordHash").is_none());
    }
}
