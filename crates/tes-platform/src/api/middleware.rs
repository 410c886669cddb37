//! Request guards
//!
//! `Authenticated` resolves the bearer token to a live account. The app
//! state it needs rides in request extensions, installed as a layer in
//! the server binary, so the extractor works from any router.

use std::sync::Arc;

use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::header;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};

use crate::domain::User;
use crate::error::ServiceError;
use crate::repository::UserRepository;
use crate::service::{extract_bearer_token, AuthService};

#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<AuthService>,
    pub user_repo: Arc<UserRepository>,
}

/// The caller behind a valid access token. Missing credentials are a 403,
/// a bad or stale token a 401.
pub struct Authenticated(pub User);

#[axum::async_trait]
impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(not_provided)?;
        let token = extract_bearer_token(header_value).ok_or_else(not_provided)?;

        let state = parts
            .extensions
            .get::<AppState>()
            .ok_or_else(|| ServiceError::internal("application state missing").into_response())?;

        let claims = state
            .auth_service
            .verify_access(token)
            .map_err(IntoResponse::into_response)?;

        let user = state
            .user_repo
            .find_by_id(claims.user_id)
            .await
            .map_err(IntoResponse::into_response)?
            .ok_or_else(|| ServiceError::unauthorized("User not found").into_response())?;
        if !user.is_active {
            return Err(ServiceError::unauthorized("User is inactive").into_response());
        }

        Ok(Authenticated(user))
    }
}

fn not_provided() -> Response {
    ServiceError::forbidden("Authentication credentials were not provided.").into_response()
}

/// `axum::Json` with rejections folded into the error envelope instead of
/// axum's plain-text bodies.
pub struct ValidJson<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for ValidJson<T>
where
    S: Send + Sync,
    T: serde::de::DeserializeOwned,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(ValidJson(value)),
            Err(rejection) => Err(ServiceError::validation(rejection.body_text()).into_response()),
        }
    }
}

/// Same treatment for query strings.
pub struct ValidQuery<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequestParts<S> for ValidQuery<T>
where
    S: Send + Sync,
    T: serde::de::DeserializeOwned,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match axum::extract::Query::<T>::from_request_parts(parts, state).await {
            Ok(query) => Ok(ValidQuery(query.0)),
            Err(rejection) => Err(ServiceError::validation(rejection.body_text()).into_response()),
        }
    }
}
