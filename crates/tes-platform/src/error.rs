//! Service Error Types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{entity_type} not found")]
    NotFound { entity_type: String, key: String },

    #[error("Invalid slug field")]
    InvalidSlug,

    #[error("Invalid username field")]
    InvalidUsername,

    #[error("User is not an organizer")]
    NotAnOrganizer,

    #[error("You are not a participant of this event")]
    NotAParticipant,

    #[error("You have already booked your ticket")]
    AlreadyBooked,

    #[error("Booking time has been ended for this event.")]
    BookingClosed,

    #[error("{field}: {entity_type} with this {field} already exists.")]
    Duplicate { entity_type: String, field: String },

    #[error("{message}")]
    Validation { message: String },

    #[error("{message}")]
    Unauthorized { message: String },

    #[error("{message}")]
    Forbidden { message: String },

    #[error("Request was throttled.")]
    Throttled,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl ServiceError {
    pub fn not_found(entity_type: impl Into<String>, key: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            key: key.into(),
        }
    }

    pub fn duplicate(entity_type: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Duplicate {
            entity_type: entity_type.into(),
            field: field.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation { message: message.into() }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized { message: message.into() }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden { message: message.into() }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::InvalidSlug
            | Self::InvalidUsername
            | Self::NotAnOrganizer
            | Self::NotAParticipant
            | Self::AlreadyBooked
            | Self::BookingClosed
            | Self::Duplicate { .. }
            | Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::Throttled => StatusCode::TOO_MANY_REQUESTS,
            Self::Database(_) | Self::Json(_) | Self::Configuration { .. } | Self::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Converts any service error into the `{status, message, payload}` envelope.
/// Store-level failures are logged and masked with a generic message.
impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("request failed: {}", self);
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = Json(json!({
            "status": "error",
            "message": message,
            "payload": {},
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pinned_client_messages() {
        assert_eq!(ServiceError::InvalidSlug.to_string(), "Invalid slug field");
        assert_eq!(
            ServiceError::BookingClosed.to_string(),
            "Booking time has been ended for this event."
        );
        assert_eq!(
            ServiceError::AlreadyBooked.to_string(),
            "You have already booked your ticket"
        );
        assert_eq!(ServiceError::Throttled.to_string(), "Request was throttled.");
    }

    #[test]
    fn status_codes_follow_the_taxonomy() {
        assert_eq!(ServiceError::InvalidSlug.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ServiceError::AlreadyBooked.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ServiceError::BookingClosed.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ServiceError::not_found("Event", "star-meet").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServiceError::unauthorized("Token is invalid or expired").status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ServiceError::forbidden("not yours").status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(ServiceError::Throttled.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            ServiceError::internal("boom").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn duplicate_message_is_field_prefixed() {
        let err = ServiceError::duplicate("event", "title");
        assert_eq!(err.to_string(), "title: event with this title already exists.");
    }
}
