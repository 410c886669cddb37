//! Feedback endpoints
//!
//! The board is ticket-gated in both directions: only participants may
//! read or write feedback for an event.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use utoipa::ToSchema;

use crate::api::common::ApiEnvelope;
use crate::api::middleware::{Authenticated, ValidJson};
use crate::domain::Feedback;
use crate::error::{Result, ServiceError};
use crate::naming::slugify;
use crate::repository::{EventRepository, FeedbackRepository, TicketRepository};

#[derive(Clone)]
pub struct FeedbacksState {
    pub event_repo: Arc<EventRepository>,
    pub ticket_repo: Arc<TicketRepository>,
    pub feedback_repo: Arc<FeedbackRepository>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateFeedbackRequest {
    pub text: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackResponse {
    pub id: i64,
    pub user_id: i64,
    pub event_id: i64,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Feedback> for FeedbackResponse {
    fn from(feedback: &Feedback) -> Self {
        Self {
            id: feedback.id,
            user_id: feedback.user_id,
            event_id: feedback.event_id,
            text: feedback.text.clone(),
            created_at: feedback.created_at,
        }
    }
}

/// Resolve the slug and enforce the ticket gate shared by both handlers.
async fn participant_event(
    state: &FeedbacksState,
    user_id: i64,
    slug: &str,
) -> Result<crate::domain::Event> {
    if slugify(slug) != slug {
        return Err(ServiceError::InvalidSlug);
    }
    let event = state.event_repo.find_by_slug(slug).await?.ok_or(ServiceError::InvalidSlug)?;
    if !state.ticket_repo.exists(user_id, event.id).await? {
        return Err(ServiceError::NotAParticipant);
    }
    Ok(event)
}

/// Feedback for an event, newest first. Participants only.
#[utoipa::path(
    get,
    path = "/api/events/{slug}/feedbacks/",
    tag = "feedbacks",
    params(("slug" = String, Path, description = "Event slug")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Feedback entries", body = [FeedbackResponse]),
        (status = 400, description = "Invalid slug or caller has no ticket", body = ApiEnvelope),
        (status = 403, description = "Not authenticated", body = ApiEnvelope)
    )
)]
pub async fn list_feedbacks(
    State(state): State<FeedbacksState>,
    Authenticated(user): Authenticated,
    Path(slug): Path<String>,
) -> Result<Json<Vec<FeedbackResponse>>> {
    let event = participant_event(&state, user.id, &slug).await?;
    let feedbacks = state.feedback_repo.list_for_event(event.id).await?;
    Ok(Json(feedbacks.iter().map(FeedbackResponse::from).collect()))
}

/// Leave feedback on an event the caller holds a ticket for.
#[utoipa::path(
    post,
    path = "/api/events/{slug}/feedbacks/",
    tag = "feedbacks",
    params(("slug" = String, Path, description = "Event slug")),
    request_body = CreateFeedbackRequest,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Feedback recorded", body = ApiEnvelope),
        (status = 400, description = "Invalid slug, blank text, or caller has no ticket", body = ApiEnvelope),
        (status = 403, description = "Not authenticated", body = ApiEnvelope)
    )
)]
pub async fn create_feedback(
    State(state): State<FeedbacksState>,
    Authenticated(user): Authenticated,
    Path(slug): Path<String>,
    ValidJson(request): ValidJson<CreateFeedbackRequest>,
) -> Result<(StatusCode, Json<ApiEnvelope>)> {
    let event = participant_event(&state, user.id, &slug).await?;

    let text = request.text.trim();
    if text.is_empty() {
        return Err(ServiceError::validation("text: This field may not be blank."));
    }

    let feedback = state.feedback_repo.insert(&Feedback::new(user.id, event.id, text)).await?;
    info!(user_id = user.id, event_id = event.id, "feedback left");
    Ok((
        StatusCode::CREATED,
        Json(ApiEnvelope::success(
            "Feedback submitted successfully",
            json!({"feedback": FeedbackResponse::from(&feedback)}),
        )),
    ))
}

/// Routes that hang off `/api/events`.
pub fn event_feedbacks_router(state: FeedbacksState) -> Router {
    Router::new()
        .route("/:slug/feedbacks/", get(list_feedbacks).post(create_feedback))
        .with_state(state)
}
