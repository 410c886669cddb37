//! Event catalog endpoints
//!
//! Public listing and detail, staff-only mutations. The slug is derived
//! from the title at creation and never changes afterwards, so links to
//! an event survive title edits.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};

use crate::api::common::{PaginatedResponse, PAGE_SIZE};
use crate::api::middleware::{Authenticated, ValidJson, ValidQuery};
use crate::api::throttle::CreateEventThrottle;
use crate::domain::{default_start_time, Event};
use crate::error::{Result, ServiceError};
use crate::naming::slugify;
use crate::repository::{EventFilter, EventOrder, EventRepository};
use crate::service::checks;

#[derive(Clone)]
pub struct EventsState {
    pub event_repo: Arc<EventRepository>,
    pub throttle: Arc<CreateEventThrottle>,
}

/// The slug is server-owned, so unknown fields (slug included) are
/// rejected rather than silently dropped.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateEventRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: String,
    /// Defaults to 24 hours from now when omitted.
    pub start_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateEventRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: String,
    /// Omitting keeps the current start time.
    pub start_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EventResponse {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub location: String,
    pub start_time: DateTime<Utc>,
    pub created_by: i64,
    pub participant_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Event> for EventResponse {
    fn from(event: &Event) -> Self {
        Self {
            id: event.id,
            title: event.title.clone(),
            slug: event.slug.clone(),
            description: event.description.clone(),
            location: event.location.clone(),
            start_time: event.start_time,
            created_by: event.created_by,
            participant_count: event.participant_count,
            created_at: event.created_at,
            updated_at: event.updated_at,
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase", default)]
#[into_params(parameter_in = Query)]
pub struct EventListParams {
    /// Case-insensitive title substring.
    pub search: Option<String>,
    /// One of `start_time`, `created_at`, `updated_at`, `id`, optionally
    /// prefixed with `-` for descending. Defaults to `-created_at`.
    pub ordering: Option<String>,
    /// 1-based page number.
    pub page: Option<i64>,
    pub start_time_gt: Option<DateTime<Utc>>,
    pub start_time_gte: Option<DateTime<Utc>>,
    pub start_time_lt: Option<DateTime<Utc>>,
    pub start_time_lte: Option<DateTime<Utc>>,
    pub start_time_date: Option<NaiveDate>,
    pub created_at_gt: Option<DateTime<Utc>>,
    pub created_at_gte: Option<DateTime<Utc>>,
    pub created_at_lt: Option<DateTime<Utc>>,
    pub created_at_lte: Option<DateTime<Utc>>,
    pub created_at_date: Option<NaiveDate>,
    pub updated_at_gt: Option<DateTime<Utc>>,
    pub updated_at_gte: Option<DateTime<Utc>>,
    pub updated_at_lt: Option<DateTime<Utc>>,
    pub updated_at_lte: Option<DateTime<Utc>>,
    pub updated_at_date: Option<NaiveDate>,
}

impl EventListParams {
    fn into_filter(self) -> EventFilter {
        EventFilter {
            start_time_gt: self.start_time_gt,
            start_time_gte: self.start_time_gte,
            start_time_lt: self.start_time_lt,
            start_time_lte: self.start_time_lte,
            start_time_date: self.start_time_date,
            created_at_gt: self.created_at_gt,
            created_at_gte: self.created_at_gte,
            created_at_lt: self.created_at_lt,
            created_at_lte: self.created_at_lte,
            created_at_date: self.created_at_date,
            updated_at_gt: self.updated_at_gt,
            updated_at_gte: self.updated_at_gte,
            updated_at_lt: self.updated_at_lt,
            updated_at_lte: self.updated_at_lte,
            updated_at_date: self.updated_at_date,
            search: self.search.filter(|s| !s.trim().is_empty()),
        }
    }
}

fn parse_ordering(param: Option<&str>) -> Result<EventOrder> {
    match param {
        None => Ok(EventOrder::default()),
        Some(value) => EventOrder::parse(value).ok_or_else(|| {
            ServiceError::validation(format!("ordering: \"{value}\" is not a valid choice."))
        }),
    }
}

fn parse_page(page: Option<i64>) -> Result<i64> {
    match page {
        None => Ok(1),
        Some(page) if page >= 1 => Ok(page),
        Some(_) => Err(ServiceError::validation("Invalid page.")),
    }
}

/// Create an event. Staff only, throttled per user. The slug is derived
/// from the title once, here.
#[utoipa::path(
    post,
    path = "/api/events/",
    tag = "events",
    request_body = CreateEventRequest,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Event created", body = EventResponse),
        (status = 400, description = "Validation failed or duplicate title", body = crate::api::common::ApiEnvelope),
        (status = 403, description = "Caller is not event staff", body = crate::api::common::ApiEnvelope),
        (status = 429, description = "Creation rate exceeded", body = crate::api::common::ApiEnvelope)
    )
)]
pub async fn create_event(
    State(state): State<EventsState>,
    Authenticated(user): Authenticated,
    ValidJson(request): ValidJson<CreateEventRequest>,
) -> Result<(StatusCode, Json<EventResponse>)> {
    if !checks::can_create_events(&user) {
        return Err(ServiceError::forbidden(
            "You do not have permission to perform this action.",
        ));
    }
    state.throttle.check(user.id)?;

    let title = request.title.trim();
    if title.is_empty() {
        return Err(ServiceError::validation("title: This field may not be blank."));
    }
    let slug = slugify(title);
    if slug.is_empty() {
        return Err(ServiceError::InvalidSlug);
    }

    if state.event_repo.title_exists(title).await? {
        return Err(ServiceError::duplicate("event", "title"));
    }
    if state.event_repo.slug_exists(&slug).await? {
        return Err(ServiceError::duplicate("event", "slug"));
    }

    let start_time = request.start_time.unwrap_or_else(default_start_time);
    let event = state
        .event_repo
        .insert(&Event::new(
            title,
            slug,
            request.description.trim(),
            request.location.trim(),
            start_time,
            user.id,
        ))
        .await?;

    info!(event_id = event.id, slug = %event.slug, "event created");
    Ok((StatusCode::CREATED, Json(EventResponse::from(&event))))
}

/// List events with filtering, search, ordering, and fixed-size pages.
#[utoipa::path(
    get,
    path = "/api/events/",
    tag = "events",
    params(EventListParams),
    responses(
        (status = 200, description = "One page of events", body = PaginatedResponse<EventResponse>),
        (status = 400, description = "Bad filter, ordering, or page", body = crate::api::common::ApiEnvelope)
    )
)]
pub async fn list_events(
    State(state): State<EventsState>,
    ValidQuery(params): ValidQuery<EventListParams>,
) -> Result<Json<PaginatedResponse<EventResponse>>> {
    let order = parse_ordering(params.ordering.as_deref())?;
    let page = parse_page(params.page)?;
    let filter = params.into_filter();

    let offset = (page - 1) * PAGE_SIZE;
    let events = state.event_repo.list(&filter, order, PAGE_SIZE, offset).await?;
    let total = state.event_repo.count(&filter).await?;

    let data = events.iter().map(EventResponse::from).collect();
    Ok(Json(PaginatedResponse::new(data, page, PAGE_SIZE, total)))
}

/// Fetch one event by slug.
#[utoipa::path(
    get,
    path = "/api/events/{slug}",
    tag = "events",
    params(("slug" = String, Path, description = "Event slug")),
    responses(
        (status = 200, description = "The event", body = EventResponse),
        (status = 404, description = "No event with this slug", body = crate::api::common::ApiEnvelope)
    )
)]
pub async fn get_event(
    State(state): State<EventsState>,
    Path(slug): Path<String>,
) -> Result<Json<EventResponse>> {
    let event = state
        .event_repo
        .find_by_slug(&slug)
        .await?
        .ok_or_else(|| ServiceError::not_found("Event", &slug))?;
    Ok(Json(EventResponse::from(&event)))
}

/// Update an event's mutable fields. The slug stays as created even when
/// the title changes.
#[utoipa::path(
    put,
    path = "/api/events/{slug}",
    tag = "events",
    params(("slug" = String, Path, description = "Event slug")),
    request_body = UpdateEventRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Updated event", body = EventResponse),
        (status = 400, description = "Validation failed or unknown slug", body = crate::api::common::ApiEnvelope),
        (status = 403, description = "Caller may not mutate this event", body = crate::api::common::ApiEnvelope)
    )
)]
pub async fn update_event(
    State(state): State<EventsState>,
    Authenticated(user): Authenticated,
    Path(slug): Path<String>,
    ValidJson(request): ValidJson<UpdateEventRequest>,
) -> Result<Json<EventResponse>> {
    let mut event =
        state.event_repo.find_by_slug(&slug).await?.ok_or(ServiceError::InvalidSlug)?;
    if !checks::can_mutate_event(&user, &event) {
        return Err(ServiceError::forbidden(
            "You do not have permission to perform this action.",
        ));
    }

    let title = request.title.trim();
    if title.is_empty() {
        return Err(ServiceError::validation("title: This field may not be blank."));
    }
    if title != event.title && state.event_repo.title_exists_excluding(title, event.id).await? {
        return Err(ServiceError::duplicate("event", "title"));
    }

    event.title = title.to_string();
    event.description = request.description.trim().to_string();
    event.location = request.location.trim().to_string();
    if let Some(start_time) = request.start_time {
        event.start_time = start_time;
    }

    let updated = state.event_repo.update(&event).await?;
    info!(event_id = updated.id, slug = %updated.slug, "event updated");
    Ok(Json(EventResponse::from(&updated)))
}

/// Delete an event and, through cascade, its tickets and feedback.
#[utoipa::path(
    delete,
    path = "/api/events/{slug}",
    tag = "events",
    params(("slug" = String, Path, description = "Event slug")),
    security(("bearer" = [])),
    responses(
        (status = 204, description = "Event deleted"),
        (status = 400, description = "Unknown slug", body = crate::api::common::ApiEnvelope),
        (status = 403, description = "Caller may not mutate this event", body = crate::api::common::ApiEnvelope)
    )
)]
pub async fn delete_event(
    State(state): State<EventsState>,
    Authenticated(user): Authenticated,
    Path(slug): Path<String>,
) -> Result<StatusCode> {
    let event = state.event_repo.find_by_slug(&slug).await?.ok_or(ServiceError::InvalidSlug)?;
    if !checks::can_mutate_event(&user, &event) {
        return Err(ServiceError::forbidden(
            "You do not have permission to perform this action.",
        ));
    }

    state.event_repo.delete(event.id).await?;
    info!(event_id = event.id, slug = %event.slug, "event deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub fn events_router(state: EventsState) -> Router {
    Router::new()
        .route("/", post(create_event).get(list_events))
        .route("/:slug", get(get_event).put(update_event).delete(delete_event))
        .with_state(state)
}
