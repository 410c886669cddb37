//! Ticket endpoints
//!
//! One ticket per user per event, atomically counted, booking closed in
//! the final hour before start. Malformed and unknown slugs are deliberately
//! answered alike, so the endpoint leaks nothing about which slugs exist.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::info;
use utoipa::ToSchema;

use crate::api::common::ApiEnvelope;
use crate::api::events::EventResponse;
use crate::api::middleware::Authenticated;
use crate::domain::{Ticket, TicketWithEvent};
use crate::error::{Result, ServiceError};
use crate::naming::slugify;
use crate::repository::{BookOutcome, EventRepository, TicketRepository};
use crate::service::NotifyService;

#[derive(Clone)]
pub struct TicketsState {
    pub event_repo: Arc<EventRepository>,
    pub ticket_repo: Arc<TicketRepository>,
    pub notify: Arc<NotifyService>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TicketResponse {
    pub id: i64,
    pub user_id: i64,
    pub event_id: i64,
    pub purchase_time: DateTime<Utc>,
}

impl From<&Ticket> for TicketResponse {
    fn from(ticket: &Ticket) -> Self {
        Self {
            id: ticket.id,
            user_id: ticket.user_id,
            event_id: ticket.event_id,
            purchase_time: ticket.purchase_time,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TicketWithEventResponse {
    pub ticket_id: i64,
    pub purchase_time: DateTime<Utc>,
    pub event: EventResponse,
}

impl From<&TicketWithEvent> for TicketWithEventResponse {
    fn from(ticket: &TicketWithEvent) -> Self {
        Self {
            ticket_id: ticket.ticket_id,
            purchase_time: ticket.purchase_time,
            event: EventResponse::from(&ticket.event),
        }
    }
}

/// Book a ticket for the event. Booking closes one hour before start;
/// a second attempt for the same event is rejected without touching the
/// participant count.
#[utoipa::path(
    post,
    path = "/api/events/{slug}/buy-ticket",
    tag = "tickets",
    params(("slug" = String, Path, description = "Event slug")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Ticket booked", body = ApiEnvelope),
        (status = 400, description = "Invalid slug, booking closed, or already booked", body = ApiEnvelope),
        (status = 403, description = "Not authenticated", body = ApiEnvelope)
    )
)]
pub async fn buy_ticket(
    State(state): State<TicketsState>,
    Authenticated(user): Authenticated,
    Path(slug): Path<String>,
) -> Result<Json<ApiEnvelope>> {
    if slugify(&slug) != slug {
        return Err(ServiceError::InvalidSlug);
    }
    let event = state.event_repo.find_by_slug(&slug).await?.ok_or(ServiceError::InvalidSlug)?;

    if !event.booking_open(Utc::now()) {
        return Err(ServiceError::BookingClosed);
    }

    match state.ticket_repo.book(user.id, event.id).await? {
        BookOutcome::Created(ticket) => {
            state.notify.send_booking_confirmation(&user, &event).await;
            info!(user_id = user.id, event_id = event.id, "ticket booked");
            Ok(Json(ApiEnvelope::success(
                "Ticket booked successfully",
                json!({"ticket": TicketResponse::from(&ticket)}),
            )))
        }
        BookOutcome::AlreadyBooked => Err(ServiceError::AlreadyBooked),
    }
}

/// The caller's tickets, newest first, each with its event.
#[utoipa::path(
    get,
    path = "/api/my-tickets",
    tag = "tickets",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "The caller's tickets", body = [TicketWithEventResponse]),
        (status = 403, description = "Not authenticated", body = ApiEnvelope)
    )
)]
pub async fn my_tickets(
    State(state): State<TicketsState>,
    Authenticated(user): Authenticated,
) -> Result<Json<Vec<TicketWithEventResponse>>> {
    let tickets = state.ticket_repo.list_for_user(user.id).await?;
    Ok(Json(tickets.iter().map(TicketWithEventResponse::from).collect()))
}

/// Routes that hang off `/api/events`.
pub fn event_tickets_router(state: TicketsState) -> Router {
    Router::new().route("/:slug/buy-ticket", post(buy_ticket)).with_state(state)
}

pub fn my_tickets_router(state: TicketsState) -> Router {
    Router::new().route("/", get(my_tickets)).with_state(state)
}
