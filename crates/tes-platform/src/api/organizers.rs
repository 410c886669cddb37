//! Organizer listing endpoints

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};

use crate::api::events::EventResponse;
use crate::error::{Result, ServiceError};
use crate::repository::{EventRepository, UserRepository};
use crate::service::checks;

#[derive(Clone)]
pub struct OrganizersState {
    pub user_repo: Arc<UserRepository>,
    pub event_repo: Arc<EventRepository>,
}

// Usernames are minted lowercase alphanumeric plus underscore, so
// anything else cannot name an account.
fn valid_username(username: &str) -> bool {
    !username.is_empty()
        && username
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// Events created by the named organizer, newest first. Malformed and
/// unknown usernames are answered alike.
#[utoipa::path(
    get,
    path = "/api/organizers/{username}/events",
    tag = "organizers",
    params(("username" = String, Path, description = "Organizer username")),
    responses(
        (status = 200, description = "Events by this organizer", body = [EventResponse]),
        (status = 400, description = "Invalid username or not an organizer", body = crate::api::common::ApiEnvelope)
    )
)]
pub async fn organizer_events(
    State(state): State<OrganizersState>,
    Path(username): Path<String>,
) -> Result<Json<Vec<EventResponse>>> {
    if !valid_username(&username) {
        return Err(ServiceError::InvalidUsername);
    }
    let user = state
        .user_repo
        .find_by_username(&username)
        .await?
        .ok_or(ServiceError::InvalidUsername)?;
    if !checks::is_event_staff(&user) {
        return Err(ServiceError::NotAnOrganizer);
    }

    let events = state.event_repo.list_by_creator(user.id).await?;
    Ok(Json(events.iter().map(EventResponse::from).collect()))
}

pub fn organizers_router(state: OrganizersState) -> Router {
    Router::new().route("/:username/events", get(organizer_events)).with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_shape() {
        assert!(valid_username("ada_x1y2z3"));
        assert!(valid_username("user42"));
        assert!(!valid_username(""));
        assert!(!valid_username("Ada"));
        assert!(!valid_username("ada lovelace"));
        assert!(!valid_username("ada@example.com"));
    }
}
