//! OpenAPI document

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Tessera API",
        version = "0.1.0",
        description = "Event ticketing platform: accounts, event catalog, tickets, and feedback"
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Registration, activation, login, and token lifecycle"),
        (name = "events", description = "Event catalog"),
        (name = "tickets", description = "Ticket booking"),
        (name = "feedbacks", description = "Participant feedback"),
        (name = "organizers", description = "Events by organizer")
    ),
    paths(
        super::auth::register_user,
        super::auth::register_organizer,
        super::auth::activate_account,
        super::auth::login,
        super::auth::logout,
        super::auth::change_password,
        super::auth::password_reset,
        super::auth::password_reset_confirm,
        super::auth::token_refresh,
        super::events::create_event,
        super::events::list_events,
        super::events::get_event,
        super::events::update_event,
        super::events::delete_event,
        super::tickets::buy_ticket,
        super::tickets::my_tickets,
        super::feedbacks::list_feedbacks,
        super::feedbacks::create_feedback,
        super::organizers::organizer_events
    ),
    components(schemas(
        super::common::ApiEnvelope,
        super::common::PaginatedResponse<super::events::EventResponse>,
        super::auth::RegisterRequest,
        super::auth::LoginRequest,
        super::auth::LogoutRequest,
        super::auth::ChangePasswordRequest,
        super::auth::PasswordResetRequest,
        super::auth::PasswordResetConfirmRequest,
        super::auth::TokenRefreshRequest,
        super::auth::TokenPairResponse,
        super::auth::UserResponse,
        super::events::CreateEventRequest,
        super::events::UpdateEventRequest,
        super::events::EventResponse,
        super::tickets::TicketResponse,
        super::tickets::TicketWithEventResponse,
        super::feedbacks::CreateFeedbackRequest,
        super::feedbacks::FeedbackResponse
    ))
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
