pub mod auth;
pub mod common;
pub mod events;
pub mod feedbacks;
pub mod middleware;
pub mod openapi;
pub mod organizers;
pub mod throttle;
pub mod tickets;

pub use auth::{auth_router, AuthApiState};
pub use common::{ApiEnvelope, PaginatedResponse, PAGE_SIZE};
pub use events::{events_router, EventsState};
pub use feedbacks::{event_feedbacks_router, FeedbacksState};
pub use middleware::{AppState, Authenticated, ValidJson, ValidQuery};
pub use openapi::ApiDoc;
pub use organizers::{organizers_router, OrganizersState};
pub use throttle::CreateEventThrottle;
pub use tickets::{event_tickets_router, my_tickets_router, TicketsState};
