pub mod event;
pub mod feedback;
pub mod refresh_token;
pub mod schema;
pub mod ticket;
pub mod user;

pub use event::{EventFilter, EventOrder, EventRepository, OrderField};
pub use feedback::FeedbackRepository;
pub use refresh_token::RefreshTokenRepository;
pub use schema::init_schema;
pub use ticket::{BookOutcome, TicketRepository};
pub use user::UserRepository;
