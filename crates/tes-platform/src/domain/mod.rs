//! Domain Models
//!
//! Core entities of the ticketing platform. All rows use BIGSERIAL ids;
//! an id of 0 marks an entity not yet persisted.

pub mod event;
pub mod feedback;
pub mod ticket;
pub mod user;

pub use event::*;
pub use feedback::*;
pub use ticket::*;
pub use user::*;
