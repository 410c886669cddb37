//! Authorization predicates
//!
//! Pure functions over the caller and the record in question. Handlers
//! decide how a `false` maps to a response; nothing in here touches the
//! database or produces errors.

use crate::domain::{Event, User, UserRole};

/// Organizers and admins count as event staff.
pub fn is_event_staff(user: &User) -> bool {
    matches!(user.role, UserRole::Organizer | UserRole::Admin)
}

pub fn can_create_events(user: &User) -> bool {
    is_event_staff(user)
}

/// Staff role and ownership both required: even an admin cannot touch an
/// event someone else created. Plain users never may, ticket or not.
pub fn can_mutate_event(user: &User, event: &Event) -> bool {
    is_event_staff(user) && event.created_by == user.id
}
