//! Platform Integration Tests
//!
//! Tests for domain models, naming, authorization, tokens, and error
//! handling through the crate's public API.

use chrono::{Duration, Utc};

use tes_platform::domain::{default_start_time, Event, Feedback, User, UserRole};

fn organizer(id: i64) -> User {
    let mut user = User::new(
        "orga_x1y2z3a4b5c6",
        "orga@example.com",
        "Orga",
        "Nizer",
        UserRole::Organizer,
        "hash",
    );
    user.id = id;
    user.is_active = true;
    user
}

fn sample_event(created_by: i64) -> Event {
    Event::new(
        "Star Meet",
        "star-meet",
        "Stargazing night",
        "Observatory Hill",
        Utc::now() + Duration::hours(48),
        created_by,
    )
}

// Unit tests for domain models
mod domain_tests {
    use super::*;

    #[test]
    fn test_new_users_are_inactive_participants() {
        let user = User::new("jane_a1", "jane@example.com", "Jane", "Doe", UserRole::User, "h");
        assert!(!user.is_active);
        assert_eq!(user.role, UserRole::User);
        assert_eq!(user.full_name(), "Jane Doe");
    }

    #[test]
    fn test_new_events_start_with_zero_participants() {
        let event = sample_event(1);
        assert_eq!(event.participant_count, 0);
        assert_eq!(event.slug, "star-meet");
    }

    #[test]
    fn test_booking_window_closes_one_hour_before_start() {
        let event = sample_event(1);
        let closes = event.booking_closes_at();
        assert_eq!(event.start_time - closes, Duration::hours(1));

        assert!(event.booking_open(closes - Duration::seconds(1)));
        // Exactly at the cutoff booking is closed.
        assert!(!event.booking_open(closes));
        assert!(!event.booking_open(event.start_time));
        assert!(!event.booking_open(event.start_time + Duration::hours(2)));
    }

    #[test]
    fn test_default_start_time_is_a_day_out() {
        let start = default_start_time();
        let expected = Utc::now() + Duration::hours(24);
        assert!((start - expected).num_seconds().abs() < 5);
    }

    #[test]
    fn test_feedback_records_author_and_event() {
        let feedback = Feedback::new(7, 42, "Great event!");
        assert_eq!(feedback.user_id, 7);
        assert_eq!(feedback.event_id, 42);
        assert_eq!(feedback.text, "Great event!");
    }
}

// Slug and username derivation tests
mod naming_tests {
    use tes_platform::naming::{derive_username, slugify, USERNAME_SUFFIX_LEN};

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Star Meet"), "star-meet");
        assert_eq!(slugify("Rust & Coffee 2026"), "rust-coffee-2026");
        assert_eq!(slugify("  spaced   out  "), "spaced-out");
    }

    #[test]
    fn test_slugify_collapses_separator_runs() {
        assert_eq!(slugify("a---b___c"), "a-b-c");
        assert_eq!(slugify("one -- two"), "one-two");
    }

    #[test]
    fn test_slugify_can_come_up_empty() {
        assert_eq!(slugify("!!!"), "");
        assert_eq!(slugify(""), "");
    }

    #[test]
    fn test_username_derivation_shape() {
        let username = derive_username("Ada.Lovelace+tag@example.com");
        let (stem, suffix) = username.rsplit_once('_').unwrap();
        assert_eq!(stem, "adalovelacetag");
        assert_eq!(suffix.len(), USERNAME_SUFFIX_LEN);
        assert!(username.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'));
    }

    #[test]
    fn test_username_derivation_is_randomized() {
        let a = derive_username("same@example.com");
        let b = derive_username("same@example.com");
        assert_ne!(a, b);
    }
}

// Authorization predicate tests
mod authorization_tests {
    use super::*;
    use tes_platform::service::checks;

    #[test]
    fn test_only_staff_create_events() {
        let mut participant = organizer(1);
        participant.role = UserRole::User;
        assert!(!checks::can_create_events(&participant));
        assert!(checks::can_create_events(&organizer(1)));
    }

    #[test]
    fn test_organizer_mutates_only_own_events() {
        let owner = organizer(1);
        let other = organizer(2);
        let event = sample_event(1);

        assert!(checks::can_mutate_event(&owner, &event));
        assert!(!checks::can_mutate_event(&other, &event));
    }

    #[test]
    fn test_admin_needs_ownership_too() {
        let mut admin = organizer(99);
        admin.role = UserRole::Admin;
        assert!(!checks::can_mutate_event(&admin, &sample_event(1)));
        assert!(checks::can_mutate_event(&admin, &sample_event(99)));
    }
}

// Token issuer tests against a fixed keypair
mod token_tests {
    use super::*;
    use tes_platform::service::{
        AccountToken, AuthConfig, AuthService, TokenPurpose, TOKEN_TYPE_ACCESS,
        TOKEN_TYPE_REFRESH,
    };

    fn auth_service() -> AuthService {
        let config = AuthConfig {
            rsa_private_key: include_str!("../testdata/jwt_test_key.pem").to_string(),
            rsa_public_key: include_str!("../testdata/jwt_test_key.pub.pem").to_string(),
            issuer: "tessera".to_string(),
            access_token_ttl_secs: 3600,
            refresh_token_ttl_secs: 7200,
        };
        AuthService::new(&config).unwrap()
    }

    #[test]
    fn test_issued_pair_verifies() {
        let service = auth_service();
        let tokens = service.issue_pair(42).unwrap();

        let access = service.verify_access(&tokens.access).unwrap();
        assert_eq!(access.user_id, 42);
        assert_eq!(access.token_type, TOKEN_TYPE_ACCESS);

        let refresh = service.verify_refresh(&tokens.refresh).unwrap();
        assert_eq!(refresh.token_type, TOKEN_TYPE_REFRESH);
        assert_eq!(refresh.jti, tokens.refresh_jti);
    }

    #[test]
    fn test_access_and_refresh_are_not_interchangeable() {
        let service = auth_service();
        let tokens = service.issue_pair(42).unwrap();
        assert!(service.verify_access(&tokens.refresh).is_err());
        assert!(service.verify_refresh(&tokens.access).is_err());
    }

    #[test]
    fn test_activation_link_is_single_use() {
        let tokens = AccountToken::new("secret", 3600);
        let mut user = organizer(7);
        user.is_active = false;

        let token = tokens.issue(&user, TokenPurpose::Activation);
        assert!(tokens.verify(&user, TokenPurpose::Activation, &token));

        user.is_active = true;
        assert!(!tokens.verify(&user, TokenPurpose::Activation, &token));
    }

    #[test]
    fn test_reset_link_invalidated_by_password_change() {
        let tokens = AccountToken::new("secret", 3600);
        let mut user = organizer(7);

        let token = tokens.issue(&user, TokenPurpose::PasswordReset);
        assert!(tokens.verify(&user, TokenPurpose::PasswordReset, &token));

        user.password_hash = "different".to_string();
        assert!(!tokens.verify(&user, TokenPurpose::PasswordReset, &token));
    }
}

// Error handling tests
mod error_tests {
    use axum::http::StatusCode;
    use tes_platform::error::ServiceError;

    #[test]
    fn test_booking_errors_are_client_errors() {
        assert_eq!(ServiceError::BookingClosed.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ServiceError::BookingClosed.to_string(),
            "Booking time has been ended for this event."
        );
        assert_eq!(ServiceError::AlreadyBooked.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ServiceError::AlreadyBooked.to_string(), "You have already booked your ticket");
    }

    #[test]
    fn test_slug_and_username_errors() {
        assert_eq!(ServiceError::InvalidSlug.to_string(), "Invalid slug field");
        assert_eq!(ServiceError::InvalidUsername.to_string(), "Invalid username field");
        assert_eq!(ServiceError::NotAnOrganizer.to_string(), "User is not an organizer");
        assert_eq!(
            ServiceError::NotAParticipant.to_string(),
            "You are not a participant of this event"
        );
    }

    #[test]
    fn test_not_found_is_404() {
        let err = ServiceError::not_found("Event", "star-meet");
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert!(err.to_string().contains("Event"));
    }

    #[test]
    fn test_duplicate_names_the_field() {
        let err = ServiceError::duplicate("event", "title");
        assert_eq!(err.to_string(), "title: event with this title already exists.");
    }

    #[test]
    fn test_internal_errors_mask_details() {
        // The wire message is generic; to_string keeps the detail for logs.
        let err = ServiceError::internal("connection pool exhausted");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.to_string().contains("connection pool exhausted"));
    }
}

// Listing order tests
mod ordering_tests {
    use tes_platform::repository::{EventOrder, OrderField};

    #[test]
    fn test_default_is_newest_first() {
        let order = EventOrder::default();
        assert_eq!(order.field, OrderField::CreatedAt);
        assert!(order.descending);
    }

    #[test]
    fn test_all_documented_choices_parse() {
        for (param, field, descending) in [
            ("start_time", OrderField::StartTime, false),
            ("-start_time", OrderField::StartTime, true),
            ("created_at", OrderField::CreatedAt, false),
            ("-created_at", OrderField::CreatedAt, true),
            ("updated_at", OrderField::UpdatedAt, false),
            ("-updated_at", OrderField::UpdatedAt, true),
            ("id", OrderField::Id, false),
            ("-id", OrderField::Id, true),
        ] {
            let order = EventOrder::parse(param).unwrap();
            assert_eq!(order.field, field);
            assert_eq!(order.descending, descending);
        }
    }

    #[test]
    fn test_unknown_fields_do_not_parse() {
        assert!(EventOrder::parse("participant_count").is_none());
        assert!(EventOrder::parse("-title").is_none());
        assert!(EventOrder::parse("--created_at").is_none());
    }
}

// Pagination math tests
mod pagination_tests {
    use tes_platform::api::{PaginatedResponse, PAGE_SIZE};

    #[test]
    fn test_page_size_is_fixed_at_ten() {
        assert_eq!(PAGE_SIZE, 10);
    }

    #[test]
    fn test_total_pages() {
        assert_eq!(PaginatedResponse::<i32>::new(vec![], 1, 10, 0).total_pages, 0);
        assert_eq!(PaginatedResponse::new(vec![1], 1, 10, 7).total_pages, 1);
        assert_eq!(PaginatedResponse::new(vec![1], 1, 10, 10).total_pages, 1);
        assert_eq!(PaginatedResponse::new(vec![1], 1, 10, 21).total_pages, 3);
    }
}
