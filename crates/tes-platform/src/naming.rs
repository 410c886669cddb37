//! Name Derivation
//!
//! Server-side derivation of URL slugs and account usernames. Slugs are
//! computed once from an event title at creation time; usernames are
//! derived from the registration email's local part plus a random suffix.

use rand::distributions::Alphanumeric;
use rand::Rng;

/// Maximum length of the email-derived part of a username.
pub const USERNAME_STEM_MAX: usize = 20;

/// Length of the random username suffix.
pub const USERNAME_SUFFIX_LEN: usize = 12;

/// Derives a URL-safe slug from a title: lowercase alphanumerics with
/// separator runs collapsed to single hyphens, trimmed at both ends.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_hyphen = false;

    for ch in title.chars() {
        if ch.is_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            for lower in ch.to_lowercase() {
                slug.push(lower);
            }
        } else {
            pending_hyphen = true;
        }
    }

    slug
}

/// Derives a username candidate from an email address: the alphanumeric
/// characters of the local part (at most [`USERNAME_STEM_MAX`]), an
/// underscore, and a random alphanumeric suffix, all lowercase. Collisions
/// are expected to be resolved by the caller re-invoking this function.
pub fn derive_username(email: &str) -> String {
    let local = email.split('@').next().unwrap_or_default();
    let mut stem: String = local
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(USERNAME_STEM_MAX)
        .collect();
    if stem.is_empty() {
        stem.push_str("user");
    }

    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(USERNAME_SUFFIX_LEN)
        .map(char::from)
        .collect();

    format!("{}_{}", stem, suffix).to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_title() {
        assert_eq!(slugify("Star Meet"), "star-meet");
        assert_eq!(slugify("Rust  &  Friends 2024"), "rust-friends-2024");
        assert_eq!(slugify("  --hello--  "), "hello");
        assert_eq!(slugify("Already-Slugged"), "already-slugged");
    }

    #[test]
    fn slugify_collapses_separator_runs() {
        assert_eq!(slugify("a___b---c   d"), "a-b-c-d");
    }

    #[test]
    fn slugify_empty_and_symbol_only_titles() {
        assert_eq!(slugify(""), "");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn username_shape() {
        let username = derive_username("jane.doe+events@example.com");
        let (stem, suffix) = username.split_once('_').expect("separator");
        assert_eq!(stem, "janedoeevents");
        assert_eq!(suffix.len(), USERNAME_SUFFIX_LEN);
        assert_eq!(username, username.to_lowercase());
    }

    #[test]
    fn username_stem_is_truncated() {
        let username = derive_username("a.very.long.local.part.indeed@example.com");
        let (stem, _) = username.split_once('_').expect("separator");
        assert!(stem.len() <= USERNAME_STEM_MAX);
    }

    #[test]
    fn username_falls_back_when_local_part_is_empty() {
        let username = derive_username("@example.com");
        assert!(username.starts_with("user_"));
    }

    #[test]
    fn username_differs_across_calls() {
        let a = derive_username("same@example.com");
        let b = derive_username("same@example.com");
        assert_ne!(a, b);
    }
}
