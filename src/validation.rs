// SPDX-License-Identifier: MIT
// Copyright 2026 Clarity Contributors

//! Input validation shared by request DTOs and services.

use regex::Regex;
use std::sync::LazyLock;

/// `local@domain.tld` with no whitespace and a single `@` per part.
pub static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Emails are compared case-insensitively; store them lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_emails() {
        assert!(is_valid_email("ada@example.com"));
        assert!(is_valid_email("Ada.Lovelace+clarity@mail.example.co.uk"));
    }

    #[test]
    fn test_invalid_emails() {
        for email in ["", "ada", "ada@example", "ada @example.com", "@example.com", "a@@b.co"] {
            assert!(!is_valid_email(email), "{email:?} should be rejected");
        }
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
    }
}
