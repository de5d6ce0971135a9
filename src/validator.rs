//! Field-level form validation.
//!
//! Forms embed a [`Validator`]; failed checks are re-rendered with
//! `422 Unprocessable Content` and never logged as failures.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

pub static EMAIL_RX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$")
        .unwrap_or_else(|e| panic!("email pattern: {e}"))
});

#[derive(Clone, Debug, Default, Serialize)]
pub struct Validator {
    pub field_errors: BTreeMap<String, String>,
    pub non_field_errors: Vec<String>,
}

impl Validator {
    pub fn valid(&self) -> bool {
        self.field_errors.is_empty() && self.non_field_errors.is_empty()
    }

    /// Keeps the first message per field.
    pub fn add_field_error(&mut self, field: &str, message: &str) {
        self.field_errors
            .entry(field.to_owned())
            .or_insert_with(|| message.to_owned());
    }

    pub fn add_non_field_error(&mut self, message: &str) {
        self.non_field_errors.push(message.to_owned());
    }

    pub fn check_field(&mut self, ok: bool, field: &str, message: &str) {
        if !ok {
            self.add_field_error(field, message);
        }
    }
}

pub fn not_blank(value: &str) -> bool {
    !value.trim().is_empty()
}

/// Counts characters, not bytes.
pub fn max_chars(value: &str, n: usize) -> bool {
    value.chars().count() <= n
}

pub fn min_chars(value: &str, n: usize) -> bool {
    value.chars().count() >= n
}

pub fn permitted_value<T: PartialEq>(value: T, permitted: &[T]) -> bool {
    permitted.contains(&value)
}

pub fn matches(value: &str, rx: &Regex) -> bool {
    rx.is_match(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_error_per_field_wins() {
        let mut v = Validator::default();
        v.check_field(not_blank("  "), "title", "This field cannot be blank");
        v.check_field(max_chars("", 100), "title", "too long");
        v.check_field(false, "title", "second");

        assert!(!v.valid());
        assert_eq!(v.field_errors["title"], "This field cannot be blank");
    }

    #[test]
    fn non_field_errors_invalidate() {
        let mut v = Validator::default();
        assert!(v.valid());
        v.add_non_field_error("Email or password is incorrect");
        assert!(!v.valid());
    }

    #[test]
    fn character_limits_count_chars() {
        assert!(max_chars("héllo", 5));
        assert!(!min_chars("héllo", 6));
        assert!(permitted_value(7, &[1, 7, 365]));
        assert!(!permitted_value(30, &[1, 7, 365]));
    }

    #[test]
    fn email_pattern() {
        assert!(matches("alice@example.com", &EMAIL_RX));
        assert!(!matches("alice@", &EMAIL_RX));
        assert!(!matches("not an email", &EMAIL_RX));
    }
}
