//! Form validation helpers.
//!
//! A [`Validator`] collects one message per field; the free functions are the
//! individual checks fed into [`Validator::check`]:
//!
//! ```ignore
//! let mut v = Validator::default();
//! v.check(not_blank(&form.name), "name", "Name is required.");
//! v.check(max_chars(&form.name, 100), "name", "Name must be less than 100 characters.");
//! ```

use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::sync::LazyLock;

// ============================================================================
// Validator
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validator {
    errors: HashMap<String, String>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no field has an error.
    pub fn valid(&self) -> bool {
        !self.has_errors()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Record `message` for `field` unless the field already has one.
    pub fn add_error(&mut self, field: &str, message: &str) {
        self.errors
            .entry(field.to_string())
            .or_insert_with(|| message.to_string());
    }

    /// Record `message` for `field` when `ok` is false.
    pub fn check(&mut self, ok: bool, field: &str, message: &str) {
        if !ok {
            self.add_error(field, message);
        }
    }

    /// The message recorded for `field`, if any.
    pub fn error(&self, field: &str) -> Option<&str> {
        self.errors.get(field).map(String::as_str)
    }
}

// ============================================================================
// Checks
// ============================================================================

static EMAIL_RX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .expect("email pattern compiles")
});

/// Longest address accepted by [`is_email`], in bytes.
pub const MAX_EMAIL_LEN: usize = 254;

/// True when the value contains something other than whitespace.
pub fn not_blank(value: &str) -> bool {
    !value.trim().is_empty()
}

/// True when the value has at least `n` characters.
pub fn min_chars(value: &str, n: usize) -> bool {
    value.chars().count() >= n
}

/// True when the value has at most `n` characters.
pub fn max_chars(value: &str, n: usize) -> bool {
    value.chars().count() <= n
}

/// Inclusive range check.
pub fn between<T: PartialOrd>(value: T, min: T, max: T) -> bool {
    value >= min && value <= max
}

pub fn matches(value: &str, rx: &Regex) -> bool {
    rx.is_match(value)
}

/// True when `value` is one of `safelist`.
pub fn permitted<T: PartialEq>(value: &T, safelist: &[T]) -> bool {
    safelist.contains(value)
}

/// True when every value is in `safelist`.
pub fn all_permitted<T: PartialEq>(values: &[T], safelist: &[T]) -> bool {
    values.iter().all(|v| safelist.contains(v))
}

/// True when `value` is not in `blocklist`.
pub fn not_permitted<T: PartialEq>(value: &T, blocklist: &[T]) -> bool {
    !blocklist.contains(value)
}

pub fn no_duplicates<T: Eq + Hash>(values: &[T]) -> bool {
    let unique: HashSet<&T> = values.iter().collect();
    unique.len() == values.len()
}

pub fn is_email(value: &str) -> bool {
    value.len() <= MAX_EMAIL_LEN && EMAIL_RX.is_match(value)
}

/// True for absolute URLs with both a scheme and a host.
pub fn is_url(value: &str) -> bool {
    match url::Url::parse(value) {
        Ok(u) => !u.scheme().is_empty() && u.host_str().is_some_and(|h| !h.is_empty()),
        Err(_) => false,
    }
}
