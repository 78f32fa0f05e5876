//! Input validation
//!
//! Schema-based structural validation of user-submitted form fields.
//! Validation runs in two phases:
//!
//! 1. Presence: every required field must be non-empty. Missing fields are
//!    collected and reported together, and short-circuit phase 2.
//! 2. Format: max length, alphanumeric-only, email shape. All format
//!    violations for the payload are collected.
//!
//! Validation is a pure function of its input; it touches no store.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// Practical email shape check; full RFC 5321 parsing is not the goal.
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex is valid"));

static ALPHANUMERIC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9]+$").expect("alphanumeric regex is valid"));

/// Format constraint applied to a single field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Any text
    Text,
    /// ASCII letters and digits only
    Alphanumeric,
    /// user@host.tld shape
    Email,
}

/// Schema for a single field
#[derive(Debug, Clone)]
pub struct FieldSchema {
    pub name: &'static str,
    pub required: bool,
    pub max_len: Option<usize>,
    pub format: Format,
}

impl FieldSchema {
    pub fn new(name: &'static str, format: Format) -> Self {
        Self {
            name,
            required: true,
            max_len: None,
            format,
        }
    }

    pub fn max_len(mut self, max: usize) -> Self {
        self.max_len = Some(max);
        self
    }
}

/// A single constraint violation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// Required field was empty or absent
    Missing { field: &'static str },
    /// Field exceeded its maximum length
    TooLong { field: &'static str, max: usize },
    /// Field failed its format constraint
    BadFormat { field: &'static str },
}

impl Violation {
    pub fn field(&self) -> &'static str {
        match self {
            Violation::Missing { field }
            | Violation::TooLong { field, .. }
            | Violation::BadFormat { field } => field,
        }
    }
}

/// Validation failure, split by phase
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// One or more required fields were empty; names every missing field.
    /// Reported before any format checking runs.
    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
    /// Structural violations (length, character set, email shape)
    #[error("invalid input: {0:?}")]
    InvalidFormat(Vec<Violation>),
}

/// Validate `payload` against `schema`, returning the normalized
/// (trimmed) payload on success.
pub fn validate(
    schema: &[FieldSchema],
    payload: &HashMap<String, String>,
) -> Result<HashMap<&'static str, String>, ValidationError> {
    // Phase 1: presence, all missing fields at once
    let missing: Vec<&'static str> = schema
        .iter()
        .filter(|f| f.required)
        .filter(|f| {
            payload
                .get(f.name)
                .map(|v| v.trim().is_empty())
                .unwrap_or(true)
        })
        .map(|f| f.name)
        .collect();

    if !missing.is_empty() {
        return Err(ValidationError::MissingFields(missing));
    }

    // Phase 2: format
    let mut violations = Vec::new();
    let mut normalized = HashMap::new();

    for field in schema {
        let value = match payload.get(field.name) {
            Some(v) => v.trim(),
            None => continue, // optional and absent
        };
        if value.is_empty() {
            continue;
        }

        if let Some(max) = field.max_len {
            if value.chars().count() > max {
                violations.push(Violation::TooLong {
                    field: field.name,
                    max,
                });
                continue;
            }
        }

        let format_ok = match field.format {
            Format::Text => true,
            Format::Alphanumeric => ALPHANUMERIC_RE.is_match(value),
            Format::Email => EMAIL_RE.is_match(value),
        };
        if !format_ok {
            violations.push(Violation::BadFormat { field: field.name });
            continue;
        }

        normalized.insert(field.name, value.to_string());
    }

    if violations.is_empty() {
        Ok(normalized)
    } else {
        Err(ValidationError::InvalidFormat(violations))
    }
}
