//! Store-independent request validation
//!
//! Every write path runs through this module before touching a repository.
//! Structural rules (lengths, ranges, email/url formats) are declared with
//! `validator` derives on the input types in [`crate::models`]; enum
//! membership, numeric query parameters and cross-field rules are checked
//! through a [`Violations`] accumulator so a single response can report every
//! offending field at once.
//!
//! # Example
//!
//! ```
//! use taskhub_shared::models::task::TaskStatus;
//! use taskhub_shared::validation::Violations;
//!
//! let mut violations = Violations::new();
//! let status: Option<TaskStatus> = violations.parse_enum("status", Some("done"));
//!
//! assert!(status.is_none());
//! let errors = violations.finish().unwrap_err();
//! assert_eq!(errors[0].field, "status");
//! ```

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use validator::{Validate, ValidationErrors};

/// A single field-level validation failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Field that failed validation (camelCase, as sent by clients)
    pub field: String,

    /// Human-readable message
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Returned by the `FromStr` impls of the domain enums
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("must be one of: {}", .expected.join(", "))]
pub struct UnknownVariant {
    /// Accepted wire values
    pub expected: &'static [&'static str],
}

/// Accumulates field errors across several checks
#[derive(Debug, Default)]
pub struct Violations {
    errors: Vec<FieldError>,
}

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs the `validator` derive rules of `input` and collects the failures
    pub fn check<T: Validate>(input: &T) -> Self {
        let mut violations = Self::new();
        if let Err(errors) = input.validate() {
            violations.extend_from(&errors);
        }
        violations
    }

    /// Adds every field error from a `validator` result
    pub fn extend_from(&mut self, errors: &ValidationErrors) {
        let mut collected: Vec<FieldError> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                let field = camel_case(field);
                errors.iter().map(move |error| FieldError {
                    field: field.clone(),
                    message: error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value ({})", error.code)),
                })
            })
            .collect();

        // HashMap order is unstable
        collected.sort_by(|a, b| a.field.cmp(&b.field));
        self.errors.extend(collected);
    }

    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, message));
    }

    /// Parses an optional enum value; blank input counts as absent
    pub fn parse_enum<E>(&mut self, field: &str, raw: Option<&str>) -> Option<E>
    where
        E: FromStr<Err = UnknownVariant>,
    {
        let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
        match raw.parse::<E>() {
            Ok(value) => Some(value),
            Err(e) => {
                self.push(field, format!("'{}' is not valid, {}", raw, e));
                None
            }
        }
    }

    /// Parses an optional numeric query parameter; blank input counts as absent
    pub fn parse_number<N: FromStr>(&mut self, field: &str, raw: Option<&str>) -> Option<N> {
        let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
        match raw.parse::<N>() {
            Ok(value) => Some(value),
            Err(_) => {
                self.push(field, format!("'{}' is not a valid number", raw));
                None
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn finish(self) -> Result<(), Vec<FieldError>> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }

    /// Returns `value` when no violation was recorded
    pub fn into_result<T>(self, value: T) -> Result<T, Vec<FieldError>> {
        self.finish().map(|_| value)
    }
}

/// Turns a Rust field name into the camelCase name clients send
fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Trims each tag, drops blanks and duplicates while keeping first-seen order
pub fn normalize_tags(tags: Vec<String>, violations: &mut Violations) -> Vec<String> {
    let mut seen = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_string();
        if tag.is_empty() {
            continue;
        }
        if tag.chars().count() > 30 {
            violations.push("tags", format!("Tag '{}' exceeds 30 characters", tag));
            continue;
        }
        if !seen.contains(&tag) {
            seen.push(tag);
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::task::TaskPriority;

    #[derive(Validate)]
    struct Sample {
        #[validate(length(min = 1, message = "Title is required"))]
        title: String,

        #[validate(range(min = 0.0, message = "Hours cannot be negative"))]
        estimated_hours: Option<f64>,
    }

    #[test]
    fn test_check_collects_camel_case_fields() {
        let violations = Violations::check(&Sample {
            title: String::new(),
            estimated_hours: Some(-1.0),
        });

        let errors = violations.finish().unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].field, "estimatedHours");
        assert_eq!(errors[0].message, "Hours cannot be negative");
        assert_eq!(errors[1].field, "title");
    }

    #[test]
    fn test_check_passes_valid_input() {
        let violations = Violations::check(&Sample {
            title: "Write docs".to_string(),
            estimated_hours: None,
        });
        assert!(violations.is_empty());
    }

    #[test]
    fn test_parse_enum() {
        let mut violations = Violations::new();

        let high: Option<TaskPriority> = violations.parse_enum("priority", Some("high"));
        assert_eq!(high, Some(TaskPriority::High));

        let blank: Option<TaskPriority> = violations.parse_enum("priority", Some("  "));
        assert!(blank.is_none());
        assert!(violations.is_empty());

        let bad: Option<TaskPriority> = violations.parse_enum("priority", Some("critical"));
        assert!(bad.is_none());

        let errors = violations.finish().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("low, medium, high, urgent"));
    }

    #[test]
    fn test_parse_number() {
        let mut violations = Violations::new();
        assert_eq!(violations.parse_number::<u32>("page", Some("3")), Some(3));
        assert_eq!(violations.parse_number::<u32>("page", None), None);
        assert_eq!(violations.parse_number::<u32>("limit", Some("ten")), None);

        let errors = violations.finish().unwrap_err();
        assert_eq!(errors[0].field, "limit");
    }

    #[test]
    fn test_camel_case() {
        assert_eq!(camel_case("assigned_to"), "assignedTo");
        assert_eq!(camel_case("title"), "title");
        assert_eq!(camel_case("firstName"), "firstName");
    }

    #[test]
    fn test_normalize_tags() {
        let mut violations = Violations::new();
        let tags = normalize_tags(
            vec![
                " backend ".to_string(),
                "".to_string(),
                "api".to_string(),
                "backend".to_string(),
            ],
            &mut violations,
        );

        assert_eq!(tags, vec!["backend".to_string(), "api".to_string()]);
        assert!(violations.is_empty());

        normalize_tags(vec!["x".repeat(31)], &mut violations);
        assert!(!violations.is_empty());
    }
}
