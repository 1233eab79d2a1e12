//! Serde helpers, date parsing and pagination shared by the entity modules

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer};
use uuid::Uuid;

use crate::validation::Violations;

/// Largest page size a client may request
pub const MAX_PAGE_SIZE: u32 = 100;

/// Distinguishes an absent field from an explicit `null`
///
/// Used with `#[serde(default, deserialize_with = "deserialize_some")]` on
/// `Option<Option<T>>` fields: absent stays `None`, `null` becomes
/// `Some(None)` and a value becomes `Some(Some(v))`.
pub fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

/// Parses an RFC 3339 timestamp or a plain `YYYY-MM-DD` date (midnight UTC)
pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Parses an optional date field, recording a violation when malformed
pub fn parse_date_field(
    violations: &mut Violations,
    field: &str,
    raw: Option<&str>,
) -> Option<DateTime<Utc>> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
    let parsed = parse_datetime(raw);
    if parsed.is_none() {
        violations.push(
            field,
            format!("'{}' is not a valid date (expected RFC 3339 or YYYY-MM-DD)", raw),
        );
    }
    parsed
}

/// Parses an optional user reference, recording a violation when malformed
pub fn parse_user_ref(violations: &mut Violations, field: &str, raw: Option<&str>) -> Option<Uuid> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
    match Uuid::parse_str(raw) {
        Ok(id) => Some(id),
        Err(_) => {
            violations.push(field, format!("'{}' is not a valid user id", raw));
            None
        }
    }
}

/// Parses a list of user references, dropping duplicates
pub fn parse_user_refs(violations: &mut Violations, field: &str, raw: &[String]) -> Vec<Uuid> {
    let mut ids = Vec::with_capacity(raw.len());
    for value in raw {
        if let Some(id) = parse_user_ref(violations, field, Some(value)) {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
    }
    ids
}

/// 1-based page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u32,
    pub limit: u32,
}

impl Page {
    pub fn new(page: u32, limit: u32) -> Self {
        Self { page, limit }
    }

    /// Parses `page`/`limit` query values, falling back to page 1 and `default_limit`
    pub fn parse(
        violations: &mut Violations,
        page: Option<&str>,
        limit: Option<&str>,
        default_limit: u32,
    ) -> Self {
        let page = match violations.parse_number::<u32>("page", page) {
            Some(0) => {
                violations.push("page", "Page must be at least 1");
                1
            }
            Some(p) => p,
            None => 1,
        };

        let limit = match violations.parse_number::<u32>("limit", limit) {
            Some(l) if (1..=MAX_PAGE_SIZE).contains(&l) => l,
            Some(_) => {
                violations.push(
                    "limit",
                    format!("Limit must be between 1 and {}", MAX_PAGE_SIZE),
                );
                default_limit
            }
            None => default_limit,
        };

        Self { page, limit }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }

    /// `ceil(total / limit)`
    pub fn total_pages(&self, total: i64) -> i64 {
        if total <= 0 || self.limit == 0 {
            return 0;
        }
        let limit = i64::from(self.limit);
        (total + limit - 1) / limit
    }
}
