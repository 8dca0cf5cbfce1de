//! Filter predicates and pagination

use crate::document::Document;
use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which side of a numeric range a bound constrains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeBound {
    /// `field >= value`
    Min,
    /// `field <= value`
    Max,
}

/// A single filter condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Predicate {
    /// `field = value`
    Exact { field: String, value: Value },

    /// Case-insensitive substring match on a string field
    Contains { field: String, value: String },

    /// Numeric range bound
    Range {
        field: String,
        bound: RangeBound,
        value: f64,
    },
}

impl Predicate {
    pub fn exact(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Exact {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn contains(field: impl Into<String>, value: impl Into<String>) -> Self {
        Predicate::Contains {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn min(field: impl Into<String>, value: f64) -> Self {
        Predicate::Range {
            field: field.into(),
            bound: RangeBound::Min,
            value,
        }
    }

    pub fn max(field: impl Into<String>, value: f64) -> Self {
        Predicate::Range {
            field: field.into(),
            bound: RangeBound::Max,
            value,
        }
    }

    pub fn field(&self) -> &str {
        match self {
            Predicate::Exact { field, .. }
            | Predicate::Contains { field, .. }
            | Predicate::Range { field, .. } => field,
        }
    }

    /// The value bound as this predicate's parameter
    pub fn parameter_value(&self) -> Value {
        match self {
            Predicate::Exact { value, .. } => value.clone(),
            Predicate::Contains { value, .. } => Value::String(value.clone()),
            Predicate::Range { value, .. } => serde_json::Number::from_f64(*value)
                .map(Value::Number)
                .unwrap_or(Value::Null),
        }
    }

    /// Evaluate this predicate against a document.
    ///
    /// Missing fields never match. Substring matches only apply to string
    /// fields and range bounds only to numeric fields.
    pub fn matches(&self, document: &Document) -> bool {
        let Some(actual) = document.get(self.field()) else {
            return false;
        };

        match self {
            Predicate::Exact { value, .. } => json_equals(actual, value),
            Predicate::Contains { value, .. } => actual
                .as_str()
                .map(|s| s.to_lowercase().contains(&value.to_lowercase()))
                .unwrap_or(false),
            Predicate::Range { bound, value, .. } => match actual.as_f64() {
                Some(n) => match bound {
                    RangeBound::Min => n >= *value,
                    RangeBound::Max => n <= *value,
                },
                None => false,
            },
        }
    }
}

fn json_equals(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => left == right,
    }
}

/// Page-based pagination, translated to `offset = (page - 1) * limit`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    page: u32,
    limit: u32,
}

impl Pagination {
    /// Default page size of list endpoints
    pub const DEFAULT_LIMIT: u32 = 10;

    pub fn new(page: u32, limit: u32) -> Result<Self> {
        if page < 1 {
            return Err(CoreError::InvalidPagination(format!(
                "page must be at least 1, got {}",
                page
            )));
        }
        if limit == 0 {
            return Err(CoreError::InvalidPagination(
                "limit must be greater than 0".to_string(),
            ));
        }
        let pagination = Self { page, limit };
        if pagination.offset() > i64::MAX as u64 {
            return Err(CoreError::InvalidPagination(format!(
                "page {} with limit {} is out of range",
                page, limit
            )));
        }
        Ok(pagination)
    }

    /// The first `limit` results
    pub fn first(limit: u32) -> Result<Self> {
        Self::new(1, limit)
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Always fits an `i64`
    pub fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.limit as u64
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            limit: Self::DEFAULT_LIMIT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        Document::try_from(value).unwrap()
    }

    #[test]
    fn test_exact_match() {
        let d = doc(json!({"jobType": "full-time", "views": 3}));
        assert!(Predicate::exact("jobType", "full-time").matches(&d));
        assert!(!Predicate::exact("jobType", "Full-Time").matches(&d));
        assert!(Predicate::exact("views", 3.0).matches(&d));
        assert!(!Predicate::exact("missing", "x").matches(&d));
    }

    #[test]
    fn test_contains_is_case_insensitive() {
        let d = doc(json!({"title": "Senior Rust Engineer"}));
        assert!(Predicate::contains("title", "rust").matches(&d));
        assert!(Predicate::contains("title", "SENIOR").matches(&d));
        assert!(!Predicate::contains("title", "python").matches(&d));
    }

    #[test]
    fn test_contains_ignores_non_strings() {
        let d = doc(json!({"title": 42}));
        assert!(!Predicate::contains("title", "4").matches(&d));
    }

    #[test]
    fn test_range_bounds() {
        let d = doc(json!({"price": 50}));
        assert!(Predicate::min("price", 50.0).matches(&d));
        assert!(Predicate::max("price", 50.0).matches(&d));
        assert!(!Predicate::min("price", 50.5).matches(&d));
        assert!(!Predicate::max("price", 10.0).matches(&d));
        assert!(!Predicate::min("price", 1.0).matches(&doc(json!({"price": "cheap"}))));
    }

    #[test]
    fn test_pagination_offset() {
        let p = Pagination::new(3, 20).unwrap();
        assert_eq!(p.offset(), 40);
        assert_eq!(Pagination::first(5).unwrap().offset(), 0);
        assert_eq!(Pagination::default().limit(), 10);
    }

    #[test]
    fn test_pagination_rejects_zero() {
        assert!(matches!(
            Pagination::new(0, 10),
            Err(CoreError::InvalidPagination(_))
        ));
        assert!(matches!(
            Pagination::new(1, 0),
            Err(CoreError::InvalidPagination(_))
        ));
    }

    #[test]
    fn test_pagination_offset_must_fit_i64() {
        assert!(matches!(
            Pagination::new(u32::MAX, u32::MAX),
            Err(CoreError::InvalidPagination(_))
        ));

        let largest = Pagination::new(u32::MAX, u32::MAX / 2).unwrap();
        assert!(largest.offset() <= i64::MAX as u64);
    }
}
