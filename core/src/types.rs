//! Record, constraint and page types for the record store's data API.
//!
//! # Design
//! The store is schema-less from the client's point of view. A `Record`
//! carries the four system fields every record has and flattens the
//! caller's own fields in as `F`, which defaults to an open JSON map. Callers
//! with a known schema plug in their own `Deserialize` struct instead.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;

/// Records returned per list request. Cursors are multiples of this.
pub const PAGE_SIZE: u64 = 100;

/// Field names the record store assigns itself.
pub const SYSTEM_FIELDS: [&str; 4] = ["_id", "Created By", "Created Date", "Modified Date"];

/// Schema-less caller fields.
pub type Fields = serde_json::Map<String, Value>;

/// One item of a record type's collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Record<F = Fields> {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "Created By", default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(rename = "Created Date")]
    pub created_date: DateTime<Utc>,
    #[serde(rename = "Modified Date")]
    pub modified_date: DateTime<Utc>,
    #[serde(flatten)]
    pub fields: F,
}

/// Comparison applied by the record store when filtering a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "equals")]
    Equals,
    #[serde(rename = "not equal")]
    NotEqual,
    #[serde(rename = "is_empty")]
    IsEmpty,
    #[serde(rename = "is_not_empty")]
    IsNotEmpty,
    #[serde(rename = "text contains")]
    TextContains,
    #[serde(rename = "not text contains")]
    NotTextContains,
    #[serde(rename = "greater than")]
    GreaterThan,
    #[serde(rename = "less than")]
    LessThan,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "not in")]
    NotIn,
    #[serde(rename = "contains")]
    Contains,
    #[serde(rename = "not contains")]
    NotContains,
    #[serde(rename = "empty")]
    Empty,
    #[serde(rename = "not empty")]
    NotEmpty,
    #[serde(rename = "geographic_search")]
    GeographicSearch,
}

impl Operator {
    /// Emptiness checks take no value.
    pub fn is_unary(self) -> bool {
        matches!(
            self,
            Operator::IsEmpty | Operator::IsNotEmpty | Operator::Empty | Operator::NotEmpty
        )
    }
}

/// A single filter on a list request. Constraints are ANDed by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    key: String,
    constraint_type: Operator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<Value>,
}

impl Constraint {
    /// Build a constraint, checking that the value matches the operator's
    /// arity.
    pub fn new(
        key: impl Into<String>,
        operator: Operator,
        value: Option<Value>,
    ) -> Result<Self, ApiError> {
        let key = key.into();
        if key.is_empty() {
            return Err(ApiError::InvalidConstraint {
                key,
                reason: "field name is empty".to_string(),
            });
        }
        match (operator.is_unary(), &value) {
            (true, Some(_)) => Err(ApiError::InvalidConstraint {
                key,
                reason: format!("{operator:?} takes no value"),
            }),
            (false, None) => Err(ApiError::InvalidConstraint {
                key,
                reason: format!("{operator:?} requires a value"),
            }),
            _ => Ok(Self {
                key,
                constraint_type: operator,
                value,
            }),
        }
    }

    pub fn equals(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            constraint_type: Operator::Equals,
            value: Some(value.into()),
        }
    }

    /// An emptiness check. Fails for operators that need a value.
    pub fn unary(key: impl Into<String>, operator: Operator) -> Result<Self, ApiError> {
        Self::new(key, operator, None)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn operator(&self) -> Operator {
        self.constraint_type
    }

    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }
}

/// One list response.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<F = Fields> {
    pub results: Vec<Record<F>>,
    pub count: u64,
    pub remaining: u64,
}

impl<F> Page<F> {
    /// Records matching the query as seen by this response.
    ///
    /// Both figures come from the store, so a sum past `u64::MAX` is treated
    /// as an undecodable response.
    pub fn total(&self) -> Result<u64, ApiError> {
        self.count.checked_add(self.remaining).ok_or_else(|| {
            ApiError::Deserialization(format!(
                "count {} + remaining {} overflows",
                self.count, self.remaining
            ))
        })
    }
}

/// Wire envelope around a `Page`.
#[derive(Debug, Deserialize)]
pub(crate) struct ListEnvelope<F> {
    pub response: Page<F>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreatedRecord {
    pub id: String,
}
