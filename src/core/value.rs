//! Property values as stored in the content repository.
//!
//! A [`Property`] is either single- or multi-valued; the cardinality is part of
//! the stored property, not of the individual [`Value`]s. Derivation functions
//! only ever see flat `Vec<Value>` lists keyed by parameter name
//! ([`Parameters`]).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Parameter map exchanged with derivation functions.
///
/// Ordered so that logging and persistence iterate deterministically.
pub type Parameters = BTreeMap<String, Vec<Value>>;

/// A single typed value.
///
/// Doubles compare bitwise, so a stored `NaN` equals itself and rewriting it
/// is detected as a no-op.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    /// UTF-8 string
    String(String),
    /// 64-bit signed integer
    Long(i64),
    /// 64-bit float
    Double(f64),
    /// Boolean flag
    Boolean(bool),
    /// Point in time
    Date(DateTime<Utc>),
    /// Hard reference to a referenceable node
    Reference(Uuid),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Long(a), Self::Long(b)) => a == b,
            (Self::Double(a), Self::Double(b)) => a.to_bits() == b.to_bits(),
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Date(a), Self::Date(b)) => a == b,
            (Self::Reference(a), Self::Reference(b)) => a == b,
            _ => false,
        }
    }
}

impl Value {
    /// Build a string value.
    pub fn string(value: impl Into<String>) -> Self {
        Self::String(value.into())
    }

    /// The value rendered as a string, the way the repository coerces values.
    #[must_use]
    pub fn as_string(&self) -> String {
        match self {
            Self::String(s) => s.clone(),
            Self::Long(n) => n.to_string(),
            Self::Double(d) => d.to_string(),
            Self::Boolean(b) => b.to_string(),
            Self::Date(d) => d.to_rfc3339(),
            Self::Reference(id) => id.to_string(),
        }
    }

    /// The referenced identifier, if this is a reference value.
    #[must_use]
    pub const fn as_reference(&self) -> Option<Uuid> {
        match self {
            Self::Reference(id) => Some(*id),
            _ => None,
        }
    }

    /// Coerce to a boolean; strings `"true"`/`"false"` are accepted.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            Self::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Short type name used in log output.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::String(_) => "String",
            Self::Long(_) => "Long",
            Self::Double(_) => "Double",
            Self::Boolean(_) => "Boolean",
            Self::Date(_) => "Date",
            Self::Reference(_) => "Reference",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_string())
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Long(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<Uuid> for Value {
    fn from(value: Uuid) -> Self {
        Self::Reference(value)
    }
}

/// Stored cardinality plus value(s) of a property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    /// Single-valued property
    Single(Value),
    /// Multi-valued property, possibly empty
    Multi(Vec<Value>),
}

impl PropertyValue {
    /// Whether the property is multi-valued.
    #[must_use]
    pub const fn is_multiple(&self) -> bool {
        matches!(self, Self::Multi(_))
    }

    /// All values as a list (one element for single-valued properties).
    #[must_use]
    pub fn values(&self) -> Vec<Value> {
        match self {
            Self::Single(value) => vec![value.clone()],
            Self::Multi(values) => values.clone(),
        }
    }

    /// The single value, or the first of a multi-valued property.
    #[must_use]
    pub fn first(&self) -> Option<&Value> {
        match self {
            Self::Single(value) => Some(value),
            Self::Multi(values) => values.first(),
        }
    }
}

/// A named property value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    /// Property name, e.g. `hippo:related`
    pub name: String,
    /// Stored value(s)
    pub value: PropertyValue,
}

impl Property {
    /// Create a property.
    pub fn new(name: impl Into<String>, value: PropertyValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    /// Whether the property is multi-valued.
    #[must_use]
    pub const fn is_multiple(&self) -> bool {
        self.value.is_multiple()
    }

    /// All values as a list.
    #[must_use]
    pub fn values(&self) -> Vec<Value> {
        self.value.values()
    }

    /// The string form of the first value.
    #[must_use]
    pub fn string(&self) -> Option<String> {
        self.value.first().map(Value::as_string)
    }
}
