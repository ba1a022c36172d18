use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{MatterError, MatterResult};
use crate::matter::MatterId;

/// Reserved marker that distinguishes a link from a plain string on the wire.
///
/// `"@@a1b2"` decodes to `Value::Link("a1b2")`.
pub const LINK_PREFIX: &str = "@@";

/// A property value stored on a matter.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    /// A text value.
    String(String),
    /// A finite 64-bit floating-point value.
    Number(f64),
    /// A boolean value.
    Boolean(bool),
    /// No value.
    #[default]
    Null,
    /// A reference to another matter.
    Link(MatterId),
}

/// The tag of a [`Value`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// See [`Value::String`].
    String,
    /// See [`Value::Number`].
    Number,
    /// See [`Value::Boolean`].
    Boolean,
    /// See [`Value::Null`].
    Null,
    /// See [`Value::Link`].
    Link,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Null => "null",
            Self::Link => "link",
        };
        f.write_str(name)
    }
}

impl Value {
    /// Build a link to the given matter.
    pub fn link(target: impl Into<MatterId>) -> Self {
        Self::Link(target.into())
    }

    /// Decode a wire string: prefixed strings become links.
    pub fn from_wire(s: &str) -> Self {
        match s.strip_prefix(LINK_PREFIX) {
            Some(id) => Self::Link(MatterId::from(id)),
            None => Self::String(s.to_string()),
        }
    }

    /// The tag of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::String(_) => ValueKind::String,
            Self::Number(_) => ValueKind::Number,
            Self::Boolean(_) => ValueKind::Boolean,
            Self::Null => ValueKind::Null,
            Self::Link(_) => ValueKind::Link,
        }
    }

    /// Returns true for `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns true for `Link`.
    pub fn is_link(&self) -> bool {
        matches!(self, Self::Link(_))
    }

    /// The link target, if this is a link.
    pub fn as_link(&self) -> Option<&MatterId> {
        match self {
            Self::Link(id) => Some(id),
            _ => None,
        }
    }

    /// The text, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// The number, if this is a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The flag, if this is a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Convert a scalar to another scalar kind.
    ///
    /// Returns `None` when the conversion would lose meaning (`"abc"` as a
    /// number, `2` as a boolean). `Null` converts to every kind, links only
    /// to themselves.
    pub fn coerce_to(&self, kind: ValueKind) -> Option<Value> {
        if self.kind() == kind || self.is_null() {
            return Some(self.clone());
        }
        match (self, kind) {
            (Self::String(s), ValueKind::Number) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(Self::Number),
            (Self::String(s), ValueKind::Boolean) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Some(Self::Boolean(true)),
                "false" => Some(Self::Boolean(false)),
                _ => None,
            },
            (Self::Boolean(b), ValueKind::Number) => Some(Self::Number(if *b { 1.0 } else { 0.0 })),
            (Self::Number(n), ValueKind::Boolean) if *n == 0.0 => Some(Self::Boolean(false)),
            (Self::Number(n), ValueKind::Boolean) if *n == 1.0 => Some(Self::Boolean(true)),
            (Self::Number(_) | Self::Boolean(_), ValueKind::String) => {
                Some(Self::String(self.to_string()))
            }
            _ => None,
        }
    }

    /// Reject values that cannot be stored under `key`.
    pub(crate) fn check(&self, key: &str) -> MatterResult<()> {
        match self {
            Self::Number(n) if !n.is_finite() => {
                Err(MatterError::invalid(key, format!("number {n} is not finite")))
            }
            Self::String(s) if s.starts_with(LINK_PREFIX) => Err(MatterError::invalid(
                key,
                format!("string starts with the reserved link prefix \"{LINK_PREFIX}\""),
            )),
            Self::Link(id) if id.as_str().is_empty() => {
                Err(MatterError::invalid(key, "link target id is empty"))
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{s}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Null => write!(f, "null"),
            Self::Link(id) => write!(f, "→ {id}"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::String(s) => serializer.serialize_str(s),
            Self::Number(n) => serializer.serialize_f64(*n),
            Self::Boolean(b) => serializer.serialize_bool(*b),
            Self::Null => serializer.serialize_unit(),
            Self::Link(id) => serializer.serialize_str(&format!("{LINK_PREFIX}{id}")),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string, number, boolean, null, or prefixed link")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Value, E> {
        Ok(Value::from_wire(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Value, E> {
        Ok(Value::Number(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value, E> {
        Ok(Value::Number(v as f64))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
        Ok(Value::Number(v as f64))
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Boolean(v))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }
}
