use regex::Regex;

use crate::value::Value;

/// A predicate over a resolved property value.
///
/// String matchers also test a link's target id, so `Prefix("tex_")` finds
/// both `"tex_wood"` and `@@tex_wood`.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// The value equals this one exactly.
    Exact(Value),
    /// The value equals any of these.
    OneOf(Vec<Value>),
    /// The text starts with this prefix.
    Prefix(String),
    /// The text matches this regular expression.
    Pattern(Regex),
}

impl Matcher {
    /// Exact match on a value.
    pub fn exact(value: impl Into<Value>) -> Self {
        Self::Exact(value.into())
    }

    /// Compile a regular-expression matcher.
    pub fn pattern(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(pattern).map(Self::Pattern)
    }

    /// Test a value.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Self::Exact(expected) => value == expected,
            Self::OneOf(options) => options.contains(value),
            Self::Prefix(prefix) => text_of(value).is_some_and(|s| s.starts_with(prefix.as_str())),
            Self::Pattern(re) => text_of(value).is_some_and(|s| re.is_match(s)),
        }
    }
}

impl From<Value> for Matcher {
    fn from(value: Value) -> Self {
        Self::Exact(value)
    }
}

impl From<&str> for Matcher {
    fn from(s: &str) -> Self {
        Self::Exact(Value::from(s))
    }
}

fn text_of(value: &Value) -> Option<&str> {
    match value {
        Value::String(s) => Some(s),
        Value::Link(id) => Some(id.as_str()),
        _ => None,
    }
}
