use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::value::Value;

/// Opaque identifier of a matter.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatterId(String);

impl MatterId {
    /// Generate a new random matter ID.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// The raw identifier text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// At most the first eight characters, for compact listings.
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(8) {
            Some((idx, _)) => &self.0[..idx],
            None => &self.0,
        }
    }
}

impl fmt::Display for MatterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MatterId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for MatterId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&MatterId> for MatterId {
    fn from(id: &MatterId) -> Self {
        id.clone()
    }
}

/// One entity in the store.
///
/// A `Matter` only knows its own overrides. Reads that fall through to the
/// parent chain live on [`MatterRef`](crate::resolve::MatterRef), which pairs
/// a matter with the store that holds its ancestors.
///
/// Detached matters built with [`Matter::new`] are meant for bulk loading
/// through [`MattersStore::load`](crate::store::MattersStore::load); once a
/// matter is in a store every change goes through the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matter {
    pub(crate) id: MatterId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) inherites: Option<MatterId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) owner: Option<MatterId>,
    #[serde(default)]
    pub(crate) dependents: usize,
    #[serde(default)]
    pub(crate) properties: BTreeMap<String, Value>,
}

impl Matter {
    /// Create a detached matter with no parent, owner, or overrides.
    pub fn new(id: impl Into<MatterId>) -> Self {
        Self {
            id: id.into(),
            inherites: None,
            owner: None,
            dependents: 0,
            properties: BTreeMap::new(),
        }
    }

    /// Set the parent this matter inherits from.
    pub fn with_parent(mut self, parent: impl Into<MatterId>) -> Self {
        self.inherites = Some(parent.into());
        self
    }

    /// Set the matter that composes this one.
    pub fn with_owner(mut self, owner: impl Into<MatterId>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// Add an own override.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Unique identifier for this matter.
    pub fn id(&self) -> &MatterId {
        &self.id
    }

    /// The parent this matter inherits from, if any.
    pub fn inherites(&self) -> Option<&MatterId> {
        self.inherites.as_ref()
    }

    /// The matter that composes this one, if any.
    pub fn owner(&self) -> Option<&MatterId> {
        self.owner.as_ref()
    }

    /// How many links across the store point at this matter.
    pub fn dependents(&self) -> usize {
        self.dependents
    }

    /// The own overrides, ordered by key.
    pub fn properties(&self) -> &BTreeMap<String, Value> {
        &self.properties
    }

    /// The own override for `key`, without consulting the parent chain.
    pub fn own(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// True iff this matter defines its own value for `key`.
    pub fn is_overrided(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    /// Own keys in order.
    pub fn own_keys(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    /// Own link overrides as `(key, target)` pairs.
    pub fn own_links(&self) -> impl Iterator<Item = (&str, &MatterId)> {
        self.properties
            .iter()
            .filter_map(|(k, v)| v.as_link().map(|id| (k.as_str(), id)))
    }

    /// How many own links point at `target`.
    pub fn links_to(&self, target: &MatterId) -> usize {
        self.own_links().filter(|(_, id)| *id == target).count()
    }
}
