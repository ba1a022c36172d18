//! Configuration for a matters store.

use serde::{Deserialize, Serialize};

/// What removing an owner does to the matters it composes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositionPolicy {
    /// Owned matters are removed with their owner.
    #[default]
    Cascade,
    /// An owner cannot be removed while it owns anything.
    Block,
}

/// Configuration for a [`MattersStore`](crate::store::MattersStore).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Behavior of `remove` on owners.
    pub composition: CompositionPolicy,
    /// Coerce or reject writes whose kind differs from the inherited value.
    pub strict_types: bool,
    /// Upper bound on inheritance chain length during resolution.
    pub max_chain_depth: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            composition: CompositionPolicy::Cascade,
            strict_types: false,
            max_chain_depth: 256,
        }
    }
}

impl StoreConfig {
    /// Set the composition policy.
    pub fn with_composition(mut self, policy: CompositionPolicy) -> Self {
        self.composition = policy;
        self
    }

    /// Enable or disable strict typing against inherited values.
    pub fn with_strict_types(mut self, strict: bool) -> Self {
        self.strict_types = strict;
        self
    }

    /// Set the maximum inheritance chain length (at least 1).
    pub fn with_max_chain_depth(mut self, depth: usize) -> Self {
        self.max_chain_depth = depth.max(1);
        self
    }
}
