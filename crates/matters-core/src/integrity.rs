//! Bulk loading and integrity auditing.

use std::collections::HashSet;
use std::fmt;

use tracing::{debug, info};

use crate::config::StoreConfig;
use crate::error::{Conflict, MatterError, MatterResult};
use crate::matter::{Matter, MatterId};
use crate::store::MattersStore;

/// A broken invariant found by [`MattersStore::verify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityIssue {
    /// `inherites` names a matter that does not exist.
    MissingParent {
        /// The inheriting matter.
        id: MatterId,
        /// The missing parent.
        parent: MatterId,
    },
    /// `owner` names a matter that does not exist.
    MissingOwner {
        /// The owned matter.
        id: MatterId,
        /// The missing owner.
        owner: MatterId,
    },
    /// A link points at a matter that does not exist.
    DanglingLink {
        /// The matter holding the link.
        id: MatterId,
        /// The field key.
        key: String,
        /// The missing target.
        target: MatterId,
    },
    /// The matter's parent chain loops back on itself.
    InheritanceCycle {
        /// A matter on the loop.
        id: MatterId,
    },
    /// The matter's owner chain loops back on itself.
    OwnershipCycle {
        /// A matter on the loop.
        id: MatterId,
    },
    /// The stored dependents count disagrees with the links in the store.
    DependentsDrift {
        /// The miscounted matter.
        id: MatterId,
        /// The count the matter holds.
        recorded: usize,
        /// The count derived from links.
        actual: usize,
    },
}

impl fmt::Display for IntegrityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingParent { id, parent } => write!(f, "{id}: parent {parent} does not exist"),
            Self::MissingOwner { id, owner } => write!(f, "{id}: owner {owner} does not exist"),
            Self::DanglingLink { id, key, target } => {
                write!(f, "{id}.{key}: link target {target} does not exist")
            }
            Self::InheritanceCycle { id } => write!(f, "{id}: inheritance chain loops"),
            Self::OwnershipCycle { id } => write!(f, "{id}: ownership chain loops"),
            Self::DependentsDrift {
                id,
                recorded,
                actual,
            } => write!(f, "{id}: records {recorded} dependents but {actual} links point here"),
        }
    }
}

impl MattersStore {
    /// Build a store from a complete set of matters with the default config.
    ///
    /// See [`MattersStore::load_with_config`].
    pub fn load(matters: Vec<Matter>) -> MatterResult<Self> {
        Self::load_with_config(StoreConfig::default(), matters)
    }

    /// Build a store from a complete set of matters.
    ///
    /// Matters may reference each other in any order; validation runs once
    /// the whole set is present. Incoming `dependents` values are ignored and
    /// recounted from the links.
    pub fn load_with_config(config: StoreConfig, matters: Vec<Matter>) -> MatterResult<Self> {
        let mut ids: HashSet<&MatterId> = HashSet::new();
        for matter in &matters {
            if !ids.insert(&matter.id) {
                return Err(MatterError::invalid("id", format!("duplicate matter id {}", matter.id)));
            }
            for (key, value) in &matter.properties {
                value.check(key)?;
            }
        }

        let store = Self::assemble(config, matters);
        if let Some(issue) = store.verify().into_iter().next() {
            debug!(%issue, "bulk load rejected");
            return Err(issue.into_error());
        }
        info!(matters = store.len(), "loaded matters");
        Ok(store)
    }

    /// Audit every invariant. An empty result means the store is consistent.
    ///
    /// Issues are ordered by matter id.
    pub fn verify(&self) -> Vec<IntegrityIssue> {
        let counts = self.count_links();
        let mut issues = Vec::new();

        for id in self.ids() {
            let Some(matter) = self.raw(id) else {
                continue;
            };

            if let Some(parent) = &matter.inherites
                && !self.contains(parent)
            {
                issues.push(IntegrityIssue::MissingParent {
                    id: id.clone(),
                    parent: parent.clone(),
                });
            }
            if let Some(owner) = &matter.owner
                && !self.contains(owner)
            {
                issues.push(IntegrityIssue::MissingOwner {
                    id: id.clone(),
                    owner: owner.clone(),
                });
            }
            for (key, target) in matter.own_links() {
                if !self.contains(target) {
                    issues.push(IntegrityIssue::DanglingLink {
                        id: id.clone(),
                        key: key.to_string(),
                        target: target.clone(),
                    });
                }
            }
            if loops(id, |m| self.raw(m).and_then(|m| m.inherites.as_ref())) {
                issues.push(IntegrityIssue::InheritanceCycle { id: id.clone() });
            }
            if loops(id, |m| self.raw(m).and_then(|m| m.owner.as_ref())) {
                issues.push(IntegrityIssue::OwnershipCycle { id: id.clone() });
            }

            let actual = counts.get(id).copied().unwrap_or(0);
            if matter.dependents != actual {
                issues.push(IntegrityIssue::DependentsDrift {
                    id: id.clone(),
                    recorded: matter.dependents,
                    actual,
                });
            }
        }
        issues
    }
}

impl IntegrityIssue {
    fn into_error(self) -> MatterError {
        match self {
            Self::MissingParent { parent, .. } => MatterError::NotFound(parent),
            Self::MissingOwner { owner, .. } => MatterError::NotFound(owner),
            Self::DanglingLink { target, .. } => MatterError::NotFound(target),
            Self::InheritanceCycle { id } => MatterError::Conflict {
                id,
                conflict: Conflict::InheritanceCycle,
            },
            Self::OwnershipCycle { id } => MatterError::Conflict {
                id,
                conflict: Conflict::OwnershipCycle,
            },
            Self::DependentsDrift { id, actual, .. } => MatterError::Conflict {
                id,
                conflict: Conflict::Dependents(actual),
            },
        }
    }
}

/// True if following `next` from `start` comes back to `start`.
fn loops<'a>(start: &'a MatterId, next: impl Fn(&'a MatterId) -> Option<&'a MatterId>) -> bool {
    let mut seen: HashSet<&MatterId> = HashSet::new();
    let mut cursor = next(start);
    while let Some(id) = cursor {
        if id == start {
            return true;
        }
        if !seen.insert(id) {
            // A loop further up the chain; reported on its own members.
            return false;
        }
        cursor = next(id);
    }
    false
}
