//! Inheritance-chain resolution.
//!
//! A property that a matter does not override falls through to its parent,
//! then the parent's parent, and so on. Every walk here is bounded by the
//! store's `max_chain_depth` and stops at the first repeated id, so a
//! corrupted chain degrades to "not found" instead of looping.

use std::collections::HashSet;
use std::ops::Deref;

use tracing::{trace, warn};

use crate::matcher::Matcher;
use crate::matter::{Matter, MatterId};
use crate::store::MattersStore;
use crate::value::Value;

/// Where a resolved value comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provenance {
    /// The matter overrides the key itself.
    Own,
    /// The nearest ancestor defining the key.
    Inherited {
        /// The ancestor that supplies the value.
        from: MatterId,
    },
    /// Neither the matter nor any ancestor defines the key.
    Absent,
}

/// One row of a matter's effective property set.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedField<'s> {
    /// Property key.
    pub key: &'s str,
    /// Effective value.
    pub value: &'s Value,
    /// Own or inherited (never `Absent`).
    pub provenance: Provenance,
}

impl ResolvedField<'_> {
    /// True when the value is supplied by an ancestor.
    pub fn is_inherited(&self) -> bool {
        matches!(self.provenance, Provenance::Inherited { .. })
    }
}

/// A matter borrowed together with the store holding its ancestors.
///
/// Dereferences to [`Matter`] for own-only reads.
#[derive(Debug, Clone, Copy)]
pub struct MatterRef<'s> {
    store: &'s MattersStore,
    matter: &'s Matter,
}

impl Deref for MatterRef<'_> {
    type Target = Matter;

    fn deref(&self) -> &Matter {
        self.matter
    }
}

impl<'s> MatterRef<'s> {
    pub(crate) fn new(store: &'s MattersStore, matter: &'s Matter) -> Self {
        Self { store, matter }
    }

    /// The underlying matter, with the store's lifetime.
    pub fn matter(&self) -> &'s Matter {
        self.matter
    }

    /// Effective value of `key`, or `Null` when nothing defines it.
    pub fn get(&self, key: &str) -> Value {
        self.value(key).cloned().unwrap_or_default()
    }

    /// Effective value of `key` by reference.
    pub fn value(&self, key: &str) -> Option<&'s Value> {
        self.lookup(key).map(|(value, _)| value)
    }

    /// Effective value of `key` and the matter that defines it.
    pub fn lookup(&self, key: &str) -> Option<(&'s Value, MatterRef<'s>)> {
        if let Some(value) = self.matter.properties.get(key) {
            return Some((value, *self));
        }
        self.ancestors()
            .find_map(|a| a.matter.properties.get(key).map(|v| (v, a)))
    }

    /// The matter that defines `key` for this one, if any.
    pub fn defined_by(&self, key: &str) -> Option<MatterRef<'s>> {
        self.lookup(key).map(|(_, m)| m)
    }

    /// Own, inherited, or absent.
    pub fn provenance(&self, key: &str) -> Provenance {
        match self.lookup(key) {
            Some((_, m)) if m.id == self.matter.id => Provenance::Own,
            Some((_, m)) => Provenance::Inherited { from: m.id.clone() },
            None => Provenance::Absent,
        }
    }

    /// True iff there is no own entry for `key` and an ancestor defines it.
    pub fn is_inherited(&self, key: &str) -> bool {
        !self.matter.is_overrided(key) && self.ancestors().any(|a| a.is_overrided(key))
    }

    /// Test the effective value of `key`, wherever it is defined.
    pub fn inherited_equals(&self, key: &str, matcher: &Matcher) -> bool {
        matcher.matches(&self.get(key))
    }

    /// Parent chain, nearest first.
    pub fn ancestors(&self) -> Ancestors<'s> {
        Ancestors::starting_after(self.store, self.matter)
    }

    /// The parent matter, if it exists.
    pub fn parent(&self) -> Option<MatterRef<'s>> {
        self.matter
            .inherites
            .as_ref()
            .and_then(|id| self.store.get(id))
    }

    /// The owning matter, if it exists.
    pub fn owner_matter(&self) -> Option<MatterRef<'s>> {
        self.matter.owner.as_ref().and_then(|id| self.store.get(id))
    }

    /// Own keys merged with every ancestor's keys, each with its provenance.
    ///
    /// Ordered by key. Nearer definitions shadow farther ones.
    pub fn resolved_fields(&self) -> Vec<ResolvedField<'s>> {
        let mut fields: Vec<ResolvedField<'s>> = self
            .matter
            .properties
            .iter()
            .map(|(key, value)| ResolvedField {
                key: key.as_str(),
                value,
                provenance: Provenance::Own,
            })
            .collect();

        for ancestor in self.ancestors() {
            for (key, value) in &ancestor.matter.properties {
                if fields.iter().all(|f| f.key != key.as_str()) {
                    fields.push(ResolvedField {
                        key: key.as_str(),
                        value,
                        provenance: Provenance::Inherited {
                            from: ancestor.matter.id.clone(),
                        },
                    });
                }
            }
        }

        fields.sort_by(|a, b| a.key.cmp(b.key));
        fields
    }
}

/// Iterator over a parent chain. Stops on a missing parent, a repeated id,
/// or the configured depth limit.
pub struct Ancestors<'s> {
    store: &'s MattersStore,
    next: Option<&'s MatterId>,
    seen: HashSet<&'s MatterId>,
    remaining: usize,
}

impl<'s> Ancestors<'s> {
    fn starting_after(store: &'s MattersStore, matter: &'s Matter) -> Self {
        let mut seen = HashSet::new();
        seen.insert(&matter.id);
        Self {
            store,
            next: matter.inherites.as_ref(),
            seen,
            remaining: store.config().max_chain_depth,
        }
    }

    /// Walk the chain starting at `first` itself.
    pub(crate) fn starting_at(store: &'s MattersStore, first: Option<&MatterId>) -> Self {
        Self {
            store,
            next: first.and_then(|id| store.raw(id)).map(|m| &m.id),
            seen: HashSet::new(),
            remaining: store.config().max_chain_depth,
        }
    }
}

impl<'s> Iterator for Ancestors<'s> {
    type Item = MatterRef<'s>;

    fn next(&mut self) -> Option<MatterRef<'s>> {
        let id = self.next.take()?;
        if !self.seen.insert(id) {
            warn!(matter = %id, "inheritance cycle detected during resolution");
            return None;
        }
        if self.remaining == 0 {
            warn!(matter = %id, "inheritance chain exceeds depth limit");
            return None;
        }
        self.remaining -= 1;

        let matter = self.store.raw(id)?;
        trace!(matter = %id, "resolving through ancestor");
        self.next = matter.inherites.as_ref();
        Some(MatterRef::new(self.store, matter))
    }
}

impl MattersStore {
    /// Value for `key` as seen by a child of `parent`.
    pub(crate) fn inherited_value(&self, parent: Option<&MatterId>, key: &str) -> Option<&Value> {
        Ancestors::starting_at(self, parent).find_map(|a| a.matter().properties.get(key))
    }

    /// True if `candidate` appears in the parent chain starting at `start`.
    pub(crate) fn chain_contains(&self, start: &MatterId, candidate: &MatterId) -> bool {
        Ancestors::starting_at(self, Some(start)).any(|a| a.id() == candidate)
    }
}
