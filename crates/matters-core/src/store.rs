use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use tracing::{debug, warn};

use crate::change::ChangeSet;
use crate::config::{CompositionPolicy, StoreConfig};
use crate::error::{Conflict, MatterError, MatterResult};
use crate::matter::{Matter, MatterId};
use crate::resolve::MatterRef;
use crate::value::{Value, ValueKind};

/// Own overrides keyed by property name.
pub type Properties = BTreeMap<String, Value>;

/// The collection of matters. Owns every matter and keeps `dependents`
/// counts exact.
///
/// Every mutating operation validates all ids and values it touches before
/// changing anything, so a returned error always means "nothing happened".
#[derive(Debug, Default)]
pub struct MattersStore {
    config: StoreConfig,
    matters: HashMap<MatterId, Matter>,

    // Indexes
    heirs: HashMap<MatterId, BTreeSet<MatterId>>,
    owned: HashMap<MatterId, BTreeSet<MatterId>>,
}

impl MattersStore {
    /// Create an empty store with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store with the given configuration.
    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------------

    /// Get a matter by ID.
    pub fn get(&self, id: &MatterId) -> Option<MatterRef<'_>> {
        self.matters.get(id).map(|m| MatterRef::new(self, m))
    }

    /// Get a matter by ID, failing with `NotFound`.
    pub fn matter(&self, id: &MatterId) -> MatterResult<MatterRef<'_>> {
        self.require(id).map(|m| MatterRef::new(self, m))
    }

    /// True if a matter with this ID exists.
    pub fn contains(&self, id: &MatterId) -> bool {
        self.matters.contains_key(id)
    }

    /// All matters, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = MatterRef<'_>> {
        self.matters.values().map(|m| MatterRef::new(self, m))
    }

    /// All IDs, sorted.
    pub fn ids(&self) -> Vec<&MatterId> {
        let mut ids: Vec<&MatterId> = self.matters.keys().collect();
        ids.sort();
        ids
    }

    /// Copies of all matters, sorted by ID.
    pub fn snapshot(&self) -> Vec<Matter> {
        let mut matters: Vec<Matter> = self.matters.values().cloned().collect();
        matters.sort_by(|a, b| a.id.cmp(&b.id));
        matters
    }

    /// Matters holding a link to `id`, as `(referrer, key)` pairs sorted by referrer.
    pub fn referrers(&self, id: &MatterId) -> Vec<(MatterId, String)> {
        let mut out: Vec<(MatterId, String)> = self
            .matters
            .values()
            .flat_map(|m| {
                m.own_links()
                    .filter(|(_, target)| *target == id)
                    .map(|(key, _)| (m.id.clone(), key.to_string()))
            })
            .collect();
        out.sort();
        out
    }

    /// Matters that inherit directly from `id`.
    pub fn heirs(&self, id: &MatterId) -> Vec<MatterRef<'_>> {
        self.indexed(&self.heirs, id)
    }

    /// Matters composed by `id`.
    pub fn owned(&self, id: &MatterId) -> Vec<MatterRef<'_>> {
        self.indexed(&self.owned, id)
    }

    /// `id` plus everything it owns, transitively, root first.
    ///
    /// This is the set [`MattersStore::remove`] takes out under
    /// [`CompositionPolicy::Cascade`]. Unknown ids yield just `id`.
    pub fn composition(&self, id: &MatterId) -> Vec<MatterId> {
        let mut closure = vec![id.clone()];
        let mut seen: HashSet<&MatterId> = HashSet::from([id]);
        let mut cursor = 0;
        while let Some(current) = closure.get(cursor).cloned() {
            cursor += 1;
            for child in self.owned.get(&current).into_iter().flatten() {
                if seen.insert(child) {
                    closure.push(child.clone());
                }
            }
        }
        closure
    }

    /// Number of matters.
    pub fn len(&self) -> usize {
        self.matters.len()
    }

    /// True if the store holds no matters.
    pub fn is_empty(&self) -> bool {
        self.matters.is_empty()
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Create a matter with the given overrides, optionally inheriting from
    /// `parent`. Link values count as new dependents of their targets.
    pub fn create<I, K>(&mut self, initial: I, parent: Option<&MatterId>) -> MatterResult<MatterId>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        if let Some(parent) = parent {
            self.require(parent)?;
        }
        let properties = self.prepare_properties(initial, parent)?;

        let mut matter = Matter::new(self.allocate_id());
        matter.inherites = parent.cloned();
        matter.properties = properties;
        let id = self.commit_new(matter, &mut ChangeSet::default());
        debug!(matter = %id, parent = ?parent.map(MatterId::as_str), "created matter");
        Ok(id)
    }

    /// Copy a matter's own overrides into a new, detached matter.
    ///
    /// Inherited values are not copied, and the copy has no parent or owner.
    pub fn clone(&mut self, id: &MatterId) -> MatterResult<MatterId> {
        let properties = self.require(id)?.properties.clone();

        let mut matter = Matter::new(self.allocate_id());
        matter.properties = properties;
        let clone_id = self.commit_new(matter, &mut ChangeSet::default());
        debug!(source = %id, matter = %clone_id, "cloned matter");
        Ok(clone_id)
    }

    /// Create an empty variant that inherits everything from `id`.
    pub fn inherite(&mut self, id: &MatterId) -> MatterResult<MatterId> {
        self.require(id)?;

        let mut matter = Matter::new(self.allocate_id());
        matter.inherites = Some(id.clone());
        let variant = self.commit_new(matter, &mut ChangeSet::default());
        debug!(parent = %id, matter = %variant, "inherited matter");
        Ok(variant)
    }

    /// Create a sub-matter owned by `owner` and link it from `owner.key`.
    pub fn compose<I, K>(
        &mut self,
        owner: &MatterId,
        key: &str,
        initial: I,
    ) -> MatterResult<(MatterId, ChangeSet)>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let owner_parent = self.require(owner)?.inherites.clone();
        check_key(key)?;
        let properties = self.prepare_properties(initial, None)?;
        let id = self.allocate_id();
        let link = self.enforce_kind(key, Value::Link(id.clone()), owner_parent.as_ref())?;

        let mut matter = Matter::new(id);
        matter.owner = Some(owner.clone());
        matter.properties = properties;

        let mut changes = ChangeSet::default();
        let id = self.commit_new(matter, &mut changes);
        self.commit_write(owner, key, link, &mut changes);
        debug!(owner = %owner, key, matter = %id, "composed matter");
        Ok((id, changes))
    }

    /// Remove a matter together with everything it owns.
    ///
    /// Fails with `Conflict` if any removed matter is still linked from a
    /// surviving matter, is the parent of a surviving matter, or (under
    /// [`CompositionPolicy::Block`]) owns anything.
    pub fn remove(&mut self, id: &MatterId) -> MatterResult<ChangeSet> {
        self.require(id)?;
        let closure = self.composition(id);

        if self.config.composition == CompositionPolicy::Block && closure.len() > 1 {
            let owned = self.owned.get(id).map_or(0, BTreeSet::len);
            return Err(MatterError::conflict(id, Conflict::Owned(owned)));
        }

        for member in &closure {
            let external = self.external_dependents(member, &closure);
            if external > 0 {
                debug!(matter = %member, dependents = external, "remove refused");
                return Err(MatterError::conflict(member, Conflict::Dependents(external)));
            }
            let heirs = self
                .heirs
                .get(member)
                .map_or(0, |heirs| heirs.iter().filter(|h| !closure.contains(*h)).count());
            if heirs > 0 {
                debug!(matter = %member, heirs, "remove refused");
                return Err(MatterError::conflict(member, Conflict::Heirs(heirs)));
            }
        }

        let mut changes = ChangeSet::default();
        for member in &closure {
            let Some(matter) = self.matters.remove(member) else {
                continue;
            };
            changes.record_removed(member.clone());
            if let Some(parent) = &matter.inherites {
                unindex(&mut self.heirs, parent, member);
            }
            if let Some(owner) = &matter.owner {
                unindex(&mut self.owned, owner, member);
            }
            self.heirs.remove(member);
            self.owned.remove(member);

            for (_, target) in matter.own_links() {
                if !closure.contains(target) {
                    self.release(target, &mut changes);
                }
            }
        }

        debug!(matter = %id, removed = changes.removed.len(), "removed matter");
        Ok(changes)
    }

    // -----------------------------------------------------------------------
    // Property writes
    // -----------------------------------------------------------------------

    /// Write an own override. Writing a link counts as a new dependent of
    /// its target; replacing a link releases the old target.
    pub fn set(&mut self, id: &MatterId, key: &str, value: impl Into<Value>) -> MatterResult<ChangeSet> {
        let parent = self.require(id)?.inherites.clone();
        let value = self.prepare_value(key, value.into(), parent.as_ref())?;

        let mut changes = ChangeSet::default();
        self.commit_write(id, key, value, &mut changes);
        Ok(changes)
    }

    /// Point `key` of `id` at `target`.
    pub fn set_link(&mut self, id: &MatterId, key: &str, target: &MatterId) -> MatterResult<ChangeSet> {
        self.require(id)?;
        self.require(target)?;
        self.set(id, key, Value::Link(target.clone()))
    }

    /// Drop the own override for `key` so the parent chain shows through.
    pub fn reset(&mut self, id: &MatterId, key: &str) -> MatterResult<ChangeSet> {
        let matter = self
            .matters
            .get_mut(id)
            .ok_or_else(|| MatterError::NotFound(id.clone()))?;

        let mut changes = ChangeSet::default();
        if let Some(previous) = matter.properties.remove(key) {
            changes.record_updated(id.clone(), key.to_string());
            if let Value::Link(old) = previous {
                self.release(&old, &mut changes);
            }
            debug!(matter = %id, key, "reset property");
        }
        Ok(changes)
    }

    /// Drop an own link override. Fails if the own value is not a link.
    pub fn unlink(&mut self, id: &MatterId, key: &str) -> MatterResult<ChangeSet> {
        match self.require(id)?.own(key) {
            Some(Value::Link(_)) => self.reset(id, key),
            Some(other) => Err(MatterError::invalid(
                key,
                format!("own value is a {}, not a link", other.kind()),
            )),
            None => Ok(ChangeSet::default()),
        }
    }

    // -----------------------------------------------------------------------
    // Structure
    // -----------------------------------------------------------------------

    /// Change the parent `id` inherits from.
    pub fn set_parent(&mut self, id: &MatterId, parent: Option<&MatterId>) -> MatterResult<ChangeSet> {
        let current = self.require(id)?.inherites.clone();
        if let Some(parent) = parent {
            self.require(parent)?;
            if parent == id || self.chain_contains(parent, id) {
                return Err(MatterError::conflict(id, Conflict::InheritanceCycle));
            }
        }

        let mut changes = ChangeSet::default();
        if current.as_ref() == parent {
            return Ok(changes);
        }
        if let Some(old) = &current {
            unindex(&mut self.heirs, old, id);
        }
        if let Some(new) = parent {
            index(&mut self.heirs, new, id);
        }
        if let Some(matter) = self.matters.get_mut(id) {
            matter.inherites = parent.cloned();
        }
        changes.record_restructured(id.clone());
        debug!(matter = %id, parent = ?parent.map(MatterId::as_str), "changed parent");
        Ok(changes)
    }

    /// Change the matter that composes `id`.
    pub fn set_owner(&mut self, id: &MatterId, owner: Option<&MatterId>) -> MatterResult<ChangeSet> {
        let current = self.require(id)?.owner.clone();
        if let Some(owner) = owner {
            self.require(owner)?;
            if owner == id || self.owner_chain_contains(owner, id) {
                return Err(MatterError::conflict(id, Conflict::OwnershipCycle));
            }
        }

        let mut changes = ChangeSet::default();
        if current.as_ref() == owner {
            return Ok(changes);
        }
        if let Some(old) = &current {
            unindex(&mut self.owned, old, id);
        }
        if let Some(new) = owner {
            index(&mut self.owned, new, id);
        }
        if let Some(matter) = self.matters.get_mut(id) {
            matter.owner = owner.cloned();
        }
        changes.record_restructured(id.clone());
        debug!(matter = %id, owner = ?owner.map(MatterId::as_str), "changed owner");
        Ok(changes)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    pub(crate) fn raw(&self, id: &MatterId) -> Option<&Matter> {
        self.matters.get(id)
    }

    pub(crate) fn require(&self, id: &MatterId) -> MatterResult<&Matter> {
        self.matters
            .get(id)
            .ok_or_else(|| MatterError::NotFound(id.clone()))
    }

    fn allocate_id(&self) -> MatterId {
        loop {
            let id = MatterId::generate();
            if !self.matters.contains_key(&id) {
                return id;
            }
        }
    }

    fn indexed(&self, index: &HashMap<MatterId, BTreeSet<MatterId>>, id: &MatterId) -> Vec<MatterRef<'_>> {
        index
            .get(id)
            .map(|ids| ids.iter().filter_map(|id| self.get(id)).collect())
            .unwrap_or_default()
    }

    fn prepare_properties<I, K>(&self, initial: I, parent: Option<&MatterId>) -> MatterResult<Properties>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let mut properties = Properties::new();
        for (key, value) in initial {
            let key = key.into();
            let value = self.prepare_value(&key, value, parent)?;
            properties.insert(key, value);
        }
        Ok(properties)
    }

    /// Validate a write to `key` on a matter whose parent is `parent`.
    fn prepare_value(&self, key: &str, value: Value, parent: Option<&MatterId>) -> MatterResult<Value> {
        check_key(key)?;
        value.check(key)?;
        if let Value::Link(target) = &value {
            self.require(target)?;
        }
        self.enforce_kind(key, value, parent)
    }

    /// Under strict typing, coerce `value` to the kind the chain already uses.
    fn enforce_kind(&self, key: &str, value: Value, parent: Option<&MatterId>) -> MatterResult<Value> {
        if !self.config.strict_types || value.is_null() {
            return Ok(value);
        }
        let Some(expected) = self
            .inherited_value(parent, key)
            .map(Value::kind)
            .filter(|kind| *kind != ValueKind::Null)
        else {
            return Ok(value);
        };
        value.coerce_to(expected).ok_or_else(|| {
            MatterError::invalid(key, format!("expected {expected}, found {}", value.kind()))
        })
    }

    fn commit_new(&mut self, matter: Matter, changes: &mut ChangeSet) -> MatterId {
        let id = matter.id.clone();
        let targets: Vec<MatterId> = matter.own_links().map(|(_, t)| t.clone()).collect();
        if let Some(parent) = &matter.inherites {
            index(&mut self.heirs, parent, &id);
        }
        if let Some(owner) = &matter.owner {
            index(&mut self.owned, owner, &id);
        }
        self.matters.insert(id.clone(), matter);
        for target in &targets {
            self.retain(target, changes);
        }
        changes.record_created(id.clone());
        id
    }

    fn commit_write(&mut self, id: &MatterId, key: &str, value: Value, changes: &mut ChangeSet) {
        let Some(matter) = self.matters.get_mut(id) else {
            return;
        };
        if matter.properties.get(key) == Some(&value) {
            return;
        }
        let previous = matter.properties.insert(key.to_string(), value.clone());
        changes.record_updated(id.clone(), key.to_string());

        if let Some(Value::Link(old)) = previous {
            self.release(&old, changes);
        }
        if let Value::Link(new) = &value {
            self.retain(new, changes);
        }
        debug!(matter = %id, key, value = %value, "set property");
    }

    fn retain(&mut self, target: &MatterId, changes: &mut ChangeSet) {
        if let Some(matter) = self.matters.get_mut(target) {
            matter.dependents += 1;
            changes.record_dependents(target.clone());
        }
    }

    fn release(&mut self, target: &MatterId, changes: &mut ChangeSet) {
        if let Some(matter) = self.matters.get_mut(target) {
            if matter.dependents == 0 {
                warn!(matter = %target, "released a link from a matter with no dependents");
            }
            matter.dependents = matter.dependents.saturating_sub(1);
            changes.record_dependents(target.clone());
        }
    }

    /// Links into `id` from matters outside `closure`.
    fn external_dependents(&self, id: &MatterId, closure: &[MatterId]) -> usize {
        let Some(matter) = self.matters.get(id) else {
            return 0;
        };
        let internal: usize = closure
            .iter()
            .filter_map(|member| self.matters.get(member))
            .map(|member| member.links_to(id))
            .sum();
        matter.dependents.saturating_sub(internal)
    }

    fn owner_chain_contains(&self, start: &MatterId, candidate: &MatterId) -> bool {
        let mut seen = HashSet::new();
        let mut next = Some(start);
        while let Some(id) = next {
            if id == candidate {
                return true;
            }
            if !seen.insert(id) {
                return false;
            }
            next = self.matters.get(id).and_then(|m| m.owner.as_ref());
        }
        false
    }

    /// Insert matters as given, rebuild indexes, and recount dependents.
    ///
    /// Performs no existence or cycle checks; later duplicates replace
    /// earlier ones. Call [`MattersStore::verify`] before trusting the result,
    /// or use [`MattersStore::load`], which does both.
    pub fn assemble(config: StoreConfig, matters: Vec<Matter>) -> Self {
        let mut store = Self::with_config(config);
        for mut matter in matters {
            matter.dependents = 0;
            if let Some(parent) = &matter.inherites {
                index(&mut store.heirs, parent, &matter.id);
            }
            if let Some(owner) = &matter.owner {
                index(&mut store.owned, owner, &matter.id);
            }
            store.matters.insert(matter.id.clone(), matter);
        }
        let counts = store.count_links();
        for (target, count) in counts {
            if let Some(matter) = store.matters.get_mut(&target) {
                matter.dependents = count;
            }
        }
        store
    }

    /// Inbound link count per target, from own properties.
    pub(crate) fn count_links(&self) -> HashMap<MatterId, usize> {
        let mut counts: HashMap<MatterId, usize> = HashMap::new();
        for matter in self.matters.values() {
            for (_, target) in matter.own_links() {
                *counts.entry(target.clone()).or_default() += 1;
            }
        }
        counts
    }

    #[cfg(test)]
    pub(crate) fn matter_mut_unchecked(&mut self, id: &MatterId) -> Option<&mut Matter> {
        self.matters.get_mut(id)
    }
}

fn check_key(key: &str) -> MatterResult<()> {
    if key.is_empty() {
        Err(MatterError::invalid(key, "property key is empty"))
    } else {
        Ok(())
    }
}

fn index(index: &mut HashMap<MatterId, BTreeSet<MatterId>>, key: &MatterId, member: &MatterId) {
    index.entry(key.clone()).or_default().insert(member.clone());
}

fn unindex(index: &mut HashMap<MatterId, BTreeSet<MatterId>>, key: &MatterId, member: &MatterId) {
    if let Some(members) = index.get_mut(key) {
        members.remove(member);
        if members.is_empty() {
            index.remove(key);
        }
    }
}
