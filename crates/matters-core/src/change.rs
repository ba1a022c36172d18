use crate::matter::MatterId;

/// What a mutating store operation touched.
///
/// The store emits no events; callers inspect this to decide what to refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// Matters that were created.
    pub created: Vec<MatterId>,
    /// Matters that were removed.
    pub removed: Vec<MatterId>,
    /// Own properties that were written or reset.
    pub updated: Vec<(MatterId, String)>,
    /// Matters whose parent or owner changed.
    pub restructured: Vec<MatterId>,
    /// Matters whose dependents count changed.
    pub dependents: Vec<MatterId>,
}

impl ChangeSet {
    /// True when the operation changed nothing.
    pub fn is_empty(&self) -> bool {
        self.created.is_empty()
            && self.removed.is_empty()
            && self.updated.is_empty()
            && self.restructured.is_empty()
            && self.dependents.is_empty()
    }

    /// Every matter id mentioned, deduplicated, in first-seen order.
    pub fn touched(&self) -> Vec<&MatterId> {
        let mut out: Vec<&MatterId> = Vec::new();
        let all = self
            .created
            .iter()
            .chain(&self.removed)
            .chain(self.updated.iter().map(|(id, _)| id))
            .chain(&self.restructured)
            .chain(&self.dependents);
        for id in all {
            if !out.contains(&id) {
                out.push(id);
            }
        }
        out
    }

    /// Fold another change set into this one.
    pub fn merge(&mut self, other: ChangeSet) {
        for id in other.created {
            self.record_created(id);
        }
        for id in other.removed {
            self.record_removed(id);
        }
        for (id, key) in other.updated {
            self.record_updated(id, key);
        }
        for id in other.restructured {
            self.record_restructured(id);
        }
        for id in other.dependents {
            self.record_dependents(id);
        }
    }

    pub(crate) fn record_created(&mut self, id: MatterId) {
        push_unique(&mut self.created, id);
    }

    pub(crate) fn record_removed(&mut self, id: MatterId) {
        // Removed matters no longer need a dependents refresh.
        self.dependents.retain(|d| *d != id);
        push_unique(&mut self.removed, id);
    }

    pub(crate) fn record_updated(&mut self, id: MatterId, key: String) {
        push_unique(&mut self.updated, (id, key));
    }

    pub(crate) fn record_restructured(&mut self, id: MatterId) {
        push_unique(&mut self.restructured, id);
    }

    pub(crate) fn record_dependents(&mut self, id: MatterId) {
        if !self.removed.contains(&id) {
            push_unique(&mut self.dependents, id);
        }
    }
}

fn push_unique<T: PartialEq>(list: &mut Vec<T>, item: T) {
    if !list.contains(&item) {
        list.push(item);
    }
}
