//! Depth-first walk over the link graph.

use std::collections::HashSet;

use tracing::warn;

use crate::error::MatterResult;
use crate::matter::MatterId;
use crate::resolve::{MatterRef, Provenance};
use crate::store::MattersStore;

/// How a link relates its source to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// The target is an independent matter the source points at.
    Reference,
    /// The target is owned by the source; it must not be detached or swapped.
    Composition,
}

/// What the visitor wants the walk to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Walk {
    /// Descend into the target, then continue.
    Continue,
    /// Do not descend into this target, but continue with siblings.
    Skip,
    /// End the walk.
    Stop,
}

/// One link encountered during [`MattersStore::traverse`].
#[derive(Debug, Clone)]
pub struct LinkVisit<'s> {
    /// The matter whose field holds the link.
    pub source: MatterRef<'s>,
    /// The field key.
    pub key: &'s str,
    /// The linked id.
    pub target_id: &'s MatterId,
    /// The linked matter, or `None` if the link dangles.
    pub target: Option<MatterRef<'s>>,
    /// Reference or composition.
    pub relation: Relation,
    /// Whether the source owns or inherits the link field.
    pub provenance: Provenance,
    /// Distance from the root; links on the root itself have depth 0.
    pub depth: usize,
    /// The target is already on the current path and will not be entered.
    pub cyclic: bool,
    /// The target was fully walked earlier through another path and will
    /// not be entered again.
    pub revisit: bool,
}

impl MattersStore {
    /// Walk every link reachable from `root`, depth first, in key order.
    ///
    /// Links are read from each matter's resolved fields, so inherited links
    /// are followed too. Every link is reported, but each matter is entered
    /// at most once: a target already on the current path is flagged
    /// `cyclic`, and a target walked earlier through another path is flagged
    /// `revisit`. The walk is linear in the size of the reachable link graph.
    pub fn traverse<'s, F>(&'s self, root: &MatterId, mut visitor: F) -> MatterResult<()>
    where
        F: FnMut(&LinkVisit<'s>) -> Walk,
    {
        let root = self.matter(root)?;
        let mut walker = Walker {
            path: vec![root.matter().id()],
            finished: HashSet::new(),
            visitor: &mut visitor,
        };
        self.walk(root, 0, &mut walker);
        Ok(())
    }

    /// Ids reachable from `root` through links, in first-visit order.
    pub fn reachable(&self, root: &MatterId) -> MatterResult<Vec<MatterId>> {
        let mut seen: HashSet<&MatterId> = HashSet::new();
        let mut out: Vec<MatterId> = Vec::new();
        self.traverse(root, |visit| {
            if visit.target.is_none() || !seen.insert(visit.target_id) {
                return Walk::Skip;
            }
            out.push(visit.target_id.clone());
            Walk::Continue
        })?;
        Ok(out)
    }

    /// Returns false once the visitor asked to stop.
    fn walk<'s, F>(&'s self, source: MatterRef<'s>, depth: usize, walker: &mut Walker<'s, '_, F>) -> bool
    where
        F: FnMut(&LinkVisit<'s>) -> Walk,
    {
        for field in source.resolved_fields() {
            let Some(target_id) = field.value.as_link() else {
                continue;
            };
            let target = self.get(target_id);
            let relation = match target {
                Some(t) if t.owner() == Some(source.matter().id()) => Relation::Composition,
                _ => Relation::Reference,
            };
            let cyclic = walker.path.contains(&target_id);
            let revisit = !cyclic && walker.finished.contains(target_id);
            if cyclic {
                warn!(source = %source.id(), key = field.key, target = %target_id, "link cycle");
            }

            let visit = LinkVisit {
                source,
                key: field.key,
                target_id,
                target,
                relation,
                provenance: field.provenance,
                depth,
                cyclic,
                revisit,
            };

            match (walker.visitor)(&visit) {
                Walk::Stop => return false,
                Walk::Skip => continue,
                Walk::Continue => {}
            }

            if let Some(target) = target
                && !cyclic
                && !revisit
            {
                walker.path.push(target.matter().id());
                let keep_going = self.walk(target, depth + 1, walker);
                walker.path.pop();
                if !keep_going {
                    return false;
                }
                walker.finished.insert(target.matter().id());
            }
        }
        true
    }
}

/// Walk state shared across the recursion.
struct Walker<'s, 'v, F> {
    /// Matters entered and not yet finished, root first.
    path: Vec<&'s MatterId>,
    /// Matters whose links have all been walked.
    finished: HashSet<&'s MatterId>,
    visitor: &'v mut F,
}
