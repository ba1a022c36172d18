use crate::matcher::Matcher;
use crate::matter::MatterId;
use crate::resolve::MatterRef;
use crate::store::MattersStore;

/// Conditions a matter must meet to be returned by [`MattersStore::find`].
///
/// All conditions must hold. Property conditions test the resolved value, so
/// a variant matches on a discriminator it inherits.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    resolved: Vec<(String, Matcher)>,
    overrides: Vec<String>,
    descends_from: Option<MatterId>,
    owner: Option<Option<MatterId>>,
    links_to: Option<MatterId>,
}

impl Filter {
    /// A filter that matches every matter.
    pub fn new() -> Self {
        Self::default()
    }

    /// The resolved value of `key` must satisfy `matcher`.
    pub fn resolved(mut self, key: impl Into<String>, matcher: impl Into<Matcher>) -> Self {
        self.resolved.push((key.into(), matcher.into()));
        self
    }

    /// The matter must override `key` itself.
    pub fn overrides(mut self, key: impl Into<String>) -> Self {
        self.overrides.push(key.into());
        self
    }

    /// `ancestor` must appear in the matter's parent chain.
    pub fn descends_from(mut self, ancestor: impl Into<MatterId>) -> Self {
        self.descends_from = Some(ancestor.into());
        self
    }

    /// The matter must be composed by `owner`.
    pub fn owned_by(mut self, owner: impl Into<MatterId>) -> Self {
        self.owner = Some(Some(owner.into()));
        self
    }

    /// The matter must have no owner (a standalone asset).
    pub fn standalone(mut self) -> Self {
        self.owner = Some(None);
        self
    }

    /// The matter must hold an own link to `target`.
    pub fn links_to(mut self, target: impl Into<MatterId>) -> Self {
        self.links_to = Some(target.into());
        self
    }

    /// Test a single matter.
    pub fn matches(&self, matter: &MatterRef<'_>) -> bool {
        // Own overrides
        if !self.overrides.iter().all(|key| matter.is_overrided(key)) {
            return false;
        }

        // Owner
        if let Some(ref owner) = self.owner
            && matter.owner() != owner.as_ref()
        {
            return false;
        }

        // Outgoing link
        if let Some(ref target) = self.links_to
            && matter.links_to(target) == 0
        {
            return false;
        }

        // Ancestry
        if let Some(ref ancestor) = self.descends_from
            && !matter.ancestors().any(|a| a.id() == ancestor)
        {
            return false;
        }

        // Resolved values
        self.resolved
            .iter()
            .all(|(key, matcher)| matter.inherited_equals(key, matcher))
    }
}

/// A paged query over a store.
pub struct MatterQuery<'s> {
    store: &'s MattersStore,
    filter: Filter,
    limit: Option<usize>,
    offset: usize,
}

impl<'s> MatterQuery<'s> {
    /// Start a query over `store` with `filter`.
    pub fn new(store: &'s MattersStore, filter: Filter) -> Self {
        Self {
            store,
            filter,
            limit: None,
            offset: 0,
        }
    }

    /// Limit the number of results.
    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// Skip the first N results.
    pub fn offset(mut self, n: usize) -> Self {
        self.offset = n;
        self
    }

    /// Execute the query; results are ordered by id.
    pub fn execute(self) -> Vec<MatterRef<'s>> {
        let results = self.store.find(&self.filter).into_iter().skip(self.offset);
        match self.limit {
            Some(limit) => results.take(limit).collect(),
            None => results.collect(),
        }
    }

    /// Count matching matters without paging.
    pub fn count(self) -> usize {
        self.store.iter().filter(|m| self.filter.matches(m)).count()
    }
}

impl MattersStore {
    /// All matters matching `filter`, ordered by id.
    pub fn find(&self, filter: &Filter) -> Vec<MatterRef<'_>> {
        let mut results: Vec<MatterRef<'_>> = self.iter().filter(|m| filter.matches(m)).collect();
        results.sort_by(|a, b| a.id().cmp(b.id()));
        results
    }

    /// Start building a paged query.
    pub fn query(&self, filter: Filter) -> MatterQuery<'_> {
        MatterQuery::new(self, filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    struct Fixture {
        store: MattersStore,
        mesh: MatterId,
        crate_mesh: MatterId,
        material: MatterId,
        texture: MatterId,
    }

    fn fixture() -> Fixture {
        let mut store = MattersStore::new();
        let texture = store.create([("kind", Value::from("texture"))], None).unwrap();
        let mesh = store
            .create([("kind", Value::from("mesh")), ("tex", Value::Link(texture.clone()))], None)
            .unwrap();
        let crate_mesh = store.inherite(&mesh).unwrap();
        store.set(&crate_mesh, "scale", 2).unwrap();
        let (material, _) = store
            .compose(&crate_mesh, "material", [("kind", Value::from("material"))])
            .unwrap();
        Fixture {
            store,
            mesh,
            crate_mesh,
            material,
            texture,
        }
    }

    #[test]
    fn find_by_inherited_discriminator() {
        let f = fixture();
        let meshes = f.store.find(&Filter::new().resolved("kind", "mesh"));
        let mut expected = vec![f.mesh.clone(), f.crate_mesh.clone()];
        expected.sort();
        assert_eq!(meshes.iter().map(|m| m.id().clone()).collect::<Vec<_>>(), expected);
    }

    #[test]
    fn find_by_own_override() {
        let f = fixture();
        let results = f.store.find(&Filter::new().resolved("kind", "mesh").overrides("kind"));
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id(), &f.mesh);
    }

    #[test]
    fn find_by_ancestry_and_owner() {
        let f = fixture();
        let variants = f.store.find(&Filter::new().descends_from(f.mesh.clone()));
        assert_eq!(variants.len(), 1);
        assert_eq!(variants[0].id(), &f.crate_mesh);

        let owned = f.store.find(&Filter::new().owned_by(f.crate_mesh.clone()));
        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0].id(), &f.material);

        assert_eq!(f.store.find(&Filter::new().standalone()).len(), 3);
    }

    #[test]
    fn find_by_outgoing_link() {
        let f = fixture();
        let results = f.store.find(&Filter::new().links_to(f.texture.clone()));
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id(), &f.mesh);
    }

    #[test]
    fn find_with_pattern() {
        let f = fixture();
        let filter = Filter::new().resolved("kind", Matcher::pattern("^m").unwrap());
        assert_eq!(f.store.find(&filter).len(), 3);
    }

    #[test]
    fn query_with_limit_and_offset() {
        let f = fixture();
        assert_eq!(f.store.query(Filter::new()).execute().len(), 4);
        assert_eq!(f.store.query(Filter::new()).limit(2).execute().len(), 2);
        assert_eq!(f.store.query(Filter::new()).offset(3).limit(5).execute().len(), 1);
        assert_eq!(f.store.query(Filter::new().resolved("kind", "mesh")).count(), 2);
    }

    #[test]
    fn empty_store_finds_nothing() {
        let store = MattersStore::new();
        assert!(store.find(&Filter::new()).is_empty());
    }
}
