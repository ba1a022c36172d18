//! Core engine for Matters: entities with prototype inheritance and typed links.
//!
//! A [`MattersStore`] owns every [`Matter`]. A matter overrides some
//! properties and inherits the rest from a single parent; [`Value::Link`]
//! properties point at other matters and are reference-counted so that a
//! linked matter cannot be removed out from under its referrers.
//!
//! All mutation goes through the store. Reads that resolve through the parent
//! chain go through [`MatterRef`], the borrowed view the store hands out.

/// Change descriptions returned by mutating operations.
pub mod change;
/// Store configuration.
pub mod config;
/// Error types used throughout the crate.
pub mod error;
/// Bulk loading and integrity auditing.
pub mod integrity;
/// Predicates over property values.
pub mod matcher;
/// Matter identifiers and the matter entity.
pub mod matter;
/// Filters and paged queries over a store.
pub mod query;
/// Inheritance-chain resolution and provenance.
pub mod resolve;
/// The matters store: lifecycle, links, and referential integrity.
pub mod store;
/// Depth-first link traversal.
pub mod traverse;
/// Property values and the link wire prefix.
pub mod value;

/// Re-export change types.
pub use change::ChangeSet;
/// Re-export configuration types.
pub use config::{CompositionPolicy, StoreConfig};
/// Re-export error types.
pub use error::{Conflict, MatterError, MatterResult};
/// Re-export integrity types.
pub use integrity::IntegrityIssue;
/// Re-export matcher types.
pub use matcher::Matcher;
/// Re-export core matter types.
pub use matter::{Matter, MatterId};
/// Re-export query types.
pub use query::{Filter, MatterQuery};
/// Re-export resolution types.
pub use resolve::{Ancestors, MatterRef, Provenance, ResolvedField};
/// Re-export store types.
pub use store::{MattersStore, Properties};
/// Re-export traversal types.
pub use traverse::{LinkVisit, Relation, Walk};
/// Re-export value types.
pub use value::{LINK_PREFIX, Value, ValueKind};
