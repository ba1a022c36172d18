use std::fmt;

use crate::matter::MatterId;

/// Alias for `Result<T, MatterError>`.
pub type MatterResult<T> = Result<T, MatterError>;

/// Errors returned by store operations.
///
/// `NotFound` and `Conflict` are expected outcomes a caller reports to the
/// user; nothing in the store retries them.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MatterError {
    /// The referenced matter does not exist in the store.
    #[error("matter not found: {0}")]
    NotFound(MatterId),

    /// The operation would break referential integrity.
    #[error("conflict on {id}: {conflict}")]
    Conflict {
        /// The matter the conflict was detected on.
        id: MatterId,
        /// What kind of integrity rule was violated.
        conflict: Conflict,
    },

    /// A value cannot be written to the given property.
    #[error("invalid value for \"{key}\": {reason}")]
    InvalidValue {
        /// The property key being written.
        key: String,
        /// Human-readable description of the problem.
        reason: String,
    },
}

impl MatterError {
    pub(crate) fn conflict(id: &MatterId, conflict: Conflict) -> Self {
        Self::Conflict {
            id: id.clone(),
            conflict,
        }
    }

    pub(crate) fn invalid(key: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    /// Returns true for `NotFound`.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns true for any `Conflict`.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// The integrity rule a `Conflict` error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conflict {
    /// Other matters still link here.
    Dependents(usize),
    /// The matter owns sub-matters and the store blocks cascading removal.
    Owned(usize),
    /// Other matters inherit from this one.
    Heirs(usize),
    /// The assignment would make the inheritance chain loop.
    InheritanceCycle,
    /// The assignment would make the ownership chain loop.
    OwnershipCycle,
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dependents(n) => write!(f, "has {n} dependent{}", plural(*n)),
            Self::Owned(n) => write!(f, "owns {n} matter{}", plural(*n)),
            Self::Heirs(n) => write!(f, "is inherited by {n} matter{}", plural(*n)),
            Self::InheritanceCycle => write!(f, "inheritance cycle"),
            Self::OwnershipCycle => write!(f, "ownership cycle"),
        }
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_message_reads_naturally() {
        let err = MatterError::conflict(&MatterId::from("tex"), Conflict::Dependents(1));
        assert_eq!(err.to_string(), "conflict on tex: has 1 dependent");

        let err = MatterError::conflict(&MatterId::from("mesh"), Conflict::Heirs(3));
        assert_eq!(err.to_string(), "conflict on mesh: is inherited by 3 matters");
    }

    #[test]
    fn error_classification() {
        assert!(MatterError::NotFound(MatterId::from("x")).is_not_found());
        assert!(MatterError::conflict(&MatterId::from("x"), Conflict::OwnershipCycle).is_conflict());
        assert!(!MatterError::invalid("k", "bad").is_conflict());
    }
}
