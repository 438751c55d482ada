use crate::model::PersonId;
use thiserror::Error;

/// Raised when a PARENT edge would make someone their own ancestor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot make {parent} a parent of {child}: {parent} would become their own ancestor")]
pub struct CyclicRelationError {
    pub parent: PersonId,
    pub child: PersonId,
}

impl CyclicRelationError {
    pub(crate) fn new(parent: &PersonId, child: &PersonId) -> Self {
        Self {
            parent: parent.clone(),
            child: child.clone(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot entry `{key}` holds person `{id}`")]
    KeyMismatch { key: PersonId, id: PersonId },
    #[error("snapshot parent relations form a cycle through `{0}`")]
    Cycle(PersonId),
    #[error("malformed snapshot: {0}")]
    Json(#[from] serde_json::Error),
}
