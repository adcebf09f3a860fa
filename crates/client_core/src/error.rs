use shared::domain::{Depth, EntityKind};
use thiserror::Error;

use crate::validation::ValidationErrors;

/// Problems building a request descriptor that the type system cannot rule out.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("{endpoint} needs ancestor ids down to {required:?}, path only reaches {actual:?}")]
    MissingAncestors {
        endpoint: String,
        required: Depth,
        actual: Depth,
    },
    #[error("{kind} payload has no integer `id`")]
    MissingId { kind: EntityKind },
    #[error("{kind} payload must be a JSON object")]
    NotAnObject { kind: EntityKind },
}

/// Why a submission was stopped before any remote call went out.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}
