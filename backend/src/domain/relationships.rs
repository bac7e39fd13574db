//! Relationship failure taxonomy.
//!
//! [`RelationshipError`] is what the relationship service reports; it
//! converts into the transport-agnostic [`Error`] at the driving port.

use serde::Serialize;
use serde_json::json;
use thiserror::Error as ThisError;
use uuid::Uuid;

use super::Error;
use super::ports::{EntityKind, RelationField, SetMutation};

/// A relationship edge that a cascade could not remove.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DanglingEdge {
    /// Kind of document still holding the reference.
    pub kind: EntityKind,
    /// Document still holding the reference.
    pub entity_id: Uuid,
    /// Field on that document.
    pub field: RelationField,
    /// The id that should have been removed.
    pub member_id: Uuid,
    /// Why the removal failed.
    pub reason: String,
}

impl DanglingEdge {
    pub(crate) fn from_mutation(mutation: &SetMutation, reason: impl Into<String>) -> Self {
        Self {
            kind: mutation.target.kind(),
            entity_id: mutation.target.owner(),
            field: mutation.target.field(),
            member_id: mutation.member,
            reason: reason.into(),
        }
    }
}

/// Failures reported by relationship operations.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum RelationshipError {
    /// A referenced user or group does not exist.
    #[error("{entity} {id} not found")]
    NotFound { entity: EntityKind, id: Uuid },
    /// The request is structurally invalid, such as a self-follow.
    #[error("{reason}")]
    InvalidOperation { reason: String },
    /// Some sub-steps of a multi-document mutation failed.
    #[error("{} relationship edge(s) could not be removed", .dangling.len())]
    PartialFailure { dangling: Vec<DanglingEdge> },
    /// A store call did not complete within the configured bound.
    #[error("store call exceeded {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    /// The store is unreachable.
    #[error("graph store unavailable: {message}")]
    Unavailable { message: String },
    /// Any other store failure.
    #[error("graph store error: {message}")]
    Store { message: String },
}

impl RelationshipError {
    pub fn not_found(entity: EntityKind, id: impl Into<Uuid>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn invalid_operation(reason: impl Into<String>) -> Self {
        Self::InvalidOperation {
            reason: reason.into(),
        }
    }
}

impl From<RelationshipError> for Error {
    fn from(error: RelationshipError) -> Self {
        let message = error.to_string();
        match error {
            RelationshipError::NotFound { entity, id } => Error::not_found(message)
                .with_details(json!({ "entity": entity, "id": id, "code": "not_found" })),
            RelationshipError::InvalidOperation { .. } => Error::invalid_request(message)
                .with_details(json!({ "code": "invalid_operation" })),
            RelationshipError::PartialFailure { dangling } => {
                Error::partial_failure(message).with_details(json!({ "dangling": dangling }))
            }
            RelationshipError::Timeout { timeout_ms } => {
                Error::timeout(message).with_details(json!({ "timeoutMs": timeout_ms }))
            }
            RelationshipError::Unavailable { .. } => Error::service_unavailable(message),
            RelationshipError::Store { .. } => Error::internal(message),
        }
    }
}
