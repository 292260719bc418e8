use shams_core::{RequestStatus, ValueError};
use thiserror::Error;

use crate::{DatabaseError, PrimaryKey};

pub type WorkflowResult<T> = std::result::Result<T, WorkflowError>;

/// Everything that can go wrong with one allocation operation.
/// None of these affect other operations.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Malformed or out-of-range input, nothing was written
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("{resource}:{identifier} not found")]
    NotFound {
        resource: &'static str,
        identifier: &'static str,
    },
    /// The room or mess had no place left when the decision was committed
    #[error("{resource} {id} is full")]
    CapacityExceeded { resource: &'static str, id: PrimaryKey },
    /// Gender, menu, or ownership rules don't allow this combination
    #[error("Constraint violated: {0}")]
    ConstraintViolation(String),
    /// The request or application was already decided
    #[error("{resource} {id} is already {status}")]
    StateConflict {
        resource: &'static str,
        id: PrimaryKey,
        status: RequestStatus,
    },
    /// The caller's role or scope doesn't allow this
    #[error("Not allowed: {0}")]
    Forbidden(String),
    #[error("{resource} with {field} of value {value} already exists")]
    Conflict {
        resource: &'static str,
        field: &'static str,
        value: String,
    },
    #[error("{resource} is still referenced by {dependents}")]
    HasDependents {
        resource: &'static str,
        dependents: &'static str,
    },
    #[error(transparent)]
    Database(DatabaseError),
}

impl From<DatabaseError> for WorkflowError {
    fn from(value: DatabaseError) -> Self {
        match value {
            DatabaseError::NotFound {
                resource,
                identifier,
            } => Self::NotFound {
                resource,
                identifier,
            },
            DatabaseError::Conflict {
                resource,
                field,
                value,
            } => Self::Conflict {
                resource,
                field,
                value,
            },
            DatabaseError::HasDependents {
                resource,
                dependents,
            } => Self::HasDependents {
                resource,
                dependents,
            },
            e => Self::Database(e),
        }
    }
}

impl From<ValueError> for WorkflowError {
    fn from(value: ValueError) -> Self {
        Self::Validation(value.to_string())
    }
}

/// Rejects blank or overly long text fields
pub(crate) fn check_text(field: &str, value: &str, max: usize) -> WorkflowResult<()> {
    let length = value.trim().chars().count();

    if length == 0 || length > max {
        return Err(WorkflowError::Validation(format!(
            "{field} must be between 1 and {max} characters"
        )));
    }

    Ok(())
}

/// Like [check_text], but for fields that may be left out
pub(crate) fn check_optional_text(
    field: &str,
    value: Option<&str>,
    max: usize,
) -> WorkflowResult<()> {
    match value {
        Some(value) => check_text(field, value, max),
        None => Ok(()),
    }
}
