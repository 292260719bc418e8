use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use log::error;
use serde::Serialize;
use shams_collab::{AuthError, DatabaseError, WorkflowError};
use thiserror::Error;
use utoipa::ToSchema;

pub type ServerResult<T> = Result<T, ServerError>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Not allowed: {0}")]
    Forbidden(String),
    #[error("{resource}:{identifier} not found")]
    NotFound {
        resource: &'static str,
        identifier: &'static str,
    },
    #[error("{resource} with {field} of value {value} already exists")]
    Conflict {
        resource: &'static str,
        field: &'static str,
        value: String,
    },
    #[error("{resource} {id} is full")]
    CapacityExceeded { resource: &'static str, id: i32 },
    #[error("Constraint violated: {0}")]
    ConstraintViolation(String),
    #[error("{resource} {id} is already {status}")]
    StateConflict {
        resource: &'static str,
        id: i32,
        status: String,
    },
    #[error("{resource} is still referenced by {dependents}")]
    HasDependents {
        resource: &'static str,
        dependents: &'static str,
    },
    #[error("An admin already exists")]
    AdminExists,
    #[error("Unknown internal error: {0}")]
    Unknown(String),
}

/// The body of every failed request
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Machine readable error kind, e.g. `capacity_exceeded`
    error: String,
    message: String,
}

impl ServerError {
    fn as_status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::InvalidCredentials => StatusCode::BAD_REQUEST,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Conflict { .. }
            | Self::CapacityExceeded { .. }
            | Self::ConstraintViolation(_)
            | Self::StateConflict { .. }
            | Self::HasDependents { .. }
            | Self::AdminExists => StatusCode::CONFLICT,
            Self::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::InvalidCredentials => "invalid_credentials",
            Self::Forbidden(_) => "forbidden",
            Self::NotFound { .. } => "not_found",
            Self::Conflict { .. } => "conflict",
            Self::CapacityExceeded { .. } => "capacity_exceeded",
            Self::ConstraintViolation(_) => "constraint_violation",
            Self::StateConflict { .. } => "state_conflict",
            Self::HasDependents { .. } => "has_dependents",
            Self::AdminExists => "admin_exists",
            Self::Unknown(_) => "internal",
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        if let Self::Unknown(message) = &self {
            error!("Request failed: {}", message);
        }

        let body = ErrorBody {
            error: self.kind().to_string(),
            message: self.to_string(),
        };

        (self.as_status_code(), Json(body)).into_response()
    }
}

impl From<AuthError> for ServerError {
    fn from(value: AuthError) -> Self {
        match value {
            AuthError::InvalidCredentials => Self::InvalidCredentials,
            AuthError::AdminExists => Self::AdminExists,
            AuthError::NotAdmin => Self::Forbidden("only admins can create wardens".to_string()),
            AuthError::Validation(message) => Self::Validation(message),
            AuthError::Db(e) => e.into(),
            e => Self::Unknown(e.to_string()),
        }
    }
}

impl From<DatabaseError> for ServerError {
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
            e => Self::Unknown(e.to_string()),
        }
    }
}

impl From<WorkflowError> for ServerError {
    fn from(value: WorkflowError) -> Self {
        match value {
            WorkflowError::Validation(message) => Self::Validation(message),
            WorkflowError::NotFound {
                resource,
                identifier,
            } => Self::NotFound {
                resource,
                identifier,
            },
            WorkflowError::CapacityExceeded { resource, id } => {
                Self::CapacityExceeded { resource, id }
            }
            WorkflowError::ConstraintViolation(message) => Self::ConstraintViolation(message),
            WorkflowError::StateConflict {
                resource,
                id,
                status,
            } => Self::StateConflict {
                resource,
                id,
                status: status.to_string(),
            },
            WorkflowError::Forbidden(message) => Self::Forbidden(message),
            WorkflowError::Conflict {
                resource,
                field,
                value,
            } => Self::Conflict {
                resource,
                field,
                value,
            },
            WorkflowError::HasDependents {
                resource,
                dependents,
            } => Self::HasDependents {
                resource,
                dependents,
            },
            WorkflowError::Database(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod test {
    use axum::{http::StatusCode, response::IntoResponse};
    use shams_collab::{AuthError, WorkflowError};
    use shams_core::RequestStatus;

    use super::ServerError;

    fn status(error: impl Into<ServerError>) -> StatusCode {
        let error: ServerError = error.into();
        error.into_response().status()
    }

    #[test]
    fn workflow_errors_map_to_statuses() {
        assert_eq!(
            status(WorkflowError::Validation("rating".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(WorkflowError::Forbidden("warden".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status(WorkflowError::NotFound {
                resource: "room",
                identifier: "id"
            }),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status(WorkflowError::CapacityExceeded {
                resource: "room",
                id: 4
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status(WorkflowError::StateConflict {
                resource: "hostel request",
                id: 1,
                status: RequestStatus::Rejected
            }),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn auth_errors_map_to_statuses() {
        assert_eq!(
            status(AuthError::InvalidCredentials),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status(AuthError::NotAdmin), StatusCode::FORBIDDEN);
        assert_eq!(status(AuthError::AdminExists), StatusCode::CONFLICT);
    }

    #[test]
    fn state_conflicts_name_the_status() {
        let error: ServerError = WorkflowError::StateConflict {
            resource: "hostel request",
            id: 9,
            status: RequestStatus::Approved,
        }
        .into();

        assert_eq!(error.to_string(), "hostel request 9 is already approved");
    }
}
