use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use super::domain::PropertyStatus;
use super::receipts::ReceiptId;
use super::repository::RepositoryError;

/// Failures surfaced by marketplace operations. None are retried; the caller fixes the
/// condition and resubmits.
#[derive(Debug, thiserror::Error)]
pub enum MarketplaceError {
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("{0}")]
    InvalidState(String),
    #[error("invalid status transition from {from} to {to}")]
    InvalidTransition {
        from: PropertyStatus,
        to: PropertyStatus,
    },
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("deal receipt {0} is already cancelled")]
    AlreadyCancelled(ReceiptId),
    #[error(transparent)]
    Repository(RepositoryError),
}

impl MarketplaceError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Stable error category reported to API clients.
    pub fn kind(&self) -> &'static str {
        match self {
            MarketplaceError::NotFound { .. } => "not_found",
            MarketplaceError::Forbidden(_) => "forbidden",
            MarketplaceError::InvalidState(_) | MarketplaceError::InvalidTransition { .. } => {
                "invalid_state"
            }
            MarketplaceError::Conflict(_) => "conflict",
            MarketplaceError::Validation(_) => "validation_error",
            MarketplaceError::AlreadyCancelled(_) => "already_cancelled",
            MarketplaceError::Repository(_) => "storage_error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            MarketplaceError::NotFound { .. } => StatusCode::NOT_FOUND,
            MarketplaceError::Forbidden(_) => StatusCode::FORBIDDEN,
            MarketplaceError::InvalidState(_)
            | MarketplaceError::InvalidTransition { .. }
            | MarketplaceError::Validation(_) => StatusCode::BAD_REQUEST,
            MarketplaceError::Conflict(_) | MarketplaceError::AlreadyCancelled(_) => {
                StatusCode::CONFLICT
            }
            MarketplaceError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<RepositoryError> for MarketplaceError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Conflict(message) => Self::Conflict(message),
            RepositoryError::StaleWrite { entity, id } => Self::Conflict(format!(
                "{entity} '{id}' was modified concurrently; reload and retry"
            )),
            RepositoryError::NotFound { entity, id } => Self::NotFound { entity, id },
            other => Self::Repository(other),
        }
    }
}

impl From<JsonRejection> for MarketplaceError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for MarketplaceError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl IntoResponse for MarketplaceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "marketplace storage failure");
        }

        let body = Json(json!({
            "error": self.to_string(),
            "kind": self.kind(),
        }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_writes_surface_as_conflicts() {
        let error = MarketplaceError::from(RepositoryError::StaleWrite {
            entity: "property",
            id: "prop-1".to_string(),
        });
        assert_eq!(error.kind(), "conflict");
        assert_eq!(error.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn invalid_transition_reports_invalid_state_kind() {
        let error = MarketplaceError::InvalidTransition {
            from: PropertyStatus::Archived,
            to: PropertyStatus::Rented,
        };
        assert_eq!(error.kind(), "invalid_state");
        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            error.to_string(),
            "invalid status transition from archived to rented"
        );
    }

    #[test]
    fn unavailable_storage_is_a_server_error() {
        let error = MarketplaceError::from(RepositoryError::Unavailable("offline".to_string()));
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
