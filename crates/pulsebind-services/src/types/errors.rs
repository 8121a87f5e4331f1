// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Service layer error types.

Transport-agnostic errors that an HTTP adapter maps to status codes
(409, 404, 403, 400, 500).
*/

use pulsebind_registry::RegistryError;
use thiserror::Error;

use crate::category::CategoryError;
use crate::sample_id::SampleIdError;
use crate::store::StoreError;

/// Service layer errors (transport-agnostic)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Duplicate registration or binding to a different owner (409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Unknown or expired id, missing record (404)
    #[error("Not found: {resource} with id '{id}'")]
    NotFound { resource: String, id: String },

    /// Owner mismatch (403)
    #[error("Operation not permitted: {0}")]
    Forbidden(String),

    /// Malformed identifier or unrecognized category code (400)
    #[error("Format error: {0}")]
    Format(String),

    /// Invalid input parameters (400)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Persistence failure (500)
    #[error("Storage error: {0}")]
    Storage(String),
}

impl ServiceError {
    pub(crate) fn sample_not_found(id: &str) -> Self {
        ServiceError::NotFound {
            resource: "Sample".to_string(),
            id: id.to_string(),
        }
    }
}

/// Result type for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

// ============================================================================
// ERROR CONVERSIONS FROM LOWER LAYERS
// ============================================================================

impl From<RegistryError> for ServiceError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::Conflict(id) => {
                ServiceError::Conflict(format!("rendezvous already pending for '{}'", id))
            }
            RegistryError::NotFound(id) => ServiceError::NotFound {
                resource: "Rendezvous".to_string(),
                id,
            },
            RegistryError::InvalidId(msg) => ServiceError::InvalidInput(msg),
            RegistryError::InvalidTtl => ServiceError::InvalidInput(err.to_string()),
            RegistryError::RuntimeUnavailable => ServiceError::Storage(err.to_string()),
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => ServiceError::sample_not_found(&id),
            StoreError::Conflict(id) => {
                ServiceError::Conflict(format!("sample '{}' already exists", id))
            }
            StoreError::VersionConflict { .. } | StoreError::Backend(_) => {
                ServiceError::Storage(err.to_string())
            }
        }
    }
}

impl From<SampleIdError> for ServiceError {
    fn from(err: SampleIdError) -> Self {
        ServiceError::Format(err.to_string())
    }
}

impl From<CategoryError> for ServiceError {
    fn from(err: CategoryError) -> Self {
        ServiceError::Format(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_errors_map_to_taxonomy() {
        assert!(matches!(
            ServiceError::from(RegistryError::Conflict("S1".into())),
            ServiceError::Conflict(_)
        ));
        assert_eq!(
            ServiceError::from(RegistryError::NotFound("S1".into())),
            ServiceError::NotFound {
                resource: "Rendezvous".to_string(),
                id: "S1".to_string()
            }
        );
    }

    #[test]
    fn test_store_errors_map_to_taxonomy() {
        assert!(matches!(
            ServiceError::from(StoreError::VersionConflict {
                expected: 1,
                actual: 2
            }),
            ServiceError::Storage(_)
        ));
        assert!(matches!(
            ServiceError::from(StoreError::NotFound("S1".into())),
            ServiceError::NotFound { .. }
        ));
    }

    #[test]
    fn test_format_errors() {
        assert!(matches!(
            ServiceError::from(CategoryError::UnknownChannel(99)),
            ServiceError::Format(_)
        ));
    }
}
