// SPDX-FileCopyrightText: © 2024 Technical University of Munich, Chair of Connected Mobility
// SPDX-FileCopyrightText: © 2024 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

/// User-facing error categories of every operation exposed by the control
/// plane. The display string is the bare message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ControlPlaneError {
    /// Client-correctable: missing or conflicting fields, no-op updates, etc.
    #[error("{0}")]
    BadRequest(String),
    /// The addressed identifier has no record.
    #[error("{0}")]
    NotFound(String),
    /// Leader interruption, storage or network failures.
    #[error("{0}")]
    InternalError(String),
}

impl ControlPlaneError {
    /// HTTP-equivalent status code, for the API binding layer.
    pub fn status_code(&self) -> u16 {
        match self {
            ControlPlaneError::BadRequest(_) => 400,
            ControlPlaneError::NotFound(_) => 404,
            ControlPlaneError::InternalError(_) => 500,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ControlPlaneError::BadRequest(msg) | ControlPlaneError::NotFound(msg) | ControlPlaneError::InternalError(msg) => msg,
        }
    }
}

/// Failures of the package resolution path. Variants are kept apart so that
/// the caller can tell a bad user-supplied location from a fetch failure.
#[derive(Debug, thiserror::Error)]
pub enum PackageError {
    #[error("Invalid package location: {0}")]
    InvalidUrl(String),
    #[error("Encountered error {reason} when getting Function package from {url}")]
    Fetch { url: String, reason: String },
    #[error("Could not access {path}: {source}")]
    LocalIo {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Built-in {component_type} {name} is not available")]
    NotInRegistry {
        component_type: crate::deployment::ComponentType,
        name: String,
    },
    #[error("Function package {0} not found")]
    ReferenceNotFound(String),
    #[error("{0}")]
    Storage(String),
}

impl From<PackageError> for ControlPlaneError {
    fn from(err: PackageError) -> Self {
        match err {
            PackageError::InvalidUrl(_) | PackageError::NotInRegistry { .. } | PackageError::ReferenceNotFound(_) => {
                ControlPlaneError::BadRequest(err.to_string())
            }
            PackageError::Fetch { .. } | PackageError::LocalIo { .. } | PackageError::Storage(_) => ControlPlaneError::InternalError(err.to_string()),
        }
    }
}

/// Outcome reported by the leader for a forwarded write.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LeaderError {
    /// The leader re-validated the write and refused it.
    #[error("{0}")]
    InvalidArgument(String),
    /// The leader was interrupted mid-write or lost its leadership.
    #[error("{0}")]
    Interrupted(String),
    /// The leader or its store cannot be reached right now.
    #[error("{0}")]
    Unavailable(String),
    /// The record version does not follow the stored one.
    #[error("{0}")]
    Conflict(String),
}

/// Classification of a leader outcome by the metadata gateway.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// Caller/validation-class failure.
    #[error("{0}")]
    Rejected(String),
    /// State/interruption-class failure; not retried by the gateway.
    #[error("{0}")]
    Failed(String),
}

impl From<GatewayError> for ControlPlaneError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Rejected(msg) => ControlPlaneError::BadRequest(msg),
            GatewayError::Failed(msg) => ControlPlaneError::InternalError(msg),
        }
    }
}
