//! Error types for Verdant.
//!
//! All errors in Verdant are strongly typed using thiserror.
//! Callers match on the specific variant (or use the `is_*` helpers on
//! [`GardenError`]) to map a failure onto their own response codes.

use thiserror::Error;

use crate::plant::{OwnerId, PlantId};

/// Validation errors that occur during input validation.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// An owner id of zero.
    #[error("Invalid owner id {value}: owner ids must be positive")]
    InvalidOwnerId {
        /// The rejected raw id.
        value: u64,
    },

    /// A plant id of zero.
    #[error("Invalid plant id {value}: plant ids must be positive")]
    InvalidPlantId {
        /// The rejected raw id.
        value: u64,
    },

    /// An action token other than `water` or `feed`.
    #[error("Invalid action '{token}': expected 'water' or 'feed'")]
    InvalidAction {
        /// The token as received.
        token: String,
    },

    /// A configuration value that cannot be used.
    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        /// What is wrong with it.
        reason: String,
    },
}

/// Errors raised by a plant store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The owner holds no plants.
    #[error("No plants found for owner {0}")]
    OwnerNotFound(OwnerId),

    /// The owner exists but the plant id does not.
    #[error("Plant {plant} not found for owner {owner}")]
    PlantNotFound {
        /// Owner that was searched.
        owner: OwnerId,
        /// Missing plant id.
        plant: PlantId,
    },

    /// The store only allows one plant per owner and the owner already has one.
    #[error("Owner {0} already has a plant")]
    AlreadyExists(OwnerId),

    /// Backend error (e.g. poisoned lock).
    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Errors raised by a persistence sink.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Filesystem failure.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File or directory involved.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A snapshot could not be encoded or decoded.
    #[error("Serialization error on {path}: {source}")]
    Serialization {
        /// File involved.
        path: String,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
}

/// Top-level error type for Verdant.
#[derive(Debug, Error)]
pub enum GardenError {
    /// Bad input.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Store failure, including not-found and already-exists.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Snapshot directory failure.
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// Anything else.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the failure.
        message: String,
    },
}

impl GardenError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if the owner or plant does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::Storage(StorageError::OwnerNotFound(_) | StorageError::PlantNotFound { .. })
        )
    }

    /// Returns true if a create was rejected by the single-plant policy.
    #[must_use]
    pub const fn is_already_exists(&self) -> bool {
        matches!(self, Self::Storage(StorageError::AlreadyExists(_)))
    }

    /// Returns true if the action token was not recognized.
    #[must_use]
    pub const fn is_invalid_action(&self) -> bool {
        matches!(self, Self::Validation(ValidationError::InvalidAction { .. }))
    }

    /// Returns true if an identifier or config value was malformed.
    #[must_use]
    pub const fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            Self::Validation(
                ValidationError::InvalidOwnerId { .. }
                    | ValidationError::InvalidPlantId { .. }
                    | ValidationError::InvalidConfig { .. }
            )
        )
    }

    /// Short machine-readable name of the error class.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        if self.is_not_found() {
            "not_found"
        } else if self.is_already_exists() {
            "already_exists"
        } else if self.is_invalid_action() {
            "invalid_action"
        } else if self.is_invalid_argument() {
            "invalid_argument"
        } else {
            "internal"
        }
    }
}

/// Result type alias for Verdant operations.
pub type GardenResult<T> = Result<T, GardenError>;
