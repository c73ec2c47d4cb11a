//! Error types for the ONTAP driver common layer
//!
//! Provides structured error types for driver initialization, pool discovery,
//! per-volume workflows and the failures reported by the management API.

use thiserror::Error;

/// ZAPI code returned when a named object (volume, snapshot) does not exist
pub const EOBJECTNOTFOUND: &str = "15661";

/// ZAPI code returned when the caller lacks privilege for an API
pub const EAPIPRIVILEGE: &str = "13003";

/// ZAPI code returned when an API is not available at the caller's scope
pub const EAPINOTFOUND: &str = "13005";

// =============================================================================
// Management API Errors
// =============================================================================

/// Failure reported by the management API collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The request never produced a reply (connection, TLS, timeout)
    #[error("transport error: {0}")]
    Transport(String),

    /// The cluster replied with a failed status
    #[error("API status: failed, reason: {reason}, code: {code}")]
    Remote { code: String, reason: String },
}

impl ApiError {
    /// Build a remote error from a ZAPI code and reason
    pub fn remote(code: impl Into<String>, reason: impl Into<String>) -> Self {
        ApiError::Remote {
            code: code.into(),
            reason: reason.into(),
        }
    }

    /// Remote error code, if the cluster replied
    pub fn code(&self) -> Option<&str> {
        match self {
            ApiError::Remote { code, .. } => Some(code),
            ApiError::Transport(_) => None,
        }
    }

    /// The named object does not exist
    pub fn is_object_not_found(&self) -> bool {
        self.code() == Some(EOBJECTNOTFOUND)
    }

    /// The user is not permitted to call the API at its current scope
    pub fn is_scope_error(&self) -> bool {
        matches!(self.code(), Some(EAPIPRIVILEGE) | Some(EAPINOTFOUND))
    }
}

// =============================================================================
// Driver Errors
// =============================================================================

/// Unified error type for the driver
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Size parse error: {0}")]
    SizeParse(String),

    // =========================================================================
    // Endpoint Errors
    // =========================================================================
    #[error("Host lookup failed for {host}: {reason}")]
    EndpointUnreachable { host: String, reason: String },

    #[error("Cannot derive SVM to use; no SVMs are visible, please specify SVM in config file")]
    NoContext,

    #[error("Cannot derive SVM to use; {count} SVMs are visible, please specify SVM in config file")]
    AmbiguousContext { count: usize },

    #[error("No NAS data LIFs found on SVM {svm}")]
    NoDataLifs { svm: String },

    #[error("Data LIF validation failed: could not find Data LIF for {address}")]
    DataLifMismatch { address: String },

    #[error("Unsupported ONTAP version: {0}")]
    UnsupportedVersion(String),

    // =========================================================================
    // Pool Discovery Errors
    // =========================================================================
    #[error("SVM {svm} has no assigned aggregates")]
    NoCapacity { svm: String },

    #[error("Aggregate {aggregate} does not exist or is not assigned to SVM {svm}")]
    AggregateNotAssigned { aggregate: String, svm: String },

    #[error("Unable to inspect ONTAP backend: {reason}\nStack trace:\n{trace}")]
    DiscoveryFailed { reason: String, trace: String },

    // =========================================================================
    // Volume Errors
    // =========================================================================
    #[error("Volume {volume} already exists")]
    AlreadyExists { volume: String },

    #[error("Volume {volume} does not exist")]
    VolumeNotFound { volume: String },

    #[error("Error creating snapshot {snapshot} of volume {volume}: {source}")]
    SnapshotCreateFailed {
        snapshot: String,
        volume: String,
        #[source]
        source: ApiError,
    },

    #[error("Snapshot {snapshot} does not exist in volume {volume}")]
    SnapshotNotFound { snapshot: String, volume: String },

    #[error("Error creating clone {volume}: {source}")]
    CloneCreateFailed {
        volume: String,
        #[source]
        source: ApiError,
    },

    #[error("Error mounting volume {volume} to junction {junction}: {source}")]
    MountFailed {
        volume: String,
        junction: String,
        #[source]
        source: ApiError,
    },

    #[error("Error splitting clone {volume}: {source}")]
    SplitFailed {
        volume: String,
        #[source]
        source: ApiError,
    },

    #[error("Requested volume size ({requested} bytes) is too small; the minimum volume size is {minimum} bytes")]
    VolumeSizeTooSmall { requested: u64, minimum: u64 },

    #[error("Encrypted volumes are not supported on this storage backend")]
    EncryptionUnsupported,

    // =========================================================================
    // Local Host Errors
    // =========================================================================
    #[error("Unsupported operating system: {os}")]
    UnsupportedPlatform { os: String },

    #[error("Error {operation} NFS volume on mountpoint {mountpoint}: {reason}")]
    LocalMount {
        operation: String,
        mountpoint: String,
        reason: String,
    },

    // =========================================================================
    // Wrapped Errors
    // =========================================================================
    #[error("Management API error: {0}")]
    Api(#[from] ApiError),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// How far the damage of an error reaches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorScope {
    /// Backend startup must abort
    Initialization,
    /// Backend starts but cannot be used for provisioning
    Backend,
    /// Only the current operation failed
    Operation,
}

impl Error {
    /// Determine which layer this error is fatal to
    pub fn scope(&self) -> ErrorScope {
        match self {
            Error::Config(_)
            | Error::SizeParse(_)
            | Error::EndpointUnreachable { .. }
            | Error::NoContext
            | Error::AmbiguousContext { .. }
            | Error::NoDataLifs { .. }
            | Error::DataLifMismatch { .. }
            | Error::UnsupportedVersion(_)
            | Error::JsonParse(_) => ErrorScope::Initialization,

            Error::NoCapacity { .. }
            | Error::AggregateNotAssigned { .. }
            | Error::DiscoveryFailed { .. } => ErrorScope::Backend,

            _ => ErrorScope::Operation,
        }
    }

    /// Check if this error prevents the backend from starting
    pub fn is_fatal_to_initialization(&self) -> bool {
        self.scope() == ErrorScope::Initialization
    }

    /// The remote failure underneath this error, if any
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Error::Api(e)
            | Error::SnapshotCreateFailed { source: e, .. }
            | Error::CloneCreateFailed { source: e, .. }
            | Error::MountFailed { source: e, .. }
            | Error::SplitFailed { source: e, .. } => Some(e),
            _ => None,
        }
    }
}

/// Result type alias for the driver
pub type Result<T> = std::result::Result<T, Error>;
