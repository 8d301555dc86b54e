//! Artifact error types

use std::path::PathBuf;

/// Errors while producing a signature
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    /// Reading the artifact or writing the signature failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Listing a directory artifact failed
    #[error("Failed to walk directory: {0}")]
    Walk(#[from] walkdir::Error),

    /// A file inside a directory artifact has a name that is not UTF-8
    #[error("Path is not valid UTF-8: {}", .0.display())]
    NonUtf8Path(PathBuf),

    /// A directory artifact holds something other than files and directories
    #[error("Unsupported entry in directory artifact: {}", .0.display())]
    UnsupportedEntry(PathBuf),

    /// The signing key could not be loaded
    #[error("Invalid signing key: {0}")]
    InvalidKey(String),

    /// The signing machine certificate could not be loaded
    #[error("Invalid certificate: {0}")]
    InvalidCertificate(String),

    /// The signing key does not belong to the certificate
    #[error("Signing key does not match the signing machine certificate")]
    KeyCertificateMismatch,

    /// No signature of an encodable length could be produced
    #[error("Could not produce a signature between {min} and {max} bytes")]
    SignatureLength {
        /// Shortest accepted signature
        min: usize,
        /// Longest accepted signature
        max: usize,
    },

    /// A signature bundle was malformed
    #[error("Malformed signature bundle")]
    MalformedBundle,
}

/// Result type for signing
pub type Result<T, E = ArtifactError> = std::result::Result<T, E>;

/// The one failure verification reports
///
/// The cause is logged at debug level and deliberately not exposed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Failed to authenticate artifact at {}", artifact_path.display())]
pub struct ArtifactAuthenticationError {
    /// The artifact that failed
    pub artifact_path: PathBuf,
}
