//! Auth error type

/// Errors from operations that touch the card on behalf of a user
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The card could not be read or written
    #[error(transparent)]
    Card(#[from] vxauth_card::Error),

    /// Poll worker cards need the machine's election
    #[error("Machine is not configured for an election")]
    MachineNotConfigured,
}

/// Result type for auth operations
pub type Result<T, E = Error> = std::result::Result<T, E>;
