use iso7816_tlv::TlvError;

use crate::pin::ValidationError;

/// Result type for card operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for card operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transport, codec and status word errors
    #[error(transparent)]
    Apdu(#[from] vxauth_apdu_core::Error),

    /// Malformed TLV data
    #[error("TlvError: {0}")]
    TlvError(TlvError),

    /// Data read from the card did not have the expected shape
    #[error("Invalid data: {0}")]
    InvalidData(&'static str),

    /// Rejected user input
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl From<TlvError> for Error {
    fn from(error: TlvError) -> Self {
        Self::TlvError(error)
    }
}
