//! Error types for PC/SC transport

use vxauth_apdu_core::Error as ApduError;

/// PC/SC-specific errors
#[derive(Debug, thiserror::Error)]
pub enum PcscError {
    /// PC/SC error
    #[error("PC/SC error: {0}")]
    Pcsc(#[from] pcsc::Error),

    /// No readers available
    #[error("No readers available")]
    NoReadersAvailable,

    /// Reader not found
    #[error("Reader not found: {0}")]
    ReaderNotFound(String),

    /// No card present in reader
    #[error("No card present in reader: {0}")]
    NoCard(String),
}

impl From<PcscError> for ApduError {
    fn from(err: PcscError) -> Self {
        match err {
            PcscError::NoCard(_) | PcscError::Pcsc(pcsc::Error::NoSmartcard) => {
                Self::ConnectionError
            }
            other => Self::transmit_failure(other),
        }
    }
}
