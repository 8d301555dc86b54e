//! Core error type for all APDU operations
//!
//! Transport, codec and chaining failures all surface through [`Error`]. None
//! of them are fatal: the polling loop treats every variant as a reason to
//! re-poll the reader.

use crate::reader::ReaderStatus;
use crate::response::status::StatusWord;

/// Result type for APDU operations
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Core error type that encompasses all possible errors in the crate
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    //
    // Transport related errors
    //
    /// The reader is not in the `ready` state
    #[error("Reader not ready: status is {0}")]
    ReaderNotReady(ReaderStatus),

    /// The underlying transport rejected the write
    #[error("Transmit failure: {0}")]
    TransmitFailure(String),

    /// Failed to connect to the card
    #[error("Connection error: failed to connect to card")]
    ConnectionError,

    //
    // Response related errors
    //
    /// A response shorter than the two status word bytes
    #[error("Malformed response: {0} bytes received, at least 2 required")]
    MalformedResponse(usize),

    /// The final status word was neither success nor a continuation
    #[error("Response APDU error: {status} ({})", status.description())]
    ResponseApduError {
        /// Status word returned by the card
        status: StatusWord,
    },

    /// The card kept signalling more data beyond the chain limit
    #[error("Chain limit exceeded after {0} GET RESPONSE commands")]
    ChainLimitExceeded(usize),

    //
    // Command related errors
    //
    /// Command data does not fit in a single short APDU
    #[error("Command data too long for a single APDU: {actual} bytes (max {max})")]
    DataTooLong {
        /// Length of the offending data
        actual: usize,
        /// Single-APDU maximum
        max: usize,
    },

    /// Raw command bytes could not be parsed
    #[error("Invalid command length: {0}")]
    InvalidCommandLength(usize),

    //
    // General errors
    //
    /// Context error with message and source error
    #[error("{context}: {source}")]
    Context {
        /// Contextual message
        context: String,
        /// Source error
        source: Box<Self>,
    },
}

impl Error {
    /// Create a new error with context information
    pub fn with_context<S: Into<String>>(self, context: S) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Create a transmit failure from any displayable driver error
    pub fn transmit_failure(err: impl std::fmt::Display) -> Self {
        Self::TransmitFailure(err.to_string())
    }

    /// Create a response APDU error from raw status bytes
    pub const fn status(sw1: u8, sw2: u8) -> Self {
        Self::ResponseApduError {
            status: StatusWord::new(sw1, sw2),
        }
    }

    /// Strip any context wrappers and return the innermost error
    pub fn root(&self) -> &Self {
        match self {
            Self::Context { source, .. } => source.root(),
            other => other,
        }
    }

    /// Status word carried by this error, looking through context wrappers
    pub fn status_word(&self) -> Option<StatusWord> {
        match self.root() {
            Self::ResponseApduError { status } => Some(*status),
            _ => None,
        }
    }
}

/// Extension trait for Result with APDU Errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context<S: Into<String>>(self, context: S) -> Result<T, Error>;
}

impl<T> ResultExt<T> for Result<T, Error> {
    fn context<S: Into<String>>(self, context: S) -> Self {
        self.map_err(|e| e.with_context(context))
    }
}
