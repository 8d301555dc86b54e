//! APDU codec and card transport for VxAuth smart cards
//!
//! This crate provides the foundational types for talking to a smart card
//! according to ISO/IEC 7816-4:
//!
//! - [`Command`] and [`Response`] encode and decode single short APDUs
//! - [`CardTransport`] abstracts over the physical reader
//! - [`CardExecutor`] performs command chaining and GET RESPONSE reassembly
//! - [`ReaderStatusTracker`] folds raw reader events into a [`ReaderStatus`]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

pub use bytes::{Bytes, BytesMut};

pub mod command;
pub mod error;
pub mod executor;
pub mod reader;
pub mod response;
pub mod transport;

pub use command::{Command, ExpectedLength, MAX_SHORT_DATA_LEN};
pub use error::{Error, Result, ResultExt};
pub use executor::CardExecutor;
pub use reader::{CardConnector, ReaderEvent, ReaderStatus, ReaderStatusTracker};
pub use response::Response;
pub use response::status::StatusWord;
pub use transport::CardTransport;

/// Prelude module containing commonly used traits and types
pub mod prelude {
    pub use crate::response::status::{StatusWord, common as status};
    pub use crate::{
        Bytes, BytesMut, CardConnector, CardExecutor, CardTransport, Command, Error,
        ReaderStatus, Response, Result, ResultExt,
    };
}
