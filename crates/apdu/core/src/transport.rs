//! Transport layer for card communication
//!
//! A transport owns the physical reader channel. It moves raw bytes and
//! reports the reader's [`ReaderStatus`]; chaining lives one layer up in
//! [`CardExecutor`](crate::CardExecutor).

use std::fmt;

use bytes::Bytes;
use tracing::{debug, trace};

use crate::reader::ReaderStatus;
use crate::Result;

/// Trait for card transport connections
pub trait CardTransport: fmt::Debug + Send {
    /// Send a raw APDU command and get the raw response, status word included
    fn transmit_raw(&mut self, command: &[u8]) -> Result<Bytes> {
        trace!(command = %hex::encode(command), "Transmitting raw command");
        let response = self.do_transmit_raw(command);
        match &response {
            Ok(bytes) => trace!(response = %hex::encode(bytes), "Received raw response"),
            Err(err) => debug!(error = %err, "Raw transmit failed"),
        }
        response
    }

    /// Internal implementation of transmit_raw
    fn do_transmit_raw(&mut self, command: &[u8]) -> Result<Bytes>;

    /// Last known reader status, without touching hardware
    fn reader_status(&self) -> ReaderStatus;

    /// Process pending hardware events and return the resulting status
    fn poll_status(&mut self) -> ReaderStatus {
        self.reader_status()
    }

    /// Release the card connection
    fn disconnect(&mut self);
}

impl<T: CardTransport + ?Sized> CardTransport for Box<T> {
    fn transmit_raw(&mut self, command: &[u8]) -> Result<Bytes> {
        (**self).transmit_raw(command)
    }

    fn do_transmit_raw(&mut self, command: &[u8]) -> Result<Bytes> {
        (**self).do_transmit_raw(command)
    }

    fn reader_status(&self) -> ReaderStatus {
        (**self).reader_status()
    }

    fn poll_status(&mut self) -> ReaderStatus {
        (**self).poll_status()
    }

    fn disconnect(&mut self) {
        (**self).disconnect();
    }
}

#[cfg(test)]
pub(crate) use mock::MockTransport;
