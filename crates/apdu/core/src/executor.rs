//! Chaining executor
//!
//! [`CardExecutor`] turns one logical [`Command`] into however many short
//! APDUs it takes: oversized command data goes out as a CLA-flagged chain,
//! and `61 XX` responses are drained with GET RESPONSE until the card
//! answers `90 00`.

use bytes::{Bytes, BytesMut};
use tracing::{debug, instrument, trace};

use crate::command::{CLA_ISO, Command};
use crate::error::ResultExt;
use crate::reader::ReaderStatus;
use crate::response::Response;
use crate::transport::CardTransport;
use crate::{Error, Result};

/// GET RESPONSE instruction byte
pub const INS_GET_RESPONSE: u8 = 0xC0;

/// Default cap on GET RESPONSE round trips for one command
///
/// 256 continuations of up to 256 bytes cover the largest object a card
/// can hold.
pub const DEFAULT_MAX_GET_RESPONSE: usize = 256;

/// Card executor performing command and response chaining over a transport
#[derive(Debug)]
pub struct CardExecutor<T: CardTransport> {
    /// The transport used for communication
    transport: T,
    /// Maximum number of GET RESPONSE commands per logical command
    max_get_response: usize,
}

impl<T: CardTransport> CardExecutor<T> {
    /// Create a new card executor with the given transport
    pub const fn new(transport: T) -> Self {
        Self {
            transport,
            max_get_response: DEFAULT_MAX_GET_RESPONSE,
        }
    }

    /// Override the GET RESPONSE chain limit
    pub const fn with_max_get_response(mut self, max: usize) -> Self {
        self.max_get_response = max;
        self
    }

    /// Get a reference to the underlying transport
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Get a mutable reference to the underlying transport
    pub const fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Take ownership of the transport and return it
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Last known reader status
    pub fn reader_status(&self) -> ReaderStatus {
        self.transport.reader_status()
    }

    /// Process pending hardware events and return the resulting status
    pub fn poll_status(&mut self) -> ReaderStatus {
        self.transport.poll_status()
    }

    /// Send one logical command and return the reassembled response data
    ///
    /// The status word is stripped once the final response is `90 00`.
    ///
    /// # Errors
    /// * [`Error::ReaderNotReady`] when the reader is not `ready`
    /// * [`Error::TransmitFailure`] when the transport rejects a write
    /// * [`Error::MalformedResponse`] for replies shorter than two bytes
    /// * [`Error::ResponseApduError`] for any other final status word
    /// * [`Error::ChainLimitExceeded`] when the card never stops sending
    #[instrument(level = "trace", skip(self, command), fields(ins = command.ins, data_len = command.data.len()))]
    pub fn transmit(&mut self, command: &Command) -> Result<Bytes> {
        let status = self.transport.reader_status();
        if !status.is_ready() {
            return Err(Error::ReaderNotReady(status));
        }

        let fragments = command.chain()?;
        let fragment_count = fragments.len();
        if fragment_count > 1 {
            debug!(fragments = fragment_count, "Sending chained command");
        }

        let mut response = None;
        for (i, fragment) in fragments.iter().enumerate() {
            let current = self.transmit_single(fragment)?;
            if i + 1 < fragment_count && !current.is_success() {
                debug!(
                    fragment = i,
                    status = %current.status,
                    "Card rejected command fragment"
                );
                return Err(Error::ResponseApduError {
                    status: current.status,
                });
            }
            response = Some(current);
        }

        match response {
            Some(response) => self.collect_response(response),
            None => Err(Error::InvalidCommandLength(0)),
        }
    }

    /// Encode, send and decode one short APDU
    fn transmit_single(&mut self, command: &Command) -> Result<Response> {
        let bytes = command.to_bytes()?;
        let raw = self
            .transport
            .transmit_raw(&bytes)
            .context("Failed to transmit command")?;
        Response::from_bytes(&raw)
    }

    /// Drain `61 XX` continuations and check the final status word
    fn collect_response(&mut self, mut response: Response) -> Result<Bytes> {
        if !response.more_data_available() {
            return response.into_result();
        }

        let mut buffer = BytesMut::from(response.data.as_ref());
        let mut chain_count = 0;

        while let Some(le) = response.status.remaining_bytes() {
            if chain_count >= self.max_get_response {
                return Err(Error::ChainLimitExceeded(chain_count));
            }

            trace!(le, chain_count, "Sending GET RESPONSE");
            let get_response = Command::new_with_le(CLA_ISO, INS_GET_RESPONSE, 0x00, 0x00, le);
            response = self
                .transmit_single(&get_response)
                .context("Failed to retrieve chained response")?;
            buffer.extend_from_slice(&response.data);
            chain_count += 1;
        }

        if response.is_success() {
            Ok(buffer.freeze())
        } else {
            Err(Error::ResponseApduError {
                status: response.status,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;

    #[test]
    fn test_simple_success_strips_status() {
        let transport = MockTransport::new([&[0x01, 0x02, 0x90, 0x00][..]]);
        let mut executor = CardExecutor::new(transport);

        let data = executor
            .transmit(&Command::new_with_le(0x00, 0xCB, 0x3F, 0xFF, 0x00))
            .unwrap();
        assert_eq!(data.as_ref(), &[0x01, 0x02]);
    }

    #[test]
    fn test_reader_not_ready() {
        let mut transport = MockTransport::new([]);
        transport.status = ReaderStatus::NoCard;
        let mut executor = CardExecutor::new(transport);

        let result = executor.transmit(&Command::new(0x00, 0xA4, 0x04, 0x00));
        assert_eq!(result, Err(Error::ReaderNotReady(ReaderStatus::NoCard)));
        assert!(executor.transport().commands.is_empty());
    }

    #[test]
    fn test_response_chaining_concatenates_segments() {
        let transport = MockTransport::new([
            &[0xAA, 0xBB, 0x61, 0x02][..],
            &[0xCC, 0xDD, 0x61, 0x01][..],
            &[0xEE, 0x90, 0x00][..],
        ]);
        let mut executor = CardExecutor::new(transport);

        let data = executor
            .transmit(&Command::new_with_le(0x00, 0xCB, 0x3F, 0xFF, 0x00))
            .unwrap();
        assert_eq!(data.as_ref(), &[0xAA, 0xBB, 0xCC, 0xDD, 0xEE]);

        let commands = &executor.transport().commands;
        assert_eq!(commands.len(), 3);
        assert_eq!(commands[1].as_ref(), &[0x00, 0xC0, 0x00, 0x00, 0x02]);
        assert_eq!(commands[2].as_ref(), &[0x00, 0xC0, 0x00, 0x00, 0x01]);
    }

    #[test]
    fn test_error_status_word_surfaces() {
        let transport = MockTransport::new([&[0x6A, 0x82][..]]);
        let mut executor = CardExecutor::new(transport);

        let err = executor
            .transmit(&Command::new(0x00, 0xA4, 0x04, 0x00))
            .unwrap_err();
        assert_eq!(err, Error::status(0x6A, 0x82));
    }

    #[test]
    fn test_error_after_continuation_surfaces() {
        let transport = MockTransport::new([&[0x01, 0x61, 0x05][..], &[0x6F, 0x00][..]]);
        let mut executor = CardExecutor::new(transport);

        let err = executor
            .transmit(&Command::new(0x00, 0xCB, 0x3F, 0xFF))
            .unwrap_err();
        assert_eq!(err.status_word(), Some(crate::StatusWord::new(0x6F, 0x00)));
    }

    #[test]
    fn test_chain_limit() {
        let transport = MockTransport::new([
            &[0x01, 0x61, 0x01][..],
            &[0x02, 0x61, 0x01][..],
            &[0x03, 0x61, 0x01][..],
        ]);
        let mut executor = CardExecutor::new(transport).with_max_get_response(2);

        let err = executor
            .transmit(&Command::new(0x00, 0xCB, 0x3F, 0xFF))
            .unwrap_err();
        assert_eq!(err, Error::ChainLimitExceeded(2));
    }

    #[test]
    fn test_command_chaining_stops_on_rejected_fragment() {
        let transport = MockTransport::new([&[0x68, 0x84][..]]);
        let mut executor = CardExecutor::new(transport);

        let err = executor
            .transmit(&Command::new_with_data(0x00, 0xDB, 0x3F, 0xFF, vec![0u8; 300]))
            .unwrap_err();
        assert_eq!(err, Error::status(0x68, 0x84));
        assert_eq!(executor.transport().commands.len(), 1);
    }

    #[test]
    fn test_malformed_response() {
        let transport = MockTransport::new([&[0x90][..]]);
        let mut executor = CardExecutor::new(transport);

        let err = executor
            .transmit(&Command::new(0x00, 0xA4, 0x04, 0x00))
            .unwrap_err();
        assert_eq!(err, Error::MalformedResponse(1));
    }

    #[test]
    fn test_transmit_failure_is_wrapped() {
        let transport = MockTransport::new([]);
        let mut executor = CardExecutor::new(transport);

        let err = executor
            .transmit(&Command::new(0x00, 0xA4, 0x04, 0x00))
            .unwrap_err();
        assert!(matches!(err.root(), Error::TransmitFailure(_)));
    }
}
