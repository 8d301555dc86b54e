//! PC/SC transport implementation

use std::ffi::CString;
use std::fmt;

use pcsc::{Card, Context, Disposition, MAX_BUFFER_SIZE};
use tracing::{debug, warn};
use vxauth_apdu_core::reader::ReaderStatusReceiver;
use vxauth_apdu_core::{
    Bytes, CardConnector, CardTransport, Error, ReaderStatus, ReaderStatusTracker, Result,
};

use crate::config::PcscConfig;
use crate::error::PcscError;
use crate::monitor::ReaderMonitor;

/// The card connection half of the transport
struct PcscConnection {
    context: Context,
    card: Option<Card>,
    reader_name: Option<String>,
    config: PcscConfig,
}

impl fmt::Debug for PcscConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PcscConnection")
            .field("reader_name", &self.reader_name)
            .field("has_card", &self.card.is_some())
            .field("config", &self.config)
            .finish()
    }
}

impl PcscConnection {
    fn try_connect(&mut self) -> Result<(), PcscError> {
        if self.card.is_some() {
            return Ok(());
        }

        let name = self
            .reader_name
            .clone()
            .ok_or(PcscError::NoReadersAvailable)?;
        let reader = CString::new(name.clone()).map_err(|_| PcscError::ReaderNotFound(name.clone()))?;

        match self
            .context
            .connect(&reader, self.config.share_mode.into(), self.config.protocols)
        {
            Ok(card) => {
                debug!(reader = %name, "Connected to card");
                self.card = Some(card);
                Ok(())
            }
            Err(pcsc::Error::NoSmartcard) => Err(PcscError::NoCard(name)),
            Err(e) => Err(e.into()),
        }
    }
}

impl CardConnector for PcscConnection {
    fn connect(&mut self) -> Result<()> {
        self.try_connect().map_err(Into::into)
    }

    fn disconnect(&mut self) {
        if let Some(card) = self.card.take() {
            if let Err((_, e)) = card.disconnect(Disposition::LeaveCard) {
                warn!("Failed to disconnect card cleanly: {e}");
            }
        }
    }
}

/// Transport implementation using PC/SC
///
/// The transport watches one reader (the first matching the configured name
/// filter), connects to a card as soon as one is inserted and releases the
/// connection when it is removed or a transmit reveals it is gone.
#[derive(Debug)]
pub struct PcscTransport {
    connection: PcscConnection,
    monitor: ReaderMonitor,
    tracker: ReaderStatusTracker,
}

impl PcscTransport {
    /// Create a new PC/SC transport
    ///
    /// No hardware is touched until the first [`poll_status`](CardTransport::poll_status).
    pub fn new(context: Context, config: PcscConfig) -> Self {
        Self {
            connection: PcscConnection {
                context,
                card: None,
                reader_name: None,
                config,
            },
            monitor: ReaderMonitor::default(),
            tracker: ReaderStatusTracker::default(),
        }
    }

    /// Subscribe to reader status changes
    pub fn subscribe(&mut self) -> ReaderStatusReceiver {
        self.tracker.subscribe()
    }

    /// Name of the reader currently being watched
    pub fn reader_name(&self) -> Option<&str> {
        self.monitor.reader_name()
    }

    /// Check if the transport holds a card connection
    pub const fn has_card(&self) -> bool {
        self.connection.card.is_some()
    }

    /// Get the ATR of the current card
    pub fn atr(&self) -> Result<Vec<u8>, PcscError> {
        self.connection.card.as_ref().map_or_else(
            || {
                Err(PcscError::NoCard(
                    self.connection.reader_name.clone().unwrap_or_default(),
                ))
            },
            |card| {
                card.get_attribute_owned(pcsc::Attribute::AtrString)
                    .map_err(Into::into)
            },
        )
    }

    /// Drop the connection after the card went away mid-exchange
    fn card_lost(&mut self) {
        self.connection.disconnect();
        self.monitor.forget_card();
        self.tracker.set(ReaderStatus::NoCard);
    }
}

impl CardTransport for PcscTransport {
    fn do_transmit_raw(&mut self, command: &[u8]) -> Result<Bytes> {
        let Some(card) = &self.connection.card else {
            return Err(Error::ReaderNotReady(self.tracker.status()));
        };

        let mut response_buffer = [0u8; MAX_BUFFER_SIZE];
        match card.transmit(command, &mut response_buffer) {
            Ok(response) => Ok(Bytes::copy_from_slice(response)),
            Err(e @ (pcsc::Error::ResetCard | pcsc::Error::RemovedCard | pcsc::Error::NoSmartcard)) => {
                debug!("Card lost during transmit: {e}");
                self.card_lost();
                Err(Error::transmit_failure(e))
            }
            Err(e) => Err(Error::transmit_failure(e)),
        }
    }

    fn reader_status(&self) -> ReaderStatus {
        self.tracker.status()
    }

    fn poll_status(&mut self) -> ReaderStatus {
        let events = self
            .monitor
            .poll(&self.connection.context, &self.connection.config);
        self.connection.reader_name = self.monitor.reader_name().map(ToOwned::to_owned);
        for event in events {
            self.tracker.apply(event, &mut self.connection);
        }
        self.tracker.status()
    }

    fn disconnect(&mut self) {
        self.card_lost();
    }
}

impl Drop for PcscTransport {
    fn drop(&mut self) {
        self.connection.disconnect();
    }
}
