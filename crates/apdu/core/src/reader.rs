//! Reader status model
//!
//! A reader is always in exactly one [`ReaderStatus`]. The status only moves
//! in response to raw [`ReaderEvent`]s reported by the driver, and the fold in
//! [`ReaderStatusTracker::apply`] is deterministic: the same event sequence
//! against a connector that succeeds or fails the same way always yields the
//! same status sequence.

use crossbeam_channel::{Receiver, Sender, unbounded};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::Result;

/// Physical status of a card reader
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReaderStatus {
    /// No reader is attached
    #[display("no_card_reader")]
    NoCardReader,
    /// The driver reported an error
    #[display("unknown_error")]
    UnknownError,
    /// A reader is attached but empty
    #[display("no_card")]
    NoCard,
    /// A card is present but could not be connected
    #[display("card_error")]
    CardError,
    /// A card is present and connected
    #[display("ready")]
    Ready,
}

impl ReaderStatus {
    /// Whether commands can be sent
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

/// Raw hardware/driver events that drive [`ReaderStatus`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReaderEvent {
    /// The driver reported an error while watching the reader
    HardwareError,
    /// The reader device became visible
    ReaderAttached,
    /// The reader device disappeared
    ReaderDetached,
    /// The card-presence bit became set
    CardPresent,
    /// The card-presence bit cleared
    CardAbsent,
}

/// Something that can open and release the card connection
pub trait CardConnector {
    /// Open an exclusive connection to the card in the reader
    fn connect(&mut self) -> Result<()>;

    /// Release the card connection, if any
    ///
    /// Must be idempotent and must not fail.
    fn disconnect(&mut self);
}

/// Sender half of a reader status subscription
pub type ReaderStatusSender = Sender<ReaderStatus>;
/// Receiver half of a reader status subscription
pub type ReaderStatusReceiver = Receiver<ReaderStatus>;

/// Folds raw reader events into a [`ReaderStatus`] and publishes changes
#[derive(Debug)]
pub struct ReaderStatusTracker {
    status: ReaderStatus,
    subscribers: Vec<ReaderStatusSender>,
}

impl Default for ReaderStatusTracker {
    fn default() -> Self {
        Self::new(ReaderStatus::NoCardReader)
    }
}

impl ReaderStatusTracker {
    /// Create a tracker starting from `initial`
    pub const fn new(initial: ReaderStatus) -> Self {
        Self {
            status: initial,
            subscribers: Vec::new(),
        }
    }

    /// Current status
    pub const fn status(&self) -> ReaderStatus {
        self.status
    }

    /// Subscribe to status changes
    ///
    /// The receiver sees every change after this call; dropped receivers are
    /// pruned on the next publish.
    pub fn subscribe(&mut self) -> ReaderStatusReceiver {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    /// Apply one event, calling into `connector` where the transition
    /// requires it, and return the new status
    pub fn apply<C: CardConnector + ?Sized>(
        &mut self,
        event: ReaderEvent,
        connector: &mut C,
    ) -> ReaderStatus {
        let next = match event {
            ReaderEvent::HardwareError => {
                connector.disconnect();
                ReaderStatus::UnknownError
            }
            ReaderEvent::ReaderAttached => match self.status {
                ReaderStatus::NoCardReader | ReaderStatus::UnknownError => ReaderStatus::NoCard,
                other => other,
            },
            ReaderEvent::ReaderDetached => {
                connector.disconnect();
                ReaderStatus::NoCardReader
            }
            ReaderEvent::CardPresent => match self.status {
                ReaderStatus::Ready => ReaderStatus::Ready,
                _ => match connector.connect() {
                    Ok(()) => ReaderStatus::Ready,
                    Err(e) => {
                        warn!("Failed to connect to card: {e}");
                        connector.disconnect();
                        ReaderStatus::CardError
                    }
                },
            },
            ReaderEvent::CardAbsent => {
                connector.disconnect();
                ReaderStatus::NoCard
            }
        };

        self.set(next);
        next
    }

    /// Force the status, e.g. after a transmit revealed the card is gone
    pub fn set(&mut self, next: ReaderStatus) {
        if next == self.status {
            return;
        }
        debug!(from = %self.status, to = %next, "Reader status changed");
        self.status = next;
        self.subscribers.retain(|tx| tx.send(next).is_ok());
    }
}
