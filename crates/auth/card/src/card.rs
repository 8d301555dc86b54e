//! The card seen from the auth layer

use std::fmt;

use serde::Serialize;
use vxauth_apdu_core::ReaderStatus;

use crate::card_details::CardDetails;
use crate::pin::Pin;
use crate::user::User;
use crate::Result;

/// Reader status plus, when a card is connected, what is programmed on it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "card_details", rename_all = "snake_case")]
pub enum CardStatus {
    /// No reader is attached
    NoCardReader,
    /// The driver reported an error
    UnknownError,
    /// The reader is empty
    NoCard,
    /// A card is present but could not be read
    CardError,
    /// A card is connected; `None` when it is unprogrammed or unparsable
    Ready(Option<CardDetails>),
}

impl CardStatus {
    /// Map a non-ready reader status
    ///
    /// `ready` maps to `Ready(None)`; callers that can read the card should
    /// fill in the details.
    pub const fn from_reader_status(status: ReaderStatus) -> Self {
        match status {
            ReaderStatus::NoCardReader => Self::NoCardReader,
            ReaderStatus::UnknownError => Self::UnknownError,
            ReaderStatus::NoCard => Self::NoCard,
            ReaderStatus::CardError => Self::CardError,
            ReaderStatus::Ready => Self::Ready(None),
        }
    }

    /// The underlying reader status
    pub const fn reader_status(&self) -> ReaderStatus {
        match self {
            Self::NoCardReader => ReaderStatus::NoCardReader,
            Self::UnknownError => ReaderStatus::UnknownError,
            Self::NoCard => ReaderStatus::NoCard,
            Self::CardError => ReaderStatus::CardError,
            Self::Ready(_) => ReaderStatus::Ready,
        }
    }

    /// Details of the card in the reader, if any
    pub const fn card_details(&self) -> Option<&CardDetails> {
        match self {
            Self::Ready(details) => details.as_ref(),
            _ => None,
        }
    }
}

/// Outcome of a PIN check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "response", rename_all = "snake_case")]
pub enum CheckPinResponse {
    /// The PIN matched
    Correct,
    /// The PIN did not match
    Incorrect {
        /// Wrong PIN entries recorded by the card, this one included
        num_incorrect_pin_attempts: u8,
    },
    /// The card could not be asked
    Error,
}

/// A card slot the auth layer can query and program
///
/// Implementations own the reader channel. Every method performs blocking
/// I/O and must leave the reader released (not connected) after any
/// removal or error it observes.
pub trait Card: fmt::Debug + Send {
    /// Poll the reader and read the card if one is connected
    ///
    /// Never fails: I/O problems surface as [`CardStatus::CardError`] or
    /// [`CardStatus::UnknownError`].
    fn status(&mut self) -> CardStatus;

    /// Check `pin` against the card
    fn check_pin(&mut self, pin: &Pin) -> CheckPinResponse;

    /// Overwrite the card identity
    ///
    /// `pin` becomes the card PIN; without one the card keeps the default PIN
    /// and a poll worker card is marked as PIN-less. `election_definition` is
    /// stored alongside election manager identities.
    fn program(
        &mut self,
        user: &User,
        pin: Option<&Pin>,
        election_definition: Option<&[u8]>,
    ) -> Result<()>;

    /// Clear the card identity and reset its PIN
    fn unprogram(&mut self) -> Result<()>;

    /// Read the election definition stored on the card
    fn read_election_definition(&mut self) -> Result<Option<Vec<u8>>>;

    /// Release the reader
    fn disconnect(&mut self);
}

impl<C: Card + ?Sized> Card for Box<C> {
    fn status(&mut self) -> CardStatus {
        (**self).status()
    }

    fn check_pin(&mut self, pin: &Pin) -> CheckPinResponse {
        (**self).check_pin(pin)
    }

    fn program(
        &mut self,
        user: &User,
        pin: Option<&Pin>,
        election_definition: Option<&[u8]>,
    ) -> Result<()> {
        (**self).program(user, pin, election_definition)
    }

    fn unprogram(&mut self) -> Result<()> {
        (**self).unprogram()
    }

    fn read_election_definition(&mut self) -> Result<Option<Vec<u8>>> {
        (**self).read_election_definition()
    }

    fn disconnect(&mut self) {
        (**self).disconnect();
    }
}
