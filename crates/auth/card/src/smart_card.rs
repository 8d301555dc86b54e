//! [`Card`] over a real transport

use tracing::{debug, info, instrument, warn};
use vxauth_apdu_core::{CardExecutor, CardTransport, ReaderStatus};

use crate::card::{Card, CardStatus, CheckPinResponse};
use crate::card_details::{CardDetails, encode_identity};
use crate::commands::{self, incorrect_attempts_from_status};
use crate::constants::{DEFAULT_PIN, ELECTION_OBJECT_ID, IDENTITY_OBJECT_ID};
use crate::pin::Pin;
use crate::user::User;
use crate::{Error, Result};

/// A smart card behind a [`CardTransport`]
///
/// Card details are read once per card insertion and cached until the reader
/// status changes or the card is written to.
#[derive(Debug)]
pub struct SmartCard<T: CardTransport> {
    executor: CardExecutor<T>,
    last_reader_status: ReaderStatus,
    cached_details: Option<Option<CardDetails>>,
}

impl<T: CardTransport> SmartCard<T> {
    /// Wrap a transport
    pub fn new(transport: T) -> Self {
        let last_reader_status = transport.reader_status();
        Self {
            executor: CardExecutor::new(transport),
            last_reader_status,
            cached_details: None,
        }
    }

    /// Get a reference to the underlying transport
    pub const fn transport(&self) -> &T {
        self.executor.transport()
    }

    /// Get a mutable reference to the underlying transport
    pub const fn transport_mut(&mut self) -> &mut T {
        self.executor.transport_mut()
    }

    fn select(&mut self) -> Result<()> {
        self.executor.transmit(&commands::select_applet())?;
        Ok(())
    }

    /// Read a data object; a missing object reads as empty
    fn read_object(&mut self, object_id: &[u8; 3]) -> Result<Vec<u8>> {
        match self.executor.transmit(&commands::get_data(object_id)?) {
            Ok(response) => commands::parse_data_object(&response),
            Err(e) if e.status_word().is_some_and(|sw| sw.is_not_found()) => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_object(&mut self, object_id: &[u8; 3], content: &[u8]) -> Result<()> {
        self.executor
            .transmit(&commands::put_data(object_id, content)?)?;
        Ok(())
    }

    fn read_incorrect_pin_attempts(&mut self) -> Result<u8> {
        match self.executor.transmit(&commands::verify_status()) {
            Ok(_) => Ok(0),
            Err(e) => e
                .status_word()
                .and_then(incorrect_attempts_from_status)
                .ok_or(Error::Apdu(e)),
        }
    }

    fn read_details(&mut self) -> Result<Option<CardDetails>> {
        match self.select() {
            Ok(()) => {}
            Err(Error::Apdu(e)) if e.status_word().is_some_and(|sw| sw.is_not_found()) => {
                debug!("Card application not present");
                return Ok(None);
            }
            Err(e) => return Err(e),
        }

        let identity = self.read_object(&IDENTITY_OBJECT_ID)?;
        if identity.is_empty() {
            return Ok(None);
        }
        let attempts = self.read_incorrect_pin_attempts()?;
        Ok(CardDetails::parse(&identity, attempts))
    }

    fn invalidate(&mut self) {
        self.cached_details = None;
    }
}

impl<T: CardTransport> Card for SmartCard<T> {
    #[instrument(level = "trace", skip(self))]
    fn status(&mut self) -> CardStatus {
        let reader_status = self.executor.poll_status();
        if reader_status != self.last_reader_status {
            self.last_reader_status = reader_status;
            self.invalidate();
        }

        if !reader_status.is_ready() {
            return CardStatus::from_reader_status(reader_status);
        }

        if let Some(details) = &self.cached_details {
            return CardStatus::Ready(details.clone());
        }

        match self.read_details() {
            Ok(details) => {
                self.cached_details = Some(details.clone());
                CardStatus::Ready(details)
            }
            Err(e) => {
                warn!("Failed to read card: {e}");
                CardStatus::CardError
            }
        }
    }

    fn check_pin(&mut self, pin: &Pin) -> CheckPinResponse {
        self.invalidate();

        if let Err(e) = self.select() {
            warn!("Failed to select card application: {e}");
            return CheckPinResponse::Error;
        }

        match self.executor.transmit(&commands::verify_pin(pin)) {
            Ok(_) => CheckPinResponse::Correct,
            Err(e) => match e.status_word().and_then(incorrect_attempts_from_status) {
                Some(num_incorrect_pin_attempts) => {
                    debug!(num_incorrect_pin_attempts, "Incorrect PIN");
                    CheckPinResponse::Incorrect {
                        num_incorrect_pin_attempts: num_incorrect_pin_attempts.max(1),
                    }
                }
                None => {
                    warn!("PIN check failed: {e}");
                    CheckPinResponse::Error
                }
            },
        }
    }

    fn program(
        &mut self,
        user: &User,
        pin: Option<&Pin>,
        election_definition: Option<&[u8]>,
    ) -> Result<()> {
        self.invalidate();
        self.select()?;

        let default_pin = Pin::new(DEFAULT_PIN)?;
        self.executor
            .transmit(&commands::reset_retry_counter(pin.unwrap_or(&default_pin)))?;
        self.write_object(&ELECTION_OBJECT_ID, election_definition.unwrap_or_default())?;
        self.write_object(&IDENTITY_OBJECT_ID, &encode_identity(user, pin.is_some())?)?;

        info!(role = %user.role(), "Programmed card");
        Ok(())
    }

    fn unprogram(&mut self) -> Result<()> {
        self.invalidate();
        self.select()?;

        self.write_object(&IDENTITY_OBJECT_ID, &[])?;
        self.write_object(&ELECTION_OBJECT_ID, &[])?;
        self.executor
            .transmit(&commands::reset_retry_counter(&Pin::new(DEFAULT_PIN)?))?;

        info!("Unprogrammed card");
        Ok(())
    }

    fn read_election_definition(&mut self) -> Result<Option<Vec<u8>>> {
        self.select()?;
        let definition = self.read_object(&ELECTION_OBJECT_ID)?;
        Ok((!definition.is_empty()).then_some(definition))
    }

    fn disconnect(&mut self) {
        self.invalidate();
        self.executor.transport_mut().disconnect();
        self.last_reader_status = self.executor.reader_status();
    }
}
