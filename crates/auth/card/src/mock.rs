//! Test doubles
//!
//! [`MockCard`] is an in-memory [`Card`] whose state can be changed from the
//! test while the code under test owns it. [`SimulatedCardTransport`] sits one
//! layer lower and answers the card application's APDUs, so a real
//! [`SmartCard`](crate::SmartCard) can be driven end to end.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use iso7816_tlv::ber::{Tag, Tlv, Value};
use parking_lot::Mutex;
use vxauth_apdu_core::command::CLA_CHAINING_BIT;
use vxauth_apdu_core::executor::INS_GET_RESPONSE;
use vxauth_apdu_core::{Bytes, CardTransport, Command, Error as ApduError, ReaderStatus};

use crate::card::{Card, CardStatus, CheckPinResponse};
use crate::card_details::CardDetails;
use crate::constants::{
    CARD_PIN_RETRY_LIMIT, DEFAULT_PIN, PIN_FIELD_LENGTH, RESET_REFERENCE, VX_APPLET_AID, ins, tags,
};
use crate::pin::Pin;
use crate::user::User;
use crate::{Error, Result};

#[derive(Debug)]
struct MockCardState {
    reader: ReaderStatus,
    unreadable: bool,
    fail_io: bool,
    user: Option<User>,
    has_pin: bool,
    pin: Pin,
    num_incorrect_pin_attempts: u8,
    election_definition: Option<Vec<u8>>,
    status_reads: usize,
    disconnects: usize,
}

/// In-memory card with a shared, test-controlled state
#[derive(Debug, Clone)]
pub struct MockCard {
    state: Arc<Mutex<MockCardState>>,
}

impl Default for MockCard {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCard {
    /// An attached reader with no card
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockCardState {
                reader: ReaderStatus::NoCard,
                unreadable: false,
                fail_io: false,
                user: None,
                has_pin: false,
                pin: Pin::new(DEFAULT_PIN).expect("default PIN is valid"),
                num_incorrect_pin_attempts: 0,
                election_definition: None,
                status_reads: 0,
                disconnects: 0,
            })),
        }
    }

    /// Insert a card programmed for `user`
    pub fn insert(&self, user: User, pin: Option<&str>) {
        let mut state = self.state.lock();
        state.reader = ReaderStatus::Ready;
        state.unreadable = false;
        state.has_pin = pin.is_some();
        state.pin = Pin::new(pin.unwrap_or(DEFAULT_PIN)).expect("test PIN is valid");
        state.user = Some(user);
        state.num_incorrect_pin_attempts = 0;
    }

    /// Insert an unprogrammed card
    pub fn insert_blank(&self) {
        let mut state = self.state.lock();
        state.reader = ReaderStatus::Ready;
        state.unreadable = false;
        state.user = None;
        state.has_pin = false;
        state.num_incorrect_pin_attempts = 0;
    }

    /// Insert a card that connects but cannot be read
    pub fn insert_unreadable(&self) {
        let mut state = self.state.lock();
        state.reader = ReaderStatus::Ready;
        state.unreadable = true;
    }

    /// Remove the card, keeping what is programmed on it
    pub fn remove(&self) {
        self.state.lock().reader = ReaderStatus::NoCard;
    }

    /// Force a reader status
    pub fn set_reader_status(&self, reader: ReaderStatus) {
        self.state.lock().reader = reader;
    }

    /// Make every write and PIN check fail
    pub fn set_fail_io(&self, fail_io: bool) {
        self.state.lock().fail_io = fail_io;
    }

    /// Preset the card's wrong PIN counter
    pub fn set_num_incorrect_pin_attempts(&self, attempts: u8) {
        self.state.lock().num_incorrect_pin_attempts = attempts;
    }

    /// User currently programmed on the card
    pub fn programmed_user(&self) -> Option<User> {
        self.state.lock().user.clone()
    }

    /// Whether the card was programmed with a PIN
    pub fn has_pin(&self) -> bool {
        self.state.lock().has_pin
    }

    /// Number of times the card status was read
    pub fn status_reads(&self) -> usize {
        self.state.lock().status_reads
    }

    /// Number of times the reader was released
    pub fn disconnects(&self) -> usize {
        self.state.lock().disconnects
    }

    fn io_error() -> Error {
        Error::Apdu(ApduError::TransmitFailure("mock card I/O failure".into()))
    }
}

impl Card for MockCard {
    fn status(&mut self) -> CardStatus {
        let mut state = self.state.lock();
        state.status_reads += 1;

        if !state.reader.is_ready() {
            return CardStatus::from_reader_status(state.reader);
        }
        if state.unreadable {
            return CardStatus::CardError;
        }
        CardStatus::Ready(state.user.clone().map(|user| {
            CardDetails::new(user, state.has_pin, state.num_incorrect_pin_attempts)
        }))
    }

    fn check_pin(&mut self, pin: &Pin) -> CheckPinResponse {
        let mut state = self.state.lock();
        if !state.reader.is_ready() || state.fail_io {
            return CheckPinResponse::Error;
        }
        if state.num_incorrect_pin_attempts >= CARD_PIN_RETRY_LIMIT {
            return CheckPinResponse::Incorrect {
                num_incorrect_pin_attempts: state.num_incorrect_pin_attempts,
            };
        }
        if *pin == state.pin {
            state.num_incorrect_pin_attempts = 0;
            CheckPinResponse::Correct
        } else {
            state.num_incorrect_pin_attempts += 1;
            CheckPinResponse::Incorrect {
                num_incorrect_pin_attempts: state.num_incorrect_pin_attempts,
            }
        }
    }

    fn program(
        &mut self,
        user: &User,
        pin: Option<&Pin>,
        election_definition: Option<&[u8]>,
    ) -> Result<()> {
        let mut state = self.state.lock();
        if !state.reader.is_ready() || state.fail_io {
            return Err(Self::io_error());
        }
        state.user = Some(user.clone());
        state.has_pin = pin.is_some();
        state.pin = match pin {
            Some(pin) => pin.clone(),
            None => Pin::new(DEFAULT_PIN)?,
        };
        state.num_incorrect_pin_attempts = 0;
        state.election_definition = election_definition.map(<[u8]>::to_vec);
        Ok(())
    }

    fn unprogram(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        if !state.reader.is_ready() || state.fail_io {
            return Err(Self::io_error());
        }
        state.user = None;
        state.has_pin = false;
        state.pin = Pin::new(DEFAULT_PIN)?;
        state.num_incorrect_pin_attempts = 0;
        state.election_definition = None;
        Ok(())
    }

    fn read_election_definition(&mut self) -> Result<Option<Vec<u8>>> {
        let state = self.state.lock();
        if !state.reader.is_ready() || state.fail_io {
            return Err(Self::io_error());
        }
        Ok(state.election_definition.clone())
    }

    fn disconnect(&mut self) {
        self.state.lock().disconnects += 1;
    }
}

/// An in-memory card application speaking the card's APDU protocol
#[derive(Debug)]
pub struct SimulatedCardTransport {
    reader: ReaderStatus,
    selected: bool,
    verified: bool,
    pin: [u8; PIN_FIELD_LENGTH],
    retries_remaining: u8,
    objects: HashMap<Vec<u8>, Vec<u8>>,
    chain_buffer: Vec<u8>,
    pending: VecDeque<u8>,
    /// Every raw command received
    pub commands: Vec<Bytes>,
}

impl Default for SimulatedCardTransport {
    fn default() -> Self {
        let mut pin = [0xFF; PIN_FIELD_LENGTH];
        pin[..DEFAULT_PIN.len()].copy_from_slice(DEFAULT_PIN.as_bytes());
        Self {
            reader: ReaderStatus::Ready,
            selected: false,
            verified: false,
            pin,
            retries_remaining: CARD_PIN_RETRY_LIMIT,
            objects: HashMap::new(),
            chain_buffer: Vec::new(),
            pending: VecDeque::new(),
            commands: Vec::new(),
        }
    }
}

impl SimulatedCardTransport {
    /// Insert the card
    pub fn insert(&mut self) {
        self.reader = ReaderStatus::Ready;
    }

    /// Pull the card, dropping all session state
    pub fn remove(&mut self) {
        self.reader = ReaderStatus::NoCard;
        self.selected = false;
        self.verified = false;
        self.chain_buffer.clear();
        self.pending.clear();
    }

    /// Raw content of a data object
    pub fn object(&self, object_id: &[u8]) -> Option<&[u8]> {
        self.objects.get(object_id).map(Vec::as_slice)
    }

    /// Store a data object directly
    pub fn set_object(&mut self, object_id: &[u8], content: Vec<u8>) {
        self.objects.insert(object_id.to_vec(), content);
    }

    fn status(sw1: u8, sw2: u8) -> Bytes {
        Bytes::copy_from_slice(&[sw1, sw2])
    }

    fn next_segment(&mut self, le: usize) -> Bytes {
        let n = le.min(self.pending.len());
        let mut out: Vec<u8> = self.pending.drain(..n).collect();
        match self.pending.len() {
            0 => out.extend_from_slice(&[0x90, 0x00]),
            rest if rest >= 256 => out.extend_from_slice(&[0x61, 0x00]),
            rest => out.extend_from_slice(&[0x61, rest as u8]),
        }
        Bytes::from(out)
    }

    fn parse_tlvs(mut input: &[u8]) -> Option<Vec<Tlv>> {
        let mut tlvs = Vec::new();
        while !input.is_empty() {
            let (tlv, rest) = Tlv::parse(input);
            tlvs.push(tlv.ok()?);
            input = rest;
        }
        Some(tlvs)
    }

    fn primitive_value(tlv: &Tlv, tag: u8) -> Option<Vec<u8>> {
        if tlv.tag() != &Tag::try_from(tag).ok()? {
            return None;
        }
        match tlv.value() {
            Value::Primitive(value) => Some(value.clone()),
            Value::Constructed(_) => None,
        }
    }

    fn process(&mut self, command: Command, data: Vec<u8>) -> Bytes {
        if command.ins == ins::SELECT {
            return if data == VX_APPLET_AID {
                self.selected = true;
                Self::status(0x90, 0x00)
            } else {
                Self::status(0x6A, 0x82)
            };
        }
        if !self.selected {
            return Self::status(0x69, 0x85);
        }

        match command.ins {
            ins::GET_DATA => {
                let Some(id) = Self::parse_tlvs(&data)
                    .and_then(|tlvs| Self::primitive_value(tlvs.first()?, tags::DATA_OBJECT_ID))
                else {
                    return Self::status(0x6A, 0x80);
                };
                let Some(content) = self.objects.get(&id) else {
                    return Self::status(0x6A, 0x82);
                };
                let Ok(tag) = Tag::try_from(tags::DATA_OBJECT) else {
                    return Self::status(0x6F, 0x00);
                };
                let Ok(wrapped) = Tlv::new(tag, Value::Primitive(content.clone())) else {
                    return Self::status(0x6F, 0x00);
                };
                self.pending = wrapped.to_vec().into();
                self.next_segment(256)
            }
            ins::PUT_DATA => {
                let parsed = Self::parse_tlvs(&data).and_then(|tlvs| match tlvs.as_slice() {
                    [id, content] => Some((
                        Self::primitive_value(id, tags::DATA_OBJECT_ID)?,
                        Self::primitive_value(content, tags::DATA_OBJECT)?,
                    )),
                    _ => None,
                });
                match parsed {
                    Some((id, content)) => {
                        self.objects.insert(id, content);
                        Self::status(0x90, 0x00)
                    }
                    None => Self::status(0x6A, 0x80),
                }
            }
            ins::VERIFY => {
                if self.retries_remaining == 0 {
                    return Self::status(0x69, 0x83);
                }
                if data.is_empty() {
                    return if self.verified {
                        Self::status(0x90, 0x00)
                    } else {
                        Self::status(0x63, 0xC0 | self.retries_remaining)
                    };
                }
                if data == self.pin {
                    self.verified = true;
                    self.retries_remaining = CARD_PIN_RETRY_LIMIT;
                    Self::status(0x90, 0x00)
                } else {
                    self.verified = false;
                    self.retries_remaining -= 1;
                    Self::status(0x63, 0xC0 | self.retries_remaining)
                }
            }
            ins::RESET_RETRY_COUNTER => {
                if data.len() != 2 * PIN_FIELD_LENGTH || data[..PIN_FIELD_LENGTH] != RESET_REFERENCE
                {
                    return Self::status(0x69, 0x82);
                }
                self.pin.copy_from_slice(&data[PIN_FIELD_LENGTH..]);
                self.retries_remaining = CARD_PIN_RETRY_LIMIT;
                self.verified = false;
                Self::status(0x90, 0x00)
            }
            _ => Self::status(0x6D, 0x00),
        }
    }
}

impl CardTransport for SimulatedCardTransport {
    fn do_transmit_raw(&mut self, raw: &[u8]) -> vxauth_apdu_core::Result<Bytes> {
        if !self.reader.is_ready() {
            return Err(ApduError::TransmitFailure("card removed".into()));
        }
        self.commands.push(Bytes::copy_from_slice(raw));

        let Ok(command) = Command::from_bytes(raw) else {
            return Ok(Self::status(0x67, 0x00));
        };

        if command.ins == INS_GET_RESPONSE {
            let le = match command.le {
                Some(0) | None => 256,
                Some(n) => n as usize,
            };
            return Ok(self.next_segment(le));
        }

        self.chain_buffer.extend_from_slice(&command.data);
        if command.cla & CLA_CHAINING_BIT != 0 {
            return Ok(Self::status(0x90, 0x00));
        }
        let data = std::mem::take(&mut self.chain_buffer);
        Ok(self.process(command, data))
    }

    fn reader_status(&self) -> ReaderStatus {
        self.reader
    }

    fn disconnect(&mut self) {
        self.selected = false;
        self.verified = false;
    }
}
