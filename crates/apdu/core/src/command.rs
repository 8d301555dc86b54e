//! APDU command definitions
//!
//! This module provides the command half of the APDU codec according to
//! ISO/IEC 7816-4. Only short APDUs are produced: payloads longer than
//! [`MAX_SHORT_DATA_LEN`] are rejected at encode time and must be split by
//! the caller with [`Command::chain`].

use bytes::{BufMut, Bytes, BytesMut};

use crate::{Error, Result};

/// Maximum data length of a single short APDU (Lc is one byte)
pub const MAX_SHORT_DATA_LEN: usize = 255;

/// Maximum data length of a logical command before chaining
pub const MAX_COMMAND_DATA_LEN: usize = u16::MAX as usize;

/// Class byte bit signalling that more command fragments follow
pub const CLA_CHAINING_BIT: u8 = 0x10;

/// Default interindustry class byte
pub const CLA_ISO: u8 = 0x00;

/// Expected length type for APDU commands
pub type ExpectedLength = u8;

/// Generic APDU command structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Command class byte
    pub cla: u8,
    /// Instruction byte
    pub ins: u8,
    /// Parameter 1
    pub p1: u8,
    /// Parameter 2
    pub p2: u8,
    /// Command data, empty when absent
    pub data: Bytes,
    /// Expected length (optional)
    pub le: Option<ExpectedLength>,
}

impl Command {
    /// Create a new command with just the header bytes
    pub const fn new(cla: u8, ins: u8, p1: u8, p2: u8) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: Bytes::new(),
            le: None,
        }
    }

    /// Create a new command with expected response length (Le)
    pub const fn new_with_le(cla: u8, ins: u8, p1: u8, p2: u8, le: ExpectedLength) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: Bytes::new(),
            le: Some(le),
        }
    }

    /// Create a new command with data payload
    pub fn new_with_data<T: Into<Bytes>>(cla: u8, ins: u8, p1: u8, p2: u8, data: T) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: data.into(),
            le: None,
        }
    }

    /// Set the data field
    pub fn with_data<T: Into<Bytes>>(mut self, data: T) -> Self {
        self.data = data.into();
        self
    }

    /// Set the expected length field
    pub const fn with_le(mut self, le: ExpectedLength) -> Self {
        self.le = Some(le);
        self
    }

    /// Whether the class byte has the chaining bit set
    pub const fn is_chained_fragment(&self) -> bool {
        self.cla & CLA_CHAINING_BIT != 0
    }

    /// Calculate length of the serialized command
    pub fn command_length(&self) -> usize {
        let mut length = 4;
        if !self.data.is_empty() {
            length += 1 + self.data.len();
        }
        if self.le.is_some() {
            length += 1;
        }
        length
    }

    /// Encode to wire form `CLA INS P1 P2 [Lc data] [Le]`
    ///
    /// Fails with [`Error::DataTooLong`] rather than truncating when the data
    /// exceeds a single short APDU.
    pub fn to_bytes(&self) -> Result<Bytes> {
        if self.data.len() > MAX_SHORT_DATA_LEN {
            return Err(Error::DataTooLong {
                actual: self.data.len(),
                max: MAX_SHORT_DATA_LEN,
            });
        }

        let mut buffer = BytesMut::with_capacity(self.command_length());
        buffer.put_u8(self.cla);
        buffer.put_u8(self.ins);
        buffer.put_u8(self.p1);
        buffer.put_u8(self.p2);

        if !self.data.is_empty() {
            buffer.put_u8(self.data.len() as u8);
            buffer.put_slice(&self.data);
        }

        if let Some(le) = self.le {
            buffer.put_u8(le);
        }

        Ok(buffer.freeze())
    }

    /// Split into short APDUs using command chaining
    ///
    /// Every fragment but the last carries the chaining bit in its class byte
    /// and no Le. The last fragment carries the original class byte and Le.
    /// A command whose data already fits is returned unchanged.
    ///
    /// An exact multiple of 255 bytes yields `len / 255` fragments with no
    /// trailing empty one, and empty data yields a single command.
    pub fn chain(&self) -> Result<Vec<Self>> {
        if self.data.len() > MAX_COMMAND_DATA_LEN {
            return Err(Error::DataTooLong {
                actual: self.data.len(),
                max: MAX_COMMAND_DATA_LEN,
            });
        }
        if self.data.len() <= MAX_SHORT_DATA_LEN {
            return Ok(vec![self.clone()]);
        }

        let chunks: Vec<Bytes> = self
            .data
            .chunks(MAX_SHORT_DATA_LEN)
            .map(|chunk| self.data.slice_ref(chunk))
            .collect();
        let last = chunks.len() - 1;

        Ok(chunks
            .into_iter()
            .enumerate()
            .map(|(i, chunk)| {
                if i == last {
                    Self {
                        data: chunk,
                        ..self.clone()
                    }
                } else {
                    Self {
                        cla: self.cla | CLA_CHAINING_BIT,
                        data: chunk,
                        le: None,
                        ..self.clone()
                    }
                }
            })
            .collect())
    }

    /// Parse a short command from raw bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < 4 {
            return Err(Error::InvalidCommandLength(data.len()));
        }

        let mut command = Self::new(data[0], data[1], data[2], data[3]);

        if data.len() == 5 {
            // Only Le present
            command.le = Some(data[4]);
        } else if data.len() > 5 {
            let lc = data[4] as usize;
            if lc == 0 || data.len() < 5 + lc {
                return Err(Error::InvalidCommandLength(data.len()));
            }
            command.data = Bytes::copy_from_slice(&data[5..5 + lc]);

            match data.len() - (5 + lc) {
                0 => {}
                1 => command.le = Some(data[5 + lc]),
                _ => return Err(Error::InvalidCommandLength(data.len())),
            }
        }

        Ok(command)
    }
}
