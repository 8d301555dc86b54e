//! APDU response definitions
//!
//! This module provides the response half of the APDU codec according to
//! ISO/IEC 7816-4.

pub mod status;
pub mod utils;

use bytes::Bytes;
use tracing::trace;

use crate::{Error, Result};
use status::StatusWord;

/// Basic APDU response structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Response payload data, empty when absent
    pub data: Bytes,
    /// Status word
    pub status: StatusWord,
}

impl Response {
    /// Create a new response with payload and status
    pub fn new(data: impl Into<Bytes>, status: impl Into<StatusWord>) -> Self {
        Self {
            data: data.into(),
            status: status.into(),
        }
    }

    /// Create a success response
    pub fn success(data: impl Into<Bytes>) -> Self {
        Self::new(data, status::common::SUCCESS)
    }

    /// Parse response from raw bytes (including status word)
    pub fn from_bytes(data: &Bytes) -> Result<Self> {
        let (status, payload) = utils::extract_status_and_payload(data)?;

        trace!(
            sw1 = format_args!("{:#04x}", status.sw1),
            sw2 = format_args!("{:#04x}", status.sw2),
            payload_len = payload.len(),
            "Parsed APDU response"
        );

        Ok(Self {
            data: data.slice_ref(payload),
            status,
        })
    }

    /// Whether the status word is `90 00`
    pub const fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Whether the card signalled more data with `61 XX`
    pub const fn more_data_available(&self) -> bool {
        self.status.is_more_data_available()
    }

    /// Encode back to wire form with the status word appended
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = Vec::with_capacity(self.data.len() + 2);
        buf.extend_from_slice(&self.data);
        buf.push(self.status.sw1);
        buf.push(self.status.sw2);
        Bytes::from(buf)
    }

    /// Return the payload if the status word is success
    pub fn into_result(self) -> Result<Bytes> {
        if self.is_success() {
            Ok(self.data)
        } else {
            Err(Error::ResponseApduError {
                status: self.status,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_from_bytes() {
        let raw = Bytes::from_static(&[0xDE, 0xAD, 0x61, 0x10]);
        let response = Response::from_bytes(&raw).unwrap();
        assert_eq!(response.data.as_ref(), &[0xDE, 0xAD]);
        assert!(response.more_data_available());
        assert_eq!(response.to_bytes(), raw);
    }

    #[test]
    fn test_into_result() {
        let ok = Response::success(Bytes::from_static(&[0x01]));
        assert_eq!(ok.into_result().unwrap().as_ref(), &[0x01]);

        let err = Response::new(Bytes::new(), (0x6A, 0x82));
        assert_eq!(err.into_result(), Err(Error::status(0x6A, 0x82)));
    }

    #[test]
    fn test_malformed_response() {
        let raw = Bytes::from_static(&[0x90]);
        assert_eq!(Response::from_bytes(&raw), Err(Error::MalformedResponse(1)));
    }
}
