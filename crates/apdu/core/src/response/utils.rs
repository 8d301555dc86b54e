//! Utility functions for APDU response handling

use tracing::debug;

use crate::response::status::StatusWord;
use crate::{Error, Result};

/// Split raw response data into its status word and payload
///
/// # Errors
/// Returns [`Error::MalformedResponse`] if the data is too short to contain
/// a status word.
pub fn extract_status_and_payload(data: &[u8]) -> Result<(StatusWord, &[u8])> {
    if data.len() < 2 {
        debug!("Response too short: {} bytes", data.len());
        return Err(Error::MalformedResponse(data.len()));
    }

    let len = data.len();
    Ok((
        StatusWord::new(data[len - 2], data[len - 1]),
        &data[..len - 2],
    ))
}
