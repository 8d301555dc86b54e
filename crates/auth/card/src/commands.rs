//! Card application commands
//!
//! Builders for the handful of APDUs the card application understands, and
//! helpers to interpret what comes back.

use iso7816_tlv::ber::{Tag, Tlv, Value};
use vxauth_apdu_core::command::CLA_ISO;
use vxauth_apdu_core::{Command, StatusWord};

use crate::constants::{
    CARD_PIN_RETRY_LIMIT, PIN_FIELD_LENGTH, PIN_REFERENCE, RESET_REFERENCE, VX_APPLET_AID, ins,
    tags,
};
use crate::pin::Pin;
use crate::{Error, Result};

/// SELECT the card application by AID
pub fn select_applet() -> Command {
    Command::new_with_data(CLA_ISO, ins::SELECT, 0x04, 0x00, VX_APPLET_AID).with_le(0x00)
}

/// GET DATA for one data object
pub fn get_data(object_id: &[u8; 3]) -> Result<Command> {
    let tag_list = Tlv::new(
        Tag::try_from(tags::DATA_OBJECT_ID)?,
        Value::Primitive(object_id.to_vec()),
    )?;
    Ok(Command::new_with_data(CLA_ISO, ins::GET_DATA, 0x3F, 0xFF, tag_list.to_vec()).with_le(0x00))
}

/// PUT DATA replacing one data object
///
/// The command data may exceed a single APDU; the executor chains it.
pub fn put_data(object_id: &[u8; 3], content: &[u8]) -> Result<Command> {
    let mut data = Tlv::new(
        Tag::try_from(tags::DATA_OBJECT_ID)?,
        Value::Primitive(object_id.to_vec()),
    )?
    .to_vec();
    data.extend(
        Tlv::new(
            Tag::try_from(tags::DATA_OBJECT)?,
            Value::Primitive(content.to_vec()),
        )?
        .to_vec(),
    );
    Ok(Command::new_with_data(CLA_ISO, ins::PUT_DATA, 0x3F, 0xFF, data))
}

/// VERIFY a PIN
pub fn verify_pin(pin: &Pin) -> Command {
    Command::new_with_data(CLA_ISO, ins::VERIFY, 0x00, PIN_REFERENCE, pin.to_field().to_vec())
}

/// VERIFY without data, which only reports the retry counter
pub const fn verify_status() -> Command {
    Command::new(CLA_ISO, ins::VERIFY, 0x00, PIN_REFERENCE)
}

/// RESET RETRY COUNTER, setting `new_pin` and clearing wrong attempts
pub fn reset_retry_counter(new_pin: &Pin) -> Command {
    let mut data = Vec::with_capacity(2 * PIN_FIELD_LENGTH);
    data.extend_from_slice(&RESET_REFERENCE);
    data.extend_from_slice(&new_pin.to_field());
    Command::new_with_data(CLA_ISO, ins::RESET_RETRY_COUNTER, 0x00, PIN_REFERENCE, data)
}

/// Unwrap the `53` data object returned by GET DATA
pub fn parse_data_object(response: &[u8]) -> Result<Vec<u8>> {
    let (tlv, _) = Tlv::parse(response);
    let tlv = tlv?;
    if tlv.tag() != &Tag::try_from(tags::DATA_OBJECT)? {
        return Err(Error::InvalidData("Expected data object tag"));
    }
    match tlv.value() {
        Value::Primitive(bytes) => Ok(bytes.clone()),
        Value::Constructed(_) => Err(Error::InvalidData("Expected primitive data object")),
    }
}

/// Wrong PIN attempts implied by a VERIFY status word
///
/// Returns `None` for status words that say nothing about the counter.
pub const fn incorrect_attempts_from_status(status: StatusWord) -> Option<u8> {
    if status.is_success() {
        return Some(0);
    }
    if status.is_authentication_blocked() {
        return Some(CARD_PIN_RETRY_LIMIT);
    }
    match status.verify_retries_remaining() {
        Some(remaining) if remaining <= CARD_PIN_RETRY_LIMIT => {
            Some(CARD_PIN_RETRY_LIMIT - remaining)
        }
        _ => None,
    }
}
