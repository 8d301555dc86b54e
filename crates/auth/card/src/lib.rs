//! Card session model for VxAuth smart cards
//!
//! This crate knows what a VxAuth card holds and how to read and write it:
//!
//! - [`CardDetails`] is the typed, role-tagged view of a card's identity
//! - [`commands`] builds the card application's APDUs
//! - [`Card`] is the seam the auth layer talks to, and [`SmartCard`]
//!   implements it over any [`CardTransport`](vxauth_apdu_core::CardTransport)
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

mod card;
mod card_details;
pub mod commands;
pub mod constants;
mod error;
mod pin;
mod smart_card;
mod user;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use card::{Card, CardStatus, CheckPinResponse};
pub use card_details::{CardDetails, encode_identity};
pub use constants::CARD_PIN_RETRY_LIMIT;
pub use error::{Error, Result};
pub use pin::{Pin, ValidationError};
pub use smart_card::SmartCard;
pub use user::{
    ElectionManagerUser, PollWorkerUser, SystemAdministratorUser, User, UserRole,
    generate_user_id,
};
