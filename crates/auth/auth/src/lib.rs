//! Smart card authentication for VxAuth machines
//!
//! The pieces, from the inside out:
//!
//! - [`transition`] is the pure auth state machine over [`AuthStatus`]
//! - [`DippedSmartCardAuth`] drives it from a [`Card`](vxauth_card::Card),
//!   serializing card I/O with status updates
//! - [`AuthPoller`] polls the reader on a background thread
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use vxauth::{AuthConfig, AuthPoller, DippedSmartCardAuth, MachineState};
//! use vxauth_card::mock::MockCard;
//!
//! let auth = Arc::new(DippedSmartCardAuth::new(
//!     MockCard::new(),
//!     AuthConfig::default(),
//!     MachineState::configured_for("ABC123"),
//! ));
//! let updates = auth.subscribe();
//! let poller = AuthPoller::spawn(auth.clone());
//!
//! for status in updates.iter().take(1) {
//!     println!("{}", status.name());
//! }
//! poller.stop();
//! ```
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

mod clock;
mod config;
mod dipped;
mod error;
mod machine;
mod poller;
mod status;

pub use clock::{Clock, MockClock, SystemClock};
pub use config::{AuthConfig, MachineState};
pub use dipped::{DippedSmartCardAuth, ProgramCardRequest, election_hash};
pub use error::{Error, Result};
pub use machine::{AuthEvent, TransitionContext, transition, validate_card};
pub use poller::AuthPoller;
pub use status::{AuthStatus, LoggedIn, LoggedOutReason, ProgrammableCard};
