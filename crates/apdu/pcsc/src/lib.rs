//! PC/SC transport for VxAuth smart cards
//!
//! This crate implements [`CardTransport`](vxauth_apdu_core::CardTransport)
//! over the PC/SC API. The transport polls its reader, folds what it sees
//! into a [`ReaderStatus`](vxauth_apdu_core::ReaderStatus) and holds an
//! exclusive card connection only while the status is `ready`.
//!
//! ```no_run
//! use vxauth_apdu_core::{CardExecutor, CardTransport, Command};
//! use vxauth_apdu_transport_pcsc::{PcscConfig, PcscDeviceManager};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = PcscDeviceManager::new()?;
//! let mut executor = CardExecutor::new(manager.open(PcscConfig::default()));
//!
//! if executor.poll_status().is_ready() {
//!     let select = Command::new_with_data(0x00, 0xA4, 0x04, 0x00, vec![0xA0, 0x00, 0x00, 0x03, 0x08]);
//!     let fci = executor.transmit(&select)?;
//!     println!("{fci:02x?}");
//! }
//! # Ok(())
//! # }
//! ```
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

mod config;
mod error;
mod manager;
pub mod monitor;
mod reader;
mod transport;

pub use config::{PcscConfig, ShareMode};
pub use error::PcscError;
pub use manager::PcscDeviceManager;
pub use reader::PcscReader;
pub use transport::PcscTransport;
