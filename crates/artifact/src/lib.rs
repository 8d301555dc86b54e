//! Detached signatures for election artifacts
//!
//! A machine signs an exported [`Artifact`] with its P-256 key and writes a
//! `{artifact}.vxsig` file holding the signature and the machine's
//! certificate. A consuming machine trusts the artifact when:
//!
//! 1. the certificate names a machine component allowed to produce that
//!    artifact type,
//! 2. the certificate was issued by the trust root and is within validity,
//! 3. the signature covers the artifact as it is now.
//!
//! ```no_run
//! use vxauth_artifact::{Artifact, ArtifactSigner, ArtifactVerifier, WriteOptions};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let signer = ArtifactSigner::from_pem(
//!     &std::fs::read_to_string("machine-key.pem")?,
//!     &std::fs::read("machine-cert.pem")?,
//! )?;
//! let artifact = Artifact::ballot_package("/media/usb/ballot-package.zip");
//! signer.sign_to_file(&artifact, &WriteOptions::default())?;
//!
//! let verifier = ArtifactVerifier::new(&std::fs::read("trust-root.pem")?)?;
//! verifier.verify(&artifact)?;
//! # Ok(())
//! # }
//! ```
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

mod artifact;
mod bundle;
mod cert;
mod error;
mod fs;
mod sign;
mod verify;

pub use artifact::{Artifact, ArtifactType, directory_manifest};
pub use bundle::{
    MIN_BUNDLE_LENGTH, SIGNATURE_FILE_EXTENSION, SIGNATURE_LENGTH_RANGE, SignatureBundle,
};
pub use cert::{CertError, Certificate, MACHINE_COMPONENT_OID, MachineComponent, decode_certificate};
pub use error::{ArtifactAuthenticationError, ArtifactError, Result};
pub use fs::{signature_file_path, write_atomically};
pub use sign::{ArtifactSigner, WriteOptions};
pub use verify::ArtifactVerifier;
