//! Signature bundle codec
//!
//! A bundle is stored as `[signature length][signature][certificate]`. The
//! length prefix is needed because DER-encoded ECDSA signatures vary in
//! length.

use std::ops::RangeInclusive;

use crate::error::{ArtifactError, Result};

/// Accepted DER signature lengths
pub const SIGNATURE_LENGTH_RANGE: RangeInclusive<usize> = 70..=72;

/// Smallest serialized bundle accepted when reading
pub const MIN_BUNDLE_LENGTH: usize = 500;

/// File extension of signature sidecars
pub const SIGNATURE_FILE_EXTENSION: &str = "vxsig";

/// A detached signature and the certificate of the machine that made it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureBundle {
    signature: Vec<u8>,
    signing_machine_cert: Vec<u8>,
}

impl SignatureBundle {
    /// Bundle a DER signature with a PEM certificate
    pub fn new(signature: Vec<u8>, signing_machine_cert: Vec<u8>) -> Result<Self> {
        if !SIGNATURE_LENGTH_RANGE.contains(&signature.len()) {
            return Err(ArtifactError::SignatureLength {
                min: *SIGNATURE_LENGTH_RANGE.start(),
                max: *SIGNATURE_LENGTH_RANGE.end(),
            });
        }
        Ok(Self {
            signature,
            signing_machine_cert,
        })
    }

    /// The DER signature
    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// The signing machine certificate
    pub fn signing_machine_cert(&self) -> &[u8] {
        &self.signing_machine_cert
    }

    /// Serialize to the sidecar format
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + self.signature.len() + self.signing_machine_cert.len());
        // length is bounded by SIGNATURE_LENGTH_RANGE
        out.push(self.signature.len() as u8);
        out.extend_from_slice(&self.signature);
        out.extend_from_slice(&self.signing_machine_cert);
        out
    }

    /// Parse the sidecar format
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < MIN_BUNDLE_LENGTH {
            return Err(ArtifactError::MalformedBundle);
        }
        let signature_length = usize::from(bytes[0]);
        if !SIGNATURE_LENGTH_RANGE.contains(&signature_length) {
            return Err(ArtifactError::MalformedBundle);
        }
        let (signature, cert) = bytes[1..].split_at(signature_length);
        Ok(Self {
            signature: signature.to_vec(),
            signing_machine_cert: cert.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_rejects_short_buffer() {
        let bundle = SignatureBundle::new(vec![0x30; 71], vec![b'C'; 100]).unwrap();
        assert!(matches!(
            SignatureBundle::from_bytes(&bundle.to_bytes()),
            Err(ArtifactError::MalformedBundle)
        ));
    }

    #[test]
    fn test_rejects_bad_signature_length() {
        for length in [0u8, 69, 73, 255] {
            let mut bytes = vec![0u8; MIN_BUNDLE_LENGTH];
            bytes[0] = length;
            assert!(
                SignatureBundle::from_bytes(&bytes).is_err(),
                "length {length} accepted"
            );
        }
    }

    #[test]
    fn test_new_rejects_bad_signature_length() {
        assert!(SignatureBundle::new(vec![0; 69], Vec::new()).is_err());
        assert!(SignatureBundle::new(vec![0; 73], Vec::new()).is_err());
    }

    proptest! {
        #[test]
        fn prop_round_trip(
            signature in (70usize..=72).prop_flat_map(|n| prop::collection::vec(any::<u8>(), n)),
            cert in prop::collection::vec(any::<u8>(), 429..2048),
        ) {
            let bundle = SignatureBundle::new(signature, cert).unwrap();
            let bytes = bundle.to_bytes();
            prop_assert_eq!(bytes[0] as usize, bundle.signature().len());
            prop_assert_eq!(SignatureBundle::from_bytes(&bytes).unwrap(), bundle);
        }

        #[test]
        fn prop_from_bytes_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..1024)) {
            let _ = SignatureBundle::from_bytes(&bytes);
        }
    }
}
