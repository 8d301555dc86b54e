//! Verifying artifacts
//!
//! Verification answers yes or no. Every cause of a no is logged at debug
//! level and then collapsed into [`ArtifactAuthenticationError`].

use std::fs;
use std::path::Path;

use p256::ecdsa::signature::Verifier;
use p256::ecdsa::{Signature, VerifyingKey};
use tracing::{debug, info};

use crate::artifact::Artifact;
use crate::bundle::SignatureBundle;
use crate::cert::{CertError, Certificate, decode_certificate};
use crate::error::ArtifactAuthenticationError;
use crate::fs::signature_file_path;

/// Verifies artifacts against a trust root
#[derive(Debug, Clone)]
pub struct ArtifactVerifier {
    trust_root: VerifyingKey,
    trust_root_subject: Option<Vec<u8>>,
}

impl ArtifactVerifier {
    /// A verifier trusting `trust_root_cert` (PEM or DER)
    ///
    /// Machine certificates must name the root's subject as their issuer and
    /// carry a signature by its key.
    pub fn new(trust_root_cert: &[u8]) -> Result<Self, CertError> {
        let der = decode_certificate(trust_root_cert)?;
        let cert = Certificate::from_der(&der)?;
        Ok(Self {
            trust_root: cert.public_key()?,
            trust_root_subject: Some(cert.subject_der().to_vec()),
        })
    }

    /// A verifier trusting `trust_root` directly, without an issuer name check
    pub const fn from_key(trust_root: VerifyingKey) -> Self {
        Self {
            trust_root,
            trust_root_subject: None,
        }
    }

    /// Verify `artifact` against the signature file next to it
    pub fn verify(&self, artifact: &Artifact) -> Result<(), ArtifactAuthenticationError> {
        self.verify_with_signature_file(artifact, &signature_file_path(&artifact.path, None))
    }

    /// Verify `artifact` against the signature file at `signature_path`
    pub fn verify_with_signature_file(
        &self,
        artifact: &Artifact,
        signature_path: &Path,
    ) -> Result<(), ArtifactAuthenticationError> {
        match self.check(artifact, signature_path) {
            Ok(()) => {
                info!(
                    artifact_type = %artifact.artifact_type,
                    path = %artifact.path.display(),
                    "Artifact authenticated"
                );
                Ok(())
            }
            Err(cause) => {
                debug!(
                    artifact_type = %artifact.artifact_type,
                    path = %artifact.path.display(),
                    %cause,
                    "Artifact authentication failed"
                );
                Err(ArtifactAuthenticationError {
                    artifact_path: artifact.path.clone(),
                })
            }
        }
    }

    fn check(&self, artifact: &Artifact, signature_path: &Path) -> Result<(), String> {
        let bytes = fs::read(signature_path)
            .map_err(|e| format!("reading {}: {e}", signature_path.display()))?;
        let bundle = SignatureBundle::from_bytes(&bytes).map_err(|e| e.to_string())?;

        let der = decode_certificate(bundle.signing_machine_cert()).map_err(|e| e.to_string())?;
        let cert = Certificate::from_der(&der).map_err(|e| e.to_string())?;

        let component = cert.machine_component().map_err(|e| e.to_string())?;
        if !artifact.artifact_type.allowed_signers().contains(&component) {
            return Err(format!(
                "{component} machines cannot sign {}",
                artifact.artifact_type
            ));
        }

        cert.verify_issued_by(&self.trust_root, self.trust_root_subject.as_deref())
            .map_err(|e| e.to_string())?;

        let message = artifact
            .message()
            .map_err(|e| format!("building message: {e}"))?;
        let signature = Signature::from_der(bundle.signature())
            .map_err(|e| format!("decoding signature: {e}"))?;
        let key = cert.public_key().map_err(|e| e.to_string())?;
        key.verify(&message, &signature)
            .map_err(|_| "signature does not match".to_string())
    }
}
