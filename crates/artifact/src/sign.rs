//! Signing artifacts

use std::path::PathBuf;

use p256::ecdsa::signature::{RandomizedSigner, Signer};
use p256::ecdsa::{DerSignature, Signature, SigningKey};
use p256::elliptic_curve::rand_core::OsRng;
use p256::pkcs8::DecodePrivateKey;
use tracing::{debug, info};

use crate::artifact::Artifact;
use crate::bundle::{SIGNATURE_LENGTH_RANGE, SignatureBundle};
use crate::cert::{Certificate, decode_certificate};
use crate::error::{ArtifactError, Result};
use crate::fs::{signature_file_path, write_atomically};

const MAX_SIGNING_ATTEMPTS: usize = 16;

/// Where and how to write a signature file
#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    /// Directory for the signature file, next to the artifact when unset
    pub output_directory: Option<PathBuf>,
    /// Flush to disk before returning, for media that can be pulled
    pub removable_media: bool,
}

/// Signs artifacts as one machine
#[derive(Debug, Clone)]
pub struct ArtifactSigner {
    signing_key: SigningKey,
    signing_machine_cert: Vec<u8>,
}

impl ArtifactSigner {
    /// A signer from a key and the certificate issued for it
    ///
    /// The certificate is kept in the form given and embedded in every
    /// signature bundle.
    pub fn new(signing_key: SigningKey, signing_machine_cert: Vec<u8>) -> Result<Self> {
        let der = decode_certificate(&signing_machine_cert)
            .map_err(|e| ArtifactError::InvalidCertificate(e.to_string()))?;
        let cert = Certificate::from_der(&der)
            .map_err(|e| ArtifactError::InvalidCertificate(e.to_string()))?;
        let cert_key = cert
            .public_key()
            .map_err(|e| ArtifactError::InvalidCertificate(e.to_string()))?;
        if cert_key != *signing_key.verifying_key() {
            return Err(ArtifactError::KeyCertificateMismatch);
        }

        Ok(Self {
            signing_key,
            signing_machine_cert,
        })
    }

    /// A signer from a PKCS#8 PEM key and a PEM certificate
    pub fn from_pem(key_pem: &str, cert_pem: &[u8]) -> Result<Self> {
        let signing_key = SigningKey::from_pkcs8_pem(key_pem)
            .map_err(|e| ArtifactError::InvalidKey(e.to_string()))?;
        Self::new(signing_key, cert_pem.to_vec())
    }

    /// Sign `artifact`
    pub fn sign(&self, artifact: &Artifact) -> Result<SignatureBundle> {
        let message = artifact.message()?;
        let signature = self.sign_message(&message)?;
        SignatureBundle::new(signature, self.signing_machine_cert.clone())
    }

    /// Sign `artifact` and write `{artifact}.vxsig`
    pub fn sign_to_file(&self, artifact: &Artifact, options: &WriteOptions) -> Result<PathBuf> {
        let bundle = self.sign(artifact)?;
        let path = signature_file_path(&artifact.path, options.output_directory.as_deref());
        write_atomically(&path, &bundle.to_bytes(), options.removable_media)?;
        info!(
            artifact_type = %artifact.artifact_type,
            path = %path.display(),
            "Signed artifact"
        );
        Ok(path)
    }

    /// The certificate embedded in signatures
    pub fn signing_machine_cert(&self) -> &[u8] {
        &self.signing_machine_cert
    }

    /// DER signature whose length the bundle format can carry
    ///
    /// The deterministic signature is tried first; rare out-of-range lengths
    /// are re-signed with a random nonce.
    fn sign_message(&self, message: &[u8]) -> Result<Vec<u8>> {
        let signature: DerSignature = self.signing_key.sign(message);
        if SIGNATURE_LENGTH_RANGE.contains(&signature.as_bytes().len()) {
            return Ok(signature.as_bytes().to_vec());
        }
        debug!(
            length = signature.as_bytes().len(),
            "Re-signing for an encodable signature length"
        );

        for _ in 1..MAX_SIGNING_ATTEMPTS {
            let signature: Signature = self.signing_key.sign_with_rng(&mut OsRng, message);
            let der = signature.to_der();
            if SIGNATURE_LENGTH_RANGE.contains(&der.as_bytes().len()) {
                return Ok(der.as_bytes().to_vec());
            }
        }
        Err(ArtifactError::SignatureLength {
            min: *SIGNATURE_LENGTH_RANGE.start(),
            max: *SIGNATURE_LENGTH_RANGE.end(),
        })
    }
}
