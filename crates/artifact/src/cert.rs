//! Machine certificates
//!
//! Certificates carry the kind of machine they were issued to in a custom
//! subject attribute. Signatures are ECDSA P-256 with SHA-256 throughout.

use std::str::FromStr;

use derive_more::Display;
use p256::ecdsa::signature::Verifier;
use p256::ecdsa::{Signature, VerifyingKey};
use serde::{Deserialize, Serialize};
use x509_parser::certificate::X509Certificate;
use x509_parser::oid_registry::OID_SIG_ECDSA_WITH_SHA256;
use x509_parser::parse_x509_certificate;
use x509_parser::pem::parse_x509_pem;

/// Subject attribute naming the machine component
pub const MACHINE_COMPONENT_OID: &str = "1.3.6.1.4.1.59817.1";

/// Kind of machine a certificate was issued to
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MachineComponent {
    /// Election administration machine
    #[display("admin")]
    Admin,
    /// Central ballot scanner
    #[display("central-scan")]
    CentralScan,
    /// Precinct ballot scanner
    #[display("scan")]
    Scan,
}

impl FromStr for MachineComponent {
    type Err = CertError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "admin" => Ok(Self::Admin),
            "central-scan" => Ok(Self::CentralScan),
            "scan" => Ok(Self::Scan),
            other => Err(CertError::UnknownComponent(other.to_string())),
        }
    }
}

/// Reasons a certificate is not acceptable
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CertError {
    /// Neither PEM nor DER X.509
    #[error("Unparsable certificate: {0}")]
    Parse(String),
    /// The subject has no machine component attribute
    #[error("Certificate has no machine component")]
    MissingComponent,
    /// The machine component attribute has an unknown value
    #[error("Unknown machine component: {0}")]
    UnknownComponent(String),
    /// The key is not a P-256 key
    #[error("Unsupported public key")]
    UnsupportedKey,
    /// The certificate is not signed with ECDSA over SHA-256
    #[error("Unsupported signature algorithm")]
    UnsupportedSignatureAlgorithm,
    /// The certificate names an issuer other than the trust root
    #[error("Certificate issuer does not match the trust root subject")]
    IssuerMismatch,
    /// The issuer's signature does not verify
    #[error("Certificate not issued by the trust root")]
    BadIssuerSignature,
    /// Outside the validity period
    #[error("Certificate is not currently valid")]
    Expired,
}

/// Decode a certificate from PEM, or DER when it is not PEM
pub fn decode_certificate(bytes: &[u8]) -> Result<Vec<u8>, CertError> {
    if bytes.starts_with(b"-----BEGIN") {
        let (_, pem) = parse_x509_pem(bytes).map_err(|e| CertError::Parse(e.to_string()))?;
        Ok(pem.contents)
    } else {
        Ok(bytes.to_vec())
    }
}

/// A parsed certificate
#[derive(Debug)]
pub struct Certificate<'a> {
    inner: X509Certificate<'a>,
}

impl<'a> Certificate<'a> {
    /// Parse DER bytes
    pub fn from_der(der: &'a [u8]) -> Result<Self, CertError> {
        let (_, inner) = parse_x509_certificate(der).map_err(|e| CertError::Parse(e.to_string()))?;
        Ok(Self { inner })
    }

    /// The machine component named in the subject
    pub fn machine_component(&self) -> Result<MachineComponent, CertError> {
        let value = self
            .inner
            .subject()
            .iter_attributes()
            .find(|attr| attr.attr_type().to_id_string() == MACHINE_COMPONENT_OID)
            .ok_or(CertError::MissingComponent)?
            .as_str()
            .map_err(|_| CertError::MissingComponent)?;
        value.parse()
    }

    /// The subject's P-256 public key
    pub fn public_key(&self) -> Result<VerifyingKey, CertError> {
        VerifyingKey::from_sec1_bytes(&self.inner.public_key().subject_public_key.data)
            .map_err(|_| CertError::UnsupportedKey)
    }

    /// Whether now falls inside the validity period
    pub fn is_currently_valid(&self) -> bool {
        self.inner.validity().is_valid()
    }

    /// DER encoding of the subject name
    pub fn subject_der(&self) -> &[u8] {
        self.inner.subject().as_raw()
    }

    /// DER encoding of the issuer name
    pub fn issuer_der(&self) -> &[u8] {
        self.inner.issuer().as_raw()
    }

    /// Check this certificate was signed by `issuer` and is within validity
    ///
    /// When `issuer_subject` is given, the certificate's issuer name must
    /// match it byte for byte.
    pub fn verify_issued_by(
        &self,
        issuer: &VerifyingKey,
        issuer_subject: Option<&[u8]>,
    ) -> Result<(), CertError> {
        if issuer_subject.is_some_and(|subject| subject != self.issuer_der()) {
            return Err(CertError::IssuerMismatch);
        }
        if self.inner.signature_algorithm.algorithm != OID_SIG_ECDSA_WITH_SHA256 {
            return Err(CertError::UnsupportedSignatureAlgorithm);
        }
        let signature = Signature::from_der(&self.inner.signature_value.data)
            .map_err(|_| CertError::BadIssuerSignature)?;
        issuer
            .verify(self.inner.tbs_certificate.as_ref(), &signature)
            .map_err(|_| CertError::BadIssuerSignature)?;

        if !self.is_currently_valid() {
            return Err(CertError::Expired);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_names() {
        for component in [
            MachineComponent::Admin,
            MachineComponent::CentralScan,
            MachineComponent::Scan,
        ] {
            assert_eq!(component.to_string().parse::<MachineComponent>(), Ok(component));
        }
        assert_eq!(
            "mark".parse::<MachineComponent>(),
            Err(CertError::UnknownComponent("mark".into()))
        );
    }

    #[test]
    fn test_garbage_is_not_a_certificate() {
        assert!(Certificate::from_der(b"not a certificate").is_err());
        assert!(decode_certificate(b"-----BEGIN CERTIFICATE-----\n%%%\n").is_err());
    }
}
