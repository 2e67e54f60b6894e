//! Parsing and signature checks for certificates and requests.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sm2_common::{Component, Logger};

use crate::certificate::{CertRequest, Certificate, SignatureAlgorithm, Signed};
use crate::config::EngineConfig;
use crate::error::{Result, Sm2Error};
use crate::keys::PublicKey;
use crate::sign::SignEngine;

pub struct CertVerifier {
    logger: Arc<Logger>,
    engine: SignEngine,
}

impl CertVerifier {
    pub fn new(logger: Arc<Logger>) -> Self {
        let engine = SignEngine::default().with_logger(logger.with_component(Component::Signer));
        Self { logger, engine }
    }

    pub fn with_config(logger: Arc<Logger>, config: &EngineConfig) -> Result<Self> {
        config.validate()?;
        let engine =
            SignEngine::with_config(config).with_logger(logger.with_component(Component::Signer));
        Ok(Self { logger, engine })
    }

    /// Parse a certificate from PEM or raw DER.
    pub fn parse_certificate(&self, input: &[u8]) -> Result<Certificate> {
        let cert = if looks_like_pem(input) {
            Certificate::from_pem(input)?
        } else {
            Certificate::from_der(input)?
        };
        self.logger.debug(format!(
            "Parsed certificate subject={} serial={}",
            cert.subject(),
            cert.serial()
        ));
        Ok(cert)
    }

    /// Parse a certification request from PEM or raw DER.
    pub fn parse_csr(&self, input: &[u8]) -> Result<CertRequest> {
        let csr = if looks_like_pem(input) {
            CertRequest::from_pem(input)?
        } else {
            CertRequest::from_der(input)?
        };
        self.logger
            .debug(format!("Parsed certificate request subject={}", csr.subject()));
        Ok(csr)
    }

    /// Check the signature over `signed` against `public`.
    ///
    /// Returns `Ok(false)` for a well-formed signature that does not verify
    /// and for algorithms other than SM2-with-SM3. A signature that is not a
    /// valid DER `(r, s)` pair is [`Sm2Error::MalformedSignature`].
    pub fn verify_signature(&self, signed: &impl Signed, public: &PublicKey) -> Result<bool> {
        match signed.signature_algorithm() {
            SignatureAlgorithm::Sm2WithSm3 => {}
            SignatureAlgorithm::Unknown(oid) => {
                self.logger
                    .warn_args(format_args!("Unsupported signature algorithm {oid}"));
                return Ok(false);
            }
        }
        let valid = self
            .engine
            .verify_der(public, signed.signed_region(), signed.signature_value())?;
        if !valid {
            self.logger.warn("Signature verification failed");
        }
        Ok(valid)
    }

    /// A request is signed by the key it carries.
    pub fn verify_csr(&self, csr: &CertRequest) -> Result<bool> {
        self.verify_signature(csr, csr.public_key())
    }

    /// Signature of a self-signed certificate against its own key.
    pub fn check_self_signature(&self, cert: &Certificate) -> Result<bool> {
        if !cert.is_self_issued() {
            self.logger.debug(format!(
                "Certificate issuer {} differs from subject {}",
                cert.issuer(),
                cert.subject()
            ));
        }
        self.verify_signature(cert, cert.public_key())
    }

    /// `cert` was issued by `parent`: names chain and the signature verifies.
    pub fn check_signature_from(&self, cert: &Certificate, parent: &Certificate) -> Result<bool> {
        if cert.issuer() != parent.subject() {
            self.logger.warn_args(format_args!(
                "Issuer {} does not match parent subject {}",
                cert.issuer(),
                parent.subject()
            ));
            return Ok(false);
        }
        self.verify_signature(cert, parent.public_key())
    }

    /// Signature from `parent` plus the validity window at `at`.
    pub fn verify_issued(
        &self,
        cert: &Certificate,
        parent: &Certificate,
        at: DateTime<Utc>,
    ) -> Result<()> {
        if !self.check_signature_from(cert, parent)? {
            return Err(Sm2Error::IntegrityFailure(format!(
                "certificate {} is not signed by {}",
                cert.subject(),
                parent.subject()
            )));
        }
        if !cert.validity().contains(at) {
            return Err(Sm2Error::IntegrityFailure(format!(
                "certificate {} is not valid at {at}",
                cert.subject()
            )));
        }
        Ok(())
    }
}

fn looks_like_pem(input: &[u8]) -> bool {
    input
        .windows(b"-----BEGIN ".len())
        .any(|w| w == b"-----BEGIN ")
}
