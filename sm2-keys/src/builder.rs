//! Certificate and certification-request construction.

use std::net::IpAddr;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use const_oid::ObjectIdentifier;
use der::Encode;
use sm2_common::{Component, Logger};

use crate::asn1::{oid, time};
use crate::certificate::{
    Attribute, CertRequest, Certificate, SerialNumber, SignatureAlgorithm, TbsCertRequest,
    TbsCertificate, Validity, CSR_V1, X509_V3,
};
use crate::config::EngineConfig;
use crate::error::{Result, Sm2Error};
use crate::extensions::{
    AuthorityInfoAccess, AuthorityKeyIdentifier, BasicConstraints, CertificatePolicies,
    CrlDistributionPoints, ExtendedKeyUsage, Extension, ExtensionSet, KeyPurpose, KeyUsage,
    NameConstraints, SubjectAltName, SubjectKeyIdentifier,
};
use crate::keys::{PrivateKey, PublicKey};
use crate::name::Name;
use crate::sign::SignEngine;

/// Everything needed to issue one certificate.
///
/// Named fields become extensions in a fixed order; `extra_extensions` are
/// applied last and replace a named extension with the same OID in place.
#[derive(Debug, Clone)]
pub struct CertificateTemplate {
    pub serial_number: SerialNumber,
    pub subject: Name,
    /// Defaults to `subject` (self-issued) when `None`
    pub issuer: Option<Name>,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,

    pub key_usage: KeyUsage,
    pub ext_key_usage: Vec<KeyPurpose>,
    pub unknown_ext_key_usage: Vec<ObjectIdentifier>,
    pub basic_constraints: Option<BasicConstraints>,

    pub subject_key_id: Vec<u8>,
    pub authority_key_id: Vec<u8>,

    pub ocsp_servers: Vec<String>,
    pub issuing_certificate_urls: Vec<String>,

    pub dns_names: Vec<String>,
    pub email_addresses: Vec<String>,
    pub ip_addresses: Vec<IpAddr>,
    pub uris: Vec<String>,

    pub policy_identifiers: Vec<ObjectIdentifier>,
    pub permitted_dns_domains: Vec<String>,
    pub permitted_dns_domains_critical: bool,
    pub crl_distribution_points: Vec<String>,

    pub extra_extensions: Vec<Extension>,
}

impl Default for CertificateTemplate {
    fn default() -> Self {
        Self {
            serial_number: SerialNumber::from(1),
            subject: Name::default(),
            issuer: None,
            // an empty window fails validation until the caller sets one
            not_before: DateTime::<Utc>::default(),
            not_after: DateTime::<Utc>::default(),
            key_usage: KeyUsage::empty(),
            ext_key_usage: Vec::new(),
            unknown_ext_key_usage: Vec::new(),
            basic_constraints: None,
            subject_key_id: Vec::new(),
            authority_key_id: Vec::new(),
            ocsp_servers: Vec::new(),
            issuing_certificate_urls: Vec::new(),
            dns_names: Vec::new(),
            email_addresses: Vec::new(),
            ip_addresses: Vec::new(),
            uris: Vec::new(),
            policy_identifiers: Vec::new(),
            permitted_dns_domains: Vec::new(),
            permitted_dns_domains_critical: false,
            crl_distribution_points: Vec::new(),
            extra_extensions: Vec::new(),
        }
    }
}

impl CertificateTemplate {
    pub fn new(
        serial_number: SerialNumber,
        subject: Name,
        not_before: DateTime<Utc>,
        not_after: DateTime<Utc>,
    ) -> Self {
        Self {
            serial_number,
            subject,
            not_before,
            not_after,
            ..Self::default()
        }
    }

    fn subject_alt_name(&self) -> SubjectAltName {
        SubjectAltName {
            dns_names: self.dns_names.clone(),
            email_addresses: self.email_addresses.clone(),
            ip_addresses: self.ip_addresses.clone(),
            uris: self.uris.clone(),
        }
    }

    /// Final extension list: named extensions, then raw overrides.
    pub fn resolve_extensions(&self) -> Result<ExtensionSet> {
        let mut set = ExtensionSet::new();
        if !self.key_usage.is_empty() {
            set.insert(self.key_usage.to_extension()?);
        }
        let eku = ExtendedKeyUsage {
            purposes: self.ext_key_usage.clone(),
            unknown: self.unknown_ext_key_usage.clone(),
        };
        if !eku.is_empty() {
            set.insert(eku.to_extension()?);
        }
        if let Some(bc) = &self.basic_constraints {
            set.insert(bc.to_extension()?);
        }
        if !self.subject_key_id.is_empty() {
            set.insert(SubjectKeyIdentifier(self.subject_key_id.clone()).to_extension()?);
        }
        if !self.authority_key_id.is_empty() {
            set.insert(AuthorityKeyIdentifier(self.authority_key_id.clone()).to_extension()?);
        }
        let aia = AuthorityInfoAccess {
            ocsp_servers: self.ocsp_servers.clone(),
            issuing_certificate_urls: self.issuing_certificate_urls.clone(),
        };
        if !aia.is_empty() {
            set.insert(aia.to_extension()?);
        }
        let san = self.subject_alt_name();
        if !san.is_empty() {
            set.insert(san.to_extension()?);
        }
        let nc = NameConstraints {
            critical: self.permitted_dns_domains_critical,
            permitted_dns_domains: self.permitted_dns_domains.clone(),
            excluded_dns_domains: Vec::new(),
        };
        if !nc.is_empty() {
            set.insert(nc.to_extension()?);
        }
        if !self.crl_distribution_points.is_empty() {
            let points = CrlDistributionPoints(self.crl_distribution_points.clone());
            set.insert(points.to_extension()?);
        }
        if !self.policy_identifiers.is_empty() {
            set.insert(CertificatePolicies(self.policy_identifiers.clone()).to_extension()?);
        }
        for extension in &self.extra_extensions {
            set.insert(extension.clone());
        }
        Ok(set)
    }

    /// Reject templates that cannot produce a meaningful certificate.
    ///
    /// The window is compared at the second precision it is encoded with.
    pub fn validate(&self) -> Result<()> {
        let not_before = time::truncate_to_seconds(self.not_before);
        let not_after = time::truncate_to_seconds(self.not_after);
        if not_before >= not_after {
            return Err(Sm2Error::InvalidTemplate(format!(
                "not_before {} is not earlier than not_after {}",
                not_before, not_after
            )));
        }
        for (label, time) in [("not_before", not_before), ("not_after", not_after)] {
            if !(1970..=9999).contains(&time.year()) {
                return Err(Sm2Error::InvalidTemplate(format!(
                    "{label} year {} cannot be encoded",
                    time.year()
                )));
            }
        }
        if self.subject.is_empty() {
            return Err(Sm2Error::InvalidTemplate(
                "subject must not be empty".to_string(),
            ));
        }
        if matches!(&self.issuer, Some(issuer) if issuer.is_empty()) {
            return Err(Sm2Error::InvalidTemplate(
                "issuer must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Contents of a certification request.
#[derive(Debug, Clone, Default)]
pub struct CertRequestTemplate {
    pub subject: Name,
    pub dns_names: Vec<String>,
    pub email_addresses: Vec<String>,
    pub ip_addresses: Vec<IpAddr>,
    pub uris: Vec<String>,
    /// Requested extensions, replacing a SAN built from the fields above
    pub extra_extensions: Vec<Extension>,
    /// Further raw attributes
    pub attributes: Vec<Attribute>,
}

impl CertRequestTemplate {
    pub fn new(subject: Name) -> Self {
        Self {
            subject,
            ..Self::default()
        }
    }

    /// Extensions that go into the `extensionRequest` attribute.
    pub fn requested_extensions(&self) -> Result<ExtensionSet> {
        let mut set = ExtensionSet::new();
        let san = SubjectAltName {
            dns_names: self.dns_names.clone(),
            email_addresses: self.email_addresses.clone(),
            ip_addresses: self.ip_addresses.clone(),
            uris: self.uris.clone(),
        };
        if !san.is_empty() {
            set.insert(san.to_extension()?);
        }
        for extension in &self.extra_extensions {
            set.insert(extension.clone());
        }
        Ok(set)
    }
}

/// Turns templates into signed certificates and requests.
pub struct CertBuilder {
    logger: Arc<Logger>,
    signer: SignEngine,
}

impl CertBuilder {
    pub fn new(logger: Arc<Logger>) -> Self {
        let signer = SignEngine::default().with_logger(logger.with_component(Component::Signer));
        Self { logger, signer }
    }

    pub fn with_config(logger: Arc<Logger>, config: &EngineConfig) -> Result<Self> {
        config.validate()?;
        let signer =
            SignEngine::with_config(config).with_logger(logger.with_component(Component::Signer));
        Ok(Self { logger, signer })
    }

    fn sign_region(&self, private: &PrivateKey, region: &[u8]) -> Result<Vec<u8>> {
        self.signer.sign(private, region)?.to_der()
    }

    /// Sign a request for `subject` with the requester's key.
    pub fn build_csr(
        &self,
        subject: &Name,
        subject_pub: &PublicKey,
        requester: &PrivateKey,
        extra_attributes: &[Attribute],
    ) -> Result<CertRequest> {
        if subject_pub != requester.public_key() {
            return Err(Sm2Error::InvalidParameter(
                "request public key does not belong to the requester".to_string(),
            ));
        }
        let tbs = TbsCertRequest {
            version: CSR_V1,
            subject: subject.clone(),
            public_key: subject_pub.clone(),
            attributes: extra_attributes.to_vec(),
        };
        let info = tbs.to_x509()?;
        let signature = self.sign_region(requester, &info.to_der()?)?;
        let csr = CertRequest::assemble(info, &SignatureAlgorithm::Sm2WithSm3, &signature)?;

        self.logger.info_args(format_args!(
            "Certificate request created for subject: {}",
            subject
        ));
        Ok(csr)
    }

    pub fn build_csr_from_template(
        &self,
        template: &CertRequestTemplate,
        requester: &PrivateKey,
    ) -> Result<CertRequest> {
        let requested = template.requested_extensions()?;
        let mut attributes = Vec::with_capacity(template.attributes.len() + 1);
        if !requested.is_empty() {
            attributes.push(Attribute::extension_request(&requested)?);
        }
        for attribute in &template.attributes {
            if attribute.oid == oid::EXTENSION_REQUEST && !requested.is_empty() {
                self.logger.warn(
                    "Dropping caller extensionRequest attribute in favour of template extensions",
                );
                continue;
            }
            attributes.push(attribute.clone());
        }
        self.build_csr(
            &template.subject,
            requester.public_key(),
            requester,
            &attributes,
        )
    }

    /// Issue a certificate for `subject_pub`, signed by `issuer`.
    pub fn build_certificate(
        &self,
        template: &CertificateTemplate,
        issuer: &PrivateKey,
        subject_pub: &PublicKey,
    ) -> Result<Certificate> {
        template.validate()?;

        let issuer_name = template
            .issuer
            .clone()
            .unwrap_or_else(|| template.subject.clone());
        let tbs = TbsCertificate {
            version: X509_V3,
            serial: template.serial_number.clone(),
            signature: SignatureAlgorithm::Sm2WithSm3,
            issuer: issuer_name,
            validity: Validity::new(template.not_before, template.not_after),
            subject: template.subject.clone(),
            public_key: subject_pub.clone(),
            extensions: template.resolve_extensions()?,
        };
        let tbs = tbs
            .to_x509()
            .map_err(|e| Sm2Error::InvalidTemplate(e.to_string()))?;
        let signature = self.sign_region(issuer, &tbs.to_der()?)?;
        let certificate = Certificate::assemble(tbs, &SignatureAlgorithm::Sm2WithSm3, &signature)?;

        let logger = self.logger.with_operation("build_certificate");
        logger.info_args(format_args!(
            "Certificate issued: subject={}, issuer={}, serial={}",
            certificate.subject(),
            certificate.issuer(),
            certificate.serial()
        ));
        logger.debug_args(format_args!(
            "Certificate carries {} extensions",
            certificate.extensions().len()
        ));
        Ok(certificate)
    }
}
