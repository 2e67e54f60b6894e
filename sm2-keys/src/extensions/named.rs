//! Typed views of the standard certificate extensions.
//!
//! The DER work is done by the `x509_cert::ext::pkix` types; these structs
//! keep the flat shape the builder and callers work with.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use const_oid::ObjectIdentifier;
use der::asn1::{Ia5String, OctetString};
use der::flagset::FlagSet;
use der::{Decode, Encode};
use x509_cert::ext::pkix as x509;
use x509_cert::ext::pkix::certpolicy::PolicyInformation;
use x509_cert::ext::pkix::constraints::name::GeneralSubtree;
use x509_cert::ext::pkix::crl::dp::DistributionPoint;
use x509_cert::ext::pkix::name::{DistributionPointName, GeneralName};

use super::Extension;
use crate::asn1::oid;
use crate::error::{Result, Sm2Error};

fn ia5(value: &str) -> Result<Ia5String> {
    Ia5String::new(value)
        .map_err(|_| Sm2Error::InvalidParameter(format!("{value:?} is not an IA5String")))
}

fn octets(value: &[u8]) -> Result<OctetString> {
    Ok(OctetString::new(value.to_vec())?)
}

fn ip_from_bytes(value: &[u8]) -> Result<IpAddr> {
    match value.len() {
        4 => {
            let mut octets = [0u8; 4];
            octets.copy_from_slice(value);
            Ok(IpAddr::V4(Ipv4Addr::from(octets)))
        }
        16 => {
            let mut octets = [0u8; 16];
            octets.copy_from_slice(value);
            Ok(IpAddr::V6(Ipv6Addr::from(octets)))
        }
        n => Err(Sm2Error::MalformedEncoding(format!(
            "IP address of {n} bytes"
        ))),
    }
}

fn ip_to_bytes(ip: &IpAddr) -> Vec<u8> {
    match ip {
        IpAddr::V4(v4) => v4.octets().to_vec(),
        IpAddr::V6(v6) => v6.octets().to_vec(),
    }
}

fn uri_name(url: &str) -> Result<GeneralName> {
    Ok(GeneralName::UniformResourceIdentifier(ia5(url)?))
}

fn extension<T: Encode>(oid: ObjectIdentifier, critical: bool, value: &T) -> Result<Extension> {
    Ok(Extension::new(oid, critical, value.to_der()?))
}

/// `SubjectKeyIdentifier ::= OCTET STRING`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectKeyIdentifier(pub Vec<u8>);

impl SubjectKeyIdentifier {
    pub fn to_extension(&self) -> Result<Extension> {
        let ski = x509::SubjectKeyIdentifier(octets(&self.0)?);
        extension(oid::SUBJECT_KEY_IDENTIFIER, false, &ski)
    }

    pub fn from_der(value: &[u8]) -> Result<Self> {
        let ski = x509::SubjectKeyIdentifier::from_der(value)?;
        Ok(Self(ski.0.as_bytes().to_vec()))
    }
}

/// The `keyIdentifier` of an AuthorityKeyIdentifier. The issuer name and
/// serial alternatives are accepted on input and dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorityKeyIdentifier(pub Vec<u8>);

impl AuthorityKeyIdentifier {
    pub fn to_extension(&self) -> Result<Extension> {
        let aki = x509::AuthorityKeyIdentifier {
            key_identifier: Some(octets(&self.0)?),
            authority_cert_issuer: None,
            authority_cert_serial_number: None,
        };
        extension(oid::AUTHORITY_KEY_IDENTIFIER, false, &aki)
    }

    pub fn from_der(value: &[u8]) -> Result<Self> {
        let aki = x509::AuthorityKeyIdentifier::from_der(value)?;
        Ok(Self(
            aki.key_identifier
                .map(|id| id.as_bytes().to_vec())
                .unwrap_or_default(),
        ))
    }
}

/// Key usage bits, numbered as in RFC 5280.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct KeyUsage(u16);

impl KeyUsage {
    pub const DIGITAL_SIGNATURE: KeyUsage = KeyUsage(1 << 0);
    pub const CONTENT_COMMITMENT: KeyUsage = KeyUsage(1 << 1);
    pub const KEY_ENCIPHERMENT: KeyUsage = KeyUsage(1 << 2);
    pub const DATA_ENCIPHERMENT: KeyUsage = KeyUsage(1 << 3);
    pub const KEY_AGREEMENT: KeyUsage = KeyUsage(1 << 4);
    pub const KEY_CERT_SIGN: KeyUsage = KeyUsage(1 << 5);
    pub const CRL_SIGN: KeyUsage = KeyUsage(1 << 6);
    pub const ENCIPHER_ONLY: KeyUsage = KeyUsage(1 << 7);
    pub const DECIPHER_ONLY: KeyUsage = KeyUsage(1 << 8);

    pub const fn empty() -> Self {
        KeyUsage(0)
    }

    pub const fn bits(&self) -> u16 {
        self.0
    }

    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub const fn contains(&self, other: KeyUsage) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn union(self, other: KeyUsage) -> Self {
        KeyUsage(self.0 | other.0)
    }

    /// Always critical. The BIT STRING carries no trailing zero bits.
    pub fn to_extension(&self) -> Result<Extension> {
        let flags: FlagSet<x509::KeyUsages> = FlagSet::new_truncated(self.0);
        extension(oid::KEY_USAGE, true, &x509::KeyUsage(flags))
    }

    pub fn from_der(value: &[u8]) -> Result<Self> {
        let ku = x509::KeyUsage::from_der(value)?;
        Ok(KeyUsage(ku.0.bits()))
    }
}

impl std::ops::BitOr for KeyUsage {
    type Output = KeyUsage;

    fn bitor(self, rhs: KeyUsage) -> KeyUsage {
        self.union(rhs)
    }
}

/// Well-known extended key usage purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyPurpose {
    Any,
    ServerAuth,
    ClientAuth,
    CodeSigning,
    EmailProtection,
    TimeStamping,
    OcspSigning,
}

impl KeyPurpose {
    const ALL: [KeyPurpose; 7] = [
        KeyPurpose::Any,
        KeyPurpose::ServerAuth,
        KeyPurpose::ClientAuth,
        KeyPurpose::CodeSigning,
        KeyPurpose::EmailProtection,
        KeyPurpose::TimeStamping,
        KeyPurpose::OcspSigning,
    ];

    pub fn oid(&self) -> ObjectIdentifier {
        match self {
            KeyPurpose::Any => oid::KP_ANY,
            KeyPurpose::ServerAuth => oid::KP_SERVER_AUTH,
            KeyPurpose::ClientAuth => oid::KP_CLIENT_AUTH,
            KeyPurpose::CodeSigning => oid::KP_CODE_SIGNING,
            KeyPurpose::EmailProtection => oid::KP_EMAIL_PROTECTION,
            KeyPurpose::TimeStamping => oid::KP_TIME_STAMPING,
            KeyPurpose::OcspSigning => oid::KP_OCSP_SIGNING,
        }
    }

    pub fn from_oid(oid: &ObjectIdentifier) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| &p.oid() == oid)
    }
}

/// Known purposes first, then any unrecognized OIDs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtendedKeyUsage {
    pub purposes: Vec<KeyPurpose>,
    pub unknown: Vec<ObjectIdentifier>,
}

impl ExtendedKeyUsage {
    pub fn is_empty(&self) -> bool {
        self.purposes.is_empty() && self.unknown.is_empty()
    }

    pub fn to_extension(&self) -> Result<Extension> {
        let oids = self
            .purposes
            .iter()
            .map(KeyPurpose::oid)
            .chain(self.unknown.iter().copied())
            .collect();
        extension(oid::EXT_KEY_USAGE, false, &x509::ExtendedKeyUsage(oids))
    }

    pub fn from_der(value: &[u8]) -> Result<Self> {
        let eku = x509::ExtendedKeyUsage::from_der(value)?;
        let mut out = Self::default();
        for oid in eku.0 {
            match KeyPurpose::from_oid(&oid) {
                Some(purpose) => out.purposes.push(purpose),
                None => out.unknown.push(oid),
            }
        }
        Ok(out)
    }
}

/// `BasicConstraints ::= SEQUENCE { cA BOOLEAN DEFAULT FALSE, pathLen INTEGER OPTIONAL }`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BasicConstraints {
    pub ca: bool,
    pub max_path_len: Option<u8>,
}

impl BasicConstraints {
    /// Always critical.
    pub fn to_extension(&self) -> Result<Extension> {
        let bc = x509::BasicConstraints {
            ca: self.ca,
            path_len_constraint: self.max_path_len,
        };
        extension(oid::BASIC_CONSTRAINTS, true, &bc)
    }

    pub fn from_der(value: &[u8]) -> Result<Self> {
        let bc = x509::BasicConstraints::from_der(value)?;
        Ok(Self {
            ca: bc.ca,
            max_path_len: bc.path_len_constraint,
        })
    }
}

/// Subject alternative names in the order DNS, e-mail, IP, URI.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectAltName {
    pub dns_names: Vec<String>,
    pub email_addresses: Vec<String>,
    pub ip_addresses: Vec<IpAddr>,
    pub uris: Vec<String>,
}

impl SubjectAltName {
    pub fn is_empty(&self) -> bool {
        self.dns_names.is_empty()
            && self.email_addresses.is_empty()
            && self.ip_addresses.is_empty()
            && self.uris.is_empty()
    }

    fn general_names(&self) -> Result<Vec<GeneralName>> {
        let mut names = Vec::new();
        for dns in &self.dns_names {
            names.push(GeneralName::DnsName(ia5(dns)?));
        }
        for email in &self.email_addresses {
            names.push(GeneralName::Rfc822Name(ia5(email)?));
        }
        for ip in &self.ip_addresses {
            names.push(GeneralName::IpAddress(octets(&ip_to_bytes(ip))?));
        }
        for uri in &self.uris {
            names.push(uri_name(uri)?);
        }
        Ok(names)
    }

    pub fn to_extension(&self) -> Result<Extension> {
        let san = x509::SubjectAltName(self.general_names()?);
        extension(oid::SUBJECT_ALT_NAME, false, &san)
    }

    pub fn from_der(value: &[u8]) -> Result<Self> {
        let san = x509::SubjectAltName::from_der(value)?;
        let mut out = Self::default();
        for name in san.0 {
            match name {
                GeneralName::DnsName(dns) => out.dns_names.push(dns.to_string()),
                GeneralName::Rfc822Name(email) => out.email_addresses.push(email.to_string()),
                GeneralName::IpAddress(ip) => out.ip_addresses.push(ip_from_bytes(ip.as_bytes())?),
                GeneralName::UniformResourceIdentifier(uri) => out.uris.push(uri.to_string()),
                // otherName, directoryName, ediPartyName, registeredID
                _ => {}
            }
        }
        Ok(out)
    }
}

/// OCSP responders and CA issuer URLs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorityInfoAccess {
    pub ocsp_servers: Vec<String>,
    pub issuing_certificate_urls: Vec<String>,
}

impl AuthorityInfoAccess {
    pub fn is_empty(&self) -> bool {
        self.ocsp_servers.is_empty() && self.issuing_certificate_urls.is_empty()
    }

    pub fn to_extension(&self) -> Result<Extension> {
        let entries = self
            .ocsp_servers
            .iter()
            .map(|u| (oid::OCSP, u))
            .chain(self.issuing_certificate_urls.iter().map(|u| (oid::CA_ISSUERS, u)));
        let mut descriptions = Vec::new();
        for (method, url) in entries {
            descriptions.push(x509::AccessDescription {
                access_method: method,
                access_location: uri_name(url)?,
            });
        }
        let aia = x509::AuthorityInfoAccessSyntax(descriptions);
        extension(oid::AUTHORITY_INFO_ACCESS, false, &aia)
    }

    pub fn from_der(value: &[u8]) -> Result<Self> {
        let aia = x509::AuthorityInfoAccessSyntax::from_der(value)?;
        let mut out = Self::default();
        for desc in aia.0 {
            let GeneralName::UniformResourceIdentifier(url) = desc.access_location else {
                continue;
            };
            if desc.access_method == oid::OCSP {
                out.ocsp_servers.push(url.to_string());
            } else if desc.access_method == oid::CA_ISSUERS {
                out.issuing_certificate_urls.push(url.to_string());
            }
        }
        Ok(out)
    }
}

/// Policy OIDs without qualifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CertificatePolicies(pub Vec<ObjectIdentifier>);

impl CertificatePolicies {
    pub fn to_extension(&self) -> Result<Extension> {
        let policies = x509::CertificatePolicies(
            self.0
                .iter()
                .map(|policy| PolicyInformation {
                    policy_identifier: *policy,
                    policy_qualifiers: None,
                })
                .collect(),
        );
        extension(oid::CERTIFICATE_POLICIES, false, &policies)
    }

    /// Qualifiers are accepted and not interpreted.
    pub fn from_der(value: &[u8]) -> Result<Self> {
        let policies = x509::CertificatePolicies::from_der(value)?;
        Ok(Self(
            policies.0.into_iter().map(|p| p.policy_identifier).collect(),
        ))
    }
}

/// DNS-domain name constraints.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameConstraints {
    pub critical: bool,
    pub permitted_dns_domains: Vec<String>,
    pub excluded_dns_domains: Vec<String>,
}

impl NameConstraints {
    pub fn is_empty(&self) -> bool {
        self.permitted_dns_domains.is_empty() && self.excluded_dns_domains.is_empty()
    }

    fn subtrees(domains: &[String]) -> Result<Option<Vec<GeneralSubtree>>> {
        if domains.is_empty() {
            return Ok(None);
        }
        let mut subtrees = Vec::with_capacity(domains.len());
        for domain in domains {
            subtrees.push(GeneralSubtree {
                base: GeneralName::DnsName(ia5(domain)?),
                minimum: 0,
                maximum: None,
            });
        }
        Ok(Some(subtrees))
    }

    fn dns_domains(subtrees: Option<Vec<GeneralSubtree>>) -> Vec<String> {
        subtrees
            .unwrap_or_default()
            .into_iter()
            .filter_map(|subtree| match subtree.base {
                GeneralName::DnsName(dns) => Some(dns.to_string()),
                _ => None,
            })
            .collect()
    }

    pub fn to_extension(&self) -> Result<Extension> {
        let nc = x509::NameConstraints {
            permitted_subtrees: Self::subtrees(&self.permitted_dns_domains)?,
            excluded_subtrees: Self::subtrees(&self.excluded_dns_domains)?,
        };
        extension(oid::NAME_CONSTRAINTS, self.critical, &nc)
    }

    pub fn from_der(value: &[u8], critical: bool) -> Result<Self> {
        let nc = x509::NameConstraints::from_der(value)?;
        Ok(Self {
            critical,
            permitted_dns_domains: Self::dns_domains(nc.permitted_subtrees),
            excluded_dns_domains: Self::dns_domains(nc.excluded_subtrees),
        })
    }
}

/// CRL distribution point URLs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrlDistributionPoints(pub Vec<String>);

impl CrlDistributionPoints {
    pub fn to_extension(&self) -> Result<Extension> {
        let mut points = Vec::with_capacity(self.0.len());
        for url in &self.0 {
            points.push(DistributionPoint {
                distribution_point: Some(DistributionPointName::FullName(vec![uri_name(url)?])),
                reasons: None,
                crl_issuer: None,
            });
        }
        let crl = x509::CrlDistributionPoints(points);
        extension(oid::CRL_DISTRIBUTION_POINTS, false, &crl)
    }

    /// Full-name URIs only; reasons and cRLIssuer are dropped.
    pub fn from_der(value: &[u8]) -> Result<Self> {
        let crl = x509::CrlDistributionPoints::from_der(value)?;
        let mut urls = Vec::new();
        for point in crl.0 {
            if let Some(DistributionPointName::FullName(names)) = point.distribution_point {
                urls.extend(names.into_iter().filter_map(|name| match name {
                    GeneralName::UniformResourceIdentifier(uri) => Some(uri.to_string()),
                    _ => None,
                }));
            }
        }
        Ok(Self(urls))
    }
}
