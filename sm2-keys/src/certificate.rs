//! X.509 certificates and PKCS#10 certification requests.
//!
//! The ASN.1 shapes come from `x509-cert`; the wrappers here convert them to
//! this crate's types and keep the exact DER they were read from, including
//! the signed region, so signatures are always checked over the original
//! bytes.

use std::fmt;

use chrono::{DateTime, Utc};
use const_oid::ObjectIdentifier;
use der::asn1::{BitString, SetOfVec};
use der::{Any, Decode, Encode, Tag};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use spki::AlgorithmIdentifierOwned;
use x509_cert::attr::Attribute as X509Attribute;
use x509_cert::request::{CertReq, CertReqInfo, Version as RequestVersion};
use x509_cert::serial_number::SerialNumber as X509SerialNumber;
use x509_cert::time::Validity as X509Validity;
use x509_cert::Version;

use crate::asn1::pem::{self, LABEL_CERTIFICATE, LABEL_CERTIFICATE_REQUEST};
use crate::asn1::{oid, signed_region, time};
use crate::error::{Result, Sm2Error};
use crate::extensions::{ExtensionSet, ParsedExtensions};
use crate::keys::{key_from_spki, spki_from_key, PublicKey};
use crate::name::Name;
use crate::rng;

/// X.509 version number as encoded (v3 is 2).
pub const X509_V3: u32 = 2;
/// PKCS#10 `CertificationRequestInfo` version.
pub const CSR_V1: u32 = 0;

const RANDOM_SERIAL_LEN: usize = 16;

/// Certificate serial number: an arbitrary-size signed integer held in
/// minimal two's-complement form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SerialNumber(Vec<u8>);

impl SerialNumber {
    /// From big-endian two's-complement bytes.
    pub fn from_signed_bytes(bytes: &[u8]) -> Self {
        let mut start = 0;
        while start + 1 < bytes.len() {
            let redundant = match bytes[start] {
                0x00 => bytes[start + 1] & 0x80 == 0,
                0xff => bytes[start + 1] & 0x80 != 0,
                _ => false,
            };
            if !redundant {
                break;
            }
            start += 1;
        }
        if bytes.is_empty() {
            Self(vec![0])
        } else {
            Self(bytes[start..].to_vec())
        }
    }

    /// From a non-negative big-endian magnitude.
    pub fn from_unsigned_bytes(magnitude: &[u8]) -> Self {
        let mut signed = Vec::with_capacity(magnitude.len() + 1);
        signed.push(0);
        signed.extend_from_slice(magnitude);
        Self::from_signed_bytes(&signed)
    }

    /// A random positive serial.
    pub fn random() -> Result<Self> {
        let mut bytes = [0u8; RANDOM_SERIAL_LEN];
        rng::fill(&mut bytes)?;
        bytes[0] &= 0x7f;
        bytes[0] |= 0x01;
        Ok(Self::from_signed_bytes(&bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_negative(&self) -> bool {
        self.0.first().map(|b| b & 0x80 != 0).unwrap_or(false)
    }

    /// The value when it fits in an `i128`.
    pub fn to_i128(&self) -> Option<i128> {
        if self.0.len() > 16 {
            return None;
        }
        let fill = if self.is_negative() { 0xff } else { 0x00 };
        let mut buf = [fill; 16];
        buf[16 - self.0.len()..].copy_from_slice(&self.0);
        Some(i128::from_be_bytes(buf))
    }

    // `x509-cert` only builds non-negative serials directly, so negative
    // ones go through their INTEGER encoding.
    fn to_x509(&self) -> Result<X509SerialNumber> {
        let integer = Any::new(Tag::Integer, self.0.clone())?;
        Ok(X509SerialNumber::from_der(&integer.to_der()?)?)
    }

    fn from_x509(serial: &X509SerialNumber) -> Self {
        Self::from_signed_bytes(serial.as_bytes())
    }
}

impl From<i64> for SerialNumber {
    fn from(value: i64) -> Self {
        Self::from_signed_bytes(&value.to_be_bytes())
    }
}

impl fmt::Display for SerialNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_i128() {
            Some(v) => write!(f, "{v}"),
            None => write!(f, "0x{}", hex::encode(&self.0)),
        }
    }
}

/// Signature algorithms seen in certificates and requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    Sm2WithSm3,
    Unknown(ObjectIdentifier),
}

impl SignatureAlgorithm {
    pub fn oid(&self) -> ObjectIdentifier {
        match self {
            SignatureAlgorithm::Sm2WithSm3 => oid::SM2_WITH_SM3,
            SignatureAlgorithm::Unknown(oid) => *oid,
        }
    }

    pub fn to_x509(&self) -> AlgorithmIdentifierOwned {
        AlgorithmIdentifierOwned {
            oid: self.oid(),
            parameters: None,
        }
    }

    pub fn from_x509(algorithm: &AlgorithmIdentifierOwned) -> Result<Self> {
        if algorithm.oid != oid::SM2_WITH_SM3 {
            return Ok(SignatureAlgorithm::Unknown(algorithm.oid));
        }
        // parameters must be absent or NULL
        match &algorithm.parameters {
            None => Ok(SignatureAlgorithm::Sm2WithSm3),
            Some(parameters) if parameters.to_der()? == [0x05, 0x00] => {
                Ok(SignatureAlgorithm::Sm2WithSm3)
            }
            Some(_) => Err(Sm2Error::MalformedEncoding(
                "unexpected SM2-with-SM3 parameters".to_string(),
            )),
        }
    }
}

/// Validity window with second precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Validity {
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
}

impl Validity {
    pub fn new(not_before: DateTime<Utc>, not_after: DateTime<Utc>) -> Self {
        Self {
            not_before: time::truncate_to_seconds(not_before),
            not_after: time::truncate_to_seconds(not_after),
        }
    }

    /// Whether `at` falls inside the window, bounds included.
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.not_before <= at && at <= self.not_after
    }

    fn to_x509(self) -> Result<X509Validity> {
        Ok(X509Validity {
            not_before: time::to_x509_time(&self.not_before)?,
            not_after: time::to_x509_time(&self.not_after)?,
        })
    }

    fn from_x509(validity: &X509Validity) -> Result<Self> {
        Ok(Self {
            not_before: time::from_x509_time(validity.not_before)?,
            not_after: time::from_x509_time(validity.not_after)?,
        })
    }
}

/// `Attribute ::= SEQUENCE { type OID, values SET OF ANY }`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub oid: ObjectIdentifier,
    /// Each value as a complete DER element
    pub values: Vec<Vec<u8>>,
}

impl Attribute {
    pub fn new(oid: ObjectIdentifier, values: Vec<Vec<u8>>) -> Self {
        Self { oid, values }
    }

    /// The PKCS#9 `extensionRequest` attribute.
    pub fn extension_request(extensions: &ExtensionSet) -> Result<Self> {
        Ok(Self::new(oid::EXTENSION_REQUEST, vec![extensions.to_der()?]))
    }

    pub fn to_x509(&self) -> Result<X509Attribute> {
        let values = self
            .values
            .iter()
            .map(|value| Any::from_der(value))
            .collect::<der::Result<Vec<_>>>()?;
        Ok(X509Attribute {
            oid: self.oid,
            values: SetOfVec::try_from(values)?,
        })
    }

    pub fn from_x509(attribute: &X509Attribute) -> Result<Self> {
        let values = attribute
            .values
            .iter()
            .map(|value| value.to_der())
            .collect::<der::Result<Vec<_>>>()?;
        Ok(Self::new(attribute.oid, values))
    }
}

/// Anything carrying a signature over a stored DER region.
pub trait Signed {
    /// Exact bytes the signature covers.
    fn signed_region(&self) -> &[u8];
    fn signature_algorithm(&self) -> &SignatureAlgorithm;
    /// Contents of the signature BIT STRING.
    fn signature_value(&self) -> &[u8];
}

fn signature_bytes(signature: &BitString) -> Result<Vec<u8>> {
    signature
        .as_bytes()
        .map(<[u8]>::to_vec)
        .ok_or_else(|| Sm2Error::MalformedEncoding("signature has unused bits".to_string()))
}

/// `TBSCertificate`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TbsCertificate {
    pub version: u32,
    pub serial: SerialNumber,
    pub signature: SignatureAlgorithm,
    pub issuer: Name,
    pub validity: Validity,
    pub subject: Name,
    pub public_key: PublicKey,
    pub extensions: ExtensionSet,
}

impl TbsCertificate {
    pub fn to_x509(&self) -> Result<x509_cert::TbsCertificate> {
        let version = match self.version {
            0 => Version::V1,
            1 => Version::V2,
            X509_V3 => Version::V3,
            other => {
                return Err(Sm2Error::InvalidParameter(format!(
                    "unsupported certificate version {}",
                    other + 1
                )))
            }
        };
        let extensions = if self.extensions.is_empty() {
            None
        } else {
            Some(self.extensions.to_x509()?)
        };
        Ok(x509_cert::TbsCertificate {
            version,
            serial_number: self.serial.to_x509()?,
            signature: self.signature.to_x509(),
            issuer: self.issuer.as_rdn_sequence().clone(),
            validity: self.validity.to_x509()?,
            subject: self.subject.as_rdn_sequence().clone(),
            subject_public_key_info: spki_from_key(&self.public_key)?,
            issuer_unique_id: None,
            subject_unique_id: None,
            extensions,
        })
    }

    pub fn from_x509(tbs: &x509_cert::TbsCertificate) -> Result<Self> {
        let version = match tbs.version {
            Version::V1 => 0,
            Version::V2 => 1,
            Version::V3 => X509_V3,
        };
        let extensions = match &tbs.extensions {
            Some(extensions) => ExtensionSet::from_x509(extensions)?,
            None => ExtensionSet::new(),
        };
        Ok(Self {
            version,
            serial: SerialNumber::from_x509(&tbs.serial_number),
            signature: SignatureAlgorithm::from_x509(&tbs.signature)?,
            issuer: Name::from_rdn_sequence(tbs.issuer.clone())?,
            validity: Validity::from_x509(&tbs.validity)?,
            subject: Name::from_rdn_sequence(tbs.subject.clone())?,
            public_key: key_from_spki(&tbs.subject_public_key_info)?,
            extensions,
        })
    }

    pub fn to_der(&self) -> Result<Vec<u8>> {
        Ok(self.to_x509()?.to_der()?)
    }
}

/// A decoded X.509 certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    tbs: TbsCertificate,
    signature_algorithm: SignatureAlgorithm,
    signature: Vec<u8>,
    der: Vec<u8>,
    tbs_der: Vec<u8>,
}

impl Certificate {
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let cert = x509_cert::Certificate::from_der(der)?;
        let tbs = TbsCertificate::from_x509(&cert.tbs_certificate)?;
        let signature_algorithm = SignatureAlgorithm::from_x509(&cert.signature_algorithm)?;
        if tbs.signature != signature_algorithm {
            return Err(Sm2Error::MalformedEncoding(
                "inner and outer signature algorithms differ".to_string(),
            ));
        }
        Ok(Self {
            tbs,
            signature_algorithm,
            signature: signature_bytes(&cert.signature)?,
            der: der.to_vec(),
            tbs_der: signed_region(der)?.to_vec(),
        })
    }

    /// Wrap an already signed `tbs` into a certificate.
    pub(crate) fn assemble(
        tbs: x509_cert::TbsCertificate,
        signature_algorithm: &SignatureAlgorithm,
        signature: &[u8],
    ) -> Result<Self> {
        let cert = x509_cert::Certificate {
            tbs_certificate: tbs,
            signature_algorithm: signature_algorithm.to_x509(),
            signature: BitString::from_bytes(signature)?,
        };
        Self::from_der(&cert.to_der()?)
    }

    pub fn from_pem(input: &[u8]) -> Result<Self> {
        let pem = pem::decode_expecting(input, &[LABEL_CERTIFICATE])?;
        Self::from_der(pem.contents())
    }

    pub fn to_pem(&self) -> String {
        pem::encode_der(LABEL_CERTIFICATE, &self.der)
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }

    pub fn tbs(&self) -> &TbsCertificate {
        &self.tbs
    }

    pub fn version(&self) -> u32 {
        self.tbs.version
    }

    pub fn serial(&self) -> &SerialNumber {
        &self.tbs.serial
    }

    pub fn issuer(&self) -> &Name {
        &self.tbs.issuer
    }

    pub fn subject(&self) -> &Name {
        &self.tbs.subject
    }

    pub fn validity(&self) -> &Validity {
        &self.tbs.validity
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.tbs.public_key
    }

    pub fn extensions(&self) -> &ExtensionSet {
        &self.tbs.extensions
    }

    pub fn parsed_extensions(&self) -> Result<ParsedExtensions> {
        self.tbs.extensions.parsed()
    }

    pub fn is_self_issued(&self) -> bool {
        self.tbs.issuer == self.tbs.subject
    }
}

impl Signed for Certificate {
    fn signed_region(&self) -> &[u8] {
        &self.tbs_der
    }

    fn signature_algorithm(&self) -> &SignatureAlgorithm {
        &self.signature_algorithm
    }

    fn signature_value(&self) -> &[u8] {
        &self.signature
    }
}

impl Serialize for Certificate {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_bytes(&self.der)
    }
}

impl<'de> Deserialize<'de> for Certificate {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let der: Vec<u8> = serde::de::Deserialize::deserialize(deserializer)?;
        Certificate::from_der(&der).map_err(serde::de::Error::custom)
    }
}

/// `CertificationRequestInfo`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TbsCertRequest {
    pub version: u32,
    pub subject: Name,
    pub public_key: PublicKey,
    pub attributes: Vec<Attribute>,
}

impl TbsCertRequest {
    pub fn to_x509(&self) -> Result<CertReqInfo> {
        if self.version != CSR_V1 {
            return Err(Sm2Error::InvalidParameter(format!(
                "unsupported request version {}",
                self.version
            )));
        }
        let attributes = self
            .attributes
            .iter()
            .map(Attribute::to_x509)
            .collect::<Result<Vec<_>>>()?;
        Ok(CertReqInfo {
            version: RequestVersion::V1,
            subject: self.subject.as_rdn_sequence().clone(),
            public_key: spki_from_key(&self.public_key)?,
            attributes: SetOfVec::try_from(attributes)?,
        })
    }

    pub fn from_x509(info: &CertReqInfo) -> Result<Self> {
        let attributes = info
            .attributes
            .iter()
            .map(Attribute::from_x509)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            version: CSR_V1,
            subject: Name::from_rdn_sequence(info.subject.clone())?,
            public_key: key_from_spki(&info.public_key)?,
            attributes,
        })
    }

    pub fn to_der(&self) -> Result<Vec<u8>> {
        Ok(self.to_x509()?.to_der()?)
    }
}

/// A decoded PKCS#10 certification request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertRequest {
    tbs: TbsCertRequest,
    signature_algorithm: SignatureAlgorithm,
    signature: Vec<u8>,
    der: Vec<u8>,
    tbs_der: Vec<u8>,
}

impl CertRequest {
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let csr = CertReq::from_der(der)?;
        Ok(Self {
            tbs: TbsCertRequest::from_x509(&csr.info)?,
            signature_algorithm: SignatureAlgorithm::from_x509(&csr.algorithm)?,
            signature: signature_bytes(&csr.signature)?,
            der: der.to_vec(),
            tbs_der: signed_region(der)?.to_vec(),
        })
    }

    /// Wrap an already signed `info` into a request.
    pub(crate) fn assemble(
        info: CertReqInfo,
        signature_algorithm: &SignatureAlgorithm,
        signature: &[u8],
    ) -> Result<Self> {
        let csr = CertReq {
            info,
            algorithm: signature_algorithm.to_x509(),
            signature: BitString::from_bytes(signature)?,
        };
        Self::from_der(&csr.to_der()?)
    }

    pub fn from_pem(input: &[u8]) -> Result<Self> {
        let pem = pem::decode_expecting(input, &[LABEL_CERTIFICATE_REQUEST])?;
        Self::from_der(pem.contents())
    }

    pub fn to_pem(&self) -> String {
        pem::encode_der(LABEL_CERTIFICATE_REQUEST, &self.der)
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }

    pub fn tbs(&self) -> &TbsCertRequest {
        &self.tbs
    }

    pub fn subject(&self) -> &Name {
        &self.tbs.subject
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.tbs.public_key
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.tbs.attributes
    }

    /// Extensions carried in the `extensionRequest` attribute, if any.
    pub fn requested_extensions(&self) -> Result<ExtensionSet> {
        let Some(attribute) = self
            .tbs
            .attributes
            .iter()
            .find(|a| a.oid == oid::EXTENSION_REQUEST)
        else {
            return Ok(ExtensionSet::new());
        };
        let mut merged = ExtensionSet::new();
        for value in &attribute.values {
            for extension in &ExtensionSet::from_der(value)? {
                merged.insert(extension.clone());
            }
        }
        Ok(merged)
    }
}

impl Signed for CertRequest {
    fn signed_region(&self) -> &[u8] {
        &self.tbs_der
    }

    fn signature_algorithm(&self) -> &SignatureAlgorithm {
        &self.signature_algorithm
    }

    fn signature_value(&self) -> &[u8] {
        &self.signature
    }
}

impl Serialize for CertRequest {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_bytes(&self.der)
    }
}

impl<'de> Deserialize<'de> for CertRequest {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let der: Vec<u8> = serde::de::Deserialize::deserialize(deserializer)?;
        CertRequest::from_der(&der).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::PrivateKey;
    use chrono::TimeZone;

    const ECDSA_WITH_SHA256: ObjectIdentifier =
        ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.2");

    fn tbs_for(key: &PrivateKey) -> TbsCertificate {
        TbsCertificate {
            version: X509_V3,
            serial: SerialNumber::from(-1),
            signature: SignatureAlgorithm::Sm2WithSm3,
            issuer: "CN=issuer".parse().unwrap(),
            validity: Validity::new(
                Utc.timestamp_opt(1000, 0).unwrap(),
                Utc.timestamp_opt(100000, 0).unwrap(),
            ),
            subject: "CN=subject".parse().unwrap(),
            public_key: key.public_key().clone(),
            extensions: ExtensionSet::new(),
        }
    }

    #[test]
    fn serial_numbers_keep_their_sign() {
        let minus_one = SerialNumber::from(-1);
        assert_eq!(minus_one.as_bytes(), &[0xff]);
        assert!(minus_one.is_negative());
        assert_eq!(minus_one.to_i128(), Some(-1));
        assert_eq!(minus_one.to_string(), "-1");

        let big = SerialNumber::from_unsigned_bytes(&[0x80, 0x00]);
        assert_eq!(big.as_bytes(), &[0x00, 0x80, 0x00]);
        assert!(!big.is_negative());
        assert_eq!(big.to_i128(), Some(0x8000));

        assert_eq!(SerialNumber::from_signed_bytes(&[]).as_bytes(), &[0]);
        assert_eq!(
            SerialNumber::from_signed_bytes(&[0xff, 0xff, 0x80]).as_bytes(),
            &[0x80]
        );

        let random = SerialNumber::random().unwrap();
        assert!(!random.is_negative());
        assert_ne!(random, SerialNumber::random().unwrap());
    }

    #[test]
    fn negative_serials_survive_the_integer_encoding() {
        for serial in [
            SerialNumber::from(-1),
            SerialNumber::from(-129),
            SerialNumber::from(0),
            SerialNumber::from_unsigned_bytes(&[0xff; 19]),
        ] {
            let x509 = serial.to_x509().unwrap();
            assert_eq!(x509.as_bytes(), serial.as_bytes());
            assert_eq!(SerialNumber::from_x509(&x509), serial);
        }
    }

    #[test]
    fn validity_truncates_and_contains() {
        let nb = Utc.timestamp_opt(1000, 500).unwrap();
        let na = Utc.timestamp_opt(100000, 0).unwrap();
        let validity = Validity::new(nb, na);
        assert_eq!(validity.not_before, Utc.timestamp_opt(1000, 0).unwrap());
        assert!(validity.contains(Utc.timestamp_opt(5000, 0).unwrap()));
        assert!(!validity.contains(Utc.timestamp_opt(100001, 0).unwrap()));
        assert_eq!(
            Validity::from_x509(&validity.to_x509().unwrap()).unwrap(),
            validity
        );
    }

    #[test]
    fn extension_request_attribute_converts() {
        let attr = Attribute::extension_request(&ExtensionSet::new()).unwrap();
        assert_eq!(attr.values, vec![vec![0x30, 0x00]]);
        let x509 = attr.to_x509().unwrap();
        assert_eq!(x509.oid, oid::EXTENSION_REQUEST);
        assert_eq!(Attribute::from_x509(&x509).unwrap(), attr);

        let broken = Attribute::new(oid::EXTENSION_REQUEST, vec![vec![0x30, 0x05]]);
        assert!(broken.to_x509().is_err());
    }

    #[test]
    fn signature_algorithm_parameters() {
        let absent = AlgorithmIdentifierOwned {
            oid: oid::SM2_WITH_SM3,
            parameters: None,
        };
        assert_eq!(
            SignatureAlgorithm::from_x509(&absent).unwrap(),
            SignatureAlgorithm::Sm2WithSm3
        );
        let null = AlgorithmIdentifierOwned {
            oid: oid::SM2_WITH_SM3,
            parameters: Some(Any::new(Tag::Null, Vec::<u8>::new()).unwrap()),
        };
        assert_eq!(
            SignatureAlgorithm::from_x509(&null).unwrap(),
            SignatureAlgorithm::Sm2WithSm3
        );
        let odd = AlgorithmIdentifierOwned {
            oid: oid::SM2_WITH_SM3,
            parameters: Some(Any::new(Tag::Integer, vec![0x01]).unwrap()),
        };
        assert!(matches!(
            SignatureAlgorithm::from_x509(&odd),
            Err(Sm2Error::MalformedEncoding(_))
        ));
        let ecdsa = AlgorithmIdentifierOwned {
            oid: ECDSA_WITH_SHA256,
            parameters: None,
        };
        assert_eq!(
            SignatureAlgorithm::from_x509(&ecdsa).unwrap(),
            SignatureAlgorithm::Unknown(ECDSA_WITH_SHA256)
        );
    }

    #[test]
    fn tbs_survives_the_x509_structures() {
        let key = PrivateKey::generate().unwrap();
        let tbs = tbs_for(&key);
        let x509 = tbs.to_x509().unwrap();
        assert_eq!(x509.version, Version::V3);
        assert!(x509.extensions.is_none());
        assert_eq!(TbsCertificate::from_x509(&x509).unwrap(), tbs);
        assert_eq!(tbs.to_der().unwrap(), x509.to_der().unwrap());

        let mut future = tbs.clone();
        future.version = 3;
        assert!(matches!(
            future.to_x509(),
            Err(Sm2Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn assembled_certificate_keeps_its_signed_region() {
        let key = PrivateKey::generate().unwrap();
        let tbs = tbs_for(&key).to_x509().unwrap();
        let tbs_der = tbs.to_der().unwrap();
        let cert = Certificate::assemble(tbs, &SignatureAlgorithm::Sm2WithSm3, &[1, 2, 3]).unwrap();
        assert_eq!(cert.signed_region(), &tbs_der[..]);
        assert_eq!(cert.signature_value(), &[1, 2, 3]);
        assert_eq!(cert.serial(), &SerialNumber::from(-1));
        assert_eq!(Certificate::from_pem(cert.to_pem().as_bytes()).unwrap(), cert);
    }

    #[test]
    fn outer_algorithm_must_match_inner() {
        let key = PrivateKey::generate().unwrap();
        let tbs = tbs_for(&key).to_x509().unwrap();
        let mismatched = SignatureAlgorithm::Unknown(ECDSA_WITH_SHA256);
        assert!(matches!(
            Certificate::assemble(tbs, &mismatched, &[1, 2, 3]),
            Err(Sm2Error::MalformedEncoding(_))
        ));
    }

    #[test]
    fn garbage_is_not_a_certificate() {
        assert!(matches!(
            Certificate::from_der(&[0x30, 0x00]),
            Err(Sm2Error::MalformedEncoding(_))
        ));
        assert!(CertRequest::from_der(&[]).is_err());
        let empty = b"-----BEGIN CERTIFICATE-----\n-----END CERTIFICATE-----\n";
        assert!(Certificate::from_pem(empty).is_err());
    }
}
