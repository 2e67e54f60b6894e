//! X.509 v3 extensions.
//!
//! [`ExtensionSet`] keeps insertion order and holds at most one extension
//! per OID: inserting an OID that is already present replaces the existing
//! entry where it stands.

mod named;
mod parsed;

pub use named::{
    AuthorityInfoAccess, AuthorityKeyIdentifier, BasicConstraints, CertificatePolicies,
    CrlDistributionPoints, ExtendedKeyUsage, KeyPurpose, KeyUsage, NameConstraints,
    SubjectAltName, SubjectKeyIdentifier,
};
pub use parsed::ParsedExtensions;

use const_oid::ObjectIdentifier;
use der::asn1::OctetString;
use der::{Decode, Encode};
use x509_cert::ext::Extension as X509Extension;

use crate::error::{Result, Sm2Error};

/// `Extension ::= SEQUENCE { extnID, critical BOOLEAN DEFAULT FALSE, extnValue }`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extension {
    pub oid: ObjectIdentifier,
    pub critical: bool,
    /// DER contents of the `extnValue` OCTET STRING
    pub value: Vec<u8>,
}

impl Extension {
    pub fn new(oid: ObjectIdentifier, critical: bool, value: Vec<u8>) -> Self {
        Self {
            oid,
            critical,
            value,
        }
    }

    pub fn to_x509(&self) -> Result<X509Extension> {
        Ok(X509Extension {
            extn_id: self.oid,
            critical: self.critical,
            extn_value: OctetString::new(self.value.clone())?,
        })
    }
}

impl From<&X509Extension> for Extension {
    fn from(ext: &X509Extension) -> Self {
        Self::new(ext.extn_id, ext.critical, ext.extn_value.as_bytes().to_vec())
    }
}

/// Ordered extensions with unique OIDs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionSet {
    extensions: Vec<Extension>,
}

impl ExtensionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append, or replace in place when the OID is already present.
    pub fn insert(&mut self, extension: Extension) {
        match self.extensions.iter_mut().find(|e| e.oid == extension.oid) {
            Some(existing) => *existing = extension,
            None => self.extensions.push(extension),
        }
    }

    pub fn get(&self, oid: &ObjectIdentifier) -> Option<&Extension> {
        self.extensions.iter().find(|e| &e.oid == oid)
    }

    pub fn contains(&self, oid: &ObjectIdentifier) -> bool {
        self.get(oid).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Extension> {
        self.extensions.iter()
    }

    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    pub fn to_x509(&self) -> Result<Vec<X509Extension>> {
        self.extensions.iter().map(Extension::to_x509).collect()
    }

    /// Build from decoded extensions; a repeated OID is malformed.
    pub fn from_x509(extensions: &[X509Extension]) -> Result<Self> {
        let mut set = Self::new();
        for extension in extensions.iter().map(Extension::from) {
            if set.contains(&extension.oid) {
                return Err(Sm2Error::MalformedEncoding(format!(
                    "extension {} appears twice",
                    extension.oid
                )));
            }
            set.extensions.push(extension);
        }
        Ok(set)
    }

    /// `SEQUENCE OF Extension`
    pub fn to_der(&self) -> Result<Vec<u8>> {
        Ok(self.to_x509()?.to_der()?)
    }

    pub fn from_der(der: &[u8]) -> Result<Self> {
        Self::from_x509(&Vec::<X509Extension>::from_der(der)?)
    }

    /// Decode the extensions this crate knows about.
    pub fn parsed(&self) -> Result<ParsedExtensions> {
        ParsedExtensions::from_set(self)
    }
}

impl FromIterator<Extension> for ExtensionSet {
    fn from_iter<I: IntoIterator<Item = Extension>>(iter: I) -> Self {
        let mut set = Self::new();
        for extension in iter {
            set.insert(extension);
        }
        set
    }
}

impl<'a> IntoIterator for &'a ExtensionSet {
    type Item = &'a Extension;
    type IntoIter = std::slice::Iter<'a, Extension>;

    fn into_iter(self) -> Self::IntoIter {
        self.extensions.iter()
    }
}
