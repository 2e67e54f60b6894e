//! X.501 distinguished names.
//!
//! A thin wrapper over `x509_cert`'s `RdnSequence`. The string form is
//! RFC 4514: most specific attribute first, with leading `#`, leading or
//! trailing spaces and the special characters escaped.

use std::fmt;
use std::str::FromStr;

use const_oid::ObjectIdentifier;
use der::asn1::{Any, BmpString, SetOfVec};
use der::{Decode, Encode, Tag, Tagged};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use x509_cert::attr::AttributeTypeAndValue;
use x509_cert::name::{RdnSequence, RelativeDistinguishedName};

use crate::asn1::oid;
use crate::error::{Result, Sm2Error};

/// PrintableString character set.
fn is_printable(value: &str) -> bool {
    value.chars().all(|c| {
        c.is_ascii_alphanumeric()
            || matches!(
                c,
                ' ' | '\'' | '(' | ')' | '+' | ',' | '-' | '.' | '/' | ':' | '=' | '?'
            )
    })
}

/// Email addresses go out as IA5String, values in the PrintableString set as
/// PrintableString and everything else as UTF8String.
fn string_value(oid: &ObjectIdentifier, value: &str) -> Result<Any> {
    let tag = if *oid == oid::EMAIL_ADDRESS && value.is_ascii() {
        Tag::Ia5String
    } else if is_printable(value) {
        Tag::PrintableString
    } else {
        Tag::Utf8String
    };
    Ok(Any::new(tag, value.as_bytes())?)
}

fn attribute(oid: ObjectIdentifier, value: &str) -> Result<AttributeTypeAndValue> {
    Ok(AttributeTypeAndValue {
        oid,
        value: string_value(&oid, value)?,
    })
}

fn single_rdn(atv: AttributeTypeAndValue) -> Result<RelativeDistinguishedName> {
    Ok(RelativeDistinguishedName(SetOfVec::try_from(vec![atv])?))
}

/// Text of a string-typed attribute value.
fn attribute_text(value: &Any) -> Option<String> {
    match value.tag() {
        Tag::Utf8String | Tag::PrintableString | Tag::Ia5String | Tag::TeletexString => {
            std::str::from_utf8(value.value()).ok().map(str::to_string)
        }
        Tag::BmpString => value.decode_as::<BmpString>().ok().map(|s| s.to_string()),
        _ => None,
    }
}

/// An ordered distinguished name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Name(RdnSequence);

impl Name {
    pub fn builder() -> NameBuilder {
        NameBuilder::default()
    }

    /// Wrap a decoded sequence. Every RDN must carry at least one attribute.
    pub fn from_rdn_sequence(rdns: RdnSequence) -> Result<Self> {
        if rdns.0.iter().any(|rdn| rdn.0.is_empty()) {
            return Err(Sm2Error::MalformedEncoding(
                "empty relative distinguished name".to_string(),
            ));
        }
        Ok(Self(rdns))
    }

    pub fn as_rdn_sequence(&self) -> &RdnSequence {
        &self.0
    }

    /// Attributes in encoding order, multi-valued RDNs flattened.
    pub fn attributes(&self) -> impl Iterator<Item = &AttributeTypeAndValue> {
        self.0 .0.iter().flat_map(|rdn| rdn.0.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.0 .0.is_empty()
    }

    /// All string values carried under `oid`, in order.
    pub fn values(&self, oid: &ObjectIdentifier) -> Vec<String> {
        self.attributes()
            .filter(|a| &a.oid == oid)
            .filter_map(|a| attribute_text(&a.value))
            .collect()
    }

    pub fn common_name(&self) -> Option<String> {
        self.values(&oid::COMMON_NAME).into_iter().next()
    }

    pub fn to_der(&self) -> Result<Vec<u8>> {
        Ok(self.0.to_der()?)
    }

    pub fn from_der(der: &[u8]) -> Result<Self> {
        Self::from_rdn_sequence(RdnSequence::from_der(der)?)
    }
}

impl From<Name> for RdnSequence {
    fn from(name: Name) -> Self {
        name.0
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for Name {
    type Err = Sm2Error;

    /// Parse an RFC 4514 string such as `CN=x,O=y,C=z`. Keys are
    /// case-insensitive and may be dotted OIDs; `OID=#hex` carries raw DER.
    fn from_str(s: &str) -> Result<Self> {
        let parsed = RdnSequence::from_str(s)
            .map_err(|e| Sm2Error::InvalidParameter(format!("name {s:?}: {e}")))?;
        if parsed.0.is_empty() {
            return Err(Sm2Error::InvalidParameter("empty name".to_string()));
        }

        // the parser tags plain text as UTF8String; pick the narrowest type
        let mut rdns = Vec::with_capacity(parsed.0.len());
        for rdn in parsed.0 {
            let mut atvs = Vec::new();
            for atv in rdn.0.into_vec() {
                let retagged = match (atv.value.tag(), attribute_text(&atv.value)) {
                    (Tag::Utf8String, Some(text)) => attribute(atv.oid, &text)?,
                    _ => atv,
                };
                atvs.push(retagged);
            }
            rdns.push(RelativeDistinguishedName(SetOfVec::try_from(atvs)?));
        }
        Self::from_rdn_sequence(RdnSequence(rdns))
    }
}

impl Serialize for Name {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let der = self.to_der().map_err(serde::ser::Error::custom)?;
        serializer.serialize_bytes(&der)
    }
}

impl<'de> Deserialize<'de> for Name {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let der: Vec<u8> = Deserialize::deserialize(deserializer)?;
        Name::from_der(&der).map_err(serde::de::Error::custom)
    }
}

/// Field-by-field name construction.
///
/// Standard fields are emitted as country, organization, organizational
/// unit, locality, province, street address, postal code, serial number and
/// common name, followed by `extra_names`. A standard field whose attribute
/// type also appears in `extra_names` is left out. Each attribute becomes
/// its own RDN.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameBuilder {
    pub country: Vec<String>,
    pub organization: Vec<String>,
    pub organizational_unit: Vec<String>,
    pub locality: Vec<String>,
    pub province: Vec<String>,
    pub street_address: Vec<String>,
    pub postal_code: Vec<String>,
    pub serial_number: Option<String>,
    pub common_name: Option<String>,
    pub extra_names: Vec<(ObjectIdentifier, String)>,
}

impl NameBuilder {
    pub fn country(mut self, value: impl Into<String>) -> Self {
        self.country.push(value.into());
        self
    }

    pub fn organization(mut self, value: impl Into<String>) -> Self {
        self.organization.push(value.into());
        self
    }

    pub fn organizational_unit(mut self, value: impl Into<String>) -> Self {
        self.organizational_unit.push(value.into());
        self
    }

    pub fn locality(mut self, value: impl Into<String>) -> Self {
        self.locality.push(value.into());
        self
    }

    pub fn province(mut self, value: impl Into<String>) -> Self {
        self.province.push(value.into());
        self
    }

    pub fn street_address(mut self, value: impl Into<String>) -> Self {
        self.street_address.push(value.into());
        self
    }

    pub fn postal_code(mut self, value: impl Into<String>) -> Self {
        self.postal_code.push(value.into());
        self
    }

    pub fn serial_number(mut self, value: impl Into<String>) -> Self {
        self.serial_number = Some(value.into());
        self
    }

    pub fn common_name(mut self, value: impl Into<String>) -> Self {
        self.common_name = Some(value.into());
        self
    }

    pub fn extra_name(mut self, oid: ObjectIdentifier, value: impl Into<String>) -> Self {
        self.extra_names.push((oid, value.into()));
        self
    }

    pub fn build(&self) -> Result<Name> {
        let overridden = |oid: &ObjectIdentifier| self.extra_names.iter().any(|(o, _)| o == oid);
        let single = |v: &Option<String>| v.iter().cloned().collect::<Vec<_>>();
        let standard: [(ObjectIdentifier, Vec<String>); 9] = [
            (oid::COUNTRY, self.country.clone()),
            (oid::ORGANIZATION, self.organization.clone()),
            (oid::ORGANIZATIONAL_UNIT, self.organizational_unit.clone()),
            (oid::LOCALITY, self.locality.clone()),
            (oid::PROVINCE, self.province.clone()),
            (oid::STREET_ADDRESS, self.street_address.clone()),
            (oid::POSTAL_CODE, self.postal_code.clone()),
            (oid::SERIAL_NUMBER, single(&self.serial_number)),
            (oid::COMMON_NAME, single(&self.common_name)),
        ];

        let mut rdns = Vec::new();
        for (oid, values) in standard {
            if overridden(&oid) {
                continue;
            }
            for value in values.iter().filter(|v| !v.is_empty()) {
                rdns.push(single_rdn(attribute(oid, value)?)?);
            }
        }
        for (oid, value) in &self.extra_names {
            rdns.push(single_rdn(attribute(*oid, value)?)?);
        }
        Ok(Name(RdnSequence(rdns)))
    }
}

impl TryFrom<NameBuilder> for Name {
    type Error = Sm2Error;

    fn try_from(builder: NameBuilder) -> Result<Self> {
        builder.build()
    }
}
