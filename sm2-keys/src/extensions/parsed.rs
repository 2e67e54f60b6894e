use super::named::{
    AuthorityInfoAccess, AuthorityKeyIdentifier, BasicConstraints, CertificatePolicies,
    CrlDistributionPoints, ExtendedKeyUsage, KeyUsage, NameConstraints, SubjectAltName,
    SubjectKeyIdentifier,
};
use super::{Extension, ExtensionSet};
use crate::asn1::oid;
use crate::error::Result;

/// Typed view of a certificate's (or request's) extensions.
///
/// Extensions without a typed decoder are kept verbatim in `other`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedExtensions {
    pub subject_key_id: Option<Vec<u8>>,
    pub authority_key_id: Option<Vec<u8>>,
    pub key_usage: Option<KeyUsage>,
    pub ext_key_usage: Option<ExtendedKeyUsage>,
    pub basic_constraints: Option<BasicConstraints>,
    pub subject_alt_name: Option<SubjectAltName>,
    pub authority_info_access: Option<AuthorityInfoAccess>,
    pub certificate_policies: Option<CertificatePolicies>,
    pub name_constraints: Option<NameConstraints>,
    pub crl_distribution_points: Option<CrlDistributionPoints>,
    pub other: Vec<Extension>,
}

impl ParsedExtensions {
    pub fn from_set(set: &ExtensionSet) -> Result<Self> {
        let mut out = Self::default();
        for ext in set {
            let value = ext.value.as_slice();
            match ext.oid {
                o if o == oid::SUBJECT_KEY_IDENTIFIER => {
                    out.subject_key_id = Some(SubjectKeyIdentifier::from_der(value)?.0);
                }
                o if o == oid::AUTHORITY_KEY_IDENTIFIER => {
                    out.authority_key_id = Some(AuthorityKeyIdentifier::from_der(value)?.0);
                }
                o if o == oid::KEY_USAGE => out.key_usage = Some(KeyUsage::from_der(value)?),
                o if o == oid::EXT_KEY_USAGE => {
                    out.ext_key_usage = Some(ExtendedKeyUsage::from_der(value)?);
                }
                o if o == oid::BASIC_CONSTRAINTS => {
                    out.basic_constraints = Some(BasicConstraints::from_der(value)?);
                }
                o if o == oid::SUBJECT_ALT_NAME => {
                    out.subject_alt_name = Some(SubjectAltName::from_der(value)?);
                }
                o if o == oid::AUTHORITY_INFO_ACCESS => {
                    out.authority_info_access = Some(AuthorityInfoAccess::from_der(value)?);
                }
                o if o == oid::CERTIFICATE_POLICIES => {
                    out.certificate_policies = Some(CertificatePolicies::from_der(value)?);
                }
                o if o == oid::NAME_CONSTRAINTS => {
                    out.name_constraints = Some(NameConstraints::from_der(value, ext.critical)?);
                }
                o if o == oid::CRL_DISTRIBUTION_POINTS => {
                    out.crl_distribution_points = Some(CrlDistributionPoints::from_der(value)?);
                }
                _ => out.other.push(ext.clone()),
            }
        }
        Ok(out)
    }

    /// DNS names from the subject alternative name extension.
    pub fn dns_names(&self) -> &[String] {
        self.subject_alt_name
            .as_ref()
            .map(|san| san.dns_names.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_ca(&self) -> bool {
        self.basic_constraints.map(|bc| bc.ca).unwrap_or(false)
    }
}
