//! SM2 Keys – public API facade

pub mod asn1;
pub mod builder;
pub mod certificate;
pub mod cipher;
pub mod config;
pub mod curve;
pub mod digest;
pub mod error;
pub mod extensions;
pub mod keys;
pub mod name;
pub mod persistence;
pub mod sign;
pub mod verifier;

mod rng;

pub use error::{Result, Sm2Error};

pub use config::EngineConfig;

pub use curve::CurvePoint;

pub use keys::{derive_public, generate, PrivateKey, PublicKey};

pub use cipher::{CipherEngine, Ciphertext};

pub use sign::{SignEngine, Signature};

pub use name::{Name, NameBuilder};

pub use extensions::{Extension, ExtensionSet, KeyPurpose, KeyUsage, ParsedExtensions};

pub use certificate::{
    Attribute, CertRequest, Certificate, SerialNumber, SignatureAlgorithm, Signed, Validity,
};

pub use builder::{CertBuilder, CertRequestTemplate, CertificateTemplate};

pub use verifier::CertVerifier;

pub use persistence::PemStore;
