use thiserror::Error;

/// Error types for the sm2-keys crate
///
/// A `verify` call that returns `false` is not an error; everything else that
/// aborts an operation is reported through one of these variants.
#[derive(Error, Debug)]
pub enum Sm2Error {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Secure random source unavailable: {0}")]
    EntropyFailure(String),

    #[error("Malformed key: {0}")]
    MalformedKey(String),

    #[error("Malformed encoding: {0}")]
    MalformedEncoding(String),

    #[error("Malformed signature: {0}")]
    MalformedSignature(String),

    #[error("Authentication failed: {0}")]
    AuthFailure(String),

    #[error("Integrity check failed: {0}")]
    IntegrityFailure(String),

    #[error("Invalid certificate template: {0}")]
    InvalidTemplate(String),

    #[error("Signature generation failed: {0}")]
    SignatureFailure(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<const_oid::Error> for Sm2Error {
    fn from(err: const_oid::Error) -> Self {
        Sm2Error::MalformedEncoding(format!("object identifier: {err}"))
    }
}

impl From<der::Error> for Sm2Error {
    fn from(err: der::Error) -> Self {
        Sm2Error::MalformedEncoding(format!("DER: {err}"))
    }
}

impl From<pem::PemError> for Sm2Error {
    fn from(err: pem::PemError) -> Self {
        Sm2Error::MalformedEncoding(format!("PEM: {err}"))
    }
}

impl From<rand::Error> for Sm2Error {
    fn from(err: rand::Error) -> Self {
        Sm2Error::EntropyFailure(err.to_string())
    }
}

/// Result type for sm2-keys operations
pub type Result<T> = std::result::Result<T, Sm2Error>;
