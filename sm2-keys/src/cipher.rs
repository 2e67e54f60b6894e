//! SM2 public-key encryption.
//!
//! Ciphertexts are serialized as `C1 || C3 || C2`: the uncompressed ephemeral
//! point, the SM3 check value and the masked message.

use der::asn1::{OctetStringRef, UintRef};
use der::{Decode, Encode, Sequence};
use sm2_common::{Component, Logger};
use sm3::{Digest, Sm3};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::config::{EngineConfig, DEFAULT_ENCRYPT_ATTEMPTS};
use crate::curve::{self, CurvePoint, FIELD_SIZE, UNCOMPRESSED_POINT_SIZE};
use crate::digest::{kdf, DIGEST_SIZE};
use crate::error::{Result, Sm2Error};
use crate::keys::{PrivateKey, PublicKey};
use crate::rng;

/// `SEQUENCE { INTEGER x, INTEGER y, OCTET STRING C3, OCTET STRING C2 }`
#[derive(Sequence)]
struct CiphertextDer<'a> {
    x: UintRef<'a>,
    y: UintRef<'a>,
    hash: OctetStringRef<'a>,
    cipher_text: OctetStringRef<'a>,
}

/// `(C1, C3, C2)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ciphertext {
    c1: CurvePoint,
    c3: [u8; DIGEST_SIZE],
    c2: Vec<u8>,
}

impl Ciphertext {
    pub fn c1(&self) -> &CurvePoint {
        &self.c1
    }

    pub fn c3(&self) -> &[u8; DIGEST_SIZE] {
        &self.c3
    }

    pub fn c2(&self) -> &[u8] {
        &self.c2
    }

    /// `C1 || C3 || C2` with `C1` uncompressed.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(UNCOMPRESSED_POINT_SIZE + DIGEST_SIZE + self.c2.len());
        out.extend_from_slice(&self.c1.to_sec1_bytes());
        out.extend_from_slice(&self.c3);
        out.extend_from_slice(&self.c2);
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let header = UNCOMPRESSED_POINT_SIZE + DIGEST_SIZE;
        if bytes.len() <= header {
            return Err(Sm2Error::MalformedEncoding(format!(
                "ciphertext must be longer than {header} bytes, got {}",
                bytes.len()
            )));
        }
        if bytes[0] != 0x04 {
            return Err(Sm2Error::MalformedEncoding(
                "C1 must be an uncompressed point".to_string(),
            ));
        }
        let c1 = parse_c1(&bytes[..UNCOMPRESSED_POINT_SIZE])?;
        let mut c3 = [0u8; DIGEST_SIZE];
        c3.copy_from_slice(&bytes[UNCOMPRESSED_POINT_SIZE..header]);
        Ok(Self {
            c1,
            c3,
            c2: bytes[header..].to_vec(),
        })
    }

    /// `SEQUENCE { INTEGER x, INTEGER y, OCTET STRING C3, OCTET STRING C2 }`
    pub fn to_der(&self) -> Result<Vec<u8>> {
        let (x, y) = self.c1.coordinates().ok_or_else(|| {
            Sm2Error::InvalidParameter("C1 is the identity".to_string())
        })?;
        let der = CiphertextDer {
            x: UintRef::new(&x)?,
            y: UintRef::new(&y)?,
            hash: OctetStringRef::new(&self.c3)?,
            cipher_text: OctetStringRef::new(&self.c2)?,
        };
        Ok(der.to_der()?)
    }

    pub fn from_der(der: &[u8]) -> Result<Self> {
        let parsed = CiphertextDer::from_der(der)?;
        let (x, y) = (parsed.x.as_bytes(), parsed.y.as_bytes());
        let (c3, c2) = (parsed.hash.as_bytes(), parsed.cipher_text.as_bytes());

        let c1 = CurvePoint::from_affine(x, y)
            .map_err(|e| Sm2Error::MalformedEncoding(format!("C1: {e}")))?;
        if c1.is_identity() {
            return Err(Sm2Error::MalformedEncoding("C1 is the identity".to_string()));
        }
        let c3: [u8; DIGEST_SIZE] = c3
            .try_into()
            .map_err(|_| Sm2Error::MalformedEncoding("C3 must be 32 bytes".to_string()))?;
        if c2.is_empty() {
            return Err(Sm2Error::MalformedEncoding("C2 is empty".to_string()));
        }
        Ok(Self {
            c1,
            c3,
            c2: c2.to_vec(),
        })
    }
}

fn parse_c1(bytes: &[u8]) -> Result<CurvePoint> {
    let point = CurvePoint::from_sec1_bytes(bytes)
        .map_err(|e| Sm2Error::MalformedEncoding(format!("C1: {e}")))?;
    if point.is_identity() {
        return Err(Sm2Error::MalformedEncoding("C1 is the identity".to_string()));
    }
    Ok(point)
}

fn check_value(x2: &[u8], message: &[u8], y2: &[u8]) -> [u8; DIGEST_SIZE] {
    let mut hasher = Sm3::new();
    hasher.update(x2);
    hasher.update(message);
    hasher.update(y2);
    hasher.finalize().into()
}

fn shared_secret(point: &CurvePoint) -> Option<Zeroizing<Vec<u8>>> {
    let (x2, y2) = point.coordinates()?;
    let mut z = Zeroizing::new(Vec::with_capacity(2 * FIELD_SIZE));
    z.extend_from_slice(&x2);
    z.extend_from_slice(&y2);
    Some(z)
}

/// Encrypt / decrypt with a bounded number of ephemeral key draws.
#[derive(Debug, Clone)]
pub struct CipherEngine {
    max_attempts: usize,
    logger: Logger,
}

impl Default for CipherEngine {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_ENCRYPT_ATTEMPTS,
            logger: Logger::new_root(Component::Cipher, "sm2"),
        }
    }
}

impl CipherEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: &EngineConfig) -> Self {
        Self {
            max_attempts: config.encrypt_attempts,
            ..Self::default()
        }
    }

    /// Report through `logger` instead of the default root logger.
    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    pub fn encrypt(&self, public: &PublicKey, plaintext: &[u8]) -> Result<Ciphertext> {
        if plaintext.is_empty() {
            return Err(Sm2Error::InvalidParameter(
                "plaintext must not be empty".to_string(),
            ));
        }
        for _ in 0..self.max_attempts {
            let k = rng::random_scalar()?;
            let c1 = curve::base_mul(&k)?;
            let shared = curve::scalar_mul(&k, public.point())?;
            let Some(z) = shared_secret(&shared) else {
                continue;
            };
            let t = kdf(&z, plaintext.len())?;
            if t.iter().all(|b| *b == 0) {
                continue;
            }
            let c2 = plaintext.iter().zip(t.iter()).map(|(m, t)| m ^ t).collect();
            let c3 = check_value(&z[..FIELD_SIZE], plaintext, &z[FIELD_SIZE..]);
            self.logger
                .debug_args(format_args!("Encrypted {} bytes", plaintext.len()));
            return Ok(Ciphertext { c1, c3, c2 });
        }
        self.logger.error(format!(
            "No usable ephemeral key after {} attempts",
            self.max_attempts
        ));
        Err(Sm2Error::EntropyFailure(format!(
            "no usable ephemeral key after {} attempts",
            self.max_attempts
        )))
    }

    pub fn decrypt(
        &self,
        private: &PrivateKey,
        ciphertext: &Ciphertext,
    ) -> Result<Zeroizing<Vec<u8>>> {
        let shared = curve::scalar_mul(private.scalar(), &ciphertext.c1)?;
        let Some(z) = shared_secret(&shared) else {
            self.logger.warn("Decryption hit a degenerate shared point");
            return Err(Sm2Error::IntegrityFailure(
                "degenerate shared point".to_string(),
            ));
        };
        let t = kdf(&z, ciphertext.c2.len())?;
        if t.iter().all(|b| *b == 0) {
            self.logger.warn("Decryption derived an all-zero key stream");
            return Err(Sm2Error::IntegrityFailure(
                "derived key stream is all zero".to_string(),
            ));
        }
        let message: Zeroizing<Vec<u8>> = Zeroizing::new(
            ciphertext
                .c2
                .iter()
                .zip(t.iter())
                .map(|(c, t)| c ^ t)
                .collect(),
        );
        let expected = check_value(&z[..FIELD_SIZE], &message, &z[FIELD_SIZE..]);
        if bool::from(expected[..].ct_eq(&ciphertext.c3[..])) {
            Ok(message)
        } else {
            self.logger.warn_args(format_args!(
                "C3 mismatch on a {} byte ciphertext",
                ciphertext.c2.len()
            ));
            Err(Sm2Error::IntegrityFailure(
                "C3 does not match the decrypted message".to_string(),
            ))
        }
    }
}

/// Encrypt with default settings.
pub fn encrypt(public: &PublicKey, plaintext: &[u8]) -> Result<Ciphertext> {
    CipherEngine::default().encrypt(public, plaintext)
}

/// Decrypt with default settings.
pub fn decrypt(private: &PrivateKey, ciphertext: &Ciphertext) -> Result<Zeroizing<Vec<u8>>> {
    CipherEngine::default().decrypt(private, ciphertext)
}
