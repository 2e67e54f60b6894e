//! SM2 key pairs.
//!
//! A [`PrivateKey`] owns a scalar `d` in `[1, n-1]` together with its public
//! point `d·G`; a [`PublicKey`] is a single non-identity point. Both are
//! immutable once built.

mod encoding;
mod protect;

use std::fmt;

use sm2::elliptic_curve::ff::PrimeField;
use sm2::{NonZeroScalar, Scalar};
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, Zeroizing};

use crate::cipher::{self, Ciphertext};
use crate::curve::{self, CurvePoint, FIELD_SIZE};
use crate::digest::sm3;
use crate::error::{Result, Sm2Error};
use crate::rng;
use crate::sign::{self, Signature};

pub(crate) use encoding::{key_from_spki, spki_from_key};
pub use encoding::{
    decode_private_pem, decode_public_pem, encode_private_pem, encode_private_pem_with,
    encode_public_pem,
};

/// Length of [`PublicKey::key_identifier`].
pub const KEY_IDENTIFIER_SIZE: usize = 20;

/// An SM2 private key.
pub struct PrivateKey {
    d: NonZeroScalar,
    public: PublicKey,
}

impl PrivateKey {
    /// Generate a fresh key from the secure random source.
    pub fn generate() -> Result<Self> {
        let d = rng::random_scalar()?;
        Self::from_scalar(d)
    }

    /// Import a big-endian private scalar, which must lie in `[1, n-1]`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let scalar = curve::scalar_from_bytes(bytes)
            .map_err(|e| Sm2Error::MalformedKey(format!("private scalar: {e}")))?;
        let d = Option::<NonZeroScalar>::from(NonZeroScalar::new(scalar))
            .ok_or_else(|| Sm2Error::MalformedKey("private scalar is zero".to_string()))?;
        Self::from_scalar(d)
    }

    fn from_scalar(d: NonZeroScalar) -> Result<Self> {
        let point = curve::base_mul(&d)?;
        let public = PublicKey::from_point(point)?;
        Ok(Self { d, public })
    }

    /// Big-endian private scalar, wiped when dropped.
    pub fn to_bytes(&self) -> Zeroizing<[u8; FIELD_SIZE]> {
        let mut out = Zeroizing::new([0u8; FIELD_SIZE]);
        out.copy_from_slice(&self.d.to_repr());
        out
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    pub(crate) fn scalar(&self) -> &Scalar {
        &self.d
    }

    /// Sign with the default user id.
    pub fn sign(&self, message: &[u8]) -> Result<Signature> {
        sign::sign(self, message)
    }

    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        self.public.verify(message, signature)
    }

    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        let parsed = Ciphertext::from_bytes(ciphertext)?;
        cipher::decrypt(self, &parsed)
    }

    /// SEC1 `ECPrivateKey` DER.
    pub fn to_der(&self) -> Result<Zeroizing<Vec<u8>>> {
        encoding::private_key_to_der(self)
    }

    /// Accepts SEC1 `ECPrivateKey` or unencrypted PKCS#8 DER.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        encoding::private_key_from_der(der)
    }

    pub fn to_pem(&self, passphrase: Option<&[u8]>) -> Result<String> {
        encode_private_pem(self, passphrase)
    }

    pub fn from_pem(pem: &[u8], passphrase: Option<&[u8]>) -> Result<Self> {
        decode_private_pem(pem, passphrase)
    }
}

impl Clone for PrivateKey {
    fn clone(&self) -> Self {
        Self {
            d: self.d,
            public: self.public.clone(),
        }
    }
}

impl PartialEq for PrivateKey {
    fn eq(&self, other: &Self) -> bool {
        let (a, b) = (self.d.to_repr(), other.d.to_repr());
        let (a, b): (&[u8], &[u8]) = (a.as_ref(), b.as_ref());
        a.ct_eq(b).into()
    }
}

impl Eq for PrivateKey {}

impl Drop for PrivateKey {
    fn drop(&mut self) {
        self.d.zeroize();
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("d", &"<redacted>")
            .field("public", &self.public)
            .finish()
    }
}

/// An SM2 public key: a point on the curve other than the identity.
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKey {
    point: CurvePoint,
    x: [u8; FIELD_SIZE],
    y: [u8; FIELD_SIZE],
}

impl PublicKey {
    pub fn from_point(point: CurvePoint) -> Result<Self> {
        let (x, y) = point.coordinates().ok_or_else(|| {
            Sm2Error::InvalidParameter("public key cannot be the point at infinity".to_string())
        })?;
        Ok(Self { point, x, y })
    }

    /// Decode a SEC1 point, compressed or uncompressed.
    pub fn from_sec1_bytes(bytes: &[u8]) -> Result<Self> {
        let point = CurvePoint::from_sec1_bytes(bytes)
            .map_err(|e| Sm2Error::MalformedKey(format!("public point: {e}")))?;
        Self::from_point(point)
            .map_err(|e| Sm2Error::MalformedKey(format!("public point: {e}")))
    }

    /// Uncompressed SEC1 form `04 || x || y`.
    pub fn to_sec1_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + 2 * FIELD_SIZE);
        out.push(0x04);
        out.extend_from_slice(&self.x);
        out.extend_from_slice(&self.y);
        out
    }

    pub fn point(&self) -> &CurvePoint {
        &self.point
    }

    /// Big-endian affine coordinates.
    pub fn coordinates(&self) -> ([u8; FIELD_SIZE], [u8; FIELD_SIZE]) {
        (self.x, self.y)
    }

    /// First 20 bytes of SM3 over the uncompressed point.
    pub fn key_identifier(&self) -> Vec<u8> {
        sm3(&self.to_sec1_bytes())[..KEY_IDENTIFIER_SIZE].to_vec()
    }

    /// Verify with the default user id.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        sign::verify(self, message, signature)
    }

    /// Encrypt and serialize as `C1 || C3 || C2`.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        Ok(cipher::encrypt(self, plaintext)?.to_bytes())
    }

    /// SubjectPublicKeyInfo DER.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        encoding::public_key_to_der(self)
    }

    pub fn from_der(der: &[u8]) -> Result<Self> {
        encoding::public_key_from_der(der)
    }

    pub fn to_pem(&self) -> Result<String> {
        encode_public_pem(self)
    }

    pub fn from_pem(pem: &[u8]) -> Result<Self> {
        decode_public_pem(pem)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", hex::encode(self.to_sec1_bytes()))
    }
}

/// Generate a new key pair.
pub fn generate() -> Result<PrivateKey> {
    PrivateKey::generate()
}

/// `Q = d·G`
pub fn derive_public(private: &PrivateKey) -> PublicKey {
    private.public_key().clone()
}
