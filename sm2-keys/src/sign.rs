//! SM2 digital signatures over SM3.
//!
//! The signed value is `e = SM3(Z_A || M)` where `Z_A` binds the signer's
//! identity and public key; see [`crate::digest::identity_digest`].

use der::asn1::UintRef;
use der::{Decode, Encode, Sequence};
use sm2::elliptic_curve::ff::PrimeField;
use sm2::Scalar;
use sm2_common::{Component, Logger};

use crate::config::{EngineConfig, DEFAULT_SIGN_ATTEMPTS, DEFAULT_USER_ID};
use crate::curve::{self, FIELD_SIZE};
use crate::digest::message_digest;
use crate::error::{Result, Sm2Error};
use crate::keys::{PrivateKey, PublicKey};
use crate::rng;

/// Size of the raw `r || s` form.
pub const SIGNATURE_SIZE: usize = 2 * FIELD_SIZE;

/// `SEQUENCE { INTEGER r, INTEGER s }`
#[derive(Sequence)]
struct SignatureDer<'a> {
    r: UintRef<'a>,
    s: UintRef<'a>,
}

/// An `(r, s)` pair as 32-byte big-endian integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature {
    r: [u8; FIELD_SIZE],
    s: [u8; FIELD_SIZE],
}

impl Signature {
    /// Build from big-endian `r` and `s` of at most 32 significant bytes.
    pub fn from_scalars(r: &[u8], s: &[u8]) -> Result<Self> {
        let widen = |v: &[u8]| -> Result<[u8; FIELD_SIZE]> {
            let bytes = curve::field_bytes(v)
                .map_err(|e| Sm2Error::MalformedSignature(e.to_string()))?;
            let mut out = [0u8; FIELD_SIZE];
            out.copy_from_slice(&bytes);
            Ok(out)
        };
        Ok(Self {
            r: widen(r)?,
            s: widen(s)?,
        })
    }

    pub fn r(&self) -> &[u8; FIELD_SIZE] {
        &self.r
    }

    pub fn s(&self) -> &[u8; FIELD_SIZE] {
        &self.s
    }

    /// `SEQUENCE { INTEGER r, INTEGER s }`
    pub fn to_der(&self) -> Result<Vec<u8>> {
        let der = SignatureDer {
            r: UintRef::new(&self.r)?,
            s: UintRef::new(&self.s)?,
        };
        Ok(der.to_der()?)
    }

    pub fn from_der(der: &[u8]) -> Result<Self> {
        let parse = || -> Result<Self> {
            let parsed = SignatureDer::from_der(der)?;
            Self::from_scalars(parsed.r.as_bytes(), parsed.s.as_bytes())
        };
        parse().map_err(|e| match e {
            Sm2Error::MalformedSignature(_) => e,
            other => Sm2Error::MalformedSignature(other.to_string()),
        })
    }

    /// Raw `r || s`.
    pub fn to_bytes(&self) -> [u8; SIGNATURE_SIZE] {
        let mut out = [0u8; SIGNATURE_SIZE];
        out[..FIELD_SIZE].copy_from_slice(&self.r);
        out[FIELD_SIZE..].copy_from_slice(&self.s);
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != SIGNATURE_SIZE {
            return Err(Sm2Error::MalformedSignature(format!(
                "raw signature must be {SIGNATURE_SIZE} bytes, got {}",
                bytes.len()
            )));
        }
        Self::from_scalars(&bytes[..FIELD_SIZE], &bytes[FIELD_SIZE..])
    }
}

/// Signer / verifier bound to one distinguishing identifier.
#[derive(Debug, Clone)]
pub struct SignEngine {
    user_id: Vec<u8>,
    max_attempts: usize,
    logger: Logger,
}

impl Default for SignEngine {
    fn default() -> Self {
        Self {
            user_id: DEFAULT_USER_ID.to_vec(),
            max_attempts: DEFAULT_SIGN_ATTEMPTS,
            logger: Logger::new_root(Component::Signer, "sm2"),
        }
    }
}

impl SignEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: &EngineConfig) -> Self {
        Self {
            user_id: config.user_id.clone(),
            max_attempts: config.sign_attempts,
            ..Self::default()
        }
    }

    /// Report through `logger` instead of the default root logger.
    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    pub fn user_id(&self) -> &[u8] {
        &self.user_id
    }

    pub fn sign(&self, private: &PrivateKey, message: &[u8]) -> Result<Signature> {
        self.sign_with_id(private, &self.user_id, message)
    }

    pub fn sign_with_id(
        &self,
        private: &PrivateKey,
        user_id: &[u8],
        message: &[u8],
    ) -> Result<Signature> {
        let e = curve::mod_n(&message_digest(user_id, private.public_key(), message)?)?;
        let d = *private.scalar();
        // d = n - 1 has no (1 + d)^-1 and is not a valid SM2 signing key
        let inv = curve::inv_mod_n(&(Scalar::ONE + d)).map_err(|err| {
            self.logger.error(format!("Refusing to sign: {err}"));
            err
        })?;

        for attempt in 1..=self.max_attempts {
            let k = rng::random_scalar()?;
            let Some((x1, _)) = curve::base_mul(&k)?.coordinates() else {
                continue;
            };
            let r = e + curve::mod_n(&x1)?;
            if bool::from(r.is_zero()) || bool::from((r + *k).is_zero()) {
                continue;
            }
            let s = inv * (*k - r * d);
            if bool::from(s.is_zero()) {
                continue;
            }
            self.logger.debug_args(format_args!(
                "Signed {} bytes on attempt {attempt}",
                message.len()
            ));
            return Ok(Signature {
                r: r.to_repr().into(),
                s: s.to_repr().into(),
            });
        }
        self.logger.error(format!(
            "No valid nonce after {} attempts",
            self.max_attempts
        ));
        Err(Sm2Error::SignatureFailure(format!(
            "no valid nonce after {} attempts",
            self.max_attempts
        )))
    }

    pub fn verify(&self, public: &PublicKey, message: &[u8], signature: &Signature) -> bool {
        self.verify_with_id(public, &self.user_id, message, signature)
    }

    pub fn verify_with_id(
        &self,
        public: &PublicKey,
        user_id: &[u8],
        message: &[u8],
        signature: &Signature,
    ) -> bool {
        let Ok(digest) = message_digest(user_id, public, message) else {
            return false;
        };
        verify_digest(public, &digest, signature).unwrap_or(false)
    }

    /// Verify a DER signature; a malformed encoding is an error, a bad
    /// signature is `Ok(false)`.
    pub fn verify_der(&self, public: &PublicKey, message: &[u8], der: &[u8]) -> Result<bool> {
        let signature = Signature::from_der(der).map_err(|err| {
            self.logger.warn_args(format_args!("Rejected signature encoding: {err}"));
            err
        })?;
        Ok(self.verify(public, message, &signature))
    }
}

fn verify_digest(public: &PublicKey, digest: &[u8], signature: &Signature) -> Result<bool> {
    // out-of-range r or s is simply an invalid signature
    let (Ok(r), Ok(s)) = (
        curve::scalar_from_bytes(&signature.r),
        curve::scalar_from_bytes(&signature.s),
    ) else {
        return Ok(false);
    };
    let t = r + s;
    if bool::from(t.is_zero()) {
        return Ok(false);
    }
    let point = curve::add(
        &curve::base_mul(&s)?,
        &curve::scalar_mul(&t, public.point())?,
    );
    let Some((x1, _)) = point.coordinates() else {
        return Ok(false);
    };
    let e = curve::mod_n(digest)?;
    Ok(e + curve::mod_n(&x1)? == r)
}

/// Sign with the default user id.
pub fn sign(private: &PrivateKey, message: &[u8]) -> Result<Signature> {
    SignEngine::default().sign(private, message)
}

/// Verify with the default user id.
pub fn verify(public: &PublicKey, message: &[u8], signature: &Signature) -> bool {
    SignEngine::default().verify(public, message, signature)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_then_verify() {
        let key = PrivateKey::generate().unwrap();
        let sig = sign(&key, b"message digest").unwrap();
        assert!(verify(key.public_key(), b"message digest", &sig));
        assert!(!verify(key.public_key(), b"message digesT", &sig));
    }

    #[test]
    fn signatures_are_randomized() {
        let key = PrivateKey::generate().unwrap();
        let a = sign(&key, b"m").unwrap();
        let b = sign(&key, b"m").unwrap();
        assert_ne!(a, b);
        assert!(verify(key.public_key(), b"m", &a));
        assert!(verify(key.public_key(), b"m", &b));
    }

    #[test]
    fn user_id_is_bound_into_the_signature() {
        let key = PrivateKey::generate().unwrap();
        let alice = SignEngine::with_config(&EngineConfig::new().with_user_id(b"alice".to_vec()));
        let sig = alice.sign(&key, b"m").unwrap();
        assert!(alice.verify(key.public_key(), b"m", &sig));
        assert!(!SignEngine::default().verify(key.public_key(), b"m", &sig));
        assert!(SignEngine::default().verify_with_id(key.public_key(), b"alice", b"m", &sig));
    }

    #[test]
    fn wrong_key_or_out_of_range_values_fail() {
        let key = PrivateKey::generate().unwrap();
        let other = PrivateKey::generate().unwrap();
        let sig = sign(&key, b"m").unwrap();
        assert!(!verify(other.public_key(), b"m", &sig));

        let zero_r = Signature::from_scalars(&[0], sig.s()).unwrap();
        assert!(!verify(key.public_key(), b"m", &zero_r));
        let big_s = Signature::from_scalars(sig.r(), &curve::ORDER).unwrap();
        assert!(!verify(key.public_key(), b"m", &big_s));

        // r + s = n
        let r = curve::scalar_from_bytes(sig.r()).unwrap();
        let neg_r: [u8; 32] = (-r).to_repr().into();
        let sum_zero = Signature::from_scalars(sig.r(), &neg_r).unwrap();
        assert!(!verify(key.public_key(), b"m", &sum_zero));
    }

    #[test]
    fn der_and_raw_forms() {
        let key = PrivateKey::generate().unwrap();
        let sig = sign(&key, b"m").unwrap();
        let der = sig.to_der().unwrap();
        assert_eq!(der[0], 0x30);
        assert_eq!(Signature::from_der(&der).unwrap(), sig);
        assert_eq!(Signature::from_bytes(&sig.to_bytes()).unwrap(), sig);
        assert!(SignEngine::default()
            .verify_der(key.public_key(), b"m", &der)
            .unwrap());
        assert!(!SignEngine::default()
            .verify_der(key.public_key(), b"x", &der)
            .unwrap());
    }

    #[test]
    fn every_flipped_bit_breaks_verification() {
        let key = PrivateKey::generate().unwrap();
        let sig = sign(&key, b"m").unwrap();
        let raw = sig.to_bytes();
        for bit in 0..SIGNATURE_SIZE * 8 {
            let mut flipped = raw;
            flipped[bit / 8] ^= 0x80 >> (bit % 8);
            let tampered = Signature::from_bytes(&flipped).unwrap();
            assert!(!verify(key.public_key(), b"m", &tampered), "bit {bit}");
        }
    }

    #[test]
    fn malformed_signatures_are_errors() {
        let key = PrivateKey::generate().unwrap();
        for der in [
            &[0x30, 0x00][..],
            &[0x30, 0x03, 0x02, 0x01, 0x01][..],
            &[0x30, 0x06, 0x02, 0x01, 0xff, 0x02, 0x01, 0x01][..],
            &[0x02, 0x01, 0x01][..],
        ] {
            assert!(matches!(
                Signature::from_der(der),
                Err(Sm2Error::MalformedSignature(_))
            ));
            assert!(SignEngine::default()
                .verify_der(key.public_key(), b"m", der)
                .is_err());
        }
        let mut oversized = vec![0x30, 0x26, 0x02, 0x21, 0x01];
        oversized.extend_from_slice(&[0u8; 32]);
        oversized.extend_from_slice(&[0x02, 0x01, 0x01]);
        assert!(matches!(
            Signature::from_der(&oversized),
            Err(Sm2Error::MalformedSignature(_))
        ));
        assert!(Signature::from_bytes(&[0u8; 63]).is_err());
    }

    #[test]
    fn zero_attempts_is_signature_failure() {
        let key = PrivateKey::generate().unwrap();
        let engine = SignEngine::with_config(&EngineConfig::new().with_sign_attempts(0))
            .with_logger(Logger::new_root(Component::Signer, "exhausted"));
        assert!(matches!(
            engine.sign(&key, b"m"),
            Err(Sm2Error::SignatureFailure(_))
        ));
    }
}
