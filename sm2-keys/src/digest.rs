//! SM3 helpers: plain hashing, the SM2 key-derivation function and the
//! signer-identity hash `Z_A`.

use sm3::{Digest, Sm3};
use zeroize::Zeroizing;

use crate::config::MAX_USER_ID_LEN;
use crate::curve::{CURVE_A, CURVE_B, GENERATOR_X, GENERATOR_Y};
use crate::error::{Result, Sm2Error};
use crate::keys::PublicKey;

/// Output size of SM3 in bytes.
pub const DIGEST_SIZE: usize = 32;

/// One-shot SM3.
pub fn sm3(data: &[u8]) -> [u8; DIGEST_SIZE] {
    Sm3::digest(data).into()
}

/// Counter-mode SM3 key derivation: `H(Z || 1) || H(Z || 2) || ...`
/// truncated to `len` bytes.
pub fn kdf(z: &[u8], len: usize) -> Result<Zeroizing<Vec<u8>>> {
    let blocks = len.div_ceil(DIGEST_SIZE);
    if blocks > u32::MAX as usize {
        return Err(Sm2Error::InvalidParameter(format!(
            "cannot derive {len} bytes of key stream"
        )));
    }
    let mut out = Zeroizing::new(Vec::with_capacity(blocks * DIGEST_SIZE));
    for counter in 1..=blocks as u32 {
        let mut hasher = Sm3::new();
        hasher.update(z);
        hasher.update(counter.to_be_bytes());
        out.extend_from_slice(&hasher.finalize());
    }
    out.truncate(len);
    Ok(out)
}

/// `Z_A = SM3(ENTL || ID || a || b || xG || yG || xA || yA)`
pub fn identity_digest(user_id: &[u8], public: &PublicKey) -> Result<[u8; DIGEST_SIZE]> {
    if user_id.len() > MAX_USER_ID_LEN {
        return Err(Sm2Error::InvalidParameter(format!(
            "user id is {} bytes, at most {MAX_USER_ID_LEN} allowed",
            user_id.len()
        )));
    }
    let entl = (user_id.len() * 8) as u16;
    let (xa, ya) = public.coordinates();

    let mut hasher = Sm3::new();
    hasher.update(entl.to_be_bytes());
    hasher.update(user_id);
    hasher.update(CURVE_A);
    hasher.update(CURVE_B);
    hasher.update(GENERATOR_X);
    hasher.update(GENERATOR_Y);
    hasher.update(xa);
    hasher.update(ya);
    Ok(hasher.finalize().into())
}

/// `e = SM3(Z_A || M)`, the value that is actually signed.
pub fn message_digest(
    user_id: &[u8],
    public: &PublicKey,
    message: &[u8],
) -> Result<[u8; DIGEST_SIZE]> {
    let za = identity_digest(user_id, public)?;
    let mut hasher = Sm3::new();
    hasher.update(za);
    hasher.update(message);
    Ok(hasher.finalize().into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sm3_known_answers() {
        assert_eq!(
            hex::encode(sm3(b"abc")),
            "66c7f0f462eeedd9d1f2d46bdc10e4e24167c4875cf2f7a2297da02b8f4ba8e0"
        );
        assert_eq!(
            hex::encode(sm3(&b"abcd".repeat(16))),
            "debe9ff92275b8a138604889c18e5a4d6fdb70e5387e5765293dcba39c0c5732"
        );
    }

    #[test]
    fn kdf_is_prefix_stable() {
        let z = b"shared secret";
        let short = kdf(z, 10).unwrap();
        let long = kdf(z, 70).unwrap();
        assert_eq!(short.len(), 10);
        assert_eq!(long.len(), 70);
        assert_eq!(&long[..10], &short[..]);

        let mut first = Vec::from(&z[..]);
        first.extend_from_slice(&1u32.to_be_bytes());
        assert_eq!(&long[..32], &sm3(&first)[..]);
        assert!(kdf(z, 0).unwrap().is_empty());
    }

    #[test]
    fn identity_digest_depends_on_user_id() {
        let key = crate::keys::PrivateKey::generate().unwrap();
        let a = identity_digest(b"1234567812345678", key.public_key()).unwrap();
        let b = identity_digest(b"alice", key.public_key()).unwrap();
        assert_ne!(a, b);
        assert!(identity_digest(&vec![0u8; MAX_USER_ID_LEN + 1], key.public_key()).is_err());
    }
}
