//! Passphrase sealing for PEM private keys.
//!
//! The key is derived with PBKDF2-HMAC-SHA256 and the DER body sealed with
//! AES-256-GCM. Parameters travel in RFC 1421 headers:
//!
//! ```text
//! Proc-Type: 4,ENCRYPTED
//! DEK-Info: PBKDF2-SHA256-AES-256-GCM,<iterations>,<hex salt>,<hex nonce>
//! ```

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::asn1::pem::{Pem, LABEL_EC_PRIVATE_KEY};
use crate::error::{Result, Sm2Error};
use crate::rng;

const PROC_TYPE: &str = "Proc-Type";
const PROC_TYPE_ENCRYPTED: &str = "4,ENCRYPTED";
const DEK_INFO: &str = "DEK-Info";
const CIPHER_NAME: &str = "PBKDF2-SHA256-AES-256-GCM";

const SALT_LENGTH: usize = 16;
const KEY_LENGTH: usize = 32;
const NONCE_LENGTH: usize = 12;

/// Cap on the round count accepted from a file, so a hostile header cannot
/// stall the decoder.
const MAX_ITERATIONS: u32 = 10_000_000;

fn derive_key(passphrase: &[u8], salt: &[u8], iterations: u32) -> Zeroizing<[u8; KEY_LENGTH]> {
    let mut key = Zeroizing::new([0u8; KEY_LENGTH]);
    pbkdf2_hmac::<Sha256>(passphrase, salt, iterations, &mut key[..]);
    key
}

pub(super) fn is_sealed(pem: &Pem) -> bool {
    pem.headers().get(PROC_TYPE).is_some() || pem.headers().get(DEK_INFO).is_some()
}

pub(super) fn seal(der: &[u8], passphrase: &[u8], iterations: u32) -> Result<Pem> {
    if iterations == 0 {
        return Err(Sm2Error::InvalidParameter(
            "pbkdf2 iterations must be positive".to_string(),
        ));
    }
    let mut salt = [0u8; SALT_LENGTH];
    let mut nonce = [0u8; NONCE_LENGTH];
    rng::fill(&mut salt)?;
    rng::fill(&mut nonce)?;

    let key = derive_key(passphrase, &salt, iterations);
    let cipher = Aes256Gcm::new_from_slice(&key[..])
        .map_err(|e| Sm2Error::InvalidParameter(format!("cipher key: {e}")))?;
    let sealed = cipher
        .encrypt(&Nonce::from(nonce), der)
        .map_err(|e| Sm2Error::InvalidParameter(format!("sealing private key: {e}")))?;

    let dek_info = format!(
        "{CIPHER_NAME},{iterations},{},{}",
        hex::encode(salt),
        hex::encode(nonce)
    );
    let mut pem = Pem::new(LABEL_EC_PRIVATE_KEY, sealed);
    pem.headers_mut().add(PROC_TYPE, PROC_TYPE_ENCRYPTED)?;
    pem.headers_mut().add(DEK_INFO, &dek_info)?;
    Ok(pem)
}

struct DekInfo {
    iterations: u32,
    salt: Vec<u8>,
    nonce: [u8; NONCE_LENGTH],
}

fn parse_dek_info(pem: &Pem) -> Result<DekInfo> {
    let bad = |what: &str| Sm2Error::MalformedKey(format!("DEK-Info: {what}"));

    if pem.headers().get(PROC_TYPE) != Some(PROC_TYPE_ENCRYPTED) {
        return Err(bad("Proc-Type must be 4,ENCRYPTED"));
    }
    let info = pem
        .headers()
        .get(DEK_INFO)
        .ok_or_else(|| bad("header missing"))?;
    let fields: Vec<&str> = info.split(',').map(str::trim).collect();
    let [name, iterations, salt, nonce] = fields.as_slice() else {
        return Err(bad("expected four comma separated fields"));
    };
    if *name != CIPHER_NAME {
        return Err(bad(&format!("unsupported cipher {name}")));
    }
    let iterations: u32 = iterations
        .parse()
        .map_err(|_| bad("iteration count is not a number"))?;
    if iterations == 0 || iterations > MAX_ITERATIONS {
        return Err(bad("iteration count out of range"));
    }
    let salt = hex::decode(salt).map_err(|_| bad("salt is not hex"))?;
    let nonce = hex::decode(nonce).map_err(|_| bad("nonce is not hex"))?;
    if salt.is_empty() {
        return Err(bad("salt is empty"));
    }
    let nonce: [u8; NONCE_LENGTH] = nonce
        .as_slice()
        .try_into()
        .map_err(|_| bad("nonce has the wrong length"))?;
    Ok(DekInfo {
        iterations,
        salt,
        nonce,
    })
}

/// Recover the DER body of a sealed key.
pub(super) fn open(pem: &Pem, passphrase: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    let info = parse_dek_info(pem)?;
    let key = derive_key(passphrase, &info.salt, info.iterations);
    let cipher = Aes256Gcm::new_from_slice(&key[..])
        .map_err(|e| Sm2Error::InvalidParameter(format!("cipher key: {e}")))?;
    cipher
        .decrypt(&Nonce::from(info.nonce), pem.contents())
        .map(Zeroizing::new)
        .map_err(|_| {
            Sm2Error::AuthFailure("wrong passphrase or corrupted key".to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Same body, fresh headers.
    fn with_dek_info(pem: &Pem, dek_info: &str) -> Pem {
        let mut out = Pem::new(pem.tag(), pem.contents().to_vec());
        out.headers_mut().add(PROC_TYPE, PROC_TYPE_ENCRYPTED).unwrap();
        out.headers_mut().add(DEK_INFO, dek_info).unwrap();
        out
    }

    #[test]
    fn seal_then_open() {
        let pem = seal(b"secret der", b"pw", 10).unwrap();
        assert!(is_sealed(&pem));
        assert_eq!(open(&pem, b"pw").unwrap().as_slice(), b"secret der");
        assert!(matches!(open(&pem, b"pW"), Err(Sm2Error::AuthFailure(_))));
    }

    #[test]
    fn tampered_body_fails_authentication() {
        let pem = seal(b"secret der", b"pw", 10).unwrap();
        let mut body = pem.contents().to_vec();
        body[0] ^= 1;
        let mut tampered = Pem::new(pem.tag(), body);
        for (name, value) in pem.headers().iter() {
            tampered.headers_mut().add(name, value).unwrap();
        }
        assert!(matches!(open(&tampered, b"pw"), Err(Sm2Error::AuthFailure(_))));
    }

    #[test]
    fn bad_headers_are_key_errors() {
        let pem = seal(b"x", b"pw", 10).unwrap();
        let other_cipher = with_dek_info(&pem, "DES-EDE3-CBC,0011223344556677");
        assert!(matches!(
            open(&other_cipher, b"pw"),
            Err(Sm2Error::MalformedKey(_))
        ));

        let huge = with_dek_info(
            &pem,
            &format!("{CIPHER_NAME},4294967295,00,000000000000000000000000"),
        );
        assert!(matches!(open(&huge, b"pw"), Err(Sm2Error::MalformedKey(_))));

        let short_nonce = with_dek_info(&pem, &format!("{CIPHER_NAME},10,00,0000"));
        assert!(matches!(
            open(&short_nonce, b"pw"),
            Err(Sm2Error::MalformedKey(_))
        ));

        assert!(seal(b"x", b"pw", 0).is_err());
    }
}
