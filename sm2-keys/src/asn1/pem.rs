//! PEM armor for keys, certificates and requests.
//!
//! Framing, RFC 1421 headers and base64 are handled by the `pem` crate; this
//! module pins the labels we emit and checks the label on the way in.

pub use ::pem::Pem;
use ::pem::{EncodeConfig, LineEnding};

use crate::error::{Result, Sm2Error};

pub const LABEL_EC_PRIVATE_KEY: &str = "EC PRIVATE KEY";
pub const LABEL_PRIVATE_KEY: &str = "PRIVATE KEY";
pub const LABEL_PUBLIC_KEY: &str = "PUBLIC KEY";
pub const LABEL_CERTIFICATE: &str = "CERTIFICATE";
pub const LABEL_CERTIFICATE_REQUEST: &str = "CERTIFICATE REQUEST";

/// Armor with `\n` line endings and a 64 column body.
pub fn encode(pem: &Pem) -> String {
    ::pem::encode_config(pem, EncodeConfig::new().set_line_ending(LineEnding::LF))
}

pub fn encode_der(label: &str, der: &[u8]) -> String {
    encode(&Pem::new(label, der))
}

/// Parse the first PEM block in `input` and require one of `labels`.
/// Text before the BEGIN line is ignored.
pub fn decode_expecting(input: &[u8], labels: &[&str]) -> Result<Pem> {
    let pem = ::pem::parse(input)?;
    if labels.contains(&pem.tag()) {
        Ok(pem)
    } else {
        Err(Sm2Error::MalformedEncoding(format!(
            "PEM: unexpected label {:?}, wanted one of {labels:?}",
            pem.tag()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_at_64_columns() {
        let text = encode_der(LABEL_CERTIFICATE, &[0x5a; 100]);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "-----BEGIN CERTIFICATE-----");
        assert_eq!(lines[1].len(), 64);
        assert!(lines[2].len() < 64);
        assert_eq!(lines.last().copied(), Some("-----END CERTIFICATE-----"));
        assert!(!text.contains('\r'));
        let back = decode_expecting(text.as_bytes(), &[LABEL_CERTIFICATE]).unwrap();
        assert_eq!(back.contents(), &[0x5a; 100][..]);
    }

    #[test]
    fn headers_and_leading_text() {
        let mut pem = Pem::new(LABEL_EC_PRIVATE_KEY, b"secret".to_vec());
        pem.headers_mut().add("Proc-Type", "4,ENCRYPTED").unwrap();
        pem.headers_mut().add("DEK-Info", "X,1,00,00").unwrap();
        let text = format!("Bag Attributes\n  friendlyName: x\n{}", encode(&pem));

        let back = decode_expecting(text.as_bytes(), &[LABEL_EC_PRIVATE_KEY]).unwrap();
        assert_eq!(back.contents(), b"secret");
        assert_eq!(back.headers().get("Proc-Type"), Some("4,ENCRYPTED"));
        assert_eq!(back.headers().get("DEK-Info"), Some("X,1,00,00"));
    }

    #[test]
    fn rejects_broken_armor() {
        let good = encode_der(LABEL_PUBLIC_KEY, &[1, 2, 3]);
        let any = [LABEL_PUBLIC_KEY, LABEL_CERTIFICATE];

        assert!(matches!(
            decode_expecting(b"nothing here", &any),
            Err(Sm2Error::MalformedEncoding(_))
        ));
        let truncated = good.replace("-----END PUBLIC KEY-----\n", "");
        assert!(decode_expecting(truncated.as_bytes(), &any).is_err());
        let mismatched = good.replace("END PUBLIC KEY", "END CERTIFICATE");
        assert!(decode_expecting(mismatched.as_bytes(), &any).is_err());
        let bad_body = good.replace("AQID", "A*ID");
        assert!(matches!(
            decode_expecting(bad_body.as_bytes(), &any),
            Err(Sm2Error::MalformedEncoding(_))
        ));

        assert!(matches!(
            decode_expecting(good.as_bytes(), &[LABEL_CERTIFICATE]),
            Err(Sm2Error::MalformedEncoding(_))
        ));
        assert!(decode_expecting(good.as_bytes(), &[LABEL_PUBLIC_KEY]).is_ok());
    }
}
