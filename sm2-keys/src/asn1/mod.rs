//! Glue between the DER crates and this crate's types.
//!
//! `der`, `spki` and `x509-cert` do the encoding work; this module holds the
//! object identifiers, the validity-time conversions and the PEM armor that
//! the key and certificate code share.

pub mod oid;
pub mod pem;
pub mod time;

use der::{Reader, SliceReader};

use crate::error::Result;

/// First element of a `SEQUENCE { tbs, algorithm, signature }`, exactly as it
/// appears in `der`.
pub(crate) fn signed_region(der: &[u8]) -> Result<&[u8]> {
    let mut reader = SliceReader::new(der)?;
    let region = reader.sequence(|outer| {
        let tbs = outer.tlv_bytes()?;
        outer.tlv_bytes()?;
        outer.tlv_bytes()?;
        Ok(tbs)
    })?;
    Ok(reader.finish(region)?)
}
