//! The one place that touches the operating-system random source.
//!
//! `OsRng` is stateless and thread safe, so the critical section is just the
//! `getrandom` call; no generator state is shared between callers.

use rand::{rngs::OsRng, RngCore};
use sm2::{FieldBytes, NonZeroScalar};
use zeroize::Zeroize;

use crate::error::{Result, Sm2Error};

// A uniform 256-bit draw lands outside [1, n-1] with probability < 2^-32.
const SCALAR_DRAWS: usize = 64;

/// Fill `dest` from the secure random source.
pub(crate) fn fill(dest: &mut [u8]) -> Result<()> {
    OsRng.try_fill_bytes(dest)?;
    Ok(())
}

/// Draw a uniformly random scalar in `[1, n-1]` by rejection sampling.
pub(crate) fn random_scalar() -> Result<NonZeroScalar> {
    let mut bytes = FieldBytes::default();
    for _ in 0..SCALAR_DRAWS {
        fill(&mut bytes[..])?;
        let candidate: Option<NonZeroScalar> = NonZeroScalar::from_repr(bytes).into();
        if let Some(scalar) = candidate {
            bytes[..].zeroize();
            return Ok(scalar);
        }
    }
    bytes[..].zeroize();
    Err(Sm2Error::EntropyFailure(
        "random source never produced a scalar below the group order".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sm2::elliptic_curve::ff::PrimeField;

    #[test]
    fn draws_differ() {
        let a = random_scalar().unwrap();
        let b = random_scalar().unwrap();
        assert_ne!(a.to_repr(), b.to_repr());
    }

    #[test]
    fn fill_writes_bytes() {
        let mut buf = [0u8; 64];
        fill(&mut buf).unwrap();
        assert!(buf.iter().any(|b| *b != 0));
    }
}
