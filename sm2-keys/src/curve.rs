//! Arithmetic on the SM2 recommended curve (`sm2p256v1`).
//!
//! `y^2 = x^3 + ax + b` over the prime field `p`, with base point `G` of prime
//! order `n` and cofactor 1. Point arithmetic delegates to the RustCrypto
//! `sm2` crate, whose projective formulas and scalar ladder run in constant
//! time with respect to the scalar; this module adds the range checks and the
//! byte-level views the rest of the crate works with.

use sm2::elliptic_curve::{
    bigint::U256,
    ff::PrimeField,
    group::Group,
    ops::Reduce,
    sec1::{FromEncodedPoint, ToEncodedPoint},
};
use sm2::{AffinePoint, EncodedPoint, FieldBytes, ProjectivePoint, Scalar};

use crate::error::{Result, Sm2Error};

/// Size in bytes of a field element or a scalar.
pub const FIELD_SIZE: usize = 32;

/// Size of an uncompressed SEC1 point (`0x04 || x || y`).
pub const UNCOMPRESSED_POINT_SIZE: usize = 1 + 2 * FIELD_SIZE;

/// Coefficient `a` of the curve equation.
pub const CURVE_A: [u8; FIELD_SIZE] = [
    0xff, 0xff, 0xff, 0xfe, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0xff, 0xff, 0xff, 0xff, 0x00, 0x00, 0x00, 0x00, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xfc,
];

/// Coefficient `b` of the curve equation.
pub const CURVE_B: [u8; FIELD_SIZE] = [
    0x28, 0xe9, 0xfa, 0x9e, 0x9d, 0x9f, 0x5e, 0x34, 0x4d, 0x5a, 0x9e, 0x4b, 0xcf, 0x65, 0x09, 0xa7,
    0xf3, 0x97, 0x89, 0xf5, 0x15, 0xab, 0x8f, 0x92, 0xdd, 0xbc, 0xbd, 0x41, 0x4d, 0x94, 0x0e, 0x93,
];

/// Affine x coordinate of the base point.
pub const GENERATOR_X: [u8; FIELD_SIZE] = [
    0x32, 0xc4, 0xae, 0x2c, 0x1f, 0x19, 0x81, 0x19, 0x5f, 0x99, 0x04, 0x46, 0x6a, 0x39, 0xc9, 0x94,
    0x8f, 0xe3, 0x0b, 0xbf, 0xf2, 0x66, 0x0b, 0xe1, 0x71, 0x5a, 0x45, 0x89, 0x33, 0x4c, 0x74, 0xc7,
];

/// Affine y coordinate of the base point.
pub const GENERATOR_Y: [u8; FIELD_SIZE] = [
    0xbc, 0x37, 0x36, 0xa2, 0xf4, 0xf6, 0x77, 0x9c, 0x59, 0xbd, 0xce, 0xe3, 0x6b, 0x69, 0x21, 0x53,
    0xd0, 0xa9, 0x87, 0x7c, 0xc6, 0x2a, 0x47, 0x40, 0x02, 0xdf, 0x32, 0xe5, 0x21, 0x39, 0xf0, 0xa0,
];

/// Group order `n`.
pub const ORDER: [u8; FIELD_SIZE] = [
    0xff, 0xff, 0xff, 0xfe, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0x72, 0x03, 0xdf, 0x6b, 0x21, 0xc6, 0x05, 0x2b, 0x53, 0xbb, 0xf4, 0x09, 0x39, 0xd5, 0x41, 0x23,
];

/// A point on the curve, or the point at infinity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CurvePoint(ProjectivePoint);

impl CurvePoint {
    /// The point at infinity.
    pub fn identity() -> Self {
        Self(ProjectivePoint::IDENTITY)
    }

    /// The base point `G`.
    pub fn generator() -> Self {
        Self(ProjectivePoint::GENERATOR)
    }

    /// Build a point from big-endian affine coordinates, rejecting anything
    /// that does not satisfy the curve equation.
    pub fn from_affine(x: &[u8], y: &[u8]) -> Result<Self> {
        let (x, y) = (field_bytes(x)?, field_bytes(y)?);
        let encoded = EncodedPoint::from_affine_coordinates(&x, &y, false);
        Option::<AffinePoint>::from(AffinePoint::from_encoded_point(&encoded))
            .map(|p| Self(p.into()))
            .ok_or_else(|| Sm2Error::InvalidParameter("point is not on the curve".to_string()))
    }

    /// Decode a SEC1 point (uncompressed, compressed or the identity byte).
    pub fn from_sec1_bytes(bytes: &[u8]) -> Result<Self> {
        let encoded = EncodedPoint::from_bytes(bytes)
            .map_err(|e| Sm2Error::InvalidParameter(format!("invalid SEC1 point: {e}")))?;
        Option::<AffinePoint>::from(AffinePoint::from_encoded_point(&encoded))
            .map(|p| Self(p.into()))
            .ok_or_else(|| Sm2Error::InvalidParameter("point is not on the curve".to_string()))
    }

    /// Uncompressed SEC1 encoding; the identity encodes as a single zero byte.
    pub fn to_sec1_bytes(&self) -> Vec<u8> {
        self.0.to_affine().to_encoded_point(false).as_bytes().to_vec()
    }

    /// Big-endian affine coordinates, `None` for the point at infinity.
    pub fn coordinates(&self) -> Option<([u8; FIELD_SIZE], [u8; FIELD_SIZE])> {
        let encoded = self.0.to_affine().to_encoded_point(false);
        match (encoded.x(), encoded.y()) {
            (Some(x), Some(y)) => {
                let mut xb = [0u8; FIELD_SIZE];
                let mut yb = [0u8; FIELD_SIZE];
                xb.copy_from_slice(x);
                yb.copy_from_slice(y);
                Some((xb, yb))
            }
            _ => None,
        }
    }

    pub fn is_identity(&self) -> bool {
        self.0.is_identity().into()
    }
}

/// `P + Q`
pub fn add(p: &CurvePoint, q: &CurvePoint) -> CurvePoint {
    CurvePoint(p.0 + q.0)
}

/// `2P`
pub fn double(p: &CurvePoint) -> CurvePoint {
    CurvePoint(p.0.double())
}

/// `kP` for `k` in `[1, n-1]`; constant time in `k`.
pub fn scalar_mul(k: &Scalar, p: &CurvePoint) -> Result<CurvePoint> {
    if bool::from(k.is_zero()) {
        return Err(Sm2Error::InvalidParameter(
            "scalar must be in [1, n-1]".to_string(),
        ));
    }
    Ok(CurvePoint(p.0 * k))
}

/// `kG` for `k` in `[1, n-1]`.
pub fn base_mul(k: &Scalar) -> Result<CurvePoint> {
    scalar_mul(k, &CurvePoint::generator())
}

/// Whether the affine coordinates satisfy the curve equation.
pub fn is_on_curve(x: &[u8], y: &[u8]) -> bool {
    CurvePoint::from_affine(x, y).is_ok()
}

/// Reduce a big-endian integer of at most 32 bytes modulo `n`.
pub fn mod_n(bytes: &[u8]) -> Result<Scalar> {
    let repr = field_bytes(bytes)?;
    Ok(<Scalar as Reduce<U256>>::reduce_bytes(&repr))
}

/// `x^-1 mod n`; zero has no inverse.
pub fn inv_mod_n(x: &Scalar) -> Result<Scalar> {
    Option::<Scalar>::from(x.invert())
        .ok_or_else(|| Sm2Error::InvalidParameter("zero has no inverse mod n".to_string()))
}

/// Parse a big-endian scalar that must already lie in `[1, n-1]`.
pub fn scalar_from_bytes(bytes: &[u8]) -> Result<Scalar> {
    let repr = field_bytes(bytes)?;
    let scalar = Option::<Scalar>::from(Scalar::from_repr(repr))
        .ok_or_else(|| Sm2Error::InvalidParameter("scalar is not below n".to_string()))?;
    if bool::from(scalar.is_zero()) {
        return Err(Sm2Error::InvalidParameter(
            "scalar must not be zero".to_string(),
        ));
    }
    Ok(scalar)
}

/// Left-pad a big-endian integer to the field width.
pub(crate) fn field_bytes(bytes: &[u8]) -> Result<FieldBytes> {
    // Leading zero bytes beyond the width are harmless (DER integers carry one).
    let trimmed = match bytes.iter().position(|b| *b != 0) {
        Some(first) => &bytes[first..],
        None => &[][..],
    };
    if trimmed.len() > FIELD_SIZE {
        return Err(Sm2Error::InvalidParameter(format!(
            "integer is {} bytes, at most {FIELD_SIZE} allowed",
            trimmed.len()
        )));
    }
    let mut repr = FieldBytes::default();
    repr[FIELD_SIZE - trimmed.len()..].copy_from_slice(trimmed);
    Ok(repr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generator_matches_published_coordinates() {
        let (x, y) = CurvePoint::generator().coordinates().unwrap();
        assert_eq!(x, GENERATOR_X);
        assert_eq!(y, GENERATOR_Y);
        assert!(is_on_curve(&GENERATOR_X, &GENERATOR_Y));
    }

    #[test]
    fn off_curve_point_is_rejected() {
        let mut y = GENERATOR_Y;
        y[31] ^= 1;
        assert!(!is_on_curve(&GENERATOR_X, &y));
        assert!(matches!(
            CurvePoint::from_affine(&GENERATOR_X, &y),
            Err(Sm2Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn group_law_is_consistent() {
        let g = CurvePoint::generator();
        let two = Scalar::ONE + Scalar::ONE;
        let three = two + Scalar::ONE;
        assert_eq!(double(&g), base_mul(&two).unwrap());
        assert_eq!(add(&double(&g), &g), base_mul(&three).unwrap());
        assert_eq!(add(&g, &CurvePoint::identity()), g);
    }

    #[test]
    fn order_times_generator_is_identity() {
        // (n - 1)G + G = nG = O
        let n_minus_one = -Scalar::ONE;
        let p = base_mul(&n_minus_one).unwrap();
        assert!(add(&p, &CurvePoint::generator()).is_identity());
        assert!(CurvePoint::identity().coordinates().is_none());
        assert_eq!(CurvePoint::identity().to_sec1_bytes(), vec![0u8]);
    }

    #[test]
    fn zero_scalar_is_rejected() {
        assert!(matches!(
            base_mul(&Scalar::ZERO),
            Err(Sm2Error::InvalidParameter(_))
        ));
        assert!(matches!(
            inv_mod_n(&Scalar::ZERO),
            Err(Sm2Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn reduction_and_inversion() {
        // n mod n = 0, (n + 1) style inputs do not fit so use n itself.
        assert_eq!(mod_n(&ORDER).unwrap(), Scalar::ZERO);
        assert!(scalar_from_bytes(&ORDER).is_err());
        assert!(scalar_from_bytes(&[0u8; 32]).is_err());
        assert!(mod_n(&[1u8; 33]).is_err());

        let seven = mod_n(&[7]).unwrap();
        let inv = inv_mod_n(&seven).unwrap();
        assert_eq!(seven * inv, Scalar::ONE);
    }

    #[test]
    fn sec1_round_trip() {
        let p = base_mul(&mod_n(&[42]).unwrap()).unwrap();
        let bytes = p.to_sec1_bytes();
        assert_eq!(bytes.len(), UNCOMPRESSED_POINT_SIZE);
        assert_eq!(bytes[0], 0x04);
        assert_eq!(CurvePoint::from_sec1_bytes(&bytes).unwrap(), p);
    }
}
