//! 256-bit target arithmetic and the compact ("nBits") encoding
//!
//! Targets are unsigned 256-bit magnitudes. The compact form packs a target
//! into 32 bits: an 8-bit byte-length exponent and a 24-bit mantissa whose top
//! bit is a sign flag.
//!
//! ```text
//! bits   = size << 24 | mantissa
//! target = mantissa * 256^(size - 3)
//! ```

use uint::construct_uint;

construct_uint! {
    /// Unsigned 256-bit integer used for targets and hash magnitudes.
    pub struct U256(4);
}

/// Sign bit of the compact mantissa
const COMPACT_SIGN_BIT: u32 = 0x0080_0000;

/// Mantissa mask (sign bit excluded)
const COMPACT_MANTISSA: u32 = 0x007f_ffff;

/// Result of expanding compact bits, with the flags consensus checks need.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedTarget {
    pub target: U256,
    pub negative: bool,
    pub overflow: bool,
}

impl DecodedTarget {
    /// A decoded target usable as a proof bound: positive, non-zero, in range.
    pub fn is_valid(&self) -> bool {
        !self.negative && !self.overflow && !self.target.is_zero()
    }
}

/// Expand compact bits into a 256-bit target.
///
/// Overflowing encodings yield a zero target with `overflow` set.
pub fn decode_compact(bits: u32) -> DecodedTarget {
    let size = bits >> 24;
    let mut word = bits & COMPACT_MANTISSA;

    let negative = word != 0 && (bits & COMPACT_SIGN_BIT) != 0;
    let overflow = word != 0
        && (size > 34 || (word > 0xff && size > 33) || (word > 0xffff && size > 32));

    let target = if overflow {
        U256::zero()
    } else if size <= 3 {
        word >>= 8 * (3 - size);
        U256::from(word)
    } else {
        U256::from(word) << (8 * (size - 3) as usize)
    };

    DecodedTarget {
        target,
        negative,
        overflow,
    }
}

/// Expand compact bits, returning only the magnitude.
///
/// Used where the bits come from blocks already accepted into the chain.
#[inline]
pub fn target_from_compact(bits: u32) -> U256 {
    decode_compact(bits).target
}

/// Pack a target into its canonical compact form.
pub fn compact_from_target(target: &U256) -> u32 {
    let mut size = target.bits().div_ceil(8) as u32;
    let mut compact = if size <= 3 {
        (target.low_u64() << (8 * (3 - size))) as u32
    } else {
        (*target >> (8 * (size - 3) as usize)).low_u32()
    };

    // The mantissa must not look negative; move one byte into the exponent.
    if compact & COMPACT_SIGN_BIT != 0 {
        compact >>= 8;
        size += 1;
    }

    compact | (size << 24)
}

/// Parse a big-endian hex string (optionally `0x`-prefixed) into a target.
pub fn target_from_hex(s: &str) -> Result<U256, hex::FromHexError> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    let padded = if s.len() % 2 == 1 {
        format!("0{s}")
    } else {
        s.to_string()
    };
    let bytes = hex::decode(padded)?;
    if bytes.len() > 32 {
        return Err(hex::FromHexError::InvalidStringLength);
    }
    Ok(U256::from_big_endian(&bytes))
}

/// Render a target as 64 big-endian hex digits.
pub fn target_to_hex(target: &U256) -> String {
    let mut bytes = [0u8; 32];
    target.to_big_endian(&mut bytes);
    hex::encode(bytes)
}

/// Returns `a * exp(p / q)` for small `|p / q|`.
///
/// Evaluated as the truncated series `sum(a * (p/q)^n / n!)`, each term
/// derived from the previous one with integer division, so the result is
/// bit-exact across nodes.
pub fn mul_exp(a: U256, p: i64, q: i64) -> U256 {
    let negative = p < 0;
    let abs_p = U256::from(p.unsigned_abs());
    let q = U256::from(q.max(1) as u64);

    let mut term = a;
    let mut result = a;
    let mut n = 0u64;
    while !term.is_zero() {
        n += 1;
        term = term.saturating_mul(abs_p) / q / U256::from(n);
        if negative && n % 2 == 1 {
            result = result.saturating_sub(term);
        } else {
            result = result.saturating_add(term);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_known_compact_values() {
        let d = decode_compact(0x1d00ffff);
        assert!(d.is_valid());
        assert_eq!(
            target_to_hex(&d.target),
            "00000000ffff0000000000000000000000000000000000000000000000000000"
        );

        assert_eq!(target_from_compact(0x01003456), U256::zero());
        assert_eq!(target_from_compact(0x02123456), U256::from(0x1234u64));
        assert_eq!(target_from_compact(0x03123456), U256::from(0x123456u64));
        assert_eq!(target_from_compact(0x04123456), U256::from(0x12345600u64));
        assert_eq!(target_from_compact(0x05009234), U256::from(0x92340000u64));
    }

    #[test]
    fn test_decode_flags_negative_and_overflow() {
        let neg = decode_compact(0x04923456);
        assert!(neg.negative);
        assert!(!neg.is_valid());

        // Sign bit on a zero mantissa is not negative
        assert!(!decode_compact(0x01fedcba & 0xff80_0000).negative);

        let over = decode_compact(0xff123456);
        assert!(over.overflow);
        assert!(over.target.is_zero());

        assert!(!decode_compact(0x20123456).overflow);
        assert!(decode_compact(0x21123456).overflow);
        assert!(!decode_compact(0x220000ff).overflow);
        assert!(decode_compact(0x23000001).overflow);
    }

    #[test]
    fn test_compact_encoding_is_canonical() {
        assert_eq!(compact_from_target(&U256::zero()), 0);
        assert_eq!(compact_from_target(&U256::from(0x80u64)), 0x02008000);
        assert_eq!(compact_from_target(&U256::from(0x1234u64)), 0x02123400);
        assert_eq!(compact_from_target(&U256::from(0x12345600u64)), 0x04123456);

        let limit = target_from_hex("0000ffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff")
            .unwrap();
        assert_eq!(compact_from_target(&limit), 0x1f00ffff);
    }

    #[test]
    fn test_compact_round_trip_truncates_to_mantissa() {
        let bits = 0x1b0404cb;
        assert_eq!(compact_from_target(&target_from_compact(bits)), bits);
    }

    #[test]
    fn test_mul_exp_tracks_sign_of_exponent() {
        let a = U256::from(1_000_000_000u64);
        assert_eq!(mul_exp(a, 0, 100), a);
        assert!(mul_exp(a, 10, 100) > a);
        assert!(mul_exp(a, -10, 100) < a);

        // e^(0.1) ~ 1.10517, e^(-0.1) ~ 0.90484
        let up = mul_exp(a, 10, 100).low_u64();
        let down = mul_exp(a, -10, 100).low_u64();
        assert!((1_105_170_000..1_105_171_000).contains(&up), "{up}");
        assert!((904_837_000..904_838_000).contains(&down), "{down}");
    }

    #[test]
    fn test_hex_helpers() {
        let t = target_from_hex("0x7fff").unwrap();
        assert_eq!(t, U256::from(0x7fffu64));
        assert!(target_from_hex("zz").is_err());
        assert!(target_from_hex(&"ff".repeat(33)).is_err());
    }
}
