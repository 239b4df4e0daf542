//! Exact base-10 decimal arithmetic for money, quantities and percentages.
//!
//! Values are parsed into a canonical `(sign, digits, scale)` triple backed by
//! arbitrary-precision integers, so no computation ever passes through binary
//! floating point. The string-level helpers at the bottom of this module are
//! total: anything that cannot be computed comes back as `None`.

use num_bigint::{BigInt, BigUint, Sign};
use num_traits::Zero;
use rust_decimal::Decimal as RustDecimal;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Fractional digits used by division and display unless the caller picks one.
pub const DEFAULT_SCALE: u32 = 18;

/// Largest `target_scale` division accepts.
pub const MAX_SCALE: u32 = 1_000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecimalError {
    #[error("invalid decimal format: {0:?}")]
    InvalidFormat(String),
}

/// An operand accepted by the engine: decimal text, a float, or an integer.
///
/// Floats are rendered to their shortest round-trip text before parsing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DecimalInput<'a> {
    Text(&'a str),
    Float(f64),
    Integer(i128),
}

impl<'a> From<&'a str> for DecimalInput<'a> {
    fn from(value: &'a str) -> Self {
        DecimalInput::Text(value)
    }
}

impl<'a> From<&'a String> for DecimalInput<'a> {
    fn from(value: &'a String) -> Self {
        DecimalInput::Text(value.as_str())
    }
}

impl From<f64> for DecimalInput<'_> {
    fn from(value: f64) -> Self {
        DecimalInput::Float(value)
    }
}

impl From<f32> for DecimalInput<'_> {
    fn from(value: f32) -> Self {
        DecimalInput::Float(f64::from(value))
    }
}

macro_rules! integer_input {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for DecimalInput<'_> {
                fn from(value: $ty) -> Self {
                    DecimalInput::Integer(i128::from(value))
                }
            }
        )*
    };
}

integer_input!(i8, i16, i32, i64, i128, u8, u16, u32, u64);

/// Canonical fixed-point decimal.
///
/// Invariants: zero is never negative, and `digits` carries no trailing zero
/// while `scale > 0`. Two inputs denoting the same number therefore compare
/// equal field by field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Decimal {
    negative: bool,
    digits: BigUint,
    scale: u32,
}

impl Decimal {
    /// The additive identity (0).
    pub fn zero() -> Self {
        Decimal {
            negative: false,
            digits: BigUint::zero(),
            scale: 0,
        }
    }


    /// Parse text, a float or an integer into a canonical decimal.
    ///
    /// # Errors
    /// Returns [`DecimalError::InvalidFormat`] unless the input is an optional
    /// sign, one or more digits, and optionally `.` followed by one or more
    /// digits. Non-finite floats are rejected.
    pub fn parse<'a>(input: impl Into<DecimalInput<'a>>) -> Result<Self, DecimalError> {
        match input.into() {
            DecimalInput::Text(text) => Self::parse_text(text),
            DecimalInput::Float(value) if !value.is_finite() => {
                Err(DecimalError::InvalidFormat(value.to_string()))
            }
            DecimalInput::Float(value) => Self::parse_text(&value.to_string()),
            DecimalInput::Integer(value) => Self::parse_text(&value.to_string()),
        }
    }

    fn parse_text(text: &str) -> Result<Self, DecimalError> {
        let invalid = || DecimalError::InvalidFormat(text.to_string());
        let trimmed = text.trim();

        let (negative, unsigned) = match trimmed.as_bytes().first() {
            Some(b'-') => (true, &trimmed[1..]),
            Some(b'+') => (false, &trimmed[1..]),
            _ => (false, trimmed),
        };

        let (integer_part, fraction_part) = match unsigned.split_once('.') {
            Some((_, "")) => return Err(invalid()),
            Some((integer, fraction)) => (integer, fraction),
            None => (unsigned, ""),
        };

        let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if integer_part.is_empty() || !all_digits(integer_part) || !all_digits(fraction_part) {
            return Err(invalid());
        }

        let fraction = fraction_part.trim_end_matches('0');
        let scale = u32::try_from(fraction.len()).map_err(|_| invalid())?;

        let mut digit_text = String::with_capacity(integer_part.len() + fraction.len());
        digit_text.push_str(integer_part);
        digit_text.push_str(fraction);
        let digits = BigUint::parse_bytes(digit_text.as_bytes(), 10).ok_or_else(invalid)?;

        Ok(Self::from_parts(negative, digits, scale))
    }

    /// Build a canonical value, stripping trailing fractional zeros.
    fn from_parts(negative: bool, mut digits: BigUint, mut scale: u32) -> Self {
        if digits.is_zero() {
            return Self::zero();
        }
        let ten = BigUint::from(10u32);
        while scale > 0 && (&digits % &ten).is_zero() {
            digits /= &ten;
            scale -= 1;
        }
        Decimal {
            negative,
            digits,
            scale,
        }
    }

    fn from_signed(value: BigInt, scale: u32) -> Self {
        let (sign, magnitude) = value.into_parts();
        Self::from_parts(sign == Sign::Minus, magnitude, scale)
    }

    /// Signed digits re-expressed at `scale`, which must be >= `self.scale`.
    fn to_signed_at(&self, scale: u32) -> BigInt {
        let magnitude = &self.digits * pow10(scale - self.scale);
        let sign = if self.negative {
            Sign::Minus
        } else {
            Sign::Plus
        };
        BigInt::from_biguint(sign, magnitude)
    }

    /// -1, 0 or +1.
    pub fn signum(&self) -> i8 {
        if self.digits.is_zero() {
            0
        } else if self.negative {
            -1
        } else {
            1
        }
    }

    /// All significant digits with the decimal point removed.
    pub fn digits(&self) -> &BigUint {
        &self.digits
    }

    /// Number of digits to the right of the decimal point.
    pub fn scale(&self) -> u32 {
        self.scale
    }

    pub fn is_zero(&self) -> bool {
        self.digits.is_zero()
    }

    /// Returns true if the value is > 0.
    pub fn is_positive(&self) -> bool {
        !self.negative && !self.digits.is_zero()
    }

    /// Returns true if the value is < 0.
    pub fn is_negative(&self) -> bool {
        self.negative
    }

    pub fn abs(&self) -> Self {
        Decimal {
            negative: false,
            ..self.clone()
        }
    }

    /// Exact product: signs multiply, digits multiply, scales add.
    ///
    /// Returns `None` only if the combined scale overflows `u32`.
    pub fn checked_mul(&self, rhs: &Decimal) -> Option<Decimal> {
        let scale = self.scale.checked_add(rhs.scale)?;
        Some(Self::from_parts(
            self.negative != rhs.negative,
            &self.digits * &rhs.digits,
            scale,
        ))
    }

    /// Quotient with exactly `target_scale` fractional digits, rounded half up.
    ///
    /// The numerator is scaled so integer division yields `target_scale`
    /// digits; if twice the remainder reaches the denominator the magnitude is
    /// bumped by one (ties round away from zero). Returns `None` when `rhs` is
    /// zero or `target_scale` exceeds [`MAX_SCALE`].
    pub fn checked_div(&self, rhs: &Decimal, target_scale: u32) -> Option<Decimal> {
        if rhs.digits.is_zero() || target_scale > MAX_SCALE {
            return None;
        }

        let exp = i64::from(rhs.scale) + i64::from(target_scale) - i64::from(self.scale);
        let (numerator, denominator) = if exp >= 0 {
            let shift = u32::try_from(exp).ok()?;
            (&self.digits * pow10(shift), rhs.digits.clone())
        } else {
            let shift = u32::try_from(-exp).ok()?;
            (self.digits.clone(), &rhs.digits * pow10(shift))
        };

        let magnitude = div_round_half_up(&numerator, &denominator);
        Some(Self::from_parts(
            self.negative != rhs.negative,
            magnitude,
            target_scale,
        ))
    }

    pub fn checked_add(&self, rhs: &Decimal) -> Option<Decimal> {
        let scale = self.scale.max(rhs.scale);
        Some(Self::from_signed(
            self.to_signed_at(scale) + rhs.to_signed_at(scale),
            scale,
        ))
    }

    pub fn checked_sub(&self, rhs: &Decimal) -> Option<Decimal> {
        let scale = self.scale.max(rhs.scale);
        Some(Self::from_signed(
            self.to_signed_at(scale) - rhs.to_signed_at(scale),
            scale,
        ))
    }

    /// Reduce to at most `max_scale` fractional digits, rounding half up.
    ///
    /// Values already within `max_scale` are returned unchanged.
    pub fn round_to_scale(&self, max_scale: u32) -> Decimal {
        if self.scale <= max_scale {
            return self.clone();
        }
        let divisor = pow10(self.scale - max_scale);
        Self::from_parts(
            self.negative,
            div_round_half_up(&self.digits, &divisor),
            max_scale,
        )
    }

    /// Format the Decimal as a canonical string (no exponent notation).
    pub fn to_canonical_string(&self) -> String {
        let digits = self.digits.to_str_radix(10);
        let sign = if self.negative { "-" } else { "" };
        let scale = self.scale as usize;

        if scale == 0 {
            return format!("{sign}{digits}");
        }

        let padded = if digits.len() <= scale {
            format!("{}{}", "0".repeat(scale - digits.len() + 1), digits)
        } else {
            digits
        };
        let (integer, fraction) = padded.split_at(padded.len() - scale);
        format!("{sign}{integer}.{fraction}")
    }
}

fn pow10(exp: u32) -> BigUint {
    BigUint::from(10u32).pow(exp)
}

fn div_round_half_up(numerator: &BigUint, denominator: &BigUint) -> BigUint {
    let quotient = numerator / denominator;
    let remainder = numerator % denominator;
    if remainder * 2u32 >= *denominator {
        quotient + 1u32
    } else {
        quotient
    }
}

impl Default for Decimal {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_canonical_string())
    }
}

impl FromStr for Decimal {
    type Err = DecimalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_text(s)
    }
}

impl std::ops::Neg for Decimal {
    type Output = Decimal;

    fn neg(self) -> Decimal {
        let negative = !self.negative;
        Self::from_parts(negative, self.digits, self.scale)
    }
}

impl From<RustDecimal> for Decimal {
    fn from(value: RustDecimal) -> Self {
        let mantissa = value.mantissa();
        Self::from_parts(
            mantissa < 0,
            BigUint::from(mantissa.unsigned_abs()),
            value.scale(),
        )
    }
}

impl TryFrom<&Decimal> for RustDecimal {
    type Error = rust_decimal::Error;

    /// Fails when the value needs more than 28 fractional digits or 96 bits.
    fn try_from(value: &Decimal) -> Result<Self, Self::Error> {
        RustDecimal::from_str_exact(&value.to_canonical_string())
    }
}

/// Serialized as its canonical string so no precision is lost on the wire.
impl Serialize for Decimal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Decimal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DecimalVisitor;

        impl Visitor<'_> for DecimalVisitor {
            type Value = Decimal;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a decimal string or number")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Decimal, E> {
                Decimal::parse(v).map_err(E::custom)
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Decimal, E> {
                Decimal::parse(v).map_err(E::custom)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Decimal, E> {
                Decimal::parse(v).map_err(E::custom)
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Decimal, E> {
                Decimal::parse(v).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(DecimalVisitor)
    }
}

/// Parse any accepted operand; see [`Decimal::parse`].
pub fn parse<'a>(input: impl Into<DecimalInput<'a>>) -> Result<Decimal, DecimalError> {
    Decimal::parse(input)
}

/// Canonical text for `value`, or `None` if it does not parse.
pub fn normalize_decimal<'a>(value: impl Into<DecimalInput<'a>>) -> Option<String> {
    Decimal::parse(value).ok().map(|d| d.to_canonical_string())
}

pub fn is_positive_decimal<'a>(value: impl Into<DecimalInput<'a>>) -> bool {
    Decimal::parse(value).is_ok_and(|d| d.is_positive())
}

pub fn multiply_decimal<'a, 'b>(
    a: impl Into<DecimalInput<'a>>,
    b: impl Into<DecimalInput<'b>>,
) -> Option<String> {
    let left = Decimal::parse(a).ok()?;
    let right = Decimal::parse(b).ok()?;
    left.checked_mul(&right).map(|d| d.to_canonical_string())
}

/// `a / b` with `scale` fractional digits, rounded half up. `None` if `b` is
/// zero or `scale` is above [`MAX_SCALE`].
pub fn divide_decimal<'a, 'b>(
    a: impl Into<DecimalInput<'a>>,
    b: impl Into<DecimalInput<'b>>,
    scale: u32,
) -> Option<String> {
    let left = Decimal::parse(a).ok()?;
    let right = Decimal::parse(b).ok()?;
    left.checked_div(&right, scale).map(|d| d.to_canonical_string())
}

/// Human percent ("1.5") to stored fraction ("0.015").
pub fn decimal_to_fractional_percent<'a>(percent: impl Into<DecimalInput<'a>>) -> Option<String> {
    divide_decimal(percent, "100", DEFAULT_SCALE)
}

/// Stored fraction ("0.015") to human percent ("1.5"). Exact.
pub fn fractional_to_percent<'a>(value: impl Into<DecimalInput<'a>>) -> Option<String> {
    multiply_decimal(value, "100")
}

/// Presentation text with at most `max_scale` fractional digits.
pub fn decimal_to_display<'a>(
    value: impl Into<DecimalInput<'a>>,
    max_scale: u32,
) -> Option<String> {
    Decimal::parse(value)
        .ok()
        .map(|d| d.round_to_scale(max_scale).to_canonical_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_parse_strips_redundant_zeros() {
        let a = Decimal::parse("000123.4500").unwrap();
        let b = Decimal::parse("123.45").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.scale(), 2);
        assert_eq!(a.digits(), &BigUint::from(12345u32));
        assert_eq!(a.to_canonical_string(), "123.45");
    }

    #[test]
    fn test_parse_canonical_zero_has_no_sign() {
        for input in ["0", "-0", "+0.000", "-000.0", "00"] {
            let zero = Decimal::parse(input).unwrap();
            assert_eq!(zero, Decimal::zero(), "input {}", input);
            assert_eq!(zero.signum(), 0);
            assert!(!zero.is_negative());
            assert_eq!(zero.to_canonical_string(), "0");
        }
    }

    #[test]
    fn test_parse_rejects_malformed_text() {
        let bad = [
            "", "  ", "abc", ".5", "5.", "1e5", "--1", "+-1", "1.2.3", "1,5", "0x10", "- 1",
            "١٢",
        ];
        for input in bad {
            assert!(
                matches!(Decimal::parse(input), Err(DecimalError::InvalidFormat(_))),
                "expected {:?} to be rejected",
                input
            );
        }
    }

    #[test]
    fn test_parse_accepts_sign_and_whitespace() {
        assert_eq!(normalize_decimal("+1.50"), Some("1.5".to_string()));
        assert_eq!(normalize_decimal("  -0.010 "), Some("-0.01".to_string()));
    }

    #[test]
    fn test_parse_numeric_inputs() {
        assert_eq!(normalize_decimal(1.5f64), Some("1.5".to_string()));
        assert_eq!(normalize_decimal(3.0f64), Some("3".to_string()));
        assert_eq!(normalize_decimal(-0.0f64), Some("0".to_string()));
        assert_eq!(normalize_decimal(0.0000001f64), Some("0.0000001".to_string()));
        assert_eq!(normalize_decimal(42i64), Some("42".to_string()));
        assert_eq!(normalize_decimal(-7i32), Some("-7".to_string()));
        assert_eq!(normalize_decimal(f64::NAN), None);
        assert_eq!(normalize_decimal(f64::INFINITY), None);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for input in ["0012.3400", "-0.5", "7", "0.000000000000000000001"] {
            let once = normalize_decimal(input).unwrap();
            let twice = normalize_decimal(&once).unwrap();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_is_positive_decimal() {
        assert!(!is_positive_decimal("0"));
        assert!(!is_positive_decimal("-1"));
        assert!(!is_positive_decimal("abc"));
        assert!(!is_positive_decimal("0.000"));
        assert!(is_positive_decimal("0.0001"));
        assert!(is_positive_decimal("+3"));
    }

    #[test]
    fn test_multiply_is_exact() {
        assert_eq!(multiply_decimal("2", "3"), Some("6".to_string()));
        assert_eq!(multiply_decimal("0.5", "0.2"), Some("0.1".to_string()));
        assert_eq!(multiply_decimal("-1.25", "4"), Some("-5".to_string()));
        assert_eq!(multiply_decimal("-1.5", "-1.5"), Some("2.25".to_string()));
        assert_eq!(multiply_decimal("-3", "0"), Some("0".to_string()));
        assert_eq!(
            multiply_decimal("123456789.123456789", "987654321.987654321"),
            Some("121932631356500531.347203169112635269".to_string())
        );
        assert_eq!(multiply_decimal("x", "1"), None);
    }

    #[test]
    fn test_multiply_scale_is_sum_of_scales() {
        let a = Decimal::parse("1.23").unwrap();
        let b = Decimal::parse("4.567").unwrap();
        let product = a.checked_mul(&b).unwrap();
        assert_eq!(product.scale(), a.scale() + b.scale());
        assert_eq!(product.to_canonical_string(), "5.61741");
    }

    #[test]
    fn test_divide_concrete_cases() {
        assert_eq!(divide_decimal("1", "3", 4), Some("0.3333".to_string()));
        assert_eq!(divide_decimal("1", "4", 18), Some("0.25".to_string()));
        assert_eq!(divide_decimal("2", "3", 2), Some("0.67".to_string()));
        assert_eq!(divide_decimal("10", "2", 18), Some("5".to_string()));
        assert_eq!(divide_decimal("0.3", "0.1", 0), Some("3".to_string()));
    }

    #[test]
    fn test_divide_rounds_half_up() {
        // 0.125 -> 0.13 (a banker's rule would give 0.12)
        assert_eq!(divide_decimal("1", "8", 2), Some("0.13".to_string()));
        assert_eq!(divide_decimal("-1", "8", 2), Some("-0.13".to_string()));
        assert_eq!(divide_decimal("-1", "-8", 2), Some("0.13".to_string()));
        assert_eq!(divide_decimal("1.235", "1", 2), Some("1.24".to_string()));
        assert_eq!(divide_decimal("1.23456", "1", 2), Some("1.23".to_string()));
    }

    #[test]
    fn test_divide_rejects_scale_above_max() {
        assert_eq!(divide_decimal("1", "3", MAX_SCALE + 1), None);
        assert_eq!(divide_decimal("1", "3", 3_000_000), None);
        assert_eq!(divide_decimal("1", "3", u32::MAX), None);

        let widest = divide_decimal("1", "3", MAX_SCALE).unwrap();
        assert_eq!(widest.len(), 2 + MAX_SCALE as usize);
        assert!(widest.starts_with("0.333"));
    }

    #[test]
    fn test_divide_sign_and_zero() {
        assert_eq!(divide_decimal("-2", "3", 2), Some("-0.67".to_string()));
        assert_eq!(divide_decimal("2", "-3", 2), Some("-0.67".to_string()));
        assert_eq!(divide_decimal("-1", "1000", 2), Some("0".to_string()));
        assert_eq!(divide_decimal("0", "5", 18), Some("0".to_string()));
    }

    #[test]
    fn test_divide_failures() {
        assert_eq!(divide_decimal("1", "0", 18), None);
        assert_eq!(divide_decimal("1", "0.000", 18), None);
        assert_eq!(divide_decimal("1", "abc", 18), None);
        assert_eq!(divide_decimal("", "1", 18), None);
    }

    #[test]
    fn test_percent_helpers() {
        assert_eq!(
            decimal_to_fractional_percent("1.5"),
            Some("0.015".to_string())
        );
        assert_eq!(fractional_to_percent("0.015"), Some("1.5".to_string()));
        assert_eq!(fractional_to_percent("0.001"), Some("0.1".to_string()));
        assert_eq!(decimal_to_fractional_percent("nope"), None);
    }

    #[test]
    fn test_decimal_to_display() {
        assert_eq!(
            decimal_to_display("1.500000000000000000", 18),
            Some("1.5".to_string())
        );
        assert_eq!(decimal_to_display("2.000", 18), Some("2".to_string()));
        assert_eq!(
            decimal_to_display("0.1234565", 6),
            Some("0.123457".to_string())
        );
        assert_eq!(
            decimal_to_display("-0.1234564", 6),
            Some("-0.123456".to_string())
        );
        assert_eq!(decimal_to_display("0.0000004", 6), Some("0".to_string()));
        assert_eq!(decimal_to_display("9.999", 2), Some("10".to_string()));
        assert_eq!(decimal_to_display("bad", 2), None);
    }

    #[test]
    fn test_add_and_sub() {
        let a = Decimal::parse("10.5").unwrap();
        let b = Decimal::parse("2.25").unwrap();
        assert_eq!(a.checked_add(&b).unwrap().to_string(), "12.75");
        assert_eq!(a.checked_sub(&b).unwrap().to_string(), "8.25");
        assert_eq!(b.checked_sub(&a).unwrap().to_string(), "-8.25");
        assert_eq!(a.checked_sub(&a).unwrap(), Decimal::zero());
    }

    #[test]
    fn test_neg_keeps_zero_unsigned() {
        assert_eq!(-Decimal::zero(), Decimal::zero());
        assert_eq!((-Decimal::parse("1.5").unwrap()).to_string(), "-1.5");
    }

    #[test]
    fn test_rust_decimal_interop() {
        let rust = rust_decimal::Decimal::from_str("42.500").unwrap();
        let decimal = Decimal::from(rust);
        assert_eq!(decimal.to_canonical_string(), "42.5");

        let back = rust_decimal::Decimal::try_from(&decimal).unwrap();
        assert_eq!(back, rust_decimal::Decimal::from_str("42.5").unwrap());

        let too_precise = Decimal::parse("0.00000000000000000000000000001").unwrap();
        assert!(rust_decimal::Decimal::try_from(&too_precise).is_err());
    }

    #[test]
    fn test_decimal_json_serialization() {
        let decimal = Decimal::parse("123.4560").unwrap();
        let json = serde_json::to_value(&decimal).unwrap();
        assert_eq!(json, serde_json::json!("123.456"));

        let from_str: Decimal = serde_json::from_value(serde_json::json!("0.10")).unwrap();
        assert_eq!(from_str.to_string(), "0.1");
        let from_num: Decimal = serde_json::from_value(serde_json::json!(7)).unwrap();
        assert_eq!(from_num.to_string(), "7");
        assert!(serde_json::from_value::<Decimal>(serde_json::json!("1e3")).is_err());
    }
}
