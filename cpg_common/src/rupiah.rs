use std::{
    fmt::Display,
    ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const IDR_CURRENCY_CODE: &str = "IDR";

/// An amount of Indonesian Rupiah, in minor currency units.
///
/// Stored as a signed integer so that the database can index and sum amounts natively. Rupiah has no sub-unit in
/// circulation, so one minor unit is one rupiah.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct Rupiah(i64);

op!(binary Rupiah, Add, add);
op!(binary Rupiah, Sub, sub);
op!(inplace Rupiah, AddAssign, add_assign);
op!(inplace Rupiah, SubAssign, sub_assign);
op!(unary Rupiah, Neg, neg);

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in Rupiah: {0}")]
pub struct RupiahConversionError(String);

impl From<i64> for Rupiah {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for Rupiah {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Rupiah {}

impl TryFrom<u64> for Rupiah {
    type Error = RupiahConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(RupiahConversionError(format!("Value {} is too large to convert to Rupiah", value)))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl Mul<i64> for Rupiah {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl Display for Rupiah {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Rp {}", group_thousands(self.0))
    }
}

impl Rupiah {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Multiplication that refuses to wrap. `None` when the product does not fit in the money type. Use this for
    /// anything derived from consumer input; the plain operators are for amounts already known to be in range.
    pub fn checked_mul(self, rhs: i64) -> Option<Self> {
        self.0.checked_mul(rhs).map(Self)
    }

    /// Addition that refuses to wrap. `None` when the sum does not fit in the money type.
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }
}

/// Formats an amount with `.` thousand separators, as the id-ID locale does.
fn group_thousands(value: i64) -> String {
    let (sign, digits) = if value < 0 { ("-", value.unsigned_abs().to_string()) } else { ("", value.to_string()) };
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    let offset = digits.len() % 3;
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (i + 3 - offset) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    format!("{sign}{grouped}")
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn arithmetic() {
        let a = Rupiah::from(100_000);
        let b = Rupiah::from(50_000);
        assert_eq!(a + b, Rupiah::from(150_000));
        assert_eq!(a - b, Rupiah::from(50_000));
        assert_eq!(a * 2, Rupiah::from(200_000));
        assert_eq!(-a, Rupiah::from(-100_000));
    }

    #[test]
    fn checked_arithmetic_catches_overflow() {
        let price = Rupiah::from(100_000);
        assert_eq!(price.checked_mul(2), Some(Rupiah::from(200_000)));
        assert!(price.checked_mul(300_000_000_000_000).is_none());
        assert!(Rupiah::from(i64::MAX).checked_add(Rupiah::from(1)).is_none());
        assert_eq!(Rupiah::from(i64::MAX).checked_mul(-1), Some(Rupiah::from(-i64::MAX)));
    }

    #[test]
    fn display_uses_id_locale_grouping() {
        assert_eq!(Rupiah::from(250_000).to_string(), "Rp 250.000");
        assert_eq!(Rupiah::from(1_500).to_string(), "Rp 1.500");
        assert_eq!(Rupiah::from(999).to_string(), "Rp 999");
        assert_eq!(Rupiah::from(-42_000).to_string(), "Rp -42.000");
        assert_eq!(Rupiah::from(1_234_567_890).to_string(), "Rp 1.234.567.890");
    }
}
