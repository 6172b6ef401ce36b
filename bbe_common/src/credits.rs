use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Mul},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

//--------------------------------------      Credits       ----------------------------------------------------------
/// A seller's prepaid giveaway credits. One credit funds exactly one buy-back.
///
/// Credits are stored as a signed integer so that ledger deltas (top-ups and reservation debits) can share the type.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Credits(i64);

op!(binary Credits, Add, add);
op!(binary Credits, Sub, sub);
op!(inplace Credits, AddAssign, add_assign);
op!(inplace Credits, SubAssign, sub_assign);
op!(unary Credits, Neg, neg);

impl Mul<i64> for Credits {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for Credits {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented as credits: {0}")]
pub struct CreditsConversionError(String);

impl From<i64> for Credits {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for Credits {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Credits {}

impl TryFrom<u64> for Credits {
    type Error = CreditsConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(CreditsConversionError(format!("Value {value} is too large to convert to Credits")))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl Display for Credits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}cr", self.0)
    }
}

impl Credits {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn zero() -> Self {
        Self(0)
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Clamps negative balances to zero. Used when reporting a seller's free balance after drift.
    pub fn clamped(self) -> Self {
        Self(self.0.max(0))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn arithmetic() {
        let a = Credits::from(100);
        let b = Credits::from(30);
        assert_eq!(a - b, Credits::from(70));
        assert_eq!(a + b, Credits::from(130));
        assert_eq!(-b, Credits::from(-30));
        assert_eq!(b * 3, Credits::from(90));
        let mut c = a;
        c -= b;
        assert_eq!(c, Credits::from(70));
        c += b;
        assert_eq!(c, a);
    }

    #[test]
    fn sum_and_clamp() {
        let total: Credits = [10, 20, 30].into_iter().map(Credits::from).sum();
        assert_eq!(total, Credits::from(60));
        assert!(Credits::from(-5).is_negative());
        assert_eq!(Credits::from(-5).clamped(), Credits::zero());
    }

    #[test]
    fn display() {
        assert_eq!(Credits::from(42).to_string(), "42cr");
    }
}
