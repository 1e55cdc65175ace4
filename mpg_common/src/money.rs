use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Neg, Sub, SubAssign},
    str::FromStr,
};

use rust_decimal::{prelude::ToPrimitive, Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::op;

pub const USD_CURRENCY_CODE: &str = "usd";
/// All amounts in the system are decimal currency units with this many fractional digits.
pub const CURRENCY_DECIMAL_PLACES: u32 = 2;

//--------------------------------------       Money         ---------------------------------------------------------
/// A monetary amount in major currency units, held to [`CURRENCY_DECIMAL_PLACES`] decimal places.
///
/// Amounts stay in decimal units everywhere inside the system. Conversion to integer minor units
/// (cents) happens at the gateway boundary only, via [`Money::minor_units`].
///
/// Rounding is half-away-from-zero throughout ([`RoundingStrategy::MidpointAwayFromZero`]).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

op!(binary Money, Add, add);
op!(binary Money, Sub, sub);
op!(inplace Money, SubAssign, sub_assign);
op!(unary Money, Neg, neg);

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented as a currency amount: {0}")]
pub struct MoneyConversionError(String);

impl Money {
    /// Creates a new amount, rounding to 2 decimal places, half-away-from-zero.
    pub fn new(value: Decimal) -> Self {
        Self(value.round_dp_with_strategy(CURRENCY_DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Builds an amount from integer minor units, e.g. `from_minor_units(5000)` is 50.00.
    pub fn from_minor_units(units: i64) -> Self {
        Self(Decimal::new(units, CURRENCY_DECIMAL_PLACES))
    }

    /// The amount in integer minor units (cents). This is the only sanctioned decimal-to-integer
    /// conversion; it is used when talking to the payment gateway.
    pub fn minor_units(&self) -> Result<i64, MoneyConversionError> {
        (self.0 * Decimal::ONE_HUNDRED)
            .to_i64()
            .ok_or_else(|| MoneyConversionError(format!("{} overflows minor units", self.0)))
    }

    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }
}

impl From<Decimal> for Money {
    fn from(value: Decimal) -> Self {
        Self::new(value)
    }
}

impl FromStr for Money {
    type Err = MoneyConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s).map_err(|e| MoneyConversionError(format!("{s}: {e}")))?;
        Ok(Self::new(value))
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rounds_half_away_from_zero_on_construction() {
        let m = Money::from_str("1.025").unwrap();
        assert_eq!(m.to_string(), "1.03");
        let m = Money::from_str("-1.025").unwrap();
        assert_eq!(m.to_string(), "-1.03");
    }

    #[test]
    fn minor_units_round_trip() {
        let m = Money::from_str("50.00").unwrap();
        assert_eq!(m.minor_units().unwrap(), 5000);
        assert_eq!(Money::from_minor_units(5000), m);
    }

    #[test]
    fn arithmetic_stays_in_currency_units() {
        let a = Money::from_str("10.50").unwrap();
        let b = Money::from_str("0.75").unwrap();
        assert_eq!((a + b).to_string(), "11.25");
        assert_eq!((a - b).to_string(), "9.75");
        assert!(a.is_positive());
        assert!(!(a - a).is_positive());
    }
}
