//! Platform fee calculation.

use mpg_common::Money;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

//--------------------------------------     FeeSchedule     ---------------------------------------------------------
/// The platform's fee schedule. Built once from configuration and passed by reference into the
/// lifecycle engine; it is never looked up ambiently.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeeSchedule {
    rate: Decimal,
}

impl FeeSchedule {
    pub fn new(rate: Decimal) -> Self {
        Self { rate }
    }

    /// The reference fee rate of 10%.
    pub fn standard() -> Self {
        Self { rate: Decimal::new(10, 2) }
    }

    pub fn rate(&self) -> Decimal {
        self.rate
    }

    /// Splits an order total into the platform fee and the amount transferred to the provider.
    ///
    /// The fee is `total * rate`, rounded to 2 decimal places half-away-from-zero. The net amount
    /// equals the total: the gateway performs the actual split at settlement and this system only
    /// declares the fee on the payment intent.
    ///
    /// Pure and deterministic. The total must be positive; that is the caller's responsibility.
    pub fn compute_split(&self, total: Money) -> FeeSplit {
        let platform_fee = Money::new(total.value() * self.rate);
        FeeSplit { platform_fee, net_to_provider: total }
    }
}

//--------------------------------------       FeeSplit      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeeSplit {
    pub platform_fee: Money,
    pub net_to_provider: Money,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ten_percent_of_fifty_dollars_is_five() {
        let split = FeeSchedule::standard().compute_split("50.00".parse().unwrap());
        assert_eq!(split.platform_fee, "5.00".parse().unwrap());
        assert_eq!(split.net_to_provider, "50.00".parse().unwrap());
    }

    #[test]
    fn fee_rounds_half_away_from_zero() {
        // 10.25 * 0.10 = 1.025, which rounds up to 1.03 (banker's rounding would give 1.02)
        let split = FeeSchedule::standard().compute_split("10.25".parse().unwrap());
        assert_eq!(split.platform_fee, "1.03".parse().unwrap());
    }

    #[test]
    fn split_is_deterministic() {
        let schedule = FeeSchedule::new(Decimal::new(15, 2));
        let total = "33.33".parse().unwrap();
        assert_eq!(schedule.compute_split(total), schedule.compute_split(total));
    }
}
