use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::plan::Frequency;

pub trait MinimumPaymentPolicy: Send + Sync {
    /// Per-period floor for `debt_amount`. `None` frequency is priced at the monthly rate.
    fn minimum_payment(&self, frequency: Option<Frequency>, debt_amount: Decimal) -> Decimal;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateTablePolicy {
    pub monthly_rate: Decimal,
    pub biweekly_rate: Decimal,
    pub weekly_rate: Decimal,
}

impl Default for RateTablePolicy {
    fn default() -> Self {
        Self {
            monthly_rate: Decimal::new(8, 2),
            biweekly_rate: Decimal::new(4, 2),
            weekly_rate: Decimal::new(2, 2),
        }
    }
}

impl RateTablePolicy {
    pub fn rate_for(&self, frequency: Option<Frequency>) -> Decimal {
        match frequency {
            Some(Frequency::Weekly) => self.weekly_rate,
            Some(Frequency::Biweekly) => self.biweekly_rate,
            Some(Frequency::Monthly) | None => self.monthly_rate,
        }
    }
}

impl MinimumPaymentPolicy for RateTablePolicy {
    fn minimum_payment(&self, frequency: Option<Frequency>, debt_amount: Decimal) -> Decimal {
        debt_amount.checked_mul(self.rate_for(frequency)).unwrap_or(debt_amount).ceil()
    }
}
