use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Weekly,
    Biweekly,
    Monthly,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Biweekly => "biweekly",
            Self::Monthly => "monthly",
        }
    }

    /// Singular period noun used in user-facing messages.
    pub fn period_noun(&self) -> &'static str {
        match self {
            Self::Weekly => "week",
            Self::Biweekly => "two weeks",
            Self::Monthly => "month",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "weekly" => Ok(Self::Weekly),
            "biweekly" | "bi-weekly" => Ok(Self::Biweekly),
            "monthly" => Ok(Self::Monthly),
            other => Err(DomainError::UnknownFrequency(other.to_string())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPlan {
    pub frequency: Frequency,
    pub amount: Decimal,
    pub term_length: u32,
    pub total_amount: Decimal,
    /// Last installment, present only when it differs from `amount`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_amount: Option<Decimal>,
}

impl PaymentPlan {
    pub fn new(
        frequency: Frequency,
        amount: Decimal,
        term_length: u32,
        total_amount: Decimal,
    ) -> Self {
        Self { frequency, amount, term_length, total_amount, final_amount: None }
    }

    /// `amount * term_length`, or `None` when the product overflows.
    pub fn scheduled_total(&self) -> Option<Decimal> {
        self.amount.checked_mul(Decimal::from(self.term_length))
    }

    pub fn is_balanced(&self) -> bool {
        self.scheduled_total() == Some(self.total_amount)
    }
}

/// Untrusted plan shape as delivered by the orchestrator's tool calls.
///
/// Every field defaults so that a malformed payload still deserializes into something the
/// engine can rescue with a counter-offer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlanProposal {
    pub frequency: String,
    pub amount: Decimal,
    pub term_length: i64,
    pub total_amount: Option<Decimal>,
}

impl PlanProposal {
    pub fn new(frequency: impl Into<String>, amount: Decimal, term_length: i64) -> Self {
        Self { frequency: frequency.into(), amount, term_length, total_amount: None }
    }

    pub fn with_total(mut self, total_amount: Decimal) -> Self {
        self.total_amount = Some(total_amount);
        self
    }

    pub fn parsed_frequency(&self) -> Option<Frequency> {
        self.frequency.parse().ok()
    }

    pub fn scheduled_total(&self) -> Option<Decimal> {
        self.amount.checked_mul(Decimal::from(self.term_length))
    }
}

impl From<&PaymentPlan> for PlanProposal {
    fn from(plan: &PaymentPlan) -> Self {
        Self {
            frequency: plan.frequency.as_str().to_string(),
            amount: plan.amount,
            term_length: i64::from(plan.term_length),
            total_amount: Some(plan.total_amount),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DebtorDetails {
    pub name: Option<String>,
    pub email: Option<String>,
    pub account_reference: Option<String>,
}

impl DebtorDetails {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.account_reference.is_none()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalPaymentPlan {
    #[serde(flatten)]
    pub plan: PaymentPlan,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_link: Option<String>,
    pub agreed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{Frequency, PaymentPlan, PlanProposal};
    use crate::errors::DomainError;

    #[test]
    fn frequency_parses_case_insensitively() {
        assert_eq!("Monthly".parse::<Frequency>(), Ok(Frequency::Monthly));
        assert_eq!(" WEEKLY ".parse::<Frequency>(), Ok(Frequency::Weekly));
        assert_eq!("bi-weekly".parse::<Frequency>(), Ok(Frequency::Biweekly));
        assert_eq!(
            "daily".parse::<Frequency>(),
            Err(DomainError::UnknownFrequency("daily".to_string()))
        );
    }

    #[test]
    fn plan_serializes_with_camel_case_fields() {
        let plan = PaymentPlan::new(Frequency::Weekly, Decimal::from(25), 48, Decimal::from(1200));
        let value = serde_json::to_value(&plan).expect("serialize plan");

        assert_eq!(value["frequency"], "weekly");
        assert_eq!(value["termLength"], 48);
        assert!(value.get("finalAmount").is_none());
        assert!(plan.is_balanced());
    }

    #[test]
    fn scheduled_total_reports_overflow() {
        let proposal = PlanProposal::new("monthly", Decimal::MAX, 2);
        assert_eq!(proposal.scheduled_total(), None);

        let plan = PaymentPlan::new(Frequency::Monthly, Decimal::MAX, 2, Decimal::MAX);
        assert_eq!(plan.scheduled_total(), None);
        assert!(!plan.is_balanced());
        assert_eq!(
            PlanProposal::new("weekly", Decimal::from(25), 48).scheduled_total(),
            Some(Decimal::from(1200))
        );
    }

    #[test]
    fn malformed_proposal_fields_fall_back_to_defaults() {
        let proposal: PlanProposal =
            serde_json::from_value(serde_json::json!({ "amount": 300 })).expect("lenient parse");

        assert_eq!(proposal.amount, Decimal::from(300));
        assert_eq!(proposal.term_length, 0);
        assert!(proposal.parsed_frequency().is_none());
    }
}
