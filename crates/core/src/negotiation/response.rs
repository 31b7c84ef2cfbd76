use serde::{Deserialize, Serialize};

use crate::domain::plan::{FinalPaymentPlan, PaymentPlan};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DisplayKind {
    Text,
    PaymentPlans,
    FinalPlan,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterReason {
    DoesNotCoverDebt,
    BelowMinimumPayment,
    TermMismatch,
    EarlyStageFloor,
    HardshipFloor,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    UnknownFrequency,
    NonPositiveAmount,
    NonPositiveTerm,
    /// The amount is positive but too small to cover the balance in a countable term.
    TermOutOfRange,
}

/// How the engine arrived at a response. Lets callers tell a genuinely valid proposal apart
/// from one that was corrected or rescued.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum Assessment {
    Accepted,
    Countered(CounterReason),
    FallbackApplied(FallbackReason),
    Refused,
    Finalized,
}

impl Assessment {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Countered(_) => "countered",
            Self::FallbackApplied(_) => "fallback_applied",
            Self::Refused => "refused",
            Self::Finalized => "finalized",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub message: String,
    pub display_kind: DisplayKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plans: Option<Vec<PaymentPlan>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_plan: Option<FinalPaymentPlan>,
    pub assessment: Assessment,
}

impl ChatResponse {
    pub fn text(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            display_kind: DisplayKind::Text,
            plans: None,
            final_plan: None,
            assessment: Assessment::Accepted,
        }
    }

    pub fn plans(message: impl Into<String>, plan: PaymentPlan, assessment: Assessment) -> Self {
        Self {
            message: message.into(),
            display_kind: DisplayKind::PaymentPlans,
            plans: Some(vec![plan]),
            final_plan: None,
            assessment,
        }
    }

    pub fn finalized(message: impl Into<String>, final_plan: FinalPaymentPlan) -> Self {
        Self {
            message: message.into(),
            display_kind: DisplayKind::FinalPlan,
            plans: None,
            final_plan: Some(final_plan),
            assessment: Assessment::Finalized,
        }
    }

    pub fn first_plan(&self) -> Option<&PaymentPlan> {
        self.plans.as_ref().and_then(|plans| plans.first())
    }

    pub fn is_terminal(&self) -> bool {
        self.display_kind == DisplayKind::FinalPlan
    }
}
