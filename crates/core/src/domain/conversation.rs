use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-conversation negotiation record.
///
/// The debt amount is fixed at construction. `stage` counts accepted proposals and
/// counter-offers since the last finalized agreement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NegotiationState {
    conversation_id: ConversationId,
    debt_amount: Decimal,
    stage: u32,
}

impl NegotiationState {
    pub fn new(conversation_id: ConversationId, debt_amount: Decimal) -> Result<Self, DomainError> {
        if debt_amount <= Decimal::ZERO {
            return Err(DomainError::InvalidDebtAmount(debt_amount));
        }
        Ok(Self { conversation_id, debt_amount, stage: 0 })
    }

    pub fn conversation_id(&self) -> &ConversationId {
        &self.conversation_id
    }

    pub fn debt_amount(&self) -> Decimal {
        self.debt_amount
    }

    pub fn stage(&self) -> u32 {
        self.stage
    }

    pub(crate) fn advance(&mut self) -> u32 {
        self.stage = self.stage.saturating_add(1);
        self.stage
    }

    pub(crate) fn reset(&mut self) {
        self.stage = 0;
    }

    /// Restores a previously observed stage, e.g. when an operator replays a conversation.
    pub fn with_stage(mut self, stage: u32) -> Self {
        self.stage = stage;
        self
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{ConversationId, NegotiationState};
    use crate::errors::DomainError;

    #[test]
    fn rejects_non_positive_debt() {
        let error = NegotiationState::new(ConversationId::new("c-1"), Decimal::ZERO)
            .expect_err("zero debt should be rejected");
        assert_eq!(error, DomainError::InvalidDebtAmount(Decimal::ZERO));
    }

    #[test]
    fn stage_advances_and_resets() {
        let mut state = NegotiationState::new(ConversationId::new("c-2"), Decimal::from(2400))
            .expect("valid state");
        assert_eq!(state.stage(), 0);
        assert_eq!(state.advance(), 1);
        assert_eq!(state.advance(), 2);
        state.reset();
        assert_eq!(state.stage(), 0);
        assert_eq!(state.debt_amount(), Decimal::from(2400));
    }
}
