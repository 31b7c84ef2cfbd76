use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use rust_decimal::Decimal;
use tracing::debug;

use crate::domain::conversation::{ConversationId, NegotiationState};
use crate::errors::{ApplicationError, DomainError};

/// Negotiation state keyed by conversation.
///
/// Each conversation owns its own stage counter and debt; calls for one conversation are
/// serialized by the store lock.
#[derive(Clone)]
pub struct SessionStore {
    default_debt: Decimal,
    sessions: Arc<Mutex<HashMap<ConversationId, NegotiationState>>>,
}

impl SessionStore {
    pub fn new(default_debt: Decimal) -> Self {
        Self { default_debt, sessions: Arc::new(Mutex::new(HashMap::new())) }
    }

    pub fn default_debt(&self) -> Decimal {
        self.default_debt
    }

    /// Starts a negotiation. Reopening an active conversation returns its existing state; the
    /// debt amount of a running negotiation is never replaced.
    pub fn open(
        &self,
        conversation_id: ConversationId,
        debt_amount: Option<Decimal>,
    ) -> Result<NegotiationState, DomainError> {
        let mut sessions = self.lock();
        if let Some(existing) = sessions.get(&conversation_id) {
            debug!(
                event_name = "session.reopened",
                conversation_id = %conversation_id,
                stage = existing.stage(),
                "conversation already active"
            );
            return Ok(existing.clone());
        }

        let state = NegotiationState::new(
            conversation_id.clone(),
            debt_amount.unwrap_or(self.default_debt),
        )?;
        debug!(
            event_name = "session.opened",
            conversation_id = %conversation_id,
            debt_amount = %state.debt_amount(),
            "conversation opened"
        );
        sessions.insert(conversation_id, state.clone());
        Ok(state)
    }

    pub fn with_state<R>(
        &self,
        conversation_id: &ConversationId,
        apply: impl FnOnce(&mut NegotiationState) -> R,
    ) -> Result<R, ApplicationError> {
        let mut sessions = self.lock();
        let state = sessions
            .get_mut(conversation_id)
            .ok_or_else(|| ApplicationError::UnknownConversation(conversation_id.clone()))?;
        Ok(apply(state))
    }

    pub fn snapshot(&self, conversation_id: &ConversationId) -> Option<NegotiationState> {
        self.lock().get(conversation_id).cloned()
    }

    pub fn close(&self, conversation_id: &ConversationId) -> Option<NegotiationState> {
        self.lock().remove(conversation_id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ConversationId, NegotiationState>> {
        match self.sessions.lock() {
            Ok(sessions) => sessions,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::SessionStore;
    use crate::domain::conversation::ConversationId;
    use crate::domain::plan::PlanProposal;
    use crate::errors::ApplicationError;
    use crate::negotiation::NegotiationEngine;

    #[test]
    fn open_uses_default_debt_and_is_idempotent() {
        let store = SessionStore::new(Decimal::from(2400));
        let id = ConversationId::new("conv-a");

        let opened = store.open(id.clone(), None).expect("open");
        assert_eq!(opened.debt_amount(), Decimal::from(2400));

        let reopened = store.open(id, Some(Decimal::from(99))).expect("reopen");
        assert_eq!(reopened.debt_amount(), Decimal::from(2400));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn conversations_do_not_share_stage_or_debt() {
        let engine = NegotiationEngine::default();
        let store = SessionStore::new(Decimal::from(2400));
        let first = ConversationId::new("conv-first");
        let second = ConversationId::new("conv-second");
        store.open(first.clone(), None).expect("open first");
        store.open(second.clone(), Some(Decimal::from(1200))).expect("open second");

        let proposal = PlanProposal::new("monthly", Decimal::from(50), 12);
        for _ in 0..3 {
            store
                .with_state(&first, |state| engine.evaluate_and_negotiate(state, &proposal, ""))
                .expect("first conversation");
        }

        let first_state = store.snapshot(&first).expect("first snapshot");
        let second_state = store.snapshot(&second).expect("second snapshot");
        assert_eq!(first_state.stage(), 3);
        assert_eq!(second_state.stage(), 0);
        assert_eq!(second_state.debt_amount(), Decimal::from(1200));
    }

    #[test]
    fn unknown_conversation_is_an_error() {
        let store = SessionStore::new(Decimal::from(2400));
        let missing = ConversationId::new("conv-missing");

        let error = store.with_state(&missing, |state| state.stage()).expect_err("missing");
        assert_eq!(error, ApplicationError::UnknownConversation(missing));
    }

    #[test]
    fn invalid_debt_is_rejected_on_open() {
        let store = SessionStore::new(Decimal::from(2400));
        assert!(store.open(ConversationId::new("conv-bad"), Some(Decimal::from(-1))).is_err());
        assert!(store.is_empty());
    }
}
