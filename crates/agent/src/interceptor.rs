use payplan_core::domain::conversation::NegotiationState;
use payplan_core::negotiation::{ChatResponse, MinimumPaymentPolicy, NegotiationEngine};
use tracing::info;

use crate::extractor::ImplicitOfferExtractor;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InterceptOutcome {
    PassThrough(String),
    Replace(ChatResponse),
}

impl InterceptOutcome {
    pub fn is_replaced(&self) -> bool {
        matches!(self, Self::Replace(_))
    }

    /// Response to show the debtor; pass-through text is wrapped as plain text.
    pub fn into_response(self) -> ChatResponse {
        match self {
            Self::PassThrough(text) => ChatResponse::text(text),
            Self::Replace(response) => response,
        }
    }
}

/// Sanitization boundary for assistant replies. Any payment plan stated in free text is routed
/// through `suggest_plan` before the debtor sees it; the original wording survives only when the
/// engine accepts the plan unchanged.
#[derive(Clone, Debug, Default)]
pub struct OfferInterceptor {
    extractor: ImplicitOfferExtractor,
}

impl OfferInterceptor {
    pub fn new(extractor: ImplicitOfferExtractor) -> Self {
        Self { extractor }
    }

    pub fn intercept<P>(
        &self,
        engine: &NegotiationEngine<P>,
        state: &mut NegotiationState,
        raw_text: &str,
    ) -> InterceptOutcome
    where
        P: MinimumPaymentPolicy,
    {
        let extraction = self.extractor.extract(raw_text, state.debt_amount());
        let Some(offer) = extraction.offer else {
            return InterceptOutcome::PassThrough(raw_text.to_string());
        };

        let response = engine.suggest_plan(state, &offer.to_proposal(), "", raw_text);
        info!(
            event_name = "sanitization.implicit_offer_replaced",
            conversation_id = %state.conversation_id(),
            stage = state.stage(),
            frequency = %offer.plan.frequency,
            term_inferred = offer.term_inferred,
            assessment = response.assessment.label(),
            "implicit payment offer routed through negotiation engine"
        );
        InterceptOutcome::Replace(response)
    }
}
