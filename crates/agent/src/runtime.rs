use std::sync::Arc;

use anyhow::Result;
use payplan_core::audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink};
use payplan_core::config::AppConfig;
use payplan_core::domain::conversation::{ConversationId, NegotiationState};
use payplan_core::errors::ApplicationError;
use payplan_core::negotiation::{
    Assessment, ChatResponse, MinimumPaymentPolicy, NegotiationEngine, RateTablePolicy,
};
use payplan_core::session::SessionStore;
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::interceptor::{InterceptOutcome, OfferInterceptor};
use crate::tools::{negotiation_tools, ToolContext, ToolRegistry};

const ACTOR: &str = "agent-runtime";

/// Owns per-conversation negotiation state and routes every tool call and assistant reply
/// through the deterministic engine.
pub struct AgentRuntime<P = RateTablePolicy> {
    engine: Arc<NegotiationEngine<P>>,
    sessions: SessionStore,
    tools: ToolRegistry,
    interceptor: OfferInterceptor,
    audit: Arc<dyn AuditSink>,
}

impl AgentRuntime<RateTablePolicy> {
    pub fn from_config(config: &AppConfig, audit: Arc<dyn AuditSink>) -> Self {
        Self::new(config.engine(), config.session_store(), audit)
    }
}

impl<P> AgentRuntime<P>
where
    P: MinimumPaymentPolicy + 'static,
{
    pub fn new(
        engine: NegotiationEngine<P>,
        sessions: SessionStore,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        let engine = Arc::new(engine);
        let tools = negotiation_tools(Arc::clone(&engine));
        Self { engine, sessions, tools, interceptor: OfferInterceptor::default(), audit }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.names()
    }

    pub fn open_conversation(
        &self,
        conversation_id: ConversationId,
        debt_amount: Option<Decimal>,
    ) -> Result<NegotiationState, ApplicationError> {
        let correlation_id = new_correlation_id();
        let state = match self.sessions.open(conversation_id.clone(), debt_amount) {
            Ok(state) => state,
            Err(error) => {
                self.audit.emit(
                    AuditEvent::new(
                        Some(conversation_id),
                        correlation_id,
                        "session.open_failed",
                        AuditCategory::Session,
                        ACTOR,
                        AuditOutcome::Failed,
                    )
                    .with_metadata("error", error.to_string()),
                );
                return Err(error.into());
            }
        };

        info!(
            event_name = "runtime.conversation_opened",
            correlation_id = %correlation_id,
            conversation_id = %conversation_id,
            debt_amount = %state.debt_amount(),
            stage = state.stage(),
            "conversation ready for negotiation"
        );
        self.audit.emit(
            AuditEvent::new(
                Some(conversation_id),
                correlation_id,
                "session.opened",
                AuditCategory::Session,
                ACTOR,
                AuditOutcome::Success,
            )
            .with_metadata("debt_amount", state.debt_amount().to_string()),
        );
        Ok(state)
    }

    /// Runs one orchestrator tool call. The returned value is the serialized `ChatResponse`.
    pub async fn handle_tool_call(
        &self,
        conversation_id: &ConversationId,
        tool_name: &str,
        arguments: Value,
    ) -> Result<Value> {
        let correlation_id = new_correlation_id();
        let context = ToolContext { conversation_id, sessions: &self.sessions };

        let output = match self.tools.dispatch(tool_name, context, arguments).await {
            Ok(output) => output,
            Err(error) => {
                warn!(
                    event_name = "runtime.tool_call_failed",
                    correlation_id = %correlation_id,
                    conversation_id = %conversation_id,
                    tool = tool_name,
                    error = %error,
                    "tool call failed"
                );
                self.audit.emit(
                    AuditEvent::new(
                        Some(conversation_id.clone()),
                        correlation_id,
                        "negotiation.tool_failed",
                        AuditCategory::Negotiation,
                        ACTOR,
                        AuditOutcome::Failed,
                    )
                    .with_metadata("tool", tool_name)
                    .with_metadata("error", error.to_string()),
                );
                return Err(error);
            }
        };

        let response: ChatResponse = serde_json::from_value(output.clone())?;
        let stage = self.stage_of(conversation_id);
        info!(
            event_name = "runtime.tool_call_completed",
            correlation_id = %correlation_id,
            conversation_id = %conversation_id,
            tool = tool_name,
            assessment = response.assessment.label(),
            stage,
            "tool call completed"
        );

        let (category, outcome) = classify(&response.assessment);
        let mut event = AuditEvent::new(
            Some(conversation_id.clone()),
            correlation_id,
            format!("negotiation.{tool_name}"),
            category,
            ACTOR,
            outcome,
        )
        .with_metadata("assessment", response.assessment.label())
        .with_metadata("stage", stage.to_string());
        if let Some(plan) = response.first_plan() {
            event = event
                .with_metadata("amount", plan.amount.to_string())
                .with_metadata("term_length", plan.term_length.to_string());
        }
        if let Some(final_plan) = &response.final_plan {
            event = event.with_metadata("term_length", final_plan.plan.term_length.to_string());
        }
        self.audit.emit(event);

        Ok(output)
    }

    /// Screens an assistant reply before it reaches the debtor.
    pub fn sanitize_reply(
        &self,
        conversation_id: &ConversationId,
        text: &str,
    ) -> Result<InterceptOutcome, ApplicationError> {
        let correlation_id = new_correlation_id();
        let outcome = self.sessions.with_state(conversation_id, |state| {
            self.interceptor.intercept(self.engine.as_ref(), state, text)
        })?;

        let (event_type, audit_outcome) = match &outcome {
            InterceptOutcome::PassThrough(_) => ("sanitization.passed", AuditOutcome::Success),
            InterceptOutcome::Replace(_) => ("sanitization.replaced", AuditOutcome::Corrected),
        };
        info!(
            event_name = "runtime.reply_sanitized",
            correlation_id = %correlation_id,
            conversation_id = %conversation_id,
            replaced = outcome.is_replaced(),
            "assistant reply screened"
        );
        let mut event = AuditEvent::new(
            Some(conversation_id.clone()),
            correlation_id,
            event_type,
            AuditCategory::Sanitization,
            ACTOR,
            audit_outcome,
        );
        if let InterceptOutcome::Replace(response) = &outcome {
            event = event.with_metadata("assessment", response.assessment.label());
        }
        self.audit.emit(event);

        Ok(outcome)
    }

    pub fn close_conversation(&self, conversation_id: &ConversationId) -> Option<NegotiationState> {
        let closed = self.sessions.close(conversation_id);
        let correlation_id = new_correlation_id();
        info!(
            event_name = "runtime.conversation_closed",
            correlation_id = %correlation_id,
            conversation_id = %conversation_id,
            was_open = closed.is_some(),
            "conversation closed"
        );
        self.audit.emit(AuditEvent::new(
            Some(conversation_id.clone()),
            correlation_id,
            "session.closed",
            AuditCategory::Session,
            ACTOR,
            if closed.is_some() { AuditOutcome::Success } else { AuditOutcome::Rejected },
        ));
        closed
    }

    fn stage_of(&self, conversation_id: &ConversationId) -> u32 {
        self.sessions.snapshot(conversation_id).map(|state| state.stage()).unwrap_or_default()
    }
}

fn classify(assessment: &Assessment) -> (AuditCategory, AuditOutcome) {
    match assessment {
        Assessment::Accepted => (AuditCategory::Negotiation, AuditOutcome::Success),
        Assessment::Countered(_) | Assessment::FallbackApplied(_) => {
            (AuditCategory::Negotiation, AuditOutcome::Corrected)
        }
        Assessment::Refused => (AuditCategory::Finalization, AuditOutcome::Rejected),
        Assessment::Finalized => (AuditCategory::Finalization, AuditOutcome::Success),
    }
}

fn new_correlation_id() -> String {
    format!("req-{}", Uuid::new_v4())
}
