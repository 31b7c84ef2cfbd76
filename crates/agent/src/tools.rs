use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use payplan_core::domain::conversation::{ConversationId, NegotiationState};
use payplan_core::domain::plan::{DebtorDetails, PlanProposal};
use payplan_core::errors::ApplicationError;
use payplan_core::negotiation::{ChatResponse, MinimumPaymentPolicy, NegotiationEngine};
use payplan_core::session::SessionStore;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

pub const EVALUATE_AND_NEGOTIATE: &str = "evaluate_and_negotiate";
pub const SUGGEST_PLAN: &str = "suggest_plan";
pub const FINALIZE_PLAN: &str = "finalize_plan";

/// The conversation a tool call runs against.
#[derive(Clone, Copy)]
pub struct ToolContext<'a> {
    pub conversation_id: &'a ConversationId,
    pub sessions: &'a SessionStore,
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    async fn execute(&self, context: ToolContext<'_>, input: Value) -> Result<Value>;
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn register<T>(&mut self, tool: T)
    where
        T: Tool + 'static,
    {
        self.tools.insert(tool.name().to_string(), Box::new(tool));
    }

    pub async fn dispatch(
        &self,
        name: &str,
        context: ToolContext<'_>,
        input: Value,
    ) -> Result<Value> {
        let tool =
            self.tools.get(name).ok_or_else(|| ApplicationError::UnknownTool(name.to_string()))?;
        tool.execute(context, input).await
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Arguments shared by the negotiation tools. Every field is optional; anything that fails to
/// parse is replaced by the empty payload so the engine's own validation decides the outcome.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ToolArguments {
    pub proposal: Option<PlanProposal>,
    pub plan: Option<PlanProposal>,
    pub situation: String,
    pub message: String,
    pub user_details: DebtorDetails,
}

impl ToolArguments {
    pub fn parse(tool: &str, input: Value) -> Self {
        let input = match input {
            Value::String(raw) => match serde_json::from_str::<Value>(&raw) {
                Ok(decoded) => decoded,
                Err(error) => {
                    warn!(
                        event_name = "tool.arguments_malformed",
                        tool,
                        error = %error,
                        "tool arguments are not valid json; using empty payload"
                    );
                    return Self::default();
                }
            },
            Value::Null => return Self::default(),
            other => other,
        };

        serde_json::from_value(input).unwrap_or_else(|error| {
            warn!(
                event_name = "tool.arguments_malformed",
                tool,
                error = %error,
                "tool arguments do not match the expected shape; using empty payload"
            );
            Self::default()
        })
    }

    /// The plan under discussion; `proposal` and `plan` are accepted interchangeably.
    pub fn proposal(&self) -> PlanProposal {
        self.proposal.clone().or_else(|| self.plan.clone()).unwrap_or_default()
    }
}

fn run_engine<F>(context: ToolContext<'_>, apply: F) -> Result<Value>
where
    F: FnOnce(&mut NegotiationState) -> ChatResponse,
{
    let response = context.sessions.with_state(context.conversation_id, apply)?;
    Ok(serde_json::to_value(response)?)
}

pub struct EvaluateAndNegotiateTool<P> {
    engine: Arc<NegotiationEngine<P>>,
}

impl<P> EvaluateAndNegotiateTool<P> {
    pub fn new(engine: Arc<NegotiationEngine<P>>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl<P> Tool for EvaluateAndNegotiateTool<P>
where
    P: MinimumPaymentPolicy + 'static,
{
    fn name(&self) -> &'static str {
        EVALUATE_AND_NEGOTIATE
    }

    async fn execute(&self, context: ToolContext<'_>, input: Value) -> Result<Value> {
        let arguments = ToolArguments::parse(self.name(), input);
        let proposal = arguments.proposal();
        run_engine(context, |state| {
            self.engine.evaluate_and_negotiate(state, &proposal, &arguments.situation)
        })
    }
}

pub struct SuggestPlanTool<P> {
    engine: Arc<NegotiationEngine<P>>,
}

impl<P> SuggestPlanTool<P> {
    pub fn new(engine: Arc<NegotiationEngine<P>>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl<P> Tool for SuggestPlanTool<P>
where
    P: MinimumPaymentPolicy + 'static,
{
    fn name(&self) -> &'static str {
        SUGGEST_PLAN
    }

    async fn execute(&self, context: ToolContext<'_>, input: Value) -> Result<Value> {
        let arguments = ToolArguments::parse(self.name(), input);
        let proposal = arguments.proposal();
        run_engine(context, |state| {
            self.engine.suggest_plan(state, &proposal, &arguments.situation, &arguments.message)
        })
    }
}

pub struct FinalizePlanTool<P> {
    engine: Arc<NegotiationEngine<P>>,
}

impl<P> FinalizePlanTool<P> {
    pub fn new(engine: Arc<NegotiationEngine<P>>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl<P> Tool for FinalizePlanTool<P>
where
    P: MinimumPaymentPolicy + 'static,
{
    fn name(&self) -> &'static str {
        FINALIZE_PLAN
    }

    async fn execute(&self, context: ToolContext<'_>, input: Value) -> Result<Value> {
        let arguments = ToolArguments::parse(self.name(), input);
        let plan = arguments.proposal();
        run_engine(context, |state| {
            self.engine.finalize_plan(state, &plan, &arguments.user_details, &arguments.message)
        })
    }
}

/// Registry holding the three negotiation tools bound to one engine.
pub fn negotiation_tools<P>(engine: Arc<NegotiationEngine<P>>) -> ToolRegistry
where
    P: MinimumPaymentPolicy + 'static,
{
    let mut registry = ToolRegistry::default();
    registry.register(EvaluateAndNegotiateTool::new(Arc::clone(&engine)));
    registry.register(SuggestPlanTool::new(Arc::clone(&engine)));
    registry.register(FinalizePlanTool::new(engine));
    registry
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use payplan_core::domain::conversation::ConversationId;
    use payplan_core::errors::ApplicationError;
    use payplan_core::negotiation::NegotiationEngine;
    use payplan_core::session::SessionStore;
    use rust_decimal::Decimal;
    use serde_json::json;

    use super::{negotiation_tools, ToolArguments, ToolContext};

    fn open_store(id: &ConversationId) -> SessionStore {
        let store = SessionStore::new(Decimal::from(2400));
        store.open(id.clone(), None).expect("open conversation");
        store
    }

    #[test]
    fn registry_exposes_three_tools() {
        let registry = negotiation_tools(Arc::new(NegotiationEngine::default()));
        assert_eq!(registry.len(), 3);
        assert_eq!(
            registry.names(),
            vec!["evaluate_and_negotiate", "finalize_plan", "suggest_plan"]
        );
    }

    #[test]
    fn string_encoded_arguments_are_decoded() {
        let arguments = ToolArguments::parse(
            "suggest_plan",
            json!(r#"{"plan":{"frequency":"weekly","amount":25,"termLength":48},"message":"hi"}"#),
        );
        let proposal = arguments.proposal();
        assert_eq!(proposal.frequency, "weekly");
        assert_eq!(proposal.term_length, 48);
        assert_eq!(arguments.message, "hi");
    }

    #[test]
    fn malformed_arguments_become_empty_payload() {
        let arguments = ToolArguments::parse("evaluate_and_negotiate", json!([1, 2, 3]));
        assert!(arguments.proposal.is_none());
        assert!(arguments.situation.is_empty());
        assert_eq!(arguments.proposal().frequency, "");
    }

    #[tokio::test]
    async fn evaluate_tool_counters_short_plan() {
        let id = ConversationId::new("conv-tool");
        let store = open_store(&id);
        let registry = negotiation_tools(Arc::new(NegotiationEngine::default()));

        let output = registry
            .dispatch(
                "evaluate_and_negotiate",
                ToolContext { conversation_id: &id, sessions: &store },
                json!({"proposal": {"frequency": "monthly", "amount": 50, "termLength": 12}}),
            )
            .await
            .expect("tool output");

        assert_eq!(output["displayKind"], "paymentPlans");
        assert_eq!(output["assessment"]["outcome"], "countered");
        assert_eq!(output["plans"][0]["termLength"], 10);
        assert_eq!(store.snapshot(&id).expect("state").stage(), 1);
    }

    #[tokio::test]
    async fn malformed_payload_still_yields_fallback_plan() {
        let id = ConversationId::new("conv-malformed");
        let store = open_store(&id);
        let registry = negotiation_tools(Arc::new(NegotiationEngine::default()));

        let output = registry
            .dispatch(
                "evaluate_and_negotiate",
                ToolContext { conversation_id: &id, sessions: &store },
                json!("not json at all"),
            )
            .await
            .expect("tool output");

        assert_eq!(output["assessment"]["outcome"], "fallback_applied");
        assert_eq!(output["plans"][0]["frequency"], "monthly");
        assert_eq!(output["plans"][0]["termLength"], 6);
    }

    #[tokio::test]
    async fn overflowing_amount_still_yields_a_plan() {
        let id = ConversationId::new("conv-overflow");
        let store = open_store(&id);
        let registry = negotiation_tools(Arc::new(NegotiationEngine::default()));

        let output = registry
            .dispatch(
                "evaluate_and_negotiate",
                ToolContext { conversation_id: &id, sessions: &store },
                json!({"proposal": {
                    "frequency": "monthly",
                    "amount": "70000000000000000000000000000",
                    "termLength": 12
                }}),
            )
            .await
            .expect("tool output");

        assert_eq!(output["assessment"]["outcome"], "countered");
        assert_eq!(output["plans"][0]["termLength"], 1);
        assert!(store.snapshot(&id).is_some());
    }

    #[tokio::test]
    async fn unknown_tool_is_rejected() {
        let id = ConversationId::new("conv-unknown");
        let store = open_store(&id);
        let registry = negotiation_tools(Arc::new(NegotiationEngine::default()));

        let error = registry
            .dispatch(
                "waive_debt",
                ToolContext { conversation_id: &id, sessions: &store },
                json!({}),
            )
            .await
            .expect_err("unknown tool");

        assert_eq!(
            error.downcast_ref::<ApplicationError>(),
            Some(&ApplicationError::UnknownTool("waive_debt".to_string()))
        );
    }
}
