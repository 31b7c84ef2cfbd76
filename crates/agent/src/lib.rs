//! Agent-facing surface of the payment-plan negotiator.
//!
//! The conversational orchestrator never does arithmetic on its own. It reaches the
//! deterministic engine in two ways:
//! 1. **Tool calls** (`tools`): `evaluate_and_negotiate`, `suggest_plan` and `finalize_plan`,
//!    dispatched by name with lenient JSON arguments.
//! 2. **Reply sanitization** (`interceptor`): free-text replies are scanned by the
//!    `extractor`; any implicit payment offer is replaced with an engine-validated plan.
//!
//! `AgentRuntime` ties both to a keyed session store and an audit sink.

pub mod extractor;
pub mod interceptor;
pub mod runtime;
pub mod tools;

pub use extractor::{ExtractionResult, ImplicitOffer, ImplicitOfferExtractor};
pub use interceptor::{InterceptOutcome, OfferInterceptor};
pub use runtime::AgentRuntime;
pub use tools::{Tool, ToolArguments, ToolContext, ToolRegistry};
