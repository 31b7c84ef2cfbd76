pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod negotiation;
pub mod session;

pub use audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink, InMemoryAuditSink};
pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use domain::conversation::{ConversationId, NegotiationState};
pub use domain::plan::{DebtorDetails, FinalPaymentPlan, Frequency, PaymentPlan, PlanProposal};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use negotiation::{
    Assessment, ChatResponse, CounterReason, DisplayKind, FallbackReason, MinimumPaymentPolicy,
    NegotiationEngine, NegotiationSettings, PaymentLinkBuilder, RateTablePolicy,
};
pub use session::SessionStore;
