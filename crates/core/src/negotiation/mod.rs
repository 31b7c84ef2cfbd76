//! Deterministic payment-plan negotiation.
//!
//! Every number that reaches a debtor passes through these rules. Proposals from either side
//! of the conversation are validated, reconciled against the outstanding balance, or replaced
//! with a counter-offer; finalization is the one place the minimum-payment floor is enforced
//! without exception.

pub mod engine;
pub mod link;
pub mod math;
pub mod policy;
pub mod response;

pub use engine::{NegotiationEngine, NegotiationSettings};
pub use link::PaymentLinkBuilder;
pub use math::{covers_debt, escalate, reconcile_term, split_installments, InstallmentSplit};
pub use policy::{MinimumPaymentPolicy, RateTablePolicy};
pub use response::{Assessment, ChatResponse, CounterReason, DisplayKind, FallbackReason};
