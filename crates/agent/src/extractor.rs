use std::str::FromStr;
use std::sync::OnceLock;

use payplan_core::domain::plan::{Frequency, PaymentPlan, PlanProposal};
use payplan_core::negotiation::reconcile_term;
use regex::Regex;
use rust_decimal::Decimal;
use serde::Serialize;

static AMOUNT_RE: OnceLock<Regex> = OnceLock::new();
static FREQUENCY_RE: OnceLock<Regex> = OnceLock::new();
static TERM_RE: OnceLock<Regex> = OnceLock::new();

fn amount_re() -> &'static Regex {
    AMOUNT_RE.get_or_init(|| {
        Regex::new(r"\$\s*(\d{1,3}(?:,\d{3})+|\d+)(?:\.(\d{1,2}))?").expect("valid amount regex")
    })
}

fn frequency_re() -> &'static Regex {
    FREQUENCY_RE.get_or_init(|| {
        Regex::new(r"(?i)\b(bi-?weekly|weekly|monthly)\b").expect("valid frequency regex")
    })
}

fn term_re() -> &'static Regex {
    TERM_RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:for|over)\s+(\d+)\s+(?:weeks?|months?|payments?|installments?)\b")
            .expect("valid term regex")
    })
}

/// A plan the assistant put into words without going through the engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImplicitOffer {
    pub plan: PaymentPlan,
    /// True when no term phrase was present and the term was derived from the debt.
    pub term_inferred: bool,
}

impl ImplicitOffer {
    pub fn to_proposal(&self) -> PlanProposal {
        PlanProposal::from(&self.plan)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offer: Option<ImplicitOffer>,
}

impl ExtractionResult {
    fn not_found() -> Self {
        Self { found: false, offer: None }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ImplicitOfferExtractor;

impl ImplicitOfferExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Finds the first dollar amount and frequency keyword in `text`. Both must be present for a
    /// candidate; the term phrase is optional.
    pub fn extract(&self, text: &str, debt_amount: Decimal) -> ExtractionResult {
        let Some(amount) = extract_amount(text) else {
            return ExtractionResult::not_found();
        };
        let Some(frequency) = extract_frequency(text) else {
            return ExtractionResult::not_found();
        };

        let (term_length, term_inferred) = match extract_term(text) {
            Some(term) => (term, false),
            None => match reconcile_term(amount, debt_amount) {
                Some(term) => (term, true),
                None => return ExtractionResult::not_found(),
            },
        };

        let Some(total_amount) = amount.checked_mul(Decimal::from(term_length)) else {
            return ExtractionResult::not_found();
        };
        ExtractionResult {
            found: true,
            offer: Some(ImplicitOffer {
                plan: PaymentPlan::new(frequency, amount, term_length, total_amount),
                term_inferred,
            }),
        }
    }
}

fn extract_amount(text: &str) -> Option<Decimal> {
    let captures = amount_re().captures(text)?;
    let whole = captures.get(1)?.as_str().replace(',', "");
    let raw = match captures.get(2) {
        Some(cents) => format!("{whole}.{}", cents.as_str()),
        None => whole,
    };
    Decimal::from_str(&raw).ok().filter(|amount| *amount > Decimal::ZERO)
}

fn extract_frequency(text: &str) -> Option<Frequency> {
    let captures = frequency_re().captures(text)?;
    captures.get(1)?.as_str().parse().ok()
}

fn extract_term(text: &str) -> Option<u32> {
    let captures = term_re().captures(text)?;
    captures.get(1)?.as_str().parse::<u32>().ok().filter(|term| *term > 0)
}
