use rust_decimal::Decimal;

use crate::domain::plan::PaymentPlan;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaymentLinkBuilder {
    domain: String,
}

impl PaymentLinkBuilder {
    pub fn new(domain: impl Into<String>) -> Self {
        let domain = domain.into();
        Self { domain: domain.trim().trim_end_matches('/').to_string() }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// The payment capture service parses this query string verbatim; keep parameter names and
    /// order stable.
    pub fn build(&self, plan: &PaymentPlan) -> String {
        format!(
            "{}/payments?termLength={}&totalDebtAmount={}&termPaymentAmount={}",
            self.domain,
            plan.term_length,
            render_number(plan.total_amount),
            render_number(plan.amount)
        )
    }
}

fn render_number(value: Decimal) -> String {
    value.normalize().to_string()
}
