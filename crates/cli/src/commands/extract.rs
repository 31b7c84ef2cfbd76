use clap::Args;
use payplan_agent::extractor::ImplicitOfferExtractor;
use payplan_core::config::AppConfig;
use rust_decimal::Decimal;
use serde_json::json;

use crate::commands::CommandResult;

#[derive(Clone, Debug, Args)]
pub struct ExtractArgs {
    #[arg(long, help = "Free text to scan for a payment offer")]
    pub text: String,
    #[arg(long, help = "Outstanding balance used when no term is stated")]
    pub debt: Option<Decimal>,
}

pub fn run(config: &AppConfig, args: &ExtractArgs) -> CommandResult {
    let debt = args.debt.unwrap_or(config.negotiation.default_debt_amount);
    let result = ImplicitOfferExtractor::new().extract(&args.text, debt);
    let message = if result.found { "offer found" } else { "no offer found" };
    CommandResult::success("extract", message, json!(result))
}
