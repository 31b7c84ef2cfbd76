use clap::Args;
use payplan_core::config::AppConfig;
use payplan_core::domain::plan::Frequency;
use rust_decimal::Decimal;
use serde_json::json;

use crate::commands::CommandResult;

#[derive(Clone, Debug, Args)]
pub struct MinimumArgs {
    #[arg(long, help = "Outstanding balance; defaults to negotiation.default_debt_amount")]
    pub debt: Option<Decimal>,
    #[arg(long, help = "Payment frequency; monthly when omitted")]
    pub frequency: Option<String>,
}

pub fn run(config: &AppConfig, args: &MinimumArgs) -> CommandResult {
    let frequency = match args.frequency.as_deref().map(str::parse::<Frequency>).transpose() {
        Ok(frequency) => frequency,
        Err(error) => {
            return CommandResult::failure("minimum", "invalid_input", error.to_string(), 1);
        }
    };
    let debt = args.debt.unwrap_or(config.negotiation.default_debt_amount);
    if debt <= Decimal::ZERO {
        return CommandResult::failure(
            "minimum",
            "invalid_input",
            format!("debt amount must be positive, got {debt}"),
            1,
        );
    }

    let minimum = config.engine().minimum_payment(frequency, debt);
    let frequency = frequency.unwrap_or(Frequency::Monthly);
    CommandResult::success(
        "minimum",
        format!("minimum {frequency} payment for {debt} is {minimum}"),
        json!({
            "frequency": frequency,
            "debtAmount": debt,
            "minimumPayment": minimum,
        }),
    )
}
