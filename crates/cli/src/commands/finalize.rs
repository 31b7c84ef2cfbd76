use clap::Args;
use payplan_core::config::AppConfig;
use payplan_core::domain::plan::DebtorDetails;
use rust_decimal::Decimal;
use serde_json::json;
use tracing::info;

use crate::commands::{CommandResult, ConversationArgs, PlanArgs};

#[derive(Clone, Debug, Args)]
pub struct FinalizeArgs {
    #[command(flatten)]
    pub plan: PlanArgs,
    #[command(flatten)]
    pub conversation: ConversationArgs,
    #[arg(long, help = "Total the plan pays off; defaults to the conversation debt")]
    pub total: Option<Decimal>,
    #[arg(long, help = "Debtor name")]
    pub name: Option<String>,
    #[arg(long, help = "Debtor email")]
    pub email: Option<String>,
    #[arg(long, default_value = "", help = "Confirmation wording for the debtor")]
    pub message: String,
}

pub fn run(config: &AppConfig, args: &FinalizeArgs) -> CommandResult {
    let mut state = match args.conversation.open_state("finalize", config) {
        Ok(state) => state,
        Err(failure) => return failure,
    };

    let mut plan = args.plan.proposal();
    plan.total_amount = args.total;
    let details = DebtorDetails {
        name: args.name.clone(),
        email: args.email.clone(),
        account_reference: None,
    };

    let response = config.engine().finalize_plan(&mut state, &plan, &details, &args.message);
    info!(
        event_name = "cli.finalize",
        conversation_id = %state.conversation_id(),
        stage = state.stage(),
        assessment = response.assessment.label(),
        "finalization attempted"
    );

    CommandResult::success(
        "finalize",
        response.assessment.label(),
        json!({ "stage": state.stage(), "response": response }),
    )
}
