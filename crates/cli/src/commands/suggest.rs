use clap::Args;
use payplan_core::config::AppConfig;
use serde_json::json;
use tracing::info;

use crate::commands::{CommandResult, ConversationArgs, PlanArgs};

#[derive(Clone, Debug, Args)]
pub struct SuggestArgs {
    #[command(flatten)]
    pub plan: PlanArgs,
    #[command(flatten)]
    pub conversation: ConversationArgs,
    #[arg(long, default_value = "", help = "Debtor's description of their circumstances")]
    pub situation: String,
    #[arg(long, default_value = "", help = "Assistant wording to show alongside the plan")]
    pub message: String,
}

pub fn run(config: &AppConfig, args: &SuggestArgs) -> CommandResult {
    let mut state = match args.conversation.open_state("suggest", config) {
        Ok(state) => state,
        Err(failure) => return failure,
    };

    let response = config.engine().suggest_plan(
        &mut state,
        &args.plan.proposal(),
        &args.situation,
        &args.message,
    );
    info!(
        event_name = "cli.suggest",
        conversation_id = %state.conversation_id(),
        stage = state.stage(),
        assessment = response.assessment.label(),
        "assistant suggestion evaluated"
    );

    CommandResult::success(
        "suggest",
        response.assessment.label(),
        json!({ "stage": state.stage(), "response": response }),
    )
}
