use clap::Args;
use payplan_core::config::AppConfig;
use serde_json::json;
use tracing::info;

use crate::commands::{CommandResult, ConversationArgs, PlanArgs};

#[derive(Clone, Debug, Args)]
pub struct NegotiateArgs {
    #[command(flatten)]
    pub plan: PlanArgs,
    #[command(flatten)]
    pub conversation: ConversationArgs,
    #[arg(long, default_value = "", help = "Debtor's description of their circumstances")]
    pub situation: String,
}

pub fn run(config: &AppConfig, args: &NegotiateArgs) -> CommandResult {
    let mut state = match args.conversation.open_state("negotiate", config) {
        Ok(state) => state,
        Err(failure) => return failure,
    };

    let response =
        config.engine().evaluate_and_negotiate(&mut state, &args.plan.proposal(), &args.situation);
    info!(
        event_name = "cli.negotiate",
        conversation_id = %state.conversation_id(),
        stage = state.stage(),
        assessment = response.assessment.label(),
        "debtor proposal evaluated"
    );

    CommandResult::success(
        "negotiate",
        response.assessment.label(),
        json!({ "stage": state.stage(), "response": response }),
    )
}
