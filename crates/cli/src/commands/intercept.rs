use clap::Args;
use payplan_agent::interceptor::OfferInterceptor;
use payplan_core::config::AppConfig;
use serde_json::json;

use crate::commands::{CommandResult, ConversationArgs};

#[derive(Clone, Debug, Args)]
pub struct InterceptArgs {
    #[arg(long, help = "Assistant reply to screen")]
    pub text: String,
    #[command(flatten)]
    pub conversation: ConversationArgs,
}

pub fn run(config: &AppConfig, args: &InterceptArgs) -> CommandResult {
    let mut state = match args.conversation.open_state("intercept", config) {
        Ok(state) => state,
        Err(failure) => return failure,
    };

    let outcome = OfferInterceptor::default().intercept(&config.engine(), &mut state, &args.text);
    let replaced = outcome.is_replaced();
    let message = if replaced { "reply replaced" } else { "reply passed through" };
    CommandResult::success(
        "intercept",
        message,
        json!({
            "replaced": replaced,
            "stage": state.stage(),
            "response": outcome.into_response(),
        }),
    )
}
