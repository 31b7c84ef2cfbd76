use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use payplan_agent::runtime::AgentRuntime;
use payplan_core::audit::InMemoryAuditSink;
use payplan_core::config::AppConfig;
use payplan_core::domain::conversation::ConversationId;
use payplan_core::errors::{ApplicationError, InterfaceError};
use rust_decimal::Decimal;
use serde_json::{json, Value};

use crate::commands::CommandResult;

#[derive(Clone, Debug, Args)]
pub struct ToolArgs {
    #[arg(help = "Tool name: evaluate_and_negotiate, suggest_plan or finalize_plan")]
    pub name: String,
    #[arg(long, default_value = "{}", help = "Tool arguments as a JSON object")]
    pub args: String,
    #[arg(long, help = "Outstanding balance; defaults to negotiation.default_debt_amount")]
    pub debt: Option<Decimal>,
    #[arg(long = "conversation-id", default_value = "cli", help = "Conversation identifier")]
    pub conversation_id: String,
}

pub fn run(config: &AppConfig, args: &ToolArgs) -> CommandResult {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "tool",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                1,
            );
        }
    };

    let sink = InMemoryAuditSink::default();
    let agent = AgentRuntime::from_config(config, Arc::new(sink.clone()));
    let conversation_id = ConversationId::new(args.conversation_id.clone());

    // Arguments that are not JSON are forwarded verbatim and handled as an empty payload.
    let arguments = serde_json::from_str::<Value>(&args.args)
        .unwrap_or_else(|_| Value::String(args.args.clone()));

    let result: Result<Value> = runtime.block_on(async {
        agent.open_conversation(conversation_id.clone(), args.debt)?;
        agent.handle_tool_call(&conversation_id, &args.name, arguments).await
    });

    match result {
        Ok(response) => {
            let stage = agent
                .sessions()
                .snapshot(&conversation_id)
                .map(|state| state.stage())
                .unwrap_or_default();
            let message = response["assessment"]["outcome"].as_str().unwrap_or("ok").to_string();
            CommandResult::success(
                "tool",
                message,
                json!({
                    "tool": args.name,
                    "stage": stage,
                    "response": response,
                    "audit": sink.events(),
                }),
            )
        }
        Err(error) => match error.downcast::<ApplicationError>() {
            Ok(application_error) => {
                let interface_error =
                    application_error.into_interface(args.conversation_id.clone());
                let error_class = match interface_error {
                    InterfaceError::BadRequest { .. } => "invalid_input",
                    InterfaceError::NotFound { .. } => "not_found",
                    InterfaceError::Internal { .. } => "internal",
                };
                CommandResult::failure("tool", error_class, interface_error.to_string(), 1)
            }
            Err(error) => CommandResult::failure("tool", "tool_failure", error.to_string(), 1),
        },
    }
}
