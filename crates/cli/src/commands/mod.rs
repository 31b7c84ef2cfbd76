pub mod config;
pub mod extract;
pub mod finalize;
pub mod intercept;
pub mod minimum;
pub mod negotiate;
pub mod suggest;
pub mod tool;

use std::path::Path;

use clap::Args;
use payplan_core::config::{AppConfig, LoadOptions};
use payplan_core::domain::conversation::{ConversationId, NegotiationState};
use payplan_core::domain::plan::PlanProposal;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>, data: Value) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data: Some(data),
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

/// Loads configuration for `command`; a validation failure becomes exit code 2.
pub fn load_config(command: &str, config_path: Option<&Path>) -> Result<AppConfig, CommandResult> {
    let options = LoadOptions {
        config_path: config_path.map(Path::to_path_buf),
        require_file: config_path.is_some(),
        ..LoadOptions::default()
    };
    AppConfig::load(options).map_err(|error| {
        CommandResult::failure(
            command,
            "config_validation",
            format!("configuration issue: {error}"),
            2,
        )
    })
}

#[derive(Clone, Debug, Args)]
pub struct PlanArgs {
    #[arg(long, help = "Payment frequency: weekly, biweekly or monthly")]
    pub frequency: String,
    #[arg(long, allow_negative_numbers = true, help = "Amount of each installment")]
    pub amount: Decimal,
    #[arg(long = "term", allow_negative_numbers = true, help = "Number of installments")]
    pub term_length: i64,
}

impl PlanArgs {
    pub fn proposal(&self) -> PlanProposal {
        PlanProposal::new(self.frequency.clone(), self.amount, self.term_length)
    }
}

#[derive(Clone, Debug, Args)]
pub struct ConversationArgs {
    #[arg(long, help = "Outstanding balance; defaults to negotiation.default_debt_amount")]
    pub debt: Option<Decimal>,
    #[arg(long, default_value_t = 0, help = "Negotiation stage to resume from")]
    pub stage: u32,
    #[arg(long = "conversation-id", default_value = "cli", help = "Conversation identifier")]
    pub conversation_id: String,
}

impl ConversationArgs {
    pub fn open_state(
        &self,
        command: &str,
        config: &AppConfig,
    ) -> Result<NegotiationState, CommandResult> {
        let debt = self.debt.unwrap_or(config.negotiation.default_debt_amount);
        NegotiationState::new(ConversationId::new(self.conversation_id.clone()), debt)
            .map(|state| state.with_stage(self.stage))
            .map_err(|error| CommandResult::failure(command, "invalid_input", error.to_string(), 1))
    }
}
