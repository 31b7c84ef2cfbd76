use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use payplan_core::config::AppConfig;
use serde::Serialize;
use serde_json::json;
use toml::Value;

use crate::commands::CommandResult;

#[derive(Debug, Serialize)]
struct ConfigEntry {
    key: &'static str,
    value: String,
    source: String,
}

/// Effective configuration with the layer each value came from.
pub fn run(config: &AppConfig, config_path: Option<&Path>) -> CommandResult {
    let config_file_path = config_path.map(Path::to_path_buf).or_else(detect_config_path);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let negotiation = &config.negotiation;

    let entry = |key: &'static str, env_keys: &[&str], value: String| ConfigEntry {
        key,
        value,
        source: field_source(key, env_keys, config_file_doc.as_ref(), config_file_path.as_deref()),
    };

    let entries = vec![
        entry(
            "negotiation.default_debt_amount",
            &["PAYPLAN_NEGOTIATION_DEFAULT_DEBT_AMOUNT"],
            negotiation.default_debt_amount.to_string(),
        ),
        entry(
            "negotiation.monthly_rate",
            &["PAYPLAN_NEGOTIATION_MONTHLY_RATE"],
            negotiation.monthly_rate.to_string(),
        ),
        entry(
            "negotiation.biweekly_rate",
            &["PAYPLAN_NEGOTIATION_BIWEEKLY_RATE"],
            negotiation.biweekly_rate.to_string(),
        ),
        entry(
            "negotiation.weekly_rate",
            &["PAYPLAN_NEGOTIATION_WEEKLY_RATE"],
            negotiation.weekly_rate.to_string(),
        ),
        entry(
            "negotiation.counter_multiplier",
            &["PAYPLAN_NEGOTIATION_COUNTER_MULTIPLIER"],
            negotiation.counter_multiplier.to_string(),
        ),
        entry(
            "negotiation.hardship_counter_multiplier",
            &["PAYPLAN_NEGOTIATION_HARDSHIP_COUNTER_MULTIPLIER"],
            negotiation.hardship_counter_multiplier.to_string(),
        ),
        entry(
            "negotiation.opening_multiplier",
            &["PAYPLAN_NEGOTIATION_OPENING_MULTIPLIER"],
            negotiation.opening_multiplier.to_string(),
        ),
        entry(
            "negotiation.hardship_opening_multiplier",
            &["PAYPLAN_NEGOTIATION_HARDSHIP_OPENING_MULTIPLIER"],
            negotiation.hardship_opening_multiplier.to_string(),
        ),
        entry(
            "negotiation.early_stage_limit",
            &["PAYPLAN_NEGOTIATION_EARLY_STAGE_LIMIT"],
            negotiation.early_stage_limit.to_string(),
        ),
        entry(
            "negotiation.fallback_term_length",
            &["PAYPLAN_NEGOTIATION_FALLBACK_TERM_LENGTH"],
            negotiation.fallback_term_length.to_string(),
        ),
        entry(
            "negotiation.hardship_keywords",
            &["PAYPLAN_NEGOTIATION_HARDSHIP_KEYWORDS"],
            negotiation.hardship_keywords.join(","),
        ),
        entry(
            "payments.link_domain",
            &["PAYPLAN_PAYMENTS_LINK_DOMAIN"],
            config.payments.link_domain.clone(),
        ),
        entry(
            "logging.level",
            &["PAYPLAN_LOGGING_LEVEL", "PAYPLAN_LOG_LEVEL"],
            config.logging.level.clone(),
        ),
        entry(
            "logging.format",
            &["PAYPLAN_LOGGING_FORMAT", "PAYPLAN_LOG_FORMAT"],
            format!("{:?}", config.logging.format).to_ascii_lowercase(),
        ),
    ];

    CommandResult::success(
        "config",
        "effective config (source precedence: env > file > default)",
        json!({ "entries": entries }),
    )
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("payplan.toml"), PathBuf::from("config/payplan.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}
