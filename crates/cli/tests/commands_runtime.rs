use std::env;
use std::fs;
use std::sync::{Mutex, OnceLock};

use payplan_cli::commands::extract::{self, ExtractArgs};
use payplan_cli::commands::finalize::{self, FinalizeArgs};
use payplan_cli::commands::intercept::{self, InterceptArgs};
use payplan_cli::commands::minimum::{self, MinimumArgs};
use payplan_cli::commands::negotiate::{self, NegotiateArgs};
use payplan_cli::commands::suggest::{self, SuggestArgs};
use payplan_cli::commands::tool::{self, ToolArgs};
use payplan_cli::commands::{config, load_config, ConversationArgs, PlanArgs};
use payplan_core::config::AppConfig;
use rust_decimal::Decimal;
use serde_json::Value;
use tempfile::TempDir;

fn plan(frequency: &str, amount: i64, term_length: i64) -> PlanArgs {
    PlanArgs { frequency: frequency.to_string(), amount: Decimal::from(amount), term_length }
}

fn conversation(debt: i64, stage: u32) -> ConversationArgs {
    ConversationArgs {
        debt: Some(Decimal::from(debt)),
        stage,
        conversation_id: "cli-test".to_string(),
    }
}

#[test]
fn minimum_reports_weekly_floor() {
    let result = minimum::run(
        &AppConfig::default(),
        &MinimumArgs { debt: Some(Decimal::from(2400)), frequency: Some("weekly".to_string()) },
    );
    assert_eq!(result.exit_code, 0);

    let payload = parse_payload(&result.output);
    assert_eq!(payload["command"], "minimum");
    assert_eq!(payload["status"], "ok");
    assert_eq!(payload["data"]["minimumPayment"], "48");
    assert_eq!(payload["data"]["frequency"], "weekly");
}

#[test]
fn minimum_rejects_unknown_frequency() {
    let result = minimum::run(
        &AppConfig::default(),
        &MinimumArgs { debt: None, frequency: Some("daily".to_string()) },
    );
    assert_eq!(result.exit_code, 1);

    let payload = parse_payload(&result.output);
    assert_eq!(payload["status"], "error");
    assert_eq!(payload["error_class"], "invalid_input");
}

#[test]
fn negotiate_counters_plan_that_misses_the_balance() {
    let result = negotiate::run(
        &AppConfig::default(),
        &NegotiateArgs {
            plan: plan("monthly", 50, 12),
            conversation: conversation(2400, 0),
            situation: String::new(),
        },
    );
    assert_eq!(result.exit_code, 0);

    let payload = parse_payload(&result.output);
    assert_eq!(payload["message"], "countered");
    assert_eq!(payload["data"]["stage"], 1);
    assert_eq!(payload["data"]["response"]["plans"][0]["amount"], "240");
    assert_eq!(payload["data"]["response"]["plans"][0]["termLength"], 10);
}

#[test]
fn negotiate_rejects_non_positive_debt() {
    let result = negotiate::run(
        &AppConfig::default(),
        &NegotiateArgs {
            plan: plan("monthly", 200, 12),
            conversation: conversation(0, 0),
            situation: String::new(),
        },
    );
    assert_eq!(result.exit_code, 1);
    assert_eq!(parse_payload(&result.output)["error_class"], "invalid_input");
}

#[test]
fn suggest_escalates_only_in_early_stages() {
    let config = AppConfig::default();
    let early = suggest::run(
        &config,
        &SuggestArgs {
            plan: plan("monthly", 100, 24),
            conversation: conversation(2400, 0),
            situation: String::new(),
            message: String::new(),
        },
    );
    let late = suggest::run(
        &config,
        &SuggestArgs {
            plan: plan("monthly", 100, 24),
            conversation: conversation(2400, 2),
            situation: String::new(),
            message: String::new(),
        },
    );

    let early_payload = parse_payload(&early.output);
    let late_payload = parse_payload(&late.output);
    assert_eq!(early_payload["message"], "countered");
    assert_eq!(early_payload["data"]["response"]["assessment"]["reason"], "early_stage_floor");
    assert_eq!(late_payload["message"], "accepted");
    assert_eq!(late_payload["data"]["stage"], 3);
}

#[test]
fn finalize_produces_payment_link_and_resets_stage() {
    let result = finalize::run(
        &AppConfig::default(),
        &FinalizeArgs {
            plan: plan("monthly", 200, 12),
            conversation: conversation(2400, 3),
            total: Some(Decimal::from(2400)),
            name: Some("Alex".to_string()),
            email: None,
            message: String::new(),
        },
    );
    assert_eq!(result.exit_code, 0);

    let payload = parse_payload(&result.output);
    assert_eq!(payload["message"], "finalized");
    assert_eq!(payload["data"]["stage"], 0);
    assert_eq!(
        payload["data"]["response"]["finalPlan"]["paymentLink"],
        "http://localhost:3000/payments?termLength=12&totalDebtAmount=2400&termPaymentAmount=200"
    );
}

#[test]
fn finalize_refuses_below_floor() {
    let result = finalize::run(
        &AppConfig::default(),
        &FinalizeArgs {
            plan: plan("monthly", 50, 12),
            conversation: conversation(2400, 1),
            total: Some(Decimal::from(2400)),
            name: None,
            email: None,
            message: String::new(),
        },
    );

    let payload = parse_payload(&result.output);
    assert_eq!(payload["message"], "refused");
    assert_eq!(payload["data"]["stage"], 1);
    assert_eq!(payload["data"]["response"]["plans"][0]["amount"], "192");
    assert_eq!(payload["data"]["response"]["plans"][0]["termLength"], 13);
}

#[test]
fn extract_reports_found_offer() {
    let result = extract::run(
        &AppConfig::default(),
        &ExtractArgs { text: "I can do $300 monthly for 6 months".to_string(), debt: None },
    );

    let payload = parse_payload(&result.output);
    assert_eq!(payload["data"]["found"], true);
    assert_eq!(payload["data"]["offer"]["plan"]["termLength"], 6);
    assert_eq!(payload["data"]["offer"]["plan"]["frequency"], "monthly");
}

#[test]
fn intercept_passes_plain_text_through() {
    let result = intercept::run(
        &AppConfig::default(),
        &InterceptArgs {
            text: "Could you share what you can afford each month?".to_string(),
            conversation: conversation(2400, 0),
        },
    );

    let payload = parse_payload(&result.output);
    assert_eq!(payload["data"]["replaced"], false);
    assert_eq!(payload["data"]["response"]["displayKind"], "text");
    assert_eq!(payload["data"]["stage"], 0);
}

#[test]
fn tool_runs_through_agent_runtime_with_audit_trail() {
    let result = tool::run(
        &AppConfig::default(),
        &ToolArgs {
            name: "evaluate_and_negotiate".to_string(),
            args: r#"{"proposal":{"frequency":"monthly","amount":300,"termLength":8}}"#
                .to_string(),
            debt: Some(Decimal::from(2400)),
            conversation_id: "cli-tool".to_string(),
        },
    );
    assert_eq!(result.exit_code, 0);

    let payload = parse_payload(&result.output);
    assert_eq!(payload["message"], "accepted");
    assert_eq!(payload["data"]["stage"], 1);
    assert_eq!(payload["data"]["audit"].as_array().map(Vec::len), Some(2));
}

#[test]
fn tool_rejects_unknown_name() {
    let result = tool::run(
        &AppConfig::default(),
        &ToolArgs {
            name: "forgive_balance".to_string(),
            args: "{}".to_string(),
            debt: None,
            conversation_id: "cli-tool".to_string(),
        },
    );
    assert_eq!(result.exit_code, 1);
    let payload = parse_payload(&result.output);
    assert_eq!(payload["error_class"], "not_found");
    assert!(payload["message"].as_str().unwrap_or_default().contains("forgive_balance"));
}

#[test]
fn config_failure_exits_with_code_two() {
    with_env(&[("PAYPLAN_NEGOTIATION_MONTHLY_RATE", "1.5")], || {
        let failure = match load_config("negotiate", None) {
            Ok(_) => panic!("expected config validation failure"),
            Err(failure) => failure,
        };
        assert_eq!(failure.exit_code, 2);

        let payload = parse_payload(&failure.output);
        assert_eq!(payload["command"], "negotiate");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn config_reports_source_for_each_value() {
    with_env(&[("PAYPLAN_PAYMENTS_LINK_DOMAIN", "https://pay.example.com")], || {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("payplan.toml");
        fs::write(&path, "[negotiation]\nearly_stage_limit = 3\n").expect("write config");

        let loaded = load_config("config", Some(path.as_path())).expect("config should load");
        let result = config::run(&loaded, Some(path.as_path()));
        let payload = parse_payload(&result.output);
        let entries = payload["data"]["entries"].as_array().cloned().unwrap_or_default();

        let source_of = |key: &str| {
            entries
                .iter()
                .find(|entry| entry["key"] == key)
                .and_then(|entry| entry["source"].as_str().map(str::to_string))
                .unwrap_or_default()
        };
        assert_eq!(source_of("payments.link_domain"), "env (PAYPLAN_PAYMENTS_LINK_DOMAIN)");
        assert!(source_of("negotiation.early_stage_limit").starts_with("file ("));
        assert_eq!(source_of("negotiation.monthly_rate"), "default");
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "PAYPLAN_NEGOTIATION_DEFAULT_DEBT_AMOUNT",
        "PAYPLAN_NEGOTIATION_MONTHLY_RATE",
        "PAYPLAN_NEGOTIATION_BIWEEKLY_RATE",
        "PAYPLAN_NEGOTIATION_WEEKLY_RATE",
        "PAYPLAN_NEGOTIATION_EARLY_STAGE_LIMIT",
        "PAYPLAN_NEGOTIATION_FALLBACK_TERM_LENGTH",
        "PAYPLAN_NEGOTIATION_HARDSHIP_KEYWORDS",
        "PAYPLAN_PAYMENTS_LINK_DOMAIN",
        "PAYPLAN_LOGGING_LEVEL",
        "PAYPLAN_LOGGING_FORMAT",
        "PAYPLAN_LOG_LEVEL",
        "PAYPLAN_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
