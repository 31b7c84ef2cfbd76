use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::negotiation::engine::default_hardship_keywords;
use crate::negotiation::{
    NegotiationEngine, NegotiationSettings, PaymentLinkBuilder, RateTablePolicy,
};
use crate::session::SessionStore;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub negotiation: NegotiationConfig,
    pub payments: PaymentsConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct NegotiationConfig {
    pub default_debt_amount: Decimal,
    pub monthly_rate: Decimal,
    pub biweekly_rate: Decimal,
    pub weekly_rate: Decimal,
    pub counter_multiplier: Decimal,
    pub hardship_counter_multiplier: Decimal,
    pub opening_multiplier: Decimal,
    pub hardship_opening_multiplier: Decimal,
    pub early_stage_limit: u32,
    pub fallback_term_length: u32,
    pub hardship_keywords: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct PaymentsConfig {
    pub link_domain: String,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub default_debt_amount: Option<Decimal>,
    pub early_stage_limit: Option<u32>,
    pub link_domain: Option<String>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        let rates = RateTablePolicy::default();
        let settings = NegotiationSettings::default();
        Self {
            negotiation: NegotiationConfig {
                default_debt_amount: Decimal::from(2400),
                monthly_rate: rates.monthly_rate,
                biweekly_rate: rates.biweekly_rate,
                weekly_rate: rates.weekly_rate,
                counter_multiplier: settings.counter_multiplier,
                hardship_counter_multiplier: settings.hardship_counter_multiplier,
                opening_multiplier: settings.opening_multiplier,
                hardship_opening_multiplier: settings.hardship_opening_multiplier,
                early_stage_limit: settings.early_stage_limit,
                fallback_term_length: settings.fallback_term_length,
                hardship_keywords: default_hardship_keywords(),
            },
            payments: PaymentsConfig { link_domain: "http://localhost:3000".to_string() },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl NegotiationConfig {
    pub fn rate_policy(&self) -> RateTablePolicy {
        RateTablePolicy {
            monthly_rate: self.monthly_rate,
            biweekly_rate: self.biweekly_rate,
            weekly_rate: self.weekly_rate,
        }
    }

    pub fn settings(&self) -> NegotiationSettings {
        NegotiationSettings {
            counter_multiplier: self.counter_multiplier,
            hardship_counter_multiplier: self.hardship_counter_multiplier,
            opening_multiplier: self.opening_multiplier,
            hardship_opening_multiplier: self.hardship_opening_multiplier,
            early_stage_limit: self.early_stage_limit,
            fallback_term_length: self.fallback_term_length,
            hardship_keywords: self.hardship_keywords.clone(),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("payplan.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn engine(&self) -> NegotiationEngine<RateTablePolicy> {
        NegotiationEngine::new(
            self.negotiation.rate_policy(),
            self.negotiation.settings(),
            PaymentLinkBuilder::new(self.payments.link_domain.clone()),
        )
    }

    pub fn session_store(&self) -> SessionStore {
        SessionStore::new(self.negotiation.default_debt_amount)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(negotiation) = patch.negotiation {
            let target = &mut self.negotiation;
            if let Some(value) = negotiation.default_debt_amount {
                target.default_debt_amount = value;
            }
            if let Some(value) = negotiation.monthly_rate {
                target.monthly_rate = value;
            }
            if let Some(value) = negotiation.biweekly_rate {
                target.biweekly_rate = value;
            }
            if let Some(value) = negotiation.weekly_rate {
                target.weekly_rate = value;
            }
            if let Some(value) = negotiation.counter_multiplier {
                target.counter_multiplier = value;
            }
            if let Some(value) = negotiation.hardship_counter_multiplier {
                target.hardship_counter_multiplier = value;
            }
            if let Some(value) = negotiation.opening_multiplier {
                target.opening_multiplier = value;
            }
            if let Some(value) = negotiation.hardship_opening_multiplier {
                target.hardship_opening_multiplier = value;
            }
            if let Some(value) = negotiation.early_stage_limit {
                target.early_stage_limit = value;
            }
            if let Some(value) = negotiation.fallback_term_length {
                target.fallback_term_length = value;
            }
            if let Some(value) = negotiation.hardship_keywords {
                target.hardship_keywords = value;
            }
        }

        if let Some(payments) = patch.payments {
            if let Some(link_domain) = payments.link_domain {
                self.payments.link_domain = link_domain;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        let negotiation = &mut self.negotiation;
        let decimal_vars: [(&str, &mut Decimal); 8] = [
            ("PAYPLAN_NEGOTIATION_DEFAULT_DEBT_AMOUNT", &mut negotiation.default_debt_amount),
            ("PAYPLAN_NEGOTIATION_MONTHLY_RATE", &mut negotiation.monthly_rate),
            ("PAYPLAN_NEGOTIATION_BIWEEKLY_RATE", &mut negotiation.biweekly_rate),
            ("PAYPLAN_NEGOTIATION_WEEKLY_RATE", &mut negotiation.weekly_rate),
            ("PAYPLAN_NEGOTIATION_COUNTER_MULTIPLIER", &mut negotiation.counter_multiplier),
            (
                "PAYPLAN_NEGOTIATION_HARDSHIP_COUNTER_MULTIPLIER",
                &mut negotiation.hardship_counter_multiplier,
            ),
            ("PAYPLAN_NEGOTIATION_OPENING_MULTIPLIER", &mut negotiation.opening_multiplier),
            (
                "PAYPLAN_NEGOTIATION_HARDSHIP_OPENING_MULTIPLIER",
                &mut negotiation.hardship_opening_multiplier,
            ),
        ];
        for (key, target) in decimal_vars {
            if let Some(value) = read_env(key) {
                *target = parse_decimal(key, &value)?;
            }
        }

        if let Some(value) = read_env("PAYPLAN_NEGOTIATION_EARLY_STAGE_LIMIT") {
            negotiation.early_stage_limit =
                parse_u32("PAYPLAN_NEGOTIATION_EARLY_STAGE_LIMIT", &value)?;
        }
        if let Some(value) = read_env("PAYPLAN_NEGOTIATION_FALLBACK_TERM_LENGTH") {
            negotiation.fallback_term_length =
                parse_u32("PAYPLAN_NEGOTIATION_FALLBACK_TERM_LENGTH", &value)?;
        }
        if let Some(value) = read_env("PAYPLAN_NEGOTIATION_HARDSHIP_KEYWORDS") {
            negotiation.hardship_keywords = value
                .split(',')
                .map(|keyword| keyword.trim().to_string())
                .filter(|keyword| !keyword.is_empty())
                .collect();
        }

        if let Some(value) = read_env("PAYPLAN_PAYMENTS_LINK_DOMAIN") {
            self.payments.link_domain = value;
        }

        let log_level = read_env("PAYPLAN_LOGGING_LEVEL").or_else(|| read_env("PAYPLAN_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("PAYPLAN_LOGGING_FORMAT").or_else(|| read_env("PAYPLAN_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(default_debt_amount) = overrides.default_debt_amount {
            self.negotiation.default_debt_amount = default_debt_amount;
        }
        if let Some(early_stage_limit) = overrides.early_stage_limit {
            self.negotiation.early_stage_limit = early_stage_limit;
        }
        if let Some(link_domain) = overrides.link_domain {
            self.payments.link_domain = link_domain;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_negotiation(&self.negotiation)?;
        validate_payments(&self.payments)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("payplan.toml"), PathBuf::from("config/payplan.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_negotiation(negotiation: &NegotiationConfig) -> Result<(), ConfigError> {
    if negotiation.default_debt_amount <= Decimal::ZERO {
        return Err(ConfigError::Validation(
            "negotiation.default_debt_amount must be greater than zero".to_string(),
        ));
    }

    let rates = [
        ("negotiation.monthly_rate", negotiation.monthly_rate),
        ("negotiation.biweekly_rate", negotiation.biweekly_rate),
        ("negotiation.weekly_rate", negotiation.weekly_rate),
    ];
    for (key, rate) in rates {
        if rate <= Decimal::ZERO || rate > Decimal::ONE {
            return Err(ConfigError::Validation(format!("{key} must be in range (0, 1]")));
        }
    }

    let multipliers = [
        ("negotiation.counter_multiplier", negotiation.counter_multiplier),
        ("negotiation.hardship_counter_multiplier", negotiation.hardship_counter_multiplier),
        ("negotiation.opening_multiplier", negotiation.opening_multiplier),
        ("negotiation.hardship_opening_multiplier", negotiation.hardship_opening_multiplier),
    ];
    for (key, multiplier) in multipliers {
        if multiplier < Decimal::ONE {
            return Err(ConfigError::Validation(format!(
                "{key} must be at least 1 so counter-offers never undercut the minimum payment"
            )));
        }
    }

    if negotiation.fallback_term_length == 0 || negotiation.fallback_term_length > 600 {
        return Err(ConfigError::Validation(
            "negotiation.fallback_term_length must be in range 1..=600".to_string(),
        ));
    }

    if negotiation.hardship_keywords.iter().any(|keyword| keyword.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "negotiation.hardship_keywords must not contain blank entries".to_string(),
        ));
    }

    Ok(())
}

fn validate_payments(payments: &PaymentsConfig) -> Result<(), ConfigError> {
    let domain = payments.link_domain.trim();
    if !domain.starts_with("http://") && !domain.starts_with("https://") {
        return Err(ConfigError::Validation(
            "payments.link_domain must start with http:// or https://".to_string(),
        ));
    }
    if domain.contains('?') || domain.contains('#') {
        return Err(ConfigError::Validation(
            "payments.link_domain must not carry a query string or fragment".to_string(),
        ));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.trim().parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_decimal(key: &str, value: &str) -> Result<Decimal, ConfigError> {
    Decimal::from_str(value.trim()).map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    negotiation: Option<NegotiationPatch>,
    payments: Option<PaymentsPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct NegotiationPatch {
    default_debt_amount: Option<Decimal>,
    monthly_rate: Option<Decimal>,
    biweekly_rate: Option<Decimal>,
    weekly_rate: Option<Decimal>,
    counter_multiplier: Option<Decimal>,
    hardship_counter_multiplier: Option<Decimal>,
    opening_multiplier: Option<Decimal>,
    hardship_opening_multiplier: Option<Decimal>,
    early_stage_limit: Option<u32>,
    fallback_term_length: Option<u32>,
    hardship_keywords: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct PaymentsPatch {
    link_domain: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
