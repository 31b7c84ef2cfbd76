use payplan_core::config::{LogFormat, LoggingConfig};
use tracing::{debug, Level};

/// Installs the global subscriber. Output goes to stderr so stdout carries only the command's
/// JSON document.
pub fn init(config: &LoggingConfig) {
    let log_level = config.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    let installed = match config.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    // A subscriber may already be installed when commands run inside tests.
    if let Err(error) = installed {
        debug!(
            event_name = "cli.logging_already_initialized",
            error = %error,
            "keeping the existing tracing subscriber"
        );
    }
}
