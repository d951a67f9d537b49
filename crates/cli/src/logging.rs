use clientela_core::config::{AppConfig, LogFormat, LoadOptions};
use tracing::Level;

/// Logs go to stderr so command output on stdout stays machine-readable.
/// Invalid config is reported by the command itself, so it only falls back
/// to defaults here.
pub fn init(options: &LoadOptions) {
    let config = AppConfig::load(options.clone()).unwrap_or_default();
    let level = config.logging.level.parse::<Level>().unwrap_or(Level::WARN);
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_max_level(level);

    let _ = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
