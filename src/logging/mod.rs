pub mod config;
mod filters;
mod formatter;

pub use config::{LogFormat, LoggingConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::LoggingError;

/// Инициализация логирования с конфигурацией.
///
/// Устанавливает глобальный subscriber: `EnvFilter` (`RUST_LOG` важнее
/// конфигурации) и консольный слой в выбранном формате. Повторный вызов
/// возвращает `AlreadyInitialized`.
pub fn init_logging(mut config: LoggingConfig) -> Result<(), LoggingError> {
    config.apply_env_overrides();
    config.validate()?;

    let env_filter = filters::build_filter(&config)?;
    let writer: fn() -> std::io::Stdout = std::io::stdout;
    let console = formatter::build_formatter(&config, writer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console)
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        log_level = %config.level,
        format = %config.format,
        "Logging system initialized"
    );
    Ok(())
}
