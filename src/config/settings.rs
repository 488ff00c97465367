use std::path::Path;

use serde::{Deserialize, Serialize};

use config::{Config, ConfigError, Environment, File};

use super::MessengerConfig;
use crate::logging::LoggingConfig;

/// Настройки приложения: хаб и логирование.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub messenger: MessengerConfig,
    pub logging: LoggingConfig,
}

impl Settings {
    /// Загружает настройки из необязательного `messenger.{toml,yaml,json}` в
    /// рабочем каталоге и переменных окружения `MESSENGER_*`.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Как [`Settings::load`], но файл берётся по явному пути и обязан
    /// существовать.
    ///
    /// Переменные окружения важнее файла: `MESSENGER_MESSENGER__QUEUE_CAPACITY=64`,
    /// `MESSENGER_LOGGING__LEVEL=debug`, `MESSENGER_LOGGING__DIRECTIVES=a=trace,b=off`.
    pub fn load_from(path: Option<&Path>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name("messenger").required(false),
        };

        let cfg = Config::builder()
            // Добавляем значения по умолчанию
            .set_default("messenger.log_broadcasts", defaults.messenger.log_broadcasts)?
            .set_default("messenger.log_deliveries", defaults.messenger.log_deliveries)?
            .set_default(
                "messenger.queue_capacity",
                defaults.messenger.queue_capacity as u64,
            )?
            .set_default("logging.level", defaults.logging.level)?
            .set_default("logging.format", defaults.logging.format.to_string())?
            .add_source(file)
            // Добавляем переменные окружения с префиксом MESSENGER_
            .add_source(
                Environment::with_prefix("MESSENGER")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("logging.directives")
                    .try_parsing(true),
            )
            .build()?;

        // Десериализуем конфигурацию в нашу структуру
        cfg.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogFormat;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.messenger.queue_capacity, 16);
        assert!(!settings.messenger.log_broadcasts);
        assert_eq!(settings.logging.format, LogFormat::Compact);
    }

    /// Тест проверяет, что частичный JSON дополняется значениями по
    /// умолчанию.
    #[test]
    fn test_partial_deserialize() {
        let settings: Settings =
            serde_json::from_str(r#"{"messenger": {"log_broadcasts": true}}"#).unwrap();
        assert!(settings.messenger.log_broadcasts);
        assert_eq!(settings.messenger.queue_capacity, 16);
        assert_eq!(settings.logging, LoggingConfig::default());
    }
}
