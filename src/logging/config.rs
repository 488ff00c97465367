use std::{env, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use tracing_subscriber::filter::{Directive, LevelFilter};

use crate::error::LoggingError;

/// Формат консольного вывода.
#[derive(Debug, Default, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format `{other}`")),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Self::Compact => write!(f, "compact"),
            Self::Pretty => write!(f, "pretty"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Настройки логирования.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Базовый уровень: `trace`, `debug`, `info`, `warn`, `error` или `off`.
    pub level: String,
    pub format: LogFormat,
    pub with_ansi: bool,
    pub with_target: bool,
    pub with_thread_ids: bool,
    pub with_line_numbers: bool,
    /// Дополнительные директивы `EnvFilter`, например `messenger=trace`.
    pub directives: Vec<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
            with_ansi: true,
            with_target: true,
            with_thread_ids: false,
            with_line_numbers: false,
            directives: Vec::new(),
        }
    }
}

impl LoggingConfig {
    /// Переопределения из `MESSENGER_LOG_LEVEL` и `MESSENGER_LOG_FORMAT`.
    /// Нераспознанный формат игнорируется.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(level) = env::var("MESSENGER_LOG_LEVEL") {
            self.level = level;
        }
        if let Ok(format) = env::var("MESSENGER_LOG_FORMAT") {
            if let Ok(format) = format.parse() {
                self.format = format;
            }
        }
    }

    pub fn validate(&self) -> Result<(), LoggingError> {
        self.level
            .parse::<LevelFilter>()
            .map_err(|_| LoggingError::InvalidLevel {
                level: self.level.clone(),
            })?;

        for directive in &self.directives {
            directive
                .parse::<Directive>()
                .map_err(|e| LoggingError::InvalidDirective {
                    directive: directive.clone(),
                    reason: e.to_string(),
                })?;
        }
        Ok(())
    }

    /// Строка фильтра: уровень и дополнительные директивы через запятую.
    pub fn build_filter_directive(&self) -> String {
        std::iter::once(self.level.as_str())
            .chain(self.directives.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(",")
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = LoggingConfig::default();
        assert_eq!(cfg.level, "info");
        assert_eq!(cfg.format, LogFormat::Compact);
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.build_filter_directive(), "info");
    }

    /// Тест проверяет сборку директивы из уровня и дополнительных правил.
    #[test]
    fn test_filter_directive_joins_rules() {
        let cfg = LoggingConfig {
            level: "warn".into(),
            directives: vec!["messenger=trace".into(), "config=off".into()],
            ..Default::default()
        };
        assert!(cfg.validate().is_ok());
        assert_eq!(
            cfg.build_filter_directive(),
            "warn,messenger=trace,config=off"
        );
    }

    /// Тест проверяет отклонение неизвестного уровня и плохой директивы.
    #[test]
    fn test_validate_rejects_garbage() {
        let cfg = LoggingConfig {
            level: "loud".into(),
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(LoggingError::InvalidLevel { .. })
        ));

        let cfg = LoggingConfig {
            directives: vec!["messenger=[".into()],
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(LoggingError::InvalidDirective { .. })
        ));
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!("pretty".parse::<LogFormat>(), Ok(LogFormat::Pretty));
        assert!("xml".parse::<LogFormat>().is_err());
        assert_eq!(LogFormat::Compact.to_string(), "compact");
    }

    /// Тест проверяет переопределения из переменных окружения.
    #[test]
    #[serial]
    fn test_env_overrides() {
        env::set_var("MESSENGER_LOG_LEVEL", "debug");
        env::set_var("MESSENGER_LOG_FORMAT", "json");

        let mut cfg = LoggingConfig::default();
        cfg.apply_env_overrides();
        assert_eq!(cfg.level, "debug");
        assert_eq!(cfg.format, LogFormat::Json);

        env::set_var("MESSENGER_LOG_FORMAT", "xml");
        let mut cfg = LoggingConfig::default();
        cfg.apply_env_overrides();
        assert_eq!(cfg.format, LogFormat::Compact);

        env::remove_var("MESSENGER_LOG_LEVEL");
        env::remove_var("MESSENGER_LOG_FORMAT");
    }
}
