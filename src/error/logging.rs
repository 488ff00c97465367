use std::any::Any;

use messenger_error::{ErrorExt, StatusCode};
use thiserror::Error;

/// Ошибки инициализации логирования.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoggingError {
    #[error("invalid log level `{level}`")]
    InvalidLevel { level: String },

    #[error("invalid filter directive `{directive}`: {reason}")]
    InvalidDirective { directive: String, reason: String },

    /// Глобальный subscriber уже установлен.
    #[error("logging is already initialized: {0}")]
    AlreadyInitialized(String),
}

impl ErrorExt for LoggingError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidLevel { .. } | Self::InvalidDirective { .. } => StatusCode::InvalidConfig,
            Self::AlreadyInitialized(_) => StatusCode::LoggingInit,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
