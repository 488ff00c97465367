pub mod logging;

pub use logging::LoggingError;
// Типы ошибок хаба живут в отдельном крейте, чтобы их могли использовать
// компоненты, не зависящие от самого хаба.
pub use messenger_error::{
    CallbackRole, ErrorExt, KindTreeError, ListenerError, LogLevel, MessengerError,
    MessengerResult, StatusCode,
};

/// Ошибки загрузки настроек (`config` крейт).
pub use config::ConfigError;
