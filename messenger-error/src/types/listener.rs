use std::any::Any;

use thiserror::Error;

use crate::{ErrorExt, StatusCode};

/// Ошибки базового поведения слушателя.
///
/// Возникают, когда конкретный тип не переопределил обязательный хук,
/// но всё равно используется хабом.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ListenerError {
    /// Подписка по умолчанию сработала, а `notify` не переопределён.
    #[error("unhandled message: `{listener}` received {kind} but does not override notify")]
    UnhandledMessage { listener: String, kind: String },

    /// Слушатель не объявил собственные подписки.
    #[error("`{listener}` does not implement register_to_messenger")]
    RegistrationMissing { listener: String },
}

impl ErrorExt for ListenerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::UnhandledMessage { .. } => StatusCode::UnhandledMessage,
            Self::RegistrationMissing { .. } => StatusCode::NotRegistered,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn metrics_tags(&self) -> Vec<(&'static str, String)> {
        let mut tags = vec![
            ("error_type", "listener".to_string()),
            ("status_code", self.status_code().to_string()),
        ];

        match self {
            Self::UnhandledMessage { listener, kind } => {
                tags.push(("listener", listener.clone()));
                tags.push(("kind", kind.clone()));
            }
            Self::RegistrationMissing { listener } => {
                tags.push(("listener", listener.clone()));
            }
        }

        tags
    }
}
