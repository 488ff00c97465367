use std::{any::Any, fmt};

use thiserror::Error;

use crate::{ErrorExt, ListenerError, StatusCode};

/// Роль колбэка внутри подписки.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackRole {
    Handler,
    Filter,
}

impl fmt::Display for CallbackRole {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Self::Handler => write!(f, "handler"),
            Self::Filter => write!(f, "filter"),
        }
    }
}

/// Ошибки регистрации подписок.
///
/// Варианты различимы программно: вызывающий код отличает «плохой
/// подписчик» от «плохого вида сообщения» через `matches!`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessengerError {
    /// Подписчик не удовлетворяет контракту слушателя.
    #[error("invalid subscriber `{listener}`: {reason}")]
    InvalidSubscriber { listener: String, reason: String },

    /// Вид сообщения не принадлежит иерархии этого хаба.
    #[error("unrecognized message kind {kind}")]
    InvalidMessageKind { kind: String },

    /// Колбэк привязан к уже уничтоженному получателю.
    #[error("{role} is bound to a receiver that is no longer alive")]
    InvalidCallback { role: CallbackRole },

    /// Ошибка базового поведения слушателя (например, нет регистрации).
    #[error(transparent)]
    Listener(#[from] ListenerError),
}

impl MessengerError {
    pub fn invalid_subscriber(
        listener: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidSubscriber {
            listener: listener.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_kind(kind: impl fmt::Debug) -> Self {
        Self::InvalidMessageKind {
            kind: format!("{kind:?}"),
        }
    }
}

impl ErrorExt for MessengerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidSubscriber { .. } => StatusCode::InvalidSubscriber,
            Self::InvalidMessageKind { .. } => StatusCode::UnknownKind,
            Self::InvalidCallback { .. } => StatusCode::InvalidCallback,
            Self::Listener(err) => err.status_code(),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn metrics_tags(&self) -> Vec<(&'static str, String)> {
        let mut tags = vec![
            ("error_type", "subscription".to_string()),
            ("status_code", self.status_code().to_string()),
        ];

        match self {
            Self::InvalidSubscriber { listener, .. } => {
                tags.push(("listener", listener.clone()));
            }
            Self::InvalidMessageKind { kind } => {
                tags.push(("kind", kind.clone()));
            }
            Self::InvalidCallback { role } => {
                tags.push(("role", role.to_string()));
            }
            Self::Listener(err) => return err.metrics_tags(),
        }

        tags
    }
}
