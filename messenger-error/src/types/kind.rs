use std::any::Any;

use thiserror::Error;

use crate::{ErrorExt, StatusCode};

/// Ошибки построения иерархии видов сообщений.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KindTreeError {
    #[error("kind name must not be empty")]
    EmptyName,

    #[error("kind `{name}` is declared twice")]
    DuplicateKind { name: String },

    #[error("kind `{name}` refers to unknown parent `{parent}`")]
    UnknownParent { name: String, parent: String },

    #[error("kind tree is limited to {limit} kinds")]
    TooManyKinds { limit: usize },
}

impl ErrorExt for KindTreeError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::EmptyName => StatusCode::InvalidArgs,
            Self::DuplicateKind { .. } => StatusCode::DuplicateKind,
            Self::UnknownParent { .. } => StatusCode::UnknownParent,
            Self::TooManyKinds { .. } => StatusCode::KindLimitExceeded,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
