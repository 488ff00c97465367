use std::{fmt, rc::Rc};

use tracing::error;

use super::core::Shared;
use crate::kind::KindId;

/// Подавляет рассылку одного вида, пока жив.
///
/// Счётчик уменьшается при любом выходе из области видимости, в том числе
/// при панике.
#[must_use = "the kind is ignored only while the guard is alive"]
pub struct IgnoreGuard {
    shared: Rc<Shared>,
    kind: KindId,
}

impl IgnoreGuard {
    pub(super) fn new(
        shared: Rc<Shared>,
        kind: KindId,
    ) -> Self {
        Self { shared, kind }
    }

    pub fn kind(&self) -> KindId {
        self.kind
    }
}

impl Drop for IgnoreGuard {
    fn drop(&mut self) {
        self.shared.unignore(self.kind);
    }
}

impl fmt::Debug for IgnoreGuard {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("IgnoreGuard")
            .field("kind", &self.kind)
            .finish()
    }
}

/// Откладывает рассылку, пока жив.
///
/// При уничтожении самого внешнего guard'а отложенные сообщения
/// рассылаются в порядке поступления. `Drop` не может вернуть ошибку
/// обработчика, поэтому она только логируется; чтобы получить её, нужно
/// завершить область через [`DelayGuard::finish`].
#[must_use = "messages are delayed only while the guard is alive"]
pub struct DelayGuard {
    shared: Rc<Shared>,
    armed: bool,
}

impl DelayGuard {
    pub(super) fn new(shared: Rc<Shared>) -> Self {
        Self {
            shared,
            armed: true,
        }
    }

    /// Завершает область и рассылает отложенные сообщения.
    ///
    /// # Errors
    ///
    /// Первая ошибка обработчика при сбросе очереди. Оставшиеся сообщения
    /// выбрасываются.
    pub fn finish(mut self) -> anyhow::Result<()> {
        self.armed = false;
        self.shared.resume()
    }
}

impl Drop for DelayGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if std::thread::panicking() {
            self.shared.abandon();
            return;
        }
        if let Err(err) = self.shared.resume() {
            error!(error = %err, "handler failed while flushing delayed messages");
        }
    }
}

impl fmt::Debug for DelayGuard {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("DelayGuard")
            .field("armed", &self.armed)
            .finish()
    }
}
