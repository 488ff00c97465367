use std::cell::Cell;

use serde::Serialize;

/// Счётчики рассылки хаба.
#[derive(Debug, Default)]
pub(crate) struct MessengerStats {
    broadcasts: Cell<u64>,
    delivered: Cell<u64>,
    filtered: Cell<u64>,
    ignored: Cell<u64>,
    queued: Cell<u64>,
    dropped: Cell<u64>,
}

fn bump(
    counter: &Cell<u64>,
    by: u64,
) {
    counter.set(counter.get().saturating_add(by));
}

impl MessengerStats {
    pub(crate) fn broadcast(&self) {
        bump(&self.broadcasts, 1);
    }

    pub(crate) fn delivered(&self) {
        bump(&self.delivered, 1);
    }

    pub(crate) fn filtered(&self) {
        bump(&self.filtered, 1);
    }

    pub(crate) fn ignored(&self) {
        bump(&self.ignored, 1);
    }

    pub(crate) fn queued(&self) {
        bump(&self.queued, 1);
    }

    pub(crate) fn dropped(
        &self,
        count: usize,
    ) {
        bump(&self.dropped, count as u64);
    }

    pub(crate) fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            broadcasts: self.broadcasts.get(),
            delivered: self.delivered.get(),
            filtered: self.filtered.get(),
            ignored: self.ignored.get(),
            queued: self.queued.get(),
            dropped: self.dropped.get(),
        }
    }
}

/// Снимок счётчиков хаба.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Вызовы `broadcast`, включая повторные при сбросе очереди.
    pub broadcasts: u64,
    /// Вызовы обработчиков.
    pub delivered: u64,
    /// Подписки, отклонённые фильтром.
    pub filtered: u64,
    /// Сообщения, подавленные `ignore_callbacks`.
    pub ignored: u64,
    /// Сообщения, отложенные `delay_callbacks`.
    pub queued: u64,
    /// Отложенные сообщения, выброшенные после ошибки или паники.
    pub dropped: u64,
}
