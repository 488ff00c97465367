use std::{collections::BTreeMap, rc::Weak};

use crate::{
    container::{CallbackContainer, Removed},
    kind::KindId,
    lifeline::{HasLifeline, LifelineId},
};

/// Запись о подписчике.
pub(crate) struct SubscriberSlot {
    pub(crate) weak: Weak<dyn HasLifeline>,
    /// Адрес объекта: отличает подписчика от другого объекта с тем же
    /// `Lifeline`.
    pub(crate) addr: *const (),
    pub(crate) name: &'static str,
    pub(crate) container: CallbackContainer,
}

impl SubscriberSlot {
    pub(crate) fn new(
        weak: Weak<dyn HasLifeline>,
        addr: *const (),
        name: &'static str,
    ) -> Self {
        Self {
            weak,
            addr,
            name,
            container: CallbackContainer::new(),
        }
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.weak.strong_count() > 0
    }
}

/// Запрос на зачистку: `receiver` уничтожен, его записи у `subscriber`
/// больше не действительны. При `receiver == subscriber` снимается весь
/// подписчик.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Purge {
    pub(crate) subscriber: LifelineId,
    pub(crate) receiver: LifelineId,
}

/// Всё, что было снято с реестра. Уничтожается вне заимствования.
#[derive(Default)]
pub(crate) struct Evicted {
    pub(crate) removed: Vec<Removed>,
    pub(crate) slot: Option<SubscriberSlot>,
}

impl Evicted {
    pub(crate) fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.slot.is_none()
    }
}

/// Реестр подписчиков хаба.
///
/// Упорядочен по `LifelineId`, то есть по времени создания подписчиков:
/// порядок обхода при рассылке стабилен.
#[derive(Default)]
pub(crate) struct Registry {
    slots: BTreeMap<LifelineId, SubscriberSlot>,
}

impl Registry {
    pub(crate) fn get(
        &self,
        id: LifelineId,
    ) -> Option<&SubscriberSlot> {
        self.slots.get(&id)
    }

    /// Запись, принадлежащая именно объекту по адресу `addr`.
    pub(crate) fn slot_of(
        &self,
        id: LifelineId,
        addr: *const (),
    ) -> Option<&SubscriberSlot> {
        self.slots.get(&id).filter(|slot| slot.addr == addr)
    }

    pub(crate) fn slot_of_mut(
        &mut self,
        id: LifelineId,
        addr: *const (),
    ) -> Option<&mut SubscriberSlot> {
        self.slots.get_mut(&id).filter(|slot| slot.addr == addr)
    }

    pub(crate) fn insert_with(
        &mut self,
        id: LifelineId,
        make: impl FnOnce() -> SubscriberSlot,
    ) -> &mut SubscriberSlot {
        self.slots.entry(id).or_insert_with(make)
    }

    /// Снимает запись объекта по адресу `addr` целиком.
    pub(crate) fn remove_slot(
        &mut self,
        id: LifelineId,
        addr: *const (),
    ) -> Option<SubscriberSlot> {
        self.slot_of(id, addr)?;
        self.slots.remove(&id)
    }

    /// Снимает запись, если её подписчик уже уничтожен.
    pub(crate) fn remove_dead(
        &mut self,
        id: LifelineId,
    ) -> Option<SubscriberSlot> {
        match self.slots.get(&id) {
            Some(slot) if !slot.is_alive() => self.slots.remove(&id),
            _ => None,
        }
    }

    /// Снимает одну подписку; пустая запись снимается целиком.
    pub(crate) fn remove_entry(
        &mut self,
        id: LifelineId,
        addr: *const (),
        kind: KindId,
    ) -> Evicted {
        let Some(slot) = self.slot_of_mut(id, addr) else {
            return Evicted::default();
        };
        let removed = slot.container.remove(kind).into_iter().collect();
        let slot = if slot.container.is_empty() {
            self.slots.remove(&id)
        } else {
            None
        };
        Evicted { removed, slot }
    }

    /// Применяет зачистку от финализатора.
    pub(crate) fn apply(
        &mut self,
        purge: Purge,
    ) -> Evicted {
        if purge.subscriber == purge.receiver {
            return Evicted {
                removed: Vec::new(),
                slot: self.slots.remove(&purge.subscriber),
            };
        }

        let Some(slot) = self.slots.get_mut(&purge.subscriber) else {
            return Evicted::default();
        };
        let removed = slot.container.purge_receiver(purge.receiver);
        let slot = if slot.container.is_empty() {
            self.slots.remove(&purge.subscriber)
        } else {
            None
        };
        Evicted { removed, slot }
    }

    /// Идентификаторы подписчиков в порядке обхода.
    pub(crate) fn ids(&self) -> Vec<LifelineId> {
        self.slots.keys().copied().collect()
    }

    pub(crate) fn live_count(&self) -> usize {
        self.slots.values().filter(|slot| slot.is_alive()).count()
    }

    pub(crate) fn drain(&mut self) -> Vec<(LifelineId, SubscriberSlot)> {
        std::mem::take(&mut self.slots).into_iter().collect()
    }
}
