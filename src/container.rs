use rustc_hash::{FxHashMap, FxHashSet};

use messenger_error::{CallbackRole, MessengerError};

use crate::{
    callback::{Filter, Handler, LiveFilter, LiveHandler},
    kind::KindId,
    lifeline::LifelineId,
};

#[derive(Debug, Clone)]
struct Entry {
    handler: Handler,
    filter: Filter,
}

/// Пара (обработчик, фильтр), снятая с контейнера.
///
/// Возвращается наружу, чтобы освобождение колбэков (а с ними, возможно, и
/// последних ссылок на объекты) происходило вне заимствования реестра.
pub type Removed = (Handler, Filter);

/// Подписки одного подписчика: вид сообщения → (обработчик, фильтр).
///
/// Контейнер никогда не владеет получателями методов.
#[derive(Debug, Default)]
pub struct CallbackContainer {
    entries: FxHashMap<KindId, Entry>,
}

impl CallbackContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Сохраняет подписку, заменяя прежнюю для того же вида.
    ///
    /// Ошибка `InvalidCallback`, если получатель метода уже уничтожен.
    pub fn set(
        &mut self,
        kind: KindId,
        handler: Handler,
        filter: Filter,
    ) -> Result<Option<Removed>, MessengerError> {
        Self::validate(&handler, &filter)?;
        let previous = self.entries.insert(kind, Entry { handler, filter });
        Ok(previous.map(|e| (e.handler, e.filter)))
    }

    /// Проверяет, что получатели обоих колбэков ещё живы.
    pub fn validate(
        handler: &Handler,
        filter: &Filter,
    ) -> Result<(), MessengerError> {
        if !handler.is_alive() {
            return Err(MessengerError::InvalidCallback {
                role: CallbackRole::Handler,
            });
        }
        if !filter.is_alive() {
            return Err(MessengerError::InvalidCallback {
                role: CallbackRole::Filter,
            });
        }
        Ok(())
    }

    /// Живые колбэки для вида. `None`, если подписки нет или получатель
    /// одного из колбэков уже уничтожен.
    pub fn get(
        &self,
        kind: KindId,
    ) -> Option<(LiveHandler, LiveFilter)> {
        let entry = self.entries.get(&kind)?;
        Some((entry.handler.live()?, entry.filter.live()?))
    }

    pub fn remove(
        &mut self,
        kind: KindId,
    ) -> Option<Removed> {
        self.entries.remove(&kind).map(|e| (e.handler, e.filter))
    }

    pub fn contains(
        &self,
        kind: KindId,
    ) -> bool {
        self.entries.contains_key(&kind)
    }

    /// Подписка есть и оба её колбэка живы.
    pub fn is_live(
        &self,
        kind: KindId,
    ) -> bool {
        self.entries
            .get(&kind)
            .is_some_and(|e| e.handler.is_alive() && e.filter.is_alive())
    }

    pub fn keys(&self) -> impl Iterator<Item = KindId> + '_ {
        self.entries.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Удаляет все подписки, обработчик или фильтр которых привязан к
    /// получателю `receiver`.
    pub fn purge_receiver(
        &mut self,
        receiver: LifelineId,
    ) -> Vec<Removed> {
        let doomed: Vec<KindId> = self
            .entries
            .iter()
            .filter(|(_, e)| {
                e.handler.receiver() == Some(receiver) || e.filter.receiver() == Some(receiver)
            })
            .map(|(kind, _)| *kind)
            .collect();

        doomed
            .into_iter()
            .filter_map(|kind| self.remove(kind))
            .collect()
    }

    /// Получатели методов, на которые ещё ссылаются подписки.
    pub fn receivers(&self) -> FxHashSet<LifelineId> {
        self.entries
            .values()
            .flat_map(|e| [e.handler.receiver(), e.filter.receiver()])
            .flatten()
            .collect()
    }

    pub fn references(
        &self,
        receiver: LifelineId,
    ) -> bool {
        self.entries.values().any(|e| {
            e.handler.receiver() == Some(receiver) || e.filter.receiver() == Some(receiver)
        })
    }

    /// Снимает все подписки.
    pub fn drain(&mut self) -> Vec<Removed> {
        self.entries
            .drain()
            .map(|(_, e)| (e.handler, e.filter))
            .collect()
    }
}
