use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
    fmt,
    rc::{Rc, Weak},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use messenger_error::MessengerError;
use rustc_hash::FxHashMap;
use tracing::{debug, trace, warn};

use super::{
    guards::{DelayGuard, IgnoreGuard},
    registry::{Evicted, Purge, Registry, SubscriberSlot},
    stats::{MessengerStats, StatsSnapshot},
};
use crate::{
    callback::{Filter, Handler, LiveFilter, LiveHandler},
    config::MessengerConfig,
    container::CallbackContainer,
    kind::{self, KindId, KindTree},
    lifeline::{HasLifeline, HookKey, LifelineId},
    listener::Listener,
    message::Message,
};

static NEXT_MESSENGER_ID: AtomicU64 = AtomicU64::new(1);

fn addr_of<S: ?Sized>(rc: &Rc<S>) -> *const () {
    Rc::as_ptr(rc) as *const ()
}

/// Подписка, выбранная для доставки.
struct Delivery {
    listener: &'static str,
    kind: KindId,
    handler: LiveHandler,
    filter: LiveFilter,
}

/// Общее состояние хаба.
pub(crate) struct Shared {
    id: u64,
    tree: Arc<KindTree>,
    config: MessengerConfig,
    registry: RefCell<Registry>,
    ignored: RefCell<FxHashMap<KindId, usize>>,
    /// Глубина вложенных `delay_callbacks`.
    paused: Cell<usize>,
    pending: RefCell<VecDeque<Message>>,
    /// Зачистки, пришедшие, пока реестр был занят.
    deferred: RefCell<Vec<Purge>>,
    stats: MessengerStats,
}

impl Shared {
    fn kind_name(
        &self,
        kind: KindId,
    ) -> &str {
        self.tree.name(kind).unwrap_or("<foreign>")
    }

    fn hook_key(
        &self,
        subscriber: LifelineId,
    ) -> HookKey {
        HookKey {
            hub: self.id,
            subscriber,
        }
    }

    pub(super) fn broadcast(
        &self,
        message: Message,
    ) -> anyhow::Result<()> {
        self.flush_deferred();
        self.stats.broadcast();

        let kind = message.kind();
        if self.ignore_count(kind) > 0 {
            self.stats.ignored();
            if self.config.log_broadcasts {
                debug!(kind = self.kind_name(kind), "broadcast ignored");
            }
            return Ok(());
        }

        if self.paused.get() > 0 {
            self.pending.borrow_mut().push_back(message);
            self.stats.queued();
            if self.config.log_broadcasts {
                debug!(kind = self.kind_name(kind), "broadcast delayed");
            }
            return Ok(());
        }

        if self.config.log_broadcasts {
            debug!(kind = self.kind_name(kind), message = %message, "broadcast");
        }
        self.dispatch(&message)
    }

    fn dispatch(
        &self,
        message: &Message,
    ) -> anyhow::Result<()> {
        let ids = self.registry.borrow().ids();
        let mut dead = Vec::new();

        for id in ids {
            let Some(delivery) = self.resolve(id, message.kind(), &mut dead) else {
                continue;
            };

            if !(delivery.filter)(message) {
                self.stats.filtered();
                continue;
            }

            if self.config.log_deliveries {
                trace!(
                    listener = delivery.listener,
                    kind = self.kind_name(delivery.kind),
                    "delivering message"
                );
            }
            (delivery.handler)(message)?;
            self.stats.delivered();
        }

        self.prune(dead);
        Ok(())
    }

    /// Самая специфичная живая подписка `id`, подходящая под `kind`.
    ///
    /// Предки перебираются от самого вида к корню, поэтому первая найденная
    /// подписка имеет наибольшую глубину.
    fn resolve(
        &self,
        id: LifelineId,
        kind: KindId,
        dead: &mut Vec<LifelineId>,
    ) -> Option<Delivery> {
        let registry = self.registry.borrow();
        let slot = registry.get(id)?;
        if !slot.is_alive() {
            dead.push(id);
            return None;
        }

        let matched = self
            .tree
            .ancestors(kind)
            .find(|candidate| slot.container.contains(*candidate))?;
        let (handler, filter) = slot.container.get(matched)?;

        Some(Delivery {
            listener: slot.name,
            kind: matched,
            handler,
            filter,
        })
    }

    fn prune(
        &self,
        dead: Vec<LifelineId>,
    ) {
        if dead.is_empty() {
            return;
        }

        let mut registry = self.registry.borrow_mut();
        let evicted: Vec<(LifelineId, SubscriberSlot)> = dead
            .into_iter()
            .filter_map(|id| registry.remove_dead(id).map(|slot| (id, slot)))
            .collect();
        drop(registry);

        for (id, slot) in evicted {
            debug!(listener = slot.name, "dropped dead subscriber");
            self.release(
                id,
                Evicted {
                    removed: Vec::new(),
                    slot: Some(slot),
                },
            );
        }
    }

    pub(super) fn ignore(
        &self,
        kind: KindId,
    ) {
        *self.ignored.borrow_mut().entry(kind).or_insert(0) += 1;
    }

    pub(super) fn unignore(
        &self,
        kind: KindId,
    ) {
        let mut ignored = self.ignored.borrow_mut();
        let remaining = match ignored.get_mut(&kind) {
            Some(count) => {
                *count = count.saturating_sub(1);
                *count
            }
            None => return,
        };
        if remaining == 0 {
            ignored.remove(&kind);
        }
    }

    fn ignore_count(
        &self,
        kind: KindId,
    ) -> usize {
        self.ignored.borrow().get(&kind).copied().unwrap_or(0)
    }

    pub(super) fn pause(&self) {
        self.paused.set(self.paused.get() + 1);
    }

    /// Выход из `delay_callbacks`. Внешний выход сбрасывает очередь.
    pub(super) fn resume(&self) -> anyhow::Result<()> {
        let depth = self.paused.get().saturating_sub(1);
        self.paused.set(depth);
        if depth > 0 {
            return Ok(());
        }
        self.drain()
    }

    /// Выход из `delay_callbacks` при панике: очередь выбрасывается.
    pub(super) fn abandon(&self) {
        let depth = self.paused.get().saturating_sub(1);
        self.paused.set(depth);
        if depth > 0 {
            return;
        }

        let discarded = std::mem::take(&mut *self.pending.borrow_mut());
        if !discarded.is_empty() {
            self.stats.dropped(discarded.len());
            warn!(
                dropped = discarded.len(),
                "delay scope left by panic, delayed messages discarded"
            );
        }
    }

    fn drain(&self) -> anyhow::Result<()> {
        loop {
            // обработчик мог снова приостановить хаб
            if self.paused.get() > 0 {
                return Ok(());
            }

            let next = self.pending.borrow_mut().pop_front();
            let Some(message) = next else {
                return Ok(());
            };

            if let Err(err) = self.broadcast(message) {
                let rest = std::mem::take(&mut *self.pending.borrow_mut());
                if !rest.is_empty() {
                    self.stats.dropped(rest.len());
                    warn!(
                        dropped = rest.len(),
                        "handler failed during flush, remaining delayed messages dropped"
                    );
                }
                return Err(err);
            }
        }
    }

    /// Финализатор сработал: записи подписчика больше не действительны.
    fn purge(
        &self,
        purge: Purge,
    ) {
        let applied = match self.registry.try_borrow_mut() {
            Ok(mut registry) => Some(registry.apply(purge)),
            Err(_) => None,
        };
        let Some(evicted) = applied else {
            self.deferred.borrow_mut().push(purge);
            return;
        };

        if !evicted.is_empty() {
            trace!(
                subscriber = %purge.subscriber,
                receiver = %purge.receiver,
                removed = evicted.removed.len(),
                "purged entries of a dropped object"
            );
        }
        self.release(purge.subscriber, evicted);
    }

    fn flush_deferred(&self) {
        let purges = std::mem::take(&mut *self.deferred.borrow_mut());
        for purge in purges {
            self.purge(purge);
        }
    }

    /// Снимает финализаторы, которые больше ни на что не ссылаются, и
    /// уничтожает снятые колбэки вне заимствования реестра.
    fn release(
        &self,
        subscriber: LifelineId,
        evicted: Evicted,
    ) {
        let Evicted { mut removed, slot } = evicted;
        let key = self.hook_key(subscriber);

        if let Some(mut slot) = slot {
            removed.extend(slot.container.drain());
            if let Some(owner) = slot.weak.upgrade() {
                owner.lifeline().detach(key);
            }
        }

        for (handler, filter) in &removed {
            let receivers = handler
                .upgrade_receiver()
                .into_iter()
                .chain(filter.upgrade_receiver());
            for receiver in receivers {
                let id = receiver.lifeline().id();
                if id != subscriber && !self.references(subscriber, id) {
                    receiver.lifeline().detach(key);
                }
            }
        }

        drop(removed);
    }

    fn references(
        &self,
        subscriber: LifelineId,
        receiver: LifelineId,
    ) -> bool {
        match self.registry.try_borrow() {
            Ok(registry) => registry
                .get(subscriber)
                .is_some_and(|slot| slot.container.references(receiver)),
            // лишний хук безвреден: сработав, он ничего не найдёт
            Err(_) => true,
        }
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        let slots = self.registry.get_mut().drain();
        for (id, slot) in slots {
            self.release(
                id,
                Evicted {
                    removed: Vec::new(),
                    slot: Some(slot),
                },
            );
        }
    }
}

/// Внутрипроцессный хаб publish/subscribe.
///
/// Дешёвый в клонировании дескриптор: все клоны разделяют один реестр.
/// Однопоточный (`!Send`), рассылка синхронна и выполняется в потоке
/// вызывающего.
///
/// Хаб не владеет подписчиками: он хранит на них только слабые ссылки, а
/// записи уничтоженных подписчиков снимаются финализаторами их
/// [`Lifeline`](crate::lifeline::Lifeline).
#[derive(Clone)]
pub struct Messenger {
    shared: Rc<Shared>,
}

impl Messenger {
    /// Хаб над деревом видов `tree` с настройками по умолчанию.
    pub fn new(tree: Arc<KindTree>) -> Self {
        Self::with_config(tree, MessengerConfig::default())
    }

    pub fn with_config(
        tree: Arc<KindTree>,
        config: MessengerConfig,
    ) -> Self {
        let id = NEXT_MESSENGER_ID.fetch_add(1, Ordering::Relaxed);
        debug!(
            messenger = id,
            kinds = tree.len(),
            queue_capacity = config.queue_capacity,
            "messenger created"
        );

        let pending = VecDeque::with_capacity(config.queue_capacity);
        Self {
            shared: Rc::new(Shared {
                id,
                tree,
                config,
                registry: RefCell::new(Registry::default()),
                ignored: RefCell::new(FxHashMap::default()),
                paused: Cell::new(0),
                pending: RefCell::new(pending),
                deferred: RefCell::new(Vec::new()),
                stats: MessengerStats::default(),
            }),
        }
    }

    /// Хаб над стандартным каталогом видов.
    pub fn standard() -> Self {
        Self::new(Arc::clone(kind::standard().tree()))
    }

    pub fn id(&self) -> u64 {
        self.shared.id
    }

    /// Дерево видов, которые распознаёт хаб.
    pub fn kinds(&self) -> &Arc<KindTree> {
        &self.shared.tree
    }

    pub fn config(&self) -> &MessengerConfig {
        &self.shared.config
    }

    /// Регистрирует или перезаписывает подписку (`subscriber`, `kind`).
    ///
    /// Без `handler` вызывается [`Listener::notify`] подписчика, без `filter`
    /// пропускаются все сообщения.
    ///
    /// # Errors
    ///
    /// - `InvalidMessageKind`, если `kind` не из дерева этого хаба;
    /// - `InvalidSubscriber`, если `Lifeline` подписчика уже использует
    ///   другой живой подписчик;
    /// - `InvalidCallback`, если получатель метода-колбэка уже уничтожен.
    pub fn subscribe<S: Listener>(
        &self,
        subscriber: &Rc<S>,
        kind: KindId,
        handler: Option<Handler>,
        filter: Option<Filter>,
    ) -> Result<(), MessengerError> {
        let handler = handler.unwrap_or_else(|| Handler::method(subscriber, S::notify));
        let filter = filter.unwrap_or_else(Filter::accept_all);
        self.insert(subscriber, kind, handler, filter)
    }

    /// Подписка с обработчиком по умолчанию (`notify`) и без фильтра.
    pub fn subscribe_default<S: Listener>(
        &self,
        subscriber: &Rc<S>,
        kind: KindId,
    ) -> Result<(), MessengerError> {
        self.subscribe(subscriber, kind, None, None)
    }

    pub fn subscribe_with<S: Listener>(
        &self,
        subscriber: &Rc<S>,
        kind: KindId,
        handler: Handler,
    ) -> Result<(), MessengerError> {
        self.subscribe(subscriber, kind, Some(handler), None)
    }

    /// Подписка по слабой ссылке. `InvalidSubscriber`, если подписчик уже
    /// уничтожен.
    pub fn subscribe_weak<S: Listener>(
        &self,
        subscriber: &Weak<S>,
        kind: KindId,
        handler: Option<Handler>,
        filter: Option<Filter>,
    ) -> Result<(), MessengerError> {
        let Some(strong) = subscriber.upgrade() else {
            return Err(MessengerError::invalid_subscriber(
                std::any::type_name::<S>(),
                "subscriber is no longer alive",
            ));
        };
        self.subscribe(&strong, kind, handler, filter)
    }

    fn insert<S: Listener>(
        &self,
        subscriber: &Rc<S>,
        kind: KindId,
        handler: Handler,
        filter: Filter,
    ) -> Result<(), MessengerError> {
        let shared = &self.shared;
        shared.flush_deferred();

        if !shared.tree.contains(kind) {
            return Err(MessengerError::invalid_kind(kind));
        }
        CallbackContainer::validate(&handler, &filter)?;

        let id = subscriber.lifeline().id();
        let addr = addr_of(subscriber);
        let name = subscriber.listener_name();

        // получатели методов, кроме самого подписчика: им нужен финализатор
        let bound: Vec<Rc<dyn HasLifeline>> = handler
            .upgrade_receiver()
            .into_iter()
            .chain(filter.upgrade_receiver())
            .filter(|receiver| receiver.lifeline().id() != id)
            .collect();

        let mut registry = shared.registry.borrow_mut();
        let conflict = registry
            .get(id)
            .is_some_and(|slot| slot.is_alive() && slot.addr != addr);
        if conflict {
            drop(registry);
            return Err(MessengerError::invalid_subscriber(
                name,
                "lifeline is already used by another live subscriber",
            ));
        }

        let stale = registry.remove_dead(id);
        let weak: Weak<S> = Rc::downgrade(subscriber);
        let slot = registry.insert_with(id, || SubscriberSlot::new(weak, addr, name));
        let previous = slot.container.set(kind, handler, filter);
        drop(registry);
        let previous = previous?;

        if let Some(stale) = stale {
            shared.release(
                id,
                Evicted {
                    removed: Vec::new(),
                    slot: Some(stale),
                },
            );
        }
        if let Some(previous) = previous {
            shared.release(
                id,
                Evicted {
                    removed: vec![previous],
                    slot: None,
                },
            );
        }

        let key = shared.hook_key(id);
        subscriber.lifeline().attach(
            key,
            self.finalizer(Purge {
                subscriber: id,
                receiver: id,
            }),
        );
        for receiver in &bound {
            receiver.lifeline().attach(
                key,
                self.finalizer(Purge {
                    subscriber: id,
                    receiver: receiver.lifeline().id(),
                }),
            );
        }

        trace!(
            listener = name,
            kind = shared.kind_name(kind),
            bound = bound.len(),
            "subscribed"
        );
        Ok(())
    }

    fn finalizer(
        &self,
        purge: Purge,
    ) -> impl FnOnce() + 'static {
        let shared = Rc::downgrade(&self.shared);
        move || {
            if let Some(shared) = shared.upgrade() {
                shared.purge(purge);
            }
        }
    }

    /// Снимает подписку (`subscriber`, `kind`), если она есть.
    pub fn unsubscribe<S: Listener + ?Sized>(
        &self,
        subscriber: &Rc<S>,
        kind: KindId,
    ) {
        self.shared.flush_deferred();
        let id = subscriber.lifeline().id();
        let evicted = self
            .shared
            .registry
            .borrow_mut()
            .remove_entry(id, addr_of(subscriber), kind);

        if !evicted.is_empty() {
            trace!(
                listener = subscriber.listener_name(),
                kind = self.shared.kind_name(kind),
                "unsubscribed"
            );
        }
        self.shared.release(id, evicted);
    }

    /// Снимает все подписки `subscriber`.
    pub fn unsubscribe_all<S: Listener + ?Sized>(
        &self,
        subscriber: &Rc<S>,
    ) {
        self.shared.flush_deferred();
        let id = subscriber.lifeline().id();
        let slot = self
            .shared
            .registry
            .borrow_mut()
            .remove_slot(id, addr_of(subscriber));

        if let Some(slot) = slot {
            trace!(
                listener = slot.name,
                entries = slot.container.len(),
                "unsubscribed from everything"
            );
            self.shared.release(
                id,
                Evicted {
                    removed: Vec::new(),
                    slot: Some(slot),
                },
            );
        }
    }

    /// Есть ли живая подписка (`subscriber`, `kind`).
    pub fn is_subscribed<S: Listener + ?Sized>(
        &self,
        subscriber: &Rc<S>,
        kind: KindId,
    ) -> bool {
        self.shared.flush_deferred();
        let registry = self.shared.registry.borrow();
        registry
            .slot_of(subscriber.lifeline().id(), addr_of(subscriber))
            .is_some_and(|slot| slot.is_alive() && slot.container.is_live(kind))
    }

    /// Восстановленный обработчик подписки или `None`.
    pub fn get_handler<S: Listener + ?Sized>(
        &self,
        subscriber: &Rc<S>,
        kind: KindId,
    ) -> Option<LiveHandler> {
        self.shared.flush_deferred();
        let registry = self.shared.registry.borrow();
        let live = registry
            .slot_of(subscriber.lifeline().id(), addr_of(subscriber))
            .filter(|slot| slot.is_alive())
            .and_then(|slot| slot.container.get(kind));
        drop(registry);
        live.map(|(handler, _)| handler)
    }

    /// Рассылает сообщение.
    ///
    /// Подавленный вид выбрасывается, во время паузы сообщение
    /// откладывается. Иначе каждый живой подписчик получает сообщение не
    /// более одного раза: по самой глубокой из подходящих подписок, если её
    /// фильтр пропускает сообщение.
    ///
    /// # Errors
    ///
    /// Первая ошибка обработчика возвращается без изменений; оставшиеся
    /// подписчики сообщение не получают.
    pub fn broadcast(
        &self,
        message: Message,
    ) -> anyhow::Result<()> {
        self.shared.broadcast(message)
    }

    /// Подавляет рассылку вида `kind`, пока жив возвращённый guard.
    pub fn ignore_callbacks(
        &self,
        kind: KindId,
    ) -> IgnoreGuard {
        self.shared.ignore(kind);
        IgnoreGuard::new(Rc::clone(&self.shared), kind)
    }

    /// Откладывает рассылку, пока жив возвращённый guard.
    ///
    /// Вложенные guard'ы не сбрасывают очередь: её сбрасывает только выход
    /// из самого внешнего. Сообщения рассылаются заново в порядке поступления
    /// по текущему состоянию подписок, без удаления дублей.
    pub fn delay_callbacks(&self) -> DelayGuard {
        self.shared.pause();
        DelayGuard::new(Rc::clone(&self.shared))
    }

    /// Вызывает [`Listener::register_to_messenger`].
    pub fn register<S: Listener + ?Sized>(
        &self,
        listener: &Rc<S>,
    ) -> Result<(), MessengerError> {
        Rc::clone(listener).register_to_messenger(self)
    }

    /// Вызывает [`Listener::unregister`].
    pub fn unregister<S: Listener + ?Sized>(
        &self,
        listener: &Rc<S>,
    ) {
        Rc::clone(listener).unregister(self);
    }

    /// Количество живых подписчиков.
    pub fn subscriber_count(&self) -> usize {
        self.shared.flush_deferred();
        self.shared.registry.borrow().live_count()
    }

    pub fn is_paused(&self) -> bool {
        self.shared.paused.get() > 0
    }

    /// Количество отложенных сообщений.
    pub fn pending_len(&self) -> usize {
        self.shared.pending.borrow().len()
    }

    pub fn ignore_count(
        &self,
        kind: KindId,
    ) -> usize {
        self.shared.ignore_count(kind)
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }
}

impl Default for Messenger {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for Messenger {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let registry = self.shared.registry.try_borrow();
        f.debug_struct("Messenger")
            .field("id", &self.shared.id)
            .field("kinds", &self.shared.tree.len())
            .field(
                "subscribers",
                &registry.map(|r| r.live_count()).unwrap_or_default(),
            )
            .field("paused", &self.shared.paused.get())
            .field("pending", &self.pending_len())
            .finish()
    }
}
