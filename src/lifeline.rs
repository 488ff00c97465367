//! Финализаторы для слабых ссылок.
//!
//! Хаб хранит подписчиков и получателей методов только через `Weak`. Чтобы
//! записи исчезали без опроса живости, каждый такой объект владеет
//! [`Lifeline`]: при уничтожении объекта поле уничтожается вместе с ним и
//! вызывает все прикреплённые хуки.

use std::{
    cell::RefCell,
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

use rustc_hash::FxHashMap;

static NEXT_LIFELINE_ID: AtomicU64 = AtomicU64::new(1);

/// Уникальный для процесса идентификатор [`Lifeline`].
///
/// Используется как ключ подписчика и получателя: в отличие от адреса
/// объекта, не переиспользуется после уничтожения.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LifelineId(u64);

impl LifelineId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for LifelineId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Ключ хука: (хаб, подписчик, чьи записи надо зачистить).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct HookKey {
    pub(crate) hub: u64,
    pub(crate) subscriber: LifelineId,
}

type Hook = Box<dyn FnOnce()>;

/// Точка привязки финализаторов к времени жизни объекта.
///
/// Встраивается полем в слушателя. Не клонируется: копия получила бы тот
/// же идентификатор.
pub struct Lifeline {
    id: LifelineId,
    hooks: RefCell<FxHashMap<HookKey, Hook>>,
}

impl Lifeline {
    pub fn new() -> Self {
        Self {
            id: LifelineId(NEXT_LIFELINE_ID.fetch_add(1, Ordering::Relaxed)),
            hooks: RefCell::new(FxHashMap::default()),
        }
    }

    pub fn id(&self) -> LifelineId {
        self.id
    }

    /// Количество прикреплённых хуков.
    pub fn hook_count(&self) -> usize {
        self.hooks.borrow().len()
    }

    /// Прикрепляет хук. Хук с тем же ключом заменяется.
    pub(crate) fn attach(
        &self,
        key: HookKey,
        hook: impl FnOnce() + 'static,
    ) {
        let previous = self.hooks.borrow_mut().insert(key, Box::new(hook));
        drop(previous);
    }

    /// Снимает хук, не вызывая его.
    pub(crate) fn detach(
        &self,
        key: HookKey,
    ) {
        let removed = self.hooks.borrow_mut().remove(&key);
        drop(removed);
    }

    pub(crate) fn is_attached(
        &self,
        key: HookKey,
    ) -> bool {
        self.hooks.borrow().contains_key(&key)
    }
}

impl Default for Lifeline {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Lifeline {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Lifeline")
            .field("id", &self.id)
            .field("hooks", &self.hook_count())
            .finish()
    }
}

impl Drop for Lifeline {
    fn drop(&mut self) {
        let hooks = std::mem::take(self.hooks.get_mut());
        for (_, hook) in hooks {
            hook();
        }
    }
}

/// Объект, время жизни которого отслеживается через [`Lifeline`].
///
/// Требуется от подписчиков и от получателей методов-обработчиков.
pub trait HasLifeline {
    fn lifeline(&self) -> &Lifeline;
}

impl HasLifeline for Lifeline {
    fn lifeline(&self) -> &Lifeline {
        self
    }
}
