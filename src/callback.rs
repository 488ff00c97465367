//! Колбэки подписок: свободные функции и методы со слабой привязкой к
//! получателю.

use std::{
    fmt,
    rc::{Rc, Weak},
};

use crate::{
    lifeline::{HasLifeline, LifelineId},
    message::Message,
};

/// Результат обработчика. Ошибка пробрасывается из `broadcast` как есть.
pub type HandlerResult = anyhow::Result<()>;

/// Готовый к вызову обработчик. Держит получателя живым на время вызова.
pub type LiveHandler = Rc<dyn Fn(&Message) -> HandlerResult>;

/// Готовый к вызову фильтр.
pub type LiveFilter = Rc<dyn Fn(&Message) -> bool>;

type Revive<R> = Rc<dyn Fn() -> Option<Rc<dyn Fn(&Message) -> R>>>;

enum Binding<R> {
    Free(Rc<dyn Fn(&Message) -> R>),
    Method {
        receiver: LifelineId,
        weak: Weak<dyn HasLifeline>,
        revive: Revive<R>,
    },
}

/// Сохранённый колбэк.
///
/// Метод хранится как пара (слабая ссылка на получателя, функция), поэтому
/// подписка не продлевает жизнь получателя.
pub struct Callback<R> {
    binding: Binding<R>,
}

/// Обработчик сообщений.
pub type Handler = Callback<HandlerResult>;

/// Фильтр сообщений.
pub type Filter = Callback<bool>;

impl<R: 'static> Callback<R> {
    /// Свободная функция или замыкание.
    pub fn func(f: impl Fn(&Message) -> R + 'static) -> Self {
        Self {
            binding: Binding::Free(Rc::new(f)),
        }
    }

    /// Метод `f`, привязанный к `receiver` через слабую ссылку.
    pub fn method<T, F>(
        receiver: &Rc<T>,
        f: F,
    ) -> Self
    where
        T: HasLifeline + 'static,
        F: Fn(&T, &Message) -> R + 'static,
    {
        let id = receiver.lifeline().id();
        let typed: Weak<T> = Rc::downgrade(receiver);
        let weak: Weak<dyn HasLifeline> = typed.clone();
        let f = Rc::new(f);

        let revive: Revive<R> = Rc::new(move || {
            let strong = typed.upgrade()?;
            let f = Rc::clone(&f);
            let live: Rc<dyn Fn(&Message) -> R> = Rc::new(move |msg: &Message| f(&*strong, msg));
            Some(live)
        });

        Self {
            binding: Binding::Method {
                receiver: id,
                weak,
                revive,
            },
        }
    }

    /// Идентификатор получателя, если колбэк является методом.
    pub fn receiver(&self) -> Option<LifelineId> {
        match &self.binding {
            Binding::Free(_) => None,
            Binding::Method { receiver, .. } => Some(*receiver),
        }
    }

    pub fn is_method(&self) -> bool {
        matches!(self.binding, Binding::Method { .. })
    }

    /// `false`, если получатель метода уже уничтожен.
    pub fn is_alive(&self) -> bool {
        match &self.binding {
            Binding::Free(_) => true,
            Binding::Method { weak, .. } => weak.strong_count() > 0,
        }
    }

    /// Восстанавливает вызываемый колбэк. `None` для мёртвого получателя.
    pub fn live(&self) -> Option<Rc<dyn Fn(&Message) -> R>> {
        match &self.binding {
            Binding::Free(f) => Some(Rc::clone(f)),
            Binding::Method { revive, .. } => revive(),
        }
    }

    /// Сильная ссылка на получателя метода.
    pub(crate) fn upgrade_receiver(&self) -> Option<Rc<dyn HasLifeline>> {
        match &self.binding {
            Binding::Free(_) => None,
            Binding::Method { weak, .. } => weak.upgrade(),
        }
    }
}

impl Filter {
    /// Фильтр по умолчанию: пропускает всё.
    pub fn accept_all() -> Self {
        Self::func(|_| true)
    }
}

impl<R> Clone for Callback<R> {
    fn clone(&self) -> Self {
        let binding = match &self.binding {
            Binding::Free(f) => Binding::Free(Rc::clone(f)),
            Binding::Method {
                receiver,
                weak,
                revive,
            } => Binding::Method {
                receiver: *receiver,
                weak: weak.clone(),
                revive: Rc::clone(revive),
            },
        };
        Self { binding }
    }
}

impl<R> fmt::Debug for Callback<R> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match &self.binding {
            Binding::Free(_) => f.write_str("Callback::Free"),
            Binding::Method { receiver, weak, .. } => f
                .debug_struct("Callback::Method")
                .field("receiver", receiver)
                .field("alive", &(weak.strong_count() > 0))
                .finish(),
        }
    }
}
