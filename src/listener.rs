use std::rc::Rc;

use messenger_error::{ListenerError, MessengerError};

use crate::{
    callback::HandlerResult,
    lifeline::HasLifeline,
    message::Message,
    messenger::Messenger,
};

/// Минимальный контракт подписчика.
///
/// Реализации обычно вызывают [`Messenger::register`] сразу после создания
/// и [`Messenger::unregister`] при разборе.
///
/// ```ignore
/// struct Table {
///     lifeline: Lifeline,
/// }
///
/// impl HasLifeline for Table {
///     fn lifeline(&self) -> &Lifeline {
///         &self.lifeline
///     }
/// }
///
/// impl Listener for Table {
///     fn register_to_messenger(
///         self: Rc<Self>,
///         messenger: &Messenger,
///     ) -> Result<(), MessengerError> {
///         messenger.subscribe_default(&self, standard().dataset_changed)
///     }
///
///     fn notify(&self, message: &Message) -> HandlerResult {
///         // перерисовать таблицу
///         Ok(())
///     }
/// }
/// ```
pub trait Listener: HasLifeline + 'static {
    /// Имя для логов и ошибок.
    fn listener_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Обработчик по умолчанию.
    ///
    /// Базовая реализация возвращает `UnhandledMessage`: тип подписан без
    /// явного обработчика, но `notify` не переопределил.
    fn notify(
        &self,
        message: &Message,
    ) -> HandlerResult {
        Err(ListenerError::UnhandledMessage {
            listener: self.listener_name().to_string(),
            kind: format!("{:?}", message.kind()),
        }
        .into())
    }

    /// Объявляет подписки слушателя.
    ///
    /// Базовая реализация возвращает `RegistrationMissing`: каждый
    /// слушатель обязан перечислить свои подписки явно.
    fn register_to_messenger(
        self: Rc<Self>,
        messenger: &Messenger,
    ) -> Result<(), MessengerError> {
        let _ = messenger;
        Err(ListenerError::RegistrationMissing {
            listener: self.listener_name().to_string(),
        }
        .into())
    }

    /// Снимает подписки слушателя.
    fn unregister(
        self: Rc<Self>,
        messenger: &Messenger,
    ) {
        messenger.unsubscribe_all(&self);
    }
}
