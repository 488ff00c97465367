use std::{cell::RefCell, rc::Rc};

use messenger::{
    standard, Handler, HandlerResult, HasLifeline, Lifeline, Listener, Message, Messenger,
    MessengerError,
};

type Log = Rc<RefCell<Vec<&'static str>>>;

/// Виджет, который слушает хаб и ничего не знает о его времени жизни.
struct Widget {
    lifeline: Lifeline,
    name: &'static str,
    log: Log,
}

impl Widget {
    fn new(
        name: &'static str,
        log: &Log,
    ) -> Rc<Self> {
        Rc::new(Self {
            lifeline: Lifeline::new(),
            name,
            log: log.clone(),
        })
    }

    fn redraw(
        &self,
        _: &Message,
    ) -> HandlerResult {
        self.log.borrow_mut().push(self.name);
        Ok(())
    }
}

impl HasLifeline for Widget {
    fn lifeline(&self) -> &Lifeline {
        &self.lifeline
    }
}

impl Listener for Widget {
    fn notify(
        &self,
        message: &Message,
    ) -> HandlerResult {
        self.redraw(message)
    }
}

fn log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

/// Тест проверяет, что уничтоженный без отписки подписчик исчезает из
/// хаба, а рассылка продолжает работать.
#[test]
fn test_dropped_subscriber_is_forgotten() {
    let k = standard();
    let messenger = Messenger::standard();
    let log = log();
    let kept = Widget::new("kept", &log);
    let doomed = Widget::new("doomed", &log);

    messenger.subscribe_default(&kept, k.subset).unwrap();
    messenger.subscribe_default(&doomed, k.subset).unwrap();
    messenger.subscribe_default(&doomed, k.error).unwrap();
    assert_eq!(messenger.subscriber_count(), 2);

    drop(doomed);
    assert_eq!(messenger.subscriber_count(), 1);

    messenger.broadcast(Message::new(k.subset_create)).unwrap();
    messenger.broadcast(Message::new(k.error)).unwrap();
    assert_eq!(*log.borrow(), vec!["kept"]);
}

/// Тест проверяет, что уничтожение получателя метода снимает только
/// подписки с этим методом, а подписчик остаётся живым.
#[test]
fn test_dropped_method_receiver_removes_its_entries() {
    let k = standard();
    let messenger = Messenger::standard();
    let log = log();
    let panel = Widget::new("panel", &log);
    let plot = Widget::new("plot", &log);

    // панель подписывает метод графика на изменения данных
    messenger
        .subscribe_with(&panel, k.dataset, Handler::method(&plot, Widget::redraw))
        .unwrap();
    messenger.subscribe_default(&panel, k.selection).unwrap();
    assert!(messenger.is_subscribed(&panel, k.dataset));

    messenger.broadcast(Message::new(k.dataset_changed)).unwrap();
    assert_eq!(*log.borrow(), vec!["plot"]);

    drop(plot);
    assert!(!messenger.is_subscribed(&panel, k.dataset));
    assert!(messenger.get_handler(&panel, k.dataset).is_none());
    assert!(messenger.is_subscribed(&panel, k.selection));

    messenger.broadcast(Message::new(k.dataset_changed)).unwrap();
    messenger
        .broadcast(Message::new(k.selection_changed))
        .unwrap();
    assert_eq!(*log.borrow(), vec!["plot", "panel"]);
}

/// Тест проверяет, что подписчик, у которого остались только подписки на
/// уничтоженный получатель, удаляется из реестра.
#[test]
fn test_subscriber_without_entries_is_removed() {
    let k = standard();
    let messenger = Messenger::standard();
    let log = log();
    let panel = Widget::new("panel", &log);
    let plot = Widget::new("plot", &log);

    messenger
        .subscribe_with(&panel, k.dataset, Handler::method(&plot, Widget::redraw))
        .unwrap();
    assert_eq!(messenger.subscriber_count(), 1);

    drop(plot);
    assert_eq!(messenger.subscriber_count(), 0);
    assert_eq!(panel.lifeline().hook_count(), 0);
}

/// Тест проверяет, что хаб не продлевает жизнь подписчика и получателя.
#[test]
fn test_hub_holds_no_strong_references() {
    let k = standard();
    let messenger = Messenger::standard();
    let log = log();
    let panel = Widget::new("panel", &log);
    let plot = Widget::new("plot", &log);

    messenger.subscribe_default(&panel, k.dataset).unwrap();
    messenger
        .subscribe_with(&panel, k.subset, Handler::method(&plot, Widget::redraw))
        .unwrap();
    messenger.broadcast(Message::new(k.subset_update)).unwrap();

    assert_eq!(Rc::strong_count(&panel), 1);
    assert_eq!(Rc::strong_count(&plot), 1);
}

/// Тест проверяет, что отписка снимает финализаторы с подписчика и
/// получателей.
#[test]
fn test_unsubscribe_detaches_hooks() {
    let k = standard();
    let messenger = Messenger::standard();
    let log = log();
    let panel = Widget::new("panel", &log);
    let plot = Widget::new("plot", &log);

    messenger.subscribe_default(&panel, k.error).unwrap();
    messenger
        .subscribe_with(&panel, k.subset, Handler::method(&plot, Widget::redraw))
        .unwrap();
    assert_eq!(panel.lifeline().hook_count(), 1);
    assert_eq!(plot.lifeline().hook_count(), 1);

    messenger.unsubscribe(&panel, k.subset);
    assert_eq!(plot.lifeline().hook_count(), 0);
    assert_eq!(panel.lifeline().hook_count(), 1);

    messenger.unsubscribe_all(&panel);
    assert_eq!(panel.lifeline().hook_count(), 0);
}

/// Тест проверяет, что уничтожение хаба снимает его финализаторы с живых
/// объектов.
#[test]
fn test_dropping_messenger_detaches_hooks() {
    let k = standard();
    let log = log();
    let panel = Widget::new("panel", &log);
    let plot = Widget::new("plot", &log);

    {
        let messenger = Messenger::standard();
        messenger
            .subscribe_with(&panel, k.subset, Handler::method(&plot, Widget::redraw))
            .unwrap();
        assert_eq!(panel.lifeline().hook_count(), 1);
        assert_eq!(plot.lifeline().hook_count(), 1);
    }

    assert_eq!(panel.lifeline().hook_count(), 0);
    assert_eq!(plot.lifeline().hook_count(), 0);
}

/// Тест проверяет, что один объект может быть подписан на несколько хабов
/// независимо.
#[test]
fn test_independent_messengers() {
    let k = standard();
    let log = log();
    let widget = Widget::new("widget", &log);
    let first = Messenger::standard();
    let second = Messenger::standard();

    first.subscribe_default(&widget, k.error).unwrap();
    second.subscribe_default(&widget, k.error).unwrap();
    assert_eq!(widget.lifeline().hook_count(), 2);

    first.unsubscribe_all(&widget);
    assert_eq!(widget.lifeline().hook_count(), 1);

    first.broadcast(Message::new(k.error)).unwrap();
    second.broadcast(Message::new(k.error)).unwrap();
    assert_eq!(*log.borrow(), vec!["widget"]);

    drop(widget);
    assert_eq!(second.subscriber_count(), 0);
}

/// Тест проверяет, что клоны хаба разделяют один реестр.
#[test]
fn test_clones_share_registry() {
    let k = standard();
    let messenger = Messenger::standard();
    let clone = messenger.clone();
    let log = log();
    let widget = Widget::new("widget", &log);

    clone.subscribe_default(&widget, k.settings).unwrap();
    assert!(messenger.is_subscribed(&widget, k.settings));
    assert_eq!(messenger.id(), clone.id());

    drop(clone);
    messenger.broadcast(Message::new(k.settings)).unwrap();
    assert_eq!(*log.borrow(), vec!["widget"]);
}

/// Тест проверяет подписку по слабой ссылке.
#[test]
fn test_subscribe_weak() {
    let k = standard();
    let messenger = Messenger::standard();
    let log = log();
    let widget = Widget::new("widget", &log);
    let weak = Rc::downgrade(&widget);

    messenger.subscribe_weak(&weak, k.error, None, None).unwrap();
    assert!(messenger.is_subscribed(&widget, k.error));

    drop(widget);
    let err = messenger
        .subscribe_weak(&weak, k.error, None, None)
        .unwrap_err();
    assert!(matches!(err, MessengerError::InvalidSubscriber { .. }));
    assert_eq!(messenger.subscriber_count(), 0);
}
