/// Subscription callbacks: free functions and weakly bound methods.
pub mod callback;
/// Settings loading (defaults, optional file, `MESSENGER_*` environment).
pub mod config;
/// Per-subscriber kind → (handler, filter) storage.
pub mod container;
/// Error types and status codes.
pub mod error;
/// Message kind hierarchy and the standard kind catalog.
pub mod kind;
/// Drop hooks that let the hub forget dead objects.
pub mod lifeline;
/// The subscriber contract.
pub mod listener;
/// Console logging (filters, formats).
pub mod logging;
/// Messages and their payloads.
pub mod message;
/// The publish/subscribe hub.
pub mod messenger;

// -----------------------------------------------------------------------------
//  Frequently used public types
// -----------------------------------------------------------------------------

/// Callbacks.
pub use callback::{Callback, Filter, Handler, HandlerResult, LiveFilter, LiveHandler};
/// Settings.
pub use config::{MessengerConfig, Settings};
pub use container::CallbackContainer;
/// Errors.
pub use error::{
    CallbackRole, ErrorExt, KindTreeError, ListenerError, LoggingError, MessengerError,
    MessengerResult, StatusCode,
};
/// Kinds.
pub use kind::{standard, KindId, KindTree, KindTreeBuilder, StandardKinds};
pub use lifeline::{HasLifeline, Lifeline, LifelineId};
pub use listener::Listener;
pub use logging::{init_logging, LogFormat, LoggingConfig};
pub use message::{Message, MessagePayload};
/// Hub API.
pub use messenger::{DelayGuard, IgnoreGuard, Messenger, StatsSnapshot};
