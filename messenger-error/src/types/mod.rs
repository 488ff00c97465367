pub mod kind;
pub mod listener;
pub mod subscription;

// Публичный экспорт всех типов ошибок из вложенных модулей, чтобы упростить
// доступ к ним из внешнего кода.
pub use kind::*;
pub use listener::*;
pub use subscription::*;
