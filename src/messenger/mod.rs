//! Хаб publish/subscribe.
//!
//! - `core`: реестр подписчиков, рассылка и состояние паузы/подавления.
//! - `registry`: записи подписчиков и зачистка по финализаторам.
//! - `guards`: RAII-области `ignore_callbacks` и `delay_callbacks`.
//! - `stats`: счётчики рассылки.

mod core;
mod guards;
mod registry;
mod stats;

pub use self::core::Messenger;
pub use self::guards::{DelayGuard, IgnoreGuard};
pub use self::stats::StatsSnapshot;
