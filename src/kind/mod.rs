//! Иерархия видов сообщений.
//!
//! - `tree`: построение дерева видов и O(1)-запросы глубины и предков.
//! - `standard`: каталог видов, используемых приложением.

pub mod standard;
pub mod tree;

pub use standard::{standard, StandardKinds};
pub use tree::*;
