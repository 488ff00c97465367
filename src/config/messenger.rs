use serde::{Deserialize, Serialize};

/// Настройки хаба.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessengerConfig {
    /// `debug!` на каждую рассылку.
    pub log_broadcasts: bool,
    /// `trace!` на каждый вызов обработчика.
    pub log_deliveries: bool,
    /// Начальная ёмкость очереди отложенных сообщений.
    pub queue_capacity: usize,
}

impl Default for MessengerConfig {
    fn default() -> Self {
        Self {
            log_broadcasts: false,
            log_deliveries: false,
            queue_capacity: 16,
        }
    }
}
