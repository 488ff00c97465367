use std::{fmt, sync::Arc};

use bytes::Bytes;

use crate::kind::KindId;

/// Полезная нагрузка сообщения.
///
/// Хаб не интерпретирует содержимое: оно нужно только обработчикам и
/// фильтрам.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum MessagePayload {
    #[default]
    Empty,
    Int(i64),
    Float(f64),
    Text(Arc<str>),
    Bytes(Bytes),
    Json(serde_json::Value),
}

impl MessagePayload {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Json(v) => v.as_i64(),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            Self::Json(v) => v.as_f64(),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s.as_ref()),
            Self::Json(v) => v.as_str(),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b.as_ref()),
            Self::Text(s) => Some(s.as_bytes()),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(v) => Some(v),
            _ => None,
        }
    }
}

impl From<i64> for MessagePayload {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for MessagePayload {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for MessagePayload {
    fn from(s: &str) -> Self {
        Self::Text(Arc::from(s))
    }
}

impl From<String> for MessagePayload {
    fn from(s: String) -> Self {
        Self::Text(Arc::from(s))
    }
}

impl From<Bytes> for MessagePayload {
    fn from(b: Bytes) -> Self {
        Self::Bytes(b)
    }
}

impl From<serde_json::Value> for MessagePayload {
    fn from(v: serde_json::Value) -> Self {
        Self::Json(v)
    }
}

/// Сообщение, рассылаемое через хаб.
///
/// Неизменяемо после построения; клонирование дешёвое (строки и байты
/// разделяются через `Arc`/`Bytes`).
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    kind: KindId,
    sender: Option<Arc<str>>,
    tag: Option<Arc<str>>,
    payload: MessagePayload,
}

impl Message {
    /// Сообщение вида `kind` без отправителя, тега и нагрузки.
    pub fn new(kind: KindId) -> Self {
        Self {
            kind,
            sender: None,
            tag: None,
            payload: MessagePayload::Empty,
        }
    }

    /// Имя компонента, отправившего сообщение.
    pub fn with_sender(
        mut self,
        sender: impl Into<Arc<str>>,
    ) -> Self {
        self.sender = Some(sender.into());
        self
    }

    /// Произвольный уточняющий тег.
    pub fn with_tag(
        mut self,
        tag: impl Into<Arc<str>>,
    ) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_payload(
        mut self,
        payload: impl Into<MessagePayload>,
    ) -> Self {
        self.payload = payload.into();
        self
    }

    pub fn kind(&self) -> KindId {
        self.kind
    }

    pub fn sender(&self) -> Option<&str> {
        self.sender.as_deref()
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn payload(&self) -> &MessagePayload {
        &self.payload
    }
}

impl fmt::Display for Message {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(sender) = &self.sender {
            write!(f, " from {sender}")?;
        }
        if let Some(tag) = &self.tag {
            write!(f, " [{tag}]")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::standard;

    /// Тест проверяет создание сообщения без отправителя и нагрузки.
    #[test]
    fn test_message_defaults() {
        let kind = standard().dataset_changed;
        let msg = Message::new(kind);

        assert_eq!(msg.kind(), kind);
        assert_eq!(msg.sender(), None);
        assert_eq!(msg.tag(), None);
        assert!(msg.payload().is_empty());
    }

    /// Тест проверяет заполнение отправителя, тега и нагрузки через
    /// builder-методы.
    #[test]
    fn test_message_builder() {
        let msg = Message::new(standard().subset_update)
            .with_sender("scatter")
            .with_tag("style")
            .with_payload("red");

        assert_eq!(msg.sender(), Some("scatter"));
        assert_eq!(msg.tag(), Some("style"));
        assert_eq!(msg.payload().as_text(), Some("red"));
    }

    /// Тест проверяет сообщение с бинарными данными в payload.
    #[test]
    fn test_message_with_binary_payload() {
        let pl = Bytes::from_static(&[0, 255, 128, 64, 0]);
        let msg = Message::new(standard().dataset).with_payload(pl.clone());

        assert_eq!(msg.payload().as_bytes(), Some(&pl[..]));
        assert_eq!(msg.payload().as_int(), None);
    }

    /// Тест проверяет числовые и JSON-представления нагрузки.
    #[test]
    fn test_payload_numeric_views() {
        assert_eq!(MessagePayload::from(42i64).as_int(), Some(42));
        assert_eq!(MessagePayload::from(42i64).as_float(), Some(42.0));
        assert_eq!(MessagePayload::from(0.5).as_float(), Some(0.5));

        let json = MessagePayload::from(serde_json::json!(7));
        assert_eq!(json.as_int(), Some(7));
        assert!(json.as_json().is_some());
        assert_eq!(MessagePayload::from("x").as_int(), None);
    }

    /// Тест проверяет, что клон равен оригиналу и разделяет строки.
    #[test]
    fn test_clone_is_equal() {
        let msg = Message::new(standard().error)
            .with_sender("loader")
            .with_payload(String::from("boom"));
        let copy = msg.clone();
        assert_eq!(msg, copy);
    }

    #[test]
    fn test_display() {
        let kind = standard().selection_changed;
        let msg = Message::new(kind).with_sender("table").with_tag("rows");
        let text = msg.to_string();
        assert!(text.starts_with(&format!("{kind:?}")));
        assert!(text.contains("from table"));
        assert!(text.ends_with("[rows]"));
    }
}
