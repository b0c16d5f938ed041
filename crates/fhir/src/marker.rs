//! The resource encoder: turns one typed field into a marker observation.

use crate::labels::MarkerLabel;
use physio_types::{EmailAddress, NonEmptyText, UserId};
use physio_uuid::ShardableUuid;
use std::fmt;

/// Value carried by a marker: rendered as `valueString` or `valueInteger` on the wire.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum MarkerValue {
    Text(String),
    Integer(i64),
}

impl MarkerValue {
    /// Returns the string value, or `None` for integer markers.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MarkerValue::Text(text) => Some(text),
            MarkerValue::Integer(_) => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            MarkerValue::Integer(value) => Some(*value),
            MarkerValue::Text(_) => None,
        }
    }
}

impl fmt::Display for MarkerValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkerValue::Text(text) => f.write_str(text),
            MarkerValue::Integer(value) => write!(f, "{value}"),
        }
    }
}

impl From<String> for MarkerValue {
    fn from(value: String) -> Self {
        MarkerValue::Text(value)
    }
}

impl From<&str> for MarkerValue {
    fn from(value: &str) -> Self {
        MarkerValue::Text(value.to_owned())
    }
}

impl From<i64> for MarkerValue {
    fn from(value: i64) -> Self {
        MarkerValue::Integer(value)
    }
}

impl From<&NonEmptyText> for MarkerValue {
    fn from(value: &NonEmptyText) -> Self {
        MarkerValue::Text(value.as_str().to_owned())
    }
}

impl From<&UserId> for MarkerValue {
    fn from(value: &UserId) -> Self {
        MarkerValue::Text(value.as_str().to_owned())
    }
}

impl From<&EmailAddress> for MarkerValue {
    fn from(value: &EmailAddress) -> Self {
        MarkerValue::Text(value.as_str().to_owned())
    }
}

impl From<&ShardableUuid> for MarkerValue {
    fn from(value: &ShardableUuid) -> Self {
        MarkerValue::Text(value.to_string())
    }
}

/// A generic queryable fact: an Observation whose `code.text` is a vocabulary label.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MarkerResource {
    pub label: MarkerLabel,
    pub value: MarkerValue,
}

impl MarkerResource {
    /// True when this marker has `label` and exactly `value`.
    pub fn is(&self, label: MarkerLabel, value: &MarkerValue) -> bool {
        self.label == label && &self.value == value
    }
}

/// Encodes a single field as a marker resource.
///
/// Pure and deterministic: the same `(label, value)` always yields structurally equal markers.
pub fn encode_marker(label: MarkerLabel, value: impl Into<MarkerValue>) -> MarkerResource {
    MarkerResource {
        label,
        value: value.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoding_is_deterministic() {
        let first = encode_marker(MarkerLabel::Email, "APM@gmail.com");
        let second = encode_marker(MarkerLabel::Email, "APM@gmail.com".to_string());
        assert_eq!(first, second);
    }

    #[test]
    fn integer_and_text_values_differ() {
        let text = encode_marker(MarkerLabel::Height, "176");
        let integer = encode_marker(MarkerLabel::Height, 176_i64);
        assert_ne!(text, integer);
        assert_eq!(integer.value.as_integer(), Some(176));
        assert_eq!(text.value.as_text(), Some("176"));
    }

    #[test]
    fn typed_identifiers_encode_as_text() {
        let user_id = UserId::new("12345").unwrap();
        let marker = encode_marker(MarkerLabel::UserId, &user_id);
        assert!(marker.is(MarkerLabel::UserId, &MarkerValue::Text("12345".into())));

        let id = ShardableUuid::parse("550e8400e29b41d4a716446655440000").unwrap();
        let marker = encode_marker(MarkerLabel::PatientId, &id);
        assert_eq!(marker.value.to_string(), "550e8400e29b41d4a716446655440000");
    }
}
