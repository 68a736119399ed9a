/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Decoded FAST messages.

use crate::value::{FastDecimal, ScalarValue};
use bytes::Bytes;
use serde::Serialize;
use std::sync::Arc;

/// Value of one decoded instruction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum FieldValue {
    /// Absent optional field, group or sequence.
    Null,
    /// Scalar value.
    Scalar(ScalarValue),
    /// Group contents.
    Group(GroupValue),
    /// Sequence elements.
    Sequence(Vec<GroupValue>),
}

impl FieldValue {
    /// Returns true for [`FieldValue::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the scalar value.
    #[must_use]
    pub const fn as_scalar(&self) -> Option<&ScalarValue> {
        match self {
            Self::Scalar(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the group contents.
    #[must_use]
    pub const fn as_group(&self) -> Option<&GroupValue> {
        match self {
            Self::Group(g) => Some(g),
            _ => None,
        }
    }

    /// Returns the sequence elements.
    #[must_use]
    pub fn as_sequence(&self) -> Option<&[GroupValue]> {
        match self {
            Self::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Returns an integer value as i64.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        self.as_scalar().and_then(ScalarValue::as_i64)
    }

    /// Returns an integer value as u64.
    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        self.as_scalar().and_then(ScalarValue::as_u64)
    }

    /// Returns a string value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        self.as_scalar().and_then(ScalarValue::as_str)
    }

    /// Returns string or byte vector contents.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        self.as_scalar().and_then(ScalarValue::as_bytes)
    }

    /// Returns a decimal value.
    #[must_use]
    pub fn as_decimal(&self) -> Option<FastDecimal> {
        self.as_scalar().and_then(ScalarValue::as_decimal)
    }
}

impl From<Option<ScalarValue>> for FieldValue {
    fn from(value: Option<ScalarValue>) -> Self {
        value.map_or(Self::Null, Self::Scalar)
    }
}

/// Ordered `(name, value)` list for a message, group or sequence element.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct GroupValue {
    fields: Vec<(Arc<str>, FieldValue)>,
}

impl GroupValue {
    /// Creates an empty group value.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty group value with room for `capacity` fields.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: Vec::with_capacity(capacity),
        }
    }

    /// Appends a field.
    pub fn push(&mut self, name: Arc<str>, value: FieldValue) {
        self.fields.push((name, value));
    }

    /// Appends every field of `other`.
    pub fn append(&mut self, other: GroupValue) {
        self.fields.extend(other.fields);
    }

    /// Gets a field by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(n, _)| &**n == name)
            .map(|(_, v)| v)
    }

    /// Returns true if the field exists and is null, or does not exist.
    #[must_use]
    pub fn is_null(&self, name: &str) -> bool {
        self.get(name).is_none_or(FieldValue::is_null)
    }

    /// Gets an integer field as i64.
    #[must_use]
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(FieldValue::as_i64)
    }

    /// Gets an integer field as u64.
    #[must_use]
    pub fn get_u64(&self, name: &str) -> Option<u64> {
        self.get(name).and_then(FieldValue::as_u64)
    }

    /// Gets a string field.
    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FieldValue::as_str)
    }

    /// Gets a byte vector or string field as bytes.
    #[must_use]
    pub fn get_bytes(&self, name: &str) -> Option<&[u8]> {
        self.get(name).and_then(FieldValue::as_bytes)
    }

    /// Gets a decimal field.
    #[must_use]
    pub fn get_decimal(&self, name: &str) -> Option<FastDecimal> {
        self.get(name).and_then(FieldValue::as_decimal)
    }

    /// Iterates over fields in template order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(n, v)| (&**n, v))
    }

    /// Returns the number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if there are no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A decoded FAST message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    template_id: u32,
    fields: GroupValue,
}

impl Message {
    /// Creates a message.
    #[must_use]
    pub fn new(template_id: u32, fields: GroupValue) -> Self {
        Self {
            template_id,
            fields,
        }
    }

    /// Returns the id of the template the message was decoded with.
    #[must_use]
    pub const fn template_id(&self) -> u32 {
        self.template_id
    }

    /// Returns the top-level fields.
    #[must_use]
    pub const fn fields(&self) -> &GroupValue {
        &self.fields
    }

    /// Gets a top-level field by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Gets a top-level integer field as i64.
    #[must_use]
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.fields.get_i64(name)
    }

    /// Gets a top-level integer field as u64.
    #[must_use]
    pub fn get_u64(&self, name: &str) -> Option<u64> {
        self.fields.get_u64(name)
    }

    /// Gets a top-level string field.
    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.fields.get_str(name)
    }

    /// Consumes the message, returning its fields.
    #[must_use]
    pub fn into_fields(self) -> GroupValue {
        self.fields
    }
}

impl From<Bytes> for FieldValue {
    fn from(value: Bytes) -> Self {
        Self::Scalar(ScalarValue::Bytes(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_value_lookup() {
        let mut group = GroupValue::new();
        group.push(Arc::from("ChannelNo"), FieldValue::Scalar(ScalarValue::UInt(2011)));
        group.push(Arc::from("SecurityID"), FieldValue::Scalar(ScalarValue::from("000001")));
        group.push(Arc::from("TradingPhaseCode"), FieldValue::Null);

        assert_eq!(group.get_u64("ChannelNo"), Some(2011));
        assert_eq!(group.get_i64("ChannelNo"), Some(2011));
        assert_eq!(group.get_str("SecurityID"), Some("000001"));
        assert!(group.is_null("TradingPhaseCode"));
        assert!(group.is_null("Missing"));
        assert!(!group.is_null("ChannelNo"));
        assert_eq!(group.iter().map(|(n, _)| n).collect::<Vec<_>>(), [
            "ChannelNo",
            "SecurityID",
            "TradingPhaseCode"
        ]);
    }

    #[test]
    fn test_message_accessors() {
        let mut fields = GroupValue::with_capacity(1);
        fields.push(Arc::from("Px"), FieldValue::Scalar(FastDecimal::new(-2, 1005).into()));
        let message = Message::new(300111, fields);

        assert_eq!(message.template_id(), 300111);
        assert_eq!(
            message.fields().get_decimal("Px"),
            Some(FastDecimal::new(-2, 1005))
        );
        assert_eq!(message.get_str("Px"), None);
        assert_eq!(message.into_fields().len(), 1);
    }

    #[test]
    fn test_field_value_from_option() {
        assert!(FieldValue::from(None::<ScalarValue>).is_null());
        assert_eq!(
            FieldValue::from(Some(ScalarValue::Int(-3))).as_i64(),
            Some(-3)
        );
        assert_eq!(
            FieldValue::from(Bytes::from_static(b"\x01")).as_bytes(),
            Some(&b"\x01"[..])
        );
    }
}
