//! Message model.
//!
//! A [`Message`] is one delivery unit on a channel: the tuple of values
//! a sender passed in a single send. Handlers receive the tuple
//! unpacked, so `p(out, 42)` arrives as two arguments.
//!
//! [`MsgValue`] carries plain data plus runtime handles. Handle
//! variants let a channel, process, or pool reference travel inside a
//! message and resolve to the *same* entity on the receiving side;
//! this is how worker processes are handed their reply channels.

use crate::channel::MessageChannel;
use crate::pool::Pool;
use crate::process::Process;
use std::collections::BTreeMap;
use std::sync::Arc;

/// One value inside a [`Message`].
#[derive(Debug, Clone, Default)]
pub enum MsgValue {
    /// Absent value.
    #[default]
    Nil,
    /// Boolean.
    Bool(bool),
    /// Integer number.
    Integer(i64),
    /// Floating-point number.
    Number(f64),
    /// UTF-8 text.
    Text(String),
    /// Sequential collection.
    List(Vec<MsgValue>),
    /// String-keyed collection.
    Record(BTreeMap<String, MsgValue>),
    /// Reference to a live channel.
    Channel(Arc<MessageChannel>),
    /// Reference to a live process.
    Process(Arc<Process>),
    /// Reference to a live pool.
    Pool(Arc<Pool>),
}

impl PartialEq for MsgValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Nil, Self::Nil) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Record(a), Self::Record(b)) => a == b,
            // Handles compare by identity, matching ptr-based equality
            // of the entities themselves.
            (Self::Channel(a), Self::Channel(b)) => Arc::ptr_eq(a, b),
            (Self::Process(a), Self::Process(b)) => Arc::ptr_eq(a, b),
            (Self::Pool(a), Self::Pool(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<bool> for MsgValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for MsgValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<f64> for MsgValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<&str> for MsgValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for MsgValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Arc<MessageChannel>> for MsgValue {
    fn from(v: Arc<MessageChannel>) -> Self {
        Self::Channel(v)
    }
}

/// One delivery unit: the value tuple of a single send.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Message(Vec<MsgValue>);

impl Message {
    /// Creates a message from a value tuple.
    #[must_use]
    pub fn new(values: Vec<MsgValue>) -> Self {
        Self(values)
    }

    /// Creates a single-value message.
    #[must_use]
    pub fn single(value: impl Into<MsgValue>) -> Self {
        Self(vec![value.into()])
    }

    /// Returns the value tuple.
    #[must_use]
    pub fn values(&self) -> &[MsgValue] {
        &self.0
    }

    /// Consumes the message into its value tuple.
    #[must_use]
    pub fn into_values(self) -> Vec<MsgValue> {
        self.0
    }

    /// Returns the tuple arity.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` for the empty tuple.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<V: Into<MsgValue>> FromIterator<V> for Message {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_from_iter() {
        let msg: Message = [1i64, 2, 3].into_iter().collect();
        assert_eq!(msg.len(), 3);
        assert_eq!(msg.values()[1], MsgValue::Integer(2));
    }

    #[test]
    fn single_value_message() {
        let msg = Message::single("hello");
        assert_eq!(msg.values(), &[MsgValue::Text("hello".into())]);
        assert!(!msg.is_empty());
    }

    #[test]
    fn scalar_equality() {
        assert_eq!(MsgValue::from(7i64), MsgValue::Integer(7));
        assert_ne!(MsgValue::Integer(7), MsgValue::Number(7.0));
        assert_eq!(MsgValue::Nil, MsgValue::Nil);
    }

    #[test]
    fn channel_handles_compare_by_identity() {
        let a = MessageChannel::unbounded();
        let b = MessageChannel::unbounded();
        assert_eq!(
            MsgValue::Channel(Arc::clone(&a)),
            MsgValue::Channel(Arc::clone(&a))
        );
        assert_ne!(MsgValue::Channel(a), MsgValue::Channel(b));
    }

    #[test]
    fn nested_collections() {
        let mut rec = BTreeMap::new();
        rec.insert("k".to_string(), MsgValue::List(vec![MsgValue::Nil]));
        let v = MsgValue::Record(rec.clone());
        assert_eq!(v, MsgValue::Record(rec));
    }
}
