//! Message channel abstraction between the host and the worker.

use crate::error::{SyncError, SyncResult};
use parking_lot::{Mutex, RwLock};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use storesync_protocol::{Envelope, ProtocolResult};
use storesync_value::Value;
use tokio::time::Instant;

/// Receives messages from the peer.
pub type MessageHandler = Arc<dyn Fn(Value) + Send + Sync>;

/// A reliable, order-preserving, bidirectional message channel.
///
/// This trait abstracts the transport, allowing for different
/// implementations (in-process queues, worker threads, mocks for testing).
pub trait MessageChannel: Send + Sync {
    /// Sends a message to the peer.
    fn send(&self, message: Value) -> SyncResult<()>;

    /// Sets the handler for messages from the peer.
    ///
    /// There is a single active handler. Setting a new one replaces the old.
    fn on_message(&self, handler: MessageHandler);
}

type Queue = Arc<Mutex<VecDeque<Value>>>;

/// One end of an in-memory channel pair.
///
/// Sent messages queue up at the peer until the peer calls
/// [`LoopbackChannel::deliver_pending`], which hands them to the peer's
/// handler in FIFO order.
pub struct LoopbackChannel {
    inbox: Queue,
    outbox: Queue,
    handler: RwLock<Option<MessageHandler>>,
    closed: Arc<AtomicBool>,
}

impl LoopbackChannel {
    /// Creates two connected endpoints.
    pub fn pair() -> (Self, Self) {
        let a_to_b: Queue = Arc::default();
        let b_to_a: Queue = Arc::default();
        let closed = Arc::new(AtomicBool::new(false));
        let a = Self {
            inbox: Arc::clone(&b_to_a),
            outbox: Arc::clone(&a_to_b),
            handler: RwLock::new(None),
            closed: Arc::clone(&closed),
        };
        let b = Self {
            inbox: a_to_b,
            outbox: b_to_a,
            handler: RwLock::new(None),
            closed,
        };
        (a, b)
    }

    /// Delivers queued messages to this endpoint's handler.
    ///
    /// Messages sent by the handler itself are delivered in the same call
    /// if they arrive at this endpoint. Returns the number of messages
    /// delivered. Messages stay queued while no handler is set.
    pub fn deliver_pending(&self) -> usize {
        let mut delivered = 0;
        loop {
            let Some(handler) = self.handler.read().clone() else {
                return delivered;
            };
            let Some(message) = self.inbox.lock().pop_front() else {
                return delivered;
            };
            handler(message);
            delivered += 1;
        }
    }

    /// Returns the number of messages waiting for this endpoint.
    pub fn pending(&self) -> usize {
        self.inbox.lock().len()
    }

    /// Closes both endpoints.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Returns true if the channel has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl MessageChannel for LoopbackChannel {
    fn send(&self, message: Value) -> SyncResult<()> {
        if self.is_closed() {
            return Err(SyncError::ChannelClosed);
        }
        self.outbox.lock().push_back(message);
        Ok(())
    }

    fn on_message(&self, handler: MessageHandler) {
        *self.handler.write() = Some(handler);
    }
}

/// A message sent through a [`MockChannel`].
#[derive(Debug, Clone)]
pub struct SentMessage {
    /// When the message was sent.
    pub at: Instant,
    /// The message.
    pub message: Value,
}

/// A mock channel for testing.
///
/// Records every sent message with its send time and lets tests inject
/// incoming messages.
#[derive(Default)]
pub struct MockChannel {
    sent: Mutex<Vec<SentMessage>>,
    handler: RwLock<Option<MessageHandler>>,
    fail_sends: AtomicBool,
}

impl MockChannel {
    /// Creates a new mock channel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all messages sent so far.
    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().clone()
    }

    /// Parses all sent messages as envelopes, skipping anything else.
    pub fn sent_envelopes(&self) -> ProtocolResult<Vec<Envelope>> {
        let mut envelopes = Vec::new();
        for sent in self.sent.lock().iter() {
            if let Some(envelope) = Envelope::from_message(&sent.message)? {
                envelopes.push(envelope);
            }
        }
        Ok(envelopes)
    }

    /// Removes and returns all messages sent so far.
    pub fn take_sent(&self) -> Vec<SentMessage> {
        std::mem::take(&mut *self.sent.lock())
    }

    /// Makes subsequent sends fail.
    pub fn set_fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// Hands `message` to the registered handler.
    ///
    /// Returns false if no handler is registered.
    pub fn deliver(&self, message: Value) -> bool {
        let Some(handler) = self.handler.read().clone() else {
            return false;
        };
        handler(message);
        true
    }

    /// Returns true if a handler is registered.
    pub fn has_handler(&self) -> bool {
        self.handler.read().is_some()
    }
}

impl MessageChannel for MockChannel {
    fn send(&self, message: Value) -> SyncResult<()> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(SyncError::channel("mock send failure"));
        }
        self.sent.lock().push(SentMessage {
            at: Instant::now(),
            message,
        });
        Ok(())
    }

    fn on_message(&self, handler: MessageHandler) {
        *self.handler.write() = Some(handler);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collector() -> (Arc<Mutex<Vec<Value>>>, MessageHandler) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, Arc::new(move |message: Value| sink.lock().push(message)))
    }

    #[test]
    fn loopback_is_fifo() {
        let (a, b) = LoopbackChannel::pair();
        let (seen, handler) = collector();
        b.on_message(handler);

        a.send(Value::from(1)).unwrap();
        a.send(Value::from(2)).unwrap();
        assert_eq!(b.pending(), 2);
        assert_eq!(a.pending(), 0);

        assert_eq!(b.deliver_pending(), 2);
        assert_eq!(*seen.lock(), vec![Value::from(1), Value::from(2)]);
    }

    #[test]
    fn loopback_holds_messages_without_handler() {
        let (a, b) = LoopbackChannel::pair();
        a.send(Value::from("early")).unwrap();
        assert_eq!(b.deliver_pending(), 0);
        assert_eq!(b.pending(), 1);
    }

    #[test]
    fn handler_replacement_does_not_fan_out() {
        let (a, b) = LoopbackChannel::pair();
        let (first, handler) = collector();
        b.on_message(handler);
        let (second, handler) = collector();
        b.on_message(handler);

        a.send(Value::Null).unwrap();
        b.deliver_pending();
        assert!(first.lock().is_empty());
        assert_eq!(second.lock().len(), 1);
    }

    #[test]
    fn closed_loopback_rejects_sends() {
        let (a, b) = LoopbackChannel::pair();
        b.close();
        assert!(a.is_closed());
        assert_eq!(a.send(Value::Null), Err(SyncError::ChannelClosed));
    }

    #[test]
    fn mock_records_and_delivers() {
        let channel = MockChannel::new();
        assert!(!channel.deliver(Value::Null));

        let (seen, handler) = collector();
        channel.on_message(handler);
        assert!(channel.has_handler());
        assert!(channel.deliver(Value::from("hello")));
        assert_eq!(seen.lock().len(), 1);

        channel.send(Value::from("out")).unwrap();
        assert_eq!(channel.sent().len(), 1);
        assert_eq!(channel.take_sent()[0].message, Value::from("out"));
        assert!(channel.sent().is_empty());
    }

    #[test]
    fn mock_send_failure() {
        let channel = MockChannel::new();
        channel.set_fail_sends(true);
        assert!(matches!(
            channel.send(Value::Null),
            Err(SyncError::Channel { .. })
        ));
    }
}
