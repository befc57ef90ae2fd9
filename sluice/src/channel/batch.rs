//! Stream operation batches
//!
//! A [`StreamOpBatch`] is what a call sends down its filter stack: any
//! combination of an outbound message, a request to receive the next inbound
//! message, a request to receive the trailing metadata, and a completion
//! callback. Receive operations complete asynchronously by invoking their
//! continuations.

use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError}
};
use bytes::Bytes;
use sluice_combiner::CallCombiner;
use crate::error::Error;

/// A continuation invoked once with the outcome of an asynchronous step
pub type Closure = Box<
    dyn FnOnce(Option<Error>)
    + Send
    + 'static
>;

/// Boxes `f` into a [`Closure`]
#[inline]
pub fn closure<F>(f: F) -> Closure
where
    F: FnOnce(Option<Error>) + Send + 'static
{
    Box::new(f)
}

/// A serialized message
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Message {
    payload: Bytes,
}

impl Message {
    /// Creates a new message
    #[inline]
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self { payload: payload.into() }
    }

    /// Returns the message length in bytes
    #[inline]
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Returns `true` if the message has no payload
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Returns the payload
    #[inline]
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Unwraps the payload
    #[inline]
    pub fn into_payload(self) -> Bytes {
        self.payload
    }
}

/// Shared slot the transport fills with an inbound message
/// before firing the receive continuation.
///
/// The slot stays empty when the stream has no more messages.
#[derive(Clone, Default)]
pub struct MessageSlot {
    inner: Arc<Mutex<Option<Message>>>,
}

impl fmt::Debug for MessageSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageSlot")
            .field("len", &self.len())
            .finish()
    }
}

impl MessageSlot {
    /// Creates an empty slot
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an inbound message, replacing the previous one
    #[inline]
    pub fn set(&self, message: Option<Message>) {
        *self.lock() = message;
    }

    /// Takes the stored message out of the slot
    #[inline]
    pub fn take(&self) -> Option<Message> {
        self.lock().take()
    }

    /// Returns the length of the stored message, or `None` if the slot is empty
    #[inline]
    pub fn len(&self) -> Option<usize> {
        self.lock()
            .as_ref()
            .map(Message::len)
    }

    /// Returns `true` if the slot holds no message
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.lock().is_none()
    }

    #[inline]
    fn lock(&self) -> MutexGuard<'_, Option<Message>> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Request to receive the next inbound message
pub struct RecvMessage {
    /// Where the transport puts the message
    pub message: MessageSlot,

    /// Invoked once the slot has been filled, or the stream ended
    pub ready: Closure,
}

/// Request to receive the trailing metadata of the call
pub struct RecvTrailingMetadata {
    /// Invoked once the trailing metadata arrived
    pub ready: Closure,
}

/// A batch of stream operations passed down a filter stack
#[derive(Default)]
pub struct StreamOpBatch {
    /// Outbound message
    pub send_message: Option<Message>,

    /// Inbound message request
    pub recv_message: Option<RecvMessage>,

    /// Inbound trailing metadata request
    pub recv_trailing_metadata: Option<RecvTrailingMetadata>,

    /// Invoked once every send operation of the batch completed
    pub on_complete: Option<Closure>,
}

impl fmt::Debug for StreamOpBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamOpBatch")
            .field("send_message", &self.send_message.as_ref().map(Message::len))
            .field("recv_message", &self.recv_message.is_some())
            .field("recv_trailing_metadata", &self.recv_trailing_metadata.is_some())
            .field("on_complete", &self.on_complete.is_some())
            .finish()
    }
}

impl StreamOpBatch {
    /// Creates an empty batch
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an outbound message
    #[inline]
    pub fn with_send_message(mut self, message: Message) -> Self {
        self.send_message = Some(message);
        self
    }

    /// Adds an inbound message request
    #[inline]
    pub fn with_recv_message<F>(mut self, slot: MessageSlot, ready: F) -> Self
    where
        F: FnOnce(Option<Error>) + Send + 'static
    {
        self.recv_message = Some(RecvMessage { message: slot, ready: closure(ready) });
        self
    }

    /// Adds an inbound trailing metadata request
    #[inline]
    pub fn with_recv_trailing_metadata<F>(mut self, ready: F) -> Self
    where
        F: FnOnce(Option<Error>) + Send + 'static
    {
        self.recv_trailing_metadata = Some(RecvTrailingMetadata { ready: closure(ready) });
        self
    }

    /// Adds a completion callback
    #[inline]
    pub fn with_on_complete<F>(mut self, on_complete: F) -> Self
    where
        F: FnOnce(Option<Error>) + Send + 'static
    {
        self.on_complete = Some(closure(on_complete));
        self
    }

    /// Fails every operation of the batch with `error` without sending it further.
    ///
    /// Receive continuations are scheduled on the call combiner,
    /// the completion callback runs right away.
    pub fn finish_with_failure(self, error: Error, call_combiner: &CallCombiner) {
        let Self { send_message, recv_message, recv_trailing_metadata, on_complete } = self;
        drop(send_message);

        if let Some(recv) = recv_message {
            let error = error.clone();
            call_combiner.start(
                move || (recv.ready)(Some(error)),
                "failing recv_message_ready");
        }
        if let Some(recv) = recv_trailing_metadata {
            let error = error.clone();
            call_combiner.start(
                move || (recv.ready)(Some(error)),
                "failing recv_trailing_metadata_ready");
        }
        if let Some(on_complete) = on_complete {
            on_complete(Some(error));
        }
    }
}
