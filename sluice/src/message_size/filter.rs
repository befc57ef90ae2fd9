//! Message size filter
//!
//! Rejects outbound messages over the send limit before they reach the
//! transport, and fails calls whose inbound messages are over the receive
//! limit.
//!
//! # Receive path
//!
//! The filter puts its own continuations in place of the caller's
//! `recv_message` and `recv_trailing_metadata` continuations and keeps the
//! originals in the per-call state. The two completions may arrive in either
//! order:
//!
//! - **message first**: the size check runs, any violation is remembered,
//!   and the trailing metadata is later reported with the violation chained
//!   in.
//! - **trailing metadata first**: the trailing metadata is held back and the
//!   call combiner released, since the message check may still produce an
//!   error. Once the message completes, the held continuation is scheduled
//!   again on the combiner, before the message continuation runs.
//!
//! Either way, the trailing metadata is reported exactly once and carries the
//! error the inbound message failed with, size violations included. Inbound
//! messages completing after that are passed through unchecked.

use std::{
    fmt,
    mem,
    sync::{Arc, Mutex, MutexGuard, PoisonError}
};
use sluice_combiner::CallCombiner;
use crate::{
    channel::{
        closure,
        CallContext,
        CallElement,
        ChannelArgs,
        ChannelFilter,
        Closure,
        MessageSlot,
        NextFn,
        StreamOpBatch
    },
    error::{add_child, Code, Error},
    limits::MessageSizeLimits,
    service_config::ParserIndex
};
use super::{
    config::{MessageSizeParsedConfig, MessageSizeParser},
    message_size_limits
};

/// Progress of a call's receive path as seen by the message size filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallPhase {
    /// Neither the inbound message nor the trailing metadata completed
    AwaitingBoth,
    /// The inbound message completed, the trailing metadata did not
    AwaitingTrailing,
    /// The trailing metadata completed first and is held until the inbound message completes
    DeferredAwaitingMessage,
    /// The trailing metadata has been reported
    Done,
}

/// Channel part of the message size filter
#[derive(Debug, Clone, Copy)]
pub struct MessageSizeFilter {
    limits: MessageSizeLimits,
    parser_index: ParserIndex,
}

impl MessageSizeFilter {
    /// Creates the filter for a channel with `args`
    pub fn new(args: &ChannelArgs) -> Self {
        Self {
            limits: message_size_limits(args),
            parser_index: MessageSizeParser::parser_index(),
        }
    }

    /// Returns the default limits of the channel
    #[inline]
    pub fn limits(&self) -> MessageSizeLimits {
        self.limits
    }

    /// Resolves the limits of a call: the channel defaults,
    /// tightened by the called method's config if there is one
    pub fn call_limits(&self, context: &CallContext) -> MessageSizeLimits {
        match MessageSizeParsedConfig::from_call_context(context, self.parser_index) {
            Some(config) => self.limits.merge(config.limits()),
            None => self.limits,
        }
    }

    /// Creates the per-call state for a call with `context`
    #[inline]
    pub fn create_call_data(&self, context: &CallContext) -> Arc<MessageSizeCallData> {
        Arc::new(MessageSizeCallData::new(
            self.call_limits(context),
            context.call_combiner().clone()))
    }
}

impl ChannelFilter for MessageSizeFilter {
    #[inline]
    fn init_channel_elem(args: &ChannelArgs) -> Result<Self, Error> {
        Ok(Self::new(args))
    }

    #[inline]
    fn name(&self) -> &'static str {
        "message_size"
    }

    #[inline]
    fn init_call_elem(&self, context: &CallContext) -> Result<Arc<dyn CallElement>, Error> {
        Ok(self.create_call_data(context))
    }
}

#[derive(Default)]
struct CallState {
    /// Last error an inbound message completed with, size violations included
    error: Option<Error>,
    /// Slot of the pending inbound message
    recv_message: Option<MessageSlot>,
    /// Caller's `recv_message` continuation, `None` once consumed
    next_recv_message_ready: Option<Closure>,
    /// Caller's `recv_trailing_metadata` continuation, `None` once consumed
    original_recv_trailing_metadata_ready: Option<Closure>,
    /// Trailing metadata completed while a message was still pending
    seen_recv_trailing_metadata: bool,
    /// Error the held trailing metadata completed with
    recv_trailing_metadata_error: Option<Error>,
    recv_message_completed: bool,
    recv_trailing_metadata_reported: bool,
}

/// Per-call part of the message size filter
pub struct MessageSizeCallData {
    limits: MessageSizeLimits,
    call_combiner: Arc<CallCombiner>,
    state: Mutex<CallState>,
}

impl fmt::Debug for MessageSizeCallData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageSizeCallData")
            .field("limits", &self.limits)
            .field("phase", &self.phase())
            .finish()
    }
}

impl CallElement for MessageSizeCallData {
    fn start_transport_stream_op_batch(self: Arc<Self>, mut batch: StreamOpBatch, next: &NextFn) {
        if let Some(error) = batch.send_message
            .as_ref()
            .and_then(|message| self.check_send_size(message.len()))
        {
            batch.finish_with_failure(error, &self.call_combiner);
            return;
        }

        if let Some(recv) = batch.recv_message.as_mut() {
            let this = Arc::clone(&self);
            let original = mem::replace(
                &mut recv.ready,
                closure(move |error| this.on_recv_message_ready(error)));

            let mut state = self.lock();
            state.next_recv_message_ready = Some(original);
            state.recv_message = Some(recv.message.clone());
        }

        if let Some(recv) = batch.recv_trailing_metadata.as_mut() {
            let this = Arc::clone(&self);
            let original = mem::replace(
                &mut recv.ready,
                closure(move |error| this.on_recv_trailing_metadata_ready(error)));

            self.lock().original_recv_trailing_metadata_ready = Some(original);
        }

        next(batch);
    }
}

impl MessageSizeCallData {
    /// Creates the per-call state with already resolved `limits`
    #[inline]
    pub fn new(limits: MessageSizeLimits, call_combiner: Arc<CallCombiner>) -> Self {
        Self {
            limits,
            call_combiner,
            state: Mutex::new(CallState::default()),
        }
    }

    /// Returns the effective limits of the call
    #[inline]
    pub fn limits(&self) -> MessageSizeLimits {
        self.limits
    }

    /// Returns how far the receive path of the call has progressed
    pub fn phase(&self) -> CallPhase {
        let state = self.lock();
        if state.recv_trailing_metadata_reported {
            CallPhase::Done
        } else if state.seen_recv_trailing_metadata {
            CallPhase::DeferredAwaitingMessage
        } else if state.recv_message_completed {
            CallPhase::AwaitingTrailing
        } else {
            CallPhase::AwaitingBoth
        }
    }

    fn check_send_size(&self, len: usize) -> Option<Error> {
        let max = self.limits.max_send_size;
        if !max.is_exceeded_by(len) {
            return None;
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(len, max = max.as_raw(), "rejecting outbound message");

        Some(Error::with_code(
            Code::ResourceExhausted,
            format!("Sent message larger than max ({len} vs. {max})")))
    }

    fn check_recv_size(&self, len: usize) -> Option<Error> {
        let max = self.limits.max_recv_size;
        if !max.is_exceeded_by(len) {
            return None;
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(len, max = max.as_raw(), "rejecting inbound message");

        Some(Error::with_code(
            Code::ResourceExhausted,
            format!("Received message larger than max ({len} vs. {max})")))
    }

    fn on_recv_message_ready(self: Arc<Self>, error: Option<Error>) {
        let (next, error, held_trailing) = {
            let mut state = self.lock();
            let slot = state.recv_message.take();
            if state.recv_trailing_metadata_reported {
                // the call already finished, nothing left to fail
                let next = state.next_recv_message_ready.take();
                drop(state);
                if let Some(next) = next {
                    next(error);
                }
                return;
            }

            let len = slot.and_then(|slot| slot.len());
            let error = match len.and_then(|len| self.check_recv_size(len)) {
                Some(violation) => add_child(error, Some(violation)),
                None => error,
            };
            // the trailing metadata reports whatever failed the message
            if error.is_some() {
                state.error = error.clone();
            }

            state.recv_message_completed = true;
            let next = state.next_recv_message_ready.take();

            // a later recv_message op must not resume the trailing metadata again
            let held_trailing = mem::take(&mut state.seen_recv_trailing_metadata)
                .then(|| state.recv_trailing_metadata_error.take());

            (next, error, held_trailing)
        };

        if let Some(trailing_error) = held_trailing {
            #[cfg(feature = "tracing")]
            tracing::trace!("resuming held recv_trailing_metadata_ready");

            let this = Arc::clone(&self);
            self.call_combiner.start(
                move || this.on_recv_trailing_metadata_ready(trailing_error),
                "continue recv_trailing_metadata_ready");
        }

        if let Some(next) = next {
            next(error);
        }
    }

    fn on_recv_trailing_metadata_ready(self: Arc<Self>, error: Option<Error>) {
        let (original, error) = {
            let mut state = self.lock();
            if state.next_recv_message_ready.is_some() {
                state.seen_recv_trailing_metadata = true;
                state.recv_trailing_metadata_error = error;
                drop(state);

                #[cfg(feature = "tracing")]
                tracing::trace!("holding recv_trailing_metadata_ready until recv_message_ready");

                self.call_combiner.stop("deferring recv_trailing_metadata_ready until after recv_message_ready");
                return;
            }

            state.recv_trailing_metadata_reported = true;
            let error = add_child(error, state.error.clone());
            (state.original_recv_trailing_metadata_ready.take(), error)
        };

        if let Some(original) = original {
            original(error);
        }
    }

    #[inline]
    fn lock(&self) -> MutexGuard<'_, CallState> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
