//! Channel and call plumbing
//!
//! The pieces a filter plugs into: channel arguments, stream operation
//! batches, channel/call stacks and channel initialization stages.

use std::sync::Arc;
use sluice_combiner::CallCombiner;
use crate::service_config::ServiceConfigCallData;

pub use self::{
    args::{ChannelArgs, DEFAULT_MAX_RECV_MESSAGE_LENGTH, DEFAULT_MAX_SEND_MESSAGE_LENGTH},
    batch::{closure, Closure, Message, MessageSlot, RecvMessage, RecvTrailingMetadata, StreamOpBatch},
    init::{ChannelInit, ChannelStackType, StageFn, BUILTIN_PRIORITY},
    stack::{CallElement, CallStack, ChannelFilter, ChannelStack, ChannelStackBuilder, NextFn}
};

pub mod args;
pub mod batch;
pub mod init;
pub mod stack;

/// Call-scoped collaborators handed to every filter when a call is created
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    call_combiner: Arc<CallCombiner>,
    service_config: Option<Arc<ServiceConfigCallData>>,
}

impl CallContext {
    /// Creates a context with a fresh call combiner and no service config
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches the service configuration of the called method
    #[inline]
    pub fn with_service_config(mut self, data: ServiceConfigCallData) -> Self {
        self.service_config = Some(Arc::new(data));
        self
    }

    /// Returns the call combiner of the call
    #[inline]
    pub fn call_combiner(&self) -> &Arc<CallCombiner> {
        &self.call_combiner
    }

    /// Returns the service configuration of the called method, if any
    #[inline]
    pub fn service_config_call_data(&self) -> Option<&ServiceConfigCallData> {
        self.service_config.as_deref()
    }
}
