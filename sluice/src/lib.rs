//! # Sluice
//!
//! Message size limiting for RPC filter pipelines.
//!
//! Sluice sits in a call's filter stack and enforces a maximum size on
//! outbound and inbound messages. Limits come from channel defaults and may
//! be tightened per method by a service configuration document.
//!
//! ## Features
//! * Channel-wide send/receive limits with per-method overrides
//! * Per-method config parsing with aggregated field errors
//! * Receive-path ordering that reports trailing metadata exactly once
//! * Optional `tracing` logs
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use sluice::{
//!     channel::{ChannelArgs, ChannelInit, ChannelStackBuilder, ChannelStackType, CallContext, Message, StreamOpBatch},
//!     message_size::register_message_size_filter,
//!     Limit,
//! };
//!
//! let mut init = ChannelInit::new();
//! register_message_size_filter(&mut init);
//!
//! let args = ChannelArgs::new().with_max_send_message_length(Limit::Limited(4));
//! let mut builder = ChannelStackBuilder::new(ChannelStackType::ClientDirectChannel, args);
//! assert!(init.create_stack(&mut builder));
//!
//! let channel = builder.build(Arc::new(|_batch| {})).unwrap();
//! let call = channel.create_call(CallContext::new()).unwrap();
//!
//! call.start_batch(StreamOpBatch::new()
//!     .with_send_message(Message::new("too long"))
//!     .with_on_complete(|err| assert!(err.is_some())));
//! ```

pub mod channel;
pub mod error;
pub mod limits;
pub mod message_size;
pub mod service_config;

pub use crate::{
    error::{Code, Error},
    limits::{Limit, MessageSizeLimit, MessageSizeLimits},
};
pub use sluice_combiner::CallCombiner;
