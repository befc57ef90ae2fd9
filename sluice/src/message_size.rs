//! Message size limiting
//!
//! Every call carries a send limit and a receive limit. The channel defaults
//! come from [`ChannelArgs`]; a method configuration may tighten them per call
//! with `maxRequestMessageBytes` (send) and `maxResponseMessageBytes` (receive).
//!
//! Outbound messages over the send limit are failed before they reach the
//! transport. Inbound messages over the receive limit fail the call with
//! [`Code::ResourceExhausted`](crate::error::Code::ResourceExhausted).
//!
//! # Example
//!
//! ```rust
//! use sluice::{
//!     channel::{ChannelArgs, ChannelInit, ChannelStackBuilder, ChannelStackType},
//!     message_size::{message_size_limits, register_message_size_filter},
//!     Limit,
//! };
//!
//! let args = ChannelArgs::new().with_max_receive_message_length(Limit::Limited(1024));
//! assert_eq!(message_size_limits(&args).max_recv_size.as_raw(), 1024);
//!
//! let mut init = ChannelInit::new();
//! register_message_size_filter(&mut init);
//!
//! let mut builder = ChannelStackBuilder::new(ChannelStackType::ServerChannel, args);
//! assert!(init.create_stack(&mut builder));
//! assert_eq!(builder.len(), 1);
//! ```

use crate::{
    channel::{ChannelArgs, DEFAULT_MAX_RECV_MESSAGE_LENGTH, DEFAULT_MAX_SEND_MESSAGE_LENGTH},
    limits::{Limit, MessageSizeLimit, MessageSizeLimits, MAX_MESSAGE_SIZE}
};

pub use self::{
    config::{MessageSizeParsedConfig, MessageSizeParser},
    filter::{CallPhase, MessageSizeCallData, MessageSizeFilter},
    install::{
        maybe_add_message_size_filter,
        maybe_add_message_size_filter_subchannel,
        register_message_size_filter
    }
};

mod config;
mod filter;
mod install;

/// Returns the channel's send limit
#[inline]
pub fn max_send_size_from_channel_args(args: &ChannelArgs) -> MessageSizeLimit {
    if args.wants_minimal_stack() {
        return MessageSizeLimit::unlimited();
    }
    resolve(
        "max_send_message_length",
        args.max_send_message_length(),
        DEFAULT_MAX_SEND_MESSAGE_LENGTH)
}

/// Returns the channel's receive limit
#[inline]
pub fn max_recv_size_from_channel_args(args: &ChannelArgs) -> MessageSizeLimit {
    if args.wants_minimal_stack() {
        return MessageSizeLimit::unlimited();
    }
    resolve(
        "max_receive_message_length",
        args.max_receive_message_length(),
        DEFAULT_MAX_RECV_MESSAGE_LENGTH)
}

/// Returns the default limits of a channel.
///
/// A minimal stack has no limits at all.
#[inline]
pub fn message_size_limits(args: &ChannelArgs) -> MessageSizeLimits {
    MessageSizeLimits::new(
        max_send_size_from_channel_args(args),
        max_recv_size_from_channel_args(args))
}

fn resolve(_name: &'static str, limit: Limit<usize>, default: MessageSizeLimit) -> MessageSizeLimit {
    match limit {
        Limit::Default => default,
        Limit::Unlimited => MessageSizeLimit::unlimited(),
        Limit::Limited(max) if max <= MAX_MESSAGE_SIZE => MessageSizeLimit::limited(max),
        Limit::Limited(_max) => {
            #[cfg(feature = "tracing")]
            tracing::warn!(arg = _name, value = _max, "channel arg out of range, using the default");
            default
        }
    }
}
