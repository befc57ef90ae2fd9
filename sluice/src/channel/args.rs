//! Channel arguments
//!
//! [`ChannelArgs`] holds the channel-scoped settings filters read when a
//! channel stack is built.
//!
//! # Example
//!
//! ```rust
//! use sluice::{channel::ChannelArgs, Limit};
//!
//! let args = ChannelArgs::new()
//!     .with_max_send_message_length(Limit::Limited(1024))
//!     .with_max_receive_message_length(Limit::Unlimited);
//!
//! assert_eq!(args.max_send_message_length(), Limit::Limited(1024));
//! ```

use std::sync::Arc;
use crate::limits::{Limit, MessageSizeLimit};

/// Default maximum size of an inbound message (4 MiB)
pub const DEFAULT_MAX_RECV_MESSAGE_LENGTH: MessageSizeLimit = MessageSizeLimit::limited(4 * 1024 * 1024);

/// Default maximum size of an outbound message (unlimited)
pub const DEFAULT_MAX_SEND_MESSAGE_LENGTH: MessageSizeLimit = MessageSizeLimit::unlimited();

/// Channel-scoped settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelArgs {
    /// Maximum size of an outbound message.
    ///
    /// Default: unlimited
    max_send_message_length: Limit<usize>,

    /// Maximum size of an inbound message.
    ///
    /// Default: 4 MiB
    max_receive_message_length: Limit<usize>,

    /// Whether the channel opts out of all optional filters.
    ///
    /// Default: `false`
    minimal_stack: bool,

    /// Service configuration document the channel was created with
    service_config: Option<Arc<str>>,
}

impl Default for ChannelArgs {
    #[inline]
    fn default() -> Self {
        Self {
            max_send_message_length: Limit::Default,
            max_receive_message_length: Limit::Default,
            minimal_stack: false,
            service_config: None,
        }
    }
}

impl ChannelArgs {
    /// Creates channel arguments with default values
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum size of an outbound message
    #[inline]
    pub fn with_max_send_message_length(mut self, limit: Limit<usize>) -> Self {
        self.max_send_message_length = limit;
        self
    }

    /// Sets the maximum size of an inbound message
    #[inline]
    pub fn with_max_receive_message_length(mut self, limit: Limit<usize>) -> Self {
        self.max_receive_message_length = limit;
        self
    }

    /// Sets the maximum size of an outbound message from a raw integer, `-1` meaning unlimited
    #[inline]
    pub fn with_max_send_message_length_raw(self, raw: i64) -> Self {
        self.with_max_send_message_length(Limit::from_raw(raw))
    }

    /// Sets the maximum size of an inbound message from a raw integer, `-1` meaning unlimited
    #[inline]
    pub fn with_max_receive_message_length_raw(self, raw: i64) -> Self {
        self.with_max_receive_message_length(Limit::from_raw(raw))
    }

    /// Removes both message size limits
    ///
    /// ⚠️ Peers can then send messages of any size
    #[inline]
    pub fn without_message_size_limits(self) -> Self {
        self.with_max_send_message_length(Limit::Unlimited)
            .with_max_receive_message_length(Limit::Unlimited)
    }

    /// Opts the channel out of all optional filters
    #[inline]
    pub fn with_minimal_stack(mut self) -> Self {
        self.minimal_stack = true;
        self
    }

    /// Attaches a service configuration document
    #[inline]
    pub fn with_service_config(mut self, config: impl Into<Arc<str>>) -> Self {
        self.service_config = Some(config.into());
        self
    }

    /// Returns the configured maximum outbound message size
    #[inline]
    pub fn max_send_message_length(&self) -> Limit<usize> {
        self.max_send_message_length
    }

    /// Returns the configured maximum inbound message size
    #[inline]
    pub fn max_receive_message_length(&self) -> Limit<usize> {
        self.max_receive_message_length
    }

    /// Returns `true` if the channel opts out of all optional filters
    #[inline]
    pub fn wants_minimal_stack(&self) -> bool {
        self.minimal_stack
    }

    /// Returns the service configuration document, if any
    #[inline]
    pub fn service_config(&self) -> Option<&str> {
        self.service_config.as_deref()
    }
}
