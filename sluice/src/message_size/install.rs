//! Installation of the message size filter into channel stacks

use crate::channel::{ChannelInit, ChannelStackBuilder, ChannelStackType, BUILTIN_PRIORITY};
use super::{filter::MessageSizeFilter, message_size_limits};

/// Returns `true` if a channel with the builder's args needs the filter.
///
/// The filter is skipped when neither direction is limited
/// and no service config could introduce a per-method limit.
fn should_install(builder: &ChannelStackBuilder) -> bool {
    let args = builder.channel_args();
    !message_size_limits(args).is_unlimited() || args.service_config().is_some()
}

/// Adds the filter on top of a subchannel stack unless a minimal stack was requested.
///
/// Subchannels carry the filter even without limits, since the method config
/// of a call is only known once the call is created.
pub fn maybe_add_message_size_filter_subchannel(builder: &mut ChannelStackBuilder) -> bool {
    if builder.channel_args().wants_minimal_stack() {
        return true;
    }
    builder.prepend_filter::<MessageSizeFilter>();
    true
}

/// Adds the filter on top of a direct client or server stack if it can reject anything
pub fn maybe_add_message_size_filter(builder: &mut ChannelStackBuilder) -> bool {
    if builder.channel_args().wants_minimal_stack() || !should_install(builder) {
        #[cfg(feature = "tracing")]
        tracing::debug!(stack_type = ?builder.stack_type(), "message size filter not needed");
        return true;
    }

    #[cfg(feature = "tracing")]
    tracing::debug!(stack_type = ?builder.stack_type(), "adding message size filter");
    builder.prepend_filter::<MessageSizeFilter>();
    true
}

/// Registers the message size filter stages
pub fn register_message_size_filter(init: &mut ChannelInit) {
    init.register_stage(
            ChannelStackType::ClientSubchannel,
            BUILTIN_PRIORITY,
            maybe_add_message_size_filter_subchannel)
        .register_stage(
            ChannelStackType::ClientDirectChannel,
            BUILTIN_PRIORITY,
            maybe_add_message_size_filter)
        .register_stage(
            ChannelStackType::ServerChannel,
            BUILTIN_PRIORITY,
            maybe_add_message_size_filter);
}
