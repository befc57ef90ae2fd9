//! Channel initialization stages
//!
//! [`ChannelInit`] holds, per [`ChannelStackType`], the stages that decide
//! which filters go into a new channel stack. Stages run in ascending
//! priority; stages with equal priority run in registration order.

use std::{collections::HashMap, fmt, sync::Arc};
use super::stack::ChannelStackBuilder;

/// Priority of the stages registered by the library itself
pub const BUILTIN_PRIORITY: i32 = 10_000;

/// Kind of channel stack being built
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelStackType {
    /// Client channel that load balances over subchannels
    ClientChannel,
    /// Connection to one backend, owned by a client channel
    ClientSubchannel,
    /// Client channel bound directly to a transport
    ClientDirectChannel,
    /// Client channel that fails every call
    ClientLameChannel,
    /// Server side of a connection
    ServerChannel,
}

/// A stage adds filters to a stack under construction.
///
/// Returning `false` aborts the construction of the stack.
pub type StageFn = Arc<
    dyn Fn(&mut ChannelStackBuilder) -> bool
    + Send
    + Sync
>;

struct Stage {
    priority: i32,
    stage: StageFn,
}

/// Registry of channel initialization stages
#[derive(Default)]
pub struct ChannelInit {
    stages: HashMap<ChannelStackType, Vec<Stage>>,
}

impl fmt::Debug for ChannelInit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: HashMap<_, _> = self.stages
            .iter()
            .map(|(stack_type, stages)| (stack_type, stages.len()))
            .collect();
        f.debug_struct("ChannelInit")
            .field("stages", &counts)
            .finish()
    }
}

impl ChannelInit {
    /// Creates an empty registry
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `stage` for stacks of `stack_type`
    pub fn register_stage<F>(&mut self, stack_type: ChannelStackType, priority: i32, stage: F) -> &mut Self
    where
        F: Fn(&mut ChannelStackBuilder) -> bool + Send + Sync + 'static
    {
        let stages = self.stages
            .entry(stack_type)
            .or_default();
        // stable insert keeps registration order among equal priorities
        let position = stages.partition_point(|s| s.priority <= priority);
        stages.insert(position, Stage { priority, stage: Arc::new(stage) });
        self
    }

    /// Returns the number of stages registered for `stack_type`
    #[inline]
    pub fn stage_count(&self, stack_type: ChannelStackType) -> usize {
        self.stages
            .get(&stack_type)
            .map_or(0, Vec::len)
    }

    /// Runs every stage registered for the builder's stack type.
    ///
    /// Returns `false` as soon as a stage fails.
    pub fn create_stack(&self, builder: &mut ChannelStackBuilder) -> bool {
        let Some(stages) = self.stages.get(&builder.stack_type()) else {
            return true;
        };
        stages
            .iter()
            .all(|s| (s.stage)(&mut *builder))
    }
}
