//! Channel and call stacks
//!
//! A channel stack is an ordered list of filters in front of a transport.
//! Every filter is constructed once per channel from the [`ChannelArgs`].
//! When a call is created, every filter creates its own per-call element,
//! and the elements are composed into a chain: each one receives the batch
//! and a [`NextFn`] pointing to the element after it. The last element
//! hands batches to the transport.

use std::{fmt, sync::Arc};
use crate::error::Error;
use super::{
    args::ChannelArgs,
    batch::StreamOpBatch,
    init::ChannelStackType,
    CallContext
};

/// Points to the next call element, or the transport
pub type NextFn = Arc<
    dyn Fn(StreamOpBatch)
    + Send
    + Sync
>;

/// Per-channel part of a filter
pub trait ChannelFilter: Send + Sync + 'static {
    /// Creates the channel part of the filter
    fn init_channel_elem(args: &ChannelArgs) -> Result<Self, Error>
    where
        Self: Sized;

    /// Filter name
    fn name(&self) -> &'static str;

    /// Creates the per-call part of the filter
    fn init_call_elem(&self, context: &CallContext) -> Result<Arc<dyn CallElement>, Error>;
}

/// Per-call part of a filter
pub trait CallElement: Send + Sync + 'static {
    /// Handles a batch sent down the stack.
    ///
    /// An element either passes the batch to `next`, possibly modified,
    /// or completes it itself.
    fn start_transport_stream_op_batch(self: Arc<Self>, batch: StreamOpBatch, next: &NextFn);
}

type MakeFilterFn = fn(&ChannelArgs) -> Result<Arc<dyn ChannelFilter>, Error>;

#[inline]
fn make_filter<F: ChannelFilter>(args: &ChannelArgs) -> Result<Arc<dyn ChannelFilter>, Error> {
    let filter = F::init_channel_elem(args)?;
    Ok(Arc::new(filter))
}

/// Collects filters for a channel stack of a given type
pub struct ChannelStackBuilder {
    stack_type: ChannelStackType,
    args: ChannelArgs,
    filters: Vec<MakeFilterFn>,
}

impl fmt::Debug for ChannelStackBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelStackBuilder")
            .field("stack_type", &self.stack_type)
            .field("args", &self.args)
            .field("filters", &self.filters.len())
            .finish()
    }
}

impl ChannelStackBuilder {
    /// Creates an empty builder
    #[inline]
    pub fn new(stack_type: ChannelStackType, args: ChannelArgs) -> Self {
        Self { stack_type, args, filters: Vec::new() }
    }

    /// Returns the type of the stack being built
    #[inline]
    pub fn stack_type(&self) -> ChannelStackType {
        self.stack_type
    }

    /// Returns the arguments of the channel being built
    #[inline]
    pub fn channel_args(&self) -> &ChannelArgs {
        &self.args
    }

    /// Returns the number of filters added so far
    #[inline]
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Returns `true` if no filter was added
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Puts filter `F` in front of all filters added so far
    #[inline]
    pub fn prepend_filter<F: ChannelFilter>(&mut self) -> &mut Self {
        self.filters.insert(0, make_filter::<F>);
        self
    }

    /// Puts filter `F` after all filters added so far
    #[inline]
    pub fn append_filter<F: ChannelFilter>(&mut self) -> &mut Self {
        self.filters.push(make_filter::<F>);
        self
    }

    /// Constructs every filter and puts the stack in front of `transport`
    pub fn build(self, transport: NextFn) -> Result<ChannelStack, Error> {
        let filters = self.filters
            .iter()
            .map(|make| make(&self.args))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ChannelStack {
            stack_type: self.stack_type,
            filters,
            transport
        })
    }
}

/// A channel: constructed filters in front of a transport
pub struct ChannelStack {
    stack_type: ChannelStackType,
    filters: Vec<Arc<dyn ChannelFilter>>,
    transport: NextFn,
}

impl fmt::Debug for ChannelStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelStack")
            .field("stack_type", &self.stack_type)
            .field("filters", &self.filter_names())
            .finish()
    }
}

impl ChannelStack {
    /// Returns the type of this stack
    #[inline]
    pub fn stack_type(&self) -> ChannelStackType {
        self.stack_type
    }

    /// Returns the names of the filters, top to bottom
    pub fn filter_names(&self) -> Vec<&'static str> {
        self.filters
            .iter()
            .map(|filter| filter.name())
            .collect()
    }

    /// Creates the per-call elements of every filter and chains them
    pub fn create_call(&self, context: CallContext) -> Result<CallStack, Error> {
        let elements = self.filters
            .iter()
            .map(|filter| filter.init_call_elem(&context))
            .collect::<Result<Vec<_>, _>>()?;

        let mut next = self.transport.clone();
        for element in elements.into_iter().rev() {
            let prev_next = next.clone();
            next = Arc::new(move |batch| element
                .clone()
                .start_transport_stream_op_batch(batch, &prev_next));
        }

        Ok(CallStack { head: next, context })
    }
}

/// A call: the chain of per-call elements of a channel stack
pub struct CallStack {
    head: NextFn,
    context: CallContext,
}

impl fmt::Debug for CallStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallStack")
            .field("context", &self.context)
            .finish()
    }
}

impl CallStack {
    /// Returns the context the call was created with
    #[inline]
    pub fn context(&self) -> &CallContext {
        &self.context
    }

    /// Sends `batch` down the stack.
    ///
    /// The batch travels under the call combiner, which is released
    /// once the batch has been handed to the transport or failed.
    pub fn start_batch(&self, batch: StreamOpBatch) {
        let head = self.head.clone();
        let call_combiner = self.context.call_combiner().clone();
        self.context
            .call_combiner()
            .start(move || {
                head(batch);
                call_combiner.stop("batch sent down the stack");
            }, "start batch");
    }
}
