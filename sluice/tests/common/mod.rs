#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use sluice::{
    channel::{
        CallContext,
        CallStack,
        ChannelArgs,
        ChannelInit,
        ChannelStackBuilder,
        ChannelStackType,
        Closure,
        Message,
        MessageSlot,
        StreamOpBatch
    },
    message_size::register_message_size_filter,
    CallCombiner,
    Error
};

pub type Outcomes = Arc<Mutex<Vec<(&'static str, Option<Error>)>>>;

/// Transport that keeps every batch reaching the bottom of the stack
#[derive(Clone, Default)]
pub struct Transport {
    batches: Arc<Mutex<Vec<StreamOpBatch>>>,
}

impl Transport {
    pub fn len(&self) -> usize {
        self.batches.lock().unwrap().len()
    }

    pub fn take(&self) -> StreamOpBatch {
        self.batches.lock().unwrap().remove(0)
    }

    pub fn sent_lengths(&self) -> Vec<usize> {
        self.batches
            .lock()
            .unwrap()
            .iter()
            .filter_map(|batch| batch.send_message.as_ref().map(Message::len))
            .collect()
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Builds a stack of `stack_type` with the message size filter registered and starts a call on it
pub fn start_call(stack_type: ChannelStackType, args: ChannelArgs, context: CallContext) -> (CallStack, Transport) {
    init_tracing();

    let mut init = ChannelInit::new();
    register_message_size_filter(&mut init);

    let mut builder = ChannelStackBuilder::new(stack_type, args);
    assert!(init.create_stack(&mut builder));

    let transport = Transport::default();
    let sink = transport.batches.clone();
    let channel = builder
        .build(Arc::new(move |batch| sink.lock().unwrap().push(batch)))
        .unwrap();

    let call = channel.create_call(context).unwrap();
    (call, transport)
}

/// Continuation of the application: records the outcome and releases the combiner
pub fn consumer(
    outcomes: &Outcomes,
    combiner: &Arc<CallCombiner>,
    name: &'static str
) -> impl FnOnce(Option<Error>) + Send + 'static {
    let outcomes = outcomes.clone();
    let combiner = combiner.clone();
    move |error| {
        outcomes.lock().unwrap().push((name, error));
        combiner.stop(name);
    }
}

/// Fills `slot` and completes the receive operation under the call combiner
pub fn deliver_message(combiner: &CallCombiner, slot: MessageSlot, ready: Closure, payload: &'static [u8]) {
    combiner.start(move || {
        slot.set(Some(Message::new(payload)));
        ready(None);
    }, "transport recv_message");
}

/// Completes the receive operation with `error` and no message under the call combiner
pub fn fail_message(combiner: &CallCombiner, ready: Closure, error: Error) {
    combiner.start(move || ready(Some(error)), "transport recv_message failed");
}

/// Completes the trailing metadata operation under the call combiner
pub fn deliver_trailing_metadata(combiner: &CallCombiner, ready: Closure) {
    combiner.start(move || ready(None), "transport recv_trailing_metadata");
}

pub fn names(outcomes: &Outcomes) -> Vec<&'static str> {
    outcomes
        .lock()
        .unwrap()
        .iter()
        .map(|(name, _)| *name)
        .collect()
}

pub fn error_of(outcomes: &Outcomes, name: &str) -> Option<Error> {
    outcomes
        .lock()
        .unwrap()
        .iter()
        .find(|(n, _)| *n == name)
        .and_then(|(_, error)| error.clone())
}
