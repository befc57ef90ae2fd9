use std::{hint::black_box, sync::Arc};
use criterion::{criterion_group, criterion_main, Criterion};
use serde_json::json;
use sluice::{
    channel::{
        CallContext,
        ChannelArgs,
        ChannelInit,
        ChannelStack,
        ChannelStackBuilder,
        ChannelStackType,
        Message,
        MessageSlot,
        StreamOpBatch
    },
    message_size::{register_message_size_filter, MessageSizeParser},
    Limit
};

fn channel(args: ChannelArgs) -> ChannelStack {
    let mut init = ChannelInit::new();
    register_message_size_filter(&mut init);

    let mut builder = ChannelStackBuilder::new(ChannelStackType::ClientDirectChannel, args);
    init.create_stack(&mut builder);

    // completes receive operations right away with an empty stream
    builder
        .build(Arc::new(|batch: StreamOpBatch| {
            if let Some(recv) = batch.recv_message {
                (recv.ready)(None);
            }
        }))
        .unwrap()
}

fn benchmark(c: &mut Criterion) {
    let payload = Message::new(vec![0u8; 1024]);
    let limited = channel(ChannelArgs::new().with_max_send_message_length(Limit::Limited(4096)));
    let rejecting = channel(ChannelArgs::new().with_max_send_message_length(Limit::Limited(16)));

    c.bench_function("send within limit", |b| b.iter(|| {
        let call = limited.create_call(CallContext::new()).unwrap();
        call.start_batch(StreamOpBatch::new().with_send_message(black_box(payload.clone())));
    }));
    c.bench_function("send over limit", |b| b.iter(|| {
        let call = rejecting.create_call(CallContext::new()).unwrap();
        call.start_batch(StreamOpBatch::new()
            .with_send_message(black_box(payload.clone()))
            .with_on_complete(|err| { black_box(err); }));
    }));
    c.bench_function("recv message", |b| b.iter(|| {
        let call = limited.create_call(CallContext::new()).unwrap();
        call.start_batch(StreamOpBatch::new().with_recv_message(MessageSlot::new(), |err| { black_box(err); }));
    }));
    c.bench_function("parse method config", |b| {
        let config = json!({ "maxRequestMessageBytes": "1024", "maxResponseMessageBytes": 4096 });
        b.iter(|| MessageSizeParser::parse(black_box(&config)))
    });
}

criterion_group!(benches, benchmark);
criterion_main!(benches);
