//! # Shell-Broker Benchmarks
//!
//! | Component | Operation |
//! |-----------|-----------|
//! | shared-channel | write + try_read of one message |
//! | shared-types | directory request encode/decode |
//! | sb-01 | service lookup hit and miss |
//! | sb-04 | suspend + resolve of one call |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::Rng;
use sb_01_service_directory::{ConnectionContext, ServiceDirectory};
use sb_04_pending_requests::{
    ActionDescriptor, ExternalActionHost, ExternalOutcome, PendingCall, PendingError,
    PendingRequestTable, Token, TokenKind,
};
use shared_channel::{channel, Message};
use shared_types::{ApplicationName, DirectoryRequest, InterfaceName, RequestorIdentity};
use std::sync::Arc;

// ============================================================================
// shared-channel
// ============================================================================

fn bench_channel_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("shared-channel");
    let (writer, mut reader) = channel();

    for size in [16usize, 1024, 64 * 1024] {
        let payload: Vec<u8> = (0..size).map(|_| rand::thread_rng().gen()).collect();
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("write_try_read", size), &payload, |b, payload| {
            b.iter(|| {
                writer.write(Message::from(payload.clone())).unwrap();
                black_box(reader.try_read().unwrap())
            })
        });
    }
    group.finish();
}

// ============================================================================
// shared-types
// ============================================================================

fn bench_directory_request_codec(c: &mut Criterion) {
    let request = DirectoryRequest::connect_to_service(InterfaceName::new("NetworkService"));
    let bytes = request.encode().unwrap();

    c.bench_function("directory_request_encode", |b| {
        b.iter(|| black_box(request.encode().unwrap()))
    });
    c.bench_function("directory_request_decode", |b| {
        b.iter(|| black_box(DirectoryRequest::decode(&bytes).unwrap()))
    });
}

// ============================================================================
// sb-01 Service Directory
// ============================================================================

fn bench_service_lookup(c: &mut Criterion) {
    let mut directory = ServiceDirectory::default();
    for i in 0..64 {
        directory.register(format!("Service{i}"), |_, _| {}).unwrap();
    }
    let ctx = ConnectionContext::new(RequestorIdentity::anonymous(), ApplicationName::new("app:bench"));
    let hit = InterfaceName::new("Service42");
    let miss = InterfaceName::new("Missing");

    let mut group = c.benchmark_group("sb-01-service-directory");
    group.bench_function("resolve_hit", |b| {
        b.iter(|| {
            let (_client, server) = channel();
            black_box(directory.resolve(&hit, server, &ctx).is_ok())
        })
    });
    group.bench_function("resolve_miss", |b| {
        b.iter(|| {
            let (_client, server) = channel();
            black_box(directory.resolve(&miss, server, &ctx).is_err())
        })
    });
    group.finish();
}

// ============================================================================
// sb-04 Pending Requests
// ============================================================================

struct NullHost;

impl ExternalActionHost for NullHost {
    fn request_external_action(&self, _token: &Token, _action: ActionDescriptor) {}
}

fn bench_suspend_resolve(c: &mut Criterion) {
    let mut table: PendingRequestTable<u64, Vec<u8>> = PendingRequestTable::new(Arc::new(NullHost));

    c.bench_function("sb-04-suspend-resolve", |b| {
        b.iter(|| {
            let callback = Box::new(|result: Result<Vec<u8>, PendingError>| drop(black_box(result)));
            let call = PendingCall::deliver(7u64, callback, Ok);
            let token = table.suspend(TokenKind::ExpectResult, call, ActionDescriptor::new("bench"));
            black_box(table.resolve(&token, ExternalOutcome::Granted(vec![1, 2, 3])).is_unknown())
        })
    });
}

criterion_group!(
    benches,
    bench_channel_round_trip,
    bench_directory_request_codec,
    bench_service_lookup,
    bench_suspend_resolve
);
criterion_main!(benches);
