//! Mailbox push/pop micro-benchmarks.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;

use whirlpool::mailbox::Mailbox;
use whirlpool::WorkItem;

fn noop(_input: &[u8], _output: &mut [u8]) {}

fn stub_item() -> WorkItem {
    // SAFETY: Empty slices; the procedure touches no buffer memory.
    unsafe { WorkItem::new(noop, &[], &mut []) }
}

fn bench_push_pop(c: &mut Criterion) {
    let mut group = c.benchmark_group("mailbox_push_pop");

    for capacity in [16usize, 256, 4096] {
        let mailbox = Mailbox::new(capacity);
        group.bench_with_input(
            BenchmarkId::from_parameter(capacity),
            &capacity,
            |b, _| {
                b.iter(|| {
                    mailbox.push(black_box(stub_item())).unwrap();
                    black_box(mailbox.pop()).unwrap();
                });
            },
        );
    }

    group.finish();
}

fn bench_fill_drain(c: &mut Criterion) {
    let mailbox = Mailbox::new(256);
    c.bench_function("mailbox_fill_drain_256", |b| {
        b.iter(|| {
            while mailbox.push(stub_item()).is_ok() {}
            while mailbox.pop().is_some() {}
        });
    });
}

criterion_group!(benches, bench_push_pop, bench_fill_drain);
criterion_main!(benches);
