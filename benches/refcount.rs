//! Reference counting benchmarks
//!
//! Measures the acquire/release hot path, single-threaded and contended,
//! and teardown of owned chains.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::thread;

use beagle::gc;
use beagle::{Handle, HeapObject, ObjectHeader, StringObject};

#[repr(C)]
struct Node {
    header: ObjectHeader,
    next: Option<Handle<Node>>,
}

unsafe impl HeapObject for Node {}

fn node(next: Option<Handle<Node>>) -> Handle<Node> {
    Handle::new(Node {
        header: ObjectHeader::for_type::<Node>(),
        next,
    })
}

fn bench_acquire_release(c: &mut Criterion) {
    let handle = node(None);
    let header = handle.header_ptr();

    c.bench_function("acquire_release", |b| {
        b.iter(|| unsafe {
            gc::acquire(black_box(header));
            gc::release(black_box(header));
        })
    });

    c.bench_function("handle_clone_drop", |b| {
        b.iter(|| drop(black_box(handle.clone())))
    });
}

fn bench_contended(c: &mut Criterion) {
    let mut group = c.benchmark_group("contended_clone_drop");

    for threads in [2usize, 4, 8] {
        group.bench_with_input(BenchmarkId::from_parameter(threads), &threads, |b, &threads| {
            let shared = node(None);
            b.iter(|| {
                thread::scope(|scope| {
                    for _ in 0..threads {
                        scope.spawn(|| {
                            for _ in 0..1_000 {
                                drop(black_box(shared.clone()));
                            }
                        });
                    }
                });
            })
        });
    }

    group.finish();
}

fn bench_teardown(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain_teardown");

    for len in [1_000usize, 100_000] {
        group.bench_with_input(BenchmarkId::from_parameter(len), &len, |b, &len| {
            b.iter_with_setup(
                || (0..len).fold(None, |next, _| Some(node(next))),
                drop,
            )
        });
    }

    group.finish();
}

fn bench_strings(c: &mut Criterion) {
    let text = "the quick brown fox jumps over the lazy dog".repeat(4);

    c.bench_function("string_new", |b| {
        b.iter(|| StringObject::new(black_box(text.as_bytes())))
    });

    c.bench_function("string_from_static", |b| {
        b.iter(|| StringObject::from_static(black_box(b"literal")))
    });
}

criterion_group!(benches, bench_acquire_release, bench_contended, bench_teardown, bench_strings);
criterion_main!(benches);
