use std::alloc::Layout;
use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use slab_allocator::backing::BackingAllocator;
use slab_allocator::slab::SlabAllocator;

const OPS: u64 = 10_000;

struct HostBacking;

unsafe impl BackingAllocator for HostBacking {
    fn allocate(&self, size: usize) -> Option<*mut u8> {
        let layout = Layout::from_size_align(size, 16).unwrap();
        let ptr = unsafe { std::alloc::alloc(layout) };
        (!ptr.is_null()).then_some(ptr)
    }

    unsafe fn deallocate(&self, ptr: *mut u8, size: usize) {
        let layout = Layout::from_size_align(size, 16).unwrap();
        unsafe { std::alloc::dealloc(ptr, layout) };
    }
}

/// Slab allocate/free throughput.
fn slab_alloc_free(heap: &SlabAllocator<HostBacking>, size: usize) {
    for _ in 0..OPS {
        let ptr = heap.allocate(size).unwrap();
        black_box(ptr);
        unsafe { heap.free(ptr) };
    }
}

/// Host heap alloc/free throughput, for comparison.
fn host_alloc_free(size: usize) {
    let layout = Layout::from_size_align(size, 16).unwrap();
    for _ in 0..OPS {
        unsafe {
            let ptr = std::alloc::alloc(layout);
            black_box(ptr);
            std::alloc::dealloc(ptr, layout);
        }
    }
}

fn benchmark_alloc_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("alloc_throughput");
    let heap = SlabAllocator::<HostBacking>::new(HostBacking);

    // One small class, one pow2 class, one large pass-through.
    for size in [16, 256, 2048, 8192, 131_072, 200_000] {
        group.throughput(Throughput::Elements(OPS));

        group.bench_with_input(BenchmarkId::new("slab", size), &size, |b, &size| {
            b.iter(|| slab_alloc_free(&heap, size));
        });

        group.bench_with_input(BenchmarkId::new("host", size), &size, |b, &size| {
            b.iter(|| host_alloc_free(size));
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_alloc_throughput);
criterion_main!(benches);
