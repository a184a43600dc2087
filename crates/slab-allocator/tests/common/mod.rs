//! Shared test support: a backing allocator over the host heap that counts
//! outstanding regions, records every request size, and can be told to
//! start failing.

// Not every test binary exercises every helper.
#![allow(dead_code)]

use std::alloc::Layout;
use std::sync::Mutex;
use std::sync::atomic::{AtomicIsize, AtomicUsize, Ordering};

use slab_allocator::backing::BackingAllocator;

const BACKING_ALIGN: usize = 16;

pub struct TrackingBacking {
    outstanding: AtomicUsize,
    requests: Mutex<Vec<usize>>,
    remaining: AtomicIsize,
}

impl TrackingBacking {
    pub fn new() -> Self {
        Self {
            outstanding: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            remaining: AtomicIsize::new(isize::MAX),
        }
    }

    /// Number of regions handed out and not yet returned.
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }

    /// How many successful requests asked for exactly `size` bytes.
    pub fn requests_of(&self, size: usize) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|&&s| s == size)
            .count()
    }

    /// Allows `count` more successful requests, then fails every request.
    pub fn set_budget(&self, count: isize) {
        self.remaining.store(count, Ordering::SeqCst);
    }

    pub fn lift_budget(&self) {
        self.remaining.store(isize::MAX, Ordering::SeqCst);
    }
}

unsafe impl BackingAllocator for TrackingBacking {
    fn allocate(&self, size: usize) -> Option<*mut u8> {
        if self.remaining.fetch_sub(1, Ordering::SeqCst) <= 0 {
            return None;
        }
        let layout = Layout::from_size_align(size, BACKING_ALIGN).unwrap();
        let ptr = unsafe { std::alloc::alloc(layout) };
        if ptr.is_null() {
            return None;
        }
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(size);
        Some(ptr)
    }

    unsafe fn deallocate(&self, ptr: *mut u8, size: usize) {
        let layout = Layout::from_size_align(size, BACKING_ALIGN).unwrap();
        unsafe { std::alloc::dealloc(ptr, layout) };
        self.outstanding.fetch_sub(1, Ordering::SeqCst);
    }
}
