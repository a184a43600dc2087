//! Tests for the verifier capability: corruption reports must fire exactly
//! once per bad operation, and a verifier that records instead of halting
//! must leave the allocator fully usable.
//!
//! Each test uses its own verifier type and counter so the tests stay
//! independent under the parallel test runner.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};

use common::TrackingBacking;
use slab_allocator::config::DefaultConfig;
use slab_allocator::slab::SlabAllocator;
use slab_allocator::verifier::Verifier;

macro_rules! recording_verifier {
    ($name:ident, $corruption:ident, $config:ident) => {
        static $corruption: AtomicUsize = AtomicUsize::new(0);
        static $config: AtomicUsize = AtomicUsize::new(0);

        struct $name;

        impl Verifier for $name {
            fn double_free_or_corruption() {
                $corruption.fetch_add(1, Ordering::SeqCst);
            }

            fn invalid_config(_message: &str) {
                $config.fetch_add(1, Ordering::SeqCst);
            }
        }
    };
}

#[test]
fn test_double_free_reports_exactly_once() {
    recording_verifier!(V, CORRUPTION, CONFIG);
    let backing = TrackingBacking::new();
    let heap = SlabAllocator::<_, DefaultConfig, V>::new(&backing);

    let ptr = heap.allocate(64).unwrap();
    unsafe { heap.free(ptr) };
    assert_eq!(CORRUPTION.load(Ordering::SeqCst), 0);

    unsafe { heap.free(ptr) };
    assert_eq!(CORRUPTION.load(Ordering::SeqCst), 1);
    assert_eq!(CONFIG.load(Ordering::SeqCst), 0);

    // The second free must not have touched any state.
    assert_eq!(backing.outstanding(), 0);
    let again = heap.allocate(64).unwrap();
    unsafe { heap.free(again) };
    assert_eq!(backing.outstanding(), 0);
}

#[test]
fn test_free_of_unknown_pointer_reports() {
    recording_verifier!(V, CORRUPTION, CONFIG);
    let backing = TrackingBacking::new();
    let heap = SlabAllocator::<_, DefaultConfig, V>::new(&backing);

    let live = heap.allocate(32).unwrap();

    let bogus = std::ptr::without_provenance_mut::<u8>(0xDEAD_0000);
    unsafe { heap.free(bogus) };
    assert_eq!(CORRUPTION.load(Ordering::SeqCst), 1);

    // Null stays a defined no-op, not a corruption report.
    unsafe { heap.free(std::ptr::null_mut()) };
    assert_eq!(CORRUPTION.load(Ordering::SeqCst), 1);

    assert_eq!(heap.allocation_size(live), 32);
    unsafe { heap.free(live) };
    assert_eq!(backing.outstanding(), 0);
}

#[test]
fn test_size_query_of_unknown_pointer_reports() {
    recording_verifier!(V, CORRUPTION, CONFIG);
    let backing = TrackingBacking::new();
    let heap = SlabAllocator::<_, DefaultConfig, V>::new(&backing);

    let bogus = std::ptr::without_provenance_mut::<u8>(0xBAD_1000);
    assert_eq!(heap.allocation_size(bogus), 0);
    assert_eq!(CORRUPTION.load(Ordering::SeqCst), 1);
}
