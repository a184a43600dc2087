//! The slab allocator.
//!
//! [`SlabAllocator`] composes the spin mutex, the intrusive list, and the
//! intrusive red-black tree into a thread-safe allocator over a
//! [`BackingAllocator`]. See the crate docs for the overall architecture;
//! this module implements the three routing strategies and the metadata
//! lifecycle.
//!
//! # Locking
//!
//! Four independent lock domains exist: the address index, the
//! metadata-page bucket, and one bucket per size class. An allocation
//! takes the metadata lock, then the class lock, then the index lock; a
//! free takes the index lock, then the class lock, then the metadata lock.
//! The locks are taken strictly one after another, never nested, so the
//! opposing orders cannot deadlock. The whole operation is deliberately
//! not atomic; instead, a backing-allocator failure in the middle of an
//! allocation rolls the already-reserved record back before `None` is
//! returned, so no partial reservation survives.

use core::marker::PhantomData;

use intrusive::list::List;
use intrusive::rbtree::RbTree;

use crate::arena::{self, AllocRecord, Arena, ArenaGeometry, FreeBlock, MetaPage};
use crate::backing::BackingAllocator;
use crate::config::{DefaultConfig, SlabConfig, pow2_class_count};
use crate::spinlock::SpinMutex;
use crate::verifier::{TrapVerifier, Verifier};

/// Bucket capacity for small classes; configurations are checked against
/// it at compile time.
const MAX_SMALL_CLASSES: usize = 16;

/// Bucket capacity for power-of-two classes.
const MAX_POW2_CLASSES: usize = 16;

type ClassBucket = SpinMutex<List<Arena<FreeBlock>>>;

/// A thread-safe slab allocator over a backing memory source.
///
/// `C` selects the size classes ([`DefaultConfig`] by default) and `V` the
/// fatal-error behavior ([`TrapVerifier`] by default); both are validated
/// or exercised as described in [`config`](crate::config) and
/// [`verifier`](crate::verifier).
///
/// All pools are owned by the allocator instance; nothing is process
/// global. Dropping the allocator while allocations are live does not walk
/// outstanding arenas; their backing memory is released only through
/// [`free`](Self::free).
pub struct SlabAllocator<B, C = DefaultConfig, V = TrapVerifier> {
    backing: B,
    /// Maps every live block address to its record.
    allocations: SpinMutex<RbTree<AllocRecord>>,
    small_buckets: [ClassBucket; MAX_SMALL_CLASSES],
    pow2_buckets: [ClassBucket; MAX_POW2_CLASSES],
    meta_pages: SpinMutex<List<MetaPage>>,
    _config: PhantomData<C>,
    _verifier: PhantomData<V>,
}

impl<B, C, V> SlabAllocator<B, C, V>
where
    B: BackingAllocator,
    C: SlabConfig,
    V: Verifier,
{
    /// Evaluated when the allocator is monomorphized; a bad configuration
    /// fails the build.
    const CONFIG_OK: () = {
        let small = C::SMALL_CLASSES;
        assert!(small.len() <= MAX_SMALL_CLASSES, "too many small classes");
        let mut i = 0;
        while i < small.len() {
            assert!(
                small[i].block_size >= size_of::<FreeBlock>(),
                "small block size cannot host a freelist node"
            );
            assert!(
                small[i].block_size % align_of::<FreeBlock>() == 0,
                "small block size must be freelist-node aligned"
            );
            assert!(small[i].block_count > 0, "small class with zero blocks");
            if i > 0 {
                assert!(
                    small[i - 1].block_size < small[i].block_size,
                    "small classes must be strictly ascending"
                );
            }
            i += 1;
        }
        assert!(
            C::POW2_BEGIN.is_power_of_two() && C::POW2_END.is_power_of_two(),
            "pow2 bounds must be powers of two"
        );
        assert!(C::POW2_BEGIN <= C::POW2_END, "pow2 bounds are inverted");
        assert!(
            C::POW2_BEGIN >= size_of::<FreeBlock>(),
            "pow2 block size cannot host a freelist node"
        );
        assert!(
            C::POW2_ARENA_PAYLOAD >= C::POW2_END,
            "pow2 arena payload cannot hold one block of the largest class"
        );
        assert!(
            pow2_class_count(C::POW2_BEGIN, C::POW2_END) <= MAX_POW2_CLASSES,
            "too many pow2 classes"
        );
    };

    /// Creates an allocator drawing arenas from `backing`.
    ///
    /// No memory is requested until the first allocation.
    pub const fn new(backing: B) -> Self {
        let () = Self::CONFIG_OK;
        Self {
            backing,
            allocations: SpinMutex::new(RbTree::new()),
            small_buckets: [const { SpinMutex::new(List::new()) }; MAX_SMALL_CLASSES],
            pow2_buckets: [const { SpinMutex::new(List::new()) }; MAX_POW2_CLASSES],
            meta_pages: SpinMutex::new(List::new()),
            _config: PhantomData,
            _verifier: PhantomData,
        }
    }

    /// Allocates `size` bytes, or returns `None` when the backing
    /// allocator is exhausted.
    ///
    /// A zero-size request is treated as a request for one byte. The
    /// returned block is at least `size` bytes;
    /// [`allocation_size`](Self::allocation_size) reports the size exactly
    /// as requested.
    pub fn allocate(&self, size: usize) -> Option<*mut u8> {
        let size = if size == 0 { 1 } else { size };

        // Reserve the record first so the arena step can never strand one.
        let (record, meta_page) = self.reserve_record()?;

        let carved = if size > C::POW2_END {
            self.allocate_large(size)
        } else if size >= C::POW2_BEGIN {
            self.allocate_pow2(size)
        } else {
            self.allocate_small(size)
        };

        let Some((ptr, owner)) = carved else {
            self.release_record(record, meta_page);
            return None;
        };

        unsafe {
            (*record).ptr = ptr;
            (*record).size = size;
            (*record).arena = owner;
            (*record).meta_page = meta_page;
            let inserted = self.allocations.lock().insert(record);
            debug_assert!(inserted, "backing allocator handed out a live address");
        }
        Some(ptr)
    }

    /// Returns the exact size that was requested for the live allocation
    /// at `ptr`.
    ///
    /// A pointer that is not a live allocation is fatal through
    /// [`Verifier::double_free_or_corruption`]; if the verifier returns,
    /// the result is 0.
    #[must_use]
    pub fn allocation_size(&self, ptr: *mut u8) -> usize {
        let allocations = self.allocations.lock();
        let record = allocations.find(ptr.addr());
        if record.is_null() {
            drop(allocations);
            V::double_free_or_corruption();
            return 0;
        }
        unsafe { (*record).size }
    }

    /// Frees the allocation at `ptr`. Null is a no-op.
    ///
    /// The block returns to its arena, and the arena (and the record's
    /// metadata page) return to the backing allocator the moment they hold
    /// nothing live. A pointer that is not a live allocation is fatal
    /// through [`Verifier::double_free_or_corruption`]; if the verifier
    /// returns, nothing is touched.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or a pointer returned by
    /// [`allocate`](Self::allocate) on this allocator, and the allocation
    /// must no longer be accessed after this call.
    pub unsafe fn free(&self, ptr: *mut u8) {
        if ptr.is_null() {
            return;
        }

        let record;
        {
            let mut allocations = self.allocations.lock();
            record = allocations.find(ptr.addr());
            if !record.is_null() {
                unsafe { allocations.remove(record) };
            }
        }
        if record.is_null() {
            V::double_free_or_corruption();
            return;
        }

        // The record left the index, so it is exclusively ours now.
        let (size, owner, meta_page) =
            unsafe { ((*record).size, (*record).arena, (*record).meta_page) };

        if size > C::POW2_END {
            unsafe { self.backing.deallocate(ptr, size) };
        } else if size >= C::POW2_BEGIN {
            let index = Self::pow2_index(size);
            let geometry = ArenaGeometry::pow2(Self::pow2_block_size(index), C::POW2_ARENA_PAYLOAD);
            let mut bucket = self.pow2_buckets[index].lock();
            unsafe {
                arena::put_block(&mut bucket, &self.backing, geometry, owner, ptr.cast());
            }
        } else {
            let Some(index) = Self::small_index(size) else {
                V::invalid_config("no small class covers the freed block");
                return;
            };
            let class = C::SMALL_CLASSES[index];
            let geometry = ArenaGeometry::small(class.block_size, class.block_count);
            let mut bucket = self.small_buckets[index].lock();
            unsafe {
                arena::put_block(&mut bucket, &self.backing, geometry, owner, ptr.cast());
            }
        }

        self.release_record(record, meta_page);
    }

    /// Reserves one allocation record from the metadata pool.
    fn reserve_record(&self) -> Option<(*mut AllocRecord, *mut MetaPage)> {
        let mut bucket = self.meta_pages.lock();
        let (page, record) =
            unsafe { arena::take_block(&mut bucket, &self.backing, ArenaGeometry::meta_page())? };
        Some((record, page))
    }

    /// Returns a record to the metadata pool, the mirror image of
    /// [`reserve_record`](Self::reserve_record). Shared by the free path
    /// and the allocation rollback path.
    fn release_record(&self, record: *mut AllocRecord, page: *mut MetaPage) {
        let mut bucket = self.meta_pages.lock();
        unsafe {
            arena::put_block(
                &mut bucket,
                &self.backing,
                ArenaGeometry::meta_page(),
                page,
                record,
            );
        }
    }

    fn allocate_large(&self, size: usize) -> Option<(*mut u8, *mut Arena<FreeBlock>)> {
        let ptr = self.backing.allocate(size)?;
        Some((ptr, core::ptr::null_mut()))
    }

    fn allocate_pow2(&self, size: usize) -> Option<(*mut u8, *mut Arena<FreeBlock>)> {
        let index = Self::pow2_index(size);
        let geometry = ArenaGeometry::pow2(Self::pow2_block_size(index), C::POW2_ARENA_PAYLOAD);
        let mut bucket = self.pow2_buckets[index].lock();
        let (owner, block) = unsafe { arena::take_block(&mut bucket, &self.backing, geometry)? };
        Some((block.cast(), owner))
    }

    fn allocate_small(&self, size: usize) -> Option<(*mut u8, *mut Arena<FreeBlock>)> {
        let Some(index) = Self::small_index(size) else {
            V::invalid_config("no small class covers the requested size");
            return None;
        };
        let class = C::SMALL_CLASSES[index];
        let geometry = ArenaGeometry::small(class.block_size, class.block_count);
        let mut bucket = self.small_buckets[index].lock();
        let (owner, block) = unsafe { arena::take_block(&mut bucket, &self.backing, geometry)? };
        Some((block.cast(), owner))
    }

    /// Index of the first small class whose block size covers `size`.
    fn small_index(size: usize) -> Option<usize> {
        C::SMALL_CLASSES
            .iter()
            .position(|class| class.block_size >= size)
    }

    /// Index of the power-of-two class for `size`, valid for
    /// `size <= POW2_END`.
    fn pow2_index(size: usize) -> usize {
        if size <= C::POW2_BEGIN {
            return 0;
        }
        (bit_width(size - 1) - bit_width(C::POW2_BEGIN - 1)) as usize
    }

    fn pow2_block_size(index: usize) -> usize {
        C::POW2_BEGIN << index
    }
}

const fn bit_width(value: usize) -> u32 {
    usize::BITS - value.leading_zeros()
}
