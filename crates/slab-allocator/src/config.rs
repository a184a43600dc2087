//! The configuration capability.
//!
//! A [`SlabConfig`] is a zero-sized type parameter describing the size
//! classes of a [`SlabAllocator`](crate::slab::SlabAllocator). Because the
//! configuration is `const`, it is validated when the allocator is
//! monomorphized: a config that declares an unusable table fails to
//! compile rather than failing at the first allocation.

/// The shape of one small size class: arenas of `block_count` blocks of
/// `block_size` bytes each.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SizeClass {
    /// Size of each block in bytes. Must be able to host a freelist node.
    pub block_size: usize,
    /// Number of blocks carved out of each arena of this class.
    pub block_count: usize,
}

/// Compile-time configuration of a slab allocator.
pub trait SlabConfig {
    /// Small size classes in strictly ascending `block_size` order. A
    /// request smaller than [`POW2_BEGIN`](Self::POW2_BEGIN) is served by
    /// the first entry whose `block_size` covers it.
    const SMALL_CLASSES: &'static [SizeClass];

    /// Lower bound of the power-of-two strategy (inclusive). Must be a
    /// power of two.
    const POW2_BEGIN: usize;

    /// Upper bound of the power-of-two strategy (inclusive). Must be a
    /// power of two; requests above it pass straight through to the
    /// backing allocator.
    const POW2_END: usize;

    /// Payload bytes of every power-of-two arena; each class divides this
    /// into `POW2_ARENA_PAYLOAD / block_size` blocks.
    const POW2_ARENA_PAYLOAD: usize;
}

/// Number of power-of-two classes a configuration spans.
///
/// Both bounds must be powers of two with `begin <= end`.
#[must_use]
pub const fn pow2_class_count(begin: usize, end: usize) -> usize {
    (end.ilog2() - begin.ilog2() + 1) as usize
}

/// The stock configuration: eight small classes from 16 bytes to 2 KiB,
/// power-of-two classes from 2 KiB to 128 KiB carved out of 128 KiB
/// arenas, direct pass-through above that.
pub struct DefaultConfig;

impl SlabConfig for DefaultConfig {
    const SMALL_CLASSES: &'static [SizeClass] = &[
        SizeClass { block_size: 16, block_count: 256 },
        SizeClass { block_size: 32, block_count: 128 },
        SizeClass { block_size: 64, block_count: 128 },
        SizeClass { block_size: 128, block_count: 50 },
        SizeClass { block_size: 256, block_count: 40 },
        SizeClass { block_size: 512, block_count: 30 },
        SizeClass { block_size: 1024, block_count: 20 },
        SizeClass { block_size: 2048, block_count: 10 },
    ];

    const POW2_BEGIN: usize = 2048;
    const POW2_END: usize = 128 * 1024;
    const POW2_ARENA_PAYLOAD: usize = 128 * 1024;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pow2_class_count() {
        assert_eq!(pow2_class_count(2048, 2048), 1);
        assert_eq!(pow2_class_count(2048, 4096), 2);
        assert_eq!(
            pow2_class_count(DefaultConfig::POW2_BEGIN, DefaultConfig::POW2_END),
            7
        );
    }

    #[test]
    fn test_default_table_is_ascending() {
        let table = DefaultConfig::SMALL_CLASSES;
        for pair in table.windows(2) {
            assert!(pair[0].block_size < pair[1].block_size);
        }
    }
}
