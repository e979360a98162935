#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

/// Emits a `tracing` debug event when the `tracing` feature is enabled.
///
/// Only used on cold paths (resizes, construction); the insert and remove fast
/// paths never log.
macro_rules! debug_event {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        tracing::debug!($($arg)*);
    };
}

cfg_if::cfg_if! {
    if #[cfg(feature = "cache-line-128")] {
        /// Size in bytes of the cache line the bucket array is aligned and
        /// grouped on.
        pub const CACHE_LINE: usize = 128;
    } else {
        /// Size in bytes of the cache line the bucket array is aligned and
        /// grouped on.
        pub const CACHE_LINE: usize = 64;
    }
}

mod error;

/// Helpers for deriving the 32-bit hash the table is keyed by.
pub mod hash;

pub mod hash_table;

/// The caller-owned intrusive node and the chain primitives linking it.
pub mod node;

pub use allocator_api2::alloc::Allocator;
pub use allocator_api2::alloc::Global;
pub use error::TryReserveError;
pub use hash_table::HashTable;
pub use node::Chain;
pub use node::Node;
