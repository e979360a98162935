use core::alloc::Layout;
use core::fmt;

/// The error returned when the bucket array cannot be (re)allocated.
///
/// Growth is part of normal insertion, so a failed allocation is reported to
/// the caller instead of aborting. The table is left exactly as it was before
/// the failing call.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum TryReserveError {
    /// The requested capacity does not fit in `usize` or exceeds the maximum
    /// allocation size.
    CapacityOverflow,

    /// The allocator refused the bucket array allocation.
    AllocError {
        /// The layout of the allocation that failed.
        layout: Layout,
    },
}

impl fmt::Display for TryReserveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TryReserveError::CapacityOverflow => {
                f.write_str("bucket array capacity overflowed `usize`")
            }
            TryReserveError::AllocError { layout } => write!(
                f,
                "failed to allocate {} bytes for the bucket array (align {})",
                layout.size(),
                layout.align()
            ),
        }
    }
}

impl core::error::Error for TryReserveError {}
