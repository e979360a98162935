use core::hash::BuildHasher;
use core::hash::Hash;

/// Folds a 64-bit hash down to the 32 bits the table is keyed by.
///
/// Both halves are mixed in so that hashers whose entropy sits in the high
/// bits still spread over the low bits used for bucket selection.
#[inline]
pub const fn fold64(hash: u64) -> u32 {
    (hash ^ (hash >> 32)) as u32
}

/// Hashes `key` with the given hasher builder and folds the result to 32 bits.
///
/// # Examples
///
/// ```rust
/// # use open_hash::hash::hash32_with;
/// # use siphasher::sip::SipHasher;
/// #
/// # struct SipState;
/// # impl core::hash::BuildHasher for SipState {
/// #     type Hasher = SipHasher;
/// #     fn build_hasher(&self) -> SipHasher {
/// #         SipHasher::new()
/// #     }
/// # }
/// let a = hash32_with(&SipState, "alpha");
/// let b = hash32_with(&SipState, "alpha");
/// assert_eq!(a, b);
/// ```
#[inline]
pub fn hash32_with<S: BuildHasher, K: Hash + ?Sized>(state: &S, key: &K) -> u32 {
    fold64(state.hash_one(key))
}

/// Hashes `key` with a fixed-seed `foldhash` hasher.
///
/// The seed is constant, so the result is stable for the lifetime of the
/// process and suitable for keys that are never attacker controlled.
///
/// # Examples
///
/// ```rust
/// # use open_hash::hash::hash32;
/// assert_eq!(hash32(&42u64), hash32(&42u64));
/// assert_ne!(hash32(&1u64), hash32(&2u64));
/// ```
#[cfg(feature = "foldhash")]
#[inline]
pub fn hash32<K: Hash + ?Sized>(key: &K) -> u32 {
    let state = foldhash::fast::FixedState::with_seed(0x243f_6a88_85a3_08d3);
    hash32_with(&state, key)
}
