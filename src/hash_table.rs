//! An open-addressed hash table whose slots hold intrusive chains.
//!
//! Every slot of the bucket array is either empty, tombstoned, or holds the
//! head of a chain of caller-owned [`Node`]s that all share the slot's hash.
//! Collisions between *different* hashes are resolved by linear probing;
//! elements with *equal* hashes accumulate in the slot's chain.
//!
//! The bucket array is aligned on [`CACHE_LINE`], and probing for a hash
//! starts at the first slot of the hash's cache-line group, so a short probe
//! touches a single line.

use alloc::alloc::handle_alloc_error;
use core::alloc::Layout;
use core::fmt::Debug;
use core::marker::PhantomData;
use core::mem;
use core::ptr::NonNull;

use allocator_api2::alloc::Allocator;
use allocator_api2::alloc::Global;

use crate::CACHE_LINE;
use crate::TryReserveError;
use crate::node;
use crate::node::Chain;
use crate::node::Node;

/// The minimum bucket bit used by [`HashTable::new`]: tables start at, and
/// never shrink below, 16 buckets.
pub const DEFAULT_MIN_BIT: u32 = 4;

/// State of one bucket.
///
/// The discriminant of `Empty` is zero so that a zeroed allocation is an
/// array of empty slots.
#[repr(u8)]
enum Slot<T> {
    Empty = 0,
    Tombstoned = 1,
    Occupied { hash: u32, head: NonNull<Node<T>> } = 2,
}

impl<T> Clone for Slot<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Slot<T> {}

/// One cell of the bucket array. The alignment keeps the cell size a divisor
/// of the cache line on both 32 and 64 bit targets.
#[repr(C, align(16))]
struct Bucket<T> {
    slot: Slot<T>,
}

/// Number of buckets sharing one cache line.
const SLOTS_PER_LINE: usize = CACHE_LINE / mem::size_of::<Bucket<()>>();

const _: () = assert!(
    CACHE_LINE % mem::size_of::<Bucket<()>>() == 0,
    "a cache line must hold a whole number of buckets"
);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Geometry {
    bucket_bit: u32,
    bucket_max: usize,
    bucket_mask: usize,
    /// `bucket_mask` with the in-line index bits cleared: maps a hash to the
    /// first bucket of its cache-line group.
    bucket_mask_cache: usize,
}

impl Geometry {
    fn new(bucket_bit: u32) -> Result<Self, TryReserveError> {
        let bucket_max = 1usize
            .checked_shl(bucket_bit)
            .ok_or(TryReserveError::CapacityOverflow)?;
        let bucket_mask = bucket_max - 1;

        Ok(Geometry {
            bucket_bit,
            bucket_max,
            bucket_mask,
            bucket_mask_cache: bucket_mask & !(SLOTS_PER_LINE - 1),
        })
    }

    fn layout<T>(&self) -> Result<Layout, TryReserveError> {
        let size = self
            .bucket_max
            .checked_mul(mem::size_of::<Bucket<T>>())
            .ok_or(TryReserveError::CapacityOverflow)?;
        Layout::from_size_align(size, CACHE_LINE).map_err(|_| TryReserveError::CapacityOverflow)
    }

    #[inline(always)]
    fn group(&self, hash: u32) -> usize {
        hash as usize & self.bucket_mask_cache
    }

    #[inline(always)]
    fn next(&self, index: usize) -> usize {
        (index + 1) & self.bucket_mask
    }
}

/// Bucket bit for a table holding `n` used slots with one doubling of
/// headroom: `log2(roundup_pow2(n)) + 1`.
#[inline]
fn doubled_bit_for(n: usize) -> Result<u32, TryReserveError> {
    n.checked_next_power_of_two()
        .map(|up| up.trailing_zeros() + 1)
        .ok_or(TryReserveError::CapacityOverflow)
}

fn allocate_buckets<T, A: Allocator>(
    alloc: &A,
    geometry: &Geometry,
) -> Result<NonNull<Bucket<T>>, TryReserveError> {
    let layout = geometry.layout::<T>()?;
    match alloc.allocate_zeroed(layout) {
        Ok(block) => Ok(block.cast()),
        Err(_) => Err(TryReserveError::AllocError { layout }),
    }
}

/// Frees a bucket array.
///
/// # Safety
///
/// `buckets` must have been returned by [`allocate_buckets`] for the same
/// allocator and geometry, and must not be used afterwards.
unsafe fn deallocate_buckets<T, A: Allocator>(
    alloc: &A,
    buckets: NonNull<Bucket<T>>,
    geometry: &Geometry,
) {
    // The layout was computed successfully when the array was allocated.
    if let Ok(layout) = geometry.layout::<T>() {
        // SAFETY: Caller guarantees `buckets` came from `alloc` with this
        // layout.
        unsafe { alloc.deallocate(buckets.cast(), layout) };
    }
}

/// Debug statistics for hash table analysis.
#[cfg(feature = "stats")]
#[derive(Debug, Clone)]
pub struct DebugStats {
    /// Number of elements currently in the table
    pub count: usize,
    /// Number of buckets in the array
    pub buckets: usize,
    /// Number of buckets holding a chain
    pub filled: usize,
    /// Number of tombstoned buckets
    pub deleted: usize,
    /// Filled buckets over total buckets
    pub load_factor: f64,
    /// Filled and tombstoned buckets over total buckets
    pub dirty_factor: f64,
    /// Longest chain of equal-hash elements
    pub longest_chain: usize,
    /// Largest distance of a chain from the start of its cache-line group
    pub max_displacement: usize,
    /// Mean distance of a chain from the start of its cache-line group
    pub mean_displacement: f64,
    /// Estimate returned by [`HashTable::memory_usage`]
    pub memory_usage: usize,
}

#[cfg(feature = "stats")]
impl DebugStats {
    /// Pretty-print the debug statistics.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        println!("=== Hash Table Debug Statistics ===");
        println!("Elements: {}", self.count);
        println!(
            "Buckets: {} filled, {} tombstoned of {} ({:.2}% load, {:.2}% dirty)",
            self.filled,
            self.deleted,
            self.buckets,
            self.load_factor * 100.0,
            self.dirty_factor * 100.0
        );
        println!("Longest chain: {}", self.longest_chain);
        println!(
            "Displacement: max {} mean {:.3}",
            self.max_displacement, self.mean_displacement
        );
        println!("Memory: {} bytes", self.memory_usage);
    }
}

/// An open-addressed hash table of intrusive chains keyed by a 32-bit hash.
///
/// `HashTable<T>` never hashes or compares keys: every operation takes a
/// caller-computed hash, and lookups take an equality predicate over the
/// payload. Elements live in caller-owned [`Node`]s; the table links them into
/// per-slot chains and owns nothing but its bucket array.
///
/// The table grows when more than half of its buckets are filled or
/// tombstoned, and shrinks when at most an eighth are filled. It is not
/// thread safe and is neither `Send` nor `Sync`.
///
/// ## Example
///
/// ```rust
/// # use core::hash::Hash;
/// # use core::hash::Hasher;
/// # use core::ptr::NonNull;
/// #
/// # use open_hash::HashTable;
/// # use open_hash::Node;
/// # use siphasher::sip::SipHasher;
/// #
/// # fn hash_id(id: u64) -> u32 {
/// #     let mut hasher = SipHasher::new();
/// #     id.hash(&mut hasher);
/// #     hasher.finish() as u32
/// # }
/// #
/// #[derive(Debug, PartialEq)]
/// struct Person {
///     id: u64,
///     name: &'static str,
/// }
///
/// let mut nodes = [Node::new(), Node::new()];
/// let [alice, bob] = nodes.each_mut().map(|n| NonNull::from(n));
///
/// let mut table = HashTable::new();
/// // SAFETY: the nodes outlive the table and are not moved while linked.
/// unsafe {
///     table.insert(alice, Person { id: 1, name: "Alice" }, hash_id(1))?;
///     table.insert(bob, Person { id: 2, name: "Bob" }, hash_id(2))?;
/// }
///
/// assert_eq!(table.search(hash_id(2), |p| p.id == 2).map(|p| p.name), Some("Bob"));
/// let removed = table.remove(hash_id(1), |p| p.id == 1);
/// assert_eq!(removed.map(|p| p.name), Some("Alice"));
/// assert_eq!(table.len(), 1);
/// # Ok::<(), open_hash::TryReserveError>(())
/// ```
pub struct HashTable<T, A: Allocator = Global> {
    buckets: NonNull<Bucket<T>>,
    geometry: Geometry,
    min_bit: u32,

    count: usize,
    filled_count: usize,
    deleted_count: usize,

    alloc: A,
    _phantom: PhantomData<NonNull<Node<T>>>,
}

impl<T, A: Allocator> Debug for HashTable<T, A> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        use alloc::string::String;

        let mut slots = String::with_capacity(
            self.geometry.bucket_max + self.geometry.bucket_max / SLOTS_PER_LINE,
        );
        for index in 0..self.geometry.bucket_max {
            if index != 0 && index % SLOTS_PER_LINE == 0 {
                slots.push('|');
            }
            slots.push(match self.slot(index) {
                Slot::Empty => '.',
                Slot::Tombstoned => 'x',
                Slot::Occupied { .. } => 'o',
            });
        }

        f.debug_struct("HashTable")
            .field("count", &self.count)
            .field("capacity", &self.geometry.bucket_max)
            .field("filled", &self.filled_count)
            .field("deleted", &self.deleted_count)
            .field("slots", &slots)
            .finish()
    }
}

impl<T, A: Allocator> Drop for HashTable<T, A> {
    fn drop(&mut self) {
        // SAFETY: The array was allocated by `self.alloc` for the current
        // geometry and is never used again.
        unsafe { deallocate_buckets(&self.alloc, self.buckets, &self.geometry) };
    }
}

impl<T> Default for HashTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> HashTable<T> {
    /// Creates an empty table with [`DEFAULT_MIN_BIT`] (16 buckets).
    ///
    /// Allocation failure is handled with [`handle_alloc_error`]; use
    /// [`try_with_min_bit`](Self::try_with_min_bit) to observe it instead.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use open_hash::HashTable;
    /// #
    /// let table: HashTable<u32> = HashTable::new();
    /// assert_eq!(table.capacity(), 16);
    /// assert!(table.is_empty());
    /// ```
    pub fn new() -> Self {
        match Self::try_with_min_bit(DEFAULT_MIN_BIT) {
            Ok(table) => table,
            Err(TryReserveError::AllocError { layout }) => handle_alloc_error(layout),
            Err(err) => panic!("{err}"),
        }
    }

    /// Creates an empty table of `2^min_bit` buckets that never shrinks below
    /// that size.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use open_hash::HashTable;
    /// #
    /// let table: HashTable<u32> = HashTable::try_with_min_bit(8)?;
    /// assert_eq!(table.capacity(), 256);
    /// # Ok::<(), open_hash::TryReserveError>(())
    /// ```
    pub fn try_with_min_bit(min_bit: u32) -> Result<Self, TryReserveError> {
        Self::try_with_min_bit_in(min_bit, Global)
    }
}

impl<T, A: Allocator> HashTable<T, A> {
    /// Creates an empty table with [`DEFAULT_MIN_BIT`] whose bucket array is
    /// allocated from `alloc`.
    pub fn try_new_in(alloc: A) -> Result<Self, TryReserveError> {
        Self::try_with_min_bit_in(DEFAULT_MIN_BIT, alloc)
    }

    /// Creates an empty table of `2^min_bit` buckets allocated from `alloc`.
    pub fn try_with_min_bit_in(min_bit: u32, alloc: A) -> Result<Self, TryReserveError> {
        let geometry = Geometry::new(min_bit)?;
        let buckets = allocate_buckets(&alloc, &geometry)?;

        debug_event!(
            bucket_bit = min_bit,
            slots_per_line = SLOTS_PER_LINE,
            "allocated hash table"
        );

        Ok(Self {
            buckets,
            geometry,
            min_bit,
            count: 0,
            filled_count: 0,
            deleted_count: 0,
            alloc,
            _phantom: PhantomData,
        })
    }

    /// Returns the number of elements in the table.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Returns `true` if the table contains no elements.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns the number of buckets, always a power of two.
    ///
    /// This is not a bound on [`len`](Self::len): equal-hash elements share a
    /// bucket.
    pub fn capacity(&self) -> usize {
        self.geometry.bucket_max
    }

    /// Returns the number of buckets holding a chain.
    pub fn filled_count(&self) -> usize {
        self.filled_count
    }

    /// Returns the number of tombstoned buckets.
    pub fn deleted_count(&self) -> usize {
        self.deleted_count
    }

    /// Estimates the memory used by the table and its linked nodes in bytes.
    ///
    /// Counts the bucket array and one [`Node<T>`] per element; memory the
    /// caller keeps beside the nodes is not included.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use open_hash::HashTable;
    /// #
    /// let small: HashTable<u64> = HashTable::try_with_min_bit(4)?;
    /// let large: HashTable<u64> = HashTable::try_with_min_bit(5)?;
    /// assert_eq!(large.memory_usage(), small.memory_usage() * 2);
    /// # Ok::<(), open_hash::TryReserveError>(())
    /// ```
    pub fn memory_usage(&self) -> usize {
        self.geometry.bucket_max * mem::size_of::<Bucket<T>>()
            + self.count * mem::size_of::<Node<T>>()
    }

    #[inline(always)]
    fn slot(&self, index: usize) -> Slot<T> {
        debug_assert!(index < self.geometry.bucket_max);
        // SAFETY: Every index is masked by `bucket_mask`, and the allocation
        // holds `bucket_max` initialized buckets.
        unsafe { (*self.buckets.as_ptr().add(index)).slot }
    }

    #[inline(always)]
    fn set_slot(&mut self, index: usize, slot: Slot<T>) {
        debug_assert!(index < self.geometry.bucket_max);
        // SAFETY: Every index is masked by `bucket_mask`, and the allocation
        // holds `bucket_max` buckets.
        unsafe { (*self.buckets.as_ptr().add(index)).slot = slot };
    }

    /// Finds the slot an element with `hash` goes into: the slot already
    /// holding `hash`, else the first tombstone on the way, else the empty
    /// slot ending the probe.
    ///
    /// A slot is only ever matched on its stored hash, so different hashes
    /// never share a chain.
    #[inline]
    fn probe_insert(&self, hash: u32) -> usize {
        let mut index = self.geometry.group(hash);
        let mut reusable = None;

        loop {
            match self.slot(index) {
                Slot::Empty => return reusable.unwrap_or(index),
                Slot::Tombstoned => {
                    if reusable.is_none() {
                        reusable = Some(index);
                    }
                }
                Slot::Occupied { hash: stored, .. } => {
                    if stored == hash {
                        return index;
                    }
                }
            }
            index = self.geometry.next(index);
        }
    }

    /// Finds the slot holding `hash`, returning its index and chain head.
    /// Tombstones are skipped; an empty slot ends the search.
    #[inline]
    fn probe_search(&self, hash: u32) -> Option<(usize, NonNull<Node<T>>)> {
        let mut index = self.geometry.group(hash);

        loop {
            match self.slot(index) {
                Slot::Empty => return None,
                Slot::Tombstoned => {}
                Slot::Occupied { hash: stored, head } => {
                    if stored == hash {
                        return Some((index, head));
                    }
                }
            }
            index = self.geometry.next(index);
        }
    }

    fn find_in_chain(
        head: NonNull<Node<T>>,
        eq: &mut impl FnMut(&T) -> bool,
    ) -> Option<NonNull<Node<T>>> {
        let mut cursor = Some(head);
        while let Some(node) = cursor {
            // SAFETY: Chain members stay valid while linked, per the contract
            // of `insert`.
            let n = unsafe { node.as_ref() };
            if n.data().is_some_and(|data| eq(data)) {
                return Some(node);
            }
            cursor = n.next();
        }

        None
    }

    /// Links `node` into the table with payload `data` under `hash`.
    ///
    /// The node is appended to the chain already holding `hash`, or starts a
    /// new chain in the first reusable slot. No uniqueness check is made;
    /// equal elements accumulate in insertion order.
    ///
    /// If the insertion would leave half the buckets filled or tombstoned,
    /// the bucket array is grown first. When that allocation fails the error
    /// is returned and neither the table nor `node` is modified.
    ///
    /// # Safety
    ///
    /// - `node` must point to a valid [`Node<T>`] that is not linked in any
    ///   table.
    /// - Until the node is removed again, or the table is dropped, the node
    ///   must not be moved, freed, or accessed through any other pointer.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::ptr::NonNull;
    /// # use open_hash::HashTable;
    /// # use open_hash::Node;
    /// #
    /// let mut first = Node::new();
    /// let mut second = Node::new();
    ///
    /// let mut table = HashTable::new();
    /// // SAFETY: both nodes outlive the table and stay in place.
    /// unsafe {
    ///     table.insert(NonNull::from(&mut first), "first", 7)?;
    ///     table.insert(NonNull::from(&mut second), "second", 7)?;
    /// }
    ///
    /// // Equal hashes share one bucket.
    /// assert_eq!(table.len(), 2);
    /// assert_eq!(table.filled_count(), 1);
    /// # Ok::<(), open_hash::TryReserveError>(())
    /// ```
    pub unsafe fn insert(
        &mut self,
        node: NonNull<Node<T>>,
        data: T,
        hash: u32,
    ) -> Result<(), TryReserveError> {
        let mut index = self.probe_insert(hash);

        if matches!(self.slot(index), Slot::Empty) {
            let dirty = self.filled_count + self.deleted_count + 1;
            if dirty >= self.geometry.bucket_max / 2 {
                self.resize(doubled_bit_for(dirty + 1)?)?;
                index = self.probe_insert(hash);
            }
        }

        // SAFETY: Caller guarantees `node` is valid and unlinked.
        unsafe { Node::stamp(node, data, hash) };

        match self.slot(index) {
            Slot::Empty => {
                // SAFETY: `node` is valid and unlinked.
                let head = unsafe { node::link_first(node) };
                self.set_slot(index, Slot::Occupied { hash, head });
                self.filled_count += 1;
            }
            Slot::Tombstoned => {
                // SAFETY: `node` is valid and unlinked.
                let head = unsafe { node::link_first(node) };
                self.set_slot(index, Slot::Occupied { hash, head });
                self.filled_count += 1;
                self.deleted_count -= 1;
            }
            Slot::Occupied { head, .. } => {
                // SAFETY: `head` heads a live chain and `node` is a distinct
                // unlinked node.
                unsafe { node::link_tail(head, node) };
            }
        }

        self.count += 1;
        debug_assert!(self.filled_count + self.deleted_count < self.geometry.bucket_max);

        Ok(())
    }

    /// Unlinks `node` from the chain at `index` and returns its payload.
    ///
    /// # Safety
    ///
    /// `head` must be the chain stored at `index` and `node` a member of it.
    unsafe fn detach(
        &mut self,
        index: usize,
        hash: u32,
        head: NonNull<Node<T>>,
        node: NonNull<Node<T>>,
    ) -> T {
        // SAFETY: Caller guarantees `node` belongs to the chain at `head`.
        match unsafe { node::unlink(head, node) } {
            Some(head) => self.set_slot(index, Slot::Occupied { hash, head }),
            None => {
                // Tombstone rather than empty: later chains may have probed
                // past this slot.
                self.set_slot(index, Slot::Tombstoned);
                self.filled_count -= 1;
                self.deleted_count += 1;
            }
        }
        self.count -= 1;

        // SAFETY: `node` is detached and still valid.
        let data = unsafe { Node::take(node) };

        self.shrink_step();

        match data {
            Some(data) => data,
            None => unreachable!("linked node without a payload"),
        }
    }

    /// Removes and returns the first element in the chain for `hash` whose
    /// payload satisfies `eq`.
    ///
    /// Candidates are tested in chain order, which is insertion order among
    /// elements sharing a hash. Returns `None` if nothing matches. The removed
    /// node is unlinked and may be reused or freed by the caller.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::ptr::NonNull;
    /// # use open_hash::HashTable;
    /// # use open_hash::Node;
    /// #
    /// let mut nodes = [Node::new(), Node::new()];
    /// let [a, b] = nodes.each_mut().map(|n| NonNull::from(n));
    ///
    /// let mut table = HashTable::new();
    /// // SAFETY: the nodes outlive the table and stay in place.
    /// unsafe {
    ///     table.insert(a, (1, 'a'), 3)?;
    ///     table.insert(b, (1, 'b'), 3)?;
    /// }
    ///
    /// assert_eq!(table.remove(3, |&(k, _)| k == 1), Some((1, 'a')));
    /// assert_eq!(table.remove(3, |&(k, _)| k == 1), Some((1, 'b')));
    /// assert_eq!(table.remove(3, |&(k, _)| k == 1), None);
    /// # Ok::<(), open_hash::TryReserveError>(())
    /// ```
    pub fn remove(&mut self, hash: u32, mut eq: impl FnMut(&T) -> bool) -> Option<T> {
        let (index, head) = self.probe_search(hash)?;
        let node = Self::find_in_chain(head, &mut eq)?;

        // SAFETY: `node` was found in the chain stored at `index`.
        Some(unsafe { self.detach(index, hash, head, node) })
    }

    /// Removes a node known to be linked in this table and returns its
    /// payload.
    ///
    /// # Safety
    ///
    /// `node` must currently be linked in this table, e.g. as returned by
    /// [`find_node`](Self::find_node) with no removal since.
    pub unsafe fn remove_existing(&mut self, node: NonNull<Node<T>>) -> T {
        // SAFETY: Caller guarantees `node` is linked here, hence valid.
        let hash = unsafe { node.as_ref() }.hash();

        let Some((index, head)) = self.probe_search(hash) else {
            unreachable!("node is not linked in this table");
        };
        debug_assert!(
            Chain::new(Some(head)).any(|n| core::ptr::eq(n, node.as_ptr())),
            "node is not linked in this table"
        );

        // SAFETY: Caller guarantees `node` is in the chain for its hash.
        unsafe { self.detach(index, hash, head, node) }
    }

    /// Returns the first payload in the chain for `hash` that satisfies `eq`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::ptr::NonNull;
    /// # use open_hash::HashTable;
    /// # use open_hash::Node;
    /// #
    /// let mut node = Node::new();
    /// let mut table = HashTable::new();
    /// // SAFETY: `node` outlives the table and stays in place.
    /// unsafe { table.insert(NonNull::from(&mut node), 42u64, 0xabcd)? };
    ///
    /// assert_eq!(table.search(0xabcd, |&v| v == 42), Some(&42));
    /// assert_eq!(table.search(0xabcd, |&v| v == 43), None);
    /// assert_eq!(table.search(0x1234, |&v| v == 42), None);
    /// # Ok::<(), open_hash::TryReserveError>(())
    /// ```
    pub fn search(&self, hash: u32, mut eq: impl FnMut(&T) -> bool) -> Option<&T> {
        let (_, head) = self.probe_search(hash)?;
        let node = Self::find_in_chain(head, &mut eq)?;

        // SAFETY: `node` is linked, so it is valid for as long as the table is
        // borrowed.
        unsafe { node.as_ref() }.data()
    }

    /// Returns the handle of the first node in the chain for `hash` whose
    /// payload satisfies `eq`, for a later
    /// [`remove_existing`](Self::remove_existing).
    pub fn find_node(&self, hash: u32, mut eq: impl FnMut(&T) -> bool) -> Option<NonNull<Node<T>>> {
        let (_, head) = self.probe_search(hash)?;
        Self::find_in_chain(head, &mut eq)
    }

    /// Returns the chain of nodes stored under `hash`, in insertion order.
    ///
    /// The chain is empty if no element has this hash.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::ptr::NonNull;
    /// # use open_hash::HashTable;
    /// # use open_hash::Node;
    /// #
    /// let mut nodes = [Node::new(), Node::new(), Node::new()];
    /// let handles = nodes.each_mut().map(|n| NonNull::from(n));
    ///
    /// let mut table = HashTable::new();
    /// // SAFETY: the nodes outlive the table and stay in place.
    /// unsafe {
    ///     table.insert(handles[0], "x", 1)?;
    ///     table.insert(handles[1], "y", 2)?;
    ///     table.insert(handles[2], "z", 1)?;
    /// }
    ///
    /// let chain: Vec<_> = table.bucket(1).filter_map(|n| n.data().copied()).collect();
    /// assert_eq!(chain, ["x", "z"]);
    /// assert_eq!(table.bucket(9).count(), 0);
    /// # Ok::<(), open_hash::TryReserveError>(())
    /// ```
    pub fn bucket(&self, hash: u32) -> Chain<'_, T> {
        Chain::new(self.probe_search(hash).map(|(_, head)| head))
    }

    /// Returns an iterator over every payload in the table.
    ///
    /// Chains are visited in bucket order, and elements within a chain in
    /// insertion order.
    pub fn iter(&self) -> Iter<'_, T, A> {
        Iter {
            table: self,
            index: 0,
            chain: Chain::new(None),
        }
    }

    #[inline]
    fn shrink_step(&mut self) {
        if self.filled_count <= self.geometry.bucket_max / 8
            && self.geometry.bucket_bit > self.min_bit
        {
            self.shrink();
        }
    }

    #[cold]
    #[inline(never)]
    fn shrink(&mut self) {
        let min_bit = self.min_bit;
        let result =
            doubled_bit_for(self.filled_count + 1).and_then(|bit| self.resize(bit.max(min_bit)));

        // A failed shrink leaves a larger but valid table; the next removal
        // retries.
        if let Err(_err) = result {
            debug_event!(
                error = %_err,
                bucket_bit = self.geometry.bucket_bit,
                "skipped shrinking the bucket array"
            );
        }
    }

    /// Moves every chain into a new array of `2^bucket_bit` buckets, dropping
    /// all tombstones.
    ///
    /// On error nothing has changed.
    #[cold]
    #[inline(never)]
    fn resize(&mut self, bucket_bit: u32) -> Result<(), TryReserveError> {
        let geometry = Geometry::new(bucket_bit)?;
        let buckets = allocate_buckets::<T, A>(&self.alloc, &geometry)?;

        let old_geometry = mem::replace(&mut self.geometry, geometry);
        let old_buckets = mem::replace(&mut self.buckets, buckets);
        let old_filled = mem::replace(&mut self.filled_count, 0);
        self.deleted_count = 0;

        for old_index in 0..old_geometry.bucket_max {
            // SAFETY: `old_index` is below the old `bucket_max` and the old
            // array is freed only after this loop.
            let slot = unsafe { (*old_buckets.as_ptr().add(old_index)).slot };
            let Slot::Occupied { hash, head } = slot else {
                continue;
            };

            // The new array has no tombstones and no other chain with this
            // hash, so the first empty slot is the home.
            let mut index = geometry.group(hash);
            while !matches!(self.slot(index), Slot::Empty) {
                index = geometry.next(index);
            }
            self.set_slot(index, Slot::Occupied { hash, head });
            self.filled_count += 1;
        }
        debug_assert_eq!(self.filled_count, old_filled);

        // SAFETY: `old_buckets` came from `self.alloc` with `old_geometry` and
        // every chain has been moved out.
        unsafe { deallocate_buckets(&self.alloc, old_buckets, &old_geometry) };

        debug_event!(
            old_bit = old_geometry.bucket_bit,
            new_bit = bucket_bit,
            filled = self.filled_count,
            count = self.count,
            "resized bucket array"
        );

        Ok(())
    }

    /// Returns detailed utilization statistics for debugging.
    #[cfg(feature = "stats")]
    pub fn debug_stats(&self) -> DebugStats {
        let mut longest_chain = 0;
        let mut max_displacement = 0;
        let mut total_displacement = 0;

        for index in 0..self.geometry.bucket_max {
            if let Slot::Occupied { hash, head } = self.slot(index) {
                let displacement =
                    index.wrapping_sub(self.geometry.group(hash)) & self.geometry.bucket_mask;
                max_displacement = max_displacement.max(displacement);
                total_displacement += displacement;
                longest_chain = longest_chain.max(Chain::new(Some(head)).count());
            }
        }

        let buckets = self.geometry.bucket_max as f64;
        DebugStats {
            count: self.count,
            buckets: self.geometry.bucket_max,
            filled: self.filled_count,
            deleted: self.deleted_count,
            load_factor: self.filled_count as f64 / buckets,
            dirty_factor: (self.filled_count + self.deleted_count) as f64 / buckets,
            longest_chain,
            max_displacement,
            mean_displacement: if self.filled_count == 0 {
                0.0
            } else {
                total_displacement as f64 / self.filled_count as f64
            },
            memory_usage: self.memory_usage(),
        }
    }
}

/// An iterator over the payloads of a [`HashTable`].
///
/// Created by [`HashTable::iter`].
pub struct Iter<'a, T, A: Allocator = Global> {
    table: &'a HashTable<T, A>,
    index: usize,
    chain: Chain<'a, T>,
}

impl<'a, T, A: Allocator> Iterator for Iter<'a, T, A> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(node) = self.chain.next() {
                match node.data() {
                    Some(data) => return Some(data),
                    None => continue,
                }
            }

            if self.index >= self.table.geometry.bucket_max {
                return None;
            }
            let slot = self.table.slot(self.index);
            self.index += 1;
            if let Slot::Occupied { head, .. } = slot {
                self.chain = Chain::new(Some(head));
            }
        }
    }
}
