use core::fmt::Debug;
use core::marker::PhantomData;
use core::ptr::NonNull;

/// A record slot linked into a [`HashTable`] chain.
///
/// The node is owned by the caller: the table stores a [`NonNull`] handle to
/// it, rewrites its links, and stamps its hash and payload, but never
/// allocates or frees it. A node must stay at the same address, and must not
/// be accessed mutably by the caller, for as long as it is linked.
///
/// Chains keep `prev` of the head pointing at the tail so that appending is
/// constant time; the tail's `next` is `None`.
///
/// [`HashTable`]: crate::HashTable
pub struct Node<T> {
    next: Option<NonNull<Node<T>>>,
    prev: Option<NonNull<Node<T>>>,
    hash: u32,
    data: Option<T>,
}

impl<T> Node<T> {
    /// Creates an unlinked node with no payload.
    pub const fn new() -> Self {
        Node {
            next: None,
            prev: None,
            hash: 0,
            data: None,
        }
    }

    /// Returns the hash stamped by the last insertion.
    pub fn hash(&self) -> u32 {
        self.hash
    }

    /// Returns the payload while the node is linked.
    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    /// Returns `true` while the node belongs to a chain.
    pub fn is_linked(&self) -> bool {
        self.prev.is_some()
    }

    pub(crate) fn next(&self) -> Option<NonNull<Node<T>>> {
        self.next
    }

    /// Stamps the payload and hash ahead of linking.
    ///
    /// # Safety
    ///
    /// `node` must be valid for writes and not linked in any chain.
    pub(crate) unsafe fn stamp(node: NonNull<Node<T>>, data: T, hash: u32) {
        // SAFETY: Caller guarantees `node` is valid and unlinked, so no chain
        // holds an alias to it.
        unsafe {
            let node = &mut *node.as_ptr();
            debug_assert!(!node.is_linked(), "node is already linked");
            node.data = Some(data);
            node.hash = hash;
        }
    }

    /// Moves the payload out of an unlinked node.
    ///
    /// # Safety
    ///
    /// `node` must be valid for writes and no longer reachable from any chain.
    pub(crate) unsafe fn take(node: NonNull<Node<T>>) -> Option<T> {
        // SAFETY: Caller guarantees `node` is valid and detached.
        unsafe { (*node.as_ptr()).data.take() }
    }
}

impl<T> Default for Node<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Debug> Debug for Node<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Node")
            .field("hash", &format_args!("{:#010x}", self.hash))
            .field("data", &self.data)
            .field("linked", &self.is_linked())
            .finish()
    }
}

/// Starts a one-node chain and returns its head.
///
/// # Safety
///
/// `node` must be valid for writes and not linked in any chain.
#[inline]
pub(crate) unsafe fn link_first<T>(node: NonNull<Node<T>>) -> NonNull<Node<T>> {
    // SAFETY: Caller guarantees `node` is valid and unlinked.
    unsafe {
        let n = &mut *node.as_ptr();
        n.next = None;
        n.prev = Some(node);
    }
    node
}

/// Appends `node` after the current tail of the non-empty chain at `head`.
///
/// # Safety
///
/// `head` must be the head of a valid chain, and `node` must be valid for
/// writes and not linked in any chain.
#[inline]
pub(crate) unsafe fn link_tail<T>(head: NonNull<Node<T>>, node: NonNull<Node<T>>) {
    // SAFETY: Caller guarantees `head` heads a well formed chain, so its `prev`
    // is the tail, and that `node` is a distinct unlinked node.
    unsafe {
        let Some(tail) = (*head.as_ptr()).prev else {
            unreachable!("chain head without a tail link");
        };
        let n = &mut *node.as_ptr();
        n.prev = Some(tail);
        n.next = None;
        (*tail.as_ptr()).next = Some(node);
        (*head.as_ptr()).prev = Some(node);
    }
}

/// Unlinks `node` from the chain at `head`, returning the new head, or `None`
/// if the chain became empty.
///
/// # Safety
///
/// `head` must be the head of a valid chain and `node` must be a member of
/// that chain.
#[inline]
pub(crate) unsafe fn unlink<T>(
    head: NonNull<Node<T>>,
    node: NonNull<Node<T>>,
) -> Option<NonNull<Node<T>>> {
    // SAFETY: Caller guarantees `node` is a member of the chain headed by
    // `head`; every link followed below is therefore a live chain member.
    unsafe {
        let (next, prev) = {
            let n = &*node.as_ptr();
            (n.next, n.prev)
        };
        let Some(prev) = prev else {
            unreachable!("unlinking a node that is not linked");
        };

        match next {
            Some(next) => (*next.as_ptr()).prev = Some(prev),
            // Removing the tail: the head's back link moves to the new tail.
            None => (*head.as_ptr()).prev = Some(prev),
        }

        let new_head = if head == node {
            next
        } else {
            (*prev.as_ptr()).next = next;
            Some(head)
        };

        let n = &mut *node.as_ptr();
        n.next = None;
        n.prev = None;

        new_head
    }
}

/// An iterator over the nodes of one chain, in chain order.
///
/// Created by [`HashTable::bucket`].
///
/// [`HashTable::bucket`]: crate::HashTable::bucket
pub struct Chain<'a, T> {
    next: Option<NonNull<Node<T>>>,
    _marker: PhantomData<&'a Node<T>>,
}

impl<'a, T> Chain<'a, T> {
    pub(crate) fn new(head: Option<NonNull<Node<T>>>) -> Self {
        Chain {
            next: head,
            _marker: PhantomData,
        }
    }
}

impl<'a, T> Iterator for Chain<'a, T> {
    type Item = &'a Node<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.next?;
        // SAFETY: Chain members are kept valid by the insertion contract for
        // as long as the table borrowed by this iterator links them.
        let node = unsafe { node.as_ref() };
        self.next = node.next;
        Some(node)
    }
}
