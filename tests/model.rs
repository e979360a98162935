//! Random operation sequences checked against a `std::collections` model.

use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::ptr::NonNull;

use open_hash::HashTable;
use open_hash::Node;
use proptest::prelude::*;

type Entry = (u8, u64);

#[derive(Debug, Clone)]
enum Op {
    Insert(u8),
    Remove(u8),
    RemoveExisting(usize),
    Search(u8),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0..48u8).prop_map(Op::Insert),
        3 => (0..48u8).prop_map(Op::Remove),
        1 => any::<usize>().prop_map(Op::RemoveExisting),
        1 => (0..48u8).prop_map(Op::Search),
    ]
}

/// Two keys per hash, so chains hold unequal keys too.
fn hash_of(key: u8) -> u32 {
    u32::from(key / 2).wrapping_mul(0x9e37_79b9)
}

struct Harness {
    table: HashTable<Entry>,
    /// Ids per key, in insertion order.
    model: BTreeMap<u8, VecDeque<u64>>,
    live: Vec<(NonNull<Node<Entry>>, Entry)>,
    next_id: u64,
}

impl Harness {
    fn new() -> Self {
        Self {
            table: HashTable::new(),
            model: BTreeMap::new(),
            live: Vec::new(),
            next_id: 0,
        }
    }

    fn insert(&mut self, key: u8) {
        let id = self.next_id;
        self.next_id += 1;

        let node = NonNull::from(Box::leak(Box::new(Node::new())));
        // SAFETY: The node is fresh, unlinked, and freed only after removal
        // or after the table is dropped.
        unsafe { self.table.insert(node, (key, id), hash_of(key)).unwrap() };
        self.model.entry(key).or_default().push_back(id);
        self.live.push((node, (key, id)));
    }

    fn release(&mut self, id: u64) {
        let position = self
            .live
            .iter()
            .position(|&(_, (_, live_id))| live_id == id)
            .expect("removed entry must be live");
        let (node, _) = self.live.swap_remove(position);
        // SAFETY: The node was leaked from a box and is no longer linked.
        let node = unsafe { Box::from_raw(node.as_ptr()) };
        assert!(!node.is_linked());
        assert!(node.data().is_none());
    }

    fn check(&self) -> Result<(), TestCaseError> {
        let table = &self.table;
        let expected: usize = self.model.values().map(VecDeque::len).sum();

        prop_assert_eq!(table.len(), expected);
        prop_assert!(table.capacity().is_power_of_two());
        prop_assert!(table.capacity() >= 16);
        prop_assert!(table.filled_count() + table.deleted_count() < table.capacity());
        prop_assert!(table.filled_count() <= table.len());
        prop_assert_eq!(table.iter().count(), expected);

        for (&key, ids) in &self.model {
            for &id in ids {
                prop_assert_eq!(
                    table.search(hash_of(key), |&(_, live)| live == id),
                    Some(&(key, id))
                );
            }
            let chained: Vec<u64> = table
                .bucket(hash_of(key))
                .filter_map(|node| node.data())
                .filter(|(k, _)| *k == key)
                .map(|&(_, id)| id)
                .collect();
            prop_assert_eq!(&chained, &ids.iter().copied().collect::<Vec<_>>());
        }

        Ok(())
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        let table = std::mem::take(&mut self.table);
        drop(table);
        for (node, _) in self.live.drain(..) {
            // SAFETY: The table owning the links is gone and every node was
            // leaked from a box.
            drop(unsafe { Box::from_raw(node.as_ptr()) });
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn matches_model(ops in prop::collection::vec(op(), 1..400)) {
        let mut harness = Harness::new();

        for op in ops {
            match op {
                Op::Insert(key) => harness.insert(key),
                Op::Remove(key) => {
                    let removed = harness.table.remove(hash_of(key), |&(k, _)| k == key);
                    let expected = harness.model.get_mut(&key).and_then(VecDeque::pop_front);
                    prop_assert_eq!(removed.map(|(_, id)| id), expected);
                    prop_assert!(removed.is_none_or(|(k, _)| k == key));
                    if let Some((_, id)) = removed {
                        harness.release(id);
                    }
                }
                Op::RemoveExisting(pick) => {
                    if harness.live.is_empty() {
                        continue;
                    }
                    let (node, entry) = harness.live[pick % harness.live.len()];
                    // SAFETY: Every node in `live` is linked in the table.
                    let removed = unsafe { harness.table.remove_existing(node) };
                    prop_assert_eq!(removed, entry);

                    let ids = harness.model.get_mut(&entry.0).unwrap();
                    let position = ids.iter().position(|&id| id == entry.1).unwrap();
                    ids.remove(position);
                    harness.release(entry.1);
                }
                Op::Search(key) => {
                    let found = harness.table.search(hash_of(key), |&(k, _)| k == key);
                    let expected = harness.model.get(&key).and_then(|ids| ids.front());
                    prop_assert_eq!(found.map(|&(_, id)| id), expected.copied());
                }
            }

            harness.check()?;
        }
    }

    #[test]
    fn grows_then_shrinks_back_to_minimum(len in 1..2_000usize) {
        let mut harness = Harness::new();
        for key in 0..len {
            let key = (key % 48) as u8;
            harness.insert(key);
        }
        harness.check()?;

        while let Some(&(_, (key, _))) = harness.live.last() {
            let removed = harness.table.remove(hash_of(key), |&(k, _)| k == key);
            let (_, id) = removed.unwrap();
            let expected = harness.model.get_mut(&key).and_then(VecDeque::pop_front);
            prop_assert_eq!(Some(id), expected);
            harness.release(id);
        }
        harness.check()?;
        prop_assert_eq!(harness.table.capacity(), 16);
    }
}
