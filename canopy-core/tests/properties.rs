//! Property-based tests for the binding table and the allocator.
//!
//! Key invariants:
//! 1. An id appears in the table at most once, whatever sequence of
//!    inserts, replacements and releases produced it.
//! 2. An unreleased binding round-trips through both lookup directions.
//! 3. Releasing never changes the table's length.
//! 4. Allocation is pure and always lands in a real child slot.

use canopy_core::allocator::{next_child_address, MAX_CHILDREN};
use canopy_core::{BindingTable, NodeAddr, NodeId};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum TableOp {
    Insert(u8, u16),
    Release(u16),
}

fn addr_strategy() -> impl Strategy<Value = u16> {
    // Well-formed one- to three-digit octal paths with digits 1..=4.
    (1u16..=4, 0u16..=4, 0u16..=4).prop_map(|(a, b, c)| {
        let mut addr = a;
        if b != 0 {
            addr |= b << 3;
            if c != 0 {
                addr |= c << 6;
            }
        }
        addr
    })
}

fn op_strategy() -> impl Strategy<Value = TableOp> {
    prop_oneof![
        (1u8..=16, addr_strategy()).prop_map(|(id, addr)| TableOp::Insert(id, addr)),
        addr_strategy().prop_map(TableOp::Release),
    ]
}

fn apply(table: &mut BindingTable, ops: &[TableOp]) {
    for op in ops {
        match *op {
            TableOp::Insert(id, addr) => {
                table.insert_or_replace(NodeId::new(id), NodeAddr::new(addr))
            }
            TableOp::Release(addr) => table.release_addr(NodeAddr::new(addr)),
        }
    }
}

proptest! {
    /// No sequence of operations produces two rows for the same id.
    #[test]
    fn prop_ids_stay_unique(ops in prop::collection::vec(op_strategy(), 0..64)) {
        let mut table = BindingTable::new();
        apply(&mut table, &ops);

        let mut seen = std::collections::HashSet::new();
        for binding in table.iter() {
            prop_assert!(seen.insert(binding.id), "id {} appears twice", binding.id);
        }
    }

    /// A binding that was inserted last for its id and never released is
    /// found through both lookup directions.
    #[test]
    fn prop_unreleased_bindings_round_trip(
        ops in prop::collection::vec(op_strategy(), 0..32),
        id in 1u8..=16,
        addr in addr_strategy(),
    ) {
        let mut table = BindingTable::new();
        apply(&mut table, &ops);
        table.insert_or_replace(NodeId::new(id), NodeAddr::new(addr));
        // The address may collide with an earlier row; release collisions
        // the way a re-assignment would, then re-bind.
        table.release_addr(NodeAddr::new(addr));
        table.insert_or_replace(NodeId::new(id), NodeAddr::new(addr));

        prop_assert_eq!(table.addr_of(NodeId::new(id)), Some(NodeAddr::new(addr)));
        prop_assert_eq!(table.id_of(NodeAddr::new(addr)), Some(NodeId::new(id)));
    }

    /// Releasing marks rows but never shrinks or grows the table, and the
    /// released address stops resolving.
    #[test]
    fn prop_release_preserves_length(
        ops in prop::collection::vec(op_strategy(), 0..64),
        addr in addr_strategy(),
    ) {
        let mut table = BindingTable::new();
        apply(&mut table, &ops);
        let len_before = table.len();

        table.release_addr(NodeAddr::new(addr));

        prop_assert_eq!(table.len(), len_before);
        prop_assert_eq!(table.id_of(NodeAddr::new(addr)), None);
    }

    /// The allocator is a pure function of its inputs.
    #[test]
    fn prop_allocator_is_pure(
        ops in prop::collection::vec(op_strategy(), 0..32),
        parent in prop_oneof![Just(0u16), addr_strategy()],
        mask in 0u8..=0b1111,
        requester in 1u8..=16,
    ) {
        let mut table = BindingTable::new();
        apply(&mut table, &ops);

        let first = next_child_address(
            NodeAddr::new(parent), mask, &table, NodeId::new(requester));
        let second = next_child_address(
            NodeAddr::new(parent), mask, &table, NodeId::new(requester));
        prop_assert_eq!(first, second);
    }

    /// Whatever the allocator returns differs from the parent by exactly
    /// one octal digit, in a slot within the child bound.
    #[test]
    fn prop_allocator_respects_child_bound(
        ops in prop::collection::vec(op_strategy(), 0..32),
        parent in prop_oneof![Just(0u16), addr_strategy()],
        mask in 0u8..=0b1111,
        requester in 1u8..=16,
    ) {
        let mut table = BindingTable::new();
        apply(&mut table, &ops);

        let parent = NodeAddr::new(parent);
        if let Some(addr) = next_child_address(parent, mask, &table, NodeId::new(requester)) {
            let slot = (addr.to_u16() ^ parent.to_u16()) >> (3 * parent.level());
            prop_assert!(slot >= 1 && slot <= u16::from(MAX_CHILDREN));
            prop_assert_eq!(addr.level(), parent.level() + 1);
            // The mask said the slot was free.
            prop_assert_eq!(u16::from(mask) & (1 << (slot - 1)), 0);
        }
    }
}
