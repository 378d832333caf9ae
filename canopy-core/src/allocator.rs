//! Child route-address allocation.
//!
//! Given the parent a joiner wants to attach under and the parent's child
//! occupancy, pick the route-address the joiner will hold. The choice is a
//! pure function of its inputs, so replaying a lost request yields the same
//! address.

use crate::address::{NodeAddr, NodeId};
use crate::binding::BindingTable;

/// The most children any node will parent. The octal encoding leaves room
/// for five, but four keeps a slot's bit pattern clear of the multicast
/// range on every level.
pub const MAX_CHILDREN: u8 = 4;

/// Picks the route-address for `requester` as a new child of `parent`.
///
/// `child_mask` is the parent's occupancy as reported by the routing layer:
/// bit `i` set means slot `i + 1` is taken. Slots are tried from the lowest
/// free bit upward; a slot whose address is already bound to a different id
/// in `table` (a stale mask) is passed over. Returns `None` when no slot
/// survives.
pub fn next_child_address(
    parent: NodeAddr,
    child_mask: u8,
    table: &BindingTable,
    requester: NodeId,
) -> Option<NodeAddr> {
    for bit in 0..MAX_CHILDREN {
        if child_mask & (1 << bit) != 0 {
            continue;
        }
        let candidate = parent.child(bit + 1);
        if candidate == NodeAddr::COORDINATOR || candidate == NodeAddr::DEFAULT {
            continue;
        }
        if table.held_by_other(candidate, requester) {
            continue;
        }
        return Some(candidate);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_lowest_free_slot() {
        let table = BindingTable::new();
        let id = NodeId::new(7);
        assert_eq!(
            next_child_address(NodeAddr::COORDINATOR, 0b0000, &table, id),
            Some(NodeAddr::new(0o1))
        );
        assert_eq!(
            next_child_address(NodeAddr::COORDINATOR, 0b0001, &table, id),
            Some(NodeAddr::new(0o2))
        );
        assert_eq!(
            next_child_address(NodeAddr::new(0o2), 0b0011, &table, id),
            Some(NodeAddr::new(0o32))
        );
    }

    #[test]
    fn full_mask_fails() {
        let table = BindingTable::new();
        assert_eq!(
            next_child_address(NodeAddr::COORDINATOR, 0b1111, &table, NodeId::new(7)),
            None
        );
    }

    #[test]
    fn skips_addresses_bound_to_another_id() {
        let mut table = BindingTable::new();
        table.insert_or_replace(NodeId::new(9), NodeAddr::new(0o1));
        assert_eq!(
            next_child_address(NodeAddr::COORDINATOR, 0b0000, &table, NodeId::new(7)),
            Some(NodeAddr::new(0o2))
        );
    }

    #[test]
    fn reuses_address_bound_to_the_requester() {
        let mut table = BindingTable::new();
        table.insert_or_replace(NodeId::new(7), NodeAddr::new(0o1));
        assert_eq!(
            next_child_address(NodeAddr::COORDINATOR, 0b0000, &table, NodeId::new(7)),
            Some(NodeAddr::new(0o1))
        );
    }

    #[test]
    fn deterministic_for_identical_inputs() {
        let mut table = BindingTable::new();
        table.insert_or_replace(NodeId::new(3), NodeAddr::new(0o2));
        let first = next_child_address(NodeAddr::COORDINATOR, 0b0001, &table, NodeId::new(7));
        let second = next_child_address(NodeAddr::COORDINATOR, 0b0001, &table, NodeId::new(7));
        assert_eq!(first, second);
        assert_eq!(first, Some(NodeAddr::new(0o3)));
    }
}
