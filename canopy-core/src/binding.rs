use crate::address::{NodeAddr, NodeId};

/// One row of the coordinator's table: identifier `id` currently holds
/// route-address `addr`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    pub id: NodeId,
    pub addr: NodeAddr,
}

/// The coordinator's record of which identifier holds which route-address.
///
/// Rows are appended in assignment order and searched linearly; the table
/// never shrinks. Releasing marks the row with [`NodeAddr::EMPTY`] so the
/// id keeps its slot and re-joins land on the same row. Iteration order is
/// insertion order and is only meaningful for diagnostics.
#[derive(Debug, Clone, Default)]
pub struct BindingTable {
    rows: Vec<Binding>,
}

impl BindingTable {
    pub fn new() -> Self {
        Default::default()
    }

    /// The route-address bound to `id`, if the id is known and not
    /// released.
    pub fn addr_of(&self, id: NodeId) -> Option<NodeAddr> {
        self.rows
            .iter()
            .find(|row| row.id == id)
            .map(|row| row.addr)
            .filter(|addr| *addr != NodeAddr::EMPTY)
    }

    /// The identifier bound to `addr`, if any.
    pub fn id_of(&self, addr: NodeAddr) -> Option<NodeId> {
        self.rows
            .iter()
            .find(|row| row.addr == addr && row.addr != NodeAddr::EMPTY)
            .map(|row| row.id)
    }

    /// Binds `id` to `addr`, overwriting the id's existing row if there is
    /// one.
    pub fn insert_or_replace(&mut self, id: NodeId, addr: NodeAddr) {
        match self.rows.iter_mut().find(|row| row.id == id) {
            Some(row) => row.addr = addr,
            None => self.rows.push(Binding { id, addr }),
        }
    }

    /// Releases every row holding `addr`. The rows stay in the table with
    /// the empty-address marker.
    pub fn release_addr(&mut self, addr: NodeAddr) {
        for row in self.rows.iter_mut().filter(|row| row.addr == addr) {
            row.addr = NodeAddr::EMPTY;
        }
    }

    /// Whether `addr` is held by an id other than `id`.
    pub fn held_by_other(&self, addr: NodeAddr, id: NodeId) -> bool {
        self.rows
            .iter()
            .any(|row| row.addr == addr && row.addr != NodeAddr::EMPTY && row.id != id)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Binding> {
        self.rows.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> BindingTable {
        let mut table = BindingTable::new();
        table.insert_or_replace(NodeId::new(7), NodeAddr::new(0o1));
        table.insert_or_replace(NodeId::new(8), NodeAddr::new(0o2));
        table.insert_or_replace(NodeId::new(9), NodeAddr::new(0o12));
        table
    }

    #[test]
    fn lookups_round_trip() {
        let table = setup();
        assert_eq!(table.addr_of(NodeId::new(8)), Some(NodeAddr::new(0o2)));
        assert_eq!(table.id_of(NodeAddr::new(0o12)), Some(NodeId::new(9)));
        assert_eq!(table.addr_of(NodeId::new(42)), None);
        assert_eq!(table.id_of(NodeAddr::new(0o3)), None);
    }

    #[test]
    fn replace_keeps_ids_unique() {
        let mut table = setup();
        table.insert_or_replace(NodeId::new(7), NodeAddr::new(0o12));
        assert_eq!(table.len(), 3);
        assert_eq!(table.addr_of(NodeId::new(7)), Some(NodeAddr::new(0o12)));
    }

    #[test]
    fn release_marks_without_shrinking() {
        let mut table = setup();
        table.release_addr(NodeAddr::new(0o2));
        assert_eq!(table.len(), 3);
        assert_eq!(table.id_of(NodeAddr::new(0o2)), None);
        assert_eq!(table.addr_of(NodeId::new(8)), None);

        // The released id re-joins onto its old row.
        table.insert_or_replace(NodeId::new(8), NodeAddr::new(0o3));
        assert_eq!(table.len(), 3);
        assert_eq!(table.addr_of(NodeId::new(8)), Some(NodeAddr::new(0o3)));
    }

    #[test]
    fn held_by_other_ignores_own_row_and_released_rows() {
        let mut table = setup();
        assert!(table.held_by_other(NodeAddr::new(0o1), NodeId::new(8)));
        assert!(!table.held_by_other(NodeAddr::new(0o1), NodeId::new(7)));
        table.release_addr(NodeAddr::new(0o1));
        assert!(!table.held_by_other(NodeAddr::new(0o1), NodeId::new(8)));
    }
}
