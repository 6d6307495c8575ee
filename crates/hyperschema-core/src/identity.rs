//! # Node Identity
//!
//! Every schema node lives in an arena and is addressed by a [`NodeId`],
//! a stable index assigned when the node is allocated. Identity-based
//! bookkeeping (parents, clone sets, cycle detection) is expressed through
//! these indices rather than through object identity.

use serde::Serialize;

/// Index of a schema node inside its arena.
///
/// A `NodeId` is only meaningful for the arena that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(usize);

impl NodeId {
    /// Build an identifier from a raw arena slot.
    pub fn from_index(index: usize) -> Self {
        Self(index)
    }

    /// The arena slot this identifier addresses.
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "node:{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_round_trips() {
        let id = NodeId::from_index(42);
        assert_eq!(id.index(), 42);
        assert_eq!(id.to_string(), "node:42");
    }

    #[test]
    fn indices_past_u32_are_kept_distinct() {
        let wide = NodeId::from_index(u32::MAX as usize + 1);
        assert_eq!(wide.index(), u32::MAX as usize + 1);
        assert_ne!(wide, NodeId::from_index(0));
    }

    #[test]
    fn serializes_as_bare_index() {
        assert_eq!(serde_json::to_value(NodeId::from_index(7)).unwrap(), 7);
    }

    #[test]
    fn ordering_follows_allocation_order() {
        assert!(NodeId::from_index(1) < NodeId::from_index(2));
    }
}
