use types::phase0::primitives::{Epoch, Slot, H256};

/// Position of a [`Node`] in [`Store::nodes`](crate::Store::nodes).
///
/// Absent links are represented with [`None`]. Indices are only meaningful until the next prune.
pub type NodeIndex = usize;

/// The block the tree is rooted at. See [`Store::new`](crate::Store::new).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Anchor {
    pub slot: Slot,
    pub root: H256,
    pub justified_epoch: Epoch,
    pub finalized_epoch: Epoch,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Node {
    slot: Slot,
    root: H256,
    parent: Option<NodeIndex>,
    justified_epoch: Epoch,
    finalized_epoch: Epoch,
    pub(crate) weight: u64,
    pub(crate) best_child: Option<NodeIndex>,
    pub(crate) best_descendant: Option<NodeIndex>,
}

impl Node {
    pub(crate) const fn new(
        slot: Slot,
        root: H256,
        parent: Option<NodeIndex>,
        justified_epoch: Epoch,
        finalized_epoch: Epoch,
    ) -> Self {
        Self {
            slot,
            root,
            parent,
            justified_epoch,
            finalized_epoch,
            weight: 0,
            best_child: None,
            best_descendant: None,
        }
    }

    pub(crate) const fn from_anchor(anchor: Anchor) -> Self {
        let Anchor {
            slot,
            root,
            justified_epoch,
            finalized_epoch,
        } = anchor;

        Self::new(slot, root, None, justified_epoch, finalized_epoch)
    }

    #[must_use]
    pub const fn slot(&self) -> Slot {
        self.slot
    }

    #[must_use]
    pub const fn root(&self) -> H256 {
        self.root
    }

    #[must_use]
    pub const fn parent(&self) -> Option<NodeIndex> {
        self.parent
    }

    #[must_use]
    pub const fn justified_epoch(&self) -> Epoch {
        self.justified_epoch
    }

    #[must_use]
    pub const fn finalized_epoch(&self) -> Epoch {
        self.finalized_epoch
    }

    #[must_use]
    pub const fn weight(&self) -> u64 {
        self.weight
    }

    #[must_use]
    pub const fn best_child(&self) -> Option<NodeIndex> {
        self.best_child
    }

    #[must_use]
    pub const fn best_descendant(&self) -> Option<NodeIndex> {
        self.best_descendant
    }

    // Links that point before the cut leave the retained range and are dropped.
    pub(crate) fn rebase(&mut self, cut: NodeIndex) {
        let rebase_link = |link: Option<NodeIndex>| link?.checked_sub(cut);

        self.parent = rebase_link(self.parent);
        self.best_child = rebase_link(self.best_child);
        self.best_descendant = rebase_link(self.best_descendant);
    }
}
