use core::{cmp::Ordering, iter};

use arithmetic::U64Ext as _;
use hash_hasher::HashedMap;
use log::debug;
use types::phase0::{
    consts::ZERO_HASH,
    primitives::{Epoch, Slot, H256},
};

use crate::{
    error::Error,
    node::{Anchor, Node, NodeIndex},
    store_config::StoreConfig,
};

/// Signed change in the weight of a node.
pub type Difference = i64;

/// Array-backed block tree for LMD GHOST.
///
/// Nodes are topologically sorted: a child is always stored after its parent.
/// [`Store::apply_score_changes`] relies on this to visit every child before its parent in one pass.
///
/// `Store` does no locking of its own.
/// Callers sharing it between threads must serialize mutations and exclude them during reads.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Store {
    store_config: StoreConfig,
    justified_epoch: Epoch,
    finalized_epoch: Epoch,
    nodes: Vec<Node>,
    // `hash_hasher::HashedMap` is safe to use because block roots are already hashed.
    node_indices: HashedMap<H256, NodeIndex>,
}

impl Store {
    /// Creates a store containing only `anchor`.
    ///
    /// This is the only way to add a node without a parent.
    /// The epochs of `anchor` become the initial checkpoints of the store.
    #[must_use]
    pub fn new(store_config: StoreConfig, anchor: Anchor) -> Self {
        debug!("anchoring fork choice store at {anchor:?}");

        let mut node_indices = HashedMap::default();
        node_indices.insert(anchor.root, 0);

        Self {
            store_config,
            justified_epoch: anchor.justified_epoch,
            finalized_epoch: anchor.finalized_epoch,
            nodes: vec![Node::from_anchor(anchor)],
            node_indices,
        }
    }

    #[must_use]
    pub const fn store_config(&self) -> StoreConfig {
        self.store_config
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
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    #[must_use]
    pub fn index_of(&self, root: H256) -> Option<NodeIndex> {
        self.node_indices.get(&root).copied()
    }

    #[must_use]
    pub fn node(&self, root: H256) -> Option<&Node> {
        self.nodes.get(self.index_of(root)?)
    }

    #[must_use]
    pub fn contains_block(&self, root: H256) -> bool {
        self.node_indices.contains_key(&root)
    }

    /// Returns `true` if `descendant_root` is `ancestor_root` or one of its descendants.
    ///
    /// Ancestry can only be established within the retained part of the tree.
    #[must_use]
    pub fn is_descendant(&self, ancestor_root: H256, descendant_root: H256) -> bool {
        let Some(ancestor_index) = self.index_of(ancestor_root) else {
            return false;
        };

        let Some(descendant_index) = self.index_of(descendant_root) else {
            return false;
        };

        self.ancestors(descendant_index)
            .take_while(|(index, _)| *index >= ancestor_index)
            .any(|(index, _)| index == ancestor_index)
    }

    /// Returns the root of the newest ancestor of `root` (inclusive) with a slot not after `slot`.
    #[must_use]
    pub fn ancestor_at_slot(&self, root: H256, slot: Slot) -> Option<H256> {
        self.ancestors(self.index_of(root)?)
            .find(|(_, node)| node.slot() <= slot)
            .map(|(_, node)| node.root())
    }

    /// Registers a block whose parent is already in the store.
    ///
    /// Only the best links of the immediate parent are updated.
    /// Ancestors further up are corrected by the next call to [`Store::apply_score_changes`].
    pub fn insert(
        &mut self,
        slot: Slot,
        root: H256,
        parent_root: H256,
        justified_epoch: Epoch,
        finalized_epoch: Epoch,
    ) -> Result<(), Error> {
        if self.contains_block(root) {
            return Err(Error::DuplicateRoot { root });
        }

        let parent_index = self.index_of(parent_root).ok_or(Error::UnknownParent {
            root,
            parent: parent_root,
        })?;

        let node_index = self.nodes.len();

        self.nodes.push(Node::new(
            slot,
            root,
            Some(parent_index),
            justified_epoch,
            finalized_epoch,
        ));

        self.node_indices.insert(root, node_index);

        self.update_best_child_and_descendant(parent_index, node_index)?;

        debug!("inserted block {root:?} at index {node_index} (slot: {slot}, parent: {parent_root:?})");

        Ok(())
    }

    /// Updates weights with `deltas` and repairs best links bottom-up.
    ///
    /// `deltas` must contain one entry per node, positionally aligned with [`Store::nodes`].
    /// The store checkpoints are replaced with `justified_epoch` and `finalized_epoch` first so that
    /// viability is judged against them.
    ///
    /// Weights are computed before anything is written. The store is left unchanged on
    /// [`Error::DeltaOverflow`].
    pub fn apply_score_changes(
        &mut self,
        justified_epoch: Epoch,
        finalized_epoch: Epoch,
        deltas: Vec<Difference>,
    ) -> Result<(), Error> {
        let length = self.nodes.len();

        if deltas.len() != length || deltas.len() != self.node_indices.len() {
            return Err(Error::LengthMismatch {
                deltas: deltas.len(),
                nodes: length,
                indices: self.node_indices.len(),
            });
        }

        let weights = self.weights_after(deltas)?;

        self.justified_epoch = justified_epoch;
        self.finalized_epoch = finalized_epoch;

        for (node_index, weight) in weights.into_iter().enumerate().rev() {
            let node = &mut self.nodes[node_index];

            // The zero hash aliases the genesis block and carries no weight.
            if node.root() == ZERO_HASH {
                continue;
            }

            node.weight = weight;

            if let Some(parent_index) = node.parent() {
                self.update_best_child_and_descendant(parent_index, node_index)?;
            }
        }

        Ok(())
    }

    /// Follows the best descendant of `justified_root`.
    ///
    /// [`Error::HeadNotViable`] means no head can be resolved until the weights catch up with the
    /// current checkpoints. It does not indicate corruption.
    pub fn head(&self, justified_root: H256) -> Result<H256, Error> {
        let justified_index = self.index_of(justified_root).ok_or(Error::UnknownRoot {
            root: justified_root,
        })?;

        let justified_node = self.node_at(justified_index)?;

        let best_node = match justified_node.best_descendant() {
            Some(best_descendant) => self.node_at(best_descendant)?,
            None => justified_node,
        };

        if !self.viable_for_head(best_node) {
            return Err(Error::HeadNotViable {
                justified_root,
                head_root: best_node.root(),
                head_justified_epoch: best_node.justified_epoch(),
                head_finalized_epoch: best_node.finalized_epoch(),
            });
        }

        Ok(best_node.root())
    }

    /// Discards all nodes before the finalized block, which becomes the node at index 0.
    ///
    /// Nothing is discarded while fewer than [`StoreConfig::prune_threshold`] nodes precede the
    /// finalized block, but `finalized_epoch` is still recorded.
    pub fn prune_before_finalized(
        &mut self,
        finalized_root: H256,
        finalized_epoch: Epoch,
    ) -> Result<(), Error> {
        if finalized_epoch < self.finalized_epoch {
            return Err(Error::FinalizedEpochRegression {
                current: self.finalized_epoch,
                new: finalized_epoch,
            });
        }

        let finalized_index = self.index_of(finalized_root).ok_or(Error::UnknownRoot {
            root: finalized_root,
        })?;

        self.finalized_epoch = finalized_epoch;

        if finalized_index < self.store_config.prune_threshold {
            return Ok(());
        }

        for node in self.nodes.drain(..finalized_index) {
            self.node_indices.remove(&node.root());
        }

        // Every remaining index is at least `finalized_index` because the map is bijective with
        // the nodes and the prefix was just removed from both.
        for index in self.node_indices.values_mut() {
            *index -= finalized_index;
        }

        for node in &mut self.nodes {
            node.rebase(finalized_index);
        }

        debug!(
            "pruned {finalized_index} blocks preceding finalized block {finalized_root:?} \
             ({} remaining)",
            self.nodes.len(),
        );

        Ok(())
    }

    /// Checks whether `node` agrees with the store checkpoints.
    ///
    /// A checkpoint epoch of 0 in the store accepts any node to allow bootstrapping.
    #[must_use]
    pub const fn viable_for_head(&self, node: &Node) -> bool {
        let justified =
            self.justified_epoch == node.justified_epoch() || self.justified_epoch == 0;
        let finalized =
            self.finalized_epoch == node.finalized_epoch() || self.finalized_epoch == 0;

        justified && finalized
    }

    /// Checks whether the node at `index` or its best descendant is viable for head.
    ///
    /// A node without a best descendant is a leaf as far as fork choice is concerned and is judged
    /// on its own.
    pub fn leads_to_viable_head(&self, index: NodeIndex) -> Result<bool, Error> {
        let node = self.node_at(index)?;

        let best_descendant_is_viable = match node.best_descendant() {
            Some(best_descendant) => {
                let best_descendant_node =
                    self.nodes
                        .get(best_descendant)
                        .ok_or(Error::InvalidBestDescendant {
                            index,
                            best_descendant,
                        })?;

                self.viable_for_head(best_descendant_node)
            }
            None => false,
        };

        Ok(best_descendant_is_viable || self.viable_for_head(node))
    }

    // Possible outcomes:
    // - The child becomes the best child.
    // - The child is already the best child and the best descendant is refreshed.
    // - The child is already the best child but no longer leads to a viable head and is evicted.
    // - Nothing changes.
    fn update_best_child_and_descendant(
        &mut self,
        parent_index: NodeIndex,
        child_index: NodeIndex,
    ) -> Result<(), Error> {
        let child = *self.node_at(child_index)?;
        let parent = *self.node_at(parent_index)?;

        let child_leads_to_viable_head = self.leads_to_viable_head(child_index)?;

        let change_to_none = (None, None);
        let change_to_child = (
            Some(child_index),
            Some(child.best_descendant().unwrap_or(child_index)),
        );
        let no_change = (parent.best_child(), parent.best_descendant());

        let (best_child, best_descendant) = match parent.best_child() {
            None if child_leads_to_viable_head => change_to_child,
            None => no_change,
            Some(best_child_index) if best_child_index == child_index => {
                if child_leads_to_viable_head {
                    change_to_child
                } else {
                    change_to_none
                }
            }
            Some(best_child_index) => {
                let best_child = self.node_at(best_child_index)?;
                let best_child_leads_to_viable_head =
                    self.leads_to_viable_head(best_child_index)?;

                match (child_leads_to_viable_head, best_child_leads_to_viable_head) {
                    (true, false) => change_to_child,
                    (false, true) => no_change,
                    // Roots break ties so that the outcome does not depend on arrival order.
                    _ => match child
                        .weight()
                        .cmp(&best_child.weight())
                        .then_with(|| child.root().cmp(&best_child.root()))
                    {
                        Ordering::Greater => change_to_child,
                        Ordering::Equal | Ordering::Less => no_change,
                    },
                }
            }
        };

        let parent = &mut self.nodes[parent_index];
        parent.best_child = best_child;
        parent.best_descendant = best_descendant;

        Ok(())
    }

    // Computes the weight every node will have after `deltas` without modifying the store,
    // so that an overflow anywhere leaves the store untouched.
    fn weights_after(&self, mut deltas: Vec<Difference>) -> Result<Vec<u64>, Error> {
        let length = self.nodes.len();
        let mut weights = vec![0; length];

        for (node_index, node) in self.nodes.iter().enumerate().rev() {
            // All descendants come after the node, so its delta already includes theirs.
            let delta = deltas[node_index];

            if node.root() == ZERO_HASH {
                weights[node_index] = node.weight();
                continue;
            }

            weights[node_index] = node
                .weight()
                .apply_delta(delta)
                .ok_or(Error::DeltaOverflow { index: node_index })?;

            if let Some(parent_index) = node.parent() {
                let parent_delta = deltas
                    .get_mut(parent_index)
                    .ok_or(Error::InvalidIndex {
                        index: parent_index,
                        length,
                    })?;

                *parent_delta = parent_delta
                    .checked_add(delta)
                    .ok_or(Error::DeltaOverflow { index: parent_index })?;
            }
        }

        Ok(weights)
    }

    fn node_at(&self, index: NodeIndex) -> Result<&Node, Error> {
        self.nodes.get(index).ok_or(Error::InvalidIndex {
            index,
            length: self.nodes.len(),
        })
    }

    fn ancestors(&self, index: NodeIndex) -> impl Iterator<Item = (NodeIndex, &Node)> + '_ {
        iter::successors(
            self.nodes.get(index).map(|node| (index, node)),
            |(_, node)| {
                let parent_index = node.parent()?;
                self.nodes.get(parent_index).map(|parent| (parent_index, parent))
            },
        )
    }
}
