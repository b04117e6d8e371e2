use static_assertions::assert_eq_size;
use thiserror::Error;
use types::phase0::primitives::{Epoch, H256};

use crate::node::NodeIndex;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Error)]
pub enum Error {
    #[error("unknown root: {root:?}")]
    UnknownRoot { root: H256 },
    #[error("block has unknown parent (root: {root:?}, parent: {parent:?})")]
    UnknownParent { root: H256, parent: H256 },
    #[error("block is already present: {root:?}")]
    DuplicateRoot { root: H256 },
    #[error("index out of bounds (index: {index}, length: {length})")]
    InvalidIndex { index: NodeIndex, length: usize },
    #[error(
        "delta vector length does not match node count \
         (deltas: {deltas}, nodes: {nodes}, indices: {indices})"
    )]
    LengthMismatch {
        deltas: usize,
        nodes: usize,
        indices: usize,
    },
    #[error("delta overflowed at index {index}")]
    DeltaOverflow { index: NodeIndex },
    #[error("finalized epoch moved backward (current: {current}, new: {new})")]
    FinalizedEpochRegression { current: Epoch, new: Epoch },
    #[error(
        "head is not viable \
         (justified root: {justified_root:?}, head root: {head_root:?}, \
         head justified epoch: {head_justified_epoch}, head finalized epoch: {head_finalized_epoch})"
    )]
    HeadNotViable {
        justified_root: H256,
        head_root: H256,
        head_justified_epoch: Epoch,
        head_finalized_epoch: Epoch,
    },
    #[error("best descendant out of bounds (node: {index}, best descendant: {best_descendant})")]
    InvalidBestDescendant {
        index: NodeIndex,
        best_descendant: NodeIndex,
    },
}

impl Error {
    /// [`Error::HeadNotViable`] is expected right after a checkpoint change and should be retried.
    /// Every other variant indicates a caller bug or a corrupted [`Store`](crate::Store).
    #[must_use]
    pub const fn is_head_not_viable(&self) -> bool {
        matches!(self, Self::HeadNotViable { .. })
    }
}

assert_eq_size!(Error, [u64; 11]);
