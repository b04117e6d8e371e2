//! Array-backed fork choice store for [LMD GHOST].
//!
//! Blocks are kept in a [`Vec`] in topological order with a root to index map next to it.
//! Children are not stored. Instead every node caches its best child and best descendant, which
//! makes finding the head a single lookup once weights are up to date.
//!
//! Weights change through [`Store::apply_score_changes`], which takes one signed delta per node
//! and propagates it to ancestors in a single backward pass. Computing the deltas from votes is
//! left to the caller (see `fork_choice_control`).
//!
//! Finalized history is discarded by [`Store::prune_before_finalized`]. Pruning removes a prefix of
//! the array, so every surviving index is shifted down by the same amount.
//!
//! This implementation follows [`proto_array`].
//!
//! [LMD GHOST]:     https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/phase0/fork-choice.md
//! [`proto_array`]: https://github.com/protolambda/lmd-ghost/tree/242f0dced3b34feed0d4e9d2fd0e5e66e448c359#array-based-stateful-dag-proto_array

pub use crate::{
    error::Error,
    node::{Anchor, Node, NodeIndex},
    store::{Difference, Store},
    store_config::{StoreConfig, DEFAULT_PRUNE_THRESHOLD},
};

mod error;
mod node;
mod store;
mod store_config;
