// Lock order is `store`, then `votes`, then `balances`.
// `Controller::find_head` takes all of them. Every other method takes at most one.

use fork_choice_store::{Anchor, Difference, Node, Store, StoreConfig};
use log::{debug, warn};
use parking_lot::RwLock;
use types::phase0::primitives::{Epoch, Gwei, Slot, ValidatorIndex, H256};

use crate::{
    error::Error,
    votes::{compute_deltas, Votes},
};

pub struct Controller {
    store: RwLock<Store>,
    votes: RwLock<Votes>,
    // Balances the current weights were computed with.
    balances: RwLock<Vec<Gwei>>,
}

impl Controller {
    #[must_use]
    pub fn new(store_config: StoreConfig, anchor: Anchor) -> Self {
        Self {
            store: RwLock::new(Store::new(store_config, anchor)),
            votes: RwLock::default(),
            balances: RwLock::default(),
        }
    }

    pub fn on_block(
        &self,
        slot: Slot,
        block_root: H256,
        parent_root: H256,
        justified_epoch: Epoch,
        finalized_epoch: Epoch,
    ) -> Result<(), Error> {
        self.store
            .write()
            .insert(slot, block_root, parent_root, justified_epoch, finalized_epoch)
            .map_err(Into::into)
    }

    pub fn on_attestation(
        &self,
        validator_index: ValidatorIndex,
        block_root: H256,
        target_epoch: Epoch,
    ) -> Result<(), Error> {
        self.votes
            .write()
            .record(validator_index, block_root, target_epoch)
    }

    /// Applies externally computed deltas. Votes and balances are left untouched.
    pub fn apply_score_changes(
        &self,
        justified_epoch: Epoch,
        finalized_epoch: Epoch,
        deltas: Vec<Difference>,
    ) -> Result<(), Error> {
        self.store
            .write()
            .apply_score_changes(justified_epoch, finalized_epoch, deltas)
            .map_err(Into::into)
    }

    /// Weighs votes recorded since the last call and resolves the head.
    ///
    /// `justified_balances` replaces the balances used in the previous call.
    /// The balances are kept even if no head can be resolved, because the weights already
    /// reflect them.
    pub fn find_head(
        &self,
        justified_epoch: Epoch,
        justified_root: H256,
        finalized_epoch: Epoch,
        justified_balances: &[Gwei],
    ) -> Result<H256, Error> {
        let mut store = self.store.write();
        let mut votes = self.votes.write();
        let mut balances = self.balances.write();

        let deltas = compute_deltas(&store, &mut votes, &balances, justified_balances)?;

        store.apply_score_changes(justified_epoch, finalized_epoch, deltas)?;

        justified_balances.clone_into(&mut balances);

        let head_root = store.head(justified_root).inspect_err(|error| {
            if error.is_head_not_viable() {
                warn!("{error}");
            }
        })?;

        debug!("found head {head_root:?} (justified root: {justified_root:?})");

        Ok(head_root)
    }

    pub fn head(&self, justified_root: H256) -> Result<H256, Error> {
        self.store.read().head(justified_root).map_err(Into::into)
    }

    pub fn prune(&self, finalized_root: H256, finalized_epoch: Epoch) -> Result<(), Error> {
        self.store
            .write()
            .prune_before_finalized(finalized_root, finalized_epoch)
            .map_err(Into::into)
    }

    #[must_use]
    pub fn contains_block(&self, block_root: H256) -> bool {
        self.store.read().contains_block(block_root)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.store.read().len()
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<Node> {
        self.store.read().nodes().to_vec()
    }

    #[must_use]
    pub fn store_config(&self) -> StoreConfig {
        self.store.read().store_config()
    }
}
