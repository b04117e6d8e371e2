use arithmetic::I64Ext as _;
use fork_choice_store::{Difference, Store};
use types::phase0::{
    consts::{VALIDATOR_REGISTRY_LIMIT, ZERO_HASH},
    primitives::{Epoch, Gwei, ValidatorIndex, H256},
};

use crate::error::Error;

/// Latest message of a single validator.
///
/// `current_root` is the block the validator's balance was last applied to.
/// `next_root` is the block it will be moved to the next time deltas are computed.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct Vote {
    pub current_root: H256,
    pub next_root: H256,
    pub next_epoch: Epoch,
}

/// Votes indexed by validator index.
///
/// Grows to fit any validator that attests, up to [`VALIDATOR_REGISTRY_LIMIT`].
#[derive(Clone, PartialEq, Eq, Default, Debug)]
pub struct Votes(Vec<Vote>);

impl Votes {
    /// Replaces the latest message of a validator if `target_epoch` is newer.
    /// The first message of a validator is always recorded.
    pub fn record(
        &mut self,
        validator_index: ValidatorIndex,
        block_root: H256,
        target_epoch: Epoch,
    ) -> Result<(), Error> {
        let index = usize::try_from(validator_index)
            .ok()
            .filter(|_| validator_index < VALIDATOR_REGISTRY_LIMIT)
            .ok_or(Error::ValidatorIndexOverflow { validator_index })?;

        if self.0.len() <= index {
            let new_len = index
                .checked_add(1)
                .ok_or(Error::ValidatorIndexOverflow { validator_index })?;

            self.0.resize_with(new_len, Vote::default);
        }

        let vote = &mut self.0[index];

        if target_epoch > vote.next_epoch || *vote == Vote::default() {
            vote.next_root = block_root;
            vote.next_epoch = target_epoch;
        }

        Ok(())
    }

    fn iter_mut(&mut self) -> impl Iterator<Item = &mut Vote> {
        self.0.iter_mut()
    }
}

/// Computes one delta per node of `store` from changes in votes and balances.
///
/// Votes for blocks outside the tree (pruned or never seen) are ignored.
/// Validators missing from a balance list are treated as having a balance of 0.
/// Every vote is marked as applied afterwards, so the result must be passed to
/// [`Store::apply_score_changes`] before the tree changes.
pub fn compute_deltas(
    store: &Store,
    votes: &mut Votes,
    old_balances: &[Gwei],
    new_balances: &[Gwei],
) -> Result<Vec<Difference>, Error> {
    let mut deltas = vec![0; store.len()];

    for (validator_index, vote) in votes.iter_mut().enumerate() {
        // Validators that never voted have nothing to move.
        if vote.current_root == ZERO_HASH && vote.next_root == ZERO_HASH {
            continue;
        }

        let old_balance = old_balances.get(validator_index).copied().unwrap_or_default();
        let new_balance = new_balances.get(validator_index).copied().unwrap_or_default();

        if vote.current_root == vote.next_root && old_balance == new_balance {
            continue;
        }

        if let Some(index) = store.index_of(vote.current_root) {
            deltas[index] = deltas[index]
                .checked_sub_unsigned_delta(old_balance)
                .ok_or(Error::DeltaOverflow { index })?;
        }

        if let Some(index) = store.index_of(vote.next_root) {
            deltas[index] = deltas[index]
                .checked_add_unsigned_delta(new_balance)
                .ok_or(Error::DeltaOverflow { index })?;
        }

        vote.current_root = vote.next_root;
    }

    Ok(deltas)
}

#[cfg(test)]
mod tests {
    use fork_choice_store::{Anchor, StoreConfig};
    use test_case::test_case;

    use super::*;

    const VALIDATOR_COUNT: usize = 16;
    const BALANCE: Gwei = 42;

    // Never the zero hash.
    fn root(n: usize) -> H256 {
        H256::from_low_u64_be(n as u64 + 1)
    }

    // One block per validator, all children of the anchor.
    fn new_store() -> Store {
        let mut store = Store::new(
            StoreConfig::default(),
            Anchor {
                slot: 0,
                root: root(VALIDATOR_COUNT),
                justified_epoch: 0,
                finalized_epoch: 0,
            },
        );

        for index in 0..VALIDATOR_COUNT {
            store
                .insert(1, root(index), root(VALIDATOR_COUNT), 0, 0)
                .expect("anchor is present");
        }

        store
    }

    fn votes_for(roots: impl IntoIterator<Item = H256>) -> Votes {
        let mut votes = Votes::default();

        for (validator_index, block_root) in (0..).zip(roots) {
            votes
                .record(validator_index, block_root, 0)
                .expect("validator index is within the registry limit");
        }

        votes
    }

    fn anchor_index(store: &Store) -> usize {
        store
            .index_of(root(VALIDATOR_COUNT))
            .expect("anchor is present")
    }

    #[test]
    fn votes_for_zero_hash_are_skipped() -> Result<(), Error> {
        let store = new_store();
        let mut votes = votes_for([ZERO_HASH; VALIDATOR_COUNT]);
        let balances = [BALANCE; VALIDATOR_COUNT];

        let deltas = compute_deltas(&store, &mut votes, &balances, &balances)?;

        assert!(deltas.iter().all(|delta| *delta == 0));
        assert_eq!(votes, votes_for([ZERO_HASH; VALIDATOR_COUNT]));

        Ok(())
    }

    #[test]
    fn votes_for_same_block_are_summed() -> Result<(), Error> {
        let store = new_store();
        let mut votes = votes_for([root(0); VALIDATOR_COUNT]);
        let balances = [BALANCE; VALIDATOR_COUNT];

        let deltas = compute_deltas(&store, &mut votes, &balances, &balances)?;
        let target = store.index_of(root(0)).expect("block is present");

        for (index, delta) in deltas.into_iter().enumerate() {
            if index == target {
                assert_eq!(delta, (BALANCE as i64) * (VALIDATOR_COUNT as i64));
            } else {
                assert_eq!(delta, 0);
            }
        }

        Ok(())
    }

    #[test]
    fn applied_votes_produce_no_further_deltas() -> Result<(), Error> {
        let store = new_store();
        let mut votes = votes_for((0..VALIDATOR_COUNT).map(root));
        let balances = [BALANCE; VALIDATOR_COUNT];

        let first = compute_deltas(&store, &mut votes, &balances, &balances)?;
        let second = compute_deltas(&store, &mut votes, &balances, &balances)?;

        assert_eq!(first.iter().filter(|delta| **delta == BALANCE as i64).count(), VALIDATOR_COUNT);
        assert!(second.iter().all(|delta| *delta == 0));

        Ok(())
    }

    #[test]
    fn moved_votes_shift_balance_between_blocks() -> Result<(), Error> {
        let store = new_store();
        let mut votes = votes_for([root(0); VALIDATOR_COUNT]);
        let balances = [BALANCE; VALIDATOR_COUNT];

        compute_deltas(&store, &mut votes, &balances, &balances)?;

        for validator_index in 0..VALIDATOR_COUNT as u64 {
            votes.record(validator_index, root(1), 1)?;
        }

        let deltas = compute_deltas(&store, &mut votes, &balances, &balances)?;
        let total = (BALANCE as i64) * (VALIDATOR_COUNT as i64);

        assert_eq!(deltas[store.index_of(root(0)).expect("block is present")], -total);
        assert_eq!(deltas[store.index_of(root(1)).expect("block is present")], total);
        assert_eq!(deltas.iter().sum::<i64>(), 0);

        Ok(())
    }

    #[test]
    fn balance_changes_reweigh_unchanged_votes() -> Result<(), Error> {
        let store = new_store();
        let mut votes = votes_for([root(0); VALIDATOR_COUNT]);
        let old_balances = [BALANCE; VALIDATOR_COUNT];
        let new_balances = [BALANCE * 2; VALIDATOR_COUNT];

        compute_deltas(&store, &mut votes, &[], &old_balances)?;

        let deltas = compute_deltas(&store, &mut votes, &old_balances, &new_balances)?;
        let target = store.index_of(root(0)).expect("block is present");

        assert_eq!(deltas[target], (BALANCE as i64) * (VALIDATOR_COUNT as i64));

        Ok(())
    }

    #[test]
    fn validators_missing_from_new_balances_lose_their_weight() -> Result<(), Error> {
        let store = new_store();
        let mut votes = votes_for([root(0), root(1)]);
        let old_balances = [BALANCE, BALANCE];

        compute_deltas(&store, &mut votes, &[], &old_balances)?;

        let deltas = compute_deltas(&store, &mut votes, &old_balances, &[BALANCE])?;

        assert_eq!(deltas[store.index_of(root(0)).expect("block is present")], 0);
        assert_eq!(deltas[store.index_of(root(1)).expect("block is present")], -(BALANCE as i64));

        Ok(())
    }

    #[test]
    fn votes_for_unknown_blocks_are_ignored() -> Result<(), Error> {
        let store = new_store();
        let unknown = H256::repeat_byte(0xaa);
        let mut votes = votes_for([unknown, root(2)]);
        let balances = [BALANCE, BALANCE];

        let deltas = compute_deltas(&store, &mut votes, &balances, &balances)?;

        assert_eq!(deltas.iter().sum::<i64>(), BALANCE as i64);
        assert_eq!(deltas[anchor_index(&store)], 0);
        assert_eq!(votes.0.first().map(|vote| vote.current_root), Some(unknown));

        Ok(())
    }

    #[test]
    fn record_keeps_only_newer_target_epochs() -> Result<(), Error> {
        let mut votes = Votes::default();

        votes.record(3, root(0), 2)?;
        votes.record(3, root(1), 1)?;
        votes.record(3, root(2), 2)?;

        assert_eq!(votes.0.len(), 4);
        assert_eq!(
            votes.0[3],
            Vote {
                current_root: ZERO_HASH,
                next_root: root(0),
                next_epoch: 2,
            },
        );

        votes.record(3, root(3), 5)?;

        assert_eq!(votes.0[3].next_root, root(3));
        assert_eq!(votes.0[..3], [Vote::default(); 3]);

        Ok(())
    }

    #[test_case(VALIDATOR_REGISTRY_LIMIT)]
    #[test_case(u64::MAX)]
    fn record_rejects_indices_beyond_registry_limit(validator_index: ValidatorIndex) {
        let mut votes = Votes::default();

        assert_eq!(
            votes.record(validator_index, root(0), 0),
            Err(Error::ValidatorIndexOverflow { validator_index }),
        );
        assert_eq!(votes, Votes::default());
    }
}
