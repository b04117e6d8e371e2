use crate::phase0::primitives::{ValidatorIndex, H256};

pub const VALIDATOR_REGISTRY_LIMIT: ValidatorIndex = 1 << 40;

// Votes and nodes with this root refer to the block that precedes genesis.
// It aliases the genesis block and never carries weight of its own.
pub const ZERO_HASH: H256 = H256::zero();
