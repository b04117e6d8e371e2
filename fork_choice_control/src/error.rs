use fork_choice_store::NodeIndex;
use thiserror::Error;
use types::phase0::primitives::ValidatorIndex;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Store(#[from] fork_choice_store::Error),
    #[error("validator index is out of range: {validator_index}")]
    ValidatorIndexOverflow { validator_index: ValidatorIndex },
    #[error("delta for block at index {index} overflowed while weighing votes")]
    DeltaOverflow { index: NodeIndex },
}

impl Error {
    #[must_use]
    pub const fn is_head_not_viable(&self) -> bool {
        match self {
            Self::Store(error) => error.is_head_not_viable(),
            _ => false,
        }
    }
}
