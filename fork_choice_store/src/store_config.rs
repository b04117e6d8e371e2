use derivative::Derivative;

pub const DEFAULT_PRUNE_THRESHOLD: usize = 256;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Derivative)]
#[derivative(Default)]
pub struct StoreConfig {
    /// Finalized blocks are only discarded once at least this many of them precede the newest
    /// finalized block. Rebasing every index is not worth it for a handful of nodes.
    #[derivative(Default(value = "DEFAULT_PRUNE_THRESHOLD"))]
    pub prune_threshold: usize,
}

impl StoreConfig {
    #[must_use]
    pub const fn without_pruning_delay() -> Self {
        Self { prune_threshold: 0 }
    }
}
