//! Thread-safe access to [`fork_choice_store::Store`].
//!
//! [`Controller`] puts the store behind a single [`parking_lot::RwLock`].
//! Inserting blocks, applying score changes and pruning take the write guard for their whole
//! duration. Head lookups take the read guard.
//!
//! The latest message of every validator is tracked in [`Votes`].
//! [`Controller::find_head`] turns changes in votes and balances into deltas with
//! [`compute_deltas`] while holding the write guard, so the deltas are always aligned with the
//! nodes they are applied to.

pub use crate::{
    controller::Controller,
    error::Error,
    votes::{compute_deltas, Vote, Votes},
};

mod controller;
mod error;
mod votes;
