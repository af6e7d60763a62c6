//! Optimistic mutations: apply locally, confirm or revert when the
//! owning request settles.
//!
//! Like, follow and comment submission all go through [`Ledger`], so the
//! apply / request / revert-on-failure sequence exists in one place.

use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, warn};

/// A reversible local change to `S`.
pub trait Mutation<S> {
    /// Value the server returns on success.
    type Output;

    fn apply(&self, state: &mut S);

    /// Undo `apply`. Only called while the mutation is still pending.
    fn revert(&self, state: &mut S);

    /// Reconcile with the server's answer. Default keeps the optimistic
    /// value as-is.
    fn confirm(&self, _state: &mut S, _output: Self::Output) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MutationId(u64);

impl fmt::Display for MutationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m{}", self.0)
    }
}

/// How a settled mutation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    Confirmed,
    RolledBack,
    /// Unknown id: already settled, or the ledger was reset.
    Unknown,
}

/// Pending optimistic mutations, keyed by id.
#[derive(Debug)]
pub struct Ledger<M> {
    next_id: u64,
    pending: BTreeMap<MutationId, M>,
}

impl<M> Ledger<M> {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            pending: BTreeMap::new(),
        }
    }

    /// Apply `mutation` to `state` and track it until settled.
    pub fn begin<S>(&mut self, state: &mut S, mutation: M) -> MutationId
    where
        M: Mutation<S>,
    {
        let id = MutationId(self.next_id);
        self.next_id += 1;
        mutation.apply(state);
        self.pending.insert(id, mutation);
        id
    }

    /// Settle a pending mutation with its request outcome.
    pub fn settle<S, E>(
        &mut self,
        state: &mut S,
        id: MutationId,
        outcome: Result<<M as Mutation<S>>::Output, E>,
    ) -> Settlement
    where
        M: Mutation<S>,
        E: fmt::Display,
    {
        let Some(mutation) = self.pending.remove(&id) else {
            debug!(%id, "optimistic: settle for unknown mutation dropped");
            return Settlement::Unknown;
        };
        match outcome {
            Ok(output) => {
                mutation.confirm(state, output);
                Settlement::Confirmed
            }
            Err(e) => {
                warn!(%id, error = %e, "optimistic: request failed, reverting");
                mutation.revert(state);
                Settlement::RolledBack
            }
        }
    }

    pub fn any(&self, pred: impl Fn(&M) -> bool) -> bool {
        self.pending.values().any(pred)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Forget every pending mutation without reverting. Later settles for
    /// the dropped ids report `Unknown`.
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

impl<M> Default for Ledger<M> {
    fn default() -> Self {
        Self::new()
    }
}
