//! Per-round coordination state and the registry that owns it.
//!
//! A round is the (lastName, firstName) pair of validation calls made for one subject by
//! one profile update. Its token comes from the update's [`RequestScope`], so a state is
//! keyed on (subject, round) and the calls of an unrelated update can never meet it. The
//! registry hands states out through an atomic get-or-create and takes them back through
//! identity-checked removals.
//!
//! Lock order is registry shard first, round mutex second. Callers holding a round mutex
//! must not call back into the registry.
//!
//! [`RequestScope`]: crate::validation::api::RequestScope

use std::sync::{Arc, Mutex, MutexGuard};

use dashmap::{DashMap, Entry};
use tokio::sync::watch;
#[cfg(feature = "uniqname_tracing")]
use tracing::debug;

use crate::validation::{error::ValidationError, infrastructure::subject::SubjectId};

/// Progress flags of one coordination round.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub struct RoundFlags {
    pub last_name_submitted: bool,
    pub first_name_submitted: bool,
}

/// Transient synchronization state of one subject for one round.
///
/// The submitted last name lives in a watch cell: publishing into it wakes every task
/// waiting on the round. Flags are only mutated while holding the round mutex.
#[derive(Debug)]
pub struct CoordinationState {
    subject: SubjectId,
    round: u64,
    flags: Mutex<RoundFlags>,
    last_name: watch::Sender<Option<String>>,
}

impl CoordinationState {
    fn new(subject: SubjectId, round: u64) -> Self {
        let (last_name, _) = watch::channel(None);
        Self { subject, round, flags: Mutex::new(RoundFlags::default()), last_name }
    }

    pub fn subject(&self) -> &SubjectId {
        &self.subject
    }

    pub fn round(&self) -> u64 {
        self.round
    }

    fn key(&self) -> (SubjectId, u64) {
        (self.subject.clone(), self.round)
    }

    /// Acquires the round mutex.
    pub fn lock(&self) -> Result<MutexGuard<'_, RoundFlags>, ValidationError> {
        self.flags
            .lock()
            .map_err(|_| ValidationError::CoordinationStatePoisoned(self.subject.clone()))
    }

    /// Subscribes to the submitted last name of this round.
    pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.last_name.subscribe()
    }

    /// Publishes the last name and marks it submitted. Last write wins.
    pub fn submit(&self, flags: &mut RoundFlags, value: String) {
        flags.last_name_submitted = true;
        self.last_name.send_replace(Some(value));
    }

    /// Reads the submitted last name and marks the first-name half done.
    pub fn consume(&self, flags: &mut RoundFlags) -> Option<String> {
        flags.first_name_submitted = true;
        self.last_name.borrow().clone()
    }

    /// Whether nothing was submitted and no task other than the caller waits on the round.
    fn is_abandoned(&self) -> bool {
        let submitted = self.flags.lock().map(|flags| flags.last_name_submitted).unwrap_or(true);
        !submitted && self.last_name.receiver_count() <= 1
    }
}

/// Registry of live coordination states, keyed by subject and round.
#[derive(Debug, Clone, Default)]
pub struct CoordinationRegistry {
    states: Arc<DashMap<(SubjectId, u64), Arc<CoordinationState>>>,
}

impl CoordinationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the state of the subject's round, creating it on first access.
    pub fn get_or_create(&self, subject: &SubjectId, round: u64) -> Arc<CoordinationState> {
        match self.states.entry((subject.clone(), round)) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => {
                let state = Arc::new(CoordinationState::new(subject.clone(), round));
                entry.insert(state.clone());
                state
            }
        }
    }

    /// Removes the state of the subject's round.
    ///
    /// Returns true if a state was removed.
    pub fn remove(&self, subject: &SubjectId, round: u64) -> bool {
        self.states.remove(&(subject.clone(), round)).is_some()
    }

    /// Removes `state` if it is still the live state of its round.
    fn remove_state(&self, state: &Arc<CoordinationState>) -> bool {
        self.states.remove_if(&state.key(), |_, live| Arc::ptr_eq(live, state)).is_some()
    }

    /// Removes `state` if it is still live and was abandoned by its waiters before any
    /// last name arrived.
    pub(crate) fn remove_abandoned(&self, state: &Arc<CoordinationState>) -> bool {
        self.states
            .remove_if(&state.key(), |_, live| Arc::ptr_eq(live, state) && live.is_abandoned())
            .is_some()
    }

    pub fn contains(&self, subject: &SubjectId, round: u64) -> bool {
        self.states.contains_key(&(subject.clone(), round))
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

/// Claim on a round whose last name was consumed.
///
/// The round leaves the registry when the lease is dropped, either handed back through a
/// release or dropped with a cancelled validation.
#[derive(Debug)]
pub struct RoundLease {
    registry: CoordinationRegistry,
    state: Arc<CoordinationState>,
}

impl RoundLease {
    pub(crate) fn new(registry: CoordinationRegistry, state: Arc<CoordinationState>) -> Self {
        Self { registry, state }
    }

    pub fn subject(&self) -> &SubjectId {
        self.state.subject()
    }

    pub fn round(&self) -> u64 {
        self.state.round()
    }
}

impl PartialEq for RoundLease {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}

impl Eq for RoundLease {}

impl Drop for RoundLease {
    fn drop(&mut self) {
        if !self.registry.remove_state(&self.state) {
            #[cfg(feature = "uniqname_tracing")]
            debug!("[registry] round {} of {} already gone", self.round(), self.subject());
        }
    }
}
