//! Rendezvous barrier between the last-name and first-name validations of a round.
//!
//! The last-name call submits its value without blocking. The first-name call waits for
//! that submission and consumes it, receiving a [`RoundLease`] that discards the round
//! once released or dropped. Rounds are fully independent; calls of the same round only
//! serialize on the round mutex, which is never held across an await point.
use std::{future::Future, pin::Pin, sync::Arc, task::Poll, time::Duration};

use tokio::sync::watch;
use tower::Service;
#[cfg(feature = "uniqname_tracing")]
use tracing::{debug, info};

use crate::validation::{
    api::{BarrierRequest, BarrierResponse},
    error::ValidationError,
    infrastructure::subject::SubjectId,
    services::registry::{CoordinationRegistry, CoordinationState, RoundLease},
};

/// Subscription of a waiting first-name call.
///
/// Dropping it, on timeout or when the waiting task is cancelled, removes the round if
/// no last name was submitted and nobody else waits on it.
struct PendingWait {
    registry: CoordinationRegistry,
    state: Arc<CoordinationState>,
    receiver: watch::Receiver<Option<String>>,
}

impl PendingWait {
    fn new(registry: CoordinationRegistry, state: Arc<CoordinationState>) -> Self {
        let receiver = state.subscribe();
        Self { registry, state, receiver }
    }
}

impl Drop for PendingWait {
    fn drop(&mut self) {
        if self.registry.remove_abandoned(&self.state) {
            #[cfg(feature = "uniqname_tracing")]
            debug!(
                "[barrier] dropped abandoned round {} of {}",
                self.state.round(),
                self.state.subject()
            );
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BarrierService {
    /// Bound on the wait for a last name in milliseconds, disabled if set to 0
    timeout: u64,
    registry: CoordinationRegistry,
}

impl BarrierService {
    /// Create a new `BarrierService` with the specified await timeout.
    ///
    /// Timeout is disabled if set to 0.
    pub fn new(await_timeout_ms: u64) -> Self {
        Self { timeout: await_timeout_ms, registry: CoordinationRegistry::new() }
    }

    /// Registry backing the barrier.
    pub fn registry(&self) -> &CoordinationRegistry {
        &self.registry
    }

    fn submit_last_name(
        &self,
        subject: &SubjectId,
        round: u64,
        value: String,
    ) -> Result<(), ValidationError> {
        let state = self.registry.get_or_create(subject, round);
        let mut flags = state.lock()?;
        state.submit(&mut flags, value);
        Ok(())
    }

    async fn await_last_name(
        &self,
        subject: SubjectId,
        round: u64,
    ) -> Result<(String, RoundLease), ValidationError> {
        let state = self.registry.get_or_create(&subject, round);
        let mut pending = PendingWait::new(self.registry.clone(), state.clone());
        let wait = pending.receiver.wait_for(Option::is_some);
        let waited = if self.timeout > 0 {
            match tokio::time::timeout(Duration::from_millis(self.timeout), wait).await {
                Ok(waited) => waited.map(|_| ()),
                Err(_) => return Err(ValidationError::WaitCancelled(subject)),
            }
        } else {
            wait.await.map(|_| ())
        };
        waited.map_err(|_| ValidationError::InternalError)?;
        drop(pending);

        let mut flags = state.lock()?;
        let value = state.consume(&mut flags).ok_or(ValidationError::InternalError)?;
        drop(flags);
        Ok((value, RoundLease::new(self.registry.clone(), state)))
    }
}

impl Service<BarrierRequest> for BarrierService {
    type Response = BarrierResponse;
    type Error = ValidationError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _: &mut std::task::Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: BarrierRequest) -> Self::Future {
        let this = self.clone();
        Box::pin(async move {
            match request {
                BarrierRequest::SubmitLastName { subject, round, value } => {
                    #[cfg(feature = "uniqname_tracing")]
                    info!("[barrier] SubmitLastName: subject: {}, round: {}", subject, round);
                    this.submit_last_name(&subject, round, value)?;
                    Ok(BarrierResponse::Submitted { round })
                }
                BarrierRequest::AwaitLastName { subject, round } => {
                    #[cfg(feature = "uniqname_tracing")]
                    info!("[barrier] AwaitLastName: subject: {}, round: {}", subject, round);
                    let (value, lease) = this.await_last_name(subject, round).await?;
                    Ok(BarrierResponse::LastName { value, lease })
                }
                BarrierRequest::Release { lease } => {
                    #[cfg(feature = "uniqname_tracing")]
                    info!("[barrier] Release: subject: {}, round: {}", lease.subject(), lease.round());
                    drop(lease);
                    Ok(BarrierResponse::Released)
                }
            }
        })
    }
}
