use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::task::AbortHandle;

use crate::db::Repository;
use crate::feed::FeedClient;

use super::round::{RoundCoordinator, RoundOutcome};

type RoundFuture = Shared<BoxFuture<'static, RoundOutcome>>;

struct ActiveRound {
    generation: u64,
    outcome: RoundFuture,
    abort: AbortHandle,
}

#[derive(Default)]
struct Slot {
    generation: u64,
    active: Option<ActiveRound>,
}

impl Slot {
    /// The registered round, unless its task already ended without clearing
    /// the slot.
    fn in_flight(&self) -> Option<&ActiveRound> {
        self.active
            .as_ref()
            .filter(|active| !active.abort.is_finished())
    }
}

fn lock(slot: &Mutex<Slot>) -> MutexGuard<'_, Slot> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Lives inside the round's task and empties the slot however the task ends:
/// completion, panic, or abort.
struct SlotGuard {
    slot: Arc<Mutex<Slot>>,
    generation: u64,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        // A runtime that is shutting down drops the task inside `spawn`, while
        // `start_round` still holds the lock. Blocking here would deadlock;
        // the finished round is ignored by the front door instead.
        let mut slot = match self.slot.try_lock() {
            Ok(slot) => slot,
            Err(TryLockError::Poisoned(e)) => e.into_inner(),
            Err(TryLockError::WouldBlock) => return,
        };
        if slot
            .active
            .as_ref()
            .is_some_and(|active| active.generation == self.generation)
        {
            slot.active = None;
        }
    }
}

/// Entry point for syncing the inbox.
///
/// At most one round runs at a time. Callers arriving while a round is in
/// flight wait for that round and get its outcome; once it ends the next call
/// starts a fresh one. The round runs on its own task, so a caller that stops
/// waiting does not cancel it for the others.
pub struct InboxSync {
    coordinator: Arc<RoundCoordinator>,
    slot: Arc<Mutex<Slot>>,
}

impl InboxSync {
    pub fn new(client: Arc<dyn FeedClient>, repository: Repository, max_pages: usize) -> Self {
        Self {
            coordinator: Arc::new(RoundCoordinator::new(client, repository, max_pages)),
            slot: Arc::new(Mutex::new(Slot::default())),
        }
    }

    /// Runs (or joins) a round. Returns true when new posts are now stored.
    pub async fn sync(&self) -> bool {
        self.sync_outcome().await.new_posts()
    }

    /// Like [`InboxSync::sync`], with per-phase detail.
    pub async fn sync_outcome(&self) -> RoundOutcome {
        let outcome = {
            let mut slot = lock(&self.slot);
            match slot.in_flight().map(|active| active.outcome.clone()) {
                Some(outcome) => {
                    tracing::debug!("Sync requested but already running, waiting for it to complete");
                    outcome
                }
                None => self.start_round(&mut slot),
            }
        };
        outcome.await
    }

    pub fn is_syncing(&self) -> bool {
        lock(&self.slot).in_flight().is_some()
    }

    /// Aborts the in-flight round, if any. Its waiters resolve to a failed
    /// outcome and the next call starts a new round straight away.
    pub fn cancel(&self) {
        let active = lock(&self.slot).active.take();
        if let Some(active) = active {
            tracing::debug!("Cancelling sync round {}", active.generation);
            active.abort.abort();
        }
    }

    // The slot lock is held across the spawn so the round's guard cannot run
    // before the round is registered. See `SlotGuard::drop` for the one case
    // where the guard runs inside `spawn`.
    fn start_round(&self, slot: &mut Slot) -> RoundFuture {
        slot.generation += 1;
        let generation = slot.generation;

        let guard = SlotGuard {
            slot: Arc::clone(&self.slot),
            generation,
        };
        let coordinator = Arc::clone(&self.coordinator);
        let handle = tokio::spawn(async move {
            let _guard = guard;
            coordinator.run().await
        });
        let abort = handle.abort_handle();

        let outcome = handle
            .map(|joined| match joined {
                Ok(outcome) => outcome,
                Err(e) if e.is_cancelled() => RoundOutcome::aborted("sync round cancelled"),
                Err(e) => {
                    tracing::error!("Sync round panicked: {}", e);
                    RoundOutcome::aborted(format!("sync round panicked: {e}"))
                }
            })
            .boxed()
            .shared();

        slot.active = Some(ActiveRound {
            generation,
            outcome: outcome.clone(),
            abort,
        });
        outcome
    }
}

impl Drop for InboxSync {
    fn drop(&mut self) {
        self.cancel();
    }
}
