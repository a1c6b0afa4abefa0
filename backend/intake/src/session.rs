//! Per-user dialogue sessions.
//!
//! Each user gets a slot holding an async mutex around their session. Tokio
//! mutexes hand out the lock in FIFO order, so one user's events are applied
//! in arrival order while other users never wait on it. The slot also carries
//! a generation counter: a restart bumps it without taking the lock, and work
//! stamped with an older generation is discarded.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::sync::{watch, Mutex as AsyncMutex, MutexGuard as AsyncMutexGuard};

use flexscan_core::{IdentifierKind, RecordRef};

/// Where a user is in the field-collection sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogueState {
    Idle,
    AwaitingBooking,
    AwaitingPhoto,
    AwaitingBeams,
    AwaitingAddons,
    AwaitingSheets,
}

impl DialogueState {
    /// States that accept a numeric count.
    pub fn is_count_step(&self) -> bool {
        matches!(
            self,
            DialogueState::AwaitingBeams | DialogueState::AwaitingAddons | DialogueState::AwaitingSheets
        )
    }
}

/// Progress of one user's dialogue. Never persisted; only the record is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub state: DialogueState,
    /// Set once the booking is saved; required by every later state.
    pub record_ref: Option<RecordRef>,
    pub booking: Option<String>,
    /// Last album already run through extraction.
    pub pending_media_group_id: Option<String>,
    /// Identifiers already written for this record.
    pub captured: HashSet<IdentifierKind>,
    /// Identifier whose review note is currently written on the record.
    pub review_noted: Option<IdentifierKind>,
}

impl Session {
    pub fn awaiting_booking() -> Self {
        Self {
            state: DialogueState::AwaitingBooking,
            record_ref: None,
            booking: None,
            pending_media_group_id: None,
            captured: HashSet::new(),
            review_noted: None,
        }
    }
}

/// Lock-protected session of one user plus its generation counter.
pub struct SessionSlot {
    session: AsyncMutex<Option<Session>>,
    generation: watch::Sender<u64>,
}

impl SessionSlot {
    fn new() -> Self {
        Self { session: AsyncMutex::new(None), generation: watch::Sender::new(0) }
    }

    /// Wait for this user's turn. `None` inside means no dialogue is active.
    pub async fn lock(&self) -> AsyncMutexGuard<'_, Option<Session>> {
        self.session.lock().await
    }

    pub fn generation(&self) -> u64 {
        *self.generation.borrow()
    }

    /// Invalidate any in-flight work for this user. Returns the new generation.
    pub fn supersede(&self) -> u64 {
        self.generation.send_modify(|g| *g += 1);
        self.generation()
    }

    /// Resolves once the generation moves past `generation`.
    pub async fn superseded(&self, generation: u64) {
        let mut rx = self.generation.subscribe();
        if rx.wait_for(|current| *current != generation).await.is_err() {
            // The sender lives as long as the slot; nothing can close it.
            std::future::pending::<()>().await;
        }
    }
}

/// Process-wide map from user id to session slot.
#[derive(Default)]
pub struct SessionStore {
    slots: Mutex<HashMap<u64, Arc<SessionSlot>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<u64, Arc<SessionSlot>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The user's slot, created on first use.
    pub fn slot(&self, user: u64) -> Arc<SessionSlot> {
        Arc::clone(self.slots().entry(user).or_insert_with(|| Arc::new(SessionSlot::new())))
    }

    /// Bump the user's generation without waiting for their lock.
    pub fn supersede(&self, user: u64) -> u64 {
        self.slot(user).supersede()
    }

    /// Current state, or `Idle` when the user has no session.
    pub async fn state_of(&self, user: u64) -> DialogueState {
        let Some(slot) = self.slots().get(&user).cloned() else {
            return DialogueState::Idle;
        };
        let guard = slot.lock().await;
        guard.as_ref().map_or(DialogueState::Idle, |s| s.state)
    }

    /// Drop the user's slot when it holds no session and nobody else is using it.
    pub fn prune(&self, user: u64) {
        let mut slots = self.slots();
        let idle = slots.get(&user).is_some_and(|slot| {
            Arc::strong_count(slot) == 1
                && slot.session.try_lock().is_ok_and(|session| session.is_none())
        });
        if idle {
            slots.remove(&user);
        }
    }

    /// Number of users with a slot.
    pub fn len(&self) -> usize {
        self.slots().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn missing_user_is_idle() {
        let store = SessionStore::new();
        assert_eq!(store.state_of(1).await, DialogueState::Idle);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn prune_keeps_active_sessions() {
        let store = SessionStore::new();
        *store.slot(1).lock().await = Some(Session::awaiting_booking());
        store.prune(1);
        assert_eq!(store.state_of(1).await, DialogueState::AwaitingBooking);

        *store.slot(1).lock().await = None;
        store.prune(1);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn prune_skips_slots_in_use() {
        let store = SessionStore::new();
        let held = store.slot(1);
        store.prune(1);
        assert_eq!(store.len(), 1);
        drop(held);
        store.prune(1);
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn superseded_resolves_after_bump() {
        let store = SessionStore::new();
        let slot = store.slot(1);
        let stamped = slot.generation();

        let waiter = tokio::spawn({
            let slot = Arc::clone(&slot);
            async move { slot.superseded(stamped).await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());

        assert_eq!(store.supersede(1), stamped + 1);
        tokio::time::timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn users_do_not_block_each_other() {
        let store = SessionStore::new();
        let first = store.slot(1);
        let guard = first.lock().await;
        // A different user's lock is immediately available.
        let other = store.slot(2);
        assert!(other.session.try_lock().is_ok());
        drop(guard);
    }
}
