//! In-memory session store with idle eviction

use crate::state_machine::Session;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

/// Shortest interval between eviction sweeps
const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(30);

/// One session per phone
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Arc<Mutex<Session>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Session for `phone`, creating it at Menu if unseen. The flag is true when created.
    pub async fn get_or_create(&self, phone: &str) -> (Arc<Mutex<Session>>, bool) {
        if let Some(session) = self.sessions.read().await.get(phone) {
            return (Arc::clone(session), false);
        }

        let mut sessions = self.sessions.write().await;
        // Another task may have created it between the two locks
        if let Some(session) = sessions.get(phone) {
            return (Arc::clone(session), false);
        }
        let session = Arc::new(Mutex::new(Session::new(phone)));
        sessions.insert(phone.to_string(), Arc::clone(&session));
        (session, true)
    }

    /// Drop sessions idle for at least `max_idle`.
    ///
    /// A session whose handle is held outside the store belongs to a turn that
    /// has started (or is about to lock it) and is kept.
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| {
            if Arc::strong_count(session) > 1 {
                return true;
            }
            match session.try_lock() {
                Ok(session) => !session.is_idle(max_idle),
                Err(_) => true,
            }
        });
        before - sessions.len()
    }
}

/// Periodically evict idle sessions
pub fn spawn_eviction_task(store: Arc<SessionStore>, max_idle: Duration) -> JoinHandle<()> {
    let period = (max_idle / 2).max(MIN_SWEEP_INTERVAL);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.tick().await;
        loop {
            interval.tick().await;
            let evicted = store.evict_idle(max_idle).await;
            if evicted > 0 {
                let remaining = store.len().await;
                tracing::info!(evicted, remaining, "Evicted idle sessions");
            }
        }
    })
}
