//! In-memory session store with idle expiry and a capacity bound.

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Session id length in random bytes (hex-encoded to twice as many chars).
pub const SESSION_ID_BYTES: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub last_used: DateTime<Utc>,
}

impl Session {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            id: hex::encode(rand::random::<[u8; SESSION_ID_BYTES]>()),
            created_at: now,
            last_used: now,
        }
    }

    pub fn is_idle(&self, now: DateTime<Utc>, idle: TimeDelta) -> bool {
        now.checked_sub_signed(idle)
            .is_some_and(|cutoff| self.last_used < cutoff)
    }
}

/// Concurrency-safe session map.
///
/// Lookups take the entry's write guard so the touch on `last_used` is
/// serialized with deletes and sweeps. Creation is serialized separately so
/// the capacity bound holds under concurrent `initialize` calls.
pub struct SessionStore {
    sessions: DashMap<String, Session>,
    max_sessions: usize,
    create_lock: Mutex<()>,
}

impl SessionStore {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            max_sessions: max_sessions.max(1),
            create_lock: Mutex::new(()),
        }
    }

    pub fn create_session(&self) -> Session {
        self.create_session_at(Utc::now())
    }

    pub(crate) fn create_session_at(&self, now: DateTime<Utc>) -> Session {
        let _guard = self.create_lock.lock();

        while self.sessions.len() >= self.max_sessions {
            if !self.evict_least_recently_used() {
                break;
            }
        }

        let session = Session::new(now);
        debug!("Created session: {}", session.id);
        self.sessions.insert(session.id.clone(), session.clone());
        session
    }

    fn evict_least_recently_used(&self) -> bool {
        let oldest = self
            .sessions
            .iter()
            .min_by_key(|entry| (entry.last_used, entry.created_at))
            .map(|entry| entry.key().clone());

        match oldest {
            Some(id) => {
                warn!("Session capacity {} reached, evicting {}", self.max_sessions, id);
                self.sessions.remove(&id);
                true
            }
            None => false,
        }
    }

    /// Look up a session and mark it used. A miss leaves the store untouched.
    pub fn get_session(&self, id: &str) -> Option<Session> {
        self.get_session_at(id, Utc::now())
    }

    pub(crate) fn get_session_at(&self, id: &str, now: DateTime<Utc>) -> Option<Session> {
        let mut entry = self.sessions.get_mut(id)?;
        if now > entry.last_used {
            entry.last_used = now;
        }
        Some(entry.clone())
    }

    pub fn delete_session(&self, id: &str) -> bool {
        let removed = self.sessions.remove(id).is_some();
        if removed {
            debug!("Deleted session: {}", id);
        }
        removed
    }

    /// Remove every session idle for longer than `idle`. Returns how many were removed.
    pub fn sweep_expired(&self, now: DateTime<Utc>, idle: TimeDelta) -> usize {
        let mut removed = 0;
        self.sessions.retain(|_, session| {
            let keep = !session.is_idle(now, idle);
            if !keep {
                removed += 1;
            }
            keep
        });
        if removed > 0 {
            info!("Swept {} expired sessions", removed);
        }
        removed
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sessions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.max_sessions
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(10_000)
    }
}

/// Run `sweep_expired` every `interval` until `cancel` fires.
pub fn spawn_sweeper(
    store: Arc<SessionStore>,
    interval: Duration,
    idle: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    let idle = TimeDelta::from_std(idle).unwrap_or(TimeDelta::MAX);
    // tokio rejects a zero period
    let interval = interval.max(Duration::from_millis(1));

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // First tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Session sweeper stopped");
                    break;
                }
                _ = ticker.tick() => {
                    store.sweep_expired(Utc::now(), idle);
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hour() -> TimeDelta {
        TimeDelta::hours(1)
    }

    #[test]
    fn test_session_id_shape() {
        let store = SessionStore::default();
        let a = store.create_session();
        let b = store.create_session();
        assert_eq!(a.id.len(), SESSION_ID_BYTES * 2);
        assert!(a.id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(a.id, b.id);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_get_touches_last_used() {
        let store = SessionStore::default();
        let t0 = Utc::now();
        let session = store.create_session_at(t0);

        let later = t0 + TimeDelta::minutes(5);
        let found = store.get_session_at(&session.id, later).unwrap();
        assert_eq!(found.last_used, later);
        assert_eq!(found.created_at, t0);
    }

    #[test]
    fn test_miss_does_not_mutate() {
        let store = SessionStore::default();
        store.create_session();
        assert!(store.get_session("unknown").is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_delete_is_idempotent() {
        let store = SessionStore::default();
        let session = store.create_session();
        assert!(store.delete_session(&session.id));
        assert!(!store.delete_session(&session.id));
        assert!(store.is_empty());
    }

    #[test]
    fn test_sweep_threshold() {
        let store = SessionStore::default();
        let t = Utc::now();
        let session = store.create_session_at(t);

        let early = t + hour() - TimeDelta::seconds(1);
        assert_eq!(store.sweep_expired(early, hour()), 0);
        assert!(store.contains(&session.id));

        let late = t + hour() + TimeDelta::seconds(1);
        assert_eq!(store.sweep_expired(late, hour()), 1);
        assert!(!store.contains(&session.id));
    }

    #[test]
    fn test_touch_extends_lifetime() {
        let store = SessionStore::default();
        let t = Utc::now();
        let session = store.create_session_at(t);
        store.get_session_at(&session.id, t + TimeDelta::minutes(30));

        assert_eq!(store.sweep_expired(t + hour() + TimeDelta::seconds(1), hour()), 0);
        assert!(store.contains(&session.id));
    }

    #[test]
    fn test_capacity_evicts_least_recently_used() {
        let store = SessionStore::new(3);
        let t = Utc::now();
        let a = store.create_session_at(t);
        let b = store.create_session_at(t + TimeDelta::seconds(1));
        let c = store.create_session_at(t + TimeDelta::seconds(2));
        store.get_session_at(&a.id, t + TimeDelta::seconds(3));

        let d = store.create_session_at(t + TimeDelta::seconds(4));
        assert_eq!(store.len(), 3);
        assert!(store.contains(&a.id));
        assert!(!store.contains(&b.id));
        assert!(store.contains(&c.id));
        assert!(store.contains(&d.id));
    }

    #[test]
    fn test_concurrent_access() {
        let store = Arc::new(SessionStore::new(50));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for _ in 0..20 {
                        let s = store.create_session();
                        store.get_session(&s.id);
                        store.sweep_expired(Utc::now(), hour());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.len(), 50);
    }

    #[tokio::test]
    async fn test_sweeper_stops_on_cancel() {
        let store = Arc::new(SessionStore::default());
        store.create_session_at(Utc::now() - TimeDelta::hours(2));

        let cancel = CancellationToken::new();
        let handle = spawn_sweeper(
            Arc::clone(&store),
            Duration::from_millis(10),
            Duration::from_secs(3600),
            cancel.clone(),
        );

        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
        handle.await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_sweeper_tolerates_zero_interval() {
        let store = Arc::new(SessionStore::default());
        let cancel = CancellationToken::new();
        let handle = spawn_sweeper(
            Arc::clone(&store),
            Duration::ZERO,
            Duration::from_secs(3600),
            cancel.clone(),
        );

        tokio::time::sleep(Duration::from_millis(10)).await;
        cancel.cancel();
        assert!(handle.await.is_ok());
    }
}
