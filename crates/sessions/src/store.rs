use std::{sync::Arc, time::Duration};

use {
    dashmap::DashMap,
    relay_config::SessionsConfig,
    tokio::time::{Instant, MissedTickBehavior},
    tokio_util::sync::CancellationToken,
    tracing::{debug, info},
};

/// What free text from a user is used for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionMode {
    /// Text goes to the generative backend as-is.
    #[default]
    Chat,
    /// Text is translated into `language`.
    Translate { language: String },
}

#[derive(Debug, Clone)]
struct Session {
    mode: SessionMode,
    last_seen: Instant,
}

/// Concurrent session map keyed by user id.
#[derive(Debug)]
pub struct SessionStore {
    sessions: DashMap<String, Session>,
    idle_ttl: Duration,
}

impl SessionStore {
    pub fn new(idle_ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            idle_ttl,
        }
    }

    pub fn from_config(config: &SessionsConfig) -> Self {
        Self::new(Duration::from_secs(config.idle_ttl_secs))
    }

    /// Record activity from `user_id` and return its current mode.
    ///
    /// Creates the session on first contact; a session that went idle past
    /// the TTL is reset to chat mode.
    pub fn touch(&self, user_id: &str) -> SessionMode {
        let now = Instant::now();
        let mut entry = self
            .sessions
            .entry(user_id.to_string())
            .or_insert_with(|| {
                debug!(user_id, "session created");
                Session {
                    mode: SessionMode::Chat,
                    last_seen: now,
                }
            });
        if now.duration_since(entry.last_seen) > self.idle_ttl {
            debug!(user_id, "session expired, resetting mode");
            entry.mode = SessionMode::Chat;
        }
        entry.last_seen = now;
        entry.mode.clone()
    }

    /// Current mode without counting as activity.
    pub fn mode(&self, user_id: &str) -> SessionMode {
        self.sessions
            .get(user_id)
            .filter(|s| s.last_seen.elapsed() <= self.idle_ttl)
            .map(|s| s.mode.clone())
            .unwrap_or_default()
    }

    pub fn set_mode(&self, user_id: &str, mode: SessionMode) {
        info!(user_id, ?mode, "session mode changed");
        self.sessions.insert(user_id.to_string(), Session {
            mode,
            last_seen: Instant::now(),
        });
    }

    /// Return `user_id` to chat mode; returns the mode it left.
    pub fn reset(&self, user_id: &str) -> SessionMode {
        let previous = self.mode(user_id);
        self.set_mode(user_id, SessionMode::Chat);
        previous
    }

    /// Drop sessions idle for longer than the TTL. Returns how many went.
    pub fn expire_idle(&self) -> usize {
        let before = self.sessions.len();
        let ttl = self.idle_ttl;
        self.sessions.retain(|_, s| s.last_seen.elapsed() <= ttl);
        let expired = before.saturating_sub(self.sessions.len());
        if expired > 0 {
            debug!(expired, remaining = self.sessions.len(), "expired idle sessions");
        }
        expired
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Run [`expire_idle`](Self::expire_idle) every `every` until the
    /// returned token is cancelled.
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> CancellationToken {
        let cancel = CancellationToken::new();
        let stop = cancel.clone();
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every.max(Duration::from_millis(1)));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    () = stop.cancelled() => {
                        debug!("session sweeper stopped");
                        break;
                    },
                    _ = ticker.tick() => {
                        store.expire_idle();
                    },
                }
            }
        });
        cancel
    }
}
