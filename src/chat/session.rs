//! Per-session off-topic counter.
//!
//! The reminder is soft and periodic: it is requested for the 1st, 3rd,
//! 5th, ... off-topic turn of a session and left out otherwise.
//!
//! Session keys come from clients, so the table is bounded. When full,
//! sessions idle longer than the TTL are dropped first, then the least
//! recently seen one.

use std::time::{Duration, Instant};

use dashmap::DashMap;

pub const DEFAULT_MAX_SESSIONS: usize = 10_000;
pub const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, Copy)]
struct SessionEntry {
    count: u32,
    last_seen: Instant,
}

#[derive(Debug)]
pub struct OffTopicTracker {
    sessions: DashMap<String, SessionEntry>,
    max_sessions: usize,
    idle_ttl: Duration,
}

impl Default for OffTopicTracker {
    fn default() -> Self {
        Self::with_limits(DEFAULT_MAX_SESSIONS, DEFAULT_IDLE_TTL)
    }
}

impl OffTopicTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(max_sessions: usize, idle_ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            max_sessions: max_sessions.max(1),
            idle_ttl,
        }
    }

    /// Off-topic turns recorded so far for `session`.
    pub fn count(&self, session: &str) -> u32 {
        self.sessions.get(session).map(|e| e.count).unwrap_or(0)
    }

    /// Number of sessions currently tracked.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Whether the next off-topic turn of `session` should carry a reminder.
    pub fn should_remind(&self, session: &str) -> bool {
        (self.count(session) + 1) % 2 == 1
    }

    /// Record an off-topic turn and return the new count.
    pub fn record(&self, session: &str) -> u32 {
        if !self.sessions.contains_key(session) && self.sessions.len() >= self.max_sessions {
            self.evict();
        }
        let mut entry = self.sessions.entry(session.to_string()).or_insert(SessionEntry {
            count: 0,
            last_seen: Instant::now(),
        });
        entry.count += 1;
        entry.last_seen = Instant::now();
        entry.count
    }

    pub fn reset(&self, session: &str) {
        self.sessions.remove(session);
    }

    fn evict(&self) {
        let ttl = self.idle_ttl;
        self.sessions.retain(|_, e| e.last_seen.elapsed() < ttl);
        if self.sessions.len() < self.max_sessions {
            return;
        }
        let oldest = self
            .sessions
            .iter()
            .min_by_key(|e| e.value().last_seen)
            .map(|e| e.key().clone());
        if let Some(key) = oldest {
            log::debug!("Off-topic tracker full; dropping session {key}");
            self.sessions.remove(&key);
        }
    }
}
