//! Live-consumer enumeration.
//!
//! The garbage collector needs to know which sessions are still alive (e.g.
//! currently open tabs). That knowledge belongs to the host, so it is
//! injected as a capability rather than queried from any ambient source.

use std::collections::HashSet;
use std::sync::RwLock;

use async_trait::async_trait;

use offcache_core::Error;

/// Enumerates the session ids of currently live consumers.
#[async_trait]
pub trait ConsumerEnumerator: Send + Sync {
    async fn active_sessions(&self) -> Result<HashSet<String>, Error>;
}

/// A [`ConsumerEnumerator`] over a shared mutable set, for hosts that track
/// session lifecycle themselves (and for tests).
#[derive(Debug, Default)]
pub struct SharedConsumers {
    active: RwLock<HashSet<String>>,
}

impl SharedConsumers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the active-session set.
    pub fn set_active<I: IntoIterator<Item = String>>(&self, sessions: I) {
        let mut active = self.active.write().expect("consumer set lock poisoned");
        *active = sessions.into_iter().collect();
    }

    /// Mark one session as live.
    pub fn add(&self, session_id: &str) {
        let mut active = self.active.write().expect("consumer set lock poisoned");
        active.insert(session_id.to_string());
    }

    /// Mark one session as gone.
    pub fn remove(&self, session_id: &str) {
        let mut active = self.active.write().expect("consumer set lock poisoned");
        active.remove(session_id);
    }
}

#[async_trait]
impl ConsumerEnumerator for SharedConsumers {
    async fn active_sessions(&self) -> Result<HashSet<String>, Error> {
        let active = self.active.read().expect("consumer set lock poisoned");
        Ok(active.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_shared_consumers_roundtrip() {
        let consumers = SharedConsumers::new();
        consumers.add("tab-1");
        consumers.add("tab-2");
        consumers.remove("tab-1");

        let active = consumers.active_sessions().await.unwrap();
        assert_eq!(active, HashSet::from(["tab-2".to_string()]));
    }

    #[tokio::test]
    async fn test_set_active_replaces() {
        let consumers = SharedConsumers::new();
        consumers.add("tab-1");
        consumers.set_active(["tab-9".to_string()]);

        let active = consumers.active_sessions().await.unwrap();
        assert_eq!(active, HashSet::from(["tab-9".to_string()]));
    }
}
