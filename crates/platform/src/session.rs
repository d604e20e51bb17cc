//
// Copyright (c) 2025 SOUNDVAULT LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: soundvault — Secure audio ingest with envelope encryption.
//

//! In-process session registry with idle-timeout eviction.
//!
//! Sessions are strictly in-memory; a restart logs everyone out. Tokens are
//! 32 bytes from the OS CSPRNG, URL-safe base64 — unpredictable from any
//! other token. Validation touches `last_seen_at`, so a session stays alive
//! as long as it keeps being used; a background sweep evicts idle ones.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand_core::{OsRng, RngCore};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

/// Raw entropy per session token (32 bytes ⇒ 256 bits).
pub const TOKEN_BYTES: usize = 32;

/// One authenticated session.
#[derive(Debug, Clone)]
pub struct Session {
    pub principal: String,
    pub created_at: Instant,
    pub last_seen_at: Instant,
}

/// Concurrent session map shared by all request workers.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Session>>,
    idle_timeout: Duration,
}

impl SessionRegistry {
    pub fn new(idle_timeout: Duration) -> Arc<Self> {
        Arc::new(Self {
            sessions: RwLock::new(HashMap::new()),
            idle_timeout,
        })
    }

    /// Create a session for a principal and return its opaque token.
    pub async fn create_session(&self, principal: &str) -> String {
        let mut raw = [0u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut raw);
        let token = URL_SAFE_NO_PAD.encode(raw);

        let now = Instant::now();
        let session = Session {
            principal: principal.to_string(),
            created_at: now,
            last_seen_at: now,
        };

        self.sessions.write().await.insert(token.clone(), session);
        token
    }

    /// Resolve a token to its principal, touching `last_seen_at`.
    ///
    /// An idle-expired session is evicted on the spot and reported as
    /// invalid.
    pub async fn validate_session(&self, token: &str) -> Option<String> {
        let mut sessions = self.sessions.write().await;
        let expired = match sessions.get_mut(token) {
            Some(session) => {
                if session.last_seen_at.elapsed() < self.idle_timeout {
                    session.last_seen_at = Instant::now();
                    return Some(session.principal.clone());
                }
                true
            }
            None => false,
        };

        if expired {
            sessions.remove(token);
        }
        None
    }

    /// Destroy a session (explicit logout). No-op for unknown tokens.
    pub async fn destroy_session(&self, token: &str) {
        self.sessions.write().await.remove(token);
    }

    /// Evict every idle-expired session. Returns the eviction count.
    pub async fn sweep(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| session.last_seen_at.elapsed() < self.idle_timeout);
        before - sessions.len()
    }

    pub async fn active_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Spawn the periodic eviction sweep.
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> tokio::task::JoinHandle<()> {
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let evicted = registry.sweep().await;
                if evicted > 0 {
                    debug!(evicted, "session sweep");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_validate() {
        let registry = SessionRegistry::new(Duration::from_secs(60));
        let token = registry.create_session("alice@example.com").await;

        assert_eq!(
            registry.validate_session(&token).await.as_deref(),
            Some("alice@example.com")
        );
        assert_eq!(registry.active_count().await, 1);
    }

    #[tokio::test]
    async fn test_unknown_token_is_invalid() {
        let registry = SessionRegistry::new(Duration::from_secs(60));
        assert!(registry.validate_session("no-such-token").await.is_none());
    }

    #[tokio::test]
    async fn test_tokens_are_distinct_and_url_safe() {
        let registry = SessionRegistry::new(Duration::from_secs(60));
        let a = registry.create_session("p").await;
        let b = registry.create_session("p").await;

        assert_ne!(a, b);
        // 32 bytes → 43 chars of unpadded URL-safe base64.
        assert_eq!(a.len(), 43);
        assert!(a
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[tokio::test]
    async fn test_destroy_session() {
        let registry = SessionRegistry::new(Duration::from_secs(60));
        let token = registry.create_session("alice@example.com").await;

        registry.destroy_session(&token).await;
        assert!(registry.validate_session(&token).await.is_none());
        assert_eq!(registry.active_count().await, 0);
    }

    #[tokio::test]
    async fn test_idle_expiry_evicts_on_validate() {
        let registry = SessionRegistry::new(Duration::from_millis(10));
        let token = registry.create_session("alice@example.com").await;

        tokio::time::sleep(Duration::from_millis(25)).await;

        assert!(registry.validate_session(&token).await.is_none());
        assert_eq!(registry.active_count().await, 0);
    }

    #[tokio::test]
    async fn test_sweep_evicts_only_idle_sessions() {
        let registry = SessionRegistry::new(Duration::from_millis(50));
        let stale = registry.create_session("stale@example.com").await;
        let fresh = registry.create_session("fresh@example.com").await;

        tokio::time::sleep(Duration::from_millis(30)).await;
        // Touch one session so only the other goes idle.
        registry.validate_session(&fresh).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        let evicted = registry.sweep().await;
        assert_eq!(evicted, 1);
        assert!(registry.validate_session(&stale).await.is_none());
        assert!(registry.validate_session(&fresh).await.is_some());
    }

    #[tokio::test]
    async fn test_validation_touch_extends_lifetime() {
        let registry = SessionRegistry::new(Duration::from_millis(40));
        let token = registry.create_session("alice@example.com").await;

        for _ in 0..4 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            assert!(
                registry.validate_session(&token).await.is_some(),
                "touching within the idle window keeps the session alive"
            );
        }
    }
}
