//! Shared types for the portal API layer: request context, the
//! cookie-backed session store and the identities injected by middleware.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::http::HeaderMap;
use serde_json::{Map, Value};

use crate::config::SESSION_COOKIE;
use crate::core_state::CoreState;

// ═══════════════════════════════════════════════════════════
// API context
// ═══════════════════════════════════════════════════════════

/// Shared context for all routes and middleware.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
    pub sessions: Arc<Mutex<SessionStore>>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>) -> Self {
        let ttl = Duration::from_secs(core.config.session_ttl_secs);
        Self {
            core,
            sessions: Arc::new(Mutex::new(SessionStore::new(ttl))),
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Identities injected by session middleware
// ═══════════════════════════════════════════════════════════

/// Logged-in patient, injected for patient routes.
#[derive(Debug, Clone)]
pub struct PatientSession {
    pub patient_id: i64,
    pub token_hash: [u8; 32],
}

/// Logged-in doctor, injected for doctor routes.
#[derive(Debug, Clone)]
pub struct DoctorSession {
    pub doctor_id: i64,
    pub token_hash: [u8; 32],
}

// ═══════════════════════════════════════════════════════════
// Session store
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct SessionEntry {
    pub patient_id: Option<i64>,
    pub doctor_id: Option<i64>,
    /// Questionnaire answers merged across steps.
    pub draft: Map<String, Value>,
    last_seen: Instant,
}

impl SessionEntry {
    pub fn patient(patient_id: i64) -> Self {
        Self {
            patient_id: Some(patient_id),
            doctor_id: None,
            draft: Map::new(),
            last_seen: Instant::now(),
        }
    }

    pub fn doctor(doctor_id: i64) -> Self {
        Self {
            patient_id: None,
            doctor_id: Some(doctor_id),
            draft: Map::new(),
            last_seen: Instant::now(),
        }
    }
}

/// In-memory sessions keyed by the SHA-256 of the cookie token, so the
/// raw token never sits in the map. Entries idle longer than the TTL
/// are dropped on access.
pub struct SessionStore {
    entries: HashMap<[u8; 32], SessionEntry>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
        }
    }

    /// Store a new session and return its cookie token.
    pub fn create(&mut self, entry: SessionEntry) -> String {
        if self.entries.len() > 1000 {
            self.cleanup();
        }
        let token = generate_token();
        self.entries.insert(hash_token(&token), entry);
        token
    }

    /// Live session for a token hash; refreshes its idle timer.
    pub fn touch(&mut self, token_hash: &[u8; 32]) -> Option<&mut SessionEntry> {
        let ttl = self.ttl;
        let expired = self
            .entries
            .get(token_hash)
            .is_some_and(|e| e.last_seen.elapsed() > ttl);
        if expired {
            self.entries.remove(token_hash);
            return None;
        }
        let entry = self.entries.get_mut(token_hash)?;
        entry.last_seen = Instant::now();
        Some(entry)
    }

    pub fn remove(&mut self, token_hash: &[u8; 32]) -> bool {
        self.entries.remove(token_hash).is_some()
    }

    pub fn cleanup(&mut self) {
        let ttl = self.ttl;
        self.entries.retain(|_, e| e.last_seen.elapsed() <= ttl);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Hash a session token using SHA-256.
pub fn hash_token(token: &str) -> [u8; 32] {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().into()
}

/// Generate a random session token (URL-safe base64, 32 bytes of entropy).
pub fn generate_token() -> String {
    use base64::Engine;
    let bytes: [u8; 32] = rand::random();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

// ═══════════════════════════════════════════════════════════
// Cookies
// ═══════════════════════════════════════════════════════════

/// Session token from the `Cookie` header, if present.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(axum::http::header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
        .filter(|v| !v.is_empty())
}

pub fn session_cookie(token: &str, ttl_secs: u64) -> String {
    format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={ttl_secs}")
}

pub fn expired_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn generated_tokens_are_unique() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
    }

    #[test]
    fn store_round_trip_and_remove() {
        let mut store = SessionStore::new(Duration::from_secs(60));
        let token = store.create(SessionEntry::patient(7));
        let hash = hash_token(&token);
        assert_eq!(store.touch(&hash).unwrap().patient_id, Some(7));
        assert!(store.touch(&hash_token("other")).is_none());
        assert!(store.remove(&hash));
        assert!(store.touch(&hash).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn idle_sessions_expire() {
        let mut store = SessionStore::new(Duration::from_millis(0));
        let token = store.create(SessionEntry::doctor(1));
        std::thread::sleep(Duration::from_millis(5));
        assert!(store.touch(&hash_token(&token)).is_none());
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn draft_is_kept_per_session() {
        let mut store = SessionStore::new(Duration::from_secs(60));
        let token = store.create(SessionEntry::patient(1));
        let hash = hash_token(&token);
        store
            .touch(&hash)
            .unwrap()
            .draft
            .insert("age".into(), Value::from("72"));
        assert_eq!(store.touch(&hash).unwrap().draft["age"], "72");
    }

    #[test]
    fn cookie_parsing_finds_session_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::COOKIE,
            HeaderValue::from_static("theme=dark; neurosense_session=abc123; lang=en"),
        );
        assert_eq!(session_token(&headers).as_deref(), Some("abc123"));

        let mut empty = HeaderMap::new();
        empty.insert(
            axum::http::header::COOKIE,
            HeaderValue::from_static("neurosense_session="),
        );
        assert_eq!(session_token(&empty), None);
        assert_eq!(session_token(&HeaderMap::new()), None);
    }

    #[test]
    fn cookie_attributes() {
        let cookie = session_cookie("tok", 60);
        assert!(cookie.starts_with("neurosense_session=tok;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(expired_session_cookie().contains("Max-Age=0"));
    }
}
