//! Cursor and session cache
//!
//! Values are kept in two independent in-memory maps, each behind its own
//! read/write lock, and handed out as opaque tokens:
//!
//! ```text
//! token = hex(id) || hex(HMAC(secret, kind || id))      id = 16 random bytes
//! ```
//!
//! A token is unpredictable and bound to its kind, so a cursor token never
//! resolves as a session. Every entry also stores `HMAC(secret, id || bytes)`
//! over its canonical encoding, checked on each read; a mismatch resolves to
//! `NotFound`. Identical values stored while a previous copy is live get the
//! existing token back.
//!
//! Entries expire `ttl` after creation. Reads report expiry (and drop the
//! entry); a background sweeper removes the rest in bounded batches so the
//! write lock is never held for a full scan.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use parking_lot::{Mutex, RwLock};
use ring::hmac;
use ring::rand::{SecureRandom, SystemRandom};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::config::CacheConfig;
use crate::error::{BazaarError, Result};

use super::cursor::{SearchCursor, SearchSession};

const ID_LEN: usize = 16;
const TAG_LEN: usize = 32;
/// Length of a token in hex characters.
pub const TOKEN_LEN: usize = 2 * (ID_LEN + TAG_LEN);
const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Cursor,
    Session,
}

impl TokenKind {
    const fn label(self) -> &'static [u8] {
        match self {
            Self::Cursor => b"bazaar.cursor.v1",
            Self::Session => b"bazaar.session.v1",
        }
    }
}

/// Why a lookup failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Miss {
    NotFound,
    Expired,
}

struct Entry {
    id: [u8; ID_LEN],
    bytes: Vec<u8>,
    signature: hmac::Tag,
    digest: [u8; 32],
    expires_at: Instant,
}

#[derive(Default)]
struct Store {
    entries: HashMap<String, Entry>,
    by_digest: HashMap<[u8; 32], String>,
}

impl Store {
    fn remove(&mut self, token: &str) -> bool {
        let Some(entry) = self.entries.remove(token) else {
            return false;
        };
        if self.by_digest.get(&entry.digest).is_some_and(|t| t == token) {
            self.by_digest.remove(&entry.digest);
        }
        true
    }
}

struct TokenStore {
    kind: TokenKind,
    map: RwLock<Store>,
}

impl TokenStore {
    fn new(kind: TokenKind) -> Self {
        Self {
            kind,
            map: RwLock::new(Store::default()),
        }
    }
}

struct Shared {
    key: hmac::Key,
    rng: SystemRandom,
    ttl: Duration,
    sweep_batch: usize,
    cursors: TokenStore,
    sessions: TokenStore,
    sweeps: AtomicU64,
    swept: AtomicU64,
}

/// Snapshot of cache occupancy and sweeper activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub cursors: usize,
    pub sessions: usize,
    pub sweeps: u64,
    pub swept: u64,
}

struct Sweeper {
    shutdown: Sender<()>,
    handle: JoinHandle<()>,
}

/// Token cache for cursors and search sessions.
///
/// Cheap to share behind an `Arc`; every method takes `&self`.
pub struct SearchCache {
    shared: Arc<Shared>,
    sweeper: Mutex<Option<Sweeper>>,
}

impl std::fmt::Debug for SearchCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchCache")
            .field("ttl", &self.shared.ttl)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl SearchCache {
    /// Build from config and start the sweeper.
    ///
    /// The signing secret comes from `cache.secret` (hex, at least 32 bytes);
    /// without one a random per-process secret is drawn, so tokens do not
    /// survive a restart.
    pub fn new(config: &CacheConfig) -> Result<Self> {
        let secret = match &config.secret {
            Some(hex_secret) => {
                let bytes = hex::decode(hex_secret.trim())
                    .map_err(|e| BazaarError::Config(format!("cache.secret is not hex: {e}")))?;
                if bytes.len() < MIN_SECRET_LEN {
                    return Err(BazaarError::Config(format!(
                        "cache.secret must be at least {MIN_SECRET_LEN} bytes, got {}",
                        bytes.len()
                    )));
                }
                bytes
            }
            None => {
                let mut bytes = vec![0u8; MIN_SECRET_LEN];
                SystemRandom::new()
                    .fill(&mut bytes)
                    .map_err(|_| BazaarError::Config("system RNG unavailable".to_string()))?;
                debug!("no cache.secret configured; using a per-process secret");
                bytes
            }
        };
        Ok(Self::with_secret(&secret, config))
    }

    /// Build with an explicit secret.
    #[must_use]
    pub fn with_secret(secret: &[u8], config: &CacheConfig) -> Self {
        let shared = Arc::new(Shared {
            key: hmac::Key::new(hmac::HMAC_SHA256, secret),
            rng: SystemRandom::new(),
            ttl: config.ttl,
            sweep_batch: config.sweep_batch.max(1),
            cursors: TokenStore::new(TokenKind::Cursor),
            sessions: TokenStore::new(TokenKind::Session),
            sweeps: AtomicU64::new(0),
            swept: AtomicU64::new(0),
        });
        let sweeper = if config.sweep_interval.is_zero() {
            None
        } else {
            spawn_sweeper(Arc::clone(&shared), config.sweep_interval)
        };
        Self {
            shared,
            sweeper: Mutex::new(sweeper),
        }
    }

    pub fn store_cursor(&self, cursor: &SearchCursor) -> Result<String> {
        self.shared.store(&self.shared.cursors, cursor)
    }

    /// Resolve a cursor token. Unknown, forged or mismatched tokens are `CursorNotFound`.
    pub fn get_cursor(&self, token: &str) -> Result<SearchCursor> {
        self.shared
            .get(&self.shared.cursors, token)?
            .map_err(|miss| match miss {
                Miss::NotFound => BazaarError::CursorNotFound(token.to_string()),
                Miss::Expired => BazaarError::CursorExpired(token.to_string()),
            })
    }

    pub fn store_session(&self, session: &SearchSession) -> Result<String> {
        self.shared.store(&self.shared.sessions, session)
    }

    pub fn get_session(&self, token: &str) -> Result<SearchSession> {
        self.shared
            .get(&self.shared.sessions, token)?
            .map_err(|miss| match miss {
                Miss::NotFound => BazaarError::SessionNotFound(token.to_string()),
                Miss::Expired => BazaarError::SessionExpired(token.to_string()),
            })
    }

    /// Remove every expired entry now. Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        self.shared.sweep()
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            cursors: self.shared.cursors.map.read().entries.len(),
            sessions: self.shared.sessions.map.read().entries.len(),
            sweeps: self.shared.sweeps.load(Ordering::Relaxed),
            swept: self.shared.swept.load(Ordering::Relaxed),
        }
    }

    /// Stop the sweeper and wait for it to exit. Idempotent.
    pub fn close(&self) {
        let Some(sweeper) = self.sweeper.lock().take() else {
            return;
        };
        // a closed channel also stops the loop
        let _ = sweeper.shutdown.send(());
        if sweeper.handle.join().is_err() {
            warn!("cache sweeper panicked");
        }
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sweeper.lock().is_none()
    }
}

impl Drop for SearchCache {
    fn drop(&mut self) {
        self.close();
    }
}

fn spawn_sweeper(shared: Arc<Shared>, interval: Duration) -> Option<Sweeper> {
    let (shutdown, rx): (Sender<()>, Receiver<()>) = crossbeam_channel::bounded(1);
    let spawned = std::thread::Builder::new()
        .name("bazaar-cache-sweeper".to_string())
        .spawn(move || {
            loop {
                match rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        let removed = shared.sweep();
                        if removed > 0 {
                            info!(removed, "swept expired cache entries");
                        }
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        });
    match spawned {
        Ok(handle) => Some(Sweeper { shutdown, handle }),
        Err(err) => {
            // expired entries are still dropped lazily on read
            warn!(error = %err, "failed to spawn cache sweeper");
            None
        }
    }
}

impl Shared {
    fn token_tag(&self, kind: TokenKind, id: &[u8]) -> hmac::Tag {
        let mut ctx = hmac::Context::with_key(&self.key);
        ctx.update(kind.label());
        ctx.update(id);
        ctx.sign()
    }

    fn value_signature(&self, id: &[u8], bytes: &[u8]) -> hmac::Tag {
        let mut ctx = hmac::Context::with_key(&self.key);
        ctx.update(id);
        ctx.update(bytes);
        ctx.sign()
    }

    fn store<T: Serialize>(&self, store: &TokenStore, value: &T) -> Result<String> {
        let bytes = serde_json::to_vec(value)?;
        let digest: [u8; 32] = Sha256::digest(&bytes).into();
        let now = Instant::now();

        let mut map = store.map.write();
        if let Some(existing) = map.by_digest.get(&digest).cloned() {
            let live = map
                .entries
                .get(&existing)
                .is_some_and(|entry| entry.expires_at > now);
            if live {
                return Ok(existing);
            }
            map.remove(&existing);
        }

        let mut id = [0u8; ID_LEN];
        self.rng
            .fill(&mut id)
            .map_err(|_| BazaarError::Serialization("system RNG unavailable".to_string()))?;
        let tag = self.token_tag(store.kind, &id);
        let token = format!("{}{}", hex::encode(id), hex::encode(tag.as_ref()));
        let signature = self.value_signature(&id, &bytes);

        map.by_digest.insert(digest, token.clone());
        map.entries.insert(
            token.clone(),
            Entry {
                id,
                bytes,
                signature,
                digest,
                expires_at: now.checked_add(self.ttl).unwrap_or(now),
            },
        );
        Ok(token)
    }

    /// Outer error: the stored bytes failed to decode. Inner: cache miss.
    fn get<T: DeserializeOwned>(
        &self,
        store: &TokenStore,
        token: &str,
    ) -> Result<std::result::Result<T, Miss>> {
        let Some((id, tag)) = parse_token(token) else {
            return Ok(Err(Miss::NotFound));
        };
        let mut message = store.kind.label().to_vec();
        message.extend_from_slice(&id);
        if hmac::verify(&self.key, &message, &tag).is_err() {
            debug!(kind = ?store.kind, "token signature mismatch");
            return Ok(Err(Miss::NotFound));
        }

        let now = Instant::now();
        {
            let map = store.map.read();
            let Some(entry) = map.entries.get(token) else {
                return Ok(Err(Miss::NotFound));
            };
            if entry.expires_at > now {
                let mut signed = entry.id.to_vec();
                signed.extend_from_slice(&entry.bytes);
                if hmac::verify(&self.key, &signed, entry.signature.as_ref()).is_err() {
                    warn!(kind = ?store.kind, "stored value failed signature check");
                    return Ok(Err(Miss::NotFound));
                }
                return Ok(Ok(serde_json::from_slice(&entry.bytes)?));
            }
        }

        // expired: upgrade to the write lock and drop it if nobody replaced it
        let mut map = store.map.write();
        if map
            .entries
            .get(token)
            .is_some_and(|entry| entry.expires_at <= now)
        {
            map.remove(token);
        }
        Ok(Err(Miss::Expired))
    }

    fn sweep(&self) -> usize {
        let removed = self.sweep_store(&self.cursors) + self.sweep_store(&self.sessions);
        self.sweeps.fetch_add(1, Ordering::Relaxed);
        self.swept.fetch_add(removed as u64, Ordering::Relaxed);
        removed
    }

    fn sweep_store(&self, store: &TokenStore) -> usize {
        let now = Instant::now();
        let expired: Vec<String> = store
            .map
            .read()
            .entries
            .iter()
            .filter(|(_, entry)| entry.expires_at <= now)
            .map(|(token, _)| token.clone())
            .collect();

        let mut removed = 0;
        for batch in expired.chunks(self.sweep_batch) {
            let mut map = store.map.write();
            for token in batch {
                let still_expired = map
                    .entries
                    .get(token)
                    .is_some_and(|entry| entry.expires_at <= now);
                if still_expired && map.remove(token) {
                    removed += 1;
                }
            }
        }
        removed
    }
}

fn parse_token(token: &str) -> Option<([u8; ID_LEN], Vec<u8>)> {
    if token.len() != TOKEN_LEN {
        return None;
    }
    let raw = hex::decode(token).ok()?;
    let (id, tag) = raw.split_at(ID_LEN);
    let id: [u8; ID_LEN] = id.try_into().ok()?;
    Some((id, tag.to_vec()))
}
