//! Server-side store for files uploaded in one request and used in a later one.
//!
//! Entries are keyed by the kind of upload and a per-session token, so a
//! session holds at most one PDF and one signature. The store is bounded by
//! total byte size and entries expire after a configurable TTL.

use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use moka::future::Cache;
use uuid::Uuid;

use crate::config::UploadConfig;

/// What an uploaded blob is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UploadKind {
    Pdf,
    Signature,
}

impl UploadKind {
    const fn prefix(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Signature => "sig",
        }
    }
}

/// Store key: `pdf:<token>` or `sig:<token>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UploadKey {
    pub kind: UploadKind,
    pub token: Uuid,
}

impl UploadKey {
    pub const fn new(kind: UploadKind, token: Uuid) -> Self {
        Self { kind, token }
    }
}

impl fmt::Display for UploadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.prefix(), self.token)
    }
}

/// Bounded, expiring upload store shared by all request handlers.
#[derive(Clone)]
pub struct UploadStore {
    cache: Cache<String, Bytes>,
}

impl UploadStore {
    pub fn new(max_mb: u64, ttl_seconds: u64) -> Self {
        let max_bytes = max_mb.saturating_mul(1024 * 1024);

        let mut builder = Cache::builder()
            .max_capacity(max_bytes)
            .weigher(|_key: &String, value: &Bytes| -> u32 {
                value.len().try_into().unwrap_or(u32::MAX)
            });

        if ttl_seconds > 0 {
            builder = builder.time_to_live(Duration::from_secs(ttl_seconds));
        }

        Self {
            cache: builder.build(),
        }
    }

    pub fn from_config(config: &UploadConfig) -> Self {
        Self::new(config.store_max_mb, config.store_ttl_seconds)
    }

    /// Store `data`, replacing any earlier upload of the same kind for this token.
    pub async fn put(&self, key: UploadKey, data: Bytes) {
        tracing::debug!("Storing {} bytes under {}", data.len(), key);
        self.cache.insert(key.to_string(), data).await;
    }

    pub async fn get(&self, key: UploadKey) -> Option<Bytes> {
        self.cache.get(&key.to_string()).await
    }

    pub async fn remove(&self, key: UploadKey) {
        self.cache.remove(&key.to_string()).await;
    }

    pub fn clear(&self) {
        self.cache.invalidate_all();
    }
}

impl fmt::Debug for UploadStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadStore")
            .field("entries", &self.cache.entry_count())
            .field("weighted_size", &self.cache.weighted_size())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_format() {
        let token = Uuid::nil();
        assert_eq!(
            UploadKey::new(UploadKind::Pdf, token).to_string(),
            "pdf:00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(
            UploadKey::new(UploadKind::Signature, token).to_string(),
            "sig:00000000-0000-0000-0000-000000000000"
        );
    }

    #[tokio::test]
    async fn test_put_get_replace() {
        let store = UploadStore::new(1, 0);
        let token = Uuid::new_v4();
        let pdf = UploadKey::new(UploadKind::Pdf, token);
        let sig = UploadKey::new(UploadKind::Signature, token);

        store.put(pdf, Bytes::from_static(b"first")).await;
        store.put(sig, Bytes::from_static(b"signature")).await;
        store.put(pdf, Bytes::from_static(b"second")).await;

        assert_eq!(store.get(pdf).await.as_deref(), Some(b"second".as_slice()));
        assert_eq!(store.get(sig).await.as_deref(), Some(b"signature".as_slice()));

        store.remove(pdf).await;
        assert!(store.get(pdf).await.is_none());
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let store = UploadStore::new(1, 60);
        let a = UploadKey::new(UploadKind::Pdf, Uuid::new_v4());
        let b = UploadKey::new(UploadKind::Pdf, Uuid::new_v4());

        store.put(a, Bytes::from_static(b"a")).await;
        assert!(store.get(b).await.is_none());
    }
}
