use crate::types::Digest;
use sha2::{Digest as _, Sha256};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Compute SHA-256 hash of bytes, returning lowercase hex string.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[derive(Debug, thiserror::Error)]
pub enum DigestError {
    #[error("digest service unavailable: {0}")]
    Unavailable(String),
}

/// One-way digest used to obscure category values. Deterministic: the same
/// text always yields the same digest.
#[async_trait::async_trait]
pub trait DigestService: Send + Sync {
    async fn digest(&self, text: &str) -> Result<Digest, DigestError>;
}

/// SHA-256 over the UTF-8 bytes of the text.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sha256Digest;

#[async_trait::async_trait]
impl DigestService for Sha256Digest {
    async fn digest(&self, text: &str) -> Result<Digest, DigestError> {
        Ok(sha256_hex(text.as_bytes()))
    }
}

/// SHA-256 that counts its calls and can be switched into failure mode (for testing).
#[derive(Debug, Default)]
pub struct CountingDigest {
    calls: AtomicUsize,
    failing: AtomicBool,
}

impl CountingDigest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl DigestService for CountingDigest {
    async fn digest(&self, text: &str) -> Result<Digest, DigestError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(DigestError::Unavailable("counting stub set to fail".into()));
        }
        Ok(sha256_hex(text.as_bytes()))
    }
}
