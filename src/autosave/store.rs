//! Record store contract consumed by the auto-save engine.
//!
//! The engine only needs one operation: persist a full snapshot. Saves may be
//! slow, may fail, and may be called twice in quick succession with the same
//! payload (a retry can overlap the teardown flush).

use anyhow::Result;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Destination for auto-saved snapshots
#[async_trait]
pub trait RecordStore<T: Send + Sync>: Send + Sync {
    /// Persist the whole record
    async fn save(&self, data: &T) -> Result<()>;
}

/// Adapts a closure returning a boxed future into a [`RecordStore`]
pub struct FnStore<F>(F);

/// Build a store from a closure: `fn_store(|data| Box::pin(async move { ... }))`
pub fn fn_store<T, F>(f: F) -> FnStore<F>
where
    F: Fn(T) -> BoxFuture<'static, Result<()>> + Send + Sync,
{
    FnStore(f)
}

#[async_trait]
impl<T, F> RecordStore<T> for FnStore<F>
where
    T: Clone + Send + Sync,
    F: Fn(T) -> BoxFuture<'static, Result<()>> + Send + Sync,
{
    async fn save(&self, data: &T) -> Result<()> {
        (self.0)(data.clone()).await
    }
}

// ============================================================================
// Mock store
// ============================================================================

/// In-memory store that records every call. Can be told to fail.
pub struct MockRecordStore<T> {
    saved: Mutex<Vec<T>>,
    calls: AtomicU32,
    /// Remaining failures; `u32::MAX` fails forever
    failures_left: AtomicU32,
    delay: Duration,
}

impl<T: Clone> MockRecordStore<T> {
    pub fn new() -> Self {
        Self {
            saved: Mutex::new(Vec::new()),
            calls: AtomicU32::new(0),
            failures_left: AtomicU32::new(0),
            delay: Duration::ZERO,
        }
    }

    /// Fail the next `n` saves, then succeed
    pub fn failing_times(n: u32) -> Self {
        let store = Self::new();
        store.failures_left.store(n, Ordering::SeqCst);
        store
    }

    pub fn failing_always() -> Self {
        Self::failing_times(u32::MAX)
    }

    /// Make every save take `delay`
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Total save calls, failed ones included
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Successfully saved snapshots, oldest first
    pub fn saved(&self) -> Vec<T> {
        self.saved.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn last_saved(&self) -> Option<T> {
        self.saved().pop()
    }
}

impl<T: Clone> Default for MockRecordStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Clone + Send + Sync> RecordStore<T> for MockRecordStore<T> {
    async fn save(&self, data: &T) -> Result<()> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| match left {
                0 => None,
                u32::MAX => Some(u32::MAX),
                n => Some(n - 1),
            })
            .is_ok();
        if failing {
            anyhow::bail!("mock store unavailable (call {call})");
        }

        if let Ok(mut saved) = self.saved.lock() {
            saved.push(data.clone());
        }
        Ok(())
    }
}
