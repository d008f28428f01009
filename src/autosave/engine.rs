//! Auto-save engine with external-update reconciliation.
//!
//! Holds a local, editable copy of a record and persists it after a quiet
//! period of no edits.
//!
//! ## Design
//!
//! Uses an mpsc channel + timeout loop, like the analytics debouncer:
//! 1. Every edit is applied to the local copy synchronously, then sends a
//!    non-blocking trigger
//! 2. A background task waits for the first trigger, then keeps consuming
//!    triggers until `debounce` of silence
//! 3. After the quiet period the current copy is saved, unless its JSON form
//!    equals the last saved snapshot
//! 4. A save cycle (retries included) runs to completion before the next
//!    one starts; `save_lock` also serializes explicit `flush_now` calls
//!
//! Snapshots are compared by their `serde_json::Value` form. External
//! refreshes go through [`AutoSave::sync_external`], which never overwrites
//! pending local edits.
//!
//! ## Usage
//!
//! ```ignore
//! let engine = AutoSave::new(project, store, AutoSaveConfig::default())?;
//! engine.handle_change("globalStatus", "in-progress")?; // saved ~500ms later
//! ```

use super::retry::{retry, RetryPolicy};
use super::state::{SaveState, SaveStatus};
use super::store::RecordStore;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// Pending triggers beyond this are dropped; the queued ones still fire
const TRIGGER_CAPACITY: usize = 64;

/// Anything the engine can hold: cloneable and JSON-serializable
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

impl<T> Record for T where T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

/// Timing of the auto-save cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoSaveConfig {
    /// Quiet period after the last edit before saving
    pub debounce: Duration,
    /// How long `success` is shown before reverting to `idle`
    pub success_reset: Duration,
    pub retry: RetryPolicy,
}

impl Default for AutoSaveConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(500),
            success_reset: Duration::from_millis(3000),
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AutoSaveError {
    #[error("failed to serialize record: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("record does not serialize to a JSON object")]
    NotAnObject,
    #[error("value for field `{field}` rejected: {source}")]
    InvalidField {
        field: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("record has no field `{field}`")]
    UnknownField { field: String },
}

/// What [`AutoSave::sync_external`] did with an external snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// Same as the last saved snapshot
    Unchanged,
    /// No pending edits: the external snapshot replaced the local copy
    Adopted,
    /// Pending edits kept; only the saved reference moved to the external snapshot
    LocalPreserved,
}

fn fingerprint<T: Serialize>(data: &T) -> Result<Value, AutoSaveError> {
    serde_json::to_value(data).map_err(AutoSaveError::Serialize)
}

struct Snapshot<T> {
    data: T,
    /// JSON form of what the store is believed to hold
    last_saved: Value,
}

struct Shared<T: Record> {
    snapshot: Mutex<Snapshot<T>>,
    store: Arc<dyn RecordStore<T>>,
    state_tx: watch::Sender<SaveState>,
    config: AutoSaveConfig,
    save_lock: tokio::sync::Mutex<()>,
    reset_generation: AtomicU64,
}

impl<T: Record> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, Snapshot<T>> {
        self.snapshot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Local copy if it differs from the last saved snapshot
    fn pending(&self) -> Result<Option<(T, Value)>, AutoSaveError> {
        let snapshot = self.lock();
        let current = fingerprint(&snapshot.data)?;
        if current == snapshot.last_saved {
            return Ok(None);
        }
        Ok(Some((snapshot.data.clone(), current)))
    }

    /// One save cycle: skip if clean, otherwise save with retries
    async fn save_pending(self: &Arc<Self>) {
        let _cycle = self.save_lock.lock().await;

        let (data, saved_form) = match self.pending() {
            Ok(Some(pending)) => pending,
            Ok(None) => {
                debug!("No changes since last save, skipping");
                return;
            }
            Err(e) => {
                warn!("Cannot save record: {}", e);
                self.state_tx.send_modify(|s| *s = s.error(e.to_string()));
                return;
            }
        };

        self.state_tx.send_modify(|s| *s = s.saving());

        let store = self.store.clone();
        let result = retry(&self.config.retry, |attempt| {
            let store = store.clone();
            let data = data.clone();
            async move {
                debug!(attempt, "Saving record");
                store.save(&data).await
            }
        })
        .await;

        match result {
            Ok(()) => {
                self.lock().last_saved = saved_form;
                self.state_tx.send_replace(SaveState::success(Utc::now()));
                info!("Record saved");
                self.schedule_reset();
            }
            Err(exhausted) => {
                let attempts = exhausted.attempts();
                let last = exhausted.into_last();
                warn!(attempts, "Save failed, giving up: {:#}", last);
                self.state_tx
                    .send_modify(|s| *s = s.error(format!("Failed to save changes: {last}")));
            }
        }
    }

    /// Revert `success` to `idle` after `success_reset`, unless a newer save
    /// has happened in the meantime
    fn schedule_reset(self: &Arc<Self>) {
        let generation = self.reset_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let delay = self.config.success_reset;
        let weak = Arc::downgrade(self);

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(shared) = weak.upgrade() else {
                return;
            };
            if shared.reset_generation.load(Ordering::SeqCst) != generation {
                return;
            }
            shared.state_tx.send_if_modified(|s| {
                if s.status == SaveStatus::Success {
                    *s = s.expired();
                    true
                } else {
                    false
                }
            });
        });
    }
}

/// Debounced auto-save over a local copy of `T`.
///
/// Must be created inside a tokio runtime. Dropping it (or calling
/// [`close`](Self::close)) stops the background task and fires one
/// best-effort save if changes are still pending.
pub struct AutoSave<T: Record> {
    shared: Arc<Shared<T>>,
    trigger_tx: Option<mpsc::Sender<()>>,
}

impl<T: Record> AutoSave<T> {
    /// Start an engine whose local copy and saved reference are `initial`
    pub fn new(
        initial: T,
        store: Arc<dyn RecordStore<T>>,
        config: AutoSaveConfig,
    ) -> Result<Self, AutoSaveError> {
        let last_saved = fingerprint(&initial)?;
        let (state_tx, _) = watch::channel(SaveState::idle());
        let shared = Arc::new(Shared {
            snapshot: Mutex::new(Snapshot {
                data: initial,
                last_saved,
            }),
            store,
            state_tx,
            config,
            save_lock: tokio::sync::Mutex::new(()),
            reset_generation: AtomicU64::new(0),
        });

        let (tx, rx) = mpsc::channel::<()>(TRIGGER_CAPACITY);
        tokio::spawn(Self::run_loop(shared.clone(), rx));

        Ok(Self {
            shared,
            trigger_tx: Some(tx),
        })
    }

    /// Current local copy
    pub fn data(&self) -> T {
        self.shared.lock().data.clone()
    }

    /// Shallow-merge one top-level field (by its serialized name) into the
    /// local copy and restart the debounce timer.
    ///
    /// The field must survive the round trip through `T`: names `T` does not
    /// have are rejected with [`AutoSaveError::UnknownField`]. A field that is
    /// omitted from the serialized form while empty can still be set to a
    /// non-null value. On error the local copy is left as it was.
    pub fn handle_change(&self, field: &str, value: impl Serialize) -> Result<(), AutoSaveError> {
        let value = serde_json::to_value(value).map_err(AutoSaveError::Serialize)?;
        {
            let mut snapshot = self.shared.lock();
            let mut merged = fingerprint(&snapshot.data)?;
            let object = merged.as_object_mut().ok_or(AutoSaveError::NotAnObject)?;
            let had_field = object.contains_key(field);
            object.insert(field.to_string(), value);

            let updated: T =
                serde_json::from_value(merged).map_err(|source| AutoSaveError::InvalidField {
                    field: field.to_string(),
                    source,
                })?;
            let kept_field = fingerprint(&updated)?
                .as_object()
                .is_some_and(|o| o.contains_key(field));
            if !had_field && !kept_field {
                return Err(AutoSaveError::UnknownField {
                    field: field.to_string(),
                });
            }
            snapshot.data = updated;
        }
        self.trigger();
        Ok(())
    }

    /// Edit the local copy in place and restart the debounce timer
    pub fn update_data<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let result = {
            let mut snapshot = self.shared.lock();
            f(&mut snapshot.data)
        };
        self.trigger();
        result
    }

    /// Reconcile an externally refreshed snapshot with the local copy.
    ///
    /// The external snapshot is compared against the last saved one, not the
    /// local copy. If the user has pending edits they win: the local copy is
    /// kept and the external values are not merged in.
    pub fn sync_external(&self, external: T) -> Result<Reconciliation, AutoSaveError> {
        let external_form = fingerprint(&external)?;
        let mut snapshot = self.shared.lock();

        if external_form == snapshot.last_saved {
            return Ok(Reconciliation::Unchanged);
        }

        if fingerprint(&snapshot.data)? == snapshot.last_saved {
            snapshot.data = external;
            snapshot.last_saved = external_form;
            debug!("Adopted external snapshot");
            return Ok(Reconciliation::Adopted);
        }

        snapshot.last_saved = external_form;
        warn!("External update received while local edits are pending; keeping local edits");
        Ok(Reconciliation::LocalPreserved)
    }

    pub fn save_state(&self) -> SaveState {
        self.shared.state_tx.borrow().clone()
    }

    /// Watch save state transitions
    pub fn subscribe(&self) -> watch::Receiver<SaveState> {
        self.shared.state_tx.subscribe()
    }

    /// Local copy differs from the last saved snapshot
    pub fn has_unsaved_changes(&self) -> bool {
        // An unserializable copy cannot have been saved
        !matches!(self.shared.pending(), Ok(None))
    }

    /// Save pending changes now, without waiting for the debounce.
    ///
    /// Waits for any save cycle already running, then returns the resulting state.
    pub async fn flush_now(&self) -> SaveState {
        self.shared.save_pending().await;
        self.save_state()
    }

    /// Tear the engine down. Pending changes get one best-effort save.
    pub fn close(self) {
        drop(self);
    }

    fn trigger(&self) {
        if let Some(tx) = &self.trigger_tx {
            let _ = tx.try_send(());
        }
    }

    /// Background loop: debounce triggers and save
    async fn run_loop(shared: Arc<Shared<T>>, mut rx: mpsc::Receiver<()>) {
        let debounce = shared.config.debounce;

        loop {
            // Wait for the first trigger
            if rx.recv().await.is_none() {
                break; // engine dropped
            }

            // Debounce: keep consuming triggers until quiet period
            loop {
                match tokio::time::timeout(debounce, rx.recv()).await {
                    Ok(Some(())) => {}  // new edit, reset timer
                    Ok(None) => return, // engine dropped; teardown flush takes over
                    Err(_) => break,    // quiet period elapsed
                }
            }

            debug!(debounce_ms = debounce.as_millis() as u64, "Debounce elapsed");
            shared.save_pending().await;
        }
    }
}

impl<T: Record> Drop for AutoSave<T> {
    fn drop(&mut self) {
        // Closing the channel stops the background loop
        self.trigger_tx.take();

        let data = match self.shared.pending() {
            Ok(Some((data, _))) => data,
            Ok(None) => return,
            Err(e) => {
                warn!("Cannot flush record on teardown: {}", e);
                return;
            }
        };

        let store = self.shared.store.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                debug!("Flushing unsaved changes on teardown");
                // Fire-and-forget: no retry, no state update
                handle.spawn(async move {
                    if let Err(e) = store.save(&data).await {
                        warn!("Teardown flush failed: {:#}", e);
                    }
                });
            }
            Err(_) => warn!("No async runtime available; unsaved changes were not flushed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autosave::retry::Backoff;
    use crate::autosave::store::MockRecordStore;
    use anyhow::Result;
    use async_trait::async_trait;
    use serde::Deserialize;
    use std::sync::atomic::AtomicU32;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Draft {
        status: String,
        notes: String,
    }

    fn draft(status: &str, notes: &str) -> Draft {
        Draft {
            status: status.to_string(),
            notes: notes.to_string(),
        }
    }

    fn fast_config() -> AutoSaveConfig {
        AutoSaveConfig {
            debounce: Duration::from_millis(50),
            success_reset: Duration::from_millis(300),
            retry: RetryPolicy {
                max_attempts: 3,
                base_delay: Duration::from_millis(10),
                backoff: Backoff::Linear,
            },
        }
    }

    fn slow_config() -> AutoSaveConfig {
        AutoSaveConfig {
            debounce: Duration::from_secs(10),
            ..fast_config()
        }
    }

    fn engine_with(
        store: &Arc<MockRecordStore<Draft>>,
        config: AutoSaveConfig,
    ) -> AutoSave<Draft> {
        AutoSave::new(draft("todo", ""), store.clone(), config).unwrap()
    }

    async fn sleep_ms(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    // =========================================================================
    // Save cycle
    // =========================================================================

    #[tokio::test]
    async fn test_clean_save_cycle() {
        let store = Arc::new(MockRecordStore::new());
        let engine = engine_with(&store, fast_config());

        engine.handle_change("status", "in-progress").unwrap();
        assert_eq!(engine.data().status, "in-progress");
        assert!(engine.has_unsaved_changes());
        assert_eq!(store.calls(), 0, "save must wait for the debounce");

        sleep_ms(150).await;
        assert_eq!(store.calls(), 1);
        assert_eq!(store.last_saved(), Some(draft("in-progress", "")));
        assert_eq!(engine.save_state().status, SaveStatus::Success);
        assert!(!engine.has_unsaved_changes());

        sleep_ms(400).await;
        let state = engine.save_state();
        assert_eq!(state.status, SaveStatus::Idle);
        assert!(state.last_saved_at.is_some());
    }

    #[tokio::test]
    async fn test_debounce_coalesces_rapid_changes() {
        let store = Arc::new(MockRecordStore::new());
        let engine = engine_with(&store, fast_config());

        for i in 0..10 {
            engine.handle_change("notes", format!("n{i}")).unwrap();
            sleep_ms(10).await;
        }

        sleep_ms(200).await;
        assert_eq!(store.calls(), 1, "10 rapid edits should coalesce into 1 save");
        assert_eq!(store.last_saved(), Some(draft("todo", "n9")));
    }

    #[tokio::test]
    async fn test_unchanged_value_is_not_saved() {
        let store = Arc::new(MockRecordStore::new());
        let engine = engine_with(&store, fast_config());

        engine.handle_change("status", "todo").unwrap();
        sleep_ms(150).await;

        assert_eq!(store.calls(), 0);
        let state = engine.save_state();
        assert_eq!(state.status, SaveStatus::Idle);
        assert!(state.last_saved_at.is_none());
    }

    #[tokio::test]
    async fn test_edit_then_revert_is_not_saved() {
        let store = Arc::new(MockRecordStore::new());
        let engine = engine_with(&store, fast_config());

        engine.handle_change("notes", "draft").unwrap();
        engine.handle_change("notes", "").unwrap();
        sleep_ms(150).await;

        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn test_update_data_returns_closure_result_and_saves() {
        let store = Arc::new(MockRecordStore::new());
        let engine = engine_with(&store, fast_config());

        let previous = engine.update_data(|d| std::mem::replace(&mut d.notes, "typed".into()));
        assert_eq!(previous, "");

        sleep_ms(150).await;
        assert_eq!(store.last_saved(), Some(draft("todo", "typed")));
    }

    // =========================================================================
    // Retries
    // =========================================================================

    #[tokio::test]
    async fn test_persistent_failure_attempts_exactly_three_times() {
        let store = Arc::new(MockRecordStore::failing_always());
        let engine = engine_with(&store, fast_config());

        engine.handle_change("status", "done").unwrap();
        sleep_ms(300).await;

        assert_eq!(store.calls(), 3);
        let state = engine.save_state();
        assert_eq!(state.status, SaveStatus::Error);
        assert!(state.message.unwrap().contains("mock store unavailable"));
        assert!(engine.has_unsaved_changes());
    }

    #[tokio::test]
    async fn test_transient_failure_recovers() {
        let store = Arc::new(MockRecordStore::failing_times(2));
        let engine = engine_with(&store, fast_config());

        engine.handle_change("status", "done").unwrap();
        sleep_ms(300).await;

        assert_eq!(store.calls(), 3);
        assert_eq!(store.saved(), vec![draft("done", "")]);
        assert_eq!(engine.save_state().status, SaveStatus::Success);
    }

    #[tokio::test]
    async fn test_error_persists_until_next_successful_save() {
        let store = Arc::new(MockRecordStore::failing_times(3));
        let engine = engine_with(&store, fast_config());

        engine.handle_change("status", "done").unwrap();
        sleep_ms(300).await;
        assert_eq!(engine.save_state().status, SaveStatus::Error);

        sleep_ms(400).await;
        assert_eq!(engine.save_state().status, SaveStatus::Error);

        engine.handle_change("notes", "retry").unwrap();
        sleep_ms(150).await;
        assert_eq!(engine.save_state().status, SaveStatus::Success);
        assert_eq!(store.last_saved(), Some(draft("done", "retry")));
    }

    // =========================================================================
    // Reconciliation
    // =========================================================================

    #[tokio::test]
    async fn test_external_update_adopted_without_local_edits() {
        let store = Arc::new(MockRecordStore::new());
        let engine = engine_with(&store, slow_config());

        let external = draft("in-progress", "from server");
        assert_eq!(
            engine.sync_external(external.clone()).unwrap(),
            Reconciliation::Adopted
        );
        assert_eq!(engine.data(), external);
        assert!(!engine.has_unsaved_changes());
    }

    #[tokio::test]
    async fn test_identical_external_snapshot_is_noop() {
        let store = Arc::new(MockRecordStore::new());
        let engine = engine_with(&store, slow_config());
        engine.handle_change("notes", "local").unwrap();

        assert_eq!(
            engine.sync_external(draft("todo", "")).unwrap(),
            Reconciliation::Unchanged
        );
        assert_eq!(engine.data().notes, "local");
    }

    #[tokio::test]
    async fn test_local_edit_survives_external_update() {
        let store = Arc::new(MockRecordStore::new());
        let engine = engine_with(&store, slow_config());

        engine.handle_change("status", "in-progress").unwrap();
        let outcome = engine.sync_external(draft("todo", "from server")).unwrap();

        assert_eq!(outcome, Reconciliation::LocalPreserved);
        assert_eq!(engine.data().status, "in-progress");
        // the external change to another field is not merged in
        assert_eq!(engine.data().notes, "");
        assert!(engine.has_unsaved_changes());
    }

    #[tokio::test]
    async fn test_local_edit_matching_external_snapshot_is_clean() {
        let store = Arc::new(MockRecordStore::new());
        let engine = engine_with(&store, fast_config());

        engine.handle_change("status", "done").unwrap();
        // server already holds the same value, e.g. from another tab
        engine.sync_external(draft("done", "")).unwrap();
        assert!(!engine.has_unsaved_changes());

        sleep_ms(150).await;
        assert_eq!(store.calls(), 0);
    }

    // =========================================================================
    // Teardown
    // =========================================================================

    #[tokio::test]
    async fn test_close_flushes_pending_changes() {
        let store = Arc::new(MockRecordStore::new());
        let engine = engine_with(&store, slow_config());

        engine.handle_change("notes", "unsaved").unwrap();
        engine.close();
        sleep_ms(50).await;

        assert_eq!(store.calls(), 1);
        assert_eq!(store.last_saved(), Some(draft("todo", "unsaved")));
    }

    #[tokio::test]
    async fn test_close_without_changes_does_not_save() {
        let store = Arc::new(MockRecordStore::new());
        let engine = engine_with(&store, slow_config());
        engine.close();
        sleep_ms(50).await;
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn test_teardown_flush_does_not_retry() {
        let store = Arc::new(MockRecordStore::failing_always());
        let engine = engine_with(&store, slow_config());
        engine.handle_change("notes", "lost").unwrap();
        drop(engine);
        sleep_ms(100).await;
        assert_eq!(store.calls(), 1);
    }

    // =========================================================================
    // Field merge errors, observers, serialization of cycles
    // =========================================================================

    #[tokio::test]
    async fn test_handle_change_rejects_wrong_type() {
        let store = Arc::new(MockRecordStore::new());
        let engine = engine_with(&store, slow_config());

        let err = engine.handle_change("status", 42).unwrap_err();
        assert!(matches!(err, AutoSaveError::InvalidField { ref field, .. } if field == "status"));
        assert_eq!(engine.data(), draft("todo", ""));
    }

    #[tokio::test]
    async fn test_handle_change_rejects_unknown_field() {
        let store = Arc::new(MockRecordStore::new());
        let engine = engine_with(&store, fast_config());

        let err = engine.handle_change("Status", "done").unwrap_err();
        assert!(matches!(err, AutoSaveError::UnknownField { ref field } if field == "Status"));
        assert_eq!(engine.data(), draft("todo", ""));
        assert!(!engine.has_unsaved_changes());

        // nothing was triggered
        sleep_ms(150).await;
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn test_handle_change_requires_object_record() {
        let store: Arc<MockRecordStore<Vec<u32>>> = Arc::new(MockRecordStore::new());
        let engine = AutoSave::new(vec![1, 2], store, slow_config()).unwrap();
        assert!(matches!(
            engine.handle_change("x", 1),
            Err(AutoSaveError::NotAnObject)
        ));
    }

    #[tokio::test]
    async fn test_subscribers_observe_saving() {
        let store = Arc::new(MockRecordStore::new().with_delay(Duration::from_millis(100)));
        let engine = engine_with(&store, fast_config());
        let mut rx = engine.subscribe();

        engine.handle_change("status", "in-progress").unwrap();
        tokio::time::timeout(Duration::from_secs(1), rx.changed())
            .await
            .expect("state change")
            .unwrap();
        assert_eq!(rx.borrow().status, SaveStatus::Saving);

        tokio::time::timeout(Duration::from_secs(1), rx.changed())
            .await
            .expect("state change")
            .unwrap();
        assert_eq!(rx.borrow().status, SaveStatus::Success);
    }

    /// Store that tracks how many saves run at once
    struct ProbeStore {
        in_flight: AtomicU32,
        max_in_flight: AtomicU32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl RecordStore<Draft> for ProbeStore {
        async fn save(&self, _data: &Draft) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(80)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_flush_now_waits_for_running_save() {
        let probe = Arc::new(ProbeStore {
            in_flight: AtomicU32::new(0),
            max_in_flight: AtomicU32::new(0),
            calls: AtomicU32::new(0),
        });
        let engine = AutoSave::new(draft("todo", ""), probe.clone(), fast_config()).unwrap();

        engine.handle_change("status", "in-progress").unwrap();
        sleep_ms(80).await; // debounced save is now in flight
        engine.handle_change("notes", "second").unwrap();

        let state = engine.flush_now().await;
        assert_eq!(state.status, SaveStatus::Success);
        assert!(!engine.has_unsaved_changes());
        assert_eq!(probe.calls.load(Ordering::SeqCst), 2);
        assert_eq!(probe.max_in_flight.load(Ordering::SeqCst), 1);
    }
}
