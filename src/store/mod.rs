//! The ledger store: a realtime-replicated JSON tree.
//!
//! One in-process tree holds the four persisted collections (`doctors`,
//! `appointments`, `prescriptions`, `users`). Writes are atomic per path;
//! there are no cross-path transactions and no delete operation — the
//! ledger only grows. Subscribers receive asynchronous snapshots of their
//! subtree; rapid successive writes coalesce to the latest value, so a
//! callback is always "the current state", never a delta.

pub mod path;
mod push_key;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{Map, Value};
use tokio::sync::watch;
use uuid::Uuid;

use crate::error::LedgerError;
use push_key::PushKeyGen;

pub use path::TreePath;

struct Watcher {
    path: TreePath,
    tx: watch::Sender<Value>,
}

type WatcherMap = Arc<Mutex<HashMap<Uuid, Watcher>>>;

/// The shared realtime tree. Cheap to share via `Arc`; all methods take
/// `&self`.
pub struct LedgerStore {
    root: RwLock<Value>,
    watchers: WatcherMap,
    keygen: Mutex<PushKeyGen>,
}

impl Default for LedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerStore {
    pub fn new() -> Self {
        Self {
            root: RwLock::new(Value::Null),
            watchers: Arc::new(Mutex::new(HashMap::new())),
            keygen: Mutex::new(PushKeyGen::new()),
        }
    }

    /// Upserts `value` at `path`, creating intermediate objects. Atomic:
    /// the composite value becomes visible to readers and subscribers as a
    /// whole or not at all. Returns the committed value.
    pub fn put(&self, path: &TreePath, value: Value) -> Result<Value, LedgerError> {
        if path.is_root() {
            return Err(LedgerError::InvalidRequest(
                "cannot write the tree root".into(),
            ));
        }
        let mut root = self.root.write().map_err(|_| LedgerError::LockPoisoned)?;
        write_at(&mut root, path.segments(), value.clone());
        self.notify(&root, path)?;
        Ok(value)
    }

    /// Point-in-time read of the subtree at `path`. `Ok(None)` when the
    /// path is absent; stored JSON `null` counts as absent.
    pub fn get(&self, path: &TreePath) -> Result<Option<Value>, LedgerError> {
        let root = self.root.read().map_err(|_| LedgerError::LockPoisoned)?;
        Ok(node_at(&root, path)
            .filter(|node| !node.is_null())
            .cloned())
    }

    /// Registers a listener on `path`. The returned subscription yields the
    /// current snapshot immediately on its first `recv`, then the latest
    /// snapshot after every write at, above, or below `path`. Dropping it
    /// stops delivery.
    pub fn subscribe(&self, path: &TreePath) -> Result<Subscription, LedgerError> {
        // Registration happens under the tree read lock so no write can
        // slip between the initial snapshot and the watcher becoming live.
        let root = self.root.read().map_err(|_| LedgerError::LockPoisoned)?;
        let snapshot = node_at(&root, path).cloned().unwrap_or(Value::Null);
        let (tx, rx) = watch::channel(snapshot);
        let id = Uuid::new_v4();
        self.watchers
            .lock()
            .map_err(|_| LedgerError::LockPoisoned)?
            .insert(
                id,
                Watcher {
                    path: path.clone(),
                    tx,
                },
            );
        Ok(Subscription {
            id,
            rx,
            registry: Arc::clone(&self.watchers),
            initial_pending: true,
        })
    }

    /// Mints a new strictly-increasing, globally-unique child key under
    /// `path` and returns the child path. Nothing is written; two
    /// concurrent appenders can never receive the same key.
    pub fn append(&self, path: &TreePath) -> Result<TreePath, LedgerError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or(0);
        let key = self
            .keygen
            .lock()
            .map_err(|_| LedgerError::LockPoisoned)?
            .mint(now);
        Ok(path.child(&key))
    }

    /// Conditional write: commits `value` only if the current value at
    /// `path` equals `expected` (`None` = absent). Fails `Conflict` and
    /// leaves the tree untouched on mismatch.
    pub fn compare_and_swap(
        &self,
        path: &TreePath,
        expected: Option<&Value>,
        value: Value,
    ) -> Result<Value, LedgerError> {
        if path.is_root() {
            return Err(LedgerError::InvalidRequest(
                "cannot write the tree root".into(),
            ));
        }
        let mut root = self.root.write().map_err(|_| LedgerError::LockPoisoned)?;
        let current = node_at(&root, path).filter(|node| !node.is_null());
        if current != expected {
            return Err(LedgerError::Conflict {
                path: path.to_string(),
            });
        }
        write_at(&mut root, path.segments(), value.clone());
        self.notify(&root, path)?;
        Ok(value)
    }

    /// Pushes fresh snapshots to every watcher affected by a write at
    /// `written`. Called with the tree lock held, so concurrent writers
    /// cannot interleave stale snapshots.
    fn notify(&self, root: &Value, written: &TreePath) -> Result<(), LedgerError> {
        let watchers = self.watchers.lock().map_err(|_| LedgerError::LockPoisoned)?;
        for watcher in watchers.values() {
            if watcher.path.starts_with(written) || written.starts_with(&watcher.path) {
                let snapshot = node_at(root, &watcher.path)
                    .cloned()
                    .unwrap_or(Value::Null);
                // A send only fails when the receiver is gone; drop
                // cleanup will remove the watcher.
                let _ = watcher.tx.send(snapshot);
            }
        }
        Ok(())
    }
}

/// A live listener handle. Delivery stops when this is dropped.
pub struct Subscription {
    id: Uuid,
    rx: watch::Receiver<Value>,
    registry: WatcherMap,
    initial_pending: bool,
}

impl Subscription {
    /// Waits for the next snapshot. The first call resolves immediately
    /// with the current state; later calls resolve after the next write
    /// at, above, or below the subscribed path. Writes that land while the
    /// consumer is busy coalesce to the newest snapshot — one delivery per
    /// notification cycle, not per write. Returns `None` if the watcher
    /// side shuts down.
    pub async fn recv(&mut self) -> Option<Value> {
        if self.initial_pending {
            self.initial_pending = false;
            return Some(self.rx.borrow_and_update().clone());
        }
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Current snapshot without waiting.
    pub fn latest(&self) -> Value {
        self.rx.borrow().clone()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Ok(mut watchers) = self.registry.lock() {
            watchers.remove(&self.id);
        }
    }
}

fn node_at<'tree>(root: &'tree Value, path: &TreePath) -> Option<&'tree Value> {
    let mut current = root;
    for segment in path.segments() {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Sets `value` at `segments`, replacing non-object intermediates with
/// objects on the way down.
fn write_at(root: &mut Value, segments: &[String], value: Value) {
    debug_assert!(!segments.is_empty());
    let mut current = root;
    for segment in &segments[..segments.len() - 1] {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        current = current
            .as_object_mut()
            .expect("just coerced to object")
            .entry(segment.clone())
            .or_insert(Value::Null);
    }
    if !current.is_object() {
        *current = Value::Object(Map::new());
    }
    current
        .as_object_mut()
        .expect("just coerced to object")
        .insert(segments[segments.len() - 1].clone(), value);
}
