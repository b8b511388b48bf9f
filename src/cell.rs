//! Mutually-exclusive "latest value" box shared between tasks

use std::fmt;
use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};

/// Cloneable handle to an optional value guarded by an async mutex.
///
/// Every access goes through the lock; there is no way to reach the value
/// without holding it.
pub struct SyncCell<T> {
    inner: Arc<Mutex<Option<T>>>,
}

impl<T> Clone for SyncCell<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for SyncCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SyncCell<T> {
    /// An empty cell
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_value(value: T) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Some(value))),
        }
    }

    /// Replace the content, returning the previous value
    pub async fn set(&self, value: T) -> Option<T> {
        self.inner.lock().await.replace(value)
    }

    /// Remove and return the content
    pub async fn take(&self) -> Option<T> {
        self.inner.lock().await.take()
    }

    pub async fn is_set(&self) -> bool {
        self.inner.lock().await.is_some()
    }

    /// Hold the lock across a compound update. Operators use this to publish
    /// a value while no other task can change the cell.
    pub(crate) async fn lock(&self) -> MutexGuard<'_, Option<T>> {
        self.inner.lock().await
    }
}

impl<T: Clone> SyncCell<T> {
    /// Clone of the current content
    pub async fn get(&self) -> Option<T> {
        self.inner.lock().await.clone()
    }
}

impl<T> fmt::Debug for SyncCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.inner.try_lock() {
            Ok(guard) if guard.is_some() => "set",
            Ok(_) => "empty",
            Err(_) => "locked",
        };
        f.debug_struct("SyncCell").field("state", &state).finish()
    }
}
