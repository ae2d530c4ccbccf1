use log::debug;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;

/// A heavy, process-wide value built on first use and dropped on request
///
/// Concurrent first callers wait on the same lock, so the initializer runs
/// once; `teardown` lets the next caller rebuild it.
#[derive(Debug)]
pub struct SharedResource<T> {
    name: &'static str,
    slot: Mutex<Option<Arc<T>>>,
}

impl<T> SharedResource<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            slot: Mutex::const_new(None),
        }
    }

    /// Return the value, building it with `init` if it does not exist yet
    pub async fn get_or_init<F, Fut>(&self, init: F) -> Arc<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let mut slot = self.slot.lock().await;
        if let Some(value) = slot.as_ref() {
            return Arc::clone(value);
        }
        debug!("Initializing shared {}", self.name);
        let value = Arc::new(init().await);
        *slot = Some(Arc::clone(&value));
        value
    }

    pub async fn is_initialized(&self) -> bool {
        self.slot.lock().await.is_some()
    }

    /// Drop the shared value; holders of earlier `Arc`s keep theirs
    pub async fn teardown(&self) {
        if self.slot.lock().await.take().is_some() {
            debug!("Released shared {}", self.name);
        }
    }
}
