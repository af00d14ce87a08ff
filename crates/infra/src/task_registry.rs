use std::{
    collections::HashMap,
    future::Future,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
};
use tokio::task::AbortHandle;
use tracing::{debug, info};

struct RegisteredTask {
    generation: u64,
    abort: AbortHandle,
}

/// Background tasks keyed by a string, at most one running task per key.
///
/// A task is removed from the registry when it finishes, panics or gets
/// cancelled, so a key is never held by a task that is no longer running.
#[derive(Clone, Default)]
pub struct TaskRegistry {
    tasks: Arc<Mutex<HashMap<String, RegisteredTask>>>,
    generation: Arc<AtomicU64>,
}

/// Removes the task entry once the task future is dropped
struct Deregister {
    tasks: Arc<Mutex<HashMap<String, RegisteredTask>>>,
    key: String,
    generation: u64,
}

impl Drop for Deregister {
    fn drop(&mut self) {
        let mut tasks = self.tasks.lock().unwrap();
        // A newer task may have taken over the key after a cancel
        if tasks
            .get(&self.key)
            .map(|t| t.generation == self.generation)
            .unwrap_or(false)
        {
            tasks.remove(&self.key);
            debug!("Task: {} deregistered", self.key);
        }
    }
}

impl TaskRegistry {
    pub fn new() -> Self {
        Default::default()
    }

    /// Spawns `task` on the current local task set unless a task with the
    /// same key is already running. Returns whether a new task was spawned.
    pub fn spawn_unique<F>(&self, key: &str, task: F) -> bool
    where
        F: Future<Output = ()> + 'static,
    {
        let mut tasks = self.tasks.lock().unwrap();
        if tasks.contains_key(key) {
            return false;
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst);
        let guard = Deregister {
            tasks: self.tasks.clone(),
            key: key.to_string(),
            generation,
        };
        let handle = tokio::task::spawn_local(async move {
            let _guard = guard;
            task.await;
        });
        tasks.insert(
            key.to_string(),
            RegisteredTask {
                generation,
                abort: handle.abort_handle(),
            },
        );
        info!("Task: {} started", key);
        true
    }

    /// Aborts the task of `key`. Returns whether a task was running.
    pub fn cancel(&self, key: &str) -> bool {
        let removed = self.tasks.lock().unwrap().remove(key);
        match removed {
            Some(task) => {
                task.abort.abort();
                info!("Task: {} cancelled", key);
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self, key: &str) -> bool {
        self.tasks.lock().unwrap().contains_key(key)
    }

    pub fn running_count(&self) -> usize {
        self.tasks.lock().unwrap().len()
    }
}
