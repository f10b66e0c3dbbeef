use dashmap::DashMap;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// A running scheduled task owned by the [`JobRegistry`].
///
/// Dropping the handle stops the task: the runner exits as soon as the stop
/// channel closes.
pub struct JobHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl JobHandle {
    pub(crate) fn new(stop: watch::Sender<bool>, task: JoinHandle<()>) -> Self {
        Self { stop, task }
    }

    /// Signal the task to stop. Stopping an already-stopped task is a no-op.
    pub(crate) fn stop(&self) {
        // The receiver is gone once the task has exited; nothing to do then.
        let _ = self.stop.send(true);
    }

    /// Whether the underlying task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Process-wide mapping from job identifier to its running task handle.
///
/// Jobs from all guilds share one registry; identifiers are globally unique.
/// The registry exclusively owns the handles — no other component starts or
/// stops them.
#[derive(Default)]
pub struct JobRegistry {
    tasks: DashMap<String, JobHandle>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a started task handle under `identifier`.
    ///
    /// A handle already registered under the same identifier is stopped
    /// before being replaced, so re-entrant loads never leak timers.
    pub fn register(&self, identifier: &str, handle: JobHandle) {
        if let Some(old) = self.tasks.insert(identifier.to_string(), handle) {
            debug!(job_id = %identifier, "replacing scheduled task");
            old.stop();
        }
    }

    /// Whether a task is currently registered under `identifier`.
    pub fn contains(&self, identifier: &str) -> bool {
        self.tasks.contains_key(identifier)
    }

    /// Stop and remove the task under `identifier`.
    ///
    /// Returns `false` when no such task exists; calling twice in
    /// succession is a no-op on the second call.
    pub fn unregister(&self, identifier: &str) -> bool {
        match self.tasks.remove(identifier) {
            Some((_, handle)) => {
                handle.stop();
                true
            }
            None => false,
        }
    }

    /// Number of registered tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Stop every registered task and clear the registry.
    ///
    /// Used as the graceful drain before process exit.
    pub fn stop_all(&self) {
        self.tasks.retain(|id, handle| {
            debug!(job_id = %id, "stopping scheduled task");
            handle.stop();
            false
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A handle whose stop channel can be observed from the outside.
    fn observable_handle() -> (JobHandle, watch::Receiver<bool>) {
        let (tx, rx) = watch::channel(false);
        let mut stop = tx.subscribe();
        let task = tokio::spawn(async move {
            while stop.changed().await.is_ok() {
                if *stop.borrow() {
                    break;
                }
            }
        });
        (JobHandle::new(tx, task), rx)
    }

    #[tokio::test]
    async fn unregister_is_idempotent() {
        let registry = JobRegistry::new();
        let (handle, _rx) = observable_handle();
        registry.register("j1", handle);

        assert!(registry.unregister("j1"));
        assert!(!registry.unregister("j1"));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn register_replaces_and_stops_the_old_handle() {
        let registry = JobRegistry::new();
        let (first, first_rx) = observable_handle();
        let (second, second_rx) = observable_handle();

        registry.register("j1", first);
        registry.register("j1", second);

        assert_eq!(registry.len(), 1);
        assert!(*first_rx.borrow(), "old handle must be stopped");
        assert!(!*second_rx.borrow(), "new handle must keep running");
    }

    #[tokio::test]
    async fn stop_all_drains_the_registry() {
        let registry = JobRegistry::new();
        let (h1, rx1) = observable_handle();
        let (h2, rx2) = observable_handle();
        registry.register("j1", h1);
        registry.register("j2", h2);

        registry.stop_all();

        assert!(registry.is_empty());
        assert!(*rx1.borrow());
        assert!(*rx2.borrow());
    }
}
