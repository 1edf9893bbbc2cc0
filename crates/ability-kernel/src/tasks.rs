//! Session-managed tasks.
//!
//! Every piece of background work an ability starts must go through
//! [`SessionTasks`] so that it is torn down together with the session.
//! Closing the session aborts all live tasks and wakes any pending
//! [`SessionTasks::sleep`] with [`KernelError::SessionClosed`].
//!
//! Tasks that capture a clone of their own `SessionTasks` keep the session
//! alive; call [`SessionTasks::close`] explicitly when the session ends.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::{KernelError, Result};

/// Identifier of a managed task.
pub type TaskId = Uuid;

/// Observable state of a managed task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Running,
    Finished,
    /// Aborted by [`SessionTasks::close`] before it completed.
    Aborted,
}

struct ManagedTask {
    name: String,
    handle: JoinHandle<()>,
    aborted: bool,
    spawned_at: DateTime<Utc>,
}

struct TasksInner {
    session: String,
    tasks: DashMap<TaskId, ManagedTask>,
    closed: watch::Sender<bool>,
}

impl Drop for TasksInner {
    fn drop(&mut self) {
        for entry in self.tasks.iter() {
            entry.handle.abort();
        }
    }
}

/// Task facility scoped to one ability session.  Cheap to clone.
#[derive(Clone)]
pub struct SessionTasks {
    inner: Arc<TasksInner>,
}

impl SessionTasks {
    /// Create the task facility for a new session.
    pub fn new(session: impl Into<String>) -> Self {
        let (closed, _) = watch::channel(false);
        Self {
            inner: Arc::new(TasksInner {
                session: session.into(),
                tasks: DashMap::new(),
                closed,
            }),
        }
    }

    /// The session identifier this facility belongs to.
    pub fn session(&self) -> &str {
        &self.inner.session
    }

    /// Spawn a managed task onto the tokio runtime.
    pub fn spawn<F>(&self, name: impl Into<String>, future: F) -> Result<TaskId>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.is_closed() {
            return Err(self.closed_error());
        }

        let id = Uuid::now_v7();
        let name = name.into();
        let handle = tokio::spawn(future);

        tracing::debug!(
            session = %self.inner.session,
            task_id = %id,
            task_name = %name,
            "session task spawned"
        );

        self.inner.tasks.insert(
            id,
            ManagedTask {
                name,
                handle,
                aborted: false,
                spawned_at: Utc::now(),
            },
        );

        // The session may have closed while we were inserting.
        if self.is_closed() {
            self.close();
        }
        Ok(id)
    }

    /// Sleep for `duration` unless the session closes first.
    pub async fn sleep(&self, duration: Duration) -> Result<()> {
        let mut rx = self.inner.closed.subscribe();
        if *rx.borrow() {
            return Err(self.closed_error());
        }

        tokio::select! {
            () = tokio::time::sleep(duration) => Ok(()),
            _ = rx.wait_for(|closed| *closed) => Err(self.closed_error()),
        }
    }

    /// Current state of a task.
    pub fn state(&self, id: TaskId) -> Result<TaskState> {
        let task = self
            .inner
            .tasks
            .get(&id)
            .ok_or(KernelError::TaskNotFound { task_id: id })?;
        Ok(if task.aborted {
            TaskState::Aborted
        } else if task.handle.is_finished() {
            TaskState::Finished
        } else {
            TaskState::Running
        })
    }

    /// Number of tasks that are still running.
    pub fn active_count(&self) -> usize {
        self.inner
            .tasks
            .iter()
            .filter(|t| !t.aborted && !t.handle.is_finished())
            .count()
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        *self.inner.closed.borrow()
    }

    /// End the session: abort every live task and reject further work.
    ///
    /// Returns the number of tasks aborted by this call.  Safe to call more
    /// than once.
    pub fn close(&self) -> usize {
        let was_closed = self.inner.closed.send_replace(true);

        let mut aborted = 0;
        for mut task in self.inner.tasks.iter_mut() {
            if task.aborted || task.handle.is_finished() {
                continue;
            }
            task.handle.abort();
            task.aborted = true;
            aborted += 1;
            let age_ms = (Utc::now() - task.spawned_at).num_milliseconds();
            tracing::debug!(
                session = %self.inner.session,
                task_name = %task.name,
                age_ms,
                "session task aborted"
            );
        }

        if !was_closed {
            tracing::info!(session = %self.inner.session, aborted, "session closed");
        }
        aborted
    }

    fn closed_error(&self) -> KernelError {
        KernelError::SessionClosed {
            session: self.inner.session.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    async fn wait_until_finished(tasks: &SessionTasks, id: TaskId) {
        for _ in 0..100 {
            if tasks.state(id).unwrap() == TaskState::Finished {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("task did not finish");
    }

    #[tokio::test]
    async fn spawned_task_runs_to_completion() {
        let tasks = SessionTasks::new("s1");
        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);

        let id = tasks
            .spawn("quick", async move {
                flag.store(true, Ordering::SeqCst);
            })
            .unwrap();

        wait_until_finished(&tasks, id).await;
        assert!(ran.load(Ordering::SeqCst));
        assert_eq!(tasks.active_count(), 0);
    }

    #[tokio::test]
    async fn close_aborts_live_tasks() {
        let tasks = SessionTasks::new("s2");
        let reached = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&reached);

        let id = tasks
            .spawn("slow", async move {
                tokio::time::sleep(Duration::from_secs(30)).await;
                flag.store(true, Ordering::SeqCst);
            })
            .unwrap();
        assert_eq!(tasks.active_count(), 1);

        assert_eq!(tasks.close(), 1);
        assert_eq!(tasks.state(id).unwrap(), TaskState::Aborted);
        assert_eq!(tasks.active_count(), 0);
        assert!(!reached.load(Ordering::SeqCst));

        // Idempotent.
        assert_eq!(tasks.close(), 0);
    }

    #[tokio::test]
    async fn spawn_after_close_is_rejected() {
        let tasks = SessionTasks::new("s3");
        tasks.close();
        let result = tasks.spawn("late", async {});
        assert!(matches!(result, Err(KernelError::SessionClosed { .. })));
    }

    #[tokio::test]
    async fn sleep_completes_while_open() {
        let tasks = SessionTasks::new("s4");
        tasks.sleep(Duration::from_millis(10)).await.unwrap();
    }

    #[tokio::test]
    async fn sleep_is_cut_short_by_close() {
        let tasks = SessionTasks::new("s5");
        let closer = tasks.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            closer.close();
        });

        let result = tokio::time::timeout(
            Duration::from_secs(2),
            tasks.sleep(Duration::from_secs(60)),
        )
        .await
        .expect("sleep should be interrupted well before the timeout");
        assert!(matches!(result, Err(KernelError::SessionClosed { .. })));

        // Sleeping on a closed session fails immediately.
        assert!(tasks.sleep(Duration::from_secs(60)).await.is_err());
    }

    #[tokio::test]
    async fn unknown_task_id() {
        let tasks = SessionTasks::new("s6");
        assert!(matches!(
            tasks.state(Uuid::now_v7()),
            Err(KernelError::TaskNotFound { .. })
        ));
    }
}
