use std::future::Future;

use tokio::task::JoinHandle;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TaskError {
    #[error("task `{0}` was cancelled")]
    Cancelled(&'static str),
    #[error("task `{0}` panicked")]
    Panicked(&'static str),
    #[error("task `{0}` was already joined")]
    Consumed(&'static str),
}

/// A spawned task owned by whoever spawned it: dropping the handle aborts
/// the task, including any timer it is awaiting.
#[derive(Debug)]
pub struct ScopedTask<T> {
    label: &'static str,
    handle: Option<JoinHandle<T>>,
}

impl<T: Send + 'static> ScopedTask<T> {
    /// Must be called from within a tokio runtime.
    pub fn spawn<F>(label: &'static str, fut: F) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        tracing::debug!(task = label, "spawning scoped task");
        Self {
            label,
            handle: Some(tokio::spawn(fut)),
        }
    }
}

impl<T> ScopedTask<T> {
    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(|h| h.is_finished())
    }

    /// Requests cancellation; a later `join` reports `Cancelled` unless the
    /// task had already completed.
    pub fn cancel(&self) {
        if let Some(handle) = &self.handle {
            handle.abort();
        }
    }

    pub async fn join(&mut self) -> Result<T, TaskError> {
        let handle = self.handle.as_mut().ok_or(TaskError::Consumed(self.label))?;
        let result = handle.await;
        self.handle = None;
        result.map_err(|err| {
            if err.is_cancelled() {
                TaskError::Cancelled(self.label)
            } else {
                TaskError::Panicked(self.label)
            }
        })
    }
}

impl<T> Drop for ScopedTask<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            if !handle.is_finished() {
                tracing::debug!(task = self.label, "aborting scoped task on drop");
            }
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use super::{ScopedTask, TaskError};

    #[tokio::test(start_paused = true)]
    async fn join_returns_output() {
        let mut task = ScopedTask::spawn("answer", async { 42 });
        assert_eq!(task.join().await, Ok(42));
        assert!(task.is_finished());
        assert_eq!(task.join().await, Err(TaskError::Consumed("answer")));
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_aborts_pending_timer() {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();
        let task = ScopedTask::spawn("timer", async move {
            tokio::time::sleep(Duration::from_secs(10)).await;
            flag.store(true, Ordering::SeqCst);
        });
        drop(task);

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert!(!fired.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_reports_cancelled() {
        let mut task = ScopedTask::spawn("slow", async {
            tokio::time::sleep(Duration::from_secs(60)).await;
        });
        task.cancel();
        assert_eq!(task.join().await, Err(TaskError::Cancelled("slow")));
    }
}
