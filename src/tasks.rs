//! Fire-and-forget background work with panic isolation.
//!
//! `BackgroundTasks` hands work to tokio's blocking pool and keeps a count of
//! tasks that have been scheduled but not yet finished. The shutdown sequence
//! waits on that count (under its own deadline) before the process exits.

use std::any::Any;
use std::fmt::Display;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

#[derive(Default)]
struct Counter {
    active: AtomicUsize,
    idle: Notify,
}

/// Decrements the shared counter when dropped, whatever way the task ended.
struct TaskGuard {
    counter: Arc<Counter>,
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        if self.counter.active.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.counter.idle.notify_waiters();
        }
    }
}

/// Shared handle for scheduling background tasks.
#[derive(Clone, Default)]
pub struct BackgroundTasks {
    counter: Arc<Counter>,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `work`, naming it after the closure's type path.
    ///
    /// The type path of a closure includes the function it was written in
    /// (`webstart::handlers::contact::contact_submit::{{closure}}`), which is
    /// what the failure log reports.
    pub fn spawn<F, E>(&self, work: F)
    where
        F: FnOnce() -> Result<(), E> + Send + 'static,
        E: Display,
    {
        self.spawn_named(std::any::type_name::<F>(), work);
    }

    /// Schedule `work` under an explicit name. Returns immediately.
    ///
    /// A returned error or a panic inside `work` produces exactly one `error`
    /// event tagged with `name`; success logs nothing.
    pub fn spawn_named<F, E>(&self, name: &'static str, work: F)
    where
        F: FnOnce() -> Result<(), E> + Send + 'static,
        E: Display,
    {
        let guard = self.track();
        let dispatch = tracing::dispatcher::get_default(|current| current.clone());

        tokio::task::spawn_blocking(move || {
            let _guard = guard;
            tracing::dispatcher::with_default(&dispatch, || {
                match panic::catch_unwind(AssertUnwindSafe(work)) {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => tracing::error!(task = name, error = %err, "task"),
                    Err(payload) => {
                        tracing::error!(task = name, error = %panic_message(payload.as_ref()), "task")
                    }
                }
            });
        });
    }

    /// Number of tasks scheduled and not yet finished.
    pub fn active(&self) -> usize {
        self.counter.active.load(Ordering::Acquire)
    }

    /// Resolve once no task is outstanding.
    ///
    /// Has no deadline of its own; callers bound it with `tokio::time::timeout`.
    pub async fn wait(&self) {
        loop {
            let notified = self.counter.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.active() == 0 {
                return;
            }
            notified.await;
        }
    }

    fn track(&self) -> TaskGuard {
        self.counter.active.fetch_add(1, Ordering::AcqRel);
        TaskGuard {
            counter: Arc::clone(&self.counter),
        }
    }
}

/// Best-effort text for a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
