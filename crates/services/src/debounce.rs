//! Timer primitives: a cancel-and-reschedule debouncer and a periodic autosave.

use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

/// Runs a task after a quiet period. Scheduling again before the period
/// elapses aborts the pending task, so only the last request runs.
pub struct Debouncer {
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Replace any pending task with `task`, to run after the delay.
    ///
    /// Outside a Tokio runtime nothing is scheduled; callers still flush on exit.
    pub fn schedule<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Ok(runtime) = Handle::try_current() else {
            debug!("no async runtime; debounced task not scheduled");
            return;
        };
        let delay = self.delay;
        let handle = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
        });
        let previous = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    /// Abort the pending task. Returns true if one was still waiting.
    pub fn cancel(&self) -> bool {
        let pending = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match pending {
            Some(handle) if !handle.is_finished() => {
                handle.abort();
                true
            }
            _ => false,
        }
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        if let Some(handle) = self
            .pending
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
    }
}

/// A fixed-interval background task, stopped when dropped.
pub struct Autosave {
    handle: JoinHandle<()>,
}

impl Autosave {
    /// Call `tick` every `period`, starting one period from now.
    ///
    /// Returns `None` outside a Tokio runtime.
    pub fn spawn<F, Fut>(period: Duration, mut tick: F) -> Option<Self>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let runtime = Handle::try_current().ok()?;
        let handle = runtime.spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                tick().await;
            }
        });
        Some(Self { handle })
    }

    pub fn stop(self) {
        self.handle.abort();
    }
}

impl Drop for Autosave {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn counting_task(counter: Arc<AtomicU32>) -> impl Future<Output = ()> + Send + 'static {
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn last_scheduled_call_wins() {
        let runs = Arc::new(AtomicU32::new(0));
        let debouncer = Debouncer::new(Duration::from_millis(500));

        debouncer.schedule(counting_task(Arc::clone(&runs)));
        tokio::time::sleep(Duration::from_millis(300)).await;
        debouncer.schedule(counting_task(Arc::clone(&runs)));
        tokio::time::sleep(Duration::from_millis(300)).await;

        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert!(debouncer.is_pending());

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_drops_pending_task() {
        let runs = Arc::new(AtomicU32::new(0));
        let debouncer = Debouncer::new(Duration::from_millis(100));

        debouncer.schedule(counting_task(Arc::clone(&runs)));
        assert!(debouncer.cancel());
        assert!(!debouncer.cancel());

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn autosave_ticks_on_its_period() {
        let runs = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&runs);
        let autosave = Autosave::spawn(Duration::from_secs(5), move || {
            counting_task(Arc::clone(&counter))
        })
        .expect("inside runtime");

        tokio::time::sleep(Duration::from_millis(4_900)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_millis(10_200)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 3);

        autosave.stop();
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn scheduling_outside_runtime_is_a_no_op() {
        let debouncer = Debouncer::new(Duration::from_millis(10));
        debouncer.schedule(async {});
        assert!(!debouncer.is_pending());
        assert!(Autosave::spawn(Duration::from_secs(1), || async {}).is_none());
    }
}
