use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

/// A handle for pausing, resuming, and cancelling a training run.
///
/// Handles are cheap to clone and can be moved to other threads. Pausing takes
/// effect at the next iteration boundary and cancelling at the next pattern
/// boundary; neither interrupts a pattern in progress.
#[derive(Clone, Debug, Default)]
pub struct LearningControl {
    inner: Arc<Shared>,
}

#[derive(Debug, Default)]
struct Shared {
    paused: Mutex<bool>,
    resumed: Condvar,
    cancelled: AtomicBool,
}

impl LearningControl {
    pub fn new() -> Self {
        LearningControl::default()
    }

    pub fn pause(&self) {
        *self.paused() = true;
    }

    pub fn resume(&self) {
        *self.paused() = false;
        self.inner.resumed.notify_all();
    }

    /// Requests cancellation. A paused run wakes up and ends.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        // Take the lock so a waiter cannot miss the notification.
        let _guard = self.paused();
        self.inner.resumed.notify_all();
    }

    pub fn is_paused(&self) -> bool {
        *self.paused()
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Blocks until the run is resumed or cancelled. Returns immediately when
    /// not paused.
    pub(crate) fn wait_while_paused(&self) {
        let mut paused = self.paused();
        if *paused && !self.is_cancelled() {
            info!("training paused");
            while *paused && !self.is_cancelled() {
                paused = self
                    .inner
                    .resumed
                    .wait(paused)
                    .unwrap_or_else(PoisonError::into_inner);
            }
            info!("training resumed");
        }
    }

    fn paused(&self) -> MutexGuard<'_, bool> {
        self.inner.paused.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn not_paused_returns_immediately() {
        let control = LearningControl::new();
        control.wait_while_paused();
        assert!(!control.is_paused());
        assert!(!control.is_cancelled());
    }

    #[test]
    fn resume_from_other_thread() {
        let control = LearningControl::new();
        control.pause();
        let remote = control.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            remote.resume();
        });
        control.wait_while_paused();
        assert!(!control.is_paused());
        handle.join().unwrap();
    }

    #[test]
    fn cancel_wakes_paused_run() {
        let control = LearningControl::new();
        control.pause();
        let remote = control.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            remote.cancel();
        });
        control.wait_while_paused();
        assert!(control.is_cancelled());
        handle.join().unwrap();
    }
}
