use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::AbortHandle;

/// Runs an action once `delay` has passed without a newer schedule.
///
/// Each [`Debouncer::schedule`] cancels the previously pending action, so only
/// the last of a burst fires. Dropping the debouncer cancels the pending
/// action.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    pending: Mutex<Option<AbortHandle>>,
}

impl Debouncer {
    /// Debouncer that waits `delay` after the last schedule.
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Mutex::new(None),
        }
    }

    /// Quiet period before an action fires.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Replace the pending action with `action`, restarting the timer.
    pub fn schedule(&self, action: impl FnOnce() + Send + 'static) {
        let delay = self.delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            action();
        });
        if let Some(previous) = self.pending.lock().replace(handle.abort_handle()) {
            previous.abort();
        }
    }

    /// Drop the pending action without running it.
    pub fn cancel(&self) {
        if let Some(pending) = self.pending.lock().take() {
            pending.abort();
        }
    }

    /// Whether an action is waiting for its timer.
    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .as_ref()
            .map_or(false, |pending| !pending.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use tokio::time::sleep;

    fn counter() -> (Arc<AtomicUsize>, impl Fn() -> Box<dyn FnOnce() + Send>) {
        let fired = Arc::new(AtomicUsize::new(0));
        let make = {
            let fired = Arc::clone(&fired);
            move || {
                let fired = Arc::clone(&fired);
                Box::new(move || {
                    fired.fetch_add(1, Ordering::SeqCst);
                }) as Box<dyn FnOnce() + Send>
            }
        };
        (fired, make)
    }

    #[tokio::test(start_paused = true)]
    async fn only_last_of_a_burst_fires() {
        let debouncer = Debouncer::new(Duration::from_millis(300));
        let (fired, action) = counter();

        debouncer.schedule(action());
        sleep(Duration::from_millis(200)).await;
        debouncer.schedule(action());
        sleep(Duration::from_millis(200)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(debouncer.is_pending());

        sleep(Duration::from_millis(150)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_and_drop_suppress_the_action() {
        let (fired, action) = counter();

        let debouncer = Debouncer::new(Duration::from_millis(100));
        debouncer.schedule(action());
        debouncer.cancel();
        sleep(Duration::from_millis(200)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        debouncer.schedule(action());
        drop(debouncer);
        sleep(Duration::from_millis(200)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
