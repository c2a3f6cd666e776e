//! Visibility-gated periodic task.
//!
//! A [`Poller`] runs a tick closure on a fixed interval while the client is
//! visible. Each tick is awaited before the next one is scheduled, so a slow
//! call pushes the schedule back instead of stacking requests. On a
//! hidden-to-visible transition the tick runs once immediately and the
//! interval restarts from there, including transitions that happened while
//! a tick was still running. Dropping the [`Poller`] aborts the task, so
//! no timer outlives the view that owns it.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::visibility::VisibilityState;

/// Handle to a running poll loop. The loop stops when this is dropped.
#[derive(Debug)]
pub struct Poller {
    name: &'static str,
    task: JoinHandle<()>,
}

impl Poller {
    /// Spawns a poll loop.
    ///
    /// The first tick runs immediately if the client is visible; otherwise
    /// it runs on the next hidden-to-visible transition. The loop exits on
    /// its own if the visibility source is dropped.
    pub fn spawn<F, Fut>(
        name: &'static str,
        interval: Duration,
        mut visibility: watch::Receiver<VisibilityState>,
        mut tick: F,
    ) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            tracing::debug!(poller = name, ?interval, "poller started");

            let mut shown = visibility.borrow().shown;
            loop {
                let state = *visibility.borrow_and_update();
                if !state.is_visible() {
                    if visibility.changed().await.is_err() {
                        break;
                    }
                    continue;
                }
                if state.shown != shown {
                    shown = state.shown;
                    tracing::trace!(poller = name, "visible again, fetching now");
                    tick().await;
                    ticker.reset();
                    continue;
                }
                tokio::select! {
                    _ = ticker.tick() => {
                        tick().await;
                        ticker.reset();
                    }
                    changed = visibility.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
            tracing::debug!(poller = name, "visibility source closed, poller exiting");
        });

        Self { name, task }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.task.abort();
        tracing::debug!(poller = self.name, "poller stopped");
    }
}
