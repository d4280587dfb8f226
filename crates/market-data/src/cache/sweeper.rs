//! Background task that purges expired cache entries on a fixed interval.

use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};

use super::store::CacheStore;

/// Shortest accepted sweep period.
const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Periodically calls [`CacheStore::purge_expired`].
pub struct CacheSweeper {
    cache: Arc<CacheStore>,
    interval: Duration,
}

impl CacheSweeper {
    pub fn new(cache: Arc<CacheStore>, interval: Duration) -> Self {
        Self {
            cache,
            interval: interval.max(MIN_SWEEP_INTERVAL),
        }
    }

    /// Spawn the sweep loop on the current tokio runtime.
    ///
    /// The first sweep runs one full interval after start. Dropping the
    /// returned handle stops the loop as well.
    pub fn start(self) -> SweeperHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            info!("Cache sweeper started ({:?} interval)", self.interval);

            let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let purged = self.cache.purge_expired();
                        if purged > 0 {
                            info!("Cache sweep removed {} expired entries", purged);
                        } else {
                            debug!("Cache sweep found nothing to remove");
                        }
                    }
                    _ = shutdown_rx.changed() => break,
                }
            }

            info!("Cache sweeper stopped");
        });

        SweeperHandle {
            shutdown: shutdown_tx,
            task,
        }
    }
}

/// Handle to a running [`CacheSweeper`].
pub struct SweeperHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Signal the loop to exit and wait for it.
    pub async fn stop(self) {
        // Err only when the loop already exited and dropped its receiver.
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            warn!("Cache sweeper task ended abnormally: {}", e);
        }
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}
