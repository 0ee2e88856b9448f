// twitchbot-core/src/tasks/periodic.rs

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, warn};

use crate::registry::PeriodicEntry;
use crate::services::dispatcher::Dispatcher;

/// One independent timer loop per entry, so a slow handler never holds up
/// any other timer. Within one loop a run finishes before the next tick is
/// taken: a handler slower than its interval never overlaps itself, and the
/// ticks it missed collapse into one. The first tick fires immediately.
pub fn spawn_periodic_tasks(dispatcher: &Dispatcher, entries: &[PeriodicEntry]) -> Vec<JoinHandle<()>> {
    entries
        .iter()
        .cloned()
        .map(|entry| spawn_periodic_task(dispatcher.clone(), entry))
        .collect()
}

fn spawn_periodic_task(dispatcher: Dispatcher, entry: PeriodicEntry) -> JoinHandle<()> {
    tokio::spawn(async move {
        debug!("starting periodic handler every {:?}", entry.interval);
        let mut ticker = interval(entry.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = dispatcher.run_periodic(entry.handler.clone()).await {
                warn!("periodic run did not complete: {}", e);
            }
        }
    })
}

/// Convenience for registering timers in whole seconds.
pub fn seconds(n: u64) -> Duration {
    Duration::from_secs(n)
}
