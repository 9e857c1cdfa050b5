//! Background reclassification sweep.
//!
//! Re-derives every person's verdict on a fixed interval so changes queue up
//! even when no client calls `/reclassify`. The first sweep runs as soon as
//! the task starts.

use std::{sync::Arc, time::Duration};

use stagesync_core::{
  store::FactStore,
  sync::{SweepSummary, reclassify_all},
};
use tokio::{
  task::JoinHandle,
  time::{MissedTickBehavior, interval},
};
use tracing::{debug, info, warn};

/// Periodic [`reclassify_all`] over a shared store.
pub struct Sweeper<S> {
  store:    Arc<S>,
  interval: Duration,
}

impl<S> Sweeper<S>
where
  S: FactStore + 'static,
{
  pub fn new(store: Arc<S>, interval: Duration) -> Self { Self { store, interval } }

  /// Run one sweep. Failures are logged and reported as `None`; the next
  /// tick tries again.
  pub async fn sweep_once(&self) -> Option<SweepSummary> {
    match reclassify_all(self.store.as_ref()).await {
      Ok(summary) => {
        if summary.changed > 0 || summary.failed > 0 {
          info!(
            people = summary.people,
            changed = summary.changed,
            failed = summary.failed,
            "sweep complete"
          );
        } else {
          debug!(people = summary.people, "sweep complete; no changes");
        }
        Some(summary)
      }
      Err(e) => {
        warn!(error = %e, "sweep failed");
        None
      }
    }
  }

  /// Sweep forever. Call inside `tokio::spawn`.
  pub async fn run(self) {
    let mut timer = interval(self.interval);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(interval_secs = self.interval.as_secs(), "sweeper started");

    loop {
      timer.tick().await;
      self.sweep_once().await;
    }
  }
}

/// Spawn a sweeper, or do nothing when `interval` is `None`.
pub fn spawn<S>(store: Arc<S>, interval: Option<Duration>) -> Option<JoinHandle<()>>
where
  S: FactStore + 'static,
{
  let Some(interval) = interval else {
    info!("background sweep disabled");
    return None;
  };
  Some(tokio::spawn(Sweeper::new(store, interval).run()))
}
