use chrono::Utc;
use log::*;

use tokio::{sync::watch, task::JoinHandle};

use crate::{config::SweepConfig, events::EventProducers, sqlite::SqliteDatabase, OrderFlowApi};

/// Starts the stalled-order sweep worker. Do not await the returned JoinHandle unless you have
/// signalled shutdown, as it runs until `shutdown` flips to `true`.
///
/// Each pass reminds buyers whose pending orders have sat untouched past `reminder_after`, and
/// cancels (with restock) orders that stayed untouched past `cancel_after` despite the reminder.
pub fn start_sweep_worker(
    db: SqliteDatabase,
    producers: EventProducers,
    config: SweepConfig,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(config.interval);
        let api = OrderFlowApi::new(db, producers);
        info!("🕰️ Stalled order sweep worker started");
        loop {
            tokio::select! {
                _ = timer.tick() => {},
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("🕰️ Stalled order sweep worker shutting down");
                        return;
                    }
                    continue;
                },
            }
            debug!("🕰️ Running stalled order sweep");
            let now = Utc::now();
            let reminder_cutoff = now - config.reminder_after;
            let cancel_cutoff = now - config.cancel_after;
            match api.process_inactive_orders(reminder_cutoff, cancel_cutoff).await {
                Ok(outcome) => {
                    info!(
                        "🕰️ Sweep touched {} orders. Reminded: {:?}. Cancelled: {:?}",
                        outcome.total(),
                        outcome.reminded,
                        outcome.cancelled
                    );
                    if outcome.failures > 0 {
                        warn!("🕰️ {} orders could not be processed this pass", outcome.failures);
                    }
                },
                Err(e) => {
                    error!("🕰️ Error running stalled order sweep: {e}");
                },
            }
        }
    })
}
