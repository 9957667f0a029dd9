use std::time::Duration as StdDuration;

use chrono::Duration;
use farmgate_engine::{SettlementApi, SqliteDatabase};
use gateway_tools::GatewayClients;
use log::*;
use tokio::task::JoinHandle;

/// Starts the pending-payment sweep worker. Do not await the returned JoinHandle, as it will run indefinitely.
///
/// Every `interval`, payments that have been pending for longer than `older_than` are checked with their provider and
/// settled through the usual path. This picks up payments whose webhook was lost and whose buyer never polled.
pub fn start_pending_sweep_worker(
    api: SettlementApi<SqliteDatabase, GatewayClients>,
    interval: StdDuration,
    older_than: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        // a zero period makes tokio panic
        let mut timer = tokio::time::interval(interval.max(StdDuration::from_secs(1)));
        info!("🕰️ Pending payment sweep worker started");
        loop {
            timer.tick().await;
            debug!("🕰️ Running pending payment sweep");
            match api.sweep_pending(older_than).await {
                Ok(result) if result.checked == 0 => trace!("🕰️ No stale pending payments"),
                Ok(result) => {
                    info!(
                        "🕰️ Swept {} pending payments. {} settled, {} failed, {} still pending, {} errors",
                        result.checked,
                        result.settled.len(),
                        result.failed.len(),
                        result.still_pending.len(),
                        result.errors.len()
                    );
                    for (reference, error) in &result.errors {
                        debug!("🕰️ [{reference}]: {error}");
                    }
                },
                Err(e) => {
                    error!("🕰️ Error running pending payment sweep: {e}");
                },
            }
        }
    })
}
