use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::handler::EffectDispatcher;
use crate::queue::{ActionQueue, WorldModel};

/// Drive `queue` at its tick quantum until `shutdown` is notified.
///
/// For hosts without their own frame clock. Signal shutdown with
/// `notify_one` so a notification sent before the loop starts is not lost.
pub async fn run_ticker(
    queue: Arc<ActionQueue>,
    world: Arc<dyn WorldModel>,
    dispatcher: Arc<dyn EffectDispatcher>,
    shutdown: Arc<Notify>,
) {
    let period = Duration::from_secs_f32(queue.tick_quantum());
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(period_ms = period.as_millis() as u64, "Action ticker started");

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let report = queue.tick(world.as_ref(), dispatcher.as_ref());
                if !report.fired.is_empty() || !report.failed.is_empty() || report.invalidated > 0 {
                    debug!(
                        fired = report.fired.len(),
                        failed = report.failed.len(),
                        invalidated = report.invalidated,
                        "Tick"
                    );
                }
            }
            _ = shutdown.notified() => {
                info!("Action ticker stopped");
                return;
            }
        }
    }
}
