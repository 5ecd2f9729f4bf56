use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{info, warn};

use loxhue_core::{Bridge, Category};

use crate::cli::RunArgs;
use crate::error::CliError;

pub async fn handle(args: &RunArgs, bridge: &Bridge) -> Result<(), CliError> {
    bridge.start()?;
    info!(
        category = %Category::System,
        host = %bridge.config().host,
        controller = ?bridge.config().controller,
        mapped = bridge.mapping().len(),
        "bridge running"
    );

    let mut ticker = (args.health_interval > 0).then(|| {
        let period = Duration::from_secs(args.health_interval);
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        interval
    });

    loop {
        tokio::select! {
            biased;
            signal = tokio::signal::ctrl_c() => {
                signal?;
                info!(category = %Category::System, "interrupt received");
                break;
            }
            () = tick(ticker.as_mut()) => log_health(bridge),
        }
    }

    bridge.shutdown().await;
    Ok(())
}

async fn tick(ticker: Option<&mut Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

fn log_health(bridge: &Bridge) {
    let stats = bridge.stats();
    let stream = &stats.stream;
    if stream.healthy {
        info!(
            category = %Category::System,
            reconnect_attempts = stream.reconnect_attempts,
            seconds_since_last_event = stream.seconds_since_last_event,
            sent = stats.dispatch.sent,
            failed = stats.dispatch.failed,
            coalesced = stats.dispatch.coalesced,
            udp_sent = stats.udp.success_count,
            udp_errors = stats.udp.error_count,
            "healthy"
        );
    } else {
        warn!(
            category = %Category::System,
            active = stream.active,
            reconnect_attempts = stream.reconnect_attempts,
            seconds_since_last_event = stream.seconds_since_last_event,
            last_event_at = ?stream.last_event_at,
            "event stream unhealthy"
        );
    }
}
