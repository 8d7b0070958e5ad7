use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{error, info, instrument, warn};

use crate::handicap::{HandicapError, HandicapService, RecalculationOutcome};

/// Configuration for the periodic recalculation sweep
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// How often every stored (golfer, scope) is recomputed
    pub interval: Duration,
    /// Run a single pass and return instead of looping
    pub run_once: bool,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60 * 60), // 1 hour
            run_once: false,
        }
    }
}

/// Counts from one sweep pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    /// Keys whose index was first established or moved
    pub updated: usize,
    /// Same index as before, stale, or still not established
    pub unchanged: usize,
    pub failed: usize,
}

/// Starts the background task that periodically recomputes every handicap
#[instrument(skip(service))]
pub async fn start_sweep_task(service: Arc<HandicapService>, config: SweepConfig) {
    info!(
        interval_secs = config.interval.as_secs(),
        run_once = config.run_once,
        "Starting handicap sweep background task"
    );

    let mut sweep_interval = interval(config.interval);

    loop {
        sweep_interval.tick().await;

        info!("Running handicap sweep");

        match run_sweep(&service).await {
            Ok(report) => {
                info!(
                    updated = report.updated,
                    unchanged = report.unchanged,
                    failed = report.failed,
                    "Handicap sweep completed"
                );
            }
            Err(e) => {
                error!(error = %e, "Handicap sweep failed");
            }
        }

        if config.run_once {
            break;
        }
    }
}

/// Recomputes every known (golfer, scope) once
pub async fn run_sweep(service: &HandicapService) -> Result<SweepReport, HandicapError> {
    let summaries = service.recalculate_all().await?;

    let mut report = SweepReport::default();
    for summary in summaries {
        match summary.result {
            Ok(RecalculationOutcome::Updated { previous, record })
                if previous.as_ref().map_or(true, |p| p.index != record.index) =>
            {
                report.updated += 1
            }
            Ok(_) => report.unchanged += 1,
            Err(e) => {
                warn!(
                    golfer_id = %summary.golfer_id,
                    scope = %summary.scope,
                    error = %e,
                    "Failed to recalculate handicap during sweep"
                );
                report.failed += 1;
            }
        }
    }

    Ok(report)
}
