use std::time::Duration;
use tracing::warn;

use crate::sweep::SweepConfig;

/// Runtime configuration read from the environment
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Postgres connection string. Without one the engine runs on in-memory stores.
    pub database_url: Option<String>,
    pub sweep: SweepConfig,
    pub recalc_concurrency: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            sweep: SweepConfig::default(),
            recalc_concurrency: 4,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());

        let interval_secs = parse_or(
            &lookup,
            "HANDICAP_SWEEP_INTERVAL_SECS",
            defaults.sweep.interval.as_secs(),
        )
        .max(1);

        let run_once = parse_or(&lookup, "HANDICAP_SWEEP_ONCE", defaults.sweep.run_once);

        let recalc_concurrency = parse_or(
            &lookup,
            "HANDICAP_RECALC_CONCURRENCY",
            defaults.recalc_concurrency,
        )
        .max(1);

        Self {
            database_url,
            sweep: SweepConfig {
                interval: Duration::from_secs(interval_secs),
                run_once,
            },
            recalc_concurrency,
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Debug,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, default = ?default, "Ignoring unparseable setting");
            default
        }),
        None => default,
    }
}
