use crate::client::ClientConfig;
use crate::scheduler::SchedulerConfig;
use clap::Parser;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Emulates a field-deployed AC unit: registers with the device API and
/// submits synthetic measurements on a fixed interval, backing them up
/// locally while the service is down.
#[derive(Debug, Clone, Parser)]
#[command(name = "ac-simulator", version)]
pub struct Config {
    /// Base URL of the device API
    #[arg(long, env = "SMARTAC_API_URL", default_value = "http://localhost:8080")]
    pub api_url: String,

    /// File holding measurements not yet delivered
    #[arg(long, env = "BACKLOG_PATH", default_value = "backlog/measurements")]
    pub backlog_path: PathBuf,

    /// Seconds between ticks
    #[arg(long, env = "TICK_INTERVAL_SECS", default_value_t = 10, value_parser = non_zero::<u64>)]
    pub interval_secs: u64,

    /// Measurements generated per tick
    #[arg(long, env = "BATCH_SIZE", default_value_t = 500, value_parser = non_zero::<usize>)]
    pub batch_size: usize,

    /// Per-request HTTP timeout in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 15, value_parser = non_zero::<u64>)]
    pub timeout_secs: u64,

    /// Append rejected batches to this JSON-lines file instead of discarding them
    #[arg(long, env = "DEAD_LETTER_PATH")]
    pub dead_letter_path: Option<PathBuf>,

    /// Overwrite carbon monoxide with the temperature reading, like firmware 1.0.x
    #[arg(long, env = "LEGACY_CO_MIRROR")]
    pub legacy_co_mirror: bool,

    /// Firmware version reported at registration
    #[arg(long, default_value = crate::device::DEFAULT_FIRMWARE)]
    pub firmware_version: String,

    /// Seed for the random source, for reproducible runs
    #[arg(long, env = "SIMULATOR_SEED")]
    pub seed: Option<u64>,

    /// Start metering without asking
    #[arg(short, long)]
    pub yes: bool,
}

impl Config {
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            api_url: self.api_url.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            interval: Duration::from_secs(self.interval_secs),
            batch_size: self.batch_size,
        }
    }
}

fn non_zero<T>(raw: &str) -> Result<T, String>
where
    T: FromStr + Default + PartialEq,
    T::Err: Display,
{
    let value: T = raw.parse().map_err(|e: T::Err| e.to_string())?;
    if value == T::default() {
        return Err("must be greater than zero".to_string());
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_cadence() {
        let config = Config::try_parse_from(["ac-simulator"]).unwrap();

        assert_eq!(config.scheduler_config().interval, Duration::from_secs(10));
        assert_eq!(config.scheduler_config().batch_size, 500);
        assert_eq!(config.client_config().timeout, Duration::from_secs(15));
        assert_eq!(config.firmware_version, "1.0.4");
        assert!(config.dead_letter_path.is_none());
        assert!(!config.legacy_co_mirror);
        assert!(!config.yes);
    }

    #[test]
    fn test_overrides() {
        let config = Config::try_parse_from([
            "ac-simulator",
            "--api-url",
            "http://api.internal:9000",
            "--backlog-path",
            "/var/lib/sim/backlog",
            "--interval-secs",
            "2",
            "--batch-size",
            "25",
            "--dead-letter-path",
            "/var/lib/sim/rejected.jsonl",
            "--legacy-co-mirror",
            "--seed",
            "42",
            "-y",
        ])
        .unwrap();

        assert_eq!(config.client_config().api_url, "http://api.internal:9000");
        assert_eq!(config.backlog_path, PathBuf::from("/var/lib/sim/backlog"));
        assert_eq!(config.scheduler_config().interval, Duration::from_secs(2));
        assert_eq!(config.scheduler_config().batch_size, 25);
        assert_eq!(config.seed, Some(42));
        assert!(config.legacy_co_mirror);
        assert!(config.yes);
    }

    #[test]
    fn test_rejects_zero_values() {
        assert!(Config::try_parse_from(["ac-simulator", "--interval-secs", "0"]).is_err());
        assert!(Config::try_parse_from(["ac-simulator", "--batch-size", "0"]).is_err());
        assert!(Config::try_parse_from(["ac-simulator", "--timeout-secs", "0"]).is_err());
        assert!(Config::try_parse_from(["ac-simulator", "--batch-size", "many"]).is_err());
    }
}
