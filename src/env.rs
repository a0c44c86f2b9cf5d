use once_cell::sync::Lazy;
pub use std::env::*;
use std::path::PathBuf;
use std::time::Duration;

pub static CWD: Lazy<PathBuf> = Lazy::new(|| current_dir().unwrap_or_else(|_| PathBuf::from(".")));

pub static PORTSIDE_CONFIG: Lazy<Option<PathBuf>> = Lazy::new(|| var_path("PORTSIDE_CONFIG"));
pub static PORTSIDE_LOG: Lazy<log::LevelFilter> =
    Lazy::new(|| var_log_level("PORTSIDE_LOG").unwrap_or(log::LevelFilter::Info));

// Per-attempt TCP probe timeout. Probes are throttled, not retried; the
// polling waiter owns the overall deadline.
pub static PORTSIDE_PROBE_TIMEOUT: Lazy<Duration> =
    Lazy::new(|| Duration::from_millis(var_u64("PORTSIDE_PROBE_TIMEOUT_MS").unwrap_or(400)));
pub static PORTSIDE_PROBE_INTERVAL: Lazy<Duration> =
    Lazy::new(|| Duration::from_millis(var_u64("PORTSIDE_PROBE_INTERVAL_MS").unwrap_or(250)));
pub static PORTSIDE_PROBE_HOST: Lazy<String> =
    Lazy::new(|| var("PORTSIDE_PROBE_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()));

// How long to wait for the first stack port to open after the stack start
// command returns.
pub static PORTSIDE_STACK_TIMEOUT: Lazy<Duration> =
    Lazy::new(|| Duration::from_secs(var_u64("PORTSIDE_STACK_TIMEOUT_SECS").unwrap_or(120)));

fn var_path(name: &str) -> Option<PathBuf> {
    var(name).map(PathBuf::from).ok()
}

fn var_u64(name: &str) -> Option<u64> {
    var(name).ok().and_then(|val| val.parse().ok())
}

fn var_log_level(name: &str) -> Option<log::LevelFilter> {
    var(name).ok().and_then(|level| level.parse().ok())
}
