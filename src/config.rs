//! Runtime settings read from the environment.
//!
//! Every knob has a default; malformed values fall back to it silently.

use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

fn parse_env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

fn parse_env_f64(name: &str, default: f64) -> f64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(default)
}

fn parse_env_path(name: &str) -> Option<PathBuf> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

static DEBUG_ENABLED: OnceLock<bool> = OnceLock::new();

/// `TICKET_QR_DEBUG` set to anything turns on verbose logging
pub fn debug_enabled() -> bool {
    *DEBUG_ENABLED.get_or_init(|| std::env::var("TICKET_QR_DEBUG").is_ok())
}

/// Service settings, constructed once at startup and passed to the services
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// How long to wait for the standards encoder to become ready
    pub library_timeout: Duration,
    /// Poll period while waiting for the encoder
    pub library_poll: Duration,
    /// Scanner tick period
    pub scan_interval: Duration,
    /// Per-tick detection probability of the simulated decoder
    pub detection_rate: f64,
    /// Optional JSON file replacing the built-in event catalog
    pub events_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            library_timeout: Duration::from_millis(10_000),
            library_poll: Duration::from_millis(100),
            scan_interval: Duration::from_millis(500),
            detection_rate: 0.05,
            events_file: None,
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            library_timeout: Duration::from_millis(parse_env_u64(
                "TICKET_QR_LIBRARY_TIMEOUT_MS",
                defaults.library_timeout.as_millis() as u64,
            )),
            library_poll: Duration::from_millis(
                parse_env_u64(
                    "TICKET_QR_LIBRARY_POLL_MS",
                    defaults.library_poll.as_millis() as u64,
                )
                .max(1),
            ),
            scan_interval: Duration::from_millis(
                parse_env_u64(
                    "TICKET_QR_SCAN_INTERVAL_MS",
                    defaults.scan_interval.as_millis() as u64,
                )
                .max(1),
            ),
            detection_rate: parse_env_f64("TICKET_QR_DETECTION_RATE", defaults.detection_rate)
                .clamp(0.0, 1.0),
            events_file: parse_env_path("TICKET_QR_EVENTS_FILE"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.library_timeout, Duration::from_secs(10));
        assert_eq!(s.scan_interval, Duration::from_millis(500));
        assert!((s.detection_rate - 0.05).abs() < f64::EPSILON);
        assert!(s.events_file.is_none());
    }

    #[test]
    fn test_malformed_values_fall_back() {
        assert_eq!(parse_env_u64("TICKET_QR_TEST_UNSET_VARIABLE", 42), 42);
        assert_eq!(parse_env_f64("TICKET_QR_TEST_UNSET_VARIABLE", 0.5), 0.5);
        assert!(parse_env_path("TICKET_QR_TEST_UNSET_VARIABLE").is_none());
    }
}
