//! Centralized configuration for Cadence.
//!
//! All tunable parameters live here to avoid hard-coded values scattered
//! through the viewer and playback code. Supports environment variable
//! overrides for runtime customization.

use std::time::Duration;

/// Central configuration for all Cadence components.
#[derive(Debug, Clone, Default)]
pub struct CadenceConfig {
    pub api: ApiConfig,
    pub stream: StreamConfig,
    pub playback: PlaybackConfig,
    pub viewer: ViewerConfig,
}

/// Platform API access configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL of the hosted course store.
    pub base_url: String,
    /// Per-request timeout for catalog reads and the completion write.
    pub request_timeout: Duration,
    /// User agent for HTTP requests.
    pub user_agent: &'static str,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.cadence.fit".to_string(),
            request_timeout: Duration::from_secs(10),
            user_agent: "cadence/0.1.0",
        }
    }
}

/// Stream delivery configuration.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Host serving adaptive-stream manifests; every playback reference
    /// normalizes to `https://<stream_host>/<id>.m3u8`.
    pub stream_host: String,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            stream_host: "stream.cadence.fit".to_string(),
        }
    }
}

/// Playback session recovery policy.
#[derive(Debug, Clone)]
pub struct PlaybackConfig {
    /// Manifest reload attempts after a fatal network error.
    pub network_reload_limit: u32,
    /// Internal recovery attempts after a fatal media error.
    pub media_recovery_limit: u32,
    /// How long a stream load may take before it counts as expired.
    pub load_timeout: Duration,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            network_reload_limit: 1,
            media_recovery_limit: 1,
            load_timeout: Duration::from_secs(20),
        }
    }
}

/// Viewer orchestration timing.
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    /// Fallback that skips the teaser when the intro never starts loading.
    pub teaser_start_timeout: Duration,
    /// Safety bound on loading purchase and course records; on expiry the
    /// viewer force-exits to an empty state instead of hanging.
    pub course_load_timeout: Duration,
    /// How often the completed-set is reconciled against the remote record.
    pub reconcile_interval: Duration,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            teaser_start_timeout: Duration::from_secs(4),
            course_load_timeout: Duration::from_secs(15),
            reconcile_interval: Duration::from_secs(300), // 5 minutes
        }
    }
}

impl CadenceConfig {
    /// Creates configuration with environment variable overrides.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(base_url) = std::env::var("CADENCE_API_BASE_URL") {
            if !base_url.is_empty() {
                config.api.base_url = base_url;
            }
        }

        if let Ok(host) = std::env::var("CADENCE_STREAM_HOST") {
            if !host.is_empty() {
                config.stream.stream_host = host;
            }
        }

        if let Ok(timeout) = std::env::var("CADENCE_COURSE_LOAD_TIMEOUT_SECS") {
            if let Ok(seconds) = timeout.parse::<u64>() {
                config.viewer.course_load_timeout = Duration::from_secs(seconds);
            }
        }

        if let Ok(interval) = std::env::var("CADENCE_RECONCILE_INTERVAL_SECS") {
            if let Ok(seconds) = interval.parse::<u64>() {
                config.viewer.reconcile_interval = Duration::from_secs(seconds);
            }
        }

        config
    }

    /// Creates a configuration with timing bounds tightened for tests.
    pub fn for_testing() -> Self {
        Self {
            viewer: ViewerConfig {
                teaser_start_timeout: Duration::from_millis(50),
                course_load_timeout: Duration::from_millis(200),
                reconcile_interval: Duration::from_millis(50),
            },
            playback: PlaybackConfig {
                load_timeout: Duration::from_millis(200),
                ..PlaybackConfig::default()
            },
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let config = CadenceConfig::default();

        assert_eq!(config.api.user_agent, "cadence/0.1.0");
        assert_eq!(config.stream.stream_host, "stream.cadence.fit");
        assert_eq!(config.playback.network_reload_limit, 1);
        assert_eq!(config.playback.media_recovery_limit, 1);
        assert_eq!(config.viewer.reconcile_interval, Duration::from_secs(300));
    }

    #[test]
    fn test_testing_preset_tightens_timing() {
        let config = CadenceConfig::for_testing();

        assert!(config.viewer.course_load_timeout < Duration::from_secs(1));
        assert!(config.viewer.teaser_start_timeout < Duration::from_secs(1));
        // Recovery budgets stay at production values.
        assert_eq!(config.playback.network_reload_limit, 1);
    }

    #[test]
    fn test_env_override() {
        unsafe {
            std::env::set_var("CADENCE_STREAM_HOST", "stream.test.local");
            std::env::set_var("CADENCE_RECONCILE_INTERVAL_SECS", "30");
        }

        let config = CadenceConfig::from_env();

        assert_eq!(config.stream.stream_host, "stream.test.local");
        assert_eq!(config.viewer.reconcile_interval, Duration::from_secs(30));

        // Cleanup
        unsafe {
            std::env::remove_var("CADENCE_STREAM_HOST");
            std::env::remove_var("CADENCE_RECONCILE_INTERVAL_SECS");
        }
    }
}
