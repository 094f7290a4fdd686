//! Synchronization configuration
//!
//! Defines the tunables of job tracking: where the backend lives, how often
//! the status channel falls back to polling, how long it waits before
//! re-subscribing, and what a launch does while another job is tracked.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// What a launch does while another job is still tracked
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LaunchPolicy {
    /// Stop tracking the previous job (it keeps running remotely)
    #[default]
    RetirePrevious,
    /// Refuse to launch until the tracked job reaches a terminal status
    RejectWhileActive,
}

impl FromStr for LaunchPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "retire" | "retire_previous" => Ok(LaunchPolicy::RetirePrevious),
            "reject" | "reject_while_active" => Ok(LaunchPolicy::RejectWhileActive),
            other => anyhow::bail!("unknown launch policy '{}' (expected retire or reject)", other),
        }
    }
}

impl fmt::Display for LaunchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaunchPolicy::RetirePrevious => f.write_str("retire"),
            LaunchPolicy::RejectWhileActive => f.write_str("reject"),
        }
    }
}

/// Timing of a single status channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Poll when no push arrived for this long; `None` disables polling
    pub poll_interval: Option<Duration>,
    /// Wait between a lost subscription and the next attempt
    pub reconnect_delay: Duration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            poll_interval: Some(Duration::from_secs(1)),
            reconnect_delay: Duration::from_secs(5),
        }
    }
}

/// Job tracking configuration
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Backend base URL (e.g., "http://localhost:8000")
    pub backend_url: String,

    /// Fallback poll interval, `None` when polling is disabled
    pub poll_interval: Option<Duration>,

    /// Delay before re-subscribing after the push feed drops
    pub reconnect_delay: Duration,

    /// Behavior of `launch` while a job is tracked
    pub launch_policy: LaunchPolicy,
}

impl SyncConfig {
    /// Creates a new configuration with defaults
    pub fn new(backend_url: impl Into<String>) -> Self {
        let channel = ChannelConfig::default();
        Self {
            backend_url: backend_url.into(),
            poll_interval: channel.poll_interval,
            reconnect_delay: channel.reconnect_delay,
            launch_policy: LaunchPolicy::default(),
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - TALLY_BACKEND_URL (optional, default: http://localhost:8000)
    /// - TALLY_POLL_INTERVAL_MS (optional, default: 1000, 0 disables polling)
    /// - TALLY_RECONNECT_DELAY_SECS (optional, default: 5)
    /// - TALLY_LAUNCH_POLICY (optional, `retire` or `reject`, default: retire)
    pub fn from_env() -> anyhow::Result<Self> {
        let backend_url =
            std::env::var("TALLY_BACKEND_URL").unwrap_or_else(|_| DEFAULT_BACKEND_URL.to_string());
        let mut config = Self::new(backend_url);

        if let Ok(raw) = std::env::var("TALLY_POLL_INTERVAL_MS") {
            let millis: u64 = raw
                .parse()
                .map_err(|_| anyhow::anyhow!("TALLY_POLL_INTERVAL_MS must be a number, got '{}'", raw))?;
            config.poll_interval = (millis > 0).then(|| Duration::from_millis(millis));
        }

        if let Ok(raw) = std::env::var("TALLY_RECONNECT_DELAY_SECS") {
            let secs: u64 = raw.parse().map_err(|_| {
                anyhow::anyhow!("TALLY_RECONNECT_DELAY_SECS must be a number, got '{}'", raw)
            })?;
            config.reconnect_delay = Duration::from_secs(secs);
        }

        if let Ok(raw) = std::env::var("TALLY_LAUNCH_POLICY") {
            config.launch_policy = raw.parse()?;
        }

        Ok(config)
    }

    pub fn with_poll_interval(mut self, interval: Option<Duration>) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn with_launch_policy(mut self, policy: LaunchPolicy) -> Self {
        self.launch_policy = policy;
        self
    }

    /// Timing handed to each status channel
    pub fn channel_config(&self) -> ChannelConfig {
        ChannelConfig {
            poll_interval: self.poll_interval,
            reconnect_delay: self.reconnect_delay,
        }
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.backend_url.is_empty() {
            anyhow::bail!("backend_url cannot be empty");
        }

        if !self.backend_url.starts_with("http://") && !self.backend_url.starts_with("https://") {
            anyhow::bail!("backend_url must start with http:// or https://");
        }

        if self.poll_interval == Some(Duration::ZERO) {
            anyhow::bail!("poll_interval must be greater than 0 (use None to disable polling)");
        }

        if self.reconnect_delay.is_zero() {
            anyhow::bail!("reconnect_delay must be greater than 0");
        }

        Ok(())
    }
}

const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BACKEND_URL)
    }
}
