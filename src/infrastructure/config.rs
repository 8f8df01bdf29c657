use crate::application::feed_controller::{
    DEFAULT_BACKFILL, DEFAULT_CONNECT_TIMEOUT, DEFAULT_FALLBACK_DELAY, DEFAULT_TICK, FeedOptions,
};
use crate::domain::buffer::DEFAULT_CAPACITY;
use serde::Deserialize;
use std::time::Duration;

/// Feed endpoint baked in at compile time, if any.
pub const BUILD_DEFAULT_FEED_URL: Option<&str> = option_env!("TURBINE_DEFAULT_FEED_URL");

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub feed: FeedSettings,
    #[serde(default)]
    pub buffer: BufferSettings,
    #[serde(default)]
    pub timing: TimingSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_bind")]
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FeedSettings {
    #[serde(default = "default_feed_url")]
    pub default_url: Option<String>,
    #[serde(default = "default_state_file")]
    pub state_file: String,
    /// Fixed seed for reproducible demo data; entropy when unset.
    #[serde(default)]
    pub synthetic_seed: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BufferSettings {
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    #[serde(default = "default_backfill")]
    pub backfill: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TimingSettings {
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    #[serde(default = "default_fallback_delay_ms")]
    pub fallback_delay_ms: u64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_feed_url() -> Option<String> {
    BUILD_DEFAULT_FEED_URL.map(str::to_string)
}

fn default_state_file() -> String {
    "state/feed_target.json".to_string()
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

fn default_backfill() -> usize {
    DEFAULT_BACKFILL
}

fn default_tick_ms() -> u64 {
    DEFAULT_TICK.as_millis() as u64
}

fn default_fallback_delay_ms() -> u64 {
    DEFAULT_FALLBACK_DELAY.as_millis() as u64
}

fn default_connect_timeout_ms() -> u64 {
    DEFAULT_CONNECT_TIMEOUT.as_millis() as u64
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            default_url: default_feed_url(),
            state_file: default_state_file(),
            synthetic_seed: None,
        }
    }
}

impl Default for BufferSettings {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            backfill: default_backfill(),
        }
    }
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            fallback_delay_ms: default_fallback_delay_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.buffer.capacity == 0 {
            anyhow::bail!("buffer.capacity must be at least 1");
        }
        if self.buffer.backfill > self.buffer.capacity {
            anyhow::bail!(
                "buffer.backfill ({}) exceeds buffer.capacity ({})",
                self.buffer.backfill,
                self.buffer.capacity
            );
        }
        if self.timing.tick_ms == 0 {
            anyhow::bail!("timing.tick_ms must be positive");
        }
        if self.timing.connect_timeout_ms == 0 {
            anyhow::bail!("timing.connect_timeout_ms must be positive");
        }
        Ok(())
    }

    pub fn feed_options(&self) -> FeedOptions {
        FeedOptions {
            capacity: self.buffer.capacity,
            backfill: self.buffer.backfill,
            tick: Duration::from_millis(self.timing.tick_ms),
            fallback_delay: Duration::from_millis(self.timing.fallback_delay_ms),
            connect_timeout: Duration::from_millis(self.timing.connect_timeout_ms),
        }
    }
}

/// Load settings from an optional file, overridden by `TURBINE_*` variables
/// (e.g. `TURBINE_BUFFER__CAPACITY=240`).
pub fn load_settings(path: &str) -> anyhow::Result<Settings> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name(path).required(false))
        .add_source(
            config::Environment::with_prefix("TURBINE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let settings: Settings = settings.try_deserialize()?;
    settings.validate()?;
    Ok(settings)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetSource {
    /// Given on the command line or environment; counts as user-entered.
    Explicit,
    Saved,
    BuildDefault,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitialTarget {
    pub url: String,
    pub source: TargetSource,
}

/// Pick the startup feed: explicit override, then the saved URL, then the
/// build default. `None` means start in demo mode.
pub fn resolve_initial_target(
    explicit: Option<&str>,
    saved: Option<&str>,
    build_default: Option<&str>,
) -> Option<InitialTarget> {
    [
        (explicit, TargetSource::Explicit),
        (saved, TargetSource::Saved),
        (build_default, TargetSource::BuildDefault),
    ]
    .into_iter()
    .filter_map(|(url, source)| url.map(|url| (url.trim(), source)))
    .find(|(url, _)| !url.is_empty())
    .map(|(url, source)| InitialTarget {
        url: url.to_string(),
        source,
    })
}
