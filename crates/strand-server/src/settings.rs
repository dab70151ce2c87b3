//! Layered server settings with caller-checked expiry.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. Compiled defaults — [`Settings::default()`]
//! 2. JSON file — `--settings <path>` (fields merged over defaults)
//! 3. Environment variables — `STRAND_*` overrides (highest priority)
//!
//! There is no process-wide singleton: the loaded value carries a
//! `loaded_at` timestamp and a TTL, and [`SettingsHandle`] re-reads the
//! file when a caller asks for an expired snapshot. Callers hold an `Arc`
//! snapshot, so a concurrent refresh never mutates values under them.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Deserialize;
use tracing::{info, warn};

/// How long a loaded snapshot stays fresh.
pub const SETTINGS_TTL: Duration = Duration::from_secs(60);

/// Server listen settings.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerSettings {
    /// HTTP listen port.
    pub port: u16,
    /// Maximum concurrent session runs.
    pub max_concurrent_runs: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: 8080,
            max_concurrent_runs: 10,
        }
    }
}

/// Per-session bounds.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionSettings {
    /// Model calls per session before forced termination.
    pub max_iterations: u32,
    /// Wall-clock session deadline, seconds.
    pub session_timeout_secs: u64,
    /// Per-call tool budget, seconds.
    pub tool_timeout_secs: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            session_timeout_secs: 300,
            tool_timeout_secs: 30,
        }
    }
}

/// Model provider settings.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProviderSettings {
    /// Chat-completions base URL.
    pub base_url: String,
    /// API key (usually set via `STRAND_API_KEY`).
    pub api_key: String,
    /// Model ID.
    pub model: String,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            base_url: strand_llm::openai::DEFAULT_BASE_URL.into(),
            api_key: String::new(),
            model: strand_llm::openai::DEFAULT_MODEL.into(),
        }
    }
}

/// The full settings tree plus its load timestamp.
#[derive(Clone, Debug)]
pub struct Settings {
    /// Server section.
    pub server: ServerSettings,
    /// Session section.
    pub session: SessionSettings,
    /// Provider section.
    pub provider: ProviderSettings,
    /// When this snapshot was loaded.
    pub loaded_at: Instant,
}

/// File shape (no timestamp; that is attached at load time).
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SettingsFile {
    server: ServerSettings,
    session: SessionSettings,
    provider: ProviderSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_file_shape(SettingsFile::default())
    }
}

impl Settings {
    fn from_file_shape(file: SettingsFile) -> Self {
        Self {
            server: file.server,
            session: file.session,
            provider: file.provider,
            loaded_at: Instant::now(),
        }
    }

    /// Load settings: defaults ← optional JSON file ← `STRAND_*` env.
    pub fn load(path: Option<&Path>) -> Self {
        let file = match path {
            Some(p) => match std::fs::read_to_string(p) {
                Ok(text) => match serde_json::from_str::<SettingsFile>(&text) {
                    Ok(parsed) => parsed,
                    Err(err) => {
                        warn!(%err, path = %p.display(), "settings file unparsable, using defaults");
                        SettingsFile::default()
                    }
                },
                Err(err) => {
                    warn!(%err, path = %p.display(), "settings file unreadable, using defaults");
                    SettingsFile::default()
                }
            },
            None => SettingsFile::default(),
        };
        let mut settings = Self::from_file_shape(file);
        settings.apply_env();
        settings
    }

    /// Apply `STRAND_*` environment overrides.
    fn apply_env(&mut self) {
        if let Some(port) = env_parse("STRAND_PORT") {
            self.server.port = port;
        }
        if let Some(max) = env_parse("STRAND_MAX_CONCURRENT_RUNS") {
            self.server.max_concurrent_runs = max;
        }
        if let Some(cap) = env_parse("STRAND_MAX_ITERATIONS") {
            self.session.max_iterations = cap;
        }
        if let Some(secs) = env_parse("STRAND_SESSION_TIMEOUT_SECS") {
            self.session.session_timeout_secs = secs;
        }
        if let Some(secs) = env_parse("STRAND_TOOL_TIMEOUT_SECS") {
            self.session.tool_timeout_secs = secs;
        }
        if let Ok(url) = std::env::var("STRAND_BASE_URL") {
            self.provider.base_url = url;
        }
        if let Ok(key) = std::env::var("STRAND_API_KEY") {
            self.provider.api_key = key;
        }
        if let Ok(model) = std::env::var("STRAND_MODEL") {
            self.provider.model = model;
        }
    }

    /// Whether this snapshot is older than the TTL.
    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.loaded_at.elapsed() >= ttl
    }

    /// Session bounds as a runtime config.
    pub fn session_config(&self) -> strand_runtime::SessionConfig {
        strand_runtime::SessionConfig {
            max_iterations: self.session.max_iterations,
            session_timeout: Duration::from_secs(self.session.session_timeout_secs),
            tool_timeout: Duration::from_secs(self.session.tool_timeout_secs),
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

/// Injected settings accessor with TTL refresh.
///
/// Holds the file path it was loaded from; `current()` returns the cached
/// snapshot and re-reads the file once the snapshot expires.
pub struct SettingsHandle {
    path: Option<PathBuf>,
    ttl: Duration,
    cached: Mutex<Arc<Settings>>,
}

impl SettingsHandle {
    /// Load and wrap settings from an optional file path.
    pub fn load(path: Option<PathBuf>, ttl: Duration) -> Self {
        let settings = Settings::load(path.as_deref());
        info!(
            port = settings.server.port,
            max_concurrent = settings.server.max_concurrent_runs,
            "settings loaded"
        );
        Self {
            path,
            ttl,
            cached: Mutex::new(Arc::new(settings)),
        }
    }

    /// Wrap a fixed value (tests and embedded use).
    pub fn fixed(settings: Settings) -> Self {
        Self {
            path: None,
            ttl: Duration::MAX,
            cached: Mutex::new(Arc::new(settings)),
        }
    }

    /// Current snapshot, refreshed from disk if the cached one expired.
    ///
    /// The file read happens outside the lock, so concurrent callers keep
    /// serving the stale snapshot instead of queueing behind IO. Two
    /// callers racing on an expired snapshot may both reload; last write
    /// wins, and both loads see the same file.
    pub fn current(&self) -> Arc<Settings> {
        {
            let cached = self.cached.lock();
            if !cached.is_expired(self.ttl) {
                return Arc::clone(&cached);
            }
        }
        info!("settings snapshot expired, reloading");
        let fresh = Arc::new(Settings::load(self.path.as_deref()));
        *self.cached.lock() = Arc::clone(&fresh);
        fresh
    }
}
