//! Run configuration loaded from TOML files and `HEARTH_*` environment
//! variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use secrecy::SecretString;
use serde::Deserialize;

use crate::error::ConfigError;
use crate::sim::{Phase, PhaseSchedule};

/// Gap between the two fixed data points of the perception gap.
const GAP_CHAOS: f64 = 0.50;
const GAP_BALANCED: f64 = 0.15;

/// How the under-aware adult's misjudgement of the partner's load narrows
/// between the two fixed data points (Chaos and Balanced).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GapPolicy {
    /// Interpolate by phase index; hold the Balanced value afterwards.
    #[default]
    Linear,
    /// Hold the Chaos value until Balanced, then drop.
    Step,
}

impl GapPolicy {
    /// Perception gap during `phase`. Non-increasing in phase under both
    /// policies.
    pub fn gap(self, phase: Phase) -> f64 {
        let balanced = Phase::Balanced.index() as f64;
        let index = phase.index() as f64;
        match self {
            GapPolicy::Linear if phase >= Phase::Balanced => GAP_BALANCED,
            GapPolicy::Linear => GAP_CHAOS + (GAP_BALANCED - GAP_CHAOS) * index / balanced,
            GapPolicy::Step if phase >= Phase::Balanced => GAP_BALANCED,
            GapPolicy::Step => GAP_CHAOS,
        }
    }
}

impl std::str::FromStr for GapPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "linear" => Ok(GapPolicy::Linear),
            "step" => Ok(GapPolicy::Step),
            other => Err(format!(
                "unknown perception gap policy '{other}', expected linear or step"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Rules,
    Remote,
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rules" => Ok(BackendKind::Rules),
            "remote" => Ok(BackendKind::Remote),
            other => Err(format!("unknown backend '{other}', expected rules or remote")),
        }
    }
}

/// Settings for an OpenAI-compatible reasoning endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteBackendConfig {
    pub base_url: String,
    pub model: String,
    #[serde(default, deserialize_with = "deserialize_secret")]
    pub api_key: Option<SecretString>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Bodies larger than this are rejected. Default: 4096.
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: usize,
    /// HTTP-level timeout. Default: "5s".
    #[serde(
        default = "default_backend_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub request_timeout: Duration,
}

/// Which decision backend to use and how long one call may take.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    #[serde(default)]
    pub kind: BackendKind,
    #[serde(default)]
    pub remote: Option<RemoteBackendConfig>,
    /// Per-call bound. Default: "5s".
    #[serde(
        default = "default_backend_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub timeout: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::Rules,
            remote: None,
            timeout: default_backend_timeout(),
        }
    }
}

impl BackendConfig {
    /// Bound on a whole decision as seen by an agent.
    ///
    /// The remote chain gives its rule member room to answer after the
    /// remote call has used up its own `timeout`.
    pub fn decision_timeout(&self) -> Duration {
        match self.kind {
            BackendKind::Rules => self.timeout,
            BackendKind::Remote => self.timeout.saturating_mul(2),
        }
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.kind = parse_optional_env("HEARTH_BACKEND", self.kind)?;
        if let Some(timeout) = optional_env("HEARTH_BACKEND_TIMEOUT")? {
            self.timeout = parse_duration(&timeout).map_err(|message| ConfigError::InvalidValue {
                key: "HEARTH_BACKEND_TIMEOUT".to_string(),
                message,
            })?;
        }

        let base_url = optional_env("HEARTH_REMOTE_URL")?;
        let model = optional_env("HEARTH_REMOTE_MODEL")?;
        let api_key = optional_env("HEARTH_REMOTE_API_KEY")?;
        let max_bytes = optional_env("HEARTH_REMOTE_MAX_RESPONSE_BYTES")?;

        if base_url.is_some() || model.is_some() || api_key.is_some() || max_bytes.is_some() {
            let mut remote = self.remote.clone().unwrap_or_else(|| RemoteBackendConfig {
                base_url: String::new(),
                model: String::new(),
                api_key: None,
                max_tokens: default_max_tokens(),
                max_response_bytes: default_max_response_bytes(),
                request_timeout: self.timeout,
            });
            if let Some(url) = base_url {
                remote.base_url = url;
            }
            if let Some(model) = model {
                remote.model = model;
            }
            if let Some(key) = api_key {
                remote.api_key = Some(SecretString::new(key.into()));
            }
            remote.max_response_bytes = parse_optional_env(
                "HEARTH_REMOTE_MAX_RESPONSE_BYTES",
                remote.max_response_bytes,
            )?;
            self.remote = Some(remote);
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.kind != BackendKind::Remote {
            return Ok(());
        }
        let Some(remote) = &self.remote else {
            return Err(ConfigError::MissingRequired {
                key: "HEARTH_REMOTE_URL".to_string(),
                hint: "The remote backend needs an endpoint URL and a model".to_string(),
            });
        };
        if remote.base_url.is_empty() {
            return Err(ConfigError::MissingRequired {
                key: "HEARTH_REMOTE_URL".to_string(),
                hint: "Set it to an OpenAI-compatible base URL".to_string(),
            });
        }
        if remote.model.is_empty() {
            return Err(ConfigError::MissingRequired {
                key: "HEARTH_REMOTE_MODEL".to_string(),
                hint: "Set it to the model name served at the endpoint".to_string(),
            });
        }
        if remote.max_response_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_response_bytes".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

/// Where write mode sends records.
#[derive(Debug, Clone, Deserialize)]
pub struct SinkConfig {
    /// JSON-lines output file.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Maximum in-flight writes. Default: 8.
    #[serde(default = "default_sink_concurrency")]
    pub concurrency: usize,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            path: None,
            concurrency: default_sink_concurrency(),
        }
    }
}

/// Top-level run configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SimConfig {
    /// First simulated date. Default: 2025-01-01.
    #[serde(default = "default_start_date")]
    pub start_date: NaiveDate,

    /// Number of simulated days. Default: 365.
    #[serde(default = "default_days")]
    pub days: u32,

    /// Throughput hint. Informational only; never changes outcomes.
    #[serde(default = "default_speed")]
    pub speed: f64,

    /// Send records to the sink. Default: false (dry run).
    #[serde(default)]
    pub write_mode: bool,

    /// Per-day progress reporting.
    #[serde(default)]
    pub verbose: bool,

    /// Seed for every random stream in the run. Default: 42.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Identity map file (TOML or JSON) reused across runs.
    #[serde(default)]
    pub identities: Option<PathBuf>,

    /// Event log entries kept in the run result. Default: 50.
    #[serde(default = "default_event_sample_size")]
    pub event_sample_size: usize,

    #[serde(default)]
    pub perception_gap: GapPolicy,

    /// First day of each phase. Default: [0, 60, 90, 180, 270].
    #[serde(default)]
    pub phase_boundaries: PhaseSchedule,

    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub sink: SinkConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            start_date: default_start_date(),
            days: default_days(),
            speed: default_speed(),
            write_mode: false,
            verbose: false,
            seed: default_seed(),
            identities: None,
            event_sample_size: default_event_sample_size(),
            perception_gap: GapPolicy::default(),
            phase_boundaries: PhaseSchedule::default(),
            backend: BackendConfig::default(),
            sink: SinkConfig::default(),
        }
    }
}

impl SimConfig {
    /// Defaults overlaid with `.env` and `HEARTH_*` variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        let mut config = Self::default();
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file, then overlay the environment.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let _ = dotenvy::dotenv();
        let content = std::fs::read_to_string(path)?;
        let mut config: SimConfig =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.start_date = parse_optional_env("HEARTH_START_DATE", self.start_date)?;
        self.days = parse_optional_env("HEARTH_DAYS", self.days)?;
        self.speed = parse_optional_env("HEARTH_SPEED", self.speed)?;
        self.write_mode = parse_optional_env("HEARTH_WRITE_MODE", self.write_mode)?;
        self.verbose = parse_optional_env("HEARTH_VERBOSE", self.verbose)?;
        self.seed = parse_optional_env("HEARTH_SEED", self.seed)?;
        if let Some(path) = optional_env("HEARTH_IDENTITIES")? {
            self.identities = Some(PathBuf::from(path));
        }
        self.event_sample_size =
            parse_optional_env("HEARTH_EVENT_SAMPLE_SIZE", self.event_sample_size)?;
        self.perception_gap = parse_optional_env("HEARTH_PERCEPTION_GAP", self.perception_gap)?;
        if let Some(path) = optional_env("HEARTH_SINK_PATH")? {
            self.sink.path = Some(PathBuf::from(path));
        }
        self.sink.concurrency =
            parse_optional_env("HEARTH_SINK_CONCURRENCY", self.sink.concurrency)?;
        self.backend.apply_env()
    }

    /// Check cross-field constraints. Called by both loaders; call again
    /// after applying CLI overrides.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.days == 0 {
            return Err(ConfigError::InvalidValue {
                key: "days".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if !self.speed.is_finite() || self.speed <= 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "speed".to_string(),
                message: format!("must be a positive number, got {}", self.speed),
            });
        }
        if self.sink.concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                key: "sink.concurrency".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.write_mode && self.sink.path.is_none() {
            return Err(ConfigError::MissingRequired {
                key: "sink.path".to_string(),
                hint: "Write mode needs an output file (--write FILE or HEARTH_SINK_PATH)"
                    .to_string(),
            });
        }
        self.backend.validate()
    }
}

fn default_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or(NaiveDate::MIN)
}

fn default_days() -> u32 {
    365
}

fn default_speed() -> f64 {
    1.0
}

fn default_seed() -> u64 {
    42
}

fn default_event_sample_size() -> usize {
    50
}

fn default_backend_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_max_tokens() -> u32 {
    256
}

fn default_max_response_bytes() -> usize {
    4096
}

fn default_sink_concurrency() -> usize {
    8
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value
        .filter(|s| !s.is_empty())
        .map(|s| SecretString::new(s.into())))
}

/// Deserialize a duration from a string like "300ms", "5s" or "2m".
fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_duration(&s).map_err(serde::de::Error::custom)
}

pub(crate) fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if let Some(ms) = s.strip_suffix("ms") {
        ms.trim()
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|e| format!("invalid milliseconds: {e}"))
    } else if let Some(secs) = s.strip_suffix('s') {
        secs.trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| format!("invalid seconds: {e}"))
    } else if let Some(mins) = s.strip_suffix('m') {
        let mins = mins
            .trim()
            .parse::<u64>()
            .map_err(|e| format!("invalid minutes: {e}"))?;
        mins.checked_mul(60)
            .map(Duration::from_secs)
            .ok_or_else(|| format!("{mins} minutes is out of range"))
    } else {
        // Assume seconds if no suffix
        s.parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| format!("invalid duration '{s}': {e}"))
    }
}

pub(crate) fn optional_env(key: &str) -> Result<Option<String>, ConfigError> {
    match std::env::var(key) {
        Ok(val) if val.is_empty() => Ok(None),
        Ok(val) => Ok(Some(val)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(ConfigError::ParseError(format!(
            "failed to read {key}: {e}"
        ))),
    }
}

pub(crate) fn parse_optional_env<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    optional_env(key)?
        .map(|s| {
            s.parse().map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("{e}"),
            })
        })
        .transpose()
        .map(|opt| opt.unwrap_or(default))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Env vars are process-global, so serialize tests that mutate them.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn optional_env_returns_none_for_empty_string() {
        let _lock = ENV_LOCK.lock();
        unsafe { std::env::set_var("_TEST_HEARTH_EMPTY", "") };
        assert!(optional_env("_TEST_HEARTH_EMPTY").unwrap().is_none());
        unsafe { std::env::remove_var("_TEST_HEARTH_EMPTY") };
    }

    #[test]
    fn parse_optional_env_returns_default_when_missing() {
        let _lock = ENV_LOCK.lock();
        unsafe { std::env::remove_var("_TEST_HEARTH_MISSING") };
        let result: u32 = parse_optional_env("_TEST_HEARTH_MISSING", 365).unwrap();
        assert_eq!(result, 365);
    }

    #[test]
    fn parse_optional_env_returns_error_for_invalid_value() {
        let _lock = ENV_LOCK.lock();
        unsafe { std::env::set_var("_TEST_HEARTH_BAD", "many") };
        let result: Result<u32, _> = parse_optional_env("_TEST_HEARTH_BAD", 0);
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
        unsafe { std::env::remove_var("_TEST_HEARTH_BAD") };
    }

    #[test]
    fn defaults_match_documented_values() {
        let c = SimConfig::default();
        assert_eq!(c.start_date, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert_eq!(c.days, 365);
        assert_eq!(c.seed, 42);
        assert!(!c.write_mode);
        assert_eq!(c.event_sample_size, 50);
        assert_eq!(c.backend.timeout, Duration::from_secs(5));
        assert_eq!(c.sink.concurrency, 8);
        assert_eq!(c.phase_boundaries.starts(), [0, 60, 90, 180, 270]);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn from_file_reads_toml_with_defaults() {
        let _lock = ENV_LOCK.lock();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hearth.toml");
        std::fs::write(
            &path,
            r#"
start_date = "2024-09-01"
days = 30
seed = 7
perception_gap = "step"
phase_boundaries = [0, 10, 15, 20, 25]

[backend]
kind = "remote"
timeout = "750ms"

[backend.remote]
base_url = "http://localhost:11434/v1"
model = "llama3"
"#,
        )
        .unwrap();

        let c = SimConfig::from_file(&path).unwrap();
        assert_eq!(c.days, 30);
        assert_eq!(c.seed, 7);
        assert_eq!(c.perception_gap, GapPolicy::Step);
        assert_eq!(c.phase_boundaries.start_of(Phase::Balanced), 20);
        assert_eq!(c.backend.kind, BackendKind::Remote);
        assert_eq!(c.backend.timeout, Duration::from_millis(750));
        let remote = c.backend.remote.unwrap();
        assert_eq!(remote.max_response_bytes, 4096);
        assert!(remote.api_key.is_none());
        assert_eq!(c.event_sample_size, 50);
    }

    #[test]
    fn huge_minute_durations_are_rejected() {
        assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
        let err = parse_duration(&format!("{}m", u64::MAX)).unwrap_err();
        assert!(err.contains("out of range"), "{err}");
    }

    #[test]
    fn remote_decisions_get_room_for_the_rule_fallback() {
        let mut c = BackendConfig::default();
        assert_eq!(c.decision_timeout(), Duration::from_secs(5));
        c.kind = BackendKind::Remote;
        assert_eq!(c.decision_timeout(), Duration::from_secs(10));
        assert!(c.decision_timeout() > c.timeout);
    }

    #[test]
    fn from_file_rejects_bad_schedule() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "phase_boundaries = [5, 10, 15, 20, 25]\n").unwrap();
        assert!(matches!(
            SimConfig::from_file(&path),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn missing_file_is_not_found() {
        assert!(matches!(
            SimConfig::from_file(Path::new("/nonexistent/hearth.toml")),
            Err(ConfigError::NotFound { .. })
        ));
    }

    #[test]
    fn validation_catches_bad_values() {
        let mut c = SimConfig {
            days: 0,
            ..SimConfig::default()
        };
        assert!(c.validate().is_err());
        c.days = 10;
        c.write_mode = true;
        assert!(matches!(c.validate(), Err(ConfigError::MissingRequired { .. })));
        c.sink.path = Some(PathBuf::from("out.jsonl"));
        assert!(c.validate().is_ok());
        c.backend.kind = BackendKind::Remote;
        assert!(c.validate().is_err());
    }

    #[test]
    fn perception_gap_policies() {
        let linear: Vec<f64> = Phase::ALL.iter().map(|p| GapPolicy::Linear.gap(*p)).collect();
        assert_eq!(linear[0], 0.50);
        assert!((linear[1] - 0.3833).abs() < 1e-3);
        assert!((linear[2] - 0.2667).abs() < 1e-3);
        assert_eq!(linear[3], 0.15);
        assert_eq!(linear[4], 0.15);

        let step: Vec<f64> = Phase::ALL.iter().map(|p| GapPolicy::Step.gap(*p)).collect();
        assert_eq!(step, vec![0.5, 0.5, 0.5, 0.15, 0.15]);

        for gaps in [linear, step] {
            assert!(gaps.windows(2).all(|w| w[1] <= w[0]));
        }
    }

    #[test]
    fn parse_duration_suffixes() {
        assert_eq!(parse_duration("5s").unwrap(), Duration::from_secs(5));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
        assert!(parse_duration("soon").is_err());
    }
}
