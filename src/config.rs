use serde::Deserialize;

use crate::analysis::AverageMode;
use crate::models::{PatientInfo, ReportTemplate};

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub live: LiveConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    pub access: AccessConfig,
    pub relay: RelayConfig,
    pub prediction: PredictionConfig,
    pub monitoring: MonitoringConfig,
    /// Absent: reports fall back to the reduced layout.
    #[serde(default)]
    pub patient: Option<PatientInfo>,
    #[serde(default)]
    pub report_template: ReportTemplate,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    pub max_pool_size: u32,
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
    /// Optional cron expression for VACUUM (e.g. "0 0 3 * * *"). Uses local time.
    #[serde(default)]
    pub vacuum_schedule: Option<String>,
}

fn default_retention_days() -> u32 {
    90
}

#[derive(Debug, Clone, Deserialize)]
pub struct LiveConfig {
    /// Max number of live updates kept in the broadcast channel for /ws/vitals (slow clients may lag).
    pub broadcast_capacity: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_window_days")]
    pub default_window_days: u32,
    #[serde(default)]
    pub average_mode: AverageMode,
}

fn default_window_days() -> u32 {
    7
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            default_window_days: default_window_days(),
            average_mode: AverageMode::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccessConfig {
    pub code: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    pub endpoint: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Used when a send request names no recipient.
    pub default_recipient: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PredictionConfig {
    pub endpoint: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    /// How often to delete readings older than retention_days.
    pub prune_interval_secs: u64,
    /// How often to log app stats (live clients, readings ingested, prune passes) at INFO level.
    pub stats_log_interval_secs: u64,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            !self.database.path.is_empty(),
            "database.path must be non-empty"
        );
        anyhow::ensure!(
            self.database.max_pool_size > 0,
            "database.max_pool_size must be > 0, got {}",
            self.database.max_pool_size
        );
        anyhow::ensure!(
            self.database.retention_days > 0,
            "database.retention_days must be > 0, got {}",
            self.database.retention_days
        );
        if let Some(schedule) = &self.database.vacuum_schedule {
            anyhow::ensure!(
                <cron::Schedule as std::str::FromStr>::from_str(schedule).is_ok(),
                "database.vacuum_schedule is not a valid cron expression: {}",
                schedule
            );
        }
        anyhow::ensure!(
            self.live.broadcast_capacity > 0,
            "live.broadcast_capacity must be > 0, got {}",
            self.live.broadcast_capacity
        );
        anyhow::ensure!(
            self.analysis.default_window_days > 0,
            "analysis.default_window_days must be > 0, got {}",
            self.analysis.default_window_days
        );
        anyhow::ensure!(!self.access.code.is_empty(), "access.code must be non-empty");
        anyhow::ensure!(
            self.relay.endpoint.starts_with("http://") || self.relay.endpoint.starts_with("https://"),
            "relay.endpoint must be an http(s) URL, got {}",
            self.relay.endpoint
        );
        anyhow::ensure!(
            self.relay.timeout_secs > 0,
            "relay.timeout_secs must be > 0, got {}",
            self.relay.timeout_secs
        );
        anyhow::ensure!(
            self.relay.default_recipient.contains('@'),
            "relay.default_recipient must be an email address, got {}",
            self.relay.default_recipient
        );
        anyhow::ensure!(
            self.prediction.endpoint.starts_with("http://")
                || self.prediction.endpoint.starts_with("https://"),
            "prediction.endpoint must be an http(s) URL, got {}",
            self.prediction.endpoint
        );
        anyhow::ensure!(
            self.prediction.timeout_secs > 0,
            "prediction.timeout_secs must be > 0, got {}",
            self.prediction.timeout_secs
        );
        anyhow::ensure!(
            self.monitoring.prune_interval_secs > 0,
            "monitoring.prune_interval_secs must be > 0, got {}",
            self.monitoring.prune_interval_secs
        );
        anyhow::ensure!(
            self.monitoring.stats_log_interval_secs > 0,
            "monitoring.stats_log_interval_secs must be > 0, got {}",
            self.monitoring.stats_log_interval_secs
        );
        if let Some(p) = &self.patient {
            anyhow::ensure!(
                !p.patient_id.is_empty(),
                "patient.patient_id must be non-empty"
            );
        }
        Ok(())
    }
}
