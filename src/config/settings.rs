use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::analyzers::{
    AnomalyConfig, BottleneckThresholds, CostConfig, HealthConfig, PredictionConfig,
    SecurityConfig,
};
use crate::metrics::history::DEFAULT_HISTORY_CAPACITY;
use crate::utils::error::{AnalyticsError, Result};

/// Main configuration for the analytics engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Scheduling and timeouts
    pub engine: EngineSettings,
    /// Rolling history
    pub history: HistorySettings,
    /// Anomaly detector
    pub anomaly: AnomalyConfig,
    /// Performance predictor
    pub prediction: PredictionConfig,
    /// Bottleneck rules
    pub bottleneck: BottleneckThresholds,
    /// Cost targets and rates
    pub cost: CostConfig,
    /// Security rules
    pub security: SecurityConfig,
    /// Health score deductions
    pub health: HealthConfig,
}

/// Scheduling and timeout settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Time between cycles in milliseconds
    pub cycle_interval_ms: u64,
    /// Budget for the collector in milliseconds
    pub collector_timeout_ms: u64,
    /// Budget for each analyzer in milliseconds
    pub analyzer_timeout_ms: u64,
}

/// Rolling history settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySettings {
    /// Rows kept per category
    pub capacity: usize,
    /// Default look-back window for queries in seconds
    pub query_window_secs: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            cycle_interval_ms: 30_000,
            collector_timeout_ms: 10_000,
            analyzer_timeout_ms: 5_000,
        }
    }
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_HISTORY_CAPACITY,
            query_window_secs: 60 * 60,
        }
    }
}

impl EngineSettings {
    pub fn cycle_interval(&self) -> Duration {
        Duration::from_millis(self.cycle_interval_ms)
    }

    pub fn collector_timeout(&self) -> Duration {
        Duration::from_millis(self.collector_timeout_ms)
    }

    pub fn analyzer_timeout(&self) -> Duration {
        Duration::from_millis(self.analyzer_timeout_ms)
    }
}

impl HistorySettings {
    pub fn query_window(&self) -> Duration {
        Duration::from_secs(self.query_window_secs)
    }
}

impl EngineConfig {
    /// Set the time between cycles
    pub fn with_cycle_interval(mut self, interval: Duration) -> Self {
        self.engine.cycle_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Set the per-analyzer timeout
    pub fn with_analyzer_timeout(mut self, timeout: Duration) -> Self {
        self.engine.analyzer_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the collector timeout
    pub fn with_collector_timeout(mut self, timeout: Duration) -> Self {
        self.engine.collector_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the number of history rows kept per category
    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history.capacity = capacity;
        self
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: Into<PathBuf>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.into())?;
        let config: EngineConfig = toml::from_str(&content)
            .map_err(|e| AnalyticsError::config(format!("Failed to parse config file: {}", e)))?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: Into<PathBuf>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| AnalyticsError::config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path.into(), content)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.engine.cycle_interval_ms == 0 {
            return Err(AnalyticsError::config("cycle_interval_ms must be greater than 0"));
        }
        if self.engine.collector_timeout_ms == 0 {
            return Err(AnalyticsError::config("collector_timeout_ms must be greater than 0"));
        }
        if self.engine.analyzer_timeout_ms == 0 {
            return Err(AnalyticsError::config("analyzer_timeout_ms must be greater than 0"));
        }
        if self.history.capacity == 0 {
            return Err(AnalyticsError::config("history capacity must be greater than 0"));
        }
        if self.history.query_window_secs == 0 {
            return Err(AnalyticsError::config("query_window_secs must be greater than 0"));
        }

        if self.anomaly.volatility_window < 2 {
            return Err(AnalyticsError::config("volatility_window must be at least 2"));
        }
        for bound in &self.anomaly.thresholds {
            check_threshold(&format!("anomaly.{}.max", bound.metric), bound.max)?;
            check_threshold(&format!("anomaly.{}.volatility", bound.metric), bound.volatility)?;
        }

        let p = &self.prediction;
        check_threshold("prediction.scaling_threshold", p.scaling_threshold)?;
        if !(p.target_utilization > 0.0 && p.target_utilization <= 1.0) {
            return Err(AnalyticsError::config(
                "prediction.target_utilization must be in (0.0, 1.0]",
            ));
        }
        if !(p.alpha > 0.0 && p.alpha <= 1.0) || !(p.beta > 0.0 && p.beta <= 1.0) {
            return Err(AnalyticsError::config(
                "prediction.alpha and prediction.beta must be in (0.0, 1.0]",
            ));
        }
        if p.trend_window < 4 {
            return Err(AnalyticsError::config("prediction.trend_window must be at least 4"));
        }
        if p.season_length == 0 {
            return Err(AnalyticsError::config("prediction.season_length must be greater than 0"));
        }
        check_threshold("prediction.stable_band_percent", p.stable_band_percent)?;

        let b = &self.bottleneck;
        for (name, value) in [
            ("cpu_critical", b.cpu_critical),
            ("memory_critical", b.memory_critical),
            ("disk_critical", b.disk_critical),
            ("response_time_warning", b.response_time_warning),
            ("error_rate_warning", b.error_rate_warning),
            ("query_time_warning", b.query_time_warning),
            ("lock_wait_warning", b.lock_wait_warning),
            ("queue_length_warning", b.queue_length_warning),
            ("circuit_breaker_warning", b.circuit_breaker_warning),
            ("connection_pool_info", b.connection_pool_info),
            ("cache_hit_rate_info", b.cache_hit_rate_info),
        ] {
            check_threshold(&format!("bottleneck.{}", name), value)?;
        }

        for target in &self.cost.targets {
            if target.resource.trim().is_empty() {
                return Err(AnalyticsError::config("cost target resource must not be empty"));
            }
            if !target.metric.is_percentage() {
                return Err(AnalyticsError::config(format!(
                    "cost target {} must use a percentage metric, got {}",
                    target.resource, target.metric
                )));
            }
            if !(0.0..=100.0).contains(&target.target_utilization) {
                return Err(AnalyticsError::config(format!(
                    "cost target {} utilization must be between 0 and 100",
                    target.resource
                )));
            }
            check_threshold(&format!("cost.{}.rate", target.resource), target.rate)?;
        }

        let s = &self.security;
        for (name, value) in [
            ("rate_limit_threshold", s.rate_limit_threshold),
            ("rate_limit_weight", s.rate_limit_weight),
            ("error_spike_threshold", s.error_spike_threshold),
            ("error_spike_weight", s.error_spike_weight),
        ] {
            check_threshold(&format!("security.{}", name), value)?;
        }

        let h = &self.health;
        for (name, value) in [
            ("cpu_threshold", h.cpu_threshold),
            ("cpu_penalty", h.cpu_penalty),
            ("memory_threshold", h.memory_threshold),
            ("memory_penalty", h.memory_penalty),
            ("error_rate_threshold", h.error_rate_threshold),
            ("error_rate_penalty", h.error_rate_penalty),
            ("response_time_threshold", h.response_time_threshold),
            ("response_time_penalty", h.response_time_penalty),
            ("anomaly_penalty", h.anomaly_penalty),
            ("critical_penalty", h.critical_penalty),
            ("warning_penalty", h.warning_penalty),
        ] {
            check_threshold(&format!("health.{}", name), value)?;
        }

        Ok(())
    }
}

fn check_threshold(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(AnalyticsError::config(format!(
            "{} must be a non-negative number, got {}",
            name, value
        )));
    }
    Ok(())
}
