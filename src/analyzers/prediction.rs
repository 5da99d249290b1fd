// Performance prediction: load forecasts, scaling need, trends and capacity

use crate::metrics::{MetricKey, MetricsHistory};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

const HOUR: Duration = Duration::from_secs(60 * 60);

/// Pluggable forecasting strategy over an evenly spaced series
pub trait ForecastModel: Send + Sync + fmt::Debug {
    /// Model name, reported alongside the predictions
    fn name(&self) -> &str;

    /// Estimate the value `steps_ahead` samples past the end of `series`.
    /// Returns `None` when the series is too short to say anything.
    fn forecast(&self, series: &[f64], steps_ahead: usize) -> Option<f64>;
}

/// Which built-in forecast model to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastStrategy {
    Linear,
    Holt,
    SeasonalNaive,
}

/// Least-squares straight line through the whole series
#[derive(Debug, Clone, Default)]
pub struct LinearTrend;

impl ForecastModel for LinearTrend {
    fn name(&self) -> &str {
        "linear"
    }

    fn forecast(&self, series: &[f64], steps_ahead: usize) -> Option<f64> {
        let (slope, intercept) = least_squares(series)?;
        let x = (series.len() - 1 + steps_ahead) as f64;
        Some(intercept + slope * x)
    }
}

/// Double exponential smoothing (level + trend)
#[derive(Debug, Clone)]
pub struct HoltSmoothing {
    alpha: f64,
    beta: f64,
}

impl HoltSmoothing {
    pub fn new(alpha: f64, beta: f64) -> Self {
        Self { alpha, beta }
    }
}

impl ForecastModel for HoltSmoothing {
    fn name(&self) -> &str {
        "holt"
    }

    fn forecast(&self, series: &[f64], steps_ahead: usize) -> Option<f64> {
        let (&first, rest) = series.split_first()?;
        let mut level = first;
        let mut trend = rest.first().map_or(0.0, |second| second - first);

        for &value in rest {
            let previous_level = level;
            level = self.alpha * value + (1.0 - self.alpha) * (level + trend);
            trend = self.beta * (level - previous_level) + (1.0 - self.beta) * trend;
        }

        Some(level + steps_ahead as f64 * trend)
    }
}

/// Repeats the value observed one season earlier
#[derive(Debug, Clone)]
pub struct SeasonalNaive {
    season_length: usize,
}

impl SeasonalNaive {
    pub fn new(season_length: usize) -> Self {
        Self {
            season_length: season_length.max(1),
        }
    }
}

impl ForecastModel for SeasonalNaive {
    fn name(&self) -> &str {
        "seasonal_naive"
    }

    fn forecast(&self, series: &[f64], steps_ahead: usize) -> Option<f64> {
        let last = *series.last()?;
        let m = self.season_length;
        if series.len() < m {
            return Some(last);
        }
        let offset = (steps_ahead.max(1) - 1) % m;
        series.get(series.len() - m + offset).copied()
    }
}

/// Direction of a metric trend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Improving,
    Stable,
    Degrading,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricTrend {
    pub metric: MetricKey,
    pub direction: TrendDirection,
    pub percent_change: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScalingTimeline {
    pub within_1h: bool,
    pub within_6h: bool,
    pub within_24h: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CapacityForecast {
    /// Latest load (percentage)
    pub current_utilization: f64,
    /// Highest load expected over the next day (percentage)
    pub forecasted_peak: f64,
    /// Capacity needed to keep the peak at target utilization, as a percentage of today's
    pub recommended_capacity: f64,
    /// Seconds until load reaches 100% at the current slope, if rising
    pub time_to_exhaustion_secs: Option<u64>,
}

/// Output of the performance predictor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predictions {
    pub model: String,
    pub next_hour_load: f64,
    pub next_day_load: f64,
    pub scaling_needed: bool,
    pub scaling_timeline: ScalingTimeline,
    pub trends: Vec<MetricTrend>,
    pub capacity_forecast: CapacityForecast,
}

/// Predictor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictionConfig {
    pub strategy: ForecastStrategy,
    /// Load above which scaling is needed (percentage)
    pub scaling_threshold: f64,
    /// Utilization the recommended capacity aims for (0.0 to 1.0)
    pub target_utilization: f64,
    /// Number of recent values compared for trends
    pub trend_window: usize,
    /// Percent change treated as stable
    pub stable_band_percent: f64,
    /// Holt level smoothing factor
    pub alpha: f64,
    /// Holt trend smoothing factor
    pub beta: f64,
    /// Samples per season for the seasonal model
    pub season_length: usize,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            strategy: ForecastStrategy::Holt,
            scaling_threshold: 80.0,
            target_utilization: 0.7,
            trend_window: 20,
            stable_band_percent: 5.0,
            alpha: 0.5,
            beta: 0.3,
            // One hour at the default 30s cycle
            season_length: 120,
        }
    }
}

/// Forecasts near-term load and scaling need from history
#[derive(Debug, Clone)]
pub struct PerformancePredictor {
    config: PredictionConfig,
    sample_interval: Duration,
    model: Arc<dyn ForecastModel>,
}

impl PerformancePredictor {
    /// `sample_interval` is the spacing between history rows, i.e. the cycle interval
    pub fn new(config: PredictionConfig, sample_interval: Duration) -> Self {
        let model: Arc<dyn ForecastModel> = match config.strategy {
            ForecastStrategy::Linear => Arc::new(LinearTrend),
            ForecastStrategy::Holt => Arc::new(HoltSmoothing::new(config.alpha, config.beta)),
            ForecastStrategy::SeasonalNaive => Arc::new(SeasonalNaive::new(config.season_length)),
        };
        Self::with_model(config, sample_interval, model)
    }

    /// Use a custom forecast model instead of the configured strategy
    pub fn with_model(
        config: PredictionConfig,
        sample_interval: Duration,
        model: Arc<dyn ForecastModel>,
    ) -> Self {
        Self {
            config,
            sample_interval: sample_interval.max(Duration::from_millis(1)),
            model,
        }
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    pub fn predict(&self, history: &MetricsHistory) -> Predictions {
        let load = history.series(MetricKey::CpuUsage, history.capacity());
        let Some(&current) = load.last() else {
            return Predictions {
                model: self.model.name().to_string(),
                next_hour_load: 0.0,
                next_day_load: 0.0,
                scaling_needed: false,
                scaling_timeline: ScalingTimeline::default(),
                trends: Vec::new(),
                capacity_forecast: CapacityForecast::default(),
            };
        };

        let next_hour_load = self.load_in(&load, HOUR, current);
        let six_hour_load = self.load_in(&load, HOUR * 6, current);
        let next_day_load = self.load_in(&load, HOUR * 24, current);

        let threshold = self.config.scaling_threshold;
        let scaling_needed = next_hour_load > threshold;
        let scaling_timeline = ScalingTimeline {
            within_1h: scaling_needed,
            within_6h: next_hour_load.max(six_hour_load) > threshold,
            within_24h: next_hour_load.max(six_hour_load).max(next_day_load) > threshold,
        };

        let forecasted_peak = current
            .max(next_hour_load)
            .max(six_hour_load)
            .max(next_day_load);

        Predictions {
            model: self.model.name().to_string(),
            next_hour_load,
            next_day_load,
            scaling_needed,
            scaling_timeline,
            trends: self.trends(history),
            capacity_forecast: CapacityForecast {
                current_utilization: current,
                forecasted_peak,
                recommended_capacity: forecasted_peak / self.config.target_utilization,
                time_to_exhaustion_secs: self.time_to_exhaustion(&load, current),
            },
        }
    }

    fn steps(&self, horizon: Duration) -> usize {
        let steps = horizon.as_millis() / self.sample_interval.as_millis().max(1);
        (steps as usize).max(1)
    }

    fn load_in(&self, load: &[f64], horizon: Duration, current: f64) -> f64 {
        let forecast = self
            .model
            .forecast(load, self.steps(horizon))
            .filter(|value| value.is_finite())
            .unwrap_or(current);
        forecast.clamp(0.0, 100.0)
    }

    fn trends(&self, history: &MetricsHistory) -> Vec<MetricTrend> {
        MetricKey::ALL
            .iter()
            .filter_map(|&metric| {
                let values = history.series(metric, self.config.trend_window);
                if values.len() < 4 {
                    return None;
                }
                let (older, newer) = values.split_at(values.len() / 2);
                let older_mean = mean(older);
                let newer_mean = mean(newer);

                let percent_change = if older_mean.abs() < f64::EPSILON {
                    if newer_mean.abs() < f64::EPSILON {
                        0.0
                    } else {
                        100.0
                    }
                } else {
                    (newer_mean - older_mean) / older_mean * 100.0
                };

                let direction = if percent_change.abs() < self.config.stable_band_percent {
                    TrendDirection::Stable
                } else if (percent_change > 0.0) == metric.higher_is_better() {
                    TrendDirection::Improving
                } else {
                    TrendDirection::Degrading
                };

                Some(MetricTrend {
                    metric,
                    direction,
                    percent_change,
                })
            })
            .collect()
    }

    fn time_to_exhaustion(&self, load: &[f64], current: f64) -> Option<u64> {
        if current >= 100.0 {
            return Some(0);
        }
        let (slope, _) = least_squares(load)?;
        if slope <= 0.0 {
            return None;
        }
        let steps = (100.0 - current) / slope;
        Some((steps * self.sample_interval.as_secs_f64()).round() as u64)
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Slope and intercept of the least-squares line over `(index, value)`
fn least_squares(series: &[f64]) -> Option<(f64, f64)> {
    match series.len() {
        0 => None,
        1 => Some((0.0, series[0])),
        len => {
            let n = len as f64;
            let x_mean = (n - 1.0) / 2.0;
            let y_mean = mean(series);
            let (mut numerator, mut denominator) = (0.0, 0.0);
            for (i, y) in series.iter().enumerate() {
                let dx = i as f64 - x_mean;
                numerator += dx * (y - y_mean);
                denominator += dx * dx;
            }
            let slope = numerator / denominator;
            Some((slope, y_mean - slope * x_mean))
        }
    }
}
