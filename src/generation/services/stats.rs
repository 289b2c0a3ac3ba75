//! Read-only success-rate and latency statistics over the task store.

use super::OrchestrationResult;
use crate::generation::{
    domain::{GenerationStatus, GenerationTask},
    ports::GenerationTaskRepository,
};
use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Success rate the service is expected to sustain, in percent.
pub const SUCCESS_RATE_TARGET: f64 = 95.0;
/// Average completion latency the service is expected to sustain.
pub const LATENCY_TARGET_SECONDS: f64 = 180.0;
/// Example messages kept per failure code.
const MAX_EXAMPLES: usize = 3;

/// Time window a snapshot covers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum StatsWindow {
    /// Last hour.
    #[serde(rename = "1h")]
    LastHour,
    /// Last 24 hours.
    #[default]
    #[serde(rename = "24h")]
    LastDay,
    /// Last 7 days.
    #[serde(rename = "7d")]
    LastWeek,
    /// Last 30 days.
    #[serde(rename = "30d")]
    LastMonth,
    /// Every task.
    #[serde(rename = "all")]
    All,
}

/// Error returned for an unknown window name.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown stats window: {0}")]
pub struct ParseStatsWindowError(pub String);

impl StatsWindow {
    /// Canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LastHour => "1h",
            Self::LastDay => "24h",
            Self::LastWeek => "7d",
            Self::LastMonth => "30d",
            Self::All => "all",
        }
    }

    /// Earliest creation time included, `None` for [`StatsWindow::All`].
    #[must_use]
    pub fn since(self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let span = match self {
            Self::LastHour => TimeDelta::hours(1),
            Self::LastDay => TimeDelta::hours(24),
            Self::LastWeek => TimeDelta::days(7),
            Self::LastMonth => TimeDelta::days(30),
            Self::All => return None,
        };
        Some(now - span)
    }
}

impl TryFrom<&str> for StatsWindow {
    type Error = ParseStatsWindowError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "1h" => Ok(Self::LastHour),
            "24h" => Ok(Self::LastDay),
            "7d" => Ok(Self::LastWeek),
            "30d" => Ok(Self::LastMonth),
            "all" => Ok(Self::All),
            other => Err(ParseStatsWindowError(other.to_owned())),
        }
    }
}

impl fmt::Display for StatsWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task counts per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    /// All tasks in the window.
    pub total: usize,
    /// Pending.
    pub pending: usize,
    /// Processing.
    pub processing: usize,
    /// Downloading.
    pub downloading: usize,
    /// Completed.
    pub completed: usize,
    /// Failed.
    pub failed: usize,
    /// Cancelled.
    pub cancelled: usize,
}

impl StatusCounts {
    fn record(&mut self, status: GenerationStatus) {
        self.total += 1;
        let slot = match status {
            GenerationStatus::Pending => &mut self.pending,
            GenerationStatus::Processing => &mut self.processing,
            GenerationStatus::Downloading => &mut self.downloading,
            GenerationStatus::Completed => &mut self.completed,
            GenerationStatus::Failed => &mut self.failed,
            GenerationStatus::Cancelled => &mut self.cancelled,
        };
        *slot += 1;
    }
}

/// Completion latency of finished tasks, in seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LatencySummary {
    /// Completed tasks measured.
    pub samples: usize,
    /// Mean, rounded to two decimals.
    pub average: Option<f64>,
    /// Nearest-rank 50th percentile.
    pub p50: Option<i64>,
    /// Nearest-rank 95th percentile.
    pub p95: Option<i64>,
    /// Nearest-rank 99th percentile.
    pub p99: Option<i64>,
}

/// One failure code in the histogram.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureReason {
    /// Failure code, `UNKNOWN` when none was recorded.
    pub error_code: String,
    /// Failed tasks with this code.
    pub count: usize,
    /// Share of all failures, in percent.
    pub percentage: f64,
    /// Up to three distinct messages.
    pub examples: Vec<String>,
}

/// Outcome of tasks sharing one parameter value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterBreakdown {
    /// Parameter value, e.g. `720p`.
    pub value: String,
    /// Tasks with this value.
    pub total: usize,
    /// Completed tasks.
    pub completed: usize,
    /// Failed tasks.
    pub failed: usize,
    /// Completed share, in percent.
    pub success_rate: f64,
}

/// Severity derived from the success rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertLevel {
    /// At or above target.
    Ok,
    /// Below 95 %.
    Warning,
    /// Below 90 %.
    Critical,
    /// Below 85 %.
    Emergency,
}

/// Whether the window meets service targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TargetHealth {
    /// Success rate at or above target.
    pub success_rate_met: bool,
    /// Average latency at or below target (met when nothing finished).
    pub latency_met: bool,
    /// Alert severity.
    pub alert_level: AlertLevel,
}

/// Snapshot of generation outcomes over a window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationStats {
    /// Window covered.
    pub window: StatsWindow,
    /// When the snapshot was taken.
    pub generated_at: DateTime<Utc>,
    /// Counts per status.
    pub counts: StatusCounts,
    /// Completed share of all tasks, in percent (0 when empty).
    pub success_rate: f64,
    /// Failed share of all tasks, in percent.
    pub failure_rate: f64,
    /// Completion latency.
    pub latency: LatencySummary,
    /// Failures by code, most frequent first.
    pub failure_reasons: Vec<FailureReason>,
    /// Outcomes per resolution.
    pub by_resolution: Vec<ParameterBreakdown>,
    /// Outcomes per duration.
    pub by_duration: Vec<ParameterBreakdown>,
    /// Outcomes per aspect ratio.
    pub by_aspect_ratio: Vec<ParameterBreakdown>,
    /// Target compliance.
    pub health: TargetHealth,
}

impl GenerationStats {
    /// Aggregates `tasks`, which are assumed to fall inside `window`.
    #[must_use]
    pub fn from_tasks(
        window: StatsWindow,
        generated_at: DateTime<Utc>,
        tasks: &[GenerationTask],
    ) -> Self {
        let mut counts = StatusCounts::default();
        for task in tasks {
            counts.record(task.status());
        }
        let success_rate = percentage(counts.completed, counts.total);
        let latency = summarize_latency(tasks);

        Self {
            window,
            generated_at,
            counts,
            success_rate,
            failure_rate: percentage(counts.failed, counts.total),
            failure_reasons: failure_histogram(tasks),
            by_resolution: breakdown(tasks, |task| task.resolution().as_str().to_owned()),
            by_duration: breakdown(tasks, |task| task.duration().to_string()),
            by_aspect_ratio: breakdown(tasks, |task| task.aspect_ratio().as_str().to_owned()),
            health: TargetHealth {
                success_rate_met: success_rate >= SUCCESS_RATE_TARGET,
                latency_met: latency
                    .average
                    .is_none_or(|average| average <= LATENCY_TARGET_SECONDS),
                alert_level: if counts.total == 0 {
                    AlertLevel::Ok
                } else {
                    alert_level(success_rate)
                },
            },
            latency,
        }
    }
}

fn alert_level(success_rate: f64) -> AlertLevel {
    if success_rate < 85.0 {
        AlertLevel::Emergency
    } else if success_rate < 90.0 {
        AlertLevel::Critical
    } else if success_rate < SUCCESS_RATE_TARGET {
        AlertLevel::Warning
    } else {
        AlertLevel::Ok
    }
}

fn as_f64(value: usize) -> f64 {
    f64::from(u32::try_from(value).unwrap_or(u32::MAX))
}

/// `part / whole` in percent, rounded to two decimals; zero for an empty
/// whole.
#[expect(
    clippy::float_arithmetic,
    reason = "rates are reported as rounded percentages"
)]
fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    round2(as_f64(part) * 100.0 / as_f64(whole))
}

#[expect(clippy::float_arithmetic, reason = "rounding for presentation")]
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[expect(clippy::float_arithmetic, reason = "mean latency")]
fn mean(samples: &[i64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    let sum: i64 = samples.iter().sum();
    let total = f64::from(i32::try_from(sum).unwrap_or(i32::MAX));
    Some(round2(total / as_f64(samples.len())))
}

/// Nearest-rank percentile of an ascending slice.
fn nearest_rank(sorted: &[i64], percentile: usize) -> Option<i64> {
    let rank = percentile.saturating_mul(sorted.len()).div_ceil(100);
    sorted.get(rank.saturating_sub(1)).copied()
}

fn summarize_latency(tasks: &[GenerationTask]) -> LatencySummary {
    let mut samples = tasks
        .iter()
        .filter(|task| task.status() == GenerationStatus::Completed)
        .filter_map(GenerationTask::latency_seconds)
        .collect::<Vec<_>>();
    samples.sort_unstable();
    LatencySummary {
        samples: samples.len(),
        average: mean(&samples),
        p50: nearest_rank(&samples, 50),
        p95: nearest_rank(&samples, 95),
        p99: nearest_rank(&samples, 99),
    }
}

fn failure_histogram(tasks: &[GenerationTask]) -> Vec<FailureReason> {
    let mut groups: BTreeMap<String, (usize, Vec<String>)> = BTreeMap::new();
    let mut total_failures = 0;
    for task in tasks
        .iter()
        .filter(|task| task.status() == GenerationStatus::Failed)
    {
        total_failures += 1;
        let (code, message) = task.failure().map_or(("UNKNOWN", ""), |failure| {
            (failure.code.as_str(), failure.message.as_str())
        });
        let entry = groups.entry(code.to_owned()).or_default();
        entry.0 += 1;
        if !message.is_empty()
            && entry.1.len() < MAX_EXAMPLES
            && !entry.1.iter().any(|seen| seen == message)
        {
            entry.1.push(message.to_owned());
        }
    }

    let mut reasons = groups
        .into_iter()
        .map(|(error_code, (count, examples))| FailureReason {
            error_code,
            count,
            percentage: percentage(count, total_failures),
            examples,
        })
        .collect::<Vec<_>>();
    reasons.sort_by(|left, right| {
        right
            .count
            .cmp(&left.count)
            .then_with(|| left.error_code.cmp(&right.error_code))
    });
    reasons
}

fn breakdown(
    tasks: &[GenerationTask],
    key: impl Fn(&GenerationTask) -> String,
) -> Vec<ParameterBreakdown> {
    let mut groups: BTreeMap<String, StatusCounts> = BTreeMap::new();
    for task in tasks {
        groups.entry(key(task)).or_default().record(task.status());
    }
    groups
        .into_iter()
        .map(|(value, counts)| ParameterBreakdown {
            value,
            total: counts.total,
            completed: counts.completed,
            failed: counts.failed,
            success_rate: percentage(counts.completed, counts.total),
        })
        .collect()
}

/// Computes [`GenerationStats`] from the task store.
pub struct GenerationStatsService<C>
where
    C: Clock + Send + Sync,
{
    tasks: Arc<dyn GenerationTaskRepository>,
    clock: Arc<C>,
}

impl<C> GenerationStatsService<C>
where
    C: Clock + Send + Sync,
{
    /// Creates the service.
    #[must_use]
    pub const fn new(tasks: Arc<dyn GenerationTaskRepository>, clock: Arc<C>) -> Self {
        Self { tasks, clock }
    }

    /// Aggregates tasks created inside `window`.
    ///
    /// # Errors
    ///
    /// Returns [`super::OrchestrationError::Persistence`] when the store
    /// fails.
    pub async fn snapshot(&self, window: StatsWindow) -> OrchestrationResult<GenerationStats> {
        let now = self.clock.utc();
        let tasks = self.tasks.list_created_since(window.since(now)).await?;
        Ok(GenerationStats::from_tasks(window, now, &tasks))
    }
}
