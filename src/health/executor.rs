use super::error::CheckExecutionError;
use super::models::{CheckIssue, HealthCheckDefinition};
use super::scoring::normalize_score;
use crate::connectors::CheckRunner;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;

pub const DEFAULT_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// A check after execution, before classification against history.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutedCheck {
    pub definition: HealthCheckDefinition,
    /// Always within 0..=100; `None` only for non-numeric scores.
    pub score: Option<u8>,
    pub message: String,
    pub details: Vec<String>,
    pub recommendations: Vec<String>,
    pub issue: Option<CheckIssue>,
    pub duration_ms: u64,
    pub checked_at: DateTime<Utc>,
}

impl ExecutedCheck {
    fn failed(definition: HealthCheckDefinition, message: String, issue: CheckIssue, duration_ms: u64) -> Self {
        Self {
            definition,
            score: Some(0),
            message,
            details: Vec::new(),
            recommendations: Vec::new(),
            issue: Some(issue),
            duration_ms,
            checked_at: Utc::now(),
        }
    }
}

/// Runs one check with a timeout. Never fails: errors become a zero score
/// carrying a diagnostic message.
#[derive(Clone)]
pub struct CheckExecutor {
    runner: Arc<dyn CheckRunner>,
    timeout: Duration,
}

impl CheckExecutor {
    pub fn new(runner: Arc<dyn CheckRunner>, timeout: Duration) -> Self {
        Self { runner, timeout }
    }

    #[tracing::instrument(name = "Execute health check", skip(self, definition), fields(check_id = %definition.id))]
    pub async fn execute(&self, definition: HealthCheckDefinition) -> ExecutedCheck {
        let start = Instant::now();
        let outcome = timeout(self.timeout, self.runner.run(&definition)).await;
        let elapsed = start.elapsed().as_millis() as u64;

        let output = match outcome {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                tracing::warn!("Health check failed: {}", e);
                let message = format!("{} could not be evaluated: {}", definition.name, e);
                let issue = CheckIssue::ExecutionFailed {
                    reason: e.to_string(),
                };
                return ExecutedCheck::failed(definition, message, issue, elapsed);
            }
            Err(_) => {
                let e = CheckExecutionError::TimedOut(self.timeout);
                tracing::warn!("Health check failed: {}", e);
                let message = format!("{} did not respond: {}", definition.name, e);
                let issue = CheckIssue::TimedOut {
                    after_ms: self.timeout.as_millis() as u64,
                };
                return ExecutedCheck::failed(definition, message, issue, elapsed);
            }
        };

        let (score, issue, message) = match normalize_score(output.score) {
            Ok(normalized) => (
                Some(normalized.score),
                normalized
                    .clamped_from
                    .map(|raw| CheckIssue::ScoreClamped { raw }),
                output.message,
            ),
            Err(e) => {
                tracing::warn!("Health check returned an invalid score: {}", e);
                (
                    None,
                    Some(CheckIssue::NonNumericScore),
                    format!("{} returned an invalid score: {}", definition.name, output.message),
                )
            }
        };

        ExecutedCheck {
            definition,
            score,
            message,
            details: output.details,
            recommendations: output.recommendations,
            issue,
            duration_ms: elapsed,
            checked_at: Utc::now(),
        }
    }
}
