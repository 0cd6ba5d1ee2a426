use super::alerts::AlertPolicy;
use super::autofix::{AutoFixOutcome, AutoFixTask, AutoFixTracker};
use super::error::{AutoFixError, EngineError};
use super::executor::{CheckExecutor, ExecutedCheck};
use super::history::HistoryStore;
use super::models::{
    CheckCatalog, CheckStatus, HealthCheckDefinition, HealthCheckResult, HealthReport, RunTrigger,
    Trend,
};
use super::scoring::{aggregate_categories, Scorer, Thresholds};
use crate::configuration::EngineSettings;
use crate::connectors::{CheckRegistry, CheckRunner, Remediator};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

const REPORT_CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub scorer: Scorer,
    pub alert_policy: AlertPolicy,
    pub history_window: usize,
    pub max_concurrent_checks: usize,
    pub check_timeout: Duration,
    pub remediation_timeout: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self::from(&EngineSettings::default())
    }
}

impl From<&EngineSettings> for EngineOptions {
    fn from(settings: &EngineSettings) -> Self {
        Self {
            scorer: Scorer::new(
                Thresholds {
                    healthy: settings.healthy_threshold,
                    warning: settings.warning_threshold,
                },
                settings.trend_delta,
            ),
            alert_policy: AlertPolicy::new(settings.alert_threshold),
            history_window: settings.history_window,
            max_concurrent_checks: settings.max_concurrent_checks,
            check_timeout: Duration::from_secs(settings.check_timeout_secs),
            remediation_timeout: Duration::from_secs(settings.remediation_timeout_secs),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RunPhase {
    Idle,
    Running,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum RunResult {
    Succeeded { run_id: Uuid },
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LastRun {
    pub trigger: RunTrigger,
    pub finished_at: DateTime<Utc>,
    #[serde(flatten)]
    pub result: RunResult,
}

#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub phase: RunPhase,
    pub last_run: Option<LastRun>,
    pub last_report_at: Option<DateTime<Utc>>,
    pub tracked_checks: usize,
    pub active_alerts: usize,
    pub auto_fixes_in_flight: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CheckHistory {
    pub check_id: String,
    pub window: usize,
    /// Oldest first.
    pub scores: Vec<u8>,
    pub trend: Option<Trend>,
}

/// What a trigger produced.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    Completed(Arc<HealthReport>),
    /// Another run was in flight; this trigger was a no-op.
    Coalesced,
}

/// State shared across runs. Only written at the end of a successful run,
/// in one critical section.
#[derive(Default)]
struct EngineState {
    history: HistoryStore,
    active_alerts: HashSet<String>,
    catalog: Option<CheckCatalog>,
    report: Option<Arc<HealthReport>>,
    last_run: Option<LastRun>,
}

/// Holds the Idle/Running gate for the lifetime of one run.
struct RunGate<'a>(&'a AtomicBool);

impl<'a> RunGate<'a> {
    fn try_acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunGate(flag))
    }
}

impl Drop for RunGate<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Runs the catalog, scores and classifies the results, derives alerts and
/// publishes one consistent report per successful run.
pub struct HealthEngine {
    registry: Arc<dyn CheckRegistry>,
    executor: CheckExecutor,
    scorer: Scorer,
    alert_policy: AlertPolicy,
    max_concurrent_checks: usize,
    running: AtomicBool,
    state: RwLock<EngineState>,
    auto_fix: AutoFixTracker,
    reports: broadcast::Sender<Arc<HealthReport>>,
}

impl HealthEngine {
    pub fn new(
        registry: Arc<dyn CheckRegistry>,
        runner: Arc<dyn CheckRunner>,
        remediator: Arc<dyn Remediator>,
        options: EngineOptions,
    ) -> Self {
        let (reports, _) = broadcast::channel(REPORT_CHANNEL_CAPACITY);
        Self {
            registry,
            executor: CheckExecutor::new(runner, options.check_timeout),
            scorer: options.scorer,
            alert_policy: options.alert_policy,
            max_concurrent_checks: options.max_concurrent_checks.max(1),
            running: AtomicBool::new(false),
            state: RwLock::new(EngineState {
                history: HistoryStore::new(options.history_window),
                ..Default::default()
            }),
            auto_fix: AutoFixTracker::new(remediator, options.remediation_timeout),
            reports,
        }
    }

    /// Receives every report published after the call.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<HealthReport>> {
        self.reports.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Runs every registered check once. Overlapping triggers are coalesced.
    #[tracing::instrument(name = "Health run", skip(self))]
    pub async fn run_once(&self, trigger: RunTrigger) -> Result<RunOutcome, EngineError> {
        let Some(_gate) = RunGate::try_acquire(&self.running) else {
            tracing::debug!("Health run already in flight, trigger coalesced");
            return Ok(RunOutcome::Coalesced);
        };

        let run_id = Uuid::new_v4();
        let started = Instant::now();

        let catalog = match self.registry.load().await {
            Ok(catalog) => catalog,
            Err(e) => {
                tracing::error!(run_id = %run_id, "Check registry unavailable: {}", e);
                let mut state = self.state.write().await;
                state.last_run = Some(LastRun {
                    trigger,
                    finished_at: Utc::now(),
                    result: RunResult::Failed {
                        error: e.to_string(),
                    },
                });
                return Err(EngineError::RegistryUnavailable(e));
            }
        };

        let executed: Vec<ExecutedCheck> = stream::iter(catalog.checks.iter().cloned())
            .map(|definition| self.executor.execute(definition))
            .buffered(self.max_concurrent_checks)
            .collect()
            .await;

        // The gate makes this run the only writer, so the snapshot read here
        // is still current when the write section below commits.
        let (checks, alert_set) = {
            let state = self.state.read().await;
            let mut checks: Vec<HealthCheckResult> = executed
                .into_iter()
                .map(|e| self.classify(e, &state.history))
                .collect();
            annotate_dependencies(&mut checks, &catalog.checks);
            let alert_set = self
                .alert_policy
                .derive_alerts(&checks, &state.active_alerts);
            (checks, alert_set)
        };

        let categories = aggregate_categories(&catalog.category_names(), &checks);
        let (overall_score, scored_checks, overall_status) = self.scorer.overall(&checks);

        let report = Arc::new(HealthReport {
            run_id,
            trigger,
            generated_at: Utc::now(),
            duration_ms: started.elapsed().as_millis() as u64,
            overall_score,
            overall_status,
            scored_checks,
            categories,
            checks,
            new_alert_ids: alert_set.new_alert_ids.clone(),
            alerts: alert_set.alerts,
        });

        {
            let mut state = self.state.write().await;
            for check in &report.checks {
                if let Some(score) = check.score {
                    state.history.append(&check.id, score);
                }
            }
            state.active_alerts = report.alerts.iter().map(|a| a.check_id.clone()).collect();
            state.catalog = Some(catalog);
            state.report = Some(report.clone());
            state.last_run = Some(LastRun {
                trigger,
                finished_at: report.generated_at,
                result: RunResult::Succeeded { run_id },
            });
        }

        tracing::info!(
            run_id = %run_id,
            overall_score = report.overall_score,
            checks = report.checks.len(),
            alerts = report.alerts.len(),
            new_alerts = report.new_alert_ids.len(),
            duration_ms = report.duration_ms,
            "Health run completed"
        );

        // No subscribers is not an error.
        let _ = self.reports.send(report.clone());
        Ok(RunOutcome::Completed(report))
    }

    fn classify(&self, executed: ExecutedCheck, history: &HistoryStore) -> HealthCheckResult {
        let classification = self
            .scorer
            .classify(&executed.definition.id, executed.score, history);
        let definition = executed.definition;

        HealthCheckResult {
            id: definition.id,
            name: definition.name,
            category: definition.category,
            priority: definition.priority,
            score: executed.score,
            status: classification.status,
            message: executed.message,
            details: executed.details,
            recommendations: executed.recommendations,
            timestamp: executed.checked_at,
            trend: classification.trend,
            previous_score: classification.previous_score,
            auto_fix_available: definition.auto_fix,
            duration_ms: executed.duration_ms,
            issue: executed.issue,
        }
    }

    /// Latest successful report. Failed runs never replace it.
    pub async fn latest_report(&self) -> Result<Arc<HealthReport>, EngineError> {
        let state = self.state.read().await;
        match &state.report {
            Some(report) => Ok(report.clone()),
            None => Err(EngineError::NoReport {
                last_error: match &state.last_run {
                    Some(LastRun {
                        result: RunResult::Failed { error },
                        ..
                    }) => Some(error.clone()),
                    _ => None,
                },
            }),
        }
    }

    pub async fn status(&self) -> EngineStatus {
        let state = self.state.read().await;
        EngineStatus {
            phase: if self.is_running() {
                RunPhase::Running
            } else {
                RunPhase::Idle
            },
            last_run: state.last_run.clone(),
            last_report_at: state.report.as_ref().map(|r| r.generated_at),
            tracked_checks: state.history.len(),
            active_alerts: state.active_alerts.len(),
            auto_fixes_in_flight: self.auto_fix.in_flight().len(),
        }
    }

    pub async fn history(&self, check_id: &str) -> Result<CheckHistory, EngineError> {
        let state = self.state.read().await;
        let scores = state
            .history
            .series(check_id)
            .ok_or_else(|| EngineError::UnknownCheck(check_id.to_string()))?;
        let trend = state
            .report
            .as_ref()
            .and_then(|r| r.check(check_id))
            .map(|c| c.trend);

        Ok(CheckHistory {
            check_id: check_id.to_string(),
            window: state.history.window(),
            scores,
            trend,
        })
    }

    async fn definition(&self, check_id: &str) -> Result<HealthCheckDefinition, EngineError> {
        let cached = {
            let state = self.state.read().await;
            state.catalog.as_ref().map(|c| c.find(check_id).cloned())
        };
        let found = match cached {
            Some(found) => found,
            // No run has completed yet, ask the registry directly.
            None => self.registry.load().await?.find(check_id).cloned(),
        };
        found.ok_or_else(|| EngineError::UnknownCheck(check_id.to_string()))
    }

    /// Starts remediation for a check that declares auto-fix capability.
    /// The check stays as reported until the next run re-evaluates it.
    pub async fn request_auto_fix(&self, check_id: &str) -> Result<AutoFixOutcome, EngineError> {
        let definition = self.definition(check_id).await?;
        if !definition.auto_fix {
            return Err(AutoFixError::NotSupported(check_id.to_string()).into());
        }
        Ok(self.auto_fix.request(check_id).await?)
    }

    pub fn cancel_auto_fix(&self, check_id: &str) -> bool {
        self.auto_fix.cancel(check_id)
    }

    pub fn auto_fixes_in_flight(&self) -> Vec<AutoFixTask> {
        self.auto_fix.in_flight()
    }
}

/// Adds a detail line to checks whose dependencies are critical in this run.
/// Status and score are left untouched.
fn annotate_dependencies(checks: &mut [HealthCheckResult], definitions: &[HealthCheckDefinition]) {
    let critical: HashMap<&str, &str> = checks
        .iter()
        .filter(|c| c.status == CheckStatus::Critical)
        .map(|c| (c.id.as_str(), c.name.as_str()))
        .collect::<HashMap<_, _>>();
    let notes: Vec<(usize, Vec<String>)> = definitions
        .iter()
        .enumerate()
        .filter_map(|(idx, def)| {
            let lines: Vec<String> = def
                .dependencies
                .iter()
                .filter_map(|dep| critical.get(dep.as_str()))
                .map(|name| format!("Depends on {}, which is critical", name))
                .collect();
            (!lines.is_empty()).then_some((idx, lines))
        })
        .collect();

    for (idx, lines) in notes {
        if let Some(check) = checks.get_mut(idx) {
            check.details.extend(lines);
        }
    }
}
