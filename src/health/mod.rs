mod alerts;
mod autofix;
mod error;
mod executor;
mod history;
mod models;
mod notifier;
mod orchestrator;
mod scheduler;
mod scoring;

pub use alerts::{AlertPolicy, AlertSet, DEFAULT_ALERT_THRESHOLD};
pub use autofix::{AutoFixOutcome, AutoFixTask, AutoFixTracker};
pub use error::{AutoFixError, CheckExecutionError, EngineError, InvalidScoreError};
pub use executor::{CheckExecutor, ExecutedCheck, DEFAULT_CHECK_TIMEOUT};
pub use history::{HistoryStore, DEFAULT_HISTORY_WINDOW};
pub use models::{
    Alert, CategoryAggregate, CheckCatalog, CheckIssue, CheckStatus, HealthCheckDefinition,
    HealthCheckResult, HealthReport, Impact, Priority, RawCheckOutput, RunTrigger, Trend,
};
pub use notifier::{notify_new_alerts, spawn_alert_notifier};
pub use orchestrator::{
    CheckHistory, EngineOptions, EngineStatus, HealthEngine, LastRun, RunOutcome, RunPhase,
    RunResult,
};
pub use scheduler::Scheduler;
pub use scoring::{aggregate_categories, classify_trend, mean_score, normalize_score, Scorer, Thresholds};
