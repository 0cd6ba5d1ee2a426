use super::error::AutoFixError;
use crate::connectors::Remediator;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// An in-flight remediation. Exists only while the action runs.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AutoFixTask {
    pub check_id: String,
    pub started: bool,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AutoFixOutcome {
    pub check_id: String,
    pub message: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

struct Entry {
    task: AutoFixTask,
    cancel: CancellationToken,
}

type TaskMap = Mutex<HashMap<String, Entry>>;

fn lock(tasks: &TaskMap) -> MutexGuard<'_, HashMap<String, Entry>> {
    // No await happens under this lock, so a poisoned map is still consistent.
    tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Removes the task however the remediation future ends, dropped included.
struct TaskGuard {
    tasks: Arc<TaskMap>,
    check_id: String,
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        lock(&self.tasks).remove(&self.check_id);
    }
}

/// Tracks remediation tasks keyed by check id, at most one per id.
pub struct AutoFixTracker {
    tasks: Arc<TaskMap>,
    remediator: Arc<dyn Remediator>,
    timeout: Duration,
}

impl AutoFixTracker {
    pub fn new(remediator: Arc<dyn Remediator>, timeout: Duration) -> Self {
        Self {
            tasks: Arc::new(Mutex::new(HashMap::new())),
            remediator,
            timeout,
        }
    }

    fn register(&self, check_id: &str) -> Result<(TaskGuard, CancellationToken, DateTime<Utc>), AutoFixError> {
        let mut tasks = lock(&self.tasks);
        if tasks.contains_key(check_id) {
            return Err(AutoFixError::AlreadyInProgress(check_id.to_string()));
        }
        let started_at = Utc::now();
        let cancel = CancellationToken::new();
        tasks.insert(
            check_id.to_string(),
            Entry {
                task: AutoFixTask {
                    check_id: check_id.to_string(),
                    started: true,
                    started_at,
                },
                cancel: cancel.clone(),
            },
        );
        Ok((
            TaskGuard {
                tasks: self.tasks.clone(),
                check_id: check_id.to_string(),
            },
            cancel,
            started_at,
        ))
    }

    /// Runs the remediation for `check_id`. Capability checks belong to the
    /// caller; this only enforces the single in-flight task per id.
    #[tracing::instrument(name = "Auto-fix", skip(self))]
    pub async fn request(&self, check_id: &str) -> Result<AutoFixOutcome, AutoFixError> {
        let (_guard, cancel, started_at) = self.register(check_id).map_err(|err| {
            tracing::warn!("Rejected auto-fix request: {}", err);
            err
        })?;

        tracing::info!(check_id = %check_id, "Starting auto-fix");

        let result = tokio::select! {
            _ = cancel.cancelled() => Err(AutoFixError::Cancelled(check_id.to_string())),
            outcome = tokio::time::timeout(self.timeout, self.remediator.remediate(check_id)) => {
                match outcome {
                    Ok(Ok(message)) => Ok(message),
                    Ok(Err(e)) => Err(AutoFixError::Failed {
                        check_id: check_id.to_string(),
                        reason: e.to_string(),
                    }),
                    Err(_) => Err(AutoFixError::TimedOut {
                        check_id: check_id.to_string(),
                        after: self.timeout,
                    }),
                }
            }
        };

        match result {
            Ok(message) => {
                tracing::info!(check_id = %check_id, "Auto-fix completed");
                Ok(AutoFixOutcome {
                    check_id: check_id.to_string(),
                    message,
                    started_at,
                    finished_at: Utc::now(),
                })
            }
            Err(err) => {
                tracing::error!(check_id = %check_id, "Auto-fix did not complete: {}", err);
                Err(err)
            }
        }
    }

    /// Signals the in-flight task for `check_id`. Returns false when none exists.
    pub fn cancel(&self, check_id: &str) -> bool {
        match lock(&self.tasks).get(check_id) {
            Some(entry) => {
                entry.cancel.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_in_progress(&self, check_id: &str) -> bool {
        lock(&self.tasks).contains_key(check_id)
    }

    pub fn in_flight(&self) -> Vec<AutoFixTask> {
        let mut tasks: Vec<AutoFixTask> = lock(&self.tasks)
            .values()
            .map(|e| e.task.clone())
            .collect();
        tasks.sort_by(|a, b| a.started_at.cmp(&b.started_at));
        tasks
    }
}
