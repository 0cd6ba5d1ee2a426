use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Healthy,
    Warning,
    Critical,
}

impl std::fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckStatus::Healthy => write!(f, "healthy"),
            CheckStatus::Warning => write!(f, "warning"),
            CheckStatus::Critical => write!(f, "critical"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improving,
    Stable,
    Declining,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    Low,
    #[default]
    Medium,
    High,
}

/// A registered check as supplied by the catalog. Never mutated by the engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthCheckDefinition {
    pub id: String,
    pub name: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compliance_requirement: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub auto_fix: bool,
    /// Human readable estimate, e.g. "5 minutes"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_fix_duration: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub impact: Impact,
}

impl HealthCheckDefinition {
    pub fn new(id: impl Into<String>, name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: category.into(),
            compliance_requirement: None,
            dependencies: Vec::new(),
            auto_fix: false,
            estimated_fix_duration: None,
            priority: Priority::default(),
            impact: Impact::default(),
        }
    }

    /// Builder: Set priority
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Builder: Mark the check as remediable
    pub fn with_auto_fix(mut self, estimated_fix_duration: Option<String>) -> Self {
        self.auto_fix = true;
        self.estimated_fix_duration = estimated_fix_duration;
        self
    }

    pub fn with_compliance_requirement(mut self, requirement: impl Into<String>) -> Self {
        self.compliance_requirement = Some(requirement.into());
        self
    }

    pub fn with_dependencies(mut self, dependencies: Vec<String>) -> Self {
        self.dependencies = dependencies;
        self
    }
}

/// Ordered catalog loaded from the registry at the start of every run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CheckCatalog {
    /// Categories reported even when no check currently belongs to them.
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub checks: Vec<HealthCheckDefinition>,
}

impl CheckCatalog {
    pub fn new(checks: Vec<HealthCheckDefinition>) -> Self {
        Self {
            categories: Vec::new(),
            checks,
        }
    }

    pub fn with_categories(mut self, categories: Vec<String>) -> Self {
        self.categories = categories;
        self
    }

    pub fn find(&self, check_id: &str) -> Option<&HealthCheckDefinition> {
        self.checks.iter().find(|c| c.id == check_id)
    }

    /// Declared categories first, then any category only seen on a check.
    pub fn category_names(&self) -> Vec<String> {
        let mut names = self.categories.clone();
        for check in &self.checks {
            if !names.contains(&check.category) {
                names.push(check.category.clone());
            }
        }
        names
    }
}

/// Raw output of the execution collaborator before scoring.
///
/// `score` stays a float here so that out-of-range and non-numeric values can
/// be detected instead of silently coerced.
#[derive(Debug, Clone, PartialEq)]
pub struct RawCheckOutput {
    pub score: f64,
    pub message: String,
    pub details: Vec<String>,
    pub recommendations: Vec<String>,
}

impl RawCheckOutput {
    pub fn new(score: f64, message: impl Into<String>) -> Self {
        Self {
            score,
            message: message.into(),
            details: Vec::new(),
            recommendations: Vec::new(),
        }
    }

    pub fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = details;
        self
    }

    pub fn with_recommendations(mut self, recommendations: Vec<String>) -> Self {
        self.recommendations = recommendations;
        self
    }
}

/// Why a result did not come from a clean execution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CheckIssue {
    ExecutionFailed { reason: String },
    TimedOut { after_ms: u64 },
    ScoreClamped { raw: f64 },
    NonNumericScore,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthCheckResult {
    pub id: String,
    pub name: String,
    pub category: String,
    pub priority: Priority,
    /// Absent only when the check returned a non-numeric score.
    pub score: Option<u8>,
    pub status: CheckStatus,
    pub message: String,
    pub details: Vec<String>,
    pub recommendations: Vec<String>,
    pub timestamp: DateTime<Utc>,
    pub trend: Trend,
    pub previous_score: Option<u8>,
    pub auto_fix_available: bool,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue: Option<CheckIssue>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryAggregate {
    pub category: String,
    pub total: usize,
    pub healthy: usize,
    pub warning: usize,
    pub critical: usize,
    pub score: u8,
    /// False when no check in the category produced a usable score.
    pub has_data: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Alert {
    pub check_id: String,
    pub name: String,
    pub category: String,
    pub priority: Priority,
    pub score: Option<u8>,
    pub status: CheckStatus,
    pub message: String,
    pub auto_fix_available: bool,
    pub raised_at: DateTime<Utc>,
}

impl From<&HealthCheckResult> for Alert {
    fn from(result: &HealthCheckResult) -> Self {
        Self {
            check_id: result.id.clone(),
            name: result.name.clone(),
            category: result.category.clone(),
            priority: result.priority,
            score: result.score,
            status: result.status,
            message: result.message.clone(),
            auto_fix_available: result.auto_fix_available,
            raised_at: result.timestamp,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RunTrigger {
    Manual,
    Scheduled,
}

impl std::fmt::Display for RunTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunTrigger::Manual => write!(f, "manual"),
            RunTrigger::Scheduled => write!(f, "scheduled"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthReport {
    pub run_id: Uuid,
    pub trigger: RunTrigger,
    pub generated_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub overall_score: u8,
    pub overall_status: CheckStatus,
    /// Number of checks that contributed a score to `overall_score`.
    pub scored_checks: usize,
    pub categories: Vec<CategoryAggregate>,
    pub checks: Vec<HealthCheckResult>,
    pub alerts: Vec<Alert>,
    pub new_alert_ids: Vec<String>,
}

impl HealthReport {
    pub fn check(&self, check_id: &str) -> Option<&HealthCheckResult> {
        self.checks.iter().find(|c| c.id == check_id)
    }

    pub fn category(&self, category: &str) -> Option<&CategoryAggregate> {
        self.categories.iter().find(|c| c.category == category)
    }
}
