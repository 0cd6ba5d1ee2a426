use super::models::{Alert, CheckStatus, HealthCheckResult, Priority};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const DEFAULT_ALERT_THRESHOLD: u8 = 70;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AlertSet {
    pub alerts: Vec<Alert>,
    /// Ids that were not alerting on the previous run.
    pub new_alert_ids: Vec<String>,
}

impl AlertSet {
    pub fn ids(&self) -> HashSet<String> {
        self.alerts.iter().map(|a| a.check_id.clone()).collect()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AlertPolicy {
    /// Critical-priority checks alert below this score even when not critical.
    pub secondary_threshold: u8,
}

impl Default for AlertPolicy {
    fn default() -> Self {
        Self {
            secondary_threshold: DEFAULT_ALERT_THRESHOLD,
        }
    }
}

impl AlertPolicy {
    pub fn new(secondary_threshold: u8) -> Self {
        Self {
            secondary_threshold,
        }
    }

    pub fn should_alert(&self, result: &HealthCheckResult) -> bool {
        if result.status == CheckStatus::Critical {
            return true;
        }
        result.priority == Priority::Critical
            && result
                .score
                .map_or(true, |score| score < self.secondary_threshold)
    }

    /// Pure: the same results and previous ids always yield the same set.
    pub fn derive_alerts(
        &self,
        results: &[HealthCheckResult],
        previous_alert_ids: &HashSet<String>,
    ) -> AlertSet {
        let alerts: Vec<Alert> = results
            .iter()
            .filter(|r| self.should_alert(r))
            .map(Alert::from)
            .collect();

        let new_alert_ids = alerts
            .iter()
            .filter(|a| !previous_alert_ids.contains(&a.check_id))
            .map(|a| a.check_id.clone())
            .collect();

        AlertSet {
            alerts,
            new_alert_ids,
        }
    }
}
