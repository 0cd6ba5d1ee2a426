use super::models::HealthReport;
use std::sync::Arc;
use tokio::sync::broadcast::{error::RecvError, Receiver};
use tokio::task::JoinHandle;

/// Logs every newly raised alert once, as reports arrive.
pub fn spawn_alert_notifier(mut reports: Receiver<Arc<HealthReport>>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match reports.recv().await {
                Ok(report) => {
                    notify_new_alerts(&report);
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Alert notifier lagged behind published reports");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

pub fn notify_new_alerts(report: &HealthReport) -> usize {
    let mut notified = 0;
    for alert in report
        .alerts
        .iter()
        .filter(|a| report.new_alert_ids.contains(&a.check_id))
    {
        tracing::warn!(
            run_id = %report.run_id,
            check_id = %alert.check_id,
            category = %alert.category,
            priority = ?alert.priority,
            score = ?alert.score,
            auto_fix_available = alert.auto_fix_available,
            "New health alert: {}",
            alert.message
        );
        notified += 1;
    }
    notified
}
