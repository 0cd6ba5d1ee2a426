use super::models::RunTrigger;
use super::orchestrator::{HealthEngine, RunOutcome};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Drives periodic runs. Cancellation is only observed between runs.
pub struct Scheduler {
    engine: Arc<HealthEngine>,
    interval: Duration,
    cancel_token: CancellationToken,
}

impl Scheduler {
    pub fn new(engine: Arc<HealthEngine>, interval: Duration) -> Self {
        Self {
            engine,
            interval,
            cancel_token: CancellationToken::new(),
        }
    }

    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }

    pub fn start(&self) -> JoinHandle<()> {
        let engine = self.engine.clone();
        let token = self.cancel_token.clone();
        let interval = self.interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            tracing::info!(interval_secs = interval.as_secs(), "Health scheduler started");

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        match engine.run_once(RunTrigger::Scheduled).await {
                            Ok(RunOutcome::Completed(_)) => {}
                            Ok(RunOutcome::Coalesced) => {
                                tracing::debug!("Scheduled run skipped, a manual run is in flight");
                            }
                            Err(e) => tracing::error!("Scheduled health run failed: {}", e),
                        }
                    }
                }
            }

            tracing::info!("Health scheduler stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectors::{ConnectorError, Remediator, StaticCheckRegistry};
    use crate::health::{
        CheckCatalog, CheckExecutionError, EngineOptions, HealthCheckDefinition, RawCheckOutput,
    };
    use crate::connectors::CheckRunner;
    use async_trait::async_trait;

    struct Healthy;

    #[async_trait]
    impl CheckRunner for Healthy {
        async fn run(
            &self,
            _definition: &HealthCheckDefinition,
        ) -> Result<RawCheckOutput, CheckExecutionError> {
            Ok(RawCheckOutput::new(99.0, "fine"))
        }
    }

    #[async_trait]
    impl Remediator for Healthy {
        async fn remediate(&self, _check_id: &str) -> Result<String, ConnectorError> {
            Ok(String::new())
        }
    }

    #[tokio::test]
    async fn publishes_reports_until_cancelled() {
        let engine = Arc::new(HealthEngine::new(
            Arc::new(StaticCheckRegistry::new(CheckCatalog::new(vec![
                HealthCheckDefinition::new("tls", "TLS", "security"),
            ]))),
            Arc::new(Healthy),
            Arc::new(Healthy),
            EngineOptions::default(),
        ));
        let mut reports = engine.subscribe();

        let scheduler = Scheduler::new(engine.clone(), Duration::from_millis(20));
        let handle = scheduler.start();

        let first = reports.recv().await.unwrap();
        let second = reports.recv().await.unwrap();
        assert_ne!(first.run_id, second.run_id);
        assert_eq!(second.check("tls").unwrap().previous_score, Some(99));

        scheduler.shutdown();
        handle.await.unwrap();
        assert!(!engine.is_running());
    }
}
