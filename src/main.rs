use anyhow::Context;
use platform_health::configuration::get_configuration;
use platform_health::connectors::{self, FileCheckRegistry};
use platform_health::health::{spawn_alert_notifier, EngineOptions, HealthEngine, Scheduler};
use platform_health::startup::run;
use platform_health::telemetry::{get_subscriber, init_subscriber};
use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = get_subscriber("platform-health".into(), "info".into(), std::io::stdout);
    init_subscriber(subscriber);

    let settings = get_configuration().context("Failed to read configuration")?;

    tracing::info!(
        registry = %settings.registry.path,
        interval_secs = settings.engine.run_interval_secs,
        "Starting health engine"
    );

    let (runner, remediator) = connectors::init_http_collaborators(&settings.collaborators)
        .context("Failed to initialize collaborator connectors")?;
    let registry = Arc::new(FileCheckRegistry::new(&settings.registry.path));

    let engine = Arc::new(HealthEngine::new(
        registry,
        runner,
        remediator,
        EngineOptions::from(&settings.engine),
    ));

    let notifier = spawn_alert_notifier(engine.subscribe());
    let scheduler = Scheduler::new(
        engine.clone(),
        Duration::from_secs(settings.engine.run_interval_secs),
    );
    let scheduler_handle = scheduler.start();

    let address = format!("{}:{}", settings.app_host, settings.app_port);
    tracing::info!("Start server at {:?}", &address);
    let listener =
        TcpListener::bind(&address).with_context(|| format!("failed to bind to {}", address))?;

    let result = run(listener, engine)?.await;

    scheduler.shutdown();
    if let Err(e) = scheduler_handle.await {
        tracing::error!("Health scheduler task failed: {}", e);
    }
    notifier.abort();

    result.context("HTTP server error")
}
