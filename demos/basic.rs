use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use healthcore::{Check, CheckerOpts, ProbeError, ProbeFuture, Service, ServiceOptions};
use tokio_stream::StreamExt;
use tracing::info;
use tracing_subscriber::EnvFilter;
use ulid::Ulid;

fn init_logging() {
    let env_filter = std::env::var("RUST_LOG")
        .map(EnvFilter::new)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let service = Service::new(ServiceOptions {
        fail_fast_on_startup: true,
        ..ServiceOptions::default()
    });

    service
        .register(
            Check {
                id: Ulid::new().to_string(),
                description: "database connection pool".to_string(),
                red_impact: "writes fail for every request".to_string(),
                yellow_impact: Some("requests queue up".to_string()),
                tags: vec![],
            },
            CheckerOpts {
                timeout: Duration::from_secs(2),
                run_interval: Duration::from_secs(10),
            },
            Some(Arc::new(|| Box::pin(async { Ok(()) }) as ProbeFuture)),
        )
        .await?;

    service
        .register(
            Check {
                id: Ulid::new().to_string(),
                description: "downstream pricing service".to_string(),
                red_impact: "checkout cannot compute totals".to_string(),
                yellow_impact: None,
                tags: vec![],
            },
            CheckerOpts {
                timeout: Duration::from_secs(1),
                run_interval: Duration::from_secs(5),
            },
            Some(Arc::new(|| {
                Box::pin(async { Err(ProbeError::degraded("elevated latency")) }) as ProbeFuture
            })),
        )
        .await?;

    if let Err(e) = healthcore::startup::wait_until_green(&service).await {
        info!(error = %e, "startup gate would have failed fast here; continuing for the demo");
    }

    let mut results = service.subscribe_results(None).await;
    for _ in 0..4 {
        if let Some(result) = results.next().await {
            info!(check_id = %result.id, status = %result.status, "result");
        }
    }

    info!(overall = %service.overall_health().await, "overall health");
    service.shutdown();
    Ok(())
}
