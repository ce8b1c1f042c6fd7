//! Subsift - Entry Point
//!
//! Runs one aggregation pass and writes the subscription artifact.

use std::env;

use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use subsift::config::{Config, LogConfig};
use subsift::error::{Result, SubsiftError};
use subsift::models::RunReport;
use subsift::output::{append_step_output, write_artifact, write_report};
use subsift::probe::{create_prober, Dialer, HealthProber};
use subsift::source::{gather_link_text, load_source_records, HttpFetcher};
use subsift::{Pipeline, PipelineOutput};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    init_tracing(&config.log);

    info!(
        "Starting Subsift (strategy: {}, threshold: {}ms, cap: {})",
        config.probe.strategy, config.probe.latency_threshold_ms, config.pipeline.max_output_nodes
    );

    let output = tokio::select! {
        result = run(&config) => result,
        _ = shutdown_signal() => {
            warn!("Interrupted; no artifact written");
            return Err(SubsiftError::Internal("interrupted".to_string()));
        }
    };

    let output = match output {
        Ok(output) => output,
        Err(e) => {
            error!(category = e.category().as_str(), "Run aborted: {}", e);
            return Err(e);
        }
    };

    write_artifact(&config.output.file, &output.artifact).await?;

    if let Some(path) = &config.output.report_file {
        write_report(path, &output.report).await?;
    }

    if let Ok(path) = env::var("GITHUB_OUTPUT") {
        if !path.is_empty() {
            append_step_output(&path, output.report.emitted).await?;
        }
    }

    info!(
        "Run complete: {} emitted of {} unique ({:.1}% probe pass rate, {}/{} sources failed)",
        output.report.emitted,
        output.report.unique_nodes,
        output.report.pass_rate(),
        output.report.sources_failed,
        output.report.sources_total
    );
    Ok(())
}

async fn run(config: &Config) -> Result<PipelineOutput> {
    let fetcher = HttpFetcher::new()?;

    let records = load_source_records(
        &fetcher,
        &config.source.list_url,
        config.source.list_timeout(),
    )
    .await?;

    let gathered = gather_link_text(
        &fetcher,
        records,
        config.source.link_timeout(),
        config.source.fetch_concurrency,
    )
    .await;

    let mut report = RunReport::new(config.probe.strategy);
    report.sources_total = gathered.attempted;
    report.sources_failed = gathered.failed;

    let dialer = Dialer::new(config.egress_proxy.clone());
    let prober = create_prober(config.probe.strategy, dialer)?;
    let health = HealthProber::new(prober, config.probe.clone());
    let pipeline = Pipeline::new(config.pipeline.clone(), health);

    Ok(pipeline.run(&gathered.blocks, report).await)
}

fn init_tracing(log: &LogConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("subsift={}", log.level).into());
    let registry = tracing_subscriber::registry().with(filter);

    if log.format.eq_ignore_ascii_case("json") {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
