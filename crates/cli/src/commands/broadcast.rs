//! `broadcast` command implementation.

use std::fs::OpenOptions;
use std::future::Future;
use std::sync::Arc;

use config_loader::{ConfigLoader, FanoutConfig};
use dispatcher::{
    BatchCoordinator, BroadcastTask, CoordinatorConfig, DispatcherError, Reporter, TaskParams,
    WriterReporter,
};
use tracing::{info, warn};

use super::{load_config, open_store};
use crate::cli::BroadcastArgs;
use crate::error::{CliError, Result};

/// Execute the `broadcast` command
pub async fn run_broadcast(args: &BroadcastArgs) -> Result<()> {
    run_broadcast_until(args, shutdown_signal()).await
}

/// Run the broadcast, cancelling it once `shutdown` resolves
///
/// A cancelled batch still writes its `Processed:` summary before the command
/// fails with [`CliError::Interrupted`].
async fn run_broadcast_until<F>(args: &BroadcastArgs, shutdown: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    let mut config = load_config(&args.config, args.store.as_ref())?;
    if let Some(deadline_secs) = args.deadline_secs {
        info!(deadline_secs, "Overriding deadline from CLI");
        config.dispatch.deadline_secs = deadline_secs;
    }
    ConfigLoader::validate(&config).map_err(|e| CliError::config_validation(e.to_string()))?;

    if args.metrics_port != 0 {
        observability::init_metrics(args.metrics_port)
            .map_err(|e| CliError::Metrics {
                message: format!("{e:#}"),
            })?;
    }

    info!(
        store = %config.store.path.display(),
        concurrency = config.dispatch.concurrency,
        deadline_secs = config.dispatch.deadline_secs,
        admission = ?config.dispatch.admission,
        "Configuration loaded"
    );

    let reporter = open_reporter(args)?;
    let task = build_task(&config);
    let params = task_params(args);

    let shutdown = async {
        shutdown.await;
        warn!("Received shutdown signal, cancelling broadcast");
    };

    match task.execute_until(&params, reporter, shutdown).await {
        Ok(report) if report.interrupted => Err(CliError::Interrupted),
        Ok(report) => {
            info!(
                succeeded = report.succeeded,
                failed = report.failed,
                elapsed_secs = report.elapsed.as_secs_f64(),
                "Broadcast finished"
            );
            Ok(())
        }
        Err(DispatcherError::Usage { message }) => Err(CliError::usage(message)),
        Err(e) => Err(e.into()),
    }
}

fn build_task(config: &FanoutConfig) -> BroadcastTask<dispatcher::DirectorySource, gateway::FileGateway> {
    let (source, gateway) = open_store(config);
    let coordinator = BatchCoordinator::new(
        Arc::new(source),
        Arc::new(gateway),
        CoordinatorConfig::from(&config.dispatch),
    );
    BroadcastTask::new(
        Arc::new(coordinator),
        config.dispatch.concurrency,
        config.dispatch.deadline(),
    )
}

fn task_params(args: &BroadcastArgs) -> TaskParams {
    let mut params = TaskParams::new();
    if let Some(text) = &args.text {
        params.insert("text", text.as_str());
    }
    if let Some(th) = &args.th {
        params.insert("th", th.as_str());
    }
    params
}

fn open_reporter(args: &BroadcastArgs) -> Result<Arc<dyn Reporter>> {
    match &args.output {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| CliError::output(path, e))?;
            Ok(Arc::new(WriterReporter::new(file)))
        }
        None => Ok(Arc::new(WriterReporter::stdout())),
    }
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
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
