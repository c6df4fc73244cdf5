pub mod utils;

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::http_server::{self, HttpServerError};
use crate::{ServiceConfig, ServiceState};

/// Tasks get this long to wind down after the shutdown signal
const FINAL_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Running daemon tasks and the means to stop them
pub struct ShutdownHandle {
    signal_task: JoinHandle<()>,
    tasks: Vec<JoinHandle<()>>,
    shutdown_tx: watch::Sender<()>,
}

impl ShutdownHandle {
    /// Wait for a shutdown signal, then for every task to finish.
    ///
    /// Exits the process with status 4 if tasks outlive the grace period.
    pub async fn wait(self) {
        let _ = self.signal_task.await;

        if timeout(FINAL_SHUTDOWN_TIMEOUT, join_all(self.tasks))
            .await
            .is_err()
        {
            tracing::error!(
                "tasks still running {}s after shutdown, exiting",
                FINAL_SHUTDOWN_TIMEOUT.as_secs()
            );
            std::process::exit(4);
        }
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

fn env_filter(level: tracing::Level) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy()
}

/// Install stdout logging plus an optional daily rolling file.
///
/// The returned guards flush the non-blocking writers on drop.
fn init_logging(service_config: &ServiceConfig) -> Vec<WorkerGuard> {
    let (stdout_writer, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());
    let mut guards = vec![stdout_guard];

    let stdout_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(stdout_writer)
        .with_filter(env_filter(service_config.log_level));

    let file_layer = service_config.log_dir.as_ref().map(|log_dir| {
        if let Err(e) = std::fs::create_dir_all(log_dir) {
            eprintln!("warning: cannot create log directory {:?}: {}", log_dir, e);
        }
        let (file_writer, file_guard) =
            tracing_appender::non_blocking(tracing_appender::rolling::daily(log_dir, "blade.log"));
        guards.push(file_guard);

        tracing_subscriber::fmt::layer()
            .with_writer(file_writer)
            .with_ansi(false)
            .with_span_events(FmtSpan::CLOSE)
            .with_filter(env_filter(service_config.log_level))
    });

    tracing_subscriber::registry()
        .with(stdout_layer)
        .with(file_layer)
        .init();

    utils::register_panic_logger();
    utils::report_build_info();

    guards
}

/// Run sync passes on a fixed interval until shutdown
async fn run_sync_driver(state: ServiceState, period: Duration, mut shutdown_rx: watch::Receiver<()>) {
    let mut ticker = tokio::time::interval(period);
    // the first tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match state.node().sync().sync().await {
                    Ok(report) => tracing::debug!(
                        synced = report.synced,
                        failed = report.failed.len(),
                        new_entries = report.new_entries,
                        "periodic sync pass"
                    ),
                    Err(e) => tracing::error!("periodic sync failed: {}", e),
                }
            }
            _ = shutdown_rx.changed() => {
                tracing::debug!("sync driver shutting down");
                break;
            }
        }
    }
}

/// Bind one HTTP server on all interfaces and log if it dies
fn spawn_server<F, Fut>(
    name: &'static str,
    port: u16,
    state: &ServiceState,
    shutdown_rx: &watch::Receiver<()>,
    run: F,
) -> JoinHandle<()>
where
    F: FnOnce(http_server::Config, ServiceState, watch::Receiver<()>) -> Fut,
    Fut: Future<Output = Result<(), HttpServerError>> + Send + 'static,
{
    let config = http_server::Config::new(SocketAddr::from(([0, 0, 0, 0], port)));
    let server = run(config, state.clone(), shutdown_rx.clone());
    tokio::spawn(async move {
        if let Err(e) = server.await {
            tracing::error!("{} server error: {}", name, e);
        }
    })
}

/// Build the node and spawn its servers, returning the state handle.
///
/// Keep the returned `ShutdownHandle`; dropping it does not stop the service.
pub async fn start_service(service_config: &ServiceConfig) -> (ServiceState, ShutdownHandle) {
    let (signal_task, shutdown_tx, shutdown_rx) = match utils::graceful_shutdown_blocker() {
        Ok(blocker) => blocker,
        Err(e) => {
            tracing::error!("failed to install signal handlers: {}", e);
            std::process::exit(2);
        }
    };

    let state = match ServiceState::from_config(service_config).await {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("error creating server state: {}", e);
            std::process::exit(3);
        }
    };

    let mut tasks = vec![
        spawn_server(
            "federation",
            service_config.federation_port,
            &state,
            &shutdown_rx,
            http_server::run_federation,
        ),
        spawn_server(
            "API",
            service_config.api_port,
            &state,
            &shutdown_rx,
            http_server::run_api,
        ),
    ];

    if let Some(period) = service_config.sync_interval {
        tasks.push(tokio::spawn(run_sync_driver(
            state.clone(),
            period,
            shutdown_rx.clone(),
        )));
        tracing::info!(every = ?period, "periodic sync enabled");
    }

    tracing::info!(
        federation_port = service_config.federation_port,
        api_port = service_config.api_port,
        "node running"
    );

    let handle = ShutdownHandle {
        signal_task,
        tasks,
        shutdown_tx,
    };
    (state, handle)
}

/// Run the daemon until a shutdown signal arrives
pub async fn spawn_service(service_config: &ServiceConfig) {
    let _guards = init_logging(service_config);
    let (_, handle) = start_service(service_config).await;
    handle.wait().await;
}
