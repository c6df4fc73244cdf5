use std::time::Duration;

use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// In-flight requests get this long after SIGTERM
const REQUEST_GRACE_PERIOD: Duration = Duration::from_secs(10);

/// Wire SIGINT, SIGTERM and programmatic shutdown into one watch channel.
///
/// The task finishes once shutdown has been broadcast. Returns the task, the
/// sender for programmatic shutdown, and a receiver to clone into servers.
pub fn graceful_shutdown_blocker(
) -> std::io::Result<(JoinHandle<()>, watch::Sender<()>, watch::Receiver<()>)> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    let (tx, rx) = watch::channel(());
    let broadcast = tx.clone();
    let mut requested = rx.clone();

    let task = tokio::spawn(async move {
        let reason = tokio::select! {
            _ = sigint.recv() => "SIGINT",
            _ = sigterm.recv() => {
                tokio::time::sleep(REQUEST_GRACE_PERIOD).await;
                "SIGTERM"
            }
            _ = requested.changed() => "request",
        };
        tracing::info!(reason, "shutting down");
        let _ = broadcast.send(());
    });

    Ok((task, tx, rx))
}

/// Route panics through `tracing` so they land in the log files too
pub fn register_panic_logger() {
    std::panic::set_hook(Box::new(|panic| {
        let location = panic.location();
        tracing::error!(
            message = %panic,
            panic.file = location.map(|l| l.file()),
            panic.line = location.map(|l| l.line()),
            "panic"
        );
    }));
}

pub fn report_build_info() {
    let build = common::prelude::build_info();

    tracing::info!(
        version = build.version,
        profile = build.build_profile,
        features = build.build_features,
        built = build.build_timestamp,
        "blade daemon starting"
    );
}
