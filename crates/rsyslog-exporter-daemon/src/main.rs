//! rsyslog_exporter
//!
//! Run by rsyslog through `omprog`: impstats lines arrive on stdin, metrics
//! are served over HTTP. Logs go to stderr; stdout is never written.

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tokio::io::BufReader;
use tracing_subscriber::{fmt, EnvFilter};

use rsyslog_exporter_core::error::{ExporterError, Result};
use rsyslog_exporter_daemon::{app_state, args::Args, collector, input, router};

fn main() -> ExitCode {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let rt = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!(error = %e, "failed to start runtime");
            return ExitCode::FAILURE;
        }
    };

    let code = match rt.block_on(run(args)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, kind = e.kind().as_str(), "rsyslog_exporter failed");
            ExitCode::FAILURE
        }
    };

    // A pending stdin read cannot be cancelled; don't wait for it.
    rt.shutdown_timeout(Duration::from_millis(100));
    code
}

async fn run(args: Args) -> Result<()> {
    let cfg = args.load_config()?;
    let timeouts = cfg.timeouts()?;
    let listen = cfg.listen_addr()?;

    let state = app_state::AppState::new(cfg)?;
    let app = router::build_router(state.clone());

    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| ExporterError::Internal(format!("bind {listen} failed: {e}")))?;

    tracing::info!(
        %listen,
        version = collector::VERSION,
        export_after = ?timeouts.export_after(),
        down_after = ?timeouts.down_after(),
        labels = ?state.cfg().labels,
        "rsyslog_exporter starting"
    );

    let mut server = tokio::spawn(async move { axum::serve(listener, app).await });

    let mut pump = input::InputLoop::new(state.store(), timeouts)
        .with_parse_timer(state.metrics().parsing_seconds.clone());
    let stdin = BufReader::new(tokio::io::stdin());

    let exit = tokio::select! {
        exit = pump.run(stdin, shutdown_signal()) => exit?,
        res = &mut server => {
            let reason = match res {
                Ok(Ok(())) => "exited".to_string(),
                Ok(Err(e)) => e.to_string(),
                Err(e) => e.to_string(),
            };
            return Err(ExporterError::Internal(format!("metrics server stopped: {reason}")));
        }
    };

    server.abort();
    tracing::info!(?exit, "rsyslog_exporter stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
