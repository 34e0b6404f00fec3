mod collectors;
mod config;
mod http;
mod metrics;
mod monitor;
mod report;
mod state;
mod telegram;

use axum::serve;
use clap::Parser;
use collectors::command::CommandSource;
use collectors::system::SysinfoSource;
use collectors::MetricSource;
use config::{Config, ConfigError, SourceKind};
use metrics::Metrics;
use monitor::{Monitor, MonitorSettings, SystemClock};
use std::path::{Path, PathBuf};
use telegram::TelegramNotifier;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "hostmon")]
#[command(version)]
struct Cli {
    /// Load environment variables from this file instead of `./.env`.
    #[arg(long)]
    env_file: Option<PathBuf>,
    #[arg(long)]
    print_default_config: bool,
    /// Print the effective configuration and exit.
    #[arg(long)]
    check_config: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if cli.print_default_config {
        println!("{}", Config::example_env());
        return;
    }

    let env_file = load_env_file(cli.env_file.as_deref());
    init_tracing();
    match env_file {
        Ok(Some(path)) => info!(path = %path.display(), "loaded environment file"),
        Ok(None) => {}
        Err(err) => warn!(error = %err, "failed to load environment file"),
    }

    let cfg = match checked_config(Config::from_env()) {
        Ok(cfg) => cfg,
        Err(code) => std::process::exit(code),
    };

    if cli.check_config {
        match cfg.to_yaml() {
            Ok(yaml) => print!("{yaml}"),
            Err(err) => {
                error!(error = %err, "failed to render configuration");
                eprintln!("hostmon: failed to render configuration: {err}");
                std::process::exit(1);
            }
        }
        return;
    }

    info!(
        source = ?cfg.source,
        cpu_threshold = cfg.thresholds.cpu_percent,
        ram_threshold = cfg.thresholds.ram_percent,
        disk_threshold = cfg.thresholds.disk_percent,
        cooldown_minutes = cfg.alert_cooldown_minutes,
        summary_hour = cfg.summary_hour,
        "starting hostmon"
    );

    let metrics = match Metrics::new() {
        Ok(m) => m,
        Err(err) => {
            error!(error = %err, "failed to initialise metrics registry");
            std::process::exit(1);
        }
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let http_task = cfg.metrics_listen.map(|addr| {
        let metrics = metrics.clone();
        let mut shutdown_rx = shutdown_rx.clone();
        tokio::spawn(async move {
            let listener = match TcpListener::bind(addr).await {
                Ok(l) => l,
                Err(err) => {
                    error!(error = %err, listen = %addr, "failed to bind metrics listener");
                    return;
                }
            };
            info!(listen = %addr, "serving /healthz and /metrics");

            let app = http::build_router(metrics);
            let server = serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.changed().await;
            });

            if let Err(err) = server.await {
                error!(error = %err, "metrics server error");
            }
        })
    });

    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        info!("termination signal received, shutting down");
        let _ = shutdown_tx.send(true);
    });

    let source: Box<dyn MetricSource + Send> = match cfg.source {
        SourceKind::Sysinfo => Box::new(SysinfoSource::new()),
        SourceKind::Command => Box::new(CommandSource::new()),
    };
    let notifier = TelegramNotifier::new(&cfg.telegram_token, &cfg.chat_id);
    let mut monitor = Monitor::new(
        source,
        notifier,
        SystemClock,
        MonitorSettings::from(&cfg),
        metrics,
    );

    monitor.announce_start().await;
    monitor.run(shutdown_rx).await;
    info!(
        last_alert_at = ?monitor.state().last_alert_at(),
        last_summary_on = ?monitor.state().last_summary_on(),
        "monitor stopped"
    );

    if let Some(task) = http_task {
        let _ = task.await;
    }
}

fn checked_config(loaded: Result<Config, ConfigError>) -> Result<Config, i32> {
    loaded.map_err(|err| {
        error!(error = %err, "failed to load configuration");
        eprintln!("hostmon: {err}");
        1
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_env_file(path: Option<&Path>) -> Result<Option<PathBuf>, dotenvy::Error> {
    match path {
        Some(path) => dotenvy::from_path(path).map(|()| Some(path.to_path_buf())),
        None => match dotenvy::dotenv() {
            Ok(path) => Ok(Some(path)),
            Err(err) if err.not_found() => Ok(None),
            Err(err) => Err(err),
        },
    }
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
                return;
            }
            Err(err) => warn!(error = %err, "cannot listen for SIGTERM, using Ctrl+C only"),
        }
    }

    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to wait for Ctrl+C");
        std::future::pending::<()>().await;
    }
}
