//! Main entry point for the stress tester binary

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use shared::logging::{self, banner};
use shared::{Component, component_info, component_warn};
use stress_tester::{ConfigOverrides, HarnessConfig, HarnessResult, ProcessSpawner, StressTester};

/// Stress tester for media streaming servers
#[derive(Parser, Debug)]
#[command(name = "stress-tester")]
#[command(about = "Ramps up streaming load until the target server raises a degradation alert")]
#[command(version)]
struct Args {
    /// Config file (defaults to ./stress-tester.toml when present)
    #[arg(long, env = "STRESS_CONFIG")]
    config: Option<PathBuf>,

    /// Alert callback server port
    #[arg(long, env = "STRESS_PORT")]
    port: Option<u16>,

    /// Seconds between worker launches
    #[arg(long, env = "STRESS_INTERVAL")]
    interval: Option<u64>,

    /// Worker command line; `${seq}` is replaced with the launch number
    #[arg(long, env = "STRESS_COMMAND")]
    command: Option<String>,

    /// Log file receiving the full diagnostic stream
    #[arg(long, env = "STRESS_LOG_FILE")]
    log_file: Option<PathBuf>,

    /// Log level for the log file (trace, debug, info, warn, error)
    #[arg(long, env = "STRESS_LOG_LEVEL")]
    log_level: Option<String>,

    /// Write the run report as JSON to this path
    #[arg(long)]
    report: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> HarnessResult<ExitCode> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    let overrides = ConfigOverrides {
        port: args.port,
        interval_secs: args.interval,
        command: args.command,
        log_file: args.log_file,
        log_level: args.log_level,
        report: args.report,
    };
    let config = HarnessConfig::load(args.config.as_deref(), overrides)?;

    logging::init_tracing(&config.log)?;
    log_configuration(&config);

    let tester = StressTester::bind(config, ProcessSpawner::new()).await?;
    let report = tester.run(shutdown_signal()).await?;

    logging::log_success(Component::Harness, &format!("Run finished: {:?}", report.outcome));
    Ok(ExitCode::from(report.outcome.exit_code()))
}

fn log_configuration(config: &HarnessConfig) {
    component_info!(Component::Harness, "{}", banner());
    logging::log_startup(
        Component::Harness,
        &format!("Stress Tester for OvenMediaEngine v{}", env!("CARGO_PKG_VERSION")),
    );
    component_info!(Component::Harness, "{}", banner());
    component_info!(Component::Harness, "Configuration:");
    match &config.log.file {
        Some(path) => {
            component_info!(Component::Harness, "  - Log File: {}", path.display());
        }
        None => {
            component_info!(Component::Harness, "  - Log File: (disabled)");
        }
    }
    component_info!(Component::Harness, "  - Alert Callback Server: {}", config.bind_addr);
    component_info!(
        Component::Harness,
        "  - Worker Execution Interval: {} seconds",
        config.spawn_interval.as_secs()
    );
    component_info!(Component::Harness, "  - Worker Command: {}", config.command.as_str());
    component_info!(Component::Harness, "{}", banner());

    if !config.command.has_placeholder() {
        component_warn!(
            Component::Harness,
            "Worker command has no {} placeholder; every worker runs the same command",
            stress_tester::config::SEQ_PLACEHOLDER
        );
    }
}

/// Resolves on Ctrl+C, or SIGTERM on unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            logging::log_error(Component::Harness, "Signal handling", &err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                logging::log_error(Component::Harness, "SIGTERM handling", &err);
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
