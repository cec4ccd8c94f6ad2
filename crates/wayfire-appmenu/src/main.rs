use std::process::ExitCode;

use anyhow::Context;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use wayfire_appmenu::{JsonLinesSurface, SessionConfig, run_session};

/// Initialize tracing with APPMENU_LOG and LOG_FORMAT support.
fn init_tracing() {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match std::env::var("APPMENU_LOG").as_deref() {
            Ok("trace") => "trace",
            Ok("debug") => "debug",
            Ok("warn") | Ok("warning") => "warn",
            Ok("error") => "error",
            _ => "info",
        };
        EnvFilter::new(format!("wayfire_appmenu={level}"))
    };

    let use_json = std::env::var("LOG_FORMAT").as_deref() == Ok("json");

    // stdout carries surface updates; logs go to stderr.
    if use_json {
        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr));
        let _ = subscriber.try_init();
    } else {
        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr));
        let _ = subscriber.try_init();
    }
}

async fn run() -> anyhow::Result<()> {
    let config = SessionConfig::from_env();
    tracing::debug!(?config, "Loaded configuration");

    let mut surface = JsonLinesSurface::new(std::io::stdout());
    run_session(&config, &mut surface)
        .await
        .context("compositor session ended")
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    init_tracing();
    tracing::info!("wayfire-appmenu {}", env!("CARGO_PKG_VERSION"));

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
