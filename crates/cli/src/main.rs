//! `skylapse` -- render a night-sky timelapse video.
//!
//! # Environment variables
//!
//! See [`skylapse::config::PipelineConfig::from_env`]. A `.env` file in the
//! working directory is loaded first. Log verbosity follows `RUST_LOG`.

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use skylapse::args::Args;
use skylapse::config::PipelineConfig;
use skylapse::pipeline::{Pipeline, PipelineError, RunSummary};
use skylapse_core::error::CoreError;
use skylapse_core::window::platform_resizer;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "skylapse=info,skylapse_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Exits with status 2 on malformed arguments.
    let args = Args::parse();

    match run(&args).await {
        Ok(summary) => {
            tracing::info!(
                output = %summary.output.display(),
                frames = summary.render.frames_rendered,
                render_ms = summary.render.elapsed_ms,
                "Done",
            );
            if let Ok(json) = serde_json::to_string(&summary) {
                tracing::debug!(summary = %json, "Run summary");
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {}: {err:#}", stage_of(&err));
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args) -> anyhow::Result<RunSummary> {
    let config = PipelineConfig::from_env().context("invalid configuration")?;
    tracing::debug!(?config, "Loaded configuration");

    let resizer = platform_resizer().context("window resizer unavailable")?;
    let pipeline = Pipeline::new(config).with_resizer(resizer);

    Ok(pipeline.run(args).await?)
}

/// Stage label of the first typed error in the chain.
fn stage_of(err: &anyhow::Error) -> &'static str {
    err.chain()
        .find_map(|cause| {
            cause
                .downcast_ref::<PipelineError>()
                .map(PipelineError::stage)
                .or_else(|| cause.downcast_ref::<CoreError>().map(CoreError::stage))
        })
        .unwrap_or("setup")
}
