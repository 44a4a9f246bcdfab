//! The end-to-end run: request → start time → script → frames → video.
//!
//! Stages run strictly in order and the first failure stops the run. The
//! only exception is playback: the video already exists at that point, so
//! a failing player is logged and the run still succeeds.

use std::path::{Path, PathBuf};

use serde::Serialize;

use skylapse_core::error::CoreError;
use skylapse_core::ffmpeg::VideoAssembler;
use skylapse_core::prerequisites::{check_prerequisites, ensure_scripts_dir};
use skylapse_core::render::{RenderJob, RenderOrchestrator, RenderReport};
use skylapse_core::request::{RequestParams, SimulationRequest};
use skylapse_core::start_time::{resolve_start_time, ResolvedStartTime};
use skylapse_core::template;
use skylapse_core::types::Coordinates;
use skylapse_core::window::WindowResizer;

use crate::args::{Args, LocationArg};
use crate::config::PipelineConfig;
use crate::geocode::{GeocodeError, Geocoder};

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Geocode(#[from] GeocodeError),
}

impl PipelineError {
    /// Stage label for the user-facing error line.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Core(e) => e.stage(),
            Self::Geocode(_) => "location lookup",
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// What a successful run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub request: SimulationRequest,
    pub start: ResolvedStartTime,
    pub render: RenderReport,
    pub output: PathBuf,
    pub played: bool,
}

pub struct Pipeline {
    config: PipelineConfig,
    orchestrator: RenderOrchestrator,
    assembler: VideoAssembler,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        let orchestrator =
            RenderOrchestrator::new(config.planetarium.binary.clone(), config.render);
        let assembler = VideoAssembler::new(config.encoder.clone(), config.player.clone());
        Self {
            config,
            orchestrator,
            assembler,
        }
    }

    /// Resize the renderer window with `resizer` when a window size is requested.
    pub fn with_resizer(mut self, resizer: Box<dyn WindowResizer>) -> Self {
        self.orchestrator = self.orchestrator.with_resizer(resizer);
        self
    }

    /// Run the pipeline for parsed command line arguments.
    pub async fn run(&self, args: &Args) -> Result<RunSummary, PipelineError> {
        let location = match args.location()? {
            LocationArg::Coordinates(coords) => coords,
            LocationArg::PlaceName(name) => {
                // Everything but the location must be valid before the lookup.
                SimulationRequest::new(args.to_params(Coordinates::new(0.0, 0.0)?))?;
                Geocoder::new(self.config.geocoder_url.as_str())?
                    .lookup(&name)
                    .await?
            }
        };
        self.execute(args.to_params(location), args.show).await
    }

    /// Validate `params` and run every stage.
    pub async fn execute(
        &self,
        params: RequestParams,
        show: bool,
    ) -> Result<RunSummary, PipelineError> {
        let request = SimulationRequest::new(params)?;
        log_request(&request);

        let prerequisites = check_prerequisites(
            &self.config.template_dir,
            request.template_name(),
            &self.config.planetarium,
            &self.assembler,
            show,
        )
        .await?;

        let start = resolve_start_time(&request, self.config.sunset_offset)?;
        tracing::info!(
            start = %start.start,
            auto_resolved = start.was_auto_resolved,
            "Simulation start",
        );

        let scratch_dir = absolute(&self.config.scratch_dir)?;
        let script = template::generate(&prerequisites.template, &request, &start, &scratch_dir);
        let scripts_dir = ensure_scripts_dir(&self.config.planetarium).await?;
        let job = RenderJob::new(scratch_dir, scripts_dir);

        let render = self
            .orchestrator
            .run(&job, &script, request.window_size())
            .await?
            .into_result()?;

        self.assembler
            .assemble(
                &job.scratch_dir,
                request.frame_rate(),
                request.video_size(),
                request.output_path(),
            )
            .await?;

        let played = show && self.play(request.output_path()).await;

        Ok(RunSummary {
            output: request.output_path().to_path_buf(),
            request,
            start,
            render,
            played,
        })
    }

    async fn play(&self, video: &Path) -> bool {
        match self.assembler.play(video).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    stage = e.stage(),
                    error = %e,
                    "Playback failed, video was still written",
                );
                false
            }
        }
    }
}

fn log_request(request: &SimulationRequest) {
    let view = request.view();
    tracing::info!(
        location = %request.location(),
        body = request.body(),
        date = %request.date(),
        caption = request.caption(),
        altitude = view.altitude,
        azimuth = view.azimuth,
        fov = view.fov,
        cadence_secs = request.cadence_secs(),
        total_span_secs = request.total_span_secs(),
        frames = request.frame_count(),
        frame_rate = request.frame_rate(),
        video_size = %request.video_size(),
        window_size = ?request.window_size(),
        output = %request.output_path().display(),
        template = request.template_name(),
        "Timelapse requested",
    );
}

/// The renderer resolves relative screenshot paths against its own
/// working directory.
fn absolute(path: &Path) -> Result<PathBuf, CoreError> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
