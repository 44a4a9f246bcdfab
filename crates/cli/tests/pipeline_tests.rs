//! End-to-end pipeline runs against fake renderer, encoder and player
//! scripts.
#![cfg(unix)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use assert_matches::assert_matches;
use chrono::{NaiveDate, TimeDelta, Timelike};
use clap::Parser;

use skylapse::args::Args;
use skylapse::config::PipelineConfig;
use skylapse::pipeline::{Pipeline, PipelineError};
use skylapse_core::error::CoreError;
use skylapse_core::prerequisites::Planetarium;
use skylapse_core::render::{RenderConfig, RenderState};
use skylapse_core::request::{parse_requested_date, RequestParams};
use skylapse_core::template::SCRIPT_FILE_NAME;
use skylapse_core::tool::ExternalTool;
use skylapse_core::types::{Coordinates, FrameSize, ViewDirection};

const RENDERER_OK: &str = r#"dir="$4"
for i in 000 001 002 003; do : > "$dir/frame_$i.png"; done
: > "$dir/first.png"
: > "$dir/final.png"
exec sleep 60
"#;

const RENDERER_STUCK: &str = r#"dir="$4"
: > "$dir/frame_000.png"
exec sleep 60
"#;

const ENCODER_OK: &str = r#"printf '%s\n' "$@" > "$(dirname "$0")/encoder.args"
: > "${@: -1}"
"#;

const ENCODER_FAIL: &str = "echo 'Invalid data found when processing input' >&2\nexit 1\n";

struct Env {
    root: tempfile::TempDir,
}

impl Env {
    fn new() -> Self {
        let root = tempfile::tempdir().expect("temp dir");
        std::fs::create_dir_all(root.path().join("stellarium")).expect("mkdir user data");
        std::fs::create_dir_all(root.path().join("tools")).expect("mkdir tools");
        Self { root }
    }

    fn path(&self, rel: &str) -> PathBuf {
        self.root.path().join(rel)
    }

    /// Write a fake tool; marker file `<name>.ran` records that it started.
    fn tool(&self, name: &str, body: &str) -> ExternalTool {
        let script = self.path(&format!("tools/{name}.sh"));
        let marker = self.path(&format!("tools/{name}.ran"));
        std::fs::write(&script, format!(": > '{}'\n{body}", marker.display()))
            .expect("write tool");
        ExternalTool::with_args("bash", [script.into_os_string()])
    }

    fn ran(&self, name: &str) -> bool {
        self.path(&format!("tools/{name}.ran")).exists()
    }

    fn config(&self, renderer: &str, encoder: &str, player: &str) -> PipelineConfig {
        PipelineConfig {
            planetarium: Planetarium {
                binary: self.tool("renderer", renderer),
                user_data_dir: self.path("stellarium"),
            },
            template_dir: Path::new(env!("CARGO_MANIFEST_DIR")).join("../../script"),
            scratch_dir: self.path("frames"),
            encoder: self.tool("encoder", encoder),
            player: self.tool("player", player),
            render: RenderConfig {
                poll_interval: Duration::from_millis(50),
                timeout: Duration::from_millis(1_500),
            },
            sunset_offset: TimeDelta::zero(),
            geocoder_url: "http://127.0.0.1:9/search".to_string(),
        }
    }

    fn params(&self) -> RequestParams {
        RequestParams {
            location: Coordinates::new(13.34, 50.91).expect("valid"),
            body: "Earth".to_string(),
            date: parse_requested_date("2024-06-21").expect("valid"),
            view: ViewDirection::new(20.0, 0.0, 70.0).expect("valid"),
            cadence_secs: 20.0,
            total_span_secs: 7200.0,
            caption: "Freiberg".to_string(),
            video_size: FrameSize::FULL_HD,
            window_size: None,
            frame_rate: 30.0,
            output_path: self.path("out.mp4"),
            template_name: "default".to_string(),
        }
    }
}

#[tokio::test]
async fn sunset_run_produces_video() {
    let env = Env::new();
    let pipeline = Pipeline::new(env.config(RENDERER_OK, ENCODER_OK, "exit 0\n"));

    let summary = pipeline.execute(env.params(), false).await.expect("run");

    assert!(summary.start.was_auto_resolved);
    assert_eq!(
        summary.start.start.date_naive(),
        NaiveDate::from_ymd_opt(2024, 6, 21).expect("valid")
    );
    assert!((18..22).contains(&summary.start.start.hour()));
    assert_eq!(summary.render.outcome, RenderState::FramesComplete);
    assert_eq!(summary.render.frames_rendered, 4);
    assert!(env.path("out.mp4").exists());
    assert!(!summary.played);
    assert!(!env.ran("player"));

    let script = std::fs::read_to_string(env.path("stellarium/scripts").join(SCRIPT_FILE_NAME))
        .expect("generated script");
    assert!(script.contains("var param_timespan = 2.0;"));
    assert!(script.contains("var param_dt = 20.0;"));
    assert!(script.contains(&env.path("frames").display().to_string()));
    assert!(!has_placeholder(&script));

    let encoder_args = std::fs::read_to_string(env.path("tools/encoder.args")).expect("args");
    assert!(encoder_args.lines().any(|l| l.ends_with("frame_%03d.png")));
    assert!(encoder_args.lines().any(|l| l == "1920x1080"));
}

#[tokio::test]
async fn failed_playback_does_not_fail_run() {
    let env = Env::new();
    let pipeline = Pipeline::new(env.config(RENDERER_OK, ENCODER_OK, "exit 1\n"));

    let summary = pipeline.execute(env.params(), true).await.expect("run");

    assert!(env.ran("player"));
    assert!(!summary.played);
    assert!(env.path("out.mp4").exists());
}

#[tokio::test]
async fn odd_video_size_fails_before_any_launch() {
    let env = Env::new();
    let pipeline = Pipeline::new(env.config(RENDERER_OK, ENCODER_OK, "exit 0\n"));
    let mut params = env.params();
    params.video_size = FrameSize {
        width: 1921,
        height: 1080,
    };

    let err = pipeline.execute(params, false).await.unwrap_err();

    assert_matches!(err, PipelineError::Core(CoreError::InvalidArgument(_)));
    assert_eq!(err.stage(), "arguments");
    assert!(!env.ran("renderer"));
    assert!(!env.path("frames").exists());
    assert!(!env.path("stellarium/scripts").exists());
}

#[tokio::test]
async fn render_timeout_skips_encoding() {
    let env = Env::new();
    let pipeline = Pipeline::new(env.config(RENDERER_STUCK, ENCODER_OK, "exit 0\n"));

    let err = pipeline.execute(env.params(), false).await.unwrap_err();

    assert_matches!(
        err,
        PipelineError::Core(CoreError::RenderTimeout { frames_rendered: 1, .. })
    );
    assert!(env.ran("renderer"));
    assert!(!env.ran("encoder"));
    assert!(env.path("frames/frame_000.png").exists());
}

#[tokio::test]
async fn encoder_failure_keeps_frames() {
    let env = Env::new();
    let pipeline = Pipeline::new(env.config(RENDERER_OK, ENCODER_FAIL, "exit 0\n"));

    let err = pipeline.execute(env.params(), false).await.unwrap_err();

    assert_matches!(
        err,
        PipelineError::Core(CoreError::EncodingFailed { ref stderr, .. })
            if stderr.contains("Invalid data")
    );
    assert_eq!(err.stage(), "encoding");
    assert!(env.path("frames/frame_003.png").exists());
}

#[tokio::test]
async fn polar_night_needs_explicit_time() {
    let env = Env::new();
    let pipeline = Pipeline::new(env.config(RENDERER_OK, ENCODER_OK, "exit 0\n"));
    let mut params = env.params();
    params.location = Coordinates::new(15.65, 78.22).expect("valid");
    params.date = parse_requested_date("2024-12-21").expect("valid");

    let err = pipeline.execute(params, false).await.unwrap_err();

    assert_matches!(err, PipelineError::Core(CoreError::NoEventOnThisDate { .. }));
    assert!(!env.ran("renderer"));
}

#[tokio::test]
async fn missing_template_checked_before_side_effects() {
    let env = Env::new();
    let pipeline = Pipeline::new(env.config(RENDERER_OK, ENCODER_OK, "exit 0\n"));
    let mut params = env.params();
    params.template_name = "does-not-exist".to_string();

    let err = pipeline.execute(params, false).await.unwrap_err();

    assert_matches!(err, PipelineError::Core(CoreError::TemplateNotFound(_)));
    assert_eq!(err.stage(), "prerequisites");
    assert!(!env.path("frames").exists());
}

#[tokio::test]
async fn explicit_time_on_mars_is_literal() {
    let env = Env::new();
    let pipeline = Pipeline::new(env.config(RENDERER_OK, ENCODER_OK, "exit 0\n"));
    let mut params = env.params();
    params.body = "Mars".to_string();

    let summary = pipeline.execute(params, false).await.expect("run");

    assert!(!summary.start.was_auto_resolved);
    assert_eq!(summary.start.start.hour(), 0);
    let script = std::fs::read_to_string(env.path("stellarium/scripts").join(SCRIPT_FILE_NAME))
        .expect("generated script");
    assert!(script.contains("\"2024-06-21T00:00:00\""));
    assert!(script.contains("var param_planet = \"Mars\";"));
}

/// Whether any `$NAME$` token survived generation.
fn has_placeholder(script: &str) -> bool {
    script.split('$').skip(1).step_by(2).any(|token| {
        !token.is_empty() && token.chars().all(|c| c.is_ascii_uppercase() || c == '_')
    })
}

#[tokio::test]
async fn invalid_request_fails_before_place_lookup() {
    let env = Env::new();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let mut config = env.config(RENDERER_OK, ENCODER_OK, "exit 0\n");
    config.geocoder_url = format!("http://{addr}/search");

    let args = Args::try_parse_from([
        "skylapse", "-t", "x", "-d", "2024-06-21", "-l", "Freiberg", "--dt", "PT3H", "--ts",
        "PT1H",
    ])
    .expect("valid args");
    let err = Pipeline::new(config).run(&args).await.unwrap_err();

    assert_matches!(err, PipelineError::Core(CoreError::InvalidArgument(_)));
    let accepted = tokio::time::timeout(Duration::from_millis(200), listener.accept()).await;
    assert!(accepted.is_err(), "geocoder was contacted");
    assert!(!env.ran("renderer"));
}
