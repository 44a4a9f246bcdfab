//! Command line surface.

use std::path::PathBuf;

use clap::Parser;

use skylapse_core::duration::parse_iso8601_duration;
use skylapse_core::error::CoreError;
use skylapse_core::request::{
    parse_requested_date, RequestParams, RequestedDate, DEFAULT_TEMPLATE, EARTH,
};
use skylapse_core::types::{Coordinates, FrameSize, ViewDirection};

/// Observer used when neither `--location` nor `--long/--lat` is given.
pub const DEFAULT_LONGITUDE: f64 = 13.34277;
pub const DEFAULT_LATITUDE: f64 = 50.911944;

/// Render a night-sky timelapse with Stellarium and encode it with ffmpeg.
#[derive(Parser, Debug, Clone)]
#[command(name = "skylapse", version, about)]
pub struct Args {
    /// Caption shown in the video
    #[arg(short = 't', long)]
    pub caption: String,

    /// Start date in UTC ("2024-06-21", "2024-06-21T21:30:00", RFC 3339).
    /// Without a time of day the simulation starts at sunset.
    #[arg(short = 'd', long, value_parser = parse_requested_date)]
    pub date: RequestedDate,

    /// Simulated time between two frames (ISO 8601 duration)
    #[arg(
        long,
        visible_alias = "dt",
        default_value = "PT20S",
        value_parser = parse_iso8601_duration
    )]
    pub cadence: f64,

    /// Frame rate of the output video
    #[arg(long, default_value_t = 30.0)]
    pub fps: f64,

    /// Observer location: "lon,lat" or a place name to look up
    #[arg(short = 'l', long, conflicts_with_all = ["long", "lat"])]
    pub location: Option<String>,

    /// Observer longitude in degrees, east positive
    #[arg(long, allow_negative_numbers = true)]
    pub long: Option<f64>,

    /// Observer latitude in degrees, north positive
    #[arg(long, allow_negative_numbers = true)]
    pub lat: Option<f64>,

    /// Output video file
    #[arg(short = 'o', long, default_value = "out.mp4")]
    pub output: PathBuf,

    /// Body the observer stands on
    #[arg(short = 'p', long, default_value = EARTH)]
    pub planet: String,

    /// Play the video after rendering
    #[arg(short = 's', long)]
    pub show: bool,

    /// Script template name (file `<name>.ssc` in the template directory)
    #[arg(long, default_value = DEFAULT_TEMPLATE)]
    pub script: String,

    /// Total simulated time span (ISO 8601 duration)
    #[arg(
        long,
        visible_alias = "ts",
        default_value = "PT2H",
        value_parser = parse_iso8601_duration
    )]
    pub timespan: f64,

    /// View direction and field of view as "altitude,azimuth,fov" in degrees
    #[arg(
        long,
        default_value = "20,0,70",
        value_parser = ViewDirection::parse,
        allow_hyphen_values = true
    )]
    pub view: ViewDirection,

    /// Output video size "WxH"; both dimensions must be even
    #[arg(long, default_value = "1920x1080", value_parser = FrameSize::parse)]
    pub video_size: FrameSize,

    /// Force the renderer window to "WxH" once it is open
    #[arg(long, value_parser = FrameSize::parse)]
    pub window_size: Option<FrameSize>,
}

/// Where the observer stands, before any geocoding.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationArg {
    Coordinates(Coordinates),
    PlaceName(String),
}

impl Args {
    /// Interpret `--location` / `--long` / `--lat`.
    ///
    /// A `--location` that parses as "lon,lat" is used directly; anything
    /// else is a place name.
    pub fn location(&self) -> Result<LocationArg, CoreError> {
        match &self.location {
            Some(text) => match Coordinates::parse_lon_lat(text) {
                Ok(coords) => Ok(LocationArg::Coordinates(coords)),
                Err(e) if looks_numeric(text) => Err(e),
                Err(_) => Ok(LocationArg::PlaceName(text.trim().to_string())),
            },
            None => Ok(LocationArg::Coordinates(Coordinates::new(
                self.long.unwrap_or(DEFAULT_LONGITUDE),
                self.lat.unwrap_or(DEFAULT_LATITUDE),
            )?)),
        }
    }

    /// Request fields for an already resolved `location`.
    pub fn to_params(&self, location: Coordinates) -> RequestParams {
        RequestParams {
            location,
            body: self.planet.clone(),
            date: self.date,
            view: self.view,
            cadence_secs: self.cadence,
            total_span_secs: self.timespan,
            caption: self.caption.clone(),
            video_size: self.video_size,
            window_size: self.window_size,
            frame_rate: self.fps,
            output_path: self.output.clone(),
            template_name: self.script.clone(),
        }
    }
}

/// Whether `text` is made of numbers and separators only, i.e. a malformed
/// coordinate pair rather than a place name.
fn looks_numeric(text: &str) -> bool {
    text.chars()
        .all(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '-' | '+' | ' '))
}
