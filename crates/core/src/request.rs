//! The validated, immutable description of one timelapse.
//!
//! [`SimulationRequest::new`] is the only way to build a request; every
//! cross-field rule is checked there so downstream stages can trust it.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

use crate::error::CoreError;
use crate::types::{Coordinates, FrameSize, ViewDirection};

/// Body name for which automatic sunset resolution is supported.
pub const EARTH: &str = "Earth";

/// Default script template name (`script/default.ssc`).
pub const DEFAULT_TEMPLATE: &str = "default";

/// A requested start as the user wrote it and as a UTC instant.
///
/// Whether a time of day was given is decided on the written form, so
/// `2024-06-21T02:00:00+02:00` is an explicit time even though it is
/// midnight in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RequestedDate {
    pub utc: NaiveDateTime,
    pub as_written: NaiveDateTime,
}

impl RequestedDate {
    /// A date-time already in UTC.
    pub fn utc(utc: NaiveDateTime) -> Self {
        Self {
            utc,
            as_written: utc,
        }
    }

    /// `true` unless the written time of day is exactly `00:00:00`.
    pub fn time_given(&self) -> bool {
        self.as_written.time() != NaiveTime::MIN
    }

    /// Calendar date as written.
    pub fn calendar_date(&self) -> NaiveDate {
        self.as_written.date()
    }
}

/// Unvalidated request fields, typically straight from the command line.
#[derive(Debug, Clone)]
pub struct RequestParams {
    pub location: Coordinates,
    pub body: String,
    pub date: RequestedDate,
    pub view: ViewDirection,
    pub cadence_secs: f64,
    pub total_span_secs: f64,
    pub caption: String,
    pub video_size: FrameSize,
    pub window_size: Option<FrameSize>,
    pub frame_rate: f64,
    pub output_path: PathBuf,
    pub template_name: String,
}

/// A fully validated timelapse request.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationRequest {
    location: Coordinates,
    body: String,
    date: RequestedDate,
    view: ViewDirection,
    cadence_secs: f64,
    total_span_secs: f64,
    caption: String,
    video_size: FrameSize,
    window_size: Option<FrameSize>,
    frame_rate: f64,
    output_path: PathBuf,
    template_name: String,
}

impl SimulationRequest {
    /// Validate `params` and freeze them into a request.
    pub fn new(params: RequestParams) -> Result<Self, CoreError> {
        if params.body.trim().is_empty() {
            return Err(CoreError::InvalidArgument(
                "Planet name must not be empty".to_string(),
            ));
        }
        if !params.cadence_secs.is_finite() || params.cadence_secs <= 0.0 {
            return Err(CoreError::InvalidArgument(format!(
                "Time between frames must be greater than 0 (got {}s)",
                params.cadence_secs
            )));
        }
        if !params.total_span_secs.is_finite() || params.total_span_secs <= 0.0 {
            return Err(CoreError::InvalidArgument(format!(
                "Total time span must be greater than 0 (got {}s)",
                params.total_span_secs
            )));
        }
        if params.cadence_secs > params.total_span_secs {
            return Err(CoreError::InvalidArgument(format!(
                "Time between frames ({}s) exceeds the total time span ({}s)",
                params.cadence_secs, params.total_span_secs
            )));
        }
        if !params.frame_rate.is_finite() || params.frame_rate <= 0.0 {
            return Err(CoreError::InvalidArgument(format!(
                "Frame rate must be greater than 0 (got {})",
                params.frame_rate
            )));
        }
        if params.output_path.as_os_str().is_empty() {
            return Err(CoreError::InvalidArgument(
                "Output path must not be empty".to_string(),
            ));
        }
        if params.template_name.is_empty()
            || params.template_name.contains(['/', '\\'])
            || params.template_name.starts_with('.')
        {
            return Err(CoreError::InvalidArgument(format!(
                "Invalid script template name '{}'",
                params.template_name
            )));
        }
        // FrameSize fields are public; re-check the even-dimension rule.
        FrameSize::new(params.video_size.width, params.video_size.height)?;
        if let Some(window) = params.window_size {
            FrameSize::new(window.width, window.height)?;
        }

        Ok(Self {
            location: params.location,
            body: params.body,
            date: params.date,
            view: params.view,
            cadence_secs: params.cadence_secs,
            total_span_secs: params.total_span_secs,
            caption: params.caption,
            video_size: params.video_size,
            window_size: params.window_size,
            frame_rate: params.frame_rate,
            output_path: params.output_path,
            template_name: params.template_name,
        })
    }

    pub fn location(&self) -> Coordinates {
        self.location
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn is_earth(&self) -> bool {
        self.body == EARTH
    }

    /// Requested start in UTC.
    pub fn date(&self) -> NaiveDateTime {
        self.date.utc
    }

    /// Calendar date of the request as the user wrote it.
    pub fn calendar_date(&self) -> NaiveDate {
        self.date.calendar_date()
    }

    /// Whether the start time must be resolved from the sunset.
    pub fn needs_sunset_resolution(&self) -> bool {
        self.is_earth() && !self.date.time_given()
    }

    pub fn view(&self) -> ViewDirection {
        self.view
    }

    pub fn cadence_secs(&self) -> f64 {
        self.cadence_secs
    }

    pub fn total_span_secs(&self) -> f64 {
        self.total_span_secs
    }

    pub fn total_span_hours(&self) -> f64 {
        self.total_span_secs / 3600.0
    }

    /// Number of frames the renderer will produce: one per step of the
    /// script's `sec < maxSec` loop.
    pub fn frame_count(&self) -> u64 {
        (self.total_span_secs / self.cadence_secs).ceil() as u64
    }

    pub fn caption(&self) -> &str {
        &self.caption
    }

    pub fn video_size(&self) -> FrameSize {
        self.video_size
    }

    pub fn window_size(&self) -> Option<FrameSize> {
        self.window_size
    }

    pub fn frame_rate(&self) -> f64 {
        self.frame_rate
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn template_name(&self) -> &str {
        &self.template_name
    }
}

/// Parse a date or date-time string.
///
/// Accepts `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM[:SS[.fff]]` (space separator
/// too), and RFC 3339 strings with an offset, whose instant is converted
/// to UTC.
pub fn parse_requested_date(s: &str) -> Result<RequestedDate, CoreError> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(RequestedDate {
            utc: dt.naive_utc(),
            as_written: dt.naive_local(),
        });
    }
    const FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];
    for format in FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(RequestedDate::utc(dt));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(RequestedDate::utc(date.and_time(NaiveTime::MIN)));
    }

    Err(CoreError::InvalidArgument(format!("Not a valid date: '{s}'")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod tests {
    use assert_matches::assert_matches;
    use chrono::Timelike;

    use super::*;

    /// Baseline parameters: Freiberg, midsummer 2024, two hours at 20s cadence.
    pub(crate) fn params() -> RequestParams {
        RequestParams {
            location: Coordinates::new(13.34, 50.91).expect("valid"),
            body: EARTH.to_string(),
            date: parse_requested_date("2024-06-21").expect("valid"),
            view: ViewDirection::new(20.0, 0.0, 70.0).expect("valid"),
            cadence_secs: 20.0,
            total_span_secs: 7200.0,
            caption: "Freiberg".to_string(),
            video_size: FrameSize::FULL_HD,
            window_size: None,
            frame_rate: 30.0,
            output_path: PathBuf::from("out.mp4"),
            template_name: DEFAULT_TEMPLATE.to_string(),
        }
    }

    #[test]
    fn frame_count_and_hours() {
        let req = SimulationRequest::new(params()).expect("valid");
        assert_eq!(req.frame_count(), 360);
        assert_eq!(req.total_span_hours(), 2.0);
    }

    #[test]
    fn partial_last_step_still_renders_a_frame() {
        let mut p = params();
        p.total_span_secs = 7210.0;
        let req = SimulationRequest::new(p).expect("valid");
        assert_eq!(req.frame_count(), 361);
    }

    #[test]
    fn odd_video_width_rejected() {
        let mut p = params();
        p.video_size = FrameSize {
            width: 1921,
            height: 1080,
        };
        assert_matches!(SimulationRequest::new(p), Err(CoreError::InvalidArgument(_)));
    }

    #[test]
    fn odd_window_height_rejected() {
        let mut p = params();
        p.window_size = Some(FrameSize {
            width: 1280,
            height: 721,
        });
        assert!(SimulationRequest::new(p).is_err());
    }

    #[test]
    fn cadence_must_not_exceed_span() {
        let mut p = params();
        p.cadence_secs = 7201.0;
        let err = SimulationRequest::new(p).unwrap_err();
        assert!(err.to_string().contains("exceeds"));
    }

    #[test]
    fn non_positive_values_rejected() {
        let mut p = params();
        p.cadence_secs = 0.0;
        assert!(SimulationRequest::new(p).is_err());

        let mut p = params();
        p.total_span_secs = -1.0;
        assert!(SimulationRequest::new(p).is_err());

        let mut p = params();
        p.frame_rate = 0.0;
        assert!(SimulationRequest::new(p).is_err());
    }

    #[test]
    fn template_name_cannot_escape_template_dir() {
        let mut p = params();
        p.template_name = "../secret".to_string();
        assert!(SimulationRequest::new(p).is_err());
    }

    #[test]
    fn midnight_on_earth_needs_resolution() {
        let req = SimulationRequest::new(params()).expect("valid");
        assert!(req.needs_sunset_resolution());
    }

    #[test]
    fn midnight_on_mars_is_literal() {
        let mut p = params();
        p.body = "Mars".to_string();
        let req = SimulationRequest::new(p).expect("valid");
        assert!(!req.needs_sunset_resolution());
    }

    #[test]
    fn explicit_time_is_literal() {
        let mut p = params();
        p.date = parse_requested_date("2024-06-21T21:00:00").expect("valid");
        let req = SimulationRequest::new(p).expect("valid");
        assert!(!req.needs_sunset_resolution());
    }

    // -- parse_requested_date --

    #[test]
    fn date_only_is_midnight() {
        let dt = parse_requested_date("2024-06-21").expect("valid");
        assert_eq!(dt.utc.time(), NaiveTime::MIN);
        assert!(!dt.time_given());
    }

    #[test]
    fn offset_converted_to_utc() {
        let dt = parse_requested_date("2024-06-21T23:30:00+02:00").expect("valid");
        assert_eq!(dt.utc.hour(), 21);
        assert_eq!(dt.utc.minute(), 30);
        assert_eq!(dt.as_written.hour(), 23);
    }

    #[test]
    fn utc_midnight_from_offset_is_an_explicit_time() {
        let mut p = params();
        p.date = parse_requested_date("2024-06-21T02:00:00+02:00").expect("valid");
        assert_eq!(p.date.utc.time(), NaiveTime::MIN);

        let req = SimulationRequest::new(p).expect("valid");
        assert!(!req.needs_sunset_resolution());
    }

    #[test]
    fn written_midnight_with_offset_needs_resolution() {
        let mut p = params();
        p.date = parse_requested_date("2024-06-21T00:00:00+02:00").expect("valid");
        let req = SimulationRequest::new(p).expect("valid");

        assert!(req.needs_sunset_resolution());
        assert_eq!(
            req.calendar_date(),
            NaiveDate::from_ymd_opt(2024, 6, 21).expect("valid")
        );
        assert_eq!(req.date().date(), NaiveDate::from_ymd_opt(2024, 6, 20).expect("valid"));
    }

    #[test]
    fn naive_time_forms_accepted() {
        assert!(parse_requested_date("2024-06-21T21:15").is_ok());
        assert!(parse_requested_date("2024-06-21 21:15:30").is_ok());
        assert!(parse_requested_date("2024-06-21T21:15:30.250").is_ok());
    }

    #[test]
    fn garbage_date_rejected() {
        assert_matches!(
            parse_requested_date("21/06/2024"),
            Err(CoreError::InvalidArgument(_))
        );
        assert!(parse_requested_date("2024-02-30").is_err());
    }
}
