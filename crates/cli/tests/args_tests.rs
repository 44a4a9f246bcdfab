//! Command line parsing.

use assert_matches::assert_matches;
use chrono::{NaiveDate, NaiveTime};
use clap::Parser;

use skylapse::args::{Args, LocationArg, DEFAULT_LATITUDE, DEFAULT_LONGITUDE};
use skylapse_core::error::CoreError;
use skylapse_core::request::SimulationRequest;
use skylapse_core::types::{Coordinates, FrameSize};

fn parse(extra: &[&str]) -> Result<Args, clap::Error> {
    let mut argv = vec!["skylapse", "-t", "Freiberg", "-d", "2024-06-21"];
    argv.extend_from_slice(extra);
    Args::try_parse_from(argv)
}

#[test]
fn defaults() {
    let args = parse(&[]).expect("valid args");

    assert_eq!(args.cadence, 20.0);
    assert_eq!(args.timespan, 7200.0);
    assert_eq!(args.fps, 30.0);
    assert_eq!(args.planet, "Earth");
    assert_eq!(args.script, "default");
    assert_eq!(args.video_size, FrameSize::FULL_HD);
    assert_eq!(args.window_size, None);
    assert_eq!(args.output.to_string_lossy(), "out.mp4");
    assert!(!args.show);
    assert_eq!(
        (args.view.altitude, args.view.azimuth, args.view.fov),
        (20.0, 0.0, 70.0)
    );
    assert_eq!(
        args.date.utc,
        NaiveDate::from_ymd_opt(2024, 6, 21)
            .expect("valid")
            .and_time(NaiveTime::MIN)
    );
    assert_eq!(
        args.location().expect("location"),
        LocationArg::Coordinates(
            Coordinates::new(DEFAULT_LONGITUDE, DEFAULT_LATITUDE).expect("valid")
        )
    );
}

#[test]
fn caption_and_date_are_required() {
    assert!(Args::try_parse_from(["skylapse", "-d", "2024-06-21"]).is_err());
    assert!(Args::try_parse_from(["skylapse", "-t", "x"]).is_err());
}

#[test]
fn iso_durations_and_aliases() {
    let args = parse(&["--dt", "PT1M", "--ts", "PT30M"]).expect("valid args");
    assert_eq!(args.cadence, 60.0);
    assert_eq!(args.timespan, 1800.0);
}

#[test]
fn negative_duration_rejected() {
    let err = parse(&["--cadence", "-PT20S"]).unwrap_err();
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn odd_video_size_rejected() {
    let err = parse(&["--video-size", "1921x1080"]).unwrap_err();
    assert_eq!(err.exit_code(), 2);
    assert!(err.to_string().contains("1921"));
}

#[test]
fn sizes_and_view() {
    let args = parse(&[
        "--video-size",
        "1280x720",
        "--window-size",
        "1600x900",
        "--view",
        "-5,180,90",
    ])
    .expect("valid args");
    assert_eq!(args.video_size, FrameSize::new(1280, 720).expect("size"));
    assert_eq!(args.window_size, Some(FrameSize::new(1600, 900).expect("size")));
    assert_eq!(args.view.altitude, -5.0);
    assert_eq!(args.view.azimuth, 180.0);
}

#[test]
fn explicit_long_lat() {
    let args = parse(&["--long", "-70.4", "--lat", "-24.6"]).expect("valid args");
    assert_eq!(
        args.location().expect("location"),
        LocationArg::Coordinates(Coordinates::new(-70.4, -24.6).expect("valid"))
    );
}

#[test]
fn location_pair_or_place_name() {
    let args = parse(&["-l", "13.34,50.91"]).expect("valid args");
    assert_eq!(
        args.location().expect("location"),
        LocationArg::Coordinates(Coordinates::new(13.34, 50.91).expect("valid"))
    );

    let args = parse(&["-l", "Freiberg, Saxony"]).expect("valid args");
    assert_eq!(
        args.location().expect("location"),
        LocationArg::PlaceName("Freiberg, Saxony".to_string())
    );
}

#[test]
fn malformed_coordinates_are_not_place_names() {
    let args = parse(&["-l", "13.34,50.91,7"]).expect("valid args");
    assert_matches!(args.location(), Err(CoreError::InvalidArgument(_)));

    let args = parse(&["-l", "13.34,95"]).expect("valid args");
    assert_matches!(args.location(), Err(CoreError::InvalidArgument(_)));
}

#[test]
fn location_conflicts_with_long_lat() {
    assert!(parse(&["-l", "Berlin", "--lat", "50"]).is_err());
}

#[test]
fn cadence_longer_than_span_fails_validation() {
    let args = parse(&["--dt", "PT3H"]).expect("valid args");
    let location = Coordinates::new(13.34, 50.91).expect("valid");
    assert_matches!(
        SimulationRequest::new(args.to_params(location)),
        Err(CoreError::InvalidArgument(_))
    );
}

#[test]
fn to_params_carries_every_field() {
    let args = parse(&[
        "-p", "Mars", "-s", "--script", "wide", "-o", "mars.mp4", "--fps", "24",
    ])
    .expect("valid args");
    let params = args.to_params(Coordinates::new(0.0, 0.0).expect("valid"));

    assert_eq!(params.body, "Mars");
    assert_eq!(params.template_name, "wide");
    assert_eq!(params.output_path.to_string_lossy(), "mars.mp4");
    assert_eq!(params.frame_rate, 24.0);
    assert_eq!(params.caption, "Freiberg");
    assert!(args.show);
}
