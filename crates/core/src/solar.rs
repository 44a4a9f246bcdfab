//! Solar event resolver (sunrise, sunset, solar noon).
//!
//! Implements the NOAA solar calculator equations: the sun's declination
//! and the equation of time are derived from its orbital elements at a
//! given instant, and the hour-angle equation
//!
//! ```text
//! cos(H) = [cos(90.833°) - sin(lat)·sin(dec)] / [cos(lat)·cos(dec)]
//! ```
//!
//! yields the offset of sunrise/sunset from solar noon. The 90.833° zenith
//! accounts for atmospheric refraction (0.567°) and the solar semi-diameter
//! (0.266°). When `|cos(H)| > 1` the sun never crosses that horizon on the
//! given day (polar day or polar night).
//!
//! Angles are degrees at the public API and radians inside trig calls.
//! Internal time is Julian centuries since J2000.0.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, Timelike, Utc};

use crate::error::CoreError;

/// Zenith angle of the sun's centre at sunrise/sunset, in degrees.
pub const HORIZON_ZENITH_DEG: f64 = 90.833;

/// Geometric altitude of the sun's centre at sunrise/sunset, in degrees.
pub const HORIZON_ALTITUDE_DEG: f64 = 90.0 - HORIZON_ZENITH_DEG;

/// Julian day of the Unix epoch (1970-01-01T00:00:00Z).
const UNIX_EPOCH_JULIAN_DAY: f64 = 2_440_587.5;

/// Julian day of J2000.0.
const J2000_JULIAN_DAY: f64 = 2_451_545.0;

const DAYS_PER_JULIAN_CENTURY: f64 = 36_525.0;
const SECS_PER_DAY: f64 = 86_400.0;

/// Stop refining once the event estimate moves by less than this.
const CONVERGENCE_SECS: f64 = 0.01;
const MAX_ITERATIONS: usize = 25;

/// A horizon crossing of the sun.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolarEvent {
    /// Sun's centre rises above the refraction-corrected horizon.
    Sunrise,
    /// Sun's centre sinks below the refraction-corrected horizon.
    Sunset,
}

/// Sun position quantities that depend only on the instant.
#[derive(Debug, Clone, Copy)]
struct SolarParameters {
    declination_deg: f64,
    /// Equation of time in minutes (apparent minus mean solar time).
    equation_of_time_min: f64,
}

/* --------------------------------------------------------------------------
Public API
-------------------------------------------------------------------------- */

/// First sunset within `[date 00:00 UTC, date + 24h)` at the given location.
///
/// Fails with [`CoreError::NoEventOnThisDate`] when the sun does not set
/// inside that window (polar day or polar night).
pub fn sunset(date: NaiveDate, latitude: f64, longitude: f64) -> Result<DateTime<Utc>, CoreError> {
    find_event(date, latitude, longitude, SolarEvent::Sunset)
}

/// First sunrise within `[date 00:00 UTC, date + 24h)` at the given location.
pub fn sunrise(date: NaiveDate, latitude: f64, longitude: f64) -> Result<DateTime<Utc>, CoreError> {
    find_event(date, latitude, longitude, SolarEvent::Sunrise)
}

/// Find the first `event` inside the 24-hour UTC window starting at `date`.
///
/// Local solar days do not line up with UTC days away from the prime
/// meridian, so the events of the neighbouring local days are considered as
/// well and the earliest one inside the window wins.
pub fn find_event(
    date: NaiveDate,
    latitude: f64,
    longitude: f64,
    event: SolarEvent,
) -> Result<DateTime<Utc>, CoreError> {
    let window_start = utc_midnight(date);
    let window_end = window_start + TimeDelta::days(1);

    let found = [-1i64, 0, 1]
        .into_iter()
        .filter_map(|day_offset| {
            let day = window_start + TimeDelta::days(day_offset);
            event_on_day(day, latitude, longitude, event)
        })
        .filter(|t| *t >= window_start && *t < window_end)
        .min();

    found.ok_or(CoreError::NoEventOnThisDate {
        longitude,
        latitude,
        date,
    })
}

/// Instant the sun crosses the local meridian on `date` at `longitude`.
///
/// Far east or west of Greenwich the result can fall on the neighbouring
/// UTC date.
pub fn solar_noon(date: NaiveDate, longitude: f64) -> DateTime<Utc> {
    let day = utc_midnight(date);
    let jd_midnight = julian_day(day);

    let mut minutes = 720.0 - 4.0 * longitude;
    for _ in 0..MAX_ITERATIONS {
        let params = solar_parameters(julian_century(jd_midnight + minutes / 1440.0));
        let next = 720.0 - 4.0 * longitude - params.equation_of_time_min;
        let moved = (next - minutes).abs() * 60.0;
        minutes = next;
        if moved < CONVERGENCE_SECS {
            break;
        }
    }
    day + seconds_delta(minutes * 60.0)
}

/// Geometric altitude of the sun's centre above the horizon, in degrees.
///
/// Sunrise and sunset happen when this equals [`HORIZON_ALTITUDE_DEG`].
pub fn solar_altitude(t: DateTime<Utc>, latitude: f64, longitude: f64) -> f64 {
    let params = solar_parameters(julian_century(julian_day(t)));

    let time = t.time();
    let minutes_of_day = f64::from(time.num_seconds_from_midnight()) / 60.0
        + f64::from(time.nanosecond()) / 60e9;
    let true_solar_time =
        (minutes_of_day + params.equation_of_time_min + 4.0 * longitude).rem_euclid(1440.0);
    let hour_angle = true_solar_time / 4.0 - 180.0;

    let lat = latitude.to_radians();
    let dec = params.declination_deg.to_radians();
    let cos_zenith = (lat.sin() * dec.sin() + lat.cos() * dec.cos() * hour_angle.to_radians().cos())
        .clamp(-1.0, 1.0);

    90.0 - cos_zenith.acos().to_degrees()
}

/* --------------------------------------------------------------------------
Ephemeris
-------------------------------------------------------------------------- */

fn utc_midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn julian_day(t: DateTime<Utc>) -> f64 {
    t.timestamp() as f64 / SECS_PER_DAY
        + f64::from(t.timestamp_subsec_nanos()) / (SECS_PER_DAY * 1e9)
        + UNIX_EPOCH_JULIAN_DAY
}

fn julian_century(julian_day: f64) -> f64 {
    (julian_day - J2000_JULIAN_DAY) / DAYS_PER_JULIAN_CENTURY
}

fn solar_parameters(jc: f64) -> SolarParameters {
    let mean_anomaly = 357.52911 + jc * (35_999.05029 - 0.0001537 * jc);
    let mean_longitude = (280.46646 + jc * (36_000.76983 + jc * 0.0003032)).rem_euclid(360.0);
    let eccentricity = 0.016708634 - jc * (0.000042037 + 0.0000001267 * jc);

    let mean_obliquity =
        23.0 + (26.0 + (21.448 - jc * (46.815 + jc * (0.00059 - jc * 0.001813))) / 60.0) / 60.0;
    let omega = (125.04 - 1934.136 * jc).to_radians();
    let obliquity = mean_obliquity + 0.00256 * omega.cos();

    let m = mean_anomaly.to_radians();
    let equation_of_center = m.sin() * (1.914602 - jc * (0.004817 + 0.000014 * jc))
        + (2.0 * m).sin() * (0.019993 - 0.000101 * jc)
        + (3.0 * m).sin() * 0.000289;
    let true_longitude = mean_longitude + equation_of_center;
    let apparent_longitude = true_longitude - 0.00569 - 0.00478 * omega.sin();

    let declination_deg = (obliquity.to_radians().sin() * apparent_longitude.to_radians().sin())
        .asin()
        .to_degrees();

    let y = (obliquity.to_radians() / 2.0).tan().powi(2);
    let l0 = mean_longitude.to_radians();
    let equation_of_time_min = 4.0
        * (y * (2.0 * l0).sin() - 2.0 * eccentricity * m.sin()
            + 4.0 * eccentricity * y * m.sin() * (2.0 * l0).cos()
            - 0.5 * y * y * (4.0 * l0).sin()
            - 1.25 * eccentricity * eccentricity * (2.0 * m).sin())
        .to_degrees();

    SolarParameters {
        declination_deg,
        equation_of_time_min,
    }
}

/// Hour angle of the sun at the horizon crossing, in degrees, or `None`
/// when the sun stays above or below the horizon all day.
fn horizon_hour_angle(latitude: f64, declination: f64) -> Option<f64> {
    let lat = latitude.to_radians();
    let dec = declination.to_radians();
    let cos_h = (HORIZON_ZENITH_DEG.to_radians().cos() - lat.sin() * dec.sin())
        / (lat.cos() * dec.cos());

    if !cos_h.is_finite() || !(-1.0..=1.0).contains(&cos_h) {
        return None;
    }
    Some(cos_h.acos().to_degrees())
}

/// Event time for the local solar day anchored at UTC midnight `day`.
///
/// The ephemeris is re-evaluated at each estimate until it settles, so the
/// result is consistent with [`solar_altitude`] at that instant.
fn event_on_day(
    day: DateTime<Utc>,
    latitude: f64,
    longitude: f64,
    event: SolarEvent,
) -> Option<DateTime<Utc>> {
    let jd_midnight = julian_day(day);
    let mut minutes = 720.0 - 4.0 * longitude;

    for _ in 0..MAX_ITERATIONS {
        let params = solar_parameters(julian_century(jd_midnight + minutes / 1440.0));
        let hour_angle = horizon_hour_angle(latitude, params.declination_deg)?;
        let noon = 720.0 - 4.0 * longitude - params.equation_of_time_min;
        let next = match event {
            SolarEvent::Sunrise => noon - 4.0 * hour_angle,
            SolarEvent::Sunset => noon + 4.0 * hour_angle,
        };
        let moved = (next - minutes).abs() * 60.0;
        minutes = next;
        if moved < CONVERGENCE_SECS {
            break;
        }
    }

    Some(day + seconds_delta(minutes * 60.0))
}

/// Whole-second offset; the resolver's precision is one second.
fn seconds_delta(secs: f64) -> TimeDelta {
    TimeDelta::seconds(secs.round() as i64)
}

/* --------------------------------------------------------------------------
Tests
-------------------------------------------------------------------------- */
