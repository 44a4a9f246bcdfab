//! Resolution of the simulation start instant.

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

use crate::error::CoreError;
use crate::request::SimulationRequest;
use crate::solar;

/// Absolute UTC instant at which the simulation starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolvedStartTime {
    pub start: DateTime<Utc>,
    /// `true` when the start was derived from the sunset because no time of
    /// day was given.
    pub was_auto_resolved: bool,
}

/// Determine when the simulation starts.
///
/// On Earth a written time of exactly `00:00:00` means "no time given":
/// the start becomes the sunset of that calendar date plus
/// `offset_after_sunset`. Any other time, and any time on other bodies,
/// is used literally.
pub fn resolve_start_time(
    request: &SimulationRequest,
    offset_after_sunset: TimeDelta,
) -> Result<ResolvedStartTime, CoreError> {
    if !request.needs_sunset_resolution() {
        return Ok(ResolvedStartTime {
            start: request.date().and_utc(),
            was_auto_resolved: false,
        });
    }

    let location = request.location();
    tracing::warn!(
        date = %request.calendar_date(),
        "No time given, starting the simulation at sunset",
    );

    let sunset = solar::sunset(request.calendar_date(), location.latitude, location.longitude)?;
    let start = sunset + offset_after_sunset;

    tracing::info!(%sunset, %start, "Resolved start time from sunset");

    Ok(ResolvedStartTime {
        start,
        was_auto_resolved: true,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
