//! Place name lookup through a Nominatim-compatible search API.

use std::time::Duration;

use serde::Deserialize;

use skylapse_core::error::CoreError;
use skylapse_core::types::Coordinates;

/// Public OpenStreetMap search endpoint.
pub const DEFAULT_GEOCODER_URL: &str = "https://nominatim.openstreetmap.org/search";

/// HTTP request timeout for one lookup.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Nominatim's usage policy requires an identifying user agent.
const USER_AGENT: &str = concat!("skylapse/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    /// Network, DNS, TLS or timeout failure.
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Geocoder returned HTTP {0}")]
    HttpStatus(u16),

    #[error("Unexpected geocoder response: {0}")]
    Parse(String),

    #[error("No place found for '{0}'")]
    NotFound(String),

    #[error(transparent)]
    InvalidCoordinates(#[from] CoreError),
}

// ---------------------------------------------------------------------------
// Geocoder
// ---------------------------------------------------------------------------

/// One search hit. Nominatim returns coordinates as strings.
#[derive(Debug, Deserialize)]
struct Place {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: Option<String>,
}

/// Resolves place names to coordinates.
pub struct Geocoder {
    client: reqwest::Client,
    search_url: String,
}

impl Geocoder {
    pub fn new(search_url: impl Into<String>) -> Result<Self, GeocodeError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            search_url: search_url.into(),
        })
    }

    /// Coordinates of the best match for `place`.
    pub async fn lookup(&self, place: &str) -> Result<Coordinates, GeocodeError> {
        tracing::info!(place, url = %self.search_url, "Looking up location");

        let response = self
            .client
            .get(&self.search_url)
            .query(&[("q", place), ("format", "json"), ("limit", "1")])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(GeocodeError::HttpStatus(response.status().as_u16()));
        }

        let body = response.text().await?;
        let coords = parse_search_response(place, &body)?;
        tracing::info!(place, %coords, "Location resolved");
        Ok(coords)
    }
}

/// Coordinates of the first hit in a Nominatim JSON search response.
pub fn parse_search_response(place: &str, body: &str) -> Result<Coordinates, GeocodeError> {
    let places: Vec<Place> =
        serde_json::from_str(body).map_err(|e| GeocodeError::Parse(e.to_string()))?;
    let first = places
        .into_iter()
        .next()
        .ok_or_else(|| GeocodeError::NotFound(place.to_string()))?;

    let parse = |value: &str, what: &str| {
        value
            .trim()
            .parse::<f64>()
            .map_err(|_| GeocodeError::Parse(format!("{what} '{value}' is not a number")))
    };
    let longitude = parse(&first.lon, "longitude")?;
    let latitude = parse(&first.lat, "latitude")?;

    if let Some(name) = &first.display_name {
        tracing::debug!(place, matched = %name, "Geocoder match");
    }
    Ok(Coordinates::new(longitude, latitude)?)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn first_hit_is_used() {
        let body = r#"[
            {"place_id": 1, "lat": "50.9119", "lon": "13.3428", "display_name": "Freiberg, Sachsen"},
            {"place_id": 2, "lat": "47.0", "lon": "8.0", "display_name": "Elsewhere"}
        ]"#;
        let coords = parse_search_response("Freiberg", body).expect("coordinates");
        assert_eq!(coords.longitude, 13.3428);
        assert_eq!(coords.latitude, 50.9119);
    }

    #[test]
    fn empty_result_is_not_found() {
        let err = parse_search_response("Atlantis", "[]").unwrap_err();
        assert_matches!(err, GeocodeError::NotFound(place) if place == "Atlantis");
    }

    #[test]
    fn malformed_body_rejected() {
        assert_matches!(
            parse_search_response("x", "<html>rate limited</html>"),
            Err(GeocodeError::Parse(_))
        );
        assert_matches!(
            parse_search_response("x", r#"[{"lat": "north", "lon": "1"}]"#),
            Err(GeocodeError::Parse(_))
        );
    }

    #[test]
    fn out_of_range_coordinates_rejected() {
        assert_matches!(
            parse_search_response("x", r#"[{"lat": "95", "lon": "1"}]"#),
            Err(GeocodeError::InvalidCoordinates(CoreError::InvalidArgument(_)))
        );
    }

    #[test]
    fn client_builds() {
        assert!(Geocoder::new(DEFAULT_GEOCODER_URL).is_ok());
    }
}
