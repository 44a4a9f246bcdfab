//! Small value types shared by the request model and the pipeline stages.

use std::fmt;

use serde::Serialize;

use crate::error::CoreError;

/// Maximum frame dimension (width or height) accepted by the encoder stage.
const MAX_DIMENSION: u32 = 7680;

/* --------------------------------------------------------------------------
Coordinates
-------------------------------------------------------------------------- */

/// Observer location in decimal degrees (east-positive, north-positive).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinates {
    pub longitude: f64,
    pub latitude: f64,
}

impl Coordinates {
    /// Build coordinates, rejecting values outside the valid ranges.
    pub fn new(longitude: f64, latitude: f64) -> Result<Self, CoreError> {
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(CoreError::InvalidArgument(format!(
                "Longitude must be within [-180, 180] (got {longitude})"
            )));
        }
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(CoreError::InvalidArgument(format!(
                "Latitude must be within [-90, 90] (got {latitude})"
            )));
        }
        Ok(Self {
            longitude,
            latitude,
        })
    }

    /// Parse a `"lon,lat"` pair.
    pub fn parse_lon_lat(s: &str) -> Result<Self, CoreError> {
        let parts: Vec<&str> = s.split(',').collect();
        if parts.len() != 2 {
            return Err(CoreError::InvalidArgument(format!(
                "Invalid location '{s}': expected LONGITUDE,LATITUDE"
            )));
        }
        let longitude = parse_f64(parts[0], "longitude", s)?;
        let latitude = parse_f64(parts[1], "latitude", s)?;
        Self::new(longitude, latitude)
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "long={}°, lat={}°", self.longitude, self.latitude)
    }
}

/* --------------------------------------------------------------------------
FrameSize
-------------------------------------------------------------------------- */

/// Pixel dimensions of a video or a renderer window.
///
/// Both components are even: `yuv420p` subsamples chroma in 2x2 blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub const FULL_HD: FrameSize = FrameSize {
        width: 1920,
        height: 1080,
    };

    /// Validate and build a frame size.
    pub fn new(width: u32, height: u32) -> Result<Self, CoreError> {
        if width == 0 || height == 0 {
            return Err(CoreError::InvalidArgument(
                "Width and height must be greater than 0".to_string(),
            ));
        }
        if width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(CoreError::InvalidArgument(format!(
                "Dimensions must not exceed {MAX_DIMENSION}px (got {width}x{height})"
            )));
        }
        if width % 2 != 0 || height % 2 != 0 {
            return Err(CoreError::InvalidArgument(format!(
                "Width and height must both be even (got {width}x{height})"
            )));
        }
        Ok(Self { width, height })
    }

    /// Parse a size string like `"1920x1080"`.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        let parts: Vec<&str> = s.trim().split('x').collect();
        if parts.len() != 2 {
            return Err(CoreError::InvalidArgument(format!(
                "Invalid size '{s}': expected WIDTHxHEIGHT"
            )));
        }
        let width = parts[0]
            .parse::<u32>()
            .map_err(|_| CoreError::InvalidArgument(format!("Invalid width in size '{s}'")))?;
        let height = parts[1]
            .parse::<u32>()
            .map_err(|_| CoreError::InvalidArgument(format!("Invalid height in size '{s}'")))?;
        Self::new(width, height)
    }
}

impl fmt::Display for FrameSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/* --------------------------------------------------------------------------
ViewDirection
-------------------------------------------------------------------------- */

/// Where the virtual camera looks, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ViewDirection {
    pub altitude: f64,
    pub azimuth: f64,
    pub fov: f64,
}

impl ViewDirection {
    pub fn new(altitude: f64, azimuth: f64, fov: f64) -> Result<Self, CoreError> {
        if !altitude.is_finite() || !(-90.0..=90.0).contains(&altitude) {
            return Err(CoreError::InvalidArgument(format!(
                "Altitude must be within [-90, 90] (got {altitude})"
            )));
        }
        if !azimuth.is_finite() {
            return Err(CoreError::InvalidArgument(format!(
                "Azimuth must be a finite number (got {azimuth})"
            )));
        }
        if !fov.is_finite() || fov <= 0.0 || fov > 360.0 {
            return Err(CoreError::InvalidArgument(format!(
                "Field of view must be within (0, 360] (got {fov})"
            )));
        }
        Ok(Self {
            altitude,
            azimuth,
            fov,
        })
    }

    /// Parse an `"alt,az,fov"` triple.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        let parts: Vec<&str> = s.split(',').collect();
        if parts.len() != 3 {
            return Err(CoreError::InvalidArgument(format!(
                "Invalid view '{s}': expected ALTITUDE,AZIMUTH,FOV"
            )));
        }
        Self::new(
            parse_f64(parts[0], "altitude", s)?,
            parse_f64(parts[1], "azimuth", s)?,
            parse_f64(parts[2], "field of view", s)?,
        )
    }
}

fn parse_f64(part: &str, what: &str, whole: &str) -> Result<f64, CoreError> {
    part.trim()
        .parse::<f64>()
        .map_err(|_| CoreError::InvalidArgument(format!("Invalid {what} in '{whole}'")))
}

/* --------------------------------------------------------------------------
Tests
-------------------------------------------------------------------------- */
