//! Coordinate type definitions

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Web Mercator valid latitude range
pub const MIN_LAT: f64 = -85.05112878;
pub const MAX_LAT: f64 = 85.05112878;

/// Valid longitude range
pub const MIN_LON: f64 = -180.0;
pub const MAX_LON: f64 = 180.0;

/// Supported zoom levels.
///
/// Capped so that `2^zoom` always fits in a `u32` grid coordinate.
pub const MIN_ZOOM: u8 = 0;
pub const MAX_ZOOM: u8 = 30;

/// Address of a single tile in the XYZ (slippy map) scheme.
///
/// `x` grows eastward and `y` southward; both lie in `[0, 2^zoom)`.
/// Keys order zoom-major, then by column, then by row, which is also the
/// order a [`super::TileExtent`] walks them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileKey {
    /// Zoom level (0-30)
    pub zoom: u8,
    /// Column, 0 at the antimeridian west edge
    pub x: u32,
    /// Row, 0 at the north edge
    pub y: u32,
}

impl TileKey {
    /// Creates a validated tile key.
    ///
    /// # Errors
    ///
    /// Returns `CoordError::InvalidZoom` for zoom levels above [`MAX_ZOOM`] and
    /// `CoordError::OutOfRange` when `x` or `y` fall outside the grid.
    pub fn new(zoom: u8, x: u32, y: u32) -> Result<Self, CoordError> {
        if zoom > MAX_ZOOM {
            return Err(CoordError::InvalidZoom(zoom));
        }
        let side = Self::grid_size(zoom);
        if u64::from(x) >= side || u64::from(y) >= side {
            return Err(CoordError::OutOfRange { zoom, x, y });
        }
        Ok(Self { zoom, x, y })
    }

    /// Number of tiles along one side of the grid at `zoom`.
    #[inline]
    pub fn grid_size(zoom: u8) -> u64 {
        1u64 << zoom
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}

/// Geographic bounding box in WGS84 degrees.
///
/// Serialized in the conventional `[minLon, minLat, maxLon, maxLat]` order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl Bounds {
    /// Creates a validated bounding box.
    ///
    /// Longitudes must lie in `[-180, 180]` and latitudes in `[-90, 90]`;
    /// latitudes beyond the Web Mercator limit are clamped when tiles are
    /// enumerated, not here.
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Result<Self, CoordError> {
        for lon in [min_lon, max_lon] {
            if !(MIN_LON..=MAX_LON).contains(&lon) {
                return Err(CoordError::InvalidLongitude(lon));
            }
        }
        for lat in [min_lat, max_lat] {
            if !(-90.0..=90.0).contains(&lat) {
                return Err(CoordError::InvalidLatitude(lat));
            }
        }
        if min_lon > max_lon || min_lat > max_lat {
            return Err(CoordError::InvalidBounds(format!(
                "[{}, {}, {}, {}] has min greater than max",
                min_lon, min_lat, max_lon, max_lat
            )));
        }

        Ok(Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        })
    }

    /// The whole Web Mercator world.
    pub fn world() -> Self {
        Self {
            min_lon: MIN_LON,
            min_lat: MIN_LAT,
            max_lon: MAX_LON,
            max_lat: MAX_LAT,
        }
    }

    /// Returns the box as `[minLon, minLat, maxLon, maxLat]`.
    pub fn to_array(&self) -> [f64; 4] {
        [self.min_lon, self.min_lat, self.max_lon, self.max_lat]
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::world()
    }
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            self.min_lon, self.min_lat, self.max_lon, self.max_lat
        )
    }
}

impl FromStr for Bounds {
    type Err = CoordError;

    /// Parses `minLon,minLat,maxLon,maxLat` (whitespace and brackets allowed).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches('[').trim_end_matches(']');
        let values = trimmed
            .split(',')
            .map(|part| part.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| CoordError::InvalidBounds(format!("'{}': {}", s, e)))?;

        match values.as_slice() {
            [min_lon, min_lat, max_lon, max_lat] => {
                Self::new(*min_lon, *min_lat, *max_lon, *max_lat)
            }
            _ => Err(CoordError::InvalidBounds(format!(
                "'{}': expected four comma-separated numbers",
                s
            ))),
        }
    }
}

/// Errors that can occur during coordinate handling.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordError {
    /// Latitude is outside the accepted range
    #[error("Invalid latitude: {0} (must be between {min} and {max})", min = MIN_LAT, max = MAX_LAT)]
    InvalidLatitude(f64),

    /// Longitude is outside valid range (-180.0 to 180.0)
    #[error("Invalid longitude: {0} (must be between {min} and {max})", min = MIN_LON, max = MAX_LON)]
    InvalidLongitude(f64),

    /// Zoom level is outside valid range
    #[error("Invalid zoom level: {0} (must be between {min} and {max})", min = MIN_ZOOM, max = MAX_ZOOM)]
    InvalidZoom(u8),

    /// Zoom range has minzoom above maxzoom
    #[error("Invalid zoom range: minzoom {minzoom} is greater than maxzoom {maxzoom}")]
    InvalidZoomRange { minzoom: u8, maxzoom: u8 },

    /// Tile column or row outside the grid for its zoom level
    #[error("Tile {zoom}/{x}/{y} is outside the grid for zoom {zoom}")]
    OutOfRange { zoom: u8, x: u32, y: u32 },

    /// Bounding box could not be parsed or is inverted
    #[error("Invalid bounds {0}")]
    InvalidBounds(String),
}
