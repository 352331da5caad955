//! Coordinate conversion module
//!
//! Provides conversions between geographic coordinates (latitude/longitude)
//! and Web Mercator tile keys, plus the lazy enumeration of every tile key
//! covering a bounding box over a zoom range.

mod extent;
mod types;

pub use extent::{ReadOptions, TileExtent, TileRange};
pub use types::{
    Bounds, CoordError, TileKey, MAX_LAT, MAX_LON, MAX_ZOOM, MIN_LAT, MIN_LON, MIN_ZOOM,
};

use std::f64::consts::PI;

/// Converts geographic coordinates to fractional tile-grid coordinates.
///
/// Latitude is clamped to the Web Mercator range. The returned `(x, y)` pair
/// is in tile units, so `floor` of each component is the containing tile.
#[inline]
pub(crate) fn to_grid_position(lat: f64, lon: f64, zoom: u8) -> (f64, f64) {
    let n = TileKey::grid_size(zoom) as f64;
    let lat = lat.clamp(MIN_LAT, MAX_LAT);

    let x = (lon + 180.0) / 360.0 * n;

    let lat_rad = lat * PI / 180.0;
    let y = (1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n;

    (x, y)
}

/// Converts geographic coordinates to the tile containing them.
///
/// # Arguments
///
/// * `lat` - Latitude in degrees (-85.05112878 to 85.05112878)
/// * `lon` - Longitude in degrees (-180.0 to 180.0)
/// * `zoom` - Zoom level (0 to 30)
#[inline]
pub fn to_tile_coords(lat: f64, lon: f64, zoom: u8) -> Result<TileKey, CoordError> {
    if !(MIN_LAT..=MAX_LAT).contains(&lat) {
        return Err(CoordError::InvalidLatitude(lat));
    }
    if !(MIN_LON..=MAX_LON).contains(&lon) {
        return Err(CoordError::InvalidLongitude(lon));
    }
    if zoom > MAX_ZOOM {
        return Err(CoordError::InvalidZoom(zoom));
    }

    let last = (TileKey::grid_size(zoom) - 1) as f64;
    let (x, y) = to_grid_position(lat, lon, zoom);

    // lon = 180 and lat = MIN_LAT land exactly on the far edge of the grid
    Ok(TileKey {
        zoom,
        x: x.floor().clamp(0.0, last) as u32,
        y: y.floor().clamp(0.0, last) as u32,
    })
}

/// Converts a tile key back to geographic coordinates.
///
/// Returns the latitude/longitude of the tile's northwest corner.
#[inline]
pub fn tile_to_lat_lon(tile: &TileKey) -> (f64, f64) {
    let n = TileKey::grid_size(tile.zoom) as f64;

    let lon = tile.x as f64 / n * 360.0 - 180.0;

    let y = tile.y as f64 / n;
    let lat_rad = (PI * (1.0 - 2.0 * y)).sinh().atan();
    let lat = lat_rad * 180.0 / PI;

    (lat, lon)
}
