//! Tile extents: the set of tile keys covering a bounding box over a zoom range.

use super::types::{Bounds, CoordError, TileKey, MAX_ZOOM};
use super::to_grid_position;

/// Inclusive rectangle of tiles at a single zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRange {
    pub zoom: u8,
    pub min_x: u32,
    pub max_x: u32,
    pub min_y: u32,
    pub max_y: u32,
}

impl TileRange {
    /// Computes the tiles at `zoom` that intersect `bounds`.
    ///
    /// A box edge lying exactly on a tile boundary does not pull in the
    /// neighbouring tile. Degenerate boxes (a single point or line) still
    /// cover the one tile that contains them.
    pub fn covering(bounds: &Bounds, zoom: u8) -> Self {
        let last = (TileKey::grid_size(zoom) - 1) as f64;

        // North edge gives the smallest row
        let (west, north) = to_grid_position(bounds.max_lat, bounds.min_lon, zoom);
        let (east, south) = to_grid_position(bounds.min_lat, bounds.max_lon, zoom);

        let min_x = west.floor().clamp(0.0, last) as u32;
        let min_y = north.floor().clamp(0.0, last) as u32;
        let max_x = ((east.ceil() - 1.0).clamp(0.0, last) as u32).max(min_x);
        let max_y = ((south.ceil() - 1.0).clamp(0.0, last) as u32).max(min_y);

        Self {
            zoom,
            min_x,
            max_x,
            min_y,
            max_y,
        }
    }

    /// Number of tiles in the range.
    pub fn tile_count(&self) -> u64 {
        u64::from(self.max_x - self.min_x + 1) * u64::from(self.max_y - self.min_y + 1)
    }

    /// Returns true if `key` lies in this range.
    pub fn contains(&self, key: &TileKey) -> bool {
        key.zoom == self.zoom
            && (self.min_x..=self.max_x).contains(&key.x)
            && (self.min_y..=self.max_y).contains(&key.y)
    }
}

/// Options driving a tile read stream: an inclusive zoom range and a
/// bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReadOptions {
    pub minzoom: u8,
    pub maxzoom: u8,
    pub bounds: Bounds,
}

impl ReadOptions {
    /// Creates validated read options.
    pub fn new(minzoom: u8, maxzoom: u8, bounds: Bounds) -> Result<Self, CoordError> {
        if maxzoom > MAX_ZOOM {
            return Err(CoordError::InvalidZoom(maxzoom));
        }
        if minzoom > maxzoom {
            return Err(CoordError::InvalidZoomRange { minzoom, maxzoom });
        }
        Ok(Self {
            minzoom,
            maxzoom,
            bounds,
        })
    }

    /// Per-zoom tile ranges, lowest zoom first.
    pub fn ranges(&self) -> impl Iterator<Item = TileRange> + '_ {
        (self.minzoom..=self.maxzoom).map(|zoom| TileRange::covering(&self.bounds, zoom))
    }

    /// Total number of tiles in the extent.
    pub fn tile_count(&self) -> u64 {
        self.ranges().map(|r| r.tile_count()).sum()
    }

    /// Lazily enumerates every tile key in the extent.
    pub fn keys(&self) -> TileExtent {
        TileExtent::new(self.ranges().collect())
    }
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            minzoom: 0,
            maxzoom: 0,
            bounds: Bounds::world(),
        }
    }
}

/// Lazy, finite walk over the tile keys of a [`ReadOptions`] extent.
///
/// Keys come out zoom-major, then by column, then by row. The walk is
/// consumed as it goes and cannot be restarted.
#[derive(Debug, Clone)]
pub struct TileExtent {
    ranges: Vec<TileRange>,
    index: usize,
    x: u32,
    y: u32,
    remaining: u64,
}

impl TileExtent {
    fn new(ranges: Vec<TileRange>) -> Self {
        let remaining = ranges.iter().map(|r| r.tile_count()).sum();
        let (x, y) = ranges
            .first()
            .map(|r| (r.min_x, r.min_y))
            .unwrap_or((0, 0));

        Self {
            ranges,
            index: 0,
            x,
            y,
            remaining,
        }
    }

    /// Number of keys not yet yielded.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }
}

impl Iterator for TileExtent {
    type Item = TileKey;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let range = *self.ranges.get(self.index)?;

            if self.x > range.max_x {
                self.index += 1;
                if let Some(next) = self.ranges.get(self.index) {
                    self.x = next.min_x;
                    self.y = next.min_y;
                }
                continue;
            }

            let key = TileKey {
                zoom: range.zoom,
                x: self.x,
                y: self.y,
            };

            if self.y >= range.max_y {
                self.y = range.min_y;
                self.x += 1;
            } else {
                self.y += 1;
            }
            self.remaining -= 1;

            return Some(key);
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match usize::try_from(self.remaining) {
            Ok(n) => (n, Some(n)),
            Err(_) => (usize::MAX, None),
        }
    }
}
