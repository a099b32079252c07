//! The bounded, tiled floor the turtles draw on.

use crate::color::Color;
use crate::geometry::{Position2D, TilePosition2D};
use crate::sensor::TileSensor;
use glam::{DVec2, IVec2};

/// Largest supported half size per axis; larger requests are clamped.
pub const MAX_HALF_SIZE: i32 = 1 << 14;

/// A floor of `(2·half_size+1)` tiles per axis, centered on the world origin.
///
/// Every index is clamped into the floor, so no accessor can fail.
#[derive(Clone, Debug)]
pub struct TiledFloor {
    tile_size: DVec2,
    half_size: IVec2,
    clear_color: Color,
    pixels: Vec<Color>,
    dirty: bool,
    revision: u64,
}

impl Default for TiledFloor {
    fn default() -> Self {
        Self::new(IVec2::ZERO, DVec2::ONE, Color::WHITE)
    }
}

impl TiledFloor {
    /// A cleared floor of `(2·half_size+1)` tiles per axis.
    pub fn new(half_size: IVec2, tile_size: DVec2, clear_color: Color) -> Self {
        let mut floor = Self {
            tile_size,
            half_size,
            clear_color,
            pixels: Vec::new(),
            dirty: false,
            revision: 0,
        };
        floor.reset(half_size, tile_size);
        floor
    }

    /// Reallocates the floor for a new size and tile pitch, then clears it.
    pub fn reset(&mut self, half_size: IVec2, tile_size: DVec2) {
        self.half_size = half_size.clamp(IVec2::ZERO, IVec2::splat(MAX_HALF_SIZE));
        self.tile_size = tile_size;
        self.pixels = vec![self.clear_color; tile_count(self.dimensions())];
        self.mark_dirty();
    }

    /// Fills every tile with the clear color.
    pub fn clear(&mut self) {
        self.pixels.fill(self.clear_color);
        self.mark_dirty();
    }

    /// Color used by the next [`TiledFloor::clear`].
    pub fn set_clear_color(&mut self, color: Color) {
        self.clear_color = color;
    }

    /// Color of an unpainted tile.
    pub fn clear_color(&self) -> Color {
        self.clear_color
    }

    /// Tiles from the origin to the edge, per axis.
    pub fn half_size(&self) -> IVec2 {
        self.half_size
    }

    /// World-space size of one tile.
    pub fn tile_size(&self) -> DVec2 {
        self.tile_size
    }

    /// Total tile count per axis.
    pub fn dimensions(&self) -> IVec2 {
        self.half_size * 2 + 1
    }

    /// World-space distance from the origin to the center of the outermost tiles.
    pub fn half_extent(&self) -> Position2D {
        self.tile_size * self.half_size.as_dvec2()
    }

    /// Maps a continuous position to the tile it lies on.
    ///
    /// Positions within half a tile of the origin map to `0`; beyond that the
    /// index is `floor(|x| + tile/2)` carrying the sign of `x`.
    pub fn to_tile_index(&self, position: Position2D) -> TilePosition2D {
        fn to_tile(coord: f64, size: f64) -> i32 {
            if coord.abs() < size / 2.0 {
                return 0;
            }
            let shifted = ((coord.abs() + size / 2.0) / size).floor();
            (shifted * coord.signum()) as i32
        }

        IVec2::new(
            to_tile(position.x, self.tile_size.x),
            to_tile(position.y, self.tile_size.y),
        )
    }

    /// Center of `tile` in world space.
    pub fn to_position(&self, tile: TilePosition2D) -> Position2D {
        tile.as_dvec2() * self.tile_size
    }

    /// Saturates each axis into `[-half_size, half_size]`.
    pub fn clamp(&self, tile: TilePosition2D) -> TilePosition2D {
        tile.clamp(-self.half_size, self.half_size)
    }

    /// Color of `tile`, clamped onto the floor.
    pub fn color(&self, tile: TilePosition2D) -> Color {
        self.pixels[self.index(tile)]
    }

    /// Color of the tile under `position`.
    pub fn color_at(&self, position: Position2D) -> Color {
        self.color(self.to_tile_index(position))
    }

    /// Paints `tile`, clamped onto the floor.
    pub fn set_color(&mut self, tile: TilePosition2D, color: Color) {
        let index = self.index(tile);
        self.pixels[index] = color;
        self.mark_dirty();
    }

    /// Paints the tile under `position`.
    pub fn set_color_at(&mut self, position: Position2D, color: Color) {
        self.set_color(self.to_tile_index(position), color);
    }

    /// Reads a `(2·radius+1)²` square around `center` in the global axis frame.
    ///
    /// The center is shifted inward first so the whole square lies on the floor.
    pub fn tiles(&self, center: TilePosition2D, radius: i32) -> TileSensor {
        let radius = radius.max(0);
        let reach = IVec2::splat(radius);
        let low = -self.half_size + reach;
        let high = self.half_size - reach;
        let center = center.max(low).min(high);

        let mut data = Vec::with_capacity(((radius * 2 + 1) * (radius * 2 + 1)) as usize);
        for x in -radius..=radius {
            for y in -radius..=radius {
                data.push(self.color(center + IVec2::new(x, y)));
            }
        }

        TileSensor::new(data, radius).unwrap_or_default()
    }

    /// Row-major tile colors, row `0` at `-half_size.y`.
    pub fn pixels(&self) -> &[Color] {
        &self.pixels
    }

    /// Returns whether the floor changed since the last call, clearing the flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    /// Monotonic counter bumped by every write.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn mark_dirty(&mut self) {
        self.dirty = true;
        self.revision += 1;
    }

    fn index(&self, tile: TilePosition2D) -> usize {
        offset(self.clamp(tile) + self.half_size, self.dimensions())
    }
}

fn tile_count(dims: IVec2) -> usize {
    dims.x.max(0) as usize * dims.y.max(0) as usize
}

/// Row-major offset of a non-negative `corner` in a grid of `dims`.
fn offset(corner: IVec2, dims: IVec2) -> usize {
    corner.y as usize * dims.x as usize + corner.x as usize
}
