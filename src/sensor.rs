//! Square snapshots of floor tiles around an actor.

use crate::color::Color;
use crate::geometry::{Heading, TilePosition2D};
use glam::IVec2;
use serde::{Deserialize, Serialize};

/// An immutable `(2·radius+1)²` snapshot of tile colors.
///
/// Offsets are signed `(front, side)` pairs measured from the center tile.
/// Data along `side` has a stride of one.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TileSensor {
    radius: i32,
    data: Vec<Color>,
}

impl TileSensor {
    /// Wraps `data` laid out row-major by `front`, then `side`.
    ///
    /// Returns `None` when `data` does not hold exactly `(2·radius+1)²` entries.
    pub fn new(data: Vec<Color>, radius: i32) -> Option<Self> {
        let length = (radius.max(0) * 2 + 1) as usize;
        (radius >= 0 && data.len() == length * length).then_some(Self { radius, data })
    }

    /// Number of tiles along one side of the square.
    pub fn size(&self) -> i32 {
        self.radius * 2 + 1
    }

    /// Tiles from the center to the edge of the square.
    pub fn radius(&self) -> i32 {
        self.radius
    }

    /// Color at `(front, side)`, or `None` outside the snapshot.
    pub fn get(&self, front: i32, side: i32) -> Option<Color> {
        self.index(front, side).map(|i| self.data[i])
    }

    /// Same as [`TileSensor::get`] with `offset = (front, side)`.
    pub fn at(&self, offset: TilePosition2D) -> Option<Color> {
        self.get(offset.x, offset.y)
    }

    /// Iterates over every `(offset, color)` pair.
    pub fn iter(&self) -> impl Iterator<Item = (TilePosition2D, Color)> + '_ {
        let r = self.radius;
        (-r..=r).flat_map(move |front| {
            (-r..=r).map(move |side| (IVec2::new(front, side), self.data[self.raw_index(front, side)]))
        })
    }

    /// Re-expresses a snapshot taken in the global axis frame in the local frame of `heading`.
    ///
    /// After this, `get(1, 0)` is the tile physically in front of the actor.
    pub fn into_local(self, heading: Heading) -> Self {
        if heading == Heading::PosX {
            return self;
        }
        let r = self.radius;
        let mut data = self.data.clone();
        for front in -r..=r {
            for side in -r..=r {
                let global = heading.to_global(IVec2::new(front, side));
                data[self.raw_index(front, side)] = self.data[self.raw_index(global.x, global.y)];
            }
        }
        Self { radius: r, data }
    }

    fn index(&self, front: i32, side: i32) -> Option<usize> {
        let r = self.radius;
        ((-r..=r).contains(&front) && (-r..=r).contains(&side)).then(|| self.raw_index(front, side))
    }

    fn raw_index(&self, front: i32, side: i32) -> usize {
        let length = self.size();
        ((self.radius + front) * length + (self.radius + side)) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(radius: i32) -> TileSensor {
        let size = (radius * 2 + 1) as usize;
        let data = (0..size * size)
            .map(|i| Color::from_rgb(i as f32, 0.0, 0.0))
            .collect();
        TileSensor::new(data, radius).unwrap()
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(TileSensor::new(vec![Color::WHITE; 8], 1).is_none());
        assert!(TileSensor::new(vec![Color::WHITE; 9], 1).is_some());
    }

    #[test]
    fn side_has_unit_stride() {
        let sensor = numbered(1);
        assert_eq!(sensor.get(-1, -1).unwrap().r, 0.0);
        assert_eq!(sensor.get(-1, 0).unwrap().r, 1.0);
        assert_eq!(sensor.get(0, 0).unwrap().r, 4.0);
        assert_eq!(sensor.get(2, 0), None);
    }

    #[test]
    fn local_frame_follows_heading() {
        let global = numbered(1);
        let local = global.clone().into_local(Heading::PosY);
        // Facing +Y, "forward" is global (0, 1) and "left" is global (-1, 0).
        assert_eq!(local.get(1, 0), global.get(0, 1));
        assert_eq!(local.get(0, 1), global.get(-1, 0));
        assert_eq!(local.get(0, 0), global.get(0, 0));
    }
}
