//! Coordinate conventions shared by the floor, the actors and the command layer.
//!
//! Continuous world positions are [`Position2D`] (`glam::DVec2`), tile indices are
//! [`TilePosition2D`] (`glam::IVec2`, origin-centered). Angles are measured in
//! turns (`1.0` is a full circle) and grow counter-clockwise.

use glam::{DVec2, IVec2};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// A position in continuous world space.
pub type Position2D = DVec2;

/// A tile index, with tile `(0, 0)` at the world origin.
pub type TilePosition2D = IVec2;

/// Quantized cardinal direction derived from a continuous angle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Heading {
    #[default]
    PosX,
    NegX,
    PosY,
    NegY,
}

impl Heading {
    /// Quantizes `angle` (in turns) into one of the four octant buckets.
    ///
    /// `+X` covers `[-1/8, 1/8]`, `+Y` covers `(1/8, 3/8)`, `-Y` covers
    /// `(-3/8, -1/8]` and everything else is `-X`.
    pub fn from_angle(angle: f64) -> Self {
        let angle = normalize_angle(angle);
        if (-0.125..=0.125).contains(&angle) {
            Heading::PosX
        } else if angle > 0.125 && angle < 0.375 {
            Heading::PosY
        } else if angle > -0.375 && angle <= -0.125 {
            Heading::NegY
        } else {
            Heading::NegX
        }
    }

    /// The angle, in turns, this heading points at.
    pub fn angle(self) -> f64 {
        match self {
            Heading::PosX => 0.0,
            Heading::PosY => 0.25,
            Heading::NegX => 0.5,
            Heading::NegY => -0.25,
        }
    }

    /// Unit tile step "forward" along this heading.
    pub fn forward(self) -> TilePosition2D {
        self.to_global(IVec2::new(1, 0))
    }

    /// Rotates a local `(front, side)` offset into the global tile frame.
    ///
    /// `side` is positive towards the left of the heading.
    pub fn to_global(self, local: TilePosition2D) -> TilePosition2D {
        let (front, side) = (local.x, local.y);
        match self {
            Heading::PosX => IVec2::new(front, side),
            Heading::PosY => IVec2::new(-side, front),
            Heading::NegX => IVec2::new(-front, -side),
            Heading::NegY => IVec2::new(side, -front),
        }
    }

    /// Inverse of [`Heading::to_global`].
    pub fn to_local(self, global: TilePosition2D) -> TilePosition2D {
        let (x, y) = (global.x, global.y);
        match self {
            Heading::PosX => IVec2::new(x, y),
            Heading::PosY => IVec2::new(y, -x),
            Heading::NegX => IVec2::new(-x, -y),
            Heading::NegY => IVec2::new(-y, x),
        }
    }
}

/// Wraps an angle (in turns) into `(-0.5, 0.5]`.
pub fn normalize_angle(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(1.0);
    if wrapped > 0.5 { wrapped - 1.0 } else { wrapped }
}

/// Signed shortest angular distance from `from` to `to`, in turns.
pub fn angular_distance(from: f64, to: f64) -> f64 {
    let distance = normalize_angle(to - from);
    if distance.abs() >= 1.0 { 0.0 } else { distance }
}

/// Unit vector pointing along `angle` (in turns).
pub fn direction(angle: f64) -> Position2D {
    DVec2::from_angle(angle * TAU)
}

/// Rotates a local `(forward, sideways)` displacement by the continuous `angle`.
pub fn rotate_local(local: Position2D, angle: f64) -> Position2D {
    direction(angle).rotate(local)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heading_buckets() {
        assert_eq!(Heading::from_angle(0.0), Heading::PosX);
        assert_eq!(Heading::from_angle(0.125), Heading::PosX);
        assert_eq!(Heading::from_angle(-0.125), Heading::PosX);
        assert_eq!(Heading::from_angle(-0.126), Heading::NegY);
        assert_eq!(Heading::from_angle(0.25), Heading::PosY);
        assert_eq!(Heading::from_angle(0.375), Heading::NegX);
        assert_eq!(Heading::from_angle(0.5), Heading::NegX);
        assert_eq!(Heading::from_angle(-0.25), Heading::NegY);
        assert_eq!(Heading::from_angle(1.25), Heading::PosY);
    }

    #[test]
    fn normalization_range() {
        assert_eq!(normalize_angle(0.5), 0.5);
        assert_eq!(normalize_angle(-0.5), 0.5);
        assert_eq!(normalize_angle(0.75), -0.25);
        assert_eq!(normalize_angle(-1.25), -0.25);
    }

    #[test]
    fn offset_tables_are_inverse() {
        for heading in [Heading::PosX, Heading::PosY, Heading::NegX, Heading::NegY] {
            for x in -2..=2 {
                for y in -2..=2 {
                    let offset = IVec2::new(x, y);
                    assert_eq!(heading.to_local(heading.to_global(offset)), offset);
                }
            }
        }
    }

    #[test]
    fn left_is_counter_clockwise() {
        // Facing +Y, the left-hand side is -X.
        assert_eq!(Heading::PosY.to_global(IVec2::new(0, 1)), IVec2::new(-1, 0));
        assert_eq!(Heading::PosY.forward(), IVec2::new(0, 1));
        assert_eq!(Heading::NegY.forward(), IVec2::new(0, -1));
    }
}
