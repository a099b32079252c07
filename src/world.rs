//! The simulated world: bounds, floor and actors.

use crate::command::ActorCommand;
use crate::config::SimulationConfig;
use crate::floor::TiledFloor;
use crate::geometry::Position2D;
use crate::turtle::{CallbackType, TurtleActor};
use glam::{DVec2, IVec2};
use serde::{Deserialize, Serialize};

/// Index of an actor inside its [`World`].
pub type ActorId = usize;

/// Axis-aligned bounding box given by two opposite corners.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Lower-left corner.
    pub min: Position2D,
    /// Upper-right corner.
    pub max: Position2D,
}

impl Bounds {
    /// A box from `min` to `max`.
    pub fn new(min: Position2D, max: Position2D) -> Self {
        Self { min, max }
    }

    /// Saturates `position` into the box shrunk by `margin` on every side.
    pub fn clamp(&self, position: Position2D, margin: DVec2) -> Position2D {
        position.max(self.min + margin).min(self.max - margin)
    }

    /// The farthest point along `from → to` that stays inside the box shrunk by `margin`.
    ///
    /// Returns `to` itself when it is already inside.
    pub fn edge(&self, from: Position2D, to: Position2D, margin: DVec2) -> Position2D {
        let clamped = self.clamp(to, margin);
        if clamped == to {
            return to;
        }

        let low = self.min + margin;
        let high = self.max - margin;
        let direction = to - from;

        // Smallest forward exit parameter over the axes that actually move.
        let mut t = f64::INFINITY;
        let mut hit = None;
        for axis in 0..2 {
            let d = direction[axis];
            if d == 0.0 {
                continue;
            }
            let exit = ((low[axis] - from[axis]) / d).max((high[axis] - from[axis]) / d);
            if exit < t {
                t = exit;
                hit = Some(axis);
            }
        }

        let Some(axis) = hit else {
            return clamped;
        };

        let mut point = self.clamp(from + direction * t, margin);
        point[axis] = if direction[axis] > 0.0 { high[axis] } else { low[axis] };
        point
    }
}

/// Owns the floor and every actor, and advances them together.
#[derive(Clone, Debug)]
pub struct World {
    bounds: Bounds,
    floor: TiledFloor,
    actors: Vec<TurtleActor>,
    config: SimulationConfig,
}

impl World {
    /// Builds a world with a single main actor.
    pub fn new(config: SimulationConfig) -> Self {
        let floor = TiledFloor::new(config.half_size, config.tile_size, config.clear_color);
        let extent = floor.half_extent();
        let main = TurtleActor::new("Turtle", config.actor.clone());

        Self {
            bounds: Bounds::new(-extent, extent),
            floor,
            actors: vec![main],
            config,
        }
    }

    /// Reallocates the floor and resets all actors into the new bounds.
    pub fn resize(&mut self, half_size: IVec2, tile_size: DVec2) {
        self.floor.reset(half_size, tile_size);
        let extent = self.floor.half_extent();
        self.bounds = Bounds::new(-extent, extent);
        self.config.half_size = half_size;
        self.config.tile_size = tile_size;
        for actor in &mut self.actors {
            actor.reset();
        }
        log::info!("world resized to {}x{} tiles", self.floor.dimensions().x, self.floor.dimensions().y);
    }

    /// Clears the floor and resets all actors.
    pub fn reset(&mut self) {
        self.floor.clear();
        for actor in &mut self.actors {
            actor.reset();
        }
    }

    /// Advances every actor by `steps`. Returns whether anything changed.
    pub fn step(&mut self, steps: u32) -> bool {
        let mut dirty = false;
        for actor in &mut self.actors {
            dirty |= actor.step(steps, &mut self.floor, &self.bounds);
        }
        dirty
    }

    /// See [`Bounds::clamp`].
    pub fn clamp(&self, position: Position2D, margin: DVec2) -> Position2D {
        self.bounds.clamp(position, margin)
    }

    /// See [`Bounds::edge`].
    pub fn edge(&self, from: Position2D, to: Position2D, margin: DVec2) -> Position2D {
        self.bounds.edge(from, to, margin)
    }

    /// The box actor centers are kept in, before their radius margin.
    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    /// The floor.
    pub fn floor(&self) -> &TiledFloor {
        &self.floor
    }

    /// Mutable floor access.
    pub fn floor_mut(&mut self) -> &mut TiledFloor {
        &mut self.floor
    }

    /// Current configuration, updated by [`World::resize`].
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Spawns another turtle with the shared actor configuration.
    pub fn add_actor(&mut self, name: impl Into<String>) -> ActorId {
        self.actors.push(TurtleActor::new(name, self.config.actor.clone()));
        self.actors.len() - 1
    }

    /// The actor with `id`, if any.
    pub fn actor(&self, id: ActorId) -> Option<&TurtleActor> {
        self.actors.get(id)
    }

    /// Mutable access to the actor with `id`.
    pub fn actor_mut(&mut self, id: ActorId) -> Option<&mut TurtleActor> {
        self.actors.get_mut(id)
    }

    /// The turtle created with the world.
    pub fn main_actor(&self) -> &TurtleActor {
        &self.actors[0]
    }

    /// Mutable access to the main turtle.
    pub fn main_actor_mut(&mut self) -> &mut TurtleActor {
        &mut self.actors[0]
    }

    /// Every actor, main actor first.
    pub fn actors(&self) -> &[TurtleActor] {
        &self.actors
    }

    /// Whether any actor still has work to do.
    pub fn is_busy(&self) -> bool {
        self.actors.iter().any(|actor| !actor.is_idle())
    }

    /// Queues a `Set` command on an actor. Returns `false` for an unknown actor.
    pub fn submit(&mut self, id: ActorId, command: ActorCommand) -> bool {
        match self.actors.get_mut(id) {
            Some(actor) => {
                actor.submit(command);
                true
            }
            None => false,
        }
    }

    /// Answers a `Get` command for an actor.
    pub fn command_get(&self, id: ActorId, command: &ActorCommand) -> Option<ActorCommand> {
        self.actors
            .get(id)
            .map(|actor| actor.command_get(command, &self.floor))
    }

    /// Drains every actor's notifications, in actor order.
    pub fn drain_events(&mut self) -> Vec<(ActorId, CallbackType)> {
        self.actors
            .iter_mut()
            .enumerate()
            .flat_map(|(id, actor)| actor.drain_events().into_iter().map(move |event| (id, event)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds() -> Bounds {
        Bounds::new(DVec2::splat(-5.0), DVec2::splat(5.0))
    }

    #[test]
    fn clamp_respects_margin() {
        let b = bounds();
        let margin = DVec2::splat(0.5);
        assert_eq!(b.clamp(DVec2::new(7.0, -9.0), margin), DVec2::new(4.5, -4.5));
        assert_eq!(b.clamp(DVec2::new(1.0, 2.0), margin), DVec2::new(1.0, 2.0));
    }

    #[test]
    fn edge_keeps_inside_points() {
        let b = bounds();
        let to = DVec2::new(3.0, -2.0);
        assert_eq!(b.edge(DVec2::ZERO, to, DVec2::splat(0.5)), to);
    }

    #[test]
    fn edge_slides_to_wall() {
        let b = bounds();
        let margin = DVec2::splat(0.5);
        assert_eq!(
            b.edge(DVec2::new(4.9, 0.0), DVec2::new(5.9, 0.0), margin),
            DVec2::new(4.5, 0.0)
        );
    }

    #[test]
    fn edge_lands_on_boundary_and_segment() {
        let b = bounds();
        let margin = DVec2::splat(0.5);
        let from = DVec2::new(1.0, 1.0);
        let to = DVec2::new(7.0, 4.0);
        let point = b.edge(from, to, margin);

        assert_eq!(point.x, 4.5);
        // On the segment: same direction, shorter than the full move.
        let along = (point - from).perp_dot(to - from);
        assert!(along.abs() < 1e-9);
        assert!((point - from).length() < (to - from).length());
    }

    #[test]
    fn edge_with_degenerate_direction_clamps() {
        let b = bounds();
        let margin = DVec2::splat(0.5);
        let p = DVec2::new(6.0, 0.0);
        assert_eq!(b.edge(p, p, margin), DVec2::new(4.5, 0.0));
    }

    #[test]
    fn world_bounds_follow_floor() {
        let mut world = World::new(SimulationConfig::default());
        world.resize(IVec2::new(5, 3), DVec2::new(2.0, 1.0));
        assert_eq!(world.bounds().max, DVec2::new(10.0, 3.0));
        assert_eq!(world.clamp(DVec2::new(20.0, 20.0), DVec2::ZERO), DVec2::new(10.0, 3.0));
    }
}
