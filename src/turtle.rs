//! Turtle state and the per-step actor state machine.

use crate::color::Color;
use crate::command::{Access, ActorCommand, ActorValues, Addressing, ApplyFlags};
use crate::config::ActorConfig;
use crate::floor::TiledFloor;
use crate::geometry::{
    Heading, Position2D, TilePosition2D, angular_distance, normalize_angle, rotate_local,
};
use crate::sensor::TileSensor;
use crate::world::Bounds;
use glam::{DVec2, IVec2};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::f64::consts::PI;

/// The pen the turtle draws with.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pen {
    /// Color painted onto the floor.
    pub color: Color,
    /// Whether the pen paints.
    pub down: bool,
}

impl Default for Pen {
    fn default() -> Self {
        Self {
            color: Color::WHITE,
            down: false,
        }
    }
}

/// A pose on the floor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// World position.
    pub position: Position2D,
    /// Tile under `position`.
    pub tile: TilePosition2D,
    /// Angle in turns, counter-clockwise positive.
    pub angle: f64,
    /// Cardinal direction nearest to `angle`.
    pub heading: Heading,
}

impl Location {
    fn refresh(&mut self, floor: &TiledFloor) {
        self.tile = floor.to_tile_index(self.position);
        self.heading = Heading::from_angle(self.angle);
    }
}

/// The last relative request, kept for display only.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Relative {
    /// Last relative `(forward, sideways)` move.
    pub offset: Position2D,
    /// Last relative rotation, in turns.
    pub angle: f64,
}

/// Observable turtle state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ActorState {
    /// The pen.
    pub pen: Pen,
    /// Where the turtle is.
    pub current: Location,
    /// Where the turtle is going; always inside the bounds.
    pub target: Location,
    /// Last relative request, for display.
    pub relative: Relative,
}

/// Run state of the actor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    #[default]
    Active,
    Paused,
    Reset,
}

/// Notifications emitted by an actor while it steps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallbackType {
    /// The actor was reset to its initial state.
    Reset,
    /// The actor is running and has nothing pending.
    Active,
    /// The actor finished an action in single-step mode and is waiting.
    Paused,
    /// `current` changed.
    Current,
    /// `target` changed.
    Target,
    /// The pen changed.
    Pen,
    /// A floor tile was written.
    Tile,
}

#[derive(Clone, Debug)]
struct InternalState {
    last_tile: TilePosition2D,
    color_cycle: f64,
    run_state: RunState,
    pause_requested: bool,
    unpause_requested: bool,
    /// Set while `current` has not yet converged on `target`.
    busy: bool,
    /// Set when the pen changed and has not been applied yet.
    dirty: bool,
}

/// A turtle moving on a [`TiledFloor`].
///
/// Commands are queued with [`TurtleActor::submit`] and applied one per
/// [`TurtleActor::step`]; the actor then converges on its target at a fixed speed.
#[derive(Clone, Debug)]
pub struct TurtleActor {
    name: String,
    config: ActorConfig,
    state: ActorState,
    internal: InternalState,
    queue: VecDeque<ActorCommand>,
    sensor: TileSensor,
    events: Vec<CallbackType>,
}

impl TurtleActor {
    /// A turtle at the origin facing `+X`, with a pending `Reset` notification.
    pub fn new(name: impl Into<String>, config: ActorConfig) -> Self {
        let mut actor = Self {
            name: name.into(),
            state: ActorState::default(),
            internal: InternalState {
                last_tile: IVec2::ZERO,
                color_cycle: 0.0,
                run_state: RunState::Reset,
                pause_requested: false,
                unpause_requested: false,
                busy: false,
                dirty: false,
            },
            queue: VecDeque::new(),
            sensor: TileSensor::default(),
            events: Vec::new(),
            config,
        };
        actor.reset();
        actor
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Pen, current and target pose.
    pub fn state(&self) -> &ActorState {
        &self.state
    }

    /// Whether the turtle runs or waits in single-step mode.
    pub fn run_state(&self) -> RunState {
        self.internal.run_state
    }

    /// Configuration the turtle was built with.
    pub fn config(&self) -> &ActorConfig {
        &self.config
    }

    /// Distance covered per step.
    pub fn linear_speed(&self) -> f64 {
        self.config.linear_speed
    }

    /// Sets the distance covered per step.
    pub fn set_linear_speed(&mut self, speed: f64) {
        self.config.linear_speed = speed.max(0.0);
    }

    /// Turns covered per step.
    pub fn rotation_speed(&self) -> f64 {
        self.config.rotation_speed
    }

    /// Sets the turns covered per step.
    pub fn set_rotation_speed(&mut self, speed: f64) {
        self.config.rotation_speed = speed.max(0.0);
    }

    /// Margin kept between the actor's center and the world walls.
    pub fn margin(&self) -> DVec2 {
        DVec2::splat(self.config.radius)
    }

    /// The last heading-aligned sensor snapshot.
    pub fn sensor(&self) -> &TileSensor {
        &self.sensor
    }

    /// Cosmetic hat color, cycling between green and blue.
    pub fn hat_color(&self) -> Color {
        let alpha = (PI * self.internal.color_cycle).sin() as f32;
        Color::from_rgb(0.0, 1.0 - alpha, alpha)
    }

    /// Whether the actor has no queued command and has reached its target.
    pub fn is_idle(&self) -> bool {
        self.queue.is_empty() && !self.internal.busy && !self.internal.dirty
    }

    /// Returns to the initial pose with an empty queue.
    pub fn reset(&mut self) {
        self.internal.run_state = RunState::Reset;
        self.state = ActorState {
            pen: Pen {
                color: self.config.pen_color,
                down: false,
            },
            ..Default::default()
        };
        self.queue.clear();
        self.internal.last_tile = self.state.current.tile;
        self.internal.color_cycle = 0.0;
        self.internal.unpause_requested = false;
        self.internal.busy = false;
        self.internal.dirty = true;
        self.sensor = TileSensor::default();
        self.events.push(CallbackType::Reset);
        self.internal.run_state = RunState::Active;
        log::debug!("{}: reset", self.name);
    }

    /// Enables or disables single-step mode.
    pub fn pause(&mut self, enable: bool) {
        self.internal.pause_requested = enable;
        if !enable && self.internal.run_state == RunState::Paused {
            self.internal.unpause_requested = true;
        }
    }

    /// Resumes after a single step; takes effect on the next tick.
    pub fn unpause(&mut self) {
        if self.internal.run_state == RunState::Paused {
            self.internal.unpause_requested = true;
        }
    }

    /// Queues a `Set` command for the next step.
    pub fn submit(&mut self, command: ActorCommand) {
        self.queue.push_back(command);
    }

    /// Drains notifications emitted since the last call.
    pub fn drain_events(&mut self) -> Vec<CallbackType> {
        std::mem::take(&mut self.events)
    }

    /// Advances the actor by `steps` simulation steps.
    ///
    /// Returns whether anything changed.
    pub fn step(&mut self, steps: u32, floor: &mut TiledFloor, bounds: &Bounds) -> bool {
        self.internal.color_cycle = (self.internal.color_cycle
            + f64::from(steps) * 0.1 / self.config.cycle_speed)
            .rem_euclid(1.0);

        if self.internal.run_state == RunState::Paused && self.internal.unpause_requested {
            self.internal.unpause_requested = false;
            self.internal.run_state = RunState::Active;
            self.events.push(CallbackType::Active);
        }

        if self.internal.run_state != RunState::Active || self.is_idle() {
            return false;
        }

        if let Some(command) = self.queue.pop_front() {
            self.command_set(&command, floor, bounds);
        }

        self.internal.busy = false;
        self.step_position(steps);
        self.step_angle(steps);
        self.state.current.refresh(floor);
        self.step_pen(floor);
        self.sensor = self.read_sensor(floor);

        self.events.push(CallbackType::Current);

        if self.is_idle() {
            if self.internal.pause_requested {
                self.internal.run_state = RunState::Paused;
                self.events.push(CallbackType::Paused);
            } else {
                self.events.push(CallbackType::Active);
            }
        }

        true
    }

    fn step_position(&mut self, steps: u32) {
        let reach = self.config.linear_speed * f64::from(steps);
        let delta = self.state.target.position - self.state.current.position;
        let distance = delta.length();

        if distance <= reach {
            self.state.current.position = self.state.target.position;
        } else {
            self.state.current.position += delta / distance * reach;
            self.internal.busy = true;
        }
    }

    fn step_angle(&mut self, steps: u32) {
        let reach = self.config.rotation_speed * f64::from(steps);
        let distance = angular_distance(self.state.current.angle, self.state.target.angle);

        if distance.abs() <= reach {
            self.state.current.angle = self.state.target.angle;
        } else {
            self.state.current.angle =
                normalize_angle(self.state.current.angle + distance.signum() * reach);
            self.internal.busy = true;
        }
    }

    fn step_pen(&mut self, floor: &mut TiledFloor) {
        let tile = self.state.current.tile;
        if self.state.pen.down && (self.internal.dirty || tile != self.internal.last_tile) {
            floor.set_color(tile, self.state.pen.color);
            self.events.push(CallbackType::Tile);
        }
        self.internal.last_tile = tile;

        if self.internal.dirty {
            self.internal.dirty = false;
            self.events.push(CallbackType::Pen);
        }
    }

    fn read_sensor(&self, floor: &TiledFloor) -> TileSensor {
        floor
            .tiles(self.state.current.tile, self.config.sensor_radius)
            .into_local(self.state.current.heading)
    }

    /// Resolves a command's position, tile and angle into the world frame.
    fn resolve(&self, command: &ActorCommand, floor: &TiledFloor) -> (Position2D, TilePosition2D, f64) {
        let current = &self.state.current;
        let values = &command.values;

        let (position, tile) = if command.quantized {
            let tile = if command.absolute {
                values.tile
            } else {
                current.tile + current.heading.to_global(values.tile)
            };
            (floor.to_position(tile), tile)
        } else {
            let position = if command.absolute {
                values.position
            } else {
                current.position + rotate_local(values.position, current.angle)
            };
            (position, floor.to_tile_index(position))
        };

        let angle = match (command.absolute, command.quantized) {
            (true, false) => values.angle,
            (true, true) => values.heading.angle(),
            (false, false) => current.angle + values.angle,
            (false, true) => current.heading.angle() + values.angle,
        };

        (position, tile, normalize_angle(angle))
    }

    /// Applies a `Set` command to the actor or the floor.
    pub fn command_set(&mut self, command: &ActorCommand, floor: &mut TiledFloor, bounds: &Bounds) {
        if command.access != Access::Set {
            return;
        }

        let apply = match command.addressing {
            Addressing::Current | Addressing::Target => command.apply,
            Addressing::Tile | Addressing::TileSensor => ApplyFlags::NONE,
        };

        let (position, _, angle) = self.resolve(command, floor);
        let position = match command.addressing {
            Addressing::Target => bounds.edge(self.state.current.position, position, self.margin()),
            Addressing::Current => bounds.clamp(position, self.margin()),
            Addressing::Tile | Addressing::TileSensor => bounds.clamp(position, DVec2::ZERO),
        };
        let tile = floor.clamp(floor.to_tile_index(position));

        match command.addressing {
            Addressing::Current => {
                if apply.position {
                    self.state.current.position = position;
                    self.state.target.position = position;
                }
                if apply.heading {
                    self.state.current.angle = angle;
                    self.state.target.angle = angle;
                }
                if apply.position || apply.heading {
                    self.state.current.refresh(floor);
                    self.state.target.refresh(floor);
                    self.events.push(CallbackType::Target);
                }
            }
            Addressing::Target => {
                if apply.position {
                    self.state.target.position = position;
                }
                if apply.heading {
                    self.state.target.angle = angle;
                }
                if apply.position || apply.heading {
                    self.state.target.refresh(floor);
                    self.events.push(CallbackType::Target);
                }
            }
            Addressing::Tile => {
                floor.set_color(tile, command.values.color);
                self.events.push(CallbackType::Tile);
            }
            Addressing::TileSensor => {}
        }

        if !command.absolute {
            if apply.position {
                self.state.relative.offset = command.values.position;
            }
            if apply.heading {
                self.state.relative.angle = command.values.angle;
            }
        }

        let mut pen = self.state.pen;
        if apply.pen_color {
            pen.color = command.values.color;
        }
        if apply.pen_state {
            pen.down = command.values.pen_down;
        }
        if pen != self.state.pen {
            self.state.pen = pen;
            self.internal.dirty = true;
        }

        log::trace!("{}: applied {:?} to {:?}", self.name, apply, command.addressing);
    }

    /// Answers a `Get` command without touching any state.
    pub fn command_get(&self, command: &ActorCommand, floor: &TiledFloor) -> ActorCommand {
        let location = match command.addressing {
            Addressing::Target => &self.state.target,
            _ => &self.state.current,
        };

        let mut values = ActorValues {
            position: location.position,
            tile: location.tile,
            angle: location.angle,
            heading: location.heading,
            color: self.state.pen.color,
            pen_down: self.state.pen.down,
            sensor: None,
        };

        match command.addressing {
            Addressing::Tile => {
                let (_, tile, _) = self.resolve(command, floor);
                let tile = floor.clamp(tile);
                values.tile = tile;
                values.position = floor.to_position(tile);
                values.color = floor.color(tile);
            }
            Addressing::TileSensor => values.sensor = Some(self.sensor.clone()),
            Addressing::Current | Addressing::Target => {}
        }

        ActorCommand {
            access: Access::Get,
            values,
            ..command.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::ActorCommand;
    use glam::DVec2;

    fn setup() -> (TurtleActor, TiledFloor, Bounds) {
        let floor = TiledFloor::new(IVec2::new(5, 5), DVec2::ONE, Color::WHITE);
        let bounds = Bounds::new(-floor.half_extent(), floor.half_extent());
        let actor = TurtleActor::new("turtle", ActorConfig::default());
        (actor, floor, bounds)
    }

    fn settle(actor: &mut TurtleActor, floor: &mut TiledFloor, bounds: &Bounds) {
        for _ in 0..1000 {
            actor.step(1, floor, bounds);
            if actor.is_idle() {
                return;
            }
        }
        panic!("actor did not settle");
    }

    #[test]
    fn reset_notifies_and_is_active() {
        let (mut actor, _, _) = setup();
        assert_eq!(actor.drain_events(), vec![CallbackType::Reset]);
        assert_eq!(actor.run_state(), RunState::Active);
    }

    #[test]
    fn short_move_snaps_in_one_step() {
        let (mut actor, mut floor, bounds) = setup();
        settle(&mut actor, &mut floor, &bounds);
        actor.submit(ActorCommand::relative_move(DVec2::new(0.05, 0.0)));
        actor.step(1, &mut floor, &bounds);
        assert_eq!(actor.state().current.position, actor.state().target.position);
        assert!(actor.is_idle());
    }

    #[test]
    fn long_move_advances_by_speed() {
        let (mut actor, mut floor, bounds) = setup();
        settle(&mut actor, &mut floor, &bounds);
        actor.submit(ActorCommand::relative_move(DVec2::new(2.0, 0.0)));
        actor.step(3, &mut floor, &bounds);
        let remaining = (actor.state().target.position - actor.state().current.position).length();
        assert!((remaining - 1.7).abs() < 1e-9);
        assert!(!actor.is_idle());
    }

    #[test]
    fn rotation_takes_shorter_arc() {
        let (mut actor, mut floor, bounds) = setup();
        settle(&mut actor, &mut floor, &bounds);
        actor.submit(ActorCommand::target_angle(0.9, false));
        actor.step(1, &mut floor, &bounds);
        // 0.9 turns is -0.1 turns away, within one step of 0.1.
        assert_eq!(actor.state().current.angle, actor.state().target.angle);

        actor.submit(ActorCommand::target_angle(0.3, false));
        actor.step(1, &mut floor, &bounds);
        assert!((actor.state().current.angle - 0.0).abs() < 1e-12);
    }

    #[test]
    fn get_is_pure() {
        let (mut actor, mut floor, bounds) = setup();
        actor.submit(ActorCommand::relative_move(DVec2::new(2.0, 0.0)));
        actor.step(1, &mut floor, &bounds);
        let before = *actor.state();
        let revision = floor.revision();

        for addressing in [
            Addressing::Current,
            Addressing::Target,
            Addressing::Tile,
            Addressing::TileSensor,
        ] {
            actor.command_get(&ActorCommand::get(addressing), &floor);
        }

        assert_eq!(*actor.state(), before);
        assert_eq!(floor.revision(), revision);
    }

    #[test]
    fn target_outside_is_slid_to_wall() {
        let (mut actor, mut floor, bounds) = setup();
        actor.submit(ActorCommand::target_position(DVec2::new(4.0, 0.0), true));
        settle(&mut actor, &mut floor, &bounds);
        actor.submit(ActorCommand::relative_move(DVec2::new(1.0, 0.0)));
        actor.step(1, &mut floor, &bounds);
        assert_eq!(actor.state().target.position, DVec2::new(4.5, 0.0));
    }

    #[test]
    fn tile_commands_never_move_the_actor() {
        let (mut actor, mut floor, bounds) = setup();
        let mut command = ActorCommand::set_tile(Color::RED, IVec2::new(2, 0), false);
        command.apply.position = true;
        actor.submit(command);
        settle(&mut actor, &mut floor, &bounds);
        assert_eq!(actor.state().target.position, DVec2::ZERO);
        assert_eq!(floor.color(IVec2::new(2, 0)), Color::RED);
    }

    #[test]
    fn single_step_pauses_until_resumed() {
        let (mut actor, mut floor, bounds) = setup();
        actor.pause(true);
        actor.submit(ActorCommand::pen_down(true));
        actor.step(1, &mut floor, &bounds);
        assert_eq!(actor.run_state(), RunState::Paused);
        assert!(actor.drain_events().contains(&CallbackType::Paused));

        actor.submit(ActorCommand::relative_move(DVec2::new(0.05, 0.0)));
        assert!(!actor.step(1, &mut floor, &bounds));

        actor.unpause();
        actor.step(1, &mut floor, &bounds);
        let events = actor.drain_events();
        assert_eq!(events.first(), Some(&CallbackType::Active));
        assert_eq!(actor.state().current.position, DVec2::new(0.05, 0.0));
    }
}
