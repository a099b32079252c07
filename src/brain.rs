//! The script side of the bridge.
//!
//! A [`Brain`] runs on its own thread. Each call packs a [`Command`], hands it to
//! the controller over an unbounded channel together with a one-shot reply
//! sender, and blocks until the simulation thread answers. Only one request is
//! ever in flight per brain.

use crate::color::Color;
use crate::command::{ActorCommand, Addressing, Command, LogLevel, Payload, UiCommand};
use crate::error::BrainError;
use crate::geometry::{Position2D, TilePosition2D};
use crate::sensor::TileSensor;
use crate::turtle::Location;
use glam::DVec2;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use tokio::sync::{mpsc, oneshot};

/// A user script. Returning `Err` or panicking ends the run with a logged fault.
pub type Script = Box<dyn FnOnce(&Brain) -> anyhow::Result<()> + Send + 'static>;

/// One request travelling from a brain to the controller.
#[derive(Debug)]
pub(crate) struct Request {
    pub command: Command,
    pub reply: oneshot::Sender<Command>,
}

/// How a brain run ended.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunOutcome {
    Completed,
    Cancelled,
    Failed(String),
    Panicked(String),
}

/// Lifecycle notifications of a brain run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BrainEvent {
    Started,
    Stopped(RunOutcome),
}

/// Requests a running brain to stop from any thread.
///
/// The controller notices on its next tick and wakes the brain.
#[derive(Clone, Debug)]
pub struct StopHandle {
    running: Arc<AtomicBool>,
}

impl StopHandle {
    pub(crate) fn new(running: Arc<AtomicBool>) -> Self {
        Self { running }
    }

    /// Asks the brain to stop; blocked calls return `Cancelled` after the next tick.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Whether the run has been neither stopped nor finished.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// The API scripts use to drive their turtle.
pub struct Brain {
    requests: mpsc::UnboundedSender<Request>,
    running: Arc<AtomicBool>,
}

impl Brain {
    /// Whether the script should keep going. Use it as the loop guard.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Sends `command` and blocks until the simulation replies.
    pub fn send(&self, command: Command) -> Result<Command, BrainError> {
        if !self.is_running() {
            return Err(BrainError::Cancelled);
        }

        let (reply, response) = oneshot::channel();
        if self.requests.send(Request { command, reply }).is_err() {
            return Err(self.closed());
        }

        response.blocking_recv().map_err(|_| self.closed())
    }

    fn closed(&self) -> BrainError {
        if self.is_running() {
            BrainError::Disconnected
        } else {
            BrainError::Cancelled
        }
    }

    fn actor(&self, command: ActorCommand, what: &'static str) -> Result<ActorCommand, BrainError> {
        let reply = self.send(Command::actor(command))?;
        if !reply.valid {
            return Err(BrainError::Rejected(what));
        }
        match reply.payload {
            Payload::Actor(command) => Ok(command),
            Payload::Ui(_) => Err(BrainError::UnexpectedReply(what)),
        }
    }

    fn ui(&self, command: UiCommand, what: &'static str) -> Result<UiCommand, BrainError> {
        let reply = self.send(Command::ui(command))?;
        if !reply.valid {
            return Err(BrainError::Rejected(what));
        }
        match reply.payload {
            Payload::Ui(command) => Ok(command),
            Payload::Actor(_) => Err(BrainError::UnexpectedReply(what)),
        }
    }

    /// Moves `distance` along the current heading and waits until arrived.
    pub fn move_forward(&self, distance: f64) -> Result<(), BrainError> {
        self.move_by(distance, 0.0)
    }

    /// Moves `forward` along and `sideways` to the left of the current heading.
    pub fn move_by(&self, forward: f64, sideways: f64) -> Result<(), BrainError> {
        self.actor(ActorCommand::relative_move(DVec2::new(forward, sideways)), "move")
            .map(drop)
    }

    /// Turns by `angle` turns (`0.25` is a quarter turn to the left).
    pub fn rotate(&self, angle: f64) -> Result<(), BrainError> {
        self.actor(ActorCommand::relative_rotate(angle), "rotate").map(drop)
    }

    /// Quarter turn counter-clockwise.
    pub fn turn_left(&self) -> Result<(), BrainError> {
        self.rotate(0.25)
    }

    /// Quarter turn clockwise.
    pub fn turn_right(&self) -> Result<(), BrainError> {
        self.rotate(-0.25)
    }

    /// Repositions by `delta` (forward, sideways) without stepping through the path.
    pub fn jump(&self, delta: Position2D) -> Result<(), BrainError> {
        self.actor(ActorCommand::jump(delta), "jump").map(drop)
    }

    /// Drives to the world position `target`, stopping at the wall; with `jump` it teleports.
    pub fn set_target_position(&self, target: Position2D, jump: bool) -> Result<(), BrainError> {
        self.actor(ActorCommand::target_position(target, jump), "target position")
            .map(drop)
    }

    /// Turns to the absolute `angle` (in turns); with `jump` it snaps.
    pub fn set_target_angle(&self, angle: f64, jump: bool) -> Result<(), BrainError> {
        self.actor(ActorCommand::target_angle(angle, jump), "target angle")
            .map(drop)
    }

    /// Position, tile, angle and heading of the turtle.
    pub fn current_location(&self) -> Result<Location, BrainError> {
        let reply = self.actor(ActorCommand::get(Addressing::Current), "location")?;
        Ok(Location {
            position: reply.values.position,
            tile: reply.values.tile,
            angle: reply.values.angle,
            heading: reply.values.heading,
        })
    }

    /// World position of the turtle.
    pub fn current_position(&self) -> Result<Position2D, BrainError> {
        self.current_location().map(|location| location.position)
    }

    /// Color painted from the next tile change on.
    pub fn set_pen_color(&self, color: Color) -> Result<(), BrainError> {
        self.actor(ActorCommand::pen_color(color), "pen color").map(drop)
    }

    /// Lowers or lifts the pen. Lowering it paints the current tile.
    pub fn set_pen_down(&self, down: bool) -> Result<(), BrainError> {
        self.actor(ActorCommand::pen_down(down), "pen state").map(drop)
    }

    /// Paints a tile, either at a world tile index or at `(front, side)` from the turtle.
    pub fn set_tile(&self, color: Color, offset: TilePosition2D, absolute: bool) -> Result<(), BrainError> {
        self.actor(ActorCommand::set_tile(color, offset, absolute), "set tile")
            .map(drop)
    }

    /// Paints the tile `(front, side)` away from the turtle.
    pub fn set_directional_tile(&self, color: Color, offset: TilePosition2D) -> Result<(), BrainError> {
        self.set_tile(color, offset, false)
    }

    /// Paints the world tile `tile`, clamped onto the floor.
    pub fn set_absolute_tile(&self, color: Color, tile: TilePosition2D) -> Result<(), BrainError> {
        self.set_tile(color, tile, true)
    }

    /// Reads a tile, either at a world tile index or at `(front, side)` from the turtle.
    pub fn tile(&self, offset: TilePosition2D, absolute: bool) -> Result<Color, BrainError> {
        self.actor(ActorCommand::get_tile(offset, absolute), "get tile")
            .map(|reply| reply.values.color)
    }

    /// Color of the tile `(front, side)` away from the turtle.
    pub fn directional_tile(&self, offset: TilePosition2D) -> Result<Color, BrainError> {
        self.tile(offset, false)
    }

    /// Color of the world tile `tile`, clamped onto the floor.
    pub fn absolute_tile(&self, tile: TilePosition2D) -> Result<Color, BrainError> {
        self.tile(tile, true)
    }

    /// The heading-aligned neighborhood around the turtle.
    pub fn tile_sensor(&self) -> Result<TileSensor, BrainError> {
        let reply = self.actor(ActorCommand::tile_sensor(), "tile sensor")?;
        reply
            .values
            .sensor
            .ok_or(BrainError::UnexpectedReply("tile sensor"))
    }

    /// Logs `text` at info level through the user interface.
    pub fn log(&self, text: impl Into<String>) -> Result<(), BrainError> {
        self.log_with(LogLevel::Info, text)
    }

    /// Logs `text` at `level` through the user interface.
    pub fn log_with(&self, level: LogLevel, text: impl Into<String>) -> Result<(), BrainError> {
        let command = UiCommand::Log {
            title: "Brain".to_owned(),
            text: text.into(),
            level,
        };
        self.ui(command, "log").map(drop)
    }

    /// Asks the user for an integer. A dismissed dialog is `Rejected`.
    pub fn get_integer(&self, title: &str, label: &str, default: i32) -> Result<i32, BrainError> {
        let command = UiCommand::GetInteger {
            title: title.to_owned(),
            label: label.to_owned(),
            value: default,
        };
        match self.ui(command, "integer")? {
            UiCommand::GetInteger { value, .. } => Ok(value),
            _ => Err(BrainError::UnexpectedReply("integer")),
        }
    }

    /// Asks the user for a number. A dismissed dialog is `Rejected`.
    pub fn get_double(&self, title: &str, label: &str, default: f64) -> Result<f64, BrainError> {
        let command = UiCommand::GetDouble {
            title: title.to_owned(),
            label: label.to_owned(),
            value: default,
        };
        match self.ui(command, "double")? {
            UiCommand::GetDouble { value, .. } => Ok(value),
            _ => Err(BrainError::UnexpectedReply("double")),
        }
    }

    /// Asks the user for text. A dismissed dialog is `Rejected`.
    pub fn get_string(&self, title: &str, label: &str, default: &str) -> Result<String, BrainError> {
        let command = UiCommand::GetString {
            title: title.to_owned(),
            label: label.to_owned(),
            value: default.to_owned(),
        };
        match self.ui(command, "string")? {
            UiCommand::GetString { value, .. } => Ok(value),
            _ => Err(BrainError::UnexpectedReply("string")),
        }
    }
}

/// Starts `script` on a dedicated thread.
///
/// `running` must already be set; it is cleared when the script returns.
pub(crate) fn spawn(
    name: &str,
    script: Script,
    requests: mpsc::UnboundedSender<Request>,
    running: Arc<AtomicBool>,
) -> Result<JoinHandle<RunOutcome>, BrainError> {
    let brain = Brain {
        requests,
        running: running.clone(),
    };

    thread::Builder::new()
        .name(name.to_owned())
        .spawn(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(|| script(&brain)));
            let outcome = match result {
                Ok(Ok(())) if brain.is_running() => RunOutcome::Completed,
                Ok(Ok(())) => RunOutcome::Cancelled,
                Ok(Err(err)) => match err.downcast_ref::<BrainError>() {
                    Some(BrainError::Cancelled) => RunOutcome::Cancelled,
                    _ => RunOutcome::Failed(format!("{err:#}")),
                },
                Err(payload) => RunOutcome::Panicked(panic_message(payload.as_ref())),
            };
            running.store(false, Ordering::SeqCst);
            outcome
        })
        .map_err(|err| BrainError::Spawn(err.to_string()))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_owned()
    }
}
