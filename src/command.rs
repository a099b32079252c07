//! The request/reply values exchanged between brains, the controller and actors.
//!
//! A [`Command`] is built once by the requester and never mutated in place by the
//! handlers; replies are fresh values produced with [`Command::into_reply`].

use crate::color::Color;
use crate::geometry::{Heading, Position2D, TilePosition2D};
use crate::sensor::TileSensor;
use glam::{DVec2, IVec2};
use serde::{Deserialize, Serialize};

/// Top-level routing of a command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Destination {
    Ui,
    Actor,
}

/// A request, or the reply to one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Command {
    /// Set on replies.
    pub reply: bool,
    /// On requests: ready to be processed. On replies: the data is meaningful.
    pub valid: bool,
    /// What is asked for, or the answer in a reply.
    pub payload: Payload,
}

/// The body of a [`Command`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    Ui(UiCommand),
    Actor(ActorCommand),
}

impl Command {
    /// A pending request for the user interface.
    pub fn ui(command: UiCommand) -> Self {
        Self {
            reply: false,
            valid: true,
            payload: Payload::Ui(command),
        }
    }

    /// A pending request for the actor.
    pub fn actor(command: ActorCommand) -> Self {
        Self {
            reply: false,
            valid: true,
            payload: Payload::Actor(command),
        }
    }

    /// Who handles this command.
    pub fn destination(&self) -> Destination {
        match self.payload {
            Payload::Ui(_) => Destination::Ui,
            Payload::Actor(_) => Destination::Actor,
        }
    }

    /// Whether this is a request the controller should act on.
    pub fn is_pending_request(&self) -> bool {
        self.valid && !self.reply
    }

    /// Turns a request into its reply, replacing the payload.
    pub fn into_reply(self, payload: Payload, valid: bool) -> Self {
        Self {
            reply: true,
            valid,
            payload,
        }
    }

    /// The actor payload, if any.
    pub fn as_actor(&self) -> Option<&ActorCommand> {
        match &self.payload {
            Payload::Actor(command) => Some(command),
            Payload::Ui(_) => None,
        }
    }

    /// The user-interface payload, if any.
    pub fn as_ui(&self) -> Option<&UiCommand> {
        match &self.payload {
            Payload::Ui(command) => Some(command),
            Payload::Actor(_) => None,
        }
    }
}

/// Requests handled by the user interface collaborator.
///
/// The `value` fields carry the default on requests and the user's answer on replies.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum UiCommand {
    Log {
        title: String,
        text: String,
        level: LogLevel,
    },
    GetInteger {
        title: String,
        label: String,
        value: i32,
    },
    GetDouble {
        title: String,
        label: String,
        value: f64,
    },
    GetString {
        title: String,
        label: String,
        value: String,
    },
}

/// Severity of a [`UiCommand::Log`] line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
}

impl From<LogLevel> for log::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => log::Level::Error,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Info => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
        }
    }
}

/// Whether a command reads or writes actor state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Access {
    #[default]
    Get,
    Set,
}

/// What part of the actor (or floor) a command addresses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Addressing {
    /// The pose the actor is at. Setting it teleports.
    #[default]
    Current,
    /// The pose the actor is moving towards.
    Target,
    /// A single floor tile.
    Tile,
    /// The heading-aligned tile neighborhood. Get only.
    TileSensor,
}

/// Which fields of a `Set` command should be applied.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyFlags {
    /// Apply `values.position`.
    pub position: bool,
    /// Apply `values.angle` (or `values.heading` when quantized).
    pub heading: bool,
    /// Apply `values.color` to the pen.
    pub pen_color: bool,
    /// Apply `values.pen_down`.
    pub pen_state: bool,
}

impl ApplyFlags {
    /// Applies nothing.
    pub const NONE: ApplyFlags = ApplyFlags {
        position: false,
        heading: false,
        pen_color: false,
        pen_state: false,
    };

    /// Whether at least one field is applied.
    pub fn any(&self) -> bool {
        self.position || self.heading || self.pen_color || self.pen_state
    }
}

/// Values carried by an actor command, both as input and as reply data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActorValues {
    /// Continuous position or offset.
    pub position: Position2D,
    /// Tile index or `(front, side)` tile offset.
    pub tile: TilePosition2D,
    /// Angle in turns, counter-clockwise positive.
    pub angle: f64,
    /// Quantized heading, used by absolute quantized commands.
    pub heading: Heading,
    /// Pen or tile color.
    pub color: Color,
    /// Pen state.
    pub pen_down: bool,
    /// Filled in replies to `TileSensor` reads.
    pub sensor: Option<TileSensor>,
}

impl Default for ActorValues {
    fn default() -> Self {
        Self {
            position: DVec2::ZERO,
            tile: IVec2::ZERO,
            angle: 0.0,
            heading: Heading::PosX,
            color: Color::WHITE,
            pen_down: false,
            sensor: None,
        }
    }
}

/// A get/set request addressed to an actor.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ActorCommand {
    /// Read or write.
    pub access: Access,
    /// Which part of the actor or floor is addressed.
    pub addressing: Addressing,
    /// World frame when set, otherwise relative to the actor's pose and heading.
    pub absolute: bool,
    /// Use tiles and the quantized heading instead of continuous values.
    pub quantized: bool,
    /// Fields a `Set` writes; ignored for tile addressing.
    pub apply: ApplyFlags,
    /// Inputs of a request, outputs of a reply.
    pub values: ActorValues,
}

impl ActorCommand {
    /// Reads the state selected by `addressing`.
    pub fn get(addressing: Addressing) -> Self {
        Self {
            addressing,
            absolute: true,
            ..Default::default()
        }
    }

    fn set(addressing: Addressing, absolute: bool) -> Self {
        Self {
            access: Access::Set,
            addressing,
            absolute,
            ..Default::default()
        }
    }

    /// Moves by `offset` (forward, sideways) relative to the current pose.
    pub fn relative_move(offset: Position2D) -> Self {
        let mut command = Self::set(Addressing::Target, false);
        command.apply.position = true;
        command.values.position = offset;
        command
    }

    /// Turns by `angle` turns relative to the current angle.
    pub fn relative_rotate(angle: f64) -> Self {
        let mut command = Self::set(Addressing::Target, false);
        command.apply.heading = true;
        command.values.angle = angle;
        command
    }

    /// Repositions by `offset` (forward, sideways) without incremental stepping.
    pub fn jump(offset: Position2D) -> Self {
        let mut command = Self::set(Addressing::Current, false);
        command.apply.position = true;
        command.values.position = offset;
        command
    }

    /// Sets an absolute target position; with `jump` the actor is placed there directly.
    pub fn target_position(position: Position2D, jump: bool) -> Self {
        let addressing = if jump { Addressing::Current } else { Addressing::Target };
        let mut command = Self::set(addressing, true);
        command.apply.position = true;
        command.values.position = position;
        command
    }

    /// Sets an absolute target angle; with `jump` the actor is turned directly.
    pub fn target_angle(angle: f64, jump: bool) -> Self {
        let addressing = if jump { Addressing::Current } else { Addressing::Target };
        let mut command = Self::set(addressing, true);
        command.apply.heading = true;
        command.values.angle = angle;
        command
    }

    /// Sets the pen color.
    pub fn pen_color(color: Color) -> Self {
        let mut command = Self::set(Addressing::Target, true);
        command.apply.pen_color = true;
        command.values.color = color;
        command
    }

    /// Lowers or lifts the pen.
    pub fn pen_down(down: bool) -> Self {
        let mut command = Self::set(Addressing::Target, true);
        command.apply.pen_state = true;
        command.values.pen_down = down;
        command
    }

    /// Paints a tile. Without `absolute`, `offset` is `(front, side)` from the actor.
    pub fn set_tile(color: Color, offset: TilePosition2D, absolute: bool) -> Self {
        let mut command = Self::set(Addressing::Tile, absolute);
        command.quantized = true;
        command.values.tile = offset;
        command.values.color = color;
        command
    }

    /// Reads a tile. Without `absolute`, `offset` is `(front, side)` from the actor.
    pub fn get_tile(offset: TilePosition2D, absolute: bool) -> Self {
        let mut command = Self::get(Addressing::Tile);
        command.absolute = absolute;
        command.quantized = true;
        command.values.tile = offset;
        command
    }

    /// Reads the heading-aligned neighborhood.
    pub fn tile_sensor() -> Self {
        Self::get(Addressing::TileSensor)
    }

    /// Whether this is a read.
    pub fn is_get(&self) -> bool {
        self.access == Access::Get
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_route_to_expected_addressing() {
        assert_eq!(ActorCommand::jump(DVec2::X).addressing, Addressing::Current);
        assert_eq!(
            ActorCommand::target_position(DVec2::X, false).addressing,
            Addressing::Target
        );
        assert!(ActorCommand::tile_sensor().is_get());
        assert!(!ActorCommand::relative_move(DVec2::X).absolute);
        assert!(ActorCommand::set_tile(Color::RED, IVec2::X, true).quantized);
    }

    #[test]
    fn replies_are_fresh_values() {
        let request = Command::actor(ActorCommand::tile_sensor());
        assert!(request.is_pending_request());
        assert_eq!(request.destination(), Destination::Actor);

        let payload = request.payload.clone();
        let reply = request.into_reply(payload, false);
        assert!(reply.reply);
        assert!(!reply.valid);
        assert!(!reply.is_pending_request());
    }
}
