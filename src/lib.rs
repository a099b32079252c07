//! # tiled-turtle
//!
//! A turtle-graphics simulation on a bounded, tiled floor, driven by user scripts
//! that run on their own thread.
//!
//! Scripts talk to the simulation through a blocking [`Brain`] API. Every call is
//! packed into a [`Command`], handed to the [`Controller`] on the simulation
//! thread, and answered once the [`TurtleActor`] has carried it out. The
//! simulation thread itself never blocks on a script, so stepping and rendering
//! keep their own pace.
//!
//! ```no_run
//! use tiled_turtle::{Color, HeadlessUi, Simulation, SimulationConfig};
//!
//! let mut sim = Simulation::new(SimulationConfig::default(), HeadlessUi::new());
//! sim.run_script(|brain| {
//!     brain.set_pen_color(Color::RED)?;
//!     brain.set_pen_down(true)?;
//!     for _ in 0..4 {
//!         brain.move_forward(5.0)?;
//!         brain.turn_left()?;
//!     }
//!     Ok(())
//! })?;
//! sim.run_until_stopped(100_000);
//! # Ok::<(), tiled_turtle::BrainError>(())
//! ```

pub mod brain;
pub mod color;
pub mod command;
pub mod config;
pub mod controller;
pub mod error;
pub mod floor;
pub mod geometry;
pub mod sensor;
pub mod simulation;
pub mod turtle;
pub mod ui;
pub mod world;

pub use brain::*;
pub use color::*;
pub use command::*;
pub use config::*;
pub use controller::*;
pub use error::*;
pub use floor::*;
pub use geometry::*;
pub use sensor::*;
pub use simulation::*;
pub use turtle::*;
pub use ui::*;
pub use world::*;
