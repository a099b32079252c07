use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use glam::{DVec2, IVec2};
use std::f64::consts::TAU;
use std::path::PathBuf;
use tiled_turtle::{
    Brain, BrainError, Color, HeadlessUi, Simulation, SimulationConfig, TiledFloor, normalize_angle,
};

#[derive(Parser, Debug)]
#[command(
    name = "tiled-turtle",
    version,
    about = "Run a turtle script headlessly and print the floor it leaves behind"
)]
struct Cli {
    /// RON file with a `SimulationConfig`; missing fields keep their defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Floor half-size in tiles (overrides the config).
    #[arg(long)]
    size: Option<i32>,

    /// Simulation steps per tick (overrides the config).
    #[arg(long)]
    ticks_per_frame: Option<u32>,

    /// Which drawing to run.
    #[arg(long, value_enum, default_value_t = Demo::Square)]
    demo: Demo,

    /// Give up after this many ticks.
    #[arg(long, default_value_t = 1_000_000)]
    max_ticks: u64,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Demo {
    Square,
    Spiral,
    Sensor,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => {
            let source = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            SimulationConfig::from_ron_str(&source)
                .with_context(|| format!("parsing {}", path.display()))?
        }
        None => SimulationConfig {
            half_size: IVec2::splat(12),
            ..Default::default()
        },
    };
    if let Some(size) = cli.size {
        config.half_size = IVec2::splat(size);
    }
    if let Some(steps) = cli.ticks_per_frame {
        config.steps_per_tick = steps;
    }

    let radius = f64::from(config.half_size.min_element()) * config.tile_size.min_element() * 0.8;
    let mut sim = Simulation::new(config, HeadlessUi::new());
    match cli.demo {
        Demo::Square => sim.run_script(move |brain| square(brain, radius)),
        Demo::Spiral => sim.run_script(move |brain| spiral(brain, radius, 2.0)),
        Demo::Sensor => sim.run_script(|brain| wall_follower(brain, 200)),
    }?;

    if !sim.run_until_stopped(cli.max_ticks) {
        log::warn!("script still running after {} ticks, stopping", cli.max_ticks);
        sim.stop();
        sim.run_until_stopped(cli.max_ticks);
    }

    print!("{}", render(sim.world().floor()));
    log::info!("finished after {} ticks", sim.ticks());
    Ok(())
}

/// Turns toward `target` and drives there in a straight line.
fn move_to(brain: &Brain, target: DVec2) -> Result<(), BrainError> {
    let location = brain.current_location()?;
    let delta = target - location.position;
    if delta.length_squared() < 1e-12 {
        return Ok(());
    }

    let heading = delta.y.atan2(delta.x) / TAU;
    brain.rotate(normalize_angle(heading - location.angle))?;
    brain.move_forward(delta.length())
}

fn square(brain: &Brain, radius: f64) -> Result<()> {
    let side = (radius * 2.0).floor();
    brain.log(format!("Drawing a square with side {side}"))?;

    move_to(brain, DVec2::splat(-side / 2.0))?;
    brain.set_target_angle(0.0, false)?;
    brain.set_pen_down(true)?;

    let colors = [Color::RED, Color::GREEN, Color::BLUE, Color::MAGENTA];
    for color in colors {
        if !brain.is_running() {
            break;
        }
        brain.set_pen_color(color)?;
        brain.move_forward(side)?;
        brain.turn_left()?;
    }

    brain.set_pen_down(false)?;
    move_to(brain, DVec2::ZERO)?;
    Ok(())
}

fn spiral(brain: &Brain, radius: f64, twists: f64) -> Result<()> {
    let step = 1.0 / (TAU * radius);
    let pitch = radius / twists / 1.25;
    brain.log(format!(
        "Drawing spiral with radius {radius}, {twists} twists, using {:.0} steps",
        twists / step
    ))?;

    move_to(brain, DVec2::new(radius, 0.0))?;
    brain.set_pen_down(true)?;

    let mut angle = 0.0;
    while angle < twists && brain.is_running() {
        let distance = radius - pitch * angle;
        let point = DVec2::from_angle(angle * TAU) * distance;
        brain.set_pen_color(Color::from_hsv((angle / twists) as f32, 1.0, 1.0))?;
        move_to(brain, point)?;
        angle += step;
    }

    brain.set_pen_down(false)?;
    move_to(brain, DVec2::ZERO)?;
    Ok(())
}

/// Walls off a box of dark tiles and follows it with the left hand, steering by the sensor.
fn wall_follower(brain: &Brain, moves: usize) -> Result<()> {
    let wall = 4;
    for i in -wall..=wall {
        for tile in [
            IVec2::new(i, wall),
            IVec2::new(i, -wall),
            IVec2::new(wall, i),
            IVec2::new(-wall, i),
        ] {
            brain.set_absolute_tile(Color::BLACK, tile)?;
        }
    }

    brain.set_pen_color(Color::YELLOW)?;
    brain.set_pen_down(true)?;

    let mut turns = 0;
    for _ in 0..moves {
        if !brain.is_running() {
            break;
        }
        let sensor = brain.tile_sensor()?;
        let blocked = |front, side| sensor.get(front, side).is_some_and(|color| color.is_dark(0.2));

        if blocked(1, 0) {
            brain.turn_right()?;
            turns += 1;
        } else if !blocked(0, 1) && blocked(-1, 1) {
            brain.turn_left()?;
            brain.move_forward(1.0)?;
        } else {
            brain.move_forward(1.0)?;
        }
    }

    brain.log(format!("Wall follower finished after {turns} turns"))?;
    Ok(())
}

fn render(floor: &TiledFloor) -> String {
    let half = floor.half_size();
    let clear = floor.clear_color();
    let mut out = String::new();

    for y in (-half.y..=half.y).rev() {
        for x in -half.x..=half.x {
            let color = floor.color(IVec2::new(x, y));
            let glyph = if color == clear {
                '.'
            } else if color.is_dark(0.2) {
                '#'
            } else if color.is_red(0.5) {
                'r'
            } else if color.is_green(0.5) {
                'g'
            } else if color.is_blue(0.5) {
                'b'
            } else {
                '*'
            };
            out.push(glyph);
        }
        out.push('\n');
    }
    out
}
