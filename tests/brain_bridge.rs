// tests/brain_bridge.rs
use glam::{DVec2, IVec2};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use tiled_turtle::{
    Answer, BrainError, BrainEvent, HeadlessUi, RunOutcome, Simulation, SimulationConfig,
    WorldObserver,
};

fn setup(ui: HeadlessUi) -> Simulation {
    let config = SimulationConfig {
        half_size: IVec2::new(5, 5),
        ..Default::default()
    };
    Simulation::new(config, ui)
}

/// Collects every brain lifecycle event.
struct BrainLog(Rc<RefCell<Vec<BrainEvent>>>);

impl WorldObserver for BrainLog {
    fn brain_event(&mut self, event: &BrainEvent) {
        self.0.borrow_mut().push(event.clone());
    }
}

fn watch(sim: &mut Simulation) -> Rc<RefCell<Vec<BrainEvent>>> {
    let events = Rc::new(RefCell::new(Vec::new()));
    sim.add_observer(Box::new(BrainLog(events.clone())));
    events
}

#[test]
fn test_requests_are_served_in_order() {
    let mut sim = setup(HeadlessUi::new());
    sim.run_script(|brain| {
        brain.log("first")?;
        brain.move_forward(1.0)?;
        brain.log("second")?;
        brain.rotate(0.5)?;
        brain.log("third")?;
        Ok(())
    })
    .unwrap();
    assert!(sim.run_until_stopped(10_000));

    assert_eq!(sim.ui().lines(), ["Brain: first", "Brain: second", "Brain: third"]);
    let state = sim.world().main_actor().state();
    assert_eq!(state.current.tile, IVec2::new(1, 0));
    assert_eq!(state.current.angle, 0.5);
}

#[test]
fn test_get_through_bridge_is_pure() {
    let mut sim = setup(HeadlessUi::new());
    let (tx, rx) = mpsc::channel();
    sim.run_script(move |brain| {
        brain.move_by(2.0, -1.0)?;
        let first = brain.current_location()?;
        let tile = brain.directional_tile(IVec2::new(1, 0))?;
        let second = brain.current_location()?;
        tx.send((first, second, tile))?;
        Ok(())
    })
    .unwrap();
    assert!(sim.run_until_stopped(10_000));

    let (first, second, _) = rx.recv().unwrap();
    assert_eq!(first, second);
    assert_eq!(first.tile, IVec2::new(2, -1));
}

#[test]
fn test_stop_releases_blocked_call() {
    let mut config = SimulationConfig {
        half_size: IVec2::new(5, 5),
        ..Default::default()
    };
    config.actor.linear_speed = 0.001;
    let mut sim = Simulation::new(config, HeadlessUi::new());
    let events = watch(&mut sim);

    let (tx, rx) = mpsc::channel();
    sim.run_script(move |brain| {
        let result = brain.move_forward(4.0);
        tx.send(result.clone())?;
        result?;
        Ok(())
    })
    .unwrap();

    // Long enough for the move to be in flight, far too short to finish it.
    assert!(!sim.run_until_stopped(50));
    assert!(sim.world().main_actor().state().current.position.x > 0.0);

    sim.stop();
    assert!(sim.run_until_stopped(10_000));

    assert_eq!(rx.recv().unwrap(), Err(BrainError::Cancelled));
    assert_eq!(
        *events.borrow(),
        [BrainEvent::Started, BrainEvent::Stopped(RunOutcome::Cancelled)]
    );
    // The actor keeps whatever it was doing; stopping the brain does not touch it.
    assert!(sim.world().is_busy());
}

#[test]
fn test_script_error_is_reported_once() {
    let mut sim = setup(HeadlessUi::new());
    let events = watch(&mut sim);
    sim.run_script(|brain| {
        brain.rotate(0.25)?;
        anyhow::bail!("boom")
    })
    .unwrap();
    assert!(sim.run_until_stopped(10_000));
    for _ in 0..10 {
        sim.tick();
    }

    assert_eq!(
        *events.borrow(),
        [BrainEvent::Started, BrainEvent::Stopped(RunOutcome::Failed("boom".into()))]
    );
    assert_eq!(sim.ui().lines(), ["Brain: script failed: boom"]);
}

#[test]
fn test_script_panic_is_reported_once() {
    let mut sim = setup(HeadlessUi::new());
    let events = watch(&mut sim);
    sim.run_script(|brain| {
        brain.log("before")?;
        panic!("kaboom");
    })
    .unwrap();
    assert!(sim.run_until_stopped(10_000));
    sim.tick();

    assert_eq!(
        *events.borrow(),
        [BrainEvent::Started, BrainEvent::Stopped(RunOutcome::Panicked("kaboom".into()))]
    );
    assert_eq!(sim.ui().lines(), ["Brain: before", "Brain: script panicked: kaboom"]);
}

#[test]
fn test_dismissed_input_is_rejected() {
    let ui = HeadlessUi::with_answers([Answer::Integer(12), Answer::Cancel, Answer::Text("hi".into())]);
    let mut sim = setup(ui);
    let (tx, rx) = mpsc::channel();
    sim.run_script(move |brain| {
        let accepted = brain.get_integer("Size", "side length", 3);
        let dismissed = brain.get_double("Speed", "per tick", 0.5);
        let text = brain.get_string("Name", "turtle", "bob");
        tx.send((accepted, dismissed, text))?;
        Ok(())
    })
    .unwrap();
    assert!(sim.run_until_stopped(10_000));

    let (accepted, dismissed, text) = rx.recv().unwrap();
    assert_eq!(accepted, Ok(12));
    assert_eq!(dismissed, Err(BrainError::Rejected("double")));
    assert_eq!(text, Ok("hi".to_owned()));
}

#[test]
fn test_reset_releases_waiting_move() {
    let mut config = SimulationConfig {
        half_size: IVec2::new(5, 5),
        ..Default::default()
    };
    config.actor.linear_speed = 0.001;
    let mut sim = Simulation::new(config, HeadlessUi::new());
    let (tx, rx) = mpsc::channel();
    sim.run_script(move |brain| {
        tx.send(brain.move_forward(4.0))?;
        Ok(())
    })
    .unwrap();

    assert!(!sim.run_until_stopped(50));
    sim.reset();
    assert!(sim.run_until_stopped(10_000));

    assert_eq!(rx.recv().unwrap(), Ok(()));
    assert_eq!(sim.world().main_actor().state().current.tile, IVec2::ZERO);
}

#[test]
fn test_single_step_needs_continue() {
    let mut sim = setup(HeadlessUi::new());
    sim.set_single_step(true);
    sim.run_script(|brain| {
        brain.move_forward(0.3)?;
        Ok(())
    })
    .unwrap();

    // Without continuing, the paused actor never finishes the move.
    assert!(!sim.run_until_stopped(200));
    let paused_at = sim.world().main_actor().state().current.position.x;
    assert!(paused_at < 0.3);

    for _ in 0..2_000 {
        if sim.world().main_actor().state().current.position.x == 0.3 {
            break;
        }
        sim.continue_single_step();
        sim.tick();
        thread::sleep(Duration::from_millis(1));
    }
    assert_eq!(sim.world().main_actor().state().current.position.x, 0.3);
    assert!(sim.is_running(), "reply waits for the next continue");

    sim.set_single_step(false);
    assert!(sim.run_until_stopped(10_000));
}

/// Ticks one at a time until the script sends a value, pausing briefly between ticks.
fn tick_until<T>(sim: &mut Simulation, rx: &mpsc::Receiver<T>) -> Option<T> {
    for _ in 0..5_000 {
        sim.tick();
        if let Ok(value) = rx.try_recv() {
            return Some(value);
        }
        thread::sleep(Duration::from_micros(200));
    }
    None
}

#[test]
fn test_first_move_completes_before_reply_when_ticked() {
    let mut sim = Simulation::new(SimulationConfig::default(), HeadlessUi::new());
    let (tx, rx) = mpsc::channel();
    sim.run_script(move |brain| {
        brain.move_forward(3.0)?;
        tx.send(brain.current_position()?)?;
        Ok(())
    })
    .unwrap();

    // The move is queued before the first tick, next to the turtle's construction reset.
    thread::sleep(Duration::from_millis(50));
    assert_eq!(tick_until(&mut sim, &rx), Some(DVec2::new(3.0, 0.0)));
    assert!(sim.run_until_stopped(10_000));
}

#[test]
fn test_move_after_reset_completes_fully() {
    let mut sim = setup(HeadlessUi::new());
    let (moved_tx, moved_rx) = mpsc::channel();
    let (go_tx, go_rx) = mpsc::channel::<()>();
    let (done_tx, done_rx) = mpsc::channel();
    sim.run_script(move |brain| {
        brain.move_forward(1.0)?;
        moved_tx.send(brain.current_position()?)?;
        go_rx.recv()?;
        brain.move_forward(2.0)?;
        done_tx.send(brain.current_position()?)?;
        Ok(())
    })
    .unwrap();

    assert_eq!(tick_until(&mut sim, &moved_rx), Some(DVec2::new(1.0, 0.0)));

    // Nothing is waiting on the turtle while it is reset.
    sim.reset();
    go_tx.send(()).unwrap();
    thread::sleep(Duration::from_millis(50));

    assert_eq!(tick_until(&mut sim, &done_rx), Some(DVec2::new(2.0, 0.0)));
    assert!(sim.run_until_stopped(10_000));
}

#[test]
fn test_realtime_run_applies_every_move() {
    let mut config = SimulationConfig {
        half_size: IVec2::new(5, 5),
        ..Default::default()
    };
    config.tick_interval_ms = 1;
    let mut sim = Simulation::new(config, HeadlessUi::new());
    let (tx, rx) = mpsc::channel();
    sim.run_script(move |brain| {
        brain.move_forward(1.0)?;
        brain.turn_left()?;
        brain.move_forward(1.0)?;
        tx.send(brain.current_location()?)?;
        Ok(())
    })
    .unwrap();

    assert!(sim.run_realtime(5_000));
    let location = rx.recv().unwrap();
    assert!((location.position - DVec2::new(1.0, 1.0)).length() < 1e-9);
    assert_eq!(location.tile, IVec2::new(1, 1));
    assert_eq!(location.angle, 0.25);
}
