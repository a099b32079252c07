//! The owner of the tick loop.
//!
//! A [`Simulation`] holds the world, the controller bridging it to a brain, the
//! user interface, and any number of observers. Each tick services the brain,
//! steps the world, and then fans out the resulting notifications.

use crate::brain::{Brain, BrainEvent, StopHandle};
use crate::config::SimulationConfig;
use crate::controller::Controller;
use crate::error::BrainError;
use crate::floor::TiledFloor;
use crate::turtle::{ActorState, CallbackType};
use crate::ui::{HeadlessUi, UserInterface};
use crate::world::{ActorId, World};
use glam::{DVec2, IVec2};
use std::thread;
use std::time::Instant;

/// Receives notifications after every tick, in emission order.
///
/// Presentation layers implement this instead of polling the world.
pub trait WorldObserver {
    fn actor_event(&mut self, _actor: ActorId, _event: CallbackType, _state: &ActorState) {}

    fn brain_event(&mut self, _event: &BrainEvent) {}

    /// Called after the floor was written to, with all writes of the batch applied.
    fn floor_changed(&mut self, _floor: &TiledFloor) {}
}

/// Owns a world and runs one brain against its main actor.
pub struct Simulation<U: UserInterface = HeadlessUi> {
    world: World,
    controller: Controller,
    ui: U,
    observers: Vec<Box<dyn WorldObserver>>,
    steps_per_tick: u32,
    single_step: bool,
    ticks: u64,
}

impl<U: UserInterface> Simulation<U> {
    /// A fresh world built from `config`, answering brain UI requests through `ui`.
    pub fn new(config: SimulationConfig, ui: U) -> Self {
        let steps_per_tick = config.steps_per_tick.max(1);
        Self {
            world: World::new(config),
            controller: Controller::new(0),
            ui,
            observers: Vec::new(),
            steps_per_tick,
            single_step: false,
            ticks: 0,
        }
    }

    /// Registers an observer for every following tick.
    pub fn add_observer(&mut self, observer: Box<dyn WorldObserver>) {
        self.observers.push(observer);
    }

    /// Starts `script` as the brain of the main actor.
    pub fn run_script<F>(&mut self, script: F) -> Result<StopHandle, BrainError>
    where
        F: FnOnce(&Brain) -> anyhow::Result<()> + Send + 'static,
    {
        self.controller.start(Box::new(script))
    }

    /// Stops the running brain, if any. The `Stopped` event follows once the thread exits.
    pub fn stop(&mut self) {
        self.controller.stop();
    }

    /// Whether a brain thread has not been reaped yet.
    pub fn is_running(&self) -> bool {
        self.controller.is_running()
    }

    /// Runs one tick without blocking. Returns whether the world changed.
    pub fn tick(&mut self) -> bool {
        self.advance(false)
    }

    fn advance(&mut self, wait: bool) -> bool {
        // Flush notifications raised between ticks before a request goes in flight.
        self.dispatch_events();
        self.controller.poll(&mut self.world, &mut self.ui, wait);
        let changed = self.world.step(self.steps_per_tick);
        self.dispatch_events();

        self.ticks += 1;
        changed
    }

    /// Fans out every pending world and brain notification.
    fn dispatch_events(&mut self) {
        for (id, event) in self.world.drain_events() {
            self.controller.on_actor_event(id, event, &self.world);
            if let Some(actor) = self.world.actor(id) {
                for observer in &mut self.observers {
                    observer.actor_event(id, event, actor.state());
                }
            }
        }

        if self.world.floor_mut().take_dirty() {
            for observer in &mut self.observers {
                observer.floor_changed(self.world.floor());
            }
        }

        for event in self.controller.drain_events() {
            for observer in &mut self.observers {
                observer.brain_event(&event);
            }
        }
    }

    /// Ticks as fast as possible until the brain has stopped, for at most `max_ticks`.
    ///
    /// While every actor is idle the loop waits for the brain's next request
    /// instead of spinning, and a stopped brain is joined right away. Returns
    /// whether the brain stopped in time.
    pub fn run_until_stopped(&mut self, max_ticks: u64) -> bool {
        for _ in 0..max_ticks {
            if !self.controller.is_running() {
                return true;
            }
            let idle = !self.world.is_busy() && !self.controller.has_in_flight();
            let wait = !self.single_step && (idle || self.controller.is_stopping());
            self.advance(wait);
        }
        !self.controller.is_running()
    }

    /// Ticks at the configured wall-clock interval until the brain stops or `max_ticks` pass.
    pub fn run_realtime(&mut self, max_ticks: u64) -> bool {
        let interval = self.world.config().tick_interval();
        for _ in 0..max_ticks {
            if !self.controller.is_running() {
                return true;
            }
            let started = Instant::now();
            self.tick();
            thread::sleep(interval.saturating_sub(started.elapsed()));
        }
        !self.controller.is_running()
    }

    /// In single-step mode the main actor pauses after every step until continued.
    pub fn set_single_step(&mut self, enable: bool) {
        self.single_step = enable;
        if let Some(actor) = self.world.actor_mut(self.controller.actor()) {
            actor.pause(enable);
        }
    }

    /// Whether single-step mode is on.
    pub fn is_single_step(&self) -> bool {
        self.single_step
    }

    /// Lets a paused actor take its next step.
    pub fn continue_single_step(&mut self) {
        if let Some(actor) = self.world.actor_mut(self.controller.actor()) {
            actor.unpause();
        }
    }

    /// Clears the floor and resets every actor. A brain waiting on a move is released.
    pub fn reset(&mut self) {
        self.world.reset();
        self.controller.release(&self.world);
    }

    /// Reallocates the floor and resets every actor, releasing a waiting brain.
    pub fn resize(&mut self, half_size: IVec2, tile_size: DVec2) {
        self.world.resize(half_size, tile_size);
        self.controller.release(&self.world);
    }

    /// Simulation steps per tick, at least one.
    pub fn set_steps_per_tick(&mut self, steps: u32) {
        self.steps_per_tick = steps.max(1);
    }

    /// Simulation steps advanced per tick.
    pub fn steps_per_tick(&self) -> u32 {
        self.steps_per_tick
    }

    /// Ticks run so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// The simulated world.
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Mutable world access. Use [`Simulation::reset`] rather than `World::reset` while a brain runs.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// The user interface answering brain requests.
    pub fn ui(&self) -> &U {
        &self.ui
    }

    /// Mutable user interface access.
    pub fn ui_mut(&mut self) -> &mut U {
        &mut self.ui
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Recorder {
        actor: Vec<CallbackType>,
        brain: Vec<BrainEvent>,
        floors: usize,
    }

    struct Shared(Rc<RefCell<Recorder>>);

    impl WorldObserver for Shared {
        fn actor_event(&mut self, _actor: ActorId, event: CallbackType, _state: &ActorState) {
            self.0.borrow_mut().actor.push(event);
        }

        fn brain_event(&mut self, event: &BrainEvent) {
            self.0.borrow_mut().brain.push(event.clone());
        }

        fn floor_changed(&mut self, _floor: &TiledFloor) {
            self.0.borrow_mut().floors += 1;
        }
    }

    fn small() -> SimulationConfig {
        SimulationConfig {
            half_size: IVec2::new(5, 5),
            ..Default::default()
        }
    }

    #[test]
    fn observers_see_reset_and_brain_lifecycle() {
        let recorder = Rc::new(RefCell::new(Recorder::default()));
        let mut sim = Simulation::new(small(), HeadlessUi::new());
        sim.add_observer(Box::new(Shared(recorder.clone())));

        sim.run_script(|brain| {
            brain.move_forward(1.0)?;
            Ok(())
        })
        .unwrap();
        assert!(sim.run_until_stopped(1_000));

        let recorder = recorder.borrow();
        assert_eq!(recorder.actor.first(), Some(&CallbackType::Reset));
        assert!(recorder.actor.contains(&CallbackType::Current));
        assert_eq!(
            recorder.brain,
            [BrainEvent::Started, BrainEvent::Stopped(crate::brain::RunOutcome::Completed)]
        );
        assert!(recorder.floors >= 1);
    }

    #[test]
    fn second_script_is_refused_while_running() {
        let mut sim = Simulation::new(small(), HeadlessUi::new());
        sim.run_script(|brain| {
            while brain.is_running() {
                brain.rotate(0.25)?;
            }
            Ok(())
        })
        .unwrap();
        assert_eq!(sim.run_script(|_| Ok(())).err(), Some(BrainError::AlreadyRunning));

        sim.stop();
        assert!(sim.run_until_stopped(1_000));
        assert!(sim.run_script(|_| Ok(())).is_ok());
        assert!(sim.run_until_stopped(1_000));
    }
}
