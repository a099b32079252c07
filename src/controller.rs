//! The simulation side of the bridge.
//!
//! The [`Controller`] lives on the thread that owns the [`World`]. Each tick it
//! takes at most one request from the running brain: UI and `Get` requests are
//! answered on the spot, `Set` requests are queued on the actor and answered once
//! the actor reports it is idle again (or when the actor is reset under them).

use crate::brain::{self, BrainEvent, Request, RunOutcome, Script, StopHandle};
use crate::command::{ActorCommand, Addressing, Command, LogLevel, Payload};
use crate::error::BrainError;
use crate::turtle::CallbackType;
use crate::ui::UserInterface;
use crate::world::{ActorId, World};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use tokio::sync::{mpsc, oneshot};

struct Run {
    id: u64,
    requests: mpsc::UnboundedReceiver<Request>,
    handle: JoinHandle<RunOutcome>,
    running: Arc<AtomicBool>,
    cancelled: bool,
}

struct InFlight {
    request: Command,
    reply: oneshot::Sender<Command>,
}

/// Bridges one brain at a time to one actor of the world.
pub struct Controller {
    actor: ActorId,
    run: Option<Run>,
    in_flight: Option<InFlight>,
    events: Vec<BrainEvent>,
    runs: u64,
}

impl Controller {
    /// A controller driving `actor`, with no brain yet.
    pub fn new(actor: ActorId) -> Self {
        Self {
            actor,
            run: None,
            in_flight: None,
            events: Vec::new(),
            runs: 0,
        }
    }

    /// The actor this controller drives.
    pub fn actor(&self) -> ActorId {
        self.actor
    }

    /// Whether a brain thread exists that has not been reaped yet.
    pub fn is_running(&self) -> bool {
        self.run.is_some()
    }

    /// Whether the running brain was asked to stop or has returned, but was not reaped yet.
    pub fn is_stopping(&self) -> bool {
        self.run
            .as_ref()
            .is_some_and(|run| !run.running.load(Ordering::SeqCst))
    }

    /// Whether a request is waiting on the actor.
    pub fn has_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// A handle stopping the current run from any thread.
    pub fn stop_handle(&self) -> Option<StopHandle> {
        self.run
            .as_ref()
            .map(|run| StopHandle::new(run.running.clone()))
    }

    /// Starts `script` on a new brain thread.
    pub fn start(&mut self, script: Script) -> Result<StopHandle, BrainError> {
        if self.run.is_some() {
            return Err(BrainError::AlreadyRunning);
        }

        let (sender, requests) = mpsc::unbounded_channel();
        let running = Arc::new(AtomicBool::new(true));
        let id = self.runs + 1;
        let handle = brain::spawn(&format!("brain-{id}"), script, sender, running.clone())?;

        self.runs = id;
        self.run = Some(Run {
            id,
            requests,
            handle,
            running: running.clone(),
            cancelled: false,
        });
        self.events.push(BrainEvent::Started);
        log::info!("brain run {id} started");

        Ok(StopHandle::new(running))
    }

    /// Stops the running brain and wakes it if it is waiting. Idempotent.
    pub fn stop(&mut self) {
        if let Some(run) = &self.run {
            run.running.store(false, Ordering::SeqCst);
        }
        self.cancel();
    }

    /// Drops every pending reply sender so a blocked brain returns `Cancelled`.
    fn cancel(&mut self) {
        if let Some(run) = self.run.as_mut()
            && !run.cancelled
        {
            run.cancelled = true;
            run.requests.close();
            let mut dropped = 0;
            while run.requests.try_recv().is_ok() {
                dropped += 1;
            }
            log::info!("brain run {} cancelled ({dropped} queued requests dropped)", run.id);
        }
        if self.in_flight.take().is_some() {
            log::debug!("in-flight request released without reply");
        }
    }

    /// Services the brain once. Call at the start of every tick, before the world steps.
    ///
    /// With `wait`, blocks until the brain sends its next request or exits (and
    /// joins a stopped brain); only use it when nothing else needs stepping.
    pub fn poll(&mut self, world: &mut World, ui: &mut dyn UserInterface, wait: bool) {
        let Some(run) = &self.run else {
            return;
        };
        if !run.running.load(Ordering::SeqCst) {
            self.cancel();
        }

        self.reap(ui, false);
        if self.in_flight.is_some() {
            return;
        }
        let Some(run) = self.run.as_mut() else {
            return;
        };

        if wait && run.cancelled {
            self.reap(ui, true);
            return;
        }

        let request = if wait {
            match run.requests.blocking_recv() {
                Some(request) => request,
                None => {
                    // The brain dropped its sender, so the thread is exiting.
                    self.reap(ui, true);
                    return;
                }
            }
        } else {
            match run.requests.try_recv() {
                Ok(request) => request,
                Err(_) => return,
            }
        };

        self.dispatch(request, world, ui);
    }

    fn dispatch(&mut self, request: Request, world: &mut World, ui: &mut dyn UserInterface) {
        let Request { command, reply } = request;

        if !command.is_pending_request() {
            let payload = command.payload.clone();
            let _ = reply.send(command.into_reply(payload, false));
            return;
        }

        match &command.payload {
            Payload::Ui(request) => {
                let (payload, valid) = ui.handle(request);
                let _ = reply.send(command.into_reply(Payload::Ui(payload), valid));
            }
            Payload::Actor(request) if request.is_get() => {
                let answer = world.command_get(self.actor, request);
                let valid = answer.is_some();
                let payload = answer.map_or_else(|| command.payload.clone(), Payload::Actor);
                let _ = reply.send(command.into_reply(payload, valid));
            }
            Payload::Actor(request) => {
                if world.submit(self.actor, request.clone()) {
                    self.in_flight = Some(InFlight { request: command, reply });
                } else {
                    log::warn!("no actor {} to receive command", self.actor);
                    let payload = command.payload.clone();
                    let _ = reply.send(command.into_reply(payload, false));
                }
            }
        }
    }

    /// Reacts to an actor notification; completes the in-flight request once the
    /// actor reports `Active` with nothing left to do.
    ///
    /// Feed it every event the world emitted since the request was dispatched,
    /// and nothing older.
    pub fn on_actor_event(&mut self, id: ActorId, event: CallbackType, world: &World) {
        if id != self.actor || event != CallbackType::Active {
            return;
        }
        if world.actor(id).is_some_and(|actor| actor.is_idle()) {
            self.complete(world);
        }
    }

    /// Answers the in-flight request right away. Call after resetting the actor
    /// it was waiting on, since its queued command is gone.
    pub fn release(&mut self, world: &World) {
        if self.in_flight.is_some() {
            log::debug!("in-flight request released by reset");
        }
        self.complete(world);
    }

    fn complete(&mut self, world: &World) {
        let Some(InFlight { request, reply }) = self.in_flight.take() else {
            return;
        };
        let payload = world
            .command_get(self.actor, &ActorCommand::get(Addressing::Current))
            .map_or_else(|| request.payload.clone(), Payload::Actor);
        let _ = reply.send(request.into_reply(payload, true));
    }

    /// Joins a finished brain thread and reports how it ended.
    fn reap(&mut self, ui: &mut dyn UserInterface, block: bool) {
        let finished = self
            .run
            .as_ref()
            .is_some_and(|run| block || run.handle.is_finished());
        if !finished {
            return;
        }
        let Some(run) = self.run.take() else {
            return;
        };

        self.in_flight = None;
        let outcome = run
            .handle
            .join()
            .unwrap_or_else(|_| RunOutcome::Panicked("brain thread aborted".to_owned()));

        match &outcome {
            RunOutcome::Completed => log::info!("brain run {} completed", run.id),
            RunOutcome::Cancelled => log::info!("brain run {} stopped", run.id),
            RunOutcome::Failed(message) => {
                log::error!("brain run {} failed: {message}", run.id);
                ui.log("Brain", &format!("script failed: {message}"), LogLevel::Error);
            }
            RunOutcome::Panicked(message) => {
                log::error!("brain run {} panicked: {message}", run.id);
                ui.log("Brain", &format!("script panicked: {message}"), LogLevel::Error);
            }
        }
        self.events.push(BrainEvent::Stopped(outcome));
    }

    /// Drains brain lifecycle notifications emitted since the last call.
    pub fn drain_events(&mut self) -> Vec<BrainEvent> {
        std::mem::take(&mut self.events)
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.stop();
    }
}
