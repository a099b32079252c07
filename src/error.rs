use thiserror::Error;

/// Failures surfaced to scripts through the brain API.
///
/// The floor, actors and world never fail; everything fallible happens at the
/// boundary between a script and the simulation.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BrainError {
    /// The run was stopped while (or before) the call was waiting.
    #[error("brain was stopped")]
    Cancelled,
    /// The simulation side went away.
    #[error("simulation is no longer accepting commands")]
    Disconnected,
    /// The request was processed but not accepted, e.g. an input dialog was dismissed.
    #[error("{0} request was rejected")]
    Rejected(&'static str),
    /// The reply did not match the request.
    #[error("unexpected reply to {0} request")]
    UnexpectedReply(&'static str),
    #[error("a brain is already running")]
    AlreadyRunning,
    #[error("failed to spawn brain thread: {0}")]
    Spawn(String),
}
