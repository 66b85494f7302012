//! Cross-thread control of a running server.

use std::sync::atomic::Ordering;
use std::sync::mpsc::Sender;
use std::sync::{Arc, PoisonError};

use log::info;

use crate::error::Result;
use crate::protocol::Status;
use crate::transport::Transport;

use super::{lock, Command, LoopState, Shared};

/// Cloneable handle for stopping an [`ExperimentServer`](super::ExperimentServer).
pub struct ServerHandle<T> {
    shared: Arc<Shared<T>>,
    commands: Sender<Command>,
}

impl<T> Clone for ServerHandle<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            commands: self.commands.clone(),
        }
    }
}

impl<T: Transport> ServerHandle<T> {
    pub(super) fn new(shared: Arc<Shared<T>>, commands: Sender<Command>) -> Self {
        Self { shared, commands }
    }

    /// Ask the loop to exit after the current target, without waiting.
    ///
    /// Safe to call from a signal handler thread.
    pub fn schedule_stop(&self) {
        self.shared.stop.store(true, Ordering::Release);
        // a closed queue means the server is gone anyway
        let _ = self.commands.send(Command::Stop);
    }

    /// Whether the worker loop is running.
    pub fn is_running(&self) -> bool {
        *lock(&self.shared.lifecycle) == LoopState::Running
    }

    /// Get the last published status.
    pub fn status(&self) -> Status {
        self.shared.status()
    }

    /// Stop the loop and wait for it to exit.
    ///
    /// The caller that observes the exit publishes OFFLINE, waits for the
    /// broker to confirm it and halts message delivery; the loop can then
    /// be started again. Returns `Ok(false)` if there was nothing to stop,
    /// including when a concurrent call already did.
    pub fn stop(&self) -> Result<bool> {
        let mut state = lock(&self.shared.lifecycle);
        if *state == LoopState::Idle {
            return Ok(false);
        }

        self.schedule_stop();
        while *state == LoopState::Running {
            state = self
                .shared
                .exited
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        if *state != LoopState::Exited {
            return Ok(false);
        }

        // the lock is held so concurrent callers see Idle only once
        // OFFLINE went out
        let published = self.shared.publish_status_confirmed(Status::Offline);
        let halted = self.shared.transport.stop_delivery();
        *state = LoopState::Idle;
        self.shared.stop.store(false, Ordering::Release);
        info!("server stopped");

        published.and(halted).map(|()| true)
    }
}
