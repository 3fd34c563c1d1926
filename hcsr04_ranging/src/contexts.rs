//! Threaded execution contexts.
//!
//! Two worker threads serve one device:
//!
//! - `hcsr04-ctrl`: runs the controller step. Requests made while a run is
//!   pending or in progress collapse into one re-run.
//! - `hcsr04-phase`: a one-shot timer running the phase executor at its
//!   deadline. Arming replaces the pending deadline.
//!
//! The edge context is whatever thread the line backend delivers edges on.

use crate::core::RangingCore;
use crate::dispatch::Dispatcher;
use crate::error::RangingError;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

#[derive(Debug, Default)]
struct TaskletState {
    scheduled: bool,
    shutdown: bool,
}

#[derive(Debug, Default)]
struct Tasklet {
    state: Mutex<TaskletState>,
    wake: Condvar,
}

#[derive(Debug, Default)]
struct TimerState {
    deadline: Option<Instant>,
    shutdown: bool,
}

#[derive(Debug, Default)]
struct PhaseTimer {
    state: Mutex<TimerState>,
    wake: Condvar,
}

/// [`Dispatcher`] backed by the two worker threads.
#[derive(Debug, Clone, Default)]
pub struct ThreadDispatcher {
    tasklet: Arc<Tasklet>,
    timer: Arc<PhaseTimer>,
}

impl ThreadDispatcher {
    fn shutdown(&self) {
        {
            let mut state = self.tasklet.state.lock();
            state.shutdown = true;
            state.scheduled = false;
            self.tasklet.wake.notify_all();
        }
        let mut state = self.timer.state.lock();
        state.shutdown = true;
        state.deadline = None;
        self.timer.wake.notify_all();
    }
}

impl Dispatcher for ThreadDispatcher {
    fn schedule_controller(&self) {
        let mut state = self.tasklet.state.lock();
        if state.shutdown {
            return;
        }
        state.scheduled = true;
        self.tasklet.wake.notify_one();
    }

    fn arm_phase(&self, delay: Duration) {
        let mut state = self.timer.state.lock();
        if state.shutdown {
            return;
        }
        state.deadline = Some(Instant::now() + delay);
        self.timer.wake.notify_one();
    }

    fn cancel_phase(&self) -> bool {
        self.timer.state.lock().deadline.take().is_some()
    }
}

/// Worker threads of one device.
#[derive(Debug)]
pub struct ExecutionContexts {
    dispatcher: ThreadDispatcher,
    workers: Vec<JoinHandle<()>>,
}

impl ExecutionContexts {
    /// Spawn both workers for `core`.
    ///
    /// # Errors
    ///
    /// `RangingError::Spawn` if a thread cannot be created. Workers already
    /// started are stopped and joined before returning.
    pub fn spawn(core: Arc<RangingCore>) -> Result<Self, RangingError> {
        let mut contexts = Self {
            dispatcher: ThreadDispatcher::default(),
            workers: Vec::with_capacity(2),
        };

        let ctrl = {
            let core = Arc::clone(&core);
            let dispatcher = contexts.dispatcher.clone();
            thread::Builder::new()
                .name("hcsr04-ctrl".to_string())
                .spawn(move || controller_loop(&core, &dispatcher))?
        };
        contexts.workers.push(ctrl);

        let phase = {
            let dispatcher = contexts.dispatcher.clone();
            thread::Builder::new()
                .name("hcsr04-phase".to_string())
                .spawn(move || phase_loop(&core, &dispatcher))?
        };
        contexts.workers.push(phase);

        debug!("Ranging execution contexts started");
        Ok(contexts)
    }

    /// Dispatcher feeding these workers.
    pub fn dispatcher(&self) -> ThreadDispatcher {
        self.dispatcher.clone()
    }

    /// Cancel pending work, stop and join the workers. Idempotent.
    pub fn shutdown(&mut self) {
        if self.workers.is_empty() {
            return;
        }
        self.dispatcher.shutdown();
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                warn!("Ranging worker panicked");
            }
        }
        debug!("Ranging execution contexts stopped");
    }
}

impl Drop for ExecutionContexts {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn controller_loop(core: &RangingCore, dispatcher: &ThreadDispatcher) {
    let tasklet = &dispatcher.tasklet;
    loop {
        {
            let mut state = tasklet.state.lock();
            while !state.scheduled && !state.shutdown {
                tasklet.wake.wait(&mut state);
            }
            if state.shutdown {
                return;
            }
            state.scheduled = false;
        }
        core.run_controller(dispatcher);
    }
}

fn phase_loop(core: &RangingCore, dispatcher: &ThreadDispatcher) {
    let timer = &dispatcher.timer;
    loop {
        {
            let mut state = timer.state.lock();
            loop {
                if state.shutdown {
                    return;
                }
                match state.deadline {
                    None => timer.wake.wait(&mut state),
                    Some(deadline) if Instant::now() >= deadline => {
                        state.deadline = None;
                        break;
                    }
                    Some(deadline) => {
                        // Re-checked on wake: the deadline may have been replaced.
                        let _ = timer.wake.wait_until(&mut state, deadline);
                    }
                }
            }
        }
        trace!("Phase timer fired");
        core.run_phase(dispatcher);
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
