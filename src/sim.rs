//! Simulated kernel — deterministic virtual time for testing
//!
//! Virtual time only moves when every participant is asleep. Participants
//! are the thread that created the kernel plus every thread from `spawn`.
//! Sleepers are released one at a time, earliest target first and, on a
//! tie, in the order they went to sleep, so a test that sleeps with
//! [`SimKernel::run_for`] observes the same interleaving on every run.
//!
//! Only participants may block on the clock.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::vec::Vec;

use alloc::string::ToString;
use log::error;

use crate::error::{Error, Result};
use crate::kernel::{Kernel, ThreadBody};
use crate::task::ThreadSpec;
use crate::timer::{Tick, DEFAULT_TICK_RATE_HZ};

struct Sleeper {
    wake_at: u64,
    seq: u64,
}

struct SimState {
    /// Virtual time (never wraps; `tick_count` truncates)
    now: u64,
    /// Participants currently not sleeping
    running: usize,
    sleepers: Vec<Sleeper>,
    next_seq: u64,
}

impl SimState {
    /// Once nobody is running, wake the next sleeper and jump time to it
    fn release_next(&mut self) {
        if self.running > 0 {
            return;
        }
        let next = self
            .sleepers
            .iter()
            .enumerate()
            .min_by_key(|(_, s)| (s.wake_at, s.seq))
            .map(|(idx, _)| idx);
        if let Some(idx) = next {
            let sleeper = self.sleepers.swap_remove(idx);
            self.now = self.now.max(sleeper.wake_at);
            self.running += 1;
        }
    }

    fn is_asleep(&self, seq: u64) -> bool {
        self.sleepers.iter().any(|s| s.seq == seq)
    }
}

struct Shared {
    tick_rate_hz: u32,
    state: Mutex<SimState>,
    wakeup: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take the calling participant off the run count
    fn park(&self) {
        let mut state = self.lock();
        state.running = state.running.saturating_sub(1);
        state.release_next();
        self.wakeup.notify_all();
    }

    fn unpark(&self) {
        self.lock().running += 1;
    }
}

/// Drops a spawned thread from the run count when it exits or unwinds
struct Participant(Arc<Shared>);

impl Drop for Participant {
    fn drop(&mut self) {
        self.0.park();
    }
}

/// Kernel with a virtual tick counter
#[derive(Clone)]
pub struct SimKernel {
    shared: Arc<Shared>,
}

impl SimKernel {
    /// Virtual clock at tick 0; the calling thread becomes the controller
    pub fn new(tick_rate_hz: u32) -> Self {
        Self::starting_at(tick_rate_hz, 0)
    }

    /// Virtual clock starting at `tick`
    pub fn starting_at(tick_rate_hz: u32, tick: u64) -> Self {
        Self {
            shared: Arc::new(Shared {
                tick_rate_hz: tick_rate_hz.max(1),
                state: Mutex::new(SimState {
                    now: tick,
                    running: 1,
                    sleepers: Vec::new(),
                    next_seq: 0,
                }),
                wakeup: Condvar::new(),
            }),
        }
    }

    /// Current virtual time
    pub fn now(&self) -> u64 {
        self.shared.lock().now
    }

    /// Let every other participant run for `ticks` of virtual time
    pub fn run_for(&self, ticks: Tick) {
        self.sleep(ticks as u64);
    }

    fn sleep(&self, ticks: u64) {
        if ticks == 0 {
            return;
        }
        let mut state = self.shared.lock();
        let seq = state.next_seq;
        state.next_seq += 1;
        let wake_at = state.now + ticks;
        state.sleepers.push(Sleeper { wake_at, seq });
        state.running = state.running.saturating_sub(1);
        state.release_next();
        self.shared.wakeup.notify_all();

        while state.is_asleep(seq) {
            state = self
                .shared
                .wakeup
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

impl Default for SimKernel {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_RATE_HZ)
    }
}

impl Kernel for SimKernel {
    type Thread = JoinHandle<()>;

    fn spawn(&self, spec: &ThreadSpec, body: ThreadBody) -> Result<JoinHandle<()>> {
        // Counted before the thread exists so time cannot pass it by
        self.shared.unpark();
        let shared = Arc::clone(&self.shared);
        // Stack budgets are not modelled; host default applies
        thread::Builder::new()
            .name(spec.name.to_string())
            .spawn(move || {
                let _participant = Participant(shared);
                body();
            })
            .map_err(|e| {
                self.shared.park();
                error!("sim: cannot spawn `{}`: {}", spec.name, e);
                Error::Spawn(spec.name.to_string())
            })
    }

    fn join(&self, thread: JoinHandle<()>) -> bool {
        // Blocked in join counts as asleep, or the joined thread never wakes
        self.shared.park();
        let clean = thread.join().is_ok();
        self.shared.unpark();
        clean
    }

    fn tick_rate_hz(&self) -> u32 {
        self.shared.tick_rate_hz
    }

    fn tick_count(&self) -> Tick {
        self.now() as Tick
    }

    fn delay(&self, ticks: Tick) {
        self.sleep(ticks as u64);
    }
}
