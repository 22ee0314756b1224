//! Host kernel — OS threads and a monotonic clock cut into ticks
//!
//! Stands in for an RTOS on desktop targets. Priorities are accepted but
//! not applied; the host scheduler decides. Stack budgets sized for an MCU
//! are raised to [`HOST_MIN_STACK`], since host unwinding and backtrace
//! capture need far more than an RTOS task does.

use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use alloc::string::ToString;
use log::{debug, error};

use crate::error::{Error, Result};
use crate::handshake::Handshake;
use crate::kernel::{Kernel, ThreadBody};
use crate::task::ThreadSpec;
use crate::timer::{self, Tick, Wake, DEFAULT_TICK_RATE_HZ};

/// Smallest stack given to a host thread, in bytes
pub const HOST_MIN_STACK: usize = 256 * 1024;

/// Stack actually requested from the host for a `stack_size` budget
pub fn host_stack_size(stack_size: usize) -> usize {
    stack_size.max(HOST_MIN_STACK)
}

/// Kernel backed by `std::thread` and `Instant`
#[derive(Debug, Clone, Copy)]
pub struct StdKernel {
    epoch: Instant,
    tick_rate_hz: u32,
}

impl StdKernel {
    /// Tick 0 is now
    pub fn new(tick_rate_hz: u32) -> Self {
        Self {
            epoch: Instant::now(),
            tick_rate_hz: tick_rate_hz.max(1),
        }
    }

    /// Ticks since the epoch, without wrapping
    fn elapsed_ticks(&self) -> u64 {
        let ticks = self.epoch.elapsed().as_nanos() * self.tick_rate_hz as u128 / 1_000_000_000;
        ticks as u64
    }

    /// Sleep until the start of absolute tick `tick`
    fn sleep_until(&self, tick: u64) {
        let nanos = tick as u128 * 1_000_000_000 / self.tick_rate_hz as u128;
        let wake_at = self.epoch + Duration::from_nanos(nanos as u64);
        let now = Instant::now();
        if wake_at > now {
            thread::sleep(wake_at - now);
        }
    }
}

impl Default for StdKernel {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_RATE_HZ)
    }
}

impl Kernel for StdKernel {
    type Thread = JoinHandle<()>;

    fn spawn(&self, spec: &ThreadSpec, body: ThreadBody) -> Result<JoinHandle<()>> {
        debug!(
            "host thread `{}`: priority {} not applied",
            spec.name, spec.priority.0
        );
        thread::Builder::new()
            .name(spec.name.to_string())
            .stack_size(host_stack_size(spec.stack_size))
            .spawn(body)
            .map_err(|e| {
                error!("cannot spawn `{}`: {}", spec.name, e);
                Error::Spawn(spec.name.to_string())
            })
    }

    fn join(&self, thread: JoinHandle<()>) -> bool {
        thread.join().is_ok()
    }

    fn tick_rate_hz(&self) -> u32 {
        self.tick_rate_hz
    }

    fn tick_count(&self) -> Tick {
        self.elapsed_ticks() as Tick
    }

    fn delay(&self, ticks: Tick) {
        self.sleep_until(self.elapsed_ticks() + ticks as u64);
    }

    fn delay_until(&self, previous_wake: &mut Tick, increment: Tick) -> Wake {
        // One clock read: the sleep target is exactly the computed grid point
        let now = self.elapsed_ticks();
        let (target, wake, sleep) = timer::wake_after(*previous_wake, increment, now as Tick);
        *previous_wake = target;
        if sleep > 0 {
            self.sleep_until(now + sleep as u64);
        }
        wake
    }

    fn wait_for_ack(&self, handshake: &Handshake, timeout: Option<Tick>) -> bool {
        handshake.wait(timeout.map(|t| timer::ticks_to_duration(t, self.tick_rate_hz)))
    }
}
