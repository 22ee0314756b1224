//! Kernel — the scheduling service a cyclic task runs on
//!
//! Thread creation, the tick counter and the delay primitives come from the
//! kernel; this crate never re-derives them. Implement [`Kernel`] for a real
//! RTOS binding, or use [`crate::StdKernel`] (host threads) or
//! [`crate::SimKernel`] (virtual time) with the `std` feature.

use alloc::boxed::Box;

use crate::error::Result;
use crate::handshake::Handshake;
use crate::task::ThreadSpec;
use crate::timer::{self, Tick, Wake};

/// Thread body handed to [`Kernel::spawn`]
pub type ThreadBody = Box<dyn FnOnce() + Send + 'static>;

/// Kernel scheduling service
///
/// Cloning must be cheap and yield a handle to the same kernel: the task
/// keeps one clone and its thread another.
pub trait Kernel: Clone + Send + Sync + 'static {
    /// Handle to a spawned thread
    type Thread: Send;

    /// Create and start a thread running `body`
    fn spawn(&self, spec: &ThreadSpec, body: ThreadBody) -> Result<Self::Thread>;

    /// Wait for a thread to finish; `false` if it died from a fault
    fn join(&self, thread: Self::Thread) -> bool;

    /// Ticks per second
    fn tick_rate_hz(&self) -> u32;

    /// Current tick count (wrapping)
    fn tick_count(&self) -> Tick;

    /// Sleep the calling thread for `ticks` (relative)
    fn delay(&self, ticks: Tick);

    fn ms_to_ticks(&self, ms: u64) -> Tick {
        timer::ms_to_ticks(ms, self.tick_rate_hz())
    }

    /// Sleep until `*previous_wake + increment`, then store that target back
    ///
    /// The stored value is the target itself, not the actual wake time, so
    /// repeated calls stay on a fixed grid. If the target has already passed
    /// the call returns at once with [`Wake::Late`].
    fn delay_until(&self, previous_wake: &mut Tick, increment: Tick) -> Wake {
        let (target, wake, sleep) = timer::wake_after(*previous_wake, increment, self.tick_count());
        *previous_wake = target;
        if sleep > 0 {
            self.delay(sleep);
        }
        wake
    }

    /// Block until `handshake` is acknowledged or `timeout` ticks pass
    ///
    /// Polls once per millisecond (at least one tick) with [`Kernel::delay`].
    /// Kernels with a blocking wait/notify primitive should override this.
    fn wait_for_ack(&self, handshake: &Handshake, timeout: Option<Tick>) -> bool {
        let poll = self.ms_to_ticks(1).max(1);
        let mut waited: Tick = 0;
        while !handshake.is_acknowledged() {
            if let Some(limit) = timeout {
                if waited >= limit {
                    return false;
                }
            }
            self.delay(poll);
            waited = waited.saturating_add(poll);
        }
        true
    }
}
