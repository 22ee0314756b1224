//! Suspend acknowledgment — flag set only by the task's own context
//!
//! The requester clears the flag and waits; the cycle loop sets it once it
//! has observed the suspension and skipped the callable. With `std`, setting
//! the flag also wakes condition-variable waiters.

use core::sync::atomic::{AtomicBool, Ordering};

#[cfg(feature = "std")]
use std::sync::{Condvar, Mutex, PoisonError};
#[cfg(feature = "std")]
use std::time::{Duration, Instant};

/// Acknowledgment flag shared between requester and task
#[derive(Default)]
pub struct Handshake {
    acked: AtomicBool,
    #[cfg(feature = "std")]
    lock: Mutex<()>,
    #[cfg(feature = "std")]
    signal: Condvar,
}

impl Handshake {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requester side: forget any earlier acknowledgment
    pub fn reset(&self) {
        self.acked.store(false, Ordering::SeqCst);
    }

    /// Task side: confirm the suspension has been observed
    pub fn acknowledge(&self) {
        if self.acked.swap(true, Ordering::SeqCst) {
            return;
        }
        #[cfg(feature = "std")]
        {
            // Taking the lock orders this notify after any waiter's flag check
            let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
            self.signal.notify_all();
        }
    }

    pub fn is_acknowledged(&self) -> bool {
        self.acked.load(Ordering::SeqCst)
    }

    /// Block on the condition variable until acknowledged
    ///
    /// Returns `false` if `timeout` elapsed first; `None` waits forever.
    #[cfg(feature = "std")]
    pub fn wait(&self, timeout: Option<Duration>) -> bool {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        while !self.is_acknowledged() {
            match deadline {
                None => {
                    guard = self.signal.wait(guard).unwrap_or_else(PoisonError::into_inner);
                }
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return false;
                    }
                    guard = self
                        .signal
                        .wait_timeout(guard, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0;
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_and_acknowledge() {
        let hs = Handshake::new();
        assert!(!hs.is_acknowledged());
        hs.acknowledge();
        assert!(hs.is_acknowledged());
        hs.reset();
        assert!(!hs.is_acknowledged());
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_wait_times_out() {
        let hs = Handshake::new();
        assert!(!hs.wait(Some(Duration::from_millis(10))));
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_wait_woken_by_other_thread() {
        use std::sync::Arc;

        let hs = Arc::new(Handshake::new());
        let task_side = Arc::clone(&hs);
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(5));
            task_side.acknowledge();
        });
        assert!(hs.wait(Some(Duration::from_secs(5))));
        handle.join().unwrap();
    }
}
