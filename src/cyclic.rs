//! Cyclic task — call a closure once per period on its own thread
//!
//! The thread loops forever: invoke the callable if active, otherwise
//! acknowledge a pending suspend, then `delay_until` the next grid point.
//! Suspending only skips the callable; the thread keeps its schedule, so
//! deadline accounting continues while suspended.

use alloc::boxed::Box;
use alloc::string::ToString;
use alloc::sync::Arc;
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use core::time::Duration;

use log::{debug, error, info, warn};
use spin::Mutex;

use crate::error::{Error, Result};
use crate::handshake::Handshake;
use crate::kernel::Kernel;
use crate::task::{TaskConfig, TaskName, TaskPriority};
use crate::timer::{self, Tick, Wake};

/// Per-cycle payload
pub type TaskFn = Box<dyn FnMut() + Send + 'static>;

/// State shared between the owning handle and the task thread
struct Control {
    active: AtomicBool,
    stop: AtomicBool,
    running: AtomicBool,
    period: AtomicU32,
    ack: Handshake,
    cycles: AtomicU32,
    invocations: AtomicU32,
    missed: AtomicU32,
    last_late: AtomicBool,
    max_overrun: AtomicU32,
}

impl Control {
    fn new(period: Tick) -> Self {
        Self {
            active: AtomicBool::new(true),
            stop: AtomicBool::new(false),
            running: AtomicBool::new(false),
            period: AtomicU32::new(period),
            ack: Handshake::new(),
            cycles: AtomicU32::new(0),
            invocations: AtomicU32::new(0),
            missed: AtomicU32::new(0),
            last_late: AtomicBool::new(false),
            max_overrun: AtomicU32::new(0),
        }
    }

    fn record(&self, wake: Wake) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
        match wake {
            Wake::OnTime => self.last_late.store(false, Ordering::Release),
            Wake::Late { overrun } => {
                self.missed.fetch_add(1, Ordering::Relaxed);
                self.max_overrun.fetch_max(overrun, Ordering::Relaxed);
                self.last_late.store(true, Ordering::Release);
            }
        }
    }
}

/// Snapshot of a task's cycle counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CycleStats {
    /// Completed delay-until calls
    pub cycles: u32,
    /// Times the callable ran
    pub invocations: u32,
    /// Cycles whose wake-up target had already passed
    pub missed_deadlines: u32,
    /// Whether the most recent cycle was late
    pub last_cycle_late: bool,
    /// Worst lateness seen, in ticks
    pub max_overrun: Tick,
}

/// A closure run once per period on a dedicated kernel thread
///
/// Created active but idle; [`CyclicTask::start`] spawns the thread.
/// The handle is `Sync`: share it (e.g. in an `Arc`) to suspend or resume
/// from other contexts.
pub struct CyclicTask<K: Kernel> {
    config: TaskConfig,
    kernel: K,
    control: Arc<Control>,
    /// Holds the callable until the task thread takes it
    task: Arc<Mutex<Option<TaskFn>>>,
    thread: Mutex<Option<K::Thread>>,
}

impl<K: Kernel> CyclicTask<K> {
    /// Create a task, validating `config`; nothing runs until `start`
    pub fn new<F>(kernel: K, config: TaskConfig, task: F) -> Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        Self::with_boxed(kernel, config, Box::new(task))
    }

    /// Start building a task named `name` on `kernel`
    pub fn builder(kernel: K, name: &str) -> CyclicTaskBuilder<K> {
        CyclicTaskBuilder::new(kernel, name)
    }

    fn with_boxed(kernel: K, config: TaskConfig, task: TaskFn) -> Result<Self> {
        config.validate()?;
        let period = timer::period_ticks(config.period, kernel.tick_rate_hz());
        Ok(Self {
            config,
            kernel,
            control: Arc::new(Control::new(period)),
            task: Arc::new(Mutex::new(Some(task))),
            thread: Mutex::new(None),
        })
    }

    /// Spawn the task thread and enter the cycle loop
    ///
    /// If the kernel cannot spawn, the callable stays with the handle and
    /// `start` may be retried.
    pub fn start(&mut self) -> Result<()> {
        if self.thread.get_mut().is_some() {
            return Err(Error::AlreadyStarted(self.config.name.to_string()));
        }

        let control = Arc::clone(&self.control);
        let slot = Arc::clone(&self.task);
        let kernel = self.kernel.clone();
        control.running.store(true, Ordering::SeqCst);

        let spawned = self.kernel.spawn(
            &self.config.thread_spec(),
            Box::new(move || {
                run_cycles(&kernel, &control, &slot);
            }),
        );

        match spawned {
            Ok(thread) => {
                info!(
                    "task `{}` started: period {} ticks, priority {}, stack {} B",
                    self.config.name,
                    self.period_ticks(),
                    self.config.priority.0,
                    self.config.stack_size
                );
                *self.thread.get_mut() = Some(thread);
                Ok(())
            }
            Err(e) => {
                self.control.running.store(false, Ordering::SeqCst);
                error!("task `{}` failed to start: {}", self.config.name, e);
                Err(e)
            }
        }
    }

    /// Change the period used from the next wake-up computation on
    ///
    /// A sleep already in progress keeps its old target.
    pub fn set_rate(&self, period: Duration) {
        let ticks = timer::period_ticks(period, self.kernel.tick_rate_hz());
        self.control.period.store(ticks, Ordering::Release);
        debug!("task `{}` period set to {} ticks", self.config.name, ticks);
    }

    /// Stop invoking the callable; the thread keeps cycling
    ///
    /// With `wait_for_ack` this blocks until the task thread has run a cycle
    /// that observed the suspension, after which the callable will not run
    /// again until [`CyclicTask::resume`]. There is no timeout; see
    /// [`CyclicTask::suspend_timeout`]. Without `wait_for_ack` one invocation
    /// already in flight may still complete after this returns.
    pub fn suspend(&self, wait_for_ack: bool) {
        self.request_suspend();
        if wait_for_ack && self.is_running() {
            self.kernel.wait_for_ack(&self.control.ack, None);
        }
    }

    /// Like `suspend(true)` but give up after `timeout`
    ///
    /// On timeout the task stays suspended; only the confirmation is missing.
    pub fn suspend_timeout(&self, timeout: Duration) -> Result<()> {
        self.request_suspend();
        if !self.is_running() {
            return Ok(());
        }
        let limit = timer::period_ticks(timeout, self.kernel.tick_rate_hz());
        if self.kernel.wait_for_ack(&self.control.ack, Some(limit)) {
            Ok(())
        } else {
            warn!("task `{}` did not acknowledge suspend within {:?}", self.config.name, timeout);
            Err(Error::AckTimeout(self.config.name.to_string()))
        }
    }

    fn request_suspend(&self) {
        // Clear the acknowledgment before the task can observe the request
        self.control.ack.reset();
        self.control.active.store(false, Ordering::SeqCst);
        debug!("task `{}` suspend requested", self.config.name);
    }

    /// Invoke the callable again from the next cycle on
    pub fn resume(&self) {
        self.control.active.store(true, Ordering::SeqCst);
        debug!("task `{}` resumed", self.config.name);
    }

    /// Cumulative count of late wake-ups since start
    pub fn num_delays(&self) -> u32 {
        self.control.missed.load(Ordering::Relaxed)
    }

    pub fn stats(&self) -> CycleStats {
        let c = &self.control;
        CycleStats {
            cycles: c.cycles.load(Ordering::Relaxed),
            invocations: c.invocations.load(Ordering::Relaxed),
            missed_deadlines: c.missed.load(Ordering::Relaxed),
            last_cycle_late: c.last_late.load(Ordering::Acquire),
            max_overrun: c.max_overrun.load(Ordering::Relaxed),
        }
    }

    /// Whether the callable will be invoked on the next cycle
    pub fn is_active(&self) -> bool {
        self.control.active.load(Ordering::SeqCst)
    }

    /// Whether the task thread is inside its cycle loop
    pub fn is_running(&self) -> bool {
        self.control.running.load(Ordering::SeqCst)
    }

    pub fn period_ticks(&self) -> Tick {
        self.control.period.load(Ordering::Acquire)
    }

    pub fn name(&self) -> &TaskName {
        &self.config.name
    }

    pub fn priority(&self) -> TaskPriority {
        self.config.priority
    }

    /// Ask the loop to exit after its current sleep and wait for the thread
    ///
    /// Returns [`Error::TaskPanicked`] if the callable brought the thread
    /// down. Stopping a task that never started only drops its callable.
    pub fn stop(mut self) -> Result<()> {
        self.control.stop.store(true, Ordering::SeqCst);
        let Some(thread) = self.thread.get_mut().take() else {
            return Ok(());
        };
        if self.kernel.join(thread) {
            info!("task `{}` stopped after {} cycles", self.config.name, self.stats().cycles);
            Ok(())
        } else {
            error!("task `{}` panicked", self.config.name);
            Err(Error::TaskPanicked(self.config.name.to_string()))
        }
    }
}

impl<K: Kernel> Drop for CyclicTask<K> {
    fn drop(&mut self) {
        // Detach: the loop exits at its next wake-up
        self.control.stop.store(true, Ordering::SeqCst);
    }
}

/// Marks the loop finished when the task thread leaves it, unwinding or not
struct LoopExit<'a>(&'a Control);

impl Drop for LoopExit<'_> {
    fn drop(&mut self) {
        // `running` first: a suspender that still saw it set gets the ack
        self.0.running.store(false, Ordering::SeqCst);
        // The callable never runs again, so a pending suspend is satisfied
        self.0.ack.acknowledge();
    }
}

/// Cycle loop, owned by the task thread
fn run_cycles<K: Kernel>(kernel: &K, control: &Control, slot: &Mutex<Option<TaskFn>>) {
    let _exit = LoopExit(control);
    let Some(mut task) = slot.lock().take() else {
        return;
    };
    let mut last_wake = kernel.tick_count();

    while !control.stop.load(Ordering::SeqCst) {
        if control.active.load(Ordering::SeqCst) {
            task();
            control.invocations.fetch_add(1, Ordering::Relaxed);
        } else {
            control.ack.acknowledge();
        }

        let period = control.period.load(Ordering::Acquire);
        let wake = kernel.delay_until(&mut last_wake, period);
        control.record(wake);
    }
}

/// Builder for [`CyclicTask`]
///
/// Unlike [`CyclicTask::new`], the callable is optional here and its
/// absence is reported by [`CyclicTaskBuilder::build`].
pub struct CyclicTaskBuilder<K: Kernel> {
    kernel: K,
    config: TaskConfig,
    task: Option<TaskFn>,
}

impl<K: Kernel> CyclicTaskBuilder<K> {
    pub fn new(kernel: K, name: &str) -> Self {
        Self {
            kernel,
            config: TaskConfig::new(name),
            task: None,
        }
    }

    pub fn stack_size(mut self, stack_size: usize) -> Self {
        self.config.stack_size = stack_size;
        self
    }

    pub fn priority(mut self, priority: TaskPriority) -> Self {
        self.config.priority = priority;
        self
    }

    pub fn period(mut self, period: Duration) -> Self {
        self.config.period = period;
        self
    }

    pub fn task<F>(mut self, task: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        self.task = Some(Box::new(task));
        self
    }

    pub fn build(self) -> Result<CyclicTask<K>> {
        let task = self
            .task
            .ok_or_else(|| Error::MissingTask(self.config.name.to_string()))?;
        CyclicTask::with_boxed(self.kernel, self.config, task)
    }
}
