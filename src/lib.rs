//! cyclic-task — periodic tasks on top of a real-time kernel
//!
//! Turn a closure into a task that runs once per fixed period:
//! - Drift-free: each wake-up is `previous target + period` (delay-until)
//! - Suspend/resume with an acknowledgment handshake
//! - Missed-deadline accounting
//! - Kernel injected as a trait: RTOS binding, host threads, or virtual time
//!
//! ```no_run
//! use std::time::Duration;
//! use cyclic_task::{CyclicTask, StdKernel, TaskPriority};
//!
//! let mut task = CyclicTask::builder(StdKernel::default(), "blink")
//!     .priority(TaskPriority::LOW)
//!     .period(Duration::from_millis(500))
//!     .task(|| { /* toggle LED */ })
//!     .build()?;
//! task.start()?;
//! task.suspend(true);
//! task.resume();
//! task.stop()?;
//! # Ok::<(), cyclic_task::Error>(())
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod error;
pub mod task;
pub mod timer;
pub mod handshake;
pub mod kernel;
pub mod cyclic;
#[cfg(feature = "std")]
pub mod std_kernel;
#[cfg(feature = "std")]
pub mod sim;

pub use error::{Error, Result};
pub use task::{TaskConfig, TaskName, TaskPriority, ThreadSpec};
pub use timer::{Tick, Wake};
pub use handshake::Handshake;
pub use kernel::Kernel;
pub use cyclic::{CycleStats, CyclicTask, CyclicTaskBuilder, TaskFn};
#[cfg(feature = "std")]
pub use std_kernel::StdKernel;
#[cfg(feature = "std")]
pub use sim::SimKernel;
