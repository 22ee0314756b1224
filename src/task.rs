//! Task definition — thread attributes of a cyclic task
//!
//! Name, stack budget, priority and cycle period, validated before the
//! kernel ever sees them.

use core::fmt;
use core::time::Duration;

use crate::error::{Error, Result};

/// Longest task name kept (longer names are truncated)
pub const MAX_NAME_LEN: usize = 16;

/// Smallest stack budget accepted, in bytes
pub const MIN_STACK_SIZE: usize = 512;

/// Stack budget used when none is given, in bytes
pub const DEFAULT_STACK_SIZE: usize = 16 * 1024;

/// Cycle period used when none is given
pub const DEFAULT_PERIOD: Duration = Duration::from_millis(1);

/// Task priority (lower number = higher priority)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskPriority(pub u8);

impl TaskPriority {
    /// Hard real-time loops (motor control, audio)
    pub const CRITICAL: TaskPriority = TaskPriority(0);
    /// Control and estimation
    pub const HIGH: TaskPriority = TaskPriority(1);
    /// Sensor processing
    pub const NORMAL: TaskPriority = TaskPriority(2);
    /// Logging, telemetry
    pub const LOW: TaskPriority = TaskPriority(3);
    /// Background (non-real-time)
    pub const IDLE: TaskPriority = TaskPriority(255);
}

impl Default for TaskPriority {
    fn default() -> Self {
        TaskPriority::NORMAL
    }
}

/// Fixed-capacity task name, no heap
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct TaskName {
    bytes: [u8; MAX_NAME_LEN],
    len: u8,
}

impl TaskName {
    /// Build a name, truncating on a char boundary at `MAX_NAME_LEN` bytes
    pub fn new(name: &str) -> Self {
        let mut len = name.len().min(MAX_NAME_LEN);
        while !name.is_char_boundary(len) {
            len -= 1;
        }
        let mut bytes = [0u8; MAX_NAME_LEN];
        bytes[..len].copy_from_slice(&name.as_bytes()[..len]);
        Self { bytes, len: len as u8 }
    }

    pub fn as_str(&self) -> &str {
        // Only ever filled from a &str cut on a char boundary
        core::str::from_utf8(&self.bytes[..self.len as usize]).unwrap_or("")
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl fmt::Debug for TaskName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

impl fmt::Display for TaskName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the kernel needs to create the task's thread
#[derive(Debug, Clone, Copy)]
pub struct ThreadSpec {
    pub name: TaskName,
    pub stack_size: usize,
    pub priority: TaskPriority,
}

/// Static configuration of a cyclic task
#[derive(Debug, Clone, Copy)]
pub struct TaskConfig {
    /// Thread name
    pub name: TaskName,
    /// Stack budget in bytes
    pub stack_size: usize,
    /// Scheduling priority
    pub priority: TaskPriority,
    /// Cycle period (converted to ticks at build time)
    pub period: Duration,
}

impl TaskConfig {
    /// Defaults: `DEFAULT_STACK_SIZE`, `TaskPriority::NORMAL`, `DEFAULT_PERIOD`
    pub fn new(name: &str) -> Self {
        Self {
            name: TaskName::new(name),
            stack_size: DEFAULT_STACK_SIZE,
            priority: TaskPriority::default(),
            period: DEFAULT_PERIOD,
        }
    }

    pub fn with_stack_size(mut self, stack_size: usize) -> Self {
        self.stack_size = stack_size;
        self
    }

    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Reject configurations no kernel could run
    ///
    /// The period is not checked: zero and sub-tick periods clamp to one tick.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::EmptyName);
        }
        if self.stack_size < MIN_STACK_SIZE {
            return Err(Error::StackTooSmall {
                requested: self.stack_size,
                minimum: MIN_STACK_SIZE,
            });
        }
        Ok(())
    }

    pub fn thread_spec(&self) -> ThreadSpec {
        ThreadSpec {
            name: self.name,
            stack_size: self.stack_size,
            priority: self.priority,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = TaskConfig::new("imu");
        assert_eq!(config.name.as_str(), "imu");
        assert_eq!(config.stack_size, DEFAULT_STACK_SIZE);
        assert_eq!(config.priority, TaskPriority::NORMAL);
        assert_eq!(config.period, Duration::from_millis(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_name_truncated() {
        let name = TaskName::new("a_very_long_task_name_indeed");
        assert_eq!(name.as_str(), "a_very_long_task");
    }

    #[test]
    fn test_name_truncated_on_char_boundary() {
        // 15 ASCII bytes + a 2-byte char straddling the limit
        let name = TaskName::new("abcdefghijklmnoé");
        assert_eq!(name.as_str(), "abcdefghijklmno");
    }

    #[test]
    fn test_empty_name_rejected() {
        let config = TaskConfig::new("");
        assert!(matches!(config.validate(), Err(Error::EmptyName)));
    }

    #[test]
    fn test_small_stack_rejected() {
        let config = TaskConfig::new("tiny").with_stack_size(64);
        assert!(matches!(
            config.validate(),
            Err(Error::StackTooSmall { requested: 64, minimum: MIN_STACK_SIZE })
        ));
    }

    #[test]
    fn test_zero_period_is_valid() {
        let config = TaskConfig::new("fast").with_period(Duration::ZERO);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_priority_ordering() {
        assert!(TaskPriority::CRITICAL < TaskPriority::HIGH);
        assert!(TaskPriority::HIGH < TaskPriority::NORMAL);
        assert!(TaskPriority::NORMAL < TaskPriority::LOW);
    }

    #[test]
    fn test_thread_spec() {
        let spec = TaskConfig::new("ctrl")
            .with_stack_size(8192)
            .with_priority(TaskPriority::HIGH)
            .thread_spec();
        assert_eq!(spec.name.as_str(), "ctrl");
        assert_eq!(spec.stack_size, 8192);
        assert_eq!(spec.priority, TaskPriority::HIGH);
    }
}
