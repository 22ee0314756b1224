//! Error type — configuration and lifecycle failures
//!
//! Deadline misses are not errors; they are counted in [`crate::CycleStats`].

use alloc::string::String;

/// Errors raised while configuring, starting or stopping a cyclic task
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Builder finished without a callable
    #[error("task `{0}` has no callable")]
    MissingTask(String),

    /// Empty task name
    #[error("task name must not be empty")]
    EmptyName,

    /// Stack budget below what the kernel can run a thread with
    #[error("stack size {requested} is below the minimum of {minimum} bytes")]
    StackTooSmall { requested: usize, minimum: usize },

    /// `start` called on a task whose thread already exists
    #[error("task `{0}` already started")]
    AlreadyStarted(String),

    /// Kernel refused to create the thread
    #[error("failed to spawn thread for task `{0}`")]
    Spawn(String),

    /// Task thread died from a fault raised by its callable
    #[error("task `{0}` panicked")]
    TaskPanicked(String),

    /// Bounded suspend gave up before the task acknowledged
    #[error("task `{0}` did not acknowledge suspend in time")]
    AckTimeout(String),
}

/// Crate result alias
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_display_names_task() {
        let err = Error::AckTimeout("imu".into());
        assert_eq!(err.to_string(), "task `imu` did not acknowledge suspend in time");
    }

    #[test]
    fn test_stack_message() {
        let err = Error::StackTooSmall { requested: 16, minimum: 512 };
        assert_eq!(err.to_string(), "stack size 16 is below the minimum of 512 bytes");
    }
}
