//! Core types shared by the page allocator and the scheduler

/// Process identifier type
pub type Pid = u32;

/// Page number / page index type
pub type PageNum = usize;

/// Size in bytes
pub type Size = usize;

/// Monotonic tick count, as produced by the platform timer
pub type Tick = u64;

/// Result type for operations that can fail
pub type Result<T> = core::result::Result<T, crate::error::Error>;

/// Coarse kernel error code, used where a full [`crate::error::Error`]
/// would carry no extra information.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelError {
    /// Invalid argument (order out of range, zero count, misaligned region).
    InvalidArgument,
    /// No resource of the requested size is available.
    OutOfMemory,
    /// An invariant was violated (double free, corrupted descriptor).
    Corruption,
    /// Requested item was not found.
    NotFound,
}

impl core::fmt::Display for KernelError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            KernelError::InvalidArgument => write!(f, "invalid argument"),
            KernelError::OutOfMemory => write!(f, "out of memory"),
            KernelError::Corruption => write!(f, "invariant violation"),
            KernelError::NotFound => write!(f, "not found"),
        }
    }
}

/// Coarse state of a schedulable task.
///
/// The scheduler core only ever reads this field to filter candidates; it
/// never writes it itself (state transitions are driven by the higher-level
/// process subsystem).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Newly created, not yet run.
    New,
    /// Eligible for selection by the scheduler.
    Running,
    /// Waiting on an event; not eligible for selection.
    Blocked,
    /// Exited but not yet reaped.
    Zombie,
}

/// The scheduling algorithm a [`crate::process::interface::Scheduler`] is
/// configured with. Selected once at construction time rather than branched
/// on per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulingPolicyKind {
    /// Cooperative rotation among all eligible tasks.
    RoundRobin,
    /// Numerically-smallest static priority wins, stable tie-break.
    StaticPriority,
    /// Weighted-fair scheduling keyed on virtual runtime.
    Fair,
    /// Earliest absolute deadline first (no period rollover).
    EarliestAbsoluteDeadlineFirst,
    /// Earliest deadline first, with period rollover.
    EarliestDeadlineFirst,
    /// Rate-monotonic: smallest next-activation period wins.
    RateMonotonic,
}
