//! Scheduler interface

use crate::core::types::{Pid, SchedulingPolicyKind};
use crate::error::Result;

/// Trait for a pluggable process scheduler.
///
/// `schedule_next` is the abstract contract; the concrete dispatcher in the
/// `kernel` crate calls it `pick_next` and additionally takes the current
/// tick, since several policies (fair, earliest-deadline-first variants)
/// need "now" to update accounting and evaluate deadlines.
pub trait Scheduler {
    /// Picks the next task to run, updating the outgoing task's accounting.
    /// Returns `None` only if there is no eligible task at all, which a
    /// correctly configured system never observes (the idle task is always
    /// eligible).
    fn schedule_next(&mut self) -> Option<Pid>;

    /// Registers a task with the scheduler at the given static priority.
    fn add_process(&mut self, pid: Pid, priority: u32) -> Result<()>;

    /// Removes a task from the scheduler.
    fn remove_process(&mut self, pid: Pid) -> Result<()>;

    /// Changes a task's static priority.
    fn set_priority(&mut self, pid: Pid, priority: u32) -> Result<()>;

    /// Reads a task's static priority.
    fn get_priority(&self, pid: Pid) -> Option<u32>;

    /// Voluntarily yields the currently running task.
    fn yield_process(&mut self) -> Result<()>;

    /// Marks a task blocked, removing it from scheduling consideration.
    fn block_process(&mut self, pid: Pid) -> Result<()>;

    /// Marks a previously blocked task runnable again.
    fn unblock_process(&mut self, pid: Pid) -> Result<()>;

    /// Returns the active scheduling policy.
    fn scheduling_policy(&self) -> SchedulingPolicyKind;

    /// Switches the active scheduling policy.
    fn set_scheduling_policy(&mut self, policy: SchedulingPolicyKind) -> Result<()>;

    /// Number of tasks currently eligible for selection.
    fn runnable_count(&self) -> usize;

    /// Number of tasks currently blocked.
    fn blocked_count(&self) -> usize;
}
