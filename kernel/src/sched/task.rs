//! Per-task scheduling state.

use alloc::string::String;

use nos_api::{Pid, TaskState, Tick};

/// One task as seen by the scheduler core. Identity and the parts of a real
/// process descriptor that are not scheduling-relevant (address space,
/// open files, signal state, ...) live in the higher-level process
/// subsystem, out of scope here.
#[derive(Debug, Clone)]
pub struct TaskDescriptor {
    pub pid: Pid,
    pub name: String,
    pub state: TaskState,

    /// Static priority used by the [`crate::sched::policy::StaticPriority`]
    /// policy. Lower numeric value wins, matching the convention of
    /// traditional Unix scheduling priorities (e.g. `nice` of 0 maps to a
    /// mid-range static priority, not to the smallest possible value).
    pub static_prio: i32,

    /// Nice value in `-20..=19`, mapped to [`Self::weight`] via the
    /// standard table in [`crate::sched::policy::nice_to_weight`]. Only
    /// consulted by the fair (CFS-like) policy.
    pub nice: i32,
    pub weight: u32,

    /// Tick at which the task was last dispatched.
    pub exec_start: Tick,
    /// Duration of the just-finished slice, updated by
    /// [`crate::sched::policy::update_outgoing`].
    pub exec_runtime: u64,
    pub sum_exec_runtime: u64,
    /// Weighted accumulated runtime; the fair policy's selection key.
    pub vruntime: u64,

    pub is_periodic: bool,
    /// A periodic task not yet characterised for worst-case execution time;
    /// scheduled as if aperiodic so its runtime can be observed.
    pub is_under_analysis: bool,
    pub period: Tick,
    pub deadline: Tick,
    pub next_period: Tick,
    pub worst_case_execution_time: Tick,
    /// Set once the task has run in its current period; cleared by period
    /// rollover in the edf/rm policies.
    pub executed: bool,
}

impl TaskDescriptor {
    /// A plain aperiodic task at the given static priority and nice value.
    pub fn new(pid: Pid, name: impl Into<String>, static_prio: i32, nice: i32) -> Self {
        Self {
            pid,
            name: name.into(),
            state: TaskState::New,
            static_prio,
            nice,
            weight: crate::sched::policy::nice_to_weight(nice),
            exec_start: 0,
            exec_runtime: 0,
            sum_exec_runtime: 0,
            vruntime: 0,
            is_periodic: false,
            is_under_analysis: false,
            period: 0,
            deadline: 0,
            next_period: 0,
            worst_case_execution_time: 0,
            executed: false,
        }
    }

    /// A periodic (real-time) task with the given period. `deadline` and
    /// `next_period` are both initialised to `period`, the first
    /// activation boundary.
    pub fn new_periodic(
        pid: Pid,
        name: impl Into<String>,
        static_prio: i32,
        period: Tick,
        worst_case_execution_time: Tick,
    ) -> Self {
        let mut t = Self::new(pid, name, static_prio, 0);
        t.is_periodic = true;
        t.is_under_analysis = true;
        t.period = period;
        t.deadline = period;
        t.next_period = period;
        t.worst_case_execution_time = worst_case_execution_time;
        t
    }

    /// Whether this task is scheduled under periodic policies right now.
    /// A periodic task still under worst-case-execution-time analysis is
    /// treated as aperiodic.
    pub fn is_periodic_task(&self) -> bool {
        self.is_periodic && !self.is_under_analysis
    }
}
