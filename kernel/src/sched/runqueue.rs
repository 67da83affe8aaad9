//! The runqueue: every known task plus a pointer to the one currently
//! running, scanned linearly by whichever [`SchedulingPolicy`] is active.

use alloc::boxed::Box;
use alloc::vec::Vec;

use nos_api::{Pid, Result, TaskState, Tick};

use super::policy::{DeadlineMissPolicy, SchedulingPolicy};
use super::task::TaskDescriptor;

/// The set of runnable (and blocked, and zombie) tasks known to the
/// scheduler, in insertion order, plus the index of the currently running
/// one.
pub struct Runqueue {
    tasks: Vec<TaskDescriptor>,
    curr: usize,
    policy: Box<dyn SchedulingPolicy>,
    on_deadline_miss: DeadlineMissPolicy,
    tick: Tick,
}

impl Runqueue {
    /// An empty runqueue using `policy`. At least one task (typically an
    /// always-runnable idle task) must be pushed before [`Self::pick_next`]
    /// is called.
    pub fn new(policy: Box<dyn SchedulingPolicy>) -> Self {
        Self {
            tasks: Vec::new(),
            curr: 0,
            policy,
            on_deadline_miss: DeadlineMissPolicy::default(),
            tick: 0,
        }
    }

    /// Overrides the default "log and continue" deadline-miss behaviour.
    pub fn set_deadline_miss_policy(&mut self, policy: DeadlineMissPolicy) {
        self.on_deadline_miss = policy;
    }

    /// Appends a task, returning its index in the runqueue.
    pub fn push(&mut self, task: TaskDescriptor) -> usize {
        self.tasks.push(task);
        self.tasks.len() - 1
    }

    pub fn get(&self, idx: usize) -> Option<&TaskDescriptor> {
        self.tasks.get(idx)
    }

    pub fn get_mut(&mut self, idx: usize) -> Option<&mut TaskDescriptor> {
        self.tasks.get_mut(idx)
    }

    pub fn find_by_pid(&self, pid: Pid) -> Option<usize> {
        self.tasks.iter().position(|t| t.pid == pid)
    }

    /// Index of the currently running task.
    pub fn curr(&self) -> usize {
        self.curr
    }

    pub fn current(&self) -> &TaskDescriptor {
        &self.tasks[self.curr]
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn runnable_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.state == TaskState::Running).count()
    }

    pub fn blocked_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.state == TaskState::Blocked).count()
    }

    /// Advances the platform tick used by [`nos_api::Scheduler::schedule_next`].
    /// The richer [`Self::pick_next`] entry point takes `now` explicitly
    /// instead and does not require this.
    pub fn advance_tick(&mut self, now: Tick) {
        self.tick = now;
    }

    /// Updates the outgoing task's accounting, runs the active policy, and
    /// records the selected task's dispatch tick. Panics if there is no
    /// eligible task at all — a correctly configured runqueue always has
    /// an idle task that is eligible, so this indicates a fatal
    /// misconfiguration rather than a recoverable condition.
    pub fn pick_next(&mut self, now: Tick) -> Pid {
        assert!(!self.tasks.is_empty(), "pick_next called on an empty runqueue");

        super::policy::update_outgoing(&mut self.tasks[self.curr], now);

        let next = self
            .policy
            .select(&mut self.tasks, self.curr, now, self.on_deadline_miss);
        assert!(
            self.tasks[next].state == TaskState::Running,
            "scheduling policy '{}' returned a non-running task",
            self.policy.name()
        );

        self.tasks[next].exec_start = now;
        self.curr = next;
        self.tick = now;
        self.tasks[next].pid
    }
}

impl nos_api::Scheduler for Runqueue {
    fn schedule_next(&mut self) -> Option<Pid> {
        if self.tasks.is_empty() {
            return None;
        }
        Some(self.pick_next(self.tick))
    }

    fn add_process(&mut self, pid: Pid, priority: u32) -> Result<()> {
        let mut t = TaskDescriptor::new(pid, "", priority as i32, 0);
        t.state = TaskState::Running;
        self.push(t);
        Ok(())
    }

    fn remove_process(&mut self, pid: Pid) -> Result<()> {
        let idx = self.find_by_pid(pid).ok_or(nos_api::Error::InvalidArgument)?;
        self.tasks.remove(idx);
        // Every task after `idx` just shifted down one slot, so `curr` must
        // shift with it whenever the removed task sat strictly before it.
        if idx < self.curr {
            self.curr -= 1;
        } else if self.curr >= self.tasks.len() && !self.tasks.is_empty() {
            self.curr = self.tasks.len() - 1;
        }
        Ok(())
    }

    fn set_priority(&mut self, pid: Pid, priority: u32) -> Result<()> {
        let idx = self.find_by_pid(pid).ok_or(nos_api::Error::InvalidArgument)?;
        self.tasks[idx].static_prio = priority as i32;
        Ok(())
    }

    fn get_priority(&self, pid: Pid) -> Option<u32> {
        self.find_by_pid(pid).map(|idx| self.tasks[idx].static_prio as u32)
    }

    fn yield_process(&mut self) -> Result<()> {
        self.pick_next(self.tick);
        Ok(())
    }

    fn block_process(&mut self, pid: Pid) -> Result<()> {
        let idx = self.find_by_pid(pid).ok_or(nos_api::Error::InvalidArgument)?;
        self.tasks[idx].state = TaskState::Blocked;
        Ok(())
    }

    fn unblock_process(&mut self, pid: Pid) -> Result<()> {
        let idx = self.find_by_pid(pid).ok_or(nos_api::Error::InvalidArgument)?;
        self.tasks[idx].state = TaskState::Running;
        Ok(())
    }

    fn scheduling_policy(&self) -> nos_api::SchedulingPolicyKind {
        use nos_api::SchedulingPolicyKind::*;
        match self.policy.name() {
            "round-robin" => RoundRobin,
            "static-priority" => StaticPriority,
            "fair" => Fair,
            "aedf" => EarliestAbsoluteDeadlineFirst,
            "edf" => EarliestDeadlineFirst,
            "rm" => RateMonotonic,
            other => unreachable!("unknown policy name '{other}'"),
        }
    }

    fn set_scheduling_policy(&mut self, policy: nos_api::SchedulingPolicyKind) -> Result<()> {
        self.policy = super::make_policy(policy);
        Ok(())
    }

    fn runnable_count(&self) -> usize {
        Runqueue::runnable_count(self)
    }

    fn blocked_count(&self) -> usize {
        Runqueue::blocked_count(self)
    }
}
