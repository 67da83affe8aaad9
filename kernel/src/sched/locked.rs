//! Lock-guarded runqueue.
//!
//! The concurrency model requires the runqueue to be protected by exactly
//! one [`MutexIrq`]; [`LockedRunqueue`] is that wrapper, used in place of a
//! bare [`Runqueue`] anywhere more than one context (process and interrupt)
//! can touch it.

use alloc::boxed::Box;

use nos_api::{Pid, Result, Scheduler as SchedulerTrait, SchedulingPolicyKind, Tick};

use crate::sync::MutexIrq;

use super::policy::{DeadlineMissPolicy, SchedulingPolicy};
use super::runqueue::Runqueue;
use super::task::TaskDescriptor;

/// The runqueue, held behind the kernel's single scheduler lock. Every
/// mutating entry point takes the lock for the duration of the call and
/// releases it when the returned guard drops, including on an early
/// return.
pub struct LockedRunqueue {
    inner: MutexIrq<Runqueue>,
}

impl LockedRunqueue {
    pub fn new(policy: Box<dyn SchedulingPolicy>) -> Self {
        Self { inner: MutexIrq::new(Runqueue::new(policy)) }
    }

    pub fn set_deadline_miss_policy(&self, policy: DeadlineMissPolicy) {
        self.inner.lock().set_deadline_miss_policy(policy);
    }

    pub fn push(&self, task: TaskDescriptor) -> usize {
        self.inner.lock().push(task)
    }

    pub fn pick_next(&self, now: Tick) -> Pid {
        self.inner.lock().pick_next(now)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

impl SchedulerTrait for LockedRunqueue {
    fn schedule_next(&mut self) -> Option<Pid> {
        self.inner.lock().schedule_next()
    }

    fn add_process(&mut self, pid: Pid, priority: u32) -> Result<()> {
        self.inner.lock().add_process(pid, priority)
    }

    fn remove_process(&mut self, pid: Pid) -> Result<()> {
        self.inner
            .lock()
            .remove_process(pid)
            .map_err(|e| crate::error::report("runqueue remove_process", e))
    }

    fn set_priority(&mut self, pid: Pid, priority: u32) -> Result<()> {
        self.inner
            .lock()
            .set_priority(pid, priority)
            .map_err(|e| crate::error::report("runqueue set_priority", e))
    }

    fn get_priority(&self, pid: Pid) -> Option<u32> {
        self.inner.lock().get_priority(pid)
    }

    fn yield_process(&mut self) -> Result<()> {
        self.inner.lock().yield_process()
    }

    fn block_process(&mut self, pid: Pid) -> Result<()> {
        self.inner
            .lock()
            .block_process(pid)
            .map_err(|e| crate::error::report("runqueue block_process", e))
    }

    fn unblock_process(&mut self, pid: Pid) -> Result<()> {
        self.inner
            .lock()
            .unblock_process(pid)
            .map_err(|e| crate::error::report("runqueue unblock_process", e))
    }

    fn scheduling_policy(&self) -> SchedulingPolicyKind {
        self.inner.lock().scheduling_policy()
    }

    fn set_scheduling_policy(&mut self, policy: SchedulingPolicyKind) -> Result<()> {
        self.inner.lock().set_scheduling_policy(policy)
    }

    fn runnable_count(&self) -> usize {
        self.inner.lock().runnable_count()
    }

    fn blocked_count(&self) -> usize {
        self.inner.lock().blocked_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sched::make_policy;
    use nos_api::TaskState;

    fn push_running(rq: &LockedRunqueue, pid: Pid) {
        let mut t = TaskDescriptor::new(pid, "t", 120, 0);
        t.state = TaskState::Running;
        rq.push(t);
    }

    #[test]
    fn locked_runqueue_releases_after_pick_next() {
        let rq = LockedRunqueue::new(make_policy(SchedulingPolicyKind::RoundRobin));
        push_running(&rq, 1);
        push_running(&rq, 2);

        rq.pick_next(1);
        assert!(!rq.inner.is_locked());
    }

    #[test]
    fn remove_process_on_unknown_pid_is_reported() {
        let mut rq = LockedRunqueue::new(make_policy(SchedulingPolicyKind::RoundRobin));
        push_running(&rq, 1);
        assert!(SchedulerTrait::remove_process(&mut rq, 99).is_err());
        assert!(!rq.inner.is_locked());
    }
}
