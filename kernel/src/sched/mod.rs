//! Process scheduler core.
//!
//! A [`Runqueue`] holds every known task in a single ordered sequence plus
//! a `curr` pointer; a [`policy::SchedulingPolicy`] trait object, chosen
//! once when the runqueue is constructed, decides who runs next. This
//! replaces the original build-time `cfg`-symbol policy switch with a
//! single runtime-selectable interface, per the redesign called for where
//! this core's scheduler diverges from its teacher: six variants
//! implementing one trait, selected at construction, rather than branching
//! on a compile-time flag at every tick.

pub mod locked;
pub mod policy;
pub mod runqueue;
pub mod task;

use alloc::boxed::Box;

use nos_api::{Pid, SchedulingPolicyKind, Tick};

pub use locked::LockedRunqueue;
pub use policy::{
    nice_to_weight, Aedf, DeadlineMissPolicy, Edf, Fair, RateMonotonic, RoundRobin,
    SchedulingPolicy, StaticPriority, NICE_0_WEIGHT,
};
pub use runqueue::Runqueue;
pub use task::TaskDescriptor;

/// A monotonic source of the current tick, supplied by the platform layer.
/// The scheduler core never reads a clock itself; every entry point that
/// needs "now" takes it as an argument or, via this trait, a pluggable
/// source.
pub trait TickSource {
    fn now(&self) -> Tick;
}

/// Builds the trait object for a given policy kind. Used both by
/// [`Runqueue::new`] callers and by
/// [`nos_api::Scheduler::set_scheduling_policy`].
pub fn make_policy(kind: SchedulingPolicyKind) -> Box<dyn SchedulingPolicy> {
    match kind {
        SchedulingPolicyKind::RoundRobin => Box::new(RoundRobin { skip_periodic: false }),
        SchedulingPolicyKind::StaticPriority => Box::new(StaticPriority),
        SchedulingPolicyKind::Fair => Box::new(Fair),
        SchedulingPolicyKind::EarliestAbsoluteDeadlineFirst => Box::new(Aedf),
        SchedulingPolicyKind::EarliestDeadlineFirst => Box::new(Edf),
        SchedulingPolicyKind::RateMonotonic => Box::new(RateMonotonic),
    }
}

/// Free-function mirror of the external interface named in the
/// specification: `pick_next(runqueue) -> task`. The tick is threaded
/// through explicitly since the scheduler core has no clock of its own.
pub fn pick_next(runqueue: &mut Runqueue, now: Tick) -> Pid {
    runqueue.pick_next(now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nos_api::TaskState;

    fn push_simple(rq: &mut Runqueue, pid: Pid, name: &str, prio: i32) -> usize {
        let mut t = TaskDescriptor::new(pid, name, prio, 0);
        t.state = TaskState::Running;
        rq.push(t)
    }

    #[test]
    fn round_robin_rotation() {
        let mut rq = Runqueue::new(make_policy(SchedulingPolicyKind::RoundRobin));
        push_simple(&mut rq, 1, "a", 120);
        push_simple(&mut rq, 2, "b", 120);
        push_simple(&mut rq, 3, "c", 120);

        assert_eq!(pick_next(&mut rq, 1), 2);
        assert_eq!(pick_next(&mut rq, 2), 3);
        assert_eq!(pick_next(&mut rq, 3), 1);
    }

    #[test]
    fn round_robin_liveness_no_starvation() {
        let mut rq = Runqueue::new(make_policy(SchedulingPolicyKind::RoundRobin));
        for pid in 0..5 {
            push_simple(&mut rq, pid, "t", 120);
        }
        let n = rq.len();
        let mut seen = alloc::collections::BTreeSet::new();
        let mut now = 0;
        for _ in 0..n {
            now += 1;
            seen.insert(pick_next(&mut rq, now));
        }
        assert_eq!(seen.len(), n);
    }

    #[test]
    fn static_priority_selects_min_with_stable_tiebreak() {
        let mut rq = Runqueue::new(make_policy(SchedulingPolicyKind::StaticPriority));
        push_simple(&mut rq, 1, "init", 120);
        push_simple(&mut rq, 2, "shell", 120);
        push_simple(&mut rq, 3, "echo", 122);
        push_simple(&mut rq, 4, "ps", 128);

        assert_eq!(pick_next(&mut rq, 1), 1);
    }

    #[test]
    fn fair_policy_balances_equal_weight_tasks() {
        let mut rq = Runqueue::new(make_policy(SchedulingPolicyKind::Fair));
        push_simple(&mut rq, 1, "a", 120);
        push_simple(&mut rq, 2, "b", 120);

        let mut now = 0u64;
        for _ in 0..20 {
            now += 1;
            pick_next(&mut rq, now);
        }

        let a = rq.get(0).unwrap().sum_exec_runtime;
        let b = rq.get(1).unwrap().sum_exec_runtime;
        let diff = if a > b { a - b } else { b - a };
        assert!(diff <= 1);
    }

    #[test]
    fn edf_rolls_over_period_and_selects() {
        let mut rq = Runqueue::new(make_policy(SchedulingPolicyKind::EarliestDeadlineFirst));
        let mut t = TaskDescriptor::new_periodic(1, "rt", 90, 100, 10);
        t.state = TaskState::Running;
        t.is_under_analysis = false;
        t.executed = true;
        t.deadline = 100;
        t.next_period = 100;
        rq.push(t);
        // idle fallback task so round-robin never panics on an empty set.
        push_simple(&mut rq, 2, "idle", 200);

        let chosen = pick_next(&mut rq, 100);
        assert_eq!(chosen, 1);
        let task = rq.get(0).unwrap();
        assert_eq!(task.deadline, 200);
        assert_eq!(task.next_period, 200);
        assert!(task.executed);
    }

    #[test]
    fn remove_process_before_curr_keeps_curr_on_the_same_task() {
        use nos_api::Scheduler as SchedulerTrait;

        let mut rq = Runqueue::new(make_policy(SchedulingPolicyKind::RoundRobin));
        push_simple(&mut rq, 1, "a", 120); // idx 0
        push_simple(&mut rq, 2, "b", 120); // idx 1
        push_simple(&mut rq, 3, "c", 120); // idx 2, running
        push_simple(&mut rq, 4, "d", 120); // idx 3

        rq.pick_next(1); // advances curr to 1 (b)
        rq.pick_next(2); // advances curr to 2 (c)
        assert_eq!(rq.current().pid, 3);

        SchedulerTrait::remove_process(&mut rq, 2).unwrap(); // remove b, idx 1
        assert_eq!(rq.current().pid, 3, "curr must still point at c, not d");
    }

    #[test]
    fn deadline_miss_logs_and_continues_by_default() {
        let mut rq = Runqueue::new(make_policy(SchedulingPolicyKind::EarliestAbsoluteDeadlineFirst));
        let mut t = TaskDescriptor::new_periodic(1, "rt", 90, 50, 5);
        t.state = TaskState::Running;
        t.is_under_analysis = false;
        t.deadline = 10; // already in the past at now=100
        rq.push(t);
        push_simple(&mut rq, 2, "idle", 200);

        // Must not panic, and must still select the overdue task (the
        // default policy keeps scheduling it rather than starving it).
        assert_eq!(pick_next(&mut rq, 100), 1);
    }
}
