//! Property tests for the scheduler core.

use kernel::sched::{make_policy, pick_next, Runqueue, TaskDescriptor};
use nos_api::{SchedulingPolicyKind, TaskState};
use proptest::prelude::*;

fn build_runqueue(n: usize, policy: SchedulingPolicyKind) -> Runqueue {
    let mut rq = Runqueue::new(make_policy(policy));
    for pid in 0..n as u32 {
        let mut t = TaskDescriptor::new(pid, "t", 120, 0);
        t.state = TaskState::Running;
        rq.push(t);
    }
    rq
}

proptest! {
    /// Under round-robin, no runnable task waits more than `n - 1`
    /// consecutive selections before being picked again.
    #[test]
    fn round_robin_bounded_wait(n in 2usize..16, ticks in 2u64..200) {
        let mut rq = build_runqueue(n, SchedulingPolicyKind::RoundRobin);
        let mut last_seen = vec![0u64; n];
        let mut now = 0u64;
        for _ in 0..ticks {
            now += 1;
            let pid = pick_next(&mut rq, now) as usize;
            prop_assert!(now - last_seen[pid] <= n as u64);
            last_seen[pid] = now;
        }
    }

    /// Under static priority, the chosen task's priority is always the
    /// minimum among runnable tasks.
    #[test]
    fn static_priority_always_picks_minimum(prios in prop::collection::vec(0i32..200, 2..12)) {
        let mut rq = Runqueue::new(make_policy(SchedulingPolicyKind::StaticPriority));
        for (i, p) in prios.iter().enumerate() {
            let mut t = TaskDescriptor::new(i as u32, "t", *p, 0);
            t.state = TaskState::Running;
            rq.push(t);
        }
        let min = *prios.iter().min().unwrap();
        let chosen = pick_next(&mut rq, 1) as usize;
        prop_assert_eq!(prios[chosen], min);
    }
}

#[test]
fn edf_never_serves_a_task_whose_rolled_over_deadline_is_in_the_past() {
    let mut rq = Runqueue::new(make_policy(SchedulingPolicyKind::EarliestDeadlineFirst));
    let mut a = TaskDescriptor::new_periodic(1, "a", 80, 10, 2);
    a.state = TaskState::Running;
    a.is_under_analysis = false;
    rq.push(a);
    let mut b = TaskDescriptor::new_periodic(2, "b", 80, 30, 5);
    b.state = TaskState::Running;
    b.is_under_analysis = false;
    rq.push(b);

    let mut now = 0u64;
    for _ in 0..100 {
        now += 1;
        let pid = pick_next(&mut rq, now);
        let idx = rq.find_by_pid(pid).unwrap();
        let task = rq.get(idx).unwrap();
        assert!(task.deadline >= now);
    }
}
