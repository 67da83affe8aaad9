//! Scheduling policies.
//!
//! Each policy is a small stateless struct implementing
//! [`SchedulingPolicy::select`]; a [`crate::sched::runqueue::Runqueue`]
//! owns exactly one, chosen at construction time (see the module-level
//! docs in `sched/mod.rs` for why this replaces build-time `cfg` selection).

use nos_api::Tick;

use super::task::TaskDescriptor;

/// Reference weight for nice value 0, matching the Linux scheduler's
/// convention so the nice-to-weight table below is directly comparable to
/// a real kernel's.
pub const NICE_0_WEIGHT: u32 = 1024;

/// The standard nice-to-weight table (nice -20..=19). Each step is roughly
/// a 10% change in CPU share. Values beyond this table are clamped to the
/// endpoints.
const NICE_TO_WEIGHT: [u32; 40] = [
    /* -20 */ 88761, 71755, 56483, 46273, 36291, 29154, 23254, 18705, 14949, 11916,
    /* -10 */ 9548, 7620, 6100, 4904, 3906, 3121, 2501, 1991, 1586, 1277,
    /*   0 */ 1024, 820, 655, 526, 423, 335, 272, 215, 172, 137,
    /*  10 */ 110, 87, 70, 56, 45, 36, 29, 23, 18, 15,
];

static_assertions::const_assert_eq!(NICE_TO_WEIGHT.len(), 40);
static_assertions::const_assert_eq!(NICE_TO_WEIGHT[20], NICE_0_WEIGHT);

/// Maps a nice value to its scheduling weight.
pub fn nice_to_weight(nice: i32) -> u32 {
    let clamped = nice.clamp(-20, 19);
    NICE_TO_WEIGHT[(clamped + 20) as usize]
}

/// What to do when a periodic task's deadline has already passed at
/// selection time. The default is to log and keep scheduling the task
/// normally; `LogAndSkip` additionally excludes it from this round's
/// selection (it is retried next tick).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadlineMissPolicy {
    LogAndContinue,
    LogAndSkip,
}

impl Default for DeadlineMissPolicy {
    fn default() -> Self {
        DeadlineMissPolicy::LogAndContinue
    }
}

/// Updates the outgoing task's accounting. Called once per [`super::runqueue::Runqueue::pick_next`]
/// regardless of which policy is active.
pub fn update_outgoing(task: &mut TaskDescriptor, now: Tick) {
    task.exec_runtime = now.saturating_sub(task.exec_start);
    task.sum_exec_runtime = task.sum_exec_runtime.saturating_add(task.exec_runtime);
    if !task.is_periodic_task() {
        task.vruntime = task
            .vruntime
            .saturating_add(scale_runtime(task.exec_runtime, task.weight));
    }
}

/// Scales `runtime` by `NICE_0_WEIGHT / weight` in 32.32 fixed point,
/// rounding up. A plain `runtime * NICE_0_WEIGHT / weight` in integer
/// arithmetic would truncate a high-weight (very negative nice) task's
/// vruntime delta to zero over a short slice; ceil-div guarantees forward
/// progress instead.
fn scale_runtime(runtime: u64, weight: u32) -> u64 {
    if weight == NICE_0_WEIGHT || weight == 0 || runtime == 0 {
        return runtime;
    }
    let ratio: u128 = ((NICE_0_WEIGHT as u128) << 32) / weight as u128;
    let product: u128 = runtime as u128 * ratio;
    let scaled = (product + ((1u128 << 32) - 1)) >> 32;
    scaled as u64
}

/// A pluggable task-selection algorithm.
pub trait SchedulingPolicy: Send {
    /// Human-readable name, for diagnostics.
    fn name(&self) -> &'static str;

    /// Picks the index (into `tasks`) of the next task to dispatch. May
    /// mutate `tasks` (period rollover for edf/rm, marking `executed`).
    /// `curr` is the index of the task that was just accounted for;
    /// `tasks` is guaranteed non-empty.
    fn select(
        &self,
        tasks: &mut [TaskDescriptor],
        curr: usize,
        now: Tick,
        on_miss: DeadlineMissPolicy,
    ) -> usize;
}

fn is_eligible(t: &TaskDescriptor) -> bool {
    t.state == nos_api::TaskState::Running
}

/// Cooperative rotation among all eligible tasks, starting just after
/// `curr`. `skip_periodic` excludes tasks scheduled under a periodic
/// policy, so it can double as the fallback for aedf/edf/rm's aperiodic
/// slack.
pub struct RoundRobin {
    pub skip_periodic: bool,
}

impl SchedulingPolicy for RoundRobin {
    fn name(&self) -> &'static str {
        "round-robin"
    }

    fn select(
        &self,
        tasks: &mut [TaskDescriptor],
        curr: usize,
        _now: Tick,
        _on_miss: DeadlineMissPolicy,
    ) -> usize {
        let n = tasks.len();
        for offset in 1..=n {
            let idx = (curr + offset) % n;
            let t = &tasks[idx];
            if is_eligible(t) && !(self.skip_periodic && t.is_periodic_task()) {
                return idx;
            }
        }
        curr
    }
}

/// Numerically-smallest [`TaskDescriptor::static_prio`] wins; ties resolve
/// to the first-encountered eligible task (stable w.r.t. insertion order).
pub struct StaticPriority;

impl SchedulingPolicy for StaticPriority {
    fn name(&self) -> &'static str {
        "static-priority"
    }

    fn select(
        &self,
        tasks: &mut [TaskDescriptor],
        curr: usize,
        _now: Tick,
        _on_miss: DeadlineMissPolicy,
    ) -> usize {
        let mut best: Option<usize> = None;
        for (i, t) in tasks.iter().enumerate() {
            if !is_eligible(t) {
                continue;
            }
            best = Some(match best {
                None => i,
                Some(b) if t.static_prio < tasks[b].static_prio => i,
                Some(b) => b,
            });
        }
        best.unwrap_or(curr)
    }
}

/// Weighted-fair scheduling: the eligible task with the smallest
/// `vruntime` wins, ties resolved to the first-encountered task.
pub struct Fair;

impl SchedulingPolicy for Fair {
    fn name(&self) -> &'static str {
        "fair"
    }

    fn select(
        &self,
        tasks: &mut [TaskDescriptor],
        curr: usize,
        _now: Tick,
        _on_miss: DeadlineMissPolicy,
    ) -> usize {
        let mut best: Option<usize> = None;
        for (i, t) in tasks.iter().enumerate() {
            if !is_eligible(t) {
                continue;
            }
            best = Some(match best {
                None => i,
                Some(b) if t.vruntime < tasks[b].vruntime => i,
                Some(b) => b,
            });
        }
        best.unwrap_or(curr)
    }
}

/// Earliest absolute deadline first, without period rollover: among
/// eligible periodic tasks, the smallest `deadline` wins. Falls through to
/// round-robin over the aperiodic/under-analysis tail when no periodic
/// task is eligible.
pub struct Aedf;

impl SchedulingPolicy for Aedf {
    fn name(&self) -> &'static str {
        "aedf"
    }

    fn select(
        &self,
        tasks: &mut [TaskDescriptor],
        curr: usize,
        now: Tick,
        on_miss: DeadlineMissPolicy,
    ) -> usize {
        let mut best: Option<usize> = None;
        for (i, t) in tasks.iter().enumerate() {
            if !is_eligible(t) || !t.is_periodic_task() {
                continue;
            }
            if t.deadline < now {
                log::warn!("task {} missed deadline (deadline={}, now={})", t.pid, t.deadline, now);
                if on_miss == DeadlineMissPolicy::LogAndSkip {
                    continue;
                }
            }
            best = Some(match best {
                None => i,
                Some(b) if t.deadline < tasks[b].deadline => i,
                Some(b) => b,
            });
        }
        best.unwrap_or_else(|| RoundRobin { skip_periodic: false }.select(tasks, curr, now, on_miss))
    }
}

/// Rolls an elapsed periodic task over into its next period: clears
/// `executed` and advances `deadline`/`next_period` by one `period`.
fn roll_over_periods(tasks: &mut [TaskDescriptor], now: Tick) {
    for t in tasks.iter_mut() {
        if t.is_periodic && t.executed && t.next_period <= now {
            t.executed = false;
            t.deadline += t.period;
            t.next_period += t.period;
        }
    }
}

/// Earliest deadline first, with period rollover: among periodic tasks not
/// yet executed in their current period, the smallest `deadline` wins.
/// Falls through to round-robin when no periodic task is eligible.
pub struct Edf;

impl SchedulingPolicy for Edf {
    fn name(&self) -> &'static str {
        "edf"
    }

    fn select(
        &self,
        tasks: &mut [TaskDescriptor],
        curr: usize,
        now: Tick,
        on_miss: DeadlineMissPolicy,
    ) -> usize {
        roll_over_periods(tasks, now);

        let mut best: Option<usize> = None;
        for (i, t) in tasks.iter().enumerate() {
            if !is_eligible(t) || !t.is_periodic_task() || t.executed {
                continue;
            }
            if t.deadline < now {
                log::warn!("task {} missed deadline (deadline={}, now={})", t.pid, t.deadline, now);
                if on_miss == DeadlineMissPolicy::LogAndSkip {
                    continue;
                }
            }
            best = Some(match best {
                None => i,
                Some(b) if t.deadline < tasks[b].deadline => i,
                Some(b) => b,
            });
        }

        match best {
            Some(i) => {
                tasks[i].executed = true;
                i
            }
            None => RoundRobin { skip_periodic: false }.select(tasks, curr, now, on_miss),
        }
    }
}

/// Rate-monotonic: among periodic tasks not yet executed in their current
/// period, the smallest `next_period` (equivalently, shortest period)
/// wins. Falls through to round-robin when no periodic task is eligible.
pub struct RateMonotonic;

impl SchedulingPolicy for RateMonotonic {
    fn name(&self) -> &'static str {
        "rm"
    }

    fn select(
        &self,
        tasks: &mut [TaskDescriptor],
        curr: usize,
        now: Tick,
        on_miss: DeadlineMissPolicy,
    ) -> usize {
        roll_over_periods(tasks, now);

        let mut best: Option<usize> = None;
        for (i, t) in tasks.iter().enumerate() {
            if !is_eligible(t) || !t.is_periodic_task() || t.executed {
                continue;
            }
            if t.deadline < now {
                log::warn!("task {} missed deadline (deadline={}, now={})", t.pid, t.deadline, now);
                if on_miss == DeadlineMissPolicy::LogAndSkip {
                    continue;
                }
            }
            best = Some(match best {
                None => i,
                Some(b) if t.next_period < tasks[b].next_period => i,
                Some(b) => b,
            });
        }

        match best {
            Some(i) => {
                tasks[i].executed = true;
                i
            }
            None => RoundRobin { skip_periodic: false }.select(tasks, curr, now, on_miss),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nice_zero_is_reference_weight() {
        assert_eq!(nice_to_weight(0), NICE_0_WEIGHT);
    }

    #[test]
    fn nice_to_weight_is_monotonically_decreasing() {
        let weights: alloc::vec::Vec<u32> = (-20..=19).map(nice_to_weight).collect();
        for w in weights.windows(2) {
            assert!(w[0] > w[1]);
        }
    }

    #[test]
    fn scale_runtime_never_truncates_high_weight_task_to_zero() {
        let heavy_weight = nice_to_weight(-20);
        let scaled = scale_runtime(1, heavy_weight);
        assert!(scaled > 0);
    }

    #[test]
    fn scale_runtime_is_identity_at_reference_weight() {
        assert_eq!(scale_runtime(1234, NICE_0_WEIGHT), 1234);
    }
}
