// Cooperative, single-threaded scheduling of participant steps.
//
// A step runs until it either finishes ("settles") or parks on a channel
// semaphore. A parked step is remembered only by its `TaskId` sitting in
// the semaphore's waiter queue. Whoever signals that semaphore moves the id
// onto the `ReadyQueue`, and the scheduler later calls `resume` on the
// participant that owns it.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use tracing::trace;

/// Index of a participant in the scheduler's roster.
pub type TaskId = usize;

/// Woken tasks, in the order their semaphores handed them a permit.
#[derive(Debug, Default)]
pub struct ReadyQueue(VecDeque<TaskId>);

impl ReadyQueue {
    pub fn new() -> Self {
        ReadyQueue(VecDeque::new())
    }

    pub fn push_back(&mut self, task: TaskId) {
        self.0.push_back(task);
    }

    pub fn pop_front(&mut self) -> Option<TaskId> {
        self.0.pop_front()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Progress {
    Settled,
    /// Parked on a channel operation; `resume` will be called once woken.
    Pending,
}

/// The step contract shared by computing units, sources and sinks.
pub trait Step {
    /// Begins a new step. Only called when no earlier step is pending.
    fn step(&mut self, task: TaskId, ready: &mut ReadyQueue) -> Progress;

    /// Continues a pending step after `task` was taken off the ready queue.
    fn resume(&mut self, task: TaskId, ready: &mut ReadyQueue) -> Progress;

    /// Asked on a tick where the previous step is still pending. Returns
    /// true when that step has been given up and its channel wait withdrawn,
    /// so a new step may start right away.
    fn withdraw(&mut self, _task: TaskId) -> bool {
        false
    }

    /// Called instead of `step` on a tick where the previous step is still
    /// pending.
    fn stalled(&mut self) {}
}

/// Everything a scheduler can step, addressed by `TaskId`.
pub trait Participants {
    fn count(&self) -> usize;
    fn participant(&mut self, task: TaskId) -> &mut dyn Step;
}

impl<S: Step> Participants for Vec<S> {
    fn count(&self) -> usize {
        self.len()
    }

    fn participant(&mut self, task: TaskId) -> &mut dyn Step {
        &mut self[task]
    }
}

/// When a tick is considered complete.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Discipline {
    /// Every idle participant starts a step, then woken continuations are
    /// resumed until none are left.
    Lockstep,
    /// Continuations woken during the previous tick land first, every idle
    /// participant starts a step, then woken continuations are resumed only
    /// until at least one step has settled in this tick.
    FirstSettled,
}

impl Default for Discipline {
    fn default() -> Self {
        Discipline::Lockstep
    }
}

impl FromStr for Discipline {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lockstep" => Ok(Discipline::Lockstep),
            "first-settled" => Ok(Discipline::FirstSettled),
            other => Err(format!(
                "unknown discipline `{}`, expected `lockstep` or `first-settled`",
                other
            )),
        }
    }
}

impl fmt::Display for Discipline {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Discipline::Lockstep => f.write_str("lockstep"),
            Discipline::FirstSettled => f.write_str("first-settled"),
        }
    }
}

pub struct Scheduler {
    discipline: Discipline,
    in_flight: Vec<bool>,
    ready: ReadyQueue,
}

impl Scheduler {
    pub fn new(participants: usize, discipline: Discipline) -> Self {
        Scheduler {
            discipline,
            in_flight: vec![false; participants],
            ready: ReadyQueue::new(),
        }
    }

    pub fn discipline(&self) -> Discipline {
        self.discipline
    }

    /// Runs one tick and returns how many steps settled during it.
    pub fn tick<P: Participants + ?Sized>(&mut self, roster: &mut P) -> usize {
        let mut settled = 0;

        if self.discipline == Discipline::FirstSettled {
            let carried = self.ready.len();
            for _ in 0..carried {
                settled += self.resume_next(roster).unwrap_or(0);
            }
        }

        for task in 0..roster.count() {
            if self.in_flight[task] {
                if !roster.participant(task).withdraw(task) {
                    roster.participant(task).stalled();
                    continue;
                }
                trace!(task, "pending step withdrawn");
                self.in_flight[task] = false;
            }
            match roster.participant(task).step(task, &mut self.ready) {
                Progress::Settled => settled += 1,
                Progress::Pending => self.in_flight[task] = true,
            }
        }

        match self.discipline {
            Discipline::Lockstep => settled += self.settle(roster),
            Discipline::FirstSettled => {
                while settled == 0 {
                    match self.resume_next(roster) {
                        Some(n) => settled += n,
                        None => break,
                    }
                }
            }
        }

        trace!(settled, pending = self.pending(), "tick complete");
        settled
    }

    /// Resumes woken continuations until the ready queue is empty, without
    /// starting any new step. Returns how many steps settled.
    pub fn settle<P: Participants + ?Sized>(&mut self, roster: &mut P) -> usize {
        let mut settled = 0;
        while let Some(n) = self.resume_next(roster) {
            settled += n;
        }
        settled
    }

    /// Number of participants with a step still outstanding.
    pub fn pending(&self) -> usize {
        self.in_flight.iter().filter(|f| **f).count()
    }

    pub fn is_pending(&self, task: TaskId) -> bool {
        self.in_flight[task]
    }

    fn resume_next<P: Participants + ?Sized>(&mut self, roster: &mut P) -> Option<usize> {
        let task = self.ready.pop_front()?;
        match roster.participant(task).resume(task, &mut self.ready) {
            Progress::Settled => {
                self.in_flight[task] = false;
                Some(1)
            }
            Progress::Pending => Some(0),
        }
    }
}
