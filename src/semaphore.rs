use crate::scheduler::{ReadyQueue, TaskId};
use std::collections::VecDeque;

/// Outcome of `Semaphore::wait`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Acquire {
    Granted,
    /// The task was parked. It is pushed onto the ready queue by the
    /// `signal` that hands it the permit.
    Suspended,
}

/// Counting semaphore with a FIFO queue of parked tasks.
///
/// `permits` goes negative while tasks are parked; its magnitude is the
/// length of the waiter queue.
#[derive(Debug)]
pub struct Semaphore {
    permits: i64,
    waiters: VecDeque<TaskId>,
}

impl Semaphore {
    pub fn new(permits: usize) -> Self {
        Semaphore {
            permits: permits as i64,
            waiters: VecDeque::new(),
        }
    }

    pub fn wait(&mut self, task: TaskId) -> Acquire {
        self.permits -= 1;
        if self.permits < 0 {
            self.waiters.push_back(task);
            Acquire::Suspended
        } else {
            Acquire::Granted
        }
    }

    /// Never blocks. Wakes the longest waiting task, if any.
    pub fn signal(&mut self, ready: &mut ReadyQueue) {
        self.permits += 1;
        if let Some(task) = self.waiters.pop_front() {
            ready.push_back(task);
        }
    }

    /// Takes `task` out of the waiter queue and gives back the permit it was
    /// waiting for. Returns false when `task` is not parked here, e.g. because
    /// a `signal` already woke it.
    pub fn cancel(&mut self, task: TaskId) -> bool {
        match self.waiters.iter().position(|t| *t == task) {
            Some(pos) => {
                self.waiters.remove(pos);
                self.permits += 1;
                true
            }
            None => false,
        }
    }

    /// Takes back a banked permit without waiting for it.
    pub fn retract(&mut self) {
        debug_assert!(self.permits > 0, "only banked permits can be retracted");
        self.permits -= 1;
    }

    pub fn permits(&self) -> i64 {
        self.permits
    }

    pub fn waiting(&self) -> usize {
        self.waiters.len()
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn test_wait_within_permits() {
        let mut s = Semaphore::new(2);
        assert_eq!(s.wait(0), Acquire::Granted);
        assert_eq!(s.wait(1), Acquire::Granted);
        assert_eq!(s.permits(), 0);
        assert_eq!(s.waiting(), 0);
    }

    #[test]
    fn test_negative_permits_count_waiters() {
        let mut s = Semaphore::new(0);
        assert_eq!(s.wait(7), Acquire::Suspended);
        assert_eq!(s.wait(8), Acquire::Suspended);
        assert_eq!(s.permits(), -2);
        assert_eq!(s.waiting(), 2);
    }

    #[test]
    fn test_signal_wakes_longest_waiter_first() {
        let mut s = Semaphore::new(0);
        let mut ready = ReadyQueue::new();
        s.wait(3);
        s.wait(1);
        s.wait(2);
        s.signal(&mut ready);
        s.signal(&mut ready);
        assert_eq!(ready.pop_front(), Some(3));
        assert_eq!(ready.pop_front(), Some(1));
        assert_eq!(ready.pop_front(), None);
        assert_eq!(s.permits(), -1);
    }

    #[test]
    fn test_signal_without_waiters_banks_permit() {
        let mut s = Semaphore::new(0);
        let mut ready = ReadyQueue::new();
        s.signal(&mut ready);
        assert!(ready.is_empty());
        assert_eq!(s.wait(4), Acquire::Granted);
    }

    #[test]
    fn test_cancel_parked_task() {
        let mut s = Semaphore::new(0);
        let mut ready = ReadyQueue::new();
        s.wait(5);
        s.wait(6);
        assert!(s.cancel(5));
        assert_eq!((s.permits(), s.waiting()), (-1, 1));
        s.signal(&mut ready);
        assert_eq!(ready.pop_front(), Some(6));
        // already woken
        assert!(!s.cancel(6));
        assert_eq!(s.permits(), 0);
    }

    #[test]
    fn test_retract_banked_permit() {
        let mut s = Semaphore::new(1);
        s.retract();
        assert_eq!(s.permits(), 0);
        assert_eq!(s.wait(2), Acquire::Suspended);
    }
}
