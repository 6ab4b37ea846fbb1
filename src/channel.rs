use crate::scheduler::{ReadyQueue, TaskId};
use crate::semaphore::{Acquire, Semaphore};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use tracing::trace;

/// A channel is owned jointly by the two endpoints wired to it.
pub type ChannelRef = Rc<RefCell<Channel>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendStatus {
    Delivered,
    /// The sender is parked until a slot frees up. It must call
    /// `finish_send` with the same value once it is resumed.
    Blocked,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReceiveStatus {
    Received(i64),
    /// The receiver is parked until a value arrives. It must call
    /// `finish_receive` once it is resumed.
    Blocked,
}

/// Bounded FIFO queue of integers built from two semaphores.
///
/// A receiver announces itself by freeing a slot *before* it waits for an
/// item. With capacity 0 this turns every transfer into a rendezvous: a
/// send cannot complete until some receive has been issued.
#[derive(Debug)]
pub struct Channel {
    capacity: usize,
    empty_slots: Semaphore,
    filled_slots: Semaphore,
    buffer: VecDeque<i64>,
    last_sent: Option<i64>,
}

impl Channel {
    pub fn new(capacity: usize) -> Self {
        Channel {
            capacity,
            empty_slots: Semaphore::new(capacity),
            filled_slots: Semaphore::new(0),
            buffer: VecDeque::new(),
            last_sent: None,
        }
    }

    pub fn shared(capacity: usize) -> ChannelRef {
        Rc::new(RefCell::new(Channel::new(capacity)))
    }

    pub fn send(&mut self, value: i64, task: TaskId, ready: &mut ReadyQueue) -> SendStatus {
        self.last_sent = Some(value);
        match self.empty_slots.wait(task) {
            Acquire::Granted => {
                self.deliver(value, ready);
                SendStatus::Delivered
            }
            Acquire::Suspended => {
                trace!(task, value, "send blocked");
                SendStatus::Blocked
            }
        }
    }

    /// Completes a send that returned `SendStatus::Blocked`.
    pub fn finish_send(&mut self, value: i64, ready: &mut ReadyQueue) {
        self.deliver(value, ready);
    }

    fn deliver(&mut self, value: i64, ready: &mut ReadyQueue) {
        self.buffer.push_back(value);
        self.filled_slots.signal(ready);
    }

    pub fn receive(&mut self, task: TaskId, ready: &mut ReadyQueue) -> ReceiveStatus {
        self.empty_slots.signal(ready);
        match self.filled_slots.wait(task) {
            Acquire::Granted => ReceiveStatus::Received(self.take()),
            Acquire::Suspended => {
                trace!(task, "receive blocked");
                ReceiveStatus::Blocked
            }
        }
    }

    /// Completes a receive that returned `ReceiveStatus::Blocked`.
    pub fn finish_receive(&mut self) -> i64 {
        self.take()
    }

    /// Withdraws a send that returned `SendStatus::Blocked` and has not been
    /// woken yet. Returns false once it has been woken; it then has to be
    /// completed with `finish_send`.
    pub fn cancel_send(&mut self, task: TaskId) -> bool {
        let cancelled = self.empty_slots.cancel(task);
        if cancelled {
            trace!(task, "send withdrawn");
        }
        cancelled
    }

    /// Withdraws a receive that returned `ReceiveStatus::Blocked`, together
    /// with the slot it announced. Returns false when it has been woken or a
    /// sender has already taken the announced slot; the value on its way has
    /// to be taken with `finish_receive` once the receiver is woken.
    pub fn cancel_receive(&mut self, task: TaskId) -> bool {
        if self.empty_slots.permits() <= 0 || !self.filled_slots.cancel(task) {
            return false;
        }
        self.empty_slots.retract();
        trace!(task, "receive withdrawn");
        true
    }

    fn take(&mut self) -> i64 {
        self.buffer
            .pop_front()
            .expect("A granted `filled_slots` permit must come with a buffered item")
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of items sent but not yet received.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Last value offered by a sender, delivered or not.
    pub fn last_sent(&self) -> Option<i64> {
        self.last_sent
    }
}
