use crate::channel::{ChannelRef, ReceiveStatus, SendStatus};
use crate::scheduler::{Progress, ReadyQueue, Step, TaskId};
use crate::unit::Status;
use std::collections::VecDeque;
use tracing::trace;

/// Sends its values into a channel, one per step, in order.
#[derive(Debug)]
pub struct Source {
    values: VecDeque<i64>,
    out: ChannelRef,
    status: Status,
    pending: Option<i64>,
}

impl Source {
    pub fn new<I: IntoIterator<Item = i64>>(values: I, out: &ChannelRef) -> Self {
        Source {
            values: values.into_iter().collect(),
            out: out.clone(),
            status: Status::Idle,
            pending: None,
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// Number of values not yet delivered into the channel.
    pub fn backlog(&self) -> usize {
        self.values.len() + self.pending.iter().count()
    }
}

impl Step for Source {
    fn step(&mut self, task: TaskId, ready: &mut ReadyQueue) -> Progress {
        let value = match self.values.pop_front() {
            Some(v) => v,
            None => {
                self.status = Status::Idle;
                return Progress::Settled;
            }
        };
        self.status = Status::Run;
        let status = self.out.borrow_mut().send(value, task, ready);
        match status {
            SendStatus::Delivered => Progress::Settled,
            SendStatus::Blocked => {
                trace!(task, value, "source waiting");
                self.status = Status::Write;
                self.pending = Some(value);
                Progress::Pending
            }
        }
    }

    fn resume(&mut self, _task: TaskId, ready: &mut ReadyQueue) -> Progress {
        if let Some(value) = self.pending.take() {
            self.out.borrow_mut().finish_send(value, ready);
            self.status = Status::Run;
        }
        Progress::Settled
    }
}

/// Receives one value per step and keeps everything it received.
#[derive(Debug)]
pub struct Sink {
    input: ChannelRef,
    results: Vec<i64>,
    waiting: bool,
}

impl Sink {
    pub fn new(input: &ChannelRef) -> Self {
        Sink {
            input: input.clone(),
            results: Vec::new(),
            waiting: false,
        }
    }

    /// Values in arrival order.
    pub fn results(&self) -> &[i64] {
        &self.results
    }

    pub fn into_results(self) -> Vec<i64> {
        self.results
    }

    pub fn is_waiting(&self) -> bool {
        self.waiting
    }
}

impl Step for Sink {
    fn step(&mut self, task: TaskId, ready: &mut ReadyQueue) -> Progress {
        let status = self.input.borrow_mut().receive(task, ready);
        match status {
            ReceiveStatus::Received(v) => {
                self.results.push(v);
                Progress::Settled
            }
            ReceiveStatus::Blocked => {
                self.waiting = true;
                Progress::Pending
            }
        }
    }

    fn resume(&mut self, _task: TaskId, _ready: &mut ReadyQueue) -> Progress {
        if self.waiting {
            let v = self.input.borrow_mut().finish_receive();
            self.results.push(v);
            self.waiting = false;
        }
        Progress::Settled
    }
}
