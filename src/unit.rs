use crate::channel::{ChannelRef, ReceiveStatus, SendStatus};
use crate::compiler;
use crate::error::CompileError;
use crate::language::*;
use crate::scheduler::{Progress, ReadyQueue, Step, TaskId};
use std::fmt;
use std::fmt::Display;
use tracing::{debug, trace};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Idle,
    /// Waiting for a value on a port.
    Read,
    /// Waiting for a port to accept a value.
    Write,
    Run,
}

impl Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Status::Idle => "IDLE",
            Status::Read => "READ",
            Status::Write => "WRTE",
            Status::Run => "RUN",
        })
    }
}

/// Channel endpoints of a unit, one optional channel per direction.
#[derive(Clone, Debug, Default)]
pub struct Ports {
    left: Option<ChannelRef>,
    right: Option<ChannelRef>,
    up: Option<ChannelRef>,
    down: Option<ChannelRef>,
}

impl Ports {
    pub fn new() -> Self {
        Ports::default()
    }

    pub fn left(self, channel: &ChannelRef) -> Self {
        self.with(Port::Left, channel)
    }

    pub fn right(self, channel: &ChannelRef) -> Self {
        self.with(Port::Right, channel)
    }

    pub fn up(self, channel: &ChannelRef) -> Self {
        self.with(Port::Up, channel)
    }

    pub fn down(self, channel: &ChannelRef) -> Self {
        self.with(Port::Down, channel)
    }

    pub fn with(mut self, port: Port, channel: &ChannelRef) -> Self {
        self.set(port, channel.clone());
        self
    }

    pub fn set(&mut self, port: Port, channel: ChannelRef) {
        *self.slot(port) = Some(channel);
    }

    pub fn get(&self, port: Port) -> Option<&ChannelRef> {
        match port {
            Port::Left => self.left.as_ref(),
            Port::Right => self.right.as_ref(),
            Port::Up => self.up.as_ref(),
            Port::Down => self.down.as_ref(),
        }
    }

    pub fn is_connected(&self, port: Port) -> bool {
        self.get(port).is_some()
    }

    fn slot(&mut self, port: Port) -> &mut Option<ChannelRef> {
        match port {
            Port::Left => &mut self.left,
            Port::Right => &mut self.right,
            Port::Up => &mut self.up,
            Port::Down => &mut self.down,
        }
    }
}

/// Port operation a suspended step resumes with.
#[derive(Clone, Copy, Debug)]
enum Pending {
    Read(Port),
    Write(Port, i64),
}

/// A single processor: accumulator, backup register, instruction pointer
/// and up to four channel ports.
#[derive(Debug)]
pub struct ComputingUnit {
    id: String,
    ports: Ports,
    source: String,
    program: Option<Program>,
    line_map: Vec<usize>,
    acc: i64,
    bak: i64,
    ip: usize,
    next_ip: usize,
    status: Status,
    requested: u64,
    executed: u64,
    pending: Option<Pending>,
    /// Port operation of a step cut short by `compile`. It still holds a
    /// place in its channel until it is withdrawn or completed.
    abandoned: Option<Pending>,
}

impl ComputingUnit {
    /// A unit without a program. Stepping it does nothing.
    pub fn new(ports: Ports) -> Self {
        ComputingUnit {
            id: Uuid::new_v4().to_string(),
            ports,
            source: String::new(),
            program: None,
            line_map: Vec::new(),
            acc: 0,
            bak: 0,
            ip: 0,
            next_ip: 0,
            status: Status::Idle,
            requested: 0,
            executed: 0,
            pending: None,
            abandoned: None,
        }
    }

    pub fn with_source(ports: Ports, source: &str) -> Result<Self, CompileError> {
        let mut unit = ComputingUnit::new(ports);
        unit.compile(source)?;
        Ok(unit)
    }

    pub fn with_id<S: Into<String>>(mut self, id: S) -> Self {
        self.id = id.into();
        self
    }

    /// Replaces the program. Execution state is reset whether or not the
    /// source compiles; on failure the unit is left without a program.
    ///
    /// A port operation the unit is blocked on is abandoned. The scheduler
    /// withdraws it before the next step, or completes it and drops the
    /// result if the other end has already committed to it.
    pub fn compile(&mut self, source: &str) -> Result<(), CompileError> {
        self.reset();
        self.source = source.to_string();
        self.program = None;
        self.line_map.clear();

        let compilation = compiler::compile(source)?;
        let instructions = compilation.program.instructions();
        for (idx, instruction) in instructions.iter().enumerate() {
            if let Some(port) = instruction
                .ports()
                .into_iter()
                .find(|p| !self.ports.is_connected(*p))
            {
                return Err(CompileError::UnconnectedPort {
                    line: compilation.line_map[idx] + 1,
                    port,
                });
            }
        }

        debug!(unit = %self.id, instructions = instructions.len(), "loaded program");
        self.program = Some(compilation.program);
        self.line_map = compilation.line_map;
        Ok(())
    }

    fn reset(&mut self) {
        self.acc = 0;
        self.bak = 0;
        self.ip = 0;
        self.next_ip = 0;
        self.status = Status::Idle;
        self.requested = 0;
        self.executed = 0;
        if let Some(op) = self.pending.take() {
            self.abandoned = Some(op);
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn acc(&self) -> i64 {
        self.acc
    }

    pub fn bak(&self) -> i64 {
        self.bak
    }

    pub fn ip(&self) -> usize {
        self.ip
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn ports(&self) -> &Ports {
        &self.ports
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn program(&self) -> Option<&Program> {
        self.program.as_ref()
    }

    pub fn line_map(&self) -> &[usize] {
        &self.line_map
    }

    pub fn requested_cycles(&self) -> u64 {
        self.requested
    }

    pub fn executed_cycles(&self) -> u64 {
        self.executed
    }

    /// Share of requested cycles in which no instruction completed.
    pub fn idleness(&self) -> Option<f64> {
        if self.requested == 0 {
            None
        } else {
            Some(1.0 - self.executed as f64 / self.requested as f64)
        }
    }

    /// Source line (0-based) of the instruction at `ip`.
    pub fn current_line(&self) -> Option<usize> {
        self.program.as_ref()?;
        self.line_map.get(self.ip).copied()
    }

    /// The source, one line per line, with the current line marked by `>`.
    pub fn listing(&self) -> String {
        let current = self.current_line();
        self.source
            .lines()
            .enumerate()
            .map(|(idx, text)| {
                let marker = if Some(idx) == current { '>' } else { ' ' };
                format!("{} {}", marker, text)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Last value offered on the channel bound to `port`, by either end.
    pub fn last_sent(&self, port: Port) -> Option<i64> {
        self.ports.get(port)?.borrow().last_sent()
    }

    fn channel(&self, port: Port) -> ChannelRef {
        self.ports
            .get(port)
            .cloned()
            .expect("Ports used by a program are checked when it is compiled")
    }

    fn current(&self) -> Instruction {
        match self.program.as_ref().and_then(|p| p.get(self.ip)) {
            Some(instruction) => *instruction,
            None => unreachable!("Only units with a program execute instructions"),
        }
    }

    fn execute(&mut self, task: TaskId, ready: &mut ReadyQueue) -> Progress {
        match self.current() {
            Instruction::Singleton(op) => {
                match op {
                    Singleton::Nop => {}
                    Singleton::Neg => self.acc = self.acc.wrapping_neg(),
                    Singleton::Sav => self.bak = self.acc,
                    Singleton::Swp => std::mem::swap(&mut self.acc, &mut self.bak),
                }
                self.finish(None)
            }
            Instruction::Unary(_, src) | Instruction::Binary(_, src, _) => {
                match self.read(src, task, ready) {
                    Some(v) => self.after_read(v, task, ready),
                    None => Progress::Pending,
                }
            }
            Instruction::Jump(op, target) => {
                let target = if op.taken(self.acc) { Some(target) } else { None };
                self.finish(target)
            }
        }
    }

    fn read(&mut self, src: Operand, task: TaskId, ready: &mut ReadyQueue) -> Option<i64> {
        match src {
            Operand::Immediate(v) => Some(v),
            Operand::Register(Register::Acc) => Some(self.acc),
            Operand::Register(Register::Nil) => Some(0),
            Operand::Register(Register::Port(port)) => {
                let channel = self.channel(port);
                let status = channel.borrow_mut().receive(task, ready);
                match status {
                    ReceiveStatus::Received(v) => Some(v),
                    ReceiveStatus::Blocked => {
                        self.status = Status::Read;
                        self.pending = Some(Pending::Read(port));
                        None
                    }
                }
            }
        }
    }

    fn after_read(&mut self, v: i64, task: TaskId, ready: &mut ReadyQueue) -> Progress {
        match self.current() {
            Instruction::Unary(Unary::Add, _) => {
                self.acc = self.acc.wrapping_add(v);
                self.finish(None)
            }
            Instruction::Unary(Unary::Sub, _) => {
                self.acc = self.acc.wrapping_sub(v);
                self.finish(None)
            }
            Instruction::Unary(Unary::Jro, _) => {
                let target = (self.ip as i64).saturating_add(v).max(0) as usize;
                self.finish(Some(target))
            }
            Instruction::Binary(Binary::Mov, _, dst) => self.write(dst, v, task, ready),
            other => unreachable!("`{}` has no source operand", other),
        }
    }

    fn write(&mut self, dst: Register, v: i64, task: TaskId, ready: &mut ReadyQueue) -> Progress {
        match dst {
            Register::Acc => {
                self.acc = v;
                self.finish(None)
            }
            Register::Nil => self.finish(None),
            Register::Port(port) => {
                let channel = self.channel(port);
                let status = channel.borrow_mut().send(v, task, ready);
                match status {
                    SendStatus::Delivered => self.finish(None),
                    SendStatus::Blocked => {
                        self.status = Status::Write;
                        self.pending = Some(Pending::Write(port, v));
                        Progress::Pending
                    }
                }
            }
        }
    }

    fn finish(&mut self, target: Option<usize>) -> Progress {
        let len = self.program.as_ref().map_or(0, Program::len);
        if len > 0 {
            self.next_ip = target.unwrap_or(self.ip + 1) % len;
        }
        self.status = Status::Run;
        self.executed += 1;
        Progress::Settled
    }
}

impl Step for ComputingUnit {
    fn step(&mut self, task: TaskId, ready: &mut ReadyQueue) -> Progress {
        self.requested += 1;
        match &self.program {
            Some(p) if !p.is_empty() => {}
            _ => return Progress::Settled,
        }
        self.ip = self.next_ip;
        trace!(unit = %self.id, ip = self.ip, acc = self.acc, "step");
        self.execute(task, ready)
    }

    fn resume(&mut self, task: TaskId, ready: &mut ReadyQueue) -> Progress {
        match self.pending.take() {
            Some(Pending::Read(port)) => {
                let v = self.channel(port).borrow_mut().finish_receive();
                self.after_read(v, task, ready)
            }
            Some(Pending::Write(port, v)) => {
                self.channel(port).borrow_mut().finish_send(v, ready);
                self.finish(None)
            }
            None => {
                match self.abandoned.take() {
                    Some(Pending::Read(port)) => {
                        let dropped = self.channel(port).borrow_mut().finish_receive();
                        trace!(unit = %self.id, ?port, dropped, "abandoned read completed");
                    }
                    Some(Pending::Write(port, v)) => {
                        self.channel(port).borrow_mut().finish_send(v, ready);
                        trace!(unit = %self.id, ?port, v, "abandoned write completed");
                    }
                    None => {}
                }
                Progress::Settled
            }
        }
    }

    fn withdraw(&mut self, task: TaskId) -> bool {
        let withdrawn = match self.abandoned {
            Some(Pending::Read(port)) => self.channel(port).borrow_mut().cancel_receive(task),
            Some(Pending::Write(port, _)) => self.channel(port).borrow_mut().cancel_send(task),
            None => false,
        };
        if withdrawn {
            self.abandoned = None;
        }
        withdrawn
    }

    fn stalled(&mut self) {
        self.requested += 1;
    }
}

impl Display for ComputingUnit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "[{}: {}]  ip: {}  acc: {}  bak: {}",
            self.id, self.status, self.ip, self.acc, self.bak
        )
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::channel::Channel;
    use pretty_assertions::assert_eq;
    use trim_margin::MarginTrimmable;

    const OTHER: TaskId = 99;

    fn run(unit: &mut ComputingUnit, steps: usize) {
        let mut ready = ReadyQueue::new();
        for _ in 0..steps {
            assert_eq!(unit.step(0, &mut ready), Progress::Settled);
        }
    }

    #[test]
    fn test_arithmetic_and_single_send() {
        let right = Channel::shared(1);
        let source = "
            |MOV 5, ACC
            |ADD ACC
            |SUB ACC
            |ADD 20
            |MOV ACC, RIGHT
        "
        .trim_margin()
        .unwrap();
        let mut unit = ComputingUnit::with_source(Ports::new().right(&right), &source).unwrap();

        run(&mut unit, 5);
        assert_eq!(unit.acc(), 20);
        assert_eq!(unit.ip(), 4);
        assert_eq!(right.borrow().len(), 1);
        let mut ready = ReadyQueue::new();
        assert_eq!(
            right.borrow_mut().receive(OTHER, &mut ready),
            ReceiveStatus::Received(20)
        );

        run(&mut unit, 1);
        assert_eq!(unit.ip(), 0);
        assert_eq!(unit.acc(), 5);
        assert!(right.borrow().is_empty());
    }

    #[test]
    fn test_jro_clamps_at_zero() {
        let mut unit =
            ComputingUnit::with_source(Ports::new(), "MOV -10, ACC\nNOP\nJRO ACC").unwrap();
        run(&mut unit, 3);
        run(&mut unit, 1);
        assert_eq!(unit.ip(), 0);

        let mut unit =
            ComputingUnit::with_source(Ports::new(), "MOV -1, ACC\nNOP\nJRO ACC").unwrap();
        run(&mut unit, 4);
        assert_eq!(unit.ip(), 1);
    }

    #[test]
    fn test_jro_past_the_end_wraps() {
        let mut unit = ComputingUnit::with_source(Ports::new(), "NOP\nJRO 7\nNOP").unwrap();
        run(&mut unit, 3);
        // (1 + 7) % 3
        assert_eq!(unit.ip(), 2);
    }

    #[test]
    fn test_conditional_jumps() {
        let source = "
            |MOV 3, ACC
            |LOOP: SUB 1
            |JGZ LOOP
            |NEG
            |SAV
            |SWP
        "
        .trim_margin()
        .unwrap();
        let mut unit = ComputingUnit::with_source(Ports::new(), &source).unwrap();
        // MOV, then three rounds of SUB/JGZ
        run(&mut unit, 7);
        assert_eq!(unit.acc(), 0);
        assert_eq!(unit.ip(), 2);
        run(&mut unit, 1);
        assert_eq!(unit.ip(), 3);
    }

    #[test]
    fn test_save_swap_negate() {
        let mut unit = ComputingUnit::with_source(
            Ports::new(),
            "MOV 4, ACC\nSAV\nNEG\nSWP\nMOV NIL, NIL",
        )
        .unwrap();
        run(&mut unit, 4);
        assert_eq!((unit.acc(), unit.bak()), (4, -4));
    }

    #[test]
    fn test_wrapping_arithmetic() {
        let mut unit = ComputingUnit::with_source(
            Ports::new(),
            &format!("MOV {}, ACC\nADD 1\nNEG", i64::MAX),
        )
        .unwrap();
        run(&mut unit, 3);
        assert_eq!(unit.acc(), i64::MIN);
    }

    #[test]
    fn test_without_program_is_inert() {
        let mut unit = ComputingUnit::new(Ports::new());
        assert_eq!(unit.idleness(), None);
        run(&mut unit, 4);
        assert_eq!(unit.requested_cycles(), 4);
        assert_eq!(unit.executed_cycles(), 0);
        assert_eq!(unit.idleness(), Some(1.0));
        assert_eq!(unit.status(), Status::Idle);

        let mut empty = ComputingUnit::with_source(Ports::new(), "# nothing\n\n").unwrap();
        run(&mut empty, 2);
        assert_eq!(empty.executed_cycles(), 0);
        assert_eq!(empty.current_line(), None);
    }

    #[test]
    fn test_unconnected_port() {
        let error = ComputingUnit::with_source(Ports::new(), "NOP\nMOV UP, ACC").unwrap_err();
        assert_eq!(
            error,
            CompileError::UnconnectedPort {
                line: 2,
                port: Port::Up
            }
        );

        let up = Channel::shared(1);
        let mut unit = ComputingUnit::with_source(Ports::new().up(&up), "ADD UP").unwrap();
        assert!(unit.compile("MOV ACC, DOWN").is_err());
        assert!(unit.program().is_none());
        run(&mut unit, 2);
        assert_eq!(unit.executed_cycles(), 0);
    }

    #[test]
    fn test_recompile_resets_state_keeps_wiring() {
        let down = Channel::shared(4);
        let mut unit =
            ComputingUnit::with_source(Ports::new().down(&down), "ADD 3\nMOV ACC, DOWN").unwrap();
        run(&mut unit, 3);
        assert_eq!(unit.acc(), 6);

        unit.compile("MOV 1, DOWN").unwrap();
        assert_eq!((unit.acc(), unit.ip(), unit.status()), (0, 0, Status::Idle));
        assert_eq!(unit.requested_cycles(), 0);
        run(&mut unit, 1);
        assert_eq!(down.borrow().len(), 2);
        assert_eq!(unit.last_sent(Port::Down), Some(1));
    }

    #[test]
    fn test_blocked_read_resumes() {
        let up = Channel::shared(0);
        let mut unit = ComputingUnit::with_source(Ports::new().up(&up), "MOV UP, ACC").unwrap();
        let mut ready = ReadyQueue::new();

        assert_eq!(unit.step(0, &mut ready), Progress::Pending);
        assert_eq!(unit.status(), Status::Read);
        assert_eq!(unit.executed_cycles(), 0);

        assert_eq!(up.borrow_mut().send(3, OTHER, &mut ready), SendStatus::Delivered);
        assert_eq!(ready.pop_front(), Some(0));
        assert_eq!(unit.resume(0, &mut ready), Progress::Settled);
        assert_eq!(unit.acc(), 3);
        assert_eq!(unit.status(), Status::Run);
    }

    #[test]
    fn test_blocked_write_resumes() {
        let down = Channel::shared(0);
        let mut unit =
            ComputingUnit::with_source(Ports::new().down(&down), "MOV 4, DOWN").unwrap();
        let mut ready = ReadyQueue::new();

        assert_eq!(unit.step(0, &mut ready), Progress::Pending);
        assert_eq!(unit.status(), Status::Write);
        assert_eq!(unit.last_sent(Port::Down), Some(4));
        unit.stalled();
        assert_eq!(unit.idleness(), Some(1.0));

        assert_eq!(down.borrow_mut().receive(OTHER, &mut ready), ReceiveStatus::Blocked);
        assert_eq!(ready.pop_front(), Some(0));
        assert_eq!(unit.resume(0, &mut ready), Progress::Settled);
        assert_eq!(ready.pop_front(), Some(OTHER));
        assert_eq!(down.borrow_mut().finish_receive(), 4);
        assert_eq!(unit.idleness(), Some(0.5));
    }

    #[test]
    fn test_abandoned_write_completes_when_receiver_arrives() {
        let down = Channel::shared(0);
        let mut unit =
            ComputingUnit::with_source(Ports::new().down(&down), "MOV 1, DOWN").unwrap();
        let mut ready = ReadyQueue::new();
        assert_eq!(unit.step(0, &mut ready), Progress::Pending);

        unit.compile("MOV 2, DOWN").unwrap();
        assert_eq!(unit.status(), Status::Idle);

        // the receiver's announcement was promised to the old send
        assert_eq!(down.borrow_mut().receive(OTHER, &mut ready), ReceiveStatus::Blocked);
        assert_eq!(ready.pop_front(), Some(0));
        assert_eq!(unit.resume(0, &mut ready), Progress::Settled);
        assert_eq!(unit.executed_cycles(), 0);
        assert_eq!(ready.pop_front(), Some(OTHER));
        assert_eq!(down.borrow_mut().finish_receive(), 1);

        assert_eq!(down.borrow_mut().receive(OTHER, &mut ready), ReceiveStatus::Blocked);
        assert_eq!(unit.step(0, &mut ready), Progress::Settled);
        assert_eq!(ready.pop_front(), Some(OTHER));
        assert_eq!(down.borrow_mut().finish_receive(), 2);
    }

    #[test]
    fn test_abandoned_write_is_withdrawn() {
        let down = Channel::shared(0);
        let mut unit =
            ComputingUnit::with_source(Ports::new().down(&down), "MOV 1, DOWN").unwrap();
        let mut ready = ReadyQueue::new();
        assert_eq!(unit.step(0, &mut ready), Progress::Pending);
        assert!(!unit.withdraw(0));

        unit.compile("MOV 2, DOWN").unwrap();
        assert!(unit.withdraw(0));
        assert!(!unit.withdraw(0));

        assert_eq!(down.borrow_mut().receive(OTHER, &mut ready), ReceiveStatus::Blocked);
        assert!(ready.is_empty());
        assert_eq!(unit.step(0, &mut ready), Progress::Settled);
        assert_eq!(ready.pop_front(), Some(OTHER));
        assert_eq!(down.borrow_mut().finish_receive(), 2);
    }

    #[test]
    fn test_abandoned_read_drops_value_in_flight() {
        let up = Channel::shared(0);
        let mut unit = ComputingUnit::with_source(Ports::new().up(&up), "MOV UP, ACC").unwrap();
        let mut ready = ReadyQueue::new();

        // a sender is released by the read before the recompilation
        assert_eq!(up.borrow_mut().send(5, OTHER, &mut ready), SendStatus::Blocked);
        assert_eq!(unit.step(0, &mut ready), Progress::Pending);
        assert_eq!(ready.pop_front(), Some(OTHER));

        unit.compile("ADD UP").unwrap();
        assert!(!unit.withdraw(0));
        up.borrow_mut().finish_send(5, &mut ready);
        assert_eq!(ready.pop_front(), Some(0));
        assert_eq!(unit.resume(0, &mut ready), Progress::Settled);
        assert_eq!(unit.acc(), 0);
        assert!(up.borrow().is_empty());
    }

    #[test]
    fn test_listing_and_display() {
        let source = "
            |# doubles its input
            |START: ADD ACC
            |
            |JMP START
        "
        .trim_margin()
        .unwrap();
        let mut unit = ComputingUnit::with_source(Ports::new(), &source)
            .unwrap()
            .with_id("n0");
        assert_eq!(unit.line_map(), &[1, 3]);
        assert_eq!(unit.current_line(), Some(1));
        run(&mut unit, 2);
        assert_eq!(unit.current_line(), Some(3));
        assert_eq!(
            unit.listing(),
            "  # doubles its input\n  START: ADD ACC\n  \n> JMP START"
        );
        assert_eq!(unit.to_string(), "[n0: RUN]  ip: 1  acc: 0  bak: 0");
    }
}
