use std::fmt;
use std::fmt::Display;

macro_rules! mnemonic {
    ($name: ident, $text: expr) => {
        pub(crate) const $name: &str = $text;
    };
}

macro_rules! register_name {
    ($name: ident, $text: expr) => {
        pub(crate) const $name: &str = $text;
    };
}

include!("../mnemonics.rs");

/// One of the four directional channel ports of a unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Port {
    Left,
    Right,
    Up,
    Down,
}

impl Port {
    pub const ALL: [Port; 4] = [Port::Left, Port::Right, Port::Up, Port::Down];

    pub fn name(self) -> &'static str {
        match self {
            Port::Left => LEFT,
            Port::Right => RIGHT,
            Port::Up => UP,
            Port::Down => DOWN,
        }
    }
}

impl Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Register {
    Port(Port),
    Acc,
    Nil,
}

impl Register {
    pub const ALL: [Register; 6] = [
        Register::Port(Port::Left),
        Register::Port(Port::Right),
        Register::Port(Port::Up),
        Register::Port(Port::Down),
        Register::Acc,
        Register::Nil,
    ];

    /// Looks up an upper-case register spelling.
    pub fn from_name(name: &str) -> Option<Register> {
        match name {
            LEFT => Some(Register::Port(Port::Left)),
            RIGHT => Some(Register::Port(Port::Right)),
            UP => Some(Register::Port(Port::Up)),
            DOWN => Some(Register::Port(Port::Down)),
            ACC => Some(Register::Acc),
            NIL => Some(Register::Nil),
            _ => None,
        }
    }

    pub fn port(self) -> Option<Port> {
        match self {
            Register::Port(p) => Some(p),
            _ => None,
        }
    }
}

impl Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Register::Port(p) => p.fmt(f),
            Register::Acc => f.write_str(ACC),
            Register::Nil => f.write_str(NIL),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operand {
    Immediate(i64),
    Register(Register),
}

impl Operand {
    /// Port touched by reading this operand, if any.
    pub fn port(self) -> Option<Port> {
        match self {
            Operand::Register(r) => r.port(),
            Operand::Immediate(_) => None,
        }
    }
}

impl From<i64> for Operand {
    fn from(v: i64) -> Operand {
        Operand::Immediate(v)
    }
}

impl From<Register> for Operand {
    fn from(r: Register) -> Operand {
        Operand::Register(r)
    }
}

impl Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Operand::Immediate(v) => write!(f, "{}", v),
            Operand::Register(r) => r.fmt(f),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Singleton {
    Nop,
    Neg,
    Sav,
    Swp,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Unary {
    Add,
    Sub,
    Jro,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Binary {
    Mov,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Jump {
    Jmp,
    Jez,
    Jnz,
    Jgz,
    Jlz,
}

impl Singleton {
    pub fn mnemonic(self) -> &'static str {
        match self {
            Singleton::Nop => NOP,
            Singleton::Neg => NEG,
            Singleton::Sav => SAV,
            Singleton::Swp => SWP,
        }
    }
}

impl Unary {
    pub fn mnemonic(self) -> &'static str {
        match self {
            Unary::Add => ADD,
            Unary::Sub => SUB,
            Unary::Jro => JRO,
        }
    }
}

impl Binary {
    pub fn mnemonic(self) -> &'static str {
        match self {
            Binary::Mov => MOV,
        }
    }
}

impl Jump {
    pub fn mnemonic(self) -> &'static str {
        match self {
            Jump::Jmp => JMP,
            Jump::Jez => JEZ,
            Jump::Jnz => JNZ,
            Jump::Jgz => JGZ,
            Jump::Jlz => JLZ,
        }
    }

    /// Whether the jump is taken for the given accumulator value.
    pub fn taken(self, acc: i64) -> bool {
        match self {
            Jump::Jmp => true,
            Jump::Jez => acc == 0,
            Jump::Jnz => acc != 0,
            Jump::Jgz => acc > 0,
            Jump::Jlz => acc < 0,
        }
    }
}

/// A single instruction, grouped by the shape of its operands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Instruction {
    Singleton(Singleton),
    Unary(Unary, Operand),
    Binary(Binary, Operand, Register),
    Jump(Jump, usize),
}

impl Instruction {
    /// Every port this instruction reads from or writes to.
    pub fn ports(&self) -> Vec<Port> {
        match self {
            Instruction::Singleton(_) | Instruction::Jump(..) => Vec::new(),
            Instruction::Unary(_, src) => src.port().into_iter().collect(),
            Instruction::Binary(_, src, dst) => {
                src.port().into_iter().chain(dst.port()).collect()
            }
        }
    }

    pub fn jump_target(&self) -> Option<usize> {
        match self {
            Instruction::Jump(_, t) => Some(*t),
            _ => None,
        }
    }
}

impl Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Instruction::Singleton(op) => write!(f, "{}", op.mnemonic()),
            Instruction::Unary(op, a) => write!(f, "{} {}", op.mnemonic(), a),
            Instruction::Binary(op, a, b) => {
                write!(f, "{} {}, {}", op.mnemonic(), a, b)
            }
            Instruction::Jump(op, t) => write!(f, "{} {}", op.mnemonic(), t),
        }
    }
}

/// Immutable sequence of instructions. A new program replaces an old one
/// wholesale; there are no in-place edits.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Program(Vec<Instruction>);

impl Program {
    pub fn new(instructions: Vec<Instruction>) -> Program {
        Program(instructions)
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&Instruction> {
        self.0.get(idx)
    }

    pub fn into_instructions(self) -> Vec<Instruction> {
        self.0
    }
}

impl From<Vec<Instruction>> for Program {
    fn from(instructions: Vec<Instruction>) -> Program {
        Program(instructions)
    }
}

impl Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (idx, instruction) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{}", instruction)?;
        }
        Ok(())
    }
}

/// Renders label-free source, jump targets as absolute indices.
pub fn decompile(program: &Program) -> String {
    program.to_string()
}
