// Peephole optimizer.
//
// Looks at a window of one or two instructions, rewrites it when a rule
// matches and looks at the same position again. Full passes are repeated
// until nothing changes. Operands that touch a port are never rewritten:
// a port read or write blocks and is observable by the neighbour.

use crate::language::*;
use tracing::debug;

enum Rewrite {
    /// Replace the first instruction of the window.
    Replace(Instruction),
    /// Drop the first instruction of the window.
    Remove,
    /// Replace the whole two-instruction window by one instruction.
    Merge(Instruction),
    /// Drop the whole two-instruction window.
    RemoveBoth,
}

const ZERO_ACC: Instruction =
    Instruction::Binary(Binary::Mov, Operand::Immediate(0), Register::Acc);

pub fn optimize(program: &Program) -> Program {
    let mut code = program.instructions().to_vec();

    // `JRO` jumps relative to its own position, so nothing may move.
    let relocatable = !code
        .iter()
        .any(|i| matches!(i, Instruction::Unary(Unary::Jro, _)));

    let len = code.len();
    for instruction in code.iter_mut() {
        if let Instruction::Jump(_, t) = instruction {
            *t %= len;
        }
    }

    let mut passes = 1;
    while pass(&mut code, relocatable) {
        passes += 1;
    }
    debug!(before = len, after = code.len(), passes, "optimized program");
    Program::new(code)
}

/// One left-to-right sweep. Returns whether anything changed.
fn pass(code: &mut Vec<Instruction>, relocatable: bool) -> bool {
    let mut changed = false;
    let mut i = 0;
    while i < code.len() {
        match rewrite_at(code, i, relocatable) {
            Some(rewrite) => {
                changed = true;
                match rewrite {
                    Rewrite::Replace(instruction) => code[i] = instruction,
                    Rewrite::Remove => remove(code, i),
                    Rewrite::Merge(instruction) => {
                        code[i] = instruction;
                        remove(code, i + 1);
                    }
                    Rewrite::RemoveBoth => {
                        remove(code, i + 1);
                        remove(code, i);
                    }
                }
            }
            None => i += 1,
        }
    }
    changed
}

fn rewrite_at(code: &[Instruction], i: usize, relocatable: bool) -> Option<Rewrite> {
    use Operand::{Immediate, Register as Reg};

    let first = code[i];
    match first {
        Instruction::Unary(Unary::Sub, Immediate(v)) => {
            return Some(Rewrite::Replace(Instruction::Unary(
                Unary::Add,
                Immediate(v.wrapping_neg()),
            )))
        }
        Instruction::Unary(Unary::Sub, Reg(Register::Acc)) => {
            return Some(Rewrite::Replace(ZERO_ACC))
        }
        Instruction::Binary(Binary::Mov, Reg(Register::Nil), Register::Acc) => {
            return Some(Rewrite::Replace(ZERO_ACC))
        }
        _ => {}
    }

    if !relocatable {
        return None;
    }

    match first {
        Instruction::Binary(Binary::Mov, Reg(Register::Nil), Register::Nil)
        | Instruction::Binary(Binary::Mov, Reg(Register::Acc), Register::Nil)
        | Instruction::Binary(Binary::Mov, Reg(Register::Acc), Register::Acc) => {
            return Some(Rewrite::Remove)
        }
        _ => {}
    }

    let second = *code.get(i + 1)?;
    // control may enter the window in the middle
    if code.iter().any(|c| c.jump_target() == Some(i + 1)) {
        return None;
    }

    match (first, second) {
        (
            Instruction::Unary(Unary::Add, Immediate(a)),
            Instruction::Unary(Unary::Add, Immediate(b)),
        ) => Some(Rewrite::Merge(Instruction::Unary(
            Unary::Add,
            Immediate(a.wrapping_add(b)),
        ))),
        (
            Instruction::Binary(Binary::Mov, Immediate(_), Register::Acc),
            Instruction::Binary(Binary::Mov, Immediate(_), Register::Acc),
        ) => Some(Rewrite::Merge(second)),
        (
            Instruction::Singleton(Singleton::Swp),
            Instruction::Singleton(Singleton::Swp),
        )
        | (
            Instruction::Singleton(Singleton::Neg),
            Instruction::Singleton(Singleton::Neg),
        ) => Some(Rewrite::RemoveBoth),
        _ => None,
    }
}

/// Removes instruction `k` and keeps every jump pointing at the same code.
/// A jump to the removed instruction lands on its successor.
fn remove(code: &mut Vec<Instruction>, k: usize) {
    code.remove(k);
    let len = code.len();
    for instruction in code.iter_mut() {
        if let Instruction::Jump(_, t) = instruction {
            if *t > k {
                *t -= 1;
            }
            if len > 0 {
                *t %= len;
            }
        }
    }
}
