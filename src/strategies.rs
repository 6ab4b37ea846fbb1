// `proptest` generators for programs, shared by the compiler and optimizer
// tests.

use crate::language::*;
use proptest::prelude::*;
use proptest::sample::select;

pub fn arb_register() -> impl Strategy<Value = Register> {
    select(Register::ALL.to_vec())
}

pub fn arb_operand() -> impl Strategy<Value = Operand> {
    prop_oneof![
        any::<i64>().prop_map(Operand::Immediate),
        arb_register().prop_map(Operand::Register),
    ]
}

/// Instructions with jump targets below `max_target`.
pub fn arb_instruction(max_target: usize) -> impl Strategy<Value = Instruction> {
    prop_oneof![
        select(vec![Singleton::Nop, Singleton::Neg, Singleton::Sav, Singleton::Swp])
            .prop_map(Instruction::Singleton),
        (select(vec![Unary::Add, Unary::Sub, Unary::Jro]), arb_operand())
            .prop_map(|(op, a)| Instruction::Unary(op, a)),
        (arb_operand(), arb_register())
            .prop_map(|(a, b)| Instruction::Binary(Binary::Mov, a, b)),
        (
            select(vec![Jump::Jmp, Jump::Jez, Jump::Jnz, Jump::Jgz, Jump::Jlz]),
            0..max_target.max(1)
        )
            .prop_map(|(op, t)| Instruction::Jump(op, t)),
    ]
}

pub fn arb_program(max_len: usize) -> impl Strategy<Value = Program> {
    prop::collection::vec(arb_instruction(max_len), 0..=max_len).prop_map(Program::new)
}

/// Programs without port traffic and without `JRO`, drawn from a small
/// pool of immediates so that the peephole rules fire often.
pub fn arb_local_program(max_len: usize) -> impl Strategy<Value = Program> {
    let small = (-3i64..=3).prop_map(Operand::Immediate);
    let local_src = prop_oneof![
        small,
        Just(Operand::Register(Register::Acc)),
        Just(Operand::Register(Register::Nil)),
    ];
    let local_dst = select(vec![Register::Acc, Register::Nil]);
    let instruction = prop_oneof![
        select(vec![Singleton::Nop, Singleton::Neg, Singleton::Sav, Singleton::Swp])
            .prop_map(Instruction::Singleton),
        (select(vec![Unary::Add, Unary::Sub]), local_src.clone())
            .prop_map(|(op, a)| Instruction::Unary(op, a)),
        (local_src, local_dst).prop_map(|(a, b)| Instruction::Binary(Binary::Mov, a, b)),
        (
            select(vec![Jump::Jmp, Jump::Jez, Jump::Jnz, Jump::Jgz, Jump::Jlz]),
            0..max_len.max(1)
        )
            .prop_map(|(op, t)| Instruction::Jump(op, t)),
    ];
    prop::collection::vec(instruction, 0..=max_len).prop_map(Program::new)
}
