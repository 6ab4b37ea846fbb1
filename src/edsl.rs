// Small test-only DSL for writing programs as Rust tokens.
//
//     program! { (mov up, acc) (add (-1)) (jgz 0) }
//
// Negative immediates must be parenthesized, every other operand is a
// single token.

macro_rules! program {
    ($($i: tt)*) => {
        $crate::language::Program::new(vec![$(instruction!($i)),*])
    };
}

macro_rules! instruction {
    ((nop)) => { singleton!(Nop) };
    ((neg)) => { singleton!(Neg) };
    ((sav)) => { singleton!(Sav) };
    ((swp)) => { singleton!(Swp) };
    ((add $a: tt)) => { unary!(Add, $a) };
    ((sub $a: tt)) => { unary!(Sub, $a) };
    ((jro $a: tt)) => { unary!(Jro, $a) };
    ((mov $a: tt, $b: tt)) => {
        $crate::language::Instruction::Binary(
            $crate::language::Binary::Mov,
            operand!($a),
            register!($b),
        )
    };
    ((jmp $t: expr)) => { jump!(Jmp, $t) };
    ((jez $t: expr)) => { jump!(Jez, $t) };
    ((jnz $t: expr)) => { jump!(Jnz, $t) };
    ((jgz $t: expr)) => { jump!(Jgz, $t) };
    ((jlz $t: expr)) => { jump!(Jlz, $t) };
}

macro_rules! singleton {
    ($op: ident) => {
        $crate::language::Instruction::Singleton(
            $crate::language::Singleton::$op,
        )
    };
}

macro_rules! unary {
    ($op: ident, $a: tt) => {
        $crate::language::Instruction::Unary(
            $crate::language::Unary::$op,
            operand!($a),
        )
    };
}

macro_rules! jump {
    ($op: ident, $t: expr) => {
        $crate::language::Instruction::Jump($crate::language::Jump::$op, $t)
    };
}

macro_rules! register {
    (left) => { $crate::language::Register::Port($crate::language::Port::Left) };
    (right) => { $crate::language::Register::Port($crate::language::Port::Right) };
    (up) => { $crate::language::Register::Port($crate::language::Port::Up) };
    (down) => { $crate::language::Register::Port($crate::language::Port::Down) };
    (acc) => { $crate::language::Register::Acc };
    (nil) => { $crate::language::Register::Nil };
}

macro_rules! operand {
    (left) => { $crate::language::Operand::Register(register!(left)) };
    (right) => { $crate::language::Operand::Register(register!(right)) };
    (up) => { $crate::language::Operand::Register(register!(up)) };
    (down) => { $crate::language::Operand::Register(register!(down)) };
    (acc) => { $crate::language::Operand::Register(register!(acc)) };
    (nil) => { $crate::language::Operand::Register(register!(nil)) };
    ($v: expr) => { $crate::language::Operand::Immediate($v) };
}

#[cfg(test)]
mod tests {

    use crate::language::*;

    #[test]
    fn test_macro_singletons() {
        assert_eq!(instruction!((swp)), Instruction::Singleton(Singleton::Swp));
        assert_eq!(instruction!((nop)), Instruction::Singleton(Singleton::Nop));
    }

    #[test]
    fn test_macro_operands() {
        assert_eq!(operand!(acc), Operand::Register(Register::Acc));
        assert_eq!(operand!(42), Operand::Immediate(42));
        assert_eq!(operand!((-7)), Operand::Immediate(-7));
        assert_eq!(
            instruction!((mov up, nil)),
            Instruction::Binary(
                Binary::Mov,
                Operand::Register(Register::Port(Port::Up)),
                Register::Nil
            )
        );
    }

    #[test]
    fn test_macro_program() {
        let p = program! { (add 1) (jez 0) };
        assert_eq!(
            p.instructions(),
            &[
                Instruction::Unary(Unary::Add, Operand::Immediate(1)),
                Instruction::Jump(Jump::Jez, 0)
            ]
        );
    }
}
