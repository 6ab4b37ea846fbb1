// Spellings of the assembly dialect.
//
// Sketch of a source line:
//
//    LOOP: MOV UP, ACC   # comment
//    ^^^^  ^^^ ^^^^^^^   ^^^^^^^^^
//    label op  operands  ignored
//
// Everything is matched after upper-casing the line, so the table lists the
// canonical (upper-case) spelling only. The decompiler emits exactly these
// spellings, which is what makes `compile(decompile(p)) == p` hold.
//
// The table is included by `language.rs`, where the `mnemonic!` and
// `register_name!` macros turn every row into a `&str` constant that can be
// used both in `match` patterns (parser) and in `Display` impls (decompiler).

// <TABLE-START> singleton operations (no operand)
mnemonic!(NOP, "NOP");
mnemonic!(NEG, "NEG");
mnemonic!(SAV, "SAV");
mnemonic!(SWP, "SWP");
// unary operations (one operand, immediate or register)
mnemonic!(ADD, "ADD");
mnemonic!(SUB, "SUB");
mnemonic!(JRO, "JRO");
// binary operations (source operand, destination register)
mnemonic!(MOV, "MOV");
// jumps (absolute instruction index or label)
mnemonic!(JMP, "JMP");
mnemonic!(JEZ, "JEZ");
mnemonic!(JNZ, "JNZ");
mnemonic!(JGZ, "JGZ");
mnemonic!(JLZ, "JLZ");
// registers
register_name!(LEFT, "LEFT");
register_name!(RIGHT, "RIGHT");
register_name!(UP, "UP");
register_name!(DOWN, "DOWN");
register_name!(ACC, "ACC");
register_name!(NIL, "NIL");
// <TABLE-END>
