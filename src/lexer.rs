// Token layer of the assembly dialect.
//
// Sources are upper-cased before they are lexed, so only the canonical
// spellings from `mnemonics.rs` appear below. Line breaks are tokens: the
// compiler works line by line and reports errors by line.

use crate::error::CompileError;
use crate::language::{Binary, Jump, Port, Register, Singleton, Unary};
use logos::Logos;
use std::fmt;

#[derive(Logos, Clone, Copy, Debug, PartialEq, Eq)]
#[logos(skip r"[ \t\r\f]+")]
pub enum Token<'src> {
    #[regex(r"#[^\n]*", logos::skip, allow_greedy = true)]
    Comment,

    #[token("NOP", |_| Singleton::Nop)]
    #[token("NEG", |_| Singleton::Neg)]
    #[token("SAV", |_| Singleton::Sav)]
    #[token("SWP", |_| Singleton::Swp)]
    Singleton(Singleton),

    #[token("ADD", |_| Unary::Add)]
    #[token("SUB", |_| Unary::Sub)]
    #[token("JRO", |_| Unary::Jro)]
    Unary(Unary),

    #[token("MOV", |_| Binary::Mov)]
    Binary(Binary),

    #[token("JMP", |_| Jump::Jmp)]
    #[token("JEZ", |_| Jump::Jez)]
    #[token("JNZ", |_| Jump::Jnz)]
    #[token("JGZ", |_| Jump::Jgz)]
    #[token("JLZ", |_| Jump::Jlz)]
    Jump(Jump),

    #[token("LEFT", |_| Register::Port(Port::Left))]
    #[token("RIGHT", |_| Register::Port(Port::Right))]
    #[token("UP", |_| Register::Port(Port::Up))]
    #[token("DOWN", |_| Register::Port(Port::Down))]
    #[token("ACC", |_| Register::Acc)]
    #[token("NIL", |_| Register::Nil)]
    Register(Register),

    #[regex(r"-?[0-9]+", |lex| lex.slice())]
    Number(&'src str),

    #[regex(r"[A-Z][A-Z0-9]*", |lex| lex.slice())]
    Ident(&'src str),

    #[token(":")]
    Colon,

    #[token(",")]
    Comma,

    #[token("\n")]
    Newline,
}

impl<'src> Token<'src> {
    /// Name this token stands for when it is used as a label. Mnemonics are
    /// valid label names, registers are not.
    pub fn label_name(&self) -> Option<&'src str> {
        match *self {
            Token::Ident(name) => Some(name),
            Token::Singleton(op) => Some(op.mnemonic()),
            Token::Unary(op) => Some(op.mnemonic()),
            Token::Binary(op) => Some(op.mnemonic()),
            Token::Jump(op) => Some(op.mnemonic()),
            _ => None,
        }
    }

    pub fn is_word(&self) -> bool {
        self.label_name().is_some() || matches!(self, Token::Register(_))
    }
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Token::Comment => f.write_str("#"),
            Token::Singleton(op) => f.write_str(op.mnemonic()),
            Token::Unary(op) => f.write_str(op.mnemonic()),
            Token::Binary(op) => f.write_str(op.mnemonic()),
            Token::Jump(op) => f.write_str(op.mnemonic()),
            Token::Register(r) => r.fmt(f),
            Token::Number(text) | Token::Ident(text) => f.write_str(text),
            Token::Colon => f.write_str(":"),
            Token::Comma => f.write_str(","),
            Token::Newline => f.write_str("end of line"),
        }
    }
}

/// Splits upper-cased source into the tokens of each line. Entry `i` holds
/// line `i` (0-based), without its line break.
pub fn lex_lines(source: &str) -> Result<Vec<Vec<Token<'_>>>, CompileError> {
    let mut lexer = Token::lexer(source);
    let mut lines = vec![Vec::new()];
    while let Some(result) = lexer.next() {
        match result {
            Ok(Token::Newline) => lines.push(Vec::new()),
            Ok(token) => {
                if let Some(line) = lines.last_mut() {
                    line.push(token);
                }
            }
            Err(()) => {
                return Err(CompileError::Syntax {
                    line: lines.len(),
                    message: format!("unexpected `{}`", lexer.slice()),
                })
            }
        }
    }
    Ok(lines)
}
