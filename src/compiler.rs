// Text to `Program` translation.
//
// The upper-cased source is split into tokens line by line. Every line holds
// any number of `LABEL:` prefixes followed by at most one instruction. Labels
// are resolved in a second pass, once the index of every instruction is known.

use crate::error::CompileError;
use crate::labels::LabelTable;
use crate::language::*;
use crate::lexer::{lex_lines, Token};
use chumsky::prelude::*;
use tracing::debug;

type ParseError<'a> = Rich<'a, Token<'a>>;

/// A compiled program together with the source line (0-based) that every
/// instruction came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Compilation {
    pub program: Program,
    pub line_map: Vec<usize>,
}

/// Jump whose target is not known until all labels have been seen.
enum Parsed {
    Ready(Instruction),
    LabelJump(Jump, String),
}

enum Item {
    Label { name: String, line: usize },
    Instruction { parsed: Parsed, line: usize },
}

/// Labels of a line, then its mnemonic and operands.
struct Line<'a> {
    labels: Vec<Token<'a>>,
    instruction: Option<(Token<'a>, Vec<Token<'a>>)>,
}

pub fn compile(source: &str) -> Result<Compilation, CompileError> {
    let upper = source.to_uppercase();
    let items = parse(&upper)?;
    let compilation = link(items)?;
    debug!(
        instructions = compilation.program.len(),
        "compiled program"
    );
    Ok(compilation)
}

/// `LABEL:`* (MNEMONIC (OPERAND (`,` OPERAND)*)?)?
///
/// Operands are any single token but a separator; what is valid where is
/// checked once the shape of the line is known.
fn line<'a>() -> impl Parser<'a, &'a [Token<'a>], Line<'a>, extra::Err<ParseError<'a>>> + Clone {
    let word = any().filter(Token::is_word);
    let operand = any().filter(|t: &Token<'a>| !matches!(t, Token::Colon | Token::Comma));
    let label = word.clone().then_ignore(just(Token::Colon));
    let instruction = word.then(
        operand
            .separated_by(just(Token::Comma))
            .collect::<Vec<_>>(),
    );

    label
        .repeated()
        .collect::<Vec<_>>()
        .then(instruction.or_not())
        .then_ignore(end())
        .map(|(labels, instruction)| Line {
            labels,
            instruction,
        })
}

fn parse(source: &str) -> Result<Vec<Item>, CompileError> {
    let lines = lex_lines(source)?;
    let parser = line();
    let mut items = Vec::new();
    for (idx, tokens) in lines.iter().enumerate() {
        let line_no = idx + 1;
        let parsed = parser
            .parse(tokens.as_slice())
            .into_result()
            .map_err(|errors| syntax_error(&errors, line_no))?;
        for label in parsed.labels.iter() {
            items.push(Item::Label {
                name: label_name(label, line_no)?.to_string(),
                line: idx,
            });
        }
        if let Some((mnemonic, operands)) = parsed.instruction {
            items.push(Item::Instruction {
                parsed: parse_instruction(mnemonic, &operands, line_no)?,
                line: idx,
            });
        }
    }
    Ok(items)
}

fn syntax_error(errors: &[ParseError<'_>], line: usize) -> CompileError {
    let message = match errors.first().and_then(|e| e.found()) {
        Some(token) => format!("unexpected `{}`", token),
        None => "unexpected end of line".to_string(),
    };
    CompileError::Syntax { line, message }
}

/// Strips labels, resolves label references and records the line map.
fn link(items: Vec<Item>) -> Result<Compilation, CompileError> {
    let mut labels = LabelTable::new();
    let mut next_index = 0;
    for item in items.iter() {
        match item {
            Item::Label { name, line } => {
                labels.define(name, next_index, line + 1)?
            }
            Item::Instruction { .. } => next_index += 1,
        }
    }

    let mut instructions = Vec::with_capacity(next_index);
    let mut line_map = Vec::with_capacity(next_index);
    for item in items.into_iter() {
        if let Item::Instruction { parsed, line } = item {
            let instruction = match parsed {
                Parsed::Ready(i) => i,
                Parsed::LabelJump(op, name) => {
                    Instruction::Jump(op, labels.resolve(&name, line + 1)?)
                }
            };
            instructions.push(instruction);
            line_map.push(line);
        }
    }

    Ok(Compilation {
        program: Program::new(instructions),
        line_map,
    })
}

fn label_name<'a>(token: &Token<'a>, line: usize) -> Result<&'a str, CompileError> {
    match token.label_name() {
        Some(name) => Ok(name),
        None => Err(CompileError::Syntax {
            line,
            message: format!("register name `{}` cannot be used as a label", token),
        }),
    }
}

fn parse_instruction(
    mnemonic: Token,
    operands: &[Token],
    line: usize,
) -> Result<Parsed, CompileError> {
    let parsed = match mnemonic {
        Token::Singleton(op) => {
            expect_arity(op.mnemonic(), 0, operands, line)?;
            Parsed::Ready(Instruction::Singleton(op))
        }
        Token::Unary(op) => {
            expect_arity(op.mnemonic(), 1, operands, line)?;
            let a = source_operand(op.mnemonic(), &operands[0], line)?;
            Parsed::Ready(Instruction::Unary(op, a))
        }
        Token::Binary(op) => {
            expect_arity(op.mnemonic(), 2, operands, line)?;
            let src = source_operand(op.mnemonic(), &operands[0], line)?;
            let dst = match operands[1] {
                Token::Register(r) => r,
                ref other => return Err(invalid_operand(op.mnemonic(), other, line)),
            };
            Parsed::Ready(Instruction::Binary(op, src, dst))
        }
        Token::Jump(op) => {
            expect_arity(op.mnemonic(), 1, operands, line)?;
            jump(op, &operands[0], line)?
        }
        unknown => {
            return Err(CompileError::UnknownInstruction {
                line,
                mnemonic: unknown.to_string(),
            })
        }
    };
    Ok(parsed)
}

fn expect_arity(
    mnemonic: &'static str,
    expected: usize,
    operands: &[Token],
    line: usize,
) -> Result<(), CompileError> {
    if operands.len() == expected {
        Ok(())
    } else {
        Err(CompileError::Arity {
            line,
            mnemonic,
            expected,
            got: operands.len(),
        })
    }
}

fn invalid_operand(mnemonic: &'static str, operand: &Token, line: usize) -> CompileError {
    CompileError::InvalidOperand {
        line,
        mnemonic,
        operand: operand.to_string(),
    }
}

fn source_operand(
    mnemonic: &'static str,
    token: &Token,
    line: usize,
) -> Result<Operand, CompileError> {
    match *token {
        Token::Number(text) => text
            .parse()
            .map(Operand::Immediate)
            .map_err(|_| invalid_operand(mnemonic, token, line)),
        Token::Register(r) => Ok(Operand::Register(r)),
        _ => Err(invalid_operand(mnemonic, token, line)),
    }
}

/// A jump target is an instruction index or a label name.
fn jump(op: Jump, target: &Token, line: usize) -> Result<Parsed, CompileError> {
    match *target {
        Token::Number(text) => text
            .parse()
            .map(|index| Parsed::Ready(Instruction::Jump(op, index)))
            .map_err(|_| invalid_operand(op.mnemonic(), target, line)),
        _ => match target.label_name() {
            Some(name) => Ok(Parsed::LabelJump(op, name.to_string())),
            None => Err(invalid_operand(op.mnemonic(), target, line)),
        },
    }
}
