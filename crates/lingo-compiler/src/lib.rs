//! Lingo front end: lexer, parser with scope resolution, bytecode
//! emitter, the relocatable chunk format, and a disassembler.

pub mod ast;
pub mod chunk;
pub mod disasm;
pub mod emit;
pub mod lexer;
pub mod opcode;
pub mod parser;
pub mod token;

use std::fmt;

/// Any compile-stage failure, with its source position.
#[derive(Clone, Debug)]
pub enum CompileError {
    Lex(lexer::LexError),
    Parse(parser::ParseError),
    Emit(emit::EmitError),
}

impl CompileError {
    pub fn pos(&self) -> token::Pos {
        match self {
            CompileError::Lex(e) => e.pos,
            CompileError::Parse(e) => e.pos,
            CompileError::Emit(e) => e.pos,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            CompileError::Lex(e) => &e.message,
            CompileError::Parse(e) => &e.message,
            CompileError::Emit(e) => &e.message,
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pos = self.pos();
        write!(f, "{}:{}: {}", pos.line, pos.column, self.message())
    }
}

impl std::error::Error for CompileError {}

impl From<lexer::LexError> for CompileError {
    fn from(e: lexer::LexError) -> Self {
        CompileError::Lex(e)
    }
}

impl From<parser::ParseError> for CompileError {
    fn from(e: parser::ParseError) -> Self {
        CompileError::Parse(e)
    }
}

impl From<emit::EmitError> for CompileError {
    fn from(e: emit::EmitError) -> Self {
        CompileError::Emit(e)
    }
}

/// Compile a whole script: lex, parse, emit one chunk per handler.
pub fn compile(source: &[u8], line_numbers: bool) -> Result<emit::CompiledScript, CompileError> {
    let tokens = lexer::lex(source)?;
    let root = parser::parse(&tokens)?;
    let script = emit::emit_script(&root, &emit::EmitOptions { line_numbers })?;
    Ok(script)
}
