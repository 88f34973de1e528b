//! Bytecode disassembler.
//!
//! Formats one instruction as `MNEMONIC op1 [op2] ; hint1[, hint2]`
//! where a hint renders the constant, local name, or `the` id an
//! operand refers to. Used by tests and the CLI's listing output; not
//! on any hot path.

use crate::ast::TheId;
use crate::chunk::{Chunk, ChunkConst};
use crate::opcode::{Hint, Instr, OperandFormat};
use std::fmt::Write;

/// Render a single instruction with operand hints from its chunk.
pub fn disasm_instr(chunk: &Chunk, instr: Instr) -> String {
    let mut out = String::new();
    let op = match instr.op() {
        Some(op) => op,
        None => {
            write!(out, "??({:#010x})", instr.raw()).unwrap();
            return out;
        }
    };

    let (hint_a, hint_b) = op.hints();
    let (a, b): (Option<i64>, Option<i64>) = match op.format() {
        OperandFormat::None => (None, None),
        OperandFormat::U16 => (Some(instr.a_u16() as i64), None),
        OperandFormat::I16 => (Some(instr.a_i16() as i64), None),
        OperandFormat::U8 => (Some(instr.a_u8() as i64), None),
        OperandFormat::U16U8 => (Some(instr.a_u16() as i64), Some(instr.b_u8() as i64)),
    };

    match (a, b) {
        (None, _) => write!(out, "{}", op.name()).unwrap(),
        (Some(a), None) => write!(out, "{:<12} {}", op.name(), a).unwrap(),
        (Some(a), Some(b)) => write!(out, "{:<12} {} {}", op.name(), a, b).unwrap(),
    }

    let ha = a.and_then(|v| render_hint(chunk, hint_a, v));
    let hb = b.and_then(|v| render_hint(chunk, hint_b, v));
    match (ha, hb) {
        (None, None) => {}
        (Some(h), None) => write!(out, " ; {h}").unwrap(),
        (None, Some(h)) => write!(out, " ; , {h}").unwrap(),
        (Some(h1), Some(h2)) => write!(out, " ; {h1}, {h2}").unwrap(),
    }
    out
}

fn render_hint(chunk: &Chunk, hint: Hint, value: i64) -> Option<String> {
    match hint {
        Hint::None => None,
        Hint::Const => match chunk.const_at(value as usize) {
            Some(ChunkConst::Int(v)) => Some(format!("{v}")),
            Some(ChunkConst::Float(v)) => Some(format!("{v}")),
            Some(ChunkConst::Str(bytes)) => {
                Some(format!("\"{}\"", String::from_utf8_lossy(bytes)))
            }
            Some(ChunkConst::Symbol(bytes)) => {
                Some(format!("#{}", String::from_utf8_lossy(bytes)))
            }
            None => Some("???".to_string()),
        },
        Hint::Local => chunk
            .local_name(value as usize)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
            .or_else(|| Some("???".to_string())),
        Hint::The => TheId::from_u8(value as u8)
            .map(|id| format!("the {}", id.name()))
            .or_else(|| Some("???".to_string())),
    }
}

/// Disassemble a whole chunk into a listing: a header line, the
/// numbered instruction stream, and the constant table.
pub fn disassemble(chunk: &Chunk, name: &str) -> String {
    let mut out = String::new();
    writeln!(
        out,
        "{name} ({} args, {} locals, {} consts, {} instrs)",
        chunk.nargs(),
        chunk.nlocals(),
        chunk.nconsts(),
        chunk.ninstr(),
    )
    .unwrap();

    for i in 0..chunk.ninstr() as usize {
        let instr = chunk.instr(i).unwrap();
        let line = chunk.line_for(i as u32);
        let line_str = match line {
            Some(l) => format!("[{l}]"),
            None => "[-]".to_string(),
        };
        writeln!(out, "\t{i}\t{line_str:>5}\t{}", disasm_instr(chunk, instr)).unwrap();
    }

    if chunk.nconsts() > 0 {
        writeln!(out, "constants ({}):", chunk.nconsts()).unwrap();
        for k in 0..chunk.nconsts() as usize {
            let rendered = match chunk.const_at(k).unwrap() {
                ChunkConst::Int(v) => format!("{v}"),
                ChunkConst::Float(v) => format!("{v}"),
                ChunkConst::Str(bytes) => format!("\"{}\"", String::from_utf8_lossy(bytes)),
                ChunkConst::Symbol(bytes) => format!("#{}", String::from_utf8_lossy(bytes)),
            };
            writeln!(out, "\t{k}\t{rendered}").unwrap();
        }
    }
    out
}
