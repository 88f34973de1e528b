//! Runtime error type.

use std::fmt;

/// A runtime failure. Execution is aborted, the call stack unwound,
/// and the offending handler plus instruction index attached so the
/// embedder can format a location from the debug records.
#[derive(Clone, Debug)]
pub struct RuntimeError {
    pub message: String,
    /// Name of the handler that was executing.
    pub handler: Option<String>,
    /// Index of the faulting instruction.
    pub instr_index: Option<u32>,
    /// Source line, when the chunk carried debug records.
    pub line: Option<u32>,
}

impl RuntimeError {
    pub fn new(message: impl Into<String>) -> Self {
        RuntimeError {
            message: message.into(),
            handler: None,
            instr_index: None,
            line: None,
        }
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.handler, self.line) {
            (Some(handler), Some(line)) => {
                write!(f, "in {handler} at line {line}: {}", self.message)
            }
            (Some(handler), None) => write!(f, "in {handler}: {}", self.message),
            _ => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for RuntimeError {}
