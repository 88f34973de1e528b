//! The embedder-facing seam.
//!
//! The VM reaches the host application for the `put` sink, `the X`
//! environment queries, and the `member`/`sprite` constructors. The
//! rest of the runtime (globals, handler namespace, container
//! intrinsics) is owned by the VM itself.

use lingo_compiler::ast::TheId;
use std::time::Instant;

/// Scalar values crossing the host boundary. Containers never cross
/// it; a richer embedder wraps them on its own side.
#[derive(Clone, Debug, PartialEq)]
pub enum HostValue {
    Void,
    Int(i32),
    Float(f64),
    Str(String),
}

pub trait Host {
    /// Sink for the `PUT` opcode. `text` is the stringified value,
    /// without a trailing newline.
    fn put(&mut self, text: &str);

    /// Answer a `the X` query.
    fn the(&mut self, id: TheId) -> HostValue;

    /// Construct a cast-member reference.
    fn member(&mut self, _args: &[HostValue]) -> Result<HostValue, String> {
        Err("no movie is attached to this host".to_string())
    }

    /// Construct a sprite reference.
    fn sprite(&mut self, _args: &[HostValue]) -> Result<HostValue, String> {
        Err("no movie is attached to this host".to_string())
    }
}

/// Standalone host: `put` goes to stdout and environment queries are
/// answered from the process.
pub struct StdHost {
    start: Instant,
    pub random_seed: i32,
}

impl StdHost {
    pub fn new() -> Self {
        let seed = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.subsec_nanos() as i32)
            .unwrap_or(0);
        StdHost {
            start: Instant::now(),
            random_seed: seed,
        }
    }
}

impl Default for StdHost {
    fn default() -> Self {
        Self::new()
    }
}

impl Host for StdHost {
    fn put(&mut self, text: &str) {
        println!("{text}");
    }

    fn the(&mut self, id: TheId) -> HostValue {
        match id {
            TheId::MoviePath => HostValue::Str(
                std::env::current_dir()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default(),
            ),
            TheId::Frame => HostValue::Int(1),
            TheId::DirSeparator => {
                if cfg!(windows) {
                    HostValue::Str("\\".to_string())
                } else {
                    HostValue::Str("/".to_string())
                }
            }
            TheId::Milliseconds => HostValue::Int(self.start.elapsed().as_millis() as i32),
            TheId::RandomSeed => HostValue::Int(self.random_seed),
            TheId::Platform => HostValue::Str(std::env::consts::OS.to_string()),
        }
    }
}
