use lingo_compiler::ast::TheId;
use lingo_compiler::compile;
use lingo_core::value::Value;
use lingo_vm::{Host, HostValue, Vm};

/// Host that records every `put` line and answers environment
/// queries with fixed values.
pub struct CaptureHost {
    pub lines: Vec<String>,
}

impl CaptureHost {
    pub fn new() -> Self {
        CaptureHost { lines: Vec::new() }
    }
}

impl Host for CaptureHost {
    fn put(&mut self, text: &str) {
        self.lines.push(text.to_string());
    }

    fn the(&mut self, id: TheId) -> HostValue {
        match id {
            TheId::MoviePath => HostValue::Str("/movie".to_string()),
            TheId::Frame => HostValue::Int(12),
            TheId::DirSeparator => HostValue::Str("/".to_string()),
            TheId::Milliseconds => HostValue::Int(1000),
            TheId::RandomSeed => HostValue::Int(4),
            TheId::Platform => HostValue::Str("test".to_string()),
        }
    }
}

/// Compile a script and run its `main` handler against a fresh
/// receiver, returning the captured `put` lines.
pub fn run_lingo(source: &str) -> Vec<String> {
    let script = compile(source.as_bytes(), true)
        .unwrap_or_else(|e| panic!("compile error: error {e}"));
    let mut vm = Vm::new();
    let sid = vm.load_script(&script);
    let recv = vm.new_instance(sid);
    let mut host = CaptureHost::new();
    vm.call_handler(&mut host, recv, "main", &[])
        .unwrap_or_else(|e| panic!("runtime error: {e}"));
    host.lines
}

/// Compile and run `main`, returning its return value along with the
/// VM (for inspecting heap state).
pub fn run_lingo_result(source: &str) -> (Value, Vm) {
    let script = compile(source.as_bytes(), true)
        .unwrap_or_else(|e| panic!("compile error: error {e}"));
    let mut vm = Vm::new();
    let sid = vm.load_script(&script);
    let recv = vm.new_instance(sid);
    let mut host = CaptureHost::new();
    let value = vm
        .call_handler(&mut host, recv, "main", &[])
        .unwrap_or_else(|e| panic!("runtime error: {e}"));
    (value, vm)
}

/// Compile and run `main`, expecting a runtime error; returns its
/// message.
pub fn run_lingo_err(source: &str) -> String {
    let script = compile(source.as_bytes(), true)
        .unwrap_or_else(|e| panic!("compile error: error {e}"));
    let mut vm = Vm::new();
    let sid = vm.load_script(&script);
    let recv = vm.new_instance(sid);
    let mut host = CaptureHost::new();
    match vm.call_handler(&mut host, recv, "main", &[]) {
        Err(e) => e.to_string(),
        Ok(v) => panic!("expected a runtime error, got {v:?}"),
    }
}

/// Assert that running `main` prints exactly these lines.
pub fn check_output(source: &str, expected: &[&str]) {
    let lines = run_lingo(source);
    assert_eq!(
        lines, expected,
        "output mismatch for source:\n{source}"
    );
}
