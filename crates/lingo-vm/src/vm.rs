//! The interpreter.
//!
//! One VM executes one chunk at a time on a fixed 256-slot value
//! stack and a 256-deep frame stack. Symbols are interned per VM, so
//! symbol equality crosses chunk boundaries. Globals are a
//! symbol-keyed map owned by the VM; properties are slots on the
//! receiver object in frame slot 0.
//!
//! Call protocol: a callee's frame region starts at `stack_base`,
//! slot 0 holding the receiver. `CALL` lets the pushed arguments
//! become the leading slots (synthesising the caller's receiver when
//! no argument was pushed); `OCALL` takes the receiver from the slot
//! below the arguments. Missing parameters are void, extra arguments
//! are dropped.

use crate::arith::{self, ArithOp};
use crate::compare;
use crate::error::RuntimeError;
use crate::fmt::format_value;
use crate::frame::Frame;
use crate::host::Host;
use crate::intrinsics;
use lingo_compiler::ast::TheId;
use lingo_compiler::chunk::{Chunk, ChunkConst};
use lingo_compiler::emit::{CompiledScript, MAX_STACK};
use lingo_compiler::opcode::Op;
use lingo_core::heap::Heap;
use lingo_core::intern::{SymbolId, SymbolTable};
use lingo_core::object::{LinearList, PropList};
use lingo_core::value::Value;
use std::collections::HashMap;

/// Maximum call depth.
pub const MAX_FRAMES: usize = 256;

/// Handle to a script loaded into a VM.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScriptId(pub u32);

struct LoadedScript {
    names: Vec<String>,
    chunks: Vec<Chunk>,
    by_name: HashMap<SymbolId, usize>,
    properties: Vec<SymbolId>,
}

pub struct Vm {
    stack: Vec<Value>,
    frames: Vec<Frame>,
    pub symbols: SymbolTable,
    pub heap: Heap,
    globals: HashMap<SymbolId, Value>,
    scripts: Vec<LoadedScript>,
    /// Receivers created through [`Vm::new_instance`]; kept as GC
    /// roots so an instance survives even while it is only held by
    /// the embedder.
    instances: Vec<Value>,
    /// When set, reading an unset global is a runtime error instead
    /// of void.
    pub strict_globals: bool,
}

impl Vm {
    pub fn new() -> Self {
        Vm {
            stack: Vec::with_capacity(MAX_STACK as usize),
            frames: Vec::new(),
            symbols: SymbolTable::new(),
            heap: Heap::new(),
            globals: HashMap::new(),
            scripts: Vec::new(),
            instances: Vec::new(),
            strict_globals: false,
        }
    }

    /// Register a compiled script's handlers in this VM's namespace.
    pub fn load_script(&mut self, compiled: &CompiledScript) -> ScriptId {
        let mut names = Vec::with_capacity(compiled.handlers.len());
        let mut chunks = Vec::with_capacity(compiled.handlers.len());
        let mut by_name = HashMap::new();
        for (i, handler) in compiled.handlers.iter().enumerate() {
            let sym = self.symbols.intern(handler.name.as_bytes());
            names.push(handler.name.clone());
            chunks.push(handler.chunk.clone());
            by_name.insert(sym, i);
        }
        let properties = compiled
            .properties
            .iter()
            .map(|p| self.symbols.intern(p.as_bytes()))
            .collect();
        let id = ScriptId(self.scripts.len() as u32);
        self.scripts.push(LoadedScript {
            names,
            chunks,
            by_name,
            properties,
        });
        id
    }

    /// Create a receiver for a script: a property list with the
    /// script attached and one void slot per declared property.
    pub fn new_instance(&mut self, script: ScriptId) -> Value {
        let mut plist = PropList::new();
        plist.script = Some(script.0);
        for &prop in &self.scripts[script.0 as usize].properties {
            plist.set(prop, Value::Void);
        }
        let idx = self.heap.alloc_prop_list(plist);
        let value = Value::PropList(idx);
        self.instances.push(value);
        value
    }

    pub fn has_handler(&self, name: &str) -> bool {
        let lname = name.to_ascii_lowercase();
        match self.symbols.find(lname.as_bytes()) {
            Some(sym) => self.scripts.iter().any(|s| s.by_name.contains_key(&sym)),
            None => false,
        }
    }

    pub fn set_global(&mut self, name: &str, value: Value) {
        let sym = self.symbols.intern(name.to_ascii_lowercase().as_bytes());
        self.globals.insert(sym, value);
    }

    pub fn global(&self, name: &str) -> Option<Value> {
        let sym = self.symbols.find(name.to_ascii_lowercase().as_bytes())?;
        self.globals.get(&sym).copied()
    }

    /// Invoke a handler by name. The receiver lands in slot 0 and the
    /// arguments in the following parameter slots. Returns the
    /// handler's return value.
    pub fn call_handler(
        &mut self,
        host: &mut dyn Host,
        receiver: Value,
        name: &str,
        args: &[Value],
    ) -> Result<Value, RuntimeError> {
        let lname = name.to_ascii_lowercase();
        let name_sym = self.symbols.intern(lname.as_bytes());
        let hint = self.script_of(receiver);
        let (si, hi) = self
            .resolve_handler(hint, name_sym)
            .ok_or_else(|| RuntimeError::new(format!("unknown handler '{lname}'")))?;

        let base = self.stack.len();
        if let Err(message) = self.begin_call(si, hi, receiver, args, base) {
            self.stack.truncate(base);
            self.frames.clear();
            return Err(RuntimeError::new(message));
        }

        let result = self.run(host);
        self.frames.clear();
        self.stack.truncate(base);
        result
    }

    fn begin_call(
        &mut self,
        script: usize,
        handler: usize,
        receiver: Value,
        args: &[Value],
        base: usize,
    ) -> Result<(), String> {
        self.push(receiver)?;
        for &a in args {
            self.push(a)?;
        }
        self.push_frame(script, handler, base, args.len() + 1)
    }

    fn script_of(&self, receiver: Value) -> Option<usize> {
        match receiver {
            Value::PropList(idx) => self.heap.prop_list(idx).script.map(|s| s as usize),
            _ => None,
        }
    }

    fn resolve_handler(&self, preferred: Option<usize>, name: SymbolId) -> Option<(usize, usize)> {
        if let Some(si) = preferred {
            if let Some(&h) = self.scripts[si].by_name.get(&name) {
                return Some((si, h));
            }
        }
        for (i, s) in self.scripts.iter().enumerate() {
            if Some(i) == preferred {
                continue;
            }
            if let Some(&h) = s.by_name.get(&name) {
                return Some((i, h));
            }
        }
        None
    }

    // ---- Stack primitives ----

    fn push(&mut self, v: Value) -> Result<(), String> {
        if self.stack.len() >= MAX_STACK as usize {
            return Err("stack overflow".to_string());
        }
        self.stack.push(v);
        Ok(())
    }

    fn pop(&mut self) -> Result<Value, String> {
        self.stack.pop().ok_or_else(|| "stack underflow".to_string())
    }

    fn peek(&self) -> Result<Value, String> {
        self.stack
            .last()
            .copied()
            .ok_or_else(|| "stack underflow".to_string())
    }

    /// Set up a callee frame whose slots begin at `base`, with
    /// `provided` slots already filled (receiver and arguments).
    fn push_frame(
        &mut self,
        script: usize,
        handler: usize,
        base: usize,
        provided: usize,
    ) -> Result<(), String> {
        if self.frames.len() >= MAX_FRAMES {
            return Err("call stack overflow".to_string());
        }
        let (nargs, nlocals) = {
            let chunk = &self.scripts[script].chunks[handler];
            (chunk.nargs() as usize, chunk.nlocals() as usize)
        };
        let total = nargs + nlocals;

        // Extra arguments are dropped; missing ones read as void.
        if provided > nargs {
            self.stack.truncate(base + nargs);
        }
        while self.stack.len() < base + total {
            self.push(Value::Void)?;
        }

        self.frames.push(Frame {
            stack_base: base,
            script,
            handler,
            ip: 0,
        });
        Ok(())
    }

    // ---- Execution ----

    fn run(&mut self, host: &mut dyn Host) -> Result<Value, RuntimeError> {
        loop {
            match self.step(host) {
                Ok(Some(v)) => return Ok(v),
                Ok(None) => {}
                Err(message) => return Err(self.locate(message)),
            }
        }
    }

    fn locate(&self, message: String) -> RuntimeError {
        let mut e = RuntimeError::new(message);
        if let Some(f) = self.frames.last() {
            let idx = f.ip.saturating_sub(1) as u32;
            let script = &self.scripts[f.script];
            e.handler = Some(script.names[f.handler].clone());
            e.instr_index = Some(idx);
            e.line = script.chunks[f.handler].line_for(idx);
        }
        e
    }

    /// Read a constant into a runtime value.
    fn const_value(&mut self, si: usize, hi: usize, k: usize) -> Result<Value, String> {
        enum Owned {
            Int(i32),
            Float(f64),
            Str(Vec<u8>),
            Sym(Vec<u8>),
        }
        let owned = match self.scripts[si].chunks[hi].const_at(k) {
            Some(ChunkConst::Int(v)) => Owned::Int(v),
            Some(ChunkConst::Float(v)) => Owned::Float(v),
            Some(ChunkConst::Str(bytes)) => Owned::Str(bytes.to_vec()),
            Some(ChunkConst::Symbol(bytes)) => Owned::Sym(bytes.to_vec()),
            None => return Err(format!("constant index {k} out of range")),
        };
        Ok(match owned {
            Owned::Int(v) => Value::Int(v),
            Owned::Float(v) => Value::Float(v),
            Owned::Str(bytes) => Value::Str(self.heap.alloc_string(bytes)),
            Owned::Sym(bytes) => Value::Symbol(self.symbols.intern(&bytes)),
        })
    }

    /// Read a constant that names something (global, handler,
    /// method) as an interned symbol.
    fn const_symbol(&mut self, si: usize, hi: usize, k: usize) -> Result<SymbolId, String> {
        let bytes = match self.scripts[si].chunks[hi].const_at(k) {
            Some(ChunkConst::Symbol(bytes)) | Some(ChunkConst::Str(bytes)) => bytes.to_vec(),
            Some(_) => return Err(format!("constant {k} is not a name")),
            None => return Err(format!("constant index {k} out of range")),
        };
        Ok(self.symbols.intern(&bytes))
    }

    fn branch(&mut self, disp: i16) -> Result<(), String> {
        let f = self.frames.last_mut().expect("branch without a frame");
        let target = f.ip as i64 + disp as i64;
        if target < 0 {
            return Err("branch target out of range".to_string());
        }
        f.ip = target as usize;
        Ok(())
    }

    fn collect_garbage(&mut self) {
        let roots: Vec<Value> = self
            .stack
            .iter()
            .copied()
            .chain(self.globals.values().copied())
            .chain(self.instances.iter().copied())
            .collect();
        self.heap.collect(roots.into_iter());
    }

    /// Execute one instruction. `Ok(Some(v))` means the outermost
    /// frame returned `v`.
    fn step(&mut self, host: &mut dyn Host) -> Result<Option<Value>, String> {
        if self.heap.wants_collect() {
            self.collect_garbage();
        }

        let (si, hi, ip, base) = {
            let f = self.frames.last().expect("step without a frame");
            (f.script, f.handler, f.ip, f.stack_base)
        };
        let instr = self.scripts[si].chunks[hi]
            .instr(ip)
            .ok_or_else(|| "instruction pointer out of range".to_string())?;
        self.frames.last_mut().unwrap().ip = ip + 1;
        let op = instr
            .op()
            .ok_or_else(|| format!("unknown opcode {:#04x}", instr.raw() & 0xFF))?;

        match op {
            Op::Ret => {
                let ret = self.pop()?;
                let frame = self.frames.pop().expect("return without a frame");
                self.stack.truncate(frame.stack_base);
                if self.frames.is_empty() {
                    return Ok(Some(ret));
                }
                self.push(ret)?;
            }
            Op::Pop => {
                self.pop()?;
            }
            Op::Dup => {
                let v = self.peek()?;
                self.push(v)?;
            }
            Op::LoadVoid => self.push(Value::Void)?,
            Op::LoadI0 => self.push(Value::Int(0))?,
            Op::LoadI1 => self.push(Value::Int(1))?,
            Op::LoadC => {
                let v = self.const_value(si, hi, instr.a_u16() as usize)?;
                self.push(v)?;
            }
            Op::LoadL => {
                let slot = base + instr.a_u16() as usize;
                let v = self
                    .stack
                    .get(slot)
                    .copied()
                    .ok_or_else(|| "local index out of range".to_string())?;
                self.push(v)?;
            }
            Op::LoadL0 => {
                let v = self
                    .stack
                    .get(base)
                    .copied()
                    .ok_or_else(|| "local index out of range".to_string())?;
                self.push(v)?;
            }
            Op::LoadG => {
                let sym = self.const_symbol(si, hi, instr.a_u16() as usize)?;
                match self.globals.get(&sym).copied() {
                    Some(v) => self.push(v)?,
                    None if self.strict_globals => {
                        return Err(format!("undefined global '{}'", self.symbols.name(sym)))
                    }
                    None => self.push(Value::Void)?,
                }
            }
            Op::StoreL => {
                let v = self.pop()?;
                let slot = base + instr.a_u16() as usize;
                if slot >= self.stack.len() {
                    return Err("local index out of range".to_string());
                }
                self.stack[slot] = v;
            }
            Op::StoreG => {
                let sym = self.const_symbol(si, hi, instr.a_u16() as usize)?;
                let v = self.pop()?;
                self.globals.insert(sym, v);
            }
            Op::Unm => {
                let v = self.pop()?;
                let r = arith::negate(v)?;
                self.push(r)?;
            }
            Op::Add | Op::Sub | Op::Mul | Op::Div | Op::Mod => {
                let b = self.pop()?;
                let a = self.pop()?;
                let aop = match op {
                    Op::Add => ArithOp::Add,
                    Op::Sub => ArithOp::Sub,
                    Op::Mul => ArithOp::Mul,
                    Op::Div => ArithOp::Div,
                    _ => ArithOp::Mod,
                };
                let r = arith::binary(aop, a, b)?;
                self.push(r)?;
            }
            Op::Eq => {
                let b = self.pop()?;
                let a = self.pop()?;
                let r = compare::eq(a, b, &self.heap, &self.symbols)?;
                self.push(Value::from_bool(r))?;
            }
            Op::Lt | Op::Gt | Op::Lte | Op::Gte => {
                let b = self.pop()?;
                let a = self.pop()?;
                let r = match op {
                    Op::Lt => compare::lt(a, b, &self.heap)?,
                    Op::Gt => compare::gt(a, b, &self.heap)?,
                    Op::Lte => compare::lte(a, b, &self.heap)?,
                    _ => compare::gte(a, b, &self.heap)?,
                };
                self.push(Value::from_bool(r))?;
            }
            Op::And | Op::Or => {
                let b = self.pop()?;
                let a = self.pop()?;
                let ca = a
                    .as_condition()
                    .ok_or_else(|| format!("expected integer or void, got {}", a.type_name()))?;
                let cb = b
                    .as_condition()
                    .ok_or_else(|| format!("expected integer or void, got {}", b.type_name()))?;
                let r = if op == Op::And { ca && cb } else { ca || cb };
                self.push(Value::from_bool(r))?;
            }
            Op::Not => {
                let v = self.pop()?;
                let r = match v {
                    Value::Int(i) => Value::Int((i == 0) as i32),
                    // Anything outside the int domain answers false.
                    _ => Value::Int(0),
                };
                self.push(r)?;
            }
            Op::Concat | Op::ConcatSp => {
                let b = self.pop()?;
                let a = self.pop()?;
                let mut text = format_value(a, &self.heap, &self.symbols);
                if op == Op::ConcatSp {
                    text.push(' ');
                }
                text.push_str(&format_value(b, &self.heap, &self.symbols));
                let idx = self.heap.alloc_string(text.into_bytes());
                self.push(Value::Str(idx))?;
            }
            Op::Jmp => self.branch(instr.a_i16())?,
            Op::Brf | Op::Brt => {
                let v = self.pop()?;
                let cond = v.as_condition().ok_or_else(|| {
                    format!("expected integer or void in condition, got {}", v.type_name())
                })?;
                let take = if op == Op::Brf { !cond } else { cond };
                if take {
                    self.branch(instr.a_i16())?;
                }
            }
            Op::Call => {
                let name_sym = self.const_symbol(si, hi, instr.a_u16() as usize)?;
                let n = instr.b_u8() as usize;
                if self.stack.len() < n {
                    return Err("stack underflow".to_string());
                }
                if let Some((ts, th)) = self.resolve_handler(Some(si), name_sym) {
                    let new_base = self.stack.len() - n;
                    if n == 0 {
                        // Synthesise the receiver from the caller.
                        let me = self.stack[base];
                        self.push(me)?;
                    }
                    self.push_frame(ts, th, new_base, n.max(1))?;
                } else {
                    let name = self.symbols.name(name_sym);
                    let split = self.stack.len() - n;
                    let args = self.stack.split_off(split);
                    match intrinsics::call_named(
                        &name,
                        &args,
                        &mut self.heap,
                        &mut self.symbols,
                        host,
                    ) {
                        Some(Ok(v)) => self.push(v)?,
                        Some(Err(e)) => return Err(e),
                        None => return Err(format!("unknown handler '{name}'")),
                    }
                }
            }
            Op::OCall => {
                let name_sym = self.const_symbol(si, hi, instr.a_u16() as usize)?;
                let n = instr.b_u8() as usize;
                if self.stack.len() < n + 1 {
                    return Err("stack underflow".to_string());
                }
                let recv_pos = self.stack.len() - n - 1;
                let recv = self.stack[recv_pos];

                // A receiver with an attached script dispatches to
                // that script's handlers first.
                if let Some(sid) = self.script_of(recv) {
                    if let Some(&h_idx) = self.scripts[sid].by_name.get(&name_sym) {
                        self.push_frame(sid, h_idx, recv_pos, n + 1)?;
                        return Ok(None);
                    }
                }

                let name = self.symbols.name(name_sym);
                let args = self.stack.split_off(recv_pos + 1);
                self.stack.pop();
                let v = intrinsics::method_call(
                    recv,
                    &name,
                    &args,
                    &mut self.heap,
                    &mut self.symbols,
                )?;
                self.push(v)?;
            }
            Op::OIdxG => {
                let key = self.pop()?;
                let obj = self.pop()?;
                let v = intrinsics::index_get(obj, key, &mut self.heap, &self.symbols)?;
                self.push(v)?;
            }
            Op::OIdxS => {
                let key = self.pop()?;
                let obj = self.pop()?;
                let value = self.pop()?;
                intrinsics::index_set(obj, key, value, &mut self.heap, &mut self.symbols)?;
            }
            Op::OIdxK => {
                let index = self.pop()?;
                let key = self.pop()?;
                let obj = self.pop()?;
                let tmp = intrinsics::index_get(obj, key, &mut self.heap, &self.symbols)?;
                let v = intrinsics::index_get(tmp, index, &mut self.heap, &self.symbols)?;
                self.push(v)?;
            }
            Op::OIdxKr => {
                let b = self.pop()?;
                let a = self.pop()?;
                let key = self.pop()?;
                let obj = self.pop()?;
                let tmp = if key.is_void() {
                    obj
                } else {
                    intrinsics::index_get(obj, key, &mut self.heap, &self.symbols)?
                };
                let v = intrinsics::range_get(tmp, a, b, &mut self.heap)?;
                self.push(v)?;
            }
            Op::The => {
                let id = TheId::from_u8(instr.a_u8())
                    .ok_or_else(|| format!("unknown 'the' id {}", instr.a_u8()))?;
                let hv = host.the(id);
                let v = intrinsics::from_host_value(hv, &mut self.heap);
                self.push(v)?;
            }
            Op::NewLList => {
                let n = instr.a_u16() as usize;
                let idx = self.heap.alloc_list(LinearList::with_capacity(n));
                self.push(Value::List(idx))?;
            }
            Op::NewPList => {
                let idx = self.heap.alloc_prop_list(PropList::new());
                self.push(Value::PropList(idx))?;
            }
            Op::Case => {
                let v = self.pop()?;
                let buckets = self.scripts[si].chunks[hi]
                    .jtable(instr.a_u16() as usize)
                    .ok_or_else(|| "jump table index out of range".to_string())?;
                'buckets: for bucket in &buckets {
                    for &item in &bucket.items {
                        let label = self.const_value(si, hi, item as usize)?;
                        if compare::eq(v, label, &self.heap, &self.symbols)? {
                            self.branch(bucket.jump)?;
                            break 'buckets;
                        }
                    }
                }
            }
            Op::Put => {
                let v = self.pop()?;
                let text = format_value(v, &self.heap, &self.symbols);
                host.put(&text);
            }
        }
        Ok(None)
    }
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}
