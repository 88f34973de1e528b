//! AST → bytecode chunks, one per handler.
//!
//! The emitter registers parameters (synthesising the implicit
//! receiver when none are declared), lowers statements depth-first,
//! deduplicates constants, backpatches branches, and tracks a
//! simulated operand-stack depth so no emitted chunk can overflow the
//! VM's fixed stack.

use crate::ast::*;
use crate::chunk::{Chunk, ChunkBuilder, JumpBucket, JumpTable};
use crate::opcode::{Instr, Op};
use crate::token::Pos;
use std::collections::HashMap;
use std::fmt;

/// The VM's operand-stack capacity. The emitter refuses to produce
/// code that could exceed it.
pub const MAX_STACK: u16 = 256;

#[derive(Clone, Debug, PartialEq)]
pub struct EmitError {
    pub pos: Pos,
    pub message: String,
}

impl fmt::Display for EmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.pos.line, self.pos.column, self.message)
    }
}

impl std::error::Error for EmitError {}

#[derive(Clone, Copy, Debug)]
pub struct EmitOptions {
    /// Emit per-statement line records. The CLI's
    /// `--no-line-numbers` turns this off.
    pub line_numbers: bool,
}

impl Default for EmitOptions {
    fn default() -> Self {
        EmitOptions { line_numbers: true }
    }
}

/// One compiled handler, keyed by its source name.
#[derive(Clone, Debug)]
pub struct CompiledHandler {
    pub name: String,
    pub chunk: Chunk,
}

/// The whole compiled script: handlers in declaration order plus the
/// script's property names (receiver slots).
#[derive(Clone, Debug)]
pub struct CompiledScript {
    pub properties: Vec<String>,
    pub handlers: Vec<CompiledHandler>,
}

impl CompiledScript {
    pub fn handler(&self, name: &str) -> Option<&CompiledHandler> {
        self.handlers.iter().find(|h| h.name == name)
    }
}

/// Emit every handler of a script root, in declaration order.
pub fn emit_script(root: &ScriptRoot, opts: &EmitOptions) -> Result<CompiledScript, EmitError> {
    let mut handlers = Vec::with_capacity(root.handlers.len());
    for decl in &root.handlers {
        let chunk = emit_handler(decl, opts)?;
        handlers.push(CompiledHandler {
            name: decl.name.clone(),
            chunk,
        });
    }
    Ok(CompiledScript {
        properties: root.properties.clone(),
        handlers,
    })
}

fn emit_handler(decl: &HandlerDecl, opts: &EmitOptions) -> Result<Chunk, EmitError> {
    let mut e = HandlerEmitter {
        b: ChunkBuilder::new(),
        opts: *opts,
        locals: HashMap::new(),
        hidden: 0,
        loops: Vec::new(),
        depth: 0,
        last_line: 0,
    };

    if decl.params.len() > u8::MAX as usize {
        return Err(e.err(decl.pos, "parameter count exceeded max of 255"));
    }

    for param in &decl.params {
        e.register_local(decl.pos, param)?;
    }
    let nargs = if decl.params.is_empty() {
        e.register_local(decl.pos, "me (implicit)")?;
        1u8
    } else {
        decl.params.len() as u8
    };

    for local in &decl.locals {
        e.register_local(decl.pos, local)?;
    }

    for stmt in &decl.body {
        e.emit_stmt(stmt)?;
    }

    // Fallback return.
    e.emit(decl.pos, Instr::none(Op::LoadVoid), 0, 1)?;
    e.emit(decl.pos, Instr::none(Op::Ret), 1, 0)?;

    let nlocals = e.b.nlocals_total() - nargs as usize;
    if nlocals > u16::MAX as usize {
        return Err(e.err(decl.pos, "local count exceeded max of 65535"));
    }
    if e.b.ninstr() >= u32::MAX as usize {
        return Err(e.err(decl.pos, "too many instructions"));
    }
    Ok(e.b.finish(nargs))
}

struct LoopCtx {
    /// `exit repeat` jump pcs, patched to the loop end.
    breaks: Vec<usize>,
    /// `next repeat` jump pcs, patched to the iteration step.
    nexts: Vec<usize>,
}

struct HandlerEmitter {
    b: ChunkBuilder,
    opts: EmitOptions,
    locals: HashMap<String, u16>,
    hidden: u32,
    loops: Vec<LoopCtx>,
    /// Simulated operand-stack depth at the current emission point.
    depth: u16,
    last_line: u32,
}

impl HandlerEmitter {
    fn err(&self, pos: Pos, message: impl Into<String>) -> EmitError {
        EmitError {
            pos,
            message: message.into(),
        }
    }

    fn register_local(&mut self, pos: Pos, name: &str) -> Result<u16, EmitError> {
        let idx = self.b.register_local(name);
        if idx > u16::MAX as usize {
            return Err(self.err(pos, "local count exceeded max of 65535"));
        }
        self.locals.insert(name.to_string(), idx as u16);
        Ok(idx as u16)
    }

    /// A synthesized temporary slot, named so the local-name table
    /// stays complete.
    fn hidden_local(&mut self, pos: Pos, what: &str) -> Result<u16, EmitError> {
        let name = format!("({} {})", what, self.hidden);
        self.hidden += 1;
        self.register_local(pos, &name)
    }

    fn local_index(&self, pos: Pos, name: &str) -> Result<u16, EmitError> {
        self.locals
            .get(name)
            .copied()
            .ok_or_else(|| self.err(pos, format!("unresolved local '{name}'")))
    }

    /// Append an instruction, maintaining the simulated stack depth.
    fn emit(&mut self, pos: Pos, instr: Instr, pops: u16, pushes: u16) -> Result<usize, EmitError> {
        debug_assert!(self.depth >= pops, "emitter stack accounting broke");
        let depth = self.depth.saturating_sub(pops) + pushes;
        if depth > MAX_STACK {
            return Err(self.err(pos, "expression exceeds the operand stack limit"));
        }
        self.depth = depth;
        Ok(self.b.push_instr(instr))
    }

    fn kint(&mut self, pos: Pos, v: i32) -> Result<u16, EmitError> {
        let idx = self.b.const_int(v);
        self.check_const(pos, idx)
    }

    fn kfloat(&mut self, pos: Pos, v: f64) -> Result<u16, EmitError> {
        let idx = self.b.const_float(v);
        self.check_const(pos, idx)
    }

    fn kstr(&mut self, pos: Pos, s: &str) -> Result<u16, EmitError> {
        let idx = self.b.const_str(s.as_bytes());
        self.check_const(pos, idx)
    }

    fn ksym(&mut self, pos: Pos, s: &str) -> Result<u16, EmitError> {
        let idx = self.b.const_symbol(s.as_bytes());
        self.check_const(pos, idx)
    }

    fn check_const(&self, pos: Pos, idx: usize) -> Result<u16, EmitError> {
        if idx > u16::MAX as usize {
            Err(self.err(pos, "unique constant count exceeded max of 65535"))
        } else {
            Ok(idx as u16)
        }
    }

    /// Record a debug line row for the statement starting here.
    fn line_row(&mut self, pos: Pos) {
        if self.opts.line_numbers && pos.line != self.last_line {
            let at = self.b.ninstr() as u32;
            self.b.push_line(pos.line, at);
            self.last_line = pos.line;
        }
    }

    /// Point the branch at `pc` to `target`, range-checking the
    /// displacement.
    fn patch_to(&mut self, pos: Pos, pc: usize, target: usize) -> Result<(), EmitError> {
        let disp = target as i64 - (pc as i64 + 1);
        if disp < i16::MIN as i64 || disp > i16::MAX as i64 {
            return Err(self.err(pos, "jump displacement out of range"));
        }
        let instr = *self.b.instr_mut(pc);
        let op = instr.op().expect("patching an unknown opcode");
        *self.b.instr_mut(pc) = Instr::i16(op, disp as i16);
        Ok(())
    }

    /// Patch the branch at `pc` to jump to the current instruction.
    fn patch_to_here(&mut self, pos: Pos, pc: usize) -> Result<(), EmitError> {
        let target = self.b.ninstr();
        self.patch_to(pos, pc, target)
    }

    /// Emit a backward jump to `target`.
    fn jump_back(&mut self, pos: Pos, target: usize) -> Result<(), EmitError> {
        let pc = self.emit(pos, Instr::i16(Op::Jmp, 0), 0, 0)?;
        self.patch_to(pos, pc, target)
    }

    // ---- Statements ----

    fn emit_stmt(&mut self, stmt: &Stmt) -> Result<(), EmitError> {
        self.line_row(stmt.pos);
        let pos = stmt.pos;
        match &stmt.kind {
            StmtKind::Return(expr) => {
                match expr {
                    Some(e) => self.emit_expr(e)?,
                    None => {
                        self.emit(pos, Instr::none(Op::LoadVoid), 0, 1)?;
                    }
                }
                self.emit(pos, Instr::none(Op::Ret), 1, 0)?;
            }
            StmtKind::Assign { lvalue, rvalue } => {
                self.emit_expr(rvalue)?;
                self.emit_store(lvalue)?;
            }
            StmtKind::Expr(e) => {
                self.emit_expr(e)?;
                self.emit(pos, Instr::none(Op::Pop), 1, 0)?;
            }
            StmtKind::Put(e) => {
                self.emit_expr(e)?;
                self.emit(pos, Instr::none(Op::Put), 1, 0)?;
            }
            StmtKind::PutOn { expr, target, before } => {
                self.emit_put_on(pos, expr, target, *before)?;
            }
            StmtKind::If { branches, else_body } => {
                self.emit_if(pos, branches, else_body.as_deref())?;
            }
            StmtKind::RepeatWhile { condition, body } => {
                let top = self.b.ninstr();
                self.emit_expr(condition)?;
                let brf = self.emit(pos, Instr::i16(Op::Brf, 0), 1, 0)?;

                self.loops.push(LoopCtx { breaks: Vec::new(), nexts: Vec::new() });
                for s in body {
                    self.emit_stmt(s)?;
                }
                let ctx = self.loops.pop().unwrap();
                for pc in ctx.nexts {
                    self.patch_to(pos, pc, top)?;
                }
                self.jump_back(pos, top)?;
                self.patch_to_here(pos, brf)?;
                for pc in ctx.breaks {
                    self.patch_to_here(pos, pc)?;
                }
            }
            StmtKind::RepeatTo { var, init, stop, down, body } => {
                self.emit_expr(init)?;
                self.emit_store(var)?;

                let top = self.b.ninstr();
                self.emit_expr(var)?;
                self.emit_expr(stop)?;
                let cmp = if *down { Op::Gte } else { Op::Lte };
                self.emit(pos, Instr::none(cmp), 2, 1)?;
                let brf = self.emit(pos, Instr::i16(Op::Brf, 0), 1, 0)?;

                self.loops.push(LoopCtx { breaks: Vec::new(), nexts: Vec::new() });
                for s in body {
                    self.emit_stmt(s)?;
                }
                let ctx = self.loops.pop().unwrap();

                // Iteration step: var = var ± 1.
                let step = self.b.ninstr();
                for pc in ctx.nexts {
                    self.patch_to(pos, pc, step)?;
                }
                self.emit_expr(var)?;
                self.emit(pos, Instr::none(Op::LoadI1), 0, 1)?;
                let op = if *down { Op::Sub } else { Op::Add };
                self.emit(pos, Instr::none(op), 2, 1)?;
                self.emit_store(var)?;
                self.jump_back(pos, top)?;

                self.patch_to_here(pos, brf)?;
                for pc in ctx.breaks {
                    self.patch_to_here(pos, pc)?;
                }
            }
            StmtKind::RepeatIn { var, iterable, body } => {
                let list_slot = self.hidden_local(pos, "repeat list")?;
                let idx_slot = self.hidden_local(pos, "repeat index")?;
                let length = self.ksym(pos, "length")?;

                self.emit_expr(iterable)?;
                self.emit(pos, Instr::u16(Op::StoreL, list_slot), 1, 0)?;
                self.emit(pos, Instr::none(Op::LoadI1), 0, 1)?;
                self.emit(pos, Instr::u16(Op::StoreL, idx_slot), 1, 0)?;

                let top = self.b.ninstr();
                self.emit(pos, Instr::u16(Op::LoadL, idx_slot), 0, 1)?;
                self.emit(pos, Instr::u16(Op::LoadL, list_slot), 0, 1)?;
                self.emit(pos, Instr::u16_u8(Op::OCall, length, 0), 1, 1)?;
                self.emit(pos, Instr::none(Op::Lte), 2, 1)?;
                let brf = self.emit(pos, Instr::i16(Op::Brf, 0), 1, 0)?;

                self.emit(pos, Instr::u16(Op::LoadL, list_slot), 0, 1)?;
                self.emit(pos, Instr::u16(Op::LoadL, idx_slot), 0, 1)?;
                self.emit(pos, Instr::none(Op::OIdxG), 2, 1)?;
                self.emit_store(var)?;

                self.loops.push(LoopCtx { breaks: Vec::new(), nexts: Vec::new() });
                for s in body {
                    self.emit_stmt(s)?;
                }
                let ctx = self.loops.pop().unwrap();

                let step = self.b.ninstr();
                for pc in ctx.nexts {
                    self.patch_to(pos, pc, step)?;
                }
                self.emit(pos, Instr::u16(Op::LoadL, idx_slot), 0, 1)?;
                self.emit(pos, Instr::none(Op::LoadI1), 0, 1)?;
                self.emit(pos, Instr::none(Op::Add), 2, 1)?;
                self.emit(pos, Instr::u16(Op::StoreL, idx_slot), 1, 0)?;
                self.jump_back(pos, top)?;

                self.patch_to_here(pos, brf)?;
                for pc in ctx.breaks {
                    self.patch_to_here(pos, pc)?;
                }
            }
            StmtKind::ExitRepeat => {
                let pc = self.emit(pos, Instr::i16(Op::Jmp, 0), 0, 0)?;
                match self.loops.last_mut() {
                    Some(ctx) => ctx.breaks.push(pc),
                    None => return Err(self.err(pos, "exit repeat outside of a repeat loop")),
                }
            }
            StmtKind::NextRepeat => {
                let pc = self.emit(pos, Instr::i16(Op::Jmp, 0), 0, 0)?;
                match self.loops.last_mut() {
                    Some(ctx) => ctx.nexts.push(pc),
                    None => return Err(self.err(pos, "next repeat outside of a repeat loop")),
                }
            }
            StmtKind::Case { expr, clauses, otherwise } => {
                self.emit_case(pos, expr, clauses, otherwise.as_deref())?;
            }
        }
        Ok(())
    }

    fn emit_if(
        &mut self,
        pos: Pos,
        branches: &[IfBranch],
        else_body: Option<&[Stmt]>,
    ) -> Result<(), EmitError> {
        if branches.is_empty() {
            // Declaration-only statements parse to an empty branch
            // list; nothing to emit.
            return Ok(());
        }

        let mut end_jumps = Vec::new();
        for (i, branch) in branches.iter().enumerate() {
            self.emit_expr(&branch.condition)?;
            let brf = self.emit(pos, Instr::i16(Op::Brf, 0), 1, 0)?;
            for s in &branch.body {
                self.emit_stmt(s)?;
            }
            let last = i + 1 == branches.len() && else_body.is_none();
            if !last {
                end_jumps.push(self.emit(pos, Instr::i16(Op::Jmp, 0), 0, 0)?);
            }
            self.patch_to_here(pos, brf)?;
        }
        if let Some(body) = else_body {
            for s in body {
                self.emit_stmt(s)?;
            }
        }
        for pc in end_jumps {
            self.patch_to_here(pos, pc)?;
        }
        Ok(())
    }

    fn emit_case(
        &mut self,
        pos: Pos,
        expr: &Expr,
        clauses: &[CaseClause],
        otherwise: Option<&[Stmt]>,
    ) -> Result<(), EmitError> {
        // Labels become constant-pool indices in a jump table; each
        // bucket's displacement is measured from the instruction after
        // the CASE.
        let mut buckets_items: Vec<Vec<u16>> = Vec::with_capacity(clauses.len());
        for clause in clauses {
            let mut items = Vec::with_capacity(clause.labels.len());
            for label in &clause.labels {
                let k = match &label.kind {
                    ExprKind::Literal(Literal::Int(v)) => self.kint(label.pos, *v)?,
                    ExprKind::Literal(Literal::Float(v)) => self.kfloat(label.pos, *v)?,
                    ExprKind::Literal(Literal::Str(s)) => self.kstr(label.pos, s)?,
                    ExprKind::Literal(Literal::Symbol(s)) => self.ksym(label.pos, s)?,
                    _ => return Err(self.err(label.pos, "case label must be a literal")),
                };
                items.push(k);
            }
            buckets_items.push(items);
        }

        let jt = self.b.add_jtable(JumpTable::default());
        if jt > u16::MAX as usize {
            return Err(self.err(pos, "too many case statements"));
        }

        self.emit_expr(expr)?;
        let case_pc = self.emit(pos, Instr::u16(Op::Case, jt as u16), 1, 0)?;
        // Fall-through when no bucket matches.
        let default_jmp = self.emit(pos, Instr::i16(Op::Jmp, 0), 0, 0)?;

        let mut jumps = Vec::with_capacity(clauses.len());
        let mut end_jumps = Vec::new();
        for clause in clauses {
            let start = self.b.ninstr();
            let disp = start as i64 - (case_pc as i64 + 1);
            if disp > i16::MAX as i64 {
                return Err(self.err(pos, "jump displacement out of range"));
            }
            jumps.push(disp as i16);
            for s in &clause.body {
                self.emit_stmt(s)?;
            }
            end_jumps.push(self.emit(pos, Instr::i16(Op::Jmp, 0), 0, 0)?);
        }

        self.patch_to_here(pos, default_jmp)?;
        if let Some(body) = otherwise {
            for s in body {
                self.emit_stmt(s)?;
            }
        }
        for pc in end_jumps {
            self.patch_to_here(pos, pc)?;
        }

        let table = self.b.jtable_mut(jt);
        table.buckets = buckets_items
            .into_iter()
            .zip(jumps)
            .map(|(items, jump)| JumpBucket { items, jump })
            .collect();
        Ok(())
    }

    fn emit_put_on(
        &mut self,
        pos: Pos,
        expr: &Expr,
        target: &Expr,
        before: bool,
    ) -> Result<(), EmitError> {
        match &target.kind {
            ExprKind::Ident { .. } => {
                if before {
                    self.emit_expr(expr)?;
                    self.emit_expr(target)?;
                } else {
                    self.emit_expr(target)?;
                    self.emit_expr(expr)?;
                }
                self.emit(pos, Instr::none(Op::Concat), 2, 1)?;
                self.emit_store(target)?;
            }
            ExprKind::Dot { expr: obj, key } => {
                let tmp = self.hidden_local(pos, "put target")?;
                let key_k = self.ksym(pos, key)?;
                self.emit_expr(obj)?;
                self.emit(pos, Instr::u16(Op::StoreL, tmp), 1, 0)?;
                if before {
                    self.emit_expr(expr)?;
                    self.emit(pos, Instr::u16(Op::LoadL, tmp), 0, 1)?;
                    self.emit(pos, Instr::u16(Op::LoadC, key_k), 0, 1)?;
                    self.emit(pos, Instr::none(Op::OIdxG), 2, 1)?;
                } else {
                    self.emit(pos, Instr::u16(Op::LoadL, tmp), 0, 1)?;
                    self.emit(pos, Instr::u16(Op::LoadC, key_k), 0, 1)?;
                    self.emit(pos, Instr::none(Op::OIdxG), 2, 1)?;
                    self.emit_expr(expr)?;
                }
                self.emit(pos, Instr::none(Op::Concat), 2, 1)?;
                self.emit(pos, Instr::u16(Op::LoadL, tmp), 0, 1)?;
                self.emit(pos, Instr::u16(Op::LoadC, key_k), 0, 1)?;
                self.emit(pos, Instr::none(Op::OIdxS), 3, 0)?;
            }
            ExprKind::Index { expr: obj, from, to: None } => {
                let t_obj = self.hidden_local(pos, "put target")?;
                let t_idx = self.hidden_local(pos, "put index")?;
                self.emit_expr(obj)?;
                self.emit(pos, Instr::u16(Op::StoreL, t_obj), 1, 0)?;
                self.emit_expr(from)?;
                self.emit(pos, Instr::u16(Op::StoreL, t_idx), 1, 0)?;
                if before {
                    self.emit_expr(expr)?;
                    self.emit(pos, Instr::u16(Op::LoadL, t_obj), 0, 1)?;
                    self.emit(pos, Instr::u16(Op::LoadL, t_idx), 0, 1)?;
                    self.emit(pos, Instr::none(Op::OIdxG), 2, 1)?;
                } else {
                    self.emit(pos, Instr::u16(Op::LoadL, t_obj), 0, 1)?;
                    self.emit(pos, Instr::u16(Op::LoadL, t_idx), 0, 1)?;
                    self.emit(pos, Instr::none(Op::OIdxG), 2, 1)?;
                    self.emit_expr(expr)?;
                }
                self.emit(pos, Instr::none(Op::Concat), 2, 1)?;
                self.emit(pos, Instr::u16(Op::LoadL, t_obj), 0, 1)?;
                self.emit(pos, Instr::u16(Op::LoadL, t_idx), 0, 1)?;
                self.emit(pos, Instr::none(Op::OIdxS), 3, 0)?;
            }
            _ => return Err(self.err(target.pos, "put target must be assignable")),
        }
        Ok(())
    }

    // ---- Expressions ----

    /// Emit code leaving exactly one value on the stack.
    fn emit_expr(&mut self, expr: &Expr) -> Result<(), EmitError> {
        let pos = expr.pos;
        match &expr.kind {
            ExprKind::Literal(lit) => self.emit_literal(pos, lit)?,
            ExprKind::Ident { name, scope } => match scope {
                Scope::Local => {
                    let idx = self.local_index(pos, name)?;
                    if idx == 0 {
                        self.emit(pos, Instr::none(Op::LoadL0), 0, 1)?;
                    } else {
                        self.emit(pos, Instr::u16(Op::LoadL, idx), 0, 1)?;
                    }
                }
                Scope::Global => {
                    let k = self.ksym(pos, name)?;
                    self.emit(pos, Instr::u16(Op::LoadG, k), 0, 1)?;
                }
                Scope::Property => {
                    let k = self.ksym(pos, name)?;
                    self.emit(pos, Instr::none(Op::LoadL0), 0, 1)?;
                    self.emit(pos, Instr::u16(Op::LoadC, k), 0, 1)?;
                    self.emit(pos, Instr::none(Op::OIdxG), 2, 1)?;
                }
            },
            ExprKind::The(id) => {
                self.emit(pos, Instr::u8(Op::The, *id as u8), 0, 1)?;
            }
            ExprKind::List(items) => {
                if items.len() > u16::MAX as usize {
                    return Err(self.err(pos, "list literal too long"));
                }
                let add = self.ksym(pos, "add")?;
                self.emit(pos, Instr::u16(Op::NewLList, items.len() as u16), 0, 1)?;
                for item in items {
                    self.emit(pos, Instr::none(Op::Dup), 0, 1)?;
                    self.emit_expr(item)?;
                    self.emit(pos, Instr::u16_u8(Op::OCall, add, 1), 2, 1)?;
                    self.emit(pos, Instr::none(Op::Pop), 1, 0)?;
                }
            }
            ExprKind::PropList(pairs) => {
                let setat = self.ksym(pos, "setat")?;
                self.emit(pos, Instr::none(Op::NewPList), 0, 1)?;
                for (key, value) in pairs {
                    self.emit(pos, Instr::none(Op::Dup), 0, 1)?;
                    self.emit_expr(key)?;
                    self.emit_expr(value)?;
                    self.emit(pos, Instr::u16_u8(Op::OCall, setat, 2), 3, 1)?;
                    self.emit(pos, Instr::none(Op::Pop), 1, 0)?;
                }
            }
            ExprKind::Binary { op, left, right } => {
                self.emit_expr(left)?;
                self.emit_expr(right)?;
                match op {
                    BinOp::Add => self.emit(pos, Instr::none(Op::Add), 2, 1)?,
                    BinOp::Sub => self.emit(pos, Instr::none(Op::Sub), 2, 1)?,
                    BinOp::Mul => self.emit(pos, Instr::none(Op::Mul), 2, 1)?,
                    BinOp::Div => self.emit(pos, Instr::none(Op::Div), 2, 1)?,
                    BinOp::Mod => self.emit(pos, Instr::none(Op::Mod), 2, 1)?,
                    BinOp::And => self.emit(pos, Instr::none(Op::And), 2, 1)?,
                    BinOp::Or => self.emit(pos, Instr::none(Op::Or), 2, 1)?,
                    BinOp::Lt => self.emit(pos, Instr::none(Op::Lt), 2, 1)?,
                    BinOp::Gt => self.emit(pos, Instr::none(Op::Gt), 2, 1)?,
                    BinOp::Le => self.emit(pos, Instr::none(Op::Lte), 2, 1)?,
                    BinOp::Ge => self.emit(pos, Instr::none(Op::Gte), 2, 1)?,
                    BinOp::Eq => self.emit(pos, Instr::none(Op::Eq), 2, 1)?,
                    BinOp::NotEq => {
                        self.emit(pos, Instr::none(Op::Eq), 2, 1)?;
                        self.emit(pos, Instr::none(Op::Not), 1, 1)?
                    }
                    BinOp::Concat => self.emit(pos, Instr::none(Op::Concat), 2, 1)?,
                    BinOp::ConcatSpace => self.emit(pos, Instr::none(Op::ConcatSp), 2, 1)?,
                };
            }
            ExprKind::Unary { op, expr: operand } => {
                self.emit_expr(operand)?;
                match op {
                    UnOp::Neg => self.emit(pos, Instr::none(Op::Unm), 1, 1)?,
                    UnOp::Not => self.emit(pos, Instr::none(Op::Not), 1, 1)?,
                };
            }
            ExprKind::Dot { expr: obj, key } => {
                let k = self.ksym(pos, key)?;
                self.emit_expr(obj)?;
                self.emit(pos, Instr::u16(Op::LoadC, k), 0, 1)?;
                self.emit(pos, Instr::none(Op::OIdxG), 2, 1)?;
            }
            ExprKind::Index { expr: obj, from, to } => match (&obj.kind, to) {
                // `o.k[i]` and `o.k[a..b]` go through the keyed index
                // ops so no intermediate value is materialised.
                (ExprKind::Dot { expr: inner, key }, None) => {
                    let k = self.ksym(pos, key)?;
                    self.emit_expr(inner)?;
                    self.emit(pos, Instr::u16(Op::LoadC, k), 0, 1)?;
                    self.emit_expr(from)?;
                    self.emit(pos, Instr::none(Op::OIdxK), 3, 1)?;
                }
                (ExprKind::Dot { expr: inner, key }, Some(to)) => {
                    let k = self.ksym(pos, key)?;
                    self.emit_expr(inner)?;
                    self.emit(pos, Instr::u16(Op::LoadC, k), 0, 1)?;
                    self.emit_expr(from)?;
                    self.emit_expr(to)?;
                    self.emit(pos, Instr::none(Op::OIdxKr), 4, 1)?;
                }
                (_, None) => {
                    self.emit_expr(obj)?;
                    self.emit_expr(from)?;
                    self.emit(pos, Instr::none(Op::OIdxG), 2, 1)?;
                }
                (_, Some(to)) => {
                    // A void key ranges the object itself.
                    self.emit_expr(obj)?;
                    self.emit(pos, Instr::none(Op::LoadVoid), 0, 1)?;
                    self.emit_expr(from)?;
                    self.emit_expr(to)?;
                    self.emit(pos, Instr::none(Op::OIdxKr), 4, 1)?;
                }
            },
            ExprKind::Call { name, args } => {
                if args.len() > u8::MAX as usize {
                    return Err(self.err(pos, "argument count exceeded max of 255"));
                }
                let k = self.ksym(pos, name)?;
                for arg in args {
                    self.emit_expr(arg)?;
                }
                self.emit(pos, Instr::u16_u8(Op::Call, k, args.len() as u8), args.len() as u16, 1)?;
            }
            ExprKind::MethodCall { recv, name, args } => {
                if args.len() > u8::MAX as usize {
                    return Err(self.err(pos, "argument count exceeded max of 255"));
                }
                let k = self.ksym(pos, name)?;
                self.emit_expr(recv)?;
                for arg in args {
                    self.emit_expr(arg)?;
                }
                self.emit(
                    pos,
                    Instr::u16_u8(Op::OCall, k, args.len() as u8),
                    args.len() as u16 + 1,
                    1,
                )?;
            }
        }
        Ok(())
    }

    fn emit_literal(&mut self, pos: Pos, lit: &Literal) -> Result<(), EmitError> {
        match lit {
            Literal::Int(0) => {
                self.emit(pos, Instr::none(Op::LoadI0), 0, 1)?;
            }
            Literal::Int(1) => {
                self.emit(pos, Instr::none(Op::LoadI1), 0, 1)?;
            }
            Literal::Int(v) => {
                let k = self.kint(pos, *v)?;
                self.emit(pos, Instr::u16(Op::LoadC, k), 0, 1)?;
            }
            Literal::Float(v) => {
                let k = self.kfloat(pos, *v)?;
                self.emit(pos, Instr::u16(Op::LoadC, k), 0, 1)?;
            }
            Literal::Str(s) => {
                let k = self.kstr(pos, s)?;
                self.emit(pos, Instr::u16(Op::LoadC, k), 0, 1)?;
            }
            Literal::Symbol(s) => {
                let k = self.ksym(pos, s)?;
                self.emit(pos, Instr::u16(Op::LoadC, k), 0, 1)?;
            }
            Literal::Void => {
                self.emit(pos, Instr::none(Op::LoadVoid), 0, 1)?;
            }
        }
        Ok(())
    }

    /// Store the value on top of the stack into an lvalue.
    fn emit_store(&mut self, lvalue: &Expr) -> Result<(), EmitError> {
        let pos = lvalue.pos;
        match &lvalue.kind {
            ExprKind::Ident { name, scope } => match scope {
                Scope::Local => {
                    let idx = self.local_index(pos, name)?;
                    self.emit(pos, Instr::u16(Op::StoreL, idx), 1, 0)?;
                }
                Scope::Global => {
                    let k = self.ksym(pos, name)?;
                    self.emit(pos, Instr::u16(Op::StoreG, k), 1, 0)?;
                }
                Scope::Property => {
                    let k = self.ksym(pos, name)?;
                    self.emit(pos, Instr::none(Op::LoadL0), 0, 1)?;
                    self.emit(pos, Instr::u16(Op::LoadC, k), 0, 1)?;
                    self.emit(pos, Instr::none(Op::OIdxS), 3, 0)?;
                }
            },
            ExprKind::Dot { expr: obj, key } => {
                let k = self.ksym(pos, key)?;
                self.emit_expr(obj)?;
                self.emit(pos, Instr::u16(Op::LoadC, k), 0, 1)?;
                self.emit(pos, Instr::none(Op::OIdxS), 3, 0)?;
            }
            ExprKind::Index { expr: obj, from, to: None } => {
                self.emit_expr(obj)?;
                self.emit_expr(from)?;
                self.emit(pos, Instr::none(Op::OIdxS), 3, 0)?;
            }
            ExprKind::Index { to: Some(_), .. } => {
                return Err(self.err(pos, "cannot assign to a range"));
            }
            _ => return Err(self.err(pos, "invalid assignment target")),
        }
        Ok(())
    }
}
