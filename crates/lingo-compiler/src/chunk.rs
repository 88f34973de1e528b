//! The compiled-handler chunk: a self-contained relocatable byte blob.
//!
//! Every cross-reference inside the blob is a byte offset, so a chunk
//! can be memcpy'd, written to disk and used in place. Offsets in the
//! header are relative to the blob base; string references inside the
//! constant array and the local-name table are relative to the string
//! pool base. Sections start at their natural alignment. Integers are
//! host-endian; cross-host transport is out of scope.
//!
//! Layout:
//!
//! ```text
//! header (40 bytes)
//!   nargs u8, pad u8, nlocals u16, nconsts u16, njtables u16,
//!   ninstr u32, nlines u32,
//!   instrs_off u32, consts_off u32, strpool_off u32,
//!   local_names_off u32, jtables_off u32, lines_off u32
//! instrs       [u32; ninstr]
//! consts       [{ tag u32, pad u32, payload u64 }; nconsts]
//! string pool  { len u32, bytes…, NUL, pad to 4 }…
//! local names  [u32; nargs + nlocals]        (pool-relative)
//! jump tables  [u32; njtables] (blob-relative), each:
//!              { nbuckets u16, { nitems u16, jump i16, items [u16] }… }
//! lines        [{ line u32, instr_index u32 }; nlines]
//! ```

use crate::opcode::Instr;
use std::collections::HashMap;
use std::fmt;

pub const HEADER_SIZE: usize = 40;
pub const CONST_SIZE: usize = 16;

const TAG_INT: u32 = 1;
const TAG_FLOAT: u32 = 2;
const TAG_STRING: u32 = 3;
const TAG_SYMBOL: u32 = 4;

/// A decoded constant-pool entry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ChunkConst<'a> {
    Int(i32),
    Float(f64),
    Str(&'a [u8]),
    Symbol(&'a [u8]),
}

/// A malformed blob handed to [`Chunk::from_bytes`].
#[derive(Clone, Debug, PartialEq)]
pub struct ChunkError {
    pub message: String,
}

impl fmt::Display for ChunkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed chunk: {}", self.message)
    }
}

impl std::error::Error for ChunkError {}

fn chunk_err(message: impl Into<String>) -> ChunkError {
    ChunkError { message: message.into() }
}

// ---- Builder ----

#[derive(Clone, Debug, PartialEq)]
pub struct JumpBucket {
    /// Constant-pool indices of the labels that select this bucket.
    pub items: Vec<u16>,
    /// Displacement from the instruction following the CASE.
    pub jump: i16,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct JumpTable {
    pub buckets: Vec<JumpBucket>,
}

#[derive(Clone, Debug, PartialEq)]
enum BuildConst {
    Int(i32),
    Float(u64), // bit pattern, so dedup is bit-exact
    Str(u32),   // pool offset
    Symbol(u32),
}

/// Accumulates one handler's sections, then packs the blob.
pub struct ChunkBuilder {
    instrs: Vec<Instr>,
    consts: Vec<BuildConst>,
    pool: Vec<u8>,
    pool_index: HashMap<Vec<u8>, u32>,
    local_names: Vec<u32>,
    jtables: Vec<JumpTable>,
    lines: Vec<(u32, u32)>,
}

impl ChunkBuilder {
    pub fn new() -> Self {
        ChunkBuilder {
            instrs: Vec::new(),
            consts: Vec::new(),
            pool: Vec::new(),
            pool_index: HashMap::new(),
            local_names: Vec::new(),
            jtables: Vec::new(),
            lines: Vec::new(),
        }
    }

    pub fn ninstr(&self) -> usize {
        self.instrs.len()
    }

    pub fn nconsts(&self) -> usize {
        self.consts.len()
    }

    pub fn nlocals_total(&self) -> usize {
        self.local_names.len()
    }

    pub fn push_instr(&mut self, instr: Instr) -> usize {
        let pc = self.instrs.len();
        self.instrs.push(instr);
        pc
    }

    pub fn instr_mut(&mut self, pc: usize) -> &mut Instr {
        &mut self.instrs[pc]
    }

    /// Intern a byte string in the pool, returning its pool-relative
    /// offset. Identical content shares one record.
    fn intern_pool(&mut self, bytes: &[u8]) -> u32 {
        if let Some(&off) = self.pool_index.get(bytes) {
            return off;
        }
        let off = self.pool.len() as u32;
        self.pool.extend_from_slice(&(bytes.len() as u32).to_ne_bytes());
        self.pool.extend_from_slice(bytes);
        self.pool.push(0);
        while self.pool.len() % 4 != 0 {
            self.pool.push(0);
        }
        self.pool_index.insert(bytes.to_vec(), off);
        off
    }

    fn add_const(&mut self, c: BuildConst) -> usize {
        for (i, existing) in self.consts.iter().enumerate() {
            if *existing == c {
                return i;
            }
        }
        let idx = self.consts.len();
        self.consts.push(c);
        idx
    }

    pub fn const_int(&mut self, v: i32) -> usize {
        self.add_const(BuildConst::Int(v))
    }

    pub fn const_float(&mut self, v: f64) -> usize {
        self.add_const(BuildConst::Float(v.to_bits()))
    }

    pub fn const_str(&mut self, bytes: &[u8]) -> usize {
        let off = self.intern_pool(bytes);
        self.add_const(BuildConst::Str(off))
    }

    pub fn const_symbol(&mut self, bytes: &[u8]) -> usize {
        let off = self.intern_pool(bytes);
        self.add_const(BuildConst::Symbol(off))
    }

    /// Register the next local slot under the given name.
    pub fn register_local(&mut self, name: &str) -> usize {
        let off = self.intern_pool(name.as_bytes());
        let idx = self.local_names.len();
        self.local_names.push(off);
        idx
    }

    pub fn add_jtable(&mut self, table: JumpTable) -> usize {
        let idx = self.jtables.len();
        self.jtables.push(table);
        idx
    }

    pub fn jtable_mut(&mut self, idx: usize) -> &mut JumpTable {
        &mut self.jtables[idx]
    }

    pub fn push_line(&mut self, line: u32, instr_index: u32) {
        self.lines.push((line, instr_index));
    }

    /// Pack all sections into the final blob.
    pub fn finish(self, nargs: u8) -> Chunk {
        debug_assert!(self.local_names.len() >= nargs as usize);
        let nlocals = (self.local_names.len() - nargs as usize) as u16;

        let instrs_off = align(HEADER_SIZE, 4);
        let instrs_size = self.instrs.len() * 4;
        let consts_off = align(instrs_off + instrs_size, 8);
        let consts_size = self.consts.len() * CONST_SIZE;
        let strpool_off = align(consts_off + consts_size, 4);
        let strpool_size = self.pool.len();
        let local_names_off = align(strpool_off + strpool_size, 4);
        let local_names_size = self.local_names.len() * 4;
        let jtables_off = align(local_names_off + local_names_size, 4);

        // Jump tables: the offset array, then each table body.
        let mut jtable_bodies: Vec<Vec<u8>> = Vec::new();
        for table in &self.jtables {
            let mut body = Vec::new();
            body.extend_from_slice(&(table.buckets.len() as u16).to_ne_bytes());
            for bucket in &table.buckets {
                body.extend_from_slice(&(bucket.items.len() as u16).to_ne_bytes());
                body.extend_from_slice(&bucket.jump.to_ne_bytes());
                for &item in &bucket.items {
                    body.extend_from_slice(&item.to_ne_bytes());
                }
            }
            jtable_bodies.push(body);
        }
        let mut jtable_offsets = Vec::with_capacity(self.jtables.len());
        let mut cursor = align(jtables_off + self.jtables.len() * 4, 2);
        for body in &jtable_bodies {
            jtable_offsets.push(cursor as u32);
            cursor += body.len();
            cursor = align(cursor, 2);
        }
        let lines_off = align(cursor, 4);
        let total = lines_off + self.lines.len() * 8;

        let mut blob = vec![0u8; total];
        blob[0] = nargs;
        blob[2..4].copy_from_slice(&nlocals.to_ne_bytes());
        blob[4..6].copy_from_slice(&(self.consts.len() as u16).to_ne_bytes());
        blob[6..8].copy_from_slice(&(self.jtables.len() as u16).to_ne_bytes());
        blob[8..12].copy_from_slice(&(self.instrs.len() as u32).to_ne_bytes());
        blob[12..16].copy_from_slice(&(self.lines.len() as u32).to_ne_bytes());
        blob[16..20].copy_from_slice(&(instrs_off as u32).to_ne_bytes());
        blob[20..24].copy_from_slice(&(consts_off as u32).to_ne_bytes());
        blob[24..28].copy_from_slice(&(strpool_off as u32).to_ne_bytes());
        blob[28..32].copy_from_slice(&(local_names_off as u32).to_ne_bytes());
        blob[32..36].copy_from_slice(&(jtables_off as u32).to_ne_bytes());
        blob[36..40].copy_from_slice(&(lines_off as u32).to_ne_bytes());

        for (i, instr) in self.instrs.iter().enumerate() {
            let at = instrs_off + i * 4;
            blob[at..at + 4].copy_from_slice(&instr.raw().to_ne_bytes());
        }

        for (i, c) in self.consts.iter().enumerate() {
            let at = consts_off + i * CONST_SIZE;
            let (tag, payload) = match c {
                BuildConst::Int(v) => (TAG_INT, *v as u32 as u64),
                BuildConst::Float(bits) => (TAG_FLOAT, *bits),
                BuildConst::Str(off) => (TAG_STRING, *off as u64),
                BuildConst::Symbol(off) => (TAG_SYMBOL, *off as u64),
            };
            blob[at..at + 4].copy_from_slice(&tag.to_ne_bytes());
            blob[at + 8..at + 16].copy_from_slice(&payload.to_ne_bytes());
        }

        blob[strpool_off..strpool_off + strpool_size].copy_from_slice(&self.pool);

        for (i, off) in self.local_names.iter().enumerate() {
            let at = local_names_off + i * 4;
            blob[at..at + 4].copy_from_slice(&off.to_ne_bytes());
        }

        for (i, table_off) in jtable_offsets.iter().enumerate() {
            let at = jtables_off + i * 4;
            blob[at..at + 4].copy_from_slice(&table_off.to_ne_bytes());
        }
        for (body, &table_off) in jtable_bodies.iter().zip(&jtable_offsets) {
            let at = table_off as usize;
            blob[at..at + body.len()].copy_from_slice(body);
        }

        for (i, (line, instr)) in self.lines.iter().enumerate() {
            let at = lines_off + i * 8;
            blob[at..at + 4].copy_from_slice(&line.to_ne_bytes());
            blob[at + 4..at + 8].copy_from_slice(&instr.to_ne_bytes());
        }

        Chunk { blob }
    }
}

impl Default for ChunkBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn align(off: usize, to: usize) -> usize {
    (off + to - 1) & !(to - 1)
}

// ---- Reader ----

/// A loaded chunk. The blob is immutable; accessors are typed views
/// over validated ranges.
#[derive(Clone, PartialEq)]
pub struct Chunk {
    blob: Vec<u8>,
}

impl Chunk {
    /// Validate a blob and take ownership. Every section must lie
    /// within the blob and every string reference within the pool.
    pub fn from_bytes(blob: Vec<u8>) -> Result<Chunk, ChunkError> {
        if blob.len() < HEADER_SIZE {
            return Err(chunk_err("blob shorter than header"));
        }
        let chunk = Chunk { blob };

        let ninstr = chunk.ninstr() as usize;
        let nconsts = chunk.nconsts() as usize;
        let nlines = chunk.nlines() as usize;
        let nnames = chunk.nargs() as usize + chunk.nlocals() as usize;
        let njtables = chunk.njtables() as usize;

        chunk.check_section("instructions", chunk.instrs_off(), ninstr * 4)?;
        chunk.check_section("constants", chunk.consts_off(), nconsts * CONST_SIZE)?;
        chunk.check_section("local names", chunk.local_names_off(), nnames * 4)?;
        chunk.check_section("jump tables", chunk.jtables_off(), njtables * 4)?;
        chunk.check_section("line records", chunk.lines_off(), nlines * 8)?;
        if chunk.strpool_off() > chunk.blob.len() {
            return Err(chunk_err("string pool offset out of range"));
        }

        for k in 0..nconsts {
            chunk
                .const_at(k)
                .ok_or_else(|| chunk_err(format!("constant {k} is malformed")))?;
        }
        for i in 0..nnames {
            chunk
                .local_name(i)
                .ok_or_else(|| chunk_err(format!("local name {i} is malformed")))?;
        }
        for t in 0..njtables {
            chunk
                .jtable(t)
                .ok_or_else(|| chunk_err(format!("jump table {t} is malformed")))?;
        }
        Ok(chunk)
    }

    fn check_section(&self, what: &str, off: usize, size: usize) -> Result<(), ChunkError> {
        if off.checked_add(size).map(|end| end <= self.blob.len()) != Some(true) {
            return Err(chunk_err(format!("{what} section out of range")));
        }
        Ok(())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.blob
    }

    // -- header fields --

    pub fn nargs(&self) -> u8 {
        self.blob[0]
    }

    pub fn nlocals(&self) -> u16 {
        self.read_u16(2)
    }

    pub fn nconsts(&self) -> u16 {
        self.read_u16(4)
    }

    pub fn njtables(&self) -> u16 {
        self.read_u16(6)
    }

    pub fn ninstr(&self) -> u32 {
        self.read_u32(8)
    }

    pub fn nlines(&self) -> u32 {
        self.read_u32(12)
    }

    fn instrs_off(&self) -> usize {
        self.read_u32(16) as usize
    }

    fn consts_off(&self) -> usize {
        self.read_u32(20) as usize
    }

    fn strpool_off(&self) -> usize {
        self.read_u32(24) as usize
    }

    fn local_names_off(&self) -> usize {
        self.read_u32(28) as usize
    }

    fn jtables_off(&self) -> usize {
        self.read_u32(32) as usize
    }

    fn lines_off(&self) -> usize {
        self.read_u32(36) as usize
    }

    // -- sections --

    pub fn instr(&self, index: usize) -> Option<Instr> {
        if index >= self.ninstr() as usize {
            return None;
        }
        Some(Instr(self.read_u32(self.instrs_off() + index * 4)))
    }

    pub fn const_at(&self, index: usize) -> Option<ChunkConst<'_>> {
        if index >= self.nconsts() as usize {
            return None;
        }
        let at = self.consts_off() + index * CONST_SIZE;
        let tag = self.read_u32(at);
        let payload = self.read_u64(at + 8);
        match tag {
            TAG_INT => Some(ChunkConst::Int(payload as u32 as i32)),
            TAG_FLOAT => Some(ChunkConst::Float(f64::from_bits(payload))),
            TAG_STRING => self.pool_str(payload as usize).map(ChunkConst::Str),
            TAG_SYMBOL => self.pool_str(payload as usize).map(ChunkConst::Symbol),
            _ => None,
        }
    }

    /// Resolve a pool-relative string record to its bytes.
    fn pool_str(&self, pool_off: usize) -> Option<&[u8]> {
        let base = self.strpool_off().checked_add(pool_off)?;
        if base + 4 > self.blob.len() {
            return None;
        }
        let len = self.read_u32(base) as usize;
        let start = base + 4;
        let end = start.checked_add(len)?;
        if end >= self.blob.len() {
            // Also accounts for the NUL that must follow.
            return None;
        }
        Some(&self.blob[start..end])
    }

    pub fn local_name(&self, slot: usize) -> Option<&[u8]> {
        let total = self.nargs() as usize + self.nlocals() as usize;
        if slot >= total {
            return None;
        }
        let off = self.read_u32(self.local_names_off() + slot * 4) as usize;
        self.pool_str(off)
    }

    /// Decode jump table `index` into its buckets.
    pub fn jtable(&self, index: usize) -> Option<Vec<JumpBucket>> {
        if index >= self.njtables() as usize {
            return None;
        }
        let table_off = self.read_u32(self.jtables_off() + index * 4) as usize;
        if table_off + 2 > self.blob.len() {
            return None;
        }
        let nbuckets = self.read_u16(table_off) as usize;
        let mut at = table_off + 2;
        let mut buckets = Vec::with_capacity(nbuckets);
        for _ in 0..nbuckets {
            if at + 4 > self.blob.len() {
                return None;
            }
            let nitems = self.read_u16(at) as usize;
            let jump = self.read_u16(at + 2) as i16;
            at += 4;
            if at + nitems * 2 > self.blob.len() {
                return None;
            }
            let mut items = Vec::with_capacity(nitems);
            for i in 0..nitems {
                items.push(self.read_u16(at + i * 2));
            }
            at += nitems * 2;
            buckets.push(JumpBucket { items, jump });
        }
        Some(buckets)
    }

    /// The source line for an instruction, from the debug records.
    /// Records are ordered by instruction index; the last one at or
    /// before the target wins.
    pub fn line_for(&self, instr_index: u32) -> Option<u32> {
        let mut best = None;
        for i in 0..self.nlines() as usize {
            let at = self.lines_off() + i * 8;
            let line = self.read_u32(at);
            let idx = self.read_u32(at + 4);
            if idx <= instr_index {
                best = Some(line);
            } else {
                break;
            }
        }
        best
    }

    pub fn lines(&self) -> Vec<(u32, u32)> {
        (0..self.nlines() as usize)
            .map(|i| {
                let at = self.lines_off() + i * 8;
                (self.read_u32(at), self.read_u32(at + 4))
            })
            .collect()
    }

    fn read_u16(&self, at: usize) -> u16 {
        u16::from_ne_bytes(self.blob[at..at + 2].try_into().unwrap())
    }

    fn read_u32(&self, at: usize) -> u32 {
        u32::from_ne_bytes(self.blob[at..at + 4].try_into().unwrap())
    }

    fn read_u64(&self, at: usize) -> u64 {
        u64::from_ne_bytes(self.blob[at..at + 8].try_into().unwrap())
    }
}

impl fmt::Debug for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Chunk({} args, {} locals, {} consts, {} instrs, {} bytes)",
            self.nargs(),
            self.nlocals(),
            self.nconsts(),
            self.ninstr(),
            self.blob.len()
        )
    }
}
