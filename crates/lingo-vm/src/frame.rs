//! Call frames.

/// One activation record. Slot 0 of the frame region is the receiver
/// (`me`), followed by the remaining parameters and then the locals.
#[derive(Clone, Copy, Debug)]
pub struct Frame {
    /// Base of this frame's slots in the value stack.
    pub stack_base: usize,
    /// Which loaded script the running chunk belongs to.
    pub script: usize,
    /// Chunk index within the script.
    pub handler: usize,
    /// Next instruction to execute.
    pub ip: usize,
}
