//! Fault taxonomy for the eBPF interpreter core.
//!
//! Every fault is terminal: once raised, the interpreter transitions to
//! `halted ∧ errored` and the program does not resume (see [`crate::vm`]).

use thiserror::Error;

/// An error raised by a registered helper implementation.
///
/// Opaque to the core: the VM only knows that the call failed, not why.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("helper call failed: {message}")]
pub struct HelperError {
    pub message: String,
}

impl HelperError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Terminal fault raised by the interpreter.
///
/// All faults halt the VM; there is no in-program exception handler.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Fault {
    /// Unknown class/op/mode/size combination, or a malformed `LDDW`
    /// second word, encountered while decoding the word at `ip`.
    #[error("invalid instruction {word:#018x} at ip={ip}")]
    InvalidInstruction { word: u64, ip: u32 },

    /// `dst` or `src` named a register index ≥ 11.
    #[error("invalid register index {index}")]
    InvalidRegister { index: u8 },

    /// `DIV`/`MOD` with a zero divisor. The destination has already been
    /// set to all-ones by the caller before this fault is raised.
    #[error("division or modulo by zero")]
    DivideByZero,

    /// A load or store's `[addr, addr+size)` range fell outside data memory.
    #[error("data access out of bounds: addr={addr:#x} size={size}")]
    DataBounds { addr: u64, size: u8 },

    /// The instruction pointer fell outside `0..program_len`.
    #[error("program counter out of bounds: ip={ip}")]
    ProgramBounds { ip: u32 },

    /// `CALL imm` named a helper id with no registered handler.
    #[error("no helper registered for id {id}")]
    UnknownHelper { id: u32 },

    /// A registered helper signaled failure.
    #[error("helper call failed")]
    HelperFailed(#[from] HelperError),

    /// `run_to_completion` exceeded its caller-supplied instruction budget.
    #[error("instruction budget exceeded")]
    TickLimit,

    /// A program or data image passed to `load_image` would not fit in
    /// the memory it was loaded into.
    #[error("image of {len} bytes exceeds memory capacity of {capacity} bytes")]
    ImageTooLarge { len: usize, capacity: usize },

    /// A program image's length was not a whole number of instruction words.
    #[error("program image length {len} is not a multiple of 8 bytes")]
    MisalignedProgramImage { len: usize },
}
