//! Interpreter configuration: memory sizing and on-disk byte order.

use crate::data_memory;
use crate::program_memory::{self, Endianness};

/// Construction-time configuration for an [`crate::vm::Interpreter`].
#[derive(Debug, Clone)]
pub struct InterpreterConfig {
    /// Instruction capacity of program memory.
    pub program_capacity: usize,
    /// Byte capacity of data memory.
    pub data_capacity: usize,
    /// On-disk byte order of a program image passed to
    /// [`crate::vm::Interpreter::load_program_image`].
    pub program_endianness: Endianness,
    /// Initial value of the control plane's debug-enabled status bit.
    /// Purely observational; the core does not alter its own behavior
    /// based on it.
    pub debug_enabled: bool,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            program_capacity: program_memory::DEFAULT_CAPACITY,
            data_capacity: data_memory::DEFAULT_CAPACITY,
            program_endianness: Endianness::LittleEndianOnDisk,
            debug_enabled: false,
        }
    }
}

impl InterpreterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_program_capacity(mut self, capacity: usize) -> Self {
        self.program_capacity = capacity;
        self
    }

    pub fn with_data_capacity(mut self, capacity: usize) -> Self {
        self.data_capacity = capacity;
        self
    }

    pub fn with_program_endianness(mut self, endianness: Endianness) -> Self {
        self.program_endianness = endianness;
        self
    }

    pub fn with_debug_enabled(mut self, debug_enabled: bool) -> Self {
        self.debug_enabled = debug_enabled;
        self
    }
}
