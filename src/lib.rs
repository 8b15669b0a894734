//! Interpreter core for a 64-bit eBPF-like RISC instruction set.
//!
//! This crate is the execution engine only: decoder, ALU, load/store
//! unit, branch unit and helper-call bridge over an in-memory register
//! file and byte-addressable program/data memory. It does not verify
//! programs, does not JIT, and carries no notion of maps, tail calls
//! or BTF type information — see [`vm::Interpreter`] for the surface
//! a host embeds against.

pub mod alu;
pub mod config;
pub mod data_memory;
pub mod decode;
pub mod error;
pub mod helpers;
pub mod instruction;
pub mod program_memory;
pub mod registers;
pub mod vm;

/// Instruction word builders for tests. Not used by the interpreter
/// itself; kept public so integration tests and embedding hosts can
/// assemble programs without hand-deriving opcode bytes.
pub mod encode;

pub use config::InterpreterConfig;
pub use error::{Fault, HelperError};
pub use helpers::{Helper, HelperRegistry};
pub use instruction::Instruction;
pub use vm::{Interpreter, Status};
