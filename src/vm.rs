//! The interpreter: state (registers, program memory, data memory,
//! helper registry) plus the fetch/decode/execute loop.

use tracing::{debug, trace, warn};

use crate::alu;
use crate::config::InterpreterConfig;
use crate::data_memory::DataMemory;
use crate::decode::{self, Decoded};
use crate::error::Fault;
use crate::helpers::HelperRegistry;
use crate::instruction::{Instruction, JmpOp, Source};
use crate::program_memory::{Endianness, ProgramMemory};
use crate::registers::RegisterFile;

/// Snapshot of the control-plane status flags a host can observe,
/// mirroring the reference hardware's read-only `status` register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    pub reset_released: bool,
    pub halted: bool,
    pub errored: bool,
    pub debug_enabled: bool,
}

/// A single eBPF interpreter instance: registers, program and data
/// memory, the registered helper set, and the fetch/decode/execute
/// control state (instruction pointer, tick counter, halt/error flags).
#[derive(Debug)]
pub struct Interpreter {
    registers: RegisterFile,
    program: ProgramMemory,
    data: DataMemory,
    helpers: HelperRegistry,
    program_endianness: Endianness,
    ip: u32,
    ticks: u64,
    halted: bool,
    errored: bool,
    reset_released: bool,
    debug_enabled: bool,
}

impl Interpreter {
    pub fn new(config: InterpreterConfig) -> Self {
        Self {
            registers: RegisterFile::new(),
            program: ProgramMemory::with_capacity(config.program_capacity),
            data: DataMemory::with_capacity(config.data_capacity),
            helpers: HelperRegistry::new(),
            program_endianness: config.program_endianness,
            ip: 0,
            ticks: 0,
            halted: false,
            errored: false,
            reset_released: false,
            debug_enabled: config.debug_enabled,
        }
    }

    /// Load a flat program image, byte-swapping per the configured
    /// on-disk endianness.
    pub fn load_program_image(&mut self, image: &[u8]) -> Result<(), Fault> {
        self.program.load_image(image, self.program_endianness)
    }

    /// Load already-decoded little-endian instruction words directly.
    pub fn load_program_words(&mut self, words: &[u64]) {
        self.program.load_words(words);
    }

    /// Load a flat data image at offset 0.
    pub fn load_data_image(&mut self, image: &[u8]) -> Result<(), Fault> {
        self.data.load_image(image)
    }

    /// Mutable access to the helper registry, for the host to register
    /// handlers before running a program.
    pub fn helpers_mut(&mut self) -> &mut HelperRegistry {
        &mut self.helpers
    }

    /// Reset control state and latch `inputs` into R1..R5. Does not
    /// touch program or data memory.
    pub fn reset(&mut self, inputs: [u64; 5]) {
        debug!(?inputs, "resetting interpreter");
        self.registers.reset(inputs);
        self.ip = 0;
        self.ticks = 0;
        self.halted = false;
        self.errored = false;
        self.reset_released = true;
    }

    pub fn registers(&self) -> &RegisterFile {
        &self.registers
    }

    /// Direct read/write access to R0..R10, for host-side debug
    /// tooling — not exercised by ordinary program execution.
    pub fn registers_mut(&mut self) -> &mut RegisterFile {
        &mut self.registers
    }

    /// Read-only view of program memory, for host-side inspection.
    pub fn program_words(&self) -> &[u64] {
        self.program.words()
    }

    /// Read-only view of data memory, for host-side inspection.
    pub fn data_bytes(&self) -> &[u8] {
        self.data.bytes()
    }

    pub fn ip(&self) -> u32 {
        self.ip
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn is_errored(&self) -> bool {
        self.errored
    }

    /// Snapshot of the control-plane status flags.
    pub fn status(&self) -> Status {
        Status {
            reset_released: self.reset_released,
            halted: self.halted,
            errored: self.errored,
            debug_enabled: self.debug_enabled,
        }
    }

    pub fn set_debug_enabled(&mut self, debug_enabled: bool) {
        self.debug_enabled = debug_enabled;
    }

    /// Execute at most one retired instruction (an `LDDW` counts as
    /// one, despite spanning two words). A no-op once halted.
    pub fn step(&mut self) -> Result<(), Fault> {
        if self.halted {
            return Ok(());
        }
        match self.step_inner() {
            Ok(()) => Ok(()),
            Err(fault) => {
                self.halted = true;
                self.errored = true;
                warn!(?fault, ip = self.ip, "interpreter fault");
                Err(fault)
            }
        }
    }

    /// Step until halted or `budget` retired instructions have elapsed,
    /// returning the number of ticks actually consumed. Exceeding the
    /// budget without halting faults with [`Fault::TickLimit`].
    pub fn run_to_completion(&mut self, budget: u64) -> Result<u64, Fault> {
        while !self.halted {
            if self.ticks >= budget {
                self.halted = true;
                self.errored = true;
                warn!(budget, "instruction budget exceeded");
                return Err(Fault::TickLimit);
            }
            self.step()?;
        }
        Ok(self.ticks)
    }

    fn step_inner(&mut self) -> Result<(), Fault> {
        let word = self.program.fetch(self.ip)?;
        let decoded = decode::decode(word, self.ip)?;

        let (instr, words_consumed) = match decoded {
            Decoded::Complete(instr) => (instr, 1u32),
            Decoded::NeedsImm64Tail { dst, low } => {
                let tail_ip = self.ip + 1;
                let tail_word = self.program.fetch(tail_ip)?;
                let instr = decode::finish_lddw(dst, low, tail_word, tail_ip)?;
                (instr, 2u32)
            }
        };

        trace!(ip = self.ip, ?instr, "executing");
        self.ticks += 1;
        self.execute(instr, words_consumed)
    }

    fn resolve(&self, is64: bool, src: Source) -> u64 {
        match src {
            Source::Imm(imm) => {
                if is64 {
                    imm as i64 as u64
                } else {
                    imm as u32 as u64
                }
            }
            Source::Reg(r) => self.registers.get(r),
        }
    }

    fn execute(&mut self, instr: Instruction, words_consumed: u32) -> Result<(), Fault> {
        let mut next_ip = self.ip.wrapping_add(words_consumed);

        match instr {
            Instruction::Alu { is64, op, dst, src } => {
                let dst_val = self.registers.get(dst);
                let operand = self.resolve(is64, src);
                match alu::compute(is64, op, dst_val, operand) {
                    Ok(value) => self.registers.set(dst, value),
                    Err(Fault::DivideByZero) => {
                        self.registers.set(dst, u64::MAX);
                        return Err(Fault::DivideByZero);
                    }
                    Err(other) => return Err(other),
                }
            }
            Instruction::Endian { to_be, width, dst } => {
                let value = self.registers.get(dst);
                self.registers.set(dst, alu::endian_convert(to_be, width, value));
            }
            Instruction::LoadImm64 { dst, imm } => {
                self.registers.set(dst, imm);
            }
            Instruction::Load { size, dst, src, offset } => {
                let addr = self.registers.get(src).wrapping_add(offset as i64 as u64);
                let value = self.data.load_le(addr, size)?;
                self.registers.set(dst, value);
            }
            Instruction::LoadAbs { size, imm } => {
                let addr = imm as u32 as u64;
                let value = self.data.load_be(addr, size)?;
                self.registers.set(0, value);
            }
            Instruction::StoreImm { size, dst, offset, imm } => {
                let addr = self.registers.get(dst).wrapping_add(offset as i64 as u64);
                self.data.store_le(addr, size, imm as i64 as u64)?;
            }
            Instruction::StoreReg { size, dst, offset, src } => {
                let addr = self.registers.get(dst).wrapping_add(offset as i64 as u64);
                let value = self.registers.get(src);
                self.data.store_le(addr, size, value)?;
            }
            Instruction::Jump { is64, op, dst, src, offset } => {
                let taken = self.branch_taken(is64, op, dst, src);
                if taken {
                    next_ip = (self.ip as i64 + words_consumed as i64 + offset as i64) as u32;
                }
            }
            Instruction::Call { imm } => {
                let args = [
                    self.registers.get(1),
                    self.registers.get(2),
                    self.registers.get(3),
                    self.registers.get(4),
                    self.registers.get(5),
                ];
                let result = self.helpers.invoke(imm, args)?;
                self.registers.set(0, result);
            }
            Instruction::Exit => {
                debug!(r0 = self.registers.get(0), ticks = self.ticks, "halting on exit");
                self.halted = true;
                return Ok(());
            }
        }

        self.ip = next_ip;
        Ok(())
    }

    /// Evaluate a jump predicate. `JA` is unconditional; `JSGT`/`JSGE`/
    /// `JSLT`/`JSLE` sign-extend from bit 31 of each operand even
    /// though every jump instruction is otherwise 64-bit wide — see
    /// the signed-comparison note in the interpreter's design notes.
    fn branch_taken(&self, is64: bool, op: JmpOp, dst: u8, src: Source) -> bool {
        if op.is_unconditional() {
            return true;
        }
        let dst_val = self.registers.get(dst);
        let operand = self.resolve(is64, src);
        match op {
            JmpOp::Ja => unreachable!("handled by is_unconditional above"),
            JmpOp::Jeq => dst_val == operand,
            JmpOp::Jne => dst_val != operand,
            JmpOp::Jgt => dst_val > operand,
            JmpOp::Jge => dst_val >= operand,
            JmpOp::Jlt => dst_val < operand,
            JmpOp::Jle => dst_val <= operand,
            JmpOp::Jset => (dst_val & operand) != 0,
            JmpOp::Jsgt => sign_extend_32(dst_val) > sign_extend_32(operand),
            JmpOp::Jsge => sign_extend_32(dst_val) >= sign_extend_32(operand),
            JmpOp::Jslt => sign_extend_32(dst_val) < sign_extend_32(operand),
            JmpOp::Jsle => sign_extend_32(dst_val) <= sign_extend_32(operand),
            JmpOp::Call | JmpOp::Exit => {
                unreachable!("CALL and EXIT decode to their own Instruction variants")
            }
        }
    }
}

fn sign_extend_32(value: u64) -> i64 {
    value as u32 as i32 as i64
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(InterpreterConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode;
    use crate::instruction::AluOp;

    fn vm_with(words: &[u64]) -> Interpreter {
        let mut vm = Interpreter::default();
        vm.load_program_words(words);
        vm
    }

    #[test]
    fn mov_then_exit_sets_r0() {
        let mut vm = vm_with(&[encode::mov64_imm(0, 42), encode::exit()]);
        let ticks = vm.run_to_completion(10).unwrap();
        assert_eq!(vm.registers().get(0), 42);
        assert!(vm.is_halted());
        assert!(!vm.is_errored());
        assert_eq!(ticks, 2);
    }

    #[test]
    fn status_reflects_reset_and_halt() {
        let mut vm = vm_with(&[encode::exit()]);
        assert!(!vm.status().reset_released);
        vm.reset([0; 5]);
        assert!(vm.status().reset_released);
        assert!(!vm.status().halted);
        vm.run_to_completion(10).unwrap();
        assert!(vm.status().halted);
        assert!(!vm.status().errored);
    }

    #[test]
    fn registers_mut_allows_direct_host_writes() {
        let mut vm = vm_with(&[encode::exit()]);
        vm.registers_mut().set(3, 99);
        assert_eq!(vm.registers().get(3), 99);
    }

    #[test]
    fn program_and_data_windows_are_readable() {
        let mut vm = vm_with(&[encode::exit()]);
        vm.load_data_image(&[1, 2, 3]).unwrap();
        assert_eq!(vm.program_words()[0], encode::exit());
        assert_eq!(&vm.data_bytes()[..3], &[1, 2, 3]);
    }

    #[test]
    fn add32_truncates_the_result() {
        let mut vm = vm_with(&[
            encode::mov64_imm(0, -1),
            encode::add32_imm(0, 1),
            encode::exit(),
        ]);
        vm.run_to_completion(10).unwrap();
        assert_eq!(vm.registers().get(0), 0);
    }

    #[test]
    fn lddw_loads_a_64_bit_immediate_and_advances_two_words() {
        let (low, high) = encode::lddw(0, 0xAABB_CCDD_EEFF_0011);
        let mut vm = vm_with(&[low, high, encode::exit()]);
        vm.run_to_completion(10).unwrap();
        assert_eq!(vm.registers().get(0), 0xAABB_CCDD_EEFF_0011);
    }

    #[test]
    fn store_then_load_round_trips_through_data_memory() {
        let mut vm = vm_with(&[
            encode::mov64_imm(1, 0x10),
            encode::mov64_imm(2, 0x1234),
            encode::stxdw(1, 0, 2),
            encode::ldxdw(0, 1, 0),
            encode::exit(),
        ]);
        vm.run_to_completion(10).unwrap();
        assert_eq!(vm.registers().get(0), 0x1234);
    }

    #[test]
    fn load_abs_reads_big_endian() {
        let mut vm = vm_with(&[encode::ldabsh(0), encode::exit()]);
        vm.load_data_image(&[0x01, 0x02]).unwrap();
        vm.run_to_completion(10).unwrap();
        assert_eq!(vm.registers().get(0), 0x0102);
    }

    #[test]
    fn signed_branch_not_taken_falls_through() {
        // r1 = -1 (as u64); JSGT r1, 0, +1 should not be taken since -1 < 0
        let mut vm = vm_with(&[
            encode::mov64_imm(1, -1),
            encode::jsgt_imm(1, 0, 1),
            encode::mov64_imm(0, 1),
            encode::exit(),
        ]);
        vm.run_to_completion(10).unwrap();
        assert_eq!(vm.registers().get(0), 1);
    }

    #[test]
    fn divide_by_zero_sets_residue_and_faults() {
        let mut vm = vm_with(&[
            encode::mov64_imm(1, 10),
            encode::mov64_imm(2, 0),
            encode::div64_reg(1, 2),
            encode::exit(),
        ]);
        let err = vm.run_to_completion(10).unwrap_err();
        assert_eq!(err, Fault::DivideByZero);
        assert_eq!(vm.registers().get(1), u64::MAX);
        assert!(vm.is_halted());
        assert!(vm.is_errored());
    }

    #[test]
    fn tick_limit_is_enforced() {
        let mut vm = vm_with(&[encode::ja(-1)]);
        let err = vm.run_to_completion(5).unwrap_err();
        assert_eq!(err, Fault::TickLimit);
        assert_eq!(vm.ticks(), 5);
    }

    #[test]
    fn unknown_helper_faults() {
        let mut vm = vm_with(&[encode::call(1), encode::exit()]);
        let err = vm.run_to_completion(10).unwrap_err();
        assert_eq!(err, Fault::UnknownHelper { id: 1 });
    }

    #[test]
    fn registered_helper_runs_and_writes_r0() {
        let mut vm = vm_with(&[encode::call(1), encode::exit()]);
        vm.reset([5, 6, 0, 0, 0]);
        vm.helpers_mut().register_fn(1, |args| Ok(args[0] + args[1]));
        vm.run_to_completion(10).unwrap();
        assert_eq!(vm.registers().get(0), 11);
    }

    #[test]
    fn step_after_halt_is_a_no_op() {
        let mut vm = vm_with(&[encode::exit()]);
        vm.step().unwrap();
        assert!(vm.is_halted());
        vm.step().unwrap();
        assert_eq!(vm.ticks(), 1);
    }

    #[test]
    fn neg_operates_on_destination_only() {
        let mut vm = vm_with(&[
            encode::mov64_imm(0, 5),
            encode::alu64_imm(AluOp::Neg, 0, 0),
            encode::exit(),
        ]);
        vm.run_to_completion(10).unwrap();
        assert_eq!(vm.registers().get(0), 0u64.wrapping_sub(5));
    }
}
