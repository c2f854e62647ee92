pub mod addressing_mode;
mod instructions;
pub mod memory;
pub mod opcodes;
pub mod register;
pub mod status_flags;

use thiserror::Error;

use self::addressing_mode::Operand;
use self::memory::CpuBus;
use self::register::Registers;
use self::status_flags::Flags;

pub const NMI_VECTOR: u16 = 0xFFFA;
pub const RESET_VECTOR: u16 = 0xFFFC;
pub const BRK_VECTOR: u16 = 0xFFFE;

const STACK_PAGE: u16 = 0x0100;

/// Cycles charged for an illegal opcode byte that gets skipped.
const ILLEGAL_SKIP_CYCLES: u64 = 2;

/// Problems the CPU reports but recovers from on its own.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CpuError {
  #[error("illegal instruction {opcode:02X} at {pc:04X}")]
  IllegalInstruction { opcode: u8, pc: u16 },

  #[error("opcode {opcode:02X} at {pc:04X} expects {expected} operand bytes, table provides {available}")]
  OperandMismatch { opcode: u8, pc: u16, expected: u8, available: u8 },

  #[error("no status flag named {0:?}")]
  BadFlagIdentifier(char),
}

/// A 6502 without decimal mode, as found in the 2A03.
///
/// The CPU does not own memory. Every entry point borrows a [`CpuBus`] for the
/// duration of the call.
#[derive(Debug, Clone)]
pub struct CPU {
  pub registers: Registers,
  /// Running total of CPU cycles since power on.
  pub cycles: u64,
}

impl CPU {
  pub fn new() -> Self {
    return CPU {
      registers: Registers::new(),
      cycles: 0,
    };
  }

  /// The NES signals the CPU with a `Reset interrupt` when a cartridge is
  /// inserted, which:
  ///
  /// - resets registers and flags
  /// - loads `program_counter` from the 16 bit address stored at `0xFFFC`
  pub fn reset(&mut self, bus: &mut dyn CpuBus) {
    let program_counter = bus.read_u16(RESET_VECTOR);
    self.registers.reset(program_counter);
    self.cycles = 7;
  }

  /// Fetch, decode and execute one instruction. Returns the cycles it took.
  ///
  /// An unknown opcode is skipped: the program counter moves one byte on,
  /// two cycles are charged and the error is returned for the caller to
  /// report. Execution can continue with the next call.
  pub fn step(&mut self, bus: &mut dyn CpuBus) -> Result<u8, CpuError> {
    let pc = self.registers.program_counter;
    let code = bus.read(pc);

    let opcode = match opcodes::lookup(code) {
      Some(opcode) => opcode,
      None => return Err(self.skip_illegal(CpuError::IllegalInstruction { opcode: code, pc })),
    };

    let available = opcode.length.saturating_sub(1);
    let expected = opcode.mode.operand_count();
    if available != expected {
      return Err(self.skip_illegal(CpuError::OperandMismatch {
        opcode: code,
        pc,
        expected,
        available,
      }));
    }

    let mut operands = [0u8; 2];
    for (i, byte) in operands.iter_mut().take(available as usize).enumerate() {
      *byte = bus.read(pc.wrapping_add(1 + i as u16));
    }
    let operand = opcode.mode.resolve(operands, self.registers.x, self.registers.y, &*bus);

    let start = self.cycles;
    self.registers.program_counter = pc.wrapping_add(opcode.length as u16);
    self.cycles += opcode.cycles as u64;
    if opcode.page_cross_penalty {
      if let Operand::Memory { page_crossed: true, .. } = operand {
        self.cycles += 1;
      }
    }

    (opcode.handler)(self, bus, operand);

    Ok((self.cycles - start) as u8)
  }

  fn skip_illegal(&mut self, error: CpuError) -> CpuError {
    log::warn!("{}", error);
    self.registers.program_counter = self.registers.program_counter.wrapping_add(1);
    self.cycles += ILLEGAL_SKIP_CYCLES;
    error
  }

  /// Interrupt entry: push PC (high byte first) and the status register with
  /// bits 4 and 5 set, disable IRQs, then jump through `vector`.
  pub fn interrupt(&mut self, bus: &mut dyn CpuBus, vector: u16) {
    let pc = self.registers.program_counter;
    self.push_u16(bus, pc);
    let status = self.registers.status | Flags::PUSHED;
    self.push(bus, status.bits());
    self.registers.status.insert(Flags::I);
    self.registers.program_counter = bus.read_u16(vector);
    self.cycles += 7;
  }

  /// Set or clear a status flag by letter, for debugger front ends.
  pub fn set_flag(&mut self, identifier: char, enabled: bool) -> Result<(), CpuError> {
    match Flags::from_identifier(identifier) {
      Ok(flag) => {
        self.registers.status.set(flag, enabled);
        Ok(())
      }
      Err(error) => {
        log::warn!("{}", error);
        Err(error)
      }
    }
  }

  pub fn flag(&self, identifier: char) -> Result<bool, CpuError> {
    Flags::from_identifier(identifier).map(|flag| self.registers.status.contains(flag))
  }

  // The stack lives in page 1 and grows down.

  pub(crate) fn push(&mut self, bus: &mut dyn CpuBus, data: u8) {
    bus.write(STACK_PAGE + self.registers.stack_pointer as u16, data);
    self.registers.stack_pointer = self.registers.stack_pointer.wrapping_sub(1);
  }

  pub(crate) fn pull(&mut self, bus: &mut dyn CpuBus) -> u8 {
    self.registers.stack_pointer = self.registers.stack_pointer.wrapping_add(1);
    bus.read(STACK_PAGE + self.registers.stack_pointer as u16)
  }

  pub(crate) fn push_u16(&mut self, bus: &mut dyn CpuBus, data: u16) {
    self.push(bus, (data >> 8) as u8);
    self.push(bus, (data & 0xFF) as u8);
  }

  pub(crate) fn pull_u16(&mut self, bus: &mut dyn CpuBus) -> u16 {
    let lo = self.pull(bus) as u16;
    let hi = self.pull(bus) as u16;
    (hi << 8) | lo
  }

  /// PLP and RTI: B does not exist in the register, bit 5 always reads 1.
  pub(crate) fn restore_status(&mut self, pulled: u8) {
    let mut status = Flags::from_bits_truncate(pulled);
    status.remove(Flags::B);
    status.insert(Flags::U);
    self.registers.status = status;
  }
}

impl Default for CPU {
  fn default() -> Self {
    CPU::new()
  }
}
