use super::memory::CpuBus;

/// CPU addressing modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressingMode {
  /// Absolute addressing: the full memory location is the argument.
  ///
  /// ```text
  /// STA $C000 ;store the value in the accumulator at memory location $c000
  /// ```
  Absolute,

  /// Single-byte address into the first page of memory.
  ZeroPage,

  /// A zero page address plus X. The sum wraps inside the zero page:
  ///
  /// ```text
  /// LDX #$05
  /// STA $FF,X  ;Store the value of A at memory location $04
  /// ```
  ZeroPageX,

  /// Like `ZeroPageX`, only used by `LDX` and `STX`.
  ZeroPageY,

  /// Absolute address plus X, wrapping at $FFFF.
  ///
  /// ```text
  /// LDX #$01
  /// STA $0200,X ;store the value of A at memory location $0201
  /// ```
  AbsoluteX,
  AbsoluteY,

  /// The operand byte is the value itself: `LDX #$01`.
  Immediate,

  /// Branches: a signed offset from the next instruction.
  ///
  /// hexdump of `LDA #$01 / CMP #$02 / BNE not_equal / STA $22 / not_equal: BRK`:
  /// `a9 01 c9 02 d0 02 85 22 00`
  Relative,

  /// No operand at all (`INX`, `CLC`, ...).
  Implicit,

  /// Shifts and rotates acting on A (`ASL A`).
  Accumulator,

  /// `JMP ($00F0)`: the operand is a pointer to the target.
  ///
  /// The 6502 never carries into the pointer's high byte, so `JMP ($10FF)`
  /// reads its high byte from `$1000`.
  Indirect,

  /// `LDA ($00,X)`: add X to a zero page address, then read a two-byte
  /// address from there (both bytes inside the zero page).
  IndexedIndirect,

  /// `LDA ($01),Y`: read a two-byte address from the zero page, then add Y.
  IndirectIndexed,
}

/// What an instruction works on once its addressing mode is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
  None,
  Accumulator,
  Immediate(u8),
  Relative(i8),
  Memory {
    address: u16,
    /// The indexed effective address landed on a different page than the
    /// base address.
    page_crossed: bool,
  },
}

impl AddressingMode {
  /// Operand bytes following the opcode.
  pub fn operand_count(&self) -> u8 {
    use AddressingMode::*;
    match self {
      Implicit | Accumulator => 0,
      Immediate | Relative | ZeroPage | ZeroPageX | ZeroPageY | IndexedIndirect | IndirectIndexed => 1,
      Absolute | AbsoluteX | AbsoluteY | Indirect => 2,
    }
  }

  /// Resolve raw operand bytes into an [`Operand`].
  ///
  /// Pointer fetches for the indirect modes go through [`CpuBus::peek`]:
  /// pointers live in RAM or ROM, never in device registers.
  pub fn resolve(&self, operands: [u8; 2], x: u8, y: u8, bus: &dyn CpuBus) -> Operand {
    use AddressingMode::*;
    let [lo, hi] = operands;
    let absolute = u16::from_le_bytes([lo, hi]);
    match self {
      Implicit => Operand::None,
      Accumulator => Operand::Accumulator,
      Immediate => Operand::Immediate(lo),
      Relative => Operand::Relative(lo as i8),
      ZeroPage => memory(lo as u16, false),
      ZeroPageX => memory(zero_page_indexed(lo, x), false),
      ZeroPageY => memory(zero_page_indexed(lo, y), false),
      Absolute => memory(absolute, false),
      AbsoluteX => {
        let (address, page_crossed) = absolute_indexed(absolute, x);
        memory(address, page_crossed)
      }
      AbsoluteY => {
        let (address, page_crossed) = absolute_indexed(absolute, y);
        memory(address, page_crossed)
      }
      Indirect => memory(indirect(bus, absolute), false),
      IndexedIndirect => memory(indexed_indirect(bus, lo, x), false),
      IndirectIndexed => {
        let (address, page_crossed) = indirect_indexed(bus, lo, y);
        memory(address, page_crossed)
      }
    }
  }
}

fn memory(address: u16, page_crossed: bool) -> Operand {
  Operand::Memory { address, page_crossed }
}

/// Zero page plus index, wrapped to 8 bits.
pub fn zero_page_indexed(base: u8, index: u8) -> u16 {
  base.wrapping_add(index) as u16
}

/// Absolute plus index, wrapped to 16 bits. Also reports a page cross.
pub fn absolute_indexed(base: u16, index: u8) -> (u16, bool) {
  let address = base.wrapping_add(index as u16);
  (address, page_crossed(base, address))
}

pub fn page_crossed(a: u16, b: u16) -> bool {
  a & 0xFF00 != b & 0xFF00
}

/// Little-endian pointer stored in the zero page; the high byte wraps to $00.
fn zero_page_pointer(bus: &dyn CpuBus, pointer: u8) -> u16 {
  let lo = bus.peek(pointer as u16);
  let hi = bus.peek(pointer.wrapping_add(1) as u16);
  u16::from_le_bytes([lo, hi])
}

pub fn indirect(bus: &dyn CpuBus, pointer: u16) -> u16 {
  let hi_pointer = (pointer & 0xFF00) | (pointer.wrapping_add(1) & 0x00FF);
  u16::from_le_bytes([bus.peek(pointer), bus.peek(hi_pointer)])
}

pub fn indexed_indirect(bus: &dyn CpuBus, base: u8, x: u8) -> u16 {
  zero_page_pointer(bus, base.wrapping_add(x))
}

pub fn indirect_indexed(bus: &dyn CpuBus, base: u8, y: u8) -> (u16, bool) {
  absolute_indexed(zero_page_pointer(bus, base), y)
}
