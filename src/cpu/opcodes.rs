use lazy_static::lazy_static;

use super::addressing_mode::{AddressingMode, Operand};
use super::instructions::*;
use super::memory::CpuBus;
use super::CPU;

/// Executes one instruction on an already-resolved operand.
pub type Handler = fn(&mut CPU, &mut dyn CpuBus, Operand);

/// One row of the [6502 instruction reference](https://www.nesdev.org/obelisk-6502-guide/reference.html).
pub struct Opcode {
  pub code: u8,
  pub mnemonic: &'static str,
  /// bytes, opcode included
  pub length: u8,
  /// base cycle cost
  pub cycles: u8,
  /// one more cycle when an indexed address crosses a page
  pub page_cross_penalty: bool,
  pub mode: AddressingMode,
  pub handler: Handler,
}

impl Opcode {
  fn new(code: u8, mnemonic: &'static str, length: u8, cycles: u8, mode: AddressingMode, handler: Handler) -> Self {
    return Opcode {
      code,
      mnemonic,
      length,
      cycles,
      page_cross_penalty: false,
      mode,
      handler,
    };
  }

  fn paged(code: u8, mnemonic: &'static str, length: u8, cycles: u8, mode: AddressingMode, handler: Handler) -> Self {
    return Opcode {
      page_cross_penalty: true,
      ..Opcode::new(code, mnemonic, length, cycles, mode, handler)
    };
  }
}

impl std::fmt::Debug for Opcode {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Opcode")
      .field("code", &format_args!("{:02X}", self.code))
      .field("mnemonic", &self.mnemonic)
      .field("length", &self.length)
      .field("cycles", &self.cycles)
      .field("page_cross_penalty", &self.page_cross_penalty)
      .field("mode", &self.mode)
      .finish()
  }
}

lazy_static! {
  pub static ref CPU_OPCODES: Vec<Opcode> = {
    use AddressingMode::*;
    vec![
      Opcode::new(0x69, "ADC", 2, 2, Immediate, adc),
      Opcode::new(0x65, "ADC", 2, 3, ZeroPage, adc),
      Opcode::new(0x75, "ADC", 2, 4, ZeroPageX, adc),
      Opcode::new(0x6D, "ADC", 3, 4, Absolute, adc),
      Opcode::paged(0x7D, "ADC", 3, 4, AbsoluteX, adc),
      Opcode::paged(0x79, "ADC", 3, 4, AbsoluteY, adc),
      Opcode::new(0x61, "ADC", 2, 6, IndexedIndirect, adc),
      Opcode::paged(0x71, "ADC", 2, 5, IndirectIndexed, adc),

      Opcode::new(0x29, "AND", 2, 2, Immediate, and),
      Opcode::new(0x25, "AND", 2, 3, ZeroPage, and),
      Opcode::new(0x35, "AND", 2, 4, ZeroPageX, and),
      Opcode::new(0x2D, "AND", 3, 4, Absolute, and),
      Opcode::paged(0x3D, "AND", 3, 4, AbsoluteX, and),
      Opcode::paged(0x39, "AND", 3, 4, AbsoluteY, and),
      Opcode::new(0x21, "AND", 2, 6, IndexedIndirect, and),
      Opcode::paged(0x31, "AND", 2, 5, IndirectIndexed, and),

      Opcode::new(0x0A, "ASL", 1, 2, Accumulator, asl),
      Opcode::new(0x06, "ASL", 2, 5, ZeroPage, asl),
      Opcode::new(0x16, "ASL", 2, 6, ZeroPageX, asl),
      Opcode::new(0x0E, "ASL", 3, 6, Absolute, asl),
      Opcode::new(0x1E, "ASL", 3, 7, AbsoluteX, asl),

      Opcode::new(0x90, "BCC", 2, 2, Relative, bcc),
      Opcode::new(0xB0, "BCS", 2, 2, Relative, bcs),
      Opcode::new(0xF0, "BEQ", 2, 2, Relative, beq),
      Opcode::new(0x30, "BMI", 2, 2, Relative, bmi),
      Opcode::new(0xD0, "BNE", 2, 2, Relative, bne),
      Opcode::new(0x10, "BPL", 2, 2, Relative, bpl),
      Opcode::new(0x50, "BVC", 2, 2, Relative, bvc),
      Opcode::new(0x70, "BVS", 2, 2, Relative, bvs),

      Opcode::new(0x24, "BIT", 2, 3, ZeroPage, bit),
      Opcode::new(0x2C, "BIT", 3, 4, Absolute, bit),

      Opcode::new(0x00, "BRK", 1, 7, Implicit, brk),

      Opcode::new(0x18, "CLC", 1, 2, Implicit, clc),
      Opcode::new(0xD8, "CLD", 1, 2, Implicit, cld),
      Opcode::new(0x58, "CLI", 1, 2, Implicit, cli),
      Opcode::new(0xB8, "CLV", 1, 2, Implicit, clv),

      Opcode::new(0xC9, "CMP", 2, 2, Immediate, cmp),
      Opcode::new(0xC5, "CMP", 2, 3, ZeroPage, cmp),
      Opcode::new(0xD5, "CMP", 2, 4, ZeroPageX, cmp),
      Opcode::new(0xCD, "CMP", 3, 4, Absolute, cmp),
      Opcode::paged(0xDD, "CMP", 3, 4, AbsoluteX, cmp),
      Opcode::paged(0xD9, "CMP", 3, 4, AbsoluteY, cmp),
      Opcode::new(0xC1, "CMP", 2, 6, IndexedIndirect, cmp),
      Opcode::paged(0xD1, "CMP", 2, 5, IndirectIndexed, cmp),

      Opcode::new(0xE0, "CPX", 2, 2, Immediate, cpx),
      Opcode::new(0xE4, "CPX", 2, 3, ZeroPage, cpx),
      Opcode::new(0xEC, "CPX", 3, 4, Absolute, cpx),

      Opcode::new(0xC0, "CPY", 2, 2, Immediate, cpy),
      Opcode::new(0xC4, "CPY", 2, 3, ZeroPage, cpy),
      Opcode::new(0xCC, "CPY", 3, 4, Absolute, cpy),

      Opcode::new(0xC6, "DEC", 2, 5, ZeroPage, dec),
      Opcode::new(0xD6, "DEC", 2, 6, ZeroPageX, dec),
      Opcode::new(0xCE, "DEC", 3, 6, Absolute, dec),
      Opcode::new(0xDE, "DEC", 3, 7, AbsoluteX, dec),
      Opcode::new(0xCA, "DEX", 1, 2, Implicit, dex),
      Opcode::new(0x88, "DEY", 1, 2, Implicit, dey),

      Opcode::new(0x49, "EOR", 2, 2, Immediate, eor),
      Opcode::new(0x45, "EOR", 2, 3, ZeroPage, eor),
      Opcode::new(0x55, "EOR", 2, 4, ZeroPageX, eor),
      Opcode::new(0x4D, "EOR", 3, 4, Absolute, eor),
      Opcode::paged(0x5D, "EOR", 3, 4, AbsoluteX, eor),
      Opcode::paged(0x59, "EOR", 3, 4, AbsoluteY, eor),
      Opcode::new(0x41, "EOR", 2, 6, IndexedIndirect, eor),
      Opcode::paged(0x51, "EOR", 2, 5, IndirectIndexed, eor),

      Opcode::new(0xE6, "INC", 2, 5, ZeroPage, inc),
      Opcode::new(0xF6, "INC", 2, 6, ZeroPageX, inc),
      Opcode::new(0xEE, "INC", 3, 6, Absolute, inc),
      Opcode::new(0xFE, "INC", 3, 7, AbsoluteX, inc),
      Opcode::new(0xE8, "INX", 1, 2, Implicit, inx),
      Opcode::new(0xC8, "INY", 1, 2, Implicit, iny),

      Opcode::new(0x4C, "JMP", 3, 3, Absolute, jmp),
      Opcode::new(0x6C, "JMP", 3, 5, Indirect, jmp),
      Opcode::new(0x20, "JSR", 3, 6, Absolute, jsr),

      Opcode::new(0xA9, "LDA", 2, 2, Immediate, lda),
      Opcode::new(0xA5, "LDA", 2, 3, ZeroPage, lda),
      Opcode::new(0xB5, "LDA", 2, 4, ZeroPageX, lda),
      Opcode::new(0xAD, "LDA", 3, 4, Absolute, lda),
      Opcode::paged(0xBD, "LDA", 3, 4, AbsoluteX, lda),
      Opcode::paged(0xB9, "LDA", 3, 4, AbsoluteY, lda),
      Opcode::new(0xA1, "LDA", 2, 6, IndexedIndirect, lda),
      Opcode::paged(0xB1, "LDA", 2, 5, IndirectIndexed, lda),

      Opcode::new(0xA2, "LDX", 2, 2, Immediate, ldx),
      Opcode::new(0xA6, "LDX", 2, 3, ZeroPage, ldx),
      Opcode::new(0xB6, "LDX", 2, 4, ZeroPageY, ldx),
      Opcode::new(0xAE, "LDX", 3, 4, Absolute, ldx),
      Opcode::paged(0xBE, "LDX", 3, 4, AbsoluteY, ldx),

      Opcode::new(0xA0, "LDY", 2, 2, Immediate, ldy),
      Opcode::new(0xA4, "LDY", 2, 3, ZeroPage, ldy),
      Opcode::new(0xB4, "LDY", 2, 4, ZeroPageX, ldy),
      Opcode::new(0xAC, "LDY", 3, 4, Absolute, ldy),
      Opcode::paged(0xBC, "LDY", 3, 4, AbsoluteX, ldy),

      Opcode::new(0x4A, "LSR", 1, 2, Accumulator, lsr),
      Opcode::new(0x46, "LSR", 2, 5, ZeroPage, lsr),
      Opcode::new(0x56, "LSR", 2, 6, ZeroPageX, lsr),
      Opcode::new(0x4E, "LSR", 3, 6, Absolute, lsr),
      Opcode::new(0x5E, "LSR", 3, 7, AbsoluteX, lsr),

      Opcode::new(0xEA, "NOP", 1, 2, Implicit, nop),

      Opcode::new(0x09, "ORA", 2, 2, Immediate, ora),
      Opcode::new(0x05, "ORA", 2, 3, ZeroPage, ora),
      Opcode::new(0x15, "ORA", 2, 4, ZeroPageX, ora),
      Opcode::new(0x0D, "ORA", 3, 4, Absolute, ora),
      Opcode::paged(0x1D, "ORA", 3, 4, AbsoluteX, ora),
      Opcode::paged(0x19, "ORA", 3, 4, AbsoluteY, ora),
      Opcode::new(0x01, "ORA", 2, 6, IndexedIndirect, ora),
      Opcode::paged(0x11, "ORA", 2, 5, IndirectIndexed, ora),

      Opcode::new(0x48, "PHA", 1, 3, Implicit, pha),
      Opcode::new(0x08, "PHP", 1, 3, Implicit, php),
      Opcode::new(0x68, "PLA", 1, 4, Implicit, pla),
      Opcode::new(0x28, "PLP", 1, 4, Implicit, plp),

      Opcode::new(0x2A, "ROL", 1, 2, Accumulator, rol),
      Opcode::new(0x26, "ROL", 2, 5, ZeroPage, rol),
      Opcode::new(0x36, "ROL", 2, 6, ZeroPageX, rol),
      Opcode::new(0x2E, "ROL", 3, 6, Absolute, rol),
      Opcode::new(0x3E, "ROL", 3, 7, AbsoluteX, rol),

      Opcode::new(0x6A, "ROR", 1, 2, Accumulator, ror),
      Opcode::new(0x66, "ROR", 2, 5, ZeroPage, ror),
      Opcode::new(0x76, "ROR", 2, 6, ZeroPageX, ror),
      Opcode::new(0x6E, "ROR", 3, 6, Absolute, ror),
      Opcode::new(0x7E, "ROR", 3, 7, AbsoluteX, ror),

      Opcode::new(0x40, "RTI", 1, 6, Implicit, rti),
      Opcode::new(0x60, "RTS", 1, 6, Implicit, rts),

      Opcode::new(0xE9, "SBC", 2, 2, Immediate, sbc),
      Opcode::new(0xE5, "SBC", 2, 3, ZeroPage, sbc),
      Opcode::new(0xF5, "SBC", 2, 4, ZeroPageX, sbc),
      Opcode::new(0xED, "SBC", 3, 4, Absolute, sbc),
      Opcode::paged(0xFD, "SBC", 3, 4, AbsoluteX, sbc),
      Opcode::paged(0xF9, "SBC", 3, 4, AbsoluteY, sbc),
      Opcode::new(0xE1, "SBC", 2, 6, IndexedIndirect, sbc),
      Opcode::paged(0xF1, "SBC", 2, 5, IndirectIndexed, sbc),

      Opcode::new(0x38, "SEC", 1, 2, Implicit, sec),
      Opcode::new(0xF8, "SED", 1, 2, Implicit, sed),
      Opcode::new(0x78, "SEI", 1, 2, Implicit, sei),

      Opcode::new(0x85, "STA", 2, 3, ZeroPage, sta),
      Opcode::new(0x95, "STA", 2, 4, ZeroPageX, sta),
      Opcode::new(0x8D, "STA", 3, 4, Absolute, sta),
      Opcode::new(0x9D, "STA", 3, 5, AbsoluteX, sta),
      Opcode::new(0x99, "STA", 3, 5, AbsoluteY, sta),
      Opcode::new(0x81, "STA", 2, 6, IndexedIndirect, sta),
      Opcode::new(0x91, "STA", 2, 6, IndirectIndexed, sta),

      Opcode::new(0x86, "STX", 2, 3, ZeroPage, stx),
      Opcode::new(0x96, "STX", 2, 4, ZeroPageY, stx),
      Opcode::new(0x8E, "STX", 3, 4, Absolute, stx),

      Opcode::new(0x84, "STY", 2, 3, ZeroPage, sty),
      Opcode::new(0x94, "STY", 2, 4, ZeroPageX, sty),
      Opcode::new(0x8C, "STY", 3, 4, Absolute, sty),

      Opcode::new(0xAA, "TAX", 1, 2, Implicit, tax),
      Opcode::new(0xA8, "TAY", 1, 2, Implicit, tay),
      Opcode::new(0xBA, "TSX", 1, 2, Implicit, tsx),
      Opcode::new(0x8A, "TXA", 1, 2, Implicit, txa),
      Opcode::new(0x9A, "TXS", 1, 2, Implicit, txs),
      Opcode::new(0x98, "TYA", 1, 2, Implicit, tya),
    ]
  };

  /// Dispatch table indexed by opcode byte; `None` marks an illegal opcode.
  pub static ref OPCODE_TABLE: [Option<&'static Opcode>; 256] = {
    let mut table: [Option<&'static Opcode>; 256] = [None; 256];
    for opcode in CPU_OPCODES.iter() {
      table[opcode.code as usize] = Some(opcode);
    }
    table
  };
}

pub fn lookup(code: u8) -> Option<&'static Opcode> {
  OPCODE_TABLE[code as usize]
}

#[cfg(test)]
mod test {
  use super::*;
  use std::collections::HashSet;

  #[test]
  fn test_official_opcode_count() {
    assert_eq!(CPU_OPCODES.len(), 151);
    let unique: HashSet<u8> = CPU_OPCODES.iter().map(|op| op.code).collect();
    assert_eq!(unique.len(), 151);
  }

  #[test]
  fn test_lengths_agree_with_modes() {
    for opcode in CPU_OPCODES.iter() {
      assert_eq!(opcode.length, opcode.mode.operand_count() + 1, "{:?}", opcode);
    }
  }

  #[test]
  fn test_lookup() {
    let lda = lookup(0xA9).unwrap();
    assert_eq!(lda.mnemonic, "LDA");
    assert_eq!(lda.mode, AddressingMode::Immediate);
    assert!(lookup(0x02).is_none());
    assert!(lookup(0xFF).is_none());
  }
}
