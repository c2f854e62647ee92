use super::status_flags::Flags;

/// The registers on the NES CPU are the same as on the 6502:
///
/// - Accumulator
/// - 2 Indexes
/// - Program Counter
/// - Stack Pointer
/// - Status
///
/// NES Dev: [CPU_registers](https://www.nesdev.org/wiki/CPU_registers)
///
/// Every 8-bit register is a `u8`, so results are always in `0..=255`;
/// arithmetic uses the wrapping helpers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registers {
  /// accumulator
  pub a: u8,

  /// X - Indexes
  pub x: u8,

  /// Y - Indexes
  pub y: u8,

  /// status register [NV-B DIZC]
  ///
  /// also call name **P**
  pub status: Flags,

  /// stack pointer, an offset into page 1
  pub stack_pointer: u8,

  /// program counter
  pub program_counter: u16,
}

impl Registers {
  pub fn new() -> Self {
    return Registers {
      a: 0x00,
      x: 0x00,
      y: 0x00,
      status: Flags::from_bits_truncate(0x34),
      stack_pointer: 0x00,
      program_counter: 0x0000,
    };
  }

  /// [CPU power up state](https://www.nesdev.org/wiki/CPU_power_up_state)
  pub fn reset(&mut self, program_counter: u16) {
    self.a = 0x00;
    self.x = 0x00;
    self.y = 0x00;
    // NV-B DIZC
    // 0010 0100
    self.status = Flags::from_bits_truncate(0x24);
    self.stack_pointer = 0xFD;
    self.program_counter = program_counter;
  }

  pub fn set_nz_flags(&mut self, result: u8) {
    self.status.set(Flags::Z, result == 0);
    self.status.set(Flags::N, result & 0x80 == 0x80);
  }

  /// ## [The 6502 overflow flag explained mathematically](http://www.righto.com/2012/12/the-6502-overflow-flag-explained.html)
  ///
  /// Overflow can only happen when both operands share a sign and the result
  /// has the other one:
  ///
  /// 1. `data ^ result` has bit 7 set when `data` and `result` differ in sign
  /// 2. `self.a ^ result` has bit 7 set when `self.a` and `result` differ in sign
  /// 3. when both are set, the result's sign disagrees with both inputs
  ///
  /// Carry is taken from the unmasked sum (`sum > 0xFF`).
  pub fn add_to_a(&mut self, data: u8) {
    let a = self.a as u16;
    let sum = a + (data as u16) + (if self.status.contains(Flags::C) { 1 } else { 0 });
    let result = sum as u8;

    self.status.set(Flags::C, sum > 0xFF);
    self.status.set(Flags::V, (data ^ result) & (self.a ^ result) & 0x80 != 0);

    self.a = result;
    self.set_nz_flags(self.a);
  }

  /// SBC is `A - M - (1 - C)`. Carry is the inverted borrow, i.e. it is set
  /// unless the signed-extended difference went below zero. Overflow uses the
  /// ADC formula with the one's complement of the operand.
  pub fn sub_from_a(&mut self, data: u8) {
    let borrow = if self.status.contains(Flags::C) { 0 } else { 1 };
    let difference = self.a as i16 - data as i16 - borrow;
    let result = difference as u8;

    self.status.set(Flags::C, !(difference < 0));
    self.status.set(Flags::V, (self.a ^ result) & (!data ^ result) & 0x80 != 0);

    self.a = result;
    self.set_nz_flags(self.a);
  }

  /// CMP/CPX/CPY: subtract without storing.
  pub fn compare(&mut self, register: u8, data: u8) {
    let result = register.wrapping_sub(data);
    self.status.set(Flags::C, register >= data);
    self.set_nz_flags(result);
  }
}

impl Default for Registers {
  fn default() -> Self {
    Registers::new()
  }
}

#[cfg(test)]
mod test {
  use super::*;

  const EDGES: [u8; 4] = [0x00, 0x7F, 0x80, 0xFF];

  #[test]
  fn test_update_zero_and_negative_flags() {
    let mut registers = Registers::new();

    registers.set_nz_flags(0x00);
    assert!(registers.status.contains(Flags::Z));

    registers.set_nz_flags(0x80);
    assert!(registers.status.contains(Flags::N));
    assert!(!registers.status.contains(Flags::Z));
  }

  #[test]
  fn test_adc_truth_table() {
    for &a in EDGES.iter() {
      for &m in EDGES.iter() {
        for carry in [false, true] {
          let mut registers = Registers::new();
          registers.a = a;
          registers.status.set(Flags::C, carry);
          registers.add_to_a(m);

          let unsigned = a as u16 + m as u16 + carry as u16;
          let signed = a as i8 as i16 + m as i8 as i16 + carry as i16;
          let label = format!("{:02X} + {:02X} + {}", a, m, carry as u8);
          assert_eq!(registers.a, unsigned as u8, "{}", label);
          assert_eq!(registers.status.contains(Flags::C), unsigned > 0xFF, "{}", label);
          assert_eq!(registers.status.contains(Flags::V), signed < -128 || signed > 127, "{}", label);
          assert_eq!(registers.status.contains(Flags::Z), unsigned as u8 == 0, "{}", label);
          assert_eq!(registers.status.contains(Flags::N), unsigned as u8 & 0x80 != 0, "{}", label);
        }
      }
    }
  }

  #[test]
  fn test_sbc_truth_table() {
    for &a in EDGES.iter() {
      for &m in EDGES.iter() {
        for carry in [false, true] {
          let mut registers = Registers::new();
          registers.a = a;
          registers.status.set(Flags::C, carry);
          registers.sub_from_a(m);

          let borrow = !carry as i16;
          let unsigned = a as i16 - m as i16 - borrow;
          let signed = a as i8 as i16 - m as i8 as i16 - borrow;
          let label = format!("{:02X} - {:02X} - {}", a, m, borrow);
          assert_eq!(registers.a, unsigned as u8, "{}", label);
          assert_eq!(registers.status.contains(Flags::C), unsigned >= 0, "{}", label);
          assert_eq!(registers.status.contains(Flags::V), signed < -128 || signed > 127, "{}", label);
          assert_eq!(registers.status.contains(Flags::Z), unsigned as u8 == 0, "{}", label);
          assert_eq!(registers.status.contains(Flags::N), unsigned as u8 & 0x80 != 0, "{}", label);
        }
      }
    }
  }

  #[test]
  fn test_compare() {
    let mut registers = Registers::new();
    registers.compare(0x10, 0x20);
    assert!(!registers.status.contains(Flags::C));
    assert!(registers.status.contains(Flags::N));

    registers.compare(0x20, 0x20);
    assert!(registers.status.contains(Flags::C));
    assert!(registers.status.contains(Flags::Z));

    registers.compare(0x80, 0x01);
    assert!(registers.status.contains(Flags::C));
    assert!(!registers.status.contains(Flags::N));
    assert!(!registers.status.contains(Flags::Z));
  }
}
