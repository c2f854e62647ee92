use bitflags::bitflags;

use super::CpuError;

bitflags! {
  /// [Status Register Flags](http://wiki.nesdev.com/w/index.php/Status_flags) (bit 7 to bit 0)
  ///
  /// | Bit | Flag |    |
  /// |-----|------|-----------------------------------|
  /// |  7   | N   |	Negative                          |
  /// |  6   | V   |	Overflow                          |
  /// |  5   | -   |	unused, always pushed as 1        |
  /// |  4   | B   |	Break (only exists on the stack)  |
  /// |  3   | D   |	Decimal (stored, never used)      |
  /// |  2   | I   |	Interrupt (IRQ disable)           |
  /// |  1   | Z   |	Zero                              |
  /// |  0   | C   |	Carry                             |
  pub struct Flags: u8 {
    /// Carry
    const C = 0b00000001;

    /// Zero
    const Z = 0b00000010;

    /// Interrupt (IRQ disable)
    const I = 0b00000100;

    /// Decimal. The 2A03 has no BCD unit, so the bit only round-trips.
    const D = 0b00001000;

    /// Break
    const B = 0b00010000;

    /// unused
    const U = 0b00100000;

    /// Overflow
    const V = 0b01000000;

    /// Negative
    const N = 0b10000000;
  }
}

impl Flags {
  /// Bits forced on whenever the status register is pushed by BRK, PHP or
  /// an interrupt entry.
  pub const PUSHED: Flags = Flags::from_bits_truncate(0b0011_0000);

  /// Look a flag up by its conventional letter (`n v b d i z c`, either case).
  ///
  /// The unused bit 5 has no letter; asking for it, or for anything else,
  /// yields [`CpuError::BadFlagIdentifier`].
  pub fn from_identifier(identifier: char) -> Result<Flags, CpuError> {
    return match identifier.to_ascii_lowercase() {
      'n' => Ok(Flags::N),
      'v' => Ok(Flags::V),
      'b' => Ok(Flags::B),
      'd' => Ok(Flags::D),
      'i' => Ok(Flags::I),
      'z' => Ok(Flags::Z),
      'c' => Ok(Flags::C),
      _ => Err(CpuError::BadFlagIdentifier(identifier)),
    };
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn test_identifier_lookup() {
    assert_eq!(Flags::from_identifier('c').unwrap(), Flags::C);
    assert_eq!(Flags::from_identifier('N').unwrap(), Flags::N);
    assert_eq!(Flags::from_identifier('v').unwrap(), Flags::V);
  }

  #[test]
  fn test_bad_identifier() {
    match Flags::from_identifier('q') {
      Err(CpuError::BadFlagIdentifier(c)) => assert_eq!(c, 'q'),
      other => panic!("unexpected result {:?}", other),
    }
  }

  #[test]
  fn test_pushed_bits() {
    assert_eq!(Flags::PUSHED.bits(), 0x30);
    assert_eq!(Flags::PUSHED, Flags::B | Flags::U);
  }
}
