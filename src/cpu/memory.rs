/// What the CPU sees of the machine: a 16-bit address space of bytes.
///
/// The system [`Bus`](crate::bus::Bus) implements this with mirroring and
/// device hooks; CPU unit tests use a flat 64KB array instead.
///
/// ## [CPU Memory Map](https://www.nesdev.org/wiki/CPU_memory_map)
///
/// | Address range | Size  | Device                                        |
/// |---------------|-------|-----------------------------------------------|
/// | $0000-$07FF   | $0800 | 2KB internal RAM                              |
/// | $0800-$1FFF   | $1800 | Mirrors of $0000-$07FF                        |
/// | $2000-$2007   | $0008 | NES PPU registers                             |
/// | $2008-$3FFF   | $1FF8 | Mirrors of $2000-2007 (repeats every 8 bytes) |
/// | $4000-$4017   | $0018 | NES APU and I/O registers                     |
/// | $4020-$FFFF   | $BFE0 | Cartridge space: PRG ROM, PRG RAM             |
///
/// The CPU expects interrupt vectors in a fixed place at the end of the cartridge space:
///
/// - $FFFA-$FFFB = NMI vector
/// - $FFFC-$FFFD = Reset vector
/// - $FFFE-$FFFF = IRQ/BRK vector
pub trait CpuBus {
  /// A CPU read, with every side effect the address carries.
  fn read(&mut self, address: u16) -> u8;

  fn write(&mut self, address: u16, data: u8);

  /// Look at a byte without triggering device side effects. Used for operand
  /// pointers during address resolution and by the tracer.
  fn peek(&self, address: u16) -> u8;

  fn read_u16(&mut self, address: u16) -> u16 {
    let lo = self.read(address) as u16;
    let hi = self.read(address.wrapping_add(1)) as u16;
    return (hi << 8) | lo;
  }

  fn peek_u16(&self, address: u16) -> u16 {
    let lo = self.peek(address) as u16;
    let hi = self.peek(address.wrapping_add(1)) as u16;
    return (hi << 8) | lo;
  }
}
