use crate::cartridge::mirroring::Mirroring;

const CPU_MEMORY_SIZE: usize = 0x10000;
const PPU_MEMORY_SIZE: usize = 0x4000;
const NAMETABLE_SIZE: usize = 0x1000;

pub const PRG_ROM_START: u16 = 0x8000;
pub const PALETTE_START: u16 = 0x3F00;

/// Canonical CPU address.
///
/// - $0800-$1FFF mirrors the 2KB internal RAM at $0000-$07FF
/// - $2008-$3FFF mirrors the eight PPU registers at $2000-$2007
pub fn cpu_mirror(address: u16) -> u16 {
  return match address {
    0x0000..=0x1FFF => address & 0x07FF,
    0x2000..=0x3FFF => 0x2000 + (address & 0x0007),
    _ => address,
  };
}

/// Canonical PPU address for the given nametable layout.
///
/// ## [PPU memory map](https://www.nesdev.org/wiki/PPU_memory_map)
///
/// | Address range | Size  | Description            |
/// |---------------|-------|------------------------|
/// | $0000-$0FFF   | $1000 | Pattern table 0        |
/// | $1000-$1FFF   | $1000 | Pattern table 1        |
/// | $2000-$2FFF   | $1000 | Nametables 0-3         |
/// | $3000-$3EFF   | $0F00 | Mirror of $2000-$2EFF  |
/// | $3F00-$3F1F   | $0020 | Palette RAM indexes    |
/// | $3F20-$3FFF   | $00E0 | Mirrors of $3F00-$3F1F |
///
/// Everything above $3FFF wraps. The sprite palette's backdrop entries
/// $3F10/$3F14/$3F18/$3F1C are the same cells as $3F00/$3F04/$3F08/$3F0C.
pub fn ppu_mirror(address: u16, mirroring: Mirroring) -> u16 {
  let address = address & 0x3FFF;
  return match address {
    0x0000..=0x1FFF => address,
    0x2000..=0x3EFF => {
      let address = if address >= 0x3000 { address - 0x1000 } else { address };
      nametable_mirror(address, mirroring)
    }
    _ => {
      let mut entry = address & 0x1F;
      if entry >= 0x10 && entry & 0x03 == 0 {
        entry -= 0x10;
      }
      PALETTE_START + entry
    }
  };
}

fn nametable_mirror(address: u16, mirroring: Mirroring) -> u16 {
  let offset = address & 0x0FFF;
  return match mirroring {
    Mirroring::Vertical => 0x2000 + (offset & 0x07FF),
    // keep the low 10 bits, tables 0/1 and 2/3 share storage
    Mirroring::Horizontal => 0x2000 + (offset & 0x03FF) + (offset / 0x0800) * 0x0800,
    Mirroring::FourScreen => 0x2000 + offset,
  };
}

/// Index into the nametable store for a canonical nametable address.
fn nametable_index(address: u16, mirroring: Mirroring) -> usize {
  let offset = address & 0x0FFF;
  let index = match mirroring {
    Mirroring::Vertical => offset & 0x07FF,
    Mirroring::Horizontal => (offset & 0x03FF) | ((offset & 0x0800) >> 1),
    Mirroring::FourScreen => offset,
  };
  index as usize
}

/// The physical storage behind both address spaces.
///
/// Accesses here never run device hooks; they are what the hooks themselves
/// (and the default store) use.
pub struct Memory {
  cpu: Vec<u8>,
  /// Pattern tables and palette RAM, indexed by canonical PPU address.
  ppu: Vec<u8>,
  nametables: Vec<u8>,
  mirroring: Mirroring,
  chr_writable: bool,
}

impl Memory {
  pub fn new(mirroring: Mirroring) -> Self {
    return Memory {
      cpu: vec![0; CPU_MEMORY_SIZE],
      ppu: vec![0; PPU_MEMORY_SIZE],
      nametables: vec![0; NAMETABLE_SIZE],
      mirroring,
      chr_writable: true,
    };
  }

  pub fn mirroring(&self) -> Mirroring {
    self.mirroring
  }

  pub fn cpu_read(&self, address: u16) -> u8 {
    self.cpu[cpu_mirror(address) as usize]
  }

  pub fn cpu_write(&mut self, address: u16, data: u8) {
    self.cpu[cpu_mirror(address) as usize] = data;
  }

  pub fn ppu_read(&self, address: u16) -> u8 {
    let address = ppu_mirror(address, self.mirroring);
    return match address {
      0x2000..=0x2FFF => self.nametables[nametable_index(address, self.mirroring)],
      _ => self.ppu[address as usize],
    };
  }

  /// Pattern table writes only land when the cartridge carries CHR RAM.
  pub fn ppu_write(&mut self, address: u16, data: u8) {
    let address = ppu_mirror(address, self.mirroring);
    match address {
      0x0000..=0x1FFF => {
        if self.chr_writable {
          self.ppu[address as usize] = data;
        } else {
          log::debug!("Ignoring CHR ROM write at {:04X}", address);
        }
      }
      0x2000..=0x2FFF => self.nametables[nametable_index(address, self.mirroring)] = data,
      _ => self.ppu[address as usize] = data,
    }
  }

  /// A 256-byte CPU page, as copied by OAM DMA. Pages in $08-$1F read the
  /// RAM they mirror.
  pub fn cpu_page(&self, page: u8) -> [u8; 256] {
    let start = (page as u16) << 8;
    let mut data = [0; 256];
    for (offset, byte) in data.iter_mut().enumerate() {
      *byte = self.cpu_read(start + offset as u16);
    }
    data
  }

  /// Copy PRG ROM into $8000-$FFFF. A single 16KB bank fills both halves.
  pub fn load_program(&mut self, program: &[u8]) {
    let start = PRG_ROM_START as usize;
    let window = CPU_MEMORY_SIZE - start;
    if program.is_empty() {
      return;
    }
    for (i, cell) in self.cpu[start..].iter_mut().enumerate().take(window) {
      *cell = program[i % program.len()];
    }
  }

  /// Copy CHR data into the pattern tables. `writable` marks CHR RAM.
  pub fn load_chr(&mut self, chr: &[u8], writable: bool) {
    let len = chr.len().min(0x2000);
    self.ppu[..len].copy_from_slice(&chr[..len]);
    self.chr_writable = writable;
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use rand::{Rng, SeedableRng};

  const ALL_MIRRORINGS: [Mirroring; 3] = [Mirroring::Vertical, Mirroring::Horizontal, Mirroring::FourScreen];

  #[test]
  fn test_cpu_mirror() {
    assert_eq!(cpu_mirror(0x0801), 0x0001);
    assert_eq!(cpu_mirror(0x1FFF), 0x07FF);
    assert_eq!(cpu_mirror(0x2008), 0x2000);
    assert_eq!(cpu_mirror(0x3FFF), 0x2007);
    assert_eq!(cpu_mirror(0x4016), 0x4016);
    assert_eq!(cpu_mirror(0xFFFF), 0xFFFF);
  }

  #[test]
  fn test_mirrors_are_idempotent() {
    let mut rng = rand::rngs::StdRng::seed_from_u64(0x2C02);
    for _ in 0..20_000 {
      let address: u16 = rng.gen();
      assert_eq!(cpu_mirror(cpu_mirror(address)), cpu_mirror(address));
      for mirroring in ALL_MIRRORINGS {
        let once = ppu_mirror(address, mirroring);
        assert_eq!(ppu_mirror(once, mirroring), once, "{:04X} {:?}", address, mirroring);
      }
    }
  }

  #[test]
  fn test_ppu_mirror_regions() {
    let m = Mirroring::FourScreen;
    assert_eq!(ppu_mirror(0x4123, m), 0x0123);
    assert_eq!(ppu_mirror(0x3123, m), 0x2123);
    assert_eq!(ppu_mirror(0x3F20, m), 0x3F00);
    assert_eq!(ppu_mirror(0x3FFF, m), 0x3F1F);
    assert_eq!(ppu_mirror(0x3F10, m), 0x3F00);
    assert_eq!(ppu_mirror(0x3F1C, m), 0x3F0C);
    assert_eq!(ppu_mirror(0x3F11, m), 0x3F11);
  }

  #[test]
  fn test_vertical_nametables() {
    let mut memory = Memory::new(Mirroring::Vertical);
    memory.ppu_write(0x2005, 0x11);
    memory.ppu_write(0x2405, 0x22);
    assert_eq!(memory.ppu_read(0x2805), 0x11);
    assert_eq!(memory.ppu_read(0x2C05), 0x22);
    assert_eq!(memory.ppu_read(0x3005), 0x11);
  }

  #[test]
  fn test_horizontal_nametables() {
    let mut memory = Memory::new(Mirroring::Horizontal);
    memory.ppu_write(0x2005, 0x11);
    memory.ppu_write(0x2805, 0x22);
    assert_eq!(memory.ppu_read(0x2405), 0x11);
    assert_eq!(memory.ppu_read(0x2C05), 0x22);
    assert_ne!(memory.ppu_read(0x2005), memory.ppu_read(0x2805));
  }

  #[test]
  fn test_four_screen_nametables_are_distinct() {
    let mut memory = Memory::new(Mirroring::FourScreen);
    for (i, base) in [0x2000u16, 0x2400, 0x2800, 0x2C00].iter().enumerate() {
      memory.ppu_write(base + 0x10, i as u8);
    }
    for (i, base) in [0x2000u16, 0x2400, 0x2800, 0x2C00].iter().enumerate() {
      assert_eq!(memory.ppu_read(base + 0x10), i as u8);
    }
  }

  #[test]
  fn test_palette_backdrop_mirror() {
    let mut memory = Memory::new(Mirroring::Vertical);
    memory.ppu_write(0x3F10, 0x2A);
    assert_eq!(memory.ppu_read(0x3F00), 0x2A);
    memory.ppu_write(0x3F04, 0x15);
    assert_eq!(memory.ppu_read(0x3F34), 0x15);
  }

  #[test]
  fn test_internal_ram_mirror() {
    let mut memory = Memory::new(Mirroring::Vertical);
    memory.cpu_write(0x0002, 0x99);
    assert_eq!(memory.cpu_read(0x0802), 0x99);
    assert_eq!(memory.cpu_read(0x1802), 0x99);
  }

  #[test]
  fn test_load_single_bank_program_is_mirrored() {
    let mut memory = Memory::new(Mirroring::Vertical);
    let mut program = vec![0xEA; 0x4000];
    program[0x3FFC] = 0x00;
    program[0x3FFD] = 0xC0;
    memory.load_program(&program);
    assert_eq!(memory.cpu_read(0x8000), 0xEA);
    assert_eq!(memory.cpu_read(0xFFFD), 0xC0);
    assert_eq!(memory.cpu_read(0xBFFD), 0xC0);
  }

  #[test]
  fn test_chr_rom_is_read_only() {
    let mut memory = Memory::new(Mirroring::Vertical);
    memory.load_chr(&[0x55; 0x2000], false);
    memory.ppu_write(0x0010, 0x00);
    assert_eq!(memory.ppu_read(0x0010), 0x55);

    memory.load_chr(&[], true);
    memory.ppu_write(0x0010, 0x00);
    assert_eq!(memory.ppu_read(0x0010), 0x00);
  }
}
