pub mod mirroring;

use std::any::Any;

use thiserror::Error;

use self::mirroring::Mirroring;
use crate::bus::device::{BusAccess, BusDevice, Direction, Space};
use crate::bus::memory::{Memory, PRG_ROM_START};
use crate::bus::Bus;

const MAGIC_NUMBERS: [u8; 4] = [0x4E, 0x45, 0x53, 0x1A];
const HEADER_SIZE: usize = 16;
const TRAINER_SIZE: usize = 512;
const PRG_ROM_PAGE_SIZE: usize = 16384;
const CHR_ROM_PAGE_SIZE: usize = 8192;
const TRAINER_ADDRESS: u16 = 0x7000;
const NROM_PRG_BANKS: u8 = 2;
const NROM_CHR_BANKS: u8 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartridgeError {
  #[error("file is shorter than the 16 byte iNES header")]
  TooShort,

  #[error("file is not in iNES file format")]
  InvalidMagic,

  #[error("NES 2.0 format is not supported")]
  Nes2Unsupported,

  #[error("mapper {0} is not supported, only NROM (mapper 0)")]
  UnsupportedMapper(u8),

  #[error("{section} is truncated: header declares {expected} bytes, file has {actual}")]
  Truncated {
    section: &'static str,
    expected: usize,
    actual: usize,
  },

  #[error("header declares no PRG ROM")]
  EmptyProgram,

  #[error("NROM boards carry at most {max} {section} banks, header declares {banks}")]
  TooManyBanks {
    section: &'static str,
    banks: u8,
    max: u8,
  },
}

/// ## [iNES format](https://www.nesdev.org/wiki/INES)
///
/// ```text
/// 0-3   "NES" followed by MS-DOS end-of-file
/// 4     Size of PRG ROM in 16 KB units
/// 5     Size of CHR ROM in 8 KB units (0 means the board uses CHR RAM)
/// 6     Flags 6: mapper low nybble, four-screen, trainer, battery, mirroring
/// 7     Flags 7: mapper high nybble, NES 2.0 identifier
/// 8-15  Unused here
/// ```
#[derive(Debug, Clone)]
pub struct Cartridge {
  pub mapper: u8,
  pub prg_rom: Vec<u8>,
  pub chr_rom: Vec<u8>,
  pub trainer: Option<Vec<u8>>,
  pub nametable_mirroring: Mirroring,
}

impl Cartridge {
  pub fn new(raw: &[u8]) -> Result<Cartridge, CartridgeError> {
    if raw.len() < HEADER_SIZE {
      return Err(CartridgeError::TooShort);
    }
    if raw[0..4] != MAGIC_NUMBERS {
      return Err(CartridgeError::InvalidMagic);
    }
    if (raw[7] >> 2) & 0x03 == 0x02 {
      return Err(CartridgeError::Nes2Unsupported);
    }

    let mapper = (raw[7] & 0xF0) | (raw[6] >> 4);
    if mapper != 0 {
      return Err(CartridgeError::UnsupportedMapper(mapper));
    }

    if raw[4] > NROM_PRG_BANKS {
      return Err(CartridgeError::TooManyBanks {
        section: "PRG ROM",
        banks: raw[4],
        max: NROM_PRG_BANKS,
      });
    }
    if raw[5] > NROM_CHR_BANKS {
      return Err(CartridgeError::TooManyBanks {
        section: "CHR ROM",
        banks: raw[5],
        max: NROM_CHR_BANKS,
      });
    }

    let mirroring = match (raw[6] & 0x08 == 0x08, raw[6] & 0x01 == 0x01) {
      (false, false) => Mirroring::Horizontal,
      (false, true) => Mirroring::Vertical,
      (true, _) => Mirroring::FourScreen,
    };

    let has_trainer = raw[6] & 0x04 == 0x04;
    let trainer = if has_trainer {
      Some(section(raw, "trainer", HEADER_SIZE, TRAINER_SIZE)?.to_vec())
    } else {
      None
    };

    // Size of PRG ROM in 16 KB units
    let prg_rom_start = HEADER_SIZE + if has_trainer { TRAINER_SIZE } else { 0 };
    let prg_rom_size = (raw[4] as usize) * PRG_ROM_PAGE_SIZE;
    if prg_rom_size == 0 {
      return Err(CartridgeError::EmptyProgram);
    }
    let prg_rom = section(raw, "PRG ROM", prg_rom_start, prg_rom_size)?.to_vec();

    // Size of CHR ROM in 8 KB units
    let chr_rom_start = prg_rom_start + prg_rom_size;
    let chr_rom_size = (raw[5] as usize) * CHR_ROM_PAGE_SIZE;
    let chr_rom = section(raw, "CHR ROM", chr_rom_start, chr_rom_size)?.to_vec();

    log::info!(
      "iNES image: {} KB PRG ROM, {} KB CHR {}, {:?} mirroring{}",
      prg_rom.len() / 1024,
      if chr_rom.is_empty() { 8 } else { chr_rom.len() / 1024 },
      if chr_rom.is_empty() { "RAM" } else { "ROM" },
      mirroring,
      if has_trainer { ", trainer" } else { "" },
    );

    return Ok(Cartridge {
      mapper,
      prg_rom,
      chr_rom,
      trainer,
      nametable_mirroring: mirroring,
    });
  }

  pub fn has_chr_ram(&self) -> bool {
    self.chr_rom.is_empty()
  }

  /// Copy the cartridge contents into `bus` and map the PRG ROM guard.
  pub fn install(&self, bus: &mut Bus) {
    let memory = bus.memory_mut();
    memory.load_program(&self.prg_rom);
    memory.load_chr(&self.chr_rom, self.has_chr_ram());
    if let Some(trainer) = &self.trainer {
      for (i, &byte) in trainer.iter().enumerate() {
        memory.cpu_write(TRAINER_ADDRESS + i as u16, byte);
      }
    }
    bus.attach(PrgRom);
  }
}

fn section<'a>(raw: &'a [u8], name: &'static str, start: usize, size: usize) -> Result<&'a [u8], CartridgeError> {
  let available = raw.len().saturating_sub(start);
  if available < size {
    return Err(CartridgeError::Truncated {
      section: name,
      expected: size,
      actual: available,
    });
  }
  Ok(&raw[start..start + size])
}

/// NROM has no registers: writes into $8000-$FFFF are swallowed so the
/// program can never overwrite itself.
pub struct PrgRom;

impl BusDevice for PrgRom {
  fn try_write(&mut self, access: BusAccess, data: u8, _memory: &mut Memory) -> bool {
    if access.space == Space::Cpu && access.direction == Direction::Write && access.address >= PRG_ROM_START {
      log::debug!("Ignoring write of {:02X} to PRG ROM at {:04X}", data, access.address);
      return true;
    }
    false
  }

  fn as_any(&self) -> &dyn Any {
    self
  }

  fn as_any_mut(&mut self) -> &mut dyn Any {
    self
  }
}

#[cfg(test)]
pub mod test {
  use super::*;

  pub struct TestRom {
    pub header: Vec<u8>,
    pub trainer: Option<Vec<u8>>,
    pub prg_rom: Vec<u8>,
    pub chr_rom: Vec<u8>,
  }

  pub fn create_rom(rom: TestRom) -> Vec<u8> {
    let mut result = Vec::with_capacity(
      rom.header.len() + rom.trainer.as_ref().map_or(0, |t| t.len()) + rom.prg_rom.len() + rom.chr_rom.len(),
    );

    result.extend(&rom.header);
    if let Some(t) = rom.trainer {
      result.extend(t);
    }
    result.extend(&rom.prg_rom);
    result.extend(&rom.chr_rom);

    result
  }

  fn header(prg_banks: u8, chr_banks: u8, flags6: u8, flags7: u8) -> Vec<u8> {
    vec![0x4E, 0x45, 0x53, 0x1A, prg_banks, chr_banks, flags6, flags7, 0, 0, 0, 0, 0, 0, 0, 0]
  }

  /// One 16KB PRG bank holding `program` at $8000 (and $C000), reset vector
  /// pointing at it, one bank of blank CHR ROM.
  pub fn test_rom(program: &[u8]) -> Vec<u8> {
    let mut prg_rom = vec![0; PRG_ROM_PAGE_SIZE];
    prg_rom[..program.len()].copy_from_slice(program);
    prg_rom[0x3FFC] = 0x00;
    prg_rom[0x3FFD] = 0x80;
    create_rom(TestRom {
      header: header(1, 1, 0x01, 0x00),
      trainer: None,
      prg_rom,
      chr_rom: vec![0; CHR_ROM_PAGE_SIZE],
    })
  }

  #[test]
  fn test() {
    let test_rom = create_rom(TestRom {
      header: header(2, 1, 0x01, 0x00),
      trainer: None,
      prg_rom: vec![1; 2 * PRG_ROM_PAGE_SIZE],
      chr_rom: vec![2; 1 * CHR_ROM_PAGE_SIZE],
    });

    let rom: Cartridge = Cartridge::new(&test_rom).unwrap();

    assert_eq!(rom.chr_rom, vec!(2; 1 * CHR_ROM_PAGE_SIZE));
    assert_eq!(rom.prg_rom, vec!(1; 2 * PRG_ROM_PAGE_SIZE));
    assert_eq!(rom.mapper, 0);
    assert_eq!(rom.nametable_mirroring, Mirroring::Vertical);
    assert!(rom.trainer.is_none());
    assert!(!rom.has_chr_ram());
  }

  #[test]
  fn test_with_trainer() {
    let test_rom = create_rom(TestRom {
      header: header(2, 1, 0x00 | 0b100, 0x00),
      trainer: Some(vec![7; TRAINER_SIZE]),
      prg_rom: vec![1; 2 * PRG_ROM_PAGE_SIZE],
      chr_rom: vec![2; 1 * CHR_ROM_PAGE_SIZE],
    });

    let rom: Cartridge = Cartridge::new(&test_rom).unwrap();

    assert_eq!(rom.chr_rom, vec!(2; 1 * CHR_ROM_PAGE_SIZE));
    assert_eq!(rom.prg_rom, vec!(1; 2 * PRG_ROM_PAGE_SIZE));
    assert_eq!(rom.trainer, Some(vec![7; TRAINER_SIZE]));
    assert_eq!(rom.nametable_mirroring, Mirroring::Horizontal);
  }

  #[test]
  fn test_four_screen() {
    let test_rom = create_rom(TestRom {
      header: header(1, 0, 0x08 | 0x01, 0x00),
      trainer: None,
      prg_rom: vec![0; PRG_ROM_PAGE_SIZE],
      chr_rom: vec![],
    });
    let rom = Cartridge::new(&test_rom).unwrap();
    assert_eq!(rom.nametable_mirroring, Mirroring::FourScreen);
    assert!(rom.has_chr_ram());
  }

  #[test]
  fn test_nes2_is_not_supported() {
    let test_rom = create_rom(TestRom {
      header: header(1, 1, 0x01, 0x08),
      trainer: None,
      prg_rom: vec![1; 1 * PRG_ROM_PAGE_SIZE],
      chr_rom: vec![2; 1 * CHR_ROM_PAGE_SIZE],
    });
    match Cartridge::new(&test_rom) {
      Result::Ok(_) => assert!(false, "should not load rom"),
      Result::Err(error) => assert_eq!(error.to_string(), "NES 2.0 format is not supported"),
    }
  }

  #[test]
  fn test_rejects_bad_headers() {
    assert_eq!(Cartridge::new(&[0x4E, 0x45]).unwrap_err(), CartridgeError::TooShort);

    let mut raw = test_rom(&[]);
    raw[3] = 0x00;
    assert_eq!(Cartridge::new(&raw).unwrap_err(), CartridgeError::InvalidMagic);

    let mut raw = test_rom(&[]);
    raw[6] |= 0x30;
    assert_eq!(Cartridge::new(&raw).unwrap_err(), CartridgeError::UnsupportedMapper(3));

    let mut raw = test_rom(&[]);
    raw[4] = 0;
    assert_eq!(Cartridge::new(&raw).unwrap_err(), CartridgeError::EmptyProgram);
  }

  #[test]
  fn test_rejects_banks_beyond_nrom() {
    let raw = create_rom(TestRom {
      header: header(3, 1, 0x01, 0x00),
      trainer: None,
      prg_rom: vec![0; 3 * PRG_ROM_PAGE_SIZE],
      chr_rom: vec![0; CHR_ROM_PAGE_SIZE],
    });
    assert_eq!(
      Cartridge::new(&raw).unwrap_err(),
      CartridgeError::TooManyBanks { section: "PRG ROM", banks: 3, max: 2 }
    );

    let raw = create_rom(TestRom {
      header: header(1, 2, 0x01, 0x00),
      trainer: None,
      prg_rom: vec![0; PRG_ROM_PAGE_SIZE],
      chr_rom: vec![0; 2 * CHR_ROM_PAGE_SIZE],
    });
    assert_eq!(
      Cartridge::new(&raw).unwrap_err().to_string(),
      "NROM boards carry at most 1 CHR ROM banks, header declares 2"
    );
  }

  #[test]
  fn test_rejects_truncated_program() {
    let mut raw = test_rom(&[]);
    raw[4] = 2;
    assert_eq!(
      Cartridge::new(&raw).unwrap_err(),
      CartridgeError::Truncated {
        section: "PRG ROM",
        expected: 2 * PRG_ROM_PAGE_SIZE,
        actual: PRG_ROM_PAGE_SIZE + CHR_ROM_PAGE_SIZE,
      }
    );

    let mut raw = test_rom(&[]);
    raw.truncate(raw.len() - 1);
    assert!(matches!(
      Cartridge::new(&raw),
      Err(CartridgeError::Truncated { section: "CHR ROM", .. })
    ));
  }

  #[test]
  fn test_install_guards_prg_rom() {
    let rom = Cartridge::new(&test_rom(&[0xA9, 0x01])).unwrap();
    let mut bus = Bus::new(rom.nametable_mirroring);
    rom.install(&mut bus);

    assert_eq!(bus.cpu_read(0x8000), 0xA9);
    assert_eq!(bus.cpu_read(0xC000), 0xA9);
    bus.cpu_write(0x8000, 0xFF);
    assert_eq!(bus.cpu_read(0x8000), 0xA9);
    // cartridge RAM window is still writable
    bus.cpu_write(0x6000, 0x12);
    assert_eq!(bus.cpu_read(0x6000), 0x12);
  }

  #[test]
  fn test_install_trainer() {
    let raw = create_rom(TestRom {
      header: header(1, 0, 0x04, 0x00),
      trainer: Some(vec![0x5A; TRAINER_SIZE]),
      prg_rom: vec![0; PRG_ROM_PAGE_SIZE],
      chr_rom: vec![],
    });
    let rom = Cartridge::new(&raw).unwrap();
    let mut bus = Bus::new(rom.nametable_mirroring);
    rom.install(&mut bus);
    assert_eq!(bus.cpu_read(0x7000), 0x5A);
    assert_eq!(bus.cpu_read(0x71FF), 0x5A);
    // CHR RAM accepts pattern writes
    bus.ppu_write(0x0000, 0x77);
    assert_eq!(bus.ppu_read(0x0000), 0x77);
  }
}
