use bitflags::bitflags;

bitflags! {
  /// ## [PPUCTRL](https://www.nesdev.org/wiki/PPU_registers#PPUCTRL) $2000
  ///
  /// ```text
  /// 7  bit  0
  /// ---- ----
  /// VPHB SINN
  /// |||| ||||
  /// |||| ||++- Base nametable address
  /// |||| ||    (0 = $2000; 1 = $2400; 2 = $2800; 3 = $2C00)
  /// |||| |+--- VRAM address increment per CPU read/write of PPUDATA
  /// |||| |     (0: add 1, going across; 1: add 32, going down)
  /// |||| +---- Sprite pattern table address for 8x8 sprites
  /// ||||       (0: $0000; 1: $1000; ignored in 8x16 mode)
  /// |||+------ Background pattern table address (0: $0000; 1: $1000)
  /// ||+------- Sprite size (0: 8x8 pixels; 1: 8x16 pixels)
  /// |+-------- PPU master/slave select
  /// +--------- Generate an NMI at the start of vertical blanking
  /// ```
  pub struct Control: u8 {
    const NAMETABLE_X = 0b0000_0001;
    const NAMETABLE_Y = 0b0000_0010;
    const VRAM_INCREMENT = 0b0000_0100;
    const SPRITE_TABLE = 0b0000_1000;
    const BACKGROUND_TABLE = 0b0001_0000;
    const SPRITE_SIZE = 0b0010_0000;
    const MASTER_SLAVE = 0b0100_0000;
    const GENERATE_NMI = 0b1000_0000;
  }
}

impl Control {
  pub fn vram_increment(&self) -> u16 {
    if self.contains(Control::VRAM_INCREMENT) {
      32
    } else {
      1
    }
  }

  pub fn sprite_table(&self) -> u16 {
    if self.contains(Control::SPRITE_TABLE) {
      0x1000
    } else {
      0x0000
    }
  }

  pub fn background_table(&self) -> u16 {
    if self.contains(Control::BACKGROUND_TABLE) {
      0x1000
    } else {
      0x0000
    }
  }

  pub fn sprite_height(&self) -> usize {
    if self.contains(Control::SPRITE_SIZE) {
      16
    } else {
      8
    }
  }
}

bitflags! {
  /// ## [PPUMASK](https://www.nesdev.org/wiki/PPU_registers#PPUMASK) $2001
  ///
  /// ```text
  /// 7  bit  0
  /// ---- ----
  /// BGRs bMmG
  /// |||| ||||
  /// |||| |||+- Greyscale
  /// |||| ||+-- 1: Show background in leftmost 8 pixels of screen
  /// |||| |+--- 1: Show sprites in leftmost 8 pixels of screen
  /// |||| +---- 1: Show background
  /// |||+------ 1: Show sprites
  /// ||+------- Emphasize red
  /// |+-------- Emphasize green
  /// +--------- Emphasize blue
  /// ```
  pub struct Mask: u8 {
    const GREYSCALE = 0b0000_0001;
    const BACKGROUND_LEFTMOST = 0b0000_0010;
    const SPRITES_LEFTMOST = 0b0000_0100;
    const SHOW_BACKGROUND = 0b0000_1000;
    const SHOW_SPRITES = 0b0001_0000;
    const EMPHASIZE_RED = 0b0010_0000;
    const EMPHASIZE_GREEN = 0b0100_0000;
    const EMPHASIZE_BLUE = 0b1000_0000;
  }
}

bitflags! {
  /// ## [PPUSTATUS](https://www.nesdev.org/wiki/PPU_registers#PPUSTATUS) $2002
  ///
  /// ```text
  /// 7  bit  0
  /// ---- ----
  /// VSO. ....
  /// |||| ||||
  /// |||+-++++- open bus: last value written to a PPU register
  /// ||+------- Sprite overflow
  /// |+-------- Sprite 0 hit
  /// +--------- Vertical blank has started
  /// ```
  pub struct Status: u8 {
    const SPRITE_OVERFLOW = 0b0010_0000;
    const SPRITE_ZERO_HIT = 0b0100_0000;
    const VBLANK = 0b1000_0000;
  }
}

/// The VRAM address and scroll position, both written a byte at a time
/// through one shared write toggle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Latch {
  address: u16,
  scroll_x: u8,
  scroll_y: u8,
  /// false: next write is the first half.
  toggle: bool,
}

impl Latch {
  pub fn address(&self) -> u16 {
    self.address
  }

  pub fn scroll(&self) -> (u8, u8) {
    (self.scroll_x, self.scroll_y)
  }

  pub fn toggle(&self) -> bool {
    self.toggle
  }

  /// $2006: high byte first, then low byte.
  pub fn write_address(&mut self, data: u8) {
    if self.toggle {
      self.address = (self.address & 0xFF00) | data as u16;
    } else {
      self.address = (self.address & 0x00FF) | ((data as u16) << 8);
    }
    self.address &= 0x7FFF;
    self.toggle = !self.toggle;
  }

  /// $2005: X scroll first, then Y scroll.
  pub fn write_scroll(&mut self, data: u8) {
    if self.toggle {
      self.scroll_y = data;
    } else {
      self.scroll_x = data;
    }
    self.toggle = !self.toggle;
  }

  pub fn increment(&mut self, step: u16) {
    self.address = self.address.wrapping_add(step) & 0x7FFF;
  }

  pub fn reset_toggle(&mut self) {
    self.toggle = false;
  }
}
