use super::registers::{Control, Mask};
use crate::bus::memory::{Memory, PALETTE_START};

pub const WIDTH: usize = 256;
pub const HEIGHT: usize = 240;

const SPRITE_PALETTE_START: u16 = PALETTE_START + 0x10;
const ATTRIBUTE_TABLE_OFFSET: u16 = 0x03C0;

/// ## [2C02 system palette](https://www.nesdev.org/wiki/PPU_palettes)
///
/// RGB colour for each of the 64 values palette RAM can hold.
pub const SYSTEM_PALETTE: [u32; 64] = [
  0x545454, 0x001E74, 0x081090, 0x300088, 0x440064, 0x5C0030, 0x540400, 0x3C1800, 0x202A00, 0x083A00, 0x004000,
  0x003C00, 0x00302C, 0x000000, 0x000000, 0x000000, 0x989698, 0x084CC4, 0x3032EC, 0x5C1EE4, 0x8814B0, 0xA01464,
  0x982220, 0x783C00, 0x545A00, 0x287200, 0x087C00, 0x007628, 0x006678, 0x000000, 0x000000, 0x000000, 0xECEEEC,
  0x3C7EEC, 0x5C5CEC, 0x8844EC, 0xB02CEC, 0xE028B0, 0xD83C50, 0xC45400, 0xAC7000, 0x808800, 0x409C30, 0x20A458,
  0x209A88, 0x404040, 0x000000, 0x000000, 0xECEEEC, 0xA8BCEC, 0xBCACEC, 0xD4A0EC, 0xEC94EC, 0xEC90D4, 0xEC9CB4,
  0xE4B090, 0xDCC878, 0xD4DC78, 0xB8EC98, 0xA8ECBC, 0xA0E4E4, 0xA0A0A0, 0x000000, 0x000000,
];

/// A finished picture: one system palette index (0-63) per pixel.
#[derive(Clone)]
pub struct FrameBuffer {
  pub pixels: Vec<u8>,
}

impl FrameBuffer {
  pub fn new() -> Self {
    return FrameBuffer {
      pixels: vec![0; WIDTH * HEIGHT],
    };
  }

  pub fn get(&self, x: usize, y: usize) -> u8 {
    self.pixels[y * WIDTH + x]
  }

  fn set(&mut self, x: usize, y: usize, color: u8) {
    self.pixels[y * WIDTH + x] = color & 0x3F;
  }

  /// Packed `R G B` bytes, row major, ready for a streaming texture.
  pub fn to_rgb24(&self) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(self.pixels.len() * 3);
    for &index in self.pixels.iter() {
      let color = SYSTEM_PALETTE[(index & 0x3F) as usize];
      rgb.push((color >> 16) as u8);
      rgb.push((color >> 8) as u8);
      rgb.push(color as u8);
    }
    rgb
  }
}

impl Default for FrameBuffer {
  fn default() -> Self {
    FrameBuffer::new()
  }
}

impl std::fmt::Debug for FrameBuffer {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "FrameBuffer({}x{})", WIDTH, HEIGHT)
  }
}

/// PPU register state the renderer reads.
pub struct View<'a> {
  pub ctrl: Control,
  pub mask: Mask,
  pub scroll: (u8, u8),
  pub oam: &'a [u8],
}

/// Two bit colour of one pixel inside a tile.
///
/// ## [Pattern tables](https://www.nesdev.org/wiki/PPU_pattern_tables)
///
/// Each 16-byte tile holds two bit planes; the low plane first, then the high.
fn tile_pixel(memory: &Memory, table: u16, tile: u16, row: u16, column: u16) -> u8 {
  let address = table + tile * 16 + row;
  let lo = memory.ppu_read(address);
  let hi = memory.ppu_read(address + 8);
  let bit = 7 - column;
  (((hi >> bit) & 1) << 1) | ((lo >> bit) & 1)
}

pub fn render(frame: &mut FrameBuffer, view: &View, memory: &Memory) {
  let mut opaque = vec![false; WIDTH * HEIGHT];
  render_background(frame, &mut opaque, view, memory);
  if view.mask.contains(Mask::SHOW_SPRITES) {
    render_sprites(frame, &opaque, view, memory);
  }
}

fn render_background(frame: &mut FrameBuffer, opaque: &mut [bool], view: &View, memory: &Memory) {
  let backdrop = memory.ppu_read(PALETTE_START);
  if !view.mask.contains(Mask::SHOW_BACKGROUND) {
    frame.pixels.iter_mut().for_each(|pixel| *pixel = backdrop & 0x3F);
    return;
  }

  let table = view.ctrl.background_table();
  let (scroll_x, scroll_y) = view.scroll;
  let base_x = if view.ctrl.contains(Control::NAMETABLE_X) { WIDTH } else { 0 };
  let base_y = if view.ctrl.contains(Control::NAMETABLE_Y) { HEIGHT } else { 0 };

  for y in 0..HEIGHT {
    let world_y = (y + scroll_y as usize + base_y) % (HEIGHT * 2);
    let row = (world_y % HEIGHT) as u16;
    for x in 0..WIDTH {
      if x < 8 && !view.mask.contains(Mask::BACKGROUND_LEFTMOST) {
        frame.set(x, y, backdrop);
        continue;
      }
      let world_x = (x + scroll_x as usize + base_x) % (WIDTH * 2);
      let column = (world_x % WIDTH) as u16;

      let nametable = (world_x / WIDTH + (world_y / HEIGHT) * 2) as u16;
      let base = 0x2000 + nametable * 0x0400;
      let tile = memory.ppu_read(base + (row / 8) * 32 + column / 8) as u16;

      let attribute = memory.ppu_read(base + ATTRIBUTE_TABLE_OFFSET + (row / 32) * 8 + column / 32);
      let shift = ((row % 32) / 16) * 4 + ((column % 32) / 16) * 2;
      let palette = (attribute >> shift) & 0x03;

      let color = tile_pixel(memory, table, tile, row % 8, column % 8);
      let index = y * WIDTH + x;
      if color == 0 {
        frame.set(x, y, backdrop);
      } else {
        opaque[index] = true;
        frame.set(x, y, memory.ppu_read(PALETTE_START + palette as u16 * 4 + color as u16));
      }
    }
  }
}

/// ## [OAM](https://www.nesdev.org/wiki/PPU_OAM)
///
/// Four bytes per sprite: Y (top minus one), tile, attributes, X.
///
/// ```text
/// 76543210
/// ||||||||
/// ||||||++- Palette (4 to 7) of sprite
/// |||+++--- Unimplemented
/// ||+------ Priority (0: in front of background; 1: behind background)
/// |+------- Flip sprite horizontally
/// +-------- Flip sprite vertically
/// ```
fn render_sprites(frame: &mut FrameBuffer, opaque: &[bool], view: &View, memory: &Memory) {
  let height = view.ctrl.sprite_height();

  // lower OAM index wins, so paint from the back
  for sprite in view.oam.chunks_exact(4).rev() {
    let top = sprite[0] as usize + 1;
    let tile = sprite[1] as u16;
    let attributes = sprite[2];
    let left = sprite[3] as usize;

    let palette = (attributes & 0x03) as u16;
    let behind = attributes & 0x20 != 0;
    let flip_h = attributes & 0x40 != 0;
    let flip_v = attributes & 0x80 != 0;

    let (table, tile) = if height == 16 {
      ((tile & 0x01) * 0x1000, tile & 0xFE)
    } else {
      (view.ctrl.sprite_table(), tile)
    };

    for row in 0..height {
      let y = top + row;
      if y >= HEIGHT {
        break;
      }
      let source_row = if flip_v { height - 1 - row } else { row };
      let tile = tile + (source_row / 8) as u16;

      for column in 0..8 {
        let x = left + column;
        if x >= WIDTH {
          break;
        }
        if x < 8 && !view.mask.contains(Mask::SPRITES_LEFTMOST) {
          continue;
        }
        let source_column = if flip_h { 7 - column } else { column };
        let color = tile_pixel(memory, table, tile, (source_row % 8) as u16, source_column as u16);
        if color == 0 {
          continue;
        }
        if behind && opaque[y * WIDTH + x] {
          continue;
        }
        frame.set(x, y, memory.ppu_read(SPRITE_PALETTE_START + palette * 4 + color as u16));
      }
    }
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::cartridge::mirroring::Mirroring;

  /// Tile 1 is solid colour 3, tile 2 has only its left column set (colour 1).
  fn memory_with_tiles() -> Memory {
    let mut memory = Memory::new(Mirroring::Vertical);
    for row in 0..8 {
      memory.ppu_write(0x0010 + row, 0xFF);
      memory.ppu_write(0x0018 + row, 0xFF);
      memory.ppu_write(0x0020 + row, 0x80);
    }
    memory.ppu_write(0x3F00, 0x0F);
    memory.ppu_write(0x3F03, 0x30);
    memory.ppu_write(0x3F07, 0x16);
    memory.ppu_write(0x3F11, 0x21);
    memory
  }

  fn view(mask: Mask, oam: &[u8]) -> View {
    View { ctrl: Control::empty(), mask, scroll: (0, 0), oam }
  }

  #[test]
  fn test_background_off_fills_backdrop() {
    let memory = memory_with_tiles();
    let mut frame = FrameBuffer::new();
    render(&mut frame, &view(Mask::empty(), &[0; 256]), &memory);
    assert!(frame.pixels.iter().all(|&p| p == 0x0F));
  }

  #[test]
  fn test_background_tile_and_attribute_palette() {
    let mut memory = memory_with_tiles();
    memory.ppu_write(0x2000 + 1, 1); // tile (1, 0)
    memory.ppu_write(0x2000 + 4, 1); // tile (4, 0): second attribute quadrant column
    memory.ppu_write(0x23C0, 0b0000_0100); // top-right quadrant of block 0 uses palette 1

    let mut frame = FrameBuffer::new();
    render(&mut frame, &view(Mask::SHOW_BACKGROUND | Mask::BACKGROUND_LEFTMOST, &[0; 256]), &memory);
    assert_eq!(frame.get(0, 0), 0x0F);
    assert_eq!(frame.get(8, 0), 0x30);
    // tile (4,0) lies in the next attribute byte, which is still zero
    assert_eq!(frame.get(33, 7), 0x30);

    memory.ppu_write(0x2000 + 2, 1); // tile (2,0) is in the top-right quadrant
    render(&mut frame, &view(Mask::SHOW_BACKGROUND, &[0; 256]), &memory);
    assert_eq!(frame.get(16, 0), 0x16);
  }

  #[test]
  fn test_background_scroll() {
    let mut memory = memory_with_tiles();
    memory.ppu_write(0x2000 + 1, 1);
    let mut frame = FrameBuffer::new();
    let view = View {
      ctrl: Control::empty(),
      mask: Mask::SHOW_BACKGROUND | Mask::BACKGROUND_LEFTMOST,
      scroll: (8, 0),
      oam: &[0; 256],
    };
    render(&mut frame, &view, &memory);
    assert_eq!(frame.get(0, 0), 0x30);
    assert_eq!(frame.get(8, 0), 0x0F);
  }

  #[test]
  fn test_sprite_transparency_and_flip() {
    let memory = memory_with_tiles();
    let mut oam = [0xFFu8; 256];
    // sprite 0 at (16, 10) with tile 2 flipped horizontally
    oam[0..4].copy_from_slice(&[9, 2, 0x40, 16]);
    let mut frame = FrameBuffer::new();
    render(&mut frame, &view(Mask::SHOW_SPRITES, &oam), &memory);
    assert_eq!(frame.get(16, 10), 0x0F);
    assert_eq!(frame.get(23, 10), 0x21);
    assert_eq!(frame.get(23, 17), 0x21);
    assert_eq!(frame.get(23, 18), 0x0F);
  }

  #[test]
  fn test_sprite_behind_opaque_background() {
    let mut memory = memory_with_tiles();
    memory.ppu_write(0x2000 + 2, 1);
    let mut oam = [0xFFu8; 256];
    oam[0..4].copy_from_slice(&[0x00, 1, 0x20, 16]);
    oam[4..8].copy_from_slice(&[0x1F, 1, 0x20, 16]);
    let mut frame = FrameBuffer::new();
    render(&mut frame, &view(Mask::SHOW_SPRITES | Mask::SHOW_BACKGROUND, &oam), &memory);
    assert_eq!(frame.get(16, 1), 0x30);
    // second sprite sits over backdrop pixels
    assert_eq!(frame.get(16, 32), memory.ppu_read(0x3F13));
  }

  #[test]
  fn test_sprites_off_screen_are_clipped() {
    let mut memory = memory_with_tiles();
    memory.ppu_write(0x3F13, 0x2A);
    let mut oam = [0u8; 256];
    // top row at 239, columns 252-259
    oam[0..4].copy_from_slice(&[0xEE, 1, 0, 0xFC]);
    let mut frame = FrameBuffer::new();
    render(&mut frame, &view(Mask::SHOW_SPRITES | Mask::SPRITES_LEFTMOST, &oam), &memory);
    assert_eq!(frame.get(252, 239), 0x2A);
    assert_eq!(frame.get(255, 239), 0x2A);
    assert_eq!(frame.get(251, 239), 0x0F);
    assert_eq!(frame.get(255, 238), 0x0F);
    assert_eq!(frame.pixels.iter().filter(|&&pixel| pixel == 0x2A).count(), 4);
  }

  #[test]
  fn test_to_rgb24() {
    let mut frame = FrameBuffer::new();
    frame.pixels[0] = 0x30;
    let rgb = frame.to_rgb24();
    assert_eq!(rgb.len(), WIDTH * HEIGHT * 3);
    assert_eq!(&rgb[0..3], &[0xEC, 0xEE, 0xEC]);
  }
}
