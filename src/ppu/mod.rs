pub mod registers;
pub mod render;

use std::any::Any;
use std::time::{Duration, Instant};

use self::registers::{Control, Latch, Mask, Status};
use self::render::{FrameBuffer, View};
use crate::bus::device::{BusAccess, BusDevice, Interrupt, Space, Transfer};
use crate::bus::memory::{Memory, PALETTE_START};

pub const PPUCTRL: u16 = 0x2000;
pub const PPUMASK: u16 = 0x2001;
pub const PPUSTATUS: u16 = 0x2002;
pub const OAMADDR: u16 = 0x2003;
pub const OAMDATA: u16 = 0x2004;
pub const PPUSCROLL: u16 = 0x2005;
pub const PPUADDR: u16 = 0x2006;
pub const PPUDATA: u16 = 0x2007;
pub const OAMDMA: u16 = 0x4014;

pub const DOTS_PER_SCANLINE: u32 = 341;
pub const SCANLINES_PER_FRAME: u32 = 262;
/// PPU clocks in one NTSC frame.
pub const FRAME_CYCLES: u32 = DOTS_PER_SCANLINE * SCANLINES_PER_FRAME;
/// Dot 1 of scanline 241.
pub const VBLANK_CYCLE: u32 = DOTS_PER_SCANLINE * 241;
pub const PRE_RENDER_CYCLE: u32 = DOTS_PER_SCANLINE * 261;

const VISIBLE_SCANLINES: u32 = 240;
const FRAME_DURATION: Duration = Duration::from_nanos(16_666_667);

/// ## [2C02 PPU](https://www.nesdev.org/wiki/PPU)
///
/// Mapped into CPU space at $2000-$2007 (mirrored up to $3FFF) and $4014.
/// One [`Ppu::step`] is one PPU clock; the bus calls it three times per CPU
/// cycle.
pub struct Ppu {
  ctrl: Control,
  mask: Mask,
  status: Status,
  oam_addr: u8,
  oam: [u8; 256],
  latch: Latch,
  read_buffer: u8,
  /// Data port access waiting for the bus.
  transfer: Option<Transfer>,
  /// Last value driven onto the PPU I/O bus; reads of write-only ports
  /// return it.
  io_latch: u8,
  cycle: u32,
  nmi_pending: bool,
  frame: FrameBuffer,
  frame_ready: bool,
  pacing: bool,
  last_frame: Option<Instant>,
}

impl Ppu {
  pub fn new(pacing: bool) -> Self {
    return Ppu {
      ctrl: Control::empty(),
      mask: Mask::empty(),
      status: Status::empty(),
      oam_addr: 0,
      oam: [0; 256],
      latch: Latch::default(),
      read_buffer: 0,
      transfer: None,
      io_latch: 0,
      cycle: 0,
      nmi_pending: false,
      frame: FrameBuffer::new(),
      frame_ready: false,
      pacing,
      last_frame: None,
    };
  }

  pub fn ctrl(&self) -> Control {
    self.ctrl
  }

  pub fn mask(&self) -> Mask {
    self.mask
  }

  pub fn status(&self) -> Status {
    self.status
  }

  pub fn vram_address(&self) -> u16 {
    self.latch.address()
  }

  pub fn write_toggle(&self) -> bool {
    self.latch.toggle()
  }

  pub fn oam(&self) -> &[u8; 256] {
    &self.oam
  }

  pub fn cycle(&self) -> u32 {
    self.cycle
  }

  pub fn scanline(&self) -> u32 {
    self.cycle / DOTS_PER_SCANLINE
  }

  pub fn dot(&self) -> u32 {
    self.cycle % DOTS_PER_SCANLINE
  }

  pub fn nmi_pending(&self) -> bool {
    self.nmi_pending
  }

  /// The last completed frame, once per frame.
  pub fn take_frame(&mut self) -> Option<&FrameBuffer> {
    if !self.frame_ready {
      return None;
    }
    self.frame_ready = false;
    Some(&self.frame)
  }

  pub fn frame(&self) -> &FrameBuffer {
    &self.frame
  }

  /// Advance one PPU clock.
  pub fn step(&mut self, memory: &mut Memory) {
    self.cycle = (self.cycle + 1) % FRAME_CYCLES;

    match self.cycle {
      VBLANK_CYCLE => {
        self.status.insert(Status::VBLANK);
        let view = View {
          ctrl: self.ctrl,
          mask: self.mask,
          scroll: self.latch.scroll(),
          oam: &self.oam,
        };
        render::render(&mut self.frame, &view, memory);
        log::trace!("vblank start, nmi {}", self.ctrl.contains(Control::GENERATE_NMI));
        if self.ctrl.contains(Control::GENERATE_NMI) {
          self.nmi_pending = true;
        }
      }
      PRE_RENDER_CYCLE => {
        self.status.remove(Status::VBLANK | Status::SPRITE_ZERO_HIT | Status::SPRITE_OVERFLOW);
        log::trace!("vblank end");
      }
      0 => self.publish_frame(),
      _ => {}
    }

    self.check_sprite_zero_hit();
  }

  /// Sleep off whatever is left of the frame budget, then hand the frame over.
  fn publish_frame(&mut self) {
    if self.pacing {
      if let Some(last) = self.last_frame {
        if let Some(remaining) = FRAME_DURATION.checked_sub(last.elapsed()) {
          std::thread::sleep(remaining);
        }
      }
      self.last_frame = Some(Instant::now());
    }
    self.frame_ready = true;
  }

  /// ## [Sprite 0 hit](https://www.nesdev.org/wiki/PPU_OAM#Sprite_zero_hits)
  ///
  /// Approximated at the top left pixel of sprite 0.
  fn check_sprite_zero_hit(&mut self) {
    if self.status.contains(Status::SPRITE_ZERO_HIT) || !self.mask.contains(Mask::SHOW_SPRITES | Mask::SHOW_BACKGROUND) {
      return;
    }
    let scanline = self.scanline();
    if scanline >= VISIBLE_SCANLINES {
      return;
    }
    let y = self.oam[0] as u32 + 1;
    let x = self.oam[3] as u32;
    if scanline == y && self.dot() >= x {
      self.status.insert(Status::SPRITE_ZERO_HIT);
    }
  }

  fn write_ctrl(&mut self, data: u8) {
    let was_enabled = self.ctrl.contains(Control::GENERATE_NMI);
    self.ctrl = Control::from_bits_truncate(data);
    if !was_enabled && self.ctrl.contains(Control::GENERATE_NMI) && self.status.contains(Status::VBLANK) {
      self.nmi_pending = true;
    }
  }

  fn read_status(&mut self) -> u8 {
    let data = self.status.bits() | (self.io_latch & 0x1F);
    self.status.remove(Status::VBLANK);
    self.latch.reset_toggle();
    data
  }

  fn write_oam_data(&mut self, data: u8) {
    self.oam[self.oam_addr as usize] = data;
    self.oam_addr = self.oam_addr.wrapping_add(1);
  }

  fn read_data(&mut self, memory: &Memory) -> u8 {
    let address = self.latch.address() & 0x3FFF;
    self.latch.increment(self.ctrl.vram_increment());

    if address >= PALETTE_START {
      // palette RAM is internal and answers at once; the buffer still fills
      // from the nametable byte underneath
      self.transfer = Some(Transfer::Read(address - 0x1000));
      return memory.ppu_read(address);
    }
    self.transfer = Some(Transfer::Read(address));
    self.read_buffer
  }

  fn write_data(&mut self, data: u8) {
    self.transfer = Some(Transfer::Write(self.latch.address() & 0x3FFF, data));
    self.latch.increment(self.ctrl.vram_increment());
  }

  /// ## [OAMDMA](https://www.nesdev.org/wiki/PPU_registers#OAMDMA)
  ///
  /// Copies CPU page `$XX00-$XXFF` into OAM.
  fn oam_dma(&mut self, page: u8, memory: &Memory) {
    self.oam = memory.cpu_page(page);
  }
}

impl BusDevice for Ppu {
  fn try_read(&mut self, access: BusAccess, memory: &mut Memory) -> Option<u8> {
    if access.space != Space::Cpu {
      return None;
    }
    let data = match access.address {
      PPUSTATUS => self.read_status(),
      OAMDATA => self.oam[self.oam_addr as usize],
      PPUDATA => self.read_data(memory),
      PPUCTRL | PPUMASK | OAMADDR | PPUSCROLL | PPUADDR => self.io_latch,
      _ => return None,
    };
    self.io_latch = data;
    Some(data)
  }

  fn try_write(&mut self, access: BusAccess, data: u8, memory: &mut Memory) -> bool {
    if access.space != Space::Cpu {
      return false;
    }
    match access.address {
      PPUCTRL => self.write_ctrl(data),
      PPUMASK => self.mask = Mask::from_bits_truncate(data),
      PPUSTATUS => {}
      OAMADDR => self.oam_addr = data,
      OAMDATA => self.write_oam_data(data),
      PPUSCROLL => self.latch.write_scroll(data),
      PPUADDR => self.latch.write_address(data),
      PPUDATA => self.write_data(data),
      OAMDMA => self.oam_dma(data, memory),
      _ => return false,
    }
    self.io_latch = data;
    true
  }

  fn peek(&self, access: BusAccess, memory: &Memory) -> Option<u8> {
    if access.space != Space::Cpu {
      return None;
    }
    match access.address {
      PPUSTATUS => Some(self.status.bits() | (self.io_latch & 0x1F)),
      OAMDATA => Some(self.oam[self.oam_addr as usize]),
      PPUDATA => {
        let address = self.latch.address() & 0x3FFF;
        if address >= PALETTE_START {
          Some(memory.ppu_read(address))
        } else {
          Some(self.read_buffer)
        }
      }
      PPUCTRL | PPUMASK | OAMADDR | PPUSCROLL | PPUADDR => Some(self.io_latch),
      _ => None,
    }
  }

  fn take_transfer(&mut self) -> Option<Transfer> {
    self.transfer.take()
  }

  fn complete_read(&mut self, _address: u16, data: u8) {
    self.read_buffer = data;
  }

  fn tick(&mut self, memory: &mut Memory) {
    self.step(memory);
  }

  fn take_interrupt(&mut self) -> Option<Interrupt> {
    if self.nmi_pending {
      self.nmi_pending = false;
      return Some(Interrupt::Nmi);
    }
    None
  }

  fn as_any(&self) -> &dyn Any {
    self
  }

  fn as_any_mut(&mut self) -> &mut dyn Any {
    self
  }
}
