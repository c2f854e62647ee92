use std::any::Any;

use super::memory::Memory;
use crate::cpu::NMI_VECTOR;

/// Which of the two address spaces an access went to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Space {
  Cpu,
  Ppu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
  Read,
  Write,
}

/// One bus transaction: the physical (already mirrored) address touched and
/// how. The bus keeps the latest one and hands it back from every access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusAccess {
  pub space: Space,
  pub direction: Direction,
  pub address: u16,
}

impl BusAccess {
  pub fn is_cpu(&self, address: u16) -> bool {
    self.space == Space::Cpu && self.address == address
  }
}

/// Interrupt requests raised by devices and drained by the driver loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
  Nmi,
}

impl Interrupt {
  pub fn vector(&self) -> u16 {
    match self {
      Interrupt::Nmi => NMI_VECTOR,
    }
  }
}

/// A PPU-space access a device hands back to the bus, so it gets the same
/// mirroring, access log and hooks as any other access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transfer {
  /// Read `address`; the byte comes back through [`BusDevice::complete_read`].
  Read(u16),
  Write(u16, u8),
}

/// A peripheral mapped into the bus.
///
/// Devices are consulted in registration order. The first one that answers a
/// read, or claims a write, ends the access and the backing memory is left
/// alone. Every hook receives the physical memory so register side effects
/// such as OAM DMA can reach it without holding a handle to the bus. Accesses
/// into PPU space go back through the bus as a [`Transfer`].
pub trait BusDevice: Any {
  fn try_read(&mut self, _access: BusAccess, _memory: &mut Memory) -> Option<u8> {
    None
  }

  fn try_write(&mut self, _access: BusAccess, _data: u8, _memory: &mut Memory) -> bool {
    false
  }

  /// What a read would return, without its side effects.
  fn peek(&self, _access: BusAccess, _memory: &Memory) -> Option<u8> {
    None
  }

  /// A PPU-space access queued by the last hook, run by the bus right after it.
  fn take_transfer(&mut self) -> Option<Transfer> {
    None
  }

  fn complete_read(&mut self, _address: u16, _data: u8) {}

  /// Advance one device clock.
  fn tick(&mut self, _memory: &mut Memory) {}

  fn take_interrupt(&mut self) -> Option<Interrupt> {
    None
  }

  fn as_any(&self) -> &dyn Any;

  fn as_any_mut(&mut self) -> &mut dyn Any;
}
