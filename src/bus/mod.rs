pub mod device;
pub mod memory;

use std::collections::VecDeque;

use self::device::{BusAccess, BusDevice, Direction, Interrupt, Space, Transfer};
use self::memory::{cpu_mirror, ppu_mirror, Memory};
use crate::cartridge::mirroring::Mirroring;
use crate::cpu::memory::CpuBus;

/// The shared address spaces plus every device mapped into them.
///
/// ```text
///   CPU ──read/write──▶ Bus ──▶ [device 0] ──▶ [device 1] ──▶ ... ──▶ Memory
///                        │
///                        └──tick──▶ devices ──▶ interrupt outbox ──▶ driver
/// ```
pub struct Bus {
  memory: Memory,
  devices: Vec<Box<dyn BusDevice>>,
  last_access: Option<BusAccess>,
  interrupts: VecDeque<Interrupt>,
}

impl Bus {
  pub fn new(mirroring: Mirroring) -> Self {
    return Bus {
      memory: Memory::new(mirroring),
      devices: Vec::new(),
      last_access: None,
      interrupts: VecDeque::new(),
    };
  }

  /// Map a device into the bus. Devices are consulted in the order they
  /// were attached.
  pub fn attach<D: BusDevice>(&mut self, device: D) {
    self.devices.push(Box::new(device));
  }

  /// The first attached device of type `D`.
  pub fn device<D: BusDevice>(&self) -> Option<&D> {
    self.devices.iter().find_map(|device| device.as_any().downcast_ref::<D>())
  }

  pub fn device_mut<D: BusDevice>(&mut self) -> Option<&mut D> {
    self.devices.iter_mut().find_map(|device| device.as_any_mut().downcast_mut::<D>())
  }

  pub fn memory(&self) -> &Memory {
    &self.memory
  }

  pub fn memory_mut(&mut self) -> &mut Memory {
    &mut self.memory
  }

  pub fn last_access(&self) -> Option<BusAccess> {
    self.last_access
  }

  pub fn cpu_read(&mut self, address: u16) -> u8 {
    self.cpu_read_access(address).0
  }

  pub fn cpu_read_access(&mut self, address: u16) -> (u8, BusAccess) {
    self.read(Space::Cpu, cpu_mirror(address))
  }

  pub fn cpu_write(&mut self, address: u16, data: u8) -> BusAccess {
    self.write(Space::Cpu, cpu_mirror(address), data)
  }

  pub fn ppu_read(&mut self, address: u16) -> u8 {
    let address = ppu_mirror(address, self.memory.mirroring());
    self.read(Space::Ppu, address).0
  }

  pub fn ppu_write(&mut self, address: u16, data: u8) -> BusAccess {
    let address = ppu_mirror(address, self.memory.mirroring());
    self.write(Space::Ppu, address, data)
  }

  /// Side-effect free CPU read for the tracer and debugger.
  pub fn peek(&self, address: u16) -> u8 {
    let access = BusAccess {
      space: Space::Cpu,
      direction: Direction::Read,
      address: cpu_mirror(address),
    };
    self
      .devices
      .iter()
      .find_map(|device| device.peek(access, &self.memory))
      .unwrap_or_else(|| self.memory.cpu_read(access.address))
  }

  fn read(&mut self, space: Space, address: u16) -> (u8, BusAccess) {
    let access = BusAccess { space, direction: Direction::Read, address };
    self.last_access = Some(access);

    let mut value = None;
    for device in self.devices.iter_mut() {
      value = device.try_read(access, &mut self.memory);
      if value.is_some() {
        break;
      }
    }
    let value = value.unwrap_or_else(|| match space {
      Space::Cpu => self.memory.cpu_read(address),
      Space::Ppu => self.memory.ppu_read(address),
    });
    self.run_transfers();
    self.collect_interrupts();
    (value, access)
  }

  fn write(&mut self, space: Space, address: u16, data: u8) -> BusAccess {
    let access = BusAccess { space, direction: Direction::Write, address };
    self.last_access = Some(access);

    let mut claimed = false;
    for device in self.devices.iter_mut() {
      if device.try_write(access, data, &mut self.memory) {
        claimed = true;
        break;
      }
    }
    if !claimed {
      match space {
        Space::Cpu => self.memory.cpu_write(address, data),
        Space::Ppu => self.memory.ppu_write(address, data),
      }
    }
    self.run_transfers();
    self.collect_interrupts();
    access
  }

  /// Perform the PPU-space accesses devices queued during the last hook.
  fn run_transfers(&mut self) {
    for index in 0..self.devices.len() {
      while let Some(transfer) = self.devices[index].take_transfer() {
        match transfer {
          Transfer::Read(address) => {
            let data = self.ppu_read(address);
            self.devices[index].complete_read(address, data);
          }
          Transfer::Write(address, data) => {
            self.ppu_write(address, data);
          }
        }
      }
    }
  }

  /// Clock every device `clocks` times, collecting raised interrupts.
  pub fn tick(&mut self, clocks: u32) {
    for _ in 0..clocks {
      for device in self.devices.iter_mut() {
        device.tick(&mut self.memory);
      }
      self.collect_interrupts();
    }
  }

  fn collect_interrupts(&mut self) {
    for device in self.devices.iter_mut() {
      while let Some(interrupt) = device.take_interrupt() {
        self.interrupts.push_back(interrupt);
      }
    }
  }

  /// Next pending interrupt request, oldest first.
  pub fn poll_interrupt(&mut self) -> Option<Interrupt> {
    self.interrupts.pop_front()
  }

  pub fn has_pending_interrupt(&self) -> bool {
    !self.interrupts.is_empty()
  }
}

impl CpuBus for Bus {
  fn read(&mut self, address: u16) -> u8 {
    self.cpu_read(address)
  }

  fn write(&mut self, address: u16, data: u8) {
    self.cpu_write(address, data);
  }

  fn peek(&self, address: u16) -> u8 {
    Bus::peek(self, address)
  }
}
