use std::any::Any;
use std::cell::Cell;
use std::rc::Rc;

use bitflags::bitflags;

use crate::bus::device::{BusAccess, BusDevice, Space};
use crate::bus::memory::Memory;

pub const JOYPAD1: u16 = 0x4016;
pub const JOYPAD2: u16 = 0x4017;

/// Upper bits of a controller read come from the open bus (the high byte of
/// the port address).
const OPEN_BUS: u8 = 0x40;

bitflags! {
  /// ## [Standard controller](https://www.nesdev.org/wiki/Standard_controller)
  ///
  /// Report order on the serial line, first bit out first.
  pub struct JoypadButton: u8 {
    const BUTTON_A = 0b0000_0001;
    const BUTTON_B = 0b0000_0010;
    const SELECT = 0b0000_0100;
    const START = 0b0000_1000;
    const UP = 0b0001_0000;
    const DOWN = 0b0010_0000;
    const LEFT = 0b0100_0000;
    const RIGHT = 0b1000_0000;
  }
}

/// Where the controller gets its button state from.
pub trait HostInput {
  fn poll(&self) -> JoypadButton;
}

/// Shared cell a front end writes key state into.
impl HostInput for Rc<Cell<JoypadButton>> {
  fn poll(&self) -> JoypadButton {
    self.get()
  }
}

/// Nothing plugged in.
pub struct Unplugged;

impl HostInput for Unplugged {
  fn poll(&self) -> JoypadButton {
    JoypadButton::empty()
  }
}

/// Controller port 1.
pub struct Joypad {
  input: Box<dyn HostInput>,
  strobe: bool,
  index: u8,
  latched: JoypadButton,
}

impl Joypad {
  pub fn new(input: Box<dyn HostInput>) -> Self {
    return Joypad {
      input,
      strobe: false,
      index: 0,
      latched: JoypadButton::empty(),
    };
  }

  pub fn write(&mut self, data: u8) {
    self.strobe = data & 1 == 1;
    if self.strobe {
      self.index = 0;
      self.latched = self.input.poll();
    }
  }

  /// Next button, A first. After all eight, an official pad reports 1.
  pub fn read(&mut self) -> u8 {
    if self.strobe {
      self.latched = self.input.poll();
      return (self.latched.bits() & 1) | OPEN_BUS;
    }
    if self.index > 7 {
      return 1 | OPEN_BUS;
    }
    let bit = (self.latched.bits() >> self.index) & 1;
    self.index += 1;
    bit | OPEN_BUS
  }

  /// What [`Joypad::read`] would return. While strobe is high that is the
  /// live state of A.
  fn peek(&self) -> u8 {
    if self.strobe {
      return (self.input.poll().bits() & 1) | OPEN_BUS;
    }
    if self.index > 7 {
      return 1 | OPEN_BUS;
    }
    ((self.latched.bits() >> self.index) & 1) | OPEN_BUS
  }
}

impl BusDevice for Joypad {
  fn try_read(&mut self, access: BusAccess, _memory: &mut Memory) -> Option<u8> {
    if access.space != Space::Cpu {
      return None;
    }
    match access.address {
      JOYPAD1 => Some(self.read()),
      JOYPAD2 => Some(OPEN_BUS),
      _ => None,
    }
  }

  fn try_write(&mut self, access: BusAccess, data: u8, _memory: &mut Memory) -> bool {
    if access.is_cpu(JOYPAD1) {
      self.write(data);
      return true;
    }
    false
  }

  fn peek(&self, access: BusAccess, _memory: &Memory) -> Option<u8> {
    if access.space != Space::Cpu {
      return None;
    }
    match access.address {
      JOYPAD1 => Some(Joypad::peek(self)),
      JOYPAD2 => Some(OPEN_BUS),
      _ => None,
    }
  }

  fn as_any(&self) -> &dyn Any {
    self
  }

  fn as_any_mut(&mut self) -> &mut dyn Any {
    self
  }
}
