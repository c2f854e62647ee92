//! A Nintendo Entertainment System core: 6502 interpreter, memory bus with
//! mirroring and device hooks, 2C02 PPU and controller port.

pub mod bus;
pub mod cartridge;
pub mod cpu;
pub mod debugger;
pub mod joypad;
pub mod nes;
pub mod ppu;
pub mod trace;

pub use self::cartridge::{Cartridge, CartridgeError};
pub use self::nes::{Nes, NesConfig, StepOutcome, Stop};
