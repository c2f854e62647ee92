use crate::bus::Bus;
use crate::cartridge::Cartridge;
use crate::cpu::{CpuError, CPU};
use crate::debugger::Debugger;
use crate::joypad::{HostInput, Joypad};
use crate::ppu::render::FrameBuffer;
use crate::ppu::Ppu;
use crate::trace::trace;

/// PPU clocks per CPU cycle.
pub const PPU_CLOCKS_PER_CPU_CYCLE: u64 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NesConfig {
  /// Sleep at the end of each frame to hold ~60 frames per second.
  pub frame_pacing: bool,
  /// Start here instead of at the reset vector.
  pub start_pc: Option<u16>,
}

impl Default for NesConfig {
  fn default() -> Self {
    NesConfig {
      frame_pacing: true,
      start_pc: None,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
  Executed { cycles: u8 },
  /// The byte was skipped; the machine keeps running.
  Illegal(CpuError),
  /// Paused before the instruction at this address.
  Breakpoint(u16),
}

/// Why a run loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stop {
  /// The callback asked to stop.
  Halted,
  Breakpoint(u16),
  Limit,
}

/// The whole console: CPU plus a bus carrying the PPU, controller port and
/// cartridge. The CPU only ever sees the bus for the duration of a step.
pub struct Nes {
  pub cpu: CPU,
  pub bus: Bus,
  pub debugger: Debugger,
  frame_count: u64,
}

impl Nes {
  pub fn new(cartridge: &Cartridge, input: Box<dyn HostInput>, config: NesConfig) -> Self {
    let mut bus = Bus::new(cartridge.nametable_mirroring);
    bus.attach(Ppu::new(config.frame_pacing));
    bus.attach(Joypad::new(input));
    cartridge.install(&mut bus);

    let mut cpu = CPU::new();
    cpu.reset(&mut bus);
    if let Some(pc) = config.start_pc {
      cpu.registers.program_counter = pc;
    }
    log::info!("starting at {:04X}", cpu.registers.program_counter);

    return Nes {
      cpu,
      bus,
      debugger: Debugger::new(),
      frame_count: 0,
    };
  }

  pub fn ppu(&self) -> Option<&Ppu> {
    self.bus.device::<Ppu>()
  }

  pub fn frame_count(&self) -> u64 {
    self.frame_count
  }

  /// The most recently rendered picture.
  pub fn frame(&self) -> Option<&FrameBuffer> {
    self.ppu().map(|ppu| ppu.frame())
  }

  /// The instruction about to run, as a `nestest.log` line.
  pub fn trace_line(&self) -> String {
    trace(&self.cpu, &self.bus)
  }

  /// One CPU instruction followed by three PPU clocks per CPU cycle it took.
  /// Interrupts raised meanwhile are delivered before returning.
  pub fn step(&mut self) -> StepOutcome {
    let pc = self.cpu.registers.program_counter;
    if self.debugger.should_break(pc) {
      return StepOutcome::Breakpoint(pc);
    }

    let before = self.cpu.cycles;
    let result = self.cpu.step(&mut self.bus);
    self.clock(self.cpu.cycles - before);

    while let Some(interrupt) = self.bus.poll_interrupt() {
      let before = self.cpu.cycles;
      self.cpu.interrupt(&mut self.bus, interrupt.vector());
      self.clock(self.cpu.cycles - before);
    }

    match result {
      Ok(cycles) => StepOutcome::Executed { cycles },
      Err(error) => StepOutcome::Illegal(error),
    }
  }

  fn clock(&mut self, cpu_cycles: u64) {
    self.bus.tick((cpu_cycles * PPU_CLOCKS_PER_CPU_CYCLE) as u32);
    let published = self.bus.device_mut::<Ppu>().map_or(false, |ppu| ppu.take_frame().is_some());
    if published {
      self.frame_count += 1;
    }
  }

  /// Run until the PPU finishes the current frame or a breakpoint is hit.
  pub fn run_frame(&mut self) -> StepOutcome {
    let start = self.frame_count;
    loop {
      let outcome = self.step();
      if matches!(outcome, StepOutcome::Breakpoint(_)) || self.frame_count != start {
        return outcome;
      }
    }
  }

  /// Step until `callback` (run before each instruction) returns false, a
  /// breakpoint is hit, or `limit` instructions have executed.
  pub fn run_with_callback<F>(&mut self, limit: Option<u64>, mut callback: F) -> Stop
  where
    F: FnMut(&mut Nes) -> bool,
  {
    let mut executed = 0u64;
    loop {
      if limit.map_or(false, |limit| executed >= limit) {
        return Stop::Limit;
      }
      if !callback(self) {
        return Stop::Halted;
      }
      if let StepOutcome::Breakpoint(pc) = self.step() {
        return Stop::Breakpoint(pc);
      }
      executed += 1;
    }
  }

  /// Run until the program counter reaches `target`.
  pub fn run_until(&mut self, target: u16, limit: u64) -> Stop {
    self.run_with_callback(Some(limit), |nes| nes.cpu.registers.program_counter != target)
  }
}
