use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::bus::device::{BusAccess, Direction, Space};
use crate::cpu::{CpuError, CPU};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DebugCommandError {
  #[error("empty command")]
  Empty,

  #[error("unknown command {0:?}, expected one of: s c b d r f q")]
  Unknown(String),

  #[error("{0} needs an argument")]
  MissingArgument(&'static str),

  #[error("{0:?} is not a 16 bit hex address")]
  BadAddress(String),

  #[error("{0:?} is not a flag assignment, expected `f <n|v|b|d|i|z|c> <0|1>`")]
  BadFlag(String),
}

/// A line typed at the debugger prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
  Step,
  Continue,
  Break(u16),
  Delete(u16),
  Registers,
  Flag(char, bool),
  Quit,
}

/// `C000`, `$C000` and `0xC000` all parse.
pub fn parse_address(text: &str) -> Result<u16, DebugCommandError> {
  let digits = text
    .strip_prefix('$')
    .or_else(|| text.strip_prefix("0x"))
    .or_else(|| text.strip_prefix("0X"))
    .unwrap_or(text);
  u16::from_str_radix(digits, 16).map_err(|_| DebugCommandError::BadAddress(text.to_string()))
}

impl FromStr for Command {
  type Err = DebugCommandError;

  fn from_str(line: &str) -> Result<Self, Self::Err> {
    let mut words = line.split_whitespace();
    let name = words.next().ok_or(DebugCommandError::Empty)?;
    let command = match name {
      "s" | "step" => Command::Step,
      "c" | "continue" => Command::Continue,
      "b" | "break" => Command::Break(parse_address(words.next().ok_or(DebugCommandError::MissingArgument("break"))?)?),
      "d" | "delete" => {
        Command::Delete(parse_address(words.next().ok_or(DebugCommandError::MissingArgument("delete"))?)?)
      }
      "r" | "registers" => Command::Registers,
      "f" | "flag" => {
        let flag = words.next().ok_or(DebugCommandError::MissingArgument("flag"))?;
        let value = words.next().ok_or(DebugCommandError::MissingArgument("flag"))?;
        let mut chars = flag.chars();
        let identifier = match (chars.next(), chars.next()) {
          (Some(c), None) => c,
          _ => return Err(DebugCommandError::BadFlag(line.trim().to_string())),
        };
        let enabled = match value {
          "0" => false,
          "1" => true,
          _ => return Err(DebugCommandError::BadFlag(line.trim().to_string())),
        };
        Command::Flag(identifier, enabled)
      }
      "q" | "quit" => Command::Quit,
      other => return Err(DebugCommandError::Unknown(other.to_string())),
    };
    Ok(command)
  }
}

/// What the driver should do after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
  Paused,
  Running,
  Quit,
}

/// Breakpoints and single stepping, checked before every instruction.
#[derive(Debug, Default)]
pub struct Debugger {
  breakpoints: BTreeSet<u16>,
  stepping: bool,
  /// Let the instruction at this address run once even if it is a breakpoint.
  resume_from: Option<u16>,
}

impl Debugger {
  pub fn new() -> Self {
    Debugger::default()
  }

  pub fn add_breakpoint(&mut self, address: u16) {
    self.breakpoints.insert(address);
  }

  pub fn remove_breakpoint(&mut self, address: u16) -> bool {
    self.breakpoints.remove(&address)
  }

  pub fn breakpoints(&self) -> impl Iterator<Item = &u16> {
    self.breakpoints.iter()
  }

  pub fn set_stepping(&mut self, stepping: bool) {
    self.stepping = stepping;
  }

  /// Whether execution should pause before the instruction at `pc`.
  pub fn should_break(&mut self, pc: u16) -> bool {
    if self.resume_from.take() == Some(pc) {
      return false;
    }
    self.stepping || self.breakpoints.contains(&pc)
  }

  /// Apply a command while paused at `cpu`'s program counter.
  pub fn apply(&mut self, command: &Command, cpu: &mut CPU) -> Result<Flow, CpuError> {
    let pc = cpu.registers.program_counter;
    let flow = match *command {
      Command::Step => {
        self.stepping = true;
        self.resume_from = Some(pc);
        Flow::Running
      }
      Command::Continue => {
        self.stepping = false;
        self.resume_from = Some(pc);
        Flow::Running
      }
      Command::Break(address) => {
        self.add_breakpoint(address);
        Flow::Paused
      }
      Command::Delete(address) => {
        if !self.remove_breakpoint(address) {
          log::warn!("no breakpoint at {:04X}", address);
        }
        Flow::Paused
      }
      Command::Registers => Flow::Paused,
      Command::Flag(identifier, enabled) => {
        cpu.set_flag(identifier, enabled)?;
        Flow::Paused
      }
      Command::Quit => Flow::Quit,
    };
    Ok(flow)
  }
}

/// Register dump shown at the prompt.
pub struct Snapshot<'a> {
  pub cpu: &'a CPU,
  pub last_access: Option<BusAccess>,
}

impl fmt::Display for Snapshot<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let r = &self.cpu.registers;
    write!(
      f,
      "PC:{:04X} A:{:02X} X:{:02X} Y:{:02X} P:{:02X} [{}] SP:{:02X} CYC:{}",
      r.program_counter,
      r.a,
      r.x,
      r.y,
      r.status.bits(),
      flag_letters(r.status.bits()),
      r.stack_pointer,
      self.cpu.cycles
    )?;
    if let Some(access) = self.last_access {
      let space = match access.space {
        Space::Cpu => "cpu",
        Space::Ppu => "ppu",
      };
      let direction = match access.direction {
        Direction::Read => "read",
        Direction::Write => "write",
      };
      write!(f, " last {} {} {:04X}", space, direction, access.address)?;
    }
    Ok(())
  }
}

/// `NV-BDIZC`, upper case when set.
fn flag_letters(status: u8) -> String {
  "nv-bdizc"
    .chars()
    .enumerate()
    .map(|(i, c)| if status & (0x80 >> i) != 0 { c.to_ascii_uppercase() } else { c })
    .collect()
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn test_parse_commands() {
    assert_eq!("s".parse(), Ok(Command::Step));
    assert_eq!("continue".parse(), Ok(Command::Continue));
    assert_eq!("b C000".parse(), Ok(Command::Break(0xC000)));
    assert_eq!("b $c5f5".parse(), Ok(Command::Break(0xC5F5)));
    assert_eq!("d 0x8000".parse(), Ok(Command::Delete(0x8000)));
    assert_eq!("  r  ".parse(), Ok(Command::Registers));
    assert_eq!("f c 1".parse(), Ok(Command::Flag('c', true)));
    assert_eq!("q".parse(), Ok(Command::Quit));
  }

  #[test]
  fn test_parse_errors() {
    assert_eq!("".parse::<Command>(), Err(DebugCommandError::Empty));
    assert_eq!("x".parse::<Command>(), Err(DebugCommandError::Unknown("x".to_string())));
    assert_eq!("b".parse::<Command>(), Err(DebugCommandError::MissingArgument("break")));
    assert_eq!("b 12345".parse::<Command>(), Err(DebugCommandError::BadAddress("12345".to_string())));
    assert_eq!("f zz 1".parse::<Command>(), Err(DebugCommandError::BadFlag("f zz 1".to_string())));
    assert_eq!("f z 2".parse::<Command>(), Err(DebugCommandError::BadFlag("f z 2".to_string())));
  }

  #[test]
  fn test_breakpoint_resume_skips_once() {
    let mut debugger = Debugger::new();
    let mut cpu = CPU::new();
    cpu.registers.program_counter = 0xC000;
    debugger.add_breakpoint(0xC000);

    assert!(debugger.should_break(0xC000));
    assert_eq!(debugger.apply(&Command::Continue, &mut cpu), Ok(Flow::Running));
    assert!(!debugger.should_break(0xC000));
    assert!(!debugger.should_break(0xC003));
    // back around the loop
    assert!(debugger.should_break(0xC000));
  }

  #[test]
  fn test_single_step() {
    let mut debugger = Debugger::new();
    let mut cpu = CPU::new();
    cpu.registers.program_counter = 0x8000;
    debugger.set_stepping(true);
    assert!(debugger.should_break(0x8000));
    debugger.apply(&Command::Step, &mut cpu).unwrap();
    assert!(!debugger.should_break(0x8000));
    assert!(debugger.should_break(0x8002));
  }

  #[test]
  fn test_flag_command() {
    let mut debugger = Debugger::new();
    let mut cpu = CPU::new();
    assert_eq!(debugger.apply(&Command::Flag('z', true), &mut cpu), Ok(Flow::Paused));
    assert!(cpu.flag('z').unwrap());
    assert_eq!(
      debugger.apply(&Command::Flag('q', true), &mut cpu),
      Err(CpuError::BadFlagIdentifier('q'))
    );
  }

  #[test]
  fn test_snapshot_display() {
    let mut cpu = CPU::new();
    cpu.registers.reset(0xC000);
    let snapshot = Snapshot {
      cpu: &cpu,
      last_access: Some(BusAccess { space: Space::Cpu, direction: Direction::Write, address: 0x2006 }),
    };
    assert_eq!(
      snapshot.to_string(),
      "PC:C000 A:00 X:00 Y:00 P:24 [nv-bdIzc] SP:FD CYC:0 last cpu write 2006"
    );
  }
}
