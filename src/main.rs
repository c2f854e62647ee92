#[cfg(feature = "display")]
mod display;

use std::cell::Cell;
use std::fs::File;
use std::io::{self, BufRead, BufWriter, Write};
use std::path::PathBuf;
use std::rc::Rc;

use clap::Parser;
use env_logger::Env;
use thiserror::Error;

use famicore::debugger::{parse_address, Command, Flow, Snapshot};
use famicore::joypad::JoypadButton;
use famicore::{Cartridge, CartridgeError, Nes, NesConfig, Stop};

const TRACE_TARGET: &str = "famicore::trace";

/// Run an NROM cartridge.
#[derive(Parser, Debug)]
#[command(name = "famicore", version, about, long_about = None)]
struct Args {
  /// Path to the iNES ROM file
  rom: PathBuf,

  /// Write a nestest-style line per instruction to FILE
  #[arg(long, value_name = "FILE")]
  trace: Option<PathBuf>,

  /// Pause before the instruction at HEX (repeatable)
  #[arg(long = "break", value_name = "HEX", value_parser = parse_address)]
  breakpoints: Vec<u16>,

  /// Start at HEX instead of the reset vector (C000 for nestest automation)
  #[arg(long, value_name = "HEX", value_parser = parse_address)]
  start_pc: Option<u16>,

  /// Stop after N instructions
  #[arg(long, value_name = "N")]
  max_instructions: Option<u64>,

  /// Run as fast as possible
  #[arg(long)]
  no_pacing: bool,

  /// Start paused at the first instruction
  #[arg(long)]
  step: bool,

  /// Run without a window
  #[arg(long)]
  headless: bool,
}

#[derive(Debug, Error)]
pub enum RunError {
  #[error("{0}")]
  Io(#[from] io::Error),

  #[error("failed to load cartridge: {0}")]
  Cartridge(#[from] CartridgeError),

  #[error("display: {0}")]
  Display(String),
}

/// Where per-instruction trace lines go.
struct TraceSink {
  file: Option<BufWriter<File>>,
}

impl TraceSink {
  fn new(path: Option<&PathBuf>) -> Result<Self, RunError> {
    let file = match path {
      Some(path) => Some(BufWriter::new(File::create(path)?)),
      None => None,
    };
    Ok(TraceSink { file })
  }

  fn record(&mut self, nes: &Nes) -> io::Result<()> {
    if let Some(file) = self.file.as_mut() {
      writeln!(file, "{}", nes.trace_line())?;
    } else if log::log_enabled!(target: TRACE_TARGET, log::Level::Trace) {
      log::trace!(target: TRACE_TARGET, "{}", nes.trace_line());
    }
    Ok(())
  }

  fn flush(&mut self) -> io::Result<()> {
    if let Some(file) = self.file.as_mut() {
      file.flush()?;
    }
    Ok(())
  }
}

/// Read debugger commands from stdin until one resumes or quits.
fn prompt(nes: &mut Nes) -> Flow {
  println!("{}", nes.trace_line());
  let stdin = io::stdin();
  loop {
    print!("famicore> ");
    if io::stdout().flush().is_err() {
      return Flow::Quit;
    }
    let mut line = String::new();
    match stdin.lock().read_line(&mut line) {
      Ok(0) | Err(_) => return Flow::Quit,
      Ok(_) => {}
    }
    let command = match line.parse::<Command>() {
      Ok(command) => command,
      Err(error) => {
        eprintln!("{}", error);
        continue;
      }
    };
    if command == Command::Registers {
      println!(
        "{}",
        Snapshot {
          cpu: &nes.cpu,
          last_access: nes.bus.last_access(),
        }
      );
      continue;
    }
    match nes.debugger.apply(&command, &mut nes.cpu) {
      Ok(Flow::Paused) => {}
      Ok(flow) => return flow,
      Err(error) => eprintln!("{}", error),
    }
  }
}

fn run_headless(nes: &mut Nes, sink: &mut TraceSink, max_instructions: Option<u64>) -> Result<(), RunError> {
  let mut executed = 0u64;
  let mut trace_error = None;
  loop {
    let stop = nes.run_with_callback(None, |nes| {
      if max_instructions.map_or(false, |max| executed >= max) {
        return false;
      }
      if let Err(error) = sink.record(nes) {
        trace_error = Some(error);
        return false;
      }
      executed += 1;
      true
    });
    if let Some(error) = trace_error.take() {
      return Err(error.into());
    }
    match stop {
      Stop::Breakpoint(pc) => {
        log::info!("break at {:04X}", pc);
        if prompt(nes) == Flow::Quit {
          break;
        }
      }
      Stop::Halted | Stop::Limit => {
        log::info!("stopped after {} instructions, {} frames", executed, nes.frame_count());
        break;
      }
    }
  }
  sink.flush()?;
  Ok(())
}

fn run(args: Args) -> Result<(), RunError> {
  let raw = std::fs::read(&args.rom)?;
  let cartridge = Cartridge::new(&raw)?;

  let keys = Rc::new(Cell::new(JoypadButton::empty()));
  let config = NesConfig {
    frame_pacing: !args.no_pacing,
    start_pc: args.start_pc,
  };
  let mut nes = Nes::new(&cartridge, Box::new(keys.clone()), config);
  for &address in args.breakpoints.iter() {
    nes.debugger.add_breakpoint(address);
  }
  nes.debugger.set_stepping(args.step);

  let mut sink = TraceSink::new(args.trace.as_ref())?;

  #[cfg(feature = "display")]
  {
    if !args.headless {
      return display::run(&mut nes, keys, &mut sink, prompt);
    }
  }
  #[cfg(not(feature = "display"))]
  {
    if !args.headless {
      log::info!("built without the display feature, running headless");
    }
  }

  run_headless(&mut nes, &mut sink, args.max_instructions)
}

fn main() {
  env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
  let args = Args::parse();

  if let Err(error) = run(args) {
    eprintln!("{}", error);
    std::process::exit(1);
  }
}
