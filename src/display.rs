use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

use lazy_static::lazy_static;
use sdl2::event::Event;
use sdl2::keyboard::Keycode;
use sdl2::pixels::PixelFormatEnum;

use famicore::debugger::Flow;
use famicore::joypad::JoypadButton;
use famicore::ppu::render::{HEIGHT, WIDTH};
use famicore::{Nes, Stop};

use crate::{RunError, TraceSink};

const SCALE: u32 = 3;

lazy_static! {
  static ref KEY_MAP: HashMap<Keycode, JoypadButton> = {
    let mut key_map = HashMap::new();
    key_map.insert(Keycode::Down, JoypadButton::DOWN);
    key_map.insert(Keycode::Up, JoypadButton::UP);
    key_map.insert(Keycode::Right, JoypadButton::RIGHT);
    key_map.insert(Keycode::Left, JoypadButton::LEFT);
    key_map.insert(Keycode::Space, JoypadButton::SELECT);
    key_map.insert(Keycode::Return, JoypadButton::START);
    key_map.insert(Keycode::A, JoypadButton::BUTTON_A);
    key_map.insert(Keycode::S, JoypadButton::BUTTON_B);
    key_map
  };
}

fn display_error<E: ToString>(error: E) -> RunError {
  RunError::Display(error.to_string())
}

/// Window front end: one emulated frame per loop, keyboard into the
/// controller port.
pub fn run(
  nes: &mut Nes,
  keys: Rc<Cell<JoypadButton>>,
  sink: &mut TraceSink,
  prompt: fn(&mut Nes) -> Flow,
) -> Result<(), RunError> {
  let sdl_context = sdl2::init().map_err(display_error)?;
  let video_subsystem = sdl_context.video().map_err(display_error)?;
  let window = video_subsystem
    .window("famicore", WIDTH as u32 * SCALE, HEIGHT as u32 * SCALE)
    .position_centered()
    .build()
    .map_err(display_error)?;

  let mut canvas = window.into_canvas().build().map_err(display_error)?;
  let mut event_pump = sdl_context.event_pump().map_err(display_error)?;
  let texture_creator = canvas.texture_creator();
  let mut texture = texture_creator
    .create_texture_streaming(PixelFormatEnum::RGB24, WIDTH as u32, HEIGHT as u32)
    .map_err(display_error)?;

  'running: loop {
    let start = nes.frame_count();
    let mut trace_error = None;
    let stop = nes.run_with_callback(None, |nes| {
      if nes.frame_count() != start {
        return false;
      }
      if let Err(error) = sink.record(nes) {
        trace_error = Some(error);
        return false;
      }
      true
    });
    if let Some(error) = trace_error {
      return Err(error.into());
    }
    if let Stop::Breakpoint(pc) = stop {
      log::info!("break at {:04X}", pc);
      if prompt(nes) == Flow::Quit {
        break 'running;
      }
    }

    if let Some(frame) = nes.frame() {
      texture.update(None, &frame.to_rgb24(), WIDTH * 3).map_err(display_error)?;
    }
    canvas.copy(&texture, None, None).map_err(display_error)?;
    canvas.present();

    for event in event_pump.poll_iter() {
      match event {
        Event::Quit { .. }
        | Event::KeyDown {
          keycode: Some(Keycode::Escape),
          ..
        } => break 'running,
        Event::KeyDown { keycode: Some(keycode), .. } => {
          if let Some(&button) = KEY_MAP.get(&keycode) {
            keys.set(keys.get() | button);
          }
        }
        Event::KeyUp { keycode: Some(keycode), .. } => {
          if let Some(&button) = KEY_MAP.get(&keycode) {
            keys.set(keys.get() - button);
          }
        }
        _ => {}
      }
    }
  }

  sink.flush()?;
  Ok(())
}
