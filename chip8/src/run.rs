use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use sdl2::event::Event;
use sdl2::keyboard::Scancode;

use display::Display;
use quirk8_core::{Chip8, Quirks};

use crate::keymap::keymap;

/// Everything the runner needs to know, resolved from the command line
#[derive(Debug)]
pub struct Settings {
    pub rom: PathBuf,
    pub frame_rate: u32,
    pub cycles_per_frame: u32,
    pub palette: usize,
    pub trace: bool,
    pub dump_from: Option<usize>,
    pub quirks: Quirks,
    pub keep_going: bool,
    pub seed: Option<u64>,
    pub scale: u32,
}

/// Emulator controls driven by the keyboard, separate from the Chip-8 keypad
#[derive(Debug, Default)]
struct Controls {
    quit: bool,
    paused: bool,
    // Run a single instruction while paused
    step_once: bool,
    // Ignore the frame rate
    fast_forward: bool,
    // Cycle backwards through saved states instead of forwards
    rewind: bool,
    cycle_palette: bool,
}

impl Controls {
    /// Latches keypad presses into the machine and everything else into the controls
    fn handle(&mut self, event: &Event, chip8: &mut Chip8) {
        match *event {
            Event::Quit { .. } => self.quit = true,
            Event::KeyDown {
                scancode: Some(code),
                repeat,
                ..
            } => match (code, keymap(code)) {
                (_, Some(key)) => chip8.set_key_state(key, true),
                (Scancode::Escape, _) if !repeat => {
                    self.paused = !self.paused;
                    info!("{}", if self.paused { "paused" } else { "resumed" });
                }
                (Scancode::N, _) if self.paused => {
                    debug!("single step");
                    self.step_once = true;
                }
                (Scancode::P, _) if !repeat => self.cycle_palette = true,
                (Scancode::Space, _) => self.fast_forward = true,
                (Scancode::Backspace, _) if !repeat => {
                    info!("rewinding");
                    self.rewind = true;
                }
                _ => {}
            },
            Event::KeyUp {
                scancode: Some(code),
                ..
            } => match (code, keymap(code)) {
                (_, Some(key)) => chip8.set_key_state(key, false),
                (Scancode::Space, _) => self.fast_forward = false,
                (Scancode::Backspace, _) => self.rewind = false,
                _ => {}
            },
            _ => {}
        }
    }
}

/// Runs one instruction, dealing with any fault it raises.
///
/// A faulting instruction either pauses the machine where it stands or, with
/// `keep_going`, is skipped.
fn cycle(chip8: &mut Chip8, settings: &Settings, controls: &mut Controls) {
    if let Err(fault) = chip8.step(settings.trace) {
        let pc = chip8.state().pc;
        if settings.keep_going {
            warn!("{} at {:#05X}, skipping it", fault, pc);
            chip8.skip_instruction();
        } else {
            error!("{} at {:#05X}, pausing", fault, pc);
            controls.paused = true;
        }
    }
}

pub fn run(settings: Settings) -> Result<()> {
    let mut chip8 = match settings.seed {
        Some(seed) => Chip8::with_seed(settings.quirks, seed),
        None => Chip8::new(settings.quirks),
    };

    // Load ROM
    let file = File::open(&settings.rom)
        .with_context(|| format!("unable to open {}", settings.rom.display()))?;
    chip8
        .load_rom(&mut BufReader::new(file))
        .with_context(|| format!("unable to load {}", settings.rom.display()))?;
    info!("loaded {}", settings.rom.display());

    if let Some(from) = settings.dump_from {
        print!("{}", chip8.dump_memory(from));
    }

    // Get SDL2 context
    let sdl = sdl2::init().map_err(anyhow::Error::msg)?;
    let mut display = Display::new(&sdl, settings.scale, settings.palette)?;
    let mut events = sdl.event_pump().map_err(anyhow::Error::msg)?;

    info!(
        "running at {} frames per second, {} instructions per frame, palette {}",
        settings.frame_rate,
        settings.cycles_per_frame,
        display.palette()
    );
    debug!("{:?}", settings.quirks);

    let frame_time = Duration::from_secs(1) / settings.frame_rate;
    let mut controls = Controls::default();
    let mut sounding = false;

    'event: loop {
        let frame_start = Instant::now();

        // Input is polled before every instruction so key presses are never missed
        for _ in 0..settings.cycles_per_frame {
            for event in events.poll_iter() {
                controls.handle(&event, &mut chip8);
            }
            if controls.quit {
                break 'event;
            }

            if controls.rewind {
                if !chip8.rewind() {
                    break;
                }
            } else if !controls.paused || controls.step_once {
                controls.step_once = false;
                cycle(&mut chip8, &settings, &mut controls);
            }
        }

        if !controls.paused && !controls.rewind {
            chip8.tick();
        }
        if chip8.sound_active() != sounding {
            sounding = chip8.sound_active();
            debug!("sound {}", if sounding { "on" } else { "off" });
        }

        let recoloured = std::mem::take(&mut controls.cycle_palette);
        if recoloured {
            display.cycle_palette();
            info!("palette {}", display.palette());
        }
        // Rewound states may carry a stale draw flag, so redraw while rewinding
        if recoloured || controls.rewind || chip8.draw_flag_set() {
            display.render(chip8.frame_buffer())?;
            chip8.acknowledge_draw();
        }

        // Handle timing
        let elapsed = frame_start.elapsed();
        if !controls.fast_forward && frame_time > elapsed {
            std::thread::sleep(frame_time - elapsed);
        }
    }

    info!("shutting down");
    Ok(())
}
