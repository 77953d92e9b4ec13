use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use env_logger::Env;

use quirk8_core::constants::{PROGRAM_START, TIMER_HZ};
use quirk8_core::Quirks;

use crate::run::{run, Settings};

mod keymap;
mod run;

/// Historical interpreter behaviour to start from
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Profile {
    /// COSMAC VIP
    Vip,
    /// CHIP-48 / SCHIP
    Modern,
}

/// A quirk-configurable Chip-8 interpreter
///
/// Keypad: 1234/QWER/ASDF/ZXCV. Escape pauses, N steps one instruction while
/// paused, P cycles the palette, hold Space to fast-forward and Backspace to rewind.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Path to the ROM file to run
    rom: PathBuf,

    /// Frames per second; the timers tick once per frame
    #[arg(
        short,
        long,
        default_value_t = TIMER_HZ,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    frame_rate: u32,

    /// Instructions executed per frame
    #[arg(
        short,
        long = "cycles",
        default_value_t = 20,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    cycles_per_frame: u32,

    /// Colour palette (0-7), random by default
    #[arg(short, long)]
    palette: Option<usize>,

    /// Log every executed instruction
    #[arg(short, long)]
    debug: bool,

    /// Print a hex dump of the loaded program before running
    #[arg(long)]
    dump: bool,

    /// Print a hex dump of all of memory before running
    #[arg(long, conflicts_with = "dump")]
    dump_all: bool,

    /// Interpreter behaviour to emulate
    #[arg(long, value_enum, default_value_t = Profile::Vip)]
    profile: Profile,

    /// Shift VX in place (8XY6/8XYE), overriding the profile
    #[arg(long, conflicts_with = "shift_y")]
    shift_x: bool,

    /// Shift VY into VX (8XY6/8XYE), overriding the profile
    #[arg(long)]
    shift_y: bool,

    /// Skip instructions that fault instead of halting
    #[arg(long)]
    keep_going: bool,

    /// Seed for the random number instruction
    #[arg(long)]
    seed: Option<u64>,

    /// Size of a Chip-8 pixel in window pixels
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..))]
    scale: u32,
}

impl Args {
    fn quirks(&self) -> Quirks {
        let mut quirks = match self.profile {
            Profile::Vip => Quirks::vip(),
            Profile::Modern => Quirks::modern(),
        };
        if self.shift_x {
            quirks.shift_uses_vy = false;
        }
        if self.shift_y {
            quirks.shift_uses_vy = true;
        }
        quirks
    }

    fn into_settings(self) -> Settings {
        let dump_from = if self.dump_all {
            Some(0)
        } else if self.dump {
            Some(PROGRAM_START as usize)
        } else {
            None
        };
        Settings {
            quirks: self.quirks(),
            palette: self.palette.unwrap_or_else(rand::random),
            rom: self.rom,
            frame_rate: self.frame_rate,
            cycles_per_frame: self.cycles_per_frame,
            trace: self.debug,
            dump_from,
            keep_going: self.keep_going,
            seed: self.seed,
            scale: self.scale,
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    run(Args::parse().into_settings())
}
