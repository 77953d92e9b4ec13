//! A quirk-configurable Chip-8 interpreter core.
//!
//! The `Chip8` machine fetches, decodes and executes instructions one `step` at a
//! time and counts its timers down one `tick` at a time. Windowing, input mapping
//! and pacing are left to whoever drives it.

pub use chip8::Chip8;
pub use error::{Chip8Error, Result};
pub use instruction::Instruction;
pub use quirks::Quirks;
pub use state::{FrameBuffer, State};

mod chip8;
pub mod constants;
mod dump;
mod error;
mod instruction;
mod opcode;
mod operations;
mod quirks;
pub mod state;
