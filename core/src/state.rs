use std::ops::Range;

use crate::constants::{
    DISPLAY_HEIGHT, DISPLAY_WIDTH, FONT_SET, KEY_COUNT, MEMORY_SIZE, PROGRAM_START, STACK_DEPTH,
};
use crate::error::{Chip8Error, Result};

/// A snapshot of the Chip-8 internal state
///
/// ## CPU
/// Registers
/// - (v) 16 primary 8-bit registers (V0..VF)
///     - the first 15 (V0..VE) are general purpose registers
///     - the 16th (VF) is the flag register; carry, borrow and collision land here
/// - (i) a 16-bit memory address register
///
/// Counter
/// - (pc) a 16-bit program counter
///
/// Pointer
/// - (sp) the number of return addresses on the stack
///
/// Timers
/// - 2 8-bit timers (delay & sound), decremented by `Chip8::tick`
/// - `sound_active` is set by a tick that found the sound timer running
///
/// ## Memory
/// - 16 entry stack of return addresses
/// - 4096 bytes of addressable memory
///     - 0x000..0x050 hold the font set
///     - 0x200.. hold the loaded program
/// - 32x64 byte frame buffer, every cell is 0 or 1
///
/// ## Input
/// - `keys` latches the pressed status of keys 0..F, written between steps
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct State {
    pub v: [u8; 16],
    pub i: u16,
    pub pc: u16,
    pub sp: u8,
    pub delay_timer: u8,
    pub sound_timer: u8,
    pub sound_active: bool,
    pub stack: [u16; STACK_DEPTH],
    pub memory: [u8; MEMORY_SIZE],
    pub frame_buffer: FrameBuffer,
    pub draw_flag: bool,
    pub keys: [bool; KEY_COUNT],
}

impl State {
    /// Power-on state: font loaded, everything else zeroed, PC at the program start.
    /// The draw flag starts raised so the first frame gets rendered.
    pub fn new() -> Self {
        let mut memory = [0; MEMORY_SIZE];
        memory[..FONT_SET.len()].copy_from_slice(&FONT_SET);

        State {
            v: [0; 16],
            i: 0,
            pc: PROGRAM_START,
            sp: 0,
            delay_timer: 0,
            sound_timer: 0,
            sound_active: false,
            stack: [0; STACK_DEPTH],
            memory,
            frame_buffer: [[0; DISPLAY_WIDTH]; DISPLAY_HEIGHT],
            draw_flag: true,
            keys: [false; KEY_COUNT],
        }
    }

    /// Borrows `len` bytes of memory starting at `start`
    pub fn bytes(&self, start: usize, len: usize) -> Result<&[u8]> {
        let span = Self::span(start, len)?;
        Ok(&self.memory[span])
    }

    /// Mutably borrows `len` bytes of memory starting at `start`
    pub fn bytes_mut(&mut self, start: usize, len: usize) -> Result<&mut [u8]> {
        let span = Self::span(start, len)?;
        Ok(&mut self.memory[span])
    }

    /// The range `start..start + len`, faulting on the first address past the end of memory
    fn span(start: usize, len: usize) -> Result<Range<usize>> {
        let end = start + len;
        if end > MEMORY_SIZE {
            Err(Chip8Error::MemoryAddressOutOfRange {
                address: start.max(MEMORY_SIZE),
            })
        } else {
            Ok(start..end)
        }
    }
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

/// The FrameBuffer is indexed as [y][x]
pub type FrameBuffer = [[u8; DISPLAY_WIDTH]; DISPLAY_HEIGHT];
