use thiserror::Error;

use crate::constants::STACK_DEPTH;

/// Faults raised while loading or running a program.
///
/// A fault never leaves the machine half-updated: whichever call returned it
/// left the state exactly as it found it.
#[derive(Debug, Error)]
pub enum Chip8Error {
    #[error("ROM is too large ({size} bytes), max size is {max_size} bytes")]
    RomTooLarge { size: usize, max_size: usize },

    #[error("unable to read ROM")]
    RomRead(#[from] std::io::Error),

    #[error("stack overflow: more than {} nested subroutine calls", STACK_DEPTH)]
    StackOverflow,

    #[error("stack underflow: return with an empty call stack")]
    StackUnderflow,

    #[error("unknown opcode {opcode:#06X}")]
    UnknownOpcode { opcode: u16 },

    #[error("memory access out of range at address {address:#06X}")]
    MemoryAddressOutOfRange { address: usize },
}

pub type Result<T> = std::result::Result<T, Chip8Error>;
