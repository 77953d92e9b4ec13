use std::fmt;

use crate::error::{Chip8Error, Result};
use crate::opcode::Opcode;
use crate::operations::*;
use crate::quirks::Quirks;
use crate::state::State;

/// A decoded Chip-8 instruction and its operands.
///
/// `x` and `y` name registers, `nn` is an 8-bit immediate, `n` a 4-bit one and
/// `addr` a 12-bit address.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// 0NNN
    Sys { addr: u16 },
    /// 00E0
    Cls,
    /// 00EE
    Ret,
    /// 1NNN
    Jump { addr: u16 },
    /// 2NNN
    Call { addr: u16 },
    /// 3XNN
    SkipEqImm { x: u8, nn: u8 },
    /// 4XNN
    SkipNeImm { x: u8, nn: u8 },
    /// 5XY0
    SkipEqReg { x: u8, y: u8 },
    /// 6XNN
    LoadImm { x: u8, nn: u8 },
    /// 7XNN
    AddImm { x: u8, nn: u8 },
    /// 8XY0
    Move { x: u8, y: u8 },
    /// 8XY1
    Or { x: u8, y: u8 },
    /// 8XY2
    And { x: u8, y: u8 },
    /// 8XY3
    Xor { x: u8, y: u8 },
    /// 8XY4
    AddReg { x: u8, y: u8 },
    /// 8XY5
    Sub { x: u8, y: u8 },
    /// 8XY6
    ShiftRight { x: u8, y: u8 },
    /// 8XY7
    SubReverse { x: u8, y: u8 },
    /// 8XYE
    ShiftLeft { x: u8, y: u8 },
    /// 9XY0
    SkipNeReg { x: u8, y: u8 },
    /// ANNN
    LoadI { addr: u16 },
    /// BNNN
    JumpOffset { addr: u16 },
    /// CXNN
    Random { x: u8, nn: u8 },
    /// DXYN
    Draw { x: u8, y: u8, n: u8 },
    /// EX9E
    SkipKeyPressed { x: u8 },
    /// EXA1
    SkipKeyReleased { x: u8 },
    /// FX07
    LoadDelay { x: u8 },
    /// FX0A
    WaitKey { x: u8 },
    /// FX15
    SetDelay { x: u8 },
    /// FX18
    SetSound { x: u8 },
    /// FX1E
    AddI { x: u8 },
    /// FX29
    LoadFont { x: u8 },
    /// FX33
    Bcd { x: u8 },
    /// FX55
    StoreRegs { x: u8 },
    /// FX65
    LoadRegs { x: u8 },
}

impl Instruction {
    /// Selects the Instruction encoded by an opcode
    pub fn decode(op: u16) -> Result<Self> {
        use Instruction::*;

        let (x, y, n, nn, addr) = (op.x(), op.y(), op.n(), op.nn(), op.nnn());
        let instruction = match op.nibbles() {
            (0x0, 0x0, 0xE, 0x0) => Cls,
            (0x0, 0x0, 0xE, 0xE) => Ret,
            (0x0, ..) => Sys { addr },
            (0x1, ..) => Jump { addr },
            (0x2, ..) => Call { addr },
            (0x3, ..) => SkipEqImm { x, nn },
            (0x4, ..) => SkipNeImm { x, nn },
            (0x5, .., 0x0) => SkipEqReg { x, y },
            (0x6, ..) => LoadImm { x, nn },
            (0x7, ..) => AddImm { x, nn },
            (0x8, .., 0x0) => Move { x, y },
            (0x8, .., 0x1) => Or { x, y },
            (0x8, .., 0x2) => And { x, y },
            (0x8, .., 0x3) => Xor { x, y },
            (0x8, .., 0x4) => AddReg { x, y },
            (0x8, .., 0x5) => Sub { x, y },
            (0x8, .., 0x6) => ShiftRight { x, y },
            (0x8, .., 0x7) => SubReverse { x, y },
            (0x8, .., 0xE) => ShiftLeft { x, y },
            (0x9, .., 0x0) => SkipNeReg { x, y },
            (0xA, ..) => LoadI { addr },
            (0xB, ..) => JumpOffset { addr },
            (0xC, ..) => Random { x, nn },
            (0xD, ..) => Draw { x, y, n },
            (0xE, _, 0x9, 0xE) => SkipKeyPressed { x },
            (0xE, _, 0xA, 0x1) => SkipKeyReleased { x },
            (0xF, _, 0x0, 0x7) => LoadDelay { x },
            (0xF, _, 0x0, 0xA) => WaitKey { x },
            (0xF, _, 0x1, 0x5) => SetDelay { x },
            (0xF, _, 0x1, 0x8) => SetSound { x },
            (0xF, _, 0x1, 0xE) => AddI { x },
            (0xF, _, 0x2, 0x9) => LoadFont { x },
            (0xF, _, 0x3, 0x3) => Bcd { x },
            (0xF, _, 0x5, 0x5) => StoreRegs { x },
            (0xF, _, 0x6, 0x5) => LoadRegs { x },
            _ => return Err(Chip8Error::UnknownOpcode { opcode: op }),
        };
        Ok(instruction)
    }

    /// Runs the instruction against `state`, returning the state that follows it.
    ///
    /// `random` is only consulted by `CXNN`.
    pub fn execute(
        self,
        state: &State,
        quirks: &Quirks,
        random: impl FnOnce() -> u8,
    ) -> Result<State> {
        use Instruction::*;

        let next = match self {
            Sys { .. } => sys(state),
            Cls => cls(state),
            Ret => ret(state)?,
            Jump { addr } => jump(state, addr),
            Call { addr } => call(state, addr)?,
            SkipEqImm { x, nn } => skip_eq_imm(state, x, nn),
            SkipNeImm { x, nn } => skip_ne_imm(state, x, nn),
            SkipEqReg { x, y } => skip_eq_reg(state, x, y),
            LoadImm { x, nn } => load_imm(state, x, nn),
            AddImm { x, nn } => add_imm(state, x, nn),
            Move { x, y } => mv(state, x, y),
            Or { x, y } => or(state, x, y, quirks),
            And { x, y } => and(state, x, y, quirks),
            Xor { x, y } => xor(state, x, y, quirks),
            AddReg { x, y } => add_reg(state, x, y),
            Sub { x, y } => sub(state, x, y),
            ShiftRight { x, y } => shr(state, x, y, quirks),
            SubReverse { x, y } => subn(state, x, y),
            ShiftLeft { x, y } => shl(state, x, y, quirks),
            SkipNeReg { x, y } => skip_ne_reg(state, x, y),
            LoadI { addr } => load_i(state, addr),
            JumpOffset { addr } => jump_offset(state, addr, quirks),
            Random { x, nn } => rand(state, x, nn, random()),
            Draw { x, y, n } => draw(state, x, y, n)?,
            SkipKeyPressed { x } => skip_key_pressed(state, x),
            SkipKeyReleased { x } => skip_key_released(state, x),
            LoadDelay { x } => load_delay(state, x),
            WaitKey { x } => wait_key(state, x),
            SetDelay { x } => set_delay(state, x),
            SetSound { x } => set_sound(state, x),
            AddI { x } => add_i(state, x, quirks),
            LoadFont { x } => load_font(state, x),
            Bcd { x } => bcd(state, x)?,
            StoreRegs { x } => store_regs(state, x, quirks)?,
            LoadRegs { x } => load_regs(state, x, quirks)?,
        };
        Ok(next)
    }
}

/// Cowgod-style assembly mnemonics, used by the instruction trace
impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Instruction::*;

        match *self {
            Sys { addr } => write!(f, "SYS  {:#05X}", addr),
            Cls => write!(f, "CLS"),
            Ret => write!(f, "RET"),
            Jump { addr } => write!(f, "JP   {:#05X}", addr),
            Call { addr } => write!(f, "CALL {:#05X}", addr),
            SkipEqImm { x, nn } => write!(f, "SE   V{:X}, {:#04X}", x, nn),
            SkipNeImm { x, nn } => write!(f, "SNE  V{:X}, {:#04X}", x, nn),
            SkipEqReg { x, y } => write!(f, "SE   V{:X}, V{:X}", x, y),
            LoadImm { x, nn } => write!(f, "LD   V{:X}, {:#04X}", x, nn),
            AddImm { x, nn } => write!(f, "ADD  V{:X}, {:#04X}", x, nn),
            Move { x, y } => write!(f, "LD   V{:X}, V{:X}", x, y),
            Or { x, y } => write!(f, "OR   V{:X}, V{:X}", x, y),
            And { x, y } => write!(f, "AND  V{:X}, V{:X}", x, y),
            Xor { x, y } => write!(f, "XOR  V{:X}, V{:X}", x, y),
            AddReg { x, y } => write!(f, "ADD  V{:X}, V{:X}", x, y),
            Sub { x, y } => write!(f, "SUB  V{:X}, V{:X}", x, y),
            ShiftRight { x, y } => write!(f, "SHR  V{:X}, V{:X}", x, y),
            SubReverse { x, y } => write!(f, "SUBN V{:X}, V{:X}", x, y),
            ShiftLeft { x, y } => write!(f, "SHL  V{:X}, V{:X}", x, y),
            SkipNeReg { x, y } => write!(f, "SNE  V{:X}, V{:X}", x, y),
            LoadI { addr } => write!(f, "LD   I, {:#05X}", addr),
            JumpOffset { addr } => write!(f, "JP   V0, {:#05X}", addr),
            Random { x, nn } => write!(f, "RND  V{:X}, {:#04X}", x, nn),
            Draw { x, y, n } => write!(f, "DRW  V{:X}, V{:X}, {}", x, y, n),
            SkipKeyPressed { x } => write!(f, "SKP  V{:X}", x),
            SkipKeyReleased { x } => write!(f, "SKNP V{:X}", x),
            LoadDelay { x } => write!(f, "LD   V{:X}, DT", x),
            WaitKey { x } => write!(f, "LD   V{:X}, K", x),
            SetDelay { x } => write!(f, "LD   DT, V{:X}", x),
            SetSound { x } => write!(f, "LD   ST, V{:X}", x),
            AddI { x } => write!(f, "ADD  I, V{:X}", x),
            LoadFont { x } => write!(f, "LD   F, V{:X}", x),
            Bcd { x } => write!(f, "LD   B, V{:X}", x),
            StoreRegs { x } => write!(f, "LD   [I], V{:X}", x),
            LoadRegs { x } => write!(f, "LD   V{:X}, [I]", x),
        }
    }
}
