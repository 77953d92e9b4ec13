//! One pure function per instruction.
//!
//! Each takes the current `State` and the decoded operands and returns the next
//! `State`, including where the program counter ends up. Operations that can
//! fault return the fault instead and leave the caller's state untouched.

use crate::constants::{DISPLAY_HEIGHT, DISPLAY_WIDTH, GLYPH_SIZE, STACK_DEPTH};
use crate::error::{Chip8Error, Result};
use crate::quirks::Quirks;
use crate::state::State;

const FLAG: usize = 0xF;

fn next(state: &State) -> u16 {
    state.pc.wrapping_add(0x2)
}

fn skip_if(state: &State, condition: bool) -> u16 {
    if condition {
        state.pc.wrapping_add(0x4)
    } else {
        next(state)
    }
}

/// 0NNN: machine code routines only ever existed on the original hardware
pub fn sys(state: &State) -> State {
    State {
        pc: next(state),
        ..*state
    }
}

/// clear
pub fn cls(state: &State) -> State {
    State {
        pc: next(state),
        frame_buffer: [[0; DISPLAY_WIDTH]; DISPLAY_HEIGHT],
        draw_flag: true,
        ..*state
    }
}

/// PC = STACK.pop()
pub fn ret(state: &State) -> Result<State> {
    let sp = state.sp.checked_sub(1).ok_or(Chip8Error::StackUnderflow)?;
    Ok(State {
        pc: state.stack[sp as usize],
        sp,
        ..*state
    })
}

/// PC = addr
pub fn jump(state: &State, addr: u16) -> State {
    State { pc: addr, ..*state }
}

/// STACK.push(PC + 2); PC = addr
pub fn call(state: &State, addr: u16) -> Result<State> {
    if state.sp as usize >= STACK_DEPTH {
        return Err(Chip8Error::StackOverflow);
    }
    let mut stack = state.stack;
    stack[state.sp as usize] = next(state);
    Ok(State {
        pc: addr,
        sp: state.sp + 1,
        stack,
        ..*state
    })
}

/// if Vx == nn then pc += 2
pub fn skip_eq_imm(state: &State, x: u8, nn: u8) -> State {
    State {
        pc: skip_if(state, state.v[x as usize] == nn),
        ..*state
    }
}

/// if Vx != nn then pc += 2
pub fn skip_ne_imm(state: &State, x: u8, nn: u8) -> State {
    State {
        pc: skip_if(state, state.v[x as usize] != nn),
        ..*state
    }
}

/// if Vx == Vy then pc += 2
pub fn skip_eq_reg(state: &State, x: u8, y: u8) -> State {
    State {
        pc: skip_if(state, state.v[x as usize] == state.v[y as usize]),
        ..*state
    }
}

/// if Vx != Vy then pc += 2
pub fn skip_ne_reg(state: &State, x: u8, y: u8) -> State {
    State {
        pc: skip_if(state, state.v[x as usize] != state.v[y as usize]),
        ..*state
    }
}

/// Vx = nn
pub fn load_imm(state: &State, x: u8, nn: u8) -> State {
    let mut v = state.v;
    v[x as usize] = nn;
    State {
        pc: next(state),
        v,
        ..*state
    }
}

/// Vx += nn
/// Add nn to Vx; allow for overflow but implicitly drop it, VF untouched
pub fn add_imm(state: &State, x: u8, nn: u8) -> State {
    let mut v = state.v;
    v[x as usize] = v[x as usize].wrapping_add(nn);
    State {
        pc: next(state),
        v,
        ..*state
    }
}

/// Vx = Vy
pub fn mv(state: &State, x: u8, y: u8) -> State {
    let mut v = state.v;
    v[x as usize] = v[y as usize];
    State {
        pc: next(state),
        v,
        ..*state
    }
}

/// Shared body of OR/AND/XOR: Vx = f(Vx, Vy), then VF = 0 under `logic_ops_reset_vf`
fn logic(state: &State, x: u8, y: u8, quirks: &Quirks, f: fn(u8, u8) -> u8) -> State {
    let mut v = state.v;
    v[x as usize] = f(v[x as usize], v[y as usize]);
    if quirks.logic_ops_reset_vf {
        v[FLAG] = 0x0;
    }
    State {
        pc: next(state),
        v,
        ..*state
    }
}

/// Vx |= Vy
pub fn or(state: &State, x: u8, y: u8, quirks: &Quirks) -> State {
    logic(state, x, y, quirks, |a, b| a | b)
}

/// Vx &= Vy
pub fn and(state: &State, x: u8, y: u8, quirks: &Quirks) -> State {
    logic(state, x, y, quirks, |a, b| a & b)
}

/// Vx ^= Vy
pub fn xor(state: &State, x: u8, y: u8, quirks: &Quirks) -> State {
    logic(state, x, y, quirks, |a, b| a ^ b)
}

/// Writes an ALU result to Vx and then its flag to VF, so the flag wins when x is F
fn with_flag(state: &State, x: u8, result: u8, flag: bool) -> State {
    let mut v = state.v;
    v[x as usize] = result;
    v[FLAG] = flag as u8;
    State {
        pc: next(state),
        v,
        ..*state
    }
}

/// Vx += Vy; VF = carry
pub fn add_reg(state: &State, x: u8, y: u8) -> State {
    let (res, carry) = state.v[x as usize].overflowing_add(state.v[y as usize]);
    with_flag(state, x, res, carry)
}

/// Vx -= Vy; VF = !borrow
pub fn sub(state: &State, x: u8, y: u8) -> State {
    let (res, borrow) = state.v[x as usize].overflowing_sub(state.v[y as usize]);
    with_flag(state, x, res, !borrow)
}

/// Vx = Vy - Vx; VF = !borrow
pub fn subn(state: &State, x: u8, y: u8) -> State {
    let (res, borrow) = state.v[y as usize].overflowing_sub(state.v[x as usize]);
    with_flag(state, x, res, !borrow)
}

fn shift_source(state: &State, x: u8, y: u8, quirks: &Quirks) -> u8 {
    if quirks.shift_uses_vy {
        state.v[y as usize]
    } else {
        state.v[x as usize]
    }
}

/// Vx = src >> 1; VF = the bit shifted out
pub fn shr(state: &State, x: u8, y: u8, quirks: &Quirks) -> State {
    let src = shift_source(state, x, y, quirks);
    with_flag(state, x, src >> 1, src & 0x1 == 0x1)
}

/// Vx = src << 1; VF = the bit shifted out
pub fn shl(state: &State, x: u8, y: u8, quirks: &Quirks) -> State {
    let src = shift_source(state, x, y, quirks);
    with_flag(state, x, src << 1, src & 0x80 == 0x80)
}

/// I = addr
pub fn load_i(state: &State, addr: u16) -> State {
    State {
        pc: next(state),
        i: addr,
        ..*state
    }
}

/// PC = addr + V0, or addr + Vx (x being the high nibble of addr) under `jump_with_offset_uses_vx`
pub fn jump_offset(state: &State, addr: u16, quirks: &Quirks) -> State {
    let register = if quirks.jump_with_offset_uses_vx {
        ((addr >> 8) & 0xF) as usize
    } else {
        0x0
    };
    State {
        pc: addr + u16::from(state.v[register]),
        ..*state
    }
}

/// Vx = random_byte & nn
pub fn rand(state: &State, x: u8, nn: u8, random_byte: u8) -> State {
    let mut v = state.v;
    v[x as usize] = random_byte & nn;
    State {
        pc: next(state),
        v,
        ..*state
    }
}

/// draw_sprite(x=Vx y=Vy size=n)
/// XORs a sprite from memory I..I+n at position Vx, Vy on the FrameBuffer.
/// The origin is taken modulo the screen size and every pixel wraps independently.
/// Sets VF if any pixel is erased.
pub fn draw(state: &State, x: u8, y: u8, n: u8) -> Result<State> {
    let sprite = state.bytes(state.i as usize, n as usize)?;
    let origin_x = state.v[x as usize] as usize % DISPLAY_WIDTH;
    let origin_y = state.v[y as usize] as usize % DISPLAY_HEIGHT;

    let mut frame_buffer = state.frame_buffer;
    let mut collision = 0x0;

    for (row, byte) in sprite.iter().enumerate() {
        let py = (origin_y + row) % DISPLAY_HEIGHT;
        for bit in 0..8 {
            let px = (origin_x + bit) % DISPLAY_WIDTH;
            let pixel = (byte >> (7 - bit)) & 0x1;
            collision |= pixel & frame_buffer[py][px];
            frame_buffer[py][px] ^= pixel;
        }
    }

    let mut v = state.v;
    v[FLAG] = collision;
    Ok(State {
        pc: next(state),
        draw_flag: true,
        v,
        frame_buffer,
        ..*state
    })
}

fn key_pressed(state: &State, x: u8) -> bool {
    state.keys[(state.v[x as usize] & 0xF) as usize]
}

/// if Vx.pressed then pc += 2
pub fn skip_key_pressed(state: &State, x: u8) -> State {
    State {
        pc: skip_if(state, key_pressed(state, x)),
        ..*state
    }
}

/// if !Vx.pressed then pc += 2
pub fn skip_key_released(state: &State, x: u8) -> State {
    State {
        pc: skip_if(state, !key_pressed(state, x)),
        ..*state
    }
}

/// Vx = DT
pub fn load_delay(state: &State, x: u8) -> State {
    let mut v = state.v;
    v[x as usize] = state.delay_timer;
    State {
        pc: next(state),
        v,
        ..*state
    }
}

/// Vx = first pressed key
/// With nothing pressed the PC stays put so the same instruction runs again next step.
pub fn wait_key(state: &State, x: u8) -> State {
    match state.keys.iter().position(|&pressed| pressed) {
        Some(key) => {
            let mut v = state.v;
            v[x as usize] = key as u8;
            State {
                pc: next(state),
                v,
                ..*state
            }
        }
        None => *state,
    }
}

/// DT = Vx
pub fn set_delay(state: &State, x: u8) -> State {
    State {
        pc: next(state),
        delay_timer: state.v[x as usize],
        ..*state
    }
}

/// ST = Vx
pub fn set_sound(state: &State, x: u8) -> State {
    State {
        pc: next(state),
        sound_timer: state.v[x as usize],
        ..*state
    }
}

/// I += Vx; VF = I > 0xFFF under `add_to_i_overflow_sets_vf`
pub fn add_i(state: &State, x: u8, quirks: &Quirks) -> State {
    let i = state.i.wrapping_add(u16::from(state.v[x as usize]));
    let mut v = state.v;
    if quirks.add_to_i_overflow_sets_vf {
        v[FLAG] = (i > 0x0FFF) as u8;
    }
    State {
        pc: next(state),
        i,
        v,
        ..*state
    }
}

/// I = Vx * 5
/// Set I to the memory address of the font glyph for the low nibble of Vx
/// See constants::FONT_SET for more details
pub fn load_font(state: &State, x: u8) -> State {
    State {
        pc: next(state),
        i: u16::from(state.v[x as usize] & 0xF) * GLYPH_SIZE,
        ..*state
    }
}

/// mem[I..I+3] = bcd(Vx)
/// Store BCD repr of Vx in memory starting at address I
pub fn bcd(state: &State, x: u8) -> Result<State> {
    let value = state.v[x as usize];
    let mut next_state = *state;
    next_state
        .bytes_mut(state.i as usize, 3)?
        .copy_from_slice(&[value / 100, value / 10 % 10, value % 10]);
    next_state.pc = next(state);
    Ok(next_state)
}

fn advance_i(state: &State, x: u8, quirks: &Quirks) -> u16 {
    if quirks.load_store_increments_i {
        state.i.wrapping_add(u16::from(x) + 1)
    } else {
        state.i
    }
}

/// mem[I..=I+x] = V0..=Vx
pub fn store_regs(state: &State, x: u8, quirks: &Quirks) -> Result<State> {
    let count = x as usize + 1;
    let mut next_state = *state;
    next_state
        .bytes_mut(state.i as usize, count)?
        .copy_from_slice(&state.v[..count]);
    next_state.pc = next(state);
    next_state.i = advance_i(state, x, quirks);
    Ok(next_state)
}

/// V0..=Vx = mem[I..=I+x]
pub fn load_regs(state: &State, x: u8, quirks: &Quirks) -> Result<State> {
    let count = x as usize + 1;
    let mut v = state.v;
    v[..count].copy_from_slice(state.bytes(state.i as usize, count)?);
    Ok(State {
        pc: next(state),
        i: advance_i(state, x, quirks),
        v,
        ..*state
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ret_on_empty_stack_underflows() {
        let state = State::new();
        assert!(matches!(ret(&state), Err(Chip8Error::StackUnderflow)));
    }

    #[test]
    fn test_call_on_full_stack_overflows() {
        let mut state = State::new();
        state.sp = STACK_DEPTH as u8;
        assert!(matches!(call(&state, 0x300), Err(Chip8Error::StackOverflow)));
    }

    #[test]
    fn test_call_fills_every_stack_slot() {
        let mut state = State::new();
        for depth in 0..STACK_DEPTH {
            state = call(&state, 0x200 + 2 * depth as u16).unwrap();
        }
        assert_eq!(state.sp as usize, STACK_DEPTH);
        assert!(call(&state, 0x300).is_err());
    }

    #[test]
    fn test_add_reg_flag_wins_when_x_is_f() {
        let mut state = State::new();
        state.v[0xF] = 0xFF;
        state.v[0x1] = 0x02;
        let state = add_reg(&state, 0xF, 0x1);
        assert_eq!(state.v[0xF], 0x1);
    }

    #[test]
    fn test_logic_keeps_vf_without_quirk() {
        let mut state = State::new();
        state.v[0xF] = 0x7;
        let state = or(&state, 0x1, 0x2, &Quirks::modern());
        assert_eq!(state.v[0xF], 0x7);
    }

    #[test]
    fn test_draw_wraps_each_pixel() {
        let mut state = State::new();
        state.i = 0x300;
        state.memory[0x300] = 0xFF;
        state.memory[0x301] = 0x80;
        state.v[0x0] = 62;
        state.v[0x1] = 31;
        let state = draw(&state, 0x0, 0x1, 2).unwrap();
        // first row straddles the right edge on the last line
        assert_eq!(state.frame_buffer[31][62..64], [1, 1]);
        assert_eq!(state.frame_buffer[31][0..6], [1, 1, 1, 1, 1, 1]);
        // second row wraps to the top line
        assert_eq!(state.frame_buffer[0][62], 1);
        assert_eq!(state.frame_buffer[0][63], 0);
    }

    #[test]
    fn test_draw_origin_is_taken_modulo_screen() {
        let mut state = State::new();
        state.i = 0x300;
        state.memory[0x300] = 0x80;
        state.v[0x0] = 64 + 3;
        state.v[0x1] = 32 + 4;
        let state = draw(&state, 0x0, 0x1, 1).unwrap();
        assert_eq!(state.frame_buffer[4][3], 1);
    }

    #[test]
    fn test_draw_collision_carries_across_rows() {
        let mut state = State::new();
        state.i = 0x300;
        state.memory[0x300..0x303].copy_from_slice(&[0x80, 0x80, 0x80]);
        state.frame_buffer[0][0] = 1;
        let state = draw(&state, 0x0, 0x0, 3).unwrap();
        assert_eq!(state.v[0xF], 0x1);
        assert_eq!(state.frame_buffer[0][0], 0);
        assert_eq!(state.frame_buffer[1][0], 1);
        assert_eq!(state.frame_buffer[2][0], 1);
    }

    #[test]
    fn test_draw_without_collision_clears_vf() {
        let mut state = State::new();
        state.i = 0x300;
        state.memory[0x300] = 0x80;
        state.v[0xF] = 0x1;
        let state = draw(&state, 0x0, 0x0, 1).unwrap();
        assert_eq!(state.v[0xF], 0x0);
    }

    #[test]
    fn test_draw_past_end_of_memory_faults() {
        let mut state = State::new();
        state.i = 0xFFE;
        assert!(matches!(
            draw(&state, 0x0, 0x0, 4),
            Err(Chip8Error::MemoryAddressOutOfRange { address: 0x1000 })
        ));
        state.i = 0xFFC;
        assert!(draw(&state, 0x0, 0x0, 4).is_ok());
    }

    #[test]
    fn test_draw_does_not_move_i() {
        let mut state = State::new();
        state.i = 0x0A;
        let state = draw(&state, 0x0, 0x0, 5).unwrap();
        assert_eq!(state.i, 0x0A);
    }

    #[test]
    fn test_skip_key_masks_register_to_a_key() {
        let mut state = State::new();
        state.keys[0x3] = true;
        state.v[0x2] = 0x13;
        assert_eq!(skip_key_pressed(&state, 0x2).pc, 0x204);
    }

    #[test]
    fn test_wait_key_takes_lowest_pressed_key() {
        let mut state = State::new();
        state.keys[0x9] = true;
        state.keys[0x4] = true;
        let state = wait_key(&state, 0x5);
        assert_eq!(state.v[0x5], 0x4);
        assert_eq!(state.pc, 0x202);
    }

    #[test]
    fn test_bcd_past_end_of_memory_faults() {
        let mut state = State::new();
        state.i = 0xFFE;
        assert!(bcd(&state, 0x0).is_err());
    }

    #[test]
    fn test_store_regs_past_end_of_memory_faults() {
        let mut state = State::new();
        state.i = 0xFFC;
        assert!(store_regs(&state, 0x3, &Quirks::vip()).is_ok());
        assert!(store_regs(&state, 0x4, &Quirks::vip()).is_err());
    }

    #[test]
    fn test_load_regs_past_end_of_memory_faults() {
        let mut state = State::new();
        state.i = 0xFFC;
        state.memory[0xFFC..].copy_from_slice(&[0x1, 0x2, 0x3, 0x4]);
        let loaded = load_regs(&state, 0x3, &Quirks::vip()).unwrap();
        assert_eq!(loaded.v[..4], [0x1, 0x2, 0x3, 0x4]);
        assert!(matches!(
            load_regs(&state, 0x4, &Quirks::vip()),
            Err(Chip8Error::MemoryAddressOutOfRange { address: 0x1000 })
        ));
    }

    #[test]
    fn test_add_i_overflow_flag() {
        let mut state = State::new();
        state.i = 0x0FFF;
        state.v[0x1] = 0x1;
        state.v[0xF] = 0x7;
        let quirks = Quirks {
            add_to_i_overflow_sets_vf: true,
            ..Quirks::vip()
        };
        let flagged = add_i(&state, 0x1, &quirks);
        assert_eq!(flagged.i, 0x1000);
        assert_eq!(flagged.v[0xF], 0x1);
        let untouched = add_i(&state, 0x1, &Quirks::vip());
        assert_eq!(untouched.v[0xF], 0x7);
    }

    #[test]
    fn test_load_font_uses_low_nibble() {
        let mut state = State::new();
        state.v[0x1] = 0x1A;
        assert_eq!(load_font(&state, 0x1).i, 0xA * 5);
    }
}
