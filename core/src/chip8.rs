use std::collections::VecDeque;
use std::io::Read;

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::constants::{KEY_COUNT, MAX_ROM_SIZE, MAX_SAVED_STATES, PROGRAM_START};
use crate::dump::hex_dump;
use crate::error::{Chip8Error, Result};
use crate::instruction::Instruction;
use crate::opcode::Opcode;
use crate::quirks::Quirks;
use crate::state::{FrameBuffer, State};

/// # Chip-8
/// Chip-8 is a virtual machine and corresponding interpreted language.
///
/// Tracks:
///  - current `state`
///  - `previous_states` for rewinding
///  - the `quirks` it was built with and its own random source
///
/// Supplies interfaces for:
/// - loading roms
/// - pressing and releasing keys
/// - stepping and rewinding the CPU
/// - ticking its timers
/// - inspecting its frame buffer for rendering by some display
///
/// Every machine owns all of its state, so any number of them can run side by side.
pub struct Chip8 {
    state: State,
    previous_states: VecDeque<State>,
    quirks: Quirks,
    rng: StdRng,
}

impl Chip8 {
    pub fn new(quirks: Quirks) -> Self {
        Self::with_rng(quirks, StdRng::from_entropy())
    }

    /// A machine whose `CXNN` results are reproducible
    pub fn with_seed(quirks: Quirks, seed: u64) -> Self {
        Self::with_rng(quirks, StdRng::seed_from_u64(seed))
    }

    fn with_rng(quirks: Quirks, rng: StdRng) -> Self {
        Chip8 {
            state: State::new(),
            previous_states: VecDeque::with_capacity(MAX_SAVED_STATES),
            quirks,
            rng,
        }
    }

    pub fn quirks(&self) -> Quirks {
        self.quirks
    }

    /// Read-only view of registers, memory and timers
    pub fn state(&self) -> &State {
        &self.state
    }

    /// Returns to power-on values and forgets any loaded program.
    /// Keys still held stay latched.
    pub fn reset(&mut self) {
        debug!("resetting machine");
        let keys = self.state.keys;
        self.state = State::new();
        self.state.keys = keys;
        self.previous_states.clear();
    }

    /// Copies a program into memory at `PROGRAM_START`, replacing whatever was there.
    ///
    /// # Arguments
    /// * `program` raw ROM bytes; they are not validated in any way
    pub fn load_program(&mut self, program: &[u8]) -> Result<()> {
        if program.len() > MAX_ROM_SIZE {
            return Err(Chip8Error::RomTooLarge {
                size: program.len(),
                max_size: MAX_ROM_SIZE,
            });
        }
        let memory = &mut self.state.memory[PROGRAM_START as usize..];
        memory.fill(0);
        memory[..program.len()].copy_from_slice(program);
        debug!("loaded {} byte program at {:#05X}", program.len(), PROGRAM_START);
        Ok(())
    }

    /// Load a rom from a source file
    ///
    /// The whole ROM is read before memory is touched, so a failed read loads nothing.
    /// Reading stops one byte past `MAX_ROM_SIZE`, which is enough to reject the ROM.
    ///
    /// # Arguments
    /// * `reader` a file reader that contains a ROM
    pub fn load_rom(&mut self, reader: &mut dyn Read) -> Result<()> {
        let mut rom = Vec::with_capacity(MAX_ROM_SIZE + 1);
        reader.take(MAX_ROM_SIZE as u64 + 1).read_to_end(&mut rom)?;
        self.load_program(&rom)
    }

    /// Whether the frame buffer changed since the last `acknowledge_draw`
    pub fn draw_flag_set(&self) -> bool {
        self.state.draw_flag
    }

    pub fn acknowledge_draw(&mut self) {
        self.state.draw_flag = false;
    }

    pub fn frame_buffer(&self) -> &FrameBuffer {
        &self.state.frame_buffer
    }

    /// Whether the last tick found the sound timer running
    pub fn sound_active(&self) -> bool {
        self.state.sound_active
    }

    /// Set the pressed status of a key
    ///
    /// # Arguments
    /// * `key` the keypad code 0x0..=0xF; anything else is ignored
    /// * `pressed` whether the key is down
    pub fn set_key_state(&mut self, key: u8, pressed: bool) {
        match self.state.keys.get_mut(key as usize) {
            Some(latch) => *latch = pressed,
            None => warn!("ignoring state of key {:#X}, the keypad has {} keys", key, KEY_COUNT),
        }
    }

    /// Advances the CPU by a single instruction
    /// - fetches, decodes and executes the opcode at the PC
    /// - optionally logs the decoded instruction
    ///
    /// On a fault the machine is left exactly as it was; the caller decides
    /// whether to stop or `skip_instruction` and carry on.
    pub fn step(&mut self, trace: bool) -> Result<()> {
        let op = self.fetch()?;
        let decoded = Instruction::decode(op);
        if trace {
            info!("{}", trace_line(self.state.pc, op, decoded.as_ref().ok()));
        }
        let instruction = decoded?;
        if let Instruction::Sys { addr } = instruction {
            warn!("ignoring machine code routine call to {:#05X}", addr);
        }

        let rng = &mut self.rng;
        let next = instruction.execute(&self.state, &self.quirks, || rng.gen())?;
        self.save_state();
        self.state = next;
        Ok(())
    }

    /// Moves the PC past the current instruction without running it
    pub fn skip_instruction(&mut self) {
        self.state.pc = self.state.pc.wrapping_add(0x2);
    }

    /// Reverses the CPU by a single instruction if possible
    /// - if there are previous_states, pops the last one and restores it
    /// - the key latch is left as it is
    ///
    /// Returns whether there was anything to rewind.
    pub fn rewind(&mut self) -> bool {
        match self.previous_states.pop_front() {
            Some(state) => {
                let keys = self.state.keys;
                self.state = state;
                self.state.keys = keys;
                true
            }
            None => false,
        }
    }

    /// Puts the current state in previous_states
    /// - if there are already MAX_SAVED_STATES saved then the oldest is dropped
    fn save_state(&mut self) {
        if self.previous_states.len() == MAX_SAVED_STATES {
            self.previous_states.pop_back();
        }
        self.previous_states.push_front(self.state);
    }

    /// Counts both timers down by one; meant to be called at `TIMER_HZ`
    pub fn tick(&mut self) {
        self.state.delay_timer = self.state.delay_timer.saturating_sub(1);
        self.state.sound_active = self.state.sound_timer > 0;
        self.state.sound_timer = self.state.sound_timer.saturating_sub(1);
    }

    /// Hex dump of memory from `from` to the end
    pub fn dump_memory(&self, from: usize) -> String {
        self.state
            .memory
            .get(from..)
            .map(|bytes| hex_dump(bytes, from))
            .unwrap_or_default()
    }

    /// Gets the opcode currently pointed at by the pc.
    /// Memory is stored as bytes, but opcodes are 16 bits so we combine two subsequent bytes.
    fn fetch(&self) -> Result<u16> {
        let bytes = self.state.bytes(self.state.pc as usize, 2)?;
        Ok(u16::from_bytes(bytes[0], bytes[1]))
    }
}

/// `PC: WORD  MNEMONIC`, with `???` standing in for a word that does not decode
fn trace_line(pc: u16, op: u16, instruction: Option<&Instruction>) -> String {
    match instruction {
        Some(instruction) => format!("{:04X}: {:04X}  {}", pc, op, instruction),
        None => format!("{:04X}: {:04X}  ???", pc, op),
    }
}

impl Default for Chip8 {
    fn default() -> Self {
        Self::new(Quirks::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    fn machine(program: &[u8]) -> Chip8 {
        let mut chip8 = Chip8::with_seed(Quirks::default(), 0);
        chip8.load_program(program).unwrap();
        chip8
    }

    #[test]
    fn test_chip8_fetches_big_endian() {
        let chip8 = machine(&[0xAA, 0xBB]);
        assert_eq!(chip8.fetch().unwrap(), 0xAABB);
    }

    #[test]
    fn test_fetch_past_end_of_memory_faults() {
        let mut chip8 = machine(&[]);
        chip8.state.pc = 0x0FFF;
        assert!(matches!(
            chip8.step(false),
            Err(Chip8Error::MemoryAddressOutOfRange { address: 0x1000 })
        ));
    }

    #[test]
    fn test_step_advances_pc() {
        let mut chip8 = machine(&[0x00, 0xE0]);
        chip8.step(false).unwrap();
        assert_eq!(chip8.state.pc, 0x202);
    }

    #[test]
    fn test_trace_does_not_change_behaviour() {
        let mut quiet = machine(&[0x60, 0x0A, 0x70, 0x05]);
        let mut traced = machine(&[0x60, 0x0A, 0x70, 0x05]);
        for _ in 0..2 {
            quiet.step(false).unwrap();
            traced.step(true).unwrap();
        }
        assert!(quiet.state == traced.state);
    }

    #[test]
    fn test_fault_leaves_state_untouched() {
        let mut chip8 = machine(&[0x60, 0x0A, 0x81, 0x28]);
        chip8.step(false).unwrap();
        let before = chip8.state;
        assert!(matches!(
            chip8.step(false),
            Err(Chip8Error::UnknownOpcode { opcode: 0x8128 })
        ));
        assert!(chip8.state == before);
    }

    #[test]
    fn test_skip_instruction_moves_past_fault() {
        let mut chip8 = machine(&[0xFF, 0xFF, 0x60, 0x01]);
        assert!(chip8.step(false).is_err());
        chip8.skip_instruction();
        chip8.step(false).unwrap();
        assert_eq!(chip8.state.v[0x0], 0x1);
    }

    #[test]
    fn test_waits_for_key_without_moving() {
        let mut chip8 = machine(&[0xF3, 0x0A]);
        for _ in 0..5 {
            chip8.step(false).unwrap();
            assert_eq!(chip8.state.pc, 0x200);
        }
        chip8.set_key_state(0x7, true);
        chip8.step(false).unwrap();
        assert_eq!(chip8.state.pc, 0x202);
        assert_eq!(chip8.state.v[0x3], 0x7);
    }

    #[test]
    fn test_set_key_state_ignores_unknown_keys() {
        let mut chip8 = machine(&[]);
        chip8.set_key_state(0x10, true);
        assert!(chip8.state.keys.iter().all(|&pressed| !pressed));
        chip8.set_key_state(0xF, true);
        assert!(chip8.state.keys[0xF]);
        chip8.set_key_state(0xF, false);
        assert!(!chip8.state.keys[0xF]);
    }

    #[test]
    fn test_chip8_saves_state() {
        let mut chip8 = machine(&[0x00, 0xE0]);
        chip8.step(false).unwrap();
        assert_eq!(chip8.previous_states.len(), 1);
    }

    #[test]
    fn test_failed_step_saves_nothing() {
        let mut chip8 = machine(&[0x00, 0xEE]);
        assert!(chip8.step(false).is_err());
        assert!(chip8.previous_states.is_empty());
    }

    // TODO this test is unnecessarily slow because we can't parameterize MAX_SAVED_STATES
    #[test]
    fn test_chip8_drops_old_saved_states() {
        let mut chip8 = machine(&[]);
        for _ in 0..MAX_SAVED_STATES {
            chip8.save_state();
        }
        assert_eq!(MAX_SAVED_STATES, chip8.previous_states.len());
        chip8.save_state();
        assert_eq!(MAX_SAVED_STATES, chip8.previous_states.len());
    }

    #[test]
    fn test_rewind_restores_previous_state_but_not_keys() {
        let mut chip8 = machine(&[0x60, 0x0A, 0x61, 0x05]);
        chip8.step(false).unwrap();
        chip8.step(false).unwrap();
        chip8.set_key_state(0x2, true);
        assert!(chip8.rewind());
        assert_eq!(chip8.state.pc, 0x202);
        assert_eq!(chip8.state.v[0x1], 0x0);
        assert!(chip8.state.keys[0x2]);
        assert!(chip8.rewind());
        assert!(!chip8.rewind());
        assert_eq!(chip8.state.pc, 0x200);
    }

    #[test]
    fn test_tick_counts_down_to_zero() {
        let mut chip8 = machine(&[]);
        chip8.state.delay_timer = 2;
        chip8.state.sound_timer = 1;
        chip8.tick();
        assert_eq!((chip8.state.delay_timer, chip8.state.sound_timer), (1, 0));
        assert!(chip8.sound_active());
        chip8.tick();
        chip8.tick();
        assert_eq!((chip8.state.delay_timer, chip8.state.sound_timer), (0, 0));
        assert!(!chip8.sound_active());
    }

    #[test]
    fn test_draw_handshake() {
        let mut chip8 = machine(&[]);
        assert!(chip8.draw_flag_set());
        chip8.acknowledge_draw();
        assert!(!chip8.draw_flag_set());
    }

    #[test]
    fn test_load_program_too_large() {
        let mut chip8 = machine(&[]);
        let rom = vec![0xAA; MAX_ROM_SIZE + 1];
        assert!(matches!(
            chip8.load_program(&rom),
            Err(Chip8Error::RomTooLarge { size: 0xE01, max_size: 0xE00 })
        ));
        assert_eq!(chip8.state.memory[0x200], 0x0);
        assert!(chip8.load_program(&rom[..MAX_ROM_SIZE]).is_ok());
        assert_eq!(chip8.state.memory[0xFFF], 0xAA);
    }

    #[test]
    fn test_load_program_clears_previous_program() {
        let mut chip8 = machine(&[0x11, 0x22, 0x33]);
        chip8.load_program(&[0x44]).unwrap();
        assert_eq!(chip8.state.memory[0x200..0x203], [0x44, 0x00, 0x00]);
    }

    struct BrokenReader {
        served: bool,
    }

    impl Read for BrokenReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.served {
                Err(io::Error::new(io::ErrorKind::Other, "disk on fire"))
            } else {
                self.served = true;
                buf[..2].copy_from_slice(&[0x12, 0x34]);
                Ok(2)
            }
        }
    }

    #[test]
    fn test_load_rom_never_loads_a_partial_rom() {
        let mut chip8 = machine(&[]);
        let result = chip8.load_rom(&mut BrokenReader { served: false });
        assert!(matches!(result, Err(Chip8Error::RomRead(_))));
        assert_eq!(chip8.state.memory[0x200..0x202], [0x00, 0x00]);
    }

    struct EndlessReader;

    impl Read for EndlessReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            buf.fill(0xAA);
            Ok(buf.len())
        }
    }

    #[test]
    fn test_load_rom_rejects_endless_source() {
        let mut chip8 = machine(&[]);
        assert!(matches!(
            chip8.load_rom(&mut EndlessReader),
            Err(Chip8Error::RomTooLarge { size: 0xE01, max_size: 0xE00 })
        ));
        assert_eq!(chip8.state.memory[0x200], 0x00);
    }

    #[test]
    fn test_load_rom_accepts_largest_rom() {
        let mut chip8 = machine(&[]);
        let rom = vec![0xAA; MAX_ROM_SIZE];
        chip8.load_rom(&mut rom.as_slice()).unwrap();
        assert_eq!(chip8.state.memory[0xFFF], 0xAA);
    }

    #[test]
    fn test_trace_line() {
        let instruction = Instruction::decode(0x6A0F).unwrap();
        assert_eq!(
            trace_line(0x200, 0x6A0F, Some(&instruction)),
            "0200: 6A0F  LD   VA, 0x0F"
        );
        assert_eq!(trace_line(0x204, 0xFFFF, None), "0204: FFFF  ???");
    }

    #[test]
    fn test_traced_unknown_opcode_still_faults() {
        let mut chip8 = machine(&[0xFF, 0xFF]);
        assert!(matches!(
            chip8.step(true),
            Err(Chip8Error::UnknownOpcode { opcode: 0xFFFF })
        ));
        assert_eq!(chip8.state.pc, 0x200);
    }

    #[test]
    fn test_load_rom_reads_everything() {
        let mut chip8 = machine(&[]);
        let mut rom: &[u8] = &[0x60, 0x0A, 0x61, 0x05];
        chip8.load_rom(&mut rom).unwrap();
        assert_eq!(chip8.state.memory[0x200..0x204], [0x60, 0x0A, 0x61, 0x05]);
    }

    #[test]
    fn test_reset_restores_power_on_state() {
        let mut chip8 = machine(&[0x60, 0x0A]);
        chip8.step(false).unwrap();
        chip8.set_key_state(0x1, true);
        chip8.reset();
        assert_eq!(chip8.state.pc, 0x200);
        assert_eq!(chip8.state.v[0x0], 0x0);
        assert_eq!(chip8.state.memory[0x200], 0x0);
        assert!(chip8.state.keys[0x1]);
        assert!(!chip8.rewind());
    }

    #[test]
    fn test_dump_memory_from_program_start() {
        let chip8 = machine(&[0x60, 0x0A]);
        let dump = chip8.dump_memory(0x200);
        assert!(dump.starts_with("00000200  60 0a 00"));
        assert_eq!(dump.lines().count(), 0xE00 / 16);
        assert_eq!(chip8.dump_memory(0x1000), "");
        assert_eq!(chip8.dump_memory(0x2000), "");
    }

    #[test]
    fn test_seeded_machines_agree() {
        let program = [0xC0, 0xFF, 0xC1, 0xFF, 0xC2, 0xFF];
        let mut a = Chip8::with_seed(Quirks::default(), 42);
        let mut b = Chip8::with_seed(Quirks::default(), 42);
        a.load_program(&program).unwrap();
        b.load_program(&program).unwrap();
        for _ in 0..3 {
            a.step(false).unwrap();
            b.step(false).unwrap();
        }
        assert_eq!(a.state.v[..3], b.state.v[..3]);
    }
}
