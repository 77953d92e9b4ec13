/// # Quirks
/// Behaviours that differ between historical Chip-8 interpreters.
///
/// Resolved once when a `Chip8` is built and never changed while it runs.
/// `Quirks::default()` is the original COSMAC VIP interpreter, which is what most
/// Chip-8 programs were written against. `Quirks::modern()` is the CHIP-48/SCHIP
/// lineage that a lot of later programs assume.
///
/// | quirk                        | vip   | modern |
/// |------------------------------|-------|--------|
/// | `shift_uses_vy`              | true  | false  |
/// | `logic_ops_reset_vf`         | true  | false  |
/// | `add_to_i_overflow_sets_vf`  | false | false  |
/// | `load_store_increments_i`    | true  | false  |
/// | `jump_with_offset_uses_vx`   | false | true   |
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Quirks {
    /// `8XY6`/`8XYE` shift VY into VX. Otherwise VX is shifted in place.
    pub shift_uses_vy: bool,
    /// `8XY1`/`8XY2`/`8XY3` clear VF after the operation. Otherwise VF is left alone.
    pub logic_ops_reset_vf: bool,
    /// `FX1E` sets VF to 1 when I leaves the 12-bit address space, 0 otherwise.
    /// Otherwise VF is left alone.
    pub add_to_i_overflow_sets_vf: bool,
    /// `FX55`/`FX65` leave I pointing one past the last byte they touched.
    /// Otherwise I is unchanged.
    pub load_store_increments_i: bool,
    /// `BNNN` is read as `BXNN` and jumps to `NNN + VX`. Otherwise it jumps to `NNN + V0`.
    pub jump_with_offset_uses_vx: bool,
}

impl Quirks {
    /// COSMAC VIP behaviour
    pub const fn vip() -> Self {
        Quirks {
            shift_uses_vy: true,
            logic_ops_reset_vf: true,
            add_to_i_overflow_sets_vf: false,
            load_store_increments_i: true,
            jump_with_offset_uses_vx: false,
        }
    }

    /// CHIP-48/SCHIP behaviour
    pub const fn modern() -> Self {
        Quirks {
            shift_uses_vy: false,
            logic_ops_reset_vf: false,
            add_to_i_overflow_sets_vf: false,
            load_store_increments_i: false,
            jump_with_offset_uses_vx: true,
        }
    }
}

impl Default for Quirks {
    fn default() -> Self {
        Self::vip()
    }
}
