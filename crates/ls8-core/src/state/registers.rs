use crate::memory::STACK_BASE;
use crate::Fault;

/// Number of architecturally visible general-purpose registers (`R0..R7`).
pub const GENERAL_REGISTER_COUNT: usize = 8;
/// `FLAGS` bit set when the last `CMP` found its operands equal.
pub const FLAG_E: u8 = 1 << 0;
/// `FLAGS` bit set when the last `CMP` found `A < B`.
pub const FLAG_L: u8 = 1 << 1;
/// `FLAGS` bit set when the last `CMP` found `A > B`.
pub const FLAG_G: u8 = 1 << 2;
/// Mask of the comparison bits.
pub const FLAGS_ACTIVE_MASK: u8 = FLAG_E | FLAG_L | FLAG_G;
/// Register that stores the stack pointer.
pub const SP_REGISTER: GeneralRegister = GeneralRegister::R7;

/// Architecturally visible general-purpose register identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
#[allow(missing_docs)]
pub enum GeneralRegister {
    R0 = 0,
    R1 = 1,
    R2 = 2,
    R3 = 3,
    R4 = 4,
    R5 = 5,
    R6 = 6,
    R7 = 7,
}

impl GeneralRegister {
    /// Ordered list of all architectural general-purpose registers.
    pub const ALL: [Self; GENERAL_REGISTER_COUNT] = [
        Self::R0,
        Self::R1,
        Self::R2,
        Self::R3,
        Self::R4,
        Self::R5,
        Self::R6,
        Self::R7,
    ];

    /// Returns the array index for this register (`0..=7`).
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Resolves an instruction operand byte naming a register.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::OutOfBoundsAccess`] for operands `>= 8`.
    pub const fn from_operand(operand: u8) -> Result<Self, Fault> {
        match operand {
            0 => Ok(Self::R0),
            1 => Ok(Self::R1),
            2 => Ok(Self::R2),
            3 => Ok(Self::R3),
            4 => Ok(Self::R4),
            5 => Ok(Self::R5),
            6 => Ok(Self::R6),
            7 => Ok(Self::R7),
            other => Err(Fault::register(other as usize)),
        }
    }
}

/// Register file, program counter and comparison flags of one machine.
///
/// The stack pointer has no storage of its own: it lives in [`SP_REGISTER`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ArchitecturalState {
    gpr: [u8; GENERAL_REGISTER_COUNT],
    pc: u8,
    flags: u8,
}

impl Default for ArchitecturalState {
    fn default() -> Self {
        let mut gpr = [0; GENERAL_REGISTER_COUNT];
        gpr[SP_REGISTER.index()] = STACK_BASE;
        Self {
            gpr,
            pc: 0,
            flags: 0,
        }
    }
}

impl ArchitecturalState {
    /// Reads a general-purpose register.
    #[must_use]
    pub const fn gpr(&self, reg: GeneralRegister) -> u8 {
        self.gpr[reg.index()]
    }

    /// Writes a general-purpose register.
    pub const fn set_gpr(&mut self, reg: GeneralRegister, value: u8) {
        self.gpr[reg.index()] = value;
    }

    /// Copy of the whole register file, `R0` first.
    #[must_use]
    pub const fn registers(&self) -> [u8; GENERAL_REGISTER_COUNT] {
        self.gpr
    }

    /// Reads the `PC` register.
    #[must_use]
    pub const fn pc(&self) -> u8 {
        self.pc
    }

    /// Writes the `PC` register.
    pub const fn set_pc(&mut self, value: u8) {
        self.pc = value;
    }

    /// Reads the stack pointer from [`SP_REGISTER`].
    #[must_use]
    pub const fn sp(&self) -> u8 {
        self.gpr(SP_REGISTER)
    }

    /// Writes the stack pointer into [`SP_REGISTER`].
    pub const fn set_sp(&mut self, value: u8) {
        self.set_gpr(SP_REGISTER, value);
    }

    /// Reads the `FLAGS` register.
    #[must_use]
    pub const fn flags(&self) -> u8 {
        self.flags
    }

    /// Overwrites `FLAGS`, keeping only the comparison bits.
    pub const fn set_flags(&mut self, value: u8) {
        self.flags = value & FLAGS_ACTIVE_MASK;
    }

    /// Returns `true` when a specific `FLAGS` bit is set.
    #[must_use]
    pub const fn flag_is_set(&self, flag: u8) -> bool {
        (self.flags & flag) != 0
    }
}
