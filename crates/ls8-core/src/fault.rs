use thiserror::Error;

/// Fault classes used by hosts to pick a reporting or recovery policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum FaultClass {
    /// Decoder found no handler for an instruction byte.
    Decode,
    /// ALU was handed an opcode it does not implement.
    Alu,
    /// Memory or register-file index outside the backing store.
    Memory,
    /// Output sink rejected a printed value.
    Output,
}

/// Address space named by an [`Fault::OutOfBoundsAccess`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum AccessSpace {
    /// The 256-cell main memory.
    Memory,
    /// The eight-entry general-purpose register file.
    Register,
}

impl AccessSpace {
    /// Lower-case name used in fault messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Register => "register",
        }
    }
}

/// Stable fault taxonomy raised by decode and execute.
///
/// Every fault is fatal to the current run and latched by the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Fault {
    /// Instruction byte is neither an ALU operation nor a registered opcode.
    #[error("unknown opcode {opcode:#010b} at address {addr:#04x}")]
    UnknownOpcode {
        /// Address the byte was fetched from.
        addr: u8,
        /// Offending instruction byte.
        opcode: u8,
    },
    /// Instruction byte has the ALU bit set but names no ALU operation.
    #[error("unsupported ALU operation {opcode:#010b} at address {addr:#04x}")]
    UnsupportedAluOperation {
        /// Address the byte was fetched from.
        addr: u8,
        /// Offending instruction byte.
        opcode: u8,
    },
    /// Index outside the memory array or register file.
    #[error("{} index {index} out of bounds", .space.name())]
    OutOfBoundsAccess {
        /// Which backing store was indexed.
        space: AccessSpace,
        /// Offending index.
        index: usize,
    },
    /// Output sink refused the value printed by `PRN`.
    #[error("output sink rejected value printed at address {addr:#04x}")]
    OutputFailed {
        /// Address of the `PRN` instruction.
        addr: u8,
    },
}

impl Fault {
    /// Stable numeric code for hosts that store faults as bytes.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::UnknownOpcode { .. } => 0x01,
            Self::UnsupportedAluOperation { .. } => 0x02,
            Self::OutOfBoundsAccess { .. } => 0x03,
            Self::OutputFailed { .. } => 0x04,
        }
    }

    /// Returns the fault class for this fault.
    #[must_use]
    pub const fn class(self) -> FaultClass {
        match self {
            Self::UnknownOpcode { .. } => FaultClass::Decode,
            Self::UnsupportedAluOperation { .. } => FaultClass::Alu,
            Self::OutOfBoundsAccess { .. } => FaultClass::Memory,
            Self::OutputFailed { .. } => FaultClass::Output,
        }
    }

    pub(crate) const fn memory(index: usize) -> Self {
        Self::OutOfBoundsAccess {
            space: AccessSpace::Memory,
            index,
        }
    }

    pub(crate) const fn register(index: usize) -> Self {
        Self::OutOfBoundsAccess {
            space: AccessSpace::Register,
            index,
        }
    }
}
