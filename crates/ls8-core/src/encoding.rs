//! Opcode assignments and instruction-byte field layout.
//!
//! Instruction bytes are self-describing: bits 7..6 hold the operand count,
//! bit 5 marks ALU operations and bit 4 marks instructions that set `PC`
//! themselves.

/// Bit marking ALU operations.
pub const ALU_BIT: u8 = 1 << 5;
/// Bit marking instructions that write `PC` themselves.
pub const SETS_PC_BIT: u8 = 1 << 4;

/// Every assigned instruction byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
#[allow(missing_docs)]
pub enum Opcode {
    Hlt = 0b0000_0001,
    Ldi = 0b1000_0010,
    Prn = 0b0100_0111,
    Push = 0b0100_0101,
    Pop = 0b0100_0110,
    Call = 0b0101_0000,
    Ret = 0b0001_0001,
    Jmp = 0b0101_0100,
    Jeq = 0b0101_0101,
    Jne = 0b0101_0110,
    Add = 0b1010_0000,
    Mul = 0b1010_0010,
    Cmp = 0b1010_0111,
    And = 0b1010_1000,
    Or = 0b1010_1010,
    Xor = 0b1010_1011,
}

/// Single source-of-truth opcode table.
///
/// Any byte not present here is illegal by definition.
pub const OPCODE_TABLE: &[(Opcode, &str)] = &[
    (Opcode::Hlt, "HLT"),
    (Opcode::Ldi, "LDI"),
    (Opcode::Prn, "PRN"),
    (Opcode::Push, "PUSH"),
    (Opcode::Pop, "POP"),
    (Opcode::Call, "CALL"),
    (Opcode::Ret, "RET"),
    (Opcode::Jmp, "JMP"),
    (Opcode::Jeq, "JEQ"),
    (Opcode::Jne, "JNE"),
    (Opcode::Add, "ADD"),
    (Opcode::Mul, "MUL"),
    (Opcode::Cmp, "CMP"),
    (Opcode::And, "AND"),
    (Opcode::Or, "OR"),
    (Opcode::Xor, "XOR"),
];

impl Opcode {
    /// Raw instruction byte.
    #[must_use]
    pub const fn byte(self) -> u8 {
        self as u8
    }

    /// Looks up an instruction byte in [`OPCODE_TABLE`].
    #[must_use]
    pub fn from_byte(byte: u8) -> Option<Self> {
        OPCODE_TABLE
            .iter()
            .find_map(|(opcode, _)| (opcode.byte() == byte).then_some(*opcode))
    }

    /// Resolves an upper-case assembly mnemonic.
    #[must_use]
    pub fn by_mnemonic(mnemonic: &str) -> Option<Self> {
        OPCODE_TABLE
            .iter()
            .find_map(|(opcode, name)| name.eq_ignore_ascii_case(mnemonic).then_some(*opcode))
    }

    /// Upper-case assembly mnemonic.
    #[must_use]
    pub fn mnemonic(self) -> &'static str {
        OPCODE_TABLE
            .iter()
            .find_map(|(opcode, name)| (*opcode == self).then_some(*name))
            .unwrap_or("???")
    }

    /// Number of operand bytes following the instruction byte.
    #[must_use]
    pub const fn operand_count(self) -> u8 {
        operand_count(self.byte())
    }
}

/// Operand count encoded in bits 7..6 of an instruction byte.
#[must_use]
pub const fn operand_count(byte: u8) -> u8 {
    byte >> 6
}

/// `true` when the instruction byte routes to the ALU.
#[must_use]
pub const fn is_alu(byte: u8) -> bool {
    byte & ALU_BIT != 0
}

/// `true` when the instruction sets `PC` itself instead of falling through.
#[must_use]
pub const fn sets_pc(byte: u8) -> bool {
    byte & SETS_PC_BIT != 0
}
