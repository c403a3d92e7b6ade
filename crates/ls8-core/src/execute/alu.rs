//! Register-to-register arithmetic, bitwise and comparison operations.

use std::cmp::Ordering;

use crate::encoding::Opcode;
use crate::state::{ArchitecturalState, GeneralRegister, FLAG_E, FLAG_G, FLAG_L};

/// Operations implemented by the ALU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[allow(missing_docs)]
pub enum AluOp {
    Add,
    Mul,
    Cmp,
    And,
    Or,
    Xor,
}

impl AluOp {
    /// Opcode that selects this operation.
    #[must_use]
    pub const fn opcode(self) -> Opcode {
        match self {
            Self::Add => Opcode::Add,
            Self::Mul => Opcode::Mul,
            Self::Cmp => Opcode::Cmp,
            Self::And => Opcode::And,
            Self::Or => Opcode::Or,
            Self::Xor => Opcode::Xor,
        }
    }
}

/// Applies `op` to `ra` and `rb`.
///
/// Results are written to `ra` modulo 256. `CMP` leaves the registers alone
/// and replaces `FLAGS` with exactly one of `G`, `L` or `E`.
pub fn execute_alu(
    arch: &mut ArchitecturalState,
    op: AluOp,
    ra: GeneralRegister,
    rb: GeneralRegister,
) {
    let a = arch.gpr(ra);
    let b = arch.gpr(rb);

    let result = match op {
        AluOp::Add => a.wrapping_add(b),
        AluOp::Mul => a.wrapping_mul(b),
        AluOp::And => a & b,
        AluOp::Or => a | b,
        AluOp::Xor => a ^ b,
        AluOp::Cmp => {
            arch.set_flags(compare_flags(a, b));
            return;
        }
    };

    arch.set_gpr(ra, result);
}

fn compare_flags(a: u8, b: u8) -> u8 {
    match a.cmp(&b) {
        Ordering::Greater => FLAG_G,
        Ordering::Less => FLAG_L,
        Ordering::Equal => FLAG_E,
    }
}
