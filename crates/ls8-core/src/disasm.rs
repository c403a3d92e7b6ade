//! Instruction disassembly.
//!
//! Converts memory contents into human-readable assembly rows. Bytes that do
//! not decode are shown as `.byte` directives and consume one cell.

use crate::decoder::{Decoder, Instruction};
use crate::encoding::operand_count;
use crate::memory::Memory;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A single disassembled instruction row.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DisassemblyRow {
    /// Address of the instruction byte.
    pub addr: u8,
    /// Instruction byte followed by its operand bytes.
    pub bytes: Vec<u8>,
    /// Mnemonic, or `.byte` for undecodable cells.
    pub mnemonic: String,
    /// Formatted operands (e.g. `R0, 8`).
    pub operands: String,
    /// Whether the cell failed to decode.
    pub is_illegal: bool,
}

impl DisassemblyRow {
    /// Renders the operand column and an `; UNKNOWN` marker for illegal rows.
    #[must_use]
    pub fn text(&self) -> String {
        match (self.operands.is_empty(), self.is_illegal) {
            (true, _) => self.mnemonic.clone(),
            (false, false) => format!("{} {}", self.mnemonic, self.operands),
            (false, true) => format!("{} {} ; UNKNOWN", self.mnemonic, self.operands),
        }
    }
}

/// Disassembles the instruction at `addr`.
#[must_use]
pub fn disassemble_one(addr: u8, memory: &Memory) -> DisassemblyRow {
    let Ok(decoded) = Decoder::decode(memory, addr) else {
        let byte = memory.peek(usize::from(addr));
        return DisassemblyRow {
            addr,
            bytes: vec![byte],
            mnemonic: ".byte".to_string(),
            operands: format!("{byte:#04x}"),
            is_illegal: true,
        };
    };

    let mut bytes = vec![decoded.raw];
    bytes.extend_from_slice(&decoded.operands[..usize::from(operand_count(decoded.raw))]);

    let operands = match decoded.instruction {
        Instruction::Hlt | Instruction::Ret => String::new(),
        Instruction::Ldi { rd, value } => format!("R{}, {value}", rd.index()),
        Instruction::Prn { rs } | Instruction::Push { rs } => format!("R{}", rs.index()),
        Instruction::Pop { rd } => format!("R{}", rd.index()),
        Instruction::Call { target }
        | Instruction::Jmp { target }
        | Instruction::Jeq { target }
        | Instruction::Jne { target } => format!("R{}", target.index()),
        Instruction::Alu { ra, rb, .. } => format!("R{}, R{}", ra.index(), rb.index()),
    };

    DisassemblyRow {
        addr,
        bytes,
        mnemonic: decoded.instruction.opcode().mnemonic().to_string(),
        operands,
        is_illegal: false,
    }
}

/// Disassembles up to `count` consecutive instructions starting at `start`.
///
/// Stops early at the end of memory.
#[must_use]
pub fn disassemble(memory: &Memory, start: u8, count: usize) -> Vec<DisassemblyRow> {
    let mut rows = Vec::with_capacity(count);
    let mut addr = usize::from(start);

    while rows.len() < count {
        let Ok(at) = u8::try_from(addr) else {
            break;
        };
        let row = disassemble_one(at, memory);
        addr += row.bytes.len();
        rows.push(row);
    }

    rows
}
