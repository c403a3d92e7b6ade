//! Instruction decoder.
//!
//! Decoding reads the instruction byte at `PC`, classifies it, fetches the
//! operand bytes it declares and resolves register operands. All validation
//! happens here so execution never faults halfway through an instruction.

use crate::encoding::{is_alu, operand_count, Opcode};
use crate::execute::AluOp;
use crate::memory::Memory;
use crate::{Fault, GeneralRegister};

/// Closed set of executable instructions with resolved operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Instruction {
    /// Stop the machine.
    Hlt,
    /// Load an immediate into a register.
    Ldi {
        /// Destination register.
        rd: GeneralRegister,
        /// Immediate byte.
        value: u8,
    },
    /// Emit a register to the output sink.
    Prn {
        /// Register to print.
        rs: GeneralRegister,
    },
    /// Push a register onto the stack.
    Push {
        /// Register to push.
        rs: GeneralRegister,
    },
    /// Pop the top of the stack into a register.
    Pop {
        /// Destination register.
        rd: GeneralRegister,
    },
    /// Push the return address and jump to the address held in a register.
    Call {
        /// Register holding the subroutine address.
        target: GeneralRegister,
    },
    /// Pop the return address into `PC`.
    Ret,
    /// Jump to the address held in a register.
    Jmp {
        /// Register holding the jump address.
        target: GeneralRegister,
    },
    /// Jump when the equal flag is set.
    Jeq {
        /// Register holding the jump address.
        target: GeneralRegister,
    },
    /// Jump when the equal flag is clear.
    Jne {
        /// Register holding the jump address.
        target: GeneralRegister,
    },
    /// Register-to-register ALU operation writing `ra` (or `FLAGS` for `CMP`).
    Alu {
        /// Operation selected by the instruction byte.
        op: AluOp,
        /// First operand and destination.
        ra: GeneralRegister,
        /// Second operand.
        rb: GeneralRegister,
    },
}

impl Instruction {
    /// Table opcode this instruction was decoded from.
    #[must_use]
    pub const fn opcode(self) -> Opcode {
        match self {
            Self::Hlt => Opcode::Hlt,
            Self::Ldi { .. } => Opcode::Ldi,
            Self::Prn { .. } => Opcode::Prn,
            Self::Push { .. } => Opcode::Push,
            Self::Pop { .. } => Opcode::Pop,
            Self::Call { .. } => Opcode::Call,
            Self::Ret => Opcode::Ret,
            Self::Jmp { .. } => Opcode::Jmp,
            Self::Jeq { .. } => Opcode::Jeq,
            Self::Jne { .. } => Opcode::Jne,
            Self::Alu { op, .. } => op.opcode(),
        }
    }

    /// `false` for instructions that can retire without continuing at the
    /// next address. Conditional jumps check the fall-through when not taken.
    const fn uses_fallthrough(self) -> bool {
        !matches!(
            self,
            Self::Hlt | Self::Ret | Self::Jmp { .. } | Self::Jeq { .. } | Self::Jne { .. }
        )
    }
}

/// Decoded instruction with its location and fall-through address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedInstruction {
    /// Address of the instruction byte.
    pub addr: u8,
    /// Raw instruction byte.
    pub raw: u8,
    /// Raw operand bytes; unused slots are zero.
    pub operands: [u8; 2],
    /// Instruction with resolved operands.
    pub instruction: Instruction,
    /// Address of the next instruction in memory, when it exists.
    pub fallthrough: Option<u8>,
}

impl DecodedInstruction {
    /// Number of bytes occupied by this instruction.
    #[must_use]
    pub const fn len(&self) -> usize {
        1 + operand_count(self.raw) as usize
    }

    /// Always `false`; an instruction occupies at least its opcode byte.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }
}

/// Stateless instruction decoder.
pub struct Decoder;

impl Decoder {
    /// Decodes the instruction at `pc`.
    ///
    /// # Errors
    ///
    /// - [`Fault::UnsupportedAluOperation`] for ALU-bit bytes with no ALU op.
    /// - [`Fault::UnknownOpcode`] for bytes absent from the opcode table.
    /// - [`Fault::OutOfBoundsAccess`] when an operand lies past the end of
    ///   memory, a register operand is `>= 8`, or the instruction falls
    ///   through past the last memory cell.
    pub fn decode(memory: &Memory, pc: u8) -> Result<DecodedInstruction, Fault> {
        let raw = memory.read(usize::from(pc))?;

        let Some(opcode) = Opcode::from_byte(raw) else {
            return Err(if is_alu(raw) {
                Fault::UnsupportedAluOperation {
                    addr: pc,
                    opcode: raw,
                }
            } else {
                Fault::UnknownOpcode {
                    addr: pc,
                    opcode: raw,
                }
            });
        };

        let count = usize::from(operand_count(raw));
        let mut operands = [0_u8; 2];
        for (offset, slot) in operands.iter_mut().enumerate().take(count) {
            *slot = memory.read(usize::from(pc) + 1 + offset)?;
        }
        let [a, b] = operands;

        let reg = GeneralRegister::from_operand;
        let alu = |op: AluOp| -> Result<Instruction, Fault> {
            Ok(Instruction::Alu {
                op,
                ra: reg(a)?,
                rb: reg(b)?,
            })
        };

        let instruction = match opcode {
            Opcode::Hlt => Instruction::Hlt,
            Opcode::Ldi => Instruction::Ldi {
                rd: reg(a)?,
                value: b,
            },
            Opcode::Prn => Instruction::Prn { rs: reg(a)? },
            Opcode::Push => Instruction::Push { rs: reg(a)? },
            Opcode::Pop => Instruction::Pop { rd: reg(a)? },
            Opcode::Call => Instruction::Call { target: reg(a)? },
            Opcode::Ret => Instruction::Ret,
            Opcode::Jmp => Instruction::Jmp { target: reg(a)? },
            Opcode::Jeq => Instruction::Jeq { target: reg(a)? },
            Opcode::Jne => Instruction::Jne { target: reg(a)? },
            Opcode::Add => alu(AluOp::Add)?,
            Opcode::Mul => alu(AluOp::Mul)?,
            Opcode::Cmp => alu(AluOp::Cmp)?,
            Opcode::And => alu(AluOp::And)?,
            Opcode::Or => alu(AluOp::Or)?,
            Opcode::Xor => alu(AluOp::Xor)?,
        };

        let next = usize::from(pc) + 1 + count;
        let fallthrough = u8::try_from(next).ok();
        if fallthrough.is_none() && instruction.uses_fallthrough() {
            return Err(Fault::memory(next));
        }

        Ok(DecodedInstruction {
            addr: pc,
            raw,
            operands,
            instruction,
            fallthrough,
        })
    }
}
