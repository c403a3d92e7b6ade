//! Core engine for the LS-8 8-bit virtual machine.
//!
//! The machine has 256 bytes of memory, eight general-purpose registers
//! (`R7` doubles as the stack pointer), a program counter and a three-bit
//! comparison flags register. Programs are executed one instruction at a
//! time by [`step_one`] or to completion by [`run_until_halt`].

/// Fault taxonomy raised by decode and execute.
pub mod fault;
pub use fault::{AccessSpace, Fault, FaultClass};

/// Flat 256-byte memory.
pub mod memory;
pub use memory::{Memory, MEMORY_BYTES, STACK_BASE};

/// Architectural CPU state model primitives.
pub mod state;
pub use state::{
    ArchitecturalState, GeneralRegister, RunState, FLAGS_ACTIVE_MASK, FLAG_E, FLAG_G, FLAG_L,
    GENERAL_REGISTER_COUNT, SP_REGISTER,
};

/// Opcode table and instruction byte classification.
pub mod encoding;
pub use encoding::{is_alu, operand_count, sets_pc, Opcode, ALU_BIT, OPCODE_TABLE, SETS_PC_BIT};

/// Instruction decode with operand fetch and validation.
pub mod decoder;
pub use decoder::{DecodedInstruction, Decoder, Instruction};

/// Instruction execution pipeline.
pub mod execute;
pub use execute::{
    execute_alu, execute_instruction, run_until_halt, run_until_halt_traced, step_one,
    step_one_traced, AluOp, Flow,
};

/// Public host-facing API contract and integration types.
pub mod api;
pub use api::{
    Machine, MachineConfig, NoTrace, OutputError, OutputSink, RunBoundary, RunOutcome,
    StepOutcome, TraceEvent, TraceSink, VecOutput,
};

/// Memory disassembly for listings and debuggers.
pub mod disasm;
pub use disasm::{disassemble, disassemble_one, DisassemblyRow};

#[cfg(test)]
use proptest as _;
