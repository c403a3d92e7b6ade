//! Public host-facing API contracts for embedding the machine.

use thiserror::Error;

use crate::memory::Memory;
use crate::{ArchitecturalState, Fault, RunState, GENERAL_REGISTER_COUNT};

/// Run-loop configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct MachineConfig {
    /// Maximum number of instructions a single run may retire; `None` runs
    /// until `HLT` or a fault.
    pub step_budget: Option<u64>,
}

impl MachineConfig {
    /// Configuration that stops a run after `steps` retired instructions.
    #[must_use]
    pub const fn with_step_budget(steps: u64) -> Self {
        Self {
            step_budget: Some(steps),
        }
    }
}

/// Complete machine state: register file, memory and run state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Machine {
    /// Register file, `PC`, `SP` and `FLAGS`.
    pub arch: ArchitecturalState,
    /// Main memory.
    pub memory: Memory,
    /// Current execution state.
    pub run_state: RunState,
}

impl Machine {
    /// Creates a powered-on machine with `program` copied in from address 0.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::OutOfBoundsAccess`] when the program does not fit in
    /// memory.
    pub fn load_program(program: &[u8]) -> Result<Self, Fault> {
        Ok(Self {
            memory: Memory::with_image(program)?,
            ..Self::default()
        })
    }

    /// Reads a memory cell.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::OutOfBoundsAccess`] for addresses past the end of
    /// memory.
    pub fn ram_read(&self, addr: usize) -> Result<u8, Fault> {
        self.memory.read(addr)
    }

    /// Writes a memory cell.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::OutOfBoundsAccess`] for addresses past the end of
    /// memory.
    pub fn ram_write(&mut self, addr: usize, value: u8) -> Result<(), Fault> {
        self.memory.write(addr, value)
    }

    /// `true` until `HLT` retires or a fault is latched.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.run_state.is_running()
    }

    /// Restores power-on registers, flags and run state.
    ///
    /// Memory is preserved so the loaded program can run again.
    pub fn reset(&mut self) {
        self.arch = ArchitecturalState::default();
        self.run_state = RunState::Running;
    }
}

/// Failure reported by an [`OutputSink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum OutputError {
    /// The sink could not accept the value.
    #[error("output sink write failed")]
    WriteFailed,
}

/// Destination for values printed by `PRN`.
pub trait OutputSink {
    /// Receives one printed register value.
    ///
    /// # Errors
    ///
    /// Returns [`OutputError::WriteFailed`] when the value cannot be
    /// delivered; the machine latches [`Fault::OutputFailed`].
    fn emit(&mut self, value: u8) -> Result<(), OutputError>;
}

/// Sink that collects printed values in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VecOutput {
    values: Vec<u8>,
}

impl VecOutput {
    /// Creates an empty sink.
    #[must_use]
    pub const fn new() -> Self {
        Self { values: Vec::new() }
    }

    /// Values printed so far, in execution order.
    #[must_use]
    pub fn values(&self) -> &[u8] {
        &self.values
    }

    /// Drains the collected values.
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.values)
    }
}

impl OutputSink for VecOutput {
    fn emit(&mut self, value: u8) -> Result<(), OutputError> {
        self.values.push(value);
        Ok(())
    }
}

/// Result of one step attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum StepOutcome {
    /// An instruction other than `HLT` retired.
    Retired {
        /// Address of the retired instruction.
        pc: u8,
        /// Raw instruction byte.
        opcode: u8,
    },
    /// The machine is halted; returned for the `HLT` itself and for every
    /// later step.
    Halted,
    /// Decode or execute raised a fault, or one is already latched.
    Fault {
        /// The latched fault.
        cause: Fault,
    },
}

/// Reason a run returned without a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum RunBoundary {
    /// `HLT` retired.
    Halted,
    /// The configured step budget was used up; the machine can be resumed.
    StepBudget,
}

/// Aggregated outcome of a successful run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RunOutcome {
    /// Number of instructions retired by this run, `HLT` included.
    pub steps: u64,
    /// Why the run stopped.
    pub boundary: RunBoundary,
}

/// Execution events emitted in order to a [`TraceSink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraceEvent {
    /// About to decode the instruction at `pc`.
    InstructionStart {
        /// Program counter used for this fetch.
        pc: u8,
        /// Byte at `pc`.
        ir: u8,
        /// Byte at `pc + 1`, or 0 past the end of memory.
        operand_a: u8,
        /// Byte at `pc + 2`, or 0 past the end of memory.
        operand_b: u8,
        /// Register file before execution.
        registers: [u8; GENERAL_REGISTER_COUNT],
    },
    /// `PRN` delivered a value to the output sink.
    Output {
        /// Printed value.
        value: u8,
    },
    /// `HLT` retired.
    Halted {
        /// Address of the `HLT`.
        pc: u8,
    },
    /// A fault was raised.
    FaultRaised {
        /// Raised fault.
        cause: Fault,
        /// Program counter when the fault was observed.
        pc: u8,
    },
}

/// Sink trait for execution trace hooks.
pub trait TraceSink {
    /// Records an event in execution order.
    fn on_event(&mut self, event: TraceEvent);
}

/// Trace sink that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTrace;

impl TraceSink for NoTrace {
    fn on_event(&mut self, _event: TraceEvent) {}
}

impl TraceSink for Vec<TraceEvent> {
    fn on_event(&mut self, event: TraceEvent) {
        self.push(event);
    }
}
