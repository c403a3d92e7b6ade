//! Architectural CPU state model primitives.

/// Architectural register file types and storage model.
pub mod registers;
/// Execution-state machine for the run loop.
pub mod run_state;

pub use registers::{
    ArchitecturalState, GeneralRegister, FLAGS_ACTIVE_MASK, FLAG_E, FLAG_G, FLAG_L,
    GENERAL_REGISTER_COUNT, SP_REGISTER,
};
pub use run_state::RunState;
