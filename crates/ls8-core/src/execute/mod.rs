//! Fetch-decode-execute loop.
//!
//! Each step runs three phases:
//! 1. Fetch and decode at `PC`; almost every fault is raised here. The rest
//!    are raised by execute before it changes any state.
//! 2. Execute the decoded instruction against registers, memory and the
//!    output sink.
//! 3. Advance `PC` to the fall-through address unless the instruction jumped.
//!
//! A raised fault is latched in [`RunState::FaultLatched`] and returned by
//! every later step.

mod alu;

pub use alu::{execute_alu, AluOp};

use crate::api::{
    Machine, MachineConfig, NoTrace, OutputSink, RunBoundary, RunOutcome, StepOutcome, TraceEvent,
    TraceSink,
};
use crate::decoder::{DecodedInstruction, Decoder, Instruction};
use crate::state::FLAG_E;
use crate::{Fault, RunState};

/// Control-flow effect of one executed instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Continue at the fall-through address.
    Next,
    /// Continue at the given address.
    Jump(u8),
    /// Stop the machine after advancing past `HLT`.
    Halt,
}

/// Executes one decoded instruction.
///
/// Failing instructions have no side effects.
///
/// # Errors
///
/// - [`Fault::OutputFailed`] when `output` rejects a printed value.
/// - [`Fault::OutOfBoundsAccess`] when a `JEQ`/`JNE` in the last two cells
///   is not taken and so would fall through past the end of memory.
pub fn execute_instruction(
    decoded: &DecodedInstruction,
    machine: &mut Machine,
    output: &mut dyn OutputSink,
    trace: &mut dyn TraceSink,
) -> Result<Flow, Fault> {
    let arch = &mut machine.arch;

    let flow = match decoded.instruction {
        Instruction::Hlt => Flow::Halt,
        Instruction::Ldi { rd, value } => {
            arch.set_gpr(rd, value);
            Flow::Next
        }
        Instruction::Prn { rs } => {
            let value = arch.gpr(rs);
            output
                .emit(value)
                .map_err(|_| Fault::OutputFailed { addr: decoded.addr })?;
            trace.on_event(TraceEvent::Output { value });
            Flow::Next
        }
        Instruction::Push { rs } => {
            let value = arch.gpr(rs);
            let sp = arch.sp().wrapping_sub(1);
            arch.set_sp(sp);
            machine.memory.write(usize::from(sp), value)?;
            Flow::Next
        }
        Instruction::Pop { rd } => {
            let sp = arch.sp();
            let value = machine.memory.read(usize::from(sp))?;
            arch.set_sp(sp.wrapping_add(1));
            arch.set_gpr(rd, value);
            Flow::Next
        }
        Instruction::Call { target } => {
            let dest = arch.gpr(target);
            let return_addr = decoded
                .fallthrough
                .ok_or_else(|| Fault::memory(usize::from(decoded.addr) + decoded.len()))?;
            let sp = arch.sp().wrapping_sub(1);
            arch.set_sp(sp);
            machine.memory.write(usize::from(sp), return_addr)?;
            Flow::Jump(dest)
        }
        Instruction::Ret => {
            let sp = arch.sp();
            let return_addr = machine.memory.read(usize::from(sp))?;
            arch.set_sp(sp.wrapping_add(1));
            Flow::Jump(return_addr)
        }
        Instruction::Jmp { target } => Flow::Jump(arch.gpr(target)),
        Instruction::Jeq { target } => {
            branch(decoded, arch.flag_is_set(FLAG_E), arch.gpr(target))?
        }
        Instruction::Jne { target } => {
            branch(decoded, !arch.flag_is_set(FLAG_E), arch.gpr(target))?
        }
        Instruction::Alu { op, ra, rb } => {
            execute_alu(arch, op, ra, rb);
            Flow::Next
        }
    };

    Ok(flow)
}

/// A branch that is not taken continues at the fall-through address, which
/// must exist.
fn branch(decoded: &DecodedInstruction, taken: bool, target: u8) -> Result<Flow, Fault> {
    if taken {
        Ok(Flow::Jump(target))
    } else if decoded.fallthrough.is_some() {
        Ok(Flow::Next)
    } else {
        Err(Fault::memory(usize::from(decoded.addr) + decoded.len()))
    }
}

/// Executes one instruction, writing `PRN` output to `output`.
pub fn step_one(machine: &mut Machine, output: &mut dyn OutputSink) -> StepOutcome {
    step_one_traced(machine, output, &mut NoTrace)
}

/// Executes one instruction and reports execution events to `trace`.
///
/// Stepping a halted machine returns [`StepOutcome::Halted`] and stepping a
/// fault-latched machine returns the latched fault; neither executes anything.
pub fn step_one_traced(
    machine: &mut Machine,
    output: &mut dyn OutputSink,
    trace: &mut dyn TraceSink,
) -> StepOutcome {
    match machine.run_state {
        RunState::FaultLatched(cause) => return StepOutcome::Fault { cause },
        RunState::Halted => return StepOutcome::Halted,
        RunState::Running => {}
    }

    let pc = machine.arch.pc();
    let at = |offset: usize| machine.memory.peek(usize::from(pc) + offset);
    trace.on_event(TraceEvent::InstructionStart {
        pc,
        ir: at(0),
        operand_a: at(1),
        operand_b: at(2),
        registers: machine.arch.registers(),
    });

    let result = Decoder::decode(&machine.memory, pc).and_then(|decoded| {
        execute_instruction(&decoded, machine, output, trace).map(|flow| (decoded, flow))
    });

    match result {
        Ok((decoded, flow)) => {
            let next_pc = match flow {
                Flow::Jump(target) => Some(target),
                Flow::Next | Flow::Halt => decoded.fallthrough,
            };
            if let Some(next_pc) = next_pc {
                machine.arch.set_pc(next_pc);
            }

            if flow == Flow::Halt {
                machine.run_state = RunState::Halted;
                trace.on_event(TraceEvent::Halted { pc });
                StepOutcome::Halted
            } else {
                StepOutcome::Retired {
                    pc,
                    opcode: decoded.raw,
                }
            }
        }
        Err(cause) => {
            machine.run_state = RunState::FaultLatched(cause);
            trace.on_event(TraceEvent::FaultRaised { cause, pc });
            StepOutcome::Fault { cause }
        }
    }
}

/// Steps until `HLT`, a fault, or the configured step budget.
///
/// # Errors
///
/// Returns the fault that stopped execution; it is also latched in
/// `machine.run_state`.
pub fn run_until_halt(
    machine: &mut Machine,
    output: &mut dyn OutputSink,
    config: &MachineConfig,
) -> Result<RunOutcome, Fault> {
    run_until_halt_traced(machine, output, &mut NoTrace, config)
}

/// [`run_until_halt`] with execution events reported to `trace`.
///
/// # Errors
///
/// Returns the fault that stopped execution; it is also latched in
/// `machine.run_state`.
pub fn run_until_halt_traced(
    machine: &mut Machine,
    output: &mut dyn OutputSink,
    trace: &mut dyn TraceSink,
    config: &MachineConfig,
) -> Result<RunOutcome, Fault> {
    if machine.run_state == RunState::Halted {
        return Ok(RunOutcome {
            steps: 0,
            boundary: RunBoundary::Halted,
        });
    }

    let mut steps = 0_u64;
    loop {
        if config.step_budget.is_some_and(|budget| steps >= budget) {
            return Ok(RunOutcome {
                steps,
                boundary: RunBoundary::StepBudget,
            });
        }

        match step_one_traced(machine, output, trace) {
            StepOutcome::Retired { .. } => steps += 1,
            StepOutcome::Halted => {
                return Ok(RunOutcome {
                    steps: steps + 1,
                    boundary: RunBoundary::Halted,
                });
            }
            StepOutcome::Fault { cause } => return Err(cause),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{OutputError, VecOutput};
    use crate::{GeneralRegister, Opcode, FLAG_G, FLAG_L};

    const HLT: u8 = Opcode::Hlt.byte();
    const LDI: u8 = Opcode::Ldi.byte();
    const PRN: u8 = Opcode::Prn.byte();
    const PUSH: u8 = Opcode::Push.byte();
    const POP: u8 = Opcode::Pop.byte();

    fn machine(program: &[u8]) -> Machine {
        Machine::load_program(program).expect("test program fits")
    }

    struct RejectingOutput;

    impl OutputSink for RejectingOutput {
        fn emit(&mut self, _value: u8) -> Result<(), OutputError> {
            Err(OutputError::WriteFailed)
        }
    }

    #[test]
    fn ldi_advances_past_both_operands() {
        let mut m = machine(&[LDI, 2, 77, HLT]);
        let mut out = VecOutput::new();

        let outcome = step_one(&mut m, &mut out);

        assert_eq!(outcome, StepOutcome::Retired { pc: 0, opcode: LDI });
        assert_eq!(m.arch.gpr(GeneralRegister::R2), 77);
        assert_eq!(m.arch.pc(), 3);
    }

    #[test]
    fn hlt_stops_and_later_steps_are_no_ops() {
        let mut m = machine(&[HLT, LDI, 0, 5]);
        let mut out = VecOutput::new();

        assert_eq!(step_one(&mut m, &mut out), StepOutcome::Halted);
        assert_eq!(m.run_state, RunState::Halted);
        let snapshot = m.clone();

        assert_eq!(step_one(&mut m, &mut out), StepOutcome::Halted);
        assert_eq!(m, snapshot);
    }

    #[test]
    fn push_pop_use_the_downward_stack() {
        let mut m = machine(&[LDI, 0, 9, PUSH, 0, LDI, 0, 1, POP, 1, HLT]);
        let mut out = VecOutput::new();

        step_one(&mut m, &mut out);
        step_one(&mut m, &mut out);
        assert_eq!(m.arch.sp(), 0xF3);
        assert_eq!(m.ram_read(0xF3), Ok(9));

        step_one(&mut m, &mut out);
        step_one(&mut m, &mut out);
        assert_eq!(m.arch.gpr(GeneralRegister::R1), 9);
        assert_eq!(m.arch.sp(), 0xF4);
    }

    #[test]
    fn push_at_address_zero_wraps_to_top_of_memory() {
        let mut m = machine(&[LDI, 0, 0x5A, PUSH, 0, HLT]);
        m.arch.set_sp(0);
        let mut out = VecOutput::new();

        step_one(&mut m, &mut out);
        step_one(&mut m, &mut out);

        assert_eq!(m.arch.sp(), 0xFF);
        assert_eq!(m.ram_read(0xFF), Ok(0x5A));
    }

    #[test]
    fn push_of_stack_register_stores_pre_push_pointer() {
        let mut m = machine(&[PUSH, 7, HLT]);
        let mut out = VecOutput::new();

        step_one(&mut m, &mut out);

        assert_eq!(m.ram_read(0xF3), Ok(0xF4));
        assert_eq!(m.arch.sp(), 0xF3);
    }

    #[test]
    fn prn_failure_is_latched_as_output_fault() {
        let mut m = machine(&[LDI, 0, 1, PRN, 0, HLT]);
        let mut sink = RejectingOutput;

        step_one(&mut m, &mut sink);
        let outcome = step_one(&mut m, &mut sink);

        assert_eq!(
            outcome,
            StepOutcome::Fault {
                cause: Fault::OutputFailed { addr: 3 }
            }
        );
        assert_eq!(m.arch.pc(), 3);
        assert_eq!(
            step_one(&mut m, &mut sink),
            StepOutcome::Fault {
                cause: Fault::OutputFailed { addr: 3 }
            }
        );
    }

    #[test]
    fn jeq_and_jne_test_only_the_equal_bit() {
        let jeq = Opcode::Jeq.byte();
        let jne = Opcode::Jne.byte();
        let mut out = VecOutput::new();

        for (flags, jeq_taken) in [(FLAG_G, false), (FLAG_L, false), (FLAG_E, true), (0, false)] {
            let mut m = machine(&[jeq, 0, jne, 0, HLT]);
            m.arch.set_gpr(GeneralRegister::R0, 0x40);
            m.arch.set_flags(flags);

            step_one(&mut m, &mut out);
            let expected = if jeq_taken { 0x40 } else { 2 };
            assert_eq!(m.arch.pc(), expected, "JEQ with flags {flags:#05b}");

            m.arch.set_pc(2);
            step_one(&mut m, &mut out);
            let expected = if jeq_taken { 4 } else { 0x40 };
            assert_eq!(m.arch.pc(), expected, "JNE with flags {flags:#05b}");
        }
    }

    #[test]
    fn step_budget_stops_a_resumable_run() {
        let jmp = Opcode::Jmp.byte();
        let mut m = machine(&[LDI, 0, 3, jmp, 0]);
        let mut out = VecOutput::new();

        let outcome = run_until_halt(&mut m, &mut out, &MachineConfig::with_step_budget(5))
            .expect("looping program does not fault");

        assert_eq!(
            outcome,
            RunOutcome {
                steps: 5,
                boundary: RunBoundary::StepBudget,
            }
        );
        assert!(m.is_running());
    }

    #[test]
    fn run_on_halted_machine_retires_nothing() {
        let mut m = machine(&[HLT]);
        let mut out = VecOutput::new();
        let config = MachineConfig::default();

        let first = run_until_halt(&mut m, &mut out, &config).expect("halts");
        assert_eq!(first.steps, 1);

        let second = run_until_halt(&mut m, &mut out, &config).expect("still halted");
        assert_eq!(second.steps, 0);
        assert_eq!(second.boundary, RunBoundary::Halted);
    }

    fn end_of_memory(tail: &[(u8, u8)]) -> Machine {
        let mut image = [0_u8; 256];
        for &(addr, byte) in tail {
            image[usize::from(addr)] = byte;
        }
        machine(&image)
    }

    #[test]
    fn hlt_in_last_cell_halts() {
        let jmp = Opcode::Jmp.byte();
        let mut m = end_of_memory(&[(0, jmp), (1, 0), (255, HLT)]);
        m.arch.set_gpr(GeneralRegister::R0, 255);
        let mut out = VecOutput::new();

        assert_eq!(step_one(&mut m, &mut out), StepOutcome::Retired { pc: 0, opcode: jmp });
        assert_eq!(step_one(&mut m, &mut out), StepOutcome::Halted);
        assert_eq!(m.run_state, RunState::Halted);
        assert_eq!(m.arch.pc(), 255);
    }

    #[test]
    fn taken_branch_in_last_two_cells_jumps() {
        let jeq = Opcode::Jeq.byte();
        let mut m = end_of_memory(&[(254, jeq), (255, 0)]);
        m.arch.set_pc(254);
        m.arch.set_gpr(GeneralRegister::R0, 16);
        m.arch.set_flags(FLAG_E);
        let mut out = VecOutput::new();

        assert_eq!(
            step_one(&mut m, &mut out),
            StepOutcome::Retired { pc: 254, opcode: jeq }
        );
        assert_eq!(m.arch.pc(), 16);
    }

    #[test]
    fn untaken_branch_in_last_two_cells_faults_without_side_effects() {
        let jne = Opcode::Jne.byte();
        let mut m = end_of_memory(&[(254, jne), (255, 0)]);
        m.arch.set_pc(254);
        m.arch.set_flags(FLAG_E);
        let before = m.arch;
        let mut out = VecOutput::new();

        assert_eq!(
            step_one(&mut m, &mut out),
            StepOutcome::Fault {
                cause: Fault::memory(256)
            }
        );
        assert_eq!(m.arch, before);
    }

    #[test]
    fn trace_reports_events_in_execution_order() {
        let mut m = machine(&[LDI, 0, 4, PRN, 0, HLT]);
        let mut out = VecOutput::new();
        let mut events: Vec<TraceEvent> = Vec::new();

        run_until_halt_traced(&mut m, &mut out, &mut events, &MachineConfig::default())
            .expect("halts");

        assert_eq!(events.len(), 5);
        assert_eq!(
            events[0],
            TraceEvent::InstructionStart {
                pc: 0,
                ir: LDI,
                operand_a: 0,
                operand_b: 4,
                registers: [0, 0, 0, 0, 0, 0, 0, 0xF4],
            }
        );
        assert!(matches!(
            events[1],
            TraceEvent::InstructionStart { pc: 3, .. }
        ));
        assert_eq!(events[2], TraceEvent::Output { value: 4 });
        assert!(matches!(
            events[3],
            TraceEvent::InstructionStart { pc: 5, .. }
        ));
        assert_eq!(events[4], TraceEvent::Halted { pc: 5 });
    }
}
