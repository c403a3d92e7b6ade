//! Property coverage for instruction semantics.

use ls8_core::{
    run_until_halt, step_one, GeneralRegister, Machine, MachineConfig, Opcode, RunBoundary,
    StepOutcome, VecOutput, FLAG_E, FLAG_G, FLAG_L,
};
use proptest::prelude::*;
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;

fn register(index: u8) -> GeneralRegister {
    GeneralRegister::from_operand(index).expect("generated index is in range")
}

fn machine(program: &[u8]) -> Machine {
    Machine::load_program(program).expect("program fits")
}

proptest! {
    #[test]
    fn ldi_changes_only_its_destination(rd in 0_u8..8, value in any::<u8>()) {
        let mut m = machine(&[Opcode::Ldi.byte(), rd, value, Opcode::Hlt.byte()]);
        let before = m.arch;
        let before_memory = m.memory.clone();
        let mut out = VecOutput::new();

        step_one(&mut m, &mut out);

        prop_assert_eq!(&m.memory, &before_memory);
        for reg in GeneralRegister::ALL {
            let expected = if reg == register(rd) { value } else { before.gpr(reg) };
            prop_assert_eq!(m.arch.gpr(reg), expected);
        }
        prop_assert_eq!(m.arch.pc(), 3);
        prop_assert_eq!(m.arch.flags(), 0);
    }

    #[test]
    fn pop_undoes_push(
        value in any::<u8>(),
        src in 0_u8..7,
        dst in 0_u8..7,
        sp in 8_u8..=255,
    ) {
        let mut m = machine(&[
            Opcode::Push.byte(), src,
            Opcode::Pop.byte(), dst,
            Opcode::Hlt.byte(),
        ]);
        m.arch.set_gpr(register(src), value);
        m.arch.set_sp(sp);
        let mut out = VecOutput::new();

        step_one(&mut m, &mut out);
        prop_assert_eq!(m.arch.sp(), sp - 1);
        step_one(&mut m, &mut out);

        prop_assert_eq!(m.arch.gpr(register(dst)), value);
        prop_assert_eq!(m.arch.sp(), sp);
    }

    #[test]
    fn cmp_sets_exactly_one_matching_flag(a in any::<u8>(), b in any::<u8>(), stale in 0_u8..8) {
        let mut m = machine(&[Opcode::Cmp.byte(), 0, 1, Opcode::Hlt.byte()]);
        m.arch.set_gpr(GeneralRegister::R0, a);
        m.arch.set_gpr(GeneralRegister::R1, b);
        m.arch.set_flags(stale);
        let mut out = VecOutput::new();

        step_one(&mut m, &mut out);

        let flags = m.arch.flags();
        prop_assert_eq!(flags.count_ones(), 1);
        prop_assert_eq!(flags == FLAG_E, a == b);
        prop_assert_eq!(flags == FLAG_L, a < b);
        prop_assert_eq!(flags == FLAG_G, a > b);
        prop_assert_eq!(m.arch.gpr(GeneralRegister::R0), a);
    }

    #[test]
    fn conditional_jumps_follow_the_equal_flag(flags in 0_u8..8, target in 16_u8..=255) {
        let mut out = VecOutput::new();
        let equal = flags & FLAG_E != 0;

        let mut jeq = machine(&[Opcode::Jeq.byte(), 0, Opcode::Hlt.byte()]);
        jeq.arch.set_gpr(GeneralRegister::R0, target);
        jeq.arch.set_flags(flags);
        step_one(&mut jeq, &mut out);
        prop_assert_eq!(jeq.arch.pc(), if equal { target } else { 2 });

        let mut jne = machine(&[Opcode::Jne.byte(), 0, Opcode::Hlt.byte()]);
        jne.arch.set_gpr(GeneralRegister::R0, target);
        jne.arch.set_flags(flags);
        step_one(&mut jne, &mut out);
        prop_assert_eq!(jne.arch.pc(), if equal { 2 } else { target });
    }

    #[test]
    fn taken_branches_in_the_last_two_cells_jump(target in any::<u8>(), use_jne in any::<bool>()) {
        let (opcode, flags) = if use_jne {
            (Opcode::Jne.byte(), FLAG_G)
        } else {
            (Opcode::Jeq.byte(), FLAG_E)
        };
        let mut image = vec![0_u8; 256];
        image[254] = opcode;
        let mut m = machine(&image);
        m.arch.set_pc(254);
        m.arch.set_gpr(GeneralRegister::R0, target);
        m.arch.set_flags(flags);
        let mut out = VecOutput::new();

        let outcome = step_one(&mut m, &mut out);

        prop_assert_eq!(outcome, StepOutcome::Retired { pc: 254, opcode });
        prop_assert_eq!(m.arch.pc(), target);
    }

    #[test]
    fn arithmetic_wraps_modulo_256(a in any::<u8>(), b in any::<u8>()) {
        let mut m = machine(&[
            Opcode::Add.byte(), 0, 1,
            Opcode::Mul.byte(), 2, 3,
            Opcode::Hlt.byte(),
        ]);
        for reg in [GeneralRegister::R0, GeneralRegister::R2] {
            m.arch.set_gpr(reg, a);
        }
        for reg in [GeneralRegister::R1, GeneralRegister::R3] {
            m.arch.set_gpr(reg, b);
        }
        let mut out = VecOutput::new();

        run_until_halt(&mut m, &mut out, &MachineConfig::default()).expect("halts");

        prop_assert_eq!(m.arch.gpr(GeneralRegister::R0), a.wrapping_add(b));
        prop_assert_eq!(m.arch.gpr(GeneralRegister::R2), a.wrapping_mul(b));
    }

    #[test]
    fn call_returns_to_the_next_instruction(target in 16_u8..0xE0) {
        let mut image = vec![0_u8; usize::from(target) + 1];
        image[..5].copy_from_slice(&[
            Opcode::Call.byte(), 0,
            Opcode::Prn.byte(), 1,
            Opcode::Hlt.byte(),
        ]);
        image[usize::from(target)] = Opcode::Ret.byte();
        let mut m = machine(&image);
        m.arch.set_gpr(GeneralRegister::R0, target);
        let mut out = VecOutput::new();

        step_one(&mut m, &mut out);
        prop_assert_eq!(m.arch.pc(), target);
        prop_assert_eq!(m.ram_read(0xF3), Ok(2));
        step_one(&mut m, &mut out);

        prop_assert_eq!(m.arch.pc(), 2);
        prop_assert_eq!(m.arch.sp(), 0xF4);
    }

    #[test]
    fn faults_leave_registers_and_memory_untouched(
        image in proptest::collection::vec(any::<u8>(), 0..=256),
        steps in 1_usize..64,
    ) {
        let mut m = machine(&image);
        let mut out = VecOutput::new();

        for _ in 0..steps {
            let before = m.clone();
            match step_one(&mut m, &mut out) {
                StepOutcome::Fault { cause } => {
                    prop_assert_eq!(m.arch, before.arch);
                    prop_assert_eq!(&m.memory, &before.memory);
                    prop_assert_eq!(m.run_state.latched_fault(), Some(cause));
                    break;
                }
                StepOutcome::Halted => break,
                StepOutcome::Retired { .. } => {}
            }
        }
    }

    #[test]
    fn step_budget_bounds_an_endless_loop(budget in 0_u64..200) {
        let mut m = machine(&[Opcode::Ldi.byte(), 0, 3, Opcode::Jmp.byte(), 0]);
        let mut out = VecOutput::new();

        let outcome = run_until_halt(&mut m, &mut out, &MachineConfig::with_step_budget(budget))
            .expect("loop never faults");

        prop_assert_eq!(outcome.steps, budget);
        prop_assert_eq!(outcome.boundary, RunBoundary::StepBudget);
    }
}
