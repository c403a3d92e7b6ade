#![no_main]

use libfuzzer_sys::fuzz_target;
use ls8_core::{disassemble, step_one, Decoder, Machine, StepOutcome, VecOutput, MEMORY_BYTES};

const MAX_STEPS: usize = 1024;

fuzz_target!(|data: &[u8]| {
    let image = &data[..data.len().min(MEMORY_BYTES)];
    let Ok(mut machine) = Machine::load_program(image) else {
        return;
    };

    let _ = disassemble(&machine.memory, 0, MEMORY_BYTES);

    let mut out = VecOutput::new();
    for _ in 0..MAX_STEPS {
        let pc = machine.arch.pc();
        let decoded = Decoder::decode(&machine.memory, pc);
        let before = machine.arch;

        match step_one(&mut machine, &mut out) {
            StepOutcome::Retired { .. } => assert!(decoded.is_ok()),
            StepOutcome::Halted => break,
            StepOutcome::Fault { cause } => {
                if let Err(fault) = decoded {
                    assert_eq!(fault, cause);
                }
                assert_eq!(machine.arch, before);
                break;
            }
        }
    }
});
