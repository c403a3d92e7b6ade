use ls8_core::{
    disassemble, run_until_halt_traced, step_one, DisassemblyRow, Fault, Machine, MachineConfig,
    RunBoundary, StepOutcome, TraceEvent, TraceSink, VecOutput,
};
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = console)]
    fn log(s: &str);
}

macro_rules! console_log {
    ($($t:tt)*) => (log(&format!($($t)*)))
}

/// JS-compatible version of `StepOutcome`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum WasmStepOutcome {
    Retired { pc: u8, opcode: u8 },
    Halted,
    Fault { code: u8, message: String },
}

impl From<StepOutcome> for WasmStepOutcome {
    fn from(outcome: StepOutcome) -> Self {
        match outcome {
            StepOutcome::Retired { pc, opcode } => Self::Retired { pc, opcode },
            StepOutcome::Halted => Self::Halted,
            StepOutcome::Fault { cause } => cause.into(),
        }
    }
}

impl From<Fault> for WasmStepOutcome {
    fn from(cause: Fault) -> Self {
        Self::Fault {
            code: cause.code(),
            message: cause.to_string(),
        }
    }
}

/// Why a run returned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum WasmRunBoundary {
    Halted,
    StepBudget { next_pc: u8 },
    Fault { code: u8, message: String },
}

/// JS-compatible version of `RunOutcome`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WasmRunOutcome {
    pub steps: u64,
    pub boundary: WasmRunBoundary,
}

/// Counts fetched instructions so a faulting run can still report how many
/// retired.
#[derive(Default)]
struct StepCounter {
    started: u64,
}

impl TraceSink for StepCounter {
    fn on_event(&mut self, event: TraceEvent) {
        if matches!(event, TraceEvent::InstructionStart { .. }) {
            self.started += 1;
        }
    }
}

#[wasm_bindgen]
pub struct WasmMachine {
    machine: Machine,
    output: VecOutput,
    config: MachineConfig,
}

impl Default for WasmMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl WasmMachine {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        console_error_panic_hook::set_once();
        Self {
            machine: Machine::default(),
            output: VecOutput::new(),
            config: MachineConfig::default(),
        }
    }

    /// Loads a program image into memory starting at address 0.
    pub fn load_program(&mut self, program: &[u8]) -> Result<(), JsValue> {
        self.load_image(program).map_err(|e| JsValue::from_str(&e))?;
        console_log!("Loaded {} bytes into memory", program.len());
        Ok(())
    }

    /// Parses `.ls8` source text and loads it.
    pub fn load_source(&mut self, source: &str) -> Result<(), JsValue> {
        self.load_text(source).map_err(|e| JsValue::from_str(&e))?;
        console_log!("Loaded program source ({} lines)", source.lines().count());
        Ok(())
    }

    /// Limits how many instructions one `run` call may retire; `None` removes
    /// the limit.
    pub fn set_step_budget(&mut self, budget: Option<u32>) {
        self.config.step_budget = budget.map(u64::from);
    }

    /// Resets registers and run state; the loaded program stays in memory.
    pub fn reset(&mut self) {
        self.machine.reset();
        self.output.take();
    }

    /// Executes a single instruction.
    /// Returns the step outcome as a JSON object.
    pub fn step(&mut self) -> Result<JsValue, JsValue> {
        let outcome = self.step_outcome();
        if let WasmStepOutcome::Fault { message, .. } = &outcome {
            web_sys::console::warn_1(&JsValue::from_str(message));
        }
        to_js(&outcome)
    }

    /// Runs until `HLT`, a fault or the step budget.
    /// Returns the run outcome as a JSON object.
    pub fn run(&mut self) -> Result<JsValue, JsValue> {
        let outcome = self.run_outcome();
        if let WasmRunBoundary::Fault { message, .. } = &outcome.boundary {
            web_sys::console::warn_1(&JsValue::from_str(message));
        }
        to_js(&outcome)
    }

    /// Returns the full machine state as a JSON object.
    pub fn get_state(&self) -> Result<JsValue, JsValue> {
        to_js(&self.machine)
    }

    /// Returns a copy of the memory contents as a Uint8Array.
    pub fn get_memory(&self) -> js_sys::Uint8Array {
        js_sys::Uint8Array::from(self.machine.memory.as_slice())
    }

    /// Drains the values printed by `PRN` since the last call.
    pub fn take_output(&mut self) -> Vec<u8> {
        self.output.take()
    }

    /// Disassembles `count` instructions from `start` as an array of rows.
    pub fn disassemble(&self, start: u8, count: usize) -> Result<JsValue, JsValue> {
        to_js(&self.listing(start, count))
    }
}

impl WasmMachine {
    fn load_image(&mut self, program: &[u8]) -> Result<(), String> {
        self.machine = Machine::load_program(program).map_err(|e| e.to_string())?;
        self.output.take();
        Ok(())
    }

    fn load_text(&mut self, source: &str) -> Result<(), String> {
        self.machine = ls8_loader::load_source(source).map_err(|e| e.to_string())?;
        self.output.take();
        Ok(())
    }

    fn step_outcome(&mut self) -> WasmStepOutcome {
        step_one(&mut self.machine, &mut self.output).into()
    }

    fn run_outcome(&mut self) -> WasmRunOutcome {
        let mut counter = StepCounter::default();
        let result = run_until_halt_traced(
            &mut self.machine,
            &mut self.output,
            &mut counter,
            &self.config,
        );

        match result {
            Ok(outcome) => WasmRunOutcome {
                steps: outcome.steps,
                boundary: match outcome.boundary {
                    RunBoundary::Halted => WasmRunBoundary::Halted,
                    RunBoundary::StepBudget => WasmRunBoundary::StepBudget {
                        next_pc: self.machine.arch.pc(),
                    },
                },
            },
            Err(cause) => WasmRunOutcome {
                // The faulting instruction was fetched but did not retire.
                steps: counter.started.saturating_sub(1),
                boundary: WasmRunBoundary::Fault {
                    code: cause.code(),
                    message: cause.to_string(),
                },
            },
        }
    }

    fn listing(&self, start: u8, count: usize) -> Vec<DisassemblyRow> {
        disassemble(&self.machine.memory, start, count)
    }
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(Into::into)
}
