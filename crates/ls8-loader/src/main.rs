//! CLI entry point for the `ls8` binary.

use std::env;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use ls8_core::{
    disassemble, run_until_halt_traced, DisassemblyRow, Machine, MachineConfig, NoTrace,
    RunBoundary, TraceSink,
};
use ls8_loader::{load_file, read_program, TracePrinter, WriterOutput};
#[cfg(test)]
use tempfile as _;
use thiserror as _;

const USAGE_TEXT: &str = "\
Usage: ls8 <command> [options]

Commands:
  run <file> [--trace] [--max-steps <n>]  Load and execute a program
  disasm <file>                           Print a disassembly listing

Options:
  -t, --trace          Print a TRACE line to stderr before each instruction
  -n, --max-steps <n>  Stop after <n> instructions (run only)
  -h, --help           Show this help message

Examples:
  ls8 run programs/print8.ls8
  ls8 run programs/call.ls8 --trace
  ls8 disasm programs/sctest.ls8
";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Run(RunArgs),
    Disasm(DisasmArgs),
}

#[derive(Debug, PartialEq, Eq)]
struct RunArgs {
    input: PathBuf,
    trace: bool,
    max_steps: Option<u64>,
}

#[derive(Debug, PartialEq, Eq)]
struct DisasmArgs {
    input: PathBuf,
}

#[derive(Debug)]
enum ParseResult {
    Command(Command),
    Help,
}

fn parse_args(mut args: impl Iterator<Item = OsString>) -> Result<ParseResult, String> {
    let first = args.next().ok_or_else(|| "missing command".to_string())?;

    if first == "--help" || first == "-h" {
        return Ok(ParseResult::Help);
    }

    let command_str = first.to_string_lossy().to_string();

    match command_str.as_str() {
        "run" => parse_run_args(args)
            .map(Command::Run)
            .map(ParseResult::Command),
        "disasm" => parse_disasm_args(args)
            .map(Command::Disasm)
            .map(ParseResult::Command),
        other => Err(format!("unknown command: {other}")),
    }
}

#[allow(clippy::while_let_on_iterator)]
fn parse_run_args(mut args: impl Iterator<Item = OsString>) -> Result<RunArgs, String> {
    let mut input: Option<PathBuf> = None;
    let mut trace = false;
    let mut max_steps: Option<u64> = None;

    while let Some(arg) = args.next() {
        if arg == "--help" || arg == "-h" {
            return Err(USAGE_TEXT.to_string());
        }

        if arg == "--trace" || arg == "-t" {
            trace = true;
            continue;
        }

        if arg == "--max-steps" || arg == "-n" {
            let value = args
                .next()
                .ok_or_else(|| "missing value for --max-steps".to_string())?;
            let text = value.to_string_lossy();
            let steps = text
                .parse::<u64>()
                .map_err(|_| format!("invalid step count: {text}"))?;
            max_steps = Some(steps);
            continue;
        }

        if arg.to_string_lossy().starts_with('-') {
            return Err(format!("unknown option: {}", arg.to_string_lossy()));
        }

        if input.is_some() {
            return Err("multiple input paths provided".to_string());
        }
        input = Some(PathBuf::from(arg));
    }

    let input = input.ok_or_else(|| "missing input path".to_string())?;
    Ok(RunArgs {
        input,
        trace,
        max_steps,
    })
}

fn parse_disasm_args(args: impl Iterator<Item = OsString>) -> Result<DisasmArgs, String> {
    let mut input: Option<PathBuf> = None;

    for arg in args {
        if arg == "--help" || arg == "-h" {
            return Err(USAGE_TEXT.to_string());
        }

        if arg.to_string_lossy().starts_with('-') {
            return Err(format!("unknown option: {}", arg.to_string_lossy()));
        }

        if input.is_some() {
            return Err("multiple input paths provided".to_string());
        }
        input = Some(PathBuf::from(arg));
    }

    let input = input.ok_or_else(|| "missing input path".to_string())?;
    Ok(DisasmArgs { input })
}

fn run_program(args: &RunArgs) -> Result<(), i32> {
    let mut machine = match load_file(&args.input) {
        Ok(machine) => machine,
        Err(e) => {
            eprintln!("error: {e}");
            return Err(1);
        }
    };

    let config = MachineConfig {
        step_budget: args.max_steps,
    };
    let mut output = WriterOutput::new(io::stdout().lock());
    let mut printer;
    let mut silent = NoTrace;
    let trace: &mut dyn TraceSink = if args.trace {
        printer = TracePrinter::new(io::stderr().lock());
        &mut printer
    } else {
        &mut silent
    };

    let result = run_until_halt_traced(&mut machine, &mut output, trace, &config);
    let io_error = output.finish().err();

    match (result, io_error) {
        (Err(fault), Some(io_error)) => {
            eprintln!("fault: {fault}: {io_error}");
            Err(1)
        }
        (Err(fault), None) => {
            eprintln!("fault: {fault}");
            Err(1)
        }
        (Ok(_), Some(io_error)) => {
            eprintln!("error: failed to write output: {io_error}");
            Err(1)
        }
        (Ok(outcome), None) if outcome.boundary == RunBoundary::Halted => Ok(()),
        (Ok(outcome), None) => {
            eprintln!(
                "error: step budget of {} instructions exhausted at pc {:#04x}",
                outcome.steps,
                machine.arch.pc()
            );
            Err(1)
        }
    }
}

fn disassembly_rows(machine: &Machine, len: usize) -> Vec<DisassemblyRow> {
    disassemble(&machine.memory, 0, len)
        .into_iter()
        .take_while(|row| usize::from(row.addr) < len)
        .collect()
}

fn format_row(row: &DisassemblyRow) -> String {
    let hex_bytes: String = row
        .bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ");

    format!("{:02X}: {hex_bytes:<8}  {}", row.addr, row.text())
}

fn run_disasm(input: &Path) -> Result<(), i32> {
    let loaded = read_program(input).and_then(|program| {
        let machine = Machine::load_program(&program)?;
        Ok((machine, program.len()))
    });
    let (machine, len) = match loaded {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("error: {e}");
            return Err(1);
        }
    };

    for row in disassembly_rows(&machine, len) {
        println!("{}", format_row(&row));
    }

    Ok(())
}

fn main() {
    let exit_code = match parse_args(env::args_os().skip(1)) {
        Ok(ParseResult::Help) => {
            println!("{USAGE_TEXT}");
            0
        }
        Ok(ParseResult::Command(Command::Run(args))) => match run_program(&args) {
            Ok(()) => 0,
            Err(code) => code,
        },
        Ok(ParseResult::Command(Command::Disasm(args))) => match run_disasm(&args.input) {
            Ok(()) => 0,
            Err(code) => code,
        },
        Err(error) => {
            if error.starts_with("Usage:") {
                println!("{error}");
            } else {
                eprintln!("error: {error}");
                eprintln!("{USAGE_TEXT}");
            }
            1
        }
    };

    std::process::exit(exit_code);
}
