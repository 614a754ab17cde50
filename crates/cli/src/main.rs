//! CLI front-end for the out-of-order RISC-V simulator.
//!
//! Loads an assembly text file, runs it to completion (or a cycle limit),
//! and prints a stats report. `--json` emits the final `Snapshot` instead,
//! for scripted consumption.

mod asm;

use std::{fs, process};

use clap::{Parser, Subcommand};
use tomasulo_core::config::Config;
use tomasulo_core::simulator::{RunOutcome, Simulator};
use tomasulo_core::snapshot::Snapshot;

#[derive(Parser, Debug)]
#[command(name = "tomasulo-sim", author, version, about = "Cycle-accurate out-of-order RISC-V simulator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Assemble and run a program.
    Run {
        /// Path to an assembly text file.
        path: String,

        /// Path to a JSON config file overriding the micro-architectural defaults.
        #[arg(long)]
        config: Option<String>,

        /// Maximum cycles before giving up.
        #[arg(long, default_value_t = 1_000_000)]
        max_cycles: u64,

        /// Print the per-cycle trace log instead of (in addition to) the stats report.
        #[arg(long)]
        trace: bool,

        /// Print the final snapshot as JSON instead of a human-readable report.
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run { path, config, max_cycles, trace, json } => cmd_run(&path, config.as_deref(), max_cycles, trace, json),
    }
}

fn cmd_run(path: &str, config_path: Option<&str>, max_cycles: u64, trace: bool, json: bool) {
    let source = fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("error: cannot read '{path}': {e}");
        process::exit(1);
    });

    let program = asm::parse(&source).unwrap_or_else(|e| {
        eprintln!("error: {e}");
        process::exit(1);
    });

    let config = match config_path {
        Some(path) => {
            let text = fs::read_to_string(path).unwrap_or_else(|e| {
                eprintln!("error: cannot read config '{path}': {e}");
                process::exit(1);
            });
            serde_json::from_str(&text).unwrap_or_else(|e| {
                eprintln!("error: malformed config '{path}': {e}");
                process::exit(1);
            })
        }
        None => Config::default(),
    };

    let mut sim = Simulator::new(&config, program).unwrap_or_else(|e| {
        eprintln!("error: invalid config: {e}");
        process::exit(1);
    });
    sim.set_trace(trace);

    let outcome = sim.run_to_completion(max_cycles);
    let snapshot = sim.snapshot();

    if trace {
        for line in sim.log() {
            println!("{line}");
        }
    }

    if json {
        match serde_json::to_string_pretty(&snapshot) {
            Ok(text) => println!("{text}"),
            Err(e) => {
                eprintln!("error: cannot serialize snapshot: {e}");
                process::exit(1);
            }
        }
        return;
    }

    print_report(&outcome, &snapshot);
}

fn print_report(outcome: &RunOutcome, snapshot: &Snapshot) {
    println!("\n=========================================================");

    println!("\n[General]");
    match outcome {
        RunOutcome::Completed { cycles } => println!("  Status:               completed ({cycles} cycles)"),
        RunOutcome::HitCycleLimit { cycles } => println!("  Status:               hit cycle limit ({cycles} cycles)"),
    }
    println!("  Instructions Retired: {}", snapshot.committed);
    println!("  IPC:                  {:.4}", snapshot.ipc);
    println!("  Branch Accuracy:      {:.2}%", snapshot.branch_accuracy * 100.0);

    println!("\n[Structural Occupancy (mean / max / capacity)]");
    println!("  ROB:    {:.2} / {} / {}", snapshot.rob.mean, snapshot.rob.max, snapshot.rob.capacity);
    println!("  ALU RS: {:.2} / {} / {}", snapshot.alu_rs.mean, snapshot.alu_rs.max, snapshot.alu_rs.capacity);
    println!("  LS RS:  {:.2} / {} / {}", snapshot.ls_rs.mean, snapshot.ls_rs.max, snapshot.ls_rs.capacity);
    println!("  LSQ:    {:.2} / {}", snapshot.lsq.mean, snapshot.lsq.max);

    println!("\n[Caches (hits / misses / accesses)]");
    println!("  L1I: {} / {} / {}", snapshot.l1i.hits, snapshot.l1i.misses, snapshot.l1i.accesses);
    println!("  L1D: {} / {} / {}", snapshot.l1d.hits, snapshot.l1d.misses, snapshot.l1d.accesses);

    println!("\n[Architectural Registers]");
    for (i, value) in snapshot.registers.iter().enumerate() {
        if *value != 0 {
            println!("  x{i:<3} = {value}");
        }
    }

    println!("\n=========================================================");
}
