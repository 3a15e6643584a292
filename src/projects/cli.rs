//! Command-line entrypoint for the `vni` tool.
//!
//! Loads an IR snapshot, runs name inference for every query in it and prints one report
//! per query.

use crate::compiler_frontend::analysis::name_inference::{InferenceOptions, InferredName, infer_names};
use crate::compiler_frontend::compiler_errors::CompilerError;
use crate::compiler_frontend::display_messages::print_compiler_errors;
use crate::compiler_frontend::ir::ir_nodes::IrModule;
use crate::compiler_frontend::ir::ir_snapshot::load_snapshot_file;
use crate::projects::settings::Config;
use crate::timer_log;
use saying::say;
use std::env;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Printed in place of a name or root that could not be inferred.
const UNKNOWN_PLACEHOLDER: &str = "'unknown'";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    // Infers a name for every query of a snapshot
    Infer {
        snapshot: String,
        options: InferArgs,
    },

    Help,
}

#[derive(Debug, Default, PartialEq, Eq)]
struct InferArgs {
    all_accessors: bool,
    sequential: bool,
    config: Option<PathBuf>,
}

pub fn start_cli() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_help();
        return;
    }

    let command = match get_command(&args[1..]) {
        Ok(command) => command,
        Err(e) => {
            say!(Red e);
            print_help();
            return;
        }
    };

    match command {
        Command::Help => print_help(),

        Command::Infer { snapshot, options } => match run_infer(&snapshot, &options) {
            Ok(report) => print!("{report}"),
            Err(error) => print_compiler_errors(vec![error]),
        },
    }
}

fn get_command(args: &[String]) -> Result<Command, String> {
    match args.first().map(String::as_str) {
        Some("help") | Some("--help") => Ok(Command::Help),
        Some("infer") => parse_infer_command(args),
        Some(other) => Err(format!("Invalid command: '{other}'")),
        None => Err(String::from("No command given")),
    }
}

fn parse_infer_command(args: &[String]) -> Result<Command, String> {
    let mut snapshot = String::new();
    let mut options = InferArgs::default();
    let mut index = 1usize;

    while let Some(arg) = args.get(index) {
        match arg.as_str() {
            "--all-accessors" => {
                options.all_accessors = true;
                index += 1;
            }
            "--sequential" => {
                options.sequential = true;
                index += 1;
            }
            "--config" => {
                let Some(config) = args.get(index + 1) else {
                    return Err(String::from("Missing value for --config"));
                };
                if config.starts_with("--") {
                    return Err(String::from("Missing value for --config"));
                }
                options.config = Some(PathBuf::from(config));
                index += 2;
            }
            _ if arg.starts_with("--") => {
                return Err(format!(
                    "Unknown infer flag: '{arg}'. Supported flags are --all-accessors, --sequential, --config."
                ));
            }
            _ => {
                if snapshot.is_empty() {
                    snapshot = arg.to_owned();
                    index += 1;
                } else {
                    return Err(String::from("Infer command accepts exactly one snapshot path."));
                }
            }
        }
    }

    if snapshot.is_empty() {
        return Err(String::from("Infer command needs a snapshot path (vni infer <snapshot.json>)"));
    }

    Ok(Command::Infer { snapshot, options })
}

/// Loads the config and the snapshot, then renders the report for every query.
fn run_infer(snapshot: &str, args: &InferArgs) -> Result<String, CompilerError> {
    let time = Instant::now();

    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::load_from_dir(Path::new("."))?,
    };

    let mut options = config.inference_options();
    if args.all_accessors {
        options = options.union(InferenceOptions::INFER_SELF_THROUGH_ALL_ACCESSORS);
    }
    let parallel = config.output.parallel_queries && !args.sequential;

    let loaded = load_snapshot_file(Path::new(snapshot))?;
    timer_log!(time, "Snapshot loaded in: ");

    let time = Instant::now();
    let results = infer_names(&loaded.module, &loaded.queries, options, parallel);
    timer_log!(time, "Names inferred in: ");

    Ok(render_report(&loaded.module, &results))
}

fn render_report(module: &IrModule, results: &[InferredName]) -> String {
    let mut report = String::new();

    for (index, result) in results.iter().enumerate() {
        if index > 0 {
            report.push('\n');
        }

        // Snapshot loading never produces a query for a missing function
        let Some(function) = module.function(result.query.function) else {
            let _ = writeln!(report, "Input Value: {}", result.query.value);
            write_unknown(&mut report);
            continue;
        };

        let _ = writeln!(
            report,
            "Input Value: {}",
            module.display_value(function, result.query.value)
        );

        match (&result.name, result.root) {
            (Some(name), Some(root)) => {
                let _ = writeln!(report, "Name: '{name}'");
                let _ = writeln!(report, "Root: {}", module.display_value(function, root));
            }
            _ => write_unknown(&mut report),
        }
    }

    report
}

fn write_unknown(report: &mut String) {
    let _ = writeln!(report, "Name: {UNKNOWN_PLACEHOLDER}");
    let _ = writeln!(report, "Root: {UNKNOWN_PLACEHOLDER}");
}

fn print_help() {
    say!(Green Bold "\nCommands:");
    say!("  infer <snapshot.json>   - Infers variable names for the queries in a snapshot");
    say!("  help                    - Shows this message");

    say!(Green Bold "\nInfer flags:");
    say!("  --all-accessors     Look through every call with a self parameter");
    say!("  --sequential        Run queries one after another");
    say!("  --config <file>     Config file to use instead of ./vni.toml");
}

#[cfg(test)]
#[path = "tests/cli_tests.rs"]
mod tests;
