//! Command-line surface (SPEC_FULL.md §6.1).

use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use mission_planner::error::PlanError;
use mission_planner::{export, plan, PlanRequest};

#[derive(Parser, Debug)]
#[command(name = "mission-planner")]
#[command(about = "Plan satellite imaging opportunities against a constellation", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Log verbosity passed to `tracing-subscriber`'s `EnvFilter`.
    #[arg(long, global = true, default_value = "info", value_name = "LEVEL")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Runs the planner against a request file and prints/writes the schedule.
    Plan {
        #[arg(value_name = "REQUEST_JSON")]
        request_path: PathBuf,
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Validates a request file without running the scheduler.
    Validate {
        #[arg(value_name = "REQUEST_JSON")]
        request_path: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum OutputFormat {
    Json,
    Csv,
}

fn load_request(path: &PathBuf) -> Result<PlanRequest, PlanError> {
    let text = fs::read_to_string(path)
        .map_err(|e| PlanError::internal(format!("failed to read '{}': {e}", path.display())))?;
    serde_json::from_str(&text).map_err(|e| PlanError::internal(format!("failed to parse request JSON: {e}")))
}

/// Runs the parsed CLI command, returning the process exit code.
pub fn run(cli: Cli) -> i32 {
    match cli.command {
        Command::Validate { request_path } => match load_request(&request_path).and_then(|r| {
            plan::validate_request(&r)?;
            Ok(r)
        }) {
            Ok(_) => {
                println!("request is valid");
                0
            }
            Err(e) => {
                eprintln!("{{\"error_kind\": \"{}\", \"message\": \"{}\"}}", e.kind(), e);
                1
            }
        },
        Command::Plan { request_path, format, output } => {
            let result = load_request(&request_path).and_then(|request| plan::run(&request, None));
            match result {
                Ok(response) => {
                    let rendered = match format {
                        OutputFormat::Json => export::to_json(&response),
                        OutputFormat::Csv => export::to_csv(&response),
                    };
                    match rendered {
                        Ok(text) => match output {
                            Some(path) => match fs::write(&path, text) {
                                Ok(()) => 0,
                                Err(e) => {
                                    eprintln!("failed to write '{}': {e}", path.display());
                                    1
                                }
                            },
                            None => {
                                println!("{text}");
                                0
                            }
                        },
                        Err(e) => {
                            eprintln!("{{\"error_kind\": \"{}\", \"message\": \"{}\"}}", e.kind(), e);
                            1
                        }
                    }
                }
                Err(e) => {
                    eprintln!("{{\"error_kind\": \"{}\", \"message\": \"{}\"}}", e.kind(), e);
                    1
                }
            }
        }
    }
}
