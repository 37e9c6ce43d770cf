//! Command-line definition

use crate::logging::LogFormat;
use clap::{value_parser, Arg, ArgAction, Command};
use std::path::PathBuf;

/// Build the `fmc` command
#[must_use]
pub fn build_cli() -> Command {
    Command::new("fmc")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Factory Method conformance verifier")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .global(true)
                .default_value("warn")
                .help("Default log filter when RUST_LOG is unset"),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .global(true)
                .default_value("text")
                .value_parser(value_parser!(LogFormat))
                .help("Log line format: text or json"),
        )
        .subcommand(
            Command::new("verify")
                .about("Verify one C++ submission")
                .arg(sources_arg())
                .arg(
                    Arg::new("binding")
                        .long("binding")
                        .short('b')
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Role binding (.toml, .json, .yaml)"),
                )
                .arg(config_arg())
                .arg(json_arg())
                .arg(
                    Arg::new("budget-ms")
                        .long("budget-ms")
                        .value_parser(value_parser!(u64).range(1..))
                        .help("Run budget in milliseconds"),
                )
                .arg(structural_only_arg()),
        )
        .subcommand(
            Command::new("inspect")
                .about("Print the types extracted from a C++ submission as JSON")
                .arg(sources_arg()),
        )
        .subcommand(
            Command::new("batch")
                .about("Verify every submission listed in a manifest")
                .arg(
                    Arg::new("manifest")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Batch manifest (.toml)"),
                )
                .arg(config_arg())
                .arg(json_arg())
                .arg(
                    Arg::new("jobs")
                        .long("jobs")
                        .short('j')
                        .value_parser(value_parser!(usize))
                        .help("Parallel workers"),
                )
                .arg(structural_only_arg()),
        )
        .subcommand(Command::new("contract").about("Print the pattern contract as JSON"))
}

fn sources_arg() -> Arg {
    Arg::new("source")
        .required(true)
        .num_args(1..)
        .value_parser(value_parser!(PathBuf))
        .help("C++ source files of one submission, or a directory of them")
}

fn config_arg() -> Arg {
    Arg::new("config")
        .long("config")
        .short('c')
        .value_parser(value_parser!(PathBuf))
        .help("Harness configuration (.toml)")
}

fn json_arg() -> Arg {
    Arg::new("json")
        .long("json")
        .action(ArgAction::SetTrue)
        .help("Output as JSON")
}

fn structural_only_arg() -> Arg {
    Arg::new("structural-only")
        .long("structural-only")
        .action(ArgAction::SetTrue)
        .help("Skip compiling and running the candidate")
}
