use clap::ArgMatches;
use fmc_harness::commands::{self, BatchOptions, VerifyOptions};
use fmc_harness::{build_cli, logging, LogFormat};
use std::path::PathBuf;

fn main() {
    let matches = build_cli().get_matches();

    let level = matches
        .get_one::<String>("log-level")
        .map_or("warn", String::as_str);
    let format = matches
        .get_one::<LogFormat>("log-format")
        .copied()
        .unwrap_or_default();
    if let Err(e) = logging::init(level, format) {
        eprintln!("error: {e:#}");
        std::process::exit(2);
    }

    match dispatch(&matches) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            std::process::exit(2);
        }
    }
}

fn dispatch(matches: &ArgMatches) -> anyhow::Result<i32> {
    let mut stdout = std::io::stdout().lock();
    match matches.subcommand() {
        Some(("verify", args)) => {
            let options = VerifyOptions {
                sources: paths(args, "source")?,
                binding: path(args, "binding")?,
                config: args.get_one::<PathBuf>("config").cloned(),
                json: args.get_flag("json"),
                budget_ms: args.get_one::<u64>("budget-ms").copied(),
                structural_only: args.get_flag("structural-only"),
            };
            commands::verify(&options, &mut stdout)
        }
        Some(("inspect", args)) => commands::inspect(&paths(args, "source")?, &mut stdout),
        Some(("batch", args)) => {
            let options = BatchOptions {
                manifest: path(args, "manifest")?,
                config: args.get_one::<PathBuf>("config").cloned(),
                json: args.get_flag("json"),
                jobs: args.get_one::<usize>("jobs").copied(),
                structural_only: args.get_flag("structural-only"),
            };
            commands::batch(&options, &mut stdout)
        }
        Some(("contract", _)) => commands::contract(&mut stdout),
        _ => Ok(2),
    }
}

fn path(args: &ArgMatches, name: &str) -> anyhow::Result<PathBuf> {
    args.get_one::<PathBuf>(name)
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("missing argument <{name}>"))
}

fn paths(args: &ArgMatches, name: &str) -> anyhow::Result<Vec<PathBuf>> {
    let values: Vec<PathBuf> = args
        .get_many::<PathBuf>(name)
        .map(|values| values.cloned().collect())
        .unwrap_or_default();
    if values.is_empty() {
        anyhow::bail!("missing argument <{name}>");
    }
    Ok(values)
}
