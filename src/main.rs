mod ask;
mod cli;
mod config;
mod error;
mod interrupt;
mod package;
mod pip;
mod review;

use std::io::{stderr, stdout, IsTerminal};
use std::process::ExitCode;

use crate::ask::Asker;
use crate::cli::Args;
use crate::config::{load_config, python_interpreter};
use crate::error::ReviewError;
use crate::pip::{Forwarded, Pip, SystemRunner};

use anyhow::Result;
use owo_colors::OwoColorize;
use tracing::{debug, error, info, Level};
use tracing_subscriber::fmt::writer::MakeWriterExt;

fn main() -> ExitCode {
    let args = Args::parse_known(std::env::args_os());
    setup_logging(args.verbose);

    match run(&args) {
        Ok(0) => ExitCode::SUCCESS,
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(err) if matches!(err.downcast_ref::<ReviewError>(), Some(ReviewError::Aborted)) => {
            print!("{}", interrupt::ABORTED);
            ExitCode::SUCCESS
        }
        Err(err) => {
            let prefix = if stderr().is_terminal() {
                "error:".bold().red().to_string()
            } else {
                String::from("error:")
            };
            error!("{prefix} {err:#}");
            ExitCode::FAILURE
        }
    }
}

/// Messages only, info and debug on stdout, warnings and errors on stderr
fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .without_time()
        .with_level(false)
        .with_target(false)
        .with_ansi(false)
        .with_writer(stderr.with_max_level(Level::WARN).or_else(stdout))
        .init();
}

fn run(args: &Args) -> Result<i32> {
    interrupt::install_handler()?;
    for token in &args.dropped {
        debug!("Ignoring positional argument {token:?}");
    }

    let config = load_config()?;
    let pip = Pip::new(python_interpreter(&config));
    let tokens: Vec<String> = config
        .forward
        .iter()
        .chain(&args.forwarded)
        .cloned()
        .collect();
    let forwarded = Forwarded::partition(&tokens);

    let mut asker = Asker::stdio();
    let code = review::run(
        args,
        &pip,
        &forwarded,
        &mut SystemRunner,
        &mut asker,
        |line: &str| info!("{line}"),
    )?;
    Ok(code)
}
