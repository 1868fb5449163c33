use std::ffi::OsString;

use clap::Parser;

use crate::pip::takes_value;

const LONG_FLAGS: &[&str] = &[
    "verbose",
    "raw",
    "interactive",
    "auto",
    "continue-on-fail",
    "help",
    "version",
];
const SHORT_FLAGS: &[char] = &['v', 'r', 'i', 'a', 'C', 'h', 'V'];

#[derive(Debug, Parser)]
#[command(
    version,
    about = "Keeps your Python packages fresh.",
    after_help = "Unrecognized options are passed on to `pip list` and `pip install`. \
Options only one of them accepts, such as `--not-required` or `--force-reinstall`, \
go to that one alone."
)]
pub struct Args {
    /// Show more output
    #[arg(short, long)]
    pub verbose: bool,

    /// Print raw lines (suitable for passing to pip install)
    #[arg(short, long, conflicts_with = "interactive")]
    pub raw: bool,

    /// Ask interactively to install updates
    #[arg(short, long)]
    pub interactive: bool,

    /// Automatically install every update found
    #[arg(short, long)]
    pub auto: bool,

    /// Install packages one at a time and keep going when one fails
    #[arg(short = 'C', long)]
    pub continue_on_fail: bool,

    /// Options for pip, in command line order
    #[arg(skip)]
    pub forwarded: Vec<String>,

    /// Positional arguments that were ignored
    #[arg(skip)]
    pub dropped: Vec<String>,
}

/// Whether a token belongs to our own flags, and so is handed to clap
fn is_own_flag(token: &str) -> bool {
    if let Some(long) = token.strip_prefix("--") {
        let name = long.split_once('=').map_or(long, |(name, _)| name);
        return LONG_FLAGS.contains(&name);
    }
    match token.strip_prefix('-') {
        Some(short) if !short.is_empty() => short.chars().all(|c| SHORT_FLAGS.contains(&c)),
        _ => false,
    }
}

impl Args {
    /// Parse our flags and set the rest aside for pip, exiting with a usage
    /// error when our own flags are malformed
    pub fn parse_known<I>(argv: I) -> Self
    where
        I: IntoIterator<Item = OsString>,
    {
        Self::try_parse_known(argv).unwrap_or_else(|err| err.exit())
    }

    /// Arguments that are not valid UTF-8 are converted lossily
    pub fn try_parse_known<I, T>(argv: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let mut argv = argv
            .into_iter()
            .map(|arg| arg.into().to_string_lossy().into_owned());
        let mut own: Vec<String> = argv.next().into_iter().collect();
        let mut forwarded = Vec::new();
        let mut dropped = Vec::new();
        let mut expects_value = false;

        for token in argv {
            if is_own_flag(&token) {
                own.push(token);
                expects_value = false;
            } else if token.starts_with('-') && token != "-" && token != "--" {
                expects_value = takes_value(&token);
                forwarded.push(token);
            } else if expects_value {
                forwarded.push(token);
                expects_value = false;
            } else {
                dropped.push(token);
            }
        }

        let mut args = Self::try_parse_from(own)?;
        args.forwarded = forwarded;
        args.dropped = dropped;
        Ok(args)
    }
}
