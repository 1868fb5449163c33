use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{ReviewError, Result};
use crate::interrupt::{interrupted, is_interrupt_signal};
use crate::package::{pip_version, ListFormat, OutdatedPackage};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Options understood by `pip list` but not by `pip install`
const LIST_ONLY: &[&str] = &[
    "-o",
    "--outdated",
    "-u",
    "--uptodate",
    "-e",
    "--editable",
    "-l",
    "--local",
    "--not-required",
    "--exclude-editable",
    "--include-editable",
    "--format",
    "--exclude",
    "--path",
];

/// Options understood by `pip install` but not by `pip list`
const INSTALL_ONLY: &[&str] = &[
    "-U",
    "--upgrade",
    "--upgrade-strategy",
    "--force-reinstall",
    "-I",
    "--ignore-installed",
    "--ignore-requires-python",
    "--no-deps",
    "--no-build-isolation",
    "--use-pep517",
    "--no-use-pep517",
    "--no-warn-script-location",
    "--no-warn-conflicts",
    "--compile",
    "--no-compile",
    "--no-clean",
    "-t",
    "--target",
    "--prefix",
    "--root",
    "--src",
    "--require-hashes",
    "--no-binary",
    "--only-binary",
    "--prefer-binary",
    "--dry-run",
    "--report",
    "--break-system-packages",
    "--platform",
    "--python-version",
    "--implementation",
    "--abi",
    "--progress-bar",
    "-c",
    "--constraint",
    "--config-settings",
    "--global-option",
];

/// Options that consume the following argument as their value
const TAKES_VALUE: &[&str] = &[
    "--timeout",
    "--retries",
    "--resume-retries",
    "--proxy",
    "--cert",
    "--client-cert",
    "--index-url",
    "--extra-index-url",
    "--trusted-host",
    "-f",
    "--find-links",
    "--keyring-provider",
    "--log",
    "--cache-dir",
    "--exists-action",
    "--python",
    "--use-feature",
    "--use-deprecated",
    "--exclude",
    "--format",
    "--path",
    "--upgrade-strategy",
    "-t",
    "--target",
    "--prefix",
    "--root",
    "--src",
    "--no-binary",
    "--only-binary",
    "--report",
    "--platform",
    "--python-version",
    "--implementation",
    "--abi",
    "--progress-bar",
    "-c",
    "--constraint",
    "--config-settings",
    "--global-option",
];

fn option_name(token: &str) -> &str {
    token.split_once('=').map_or(token, |(name, _)| name)
}

/// Whether a forwarded pip option expects its value as the next argument
pub fn takes_value(token: &str) -> bool {
    !token.contains('=') && TAKES_VALUE.contains(&token)
}

/// Forwarded options, split by the pip subcommand that accepts them
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Forwarded {
    pub list: Vec<String>,
    pub install: Vec<String>,
}

impl Forwarded {
    /// Assign each option, together with any values following it, to `pip list`,
    /// `pip install` or both, keeping the original order
    pub fn partition(tokens: &[String]) -> Self {
        let mut forwarded = Self::default();
        let mut groups: Vec<&[String]> = Vec::new();
        let mut start = 0;
        for (i, token) in tokens.iter().enumerate() {
            if i > start && token.starts_with('-') {
                groups.push(&tokens[start..i]);
                start = i;
            }
        }
        if start < tokens.len() {
            groups.push(&tokens[start..]);
        }

        for group in groups {
            let name = option_name(&group[0]);
            if !INSTALL_ONLY.contains(&name) {
                forwarded.list.extend_from_slice(group);
            }
            if !LIST_ONLY.contains(&name) {
                forwarded.install.extend_from_slice(group);
            }
        }
        forwarded
    }
}

/// Builds pip invocations for one interpreter
#[derive(Debug, Clone)]
pub struct Pip {
    python: String,
}

impl Pip {
    pub fn new(python: impl Into<String>) -> Self {
        Self {
            python: python.into(),
        }
    }

    fn command<'a>(&self, args: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        let mut command = vec![self.python.clone(), String::from("-m"), String::from("pip")];
        command.extend(args.into_iter().map(String::from));
        command
    }

    pub fn version_command(&self) -> Vec<String> {
        self.command(["--version"])
    }

    pub fn list_command(&self, format: ListFormat, forwarded: &[String]) -> Vec<String> {
        let mut command = self.command(["list", "--outdated"]);
        command.extend_from_slice(forwarded);
        if format == ListFormat::Json {
            command.push(String::from("--disable-pip-version-check"));
            command.push(String::from("--format=json"));
        }
        command
    }

    pub fn install_command(&self, packages: &[OutdatedPackage], forwarded: &[String]) -> Vec<String> {
        let mut command = self.command(["install"]);
        command.extend_from_slice(forwarded);
        command.extend(packages.iter().map(OutdatedPackage::pinned));
        command
    }
}

/// Output of a subprocess run with stdout captured
#[derive(Debug, Clone, Default)]
pub struct Captured {
    pub code: Option<i32>,
    pub stdout: String,
}

/// Runs subprocesses given as argument vectors
pub trait Runner {
    /// Run to completion with stdout captured
    fn capture(&mut self, argv: &[String]) -> Result<Captured>;

    /// Run attached to the terminal and return the exit code
    fn run(&mut self, argv: &[String]) -> Result<Option<i32>>;
}

pub struct SystemRunner;

fn spawn_error(argv: &[String]) -> impl FnOnce(std::io::Error) -> ReviewError + '_ {
    move |source| ReviewError::Spawn {
        command: argv.join(" "),
        source,
    }
}

fn new_command(argv: &[String]) -> Command {
    let mut command = Command::new(&argv[0]);
    command.args(&argv[1..]);
    command
}

#[cfg(unix)]
fn signal_of(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn signal_of(_: &ExitStatus) -> Option<i32> {
    None
}

/// Turn how a child ended into its exit code, or `Aborted` when Ctrl+C
/// stopped it or arrived while it ran
pub fn settle(code: Option<i32>, signal: Option<i32>, interrupted: bool) -> Result<Option<i32>> {
    if interrupted || is_interrupt_signal(signal) {
        return Err(ReviewError::Aborted);
    }
    Ok(code)
}

/// Wait for the child, killing it if Ctrl+C is pressed in the meantime
fn wait(child: &mut Child, argv: &[String]) -> Result<ExitStatus> {
    loop {
        if let Some(status) = child.try_wait().map_err(spawn_error(argv))? {
            return Ok(status);
        }
        if interrupted() {
            // It may already have exited on the same SIGINT.
            let _ = child.kill();
            return child.wait().map_err(spawn_error(argv));
        }
        thread::sleep(POLL_INTERVAL);
    }
}

impl Runner for SystemRunner {
    fn capture(&mut self, argv: &[String]) -> Result<Captured> {
        settle(None, None, interrupted())?;
        let mut child = new_command(argv)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(spawn_error(argv))?;

        let mut pipe = child.stdout.take();
        let reader = thread::spawn(move || {
            let mut stdout = Vec::new();
            if let Some(pipe) = pipe.as_mut() {
                pipe.read_to_end(&mut stdout)?;
            }
            Ok::<_, std::io::Error>(stdout)
        });

        let status = wait(&mut child, argv)?;
        let stdout = reader
            .join()
            .unwrap_or_else(|_| Ok(Vec::new()))
            .map_err(spawn_error(argv))?;
        let code = settle(status.code(), signal_of(&status), interrupted())?;
        Ok(Captured {
            code,
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
        })
    }

    fn run(&mut self, argv: &[String]) -> Result<Option<i32>> {
        settle(None, None, interrupted())?;
        let mut child = new_command(argv).spawn().map_err(spawn_error(argv))?;
        let status = wait(&mut child, argv)?;
        settle(status.code(), signal_of(&status), interrupted())
    }
}

fn checked(runner: &mut impl Runner, argv: &[String]) -> Result<String> {
    debug!("Running {}", argv.join(" "));
    let captured = runner.capture(argv)?;
    if captured.code != Some(0) {
        return Err(ReviewError::CommandFailed {
            command: argv.join(" "),
            code: captured.code,
            output: captured.stdout,
        });
    }
    Ok(captured.stdout)
}

/// Ask pip for its version and pick the matching `pip list` output format
pub fn detect_format(pip: &Pip, runner: &mut impl Runner) -> Result<ListFormat> {
    let output = checked(runner, &pip.version_command())?;
    let version = pip_version(&output)?;
    let format = ListFormat::for_pip(&version);
    debug!("pip {version}, using {format:?} output");
    Ok(format)
}

pub fn outdated(
    pip: &Pip,
    runner: &mut impl Runner,
    format: ListFormat,
    forwarded: &[String],
) -> Result<Vec<OutdatedPackage>> {
    let output = checked(runner, &pip.list_command(format, forwarded))?;
    format.parse(&output)
}

/// Install the packages and return the exit code to finish with
///
/// With `continue_on_fail` every package gets its own `pip install`, so one
/// broken package does not hold back the rest.
pub fn install(
    pip: &Pip,
    runner: &mut impl Runner,
    packages: &[OutdatedPackage],
    forwarded: &[String],
    continue_on_fail: bool,
) -> Result<i32> {
    if !continue_on_fail {
        let command = pip.install_command(packages, forwarded);
        debug!("Running {}", command.join(" "));
        return Ok(runner.run(&command)?.unwrap_or(1));
    }

    let mut exit_code = 0;
    for package in packages {
        let command = pip.install_command(std::slice::from_ref(package), forwarded);
        debug!("Running {}", command.join(" "));
        let code = runner.run(&command)?.unwrap_or(1);
        if code != 0 {
            warn!("Failed to install {}, continuing", package.pinned());
            exit_code = code;
        }
    }
    Ok(exit_code)
}
