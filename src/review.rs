use std::io::{BufRead, Write};

use crate::ask::Asker;
use crate::cli::Args;
use crate::error::Result;
use crate::package::OutdatedPackage;
use crate::pip::{self, Forwarded, Pip, Runner};

const PROMPT: &str = "Upgrade now?";

/// Report every outdated package and return the ones to install
pub fn review<R: BufRead, W: Write>(
    packages: &[OutdatedPackage],
    args: &Args,
    asker: &mut Asker<R, W>,
    emit: &mut impl FnMut(&str),
) -> Result<Vec<OutdatedPackage>> {
    let mut queued = Vec::new();
    for package in packages {
        if args.raw {
            emit(&package.pinned());
        } else if args.auto {
            queued.push(package.clone());
        } else {
            emit(&package.to_string());
            if args.interactive && asker.ask(PROMPT)?.accepts() {
                queued.push(package.clone());
            }
        }
    }
    Ok(queued)
}

/// One full pass: detect pip, list outdated packages, report and install
///
/// Returns the exit code of the run.
pub fn run<R: BufRead, W: Write>(
    args: &Args,
    pip: &Pip,
    forwarded: &Forwarded,
    runner: &mut impl Runner,
    asker: &mut Asker<R, W>,
    mut emit: impl FnMut(&str),
) -> Result<i32> {
    let format = pip::detect_format(pip, runner)?;
    let packages = pip::outdated(pip, runner, format, &forwarded.list)?;
    let queued = review(&packages, args, asker, &mut emit)?;

    if packages.is_empty() && !args.raw {
        emit("Everything up-to-date");
        return Ok(0);
    }
    if args.raw || queued.is_empty() {
        return Ok(0);
    }
    pip::install(pip, runner, &queued, &forwarded.install, args.continue_on_fail)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::pip::tests::FakeRunner;

    const PIP_VERSION: (i32, &str) = (0, "pip 23.2.1 from /usr/lib/python3/dist-packages/pip (python 3.11)\n");
    const UP_TO_DATE: (i32, &str) = (0, "[]\r\n");
    const OUTDATED_SETUPTOOLS: (i32, &str) = (
        0,
        r#"[{"name": "setuptools", "version": "65.1.1", "latest_version": "65.3.0", "latest_filetype": "wheel"}]
"#,
    );
    const TWO_OUTDATED: (i32, &str) = (
        0,
        r#"[{"name": "badpackage", "version": "0.1", "latest_version": "0.2", "latest_filetype": "wheel"},
 {"name": "setuptools", "version": "65.1.1", "latest_version": "65.3.0", "latest_filetype": "wheel"}]
"#,
    );

    struct Outcome {
        code: i32,
        lines: Vec<String>,
        calls: Vec<Vec<String>>,
    }

    fn simulate(argv: &[&str], captures: &[(i32, &str)], runs: &[i32], input: &str) -> Result<Outcome> {
        let args = Args::try_parse_known(std::iter::once("pip-review").chain(argv.iter().copied())).unwrap();
        let forwarded = Forwarded::partition(&args.forwarded);
        let pip = Pip::new("python3");
        let mut runner = FakeRunner::new(captures, runs);
        let mut asker = Asker::new(Cursor::new(input.as_bytes().to_vec()), Vec::new());
        let mut lines = Vec::new();
        let code = run(&args, &pip, &forwarded, &mut runner, &mut asker, |line: &str| {
            lines.push(String::from(line))
        })?;
        Ok(Outcome {
            code,
            lines,
            calls: runner.calls,
        })
    }

    fn outdated_call(forwarded: &[&str]) -> Vec<String> {
        ["python3", "-m", "pip", "list", "--outdated"]
            .iter()
            .chain(forwarded)
            .chain(&["--disable-pip-version-check", "--format=json"])
            .map(|token| String::from(*token))
            .collect()
    }

    fn install_call(tail: &[&str]) -> Vec<String> {
        ["python3", "-m", "pip", "install"]
            .iter()
            .chain(tail)
            .map(|token| String::from(*token))
            .collect()
    }

    #[test]
    fn test_everything_is_up_to_date() {
        let outcome = simulate(&[], &[PIP_VERSION, UP_TO_DATE], &[], "").unwrap();
        assert_eq!(outcome.calls[1], outdated_call(&[]));
        assert_eq!(outcome.lines, ["Everything up-to-date"]);
        assert_eq!(outcome.code, 0);
    }

    #[test]
    fn test_single_outdated_package() {
        let outcome = simulate(&[], &[PIP_VERSION, OUTDATED_SETUPTOOLS], &[], "").unwrap();
        assert_eq!(outcome.calls.len(), 2);
        assert_eq!(outcome.lines, ["setuptools==65.3.0 is available (you have 65.1.1)"]);
    }

    #[test]
    fn test_raw_option() {
        let outcome = simulate(&["--raw"], &[PIP_VERSION, OUTDATED_SETUPTOOLS], &[], "").unwrap();
        assert_eq!(outcome.lines, ["setuptools==65.3.0"]);
        assert_eq!(outcome.calls.len(), 2);
    }

    #[test]
    fn test_raw_up_to_date_is_silent() {
        let outcome = simulate(&["--raw"], &[PIP_VERSION, UP_TO_DATE], &[], "").unwrap();
        assert!(outcome.lines.is_empty());
    }

    #[test]
    fn test_forwarding_unrecognized_args() {
        let outcome = simulate(&["--timeout", "30"], &[PIP_VERSION, UP_TO_DATE], &[], "").unwrap();
        assert_eq!(outcome.calls[1], outdated_call(&["--timeout", "30"]));
        assert_eq!(outcome.lines, ["Everything up-to-date"]);
    }

    #[test]
    fn test_forwarding_unrecognized_args_fails() {
        let result = simulate(&["--bananas"], &[PIP_VERSION, (2, "")], &[], "");
        assert!(matches!(
            result,
            Err(crate::error::ReviewError::CommandFailed { code: Some(2), .. })
        ));
    }

    #[test]
    fn test_auto_up_to_date() {
        let outcome = simulate(&["--auto"], &[PIP_VERSION, UP_TO_DATE], &[], "").unwrap();
        assert_eq!(outcome.calls.len(), 2);
        assert_eq!(outcome.lines, ["Everything up-to-date"]);
    }

    #[test]
    fn test_auto_installs_in_one_batch() {
        let outcome = simulate(&["--auto", "--user"], &[PIP_VERSION, TWO_OUTDATED], &[0], "").unwrap();
        assert_eq!(outcome.calls[1], outdated_call(&["--user"]));
        assert_eq!(
            outcome.calls[2],
            install_call(&["--user", "badpackage==0.2", "setuptools==65.3.0"])
        );
        assert_eq!(outcome.calls.len(), 3);
        assert!(outcome.lines.is_empty());
    }

    #[test]
    fn test_forwarding_to_install_not_list() {
        let outcome = simulate(
            &["--auto", "--force-reinstall"],
            &[PIP_VERSION, OUTDATED_SETUPTOOLS],
            &[0],
            "",
        )
        .unwrap();
        assert_eq!(outcome.calls[1], outdated_call(&[]));
        assert_eq!(outcome.calls[2], install_call(&["--force-reinstall", "setuptools==65.3.0"]));
    }

    #[test]
    fn test_forwarding_to_list_not_install() {
        let outcome = simulate(
            &["--auto", "--not-required"],
            &[PIP_VERSION, OUTDATED_SETUPTOOLS],
            &[0],
            "",
        )
        .unwrap();
        assert_eq!(outcome.calls[1], outdated_call(&["--not-required"]));
        assert_eq!(outcome.calls[2], install_call(&["setuptools==65.3.0"]));
    }

    #[test]
    fn test_two_packages_one_failing_continue() {
        let outcome = simulate(
            &["--auto", "--continue-on-fail"],
            &[PIP_VERSION, TWO_OUTDATED],
            &[1, 0],
            "",
        )
        .unwrap();
        assert_eq!(outcome.calls[2], install_call(&["badpackage==0.2"]));
        assert_eq!(outcome.calls[3], install_call(&["setuptools==65.3.0"]));
        assert_eq!(outcome.calls.len(), 4);
        assert_eq!(outcome.code, 1);
    }

    #[test]
    fn test_install_failure_sets_exit_code() {
        let outcome = simulate(&["--auto"], &[PIP_VERSION, OUTDATED_SETUPTOOLS], &[3], "").unwrap();
        assert_eq!(outcome.code, 3);
    }

    #[test]
    fn test_interactive_yes_and_no() {
        let outcome = simulate(&["-i"], &[PIP_VERSION, TWO_OUTDATED], &[0], "n\ny\n").unwrap();
        assert_eq!(
            outcome.lines,
            [
                "badpackage==0.2 is available (you have 0.1)",
                "setuptools==65.3.0 is available (you have 65.1.1)"
            ]
        );
        assert_eq!(outcome.calls[2], install_call(&["setuptools==65.3.0"]));
    }

    #[test]
    fn test_interactive_all() {
        let outcome = simulate(&["-i"], &[PIP_VERSION, TWO_OUTDATED], &[0], "a\n").unwrap();
        assert_eq!(
            outcome.calls[2],
            install_call(&["badpackage==0.2", "setuptools==65.3.0"])
        );
    }

    #[test]
    fn test_interactive_quit_stops_queueing() {
        let outcome = simulate(&["-i"], &[PIP_VERSION, TWO_OUTDATED], &[], "q\n").unwrap();
        assert_eq!(outcome.lines.len(), 2);
        assert_eq!(outcome.calls.len(), 2);
        assert_eq!(outcome.code, 0);
    }

    #[test]
    fn test_legacy_pip() {
        let outcome = simulate(
            &[],
            &[
                (0, "pip 8.1.2 from /usr/lib/python2.7/dist-packages (python 2.7)\n"),
                (0, "setuptools (65.1.1) - Latest: 65.3.0 [wheel]\n"),
            ],
            &[],
            "",
        )
        .unwrap();
        assert_eq!(
            outcome.calls[1],
            ["python3", "-m", "pip", "list", "--outdated"]
        );
        assert_eq!(outcome.lines, ["setuptools==65.3.0 is available (you have 65.1.1)"]);
    }
}
