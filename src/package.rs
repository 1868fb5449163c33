use std::{fmt, str::FromStr, sync::OnceLock};

use regex::Regex;
use semver::Version;
use serde::Deserialize;

use crate::error::{ReviewError, Result};

/// An installed package with a newer release available
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OutdatedPackage {
    /// Package name
    pub name: String,

    /// Currently installed version
    pub version: String,

    /// Newest version on the index
    pub latest_version: String,
}

impl OutdatedPackage {
    /// Requirement pinning the package to its latest version, e.g. `six==1.16.0`
    pub fn pinned(&self) -> String {
        format!("{}=={}", self.name, self.latest_version)
    }
}

impl fmt::Display for OutdatedPackage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} is available (you have {})",
            self.pinned(),
            self.version
        )
    }
}

/// Output format of `pip list --outdated`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListFormat {
    /// `--format=json`, understood by pip newer than 9.0
    Json,
    /// `name (version) - Latest: X.Y.Z [wheel]`
    Legacy,
}

impl ListFormat {
    pub fn for_pip(version: &Version) -> Self {
        if version > &Version::new(9, 0, 0) {
            Self::Json
        } else {
            Self::Legacy
        }
    }

    pub fn parse(self, output: &str) -> Result<Vec<OutdatedPackage>> {
        match self {
            Self::Json => parse_json(output),
            Self::Legacy => parse_legacy(output),
        }
    }
}

pub fn parse_json(output: &str) -> Result<Vec<OutdatedPackage>> {
    Ok(serde_json::from_str(output.trim())?)
}

pub fn parse_legacy(output: &str) -> Result<Vec<OutdatedPackage>> {
    output
        .trim()
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(OutdatedPackage::from_str)
        .collect()
}

fn legacy_patterns() -> &'static (Regex, Regex, Regex) {
    static PATTERNS: OnceLock<(Regex, Regex, Regex)> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        (
            Regex::new(r"^[a-zA-Z0-9\-]+").expect("valid name regex"),
            Regex::new(r"\(([0-9a-zA-Z.]+)\)").expect("valid version regex"),
            Regex::new(r"^[0-9a-zA-Z.]+").expect("valid latest version regex"),
        )
    })
}

impl FromStr for OutdatedPackage {
    type Err = ReviewError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let malformed = || ReviewError::Parse {
            line: String::from(s),
        };
        let (name_re, version_re, latest_re) = legacy_patterns();

        let (installed, latest) = s.split_once(" - ").ok_or_else(malformed)?;
        let name = name_re.find(installed).ok_or_else(malformed)?.as_str();
        let version = version_re
            .captures(installed)
            .and_then(|caps| caps.get(1))
            .ok_or_else(malformed)?
            .as_str();
        let (_, latest) = latest.split_once(':').ok_or_else(malformed)?;
        let latest_version = latest_re
            .find(latest.trim())
            .ok_or_else(malformed)?
            .as_str();

        Ok(Self {
            name: String::from(name),
            version: String::from(version),
            latest_version: String::from(latest_version),
        })
    }
}

/// Read the version out of `pip --version`, e.g. `pip 23.2.1 from /usr/lib/... (python 3.11)`
///
/// pip versions are not always three numeric parts (`9.0`, `10.0.0b1`), so
/// missing parts count as zero and suffixes are ignored.
pub fn pip_version(output: &str) -> Result<Version> {
    let invalid = || ReviewError::PipVersion {
        output: String::from(output.trim()),
    };
    let raw = output
        .split_whitespace()
        .skip_while(|word| *word != "pip")
        .nth(1)
        .ok_or_else(invalid)?;

    let mut parts = raw.split('.').map(|part| {
        let digits: String = part.chars().take_while(char::is_ascii_digit).collect();
        digits.parse::<u64>().ok()
    });
    let major = parts.next().flatten().ok_or_else(invalid)?;
    let minor = parts.next().flatten().unwrap_or(0);
    let patch = parts.next().flatten().unwrap_or(0);
    Ok(Version::new(major, minor, patch))
}
