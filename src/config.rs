use std::{
    env,
    fs::read_to_string,
    io,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

#[cfg(windows)]
const DEFAULT_PYTHON: &str = "python";
#[cfg(not(windows))]
const DEFAULT_PYTHON: &str = "python3";

/// Mapping for `config.toml`
#[derive(Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Interpreter used as `<python> -m pip`
    pub python: Option<String>,

    /// Options passed to pip before the ones given on the command line
    pub forward: Vec<String>,
}

/// Find the configuration directory
///
/// This is either $PIP_REVIEW_CONFIG_DIR
/// or the platform config directory joined with `pip-review`
pub fn get_config_dir() -> Result<PathBuf> {
    match env::var("PIP_REVIEW_CONFIG_DIR") {
        Ok(env) => Ok(PathBuf::from(env)),
        Err(_) => Ok(dirs::config_dir()
            .ok_or(anyhow!("No config directory found"))?
            .join("pip-review")),
    }
}

/// Load `config.toml` from the config directory, falling back to defaults
/// when there is none
pub fn load_config() -> Result<Config> {
    let path = get_config_dir()?.join("config.toml");
    read_config(&path)
}

fn read_config(path: &Path) -> Result<Config> {
    let contents = match read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Config::default()),
        Err(err) => return Err(err).with_context(|| format!("Failed to read {}", path.display())),
    };
    parse_config(&contents).with_context(|| format!("Invalid config in {}", path.display()))
}

fn parse_config(contents: &str) -> Result<Config> {
    Ok(toml::from_str::<Config>(contents)?)
}

/// Pick the Python interpreter
///
/// This is either $PIP_REVIEW_PYTHON,
/// `python` from the config file if set,
/// or else the platform default
pub fn python_interpreter(config: &Config) -> String {
    resolve_python(env::var("PIP_REVIEW_PYTHON").ok(), config)
}

fn resolve_python(env: Option<String>, config: &Config) -> String {
    env.filter(|python| !python.is_empty())
        .or_else(|| config.python.clone())
        .unwrap_or_else(|| String::from(DEFAULT_PYTHON))
}
