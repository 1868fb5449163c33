use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReviewError {
    #[error("`{command}` exited with {}\n{output}", exit_code(.code))]
    CommandFailed {
        command: String,
        code: Option<i32>,
        output: String,
    },

    #[error("failed to run `{command}`")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("unexpected line in pip output: {line:?}")]
    Parse { line: String },

    #[error("invalid JSON from pip")]
    Json(#[from] serde_json::Error),

    #[error("could not read pip version from {output:?}")]
    PipVersion { output: String },

    #[error("could not read answer")]
    Prompt(#[source] io::Error),

    #[error("aborted")]
    Aborted,
}

fn exit_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => String::from("a signal"),
    }
}

pub type Result<T> = std::result::Result<T, ReviewError>;
