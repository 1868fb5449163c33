use std::io::{self, BufRead, BufReader, Stdout, Write};

use crate::error::{ReviewError, Result};
use crate::interrupt::{interrupted, InterruptibleStdin};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Yes,
    No,
    All,
    Quit,
}

impl Answer {
    fn from_input(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "y" => Some(Self::Yes),
            "n" => Some(Self::No),
            "a" => Some(Self::All),
            "q" => Some(Self::Quit),
            _ => None,
        }
    }

    /// Whether the package asked about should be installed
    pub fn accepts(self) -> bool {
        matches!(self, Self::Yes | Self::All)
    }
}

/// Yes/No/All/Quit prompt that remembers All and Quit for the rest of the run
pub struct Asker<R, W> {
    input: R,
    output: W,
    cached: Option<Answer>,
}

impl Asker<BufReader<InterruptibleStdin>, Stdout> {
    pub fn stdio() -> Self {
        Self::new(InterruptibleStdin::buffered(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Asker<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            cached: None,
        }
    }

    pub fn ask(&mut self, prompt: &str) -> Result<Answer> {
        if let Some(answer) = self.cached {
            return Ok(answer);
        }

        let answer = loop {
            write!(self.output, "{prompt} [Y]es, [N]o, [A]ll, [Q]uit ").map_err(ReviewError::Prompt)?;
            self.output.flush().map_err(ReviewError::Prompt)?;

            let mut line = String::new();
            let read = self.input.read_line(&mut line).map_err(|err| {
                if interrupted() {
                    ReviewError::Aborted
                } else {
                    ReviewError::Prompt(err)
                }
            })?;
            if read == 0 {
                return Err(ReviewError::Aborted);
            }
            if let Some(answer) = Answer::from_input(&line) {
                break answer;
            }
        };

        if matches!(answer, Answer::All | Answer::Quit) {
            self.cached = Some(answer);
        }
        Ok(answer)
    }
}
