//! Yes/no confirmation before writing into a populated output tree.

use crate::error::Result;
use std::io::{BufRead, Write};

/// Asks the user a yes/no question.
pub trait Confirm {
    fn confirm(&mut self, question: &str) -> Result<bool>;
}

/// Always answers yes (`--yes`).
#[derive(Debug, Default, Clone, Copy)]
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&mut self, _question: &str) -> Result<bool> {
        Ok(true)
    }
}

/// Line-based prompt defaulting to "no".
///
/// Accepts `yes`, `y`, `ye`, `no`, `n` in any case; an empty answer takes the
/// default and anything else asks again. End of input counts as "no".
pub struct LinePrompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> LinePrompt<R, W> {
    pub const fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl LinePrompt<std::io::StdinLock<'static>, std::io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(std::io::stdin().lock(), std::io::stdout())
    }
}

fn parse_answer(answer: &str) -> Option<bool> {
    match answer.trim().to_ascii_lowercase().as_str() {
        "" | "no" | "n" => Some(false),
        "yes" | "y" | "ye" => Some(true),
        _ => None,
    }
}

impl<R: BufRead, W: Write> Confirm for LinePrompt<R, W> {
    fn confirm(&mut self, question: &str) -> Result<bool> {
        loop {
            write!(self.output, "{question} [y/N] ")?;
            self.output.flush()?;
            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                writeln!(self.output)?;
                return Ok(false);
            }
            if let Some(answer) = parse_answer(&line) {
                return Ok(answer);
            }
            writeln!(self.output, "Please respond with 'yes' or 'no' (or 'y' or 'n').")?;
        }
    }
}
