//! Confirmation capability for destructive actions.
//!
//! Mergeback execution, worktree removal, and orphan pruning all go through
//! this seam so command logic is testable with a fixed-answer provider and
//! the `-y` flag is a one-line substitution.

use std::io::{self, BufRead, Write};

pub trait Confirmation {
    /// Ask the user a yes/no question; the default answer is no.
    fn confirm(&self, prompt: &str) -> io::Result<bool>;
}

/// Blocking single-line stdin read.
pub struct StdinConfirmation;

impl Confirmation for StdinConfirmation {
    fn confirm(&self, prompt: &str) -> io::Result<bool> {
        print!("{prompt} [y/N] ");
        io::stdout().flush()?;

        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        let answer = line.trim().to_lowercase();
        Ok(answer == "y" || answer == "yes")
    }
}

/// Fixed answer, used by `--yes` and by tests.
pub struct PresetConfirmation(pub bool);

impl Confirmation for PresetConfirmation {
    fn confirm(&self, _prompt: &str) -> io::Result<bool> {
        Ok(self.0)
    }
}
