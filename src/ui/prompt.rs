//! Terminal prompt seam.
//!
//! The conflict resolver and stack coordinator only ever talk to [`Prompt`],
//! so tests can script answers and the production implementation can own all
//! terminal state. dialoguer restores the terminal on every exit path,
//! including interrupt; a cancelled prompt surfaces as [`ConflictError::Aborted`].

use crate::Result;
use crate::error::ConflictError;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Select};

pub trait Prompt: Send + Sync {
    /// Whether an interactive terminal is attached.
    fn is_interactive(&self) -> bool;

    /// Single-choice selection; returns the chosen index.
    fn select(&self, prompt: &str, items: &[String]) -> Result<usize>;

    /// Yes/no confirmation. `default` is the answer used when no terminal
    /// is attached.
    fn confirm(&self, prompt: &str, default: bool) -> Result<bool>;

    /// Positive-integer port input with a pre-filled default. Invalid
    /// entries re-prompt rather than failing.
    fn input_port(&self, prompt: &str, default: u16) -> Result<u16>;
}

pub struct TtyPrompt;

impl Prompt for TtyPrompt {
    fn is_interactive(&self) -> bool {
        console::user_attended()
    }

    fn select(&self, prompt: &str, items: &[String]) -> Result<usize> {
        let choice = Select::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .items(items)
            .default(0)
            .interact_opt()
            .map_err(|_| ConflictError::Aborted)?;
        choice.ok_or_else(|| ConflictError::Aborted.into())
    }

    fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        if !self.is_interactive() {
            return Ok(default);
        }
        let answer = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .default(default)
            .interact_opt()
            .map_err(|_| ConflictError::Aborted)?;
        answer.ok_or_else(|| ConflictError::Aborted.into())
    }

    fn input_port(&self, prompt: &str, default: u16) -> Result<u16> {
        let port = Input::<u16>::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .default(default)
            .validate_with(|port: &u16| {
                if *port > 0 {
                    Ok(())
                } else {
                    Err("port must be a positive integer")
                }
            })
            .interact_text()
            .map_err(|_| ConflictError::Aborted)?;
        Ok(port)
    }
}
