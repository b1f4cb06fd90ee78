//! Interactive prompting
//!
//! All user interaction goes through [`Prompter`] so the engine can be driven
//! by a terminal or by a scripted list of answers.

mod scripted;
mod terminal;

pub use scripted::ScriptedPrompter;
pub use terminal::TerminalPrompter;

use crate::auth::SecretString;
use crate::errors::Result;

/// Kind of message shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    Info,
    Warning,
    Error,
}

/// Blocking question/answer interface
pub trait Prompter {
    /// Ask for a line of text. An empty answer returns `default` when given.
    fn text(&mut self, message: &str, default: Option<&str>) -> Result<String>;

    /// Ask for a value that must not be echoed
    fn secret(&mut self, message: &str) -> Result<SecretString>;

    /// Show a message to the user
    fn say(&mut self, notice: Notice, message: &str);

    fn info(&mut self, message: &str) {
        self.say(Notice::Info, message);
    }

    fn warn(&mut self, message: &str) {
        self.say(Notice::Warning, message);
    }

    fn error(&mut self, message: &str) {
        self.say(Notice::Error, message);
    }

    /// Ask until a non-empty answer is given
    fn required_text(&mut self, message: &str, default: Option<&str>) -> Result<String> {
        loop {
            let answer = self.text(message, default)?;
            if !answer.trim().is_empty() {
                return Ok(answer);
            }
            self.warn("A value is required.");
        }
    }
}
