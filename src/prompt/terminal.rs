//! Terminal prompter
//!
//! Prompts are written to stderr so stdout only carries responses. On a TTY
//! dialoguer drives the input; when stdin is piped, plain lines are read.

use std::io::{self, BufRead, Write};

use console::style;
use dialoguer::{Input, Password};

use super::{Notice, Prompter};
use crate::auth::SecretString;
use crate::errors::{Result, SpecPulseError};
use crate::signals;

pub struct TerminalPrompter {
    interactive: bool,
    colors: bool,
}

impl TerminalPrompter {
    pub fn new(stdin_isatty: bool, stderr_isatty: bool) -> Self {
        Self {
            interactive: stdin_isatty,
            colors: stderr_isatty,
        }
    }

    fn read_line(&self, message: &str, default: Option<&str>) -> Result<String> {
        let mut stderr = io::stderr();
        match default {
            Some(d) => write!(stderr, "{} [{}]: ", message, d)?,
            None => write!(stderr, "{}: ", message)?,
        }
        stderr.flush().ok();

        let mut line = String::new();
        let read = io::stdin().lock().read_line(&mut line)?;
        if read == 0 {
            return Err(SpecPulseError::Prompt("end of input".to_string()));
        }
        let answer = line.trim_end_matches(['\r', '\n']).to_string();
        if answer.is_empty() {
            Ok(default.unwrap_or_default().to_string())
        } else {
            Ok(answer)
        }
    }
}

fn map_dialoguer(err: dialoguer::Error) -> SpecPulseError {
    let message = err.to_string();
    if signals::was_interrupted() || message.to_ascii_lowercase().contains("interrupt") {
        SpecPulseError::Interrupted
    } else {
        SpecPulseError::Prompt(message)
    }
}

impl Prompter for TerminalPrompter {
    fn text(&mut self, message: &str, default: Option<&str>) -> Result<String> {
        if signals::was_interrupted() {
            return Err(SpecPulseError::Interrupted);
        }
        if !self.interactive {
            return self.read_line(message, default);
        }

        let term = dialoguer::console::Term::stderr();
        let mut input = Input::<String>::new().with_prompt(message).allow_empty(true);
        if let Some(d) = default {
            input = input.default(d.to_string());
        }
        input.interact_text_on(&term).map_err(map_dialoguer)
    }

    fn secret(&mut self, message: &str) -> Result<SecretString> {
        if signals::was_interrupted() {
            return Err(SpecPulseError::Interrupted);
        }
        if !self.interactive {
            return self.read_line(message, None).map(SecretString::from);
        }

        let term = dialoguer::console::Term::stderr();
        Password::new()
            .with_prompt(message)
            .allow_empty_password(true)
            .interact_on(&term)
            .map(SecretString::from)
            .map_err(map_dialoguer)
    }

    fn say(&mut self, notice: Notice, message: &str) {
        let line = match (notice, self.colors) {
            (Notice::Info, _) => message.to_string(),
            (Notice::Warning, true) => format!("{} {}", style("Warning:").yellow().bold(), message),
            (Notice::Warning, false) => format!("Warning: {}", message),
            (Notice::Error, true) => style(message).red().to_string(),
            (Notice::Error, false) => message.to_string(),
        };
        eprintln!("{}", line);
    }
}
