//! Prompter fed from a fixed list of answers

use std::collections::VecDeque;

use super::{Notice, Prompter};
use crate::auth::SecretString;
use crate::errors::{Result, SpecPulseError};

/// Answers questions from a queue and records everything shown.
///
/// Running out of answers is a prompt error, which lets callers observe
/// exactly how many questions were asked.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<String>,
    /// Every question asked, in order
    pub questions: Vec<String>,
    /// Every message shown, in order
    pub transcript: Vec<(Notice, String)>,
}

impl ScriptedPrompter {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            questions: Vec::new(),
            transcript: Vec::new(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.answers.len()
    }

    pub fn warnings(&self) -> Vec<&str> {
        self.messages(Notice::Warning)
    }

    pub fn errors(&self) -> Vec<&str> {
        self.messages(Notice::Error)
    }

    fn messages(&self, kind: Notice) -> Vec<&str> {
        self.transcript
            .iter()
            .filter(|(n, _)| *n == kind)
            .map(|(_, m)| m.as_str())
            .collect()
    }

    fn next(&mut self, message: &str) -> Result<String> {
        self.questions.push(message.to_string());
        self.answers
            .pop_front()
            .ok_or_else(|| SpecPulseError::Prompt(format!("no answer left for '{}'", message)))
    }
}

impl Prompter for ScriptedPrompter {
    fn text(&mut self, message: &str, default: Option<&str>) -> Result<String> {
        let answer = self.next(message)?;
        match (answer.is_empty(), default) {
            (true, Some(d)) => Ok(d.to_string()),
            _ => Ok(answer),
        }
    }

    fn secret(&mut self, message: &str) -> Result<SecretString> {
        self.next(message).map(SecretString::from)
    }

    fn say(&mut self, notice: Notice, message: &str) {
        self.transcript.push((notice, message.to_string()));
    }
}
