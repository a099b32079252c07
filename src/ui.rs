//! The user-interface collaborator answering log and input requests.

use crate::command::{LogLevel, UiCommand};
use std::collections::VecDeque;

/// Handles [`UiCommand`]s on the simulation thread.
///
/// Input requests return `None` when the user dismisses them.
pub trait UserInterface {
    fn log(&mut self, title: &str, text: &str, level: LogLevel);

    fn get_integer(&mut self, title: &str, label: &str, default: i32) -> Option<i32>;

    fn get_double(&mut self, title: &str, label: &str, default: f64) -> Option<f64>;

    fn get_string(&mut self, title: &str, label: &str, default: &str) -> Option<String>;

    /// Dispatches `command`, returning the reply payload and whether it is valid.
    fn handle(&mut self, command: &UiCommand) -> (UiCommand, bool) {
        match command {
            UiCommand::Log { title, text, level } => {
                self.log(title, text, *level);
                (command.clone(), true)
            }
            UiCommand::GetInteger { title, label, value } => {
                let answer = self.get_integer(title, label, *value);
                let reply = UiCommand::GetInteger {
                    title: title.clone(),
                    label: label.clone(),
                    value: answer.unwrap_or(*value),
                };
                (reply, answer.is_some())
            }
            UiCommand::GetDouble { title, label, value } => {
                let answer = self.get_double(title, label, *value);
                let reply = UiCommand::GetDouble {
                    title: title.clone(),
                    label: label.clone(),
                    value: answer.unwrap_or(*value),
                };
                (reply, answer.is_some())
            }
            UiCommand::GetString { title, label, value } => {
                let answer = self.get_string(title, label, value);
                let valid = answer.is_some();
                let reply = UiCommand::GetString {
                    title: title.clone(),
                    label: label.clone(),
                    value: answer.unwrap_or_else(|| value.clone()),
                };
                (reply, valid)
            }
        }
    }
}

/// A scripted answer for [`HeadlessUi`].
#[derive(Clone, Debug, PartialEq)]
pub enum Answer {
    Integer(i32),
    Double(f64),
    Text(String),
    /// Dismiss the request.
    Cancel,
    /// Accept the default value.
    Default,
}

/// A non-interactive interface: logs through the `log` crate, records every
/// line, and answers input requests from a queue (or with their defaults).
#[derive(Clone, Debug, Default)]
pub struct HeadlessUi {
    answers: VecDeque<Answer>,
    lines: Vec<String>,
}

impl HeadlessUi {
    /// Answers every request with its default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers requests from `answers` in order, then with defaults.
    pub fn with_answers(answers: impl IntoIterator<Item = Answer>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            lines: Vec::new(),
        }
    }

    /// Queues one more answer.
    pub fn push_answer(&mut self, answer: Answer) {
        self.answers.push_back(answer);
    }

    /// Every logged line, formatted as `title: text`.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    fn next_answer(&mut self) -> Answer {
        self.answers.pop_front().unwrap_or(Answer::Default)
    }
}

impl UserInterface for HeadlessUi {
    fn log(&mut self, title: &str, text: &str, level: LogLevel) {
        let line = if title.is_empty() {
            text.to_owned()
        } else {
            format!("{title}: {text}")
        };
        log::log!(log::Level::from(level), "{line}");
        self.lines.push(line);
    }

    fn get_integer(&mut self, _title: &str, label: &str, default: i32) -> Option<i32> {
        match self.next_answer() {
            Answer::Integer(value) => Some(value),
            Answer::Cancel => None,
            other => {
                log::debug!("answering '{label}' with default {default} (got {other:?})");
                Some(default)
            }
        }
    }

    fn get_double(&mut self, _title: &str, label: &str, default: f64) -> Option<f64> {
        match self.next_answer() {
            Answer::Double(value) => Some(value),
            Answer::Integer(value) => Some(f64::from(value)),
            Answer::Cancel => None,
            other => {
                log::debug!("answering '{label}' with default {default} (got {other:?})");
                Some(default)
            }
        }
    }

    fn get_string(&mut self, _title: &str, label: &str, default: &str) -> Option<String> {
        match self.next_answer() {
            Answer::Text(value) => Some(value),
            Answer::Cancel => None,
            other => {
                log::debug!("answering '{label}' with default {default:?} (got {other:?})");
                Some(default.to_owned())
            }
        }
    }
}
