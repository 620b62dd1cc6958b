use std::{
    borrow::Cow,
    io::{self, BufRead, IsTerminal, Write},
};

use anyhow::{Context, Result, bail};
use reedline::{Prompt, PromptEditMode, PromptHistorySearch, Reedline, Signal};
use regex::Regex;

lazy_static::lazy_static! {
    static ref CONFIRM_YES_RE: Regex = Regex::new(r"(?i)^y(es)?$|^$").unwrap();
}

/// Empty input, `y` and `yes` (any case) confirm.
pub fn is_confirmation(answer: &str) -> bool {
    CONFIRM_YES_RE.is_match(answer.trim())
}

/// Source of interactive answers.
pub trait Prompter {
    /// Asks for one line. `None` means the user closed input.
    fn ask(&mut self, label: &str) -> Result<Option<String>>;

    fn confirm(&mut self, question: &str) -> Result<bool> {
        Ok(self
            .ask(&format!("{question} (Y/n): "))?
            .is_some_and(|answer| is_confirmation(&answer)))
    }
}

/// Prompt that shows a fixed label and nothing else.
pub struct FieldPrompt {
    label: String,
}

impl FieldPrompt {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
        }
    }
}

impl Prompt for FieldPrompt {
    fn render_prompt_left(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.label)
    }

    fn render_prompt_right(&self) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_indicator(&self, _mode: PromptEditMode) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_multiline_indicator(&self) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_history_search_indicator(&self, _history_search: PromptHistorySearch) -> Cow<'_, str> {
        Cow::Borrowed("")
    }
}

/// Reads answers with reedline on a terminal and plain lines otherwise.
pub struct TerminalPrompter {
    editor: Option<Reedline>,
}

impl TerminalPrompter {
    pub fn new() -> Self {
        let editor = io::stdin().is_terminal().then(Reedline::create);
        Self { editor }
    }
}

impl Default for TerminalPrompter {
    fn default() -> Self {
        Self::new()
    }
}

impl Prompter for TerminalPrompter {
    fn ask(&mut self, label: &str) -> Result<Option<String>> {
        let Some(editor) = self.editor.as_mut() else {
            eprint!("{label}");
            io::stderr().flush()?;
            return read_line(&mut io::stdin().lock());
        };

        match editor.read_line(&FieldPrompt::new(label)).context("reading input")? {
            Signal::Success(line) => Ok(Some(line)),
            Signal::CtrlD => Ok(None),
            Signal::CtrlC => bail!("interrupted"),
            _ => Ok(None),
        }
    }
}

fn read_line(input: &mut impl BufRead) -> Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line).context("reading input")? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\n', '\r']).to_string()))
}
