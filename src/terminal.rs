//! Line input for the interactive loop.
//!
//! The loop only sees [`LineSource`]; raw mode, echo, editing, history recall and tab
//! completion are left to `rustyline` behind [`Terminal`].

use crate::completion::Completions;
use anyhow::Result;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{CompletionType, Context, Editor, Helper};

/// Result of asking the terminal for one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A finished line, without the trailing newline. May be empty.
    Line(String),
    /// Ctrl-C at the prompt.
    Interrupted,
    /// Ctrl-D or the end of piped input.
    Eof,
}

/// Supplies finished lines to the interactive loop.
pub trait LineSource {
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome>;

    /// Keep an accepted line so it can be recalled later.
    fn remember(&mut self, line: &str);
}

/// Tab completion hook for rustyline.
pub struct ShellHelper {
    completions: Completions,
}

impl ShellHelper {
    pub fn new(completions: Completions) -> Self {
        Self { completions }
    }
}

impl Completer for ShellHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let (start, candidates) = self.completions.for_line(&line[..pos]);
        let pairs = candidates
            .into_iter()
            .map(|candidate| Pair {
                display: candidate.clone(),
                replacement: candidate,
            })
            .collect();
        Ok((start, pairs))
    }
}

impl Hinter for ShellHelper {
    type Hint = String;
}

impl Highlighter for ShellHelper {}

impl Validator for ShellHelper {}

impl Helper for ShellHelper {}

/// The interactive terminal, backed by a rustyline editor.
pub struct Terminal {
    editor: Editor<ShellHelper, DefaultHistory>,
}

impl Terminal {
    pub fn new(history_size: usize, completions: Completions) -> Result<Self> {
        let config = rustyline::Config::builder()
            .max_history_size(history_size)?
            .auto_add_history(false)
            .completion_type(CompletionType::List)
            .build();
        let mut editor = Editor::with_config(config)?;
        editor.set_helper(Some(ShellHelper::new(completions)));
        Ok(Self { editor })
    }
}

impl LineSource for Terminal {
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome> {
        match self.editor.readline(prompt) {
            Ok(line) => Ok(ReadOutcome::Line(line)),
            Err(ReadlineError::Interrupted) => Ok(ReadOutcome::Interrupted),
            Err(ReadlineError::Eof) => Ok(ReadOutcome::Eof),
            Err(err) => Err(err.into()),
        }
    }

    fn remember(&mut self, line: &str) {
        if let Err(e) = self.editor.add_history_entry(line) {
            log::warn!("can't add {:?} to history: {}", line, e);
        }
    }
}
