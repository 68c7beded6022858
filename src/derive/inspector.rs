//! Manual crop inspection.
//!
//! Black borders are found by a person looking at the picture. The terminal
//! inspector opens a viewer on the staged recording and then asks for the
//! four edges; tests script the answers instead.

use dialoguer::console::Term;
use dialoguer::Input;
use dvrflow_av::{TemplateContext, ToolCommand};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::path::Path;

/// What the operator decided for one recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CropAnswer {
    /// Left, top, right, bottom as entered. Negative values mean no crop.
    Crop([i64; 4]),
    /// Drop the recording entirely.
    Skip,
    /// No answer could be obtained (viewer failed, no terminal).
    Unavailable,
}

/// Source of crop decisions.
pub trait CropInspector: Send + Sync {
    fn inspect(&self, title: &str, sample: &Path) -> CropAnswer;
}

/// One parsed prompt reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Value(i64),
    Skip,
}

/// Parse a reply to a crop prompt: an integer, or `skip`/`s`.
pub fn parse_reply(input: &str) -> Result<Reply, String> {
    let input = input.trim();
    if input.eq_ignore_ascii_case("skip") || input.eq_ignore_ascii_case("s") {
        return Ok(Reply::Skip);
    }
    input
        .parse::<i64>()
        .map(Reply::Value)
        .map_err(|_| format!("'{input}' is not a number (or 'skip')"))
}

/// Launches the configured viewer, then prompts on the controlling terminal.
#[derive(Debug, Clone)]
pub struct TerminalInspector {
    command: Vec<String>,
}

impl TerminalInspector {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }

    /// Run the viewer and wait for it to close. `false` if it failed.
    fn run_viewer(&self, title: &str, sample: &Path) -> bool {
        let ctx = TemplateContext::new()
            .with_input(sample)
            .with_var("title", title);
        let argv = ctx.substitute_all(&self.command);
        let Some((program, args)) = argv.split_first() else {
            return true;
        };

        match ToolCommand::new(program).args(args).status() {
            Ok(status) if status.success() => true,
            Ok(status) => {
                tracing::warn!("Crop viewer exited with {}", status);
                false
            }
            Err(e) => {
                tracing::warn!("Crop viewer could not run: {}", e);
                false
            }
        }
    }

    fn ask(&self, prompt: &str) -> std::io::Result<Reply> {
        let answer: String = Input::new()
            .with_prompt(prompt)
            .validate_with(|s: &String| parse_reply(s).map(|_| ()))
            .interact_text_on(&Term::stderr())
            .map_err(|e| std::io::Error::other(e.to_string()))?;
        parse_reply(&answer).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))
    }

    fn prompt_edges(&self, title: &str) -> std::io::Result<CropAnswer> {
        eprintln!("Crop for '{title}' ('skip' drops the recording)");

        let mut values = [0i64; 4];
        let prompts = [
            "Left crop? (0 means no crop, -1 for no crop at all)",
            "Top crop? (0 means no crop, -1 for no crop at all)",
            "Right crop? (0 means no crop)",
            "Bottom crop? (0 means no crop)",
        ];
        for (i, prompt) in prompts.iter().enumerate() {
            match self.ask(prompt)? {
                Reply::Skip => return Ok(CropAnswer::Skip),
                Reply::Value(v) if v < 0 => {
                    values[i] = v;
                    return Ok(CropAnswer::Crop(values));
                }
                Reply::Value(v) => values[i] = v,
            }
        }
        Ok(CropAnswer::Crop(values))
    }
}

impl CropInspector for TerminalInspector {
    fn inspect(&self, title: &str, sample: &Path) -> CropAnswer {
        if !self.run_viewer(title, sample) {
            return CropAnswer::Unavailable;
        }
        match self.prompt_edges(title) {
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!("Crop prompt failed: {}", e);
                CropAnswer::Unavailable
            }
        }
    }
}

/// Replays a fixed list of answers. Once exhausted it answers `Unavailable`.
#[derive(Debug, Default)]
pub struct ScriptedInspector {
    answers: Mutex<VecDeque<CropAnswer>>,
    asked: Mutex<Vec<String>>,
}

impl ScriptedInspector {
    pub fn new(answers: Vec<CropAnswer>) -> Self {
        Self {
            answers: Mutex::new(answers.into()),
            asked: Mutex::new(Vec::new()),
        }
    }

    /// How many times an answer was requested.
    pub fn prompts(&self) -> usize {
        self.asked.lock().len()
    }

    /// Titles inspected so far, in order.
    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().clone()
    }
}

impl CropInspector for ScriptedInspector {
    fn inspect(&self, title: &str, _sample: &Path) -> CropAnswer {
        self.asked.lock().push(title.to_string());
        self.answers
            .lock()
            .pop_front()
            .unwrap_or(CropAnswer::Unavailable)
    }
}
