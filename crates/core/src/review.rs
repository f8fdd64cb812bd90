//! Human-in-the-loop labelling, abstracted so the interactive console is
//! just one implementation and tests can script decisions.

use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewDecision {
    /// Assign this label, persist it as a training example and move the
    /// file to the matching category.
    Label(String),
    /// Decline to classify: the file goes to the sentinel category and
    /// nothing is written to the label store.
    Skip,
}

pub trait Reviewer {
    /// Called once before any prompts with the number of pending files.
    /// Returning false sends every pending file to the sentinel category
    /// without further prompts.
    fn begin_session(&mut self, pending: usize) -> bool;

    /// Decide one file. `categories` lists the labels known so far,
    /// including any created earlier in this session.
    fn review(&mut self, file: &Path, categories: &[String]) -> ReviewDecision;
}
