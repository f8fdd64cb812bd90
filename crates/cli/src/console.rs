//! Interactive review prompts on stdin/stdout. A numbered menu of known
//! categories plus free-form input for new ones; an empty answer skips.

use organiser_core::review::{ReviewDecision, Reviewer};
use std::io::{self, BufRead, Write};
use std::path::Path;

#[derive(Default)]
pub struct ConsoleReviewer;

impl ConsoleReviewer {
    pub fn new() -> Self {
        Self
    }

    fn read_line(&self) -> String {
        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line).is_err() {
            return String::new();
        }
        line
    }
}

impl Reviewer for ConsoleReviewer {
    fn begin_session(&mut self, pending: usize) -> bool {
        println!();
        println!(
            "{} file{} could not be classified confidently.",
            pending,
            if pending == 1 { "" } else { "s" }
        );
        print!("Review them now? [y/N] ");
        let _ = io::stdout().flush();
        let answer = self.read_line();
        matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
    }

    fn review(&mut self, file: &Path, categories: &[String]) -> ReviewDecision {
        println!();
        println!("File: {}", file.display());
        if categories.is_empty() {
            println!("No categories yet; type a new category name.");
        } else {
            println!("Known categories:");
            for (i, category) in categories.iter().enumerate() {
                println!("  {}. {}", i + 1, category);
            }
            println!("Pick a number, type a new category name, or press Enter to skip.");
        }
        print!("> ");
        let _ = io::stdout().flush();
        let answer = self.read_line();
        parse_decision(&answer, categories)
    }
}

/// A digit selects from the menu (out-of-range digits skip), anything
/// else names a new category, leading letter capitalised. Blank skips.
pub fn parse_decision(input: &str, categories: &[String]) -> ReviewDecision {
    let input = input.trim();
    if input.is_empty() {
        return ReviewDecision::Skip;
    }
    if let Ok(index) = input.parse::<usize>() {
        return match index.checked_sub(1).and_then(|i| categories.get(i)) {
            Some(category) => ReviewDecision::Label(category.clone()),
            None => ReviewDecision::Skip,
        };
    }
    ReviewDecision::Label(capitalise(input))
}

fn capitalise(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
