use serde::Serialize;
use std::path::PathBuf;

/// Reserved label for files a human explicitly declined to classify.
/// Never written to the label store.
pub const UNCATEGORISED_LABEL: &str = "Uncategorised";

#[derive(Debug, Clone)]
pub struct ClassificationResult {
    pub path: PathBuf,
    pub text: String,
    pub label: String,
    pub confidence: f32,
}

#[derive(Debug, Default, Serialize)]
pub struct OrganiseSummary {
    pub scanned: usize,
    pub confident: usize,
    /// Files actually presented to the reviewer; zero when the session
    /// was declined.
    pub reviewed: usize,
    pub uncategorised: usize,
    pub moved: usize,
    pub failed: usize,
    pub dry_run: bool,
}

/// One row of the `distances` report: a file's closest training example.
#[derive(Debug, Clone, Serialize)]
pub struct NearestRow {
    pub file: PathBuf,
    pub text: String,
    pub example: String,
    pub label: String,
    pub distance: f32,
}
