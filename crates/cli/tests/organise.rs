use organiser_core::config::{
    AppConfig, ClassificationConfig, DataConfig, EmbeddingConfig, OrganiseConfig, ScanPaths,
};
use organiser_core::pipeline::{self, OrganiseOptions};
use organiser_core::review::{ReviewDecision, Reviewer};
use std::fs;
use std::path::{Path, PathBuf};
use storage::labels::{LabelStore, TrainingSet, TRAINING_LABELS_FILE};
use tempfile::tempdir;

/// Replays canned decisions in order and records what it was shown.
struct ScriptedReviewer {
    accept_session: bool,
    decisions: Vec<ReviewDecision>,
    reviewed: Vec<PathBuf>,
    session_started: bool,
}

impl ScriptedReviewer {
    fn accepting(decisions: Vec<ReviewDecision>) -> Self {
        Self {
            accept_session: true,
            decisions,
            reviewed: Vec::new(),
            session_started: false,
        }
    }

    fn declining() -> Self {
        Self {
            accept_session: false,
            decisions: Vec::new(),
            reviewed: Vec::new(),
            session_started: false,
        }
    }
}

impl Reviewer for ScriptedReviewer {
    fn begin_session(&mut self, _pending: usize) -> bool {
        self.session_started = true;
        self.accept_session
    }

    fn review(&mut self, file: &Path, _categories: &[String]) -> ReviewDecision {
        self.reviewed.push(file.to_path_buf());
        if self.decisions.is_empty() {
            ReviewDecision::Skip
        } else {
            self.decisions.remove(0)
        }
    }
}

fn test_config(data_dir: &Path) -> AppConfig {
    AppConfig {
        data: DataConfig {
            dir: data_dir.to_string_lossy().into_owned(),
        },
        scan: ScanPaths {
            source: None,
            exclude: vec![],
        },
        organise: OrganiseConfig {
            dest: "Organised".to_string(),
        },
        embeddings: EmbeddingConfig {
            provider: "hashed".to_string(),
            model: "hashed-8192".to_string(),
            batch_size: 8,
            dimension: 8192,
        },
        classification: ClassificationConfig {
            threshold: 0.5,
            neighbors: 1,
        },
    }
}

fn write_seed(data_dir: &Path) {
    fs::create_dir_all(data_dir).unwrap();
    let seed = TrainingSet {
        examples: vec!["bank statement".to_string(), "passport scan".to_string()],
        labels: vec!["Finance".to_string(), "ID".to_string()],
    };
    fs::write(
        data_dir.join(TRAINING_LABELS_FILE),
        serde_json::to_string(&seed).unwrap(),
    )
    .unwrap();
}

fn options(source: &Path, dest: &Path) -> OrganiseOptions {
    OrganiseOptions {
        source: source.to_path_buf(),
        dest: dest.to_path_buf(),
        threshold: 0.5,
        dry_run: false,
        retrain: false,
    }
}

#[tokio::test]
async fn confident_files_move_without_review() {
    let temp = tempdir().unwrap();
    let data_dir = temp.path().join("data");
    let src = temp.path().join("inbox");
    let dest = temp.path().join("organised");
    write_seed(&data_dir);
    fs::create_dir_all(&src).unwrap();
    fs::write(src.join("statement.txt"), "recent bank statement").unwrap();

    let cfg = test_config(&data_dir);
    let registry = pipeline::build_registry(&cfg);
    let mut reviewer = ScriptedReviewer::accepting(vec![]);
    let summary = pipeline::run_organise(&cfg, &options(&src, &dest), &registry, &mut reviewer)
        .await
        .unwrap();

    assert_eq!(summary.scanned, 1);
    assert_eq!(summary.confident, 1);
    assert_eq!(summary.reviewed, 0);
    assert_eq!(summary.moved, 1);
    assert!(!reviewer.session_started);
    assert!(dest.join("Finance").join("statement.txt").exists());
    assert!(!src.join("statement.txt").exists());
}

#[tokio::test]
async fn uncertain_file_is_reviewed_and_correction_persists() {
    let temp = tempdir().unwrap();
    let data_dir = temp.path().join("data");
    let src = temp.path().join("inbox");
    let dest = temp.path().join("organised");
    write_seed(&data_dir);
    fs::create_dir_all(&src).unwrap();
    fs::write(src.join("lease.txt"), "tenancy agreement").unwrap();

    let cfg = test_config(&data_dir);
    let registry = pipeline::build_registry(&cfg);
    let mut reviewer =
        ScriptedReviewer::accepting(vec![ReviewDecision::Label("Legal".to_string())]);
    let summary = pipeline::run_organise(&cfg, &options(&src, &dest), &registry, &mut reviewer)
        .await
        .unwrap();

    assert_eq!(summary.reviewed, 1);
    assert_eq!(summary.moved, 1);
    assert_eq!(reviewer.reviewed, vec![src.join("lease.txt")]);
    assert!(dest.join("Legal").join("lease.txt").exists());

    let training = LabelStore::new(&data_dir).load_or_initialize().unwrap();
    assert_eq!(training.examples, vec!["tenancy agreement"]);
    assert_eq!(training.labels, vec!["Legal"]);
}

#[tokio::test]
async fn skipped_file_goes_to_sentinel_without_a_label() {
    let temp = tempdir().unwrap();
    let data_dir = temp.path().join("data");
    let src = temp.path().join("inbox");
    let dest = temp.path().join("organised");
    write_seed(&data_dir);
    fs::create_dir_all(&src).unwrap();
    fs::write(src.join("mystery.txt"), "garden soil ph levels").unwrap();

    let cfg = test_config(&data_dir);
    let registry = pipeline::build_registry(&cfg);
    let mut reviewer = ScriptedReviewer::accepting(vec![ReviewDecision::Skip]);
    let summary = pipeline::run_organise(&cfg, &options(&src, &dest), &registry, &mut reviewer)
        .await
        .unwrap();

    assert_eq!(summary.uncategorised, 1);
    assert!(dest.join("Uncategorised").join("mystery.txt").exists());
    // Skips never become training data.
    assert!(!data_dir.join("labels.json").exists());
}

#[tokio::test]
async fn declined_session_sends_all_pending_to_sentinel() {
    let temp = tempdir().unwrap();
    let data_dir = temp.path().join("data");
    let src = temp.path().join("inbox");
    let dest = temp.path().join("organised");
    write_seed(&data_dir);
    fs::create_dir_all(&src).unwrap();
    fs::write(src.join("a.txt"), "garden soil ph levels").unwrap();
    fs::write(src.join("b.txt"), "holiday packing checklist").unwrap();

    let cfg = test_config(&data_dir);
    let registry = pipeline::build_registry(&cfg);
    let mut reviewer = ScriptedReviewer::declining();
    let summary = pipeline::run_organise(&cfg, &options(&src, &dest), &registry, &mut reviewer)
        .await
        .unwrap();

    assert!(reviewer.session_started);
    assert!(reviewer.reviewed.is_empty());
    assert_eq!(summary.reviewed, 0);
    assert_eq!(summary.uncategorised, 2);
    assert!(dest.join("Uncategorised").join("a.txt").exists());
    assert!(dest.join("Uncategorised").join("b.txt").exists());
}

#[tokio::test]
async fn dry_run_mutates_nothing() {
    let temp = tempdir().unwrap();
    let data_dir = temp.path().join("data");
    let src = temp.path().join("inbox");
    let dest = temp.path().join("organised");
    write_seed(&data_dir);
    fs::create_dir_all(&src).unwrap();
    fs::write(src.join("statement.txt"), "recent bank statement").unwrap();
    fs::write(src.join("lease.txt"), "tenancy agreement").unwrap();

    let cfg = test_config(&data_dir);
    let registry = pipeline::build_registry(&cfg);
    let mut opts = options(&src, &dest);
    opts.dry_run = true;
    let mut reviewer =
        ScriptedReviewer::accepting(vec![ReviewDecision::Label("Legal".to_string())]);
    let summary = pipeline::run_organise(&cfg, &opts, &registry, &mut reviewer)
        .await
        .unwrap();

    assert!(summary.dry_run);
    assert_eq!(summary.moved, 0);
    assert!(src.join("statement.txt").exists());
    assert!(src.join("lease.txt").exists());
    assert!(!dest.exists());
    assert!(!data_dir.join("labels.json").exists());
    // Training happened in memory only.
    assert!(!data_dir.join("model").exists());
}

#[tokio::test]
async fn corrections_make_the_next_run_confident() {
    let temp = tempdir().unwrap();
    let data_dir = temp.path().join("data");
    let src = temp.path().join("inbox");
    let dest = temp.path().join("organised");
    write_seed(&data_dir);
    fs::create_dir_all(&src).unwrap();
    fs::write(src.join("lease.txt"), "tenancy agreement").unwrap();

    let cfg = test_config(&data_dir);
    let registry = pipeline::build_registry(&cfg);

    let mut reviewer =
        ScriptedReviewer::accepting(vec![ReviewDecision::Label("Legal".to_string())]);
    pipeline::run_organise(&cfg, &options(&src, &dest), &registry, &mut reviewer)
        .await
        .unwrap();
    assert_eq!(reviewer.reviewed.len(), 1);

    // Second batch contains the same kind of document.
    fs::write(src.join("renewal.txt"), "tenancy agreement").unwrap();
    let mut opts = options(&src, &dest);
    opts.retrain = true;
    let mut reviewer = ScriptedReviewer::accepting(vec![]);
    let summary = pipeline::run_organise(&cfg, &opts, &registry, &mut reviewer)
        .await
        .unwrap();

    assert!(!reviewer.session_started);
    assert_eq!(summary.confident, 1);
    assert!(dest.join("Legal").join("renewal.txt").exists());
}

#[tokio::test]
async fn no_training_data_is_a_fatal_error() {
    let temp = tempdir().unwrap();
    let data_dir = temp.path().join("data");
    let src = temp.path().join("inbox");
    fs::create_dir_all(&data_dir).unwrap();
    fs::create_dir_all(&src).unwrap();
    fs::write(src.join("doc.txt"), "anything").unwrap();

    let cfg = test_config(&data_dir);
    let registry = pipeline::build_registry(&cfg);
    let mut reviewer = ScriptedReviewer::accepting(vec![]);
    let err = pipeline::run_organise(
        &cfg,
        &options(&src, &temp.path().join("organised")),
        &registry,
        &mut reviewer,
    )
    .await
    .unwrap_err();

    assert!(err.to_string().contains("no training data"));
    assert!(src.join("doc.txt").exists());
}

#[tokio::test]
async fn distances_report_lists_nearest_examples_sorted() {
    let temp = tempdir().unwrap();
    let data_dir = temp.path().join("data");
    let src = temp.path().join("inbox");
    write_seed(&data_dir);
    fs::create_dir_all(&src).unwrap();
    fs::write(src.join("exact.txt"), "bank statement").unwrap();
    fs::write(src.join("far.txt"), "garden soil ph levels").unwrap();

    let cfg = test_config(&data_dir);
    let registry = pipeline::build_registry(&cfg);
    let rows = pipeline::nearest_report(&cfg, &registry, &src).await.unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].file, src.join("exact.txt"));
    assert_eq!(rows[0].label, "Finance");
    assert_eq!(rows[0].example, "bank statement");
    assert!(rows[0].distance < 1e-5);
    assert!(rows[1].distance > rows[0].distance);
}

#[tokio::test]
async fn corrupt_model_artifacts_trigger_retraining() {
    let temp = tempdir().unwrap();
    let data_dir = temp.path().join("data");
    let src = temp.path().join("inbox");
    let dest = temp.path().join("organised");
    write_seed(&data_dir);
    fs::create_dir_all(&src).unwrap();
    fs::write(src.join("statement.txt"), "recent bank statement").unwrap();

    let cfg = test_config(&data_dir);
    let registry = pipeline::build_registry(&cfg);
    pipeline::train_model(&cfg, &registry).await.unwrap();
    // Simulate a crash that left garbage behind.
    fs::write(data_dir.join("model").join("model.json"), "{corrupt").unwrap();

    let mut reviewer = ScriptedReviewer::accepting(vec![]);
    let summary = pipeline::run_organise(&cfg, &options(&src, &dest), &registry, &mut reviewer)
        .await
        .unwrap();

    assert_eq!(summary.confident, 1);
    assert!(dest.join("Finance").join("statement.txt").exists());
    // The retrained model was saved over the garbage.
    let rewritten = fs::read_to_string(data_dir.join("model").join("model.json")).unwrap();
    assert!(serde_json::from_str::<serde_json::Value>(&rewritten).is_ok());
}

#[tokio::test]
async fn failed_moves_are_counted_and_do_not_abort_the_run() {
    let temp = tempdir().unwrap();
    let data_dir = temp.path().join("data");
    let src = temp.path().join("inbox");
    let dest = temp.path().join("organised");
    write_seed(&data_dir);
    fs::create_dir_all(&src).unwrap();
    fs::write(src.join("statement.txt"), "recent bank statement").unwrap();
    fs::write(src.join("passport.txt"), "passport scan").unwrap();
    // A file where the Finance category directory should go blocks that move.
    fs::create_dir_all(&dest).unwrap();
    fs::write(dest.join("Finance"), "blocker").unwrap();

    let cfg = test_config(&data_dir);
    let registry = pipeline::build_registry(&cfg);
    let mut reviewer = ScriptedReviewer::accepting(vec![]);
    let summary = pipeline::run_organise(&cfg, &options(&src, &dest), &registry, &mut reviewer)
        .await
        .unwrap();

    assert_eq!(summary.confident, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.moved, 1);
    assert!(src.join("statement.txt").exists());
    assert!(dest.join("ID").join("passport.txt").exists());
}

#[tokio::test]
async fn train_command_writes_model_artifacts() {
    let temp = tempdir().unwrap();
    let data_dir = temp.path().join("data");
    write_seed(&data_dir);

    let cfg = test_config(&data_dir);
    let registry = pipeline::build_registry(&cfg);
    let count = pipeline::train_model(&cfg, &registry).await.unwrap();

    assert_eq!(count, 2);
    for artifact in ["model.json", "embeddings.json", "metadata.json"] {
        assert!(data_dir.join("model").join(artifact).exists());
    }
}
