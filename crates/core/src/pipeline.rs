//! The organise pipeline: load or train the classifier, scan the source,
//! route confident files straight to their category folders, walk the
//! human through the uncertain ones and feed corrections back into the
//! label store.
//!
//! Everything runs sequentially in scan order; confident moves are
//! applied before the first review prompt so an interrupted review never
//! loses already-decided placements.

use crate::classifier::{ClassifierError, NeighborClassifier};
use crate::config::AppConfig;
use crate::models::{ClassificationResult, NearestRow, OrganiseSummary, UNCATEGORISED_LABEL};
use crate::review::{ReviewDecision, Reviewer};
use crate::{extractor, placement, scanner};
use anyhow::Context;
use providers::hashed::HashedProvider;
use providers::lmstudio::{LmStudioConfig, LmStudioProvider};
use providers::noop::NoopProvider;
use providers::openai::{OpenAiConfig, OpenAiProvider};
use providers::ProviderRegistry;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use storage::artifacts::ArtifactStore;
use storage::labels::LabelStore;
use storage::StoreError;
use thiserror::Error;
use tracing::{info, warn};

pub const MODEL_DIR: &str = "model";

#[derive(Debug, Error)]
#[error(
    "no training data: neither accumulated nor seed labels exist; \
     add seed examples to training_labels.json or run `labels add`"
)]
pub struct NoTrainingData;

#[derive(Debug, Clone)]
pub struct OrganiseOptions {
    pub source: PathBuf,
    pub dest: PathBuf,
    pub threshold: f32,
    pub dry_run: bool,
    pub retrain: bool,
}

pub async fn run_organise(
    cfg: &AppConfig,
    opts: &OrganiseOptions,
    registry: &ProviderRegistry,
    reviewer: &mut dyn Reviewer,
) -> anyhow::Result<OrganiseSummary> {
    let data_dir = PathBuf::from(&cfg.data.dir);
    let label_store = LabelStore::new(&data_dir);

    // INIT: decide train-vs-load before any file is touched.
    let (classifier, mut categories) =
        prepare_classifier(cfg, registry, &label_store, opts.retrain, opts.dry_run).await?;

    let mut summary = OrganiseSummary {
        dry_run: opts.dry_run,
        ..Default::default()
    };

    // SCANNING: classify everything in scan order. Per-file trouble
    // routes to the sentinel; it never aborts the batch.
    let files = scanner::scan(&opts.source, &cfg.scan.exclude)?;
    info!(count = files.len(), source = %opts.source.display(), "scanned source directory");

    let mut confident: Vec<ClassificationResult> = Vec::new();
    let mut pending: Vec<ClassificationResult> = Vec::new();
    let mut direct: Vec<PathBuf> = Vec::new();

    for path in files {
        summary.scanned += 1;
        let text = extractor::extract(&path);
        if text.trim().is_empty() {
            warn!(file = %path.display(), "no usable text, routing to sentinel");
            direct.push(path);
            continue;
        }
        match classifier.predict_with_confidence(&text).await {
            Ok((label, confidence)) => {
                let result = ClassificationResult {
                    path,
                    text,
                    label,
                    confidence,
                };
                if result.confidence <= opts.threshold {
                    confident.push(result);
                } else {
                    pending.push(result);
                }
            }
            Err(ClassifierError::Embedding(e)) => {
                warn!(file = %path.display(), error = %e, "embedding failed, routing to sentinel");
                direct.push(path);
            }
            Err(e) => return Err(e).context("classification failed"),
        }
    }

    // ROUTING: confident placements happen before any review prompt.
    summary.confident = confident.len();
    for result in &confident {
        apply_move(
            &result.path,
            &opts.dest,
            &result.label,
            opts.dry_run,
            &mut summary,
        );
    }
    for path in &direct {
        summary.uncategorised += 1;
        apply_move(path, &opts.dest, UNCATEGORISED_LABEL, opts.dry_run, &mut summary);
    }

    // REVIEWING: one file at a time, in encounter order.
    if !pending.is_empty() {
        if reviewer.begin_session(pending.len()) {
            for result in pending {
                summary.reviewed += 1;
                match reviewer.review(&result.path, &categories) {
                    ReviewDecision::Label(label) => {
                        let label = label.trim().to_string();
                        if label.is_empty() {
                            summary.uncategorised += 1;
                            apply_move(
                                &result.path,
                                &opts.dest,
                                UNCATEGORISED_LABEL,
                                opts.dry_run,
                                &mut summary,
                            );
                            continue;
                        }
                        // The label is durable before the move happens.
                        if !opts.dry_run {
                            label_store
                                .append(&result.text, &label)
                                .context("persist new label")?;
                        }
                        apply_move(&result.path, &opts.dest, &label, opts.dry_run, &mut summary);
                        if !categories.contains(&label) {
                            categories.push(label);
                            categories.sort();
                        }
                    }
                    ReviewDecision::Skip => {
                        summary.uncategorised += 1;
                        apply_move(
                            &result.path,
                            &opts.dest,
                            UNCATEGORISED_LABEL,
                            opts.dry_run,
                            &mut summary,
                        );
                    }
                }
            }
        } else {
            for result in &pending {
                summary.uncategorised += 1;
                apply_move(
                    &result.path,
                    &opts.dest,
                    UNCATEGORISED_LABEL,
                    opts.dry_run,
                    &mut summary,
                );
            }
        }
    }

    info!(
        scanned = summary.scanned,
        confident = summary.confident,
        reviewed = summary.reviewed,
        uncategorised = summary.uncategorised,
        moved = summary.moved,
        failed = summary.failed,
        dry_run = summary.dry_run,
        "organise run complete"
    );
    Ok(summary)
}

/// Retrains from the label store and persists the artifacts. Used by the
/// `train` command; `run_organise` does the same lazily.
pub async fn train_model(cfg: &AppConfig, registry: &ProviderRegistry) -> anyhow::Result<usize> {
    let data_dir = PathBuf::from(&cfg.data.dir);
    let label_store = LabelStore::new(&data_dir);
    let artifact_store = ArtifactStore::new(data_dir.join(MODEL_DIR));

    let training = label_store
        .load_or_initialize()
        .context("load training labels")?;
    if training.is_empty() {
        return Err(NoTrainingData.into());
    }

    let mut classifier = build_classifier(cfg, registry)?;
    classifier
        .train(&training.examples, &training.labels)
        .await
        .context("train classifier")?;
    classifier.save(&artifact_store).context("save model artifacts")?;
    Ok(training.len())
}

/// For each file under `source`, its closest training example, label and
/// distance, nearest first. Never writes artifacts.
pub async fn nearest_report(
    cfg: &AppConfig,
    registry: &ProviderRegistry,
    source: &Path,
) -> anyhow::Result<Vec<NearestRow>> {
    let data_dir = PathBuf::from(&cfg.data.dir);
    let label_store = LabelStore::new(&data_dir);
    let (classifier, _) = prepare_classifier(cfg, registry, &label_store, false, true).await?;

    let mut rows = Vec::new();
    for path in scanner::scan(source, &cfg.scan.exclude)? {
        let text = extractor::extract(&path);
        if text.trim().is_empty() {
            continue;
        }
        let nearest = match classifier.nearest(&text).await {
            Ok(n) => n,
            Err(ClassifierError::Embedding(e)) => {
                warn!(file = %path.display(), error = %e, "embedding failed, skipping");
                continue;
            }
            Err(e) => return Err(e).context("distance report failed"),
        };
        rows.push(NearestRow {
            file: path,
            text,
            example: nearest.example,
            label: nearest.label,
            distance: nearest.distance,
        });
    }
    rows.sort_by(|a, b| {
        a.distance
            .partial_cmp(&b.distance)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    Ok(rows)
}

/// Loads the saved model, or (re)trains from the label store when asked,
/// when no artifacts exist, or when the saved state is unusable and
/// labels are available. Fatal only when there is nothing to go on.
async fn prepare_classifier(
    cfg: &AppConfig,
    registry: &ProviderRegistry,
    label_store: &LabelStore,
    retrain: bool,
    dry_run: bool,
) -> anyhow::Result<(NeighborClassifier, Vec<String>)> {
    let artifact_store = ArtifactStore::new(PathBuf::from(&cfg.data.dir).join(MODEL_DIR));
    let training = label_store
        .load_or_initialize()
        .context("load training labels")?;
    let categories = training.categories();

    let mut classifier = build_classifier(cfg, registry)?;

    if retrain || !artifact_store.exists() {
        if training.is_empty() {
            return Err(NoTrainingData.into());
        }
        info!(examples = training.len(), "training classifier from label store");
        classifier
            .train(&training.examples, &training.labels)
            .await
            .context("train classifier")?;
        if !dry_run {
            classifier.save(&artifact_store).context("save model artifacts")?;
        }
    } else {
        match classifier.load(&artifact_store) {
            Ok(()) => {
                info!(dir = %artifact_store.dir().display(), "loaded saved model artifacts");
            }
            Err(ClassifierError::Store(StoreError::CorruptOrMissingState(msg)))
                if !training.is_empty() =>
            {
                warn!(reason = %msg, "saved model unusable, retraining from label store");
                classifier
                    .train(&training.examples, &training.labels)
                    .await
                    .context("train classifier")?;
                if !dry_run {
                    classifier.save(&artifact_store).context("save model artifacts")?;
                }
            }
            Err(e) => {
                return Err(e).context(
                    "saved model unusable and no training labels to retrain from; \
                     supply seed examples in training_labels.json",
                );
            }
        }
    }

    Ok((classifier, categories))
}

fn build_classifier(
    cfg: &AppConfig,
    registry: &ProviderRegistry,
) -> anyhow::Result<NeighborClassifier> {
    let provider = registry
        .embedding(Some(&cfg.embeddings.provider))
        .with_context(|| format!("resolve embedding provider '{}'", cfg.embeddings.provider))?;
    Ok(NeighborClassifier::new(
        provider,
        cfg.embeddings.model.clone(),
        cfg.classification.neighbors,
        cfg.embeddings.batch_size,
    ))
}

fn apply_move(
    file: &Path,
    dest: &Path,
    category: &str,
    dry_run: bool,
    summary: &mut OrganiseSummary,
) {
    if dry_run {
        info!(file = %file.display(), category, "dry-run: would move");
        return;
    }
    match placement::move_to_category(file, dest, category) {
        Ok(target) => {
            summary.moved += 1;
            info!(from = %file.display(), to = %target.display(), "moved");
        }
        Err(e) => {
            summary.failed += 1;
            warn!(file = %file.display(), error = %e, "move failed, file left in place");
        }
    }
}

pub fn build_registry(cfg: &AppConfig) -> ProviderRegistry {
    let mut reg = ProviderRegistry::new()
        .with_embedding(
            "hashed",
            Arc::new(HashedProvider::new(cfg.embeddings.dimension)),
        )
        .with_embedding("noop", Arc::new(NoopProvider));

    if let (Some(key), Some(base)) = (
        std::env::var_os("OPENAI_API_KEY"),
        std::env::var_os("OPENAI_BASE_URL"),
    ) {
        let provider = OpenAiProvider::new(OpenAiConfig {
            api_key: key.to_string_lossy().into_owned(),
            base_url: base.to_string_lossy().into_owned(),
            embedding_model: cfg.embeddings.model.clone(),
        });
        reg = reg.with_embedding("openai", Arc::new(provider));
    }

    if let Some(base) = std::env::var_os("LMSTUDIO_BASE_URL") {
        let provider = LmStudioProvider::new(LmStudioConfig {
            base_url: base.to_string_lossy().into_owned(),
            embedding_model: cfg.embeddings.model.clone(),
        });
        reg = reg.with_embedding("lmstudio", Arc::new(provider));
    }

    reg.set_preferred_embedding(&cfg.embeddings.provider)
}
