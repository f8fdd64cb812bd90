use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub scan: ScanPaths,
    #[serde(default)]
    pub organise: OrganiseConfig,
    #[serde(default)]
    pub embeddings: EmbeddingConfig,
    #[serde(default)]
    pub classification: ClassificationConfig,
}

/// Where persisted state lives: label files plus the model artifact dir.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub dir: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanPaths {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganiseConfig {
    #[serde(default = "default_dest")]
    pub dest: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_dimension")]
    pub dimension: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationConfig {
    /// Mean neighbour distance above which a file goes to review.
    #[serde(default = "default_threshold")]
    pub threshold: f32,
    #[serde(default = "default_neighbors")]
    pub neighbors: usize,
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_dest() -> String {
    "Organised".to_string()
}

fn default_embedding_provider() -> String {
    "hashed".to_string()
}

fn default_embedding_model() -> String {
    "hashed-384".to_string()
}

fn default_batch_size() -> usize {
    32
}

fn default_dimension() -> usize {
    384
}

fn default_threshold() -> f32 {
    0.7
}

fn default_neighbors() -> usize {
    3
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: default_data_dir(),
        }
    }
}

impl Default for OrganiseConfig {
    fn default() -> Self {
        Self {
            dest: default_dest(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            batch_size: default_batch_size(),
            dimension: default_dimension(),
        }
    }
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            neighbors: default_neighbors(),
        }
    }
}

pub fn load(path: Option<&str>) -> anyhow::Result<AppConfig> {
    let mut settings = config::Config::builder();
    if let Some(p) = path {
        settings = settings.add_source(config::File::with_name(p));
    } else {
        settings = settings.add_source(config::File::with_name("config/default").required(false));
    }
    let cfg = settings.build()?;
    Ok(cfg.try_deserialize()?)
}
