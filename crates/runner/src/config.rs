use anyhow::{Context, Result};
use predict::ModelConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub model: ModelSection,
    pub prompt: PromptConfig,
    pub generation: GenerationConfig,
    pub resolver: ResolverConfig,
    pub input_file: Option<PathBuf>,
    pub output_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSection {
    /// Registry tag of the strategy to run.
    pub tag: String,
    pub llm_path: String,
    pub inference_url: String,
    #[serde(skip_serializing)]
    pub api_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    pub templates_file: PathBuf,
    pub train_data_file: Option<PathBuf>,
    pub few_shot: usize,
    pub seed: Option<u64>,
    pub mask_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub top_k: usize,
    pub threshold: f64,
    pub batch_size: usize,
    pub max_new_tokens: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Off means answer spans are kept as plain labels.
    pub enabled: bool,
    pub api_url: String,
    pub language: String,
    pub request_timeout_secs: u64,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub max_entries: usize,
}

impl Default for ModelSection {
    fn default() -> Self {
        let model = ModelConfig::default();
        Self {
            tag: "baseline_fill_mask".to_string(),
            llm_path: model.llm_path,
            inference_url: model.inference_url,
            api_token: None,
        }
    }
}

impl Default for PromptConfig {
    fn default() -> Self {
        let model = ModelConfig::default();
        Self {
            templates_file: PathBuf::from("prompt_templates/question-prompts.csv"),
            train_data_file: None,
            few_shot: model.few_shot,
            seed: None,
            mask_token: model.mask_token,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        let model = ModelConfig::default();
        Self {
            top_k: model.top_k,
            threshold: model.threshold,
            batch_size: model.batch_size,
            max_new_tokens: model.max_new_tokens,
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_url: resolve::DEFAULT_API_URL.to_string(),
            language: "en".to_string(),
            request_timeout_secs: 30,
            cache: CacheConfig::default(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 10000,
        }
    }
}

impl RunConfig {
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_yaml(&content).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Flattened parameters handed to the model factory.
    pub fn model_config(&self) -> ModelConfig {
        ModelConfig {
            llm_path: self.model.llm_path.clone(),
            inference_url: self.model.inference_url.clone(),
            api_token: self.model.api_token.clone(),
            top_k: self.generation.top_k,
            threshold: self.generation.threshold,
            batch_size: self.generation.batch_size,
            few_shot: self.prompt.few_shot,
            max_new_tokens: self.generation.max_new_tokens,
            mask_token: self.prompt.mask_token.clone(),
            seed: self.prompt.seed,
        }
    }

    pub fn cache_capacity(&self) -> usize {
        if self.resolver.cache.enabled {
            self.resolver.cache.max_entries
        } else {
            0
        }
    }
}
