pub mod answer;
pub mod fill_mask;
pub mod llm;
pub mod models;
pub mod prompt;
pub mod registry;
pub mod schema;

pub use fill_mask::FillMaskClient;
pub use llm::OllamaClient;
pub use models::{FillMaskModel, GenerationModel, Llama3ChatModel};
pub use prompt::{PromptBuilder, PromptError};
pub use registry::{ModelFactory, ModelRegistry, RegistryError};
pub use schema::{ChatExample, ChatMessage, FillMaskCandidate};

use anyhow::Result;
use async_trait::async_trait;
use ingest::{InputRow, PredictionRow, PromptTemplates, TrainRow};
use resolve::EntityResolver;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A prediction strategy: subject/relation inputs in, resolved object IDs out.
#[async_trait]
pub trait Model: Send {
    fn name(&self) -> &'static str;

    /// One output row per input row, in input order.
    async fn generate_predictions(&mut self, inputs: &[InputRow]) -> Result<Vec<PredictionRow>>;
}

/// Model and decoding parameters shared by every strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Model name as known to the inference server.
    pub llm_path: String,
    pub inference_url: String,
    #[serde(skip_serializing)]
    pub api_token: Option<String>,
    pub top_k: usize,
    pub threshold: f64,
    pub batch_size: usize,
    pub few_shot: usize,
    pub max_new_tokens: usize,
    pub mask_token: String,
    /// Fixes few-shot sampling when set.
    pub seed: Option<u64>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            llm_path: "bert-base-cased".to_string(),
            inference_url: "http://localhost:8080".to_string(),
            api_token: None,
            top_k: 10,
            threshold: 0.1,
            batch_size: 32,
            few_shot: 5,
            max_new_tokens: 64,
            mask_token: "[MASK]".to_string(),
            seed: None,
        }
    }
}

/// Loaded inputs a strategy is built from.
#[derive(Clone)]
pub struct ModelResources {
    pub templates: PromptTemplates,
    pub train_rows: Vec<TrainRow>,
    pub resolver: Arc<dyn EntityResolver>,
}
