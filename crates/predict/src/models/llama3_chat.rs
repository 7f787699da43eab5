use anyhow::{Context, Result};
use async_trait::async_trait;
use ingest::{InputRow, PredictionRow, TrainRow};
use rand::rngs::StdRng;
use resolve::EntityResolver;
use std::sync::Arc;
use tracing::info;

use crate::answer::{resolve_spans, split_answer};
use crate::llm::OllamaClient;
use crate::models::sampling_rng;
use crate::prompt::{PromptBuilder, sample_examples};
use crate::schema::{ChatExample, ChatMessage};
use crate::{Model, ModelConfig, ModelResources};

/// Model names accepted by [`Llama3ChatModel`], as Hugging Face repo IDs and
/// Ollama tags.
pub const SUPPORTED_LLAMA3_MODELS: &[&str] = &[
    "meta-llama/Meta-Llama-3-8B-Instruct",
    "meta-llama/Meta-Llama-3-70B-Instruct",
    "llama3",
    "llama3:8b-instruct",
    "llama3:70b-instruct",
];

/// Chat-template variant of the generation baseline. In-context examples
/// are drawn from the same relation as the question.
pub struct Llama3ChatModel {
    client: OllamaClient,
    prompts: PromptBuilder,
    resolver: Arc<dyn EntityResolver>,
    in_context_examples: Vec<ChatExample>,
    rng: StdRng,
    few_shot: usize,
    max_new_tokens: usize,
}

impl Llama3ChatModel {
    pub fn new(config: &ModelConfig, resources: ModelResources) -> Result<Self> {
        if !SUPPORTED_LLAMA3_MODELS.contains(&config.llm_path.as_str()) {
            anyhow::bail!(
                "The Llama-3 chat model only supports {}; got `{}`",
                SUPPORTED_LLAMA3_MODELS.join(", "),
                config.llm_path
            );
        }

        let prompts = PromptBuilder::new(resources.templates);
        let in_context_examples = Self::instantiate_in_context_examples(&prompts, &resources.train_rows)?;

        Ok(Self {
            client: OllamaClient::new(config.inference_url.clone(), config.llm_path.clone()),
            prompts,
            resolver: resources.resolver,
            in_context_examples,
            rng: sampling_rng(config.seed),
            few_shot: config.few_shot,
            max_new_tokens: config.max_new_tokens,
        })
    }

    fn instantiate_in_context_examples(prompts: &PromptBuilder, train_rows: &[TrainRow]) -> Result<Vec<ChatExample>> {
        info!(rows = train_rows.len(), "Instantiating in-context examples with train data...");
        train_rows
            .iter()
            .map(|row| prompts.chat_example(row))
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to instantiate in-context examples")
    }

    fn create_messages(&mut self, subject_entity: &str, relation: &str) -> Result<Vec<ChatMessage>> {
        let pool: Vec<&ChatExample> = self
            .in_context_examples
            .iter()
            .filter(|example| example.relation == relation)
            .collect();
        let examples: Vec<&ChatExample> = sample_examples(&pool, self.few_shot, &mut self.rng)
            .into_iter()
            .copied()
            .collect();
        Ok(self.prompts.chat_messages(subject_entity, relation, &examples)?)
    }
}

#[async_trait]
impl Model for Llama3ChatModel {
    fn name(&self) -> &'static str {
        "baseline_llama_3_chat"
    }

    async fn generate_predictions(&mut self, inputs: &[InputRow]) -> Result<Vec<PredictionRow>> {
        info!(rows = inputs.len(), "Generating predictions...");
        let mut conversations = Vec::with_capacity(inputs.len());
        for inp in inputs {
            conversations.push(self.create_messages(&inp.subject_entity, &inp.relation)?);
        }

        let mut outputs = Vec::with_capacity(conversations.len());
        for (idx, messages) in conversations.iter().enumerate() {
            if (idx + 1) % 50 == 0 {
                info!(done = idx + 1, total = conversations.len(), "Generating predictions");
            }
            outputs.push(self.client.chat(messages, self.max_new_tokens).await?);
        }

        info!("Disambiguating entities...");
        let mut results = Vec::with_capacity(inputs.len());
        for (inp, output) in inputs.iter().zip(&outputs) {
            let wikidata_ids = resolve_spans(self.resolver.as_ref(), &split_answer(output.trim())).await;
            results.push(PredictionRow::for_input(inp, wikidata_ids));
        }

        Ok(results)
    }
}
