use anyhow::{Context, Result};
use async_trait::async_trait;
use ingest::{InputRow, PredictionRow, TrainRow};
use rand::rngs::StdRng;
use resolve::EntityResolver;
use std::sync::Arc;
use tracing::info;

use crate::answer::{continuation, resolve_spans, split_answer};
use crate::llm::OllamaClient;
use crate::models::sampling_rng;
use crate::prompt::{PromptBuilder, sample_examples};
use crate::{Model, ModelConfig, ModelResources};

/// Causal-LM baseline: few-shot completion prompts, first generated line
/// parsed as a comma-separated answer list.
pub struct GenerationModel {
    client: OllamaClient,
    prompts: PromptBuilder,
    resolver: Arc<dyn EntityResolver>,
    in_context_examples: Vec<String>,
    rng: StdRng,
    few_shot: usize,
    batch_size: usize,
    max_new_tokens: usize,
}

impl GenerationModel {
    pub fn new(config: &ModelConfig, resources: ModelResources) -> Result<Self> {
        let prompts = PromptBuilder::new(resources.templates);
        let in_context_examples = Self::instantiate_in_context_examples(&prompts, &resources.train_rows)?;

        Ok(Self {
            client: OllamaClient::new(config.inference_url.clone(), config.llm_path.clone()),
            prompts,
            resolver: resources.resolver,
            in_context_examples,
            rng: sampling_rng(config.seed),
            few_shot: config.few_shot,
            batch_size: config.batch_size.max(1),
            max_new_tokens: config.max_new_tokens,
        })
    }

    fn instantiate_in_context_examples(prompts: &PromptBuilder, train_rows: &[TrainRow]) -> Result<Vec<String>> {
        info!(rows = train_rows.len(), "Instantiating in-context examples with train data...");
        train_rows
            .iter()
            .map(|row| prompts.in_context_example(row))
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to instantiate in-context examples")
    }

    fn create_prompt(&mut self, subject_entity: &str, relation: &str) -> Result<String> {
        let examples = sample_examples(&self.in_context_examples, self.few_shot, &mut self.rng);
        Ok(self.prompts.generation_prompt(subject_entity, relation, &examples)?)
    }
}

#[async_trait]
impl Model for GenerationModel {
    fn name(&self) -> &'static str {
        "baseline_generation"
    }

    async fn generate_predictions(&mut self, inputs: &[InputRow]) -> Result<Vec<PredictionRow>> {
        info!(rows = inputs.len(), "Generating predictions...");
        let mut prompts = Vec::with_capacity(inputs.len());
        for inp in inputs {
            prompts.push(self.create_prompt(&inp.subject_entity, &inp.relation)?);
        }

        let total_batches = prompts.len().div_ceil(self.batch_size);
        let mut outputs = Vec::with_capacity(prompts.len());
        for (batch_idx, batch) in prompts.chunks(self.batch_size).enumerate() {
            info!(batch = batch_idx + 1, total = total_batches, "Generating predictions");
            for prompt in batch {
                outputs.push(self.client.generate(prompt, self.max_new_tokens).await?);
            }
        }

        info!("Disambiguating entities...");
        let mut results = Vec::with_capacity(inputs.len());
        for ((inp, output), prompt) in inputs.iter().zip(&outputs).zip(&prompts) {
            let qa_answer = continuation(output, prompt);
            let wikidata_ids = resolve_spans(self.resolver.as_ref(), &split_answer(qa_answer)).await;
            results.push(PredictionRow::for_input(inp, wikidata_ids));
        }

        Ok(results)
    }
}
