use anyhow::{Context, Result};
use async_trait::async_trait;
use ingest::{InputRow, PredictionRow};
use resolve::EntityResolver;
use std::sync::Arc;
use tracing::info;

use crate::fill_mask::FillMaskClient;
use crate::prompt::PromptBuilder;
use crate::{Model, ModelConfig, ModelResources};

/// Masked-LM baseline: every filler scoring above the threshold becomes an
/// answer span.
pub struct FillMaskModel {
    client: FillMaskClient,
    prompts: PromptBuilder,
    resolver: Arc<dyn EntityResolver>,
    mask_token: String,
    top_k: usize,
    threshold: f64,
    batch_size: usize,
}

impl FillMaskModel {
    pub fn new(config: &ModelConfig, resources: ModelResources) -> Result<Self> {
        let client = FillMaskClient::new(
            config.inference_url.clone(),
            config.llm_path.clone(),
            config.api_token.clone(),
        );

        Ok(Self {
            client,
            prompts: PromptBuilder::new(resources.templates),
            resolver: resources.resolver,
            mask_token: config.mask_token.clone(),
            top_k: config.top_k,
            threshold: config.threshold,
            batch_size: config.batch_size.max(1),
        })
    }
}

#[async_trait]
impl Model for FillMaskModel {
    fn name(&self) -> &'static str {
        "baseline_fill_mask"
    }

    async fn generate_predictions(&mut self, inputs: &[InputRow]) -> Result<Vec<PredictionRow>> {
        info!(rows = inputs.len(), "Generating predictions...");
        let prompts = inputs
            .iter()
            .map(|inp| self.prompts.fill_mask_prompt(&inp.subject_entity, &inp.relation, &self.mask_token))
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to build fill-mask prompts")?;

        let mut outputs = Vec::with_capacity(prompts.len());
        for (batch_idx, batch) in prompts.chunks(self.batch_size).enumerate() {
            info!(batch = batch_idx + 1, size = batch.len(), "Running fill-mask batch");
            outputs.extend(self.client.fill_mask(batch, self.top_k).await?);
        }

        info!("Disambiguating entities...");
        let mut results = Vec::with_capacity(inputs.len());
        for (inp, candidates) in inputs.iter().zip(outputs) {
            let mut wikidata_ids = Vec::new();
            for candidate in candidates.iter().filter(|c| c.score > self.threshold) {
                if let Some(id) = self.resolver.disambiguate(&candidate.token_str).await {
                    if !id.is_empty() {
                        wikidata_ids.push(id);
                    }
                }
            }
            results.push(PredictionRow::for_input(inp, wikidata_ids));
        }

        Ok(results)
    }
}
