use anyhow::Result;
use std::collections::BTreeMap;

use crate::models::{FillMaskModel, GenerationModel, Llama3ChatModel};
use crate::{Model, ModelConfig, ModelResources};

pub type ModelFactory = fn(&ModelConfig, ModelResources) -> Result<Box<dyn Model>>;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RegistryError {
    #[error("Model `{tag}` not found (available: {available})")]
    UnknownModel { tag: String, available: String },
}

/// Capability tag -> constructor.
pub struct ModelRegistry {
    factories: BTreeMap<&'static str, ModelFactory>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// The three baseline strategies.
    pub fn with_baselines() -> Self {
        let mut registry = Self::new();
        registry.register("baseline_fill_mask", |config, resources| {
            Ok(Box::new(FillMaskModel::new(config, resources)?))
        });
        registry.register("baseline_generation", |config, resources| {
            Ok(Box::new(GenerationModel::new(config, resources)?))
        });
        registry.register("baseline_llama_3_chat", |config, resources| {
            Ok(Box::new(Llama3ChatModel::new(config, resources)?))
        });
        registry
    }

    pub fn register(&mut self, tag: &'static str, factory: ModelFactory) {
        self.factories.insert(tag, factory);
    }

    pub fn tags(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }

    pub fn get(&self, tag: &str) -> Result<ModelFactory, RegistryError> {
        self.factories
            .get(tag)
            .copied()
            .ok_or_else(|| RegistryError::UnknownModel {
                tag: tag.to_string(),
                available: self.tags().join(", "),
            })
    }

    pub fn build(&self, tag: &str, config: &ModelConfig, resources: ModelResources) -> Result<Box<dyn Model>> {
        let factory = self.get(tag)?;
        factory(config, resources)
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::with_baselines()
    }
}
