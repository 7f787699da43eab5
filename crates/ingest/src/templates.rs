use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tokio::fs;

#[derive(Debug, Deserialize)]
struct TemplateRow {
    #[serde(rename = "Relation")]
    relation: String,
    #[serde(rename = "PromptTemplate")]
    prompt_template: String,
}

/// Relation name -> prompt template, read from a CSV with `Relation` and
/// `PromptTemplate` columns. Later rows win on duplicate relations.
#[derive(Debug, Clone, Default)]
pub struct PromptTemplates {
    templates: HashMap<String, String>,
}

impl PromptTemplates {
    pub async fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .context(format!("Failed to read prompt templates: {:?}", path))?;

        let templates = Self::from_csv(&content)
            .context(format!("Failed to parse prompt templates: {:?}", path))?;
        tracing::info!(path = %path.display(), relations = templates.len(), "Loaded prompt templates");
        Ok(templates)
    }

    pub fn from_csv(content: &str) -> Result<Self> {
        let mut reader = csv::Reader::from_reader(content.as_bytes());
        let mut templates = HashMap::new();

        for result in reader.deserialize() {
            let row: TemplateRow = result?;
            templates.insert(row.relation, row.prompt_template);
        }

        Ok(Self { templates })
    }

    pub fn get(&self, relation: &str) -> Option<&str> {
        self.templates.get(relation).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl FromIterator<(String, String)> for PromptTemplates {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            templates: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quoted_templates() {
        let csv = "Relation,PromptTemplate\n\
                   countryLandBordersCountry,\"Which countries share a land border with {subject_entity}?\"\n\
                   personHasCityOfDeath,\"{subject_entity} died in {mask_token}.\"\n";
        let templates = PromptTemplates::from_csv(csv).unwrap();

        assert_eq!(templates.len(), 2);
        assert_eq!(
            templates.get("personHasCityOfDeath"),
            Some("{subject_entity} died in {mask_token}.")
        );
        assert!(templates.get("unknown").is_none());
    }

    #[test]
    fn test_missing_column_fails() {
        let csv = "Relation,Prompt\nr,x\n";
        assert!(PromptTemplates::from_csv(csv).is_err());
    }
}
