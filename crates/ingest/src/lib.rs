pub mod record;
pub mod reader;
pub mod templates;

pub use record::{EntityId, InputRow, KbcRow, ObjectEntities, PredictionRow, TrainRow};
pub use reader::FileReader;
pub use templates::PromptTemplates;

use anyhow::Result;
use std::path::Path;

/// Load a predictions or ground-truth file for scoring.
pub async fn load_kbc_rows(path: &Path) -> Result<Vec<KbcRow>> {
    let rows: Vec<KbcRow> = FileReader::read_jsonl(path).await?;
    tracing::info!(path = %path.display(), rows = rows.len(), "Loaded rows");
    Ok(rows)
}

/// Load the test inputs a model is run on.
pub async fn load_inputs(path: &Path) -> Result<Vec<InputRow>> {
    let rows: Vec<InputRow> = FileReader::read_jsonl(path).await?;
    tracing::info!(path = %path.display(), rows = rows.len(), "Loaded input rows");
    Ok(rows)
}

/// Load training rows used to build in-context examples.
pub async fn load_train_rows(path: &Path) -> Result<Vec<TrainRow>> {
    let rows: Vec<TrainRow> = FileReader::read_jsonl(path).await?;
    tracing::info!(path = %path.display(), rows = rows.len(), "Loaded train rows");
    Ok(rows)
}
