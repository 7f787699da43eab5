use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use tokio::fs;

pub struct FileReader;

impl FileReader {
    /// Read a newline-delimited JSON file. Blank lines are skipped; any other
    /// line that fails to parse aborts with its file name and line number.
    pub async fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
        let content = fs::read_to_string(path)
            .await
            .context(format!("Failed to read file: {:?}", path))?;

        Self::parse_jsonl(&content, &path.to_string_lossy())
    }

    pub fn parse_jsonl<T: DeserializeOwned>(content: &str, source: &str) -> Result<Vec<T>> {
        let mut rows = Vec::new();

        for (idx, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let row = serde_json::from_str(line)
                .with_context(|| format!("Malformed record at {}:{}", source, idx + 1))?;
            rows.push(row);
        }

        Ok(rows)
    }

    pub async fn write_jsonl<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
        let mut out = String::new();
        for row in rows {
            out.push_str(&serde_json::to_string(row)?);
            out.push('\n');
        }
        Self::write_file(path, out).await
    }

    /// Write one pretty-printed JSON document.
    pub async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
        Self::write_file(path, serde_json::to_string_pretty(value)?).await
    }

    async fn write_file(path: &Path, content: String) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .context(format!("Failed to create directory: {:?}", parent))?;
        }

        fs::write(path, content)
            .await
            .context(format!("Failed to write file: {:?}", path))?;
        Ok(())
    }
}
