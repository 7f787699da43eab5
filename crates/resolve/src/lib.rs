pub mod cache;
pub mod wikidata;

pub use cache::{CacheStats, ResolutionCache};
pub use wikidata::{DEFAULT_API_URL, WikidataClient};

use async_trait::async_trait;
use tracing::{debug, error};

/// Maps a free-text answer span to an external identifier.
#[async_trait]
pub trait EntityResolver: Send + Sync {
    /// `None` means the span carries no answer and should be dropped.
    /// Resolution failures are not errors: the trimmed span comes back as-is.
    async fn disambiguate(&self, label: &str) -> Option<String>;

    fn stats(&self) -> CacheStats {
        CacheStats::default()
    }
}

/// Handles the cases that never need a lookup: blanks and the literal
/// `None` are dropped, integers are passed through in canonical form.
pub fn shortcut(label: &str) -> Option<Option<String>> {
    let item = label.trim();
    if item.is_empty() || item == "None" {
        return Some(None);
    }
    canonical_integer(item).map(Some)
}

/// Decimal integer literal of any size, with optional sign and single
/// underscores between digits, rewritten without sign noise, underscores or
/// leading zeros.
fn canonical_integer(item: &str) -> Option<String> {
    let (negative, digits) = match item.as_bytes().first()? {
        b'-' => (true, &item[1..]),
        b'+' => (false, &item[1..]),
        _ => (false, item),
    };
    if digits.is_empty() || digits.starts_with('_') || digits.ends_with('_') || digits.contains("__") {
        return None;
    }
    if !digits.bytes().all(|b| b.is_ascii_digit() || b == b'_') {
        return None;
    }

    let digits: String = digits.chars().filter(|c| *c != '_').collect();
    let trimmed = digits.trim_start_matches('0');
    Some(match (trimmed.is_empty(), negative) {
        (true, _) => "0".to_string(),
        (false, true) => format!("-{}", trimmed),
        (false, false) => trimmed.to_string(),
    })
}

/// Resolves spans against the Wikidata search API.
pub struct WikidataResolver {
    client: WikidataClient,
    cache: ResolutionCache,
}

impl WikidataResolver {
    pub fn new(client: WikidataClient, cache: ResolutionCache) -> Self {
        Self { client, cache }
    }
}

#[async_trait]
impl EntityResolver for WikidataResolver {
    async fn disambiguate(&self, label: &str) -> Option<String> {
        if let Some(resolved) = shortcut(label) {
            return resolved;
        }
        let item = label.trim();

        if let Some(id) = self.cache.get(item) {
            return Some(id);
        }

        match self.client.search(item).await {
            Ok(Some(id)) => {
                debug!(label = item, id = %id, "Resolved entity");
                self.cache.set(item, id.clone());
                Some(id)
            }
            Ok(None) => {
                error!(label = item, "Error getting Wikidata ID: no search results");
                self.cache.record_fallback();
                Some(item.to_string())
            }
            Err(e) => {
                error!(label = item, error = %e, "Error getting Wikidata ID");
                self.cache.record_fallback();
                Some(item.to_string())
            }
        }
    }

    fn stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

/// Keeps spans as plain labels; used for offline runs.
pub struct PassthroughResolver;

#[async_trait]
impl EntityResolver for PassthroughResolver {
    async fn disambiguate(&self, label: &str) -> Option<String> {
        match shortcut(label) {
            Some(resolved) => resolved,
            None => Some(label.trim().to_string()),
        }
    }
}
