use resolve::EntityResolver;

/// The model's answer line: whatever follows the last echo of the prompt,
/// cut at the first newline.
pub fn continuation<'a>(generated: &'a str, prompt: &str) -> &'a str {
    let tail = match generated.rsplit_once(prompt) {
        Some((_, after)) if !prompt.is_empty() => after,
        _ => generated,
    };
    tail.split('\n').next().unwrap_or("").trim()
}

/// Split a comma-separated answer into entity spans.
pub fn split_answer(answer: &str) -> Vec<String> {
    answer
        .split(", ")
        .map(|entity| {
            let entity = entity.trim();
            entity.strip_prefix("and ").map(str::trim).unwrap_or(entity).to_string()
        })
        .collect()
}

/// Resolve spans in order, dropping the ones that carry no answer.
pub async fn resolve_spans<R>(resolver: &R, spans: &[String]) -> Vec<String>
where
    R: EntityResolver + ?Sized,
{
    let mut ids = Vec::with_capacity(spans.len());
    for span in spans {
        if let Some(id) = resolver.disambiguate(span).await {
            if !id.is_empty() {
                ids.push(id);
            }
        }
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use resolve::PassthroughResolver;

    #[test]
    fn test_continuation_strips_echoed_prompt() {
        let prompt = "Q: capital of France?";
        let generated = "Q: capital of France? Paris\nQ: capital of Spain? Madrid";
        assert_eq!(continuation(generated, prompt), "Paris");
    }

    #[test]
    fn test_continuation_without_echo() {
        assert_eq!(continuation("  Spain, Andorra\nmore", "prompt"), "Spain, Andorra");
        assert_eq!(continuation("", "prompt"), "");
    }

    #[test]
    fn test_split_answer() {
        assert_eq!(
            split_answer("Spain, Belgium, and Germany"),
            vec!["Spain", "Belgium", "Germany"]
        );
        assert_eq!(split_answer("None"), vec!["None"]);
    }

    #[tokio::test]
    async fn test_resolve_spans_drops_none() {
        let spans = split_answer("None");
        assert!(resolve_spans(&PassthroughResolver, &spans).await.is_empty());

        let spans = split_answer("Spain, , 12");
        assert_eq!(
            resolve_spans(&PassthroughResolver, &spans).await,
            vec!["Spain", "12"]
        );
    }
}
