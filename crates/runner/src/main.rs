mod config;
mod metrics;

use anyhow::{Context, Result};
use clap::Parser;
use ingest::{FileReader, PromptTemplates};
use predict::{ModelRegistry, ModelResources};
use resolve::{EntityResolver, PassthroughResolver, ResolutionCache, WikidataClient, WikidataResolver};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use config::{ResolverConfig, RunConfig};
use metrics::{RunMetrics, TimedOperation};

/// Run a baseline model over LM-KBC inputs and write predictions as JSONL.
#[derive(Debug, Parser)]
#[command(name = "baseline", version)]
struct Args {
    /// YAML run config
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Input JSONL (SubjectEntityID, SubjectEntity, Relation)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output JSONL for predictions
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Registry tag, e.g. baseline_generation
    #[arg(long)]
    model: Option<String>,

    #[arg(long)]
    llm_path: Option<String>,

    #[arg(long)]
    inference_url: Option<String>,

    #[arg(long, env = "HF_TOKEN", hide_env_values = true)]
    api_token: Option<String>,

    #[arg(long)]
    templates: Option<PathBuf>,

    #[arg(long)]
    train_data: Option<PathBuf>,

    #[arg(long)]
    few_shot: Option<usize>,

    #[arg(long)]
    seed: Option<u64>,

    #[arg(long)]
    top_k: Option<usize>,

    #[arg(long)]
    threshold: Option<f64>,

    #[arg(long)]
    batch_size: Option<usize>,

    #[arg(long)]
    max_new_tokens: Option<usize>,

    /// Keep answer spans as labels instead of looking them up on Wikidata
    #[arg(long)]
    no_resolver: bool,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

impl Args {
    fn apply(self, config: &mut RunConfig) {
        if let Some(input) = self.input {
            config.input_file = Some(input);
        }
        if let Some(output) = self.output {
            config.output_file = Some(output);
        }
        if let Some(tag) = self.model {
            config.model.tag = tag;
        }
        if let Some(llm_path) = self.llm_path {
            config.model.llm_path = llm_path;
        }
        if let Some(url) = self.inference_url {
            config.model.inference_url = url;
        }
        if self.api_token.is_some() {
            config.model.api_token = self.api_token;
        }
        if let Some(templates) = self.templates {
            config.prompt.templates_file = templates;
        }
        if let Some(train) = self.train_data {
            config.prompt.train_data_file = Some(train);
        }
        if let Some(few_shot) = self.few_shot {
            config.prompt.few_shot = few_shot;
        }
        if self.seed.is_some() {
            config.prompt.seed = self.seed;
        }
        if let Some(top_k) = self.top_k {
            config.generation.top_k = top_k;
        }
        if let Some(threshold) = self.threshold {
            config.generation.threshold = threshold;
        }
        if let Some(batch_size) = self.batch_size {
            config.generation.batch_size = batch_size;
        }
        if let Some(max_new_tokens) = self.max_new_tokens {
            config.generation.max_new_tokens = max_new_tokens;
        }
        if self.no_resolver {
            config.resolver.enabled = false;
        }
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn build_resolver(config: &ResolverConfig, cache_capacity: usize) -> Result<Arc<dyn EntityResolver>> {
    if !config.enabled {
        info!("Entity resolution disabled; keeping answer labels");
        return Ok(Arc::new(PassthroughResolver));
    }
    let client = WikidataClient::new(
        config.api_url.clone(),
        config.language.clone(),
        config.request_timeout_secs,
    )?;
    Ok(Arc::new(WikidataResolver::new(client, ResolutionCache::new(cache_capacity))))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_json);

    let mut config = match &args.config {
        Some(path) => RunConfig::load(path).await?,
        None => RunConfig::default(),
    };
    args.apply(&mut config);

    let input_file = config
        .input_file
        .clone()
        .context("No input file given (use --input or input_file in the config)")?;
    let output_file = config
        .output_file
        .clone()
        .context("No output file given (use --output or output_file in the config)")?;

    let registry = ModelRegistry::default();
    // Fail on a bad tag before any files are read
    let factory = registry.get(&config.model.tag)?;

    let metrics = RunMetrics::new();
    let timer = TimedOperation::start();

    let templates = PromptTemplates::load(&config.prompt.templates_file).await?;
    let train_rows = match &config.prompt.train_data_file {
        Some(path) => ingest::load_train_rows(path).await?,
        None => {
            if config.model.tag != "baseline_fill_mask" && config.prompt.few_shot > 0 {
                warn!(model = %config.model.tag, "No train data configured; prompts will have no in-context examples");
            }
            Vec::new()
        }
    };
    let inputs = ingest::load_inputs(&input_file).await?;
    metrics.record_load(timer.elapsed(), inputs.len());

    let resolver = build_resolver(&config.resolver, config.cache_capacity())?;
    let resources = ModelResources {
        templates,
        train_rows,
        resolver: Arc::clone(&resolver),
    };
    let mut model = factory(&config.model_config(), resources)
        .with_context(|| format!("Failed to build model `{}`", config.model.tag))?;
    info!(model = model.name(), llm = %config.model.llm_path, "Model ready");

    let timer = TimedOperation::start();
    let predictions = model.generate_predictions(&inputs).await?;
    metrics.record_predictions(timer.elapsed(), &predictions);

    FileReader::write_jsonl(&output_file, &predictions).await?;
    info!(path = %output_file.display(), rows = predictions.len(), "Saved predictions");

    let summary = metrics.snapshot(resolver.stats());
    info!(
        input_rows = summary.input_rows,
        empty_predictions = summary.empty_predictions,
        avg_objects_per_row = summary.avg_objects_per_row,
        predict_time_ms = summary.predict_time_ms,
        cache_hits = summary.resolver.hits,
        cache_misses = summary.resolver.misses,
        fallbacks = summary.resolver.fallbacks,
        "Run complete"
    );
    info!(summary = %serde_json::to_string(&summary)?, "Run summary");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_config() {
        let mut config = RunConfig::from_yaml("model:\n  tag: baseline_fill_mask\nprompt:\n  few_shot: 5\n").unwrap();
        let args = Args::parse_from([
            "baseline",
            "--model",
            "baseline_generation",
            "--few-shot",
            "2",
            "-o",
            "preds.jsonl",
            "--no-resolver",
        ]);
        args.apply(&mut config);

        assert_eq!(config.model.tag, "baseline_generation");
        assert_eq!(config.prompt.few_shot, 2);
        assert_eq!(config.output_file, Some(PathBuf::from("preds.jsonl")));
        assert!(!config.resolver.enabled);
        // untouched values stay
        assert_eq!(config.generation.top_k, 10);
    }

    #[tokio::test]
    async fn test_passthrough_when_disabled() {
        let config = ResolverConfig {
            enabled: false,
            ..ResolverConfig::default()
        };
        let resolver = build_resolver(&config, 0).unwrap();
        assert_eq!(resolver.disambiguate(" Paris ").await, Some("Paris".to_string()));
        assert_eq!(resolver.disambiguate("None").await, None);
    }
}
