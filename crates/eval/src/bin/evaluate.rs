use anyhow::{Context, Result};
use clap::Parser;
use eval::{Evaluator, MissingPolicy, ScoringVariant, generate_plots, report};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Score LM-KBC predictions against a ground-truth file.
#[derive(Debug, Parser)]
#[command(name = "evaluate", version)]
struct Args {
    /// Predictions JSONL file
    #[arg(short = 'p', long = "predictions")]
    predictions: PathBuf,

    /// Ground-truth JSONL file
    #[arg(short = 'g', long = "ground-truth")]
    ground_truth: PathBuf,

    /// `legacy` or `set-based`
    #[arg(long, default_value = "set-based")]
    variant: ScoringVariant,

    /// `fail` or `empty`; defaults to the variant's policy
    #[arg(long = "on-missing")]
    on_missing: Option<MissingPolicy>,

    /// Write full results (per pair and per relation) as JSON
    #[arg(long)]
    json: Option<PathBuf>,

    /// Directory for the F1-by-relation chart
    #[arg(long)]
    plots: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
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

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_json);

    let predictions = ingest::load_kbc_rows(&args.predictions).await?;
    let ground_truth = ingest::load_kbc_rows(&args.ground_truth).await?;

    let missing = args.on_missing.unwrap_or(args.variant.default_missing_policy());
    info!(variant = %args.variant, on_missing = %missing, "Scoring predictions");

    let results = Evaluator::new(args.variant, missing)
        .evaluate(&predictions, &ground_truth)
        .context("Evaluation failed")?;

    println!("{}", report::render(&results));

    if let Some(path) = &args.json {
        ingest::FileReader::write_json(path, &results).await?;
        info!(path = %path.display(), "Saved results");
    }

    if let Some(dir) = &args.plots {
        generate_plots(&results, dir)?;
    }

    Ok(())
}
