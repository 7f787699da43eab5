use anyhow::{Context, Result};
use plotters::prelude::*;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::scoring::EvaluationResults;

pub fn generate_plots(results: &EvaluationResults, output_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create plot directory {}", output_dir.display()))?;

    let path = output_dir.join("f1_by_relation.png");
    plot_f1_by_relation(results, &path)?;
    Ok(path)
}

fn plot_f1_by_relation(results: &EvaluationResults, path: &Path) -> Result<()> {
    let relations: Vec<(&String, f64)> = results
        .relations
        .iter()
        .map(|(relation, aggregate)| (relation, aggregate.macro_avg.f1))
        .collect();
    let width = 200 + 80 * relations.len() as u32;

    let root = BitMapBackend::new(path, (width.max(800), 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(format!("Macro F1 by Relation ({})", results.variant), ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(160)
        .y_label_area_size(60)
        .build_cartesian_2d((0..relations.len()).into_segmented(), 0f64..1.0f64)?;

    chart
        .configure_mesh()
        .y_desc("F1")
        .x_labels(relations.len())
        .x_label_formatter(&|segment| match segment {
            SegmentValue::CenterOf(idx) => relations.get(*idx).map(|(r, _)| r.to_string()).unwrap_or_default(),
            _ => String::new(),
        })
        .x_label_style(("sans-serif", 12).into_font().transform(FontTransform::Rotate90))
        .draw()?;

    chart.draw_series(relations.iter().enumerate().map(|(idx, (_, f1))| {
        Rectangle::new(
            [(SegmentValue::Exact(idx), 0.0), (SegmentValue::Exact(idx + 1), *f1)],
            BLUE.filled(),
        )
    }))?;

    root.present()?;
    info!(path = %path.display(), "Saved F1 plot");
    Ok(())
}
