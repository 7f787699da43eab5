use comfy_table::{CellAlignment, ContentArrangement, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};

use crate::scoring::{Aggregate, EvaluationResults, Scores, ScoringVariant};

pub const LEGACY_AVERAGE_ROW: &str = "*** Average ***";
pub const ALL_RELATIONS_ROW: &str = "*** All Relations ***";

const LEGACY_HEADER: [&str; 4] = ["Relation", "p", "r", "f1"];
const STANDARD_HEADER: [&str; 9] = [
    "Relation",
    "macro-p",
    "macro-r",
    "macro-f1",
    "micro-p",
    "micro-r",
    "micro-f1",
    "avg. #preds",
    "#empty preds",
];

fn new_table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Disabled)
        .set_header(header.to_vec());
    for idx in 1..header.len() {
        if let Some(column) = table.column_mut(idx) {
            column.set_cell_alignment(CellAlignment::Right);
        }
    }
    table
}

fn score_cells(scores: &Scores) -> [String; 3] {
    [format!("{:.3}", scores.p), format!("{:.3}", scores.r), format!("{:.3}", scores.f1)]
}

fn standard_row(label: &str, aggregate: &Aggregate) -> Vec<String> {
    let mut row = vec![label.to_string()];
    row.extend(score_cells(&aggregate.macro_avg));
    row.extend(score_cells(&aggregate.micro_avg));
    row.push(format!("{:.3}", aggregate.avg_predictions));
    row.push(aggregate.empty_predictions.to_string());
    row
}

/// Per-relation macro scores and the mean of those rows.
pub fn legacy_table(results: &EvaluationResults) -> Table {
    let mut table = new_table(&LEGACY_HEADER);
    for (relation, aggregate) in &results.relations {
        let mut row = vec![relation.clone()];
        row.extend(score_cells(&aggregate.macro_avg));
        table.add_row(row);
    }
    let mut average = vec![LEGACY_AVERAGE_ROW.to_string()];
    average.extend(score_cells(&results.mean_of_relation_macros()));
    table.add_row(average);
    table
}

/// Macro and micro scores per relation plus an all-relations row.
pub fn standard_table(results: &EvaluationResults) -> Table {
    let mut table = new_table(&STANDARD_HEADER);
    for (relation, aggregate) in &results.relations {
        table.add_row(standard_row(relation, aggregate));
    }
    table.add_row(standard_row(ALL_RELATIONS_ROW, &results.overall));
    table
}

pub fn render(results: &EvaluationResults) -> String {
    match results.variant {
        ScoringVariant::Legacy => legacy_table(results).to_string(),
        ScoringVariant::SetBased => standard_table(results).to_string(),
    }
}
