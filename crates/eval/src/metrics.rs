//! Pair-level precision, recall and F1.
//!
//! Scores are computed over `ObjectEntities` so that a malformed value (not
//! an array of identifiers) only zeroes the metric that has to look inside
//! it, instead of failing the run.

use ingest::{EntityId, ObjectEntities};
use std::collections::HashSet;

/// Predicted identifiers found in the ground truth, counted once per
/// occurrence in `preds`.
pub fn true_positives(preds: &[EntityId], gts: &[EntityId]) -> usize {
    preds.iter().filter(|pred| gts.contains(pred)).count()
}

/// `tp / n_pred`, with an empty prediction scoring 1.0.
pub fn precision_from_counts(tp: usize, n_pred: usize) -> f64 {
    if n_pred == 0 {
        return 1.0;
    }
    (tp as f64 / n_pred as f64).min(1.0)
}

/// `tp / n_gt`, with an empty ground truth scoring 1.0.
pub fn recall_from_counts(tp: usize, n_gt: usize) -> f64 {
    if n_gt == 0 {
        return 1.0;
    }
    (tp as f64 / n_gt as f64).min(1.0)
}

/// Nothing predicted means precision 1.0, whatever the ground truth holds.
pub fn precision(preds: &ObjectEntities, gts: &ObjectEntities) -> f64 {
    let Some(preds) = preds.ids() else {
        return 0.0;
    };
    if preds.is_empty() {
        return 1.0;
    }
    match gts.ids() {
        Some(gts) => precision_from_counts(true_positives(preds, gts), preds.len()),
        None => 0.0,
    }
}

/// An empty ground truth means recall 1.0, even if something was predicted.
pub fn recall(preds: &ObjectEntities, gts: &ObjectEntities) -> f64 {
    let Some(gts) = gts.ids() else {
        return 0.0;
    };
    if gts.is_empty() {
        return 1.0;
    }
    match preds.ids() {
        Some(preds) => recall_from_counts(true_positives(preds, gts), gts.len()),
        None => 0.0,
    }
}

/// [`recall`] that also treats `[""]` as an empty ground truth, as older
/// ground-truth files encode "no answer" that way.
pub fn recall_legacy(preds: &ObjectEntities, gts: &ObjectEntities) -> f64 {
    if let Some([only]) = gts.ids() {
        if only.is_empty_text() {
            return 1.0;
        }
    }
    recall(preds, gts)
}

pub fn f1_score(p: f64, r: f64) -> f64 {
    if p + r == 0.0 {
        return 0.0;
    }
    (2.0 * p * r) / (p + r)
}

/// Drop repeated identifiers, keeping first-occurrence order.
pub fn dedup_ids(ids: &[EntityId]) -> Vec<EntityId> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().filter(|id| seen.insert(*id)).cloned().collect()
}
