use ingest::{KbcRow, ObjectEntities};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use crate::metrics::{
    dedup_ids, f1_score, precision, precision_from_counts, recall, recall_from_counts,
    recall_legacy, true_positives,
};

/// How object lists are indexed and scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScoringVariant {
    /// Lists kept as given, duplicates included; `[""]` ground truth counts
    /// as empty. Reported as macro averages only.
    Legacy,
    /// Lists deduplicated into sets; macro and micro averages.
    SetBased,
}

impl ScoringVariant {
    pub fn default_missing_policy(self) -> MissingPolicy {
        match self {
            ScoringVariant::Legacy => MissingPolicy::Fail,
            ScoringVariant::SetBased => MissingPolicy::TreatAsEmpty,
        }
    }
}

impl fmt::Display for ScoringVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoringVariant::Legacy => write!(f, "legacy"),
            ScoringVariant::SetBased => write!(f, "set-based"),
        }
    }
}

impl FromStr for ScoringVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "legacy" => Ok(ScoringVariant::Legacy),
            "set-based" | "set" => Ok(ScoringVariant::SetBased),
            other => Err(format!("unknown scoring variant `{}` (expected legacy or set-based)", other)),
        }
    }
}

/// What to do with a ground-truth pair that has no prediction row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissingPolicy {
    Fail,
    TreatAsEmpty,
}

impl fmt::Display for MissingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingPolicy::Fail => write!(f, "fail"),
            MissingPolicy::TreatAsEmpty => write!(f, "empty"),
        }
    }
}

impl FromStr for MissingPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fail" => Ok(MissingPolicy::Fail),
            "empty" => Ok(MissingPolicy::TreatAsEmpty),
            other => Err(format!("unknown missing-prediction policy `{}` (expected fail or empty)", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScoreError {
    #[error("no prediction for subject `{subject}` and relation `{relation}`")]
    MissingPrediction { subject: String, relation: String },
    #[error("ground truth is empty; nothing to score")]
    EmptyGroundTruth,
}

/// Scores for one (subject, relation) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairScore {
    #[serde(rename = "SubjectEntity")]
    pub subject_entity: String,
    #[serde(rename = "Relation")]
    pub relation: String,
    pub p: f64,
    pub r: f64,
    pub f1: f64,
    pub true_positives: usize,
    pub num_predictions: usize,
    pub num_ground_truth: usize,
    /// Either side was not a list of identifiers.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub type_mismatch: bool,
}

impl PairScore {
    pub fn is_empty_prediction(&self) -> bool {
        self.num_predictions == 0 && !self.type_mismatch
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Scores {
    pub p: f64,
    pub r: f64,
    pub f1: f64,
}

/// Macro and micro averages plus prediction counts over a group of pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    pub pairs: usize,
    #[serde(rename = "macro")]
    pub macro_avg: Scores,
    #[serde(rename = "micro")]
    pub micro_avg: Scores,
    pub avg_predictions: f64,
    pub empty_predictions: usize,
}

impl Aggregate {
    /// `pairs` must not be empty.
    pub fn from_pairs(pairs: &[&PairScore]) -> Self {
        let ps: Vec<f64> = pairs.iter().map(|s| s.p).collect();
        let rs: Vec<f64> = pairs.iter().map(|s| s.r).collect();
        let f1s: Vec<f64> = pairs.iter().map(|s| s.f1).collect();
        let n_preds: Vec<f64> = pairs.iter().map(|s| s.num_predictions as f64).collect();

        let tp: usize = pairs.iter().map(|s| s.true_positives).sum();
        let total_pred: usize = pairs.iter().map(|s| s.num_predictions).sum();
        let total_gt: usize = pairs.iter().map(|s| s.num_ground_truth).sum();
        let micro_p = precision_from_counts(tp, total_pred);
        let micro_r = recall_from_counts(tp, total_gt);

        Self {
            pairs: pairs.len(),
            macro_avg: Scores {
                p: statistical::mean(&ps),
                r: statistical::mean(&rs),
                f1: statistical::mean(&f1s),
            },
            micro_avg: Scores {
                p: micro_p,
                r: micro_r,
                f1: f1_score(micro_p, micro_r),
            },
            avg_predictions: statistical::mean(&n_preds),
            empty_predictions: pairs.iter().filter(|s| s.is_empty_prediction()).count(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResults {
    pub variant: ScoringVariant,
    /// Sorted by relation, then subject.
    pub pairs: Vec<PairScore>,
    pub relations: BTreeMap<String, Aggregate>,
    pub overall: Aggregate,
}

impl EvaluationResults {
    /// Unweighted mean of the per-relation macro averages; the legacy
    /// report's average row.
    pub fn mean_of_relation_macros(&self) -> Scores {
        let macros: Vec<&Scores> = self.relations.values().map(|a| &a.macro_avg).collect();
        Scores {
            p: statistical::mean(&macros.iter().map(|s| s.p).collect::<Vec<_>>()),
            r: statistical::mean(&macros.iter().map(|s| s.r).collect::<Vec<_>>()),
            f1: statistical::mean(&macros.iter().map(|s| s.f1).collect::<Vec<_>>()),
        }
    }
}

pub type RowIndex = HashMap<(String, String), ObjectEntities>;

pub struct Evaluator {
    variant: ScoringVariant,
    missing: MissingPolicy,
}

impl Evaluator {
    pub fn new(variant: ScoringVariant, missing: MissingPolicy) -> Self {
        Self { variant, missing }
    }

    pub fn for_variant(variant: ScoringVariant) -> Self {
        Self::new(variant, variant.default_missing_policy())
    }

    /// Key rows by (subject, relation). Duplicate keys keep the last row.
    pub fn index_rows(&self, rows: &[KbcRow], label: &str) -> RowIndex {
        let mut index = HashMap::with_capacity(rows.len());
        let mut duplicates = 0usize;

        for row in rows {
            let objects = match (&row.object_entities_id, self.variant) {
                (ObjectEntities::Ids(ids), ScoringVariant::SetBased) => ObjectEntities::Ids(dedup_ids(ids)),
                (objects, _) => objects.clone(),
            };
            if index.insert(row.key(), objects).is_some() {
                duplicates += 1;
            }
        }

        if duplicates > 0 {
            warn!(source = label, duplicates, "Duplicate (subject, relation) rows; keeping the last one");
        }
        index
    }

    pub fn score_pair(&self, subject: &str, relation: &str, preds: &ObjectEntities, gts: &ObjectEntities) -> PairScore {
        let p = precision(preds, gts);
        let r = match self.variant {
            ScoringVariant::Legacy => recall_legacy(preds, gts),
            ScoringVariant::SetBased => recall(preds, gts),
        };

        // A malformed side contributes nothing to the micro totals
        let (tp, num_predictions, num_ground_truth) = match (preds.ids(), gts.ids()) {
            (Some(pred_ids), Some(gt_ids)) => (true_positives(pred_ids, gt_ids), pred_ids.len(), gt_ids.len()),
            _ => (0, 0, 0),
        };

        PairScore {
            subject_entity: subject.to_string(),
            relation: relation.to_string(),
            p,
            r,
            f1: f1_score(p, r),
            true_positives: tp,
            num_predictions,
            num_ground_truth,
            type_mismatch: preds.is_malformed() || gts.is_malformed(),
        }
    }

    /// Score every ground-truth pair, sorted by (relation, subject).
    pub fn evaluate_per_pair(&self, pred_rows: &[KbcRow], gt_rows: &[KbcRow]) -> Result<Vec<PairScore>, ScoreError> {
        let pred_index = self.index_rows(pred_rows, "predictions");
        let gt_index = self.index_rows(gt_rows, "ground truth");

        let extra = pred_index.keys().filter(|key| !gt_index.contains_key(*key)).count();
        if extra > 0 {
            warn!(extra, "Predictions without a ground-truth row are ignored");
        }

        // (relation, subject) order; the first missing pair is the one reported
        let mut keys: Vec<&(String, String)> = gt_index.keys().collect();
        keys.sort_by(|(sa, ra), (sb, rb)| (ra, sa).cmp(&(rb, sb)));

        let empty = ObjectEntities::default();
        let mut results = Vec::with_capacity(keys.len());

        for key in keys {
            let (subject, relation) = key;
            let gts = &gt_index[key];
            let preds = match (pred_index.get(key), self.missing) {
                (Some(preds), _) => preds,
                (None, MissingPolicy::TreatAsEmpty) => &empty,
                (None, MissingPolicy::Fail) => {
                    return Err(ScoreError::MissingPrediction {
                        subject: subject.clone(),
                        relation: relation.clone(),
                    });
                }
            };
            let score = self.score_pair(subject, relation, preds, gts);
            if score.type_mismatch {
                warn!(subject = %subject, relation = %relation, "Object list is not an array of identifiers; scoring as 0");
            }
            results.push(score);
        }

        Ok(results)
    }

    pub fn evaluate(&self, pred_rows: &[KbcRow], gt_rows: &[KbcRow]) -> Result<EvaluationResults, ScoreError> {
        let pairs = self.evaluate_per_pair(pred_rows, gt_rows)?;
        if pairs.is_empty() {
            return Err(ScoreError::EmptyGroundTruth);
        }

        let mut by_relation: BTreeMap<String, Vec<&PairScore>> = BTreeMap::new();
        for pair in &pairs {
            by_relation.entry(pair.relation.clone()).or_default().push(pair);
        }
        let relations = by_relation
            .into_iter()
            .map(|(relation, group)| (relation, Aggregate::from_pairs(&group)))
            .collect();

        let all: Vec<&PairScore> = pairs.iter().collect();
        let overall = Aggregate::from_pairs(&all);

        Ok(EvaluationResults {
            variant: self.variant,
            pairs,
            relations,
            overall,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(subject: &str, relation: &str, objects: &[&str]) -> KbcRow {
        KbcRow::new(subject, relation, objects.iter().copied().collect())
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_micro_pools_counts() {
        let gts = vec![row("A", "R", &["Q1"]), row("B", "R", &["Q2"])];
        let preds = vec![row("A", "R", &["Q1"]), row("B", "R", &["Q3", "Q4"])];

        let results = Evaluator::for_variant(ScoringVariant::SetBased).evaluate(&preds, &gts).unwrap();
        let micro = results.relations["R"].micro_avg;

        assert!(approx(micro.p, 1.0 / 3.0));
        assert!(approx(micro.r, 0.5));
        assert!(approx(micro.f1, 0.4));
    }

    #[test]
    fn test_macro_overall_is_flat_mean() {
        let gts = vec![
            row("A", "R1", &["Q1"]),
            row("B", "R1", &["Q2"]),
            row("C", "R1", &["Q3"]),
            row("D", "R2", &["Q4"]),
        ];
        let preds = vec![
            row("A", "R1", &["Q1"]),
            row("B", "R1", &["Q2"]),
            row("C", "R1", &["Q3"]),
            row("D", "R2", &["Q9"]),
        ];

        let results = Evaluator::for_variant(ScoringVariant::SetBased).evaluate(&preds, &gts).unwrap();

        // 3 perfect pairs + 1 miss, not (1.0 + 0.0) / 2
        assert!(approx(results.overall.macro_avg.f1, 0.75));
        assert!(approx(results.mean_of_relation_macros().f1, 0.5));
    }

    #[test]
    fn test_set_and_legacy_disagree_on_duplicates() {
        let gts = vec![row("A", "R", &["Q1", "Q2"])];
        let preds = vec![row("A", "R", &["Q1", "Q1"])];

        let set = Evaluator::for_variant(ScoringVariant::SetBased).evaluate_per_pair(&preds, &gts).unwrap();
        assert_eq!(set[0].true_positives, 1);
        assert_eq!(set[0].num_predictions, 1);
        assert!(approx(set[0].p, 1.0));
        assert!(approx(set[0].r, 0.5));

        let legacy = Evaluator::for_variant(ScoringVariant::Legacy).evaluate_per_pair(&preds, &gts).unwrap();
        assert_eq!(legacy[0].true_positives, 2);
        assert_eq!(legacy[0].num_predictions, 2);
        assert!(approx(legacy[0].p, 1.0));
        assert!(approx(legacy[0].r, 1.0));
    }

    #[test]
    fn test_missing_prediction_fails() {
        let gts = vec![row("A", "R", &["Q1"]), row("B", "R", &["Q2"])];
        let preds = vec![row("A", "R", &["Q1"])];

        let err = Evaluator::new(ScoringVariant::SetBased, MissingPolicy::Fail)
            .evaluate(&preds, &gts)
            .unwrap_err();
        assert_eq!(
            err,
            ScoreError::MissingPrediction {
                subject: "B".to_string(),
                relation: "R".to_string()
            }
        );
    }

    #[test]
    fn test_missing_prediction_as_empty() {
        let gts = vec![row("A", "R", &["Q1"]), row("B", "R", &["Q2"])];
        let preds = vec![row("A", "R", &["Q1"])];

        let results = Evaluator::new(ScoringVariant::Legacy, MissingPolicy::TreatAsEmpty)
            .evaluate(&preds, &gts)
            .unwrap();

        // Still counted in the denominator
        assert_eq!(results.overall.pairs, 2);
        assert_eq!(results.overall.empty_predictions, 1);
        assert!(approx(results.pairs[1].p, 1.0));
        assert!(approx(results.pairs[1].r, 0.0));
    }

    #[test]
    fn test_pairs_sorted_by_relation_then_subject() {
        let gts = vec![
            row("b", "R2", &[]),
            row("z", "R1", &[]),
            row("a", "R2", &[]),
            row("m", "R1", &[]),
        ];
        let pairs = Evaluator::for_variant(ScoringVariant::SetBased).evaluate_per_pair(&gts, &gts).unwrap();
        let keys: Vec<(&str, &str)> = pairs
            .iter()
            .map(|p| (p.relation.as_str(), p.subject_entity.as_str()))
            .collect();

        assert_eq!(keys, vec![("R1", "m"), ("R1", "z"), ("R2", "a"), ("R2", "b")]);
    }

    #[test]
    fn test_prediction_statistics() {
        let gts = vec![row("A", "R", &["Q1"]), row("B", "R", &["Q2"]), row("C", "S", &[])];
        let preds = vec![row("A", "R", &["Q1", "Q5", "Q6"]), row("B", "R", &[]), row("C", "S", &[])];

        let results = Evaluator::for_variant(ScoringVariant::SetBased).evaluate(&preds, &gts).unwrap();

        assert!(approx(results.relations["R"].avg_predictions, 1.5));
        assert_eq!(results.relations["R"].empty_predictions, 1);
        assert_eq!(results.relations["S"].empty_predictions, 1);
        assert!(approx(results.overall.avg_predictions, 1.0));
        assert_eq!(results.overall.empty_predictions, 2);
    }

    #[test]
    fn test_micro_conventions_when_nothing_to_count() {
        let gts = vec![row("A", "R", &[])];
        let preds = vec![row("A", "R", &[])];

        let results = Evaluator::for_variant(ScoringVariant::SetBased).evaluate(&preds, &gts).unwrap();
        assert_eq!(results.overall.micro_avg, Scores { p: 1.0, r: 1.0, f1: 1.0 });
    }

    #[test]
    fn test_type_mismatch_is_contained() {
        let gts = vec![row("A", "R", &["Q1"]), row("B", "R", &["Q2"])];
        let preds = vec![
            KbcRow::new("A", "R", ObjectEntities::Malformed(serde_json::Value::Null)),
            row("B", "R", &["Q2"]),
        ];

        let results = Evaluator::for_variant(ScoringVariant::SetBased).evaluate(&preds, &gts).unwrap();
        assert!(results.pairs[0].type_mismatch);
        assert_eq!(results.pairs[0].f1, 0.0);
        assert_eq!(results.pairs[1].f1, 1.0);
        assert_eq!(results.overall.empty_predictions, 0);
    }

    #[test]
    fn test_malformed_pair_left_out_of_micro_totals() {
        let gts = vec![
            KbcRow::new("A", "R", ObjectEntities::Malformed(serde_json::Value::Null)),
            row("B", "R", &["Q2"]),
        ];
        let preds = vec![row("A", "R", &["Q1", "Q3", "Q4"]), row("B", "R", &["Q2"])];

        let results = Evaluator::for_variant(ScoringVariant::SetBased).evaluate(&preds, &gts).unwrap();
        assert_eq!(results.pairs[0].num_predictions, 0);
        assert_eq!(results.pairs[0].num_ground_truth, 0);
        assert_eq!(results.overall.micro_avg, Scores { p: 1.0, r: 1.0, f1: 1.0 });
        // macro still sees the zeroed pair
        assert_eq!(results.overall.macro_avg.f1, 0.5);
    }

    #[test]
    fn test_first_missing_pair_in_report_order_is_reported() {
        let gts: Vec<KbcRow> = (0..20)
            .map(|i| row(&format!("S{:02}", i), if i % 2 == 0 { "R2" } else { "R1" }, &["Q1"]))
            .collect();
        let preds = vec![row("S01", "R1", &["Q1"])];
        let evaluator = Evaluator::new(ScoringVariant::SetBased, MissingPolicy::Fail);

        for _ in 0..10 {
            let err = evaluator.evaluate(&preds, &gts).unwrap_err();
            assert_eq!(
                err,
                ScoreError::MissingPrediction {
                    subject: "S03".to_string(),
                    relation: "R1".to_string()
                }
            );
        }
    }

    #[test]
    fn test_duplicate_ground_truth_last_wins() {
        let gts = vec![row("A", "R", &["Q1"]), row("A", "R", &["Q2"])];
        let preds = vec![row("A", "R", &["Q2"])];

        let pairs = Evaluator::for_variant(ScoringVariant::Legacy).evaluate_per_pair(&preds, &gts).unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].f1, 1.0);
    }

    #[test]
    fn test_empty_ground_truth_is_error() {
        let err = Evaluator::for_variant(ScoringVariant::SetBased).evaluate(&[], &[]).unwrap_err();
        assert_eq!(err, ScoreError::EmptyGroundTruth);
    }

    #[test]
    fn test_scores_within_unit_interval() {
        let gts = vec![
            row("A", "R", &["Q1", "Q2"]),
            row("B", "R", &[]),
            row("C", "R", &[""]),
            row("D", "S", &["Q1"]),
        ];
        let preds = vec![
            row("A", "R", &["Q1", "Q1", "Q1", "Q2"]),
            row("B", "R", &["Q9"]),
            row("C", "R", &["Q1"]),
            row("D", "S", &[]),
        ];

        for variant in [ScoringVariant::Legacy, ScoringVariant::SetBased] {
            let results = Evaluator::new(variant, MissingPolicy::Fail).evaluate(&preds, &gts).unwrap();
            for pair in &results.pairs {
                for value in [pair.p, pair.r, pair.f1] {
                    assert!((0.0..=1.0).contains(&value), "{:?}", pair);
                }
            }
        }
    }

    #[test]
    fn test_repeated_runs_are_identical() {
        let gts = vec![row("A", "R", &["Q1", "Q2"]), row("B", "S", &["Q3"]), row("C", "R", &[])];
        let preds = vec![row("C", "R", &["Q4"]), row("A", "R", &["Q2"]), row("B", "S", &["Q3"])];
        let evaluator = Evaluator::for_variant(ScoringVariant::SetBased);

        let first = serde_json::to_string(&evaluator.evaluate(&preds, &gts).unwrap()).unwrap();
        let second = serde_json::to_string(&evaluator.evaluate(&preds, &gts).unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_variant_parsing() {
        assert_eq!("legacy".parse::<ScoringVariant>(), Ok(ScoringVariant::Legacy));
        assert_eq!("set-based".parse::<ScoringVariant>(), Ok(ScoringVariant::SetBased));
        assert!("micro".parse::<ScoringVariant>().is_err());
        assert_eq!("empty".parse::<MissingPolicy>(), Ok(MissingPolicy::TreatAsEmpty));
    }
}
