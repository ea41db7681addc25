use std::collections::HashMap;

use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;

pub const DEFAULT_TRUNCATION_LEVEL: usize = 3;
pub const MAX_TRUNCATION_LEVEL: usize = 10;

/// One scored row as it crosses the ranker/evaluator boundary. Scores are
/// only comparable between rows that share a `group_key`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredRow {
    pub score: f64,
    pub label: f64,
    pub group_key: u64,
}

impl ScoredRow {
    pub fn new(score: f64, label: f64, group_key: u64) -> Self {
        Self {
            score,
            label,
            group_key,
        }
    }
}

/// Maps a relevance label to its gain contribution.
pub type GainFn = fn(f64) -> f64;

/// Default gain: the label value itself, no transform.
pub fn identity_gain(label: f64) -> f64 {
    label
}

/// Graded-relevance alternative (2^label - 1). Not the default; callers
/// opt in through [`evaluate_with_gain`].
#[allow(dead_code)]
pub fn exponential_gain(label: f64) -> f64 {
    2.0_f64.powf(label) - 1.0
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MetricsError {
    #[error("truncation level must be between 1 and {MAX_TRUNCATION_LEVEL}, got {0}")]
    InvalidTruncationLevel(usize),

    #[error("group {0} has no rows")]
    EmptyGroup(u64),

    #[error("no rows to evaluate")]
    EmptyInput,
}

/// DCG and NDCG per rank position 1..=T, averaged over all groups with an
/// unweighted mean: a two-row group counts the same as a two-hundred-row
/// group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsReport {
    pub dcg: Vec<f64>,
    pub ndcg: Vec<f64>,
}

impl MetricsReport {
    pub fn dcg_line(&self) -> String {
        format!("DCG: {}", format_positions(&self.dcg))
    }

    pub fn ndcg_line(&self) -> String {
        format!("NDCG: {}", format_positions(&self.ndcg))
    }
}

fn format_positions(values: &[f64]) -> String {
    values
        .iter()
        .enumerate()
        .map(|(index, value)| format!("@{}:{:.4}", index + 1, value))
        .collect::<Vec<String>>()
        .join(", ")
}

/// Evaluates ranking quality with the identity gain policy.
pub fn evaluate(rows: &[ScoredRow], truncation_level: usize) -> Result<MetricsReport, MetricsError> {
    evaluate_with_gain(rows, truncation_level, identity_gain)
}

/// Evaluates DCG and NDCG at positions 1..=`truncation_level` for every
/// group, then averages the per-group values. Groups are independent, so
/// their metrics are computed in parallel; the collect preserves group
/// order and the mean is order-independent.
pub fn evaluate_with_gain(
    rows: &[ScoredRow],
    truncation_level: usize,
    gain: GainFn,
) -> Result<MetricsReport, MetricsError> {
    if truncation_level < 1 || truncation_level > MAX_TRUNCATION_LEVEL {
        return Err(MetricsError::InvalidTruncationLevel(truncation_level));
    }
    if rows.is_empty() {
        return Err(MetricsError::EmptyInput);
    }

    let groups = group_rows(rows);
    let per_group = groups
        .par_iter()
        .map(|group| group_metrics(group, truncation_level, gain))
        .collect::<Result<Vec<GroupMetrics>, MetricsError>>()?;

    let mut dcg = vec![0.0_f64; truncation_level];
    let mut ndcg = vec![0.0_f64; truncation_level];
    for metrics in &per_group {
        for position in 0..truncation_level {
            dcg[position] += metrics.dcg[position];
            ndcg[position] += metrics.ndcg[position];
        }
    }

    let group_count = per_group.len() as f64;
    for position in 0..truncation_level {
        dcg[position] /= group_count;
        ndcg[position] /= group_count;
    }

    Ok(MetricsReport { dcg, ndcg })
}

struct Group {
    key: u64,
    rows: Vec<ScoredRow>,
}

struct GroupMetrics {
    dcg: Vec<f64>,
    ndcg: Vec<f64>,
}

// First-seen group order, input order preserved within each group.
fn group_rows(rows: &[ScoredRow]) -> Vec<Group> {
    let mut groups = Vec::<Group>::new();
    let mut index_by_key = HashMap::<u64, usize>::new();

    for row in rows {
        match index_by_key.get(&row.group_key) {
            Some(&index) => groups[index].rows.push(*row),
            None => {
                index_by_key.insert(row.group_key, groups.len());
                groups.push(Group {
                    key: row.group_key,
                    rows: vec![*row],
                });
            }
        }
    }

    groups
}

fn group_metrics(
    group: &Group,
    truncation_level: usize,
    gain: GainFn,
) -> Result<GroupMetrics, MetricsError> {
    if group.rows.is_empty() {
        return Err(MetricsError::EmptyGroup(group.key));
    }

    // Predicted order: descending score; the stable sort keeps tied rows
    // in input order.
    let mut by_score: Vec<&ScoredRow> = group.rows.iter().collect();
    by_score.sort_by(|left, right| right.score.total_cmp(&left.score));

    // Ideal order: descending true label.
    let mut ideal_labels: Vec<f64> = group.rows.iter().map(|row| row.label).collect();
    ideal_labels.sort_by(|left, right| right.total_cmp(left));

    let dcg = cumulative_gains(by_score.iter().map(|row| row.label), truncation_level, gain);
    let idcg = cumulative_gains(ideal_labels.iter().copied(), truncation_level, gain);

    let ndcg = dcg
        .iter()
        .zip(idcg.iter())
        .map(|(&observed, &ideal)| if ideal > 0.0 { observed / ideal } else { 0.0 })
        .collect();

    Ok(GroupMetrics { dcg, ndcg })
}

// Running sum of gain(label) / log2(position + 1). Once the labels run
// out the sum saturates: DCG(p) for p past the group size equals DCG at
// the group size.
fn cumulative_gains(
    labels: impl Iterator<Item = f64>,
    truncation_level: usize,
    gain: GainFn,
) -> Vec<f64> {
    let mut cumulative = Vec::with_capacity(truncation_level);
    let mut running = 0.0_f64;
    let mut labels = labels;

    for position in 1..=truncation_level {
        if let Some(label) = labels.next() {
            running += gain(label) / ((position as f64) + 1.0).log2();
        }
        cumulative.push(running);
    }

    cumulative
}
