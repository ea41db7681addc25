use anyhow::Result;
use chrono::Utc;
use tracing::info;

use crate::cli::TrainArgs;
use crate::features;
use crate::loader;
use crate::metrics::{self, MetricsReport, ScoredRow};
use crate::model::{CandidateRecord, TrainingRunManifest, TrainingStageMetrics};
use crate::ranker::{Ranker, TrainParams};
use crate::util::{now_utc_string, sha256_file, utc_compact_string, write_json_pretty};

// The sample printout at the end of a run only inspects the leading rows
// of the test set.
const SAMPLE_SCORE_WINDOW: usize = 100;

pub fn run(args: TrainArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("run-{}", utc_compact_string(started_ts));

    let params = TrainParams {
        iterations: args.iterations,
        max_depth: args.max_depth,
        shrinkage: args.shrinkage,
    };

    let train = loader::load_candidates(&args.train_data)?;
    let validation = loader::load_candidates(&args.validation_data)?;
    let test = loader::load_candidates(&args.test_data)?;

    info!(
        run_id = %run_id,
        train_rows = train.len(),
        validation_rows = validation.len(),
        test_rows = test.len(),
        truncation_level = args.truncation_level,
        "starting training run"
    );

    info!(rows = train.len(), "fitting on the training dataset");
    let model = Ranker::train(&train, &params)?;

    info!(rows = validation.len(), "evaluating against the validation dataset");
    let validation_report = score_and_evaluate(&model, &validation, args.truncation_level)?;
    print_report(&validation_report);

    let train_validation: Vec<CandidateRecord> =
        train.iter().chain(validation.iter()).cloned().collect();
    info!(
        rows = train_validation.len(),
        "fitting on the training + validation dataset"
    );
    let model = Ranker::train(&train_validation, &params)?;

    info!(rows = test.len(), "evaluating against the test dataset");
    let test_report = score_and_evaluate(&model, &test, args.truncation_level)?;
    print_report(&test_report);

    let all: Vec<CandidateRecord> = train_validation.iter().chain(test.iter()).cloned().collect();
    info!(rows = all.len(), "fitting on the full dataset");
    let model = Ranker::train(&all, &params)?;

    model.save(&args.model_path)?;
    info!(path = %args.model_path.display(), "saved ranking model");

    // Reload the artifact and rank one group with it, exercising the same
    // consumption path the scoring server uses.
    let reloaded = Ranker::load(&args.model_path)?;
    for (group_key, score) in first_group_scores(&reloaded, &test) {
        println!("GroupId: {group_key}, Score: {score}");
    }

    if let Some(report_path) = &args.report_path {
        let manifest = TrainingRunManifest {
            manifest_version: 1,
            run_id,
            started_at,
            completed_at: now_utc_string(),
            truncation_level: args.truncation_level,
            iterations: args.iterations,
            max_depth: args.max_depth,
            shrinkage: args.shrinkage,
            train_rows: train.len(),
            validation_rows: validation.len(),
            test_rows: test.len(),
            stages: vec![
                TrainingStageMetrics {
                    stage: "validation".to_string(),
                    training_rows: train.len(),
                    evaluation_rows: validation.len(),
                    dcg: validation_report.dcg.clone(),
                    ndcg: validation_report.ndcg.clone(),
                },
                TrainingStageMetrics {
                    stage: "test".to_string(),
                    training_rows: train_validation.len(),
                    evaluation_rows: test.len(),
                    dcg: test_report.dcg.clone(),
                    ndcg: test_report.ndcg.clone(),
                },
            ],
            model_path: args.model_path.display().to_string(),
            model_sha256: sha256_file(&args.model_path)?,
        };
        write_json_pretty(report_path, &manifest)?;
        info!(path = %report_path.display(), "wrote training run manifest");
    }

    Ok(())
}

/// Scores a dataset and evaluates ranking quality over the hashed group
/// key, the same key the feature pipeline trains against.
pub(crate) fn score_and_evaluate(
    model: &Ranker,
    records: &[CandidateRecord],
    truncation_level: usize,
) -> Result<MetricsReport> {
    let scores = model.score_all(records);
    let rows: Vec<ScoredRow> = records
        .iter()
        .zip(scores)
        .map(|(record, score)| {
            ScoredRow::new(
                f64::from(score),
                f64::from(record.label),
                features::group_key(record.group_id),
            )
        })
        .collect();

    let report = metrics::evaluate(&rows, truncation_level)?;
    Ok(report)
}

pub(crate) fn print_report(report: &MetricsReport) {
    println!("{}", report.dcg_line());
    println!("{}", report.ndcg_line());
}

// Scores for the first group of the dataset, best first, drawn from the
// leading SAMPLE_SCORE_WINDOW rows.
fn first_group_scores(model: &Ranker, records: &[CandidateRecord]) -> Vec<(u64, f32)> {
    let Some(first) = records.first() else {
        return Vec::new();
    };
    let first_key = features::group_key(first.group_id);

    let scores = model.score_all(records);
    let mut sampled: Vec<(u64, f32)> = records
        .iter()
        .zip(scores)
        .take(SAMPLE_SCORE_WINDOW)
        .filter(|(record, _)| features::group_key(record.group_id) == first_key)
        .map(|(_, score)| (first_key, score))
        .collect();

    sampled.sort_by(|left, right| right.1.total_cmp(&left.1));
    sampled
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(label: f32, group_id: f32, years_experience: f32) -> CandidateRecord {
        CandidateRecord {
            label,
            group_id,
            education: "Bachelors".to_string(),
            years_experience,
            full_name: "Jordan Sample".to_string(),
            skill_set: "Rust, SQL".to_string(),
        }
    }

    fn trained_model(records: &[CandidateRecord]) -> Ranker {
        let params = TrainParams {
            iterations: 10,
            max_depth: 3,
            shrinkage: 0.3,
        };
        Ranker::train(records, &params).expect("training should succeed")
    }

    #[test]
    fn score_and_evaluate_reports_one_value_per_position() {
        let records = vec![
            record(3.0, 1.0, 9.0),
            record(1.0, 1.0, 2.0),
            record(2.0, 2.0, 5.0),
            record(0.0, 2.0, 1.0),
        ];
        let model = trained_model(&records);

        let report =
            score_and_evaluate(&model, &records, 3).expect("evaluation should succeed");

        assert_eq!(report.dcg.len(), 3);
        assert_eq!(report.ndcg.len(), 3);
        assert!(report.ndcg.iter().all(|value| value.is_finite()));
    }

    #[test]
    fn first_group_scores_cover_only_the_leading_group() {
        let records = vec![
            record(3.0, 7.0, 9.0),
            record(1.0, 7.0, 2.0),
            record(2.0, 8.0, 5.0),
        ];
        let model = trained_model(&records);

        let sampled = first_group_scores(&model, &records);

        let expected_key = features::group_key(7.0);
        assert_eq!(sampled.len(), 2);
        assert!(sampled.iter().all(|(key, _)| *key == expected_key));
        assert!(sampled[0].1 >= sampled[1].1);
    }

    #[test]
    fn first_group_scores_on_an_empty_dataset_are_empty() {
        let model = trained_model(&[record(1.0, 1.0, 1.0), record(0.0, 1.0, 2.0)]);
        assert!(first_group_scores(&model, &[]).is_empty());
    }
}
