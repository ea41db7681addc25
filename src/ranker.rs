use std::path::Path;

use anyhow::{Result, anyhow, bail};
use gbdt::config::Config;
use gbdt::decision_tree::{Data, DataVec};
use gbdt::gradient_boost::GBDT;

use crate::features;
use crate::model::CandidateRecord;
use crate::util::ensure_directory;

#[derive(Debug, Clone)]
pub struct TrainParams {
    pub iterations: usize,
    pub max_depth: u32,
    pub shrinkage: f32,
}

impl Default for TrainParams {
    fn default() -> Self {
        Self {
            iterations: 200,
            max_depth: 6,
            shrinkage: 0.1,
        }
    }
}

/// Boosted-tree scorer over featurized candidate rows. Scores are only
/// meaningful relative to other rows in the same group.
pub struct Ranker {
    model: GBDT,
}

impl std::fmt::Debug for Ranker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ranker").finish_non_exhaustive()
    }
}

impl Ranker {
    pub fn train(records: &[CandidateRecord], params: &TrainParams) -> Result<Self> {
        if records.is_empty() {
            bail!("cannot train a ranking model on an empty dataset");
        }

        let mut config = Config::new();
        config.set_feature_size(features::FEATURE_DIM);
        config.set_max_depth(params.max_depth);
        config.set_iterations(params.iterations);
        config.set_shrinkage(params.shrinkage);
        config.set_loss("SquaredError");

        let mut training: DataVec = records
            .iter()
            .map(|record| {
                Data::new_training_data(features::featurize(record), 1.0, record.label, None)
            })
            .collect();

        let mut model = GBDT::new(&config);
        model.fit(&mut training);

        Ok(Self { model })
    }

    pub fn score(&self, record: &CandidateRecord) -> f32 {
        self.score_all(std::slice::from_ref(record))[0]
    }

    pub fn score_all(&self, records: &[CandidateRecord]) -> Vec<f32> {
        let data: DataVec = records
            .iter()
            .map(|record| Data::new_test_data(features::featurize(record), None))
            .collect();
        self.model.predict(&data)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            ensure_directory(parent)?;
        }
        let path_str = path_str(path)?;
        self.model
            .save_model(path_str)
            .map_err(|err| anyhow!("failed to save model to {}: {err}", path.display()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let path_str = path_str(path)?;
        let model = GBDT::load_model(path_str)
            .map_err(|err| anyhow!("failed to load model from {}: {err}", path.display()))?;
        Ok(Self { model })
    }
}

fn path_str(path: &Path) -> Result<&str> {
    path.to_str()
        .ok_or_else(|| anyhow!("model path is not valid utf-8: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(label: f32, years_experience: f32, skill_set: &str) -> CandidateRecord {
        CandidateRecord {
            label,
            group_id: 1.0,
            education: "Bachelors".to_string(),
            years_experience,
            full_name: "Jordan Sample".to_string(),
            skill_set: skill_set.to_string(),
        }
    }

    fn separable_dataset() -> Vec<CandidateRecord> {
        let mut records = Vec::new();
        for _ in 0..20 {
            records.push(record(3.0, 12.0, "Rust, SQL, Kubernetes"));
            records.push(record(0.0, 1.0, "Excel"));
        }
        records
    }

    fn quick_params() -> TrainParams {
        TrainParams {
            iterations: 20,
            max_depth: 3,
            shrinkage: 0.3,
        }
    }

    #[test]
    fn training_on_an_empty_dataset_fails() {
        assert!(Ranker::train(&[], &quick_params()).is_err());
    }

    #[test]
    fn scores_are_produced_for_every_row() {
        let records = separable_dataset();
        let model = Ranker::train(&records, &quick_params()).expect("training should succeed");
        assert_eq!(model.score_all(&records).len(), records.len());
    }

    #[test]
    fn clearly_separable_rows_rank_in_label_order() {
        let records = separable_dataset();
        let model = Ranker::train(&records, &quick_params()).expect("training should succeed");

        let strong = model.score(&record(0.0, 12.0, "Rust, SQL, Kubernetes"));
        let weak = model.score(&record(0.0, 1.0, "Excel"));
        assert!(
            strong > weak,
            "expected the stronger candidate to outscore the weaker one ({strong} vs {weak})"
        );
    }

    #[test]
    fn saved_and_reloaded_models_score_identically() {
        let records = separable_dataset();
        let model = Ranker::train(&records, &quick_params()).expect("training should succeed");

        let dir = tempfile::tempdir().expect("tempdir should be created");
        let path = dir.path().join("model").join("ranking-model.json");
        model.save(&path).expect("model should save");

        let reloaded = Ranker::load(&path).expect("model should load");
        assert_eq!(model.score_all(&records), reloaded.score_all(&records));
    }

    #[test]
    fn loading_a_missing_artifact_fails_with_the_path_in_the_message() {
        let error = Ranker::load(Path::new("/nonexistent/model.json"))
            .expect_err("loading a missing artifact should fail");
        assert!(error.to_string().contains("/nonexistent/model.json"));
    }
}
