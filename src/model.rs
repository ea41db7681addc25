use serde::{Deserialize, Serialize};

/// One candidate row. The serde names double as the CSV header contract
/// (`label,groupId,education,yearsExperience,fullName,skillSet`) and the
/// scoring endpoint's JSON body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateRecord {
    pub label: f32,
    pub group_id: f32,
    pub education: String,
    pub years_experience: f32,
    pub full_name: String,
    pub skill_set: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrainingStageMetrics {
    pub stage: String,
    pub training_rows: usize,
    pub evaluation_rows: usize,
    pub dcg: Vec<f64>,
    pub ndcg: Vec<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrainingRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub started_at: String,
    pub completed_at: String,
    pub truncation_level: usize,
    pub iterations: usize,
    pub max_depth: u32,
    pub shrinkage: f32,
    pub train_rows: usize,
    pub validation_rows: usize,
    pub test_rows: usize,
    pub stages: Vec<TrainingStageMetrics>,
    pub model_path: String,
    pub model_sha256: String,
}
