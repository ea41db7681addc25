use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::metrics;

#[derive(Parser, Debug)]
#[command(
    name = "candidate-ranker",
    version,
    about = "Candidate ranking model training, evaluation, and scoring"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Train(TrainArgs),
    Evaluate(EvaluateArgs),
    Serve(ServeArgs),
}

#[derive(Args, Debug, Clone)]
pub struct TrainArgs {
    #[arg(long, default_value = "assets/input/candidates-train.csv")]
    pub train_data: PathBuf,

    #[arg(long, default_value = "assets/input/candidates-validation.csv")]
    pub validation_data: PathBuf,

    #[arg(long, default_value = "assets/input/candidates-test.csv")]
    pub test_data: PathBuf,

    #[arg(long, default_value = "assets/output/ranking-model.json")]
    pub model_path: PathBuf,

    #[arg(long)]
    pub report_path: Option<PathBuf>,

    #[arg(long, default_value_t = metrics::DEFAULT_TRUNCATION_LEVEL)]
    pub truncation_level: usize,

    #[arg(long, default_value_t = 200)]
    pub iterations: usize,

    #[arg(long, default_value_t = 6)]
    pub max_depth: u32,

    #[arg(long, default_value_t = 0.1)]
    pub shrinkage: f32,
}

#[derive(Args, Debug, Clone)]
pub struct EvaluateArgs {
    #[arg(long, default_value = "assets/output/ranking-model.json")]
    pub model_path: PathBuf,

    #[arg(long)]
    pub data: PathBuf,

    #[arg(long, default_value_t = metrics::DEFAULT_TRUNCATION_LEVEL)]
    pub truncation_level: usize,
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    #[arg(long, default_value = "assets/output/ranking-model.json")]
    pub model_path: PathBuf,

    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    #[arg(long, default_value_t = 8080)]
    pub port: u16,

    #[arg(long, default_value_t = false)]
    pub watch_model: bool,
}
