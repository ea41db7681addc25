use anyhow::Result;
use tracing::info;

use crate::cli::EvaluateArgs;
use crate::commands::train::{print_report, score_and_evaluate};
use crate::loader;
use crate::ranker::Ranker;

pub fn run(args: EvaluateArgs) -> Result<()> {
    let model = Ranker::load(&args.model_path)?;
    let records = loader::load_candidates(&args.data)?;

    info!(
        model = %args.model_path.display(),
        rows = records.len(),
        truncation_level = args.truncation_level,
        "scoring dataset"
    );

    let report = score_and_evaluate(&model, &records, args.truncation_level)?;
    print_report(&report);

    Ok(())
}
