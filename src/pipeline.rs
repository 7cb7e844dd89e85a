//! End-to-end prediction runs: features, trajectories, evaluation records.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::config::RunConfig;
use crate::export;
use crate::features::FeatureExtractor;
use crate::model::{InversionModel, ModelDims};
use crate::predict::TrajectoryPredictor;

/// Folders of one prediction run, relative to the predictions area.
#[derive(Debug, Clone)]
pub struct PredictionRequest {
    pub model_name: String,
    pub wav_folder: String,
    pub mfcc_folder: String,
    pub ema_folder: String,
    /// Record folder under the text-record directory; `None` skips export.
    pub fea_folder: Option<String>,
    pub output_dim: usize,
    /// Zero for every file.
    pub limit: usize,
    pub skip_preprocessing: bool,
    pub skip_prediction: bool,
}

/// Resolved directories of a [`PredictionRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPaths {
    pub wav_dir: PathBuf,
    pub feature_dir: PathBuf,
    pub trajectory_dir: PathBuf,
    pub weights: PathBuf,
    pub record_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub extracted: usize,
    pub predicted: usize,
    pub records: Vec<PathBuf>,
}

impl PredictionRequest {
    pub fn paths(&self, config: &RunConfig) -> RunPaths {
        let layout = &config.layout;
        let predictions = layout.predictions_root();
        RunPaths {
            wav_dir: predictions.join(&self.wav_folder),
            feature_dir: predictions.join(&self.mfcc_folder),
            trajectory_dir: predictions.join(&self.ema_folder).join(&self.model_name),
            weights: layout.model_weights(&self.model_name),
            record_dir: self
                .fea_folder
                .as_ref()
                .map(|folder| layout.records_root().join(folder)),
        }
    }

    fn dims(&self, config: &RunConfig) -> ModelDims {
        config.inversion_dims.with_output_dim(self.output_dim)
    }
}

/// Run the requested stages in order.
///
/// `load_model` is only called when prediction runs, with the weight path and
/// the declared dimensions.
pub fn run_prediction_pipeline<M, F>(
    config: &RunConfig,
    request: &PredictionRequest,
    load_model: F,
) -> Result<RunSummary>
where
    M: InversionModel,
    F: FnOnce(&Path, ModelDims) -> crate::Result<M>,
{
    let paths = request.paths(config);
    let mut summary = RunSummary::default();

    if request.skip_preprocessing {
        info!("preprocessing skipped");
    } else {
        info!(source = %paths.wav_dir.display(), "preprocessing");
        let extractor = FeatureExtractor::default();
        summary.extracted = extractor
            .extract_dir(&paths.wav_dir, &paths.feature_dir, request.limit)
            .with_context(|| format!("failed to extract features from {:?}", paths.wav_dir))?
            .len();
        info!(files = summary.extracted, "preprocessing done");
    }

    if request.skip_prediction {
        info!("prediction skipped");
    } else {
        let model = load_model(&paths.weights, request.dims(config))
            .with_context(|| format!("failed to load model {}", request.model_name))?;
        let predictor = TrajectoryPredictor::new(model);
        summary.predicted = predictor
            .predict_dir(&paths.feature_dir, &paths.trajectory_dir)
            .with_context(|| format!("failed to predict from {:?}", paths.feature_dir))?
            .len();
        info!(files = summary.predicted, "prediction done");
    }

    if let Some(record_dir) = &paths.record_dir {
        summary.records = export::export_dir(&paths.trajectory_dir, record_dir, request.limit)
            .with_context(|| format!("failed to write records into {:?}", record_dir))?;
        info!(files = summary.records.len(), "records written");
    }
    Ok(summary)
}
