use std::path::Path;

use ndarray::Array2;
use tracing::{debug, info};

use crate::error::Result;
use crate::model::{predict_sequence, InversionModel};
use crate::storage;

/// Runs a loaded inversion model over directories of feature matrices.
#[derive(Debug)]
pub struct TrajectoryPredictor<M> {
    model: M,
}

impl<M: InversionModel> TrajectoryPredictor<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }

    /// Predict one `(frames, output_dim)` trajectory.
    pub fn predict(&self, features: &Array2<f64>) -> Result<Array2<f64>> {
        predict_sequence(&self.model, features.view())
    }

    /// Predict every feature file in `feature_dir` into `trajectory_dir`,
    /// keeping file names. The first failing file aborts the run.
    pub fn predict_dir(&self, feature_dir: &Path, trajectory_dir: &Path) -> Result<Vec<String>> {
        storage::ensure_dir(trajectory_dir)?;
        let stems = storage::list_stems(feature_dir, storage::ARRAY_EXTENSION)?;
        info!(
            files = stems.len(),
            source = %feature_dir.display(),
            target = %trajectory_dir.display(),
            "predicting articulatory trajectories"
        );
        for stem in &stems {
            let features = storage::read_matrix(&storage::array_path(feature_dir, stem))?;
            let trajectory = self.predict(&features)?;
            debug!(file = %stem, frames = trajectory.nrows(), "trajectory predicted");
            storage::write_matrix(&storage::array_path(trajectory_dir, stem), &trajectory)?;
        }
        Ok(stems)
    }
}
