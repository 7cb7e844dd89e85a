use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Ac2ArtError, Result};
use crate::model::ModelDims;

/// What to do when two arrays that should share a time axis do not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MismatchPolicy {
    /// Abort the run with an error naming the file.
    #[default]
    Strict,
    /// Log a warning and keep going with the inconsistent data.
    Warn,
}

/// On-disk layout of a project, rooted at an explicit directory.
#[derive(Debug, Clone)]
pub struct ProjectLayout {
    pub root: PathBuf,
    pub predictions_dir: String,
    pub weights_dir: String,
    pub velum_weights: String,
    pub raw_dir: String,
    pub preprocessed_dir: String,
    pub records_dir: String,
}

impl ProjectLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            predictions_dir: "Predictions_arti".to_string(),
            weights_dir: "Training/saved_models".to_string(),
            velum_weights: "Apprentissage/saved_models/modeles_valides/modele_velum".to_string(),
            raw_dir: "Donnees_brutes".to_string(),
            preprocessed_dir: "Donnees_pretraitees".to_string(),
            records_dir: "fea_files".to_string(),
        }
    }

    pub fn from_override(path: Option<PathBuf>) -> Result<Self> {
        let root = match path {
            Some(custom) => canonicalize_dir(&custom)?,
            None => std::env::current_dir().map_err(|err| Ac2ArtError::io(".", err))?,
        };
        Ok(Self::new(root))
    }

    /// Folder used by the prediction commands for user-named subfolders.
    pub fn predictions_root(&self) -> PathBuf {
        self.root.join(&self.predictions_dir)
    }

    pub fn model_weights(&self, model_name: &str) -> PathBuf {
        self.root
            .join(&self.weights_dir)
            .join(format!("{model_name}.safetensors"))
    }

    pub fn velum_weights_path(&self) -> PathBuf {
        self.root
            .join(format!("{}.safetensors", self.velum_weights))
    }

    pub fn raw_root(&self) -> PathBuf {
        self.root.join(&self.raw_dir)
    }

    pub fn preprocessed_root(&self) -> PathBuf {
        self.root.join(&self.preprocessed_dir)
    }

    pub fn records_root(&self) -> PathBuf {
        self.predictions_root().join(&self.records_dir)
    }
}

/// Settings threaded through every stage of a run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub layout: ProjectLayout,
    pub mismatch: MismatchPolicy,
    pub inversion_dims: ModelDims,
    pub velum_dims: ModelDims,
}

impl RunConfig {
    pub fn new(layout: ProjectLayout) -> Self {
        Self {
            layout,
            mismatch: MismatchPolicy::default(),
            inversion_dims: ModelDims::inversion(),
            velum_dims: ModelDims::velum(),
        }
    }

    pub fn with_mismatch(mut self, policy: MismatchPolicy) -> Self {
        self.mismatch = policy;
        self
    }

    /// Apply overrides from a JSON file on top of the current settings.
    pub fn apply_file(mut self, path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path).map_err(|err| Ac2ArtError::io(path, err))?;
        let overrides: ConfigOverrides = serde_json::from_str(&data).map_err(|err| {
            Ac2ArtError::Config(format!("failed to parse config file {:?}: {err}", path))
        })?;
        overrides.apply(&mut self);
        Ok(self)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigOverrides {
    predictions_dir: Option<String>,
    weights_dir: Option<String>,
    velum_weights: Option<String>,
    raw_dir: Option<String>,
    preprocessed_dir: Option<String>,
    records_dir: Option<String>,
    hidden_dim: Option<usize>,
    velum_hidden_dim: Option<usize>,
    mismatch: Option<MismatchPolicy>,
}

impl ConfigOverrides {
    fn apply(self, config: &mut RunConfig) {
        let layout = &mut config.layout;
        let fields = [
            (self.predictions_dir, &mut layout.predictions_dir),
            (self.weights_dir, &mut layout.weights_dir),
            (self.velum_weights, &mut layout.velum_weights),
            (self.raw_dir, &mut layout.raw_dir),
            (self.preprocessed_dir, &mut layout.preprocessed_dir),
            (self.records_dir, &mut layout.records_dir),
        ];
        for (value, slot) in fields {
            if let Some(value) = value {
                *slot = value;
            }
        }
        if let Some(hidden) = self.hidden_dim {
            config.inversion_dims.hidden_dim = hidden;
        }
        if let Some(hidden) = self.velum_hidden_dim {
            config.velum_dims.hidden_dim = hidden;
        }
        if let Some(policy) = self.mismatch {
            config.mismatch = policy;
        }
    }
}

fn canonicalize_dir(path: &Path) -> Result<PathBuf> {
    let canonical = path.canonicalize().map_err(|err| Ac2ArtError::io(path, err))?;
    if canonical.is_dir() {
        Ok(canonical)
    } else {
        Err(Ac2ArtError::Config(format!(
            "project root {:?} is not a directory",
            canonical
        )))
    }
}
