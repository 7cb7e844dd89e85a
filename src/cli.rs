use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{ensure, Result};
use clap::{Args, Parser, Subcommand};

use crate::augment::{Corpus, Speaker};
use crate::config::{MismatchPolicy, ProjectLayout, RunConfig};
use crate::pipeline::PredictionRequest;
use crate::types::MAX_SEQUENCE_FRAMES;

#[derive(Parser, Debug)]
#[command(
    name = "ac2art",
    version,
    about = "Acoustic-to-articulatory inversion: features, predictions and corpus preparation"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Extract features, predict trajectories and write ABX records.
    PredictAbx(PredictAbxArgs),
    /// Extract features and predict trajectories for a folder of wav files.
    Invert(InvertArgs),
    /// Add vocal tract descriptors to preprocessed speaker trajectories.
    Augment(AugmentArgs),
    /// Cut over-long recordings into segments across aligned arrays.
    Split(SplitArgs),
}

#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Project root; defaults to the current directory.
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,
    /// JSON file overriding directory names, hidden sizes or the mismatch policy.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
    /// Behaviour when aligned arrays disagree in length.
    #[arg(long, global = true, value_enum)]
    pub mismatch: Option<MismatchPolicy>,
    /// Hidden size of the inversion network.
    #[arg(long = "hidden-dim", global = true)]
    pub hidden_dim: Option<usize>,
}

impl GlobalArgs {
    /// Layout defaults, then the config file, then explicit flags.
    pub fn run_config(&self) -> Result<RunConfig> {
        let layout = ProjectLayout::from_override(self.root.clone())?;
        let mut config = RunConfig::new(layout);
        if let Some(path) = &self.config {
            config = config.apply_file(path)?;
        }
        if let Some(policy) = self.mismatch {
            config = config.with_mismatch(policy);
        }
        if let Some(hidden) = self.hidden_dim {
            ensure!(hidden > 0, "hidden-dim must be positive");
            config.inversion_dims.hidden_dim = hidden;
        }
        Ok(config)
    }
}

#[derive(Args, Debug, Clone)]
pub struct PredictAbxArgs {
    /// Weight file name under the saved models directory, without extension.
    pub model_name: String,
    /// Folder of wav files under the predictions area.
    pub wav_folder: String,
    /// Folder receiving feature matrices.
    pub mfcc_folder: String,
    /// Folder receiving trajectories, one subfolder per model.
    pub ema_folder: String,
    /// Record folder under the text-record directory.
    pub fea_folder: String,
    /// Maximum number of files to process; 0 processes all.
    #[arg(long = "Nmax", default_value_t = 0)]
    pub nmax: usize,
    /// Number of articulatory channels predicted by the model.
    #[arg(long = "output_dim", default_value_t = 18)]
    pub output_dim: usize,
    /// Features already extracted.
    #[arg(long = "prep_done")]
    pub prep_done: bool,
    /// Trajectories already predicted.
    #[arg(long = "pred_done")]
    pub pred_done: bool,
}

impl PredictAbxArgs {
    pub fn request(&self) -> Result<PredictionRequest> {
        ensure!(self.output_dim > 0, "output_dim must be positive");
        Ok(PredictionRequest {
            model_name: self.model_name.clone(),
            wav_folder: self.wav_folder.clone(),
            mfcc_folder: self.mfcc_folder.clone(),
            ema_folder: self.ema_folder.clone(),
            fea_folder: Some(self.fea_folder.clone()),
            output_dim: self.output_dim,
            limit: self.nmax,
            skip_preprocessing: self.prep_done,
            skip_prediction: self.pred_done,
        })
    }
}

#[derive(Args, Debug, Clone)]
pub struct InvertArgs {
    /// Folder of wav files under the predictions area.
    pub wav_folder: String,
    /// Folder receiving feature matrices.
    pub mfcc_folder: String,
    /// Folder receiving trajectories, one subfolder per model.
    pub output_folder: String,
    /// Weight file name under the saved models directory, without extension.
    pub model_name: String,
    /// Number of articulatory channels predicted by the model.
    #[arg(long = "output_dim", default_value_t = 18)]
    pub output_dim: usize,
    /// Features already extracted.
    #[arg(long = "already_prepro")]
    pub already_prepro: bool,
}

impl InvertArgs {
    pub fn request(&self) -> Result<PredictionRequest> {
        ensure!(self.output_dim > 0, "output_dim must be positive");
        Ok(PredictionRequest {
            model_name: self.model_name.clone(),
            wav_folder: self.wav_folder.clone(),
            mfcc_folder: self.mfcc_folder.clone(),
            ema_folder: self.output_folder.clone(),
            fea_folder: None,
            output_dim: self.output_dim,
            limit: 0,
            skip_preprocessing: self.already_prepro,
            skip_prediction: false,
        })
    }
}

/// A whole corpus or a single speaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AugmentTarget {
    Corpus(Corpus),
    Speaker(Speaker),
}

impl FromStr for AugmentTarget {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        if let Ok(corpus) = value.parse::<Corpus>() {
            return Ok(Self::Corpus(corpus));
        }
        value
            .parse::<Speaker>()
            .map(Self::Speaker)
            .map_err(|_| format!("unknown corpus or speaker: {value}"))
    }
}

#[derive(Args, Debug, Clone)]
pub struct AugmentArgs {
    /// Corpora (mocha, usc, mngu0, haskins) or speakers to process.
    #[arg(required = true, value_name = "CORPUS_OR_SPEAKER")]
    pub targets: Vec<AugmentTarget>,
    /// Maximum number of recordings per speaker.
    #[arg(long)]
    pub max: Option<usize>,
}

#[derive(Args, Debug, Clone)]
pub struct SplitArgs {
    /// Speaker directories; defaults to every speaker under the preprocessed root.
    pub speaker_dirs: Vec<PathBuf>,
    /// Longest recording kept whole, in frames.
    #[arg(long = "max-length", default_value_t = MAX_SEQUENCE_FRAMES)]
    pub max_length: usize,
}

impl SplitArgs {
    pub fn validate(&self) -> Result<()> {
        ensure!(self.max_length > 0, "max-length must be positive");
        Ok(())
    }
}
