pub mod descriptors;
mod speaker;

use std::path::PathBuf;

use ndarray::{s, Array2};
use tracing::{info, warn};

use crate::audio;
use crate::config::{MismatchPolicy, ProjectLayout};
use crate::error::{Ac2ArtError, Result};
use crate::model::{predict_sequence, Ac2ArtNetwork, InversionModel};
use crate::storage;

use descriptors::{
    constriction_location, lip_aperture, lip_protrusion, voicing, EXTENDED_WIDTH, LIP_APERTURE,
    LIP_PROTRUSION, TONGUE_BODY_CONSTRICTION, TONGUE_BODY_X, TONGUE_BODY_Y,
    TONGUE_TIP_CONSTRICTION, TONGUE_TIP_X, TONGUE_TIP_Y, VELUM_X, VOICING,
};
pub use speaker::{ChannelLayout, Corpus, Speaker, VelumSource, WaveformSource};

/// Input trajectories, relative to a speaker's preprocessed directory.
pub const TRAJECTORY_SUBDIR: &str = "ema_filtered_norma";
pub const FEATURE_SUBDIR: &str = "mfcc";
pub const EXTENDED_SUBDIR: &str = "ema_VT";
const PROGRESS_EVERY: usize = 500;

/// Everything known about one recording before extension.
#[derive(Debug, Clone, Copy)]
pub struct RecordingInputs<'a> {
    pub name: &'a str,
    pub trajectory: &'a Array2<f64>,
    /// Waveform at the speaker's sampling rate.
    pub samples: &'a [f64],
    /// Required when the speaker's velum is predicted.
    pub features: Option<&'a Array2<f64>>,
}

#[derive(Debug, Clone)]
pub struct ExtendedTrajectory {
    pub channels: Array2<f64>,
    /// Set when feature and trajectory row counts disagreed.
    pub row_mismatch: Option<(usize, usize)>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AugmentReport {
    pub written: usize,
    pub mismatched: usize,
}

/// Appends derived vocal-tract descriptors to raw articulator trajectories.
#[derive(Debug)]
pub struct Augmenter<V = Ac2ArtNetwork> {
    layout: ProjectLayout,
    policy: MismatchPolicy,
    velum_model: Option<V>,
}

impl<V: InversionModel> Augmenter<V> {
    pub fn new(layout: ProjectLayout, policy: MismatchPolicy, velum_model: Option<V>) -> Self {
        Self {
            layout,
            policy,
            velum_model,
        }
    }

    /// Build the 19-channel trajectory for one recording.
    pub fn extend(
        &self,
        speaker: Speaker,
        inputs: RecordingInputs<'_>,
    ) -> Result<ExtendedTrajectory> {
        let layout = speaker.layout();
        let raw = inputs.trajectory;
        if raw.ncols() != layout.raw_width {
            return Err(Ac2ArtError::ChannelWidth {
                name: inputs.name.to_string(),
                actual: raw.ncols(),
                expected: layout.raw_width,
            });
        }
        let frames = raw.nrows();

        let (velum, row_mismatch) = match layout.velum {
            VelumSource::Recorded => {
                let recorded = raw.slice(s![.., layout.raw_width - 2..]).to_owned();
                (recorded, None)
            }
            VelumSource::Predicted => self.predict_velum(inputs.name, frames, inputs.features)?,
        };
        let voiced = voicing(inputs.samples, layout.sample_rate, frames)?;

        let mut channels = Array2::<f64>::zeros((frames, layout.extended_width()));
        channels.slice_mut(s![.., ..layout.raw_width]).assign(raw);
        channels.column_mut(LIP_APERTURE).assign(&lip_aperture(raw));
        channels.column_mut(LIP_PROTRUSION).assign(&lip_protrusion(raw));
        channels
            .column_mut(TONGUE_TIP_CONSTRICTION)
            .assign(&constriction_location(raw, TONGUE_TIP_X, TONGUE_TIP_Y));
        channels
            .column_mut(TONGUE_BODY_CONSTRICTION)
            .assign(&constriction_location(raw, TONGUE_BODY_X, TONGUE_BODY_Y));
        channels.column_mut(VOICING).assign(&voiced);
        let overlap = frames.min(velum.nrows());
        channels
            .slice_mut(s![..overlap, VELUM_X..EXTENDED_WIDTH])
            .assign(&velum.slice(s![..overlap, ..]));

        Ok(ExtendedTrajectory {
            channels,
            row_mismatch,
        })
    }

    fn predict_velum(
        &self,
        name: &str,
        frames: usize,
        features: Option<&Array2<f64>>,
    ) -> Result<(Array2<f64>, Option<(usize, usize)>)> {
        let features = features.ok_or_else(|| {
            Ac2ArtError::Config(format!("{name}: feature matrix required for velum prediction"))
        })?;
        let model = self.velum_model.as_ref().ok_or_else(|| {
            Ac2ArtError::Config("velum model required for this speaker".to_string())
        })?;

        let mut mismatch = None;
        if features.nrows() != frames {
            match self.policy {
                MismatchPolicy::Strict => {
                    return Err(Ac2ArtError::RowMismatch {
                        name: name.to_string(),
                        left: frames,
                        right: features.nrows(),
                    })
                }
                MismatchPolicy::Warn => {
                    warn!(
                        file = %name,
                        trajectory_rows = frames,
                        feature_rows = features.nrows(),
                        "row count mismatch; velum filled for overlapping frames only"
                    );
                    mismatch = Some((frames, features.nrows()));
                }
            }
        }
        Ok((predict_sequence(model, features.view())?, mismatch))
    }

    /// Extend every unsegmented recording of `speaker`, at most `limit`.
    pub fn augment_speaker(&self, speaker: Speaker, limit: Option<usize>) -> Result<AugmentReport> {
        let layout = speaker.layout();
        let dataset = self.layout.preprocessed_root().join(speaker.dataset_dir());
        let trajectory_dir = dataset.join(TRAJECTORY_SUBDIR);
        let feature_dir = dataset.join(FEATURE_SUBDIR);
        let output_dir = dataset.join(EXTENDED_SUBDIR);
        let waveform_dir = speaker.waveform_dir(&self.layout.raw_root());
        storage::ensure_dir(&output_dir)?;

        let mut stems = storage::list_unsplit_arrays(&trajectory_dir)?;
        if let Some(limit) = limit {
            stems.truncate(limit);
        }
        let total = stems.len();
        info!(speaker = %speaker, recordings = total, "adding vocal tract descriptors");

        let mut report = AugmentReport::default();
        for (index, stem) in stems.iter().enumerate() {
            if (index + 1) % PROGRESS_EVERY == 0 {
                info!(speaker = %speaker, done = index + 1, total, "progress");
            }
            let trajectory = storage::read_matrix(&storage::array_path(&trajectory_dir, stem))?;
            let samples = match layout.waveform {
                WaveformSource::AudioFile => {
                    let path = waveform_dir.join(format!("{stem}.wav"));
                    audio::load_waveform(&path, layout.sample_rate)?.samples
                }
                WaveformSource::StoredArray => {
                    storage::read_samples(&storage::array_path(&waveform_dir, stem))?
                }
            };
            let features = if layout.needs_features() {
                Some(storage::read_matrix(&storage::array_path(&feature_dir, stem))?)
            } else {
                None
            };

            let extended = self.extend(
                speaker,
                RecordingInputs {
                    name: stem,
                    trajectory: &trajectory,
                    samples: &samples,
                    features: features.as_ref(),
                },
            )?;
            if extended.row_mismatch.is_some() {
                report.mismatched += 1;
            }
            storage::write_matrix(&storage::array_path(&output_dir, stem), &extended.channels)?;
            report.written += 1;
        }
        Ok(report)
    }

    pub fn augment_corpus(&self, corpus: Corpus, limit: Option<usize>) -> Result<AugmentReport> {
        info!(corpus = %corpus, "adding vocal tract descriptors for corpus");
        let mut total = AugmentReport::default();
        for &speaker in corpus.speakers() {
            let report = self.augment_speaker(speaker, limit)?;
            total.written += report.written;
            total.mismatched += report.mismatched;
        }
        Ok(total)
    }

    pub fn output_dir(&self, speaker: Speaker) -> PathBuf {
        self.layout
            .preprocessed_root()
            .join(speaker.dataset_dir())
            .join(EXTENDED_SUBDIR)
    }
}
