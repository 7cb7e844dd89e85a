mod mel;
mod statistics;

use std::path::Path;

use ndarray::Array2;
use tracing::{debug, info};

use crate::audio;
use crate::error::{Ac2ArtError, Result};
use crate::storage;
use crate::types::{Waveform, CONTEXT_FRAMES, DEFAULT_SAMPLE_RATE, PEAK_AMPLITUDE};

pub(crate) use mel::periodic_hann;

/// Turns waveforms into standardized, context-stacked cepstral matrices.
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    sample_rate: u32,
    context: usize,
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_RATE)
    }
}

impl FeatureExtractor {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            context: CONTEXT_FRAMES,
        }
    }

    /// Extract features from a waveform already at the extractor's rate.
    ///
    /// `name` only labels errors.
    pub fn extract(&self, waveform: &Waveform, name: &str) -> Result<Array2<f64>> {
        if waveform.sample_rate != self.sample_rate {
            return Err(Ac2ArtError::Config(format!(
                "{name} is sampled at {} Hz, extractor expects {} Hz",
                waveform.sample_rate, self.sample_rate
            )));
        }
        let normalized = peak_normalize(waveform, name)?;
        let coefficients = mel::cepstral_coefficients(&normalized, self.sample_rate)?;
        let dynamic = statistics::add_dynamics(&coefficients)?;
        let stacked = statistics::stack_context(&dynamic, self.context);
        Ok(statistics::standardize_columns(&stacked))
    }

    pub fn extract_file(&self, path: &Path) -> Result<Array2<f64>> {
        let waveform = audio::load_waveform(path, self.sample_rate)?;
        debug!(
            file = %path.display(),
            seconds = waveform.duration_seconds(),
            "waveform loaded"
        );
        self.extract(&waveform, &path.display().to_string())
    }

    /// Extract every `.wav` in `wav_dir` into `<feature_dir>/<stem>.npy`.
    ///
    /// `limit` of zero processes every file. Returns the stems written.
    pub fn extract_dir(
        &self,
        wav_dir: &Path,
        feature_dir: &Path,
        limit: usize,
    ) -> Result<Vec<String>> {
        storage::ensure_dir(feature_dir)?;
        let mut stems = storage::list_stems(wav_dir, "wav")?;
        if limit > 0 {
            stems.truncate(limit);
        }
        info!(
            files = stems.len(),
            source = %wav_dir.display(),
            "extracting acoustic features"
        );
        for stem in &stems {
            let wav_path = wav_dir.join(format!("{stem}.wav"));
            let features = self.extract_file(&wav_path)?;
            debug!(file = %stem, frames = features.nrows(), "features extracted");
            storage::write_matrix(&storage::array_path(feature_dir, stem), &features)?;
        }
        Ok(stems)
    }
}

/// Scale so the largest absolute sample equals the target peak.
fn peak_normalize(waveform: &Waveform, name: &str) -> Result<Vec<f64>> {
    let peak = waveform.peak();
    if peak == 0.0 {
        return Err(Ac2ArtError::SilentWaveform {
            name: name.to_string(),
        });
    }
    Ok(waveform.samples.iter().map(|s| PEAK_AMPLITUDE * s / peak).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn peak_is_half_scale() {
        let waveform = Waveform::new(vec![0.2, -0.8, 0.4], 16_000);
        let scaled = peak_normalize(&waveform, "x").unwrap();
        for (value, expected) in scaled.iter().zip([0.125, -0.5, 0.25]) {
            assert_abs_diff_eq!(*value, expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn silent_waveform_is_rejected() {
        let waveform = Waveform::new(vec![0.0; 10], 16_000);
        let err = peak_normalize(&waveform, "quiet").unwrap_err();
        assert!(matches!(err, Ac2ArtError::SilentWaveform { .. }));
    }

    #[test]
    fn rate_mismatch_is_rejected() {
        let extractor = FeatureExtractor::new(16_000);
        let waveform = Waveform::new(vec![0.1; 1000], 20_000);
        assert!(extractor.extract(&waveform, "x").is_err());
    }
}
