//! Core types and numerical constants shared by every pipeline stage

use ndarray::Array2;

/// Analysis frame span in seconds.
pub const FRAME_SPAN_S: f64 = 0.025;
/// Hop between consecutive frames in seconds.
pub const HOP_S: f64 = 0.010;
/// Cepstral coefficients per frame before dynamic augmentation.
pub const CEPSTRAL_COUNT: usize = 13;
/// Coefficients plus first and second temporal derivatives.
pub const DYNAMIC_WIDTH: usize = CEPSTRAL_COUNT * 3;
/// Frames of past and future context attached to every row.
pub const CONTEXT_FRAMES: usize = 5;
/// Width of a stacked, standardized feature row.
pub const FEATURE_WIDTH: usize = DYNAMIC_WIDTH * (2 * CONTEXT_FRAMES + 1);
/// Peak amplitude applied before feature extraction.
pub const PEAK_AMPLITUDE: f64 = 0.5;
/// Sampling rate used when inverting arbitrary user recordings.
pub const DEFAULT_SAMPLE_RATE: u32 = 16_000;
/// Longest sequence, in frames, kept as a single training example.
pub const MAX_SEQUENCE_FRAMES: usize = 500;

/// Rows are frames, columns are stacked features or articulator channels.
pub type FrameMatrix = Array2<f64>;

/// Mono waveform samples at a known rate
#[derive(Debug, Clone)]
pub struct Waveform {
    pub samples: Vec<f64>,
    pub sample_rate: u32,
}

impl Waveform {
    pub fn new(samples: Vec<f64>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    pub fn peak(&self) -> f64 {
        self.samples.iter().fold(0.0_f64, |acc, s| acc.max(s.abs()))
    }
}

/// Frame length and hop, in samples, at a given sampling rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameGeometry {
    pub frame_length: usize,
    pub hop_length: usize,
}

impl FrameGeometry {
    pub fn at_rate(sample_rate: u32) -> Self {
        let sr = sample_rate as f64;
        Self {
            frame_length: ((FRAME_SPAN_S * sr) as usize).max(1),
            hop_length: ((HOP_S * sr) as usize).max(1),
        }
    }

    /// Number of whole frames that fit in `samples` without padding.
    pub fn frame_count(&self, samples: usize) -> usize {
        if samples < self.frame_length {
            0
        } else {
            (samples - self.frame_length) / self.hop_length + 1
        }
    }
}

/// Centre time, in seconds, of frame `index`.
pub fn frame_center_seconds(index: usize) -> f64 {
    FRAME_SPAN_S / 2.0 + HOP_S * index as f64
}
