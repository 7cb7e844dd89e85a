use aus::analysis;
use aus::analysis::mel::MelFilterbank;
use aus::spectrum;
use ndarray::Array2;
use realfft::RealFftPlanner;

use crate::error::{Ac2ArtError, Result};
use crate::types::{FrameGeometry, CEPSTRAL_COUNT};

pub(crate) const MEL_BANDS: usize = 40;
const MIN_FREQ: f64 = 20.0;
/// Floor applied to mel energies before the cepstral log.
const MEL_FLOOR: f64 = 1e-10;

/// Cepstral coefficients, one row per unpadded analysis frame.
pub(crate) fn cepstral_coefficients(samples: &[f64], sample_rate: u32) -> Result<Array2<f64>> {
    let geometry = FrameGeometry::at_rate(sample_rate);
    let power = power_spectrogram(samples, geometry)?;
    if power.is_empty() {
        return Ok(Array2::zeros((0, CEPSTRAL_COUNT)));
    }

    let freqs = spectrum::rfftfreq(geometry.frame_length, sample_rate);
    let filterbank = MelFilterbank::new(
        MIN_FREQ,
        (sample_rate as f64) / 2.0,
        MEL_BANDS,
        &freqs,
        true,
    );
    let mut mel = analysis::mel::make_mel_spectrogram(&power, &filterbank);
    for frame in mel.iter_mut() {
        for energy in frame.iter_mut() {
            if energy.is_nan() || *energy < MEL_FLOOR {
                *energy = MEL_FLOOR;
            }
        }
    }
    let mfcc = analysis::mel::mfcc_spectrogram(&mel, CEPSTRAL_COUNT, None);
    array_from_rows(&mfcc, CEPSTRAL_COUNT)
}

/// Squared magnitude spectrum of each Hann-windowed frame.
pub(crate) fn power_spectrogram(
    samples: &[f64],
    geometry: FrameGeometry,
) -> Result<Vec<Vec<f64>>> {
    let frames = geometry.frame_count(samples.len());
    if frames == 0 {
        return Ok(Vec::new());
    }
    let window = periodic_hann(geometry.frame_length);
    let mut planner = RealFftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(geometry.frame_length);
    let mut input = fft.make_input_vec();
    let mut output = fft.make_output_vec();

    let mut power = Vec::with_capacity(frames);
    for index in 0..frames {
        let start = index * geometry.hop_length;
        let frame = &samples[start..start + geometry.frame_length];
        for ((slot, &sample), &w) in input.iter_mut().zip(frame).zip(&window) {
            *slot = sample * w;
        }
        fft.process(&mut input, &mut output)
            .map_err(|err| Ac2ArtError::Config(format!("frame fft failed: {err}")))?;
        power.push(output.iter().map(|c| c.norm_sqr()).collect());
    }
    Ok(power)
}

pub(crate) fn periodic_hann(length: usize) -> Vec<f64> {
    let n = length as f64;
    (0..length)
        .map(|i| 0.5 - 0.5 * (2.0 * std::f64::consts::PI * i as f64 / n).cos())
        .collect()
}

fn array_from_rows(rows: &[Vec<f64>], width: usize) -> Result<Array2<f64>> {
    let mut flat = Vec::with_capacity(rows.len() * width);
    for row in rows {
        if row.len() < width {
            return Err(Ac2ArtError::ChannelWidth {
                name: "cepstral frame".to_string(),
                actual: row.len(),
                expected: width,
            });
        }
        flat.extend_from_slice(&row[..width]);
    }
    Array2::from_shape_vec((rows.len(), width), flat)
        .map_err(|err| Ac2ArtError::Config(format!("cepstral matrix shape: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hann_is_periodic() {
        let window = periodic_hann(4);
        assert_eq!(window.len(), 4);
        assert!((window[0]).abs() < 1e-12);
        assert!((window[2] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn power_spectrogram_counts_whole_frames() {
        let geometry = FrameGeometry::at_rate(16_000);
        let power = power_spectrogram(&vec![0.1; 16_000], geometry).unwrap();
        assert_eq!(power.len(), 98);
        assert_eq!(power[0].len(), 201);
    }

    #[test]
    fn short_signal_has_no_frames() {
        let mfcc = cepstral_coefficients(&[0.1; 100], 16_000).unwrap();
        assert_eq!(mfcc.dim(), (0, CEPSTRAL_COUNT));
    }
}
