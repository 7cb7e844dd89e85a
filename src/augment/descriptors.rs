//! Vocal-tract descriptors computed from raw articulator channels.

use ndarray::{Array1, Array2};
use realfft::RealFftPlanner;

use crate::audio::resample::fourier_resample;
use crate::error::{Ac2ArtError, Result};
use crate::features::periodic_hann;
use crate::types::HOP_S;

pub const TONGUE_TIP_X: usize = 0;
pub const TONGUE_TIP_Y: usize = 1;
pub const TONGUE_BODY_X: usize = 4;
pub const TONGUE_BODY_Y: usize = 5;
pub const UPPER_LIP_X: usize = 8;
pub const UPPER_LIP_Y: usize = 9;
pub const LOWER_LIP_X: usize = 10;
pub const LOWER_LIP_Y: usize = 11;

pub const LIP_APERTURE: usize = 12;
pub const LIP_PROTRUSION: usize = 13;
pub const TONGUE_TIP_CONSTRICTION: usize = 14;
pub const TONGUE_BODY_CONSTRICTION: usize = 15;
pub const VOICING: usize = 16;
pub const VELUM_X: usize = 17;
pub const VELUM_Y: usize = 18;
pub const EXTENDED_WIDTH: usize = 19;

/// Channel names of an extended trajectory, in column order.
pub const EXTENDED_CHANNELS: [&str; EXTENDED_WIDTH] = [
    "tt_x", "tt_y", "td_x", "td_y", "tb_x", "tb_y", "li_x", "li_y", "ul_x", "ul_y", "ll_x", "ll_y",
    "la", "pro", "ttcl", "tbcl", "lar", "v_x", "v_y",
];

/// Upper-lip y minus lower-lip y. Negative when the lips cross.
pub fn lip_aperture(trajectory: &Array2<f64>) -> Array1<f64> {
    &trajectory.column(UPPER_LIP_Y) - &trajectory.column(LOWER_LIP_Y)
}

/// Mean horizontal position of the two lips.
pub fn lip_protrusion(trajectory: &Array2<f64>) -> Array1<f64> {
    (&trajectory.column(UPPER_LIP_X) + &trajectory.column(LOWER_LIP_X)) / 2.0
}

/// Direction cosine `x / sqrt(x² + y²)` of a sensor; NaN at the origin.
pub fn constriction_location(trajectory: &Array2<f64>, x: usize, y: usize) -> Array1<f64> {
    let xs = trajectory.column(x);
    let ys = trajectory.column(y);
    Array1::from_iter(
        xs.iter()
            .zip(ys.iter())
            .map(|(&x, &y)| x / (x * x + y * y).sqrt()),
    )
}

/// Short-term energy of `samples`, one value per trajectory frame, in [0, 1].
///
/// The squared signal is convolved with a squared Hann window as long as
/// the number of hops in the recording, resampled spectrally to `frames`
/// points, then clipped.
pub fn voicing(samples: &[f64], sample_rate: u32, frames: usize) -> Result<Array1<f64>> {
    let hop = ((HOP_S * sample_rate as f64) as usize).max(1);
    let window: Vec<f64> = periodic_hann(samples.len() / hop)
        .into_iter()
        .map(|w| w * w)
        .collect();
    let squared: Vec<f64> = samples.iter().map(|s| s * s).collect();
    let energy = convolve_same(&squared, &window)?;
    let resampled = fourier_resample(&energy, frames)?;
    Ok(Array1::from_iter(resampled.into_iter().map(|v| v.clamp(0.0, 1.0))))
}

/// Linear convolution cropped to the centre `signal.len()` samples.
pub(crate) fn convolve_same(signal: &[f64], kernel: &[f64]) -> Result<Vec<f64>> {
    let n = signal.len();
    let m = kernel.len();
    if n == 0 {
        return Ok(Vec::new());
    }
    if m == 0 {
        return Ok(vec![0.0; n]);
    }
    let full_len = n + m - 1;
    let fft_err = |err: realfft::FftError| Ac2ArtError::Config(format!("convolution fft: {err}"));

    let mut planner = RealFftPlanner::<f64>::new();
    let forward = planner.plan_fft_forward(full_len);
    let inverse = planner.plan_fft_inverse(full_len);

    let mut padded = forward.make_input_vec();
    padded[..n].copy_from_slice(signal);
    let mut signal_spectrum = forward.make_output_vec();
    forward.process(&mut padded, &mut signal_spectrum).map_err(fft_err)?;

    let mut padded = forward.make_input_vec();
    padded[..m].copy_from_slice(kernel);
    let mut kernel_spectrum = forward.make_output_vec();
    forward.process(&mut padded, &mut kernel_spectrum).map_err(fft_err)?;

    let mut product: Vec<_> = signal_spectrum
        .iter()
        .zip(&kernel_spectrum)
        .map(|(a, b)| a * b)
        .collect();
    product[0].im = 0.0;
    if full_len % 2 == 0 {
        let last = product.len() - 1;
        product[last].im = 0.0;
    }
    let mut full = inverse.make_output_vec();
    inverse.process(&mut product, &mut full).map_err(fft_err)?;

    let offset = (m - 1) / 2;
    let scale = 1.0 / full_len as f64;
    Ok(full[offset..offset + n].iter().map(|v| v * scale).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::Array2;

    fn trajectory_with(values: &[(usize, f64)]) -> Array2<f64> {
        let mut trajectory = Array2::zeros((2, 12));
        for &(column, value) in values {
            trajectory.column_mut(column).fill(value);
        }
        trajectory
    }

    #[test]
    fn aperture_may_go_negative() {
        let trajectory = trajectory_with(&[(UPPER_LIP_Y, -1.0), (LOWER_LIP_Y, 0.5)]);
        assert_eq!(lip_aperture(&trajectory).to_vec(), vec![-1.5, -1.5]);
    }

    #[test]
    fn protrusion_is_mean_lip_x() {
        let trajectory = trajectory_with(&[(UPPER_LIP_X, 3.0), (LOWER_LIP_X, 1.0)]);
        assert_eq!(lip_protrusion(&trajectory).to_vec(), vec![2.0, 2.0]);
    }

    #[test]
    fn constriction_is_direction_cosine() {
        let trajectory = trajectory_with(&[(TONGUE_TIP_X, 3.0), (TONGUE_TIP_Y, 4.0)]);
        let ttcl = constriction_location(&trajectory, TONGUE_TIP_X, TONGUE_TIP_Y);
        assert_abs_diff_eq!(ttcl[0], 0.6, epsilon = 1e-12);
        let tbcl = constriction_location(&trajectory, TONGUE_BODY_X, TONGUE_BODY_Y);
        assert!(tbcl.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn convolution_matches_direct_sum() {
        let signal = [1.0, 2.0, 3.0, 4.0, 5.0];
        let kernel = [1.0, 0.5, 0.25];
        let same = convolve_same(&signal, &kernel).unwrap();
        let expected = [2.5, 4.25, 6.0, 7.75, 3.5];
        for (value, want) in same.iter().zip(expected) {
            assert_abs_diff_eq!(*value, want, epsilon = 1e-9);
        }
    }

    #[test]
    fn voicing_is_clipped_to_unit_range() {
        let samples: Vec<f64> = (0..16_000)
            .map(|i| 0.9 * (i as f64 * 0.05).sin())
            .collect();
        let curve = voicing(&samples, 16_000, 98).unwrap();
        assert_eq!(curve.len(), 98);
        assert!(curve.iter().all(|v| (0.0..=1.0).contains(v)));
        assert!(curve.iter().any(|v| *v == 1.0));
    }

    #[test]
    fn voicing_values_are_pinned_for_a_short_ramp() {
        // 400 Hz gives a 4-sample hop, so 16 samples use a 4-point window.
        let samples = [
            0.0, 0.2, 0.4, 0.6, 0.8, 0.6, 0.4, 0.2, 0.0, -0.2, -0.4, -0.6, -0.8, -0.6, -0.4, -0.2,
        ];
        let cases: [(usize, &[f64]); 3] = [
            (4, &[0.040914910871, 0.596201885423, 0.063224609702, 0.597158594004]),
            (
                5,
                &[0.040914910871, 0.386593435079, 0.498438453909, 6.6578127e-05, 0.695861622015],
            ),
            (
                20,
                &[
                    0.0, 0.0, 0.04939654762, 0.134740418287, 0.309335200368, 0.56,
                    0.804583271673, 0.710036202496, 0.416596254736, 0.218254255698, 0.08,
                    0.022508184003, 0.038308708289, 0.144220862259, 0.30412109641, 0.56,
                    0.810026608059, 0.699503098665, 0.431382312844, 0.200364442292,
                ],
            ),
        ];
        for (frames, expected) in cases {
            let curve = voicing(&samples, 400, frames).unwrap();
            assert_eq!(curve.len(), frames);
            for (value, want) in curve.iter().zip(expected) {
                assert_abs_diff_eq!(*value, *want, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn silence_has_no_voicing() {
        let curve = voicing(&vec![0.0; 8_000], 16_000, 48).unwrap();
        assert!(curve.iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn channel_names_cover_extended_layout() {
        assert_eq!(EXTENDED_CHANNELS[VOICING], "lar");
        assert_eq!(EXTENDED_CHANNELS[VELUM_Y], "v_y");
    }
}
