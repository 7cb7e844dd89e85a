use realfft::num_complex::Complex;
use realfft::RealFftPlanner;

use crate::error::{Ac2ArtError, Result};

/// Linearly resample `samples` from `source_rate` to `target_rate`.
pub fn linear_resample(samples: &[f64], source_rate: u32, target_rate: u32) -> Result<Vec<f64>> {
    if source_rate == 0 || target_rate == 0 {
        return Err(Ac2ArtError::Config(format!(
            "sample rates must be positive (got {source_rate} -> {target_rate})"
        )));
    }
    if samples.is_empty() || source_rate == target_rate {
        return Ok(samples.to_vec());
    }
    let ratio = target_rate as f64 / source_rate as f64;
    let output_len = ((samples.len() as f64) * ratio).ceil().max(1.0) as usize;
    let last_index = samples.len() - 1;
    let output = (0..output_len)
        .map(|i| {
            let position = i as f64 / ratio;
            let left = (position.floor() as usize).min(last_index);
            let right = (left + 1).min(last_index);
            let t = position - left as f64;
            samples[left] * (1.0 - t) + samples[right] * t
        })
        .collect();
    Ok(output)
}

/// Resample a sequence to exactly `num` points through its real spectrum.
///
/// The spectrum is truncated or zero-padded, with the shared Nyquist bin
/// doubled when shrinking and halved when growing an even-length spectrum.
pub fn fourier_resample(samples: &[f64], num: usize) -> Result<Vec<f64>> {
    let len = samples.len();
    if num == 0 {
        return Ok(Vec::new());
    }
    if len == 0 {
        return Ok(vec![0.0; num]);
    }
    if len == num {
        return Ok(samples.to_vec());
    }

    let mut planner = RealFftPlanner::<f64>::new();
    let forward = planner.plan_fft_forward(len);
    let mut input = samples.to_vec();
    let mut spectrum = forward.make_output_vec();
    forward
        .process(&mut input, &mut spectrum)
        .map_err(|err| Ac2ArtError::Config(format!("forward fft failed: {err}")))?;

    let inverse = planner.plan_fft_inverse(num);
    let mut resized = inverse.make_input_vec();
    let shared = len.min(num);
    let kept = shared / 2 + 1;
    resized[..kept].copy_from_slice(&spectrum[..kept]);
    if shared % 2 == 0 {
        let nyquist = shared / 2;
        if num < len {
            resized[nyquist] = resized[nyquist] * 2.0;
        } else {
            resized[nyquist] = resized[nyquist] * 0.5;
        }
    }
    resized[0].im = 0.0;
    if num % 2 == 0 {
        let last = resized.len() - 1;
        resized[last] = Complex::new(resized[last].re, 0.0);
    }

    let mut output = inverse.make_output_vec();
    inverse
        .process(&mut resized, &mut output)
        .map_err(|err| Ac2ArtError::Config(format!("inverse fft failed: {err}")))?;
    let scale = 1.0 / len as f64;
    output.iter_mut().for_each(|v| *v *= scale);
    Ok(output)
}
