pub mod decoder;
pub mod resample;

use std::path::Path;

use tracing::debug;

use crate::error::Result;
use crate::types::Waveform;

/// Decode `path` and bring it to `target_rate`.
pub fn load_waveform(path: &Path, target_rate: u32) -> Result<Waveform> {
    let decoded = decoder::decode_audio(path)?;
    if decoded.sample_rate == target_rate {
        return Ok(decoded);
    }
    debug!(
        file = %path.display(),
        from = decoded.sample_rate,
        to = target_rate,
        "resampling waveform"
    );
    let samples = resample::linear_resample(&decoded.samples, decoded.sample_rate, target_rate)?;
    Ok(Waveform::new(samples, target_rate))
}
