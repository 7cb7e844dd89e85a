use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::{Ac2ArtError, Result};
use crate::types::Waveform;

/// Decode an audio file to mono samples at its native rate.
pub fn decode_audio(path: &Path) -> Result<Waveform> {
    let fail = |message: String| Ac2ArtError::Decode {
        path: path.to_path_buf(),
        message,
    };

    let file = std::fs::File::open(path).map_err(|err| Ac2ArtError::io(path, err))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|err| fail(format!("probe failed: {err}")))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| fail("no audio track".to_string()))?;
    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| fail("sample rate not specified".to_string()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|err| fail(format!("no decoder: {err}")))?;

    let mut samples = Vec::new();
    let mut buffer: Option<SampleBuffer<f32>> = None;
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(err))
                if err.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(err) => return Err(fail(format!("packet read failed: {err}"))),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = decoder
            .decode(&packet)
            .map_err(|err| fail(format!("packet decode failed: {err}")))?;
        let channels = decoded.spec().channels.count().max(1);
        let buf = buffer.get_or_insert_with(|| {
            SampleBuffer::<f32>::new(decoded.capacity() as u64, *decoded.spec())
        });
        if buf.capacity() < decoded.capacity() * channels {
            *buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, *decoded.spec());
        }
        buf.copy_interleaved_ref(decoded);
        samples.extend(downmix(buf.samples(), channels));
    }

    Ok(Waveform::new(samples, sample_rate))
}

/// Average interleaved channels into one.
fn downmix(interleaved: &[f32], channels: usize) -> impl Iterator<Item = f64> + '_ {
    interleaved
        .chunks(channels)
        .map(move |frame| frame.iter().map(|&s| s as f64).sum::<f64>() / channels as f64)
}
