use std::f64::consts::PI;
use std::fs;
use std::path::Path;

use ac2art::augment::descriptors::{
    LIP_APERTURE, LIP_PROTRUSION, TONGUE_BODY_CONSTRICTION, TONGUE_TIP_CONSTRICTION, VELUM_X,
    VELUM_Y, VOICING,
};
use ac2art::augment::{Augmenter, Corpus, RecordingInputs, Speaker};
use ac2art::config::{MismatchPolicy, ProjectLayout};
use ac2art::features::FeatureExtractor;
use ac2art::model::{InversionModel, ModelDims};
use ac2art::predict::TrajectoryPredictor;
use ac2art::storage;
use ac2art::types::{Waveform, FEATURE_WIDTH};
use ac2art::Ac2ArtError;
use anyhow::Result;
use hound::{SampleFormat, WavSpec, WavWriter};
use ndarray::{s, Array2, ArrayView2};
use tempfile::tempdir;

/// Stands in for a trained model by predicting zeros.
struct ZeroModel {
    dims: ModelDims,
}

impl InversionModel for ZeroModel {
    fn dims(&self) -> ModelDims {
        self.dims
    }

    fn forward(&self, features: ArrayView2<'_, f64>) -> ac2art::Result<Array2<f64>> {
        Ok(Array2::zeros((features.nrows(), self.dims.output_dim)))
    }
}

fn zero_velum() -> ZeroModel {
    ZeroModel {
        dims: ModelDims::velum(),
    }
}

fn tone(seconds: f64, sample_rate: u32) -> Vec<f64> {
    let len = (seconds * sample_rate as f64) as usize;
    (0..len)
        .map(|i| {
            let t = i as f64 / sample_rate as f64;
            if (1.0..2.0).contains(&t) {
                0.9 * (2.0 * PI * 220.0 * t).sin()
            } else {
                0.0
            }
        })
        .collect()
}

fn write_wave(path: &Path, samples: &[f64], sample_rate: u32) -> Result<()> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec)?;
    for sample in samples {
        writer.write_sample((sample * i16::MAX as f64) as i16)?;
    }
    writer.finalize()?;
    Ok(())
}

#[test]
fn zero_predictions_extend_with_nan_constrictions() -> Result<()> {
    let samples = tone(3.0, 16_000);
    let waveform = Waveform::new(samples.clone(), 16_000);
    let features = FeatureExtractor::default().extract(&waveform, "tone")?;
    assert_eq!(features.ncols(), FEATURE_WIDTH);
    assert!((295..=300).contains(&features.nrows()));

    let predictor = TrajectoryPredictor::new(ZeroModel {
        dims: ModelDims::inversion(),
    });
    let predicted = predictor.predict(&features)?;
    let base = predicted.slice(s![.., ..12]).to_owned();

    let layout = ProjectLayout::new("/unused");
    let augmenter = Augmenter::new(layout, MismatchPolicy::Strict, Some(zero_velum()));
    let extended = augmenter.extend(
        Speaker::Mngu0,
        RecordingInputs {
            name: "tone",
            trajectory: &base,
            samples: &samples,
            features: Some(&features),
        },
    )?;
    let channels = extended.channels;
    assert_eq!(channels.dim(), (features.nrows(), 19));
    assert!(extended.row_mismatch.is_none());

    assert!(channels.slice(s![.., ..12]).iter().all(|v| *v == 0.0));
    assert!(channels.slice(s![.., VELUM_X..=VELUM_Y]).iter().all(|v| *v == 0.0));
    assert!(channels.column(LIP_APERTURE).iter().all(|v| *v == 0.0));
    assert!(channels.column(LIP_PROTRUSION).iter().all(|v| *v == 0.0));
    assert!(channels.column(TONGUE_TIP_CONSTRICTION).iter().all(|v| v.is_nan()));
    assert!(channels.column(TONGUE_BODY_CONSTRICTION).iter().all(|v| v.is_nan()));

    let voicing = channels.column(VOICING);
    assert!(voicing.iter().all(|v| (0.0..=1.0).contains(v)));
    let middle = features.nrows() / 2;
    assert!(voicing[middle] > voicing[5]);
    Ok(())
}

fn write_array(dir: &Path, stem: &str, matrix: &Array2<f64>) -> Result<()> {
    storage::ensure_dir(dir)?;
    storage::write_matrix(&storage::array_path(dir, stem), matrix)?;
    Ok(())
}

#[test]
fn stored_array_speaker_is_extended_on_disk() -> Result<()> {
    let temp = tempdir()?;
    let layout = ProjectLayout::new(temp.path());
    let dataset = layout.preprocessed_root().join("usc_timit_F1");
    let raw = Array2::from_shape_fn((20, 12), |(t, c)| (t + c) as f64 * 0.1 + 0.5);
    write_array(&dataset.join("ema_filtered_norma"), "f1_001", &raw)?;
    write_array(&dataset.join("ema_filtered_norma"), "f1_001_split_0", &raw)?;
    write_array(&dataset.join("mfcc"), "f1_001", &Array2::zeros((20, FEATURE_WIDTH)))?;
    let wave_dir = layout.raw_root().join("usc_timit/F1/wav_cut");
    storage::ensure_dir(&wave_dir)?;
    let samples = ndarray::Array1::from(tone(3.0, 20_000)[18_000..22_000].to_vec());
    storage::write_vector(&storage::array_path(&wave_dir, "f1_001"), &samples)?;

    let augmenter = Augmenter::new(layout, MismatchPolicy::Strict, Some(zero_velum()));
    let report = augmenter.augment_corpus(Corpus::Usc, None);
    // Other usc speakers have no data in this project.
    assert!(report.is_err());

    let report = augmenter.augment_speaker(Speaker::F1, None)?;
    assert_eq!(report.written, 1);
    assert_eq!(report.mismatched, 0);
    let extended = storage::read_matrix(&storage::array_path(
        &augmenter.output_dir(Speaker::F1),
        "f1_001",
    ))?;
    assert_eq!(extended.dim(), (20, 19));
    assert_eq!(extended.slice(s![.., ..12]), raw);
    assert!(!augmenter
        .output_dir(Speaker::F1)
        .join("f1_001_split_0.npy")
        .exists());
    Ok(())
}

#[test]
fn mocha_speaker_reads_audio_and_recorded_velum() -> Result<()> {
    let temp = tempdir()?;
    let layout = ProjectLayout::new(temp.path());
    let dataset = layout.preprocessed_root().join("mocha_fsew0");
    let mut raw = Array2::from_elem((48, 14), 0.25);
    raw.column_mut(12).fill(-1.0);
    raw.column_mut(13).fill(2.0);
    write_array(&dataset.join("ema_filtered_norma"), "fsew0_001", &raw)?;
    let wave_dir = layout.raw_root().join("mocha/fsew0");
    fs::create_dir_all(&wave_dir)?;
    write_wave(&wave_dir.join("fsew0_001.wav"), &tone(0.5, 16_000), 16_000)?;

    let augmenter: Augmenter<ZeroModel> = Augmenter::new(layout, MismatchPolicy::Strict, None);
    let report = augmenter.augment_speaker(Speaker::Fsew0, None)?;
    assert_eq!(report.written, 1);
    let extended = storage::read_matrix(&storage::array_path(
        &augmenter.output_dir(Speaker::Fsew0),
        "fsew0_001",
    ))?;
    assert_eq!(extended.dim(), (48, 19));
    assert!(extended.column(VELUM_X).iter().all(|v| *v == -1.0));
    assert!(extended.column(VELUM_Y).iter().all(|v| *v == 2.0));
    Ok(())
}

#[test]
fn predicted_velum_without_model_is_a_configuration_error() -> Result<()> {
    let raw = Array2::zeros((10, 12));
    let features = Array2::zeros((10, FEATURE_WIDTH));
    let augmenter: Augmenter<ZeroModel> =
        Augmenter::new(ProjectLayout::new("/unused"), MismatchPolicy::Strict, None);
    let err = augmenter
        .extend(
            Speaker::M01,
            RecordingInputs {
                name: "m01",
                trajectory: &raw,
                samples: &[0.2; 4_410],
                features: Some(&features),
            },
        )
        .unwrap_err();
    assert!(matches!(err, Ac2ArtError::Config(_)));
    Ok(())
}

#[test]
fn mocha_corpus_runs_without_falh0() -> Result<()> {
    let temp = tempdir()?;
    let layout = ProjectLayout::new(temp.path());
    let preprocessed = layout.preprocessed_root();
    for speaker in ["fsew0", "msak0", "faet0", "ffes0", "maps0", "mjjn0"] {
        storage::ensure_dir(&preprocessed.join(format!("mocha_{speaker}/ema_filtered_norma")))?;
    }
    let dataset = preprocessed.join("mocha_maps0");
    let raw = Array2::from_elem((48, 12), 0.5);
    write_array(&dataset.join("ema_filtered_norma"), "maps0_001", &raw)?;
    write_array(&dataset.join("mfcc"), "maps0_001", &Array2::zeros((48, FEATURE_WIDTH)))?;
    let wave_dir = layout.raw_root().join("mocha/maps0");
    fs::create_dir_all(&wave_dir)?;
    write_wave(&wave_dir.join("maps0_001.wav"), &tone(0.5, 16_000), 16_000)?;

    let augmenter = Augmenter::new(layout, MismatchPolicy::Strict, Some(zero_velum()));
    let report = augmenter.augment_corpus(Corpus::Mocha, None)?;
    assert_eq!(report.written, 1);
    assert!(!Corpus::Mocha.speakers().contains(&Speaker::Falh0));
    let extended = storage::read_matrix(&storage::array_path(
        &augmenter.output_dir(Speaker::Maps0),
        "maps0_001",
    ))?;
    assert_eq!(extended.dim(), (48, 19));
    assert!(!preprocessed.join("mocha_falh0").exists());
    Ok(())
}
