//! Cuts over-long recordings into contiguous segments across aligned arrays.

use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};

use ndarray::{s, Array2};
use tracing::{debug, info, warn};

use crate::config::MismatchPolicy;
use crate::error::{Ac2ArtError, Result};
use crate::storage::{self, SEGMENT_MARKER};

/// Array directories that share a time axis, relative to a speaker directory.
/// The first one defines the recording length.
pub const ALIGNED_SUBDIRS: [&str; 4] = ["mfcc", "ema", "ema_filtered", "ema_VT"];
/// Listing source for recordings of a speaker.
const LISTING_SUBDIR: &str = "ema";
/// Entry of the preprocessed root that is not a speaker.
const FILESET_DIR: &str = "fileset";
const PENDING_SUFFIX: &str = "tmp";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitReport {
    pub recordings_cut: usize,
    pub segments_written: usize,
}

impl SplitReport {
    fn absorb(&mut self, other: &SplitReport) {
        self.recordings_cut += other.recordings_cut;
        self.segments_written += other.segments_written;
    }
}

/// Row ranges of the segments for a recording of `frames` rows.
///
/// Segments have `frames / n` rows, the last one absorbing the remainder,
/// where `n = ceil(frames / max_length)`. Short recordings give one range.
pub fn segment_bounds(frames: usize, max_length: usize) -> Vec<Range<usize>> {
    let max_length = max_length.max(1);
    if frames <= max_length {
        return vec![0..frames];
    }
    let count = frames.div_ceil(max_length);
    let size = frames / count;
    (0..count)
        .map(|k| {
            let end = if k + 1 == count { frames } else { (k + 1) * size };
            k * size..end
        })
        .collect()
}

pub fn segment_stem(stem: &str, index: usize) -> String {
    format!("{stem}{SEGMENT_MARKER}{index}")
}

/// Split one recording in place. Returns the number of segments written,
/// zero when the recording is short enough to keep.
pub fn split_recording(
    speaker_dir: &Path,
    stem: &str,
    max_length: usize,
    policy: MismatchPolicy,
) -> Result<usize> {
    let mut arrays = Vec::with_capacity(ALIGNED_SUBDIRS.len());
    for subdir in ALIGNED_SUBDIRS {
        let dir = speaker_dir.join(subdir);
        let matrix = storage::read_matrix(&storage::array_path(&dir, stem))?;
        arrays.push((dir, matrix));
    }

    let frames = arrays[0].1.nrows();
    let bounds = segment_bounds(frames, max_length);
    if bounds.len() == 1 {
        return Ok(0);
    }
    for (dir, matrix) in &arrays[1..] {
        if matrix.nrows() != frames {
            check_alignment(policy, dir, stem, frames, matrix.nrows())?;
        }
    }

    let mut pending = Vec::new();
    for (dir, matrix) in &arrays {
        for (index, range) in bounds.iter().enumerate() {
            let range = clamp_range(range, index + 1 == bounds.len(), matrix.nrows());
            let segment = matrix.slice(s![range, ..]).to_owned();
            let final_path = storage::array_path(dir, &segment_stem(stem, index));
            let temp_path = pending_path(&final_path);
            write_verified(&temp_path, &segment)?;
            pending.push((temp_path, final_path));
        }
    }

    for (temp_path, final_path) in &pending {
        fs::rename(temp_path, final_path).map_err(|err| Ac2ArtError::io(final_path, err))?;
    }
    for (dir, _) in &arrays {
        let original = storage::array_path(dir, stem);
        fs::remove_file(&original).map_err(|err| Ac2ArtError::io(&original, err))?;
    }
    debug!(recording = %stem, frames, segments = bounds.len(), "split recording");
    Ok(bounds.len())
}

/// Split every over-long recording of one speaker directory.
pub fn split_speaker(
    speaker_dir: &Path,
    max_length: usize,
    policy: MismatchPolicy,
) -> Result<SplitReport> {
    let stems = storage::list_unsplit_arrays(&speaker_dir.join(LISTING_SUBDIR))?;
    let mut report = SplitReport::default();
    for stem in &stems {
        let segments = split_recording(speaker_dir, stem, max_length, policy)?;
        if segments > 0 {
            report.recordings_cut += 1;
            report.segments_written += segments;
        }
    }
    info!(
        speaker = %speaker_dir.display(),
        cut = report.recordings_cut,
        segments = report.segments_written,
        "split long recordings"
    );
    Ok(report)
}

/// Split every speaker directory under the preprocessed root.
pub fn split_all(
    preprocessed_root: &Path,
    max_length: usize,
    policy: MismatchPolicy,
) -> Result<SplitReport> {
    let mut total = SplitReport::default();
    for speaker_dir in speaker_dirs(preprocessed_root)? {
        total.absorb(&split_speaker(&speaker_dir, max_length, policy)?);
    }
    Ok(total)
}

fn speaker_dirs(root: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(root).map_err(|err| Ac2ArtError::io(root, err))?;
    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| Ac2ArtError::io(root, err))?;
        let path = entry.path();
        if path.is_dir() && entry.file_name() != FILESET_DIR {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

fn check_alignment(
    policy: MismatchPolicy,
    dir: &Path,
    stem: &str,
    expected: usize,
    actual: usize,
) -> Result<()> {
    match policy {
        MismatchPolicy::Strict => Err(Ac2ArtError::RowMismatch {
            name: format!("{}/{stem}", dir.display()),
            left: expected,
            right: actual,
        }),
        MismatchPolicy::Warn => {
            warn!(
                dir = %dir.display(),
                recording = %stem,
                expected,
                actual,
                "aligned array row count differs; cutting at the same offsets"
            );
            Ok(())
        }
    }
}

fn clamp_range(range: &Range<usize>, last: bool, rows: usize) -> Range<usize> {
    let start = range.start.min(rows);
    let end = if last { rows } else { range.end.min(rows) };
    start..end
}

fn pending_path(final_path: &Path) -> PathBuf {
    let mut name = final_path.as_os_str().to_owned();
    name.push(".");
    name.push(PENDING_SUFFIX);
    PathBuf::from(name)
}

fn write_verified(path: &Path, segment: &Array2<f64>) -> Result<()> {
    storage::write_matrix(path, segment)?;
    let rows = storage::rows_of(path)?;
    if rows != segment.nrows() {
        return Err(Ac2ArtError::RowMismatch {
            name: path.display().to_string(),
            left: segment.nrows(),
            right: rows,
        });
    }
    Ok(())
}
