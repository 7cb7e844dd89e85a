//! Plain-text trajectory records for ABX evaluation tooling.
//!
//! One line per frame: the frame centre time in seconds followed by every
//! channel value, space separated, no header.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use ndarray::Array2;
use tracing::{debug, info};

use crate::error::{Ac2ArtError, Result};
use crate::storage;
use crate::types::frame_center_seconds;

pub const RECORD_EXTENSION: &str = "fea";

/// Render a trajectory as record text.
pub fn format_record(trajectory: &Array2<f64>) -> String {
    let mut text = String::new();
    for (index, row) in trajectory.outer_iter().enumerate() {
        push_value(&mut text, frame_center_seconds(index));
        for &value in row.iter() {
            text.push(' ');
            push_value(&mut text, value);
        }
        text.push('\n');
    }
    text
}

/// Append `value` in the shortest round-trip form used by existing record
/// files: whole numbers keep a `.0`, and exponents below -4 or from 16 up
/// switch to scientific notation with a signed two-digit exponent.
fn push_value(text: &mut String, value: f64) {
    if value.is_nan() {
        text.push_str("nan");
        return;
    }
    if value.is_infinite() {
        text.push_str(if value > 0.0 { "inf" } else { "-inf" });
        return;
    }
    let scientific = format!("{value:e}");
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        text.push_str(&scientific);
        return;
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);
    if value != 0.0 && !(-4..16).contains(&exponent) {
        let sign = if exponent < 0 { '-' } else { '+' };
        let _ = write!(text, "{mantissa}e{sign}{:02}", exponent.abs());
        return;
    }
    let plain = value.to_string();
    text.push_str(&plain);
    if !plain.contains('.') {
        text.push_str(".0");
    }
}

/// Record name for a source file: its last four characters replaced by `.fea`.
pub fn record_name(source_file: &str) -> String {
    let cut = source_file
        .char_indices()
        .rev()
        .nth(3)
        .map_or(0, |(index, _)| index);
    format!("{}.{RECORD_EXTENSION}", &source_file[..cut])
}

pub fn write_record(
    trajectory: &Array2<f64>,
    source_file: &str,
    record_dir: &Path,
) -> Result<PathBuf> {
    let path = record_dir.join(record_name(source_file));
    fs::write(&path, format_record(trajectory)).map_err(|err| Ac2ArtError::io(&path, err))?;
    debug!(file = %path.display(), frames = trajectory.nrows(), "record written");
    Ok(path)
}

/// Export the first `limit` (zero for all) trajectory files of a directory.
pub fn export_dir(trajectory_dir: &Path, record_dir: &Path, limit: usize) -> Result<Vec<PathBuf>> {
    storage::ensure_dir(record_dir)?;
    let mut stems = storage::list_stems(trajectory_dir, storage::ARRAY_EXTENSION)?;
    if limit > 0 {
        stems.truncate(limit);
    }
    info!(
        files = stems.len(),
        target = %record_dir.display(),
        "writing evaluation records"
    );
    stems
        .iter()
        .map(|stem| {
            let trajectory = storage::read_matrix(&storage::array_path(trajectory_dir, stem))?;
            let source = format!("{stem}.{}", storage::ARRAY_EXTENSION);
            write_record(&trajectory, &source, record_dir)
        })
        .collect()
}

/// Rename every file in `folder` by dropping its last eight characters and
/// appending `.fea`.
pub fn rename_records(folder: &Path) -> Result<usize> {
    let entries = fs::read_dir(folder).map_err(|err| Ac2ArtError::io(folder, err))?;
    let mut renamed = 0;
    for entry in entries {
        let entry = entry.map_err(|err| Ac2ArtError::io(folder, err))?;
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        let cut = name.char_indices().rev().nth(7).map_or(0, |(index, _)| index);
        let target = folder.join(format!("{}.{RECORD_EXTENSION}", &name[..cut]));
        fs::rename(entry.path(), &target).map_err(|err| Ac2ArtError::io(&target, err))?;
        renamed += 1;
    }
    Ok(renamed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn lines_start_with_frame_centres() {
        let text = format_record(&array![[1.5, -2.0], [0.25, 3.0]]);
        assert_eq!(text, "0.0125 1.5 -2.0\n0.0225 0.25 3.0\n");
    }

    #[test]
    fn values_keep_float_notation() {
        let text = format_record(&array![[1.0, 0.00001, -0.0, 0.0001, 1e16, -2.5e-7]]);
        assert_eq!(text, "0.0125 1.0 1e-05 -0.0 0.0001 1e+16 -2.5e-07\n");
        let text = format_record(&array![[123456.789, f64::NAN, 1e15]]);
        assert_eq!(text, "0.0125 123456.789 nan 1000000000000000.0\n");
    }

    #[test]
    fn record_name_replaces_extension() {
        assert_eq!(record_name("s0101a.npy"), "s0101a.fea");
        assert_eq!(record_name(".npy"), ".fea");
        assert_eq!(record_name("ab"), ".fea");
    }

    #[test]
    fn values_round_trip_through_text() {
        let values = [0.1, 1.0 / 3.0, -2.5e-7, 123456.789];
        let text = format_record(&Array2::from_shape_vec((1, 4), values.to_vec()).unwrap());
        let parsed: Vec<f64> = text
            .split_whitespace()
            .skip(1)
            .map(|field| field.parse().unwrap())
            .collect();
        assert_eq!(parsed, values.to_vec());
    }

    #[test]
    fn rename_strips_eight_characters() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("utt1.npy.fea"), b"").unwrap();
        assert_eq!(rename_records(dir.path()).unwrap(), 1);
        assert!(dir.path().join("utt1.fea").exists());
    }
}
