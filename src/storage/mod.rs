//! Numeric array files (`.npy`) keyed by recording stem

use std::fs;
use std::path::{Path, PathBuf};

use ndarray::{Array1, Array2};
use ndarray_npy::{read_npy, write_npy};

use crate::error::{Ac2ArtError, Result};

pub const ARRAY_EXTENSION: &str = "npy";
/// Marker inserted between a recording stem and its segment index.
pub const SEGMENT_MARKER: &str = "_split_";

pub fn array_path(dir: &Path, stem: &str) -> PathBuf {
    dir.join(format!("{stem}.{ARRAY_EXTENSION}"))
}

pub fn read_matrix(path: &Path) -> Result<Array2<f64>> {
    read_npy::<_, Array2<f64>>(path).map_err(|source| Ac2ArtError::ReadArray {
        path: path.to_path_buf(),
        source,
    })
}

/// Read a waveform stored as an array, flattening a column or row vector.
pub fn read_samples(path: &Path) -> Result<Vec<f64>> {
    match read_npy::<_, Array1<f64>>(path) {
        Ok(samples) => Ok(samples.to_vec()),
        Err(_) => read_matrix(path).map(|matrix| matrix.iter().copied().collect()),
    }
}

pub fn write_matrix(path: &Path, matrix: &Array2<f64>) -> Result<()> {
    write_npy(path, matrix).map_err(|source| Ac2ArtError::WriteArray {
        path: path.to_path_buf(),
        source,
    })
}

pub fn write_vector(path: &Path, vector: &Array1<f64>) -> Result<()> {
    write_npy(path, vector).map_err(|source| Ac2ArtError::WriteArray {
        path: path.to_path_buf(),
        source,
    })
}

pub fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|err| Ac2ArtError::io(dir, err))
}

/// Sorted stems of files in `dir` ending with `.{extension}`.
pub fn list_stems(dir: &Path, extension: &str) -> Result<Vec<String>> {
    let entries = fs::read_dir(dir).map_err(|err| Ac2ArtError::io(dir, err))?;
    let suffix = format!(".{extension}");
    let mut stems = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| Ac2ArtError::io(dir, err))?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if let Some(stem) = name.strip_suffix(&suffix) {
            stems.push(stem.to_string());
        }
    }
    stems.sort();
    Ok(stems)
}

/// Sorted array stems in `dir` that have not already been segmented.
pub fn list_unsplit_arrays(dir: &Path) -> Result<Vec<String>> {
    Ok(list_stems(dir, ARRAY_EXTENSION)?
        .into_iter()
        .filter(|stem| !stem.contains("split"))
        .collect())
}

pub(crate) fn rows_of(path: &Path) -> Result<usize> {
    Ok(read_matrix(path)?.nrows())
}
