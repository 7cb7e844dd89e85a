use std::path::PathBuf;

use thiserror::Error;

/// Convenient alias for results returned by library modules.
pub type Result<T> = std::result::Result<T, Ac2ArtError>;

#[derive(Debug, Error)]
pub enum Ac2ArtError {
    #[error("i/o error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode audio {path:?}: {message}")]
    Decode { path: PathBuf, message: String },
    #[error("failed to read array {path:?}: {source}")]
    ReadArray {
        path: PathBuf,
        #[source]
        source: ndarray_npy::ReadNpyError,
    },
    #[error("failed to write array {path:?}: {source}")]
    WriteArray {
        path: PathBuf,
        #[source]
        source: ndarray_npy::WriteNpyError,
    },
    #[error("weight file {path:?}: {message}")]
    Weights { path: PathBuf, message: String },
    #[error("tensor {name} has shape {actual:?}, expected {expected:?}")]
    TensorShape {
        name: String,
        actual: Vec<usize>,
        expected: Vec<usize>,
    },
    #[error("model expected {expected} input columns, got {actual}")]
    InputWidth { expected: usize, actual: usize },
    #[error("model produced {len} values, not a multiple of output dim {output_dim}")]
    OutputShape { len: usize, output_dim: usize },
    #[error("waveform {name} is silent; cannot peak-normalize")]
    SilentWaveform { name: String },
    #[error("row count mismatch for {name}: {left} rows vs {right} rows")]
    RowMismatch {
        name: String,
        left: usize,
        right: usize,
    },
    #[error("{name} has {actual} channels, expected {expected}")]
    ChannelWidth {
        name: String,
        actual: usize,
        expected: usize,
    },
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Ac2ArtError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
