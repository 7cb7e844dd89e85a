//! Safetensors-backed weight loading with declared-shape checks.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use ndarray::{Array1, Array2};
use safetensors::tensor::{Dtype, TensorView};
use safetensors::SafeTensors;

use crate::error::{Ac2ArtError, Result};

#[derive(Debug, Clone)]
struct Tensor {
    shape: Vec<usize>,
    data: Vec<f64>,
}

/// Every tensor of one weight file, widened to `f64`.
#[derive(Debug)]
pub struct WeightStore {
    path: PathBuf,
    tensors: HashMap<String, Tensor>,
}

impl WeightStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Ac2ArtError::Weights {
                path: path.to_path_buf(),
                message: "weight file not found".to_string(),
            });
        }
        let bytes = std::fs::read(path).map_err(|err| Ac2ArtError::io(path, err))?;
        let parsed = SafeTensors::deserialize(&bytes).map_err(|err| Ac2ArtError::Weights {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;

        let mut tensors = HashMap::new();
        for (name, view) in parsed.tensors() {
            let data = widen(&name, &view).map_err(|message| Ac2ArtError::Weights {
                path: path.to_path_buf(),
                message,
            })?;
            tensors.insert(
                name,
                Tensor {
                    shape: view.shape().to_vec(),
                    data,
                },
            );
        }
        Ok(Self {
            path: path.to_path_buf(),
            tensors,
        })
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tensors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn matrix(&self, name: &str, rows: usize, cols: usize) -> Result<Array2<f64>> {
        let tensor = self.checked(name, &[rows, cols])?;
        Array2::from_shape_vec((rows, cols), tensor.data.clone()).map_err(|_| {
            Ac2ArtError::TensorShape {
                name: name.to_string(),
                actual: tensor.shape.clone(),
                expected: vec![rows, cols],
            }
        })
    }

    pub fn vector(&self, name: &str, len: usize) -> Result<Array1<f64>> {
        let tensor = self.checked(name, &[len])?;
        Ok(Array1::from_vec(tensor.data.clone()))
    }

    fn checked(&self, name: &str, expected: &[usize]) -> Result<&Tensor> {
        let tensor = self.tensors.get(name).ok_or_else(|| Ac2ArtError::Weights {
            path: self.path.clone(),
            message: format!("missing tensor {name}"),
        })?;
        if tensor.shape != expected || tensor.data.len() != expected.iter().product::<usize>() {
            return Err(Ac2ArtError::TensorShape {
                name: name.to_string(),
                actual: tensor.shape.clone(),
                expected: expected.to_vec(),
            });
        }
        Ok(tensor)
    }
}

fn widen(name: &str, view: &TensorView<'_>) -> std::result::Result<Vec<f64>, String> {
    let raw = view.data();
    match view.dtype() {
        Dtype::F64 => {
            if raw.len() % 8 != 0 {
                return Err(format!("{name}: {} bytes is not a multiple of 8", raw.len()));
            }
            Ok(raw
                .chunks_exact(8)
                .map(|c| f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
                .collect())
        }
        Dtype::F32 => {
            if raw.len() % 4 != 0 {
                return Err(format!("{name}: {} bytes is not a multiple of 4", raw.len()));
            }
            Ok(raw
                .chunks_exact(4)
                .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]) as f64)
                .collect())
        }
        other => Err(format!("{name}: unsupported dtype {other:?}")),
    }
}

/// A tensor to be written by [`save_weights`].
#[derive(Debug, Clone)]
pub struct NamedTensor {
    pub name: String,
    pub shape: Vec<usize>,
    pub data: Vec<f64>,
}

impl NamedTensor {
    pub fn new(name: impl Into<String>, shape: Vec<usize>, data: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            shape,
            data,
        }
    }
}

/// Write `f64` tensors to a safetensors file.
pub fn save_weights(path: &Path, tensors: &[NamedTensor]) -> Result<()> {
    let fail = |message: String| Ac2ArtError::Weights {
        path: path.to_path_buf(),
        message,
    };
    let buffers: Vec<Vec<u8>> = tensors
        .iter()
        .map(|t| t.data.iter().flat_map(|v| v.to_le_bytes()).collect())
        .collect();
    let mut views = Vec::with_capacity(tensors.len());
    for (tensor, bytes) in tensors.iter().zip(&buffers) {
        let view = TensorView::new(Dtype::F64, tensor.shape.clone(), bytes)
            .map_err(|err| fail(format!("{}: {err}", tensor.name)))?;
        views.push((tensor.name.clone(), view));
    }
    let named = views.iter().map(|(name, view)| (name.as_str(), view));
    let serialized = safetensors::serialize(named, &None).map_err(|err| fail(err.to_string()))?;
    std::fs::write(path, serialized).map_err(|err| Ac2ArtError::io(path, err))
}
