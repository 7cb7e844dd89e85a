//! Contract for the pretrained sequence models and a reference network.

mod network;
mod weights;

use ndarray::{Array2, ArrayView2};

use crate::error::{Ac2ArtError, Result};
use crate::types::FEATURE_WIDTH;

pub use network::Ac2ArtNetwork;
pub use weights::{save_weights, NamedTensor, WeightStore};

/// Declared layer sizes a weight file must agree with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelDims {
    pub input_dim: usize,
    pub hidden_dim: usize,
    pub output_dim: usize,
}

impl ModelDims {
    /// Articulatory inversion: stacked features to 18 articulator channels.
    pub fn inversion() -> Self {
        Self {
            input_dim: FEATURE_WIDTH,
            hidden_dim: 300,
            output_dim: 18,
        }
    }

    /// Velum position: stacked features to (x, y).
    pub fn velum() -> Self {
        Self {
            input_dim: FEATURE_WIDTH,
            hidden_dim: 200,
            output_dim: 2,
        }
    }

    pub fn with_output_dim(mut self, output_dim: usize) -> Self {
        self.output_dim = output_dim;
        self
    }
}

/// A trained model mapping a whole feature sequence to a trajectory sequence.
///
/// Implementations are immutable after loading; one call sees one recording
/// as a single batch.
pub trait InversionModel {
    fn dims(&self) -> ModelDims;

    /// Raw model output for one sequence. Any shape whose element count is a
    /// multiple of `dims().output_dim` is accepted.
    fn forward(&self, features: ArrayView2<'_, f64>) -> Result<Array2<f64>>;
}

impl<M: InversionModel + ?Sized> InversionModel for &M {
    fn dims(&self) -> ModelDims {
        (**self).dims()
    }

    fn forward(&self, features: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        (**self).forward(features)
    }
}

impl<M: InversionModel + ?Sized> InversionModel for Box<M> {
    fn dims(&self) -> ModelDims {
        (**self).dims()
    }

    fn forward(&self, features: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        (**self).forward(features)
    }
}

/// Run `model` over one feature matrix and reshape to `(frames, output_dim)`.
pub fn predict_sequence<M: InversionModel + ?Sized>(
    model: &M,
    features: ArrayView2<'_, f64>,
) -> Result<Array2<f64>> {
    let dims = model.dims();
    if features.ncols() != dims.input_dim {
        return Err(Ac2ArtError::InputWidth {
            expected: dims.input_dim,
            actual: features.ncols(),
        });
    }
    let raw = model.forward(features)?;
    let len = raw.len();
    if dims.output_dim == 0 || len % dims.output_dim != 0 {
        return Err(Ac2ArtError::OutputShape {
            len,
            output_dim: dims.output_dim,
        });
    }
    let frames = len / dims.output_dim;
    if frames != features.nrows() {
        return Err(Ac2ArtError::RowMismatch {
            name: "model output".to_string(),
            left: features.nrows(),
            right: frames,
        });
    }
    let flat: Vec<f64> = raw.iter().copied().collect();
    Array2::from_shape_vec((frames, dims.output_dim), flat).map_err(|_| {
        Ac2ArtError::OutputShape {
            len,
            output_dim: dims.output_dim,
        }
    })
}
