use std::path::Path;

use ndarray::{concatenate, s, Array1, Array2, ArrayView2, Axis};
use tracing::info;

use crate::error::{Ac2ArtError, Result};

use super::{InversionModel, ModelDims, WeightStore};

/// Dense layers followed by two bidirectional LSTMs and a linear read-out.
///
/// Tensor names follow the PyTorch state dict of the training code:
/// `first_layer`, `second_layer`, `lstm_layer`, `lstm_layer_2`,
/// `readout_layer`.
#[derive(Debug, Clone)]
pub struct Ac2ArtNetwork {
    dims: ModelDims,
    first: Dense,
    second: Dense,
    lstm: BiLstm,
    lstm_2: BiLstm,
    readout: Dense,
}

impl Ac2ArtNetwork {
    pub fn load(path: &Path, dims: ModelDims) -> Result<Self> {
        let store = WeightStore::open(path)?;
        let network = Self::from_store(&store, dims)?;
        info!(
            weights = %path.display(),
            input_dim = dims.input_dim,
            hidden_dim = dims.hidden_dim,
            output_dim = dims.output_dim,
            "loaded sequence model"
        );
        Ok(network)
    }

    pub fn from_store(store: &WeightStore, dims: ModelDims) -> Result<Self> {
        let h = dims.hidden_dim;
        Ok(Self {
            dims,
            first: Dense::load(store, "first_layer", dims.input_dim, h)?,
            second: Dense::load(store, "second_layer", h, h)?,
            lstm: BiLstm::load(store, "lstm_layer", h, h)?,
            lstm_2: BiLstm::load(store, "lstm_layer_2", 2 * h, h)?,
            readout: Dense::load(store, "readout_layer", 2 * h, dims.output_dim)?,
        })
    }

    /// Tensor names and shapes expected for `dims`.
    pub fn expected_tensors(dims: ModelDims) -> Vec<(String, Vec<usize>)> {
        let h = dims.hidden_dim;
        let mut tensors = Vec::new();
        let mut dense = |prefix: &str, input: usize, output: usize| {
            tensors.push((format!("{prefix}.weight"), vec![output, input]));
            tensors.push((format!("{prefix}.bias"), vec![output]));
        };
        dense("first_layer", dims.input_dim, h);
        dense("second_layer", h, h);
        dense("readout_layer", 2 * h, dims.output_dim);
        for (prefix, input) in [("lstm_layer", h), ("lstm_layer_2", 2 * h)] {
            for suffix in ["", "_reverse"] {
                tensors.push((format!("{prefix}.weight_ih_l0{suffix}"), vec![4 * h, input]));
                tensors.push((format!("{prefix}.weight_hh_l0{suffix}"), vec![4 * h, h]));
                tensors.push((format!("{prefix}.bias_ih_l0{suffix}"), vec![4 * h]));
                tensors.push((format!("{prefix}.bias_hh_l0{suffix}"), vec![4 * h]));
            }
        }
        tensors
    }
}

impl InversionModel for Ac2ArtNetwork {
    fn dims(&self) -> ModelDims {
        self.dims
    }

    fn forward(&self, features: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        if features.ncols() != self.dims.input_dim {
            return Err(Ac2ArtError::InputWidth {
                expected: self.dims.input_dim,
                actual: features.ncols(),
            });
        }
        let x = self.first.forward(features).mapv(relu);
        let x = self.second.forward(x.view()).mapv(relu);
        let x = self.lstm.forward(x.view())?;
        let x = self.lstm_2.forward(x.view())?;
        Ok(self.readout.forward(x.view()))
    }
}

fn relu(v: f64) -> f64 {
    v.max(0.0)
}

fn sigmoid(v: f64) -> f64 {
    1.0 / (1.0 + (-v).exp())
}

#[derive(Debug, Clone)]
struct Dense {
    weight: Array2<f64>,
    bias: Array1<f64>,
}

impl Dense {
    fn load(store: &WeightStore, prefix: &str, input: usize, output: usize) -> Result<Self> {
        Ok(Self {
            weight: store.matrix(&format!("{prefix}.weight"), output, input)?,
            bias: store.vector(&format!("{prefix}.bias"), output)?,
        })
    }

    fn forward(&self, x: ArrayView2<'_, f64>) -> Array2<f64> {
        x.dot(&self.weight.t()) + &self.bias
    }
}

/// One direction of a single-layer LSTM, gate order input/forget/cell/output.
#[derive(Debug, Clone)]
struct LstmDirection {
    weight_ih: Array2<f64>,
    weight_hh: Array2<f64>,
    bias: Array1<f64>,
    hidden: usize,
}

impl LstmDirection {
    fn load(
        store: &WeightStore,
        prefix: &str,
        suffix: &str,
        input: usize,
        hidden: usize,
    ) -> Result<Self> {
        let gates = 4 * hidden;
        let bias_ih = store.vector(&format!("{prefix}.bias_ih_l0{suffix}"), gates)?;
        let bias_hh = store.vector(&format!("{prefix}.bias_hh_l0{suffix}"), gates)?;
        Ok(Self {
            weight_ih: store.matrix(&format!("{prefix}.weight_ih_l0{suffix}"), gates, input)?,
            weight_hh: store.matrix(&format!("{prefix}.weight_hh_l0{suffix}"), gates, hidden)?,
            bias: bias_ih + bias_hh,
            hidden,
        })
    }

    fn run(&self, x: ArrayView2<'_, f64>, reverse: bool) -> Array2<f64> {
        let frames = x.nrows();
        let h = self.hidden;
        let projected = x.dot(&self.weight_ih.t()) + &self.bias;
        let mut output = Array2::zeros((frames, h));
        let mut state = Array1::<f64>::zeros(h);
        let mut cell = Array1::<f64>::zeros(h);

        for step in 0..frames {
            let t = if reverse { frames - 1 - step } else { step };
            let gates = &projected.row(t) + &self.weight_hh.dot(&state);
            let input_gate = gates.slice(s![0..h]).mapv(sigmoid);
            let forget_gate = gates.slice(s![h..2 * h]).mapv(sigmoid);
            let candidate = gates.slice(s![2 * h..3 * h]).mapv(f64::tanh);
            let output_gate = gates.slice(s![3 * h..4 * h]).mapv(sigmoid);
            cell = &forget_gate * &cell + &input_gate * &candidate;
            state = &output_gate * &cell.mapv(f64::tanh);
            output.row_mut(t).assign(&state);
        }
        output
    }
}

#[derive(Debug, Clone)]
struct BiLstm {
    forward: LstmDirection,
    backward: LstmDirection,
}

impl BiLstm {
    fn load(store: &WeightStore, prefix: &str, input: usize, hidden: usize) -> Result<Self> {
        Ok(Self {
            forward: LstmDirection::load(store, prefix, "", input, hidden)?,
            backward: LstmDirection::load(store, prefix, "_reverse", input, hidden)?,
        })
    }

    fn forward(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        let ahead = self.forward.run(x, false);
        let behind = self.backward.run(x, true);
        concatenate(Axis(1), &[ahead.view(), behind.view()])
            .map_err(|err| Ac2ArtError::Config(format!("bidirectional concat: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{predict_sequence, save_weights, NamedTensor};
    use approx::assert_abs_diff_eq;

    fn tiny_dims() -> ModelDims {
        ModelDims {
            input_dim: 3,
            hidden_dim: 2,
            output_dim: 2,
        }
    }

    fn write_constant_weights(path: &Path, dims: ModelDims, fill: f64) {
        let tensors: Vec<NamedTensor> = Ac2ArtNetwork::expected_tensors(dims)
            .into_iter()
            .map(|(name, shape)| {
                let len = shape.iter().product();
                let value = if name.contains("bias") { 0.0 } else { fill };
                NamedTensor::new(name, shape, vec![value; len])
            })
            .collect();
        save_weights(path, &tensors).unwrap();
    }

    #[test]
    fn zero_weights_predict_zeros() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zero.safetensors");
        write_constant_weights(&path, tiny_dims(), 0.0);
        let network = Ac2ArtNetwork::load(&path, tiny_dims()).unwrap();
        let features = Array2::from_elem((5, 3), 1.0);
        let trajectory = predict_sequence(&network, features.view()).unwrap();
        assert_eq!(trajectory.dim(), (5, 2));
        assert!(trajectory.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn lstm_carries_state_across_frames() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ones.safetensors");
        write_constant_weights(&path, tiny_dims(), 0.5);
        let network = Ac2ArtNetwork::load(&path, tiny_dims()).unwrap();
        let features = Array2::from_elem((4, 3), 1.0);
        let trajectory = network.forward(features.view()).unwrap();
        // Identical inputs give different outputs only through recurrence.
        assert!((trajectory[[0, 0]] - trajectory[[1, 0]]).abs() > 1e-9);
        // Symmetric weights make the sequence palindromic.
        assert_abs_diff_eq!(trajectory[[0, 0]], trajectory[[3, 0]], epsilon = 1e-12);
    }

    #[test]
    fn declared_hidden_size_must_match_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("w.safetensors");
        write_constant_weights(&path, tiny_dims(), 0.0);
        let wrong = ModelDims {
            hidden_dim: 4,
            ..tiny_dims()
        };
        let err = Ac2ArtNetwork::load(&path, wrong).unwrap_err();
        assert!(matches!(err, Ac2ArtError::TensorShape { .. }));
    }
}
