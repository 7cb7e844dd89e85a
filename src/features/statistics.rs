use ndarray::{concatenate, s, Array1, Array2, Axis};

use crate::error::{Ac2ArtError, Result};

const DELTA_WINDOW: usize = 2;
const EPSILON: f64 = 1e-12;

/// Append first and second temporal derivatives to each row.
pub(crate) fn add_dynamics(coefficients: &Array2<f64>) -> Result<Array2<f64>> {
    let deltas = compute_delta_matrix(coefficients, DELTA_WINDOW);
    let delta_deltas = compute_delta_matrix(&deltas, DELTA_WINDOW);
    concatenate(
        Axis(1),
        &[coefficients.view(), deltas.view(), delta_deltas.view()],
    )
    .map_err(|err| Ac2ArtError::Config(format!("dynamic feature shape: {err}")))
}

/// Regression deltas over `window` neighbours, repeating edge frames.
pub(crate) fn compute_delta_matrix(input: &Array2<f64>, window: usize) -> Array2<f64> {
    let (frames, coeffs) = input.dim();
    let mut output = Array2::zeros((frames, coeffs));
    if frames == 0 {
        return output;
    }
    let denominator = (2.0 * (1..=window).map(|n| (n * n) as f64).sum::<f64>()).max(EPSILON);

    for t in 0..frames {
        let mut numerator = Array1::<f64>::zeros(coeffs);
        for n in 1..=window {
            let prev = input.row(t.saturating_sub(n));
            let next = input.row((t + n).min(frames - 1));
            numerator.scaled_add(n as f64, &(&next - &prev));
        }
        output.row_mut(t).assign(&(numerator / denominator));
    }
    output
}

/// Concatenate each row with its `context` past and future neighbours.
///
/// Rows beyond either end of the recording read as zeros.
pub(crate) fn stack_context(input: &Array2<f64>, context: usize) -> Array2<f64> {
    let (frames, width) = input.dim();
    let span = 2 * context + 1;
    let mut padded = Array2::<f64>::zeros((frames + 2 * context, width));
    padded.slice_mut(s![context..context + frames, ..]).assign(input);

    let mut stacked = Array2::<f64>::zeros((frames, width * span));
    for offset in 0..span {
        stacked
            .slice_mut(s![.., offset * width..(offset + 1) * width])
            .assign(&padded.slice(s![offset..offset + frames, ..]));
    }
    stacked
}

/// Zero mean and unit (population) variance per column.
pub(crate) fn standardize_columns(input: &Array2<f64>) -> Array2<f64> {
    let mut output = input.clone();
    if input.nrows() == 0 {
        return output;
    }
    for mut column in output.columns_mut() {
        let mean = column.mean().unwrap_or(0.0);
        let variance = column.mapv(|v| (v - mean).powi(2)).mean().unwrap_or(0.0);
        let std_dev = variance.sqrt().max(EPSILON);
        column.mapv_inplace(|v| (v - mean) / std_dev);
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn delta_of_a_ramp_is_constant() {
        let ramp = Array2::from_shape_fn((10, 2), |(t, c)| (t * (c + 1)) as f64);
        let deltas = compute_delta_matrix(&ramp, 2);
        for t in 2..8 {
            assert_abs_diff_eq!(deltas[[t, 0]], 1.0, epsilon = 1e-12);
            assert_abs_diff_eq!(deltas[[t, 1]], 2.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn dynamics_triple_the_width() {
        let input = Array2::from_elem((6, 13), 1.0);
        let output = add_dynamics(&input).unwrap();
        assert_eq!(output.dim(), (6, 39));
        assert_abs_diff_eq!(output[[3, 20]], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn context_pads_edges_with_zeros() {
        let input = array![[1.0], [2.0], [3.0]];
        let stacked = stack_context(&input, 1);
        assert_eq!(stacked, array![[0.0, 1.0, 2.0], [1.0, 2.0, 3.0], [2.0, 3.0, 0.0]]);
    }

    #[test]
    fn standardized_columns_have_unit_spread() {
        let input = array![[1.0, 10.0], [2.0, 30.0], [3.0, 20.0], [6.0, 0.0]];
        let output = standardize_columns(&input);
        for column in output.columns() {
            assert_abs_diff_eq!(column.mean().unwrap(), 0.0, epsilon = 1e-12);
            assert_abs_diff_eq!(column.std(0.0), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn constant_column_becomes_zero() {
        let output = standardize_columns(&array![[4.0], [4.0]]);
        assert_eq!(output, array![[0.0], [0.0]]);
    }
}
