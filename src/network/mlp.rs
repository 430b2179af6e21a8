use ndarray::{Array1, Array2, ArrayView1, Axis, linalg, s};
use rand::{Rng, rngs::StdRng};

use super::{Kernel, Matrices, Pass, Topology};
use crate::error::NumericErr;

/// A fully connected network with a sigmoid on every layer.
///
/// The loss of a sample is `0.5 * ||a - y||^2`, hidden layers apply inverted dropout
/// when the pass asks for it.
#[derive(Debug, Clone, Default)]
pub struct Mlp {
    // Forward metadata, one entry per layer, the input included.
    a: Vec<Array1<f32>>,
    // d a[l + 1] / d z[l], dropout mask folded in.
    da: Vec<Array1<f32>>,
}

impl Mlp {
    /// Returns a new `Mlp` without any scratch space, `replicate` sizes it.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs the forward pass of a single sample, keeping what backprop needs.
    fn forward(
        &mut self,
        weights: &Matrices,
        input: ArrayView1<f32>,
        dropout_rate: f32,
        rng: &mut StdRng,
        sample: usize,
    ) -> Result<(), NumericErr> {
        let layers = weights.len();
        let scale = 1. / (1. - dropout_rate);

        self.a.clear();
        self.da.clear();
        self.a.push(input.to_owned());

        for (l, w) in weights.iter().enumerate() {
            let mut a = affine(w, self.a[l].view())?.mapv_into(sigmoid);
            let mut da = a.mapv(|a| a * (1. - a));

            if l + 1 < layers && dropout_rate > 0. {
                for (a, da) in a.iter_mut().zip(da.iter_mut()) {
                    if rng.random::<f32>() < dropout_rate {
                        *a = 0.;
                        *da = 0.;
                    } else {
                        *a *= scale;
                        *da *= scale;
                    }
                }
            }

            if a.iter().any(|x| !x.is_finite()) {
                return Err(NumericErr::NonFinite {
                    layer: l + 1,
                    sample,
                });
            }

            self.a.push(a);
            self.da.push(da);
        }

        Ok(())
    }

    /// Backpropagates the error of the last forward pass into `grad`.
    fn backward(&self, weights: &Matrices, target: ArrayView1<f32>, grad: &mut Matrices) {
        let layers = weights.len();
        let mut delta = (&self.a[layers] - &target) * &self.da[layers - 1];

        for l in (0..layers).rev() {
            let w = &weights[l];
            let inputs = w.ncols() - 1;
            let g = &mut grad[l];

            let d = delta.view().insert_axis(Axis(1));
            let x = self.a[l].view().insert_axis(Axis(0));
            linalg::general_mat_mul(1., &d, &x, 1., &mut g.slice_mut(s![.., ..inputs]));

            let mut db = g.column_mut(inputs);
            db += &delta;

            if l > 0 {
                delta = w.slice(s![.., ..inputs]).t().dot(&delta) * &self.da[l - 1];
            }
        }
    }
}

impl Kernel for Mlp {
    fn replicate(&self, topology: &Topology) -> Self {
        let a = topology.layers().iter().map(|&n| Array1::zeros(n)).collect();
        let da = topology.layers()[1..]
            .iter()
            .map(|&n| Array1::zeros(n))
            .collect();

        Self { a, da }
    }

    fn compute_gradient(
        &mut self,
        pass: &Pass<'_>,
        rng: &mut StdRng,
        grad: &mut Matrices,
    ) -> Result<(), NumericErr> {
        if grad.len() != pass.weights.len() {
            return Err(NumericErr::ShapeMismatch {
                what: "gradient layers",
                got: grad.len(),
                expected: pass.weights.len(),
            });
        }

        let len = pass.samples.len();
        for sample in pass.sample_indices() {
            if sample >= len {
                return Err(NumericErr::SampleOutOfBounds { index: sample, len });
            }

            self.forward(
                pass.weights,
                pass.samples.input(sample),
                pass.dropout_rate,
                rng,
                sample,
            )?;
            self.backward(pass.weights, pass.samples.target(sample), grad);
        }

        if !grad.is_finite() {
            return Err(NumericErr::NonFinite {
                layer: grad.len(),
                sample: pass.range.start,
            });
        }

        Ok(())
    }

    fn predict(&self, weights: &Matrices, input: ArrayView1<f32>) -> Result<Array1<f32>, NumericErr> {
        let mut a = input.to_owned();

        for (l, w) in weights.iter().enumerate() {
            a = affine(w, a.view())?.mapv_into(sigmoid);

            if a.iter().any(|x| !x.is_finite()) {
                return Err(NumericErr::NonFinite {
                    layer: l + 1,
                    sample: 0,
                });
            }
        }

        Ok(a)
    }
}

/// `z = W[:, ..in] · x + W[:, in]`.
fn affine(w: &Array2<f32>, x: ArrayView1<f32>) -> Result<Array1<f32>, NumericErr> {
    let inputs = w.ncols() - 1;
    if x.len() != inputs {
        return Err(NumericErr::ShapeMismatch {
            what: "layer input",
            got: x.len(),
            expected: inputs,
        });
    }

    Ok(w.slice(s![.., ..inputs]).dot(&x) + &w.column(inputs))
}

fn sigmoid(z: f32) -> f32 {
    1. / (1. + (-z).exp())
}
