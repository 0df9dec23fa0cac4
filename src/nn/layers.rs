//! Layers with explicit forward and backward passes.
//!
//! Backward functions take the cached forward inputs and the upstream
//! gradient, accumulate parameter gradients into caller-owned buffers and
//! return the gradient with respect to the layer input.

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::tensor::Tensor3;

fn uniform(rng: &mut StdRng, n: usize, bound: f64) -> Vec<f64> {
    (0..n).map(|_| rng.gen_range(-bound..bound)).collect()
}

// ---------------------------------------------------------------------------
// Conv1d
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conv1d {
    pub in_channels: usize,
    pub out_channels: usize,
    pub kernel: usize,
    pub stride: usize,
    pub padding: usize,
    /// `[out][in][kernel]`
    pub weight: Vec<f64>,
    pub bias: Vec<f64>,
}

impl Conv1d {
    pub fn new(
        in_channels: usize,
        out_channels: usize,
        kernel: usize,
        stride: usize,
        padding: usize,
        rng: &mut StdRng,
    ) -> Self {
        let bound = 1.0 / ((in_channels * kernel) as f64).sqrt();
        Self {
            in_channels,
            out_channels,
            kernel,
            stride,
            padding,
            weight: uniform(rng, out_channels * in_channels * kernel, bound),
            bias: uniform(rng, out_channels, bound),
        }
    }

    /// Output length for an input of `len`; `0` if the kernel does not fit.
    pub fn out_len(&self, len: usize) -> usize {
        let padded = len + 2 * self.padding;
        if padded < self.kernel || self.stride == 0 {
            return 0;
        }
        (padded - self.kernel) / self.stride + 1
    }

    /// Input position read by output `t`, kernel tap `k`, if inside the signal.
    #[inline]
    fn source(&self, t: usize, k: usize, len: usize) -> Option<usize> {
        (t * self.stride + k)
            .checked_sub(self.padding)
            .filter(|&p| p < len)
    }

    pub fn forward(&self, x: &Tensor3) -> Tensor3 {
        let lo = self.out_len(x.len);
        let mut out = Tensor3::zeros(x.batch, self.out_channels, lo);
        for b in 0..x.batch {
            for o in 0..self.out_channels {
                let ob = out.offset(b, o);
                for t in 0..lo {
                    let mut acc = self.bias[o];
                    for c in 0..self.in_channels {
                        let wb = (o * self.in_channels + c) * self.kernel;
                        let xb = x.offset(b, c);
                        for k in 0..self.kernel {
                            if let Some(p) = self.source(t, k, x.len) {
                                acc += self.weight[wb + k] * x.data[xb + p];
                            }
                        }
                    }
                    out.data[ob + t] = acc;
                }
            }
        }
        out
    }

    /// Returns the input gradient only when `need_input_grad` is set.
    pub fn backward(
        &self,
        x: &Tensor3,
        grad_out: &Tensor3,
        grad_weight: &mut [f64],
        grad_bias: &mut [f64],
        need_input_grad: bool,
    ) -> Option<Tensor3> {
        let mut grad_in = need_input_grad.then(|| x.same_shape());
        for b in 0..x.batch {
            for o in 0..self.out_channels {
                let gb = grad_out.offset(b, o);
                for t in 0..grad_out.len {
                    let g = grad_out.data[gb + t];
                    if g == 0.0 {
                        continue;
                    }
                    grad_bias[o] += g;
                    for c in 0..self.in_channels {
                        let wb = (o * self.in_channels + c) * self.kernel;
                        let xb = x.offset(b, c);
                        for k in 0..self.kernel {
                            if let Some(p) = self.source(t, k, x.len) {
                                grad_weight[wb + k] += g * x.data[xb + p];
                                if let Some(gi) = grad_in.as_mut() {
                                    gi.data[xb + p] += g * self.weight[wb + k];
                                }
                            }
                        }
                    }
                }
            }
        }
        grad_in
    }
}

// ---------------------------------------------------------------------------
// BatchNorm1d
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchNorm1d {
    pub channels: usize,
    pub eps: f64,
    pub momentum: f64,
    pub gamma: Vec<f64>,
    pub beta: Vec<f64>,
    pub running_mean: Vec<f64>,
    pub running_var: Vec<f64>,
}

/// Per-forward state needed by [`BatchNorm1d::backward`].
#[derive(Debug, Clone)]
pub struct BatchNormCache {
    xhat: Tensor3,
    inv_std: Vec<f64>,
}

impl BatchNorm1d {
    pub fn new(channels: usize) -> Self {
        Self {
            channels,
            eps: 1e-5,
            momentum: 0.1,
            gamma: vec![1.0; channels],
            beta: vec![0.0; channels],
            running_mean: vec![0.0; channels],
            running_var: vec![1.0; channels],
        }
    }

    /// Inference: normalise with the running statistics.
    pub fn forward_eval(&self, x: &Tensor3) -> Tensor3 {
        let mut out = x.same_shape();
        for c in 0..self.channels {
            let inv_std = 1.0 / (self.running_var[c] + self.eps).sqrt();
            let (scale, shift) = (self.gamma[c] * inv_std, self.beta[c]);
            for b in 0..x.batch {
                let o = x.offset(b, c);
                for t in 0..x.len {
                    out.data[o + t] = (x.data[o + t] - self.running_mean[c]) * scale + shift;
                }
            }
        }
        out
    }

    /// Training: normalise with batch statistics and update running ones
    /// (unbiased variance, as the running estimate).
    pub fn forward_train(&mut self, x: &Tensor3) -> (Tensor3, BatchNormCache) {
        let n = (x.batch * x.len) as f64;
        let mut out = x.same_shape();
        let mut xhat = x.same_shape();
        let mut inv_stds = vec![0.0; self.channels];
        for c in 0..self.channels {
            let mut sum = 0.0;
            for b in 0..x.batch {
                let o = x.offset(b, c);
                sum += x.data[o..o + x.len].iter().sum::<f64>();
            }
            let mean = sum / n;
            let mut sq = 0.0;
            for b in 0..x.batch {
                let o = x.offset(b, c);
                sq += x.data[o..o + x.len].iter().map(|v| (v - mean).powi(2)).sum::<f64>();
            }
            let var = sq / n;
            let inv_std = 1.0 / (var + self.eps).sqrt();
            inv_stds[c] = inv_std;
            for b in 0..x.batch {
                let o = x.offset(b, c);
                for t in 0..x.len {
                    let h = (x.data[o + t] - mean) * inv_std;
                    xhat.data[o + t] = h;
                    out.data[o + t] = self.gamma[c] * h + self.beta[c];
                }
            }
            let unbiased = if n > 1.0 { var * n / (n - 1.0) } else { var };
            self.running_mean[c] = (1.0 - self.momentum) * self.running_mean[c] + self.momentum * mean;
            self.running_var[c] = (1.0 - self.momentum) * self.running_var[c] + self.momentum * unbiased;
        }
        (
            out,
            BatchNormCache {
                xhat,
                inv_std: inv_stds,
            },
        )
    }

    pub fn backward(
        &self,
        cache: &BatchNormCache,
        grad_out: &Tensor3,
        grad_gamma: &mut [f64],
        grad_beta: &mut [f64],
    ) -> Tensor3 {
        let xhat = &cache.xhat;
        let n = (xhat.batch * xhat.len) as f64;
        let mut grad_in = xhat.same_shape();
        for c in 0..self.channels {
            let mut dgamma = 0.0;
            let mut dbeta = 0.0;
            for b in 0..xhat.batch {
                let o = xhat.offset(b, c);
                for t in 0..xhat.len {
                    let g = grad_out.data[o + t];
                    dgamma += g * xhat.data[o + t];
                    dbeta += g;
                }
            }
            grad_gamma[c] += dgamma;
            grad_beta[c] += dbeta;

            // dxhat = g·γ; Σdxhat = γ·dβ; Σ(dxhat·xhat) = γ·dγ.
            let gamma = self.gamma[c];
            let k = cache.inv_std[c] / n;
            for b in 0..xhat.batch {
                let o = xhat.offset(b, c);
                for t in 0..xhat.len {
                    let dxhat = grad_out.data[o + t] * gamma;
                    grad_in.data[o + t] =
                        k * (n * dxhat - gamma * dbeta - xhat.data[o + t] * gamma * dgamma);
                }
            }
        }
        grad_in
    }
}

// ---------------------------------------------------------------------------
// Activations and pooling
// ---------------------------------------------------------------------------

pub fn relu(x: &Tensor3) -> Tensor3 {
    Tensor3 {
        data: x.data.iter().map(|v| v.max(0.0)).collect(),
        ..x.same_shape()
    }
}

/// Gradient through ReLU given the activation's output.
pub fn relu_backward(output: &Tensor3, grad_out: &Tensor3) -> Tensor3 {
    Tensor3 {
        data: output
            .data
            .iter()
            .zip(&grad_out.data)
            .map(|(o, g)| if *o > 0.0 { *g } else { 0.0 })
            .collect(),
        ..output.same_shape()
    }
}

/// Max-pool with kernel 2 and stride 2; a trailing odd sample is dropped.
/// Also returns, per output, the flat input index that won.
pub fn max_pool2(x: &Tensor3) -> (Tensor3, Vec<usize>) {
    let lo = x.len / 2;
    let mut out = Tensor3::zeros(x.batch, x.channels, lo);
    let mut argmax = vec![0; out.data.len()];
    for b in 0..x.batch {
        for c in 0..x.channels {
            let xi = x.offset(b, c);
            let oi = out.offset(b, c);
            for t in 0..lo {
                let (i0, i1) = (xi + 2 * t, xi + 2 * t + 1);
                let win = if x.data[i1] > x.data[i0] { i1 } else { i0 };
                out.data[oi + t] = x.data[win];
                argmax[oi + t] = win;
            }
        }
    }
    (out, argmax)
}

pub fn max_pool2_backward(input_shape: &Tensor3, argmax: &[usize], grad_out: &Tensor3) -> Tensor3 {
    let mut grad_in = input_shape.same_shape();
    for (g, &i) in grad_out.data.iter().zip(argmax) {
        grad_in.data[i] += g;
    }
    grad_in
}

/// Mean over the length axis: `batch × channels` rows.
pub fn global_avg_pool(x: &Tensor3) -> Vec<Vec<f64>> {
    (0..x.batch)
        .map(|b| {
            (0..x.channels)
                .map(|c| {
                    let o = x.offset(b, c);
                    x.data[o..o + x.len].iter().sum::<f64>() / x.len as f64
                })
                .collect()
        })
        .collect()
}

pub fn global_avg_pool_backward(batch: usize, channels: usize, len: usize, grad: &[Vec<f64>]) -> Tensor3 {
    let mut out = Tensor3::zeros(batch, channels, len);
    for b in 0..batch {
        for c in 0..channels {
            let g = grad[b][c] / len as f64;
            let o = out.offset(b, c);
            out.data[o..o + len].iter_mut().for_each(|v| *v = g);
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Linear
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Linear {
    pub in_features: usize,
    pub out_features: usize,
    /// `[out][in]`
    pub weight: Vec<f64>,
    pub bias: Vec<f64>,
}

impl Linear {
    pub fn new(in_features: usize, out_features: usize, rng: &mut StdRng) -> Self {
        let bound = 1.0 / (in_features as f64).sqrt();
        Self {
            in_features,
            out_features,
            weight: uniform(rng, out_features * in_features, bound),
            bias: uniform(rng, out_features, bound),
        }
    }

    pub fn forward_row(&self, x: &[f64]) -> Vec<f64> {
        (0..self.out_features)
            .map(|o| {
                let w = &self.weight[o * self.in_features..(o + 1) * self.in_features];
                self.bias[o] + w.iter().zip(x).map(|(a, b)| a * b).sum::<f64>()
            })
            .collect()
    }

    pub fn forward(&self, rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
        rows.iter().map(|r| self.forward_row(r)).collect()
    }

    pub fn backward(
        &self,
        inputs: &[Vec<f64>],
        grad_out: &[Vec<f64>],
        grad_weight: &mut [f64],
        grad_bias: &mut [f64],
    ) -> Vec<Vec<f64>> {
        inputs
            .iter()
            .zip(grad_out)
            .map(|(x, g)| {
                let mut gx = vec![0.0; self.in_features];
                for o in 0..self.out_features {
                    grad_bias[o] += g[o];
                    let row = o * self.in_features;
                    for i in 0..self.in_features {
                        grad_weight[row + i] += g[o] * x[i];
                        gx[i] += g[o] * self.weight[row + i];
                    }
                }
                gx
            })
            .collect()
    }
}
