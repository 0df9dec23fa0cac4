//! Multi-task 1-D CNN over a single-channel spectrum.
//!
//! ```text
//!  [B,1,N] ─ conv(1→16,k7,s2) ─ bn ─ relu ─ pool2
//!          ─ conv(16→32,k5,s2) ─ bn ─ relu ─ pool2
//!          ─ conv(32→64,k3,s1) ─ bn ─ relu
//!          ─ global avg pool → [B,64]
//!          ─ linear 64→32 ─ relu ─ dropout(0.5)
//!          ─ 5 × linear 32→1: diagnosis, ER, PR, HER2, Ki67
//! ```

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::layers::{
    global_avg_pool, global_avg_pool_backward, max_pool2, max_pool2_backward, relu, relu_backward,
    BatchNorm1d, BatchNormCache, Conv1d, Linear,
};
use super::tensor::Tensor3;

/// Output heads, in logit order.
pub const HEADS: [&str; 5] = ["diagnosis", "ER", "PR", "HER2", "Ki67"];

pub const DEFAULT_INPUT_LENGTH: usize = 1801;
const DROPOUT: f64 = 0.5;
const SHARED_WIDTH: usize = 32;

/// (in, out, kernel, stride, padding, pool)
const BLOCKS: [(usize, usize, usize, usize, usize, bool); 3] = [
    (1, 16, 7, 2, 3, true),
    (16, 32, 5, 2, 2, true),
    (32, 64, 3, 1, 1, false),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub input_length: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            input_length: DEFAULT_INPUT_LENGTH,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvBlock {
    pub conv: Conv1d,
    pub bn: BatchNorm1d,
    pub pool: bool,
}

impl ConvBlock {
    fn out_len(&self, len: usize) -> usize {
        let l = self.conv.out_len(len);
        if self.pool {
            l / 2
        } else {
            l
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiTaskCnn {
    pub input_length: usize,
    pub blocks: Vec<ConvBlock>,
    pub shared: Linear,
    pub heads: Vec<Linear>,
}

// ---------------------------------------------------------------------------
// Training-time cache
// ---------------------------------------------------------------------------

struct BlockCache {
    input: Tensor3,
    bn: BatchNormCache,
    activated: Tensor3,
    argmax: Option<Vec<usize>>,
}

/// Activations kept from [`MultiTaskCnn::forward_train`] for the backward pass.
pub struct ForwardCache {
    blocks: Vec<BlockCache>,
    feature_shape: (usize, usize, usize),
    pooled: Vec<Vec<f64>>,
    shared_act: Vec<Vec<f64>>,
    dropout_mask: Vec<Vec<f64>>,
    shared_out: Vec<Vec<f64>>,
}

impl MultiTaskCnn {
    /// Freshly initialised network; fails when `input_length` is too short to
    /// survive the downsampling.
    pub fn new(config: NetworkConfig, seed: u64) -> Result<Self, String> {
        let mut rng = StdRng::seed_from_u64(seed);
        let blocks: Vec<ConvBlock> = BLOCKS
            .iter()
            .map(|&(i, o, k, s, p, pool)| ConvBlock {
                conv: Conv1d::new(i, o, k, s, p, &mut rng),
                bn: BatchNorm1d::new(o),
                pool,
            })
            .collect();
        let last = BLOCKS[BLOCKS.len() - 1].1;
        let net = Self {
            input_length: config.input_length,
            blocks,
            shared: Linear::new(last, SHARED_WIDTH, &mut rng),
            heads: (0..HEADS.len())
                .map(|_| Linear::new(SHARED_WIDTH, 1, &mut rng))
                .collect(),
        };
        net.validate()?;
        Ok(net)
    }

    pub fn config(&self) -> NetworkConfig {
        NetworkConfig {
            input_length: self.input_length,
        }
    }

    /// Structural consistency check, used on freshly built and on
    /// deserialised networks alike.
    pub fn validate(&self) -> Result<(), String> {
        if self.blocks.len() != BLOCKS.len() {
            return Err(format!("expected {} conv blocks, found {}", BLOCKS.len(), self.blocks.len()));
        }
        let mut channels = 1;
        let mut len = self.input_length;
        for (i, b) in self.blocks.iter().enumerate() {
            let c = &b.conv;
            if c.in_channels != channels
                || c.weight.len() != c.out_channels * c.in_channels * c.kernel
                || c.bias.len() != c.out_channels
            {
                return Err(format!("conv block {i} has inconsistent shapes"));
            }
            if b.bn.channels != c.out_channels
                || [&b.bn.gamma, &b.bn.beta, &b.bn.running_mean, &b.bn.running_var]
                    .iter()
                    .any(|v| v.len() != c.out_channels)
            {
                return Err(format!("batch norm {i} has inconsistent shapes"));
            }
            channels = c.out_channels;
            len = b.out_len(len);
            if len == 0 {
                return Err(format!("input length {} collapses to zero at block {i}", self.input_length));
            }
        }
        let linear_ok = |l: &Linear, i: usize, o: usize| {
            l.in_features == i && l.out_features == o && l.weight.len() == i * o && l.bias.len() == o
        };
        if !linear_ok(&self.shared, channels, SHARED_WIDTH) {
            return Err("shared layer has inconsistent shapes".into());
        }
        if self.heads.len() != HEADS.len() || !self.heads.iter().all(|h| linear_ok(h, SHARED_WIDTH, 1)) {
            return Err("output heads have inconsistent shapes".into());
        }
        Ok(())
    }

    /// Inference forward pass: running batch-norm statistics, no dropout.
    pub fn forward(&self, x: &Tensor3) -> Vec<[f64; 5]> {
        let mut h = x.clone();
        for b in &self.blocks {
            h = relu(&b.bn.forward_eval(&b.conv.forward(&h)));
            if b.pool {
                h = max_pool2(&h).0;
            }
        }
        let shared: Vec<Vec<f64>> = self
            .shared
            .forward(&global_avg_pool(&h))
            .into_iter()
            .map(|r| r.into_iter().map(|v| v.max(0.0)).collect())
            .collect();
        shared.iter().map(|r| self.head_logits(r)).collect()
    }

    /// Logits for one spectrum of `input_length` points.
    pub fn logits(&self, features: &[f64]) -> [f64; 5] {
        let x = Tensor3::from_rows(&[features]);
        self.forward(&x).first().copied().unwrap_or([0.0; 5])
    }

    fn head_logits(&self, shared: &[f64]) -> [f64; 5] {
        let mut out = [0.0; 5];
        for (o, head) in out.iter_mut().zip(&self.heads) {
            *o = head.forward_row(shared)[0];
        }
        out
    }

    /// Training forward pass: batch statistics (updating the running ones),
    /// inverted dropout drawn from `rng`.
    pub fn forward_train(&mut self, x: &Tensor3, rng: &mut StdRng) -> (Vec<[f64; 5]>, ForwardCache) {
        let mut caches = Vec::with_capacity(self.blocks.len());
        let mut h = x.clone();
        for b in &mut self.blocks {
            let conv_out = b.conv.forward(&h);
            let (normed, bn_cache) = b.bn.forward_train(&conv_out);
            let activated = relu(&normed);
            let (next, argmax) = if b.pool {
                let (p, idx) = max_pool2(&activated);
                (p, Some(idx))
            } else {
                (activated.clone(), None)
            };
            caches.push(BlockCache {
                input: std::mem::replace(&mut h, next),
                bn: bn_cache,
                activated,
                argmax,
            });
        }
        let feature_shape = (h.batch, h.channels, h.len);
        let pooled = global_avg_pool(&h);
        let shared_act: Vec<Vec<f64>> = self
            .shared
            .forward(&pooled)
            .into_iter()
            .map(|r| r.into_iter().map(|v| v.max(0.0)).collect())
            .collect();
        let keep = 1.0 - DROPOUT;
        let dropout_mask: Vec<Vec<f64>> = shared_act
            .iter()
            .map(|r| {
                r.iter()
                    .map(|_| if rng.gen::<f64>() < keep { 1.0 / keep } else { 0.0 })
                    .collect()
            })
            .collect();
        let shared_out: Vec<Vec<f64>> = shared_act
            .iter()
            .zip(&dropout_mask)
            .map(|(a, m)| a.iter().zip(m).map(|(v, k)| v * k).collect())
            .collect();
        let logits = shared_out.iter().map(|r| self.head_logits(r)).collect();
        (
            logits,
            ForwardCache {
                blocks: caches,
                feature_shape,
                pooled,
                shared_act,
                dropout_mask,
                shared_out,
            },
        )
    }

    /// Zeroed gradient buffers in [`Self::params_mut`] order.
    pub fn zero_grads(&self) -> Vec<Vec<f64>> {
        let mut g = Vec::new();
        for b in &self.blocks {
            g.push(vec![0.0; b.conv.weight.len()]);
            g.push(vec![0.0; b.conv.bias.len()]);
            g.push(vec![0.0; b.bn.gamma.len()]);
            g.push(vec![0.0; b.bn.beta.len()]);
        }
        for l in std::iter::once(&self.shared).chain(&self.heads) {
            g.push(vec![0.0; l.weight.len()]);
            g.push(vec![0.0; l.bias.len()]);
        }
        g
    }

    /// Trainable parameters: per block conv weight, conv bias, bn gamma,
    /// bn beta; then weight and bias of the shared layer and of each head.
    pub fn params_mut(&mut self) -> Vec<&mut Vec<f64>> {
        let mut p = Vec::new();
        for b in &mut self.blocks {
            p.push(&mut b.conv.weight);
            p.push(&mut b.conv.bias);
            p.push(&mut b.bn.gamma);
            p.push(&mut b.bn.beta);
        }
        for l in std::iter::once(&mut self.shared).chain(&mut self.heads) {
            p.push(&mut l.weight);
            p.push(&mut l.bias);
        }
        p
    }

    /// Gradients of the loss w.r.t. every parameter given dloss/dlogits.
    pub fn backward(&self, cache: &ForwardCache, grad_logits: &[[f64; 5]]) -> Vec<Vec<f64>> {
        let mut grads = self.zero_grads();
        let nb = self.blocks.len();
        let linear_base = nb * 4;

        // heads
        let mut grad_shared = vec![vec![0.0; SHARED_WIDTH]; grad_logits.len()];
        for (h, head) in self.heads.iter().enumerate() {
            let g: Vec<Vec<f64>> = grad_logits.iter().map(|l| vec![l[h]]).collect();
            let idx = linear_base + 2 + 2 * h;
            let (gw, rest) = grads[idx..].split_at_mut(1);
            let gx = head.backward(&cache.shared_out, &g, &mut gw[0], &mut rest[0]);
            for (acc, row) in grad_shared.iter_mut().zip(gx) {
                acc.iter_mut().zip(row).for_each(|(a, v)| *a += v);
            }
        }

        // dropout, relu
        for ((g, m), a) in grad_shared.iter_mut().zip(&cache.dropout_mask).zip(&cache.shared_act) {
            for ((gi, mi), ai) in g.iter_mut().zip(m).zip(a) {
                *gi = if *ai > 0.0 { *gi * mi } else { 0.0 };
            }
        }

        let (gw, rest) = grads[linear_base..].split_at_mut(1);
        let grad_pooled = self.shared.backward(&cache.pooled, &grad_shared, &mut gw[0], &mut rest[0]);

        let (b, c, l) = cache.feature_shape;
        let mut grad = global_avg_pool_backward(b, c, l, &grad_pooled);

        for (i, (block, bc)) in self.blocks.iter().zip(&cache.blocks).enumerate().rev() {
            if let Some(argmax) = &bc.argmax {
                grad = max_pool2_backward(&bc.activated, argmax, &grad);
            }
            grad = relu_backward(&bc.activated, &grad);
            let base = i * 4;
            let (conv_g, bn_g) = grads[base..base + 4].split_at_mut(2);
            let (gg, gb) = bn_g.split_at_mut(1);
            grad = block.bn.backward(&bc.bn, &grad, &mut gg[0], &mut gb[0]);
            let (cw, cb) = conv_g.split_at_mut(1);
            match block.conv.backward(&bc.input, &grad, &mut cw[0], &mut cb[0], i > 0) {
                Some(g) => grad = g,
                None => break,
            }
        }
        grads
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nn::loss::multitask_loss;

    fn batch(rng: &mut StdRng, b: usize, n: usize) -> Tensor3 {
        Tensor3 {
            batch: b,
            channels: 1,
            len: n,
            data: (0..b * n).map(|_| rng.gen_range(-1.0..1.0)).collect(),
        }
    }

    #[test]
    fn canonical_network_is_valid() {
        let net = MultiTaskCnn::new(NetworkConfig::default(), 0).unwrap();
        assert_eq!(net.params_mut_len(), 24);
        let mut rng = StdRng::seed_from_u64(1);
        let out = net.forward(&batch(&mut rng, 2, DEFAULT_INPUT_LENGTH));
        assert_eq!(out.len(), 2);
        assert!(out.iter().flatten().all(|v| v.is_finite()));
    }

    #[test]
    fn too_short_input_is_rejected() {
        assert!(MultiTaskCnn::new(NetworkConfig { input_length: 8 }, 0).is_err());
        assert!(MultiTaskCnn::new(NetworkConfig { input_length: 64 }, 0).is_ok());
    }

    #[test]
    fn serde_preserves_predictions() {
        let net = MultiTaskCnn::new(NetworkConfig { input_length: 64 }, 3).unwrap();
        let json = serde_json::to_string(&net).unwrap();
        let back: MultiTaskCnn = serde_json::from_str(&json).unwrap();
        back.validate().unwrap();
        let x: Vec<f64> = (0..64).map(|i| (i as f64 / 7.0).sin()).collect();
        assert_eq!(net.logits(&x), back.logits(&x));
    }

    #[test]
    fn backward_matches_finite_differences() {
        // With dropout resampled per call, compare against a fixed mask by
        // reseeding the rng identically for every evaluation.
        let mut rng = StdRng::seed_from_u64(11);
        let net = MultiTaskCnn::new(NetworkConfig { input_length: 32 }, 5).unwrap();
        let x = batch(&mut rng, 3, 32);
        let diag = [1.0, 0.0, 1.0];
        let aux = [[1.0, -1.0, 0.0, 1.0], [0.0, 1.0, -1.0, -1.0], [-1.0, -1.0, 1.0, 0.0]];

        let loss_of = |net: &MultiTaskCnn| {
            let mut n = net.clone();
            let (logits, _) = n.forward_train(&x, &mut StdRng::seed_from_u64(99));
            multitask_loss(&logits, &diag, &aux).0
        };

        let mut n = net.clone();
        let (logits, cache) = n.forward_train(&x, &mut StdRng::seed_from_u64(99));
        let (_, grad_logits) = multitask_loss(&logits, &diag, &aux);
        let grads = net.backward(&cache, &grad_logits);

        let h = 1e-6;
        // (param tensor, element): first conv, middle bn, shared, a head
        for (p, e) in [(0, 3), (1, 0), (6, 4), (9, 2), (11, 5), (12, 17), (14, 3), (17, 0)] {
            let mut plus = net.clone();
            plus.params_mut()[p][e] += h;
            let mut minus = net.clone();
            minus.params_mut()[p][e] -= h;
            let num = (loss_of(&plus) - loss_of(&minus)) / (2.0 * h);
            let ana = grads[p][e];
            assert!(
                (num - ana).abs() < 1e-5 * (1.0 + num.abs()),
                "param {p}[{e}]: numeric {num} vs analytic {ana}"
            );
        }
    }

    impl MultiTaskCnn {
        fn params_mut_len(&self) -> usize {
            self.clone().params_mut().len()
        }
    }
}
