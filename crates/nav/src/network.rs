use std::path::Path;

use crate::NavError;

/// Network inputs: destination xyz, position xyz, and one slot held at zero.
pub const INPUTS: usize = 7;
/// Network outputs: one per axis, in `[0, 1]`.
pub const OUTPUTS: usize = 3;

/// Layer widths, input first.
const LAYERS: [usize; 4] = [INPUTS, 3, 3, OUTPUTS];

const fn param_count() -> usize {
    let mut total = 0;
    let mut i = 0;
    while i + 1 < LAYERS.len() {
        total += LAYERS[i + 1] * (LAYERS[i] + 1);
        i += 1;
    }
    total
}

/// Total weights and biases of the fixed topology.
pub const PARAM_COUNT: usize = param_count();

/// `(param offset, inputs, outputs)` for each layer. Every neuron owns
/// `inputs` weights followed by one bias.
fn layers() -> impl Iterator<Item = (usize, usize, usize)> {
    LAYERS.windows(2).scan(0, |offset, w| {
        let start = *offset;
        *offset += w[1] * (w[0] + 1);
        Some((start, w[0], w[1]))
    })
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Small fixed-topology feed-forward network (7 → 3 → 3 → 3, sigmoid units).
///
/// The parameter vector is the whole state; there is no separate shape to
/// keep in sync with it.
#[derive(Debug, Clone, PartialEq)]
pub struct Network {
    params: Vec<f32>,
}

impl Default for Network {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl Network {
    /// All weights and biases zero: every output sits at 0.5.
    pub fn zeroed() -> Self {
        Self {
            params: vec![0.0; PARAM_COUNT],
        }
    }

    pub fn from_params(params: Vec<f32>) -> Result<Self, NavError> {
        if params.len() != PARAM_COUNT {
            return Err(NavError::ParamCount {
                expected: PARAM_COUNT,
                actual: params.len(),
            });
        }
        Ok(Self { params })
    }

    pub fn params(&self) -> &[f32] {
        &self.params
    }

    #[cfg(feature = "training")]
    pub(crate) fn params_mut(&mut self) -> &mut [f32] {
        &mut self.params
    }

    /// Number of neurons across all non-input layers.
    pub fn neuron_count() -> usize {
        LAYERS[1..].iter().sum()
    }

    /// Param ranges `(start, len)` for every neuron in layer order.
    #[cfg(any(test, feature = "training"))]
    pub(crate) fn neuron_spans() -> impl Iterator<Item = (usize, usize)> {
        layers().flat_map(|(offset, inputs, outputs)| {
            (0..outputs).map(move |o| (offset + o * (inputs + 1), inputs + 1))
        })
    }

    /// Activations of every layer, input first.
    fn activations(&self, input: &[f32; INPUTS]) -> Vec<Vec<f32>> {
        let mut acts = Vec::with_capacity(LAYERS.len());
        acts.push(input.to_vec());
        for (offset, inputs, outputs) in layers() {
            let prev = &acts[acts.len() - 1];
            let next: Vec<f32> = (0..outputs)
                .map(|o| {
                    let row = &self.params[offset + o * (inputs + 1)..][..inputs + 1];
                    let sum: f32 = row[..inputs].iter().zip(prev).map(|(w, a)| w * a).sum();
                    sigmoid(sum + row[inputs])
                })
                .collect();
            acts.push(next);
        }
        acts
    }

    pub fn forward(&self, input: &[f32; INPUTS]) -> [f32; OUTPUTS] {
        let acts = self.activations(input);
        let mut out = [0.0; OUTPUTS];
        out.copy_from_slice(&acts[acts.len() - 1]);
        out
    }

    /// One gradient-descent step on squared error toward `target`.
    #[cfg(feature = "training")]
    pub(crate) fn backprop(&mut self, input: &[f32; INPUTS], target: &[f32; OUTPUTS], rate: f32) {
        let acts = self.activations(input);
        let spans: Vec<_> = layers().collect();
        let last = &acts[acts.len() - 1];
        let mut delta: Vec<f32> = last
            .iter()
            .zip(target)
            .map(|(a, t)| (a - t) * a * (1.0 - a))
            .collect();

        for (layer, &(offset, inputs, outputs)) in spans.iter().enumerate().rev() {
            let prev = &acts[layer];
            // deltas for the layer below use the weights before this update
            let below: Vec<f32> = (0..inputs)
                .map(|i| {
                    let back: f32 = (0..outputs)
                        .map(|o| self.params[offset + o * (inputs + 1) + i] * delta[o])
                        .sum();
                    back * prev[i] * (1.0 - prev[i])
                })
                .collect();
            for (o, d) in delta.iter().enumerate() {
                let row = offset + o * (inputs + 1);
                for (i, a) in prev.iter().enumerate() {
                    self.params[row + i] -= rate * d * a;
                }
                self.params[row + inputs] -= rate * d;
            }
            delta = below;
        }
    }

    /// Raw little-endian `f32` stream, no header.
    pub fn serialize(&self) -> Vec<u8> {
        self.params.iter().flat_map(|p| p.to_le_bytes()).collect()
    }

    /// Rebuild a network from [`Network::serialize`] output. The byte length
    /// must match the fixed topology exactly.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, NavError> {
        let expected = PARAM_COUNT * 4;
        if bytes.len() != expected {
            return Err(NavError::WeightLength {
                expected,
                actual: bytes.len(),
            });
        }
        let params = bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        Ok(Self { params })
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), NavError> {
        std::fs::write(path.as_ref(), self.serialize())?;
        tracing::info!(path = %path.as_ref().display(), params = PARAM_COUNT, "weights saved");
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, NavError> {
        let bytes = std::fs::read(path.as_ref())?;
        let net = Self::deserialize(&bytes)?;
        tracing::info!(path = %path.as_ref().display(), "weights loaded");
        Ok(net)
    }
}
