// ============================================================
// Layer 5 - Recurrent Amp Model
// ============================================================
// A stack of recurrent layers followed by a linear read-out
// and a tanh, mapping a dry waveform to a processed one:
//
//   x [batch, time, 1]
//     │  swap to time-major
//     ▼
//   [time, batch, 1] ─► layer 0 ─► ... ─► layer L-1 ─► [time, batch, H]
//     │
//     ▼  Linear(H → 1), tanh       keeps output inside [-1, 1]
//   y [batch, time, 1]
//
// Each layer unrolls its cell over time with a zero initial
// state, so forward() is stateless across calls.
//
// Cell equations (σ = sigmoid, ⊙ = element-wise product):
//
//   rnn:  h' = tanh(Wx + Uh)
//
//   gru:  r  = σ(Wr x + Ur h)
//         z  = σ(Wz x + Uz h)
//         n  = tanh(Wn x + r ⊙ (Un h))
//         h' = (1 - z) ⊙ n + z ⊙ h
//
//   lstm: i, f, o = σ(W· x + U· h),  g = tanh(Wg x + Ug h)
//         c' = f ⊙ c + i ⊙ g
//         h' = o ⊙ tanh(c')
//
// Every layer owns two Linear projections, one for the input
// and one for the previous hidden state, each producing all
// gate pre-activations at once (gates × H columns). The input
// projection is applied to the whole sequence in one call,
// only the hidden projection runs inside the time loop.
//
// Reference: Burn Book §3 (Building Blocks)
//            Elman (1990), Cho et al. (2014), Hochreiter & Schmidhuber (1997)

use burn::{
    module::Ignored,
    nn::{Initializer, Linear, LinearConfig},
    prelude::*,
    tensor::activation::{sigmoid, tanh},
};

use crate::domain::model_type::{CellKind, ModelType};

#[derive(Config, Debug)]
pub struct AmpModelConfig {
    pub model_type: ModelType,
}

impl AmpModelConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> AmpModel<B> {
        let t = self.model_type;

        let layers = (0..t.num_layers)
            .map(|i| {
                let d_input = if i == 0 { 1 } else { t.hidden_size };
                RecurrentLayer::new(t.cell, d_input, t.hidden_size, device)
            })
            .collect();

        let output = LinearConfig::new(t.hidden_size, 1).init(device);

        AmpModel { layers, output }
    }
}

// ─── RecurrentLayer ───────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct RecurrentLayer<B: Backend> {
    pub input_proj:  Linear<B>,
    pub hidden_proj: Linear<B>,
    /// Not part of the record; rebuilt from the checkpoint header
    pub cell:        Ignored<CellKind>,
    pub hidden_size: usize,
}

impl<B: Backend> RecurrentLayer<B> {
    fn new(cell: CellKind, d_input: usize, hidden_size: usize, device: &B::Device) -> Self {
        let gates = cell.gate_count();

        // Same range as the classic recurrent initialisation: U(-1/√H, 1/√H)
        let k = 1.0 / (hidden_size as f64).sqrt();
        let init = Initializer::Uniform { min: -k, max: k };

        let input_proj = LinearConfig::new(d_input, gates * hidden_size)
            .with_initializer(init.clone())
            .init(device);
        let hidden_proj = LinearConfig::new(hidden_size, gates * hidden_size)
            .with_initializer(init)
            .init(device);

        Self { input_proj, hidden_proj, cell: Ignored(cell), hidden_size }
    }

    pub fn cell(&self) -> CellKind {
        *self.cell
    }

    /// x: [time, batch, d_input] → [time, batch, hidden]
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let [seq_len, batch, _] = x.dims();
        let device = x.device();
        let h_size = self.hidden_size;
        let cell   = self.cell();
        let width  = cell.gate_count() * h_size;

        if seq_len == 0 {
            return Tensor::zeros([0, batch, h_size], &device);
        }

        let x_gates = self.input_proj.forward(x);

        let mut h = Tensor::<B, 2>::zeros([batch, h_size], &device);
        let mut c = Tensor::<B, 2>::zeros([batch, h_size], &device);
        let mut outputs = Vec::with_capacity(seq_len);

        for t in 0..seq_len {
            let xg = x_gates.clone().narrow(0, t, 1).reshape([batch, width]);
            let hg = self.hidden_proj.forward(h.clone());

            match cell {
                CellKind::Rnn => {
                    h = tanh(xg + hg);
                }
                CellKind::Gru => {
                    let [xr, xz, xn] = split3(xg, h_size);
                    let [hr, hz, hn] = split3(hg, h_size);
                    let r = sigmoid(xr + hr);
                    let z = sigmoid(xz + hz);
                    let n = tanh(xn + r * hn);
                    // (1 - z)·n + z·h  ==  n + z·(h - n)
                    h = n.clone() + z * (h - n);
                }
                CellKind::Lstm => {
                    let [xi, xf, xg_, xo] = split4(xg, h_size);
                    let [hi, hf, hg_, ho] = split4(hg, h_size);
                    let i = sigmoid(xi + hi);
                    let f = sigmoid(xf + hf);
                    let g = tanh(xg_ + hg_);
                    let o = sigmoid(xo + ho);
                    c = f * c + i * g;
                    h = o * tanh(c.clone());
                }
            }

            outputs.push(h.clone());
        }

        Tensor::stack(outputs, 0)
    }
}

fn split3<B: Backend>(t: Tensor<B, 2>, h: usize) -> [Tensor<B, 2>; 3] {
    [t.clone().narrow(1, 0, h), t.clone().narrow(1, h, h), t.narrow(1, 2 * h, h)]
}

fn split4<B: Backend>(t: Tensor<B, 2>, h: usize) -> [Tensor<B, 2>; 4] {
    [
        t.clone().narrow(1, 0, h),
        t.clone().narrow(1, h, h),
        t.clone().narrow(1, 2 * h, h),
        t.narrow(1, 3 * h, h),
    ]
}

// ─── AmpModel ─────────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct AmpModel<B: Backend> {
    pub layers: Vec<RecurrentLayer<B>>,
    pub output: Linear<B>,
}

impl<B: Backend> AmpModel<B> {
    /// x: [batch, time, 1] → [batch, time, 1], values in [-1, 1]
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let mut h = x.swap_dims(0, 1);
        for layer in &self.layers {
            h = layer.forward(h);
        }
        tanh(self.output.forward(h)).swap_dims(0, 1)
    }

    /// Recover the descriptor this model was built from.
    pub fn model_type(&self) -> ModelType {
        let first = &self.layers[0];
        ModelType::new(first.cell(), first.hidden_size, self.layers.len())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};

    type TestBackend = NdArray;

    fn build(descriptor: &str) -> AmpModel<TestBackend> {
        AmpModelConfig::new(descriptor.parse().unwrap()).init(&Default::default())
    }

    fn ramp(batch: usize, time: usize) -> Tensor<TestBackend, 3> {
        let values: Vec<f32> = (0..batch * time).map(|i| ((i as f32) * 0.37).sin()).collect();
        Tensor::from_data(TensorData::new(values, [batch, time, 1]), &Default::default())
    }

    #[test]
    fn test_output_shape_matches_input_for_every_cell() {
        for descriptor in ["rnn-8-1", "gru-4-2", "lstm-6-3"] {
            let model = build(descriptor);
            let y = model.forward(ramp(3, 20));
            assert_eq!(y.dims(), [3, 20, 1], "{descriptor}");
        }
    }

    #[test]
    fn test_output_is_bounded() {
        let model = build("lstm-8-1");
        let loud  = ramp(2, 50).mul_scalar(50.0);
        let y: Vec<f32> = model.forward(loud).into_data().to_vec().unwrap();
        assert!(y.iter().all(|v| (-1.0..=1.0).contains(v)));
    }

    #[test]
    fn test_forward_is_stateless() {
        let model = build("gru-8-2");
        let a: Vec<f32> = model.forward(ramp(1, 30)).into_data().to_vec().unwrap();
        let b: Vec<f32> = model.forward(ramp(1, 30)).into_data().to_vec().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_model_is_causal() {
        // Changing a late sample must not affect earlier outputs
        let model = build("rnn-4-2");
        let x = ramp(1, 10);
        let mut values: Vec<f32> = x.clone().into_data().to_vec().unwrap();
        values[9] += 1.0;
        let x2 = Tensor::<TestBackend, 3>::from_data(TensorData::new(values, [1, 10, 1]), &Default::default());

        let a: Vec<f32> = model.forward(x).into_data().to_vec().unwrap();
        let b: Vec<f32> = model.forward(x2).into_data().to_vec().unwrap();
        assert_eq!(a[..9], b[..9]);
        assert_ne!(a[9], b[9]);
    }

    #[test]
    fn test_model_type_is_recoverable() {
        for descriptor in ["rnn-2-4", "gru-16-1", "lstm-4-2"] {
            assert_eq!(build(descriptor).model_type().to_string(), descriptor);
        }
    }

    #[test]
    fn test_parameter_count() {
        // lstm-4-1: input 1→16 (+16 bias), hidden 4→16 (+16 bias), output 4→1 (+1)
        let model = build("lstm-4-1");
        assert_eq!(model.num_params(), 16 + 16 + 64 + 16 + 4 + 1);
    }

    #[test]
    fn test_gradients_reach_first_layer() {
        type B = Autodiff<NdArray>;
        let model: AmpModel<B> = AmpModelConfig::new("gru-4-2".parse().unwrap()).init(&Default::default());
        let x = Tensor::<B, 3>::from_data(TensorData::new(vec![0.3f32; 8], [1, 8, 1]), &Default::default());

        let loss  = model.forward(x).abs().mean();
        let grads = loss.backward();
        let w_grad = model.layers[0].input_proj.weight.grad(&grads);
        assert!(w_grad.is_some());
    }
}
