// ============================================================
// Layer 5 - Loss Composer
// ============================================================
// Training objective = time-domain error + spectral error.
//
//   magnitude term   mean |ŷ - y|                 (L1 / MAE)
//   spectral term    STFT loss on |STFT(ŷ)| vs |STFT(y)|
//   combined         magnitude + spectral         (no weights)
//
// Both terms see the batch flattened into one long signal of
// shape [1, batch * time], so short windows still produce
// enough STFT frames.
//
// STFT loss (per frame f, bin k, X = prediction, Y = target):
//
//   spectral convergence  ‖Y - X‖_F / ‖Y‖_F
//   log magnitude         mean |log X - log Y|
//   stft loss             sum of the two
//
// The transform itself is a pair of matrix products against
// pre-computed cosine/sine tables:
//
//   frames [F, N] · cos [N, K] = Re      (K = N/2 + 1 bins)
//   frames [F, N] · sin [N, K] = -Im
//
// which keeps the whole loss inside burn's autodiff graph.
// Frames are centred: the signal is reflection-padded by N/2
// on both sides before being cut with hop size H.
//
// Reference: Yamamoto et al. (2020) Parallel WaveGAN, §2.3
//            Steinmetz & Reiss (2020) auraloss

use std::{f64::consts::PI, fmt, str::FromStr};

use burn::prelude::*;
use serde::{Deserialize, Serialize};

/// Which terms make up the objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LossMode {
    /// L1 only
    Magnitude,
    /// STFT only
    Spectral,
    /// L1 + STFT
    #[default]
    Combined,
}

impl FromStr for LossMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "magnitude" | "magnitude-only" | "l1"   => Ok(LossMode::Magnitude),
            "spectral"  | "spectral-only"  | "stft" => Ok(LossMode::Spectral),
            "combined"  | "both"                    => Ok(LossMode::Combined),
            other => Err(format!("unknown loss mode '{other}', expected magnitude, spectral or combined")),
        }
    }
}

impl fmt::Display for LossMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LossMode::Magnitude => "magnitude",
            LossMode::Spectral  => "spectral",
            LossMode::Combined  => "combined",
        })
    }
}

// ─── STFT settings ────────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct StftConfig {
    #[config(default = 1024)]
    pub fft_size: usize,
    #[config(default = 256)]
    pub hop_size: usize,
    #[config(default = 600)]
    pub win_length: usize,
    /// Floor on |X|² before the square root, keeps log() finite
    #[config(default = 1e-8)]
    pub eps: f64,
}

/// Precomputed window and DFT tables for one STFT configuration.
#[derive(Debug, Clone)]
struct StftTables {
    fft_size: usize,
    hop_size: usize,
    bins:     usize,
    eps:      f64,
    window:   Vec<f32>,
    cos:      Vec<f32>,
    sin:      Vec<f32>,
}

impl StftTables {
    fn new(cfg: &StftConfig) -> Self {
        let n    = cfg.fft_size;
        let bins = n / 2 + 1;
        let win  = cfg.win_length.min(n);

        // Periodic Hann of length `win`, centred inside N with zeros either side
        let mut window = vec![0.0f32; n];
        let offset = (n - win) / 2;
        for k in 0..win {
            window[offset + k] = (0.5 - 0.5 * (2.0 * PI * k as f64 / win as f64).cos()) as f32;
        }

        let mut cos = vec![0.0f32; n * bins];
        let mut sin = vec![0.0f32; n * bins];
        for t in 0..n {
            for k in 0..bins {
                let phase = 2.0 * PI * (t * k) as f64 / n as f64;
                cos[t * bins + k] = phase.cos() as f32;
                sin[t * bins + k] = phase.sin() as f32;
            }
        }

        Self { fft_size: n, hop_size: cfg.hop_size.max(1), bins, eps: cfg.eps, window, cos, sin }
    }

    /// Sample positions (into the unpadded signal) for every frame,
    /// laid out frame after frame.
    fn frame_indices(&self, len: usize) -> (usize, Vec<i32>) {
        let pad    = self.fft_size / 2;
        let frames = 1 + len / self.hop_size;

        let mut idx = Vec::with_capacity(frames * self.fft_size);
        for f in 0..frames {
            for k in 0..self.fft_size {
                let p = (f * self.hop_size + k) as isize - pad as isize;
                idx.push(reflect(p, len) as i32);
            }
        }
        (frames, idx)
    }

    /// Upload the window, DFT tables and frame gather indices for signals of `len` samples.
    fn upload<B: Backend>(&self, len: usize, device: &B::Device) -> StftBasis<B> {
        let n = self.fft_size;
        let (frames, idx) = self.frame_indices(len);

        StftBasis {
            frames,
            fft_size: n,
            eps:      self.eps,
            idx:      Tensor::<B, 1, Int>::from_ints(idx.as_slice(), device),
            window:   Tensor::<B, 1>::from_floats(self.window.as_slice(), device).reshape([1, n]),
            cos:      Tensor::<B, 1>::from_floats(self.cos.as_slice(), device).reshape([n, self.bins]),
            sin:      Tensor::<B, 1>::from_floats(self.sin.as_slice(), device).reshape([n, self.bins]),
        }
    }
}

/// `StftTables` on a device, sized for one signal length.
/// Built once per loss evaluation and shared by prediction and target.
struct StftBasis<B: Backend> {
    frames:   usize,
    fft_size: usize,
    eps:      f64,
    idx:      Tensor<B, 1, Int>,
    window:   Tensor<B, 2>,
    cos:      Tensor<B, 2>,
    sin:      Tensor<B, 2>,
}

impl<B: Backend> StftBasis<B> {
    /// signal: [len] → magnitude spectrogram [frames, bins]
    fn magnitude(&self, signal: Tensor<B, 1>) -> Tensor<B, 2> {
        let framed = signal
            .select(0, self.idx.clone())
            .reshape([self.frames, self.fft_size])
            * self.window.clone();

        let re = framed.clone().matmul(self.cos.clone());
        let im = framed.matmul(self.sin.clone());
        (re.clone() * re + im.clone() * im).clamp_min(self.eps).sqrt()
    }
}

/// Mirror an out-of-range position back into [0, len), without repeating the edge sample.
fn reflect(p: isize, len: usize) -> usize {
    if len <= 1 {
        return 0;
    }
    let period = 2 * (len as isize - 1);
    let m = p.rem_euclid(period);
    if m < len as isize { m as usize } else { (period - m) as usize }
}

// ─── LossComposer ─────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct LossComposer {
    mode: LossMode,
    stft: StftTables,
}

/// The three loss values for one (prediction, target) pair
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LossBreakdown {
    pub magnitude: f64,
    pub spectral:  f64,
    pub combined:  f64,
}

impl LossComposer {
    pub fn new(mode: LossMode) -> Self {
        Self::with_stft(mode, &StftConfig::new())
    }

    pub fn with_stft(mode: LossMode, stft: &StftConfig) -> Self {
        Self { mode, stft: StftTables::new(stft) }
    }

    /// Objective for the configured mode.
    pub fn forward<B: Backend>(&self, output: Tensor<B, 3>, target: Tensor<B, 3>) -> Tensor<B, 1> {
        self.forward_mode(output, target, self.mode)
    }

    /// Objective for an explicit mode, independent of the configured one.
    pub fn forward_mode<B: Backend>(
        &self,
        output: Tensor<B, 3>,
        target: Tensor<B, 3>,
        mode:   LossMode,
    ) -> Tensor<B, 1> {
        let output = flatten(output);
        let target = flatten(target);

        match mode {
            LossMode::Magnitude => magnitude_loss(output, target),
            LossMode::Spectral  => self.spectral_loss(output, target),
            LossMode::Combined  => {
                magnitude_loss(output.clone(), target.clone()) + self.spectral_loss(output, target)
            }
        }
    }

    /// All three values as plain numbers, for reporting.
    pub fn breakdown<B: Backend>(&self, output: Tensor<B, 3>, target: Tensor<B, 3>) -> LossBreakdown {
        let output = flatten(output);
        let target = flatten(target);

        let magnitude: f64 = magnitude_loss(output.clone(), target.clone()).into_scalar().elem();
        let spectral:  f64 = self.spectral_loss(output, target).into_scalar().elem();
        LossBreakdown { magnitude, spectral, combined: magnitude + spectral }
    }

    /// STFT loss on two [1, n] signals
    pub fn spectral_loss<B: Backend>(&self, output: Tensor<B, 2>, target: Tensor<B, 2>) -> Tensor<B, 1> {
        let [_, n] = output.dims();
        let basis  = self.stft.upload::<B>(n, &output.device());
        let x_mag  = basis.magnitude(output.reshape([n]));
        let y_mag  = basis.magnitude(target.reshape([n]));

        let diff = y_mag.clone() - x_mag.clone();
        let sc   = (diff.clone() * diff).sum().sqrt() / (y_mag.clone() * y_mag.clone()).sum().sqrt();
        let log_mag = (x_mag.log() - y_mag.log()).abs().mean();

        sc + log_mag
    }
}

/// Mean absolute error on two [1, n] signals
pub fn magnitude_loss<B: Backend>(output: Tensor<B, 2>, target: Tensor<B, 2>) -> Tensor<B, 1> {
    (output - target).abs().mean()
}

/// [batch, time, 1] → [1, batch * time]
fn flatten<B: Backend>(x: Tensor<B, 3>) -> Tensor<B, 2> {
    let [b, t, c] = x.dims();
    x.reshape([1, b * t * c])
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    type TestBackend = burn::backend::NdArray;

    fn signal(values: Vec<f32>, batch: usize) -> Tensor<TestBackend, 3> {
        let time = values.len() / batch;
        Tensor::from_data(TensorData::new(values, [batch, time, 1]), &Default::default())
    }

    fn sine(len: usize, freq: f32, amp: f32) -> Vec<f32> {
        (0..len)
            .map(|t| amp * (2.0 * std::f32::consts::PI * freq * t as f32 / 48_000.0).sin())
            .collect()
    }

    fn scalar(t: Tensor<TestBackend, 1>) -> f64 {
        t.into_scalar().elem()
    }

    #[test]
    fn test_magnitude_loss_is_mean_absolute_error() {
        let composer = LossComposer::new(LossMode::Magnitude);
        let out = signal(vec![0.0, 0.5, -0.5, 1.0], 2);
        let tgt = signal(vec![0.1, 0.5, -0.1, 0.0], 2);
        // |−0.1| + 0 + |−0.4| + 1.0 = 1.5 → / 4
        assert!((scalar(composer.forward(out, tgt)) - 0.375).abs() < 1e-6);
    }

    #[test]
    fn test_identical_signals_have_zero_loss() {
        let composer = LossComposer::new(LossMode::Combined);
        let x = sine(2048, 440.0, 0.5);
        let loss = scalar(composer.forward(signal(x.clone(), 2), signal(x, 2)));
        assert!(loss.abs() < 1e-5, "loss = {loss}");
    }

    #[test]
    fn test_combined_is_sum_of_terms() {
        let composer = LossComposer::new(LossMode::Combined);
        let out = sine(1024, 440.0, 0.4);
        let tgt: Vec<f32> = sine(1024, 660.0, 0.7).iter().map(|v| v.tanh()).collect();

        let mag  = scalar(composer.forward_mode(signal(out.clone(), 2), signal(tgt.clone(), 2), LossMode::Magnitude));
        let spec = scalar(composer.forward_mode(signal(out.clone(), 2), signal(tgt.clone(), 2), LossMode::Spectral));
        let comb = scalar(composer.forward(signal(out.clone(), 2), signal(tgt.clone(), 2)));

        assert!((comb - (mag + spec)).abs() < 1e-4, "{comb} vs {mag} + {spec}");

        let b = composer.breakdown(signal(out, 2), signal(tgt, 2));
        assert!((b.magnitude - mag).abs() < 1e-6);
        assert!((b.spectral - spec).abs() < 1e-4);
        assert!((b.combined - comb).abs() < 1e-4);
    }

    #[test]
    fn test_spectral_loss_sees_frequency_not_just_level() {
        let composer = LossComposer::new(LossMode::Spectral);
        let tgt = sine(2048, 440.0, 0.5);

        let same_pitch  = sine(2048, 440.0, 0.45);
        let other_pitch = sine(2048, 3000.0, 0.5);

        let near = scalar(composer.forward(signal(same_pitch, 1), signal(tgt.clone(), 1)));
        let far  = scalar(composer.forward(signal(other_pitch, 1), signal(tgt, 1)));
        assert!(near < far, "near={near} far={far}");
    }

    #[test]
    fn test_short_signal_still_produces_frames() {
        // Shorter than one FFT: reflection padding must wrap more than once
        let composer = LossComposer::with_stft(LossMode::Spectral, &StftConfig::new());
        let out = sine(100, 1000.0, 0.3);
        let tgt = sine(100, 1000.0, 0.6);
        let loss = scalar(composer.forward(signal(out, 1), signal(tgt, 1)));
        assert!(loss.is_finite() && loss > 0.0);
    }

    #[test]
    fn test_reflect_indices() {
        assert_eq!(reflect(-1, 5), 1);
        assert_eq!(reflect(-2, 5), 2);
        assert_eq!(reflect(5, 5),  3);
        assert_eq!(reflect(9, 5),  1);
        assert_eq!(reflect(3, 1),  0);
    }

    #[test]
    fn test_frame_count_matches_centred_stft() {
        let tables = StftTables::new(&StftConfig::new());
        let (frames, idx) = tables.frame_indices(2048);
        assert_eq!(frames, 1 + 2048 / 256);
        assert_eq!(idx.len(), frames * 1024);
        // First frame is centred on sample 0: position 512 maps to sample 0
        assert_eq!(idx[512], 0);
    }

    #[test]
    fn test_shared_basis_matches_fresh_upload() {
        let tables = StftTables::new(&StftConfig::new());
        let device = Default::default();
        let a = Tensor::<TestBackend, 1>::from_floats(sine(2048, 440.0, 0.5).as_slice(), &device);
        let b = Tensor::<TestBackend, 1>::from_floats(sine(2048, 3000.0, 0.2).as_slice(), &device);

        let shared = tables.upload::<TestBackend>(2048, &device);
        let a_shared = shared.magnitude(a.clone());
        let b_shared = shared.magnitude(b.clone());
        let b_fresh  = tables.upload::<TestBackend>(2048, &device).magnitude(b);

        assert_eq!(a_shared.dims(), [1 + 2048 / 256, 513]);
        b_shared.into_data().assert_approx_eq(&b_fresh.into_data(), 5);
    }

    #[test]
    fn test_tone_peaks_in_its_bin() {
        let tables = StftTables::new(&StftConfig::new());
        let device = Default::default();
        // 48 kHz / 1024 = 46.875 Hz per bin, so bin 20 sits at 937.5 Hz
        let tone = Tensor::<TestBackend, 1>::from_floats(sine(4096, 937.5, 0.5).as_slice(), &device);

        let mag  = tables.upload::<TestBackend>(4096, &device).magnitude(tone);
        let mid  = mag.slice([8..9, 0..513]).reshape([513]);
        let peak: i64 = mid.argmax(0).into_scalar().elem();
        assert_eq!(peak, 20);
    }

    #[test]
    fn test_loss_mode_names() {
        assert_eq!("l1".parse::<LossMode>().unwrap(),   LossMode::Magnitude);
        assert_eq!("stft".parse::<LossMode>().unwrap(), LossMode::Spectral);
        assert_eq!("both".parse::<LossMode>().unwrap(), LossMode::Combined);
        assert_eq!("spectral-only".parse::<LossMode>().unwrap(), LossMode::Spectral);
        assert!("l2".parse::<LossMode>().is_err());
    }
}
