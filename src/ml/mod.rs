// ============================================================
// Layer 5 - ML / Model Layer (Burn)
// ============================================================
// All tensor math lives here.
//
//   model.rs      - recurrent amp model: stacked rnn, gru or
//                   lstm layers, then Linear → tanh
//
//   loss.rs       - L1 on samples plus multi-term STFT loss
//
//   scheduler.rs  - reduce-on-plateau learning rate
//
//   grad_clip.rs  - global gradient norm clipping
//
//   trainer.rs    - the training state machine and epoch loop
//
//   inferencer.rs - one-shot prediction over a whole waveform
//
// Reference: Burn Book §3 (Building Blocks), §5 (Training)
//            Hochreiter & Schmidhuber (1997) LSTM
//            Cho et al. (2014) GRU

/// Recurrent amp model architecture
pub mod model;

/// Magnitude and spectral losses
pub mod loss;

/// Plateau learning-rate controller
pub mod scheduler;

/// Gradient norm clipping across all parameters
pub mod grad_clip;

/// Training loop with validation and per-epoch autosave
pub mod trainer;

/// Inference over arbitrary-length audio
pub mod inferencer;
