// ============================================================
// Layer 4 - Data Pipeline
// ============================================================
// Everything from WAV files on disk to tensor batches.
//
//   input{N}.wav / target{N}.wav
//       │
//       ▼
//   loader         → hound decode, normalise to [-1, 1]
//       │
//       ▼
//   AudioDataset   → Burn Dataset, one item per index
//       │
//       ▼
//   AudioBatcher   → [batch, time, 1] input/target tensors
//       │
//       ▼
//   DataLoader     → shuffling + worker threads (burn)
//
// Every stored file pair already is one training window;
// nothing here slices or overlaps audio.
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// WAV reading and writing, downmix and resampling
pub mod loader;

/// Implements Burn's Dataset trait for indexed WAV pairs
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;
