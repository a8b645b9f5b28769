// ============================================================
// Layer 4 - Windowed Audio Dataset
// ============================================================
// A dataset is one directory of pre-cut training windows:
//
//   train/
//     input0.wav   target0.wav
//     input1.wav   target1.wav
//     ...
//     input{N-1}.wav target{N-1}.wav
//
// The length N is the highest index found on a target{N}.wav
// file, plus one. Files are NOT opened at construction; each
// get_item(idx) reads its two files on demand, so huge
// datasets cost nothing until they are iterated.
//
// Train and validation are two separate AudioDataset values,
// each rooted at its own directory. They share nothing.
//
// Burn integration:
//   Burn's Dataset::get returns Option, which would hide a
//   missing file as an early end-of-epoch. Instead each item
//   is a Result, so a read failure rides through the batcher
//   and surfaces in the training loop as a real error.
//
// Reference: Burn Book §4 (Datasets)

use std::{fs, path::PathBuf};

use burn::data::dataset::Dataset;

use crate::data::loader::read_mono_wav;
use crate::domain::{
    error::{EngineError, EngineResult},
    sample::SamplePair,
};

/// One dataset item as seen by the data loader
pub type SampleResult = EngineResult<SamplePair>;

#[derive(Debug, Clone)]
pub struct AudioDataset {
    root: PathBuf,
    len:  usize,
}

impl AudioDataset {
    /// Index a directory of `input{i}.wav` / `target{i}.wav` pairs.
    pub fn new(root: impl Into<PathBuf>) -> EngineResult<Self> {
        let root = root.into();

        let entries = fs::read_dir(&root).map_err(|e| EngineError::io(&root, e))?;

        let mut highest: Option<usize> = None;
        for entry in entries {
            let entry = entry.map_err(|e| EngineError::io(&root, e))?;
            let name  = entry.file_name();
            if let Some(idx) = name.to_str().and_then(parse_target_index) {
                highest = Some(highest.map_or(idx, |h| h.max(idx)));
            }
        }

        let len = highest
            .map(|h| h + 1)
            .ok_or_else(|| EngineError::EmptyDataset { dir: root.clone() })?;

        tracing::info!("Indexed {} sample pairs in '{}'", len, root.display());
        Ok(Self { root, len })
    }

    pub fn sample_count(&self) -> usize {
        self.len
    }

    pub fn input_path(&self, idx: usize) -> PathBuf {
        self.root.join(format!("input{idx}.wav"))
    }

    pub fn target_path(&self, idx: usize) -> PathBuf {
        self.root.join(format!("target{idx}.wav"))
    }

    /// Read the input/target pair stored under `idx`.
    pub fn get_item(&self, idx: usize) -> SampleResult {
        if idx >= self.len {
            return Err(EngineError::DatasetIndex { index: idx, len: self.len });
        }

        let input  = read_mono_wav(&self.input_path(idx))?;
        let target = read_mono_wav(&self.target_path(idx))?;
        SamplePair::new(input, target).map_err(|e| match e {
            EngineError::Shape(msg) => EngineError::Shape(format!("pair {idx}: {msg}")),
            other => other,
        })
    }
}

impl Dataset<SampleResult> for AudioDataset {
    fn get(&self, index: usize) -> Option<SampleResult> {
        (index < self.len).then(|| self.get_item(index))
    }

    fn len(&self) -> usize {
        self.len
    }
}

/// "target17.wav" → Some(17); anything else → None
fn parse_target_index(name: &str) -> Option<usize> {
    name.strip_prefix("target")?
        .strip_suffix(".wav")?
        .parse()
        .ok()
}
