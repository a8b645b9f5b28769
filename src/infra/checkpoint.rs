// ============================================================
// Layer 6 - Checkpoint Store
// ============================================================
// Saves and restores a complete model (architecture + weights)
// as ONE file:
//
//   ┌──────────────────────────────┐
//   │ lstm-32-1\n                  │  model type header (UTF-8)
//   ├──────────────────────────────┤
//   │ burn record bytes            │  named MessagePack,
//   │ ...                          │  full f32 precision
//   └──────────────────────────────┘
//
// Why a header?
//   Burn records hold weights only. To load a model we first
//   have to build one with the right shape, so the descriptor
//   travels in front of the weights.
//
// Why full precision?
//   A reloaded model must reproduce the saved model's output
//   exactly; half precision would not.
//
// Loading checks the weights against the header: every
// parameter must have exactly the shape the header's model
// would have, otherwise the file is rejected.
//
// Writes are atomic: bytes go to "<file>.tmp" next to the
// destination, are synced, then renamed over it. A crash mid-
// write leaves the previous checkpoint untouched.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use burn::{
    module::{ModuleVisitor, ParamId},
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkBytesRecorder, Recorder},
};
use serde::Serialize;

use crate::domain::{
    error::{EngineError, EngineResult},
    model_type::ModelType,
};
use crate::ml::model::{AmpModel, AmpModelConfig};

/// Default name of the per-epoch autosave
pub const AUTOSAVE_FILE: &str = "autosave.ckpt";

#[derive(Debug, Default, Clone)]
pub struct CheckpointStore {
    recorder: NamedMpkBytesRecorder<FullPrecisionSettings>,
}

impl CheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write `model` to `path`, replacing any previous file atomically.
    pub fn save<B: Backend>(&self, model: &AmpModel<B>, path: &Path) -> EngineResult<()> {
        let weights = Recorder::<B>::record(&self.recorder, model.clone().into_record(), ())
            .map_err(|e| EngineError::checkpoint(path, e))?;

        let mut contents = format!("{}\n", model.model_type()).into_bytes();
        contents.extend_from_slice(&weights);

        write_atomic(path, &contents)?;
        tracing::debug!("Saved checkpoint '{}' ({} bytes)", path.display(), contents.len());
        Ok(())
    }

    /// Rebuild the model stored at `path` on `device`.
    pub fn load<B: Backend>(&self, path: &Path, device: &B::Device) -> EngineResult<AmpModel<B>> {
        let contents = fs::read(path).map_err(|e| EngineError::io(path, e))?;

        let split = contents
            .iter()
            .position(|&b| b == b'\n')
            .ok_or_else(|| EngineError::checkpoint(path, "missing model type header"))?;

        let header = std::str::from_utf8(&contents[..split])
            .map_err(|e| EngineError::checkpoint(path, e))?;
        let model_type: ModelType = header.parse()?;

        let payload = contents[split + 1..].to_vec();
        let record: <AmpModel<B> as Module<B>>::Record =
            Recorder::<B>::load(&self.recorder, payload, device)
                .map_err(|e| EngineError::checkpoint(path, e))?;

        if record.layers.len() != model_type.num_layers {
            return Err(EngineError::checkpoint(path, format!(
                "header says {model_type} but the weights hold {} layers",
                record.layers.len()
            )));
        }

        let fresh    = AmpModelConfig::new(model_type).init::<B>(device);
        let expected = param_shapes(&fresh);
        let model    = fresh.load_record(record);
        if param_shapes(&model) != expected {
            return Err(EngineError::checkpoint(path, format!(
                "weight shapes do not match a {model_type} model"
            )));
        }

        tracing::info!("Loaded {} model from '{}'", model_type, path.display());
        Ok(model)
    }

    /// Write any serialisable config next to a run, as pretty JSON.
    pub fn save_config<T: Serialize>(&self, config: &T, path: &Path) -> EngineResult<()> {
        let json = serde_json::to_string_pretty(config)
            .map_err(|e| EngineError::Config(e.to_string()))?;
        write_atomic(path, json.as_bytes())?;
        tracing::debug!("Saved config to '{}'", path.display());
        Ok(())
    }
}

/// Shapes of every float parameter, in visiting order.
fn param_shapes<B: Backend>(model: &AmpModel<B>) -> Vec<Vec<usize>> {
    struct Shapes(Vec<Vec<usize>>);

    impl<B: Backend> ModuleVisitor<B> for Shapes {
        fn visit_float<const D: usize>(&mut self, _id: ParamId, tensor: &Tensor<B, D>) {
            self.0.push(tensor.dims().to_vec());
        }
    }

    let mut shapes = Shapes(Vec::new());
    model.visit(&mut shapes);
    shapes.0
}

fn write_atomic(path: &Path, contents: &[u8]) -> EngineResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| EngineError::io(parent, e))?;
    }

    let tmp = tmp_path(path);
    let result = (|| -> std::io::Result<()> {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(contents)?;
        file.sync_all()?;
        fs::rename(&tmp, path)
    })();

    if let Err(e) = result {
        let _ = fs::remove_file(&tmp);
        return Err(EngineError::io(path, e));
    }
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};
    use burn::module::AutodiffModule;

    type TestBackend = NdArray;

    fn fixed_input() -> Tensor<TestBackend, 3> {
        let values: Vec<f32> = (0..64).map(|i| (i as f32 * 0.21).sin() * 0.8).collect();
        Tensor::from_data(TensorData::new(values, [2, 32, 1]), &Default::default())
    }

    #[test]
    fn test_round_trip_reproduces_output() {
        let dir   = tempfile::tempdir().unwrap();
        let path  = dir.path().join("model.ckpt");
        let store = CheckpointStore::new();

        for descriptor in ["rnn-4-2", "gru-8-1", "lstm-4-3"] {
            let model: AmpModel<TestBackend> =
                AmpModelConfig::new(descriptor.parse().unwrap()).init(&Default::default());
            let before: Vec<f32> = model.forward(fixed_input()).into_data().to_vec().unwrap();

            store.save(&model, &path).unwrap();
            let loaded: AmpModel<TestBackend> = store.load(&path, &Default::default()).unwrap();
            let after: Vec<f32> = loaded.forward(fixed_input()).into_data().to_vec().unwrap();

            assert_eq!(loaded.model_type().to_string(), descriptor);
            for (a, b) in before.iter().zip(&after) {
                assert!((a - b).abs() <= 1e-6, "{descriptor}: {a} vs {b}");
            }
        }
    }

    #[test]
    fn test_training_model_loads_for_inference() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("autosave.ckpt");
        let store = CheckpointStore::new();

        let model: AmpModel<Autodiff<NdArray>> =
            AmpModelConfig::new("gru-4-1".parse().unwrap()).init(&Default::default());
        let expected: Vec<f32> = model.valid().forward(fixed_input()).into_data().to_vec().unwrap();

        store.save(&model, &path).unwrap();
        let loaded: AmpModel<TestBackend> = store.load(&path, &Default::default()).unwrap();
        let actual: Vec<f32> = loaded.forward(fixed_input()).into_data().to_vec().unwrap();
        assert_eq!(expected, actual);
    }

    #[test]
    fn test_save_overwrites_and_leaves_no_temp_file() {
        let dir   = tempfile::tempdir().unwrap();
        let path  = dir.path().join("autosave.ckpt");
        let store = CheckpointStore::new();

        let a: AmpModel<TestBackend> = AmpModelConfig::new("rnn-2-1".parse().unwrap()).init(&Default::default());
        let b: AmpModel<TestBackend> = AmpModelConfig::new("lstm-8-2".parse().unwrap()).init(&Default::default());
        store.save(&a, &path).unwrap();
        store.save(&b, &path).unwrap();

        let loaded: AmpModel<TestBackend> = store.load(&path, &Default::default()).unwrap();
        assert_eq!(loaded.model_type().to_string(), "lstm-8-2");
        assert!(!tmp_path(&path).exists());
    }

    #[test]
    fn test_missing_checkpoint_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = CheckpointStore::new()
            .load::<TestBackend>(&dir.path().join("none.ckpt"), &Default::default())
            .unwrap_err();
        assert!(matches!(err, EngineError::Io { .. }));
    }

    #[test]
    fn test_corrupt_checkpoint_is_rejected() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.ckpt");

        fs::write(&path, b"no header here").unwrap();
        let err = CheckpointStore::new().load::<TestBackend>(&path, &Default::default()).unwrap_err();
        assert!(matches!(err, EngineError::Checkpoint { .. }));

        fs::write(&path, b"lstm-8-1\n\x00\x01garbage").unwrap();
        let err = CheckpointStore::new().load::<TestBackend>(&path, &Default::default()).unwrap_err();
        assert!(matches!(err, EngineError::Checkpoint { .. }));
    }

    #[test]
    fn test_truncated_checkpoint_is_rejected() {
        let dir   = tempfile::tempdir().unwrap();
        let path  = dir.path().join("cut.ckpt");
        let store = CheckpointStore::new();

        let model: AmpModel<TestBackend> = AmpModelConfig::new("lstm-8-1".parse().unwrap()).init(&Default::default());
        store.save(&model, &path).unwrap();

        let bytes = fs::read(&path).unwrap();
        fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();

        let err = store.load::<TestBackend>(&path, &Default::default()).unwrap_err();
        assert!(matches!(err, EngineError::Checkpoint { .. }));
    }

    /// Replace the header line of the checkpoint at `path`.
    fn swap_header(path: &Path, header: &str) {
        let bytes = fs::read(path).unwrap();
        let split = bytes.iter().position(|&b| b == b'\n').unwrap();
        let mut out = format!("{header}\n").into_bytes();
        out.extend_from_slice(&bytes[split + 1..]);
        fs::write(path, out).unwrap();
    }

    #[test]
    fn test_header_that_disagrees_with_weights_is_rejected() {
        let dir   = tempfile::tempdir().unwrap();
        let path  = dir.path().join("mixed.ckpt");
        let store = CheckpointStore::new();

        let lstm: AmpModel<TestBackend> = AmpModelConfig::new("lstm-4-1".parse().unwrap()).init(&Default::default());
        store.save(&lstm, &path).unwrap();

        for header in ["gru-4-1", "lstm-8-1", "lstm-4-2"] {
            swap_header(&path, header);
            let err = store.load::<TestBackend>(&path, &Default::default()).unwrap_err();
            assert!(matches!(err, EngineError::Checkpoint { .. }), "{header}");
        }
    }
}
