// ============================================================
// Layer 6 - Infrastructure Layer
// ============================================================
// Cross-cutting concerns used by several layers:
//
//   checkpoint.rs - one-file model save/load, atomic overwrite,
//                   plus JSON config snapshots
//
//   metrics.rs    - per-run CSV scalar stream
//                   (train_loss, val_loss, learning_rate)
//
//   device.rs     - turns a ComputeDevice into a concrete
//                   burn backend and runs work on it
//
// Reference: Rust Book §7 (Modules)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Training metrics CSV logger
pub mod metrics;

/// Backend selection
pub mod device;
