// ============================================================
// Layer 2 - Application / Use Cases
// ============================================================
// This layer wires the other layers together for one goal at a
// time: train a model, render audio through it, or score it.
//
// Rules for this layer:
//   - No tensor math or model code here
//   - No argument parsing or printing here (that's Layer 1)
//   - Only workflow coordination
//
// Each use case hands its backend-specific part to
// infra::device::with_backend as a BackendTask.
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// The training workflow
pub mod train_use_case;

// Render a WAV file through a checkpoint
pub mod predict_use_case;

// Loss breakdown of a checkpoint on a dataset
pub mod evaluate_use_case;
