// ============================================================
// Layer 3 - Domain Layer
// ============================================================
// Plain Rust types that name the core concepts of the system.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only structs, enums, and small pure functions
//
// Everything here is testable without a tensor backend.
//
// Reference: Rust Book §5 (Structs), §6 (Enums), §9 (Errors)

// Typed failures shared by every engine layer
pub mod error;

// "<cell>-<hidden>-<layers>" descriptors and the cell enum
pub mod model_type;

// auto / cpu / gpu selection
pub mod device;

// dB ↔ linear conversion
pub mod gain;

// One aligned (input, target) pair
pub mod sample;
