// ============================================================
// Layer 3 - Model Type Descriptor
// ============================================================
// A model is named by a short descriptor string:
//
//     "<cell>-<hidden_size>-<num_layers>"
//
//   e.g. "lstm-32-1", "gru-16-2", "rnn-8-4"
//
// The string is parsed exactly once, here, into a ModelType.
// Every later stage (model factory, checkpoint header, run
// names) works with the typed value and never re-splits the
// string.
//
// Recurrent cells:
//   rnn  - simple recurrent unit, tanh(Wx + Uh)
//   gru  - gated unit with reset/update gates
//   lstm - gated unit with input/forget/output gates
//
// Reference: Rust Book §6 (Enums), §9 (FromStr + Result)

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::domain::error::EngineError;

/// The recurrent cell family used by every layer of a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellKind {
    Rnn,
    Gru,
    Lstm,
}

impl CellKind {
    /// Number of gate blocks the cell projects its input into.
    /// rnn: candidate, gru: reset/update/new, lstm: input/forget/cell/output
    pub fn gate_count(self) -> usize {
        match self {
            CellKind::Rnn  => 1,
            CellKind::Gru  => 3,
            CellKind::Lstm => 4,
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            CellKind::Rnn  => "rnn",
            CellKind::Gru  => "gru",
            CellKind::Lstm => "lstm",
        }
    }
}

/// A validated model type: cell family plus hidden width and depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelType {
    pub cell:        CellKind,
    pub hidden_size: usize,
    pub num_layers:  usize,
}

impl ModelType {
    pub fn new(cell: CellKind, hidden_size: usize, num_layers: usize) -> Self {
        Self { cell, hidden_size, num_layers }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.cell.token(), self.hidden_size, self.num_layers)
    }
}

impl FromStr for ModelType {
    type Err = EngineError;

    fn from_str(descriptor: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| EngineError::InvalidModelType {
            descriptor: descriptor.to_string(),
            reason:     reason.to_string(),
        };

        let fields: Vec<&str> = descriptor.trim().split('-').collect();
        if fields.len() != 3 {
            return Err(invalid("expected <cell>-<hidden_size>-<num_layers>"));
        }

        let cell = match fields[0].to_ascii_lowercase().as_str() {
            "rnn"  => CellKind::Rnn,
            "gru"  => CellKind::Gru,
            "lstm" => CellKind::Lstm,
            _      => return Err(invalid("cell must be one of rnn, gru, lstm")),
        };

        let positive = |field: &str, name: &str| -> Result<usize, EngineError> {
            match field.parse::<usize>() {
                Ok(n) if n > 0 => Ok(n),
                _ => Err(invalid(&format!("{name} must be a positive integer"))),
            }
        };

        let hidden_size = positive(fields[1], "hidden_size")?;
        let num_layers  = positive(fields[2], "num_layers")?;

        Ok(Self { cell, hidden_size, num_layers })
    }
}
