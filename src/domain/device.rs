// ============================================================
// Layer 3 - Compute Device Choice
// ============================================================
// Which hardware the tensors live on is an explicit setting,
// passed from the CLI down into the trainer and predictor.
// Nothing picks a device behind the caller's back.
//
//   auto - the GPU backend when the binary was built with the
//          `wgpu` feature, otherwise the CPU backend
//   cpu  - burn's NdArray backend
//   gpu  - burn's Wgpu backend (fatal if not compiled in)
//
// The mapping from this enum to concrete burn backends lives
// in infra::device; this layer stays framework-free.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::domain::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComputeDevice {
    #[default]
    Auto,
    Cpu,
    Gpu,
}

impl ComputeDevice {
    /// Collapse `Auto` into a concrete choice.
    /// `gpu_available` reports whether an accelerator backend was compiled in.
    pub fn resolve(self, gpu_available: bool) -> Result<ComputeDevice, EngineError> {
        match self {
            ComputeDevice::Auto if gpu_available => Ok(ComputeDevice::Gpu),
            ComputeDevice::Auto => Ok(ComputeDevice::Cpu),
            ComputeDevice::Gpu if !gpu_available => Err(EngineError::Device(
                "gpu requested but this build has no accelerator backend (enable the `wgpu` feature)"
                    .to_string(),
            )),
            other => Ok(other),
        }
    }
}

impl fmt::Display for ComputeDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ComputeDevice::Auto => "auto",
            ComputeDevice::Cpu  => "cpu",
            ComputeDevice::Gpu  => "gpu",
        };
        f.write_str(name)
    }
}

impl FromStr for ComputeDevice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto"                   => Ok(ComputeDevice::Auto),
            "cpu"                    => Ok(ComputeDevice::Cpu),
            "gpu" | "wgpu" | "cuda"  => Ok(ComputeDevice::Gpu),
            other => Err(format!("unknown device '{other}', expected auto, cpu or gpu")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_prefers_accelerator() {
        assert_eq!(ComputeDevice::Auto.resolve(true).unwrap(),  ComputeDevice::Gpu);
        assert_eq!(ComputeDevice::Auto.resolve(false).unwrap(), ComputeDevice::Cpu);
    }

    #[test]
    fn test_explicit_gpu_without_backend_is_fatal() {
        let err = ComputeDevice::Gpu.resolve(false).unwrap_err();
        assert!(matches!(err, EngineError::Device(_)));
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("CPU".parse::<ComputeDevice>().unwrap(), ComputeDevice::Cpu);
        assert_eq!("wgpu".parse::<ComputeDevice>().unwrap(), ComputeDevice::Gpu);
        assert!("tpu".parse::<ComputeDevice>().is_err());
    }
}
