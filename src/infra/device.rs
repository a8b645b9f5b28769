// ============================================================
// Layer 6 - Backend Selection
// ============================================================
// Turns the ComputeDevice setting into a concrete burn backend
// and runs a piece of work on it.
//
// Burn backends are types, not values, so "pick a backend at
// runtime" means "monomorphise the work for each backend and
// branch once". BackendTask is that work: the application
// layer implements it for training, prediction and
// evaluation, and with_backend() chooses which copy to run.
//
//   cpu → Autodiff<NdArray>
//   gpu → Autodiff<Wgpu>        (only with the `wgpu` feature)
//
// Inference code simply uses B::InnerBackend of the backend it
// is handed, so it never pays for autodiff bookkeeping.
//
// Reference: Burn Book §2 (Backends)

use burn::{
    backend::{ndarray::NdArrayDevice, Autodiff, NdArray},
    tensor::backend::AutodiffBackend,
};

use crate::domain::{device::ComputeDevice, error::EngineResult};

/// Whether an accelerator backend was compiled into this binary
pub const GPU_COMPILED: bool = cfg!(feature = "wgpu");

/// Work that can run on any autodiff-capable backend.
pub trait BackendTask {
    type Output;

    fn run<B: AutodiffBackend>(self, device: B::Device) -> Self::Output;
}

/// Resolve `requested` and run `task` on the matching backend.
pub fn with_backend<T: BackendTask>(requested: ComputeDevice, task: T) -> EngineResult<T::Output> {
    let resolved = requested.resolve(GPU_COMPILED)?;

    match resolved {
        #[cfg(feature = "wgpu")]
        ComputeDevice::Gpu => {
            let device = burn::backend::wgpu::WgpuDevice::default();
            tracing::info!("Using gpu device: {:?}", device);
            Ok(task.run::<Autodiff<burn::backend::Wgpu>>(device))
        }
        _ => {
            let device = NdArrayDevice::Cpu;
            tracing::info!("Using cpu device: {:?}", device);
            Ok(task.run::<Autodiff<NdArray>>(device))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::prelude::*;

    struct Sum(Vec<f32>);

    impl BackendTask for Sum {
        type Output = f32;

        fn run<B: AutodiffBackend>(self, device: B::Device) -> f32 {
            Tensor::<B, 1>::from_floats(self.0.as_slice(), &device).sum().into_scalar().elem()
        }
    }

    #[test]
    fn test_cpu_task_runs() {
        let total = with_backend(ComputeDevice::Cpu, Sum(vec![1.0, 2.0, 3.5])).unwrap();
        assert!((total - 6.5).abs() < 1e-6);
    }

    #[test]
    fn test_gpu_without_feature_is_rejected() {
        if GPU_COMPILED {
            return;
        }
        assert!(with_backend(ComputeDevice::Gpu, Sum(vec![1.0])).is_err());
    }
}
