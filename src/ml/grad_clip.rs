// ============================================================
// Layer 5 - Global Gradient Norm Clipping
// ============================================================
// Long recurrent unrolls can produce huge gradients. Before
// every optimiser step the gradients of ALL parameters are
// treated as one vector:
//
//   norm  = sqrt( Σ_params Σ_elems g² )
//   norm > max  →  every g *= max / (norm + 1e-6)
//
// One shared factor keeps the update direction intact. Burn's
// GradientClippingConfig clips each parameter tensor on its
// own, which bounds every tensor but not the total, so it is
// not used here.
//
// Gradients live in GradientsParams keyed by ParamId, on the
// inner backend. A ModuleVisitor walks the model to find every
// id together with its tensor rank.

use burn::{
    module::{AutodiffModule, ModuleVisitor, ParamId},
    optim::GradientsParams,
    prelude::*,
    tensor::backend::AutodiffBackend,
};

struct SumSquares<'a> {
    grads: &'a GradientsParams,
    total: f64,
}

impl<B: AutodiffBackend> ModuleVisitor<B> for SumSquares<'_> {
    fn visit_float<const D: usize>(&mut self, id: ParamId, _tensor: &Tensor<B, D>) {
        if let Some(grad) = self.grads.get::<B::InnerBackend, D>(id) {
            let sq: f64 = grad.powf_scalar(2.0).sum().into_scalar().elem();
            self.total += sq;
        }
    }
}

struct Rescale<'a> {
    grads:  &'a mut GradientsParams,
    factor: f64,
}

impl<B: AutodiffBackend> ModuleVisitor<B> for Rescale<'_> {
    fn visit_float<const D: usize>(&mut self, id: ParamId, _tensor: &Tensor<B, D>) {
        if let Some(grad) = self.grads.remove::<B::InnerBackend, D>(id) {
            self.grads.register::<B::InnerBackend, D>(id, grad.mul_scalar(self.factor));
        }
    }
}

/// L2 norm of all of `module`'s gradients taken together.
pub fn global_norm<B, M>(module: &M, grads: &GradientsParams) -> f64
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
{
    let mut visitor = SumSquares { grads, total: 0.0 };
    module.visit(&mut visitor);
    visitor.total.sqrt()
}

/// Scale `grads` so their global norm is at most `max_norm`.
/// Returns the norm measured before clipping.
pub fn clip_global_norm<B, M>(module: &M, grads: &mut GradientsParams, max_norm: f64) -> f64
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
{
    let norm = global_norm::<B, M>(module, grads);

    // A non-finite norm can't be rescaled into range; the step will show it in the loss.
    if norm.is_finite() && norm > max_norm {
        let mut visitor = Rescale { grads, factor: max_norm / (norm + 1e-6) };
        module.visit(&mut visitor);
    }
    norm
}
