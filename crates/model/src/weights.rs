//! Float weights with a Q8.8 mirror

use rand::Rng;

use qlogit_fixed_point::AlignedVec;
use qlogit_kernels::VectorKernels;

use crate::error::Result;

/// Bound of the Xavier uniform distribution for `n` inputs: `sqrt(6 / n)`
pub fn xavier_limit(n: usize) -> f32 {
    (6.0f32 / n as f32).sqrt()
}

/// Weight vector of a logistic unit.
///
/// The float weights are authoritative. The Q8.8 mirror is only valid right
/// after [`Weights::requantize`]; any mutable access to the float weights
/// marks it stale, and [`Weights::fixed`] refuses to hand out a stale mirror.
#[derive(Debug, Clone)]
pub struct Weights {
    float: AlignedVec<f32>,
    fixed: AlignedVec<i16>,
    synced: bool,
}

impl Weights {
    /// Weights drawn uniformly from `±sqrt(6 / n)`, quantized before return
    pub fn xavier<R: Rng, K: VectorKernels + ?Sized>(
        n: usize,
        alignment: usize,
        rng: &mut R,
        kernels: &K,
    ) -> Result<Self> {
        let mut float = AlignedVec::with_alignment(alignment, n)?;
        if n > 0 {
            let limit = xavier_limit(n);
            for w in float.iter_mut() {
                *w = rng.gen_range(-limit..limit);
            }
        }

        let fixed = AlignedVec::with_alignment(alignment, n)?;
        let mut weights = Self { float, fixed, synced: false };
        weights.requantize(kernels);
        Ok(weights)
    }

    /// Weights copied from `values`, quantized before return
    pub fn from_slice<K: VectorKernels + ?Sized>(
        values: &[f32],
        alignment: usize,
        kernels: &K,
    ) -> Result<Self> {
        let mut float = AlignedVec::with_alignment(alignment, values.len())?;
        float.copy_from_slice(values)?;
        let fixed = AlignedVec::with_alignment(alignment, values.len())?;

        let mut weights = Self { float, fixed, synced: false };
        weights.requantize(kernels);
        Ok(weights)
    }

    pub fn len(&self) -> usize {
        self.float.len()
    }

    pub fn is_empty(&self) -> bool {
        self.float.is_empty()
    }

    /// The authoritative float weights
    pub fn float(&self) -> &[f32] {
        &self.float
    }

    /// Mutable float weights. The Q8.8 mirror becomes stale.
    pub fn float_mut(&mut self) -> &mut [f32] {
        self.synced = false;
        &mut self.float
    }

    /// The Q8.8 mirror, or `None` while it is stale
    pub fn fixed(&self) -> Option<&[i16]> {
        self.synced.then_some(self.fixed.as_slice())
    }

    /// Whether the mirror matches the float weights
    pub fn is_synced(&self) -> bool {
        self.synced
    }

    /// Rebuild the Q8.8 mirror from the float weights
    pub fn requantize<K: VectorKernels + ?Sized>(&mut self, kernels: &K) {
        kernels.quantize(&self.float, &mut self.fixed);
        self.synced = true;
    }

    /// Both views at once, re-quantizing first if the mirror is stale
    pub(crate) fn synced_views<K: VectorKernels + ?Sized>(
        &mut self,
        kernels: &K,
    ) -> (&[f32], &[i16]) {
        if !self.synced {
            self.requantize(kernels);
        }
        (self.float.as_slice(), self.fixed.as_slice())
    }

    /// Apply `update` to the float weights, then re-quantize
    pub(crate) fn update_with<K, F>(&mut self, kernels: &K, update: F)
    where
        K: VectorKernels + ?Sized,
        F: FnOnce(&mut [f32]),
    {
        update(self.float_mut());
        self.requantize(kernels);
    }
}
