//! Accelerated engine: the vectorized products offloaded to a compute device.
//!
//! Only `X·P` and `(X∘X)·P` run on the device. Statistic derivation and
//! p-values stay on the host, so the accelerated and vectorized engines
//! share their arithmetic after the products. Rows are centred on the host
//! before upload, and the degeneracy tolerance follows the device's
//! precision.

use crate::device::{DeviceContext, DeviceKind, DeviceSource};
use crate::engine::vectorized::{derive_statistics, VectorizedEngine};
use crate::engine::{center_rows, check_inputs, variance_tolerance, Statistic, StatisticEngine};
use crate::error::Result;
use crate::permutation::PermutationMatrix;
use nalgebra::DMatrix;
use tracing::{debug, info, warn};

/// Device-backed engine.
///
/// A device is acquired at the start of every call and released when the
/// call returns. If no device can be acquired the call fails with
/// [`CodaError::Device`](crate::error::CodaError::Device), unless fallback
/// is enabled, in which case it logs a warning and runs the vectorized
/// engine instead.
#[derive(Debug, Clone)]
pub struct AcceleratedEngine<S: DeviceSource = DeviceKind> {
    source: S,
    fallback_to_vectorized: bool,
}

impl<S: DeviceSource> AcceleratedEngine<S> {
    /// Engine drawing devices from `source`.
    pub fn new(source: S) -> Self {
        Self {
            source,
            fallback_to_vectorized: false,
        }
    }

    /// Fall back to the vectorized engine when no device is available.
    pub fn with_fallback(mut self, fallback: bool) -> Self {
        self.fallback_to_vectorized = fallback;
        self
    }
}

impl Default for AcceleratedEngine<DeviceKind> {
    fn default() -> Self {
        Self::new(DeviceKind::Cpu)
    }
}

impl<S: DeviceSource> StatisticEngine for AcceleratedEngine<S> {
    fn name(&self) -> &'static str {
        "accelerated"
    }

    fn permutation_statistics(
        &self,
        features: &DMatrix<f64>,
        perms: &PermutationMatrix,
        statistic: Statistic,
    ) -> Result<DMatrix<f64>> {
        check_inputs(features, perms, statistic)?;

        let ctx = match DeviceContext::acquire(&self.source) {
            Ok(ctx) => ctx,
            Err(e) if self.fallback_to_vectorized => {
                warn!(error = %e, "Compute device unavailable, falling back to vectorized engine");
                return VectorizedEngine.permutation_statistics(features, perms, statistic);
            }
            Err(e) => return Err(e),
        };

        info!(
            device = %ctx.info().name,
            features = features.nrows(),
            samples = features.ncols(),
            labelings = perms.n_labelings(),
            "Computing permutation statistics on device"
        );

        let (centered, totals) = center_rows(features);
        let sums = ctx.product(&centered, perms.matrix())?;
        let sq_sums = ctx.product(&centered.component_mul(&centered), perms.matrix())?;
        debug!(shape = ?sums.shape(), "Group sums downloaded");

        let tolerance = variance_tolerance(ctx.unit_roundoff());
        Ok(derive_statistics(
            &sums,
            &sq_sums,
            &totals,
            perms,
            statistic,
            tolerance,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Categories;
    use crate::device::{ComputeDevice, DeviceInfo, DeviceMatrix};
    use crate::error::CodaError;
    use crate::permutation::reciprocal_permutations;
    use approx::assert_relative_eq;

    struct Unavailable;

    impl DeviceSource for Unavailable {
        fn acquire(&self) -> Result<Box<dyn ComputeDevice>> {
            Err(CodaError::Device("no device".to_string()))
        }
    }

    struct Broken;

    impl ComputeDevice for Broken {
        fn info(&self) -> DeviceInfo {
            DeviceInfo {
                name: "broken".to_string(),
                kind: DeviceKind::Cpu,
                max_parallelism: 1,
            }
        }
        fn upload(&self, matrix: &DMatrix<f64>) -> Result<DeviceMatrix> {
            Ok(DeviceMatrix::from_host(matrix))
        }
        fn matmul(&self, _a: &DeviceMatrix, _b: &DeviceMatrix) -> Result<DeviceMatrix> {
            Err(CodaError::Device("kernel launch failed".to_string()))
        }
        fn download(&self, matrix: &DeviceMatrix) -> Result<DMatrix<f64>> {
            Ok(matrix.to_host())
        }
    }

    /// Host device that rounds every product to f32, like a WebGPU adapter.
    struct SinglePrecision;

    impl ComputeDevice for SinglePrecision {
        fn info(&self) -> DeviceInfo {
            DeviceInfo {
                name: "single".to_string(),
                kind: DeviceKind::Cpu,
                max_parallelism: 1,
            }
        }
        fn upload(&self, matrix: &DMatrix<f64>) -> Result<DeviceMatrix> {
            Ok(DeviceMatrix::from_host(&matrix.map(|v| v as f32 as f64)))
        }
        fn matmul(&self, a: &DeviceMatrix, b: &DeviceMatrix) -> Result<DeviceMatrix> {
            let a32 = a.to_host().map(|v| v as f32);
            let b32 = b.to_host().map(|v| v as f32);
            Ok(DeviceMatrix::from_host(&(a32 * b32).map(f64::from)))
        }
        fn download(&self, matrix: &DeviceMatrix) -> Result<DMatrix<f64>> {
            Ok(matrix.to_host())
        }
        fn unit_roundoff(&self) -> f64 {
            f64::from(f32::EPSILON)
        }
    }

    struct SingleSource;

    impl DeviceSource for SingleSource {
        fn acquire(&self) -> Result<Box<dyn ComputeDevice>> {
            Ok(Box::new(SinglePrecision))
        }
    }

    struct BrokenSource;

    impl DeviceSource for BrokenSource {
        fn acquire(&self) -> Result<Box<dyn ComputeDevice>> {
            Ok(Box::new(Broken))
        }
    }

    fn two_groups() -> (DMatrix<f64>, PermutationMatrix) {
        let cats = Categories::new(&[0, 0, 0, 1, 1, 1]).unwrap();
        let perms = reciprocal_permutations(&cats, 30, 42).unwrap();
        let x = DMatrix::from_row_slice(1, 6, &[0.0, 0.0, 0.0, 10.0, 10.0, 10.0]);
        (x, perms)
    }

    #[test]
    fn test_cpu_device_matches_vectorized() {
        let (x, perms) = two_groups();
        let a = AcceleratedEngine::default()
            .permutation_statistics(&x, &perms, Statistic::Mean)
            .unwrap();
        let v = VectorizedEngine
            .permutation_statistics(&x, &perms, Statistic::Mean)
            .unwrap();
        for p in 0..perms.n_labelings() {
            assert_relative_eq!(a[(0, p)], v[(0, p)], epsilon = 1e-9);
        }
    }

    #[test]
    fn test_single_precision_degenerate_groups() {
        // constant non-integer groups: f32 sums must still give zero variance
        let cats = Categories::new(&[0, 0, 0, 0, 1, 1, 1, 1]).unwrap();
        let perms = crate::permutation::categorical_permutations(&cats, 50, 4).unwrap();
        let x = DMatrix::from_row_slice(
            2,
            8,
            &[
                0.1, 0.1, 0.1, 0.1, 0.7, 0.7, 0.7, 0.7, //
                0.3, 0.3, 0.3, 0.3, 0.3, 0.3, 0.3, 0.3,
            ],
        );
        for statistic in [Statistic::T, Statistic::F] {
            let single = AcceleratedEngine::new(SingleSource)
                .permutation_statistics(&x, &perms, statistic)
                .unwrap();
            let exact = VectorizedEngine
                .permutation_statistics(&x, &perms, statistic)
                .unwrap();
            assert_eq!(single[(0, 0)], f64::INFINITY);
            assert_eq!(single[(0, 0)], exact[(0, 0)]);
            for p in 0..perms.n_labelings() {
                assert_eq!(single[(1, p)], 0.0);
                assert_eq!(exact[(1, p)], 0.0);
            }
        }
    }

    #[test]
    fn test_single_precision_offset_data() {
        let cats = Categories::new(&[0, 0, 0, 0, 1, 1, 1, 1]).unwrap();
        let perms = crate::permutation::categorical_permutations(&cats, 50, 4).unwrap();
        let x = DMatrix::from_row_slice(1, 8, &[0.0, 0.5, -0.5, 0.2, 1.0, 1.5, 0.5, 1.2])
            .add_scalar(1e6);
        let single = AcceleratedEngine::new(SingleSource)
            .permutation_statistics(&x, &perms, Statistic::T)
            .unwrap();
        let exact = VectorizedEngine
            .permutation_statistics(&x, &perms, Statistic::T)
            .unwrap();
        for (a, b) in single.iter().zip(exact.iter()) {
            assert!((a - b).abs() < 1e-3 * b.abs().max(1.0), "{} vs {}", a, b);
        }
    }

    #[test]
    fn test_unavailable_device_errors() {
        let (x, perms) = two_groups();
        let err = AcceleratedEngine::new(Unavailable)
            .permutation_statistics(&x, &perms, Statistic::Mean)
            .unwrap_err();
        assert!(matches!(err, CodaError::Device(_)));
    }

    #[test]
    fn test_unavailable_device_fallback() {
        let (x, perms) = two_groups();
        let stats = AcceleratedEngine::new(Unavailable)
            .with_fallback(true)
            .permutation_statistics(&x, &perms, Statistic::Mean)
            .unwrap();
        assert_relative_eq!(stats[(0, 0)], 10.0);
    }

    #[test]
    fn test_device_failure_is_not_masked() {
        // fallback covers acquisition only; a failing device surfaces its error
        let (x, perms) = two_groups();
        let err = AcceleratedEngine::new(BrokenSource)
            .with_fallback(true)
            .permutation_statistics(&x, &perms, Statistic::Mean)
            .unwrap_err();
        assert!(matches!(err, CodaError::Device(_)));
    }
}
