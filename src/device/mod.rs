//! Compute devices for the accelerated statistic engine.
//!
//! A device only needs to move dense matrices to and from its memory and
//! multiply them. Everything else stays on the host.
//!
//! | Device | Precision | Availability |
//! |--------|-----------|--------------|
//! | [`CpuDevice`] | f64 | Always |
//! | `WgpuDevice` | f32 | `wgpu` feature and a WebGPU adapter |

pub mod cpu;
#[cfg(feature = "wgpu")]
pub mod gpu;

pub use cpu::CpuDevice;
#[cfg(feature = "wgpu")]
pub use gpu::WgpuDevice;

use crate::error::{CodaError, Result};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Which compute device to acquire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    /// Host CPU, parallelised with rayon.
    #[default]
    Cpu,
    /// WebGPU adapter via wgpu.
    Wgpu,
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => write!(f, "CPU"),
            Self::Wgpu => write!(f, "WebGPU"),
        }
    }
}

/// Information about a compute device.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceInfo {
    /// Human-readable device name.
    pub name: String,
    /// Device kind.
    pub kind: DeviceKind,
    /// Maximum parallelism (threads, invocations per workgroup, ...).
    pub max_parallelism: usize,
}

/// A dense matrix resident on a device.
///
/// Stored row-major. Devices that compute out of host memory keep the data
/// here; others keep a host copy and move it on demand.
#[derive(Debug, Clone)]
pub struct DeviceMatrix {
    pub(crate) data: Vec<f64>,
    pub(crate) nrows: usize,
    pub(crate) ncols: usize,
}

impl DeviceMatrix {
    /// Copy a host matrix into row-major storage.
    pub fn from_host(matrix: &DMatrix<f64>) -> Self {
        // nalgebra is column-major; the transpose's storage is the row-major layout
        let data = matrix.transpose().as_slice().to_vec();
        Self {
            data,
            nrows: matrix.nrows(),
            ncols: matrix.ncols(),
        }
    }

    /// Copy back into a host matrix.
    pub fn to_host(&self) -> DMatrix<f64> {
        DMatrix::from_row_slice(self.nrows, self.ncols, &self.data)
    }

    /// Shape as (rows, columns).
    pub fn shape(&self) -> (usize, usize) {
        (self.nrows, self.ncols)
    }
}

/// Trait for compute devices.
///
/// All devices must be `Send + Sync` so an engine can be shared across
/// threads.
pub trait ComputeDevice: Send + Sync {
    /// Returns information about the device.
    fn info(&self) -> DeviceInfo;

    /// Copies a host matrix to the device.
    fn upload(&self, matrix: &DMatrix<f64>) -> Result<DeviceMatrix>;

    /// Computes `a · b` on the device.
    ///
    /// Returns an error if the inner dimensions differ.
    fn matmul(&self, a: &DeviceMatrix, b: &DeviceMatrix) -> Result<DeviceMatrix>;

    /// Copies a device matrix back to the host.
    fn download(&self, matrix: &DeviceMatrix) -> Result<DMatrix<f64>>;

    /// Unit roundoff of the arithmetic `matmul` runs in.
    fn unit_roundoff(&self) -> f64 {
        f64::EPSILON
    }

    /// Frees device-side resources. Called once when the owning
    /// [`DeviceContext`] is dropped.
    fn release(&self) {}
}

/// Something that can hand out a compute device.
pub trait DeviceSource: Send + Sync {
    /// Acquire a device, or fail with [`CodaError::Device`].
    fn acquire(&self) -> Result<Box<dyn ComputeDevice>>;
}

impl DeviceSource for DeviceKind {
    fn acquire(&self) -> Result<Box<dyn ComputeDevice>> {
        match self {
            DeviceKind::Cpu => Ok(Box::new(CpuDevice::new())),
            #[cfg(feature = "wgpu")]
            DeviceKind::Wgpu => Ok(Box::new(WgpuDevice::new()?)),
            #[cfg(not(feature = "wgpu"))]
            DeviceKind::Wgpu => Err(CodaError::Device(
                "WebGPU device requested but the crate was built without the `wgpu` feature"
                    .to_string(),
            )),
        }
    }
}

/// A device held for the duration of one engine call.
///
/// The device is released when the context is dropped, on success and
/// on every error path.
pub struct DeviceContext {
    device: Box<dyn ComputeDevice>,
    info: DeviceInfo,
}

impl DeviceContext {
    /// Acquire a device from `source`.
    pub fn acquire<S: DeviceSource + ?Sized>(source: &S) -> Result<Self> {
        let device = source.acquire()?;
        let info = device.info();
        debug!(device = %info.name, kind = %info.kind, "Acquired compute device");
        Ok(Self { device, info })
    }

    /// Information about the held device.
    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }

    /// Upload, multiply and download in one step.
    pub fn product(&self, a: &DMatrix<f64>, b: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        if a.ncols() != b.nrows() {
            return Err(CodaError::dimension(
                "device matrix product",
                a.ncols(),
                b.nrows(),
            ));
        }
        let a = self.device.upload(a)?;
        let b = self.device.upload(b)?;
        let c = self.device.matmul(&a, &b)?;
        self.device.download(&c)
    }

    /// Unit roundoff of the held device.
    pub fn unit_roundoff(&self) -> f64 {
        self.device.unit_roundoff()
    }

    /// The held device.
    pub fn device(&self) -> &dyn ComputeDevice {
        self.device.as_ref()
    }
}

impl Drop for DeviceContext {
    fn drop(&mut self) {
        self.device.release();
        debug!(device = %self.info.name, "Released compute device");
    }
}
