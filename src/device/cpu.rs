//! CPU device: row-parallel dense matrix product on the rayon pool.

use crate::device::{ComputeDevice, DeviceInfo, DeviceKind, DeviceMatrix};
use crate::error::{CodaError, Result};
use nalgebra::DMatrix;
use rayon::prelude::*;

/// Host compute device.
///
/// Serves as the reference device and is always available.
pub struct CpuDevice {
    parallelism: usize,
}

impl CpuDevice {
    /// Creates a CPU device sized to the rayon pool.
    pub fn new() -> Self {
        Self {
            parallelism: rayon::current_num_threads(),
        }
    }
}

impl Default for CpuDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl ComputeDevice for CpuDevice {
    fn info(&self) -> DeviceInfo {
        DeviceInfo {
            name: "CPU".to_string(),
            kind: DeviceKind::Cpu,
            max_parallelism: self.parallelism,
        }
    }

    fn upload(&self, matrix: &DMatrix<f64>) -> Result<DeviceMatrix> {
        Ok(DeviceMatrix::from_host(matrix))
    }

    fn matmul(&self, a: &DeviceMatrix, b: &DeviceMatrix) -> Result<DeviceMatrix> {
        let (m, k) = a.shape();
        let (kb, n) = b.shape();
        if k != kb {
            return Err(CodaError::dimension("CPU matmul inner dimension", k, kb));
        }

        let mut c = vec![0.0; m * n];
        if n > 0 {
            c.par_chunks_mut(n).enumerate().for_each(|(i, out)| {
                let a_row = &a.data[i * k..(i + 1) * k];
                for (p, &a_ip) in a_row.iter().enumerate() {
                    if a_ip == 0.0 {
                        continue;
                    }
                    let b_row = &b.data[p * n..(p + 1) * n];
                    for (o, &b_pj) in out.iter_mut().zip(b_row) {
                        *o += a_ip * b_pj;
                    }
                }
            });
        }

        Ok(DeviceMatrix {
            data: c,
            nrows: m,
            ncols: n,
        })
    }

    fn download(&self, matrix: &DeviceMatrix) -> Result<DMatrix<f64>> {
        Ok(matrix.to_host())
    }
}
