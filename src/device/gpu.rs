//! WebGPU device: matrix products in a WGSL compute shader.
//!
//! WebGPU has no native f64, so data are converted to `f32` at the
//! host-device boundary. Statistics computed on this device agree with the
//! f64 devices to single precision only.

use crate::device::{ComputeDevice, DeviceInfo, DeviceKind, DeviceMatrix};
use crate::error::{CodaError, Result};
use nalgebra::DMatrix;
use wgpu::util::DeviceExt;

const MATMUL_WGSL: &str = include_str!("matmul.wgsl");

/// Side length of the square workgroup in `matmul.wgsl`. Each invocation
/// computes one output element directly; there is no shared-memory tiling.
const WORKGROUP_SIDE: u32 = 16;

/// WebGPU compute device.
///
/// Compiles the matmul shader at construction time and caches the pipeline.
pub struct WgpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    matmul_pipeline: wgpu::ComputePipeline,
    adapter_name: String,
}

impl WgpuDevice {
    /// Request an adapter and device, then compile the shader.
    ///
    /// # Errors
    /// Returns [`CodaError::Device`] if no WebGPU adapter or device is
    /// available.
    pub fn new() -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let (adapter_name, device, queue) = pollster::block_on(async {
            let adapter = instance
                .request_adapter(&wgpu::RequestAdapterOptions {
                    power_preference: wgpu::PowerPreference::HighPerformance,
                    compatible_surface: None,
                    force_fallback_adapter: false,
                })
                .await
                .ok_or_else(|| CodaError::Device("no WebGPU adapter available".to_string()))?;

            let (device, queue) = adapter
                .request_device(
                    &wgpu::DeviceDescriptor {
                        label: Some("coda-perm"),
                        required_features: wgpu::Features::empty(),
                        required_limits: wgpu::Limits::default(),
                        memory_hints: wgpu::MemoryHints::Performance,
                    },
                    None,
                )
                .await
                .map_err(|e| CodaError::Device(format!("WebGPU device request: {e}")))?;
            Ok::<_, CodaError>((adapter.get_info().name, device, queue))
        })?;

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("matmul"),
            source: wgpu::ShaderSource::Wgsl(MATMUL_WGSL.into()),
        });
        let matmul_pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("matmul"),
            layout: None,
            module: &module,
            entry_point: Some("matmul"),
            compilation_options: Default::default(),
            cache: None,
        });

        Ok(Self {
            device,
            queue,
            matmul_pipeline,
            adapter_name,
        })
    }

    fn upload_f32(&self, data: &[f64]) -> wgpu::Buffer {
        let f32_data: Vec<f32> = data.iter().map(|&x| x as f32).collect();
        let bytes: &[u8] = bytemuck::cast_slice(&f32_data);
        self.device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: None,
                contents: if bytes.is_empty() { &[0u8; 4] } else { bytes },
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            })
    }

    fn alloc_f32(&self, count: usize) -> wgpu::Buffer {
        self.device.create_buffer(&wgpu::BufferDescriptor {
            label: None,
            size: ((count * 4) as u64).max(4),
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        })
    }

    /// Copy `count` f32 values back through a staging buffer.
    fn read_f32(&self, buf: &wgpu::Buffer, count: usize) -> Result<Vec<f64>> {
        let size = ((count * 4) as u64).max(4);
        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: None,
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor::default());
        encoder.copy_buffer_to_buffer(buf, 0, &staging, 0, size);
        self.queue.submit(Some(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .map_err(|e| CodaError::Device(format!("WebGPU readback channel: {e}")))?
            .map_err(|e| CodaError::Device(format!("WebGPU buffer map: {e}")))?;

        let values = {
            let mapped = slice.get_mapped_range();
            let f32_data: &[f32] = bytemuck::cast_slice(&mapped);
            f32_data[..count].iter().map(|&x| x as f64).collect()
        };
        staging.unmap();
        Ok(values)
    }
}

impl ComputeDevice for WgpuDevice {
    fn info(&self) -> DeviceInfo {
        DeviceInfo {
            name: self.adapter_name.clone(),
            kind: DeviceKind::Wgpu,
            max_parallelism: (WORKGROUP_SIDE * WORKGROUP_SIDE) as usize,
        }
    }

    fn upload(&self, matrix: &DMatrix<f64>) -> Result<DeviceMatrix> {
        Ok(DeviceMatrix::from_host(matrix))
    }

    fn matmul(&self, a: &DeviceMatrix, b: &DeviceMatrix) -> Result<DeviceMatrix> {
        let (m, k) = a.shape();
        let (kb, n) = b.shape();
        if k != kb {
            return Err(CodaError::dimension("WebGPU matmul inner dimension", k, kb));
        }

        let a_buf = self.upload_f32(&a.data);
        let b_buf = self.upload_f32(&b.data);
        let c_buf = self.alloc_f32(m * n);

        // padded to 16 bytes for the uniform buffer
        let params: [u32; 4] = [m as u32, k as u32, n as u32, 0];
        let params_buf = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: None,
                contents: bytemuck::cast_slice(&params),
                usage: wgpu::BufferUsages::UNIFORM,
            });

        let layout = self.matmul_pipeline.get_bind_group_layout(0);
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: None,
            layout: &layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: a_buf.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: b_buf.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: c_buf.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: params_buf.as_entire_binding(),
                },
            ],
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor::default());
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: None,
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.matmul_pipeline);
            pass.set_bind_group(0, Some(&bind_group), &[]);
            pass.dispatch_workgroups(
                (n as u32).div_ceil(WORKGROUP_SIDE),
                (m as u32).div_ceil(WORKGROUP_SIDE),
                1,
            );
        }
        self.queue.submit(Some(encoder.finish()));

        Ok(DeviceMatrix {
            data: self.read_f32(&c_buf, m * n)?,
            nrows: m,
            ncols: n,
        })
    }

    fn download(&self, matrix: &DeviceMatrix) -> Result<DMatrix<f64>> {
        Ok(matrix.to_host())
    }

    fn unit_roundoff(&self) -> f64 {
        f64::from(f32::EPSILON)
    }

    fn release(&self) {
        self.device.poll(wgpu::Maintain::Wait);
    }
}
