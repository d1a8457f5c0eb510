//! wgpu adapter and device setup.
//!
//! One [`GpuDevice`] is created at startup, either headless for offscreen
//! rendering or against a window surface. naga cannot evaluate `override`
//! expressions inside `@workgroup_size`, so the workgroup width is written
//! into the shader source through a `{{WORKGROUP_SIZE}}` placeholder.

use std::fmt;

use crate::error::GpuError;

/// Columns per compute workgroup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkgroupSize {
    pub x: u32,
}

impl Default for WorkgroupSize {
    fn default() -> Self {
        Self { x: 64 }
    }
}

impl WorkgroupSize {
    /// Fill the `{{WORKGROUP_SIZE}}` placeholder of a WGSL template.
    pub fn specialize(&self, template: &str) -> String {
        template.replace("{{WORKGROUP_SIZE}}", &self.x.to_string())
    }

    /// Workgroups needed to give every column one invocation.
    pub fn dispatch_size(&self, columns: u32) -> u32 {
        columns.div_ceil(self.x)
    }

    /// Shrink to the largest power of two the device allows.
    fn clamp_to(self, limits: &wgpu::Limits) -> Self {
        let max = limits
            .max_compute_invocations_per_workgroup
            .min(limits.max_compute_workgroup_size_x)
            .max(1);
        let mut x = self.x.max(1);
        while x > max {
            x /= 2;
        }
        Self { x }
    }
}

impl fmt::Display for WorkgroupSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} invocations", self.x)
    }
}

#[derive(Debug, Clone)]
pub struct AdapterInfo {
    pub name: String,
    pub device_type: wgpu::DeviceType,
    pub backend: wgpu::Backend,
}

impl fmt::Display for AdapterInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?}, {:?})", self.name, self.backend, self.device_type)
    }
}

/// Adapter, device and queue.
///
/// `_instance` is declared last so the instance outlives `device` and `queue`
/// when the struct is dropped.
pub struct GpuDevice {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub adapter: wgpu::Adapter,
    pub adapter_info: AdapterInfo,
    pub workgroup_size: WorkgroupSize,
    _instance: wgpu::Instance,
}

impl GpuDevice {
    /// Device without a presentation target, for offscreen frames and tests.
    pub fn headless() -> Result<Self, GpuError> {
        let instance = new_instance();
        pollster::block_on(Self::init_async(instance, None))
    }

    /// Device able to present to `target`. The returned surface must be
    /// dropped before the device.
    pub fn for_window(
        target: impl Into<wgpu::SurfaceTarget<'static>>,
    ) -> Result<(Self, wgpu::Surface<'static>), GpuError> {
        let instance = new_instance();
        let surface = instance.create_surface(target)?;
        let gpu = pollster::block_on(Self::init_async(instance, Some(&surface)))?;
        Ok((gpu, surface))
    }

    async fn init_async(
        instance: wgpu::Instance,
        compatible_surface: Option<&wgpu::Surface<'_>>,
    ) -> Result<Self, GpuError> {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::NoSuitableAdapter)?;

        let raw = adapter.get_info();
        let adapter_info = AdapterInfo {
            name: raw.name,
            device_type: raw.device_type,
            backend: raw.backend,
        };
        tracing::info!(adapter = %adapter_info, "selected GPU adapter");

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("dda_raycaster"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default().using_resolution(adapter.limits()),
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await?;

        let workgroup_size = WorkgroupSize::default().clamp_to(&device.limits());
        tracing::debug!(workgroup = %workgroup_size, "compute workgroup size");

        Ok(Self {
            device,
            queue,
            adapter,
            adapter_info,
            workgroup_size,
            _instance: instance,
        })
    }
}

impl fmt::Display for GpuDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, workgroup {}", self.adapter_info, self.workgroup_size)
    }
}

fn new_instance() -> wgpu::Instance {
    let flags = if cfg!(debug_assertions) {
        wgpu::InstanceFlags::VALIDATION
    } else {
        wgpu::InstanceFlags::empty()
    };
    wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        flags,
        ..Default::default()
    })
}
