use crate::error::GpuError;
use crate::scene::Scene;

use super::device::GpuDevice;
use super::raycast::GpuRenderer;

/// Window swapchain for the device strategy. Frames are drawn straight into
/// the surface texture, no host readback.
pub struct GpuSurface {
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
}

impl GpuSurface {
    pub fn new(
        gpu: &GpuDevice,
        surface: wgpu::Surface<'static>,
        width: u32,
        height: u32,
    ) -> Result<Self, GpuError> {
        let caps = surface.get_capabilities(&gpu.adapter);
        // Palette colors are already display values, so skip sRGB encoding.
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or(GpuError::UnsupportedSurface)?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .ok_or(GpuError::UnsupportedSurface)?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&gpu.device, &config);
        tracing::debug!(?format, width = config.width, height = config.height, "surface configured");
        Ok(Self { surface, config })
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    pub fn resize(&mut self, gpu: &GpuDevice, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&gpu.device, &self.config);
    }

    /// Render and present one frame. A lost or outdated surface is
    /// reconfigured and the frame skipped.
    pub fn present(&mut self, renderer: &mut GpuRenderer, scene: &Scene) -> Result<(), GpuError> {
        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&renderer.gpu().device, &self.config);
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };
        let view = frame.texture.create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = renderer
            .gpu()
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("surface frame") });
        renderer.encode_frame(scene, &view, &mut encoder);
        renderer.gpu().queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }
}
