use std::sync::mpsc;

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::config::{RenderConfig, Strategy};
use crate::error::{Error, GpuError};
use crate::framebuffer::{FrameBuffer, pack_rgb};
use crate::render::Renderer;
use crate::scene::Scene;
use crate::world::{MaterialPalette, WorldGrid};

use super::device::GpuDevice;

const RAYCAST_WGSL: &str = include_str!("../shaders/raycast.wgsl");
const COLUMNS_WGSL: &str = include_str!("../shaders/columns.wgsl");

/// Camera and frame parameters, shared by both shaders.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct CameraUniforms {
    pub position: [f32; 2],
    pub forward: [f32; 2],
    pub right: [f32; 2],
    pub map_size: [u32; 2],
    pub screen_size: [u32; 2],
    pub _pad: [u32; 2],
}

impl CameraUniforms {
    pub fn new(scene: &Scene, width: usize, height: usize) -> Self {
        let grid = scene.grid();
        Self {
            position: scene.camera_position().to_array(),
            forward: scene.camera_forward().to_array(),
            right: scene.camera_right().to_array(),
            map_size: [grid.width() as u32, grid.height() as u32],
            screen_size: [width as u32, height as u32],
            _pad: [0; 2],
        }
    }
}

/// One column record written by the compute pass.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuColumn {
    pub distance: f32,
    /// Shaded `0x00RRGGBB` color.
    pub color: u32,
    pub draw_start: u32,
    pub draw_end: u32,
}

/// Device strategy. Owns the GPU context, both pipelines and every buffer
/// the shaders read.
///
/// [`GpuRenderer::encode_frame`] records a frame into any color target. The
/// [`Renderer`] impl renders into an offscreen texture and reads it back into
/// a [`FrameBuffer`]; [`super::GpuSurface`] renders straight to a window.
pub struct GpuRenderer {
    width: usize,
    height: usize,
    clear_color: u32,
    target_format: wgpu::TextureFormat,

    uniforms: wgpu::Buffer,
    cells: wgpu::Buffer,
    materials: wgpu::Buffer,
    columns: wgpu::Buffer,

    cast_layout: wgpu::BindGroupLayout,
    draw_layout: wgpu::BindGroupLayout,
    cast_pipeline: wgpu::ComputePipeline,
    draw_pipeline: wgpu::RenderPipeline,
    cast_group: wgpu::BindGroup,
    draw_group: wgpu::BindGroup,

    /// Host copies of what was last uploaded.
    uploaded_grid: WorldGrid,
    uploaded_palette: MaterialPalette,

    offscreen: Option<Offscreen>,
    framebuffer: FrameBuffer,

    gpu: GpuDevice,
}

struct Offscreen {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    readback: wgpu::Buffer,
    padded_row: u32,
}

impl GpuRenderer {
    /// Build pipelines that draw into `target_format`. Use
    /// `Rgba8Unorm` for headless rendering and the surface format otherwise.
    pub fn new(
        gpu: GpuDevice,
        config: &RenderConfig,
        scene: &Scene,
        target_format: wgpu::TextureFormat,
    ) -> Result<Self, Error> {
        config.validate()?;
        let device = &gpu.device;

        let uniforms = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("camera uniforms"),
            contents: bytemuck::bytes_of(&CameraUniforms::new(scene, config.width, config.height)),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let cells = create_cells_buffer(device, scene.grid());
        let materials = create_materials_buffer(device, scene.palette());
        let columns = create_columns_buffer(device, config.width);

        let cast_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("cast columns BGL"),
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::COMPUTE),
                storage_entry(1, wgpu::ShaderStages::COMPUTE, true),
                storage_entry(2, wgpu::ShaderStages::COMPUTE, true),
                storage_entry(3, wgpu::ShaderStages::COMPUTE, false),
            ],
        });
        let draw_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("draw columns BGL"),
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::VERTEX),
                storage_entry(1, wgpu::ShaderStages::VERTEX, true),
            ],
        });

        let cast_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("raycast.wgsl"),
            source: wgpu::ShaderSource::Wgsl(gpu.workgroup_size.specialize(RAYCAST_WGSL).into()),
        });
        let draw_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("columns.wgsl"),
            source: wgpu::ShaderSource::Wgsl(COLUMNS_WGSL.into()),
        });

        let cast_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("cast columns layout"),
            bind_group_layouts: &[&cast_layout],
            push_constant_ranges: &[],
        });
        let cast_pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("cast columns"),
            layout: Some(&cast_pipeline_layout),
            module: &cast_module,
            entry_point: Some("cast_columns"),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            cache: None,
        });

        let draw_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("draw columns layout"),
            bind_group_layouts: &[&draw_layout],
            push_constant_ranges: &[],
        });
        let draw_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("draw columns"),
            layout: Some(&draw_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &draw_module,
                entry_point: Some("vs_column"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &draw_module,
                entry_point: Some("fs_column"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: target_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let (cast_group, draw_group) =
            create_bind_groups(device, &cast_layout, &draw_layout, &uniforms, &cells, &materials, &columns);

        tracing::info!(
            adapter = %gpu.adapter_info,
            width = config.width,
            height = config.height,
            format = ?target_format,
            "device renderer ready"
        );

        Ok(Self {
            width: config.width,
            height: config.height,
            clear_color: config.clear_color,
            target_format,
            uniforms,
            cells,
            materials,
            columns,
            cast_layout,
            draw_layout,
            cast_pipeline,
            draw_pipeline,
            cast_group,
            draw_group,
            uploaded_grid: scene.grid().clone(),
            uploaded_palette: scene.palette().clone(),
            offscreen: None,
            framebuffer: FrameBuffer::new(config.width, config.height),
            gpu,
        })
    }

    pub fn gpu(&self) -> &GpuDevice {
        &self.gpu
    }

    pub fn target_format(&self) -> wgpu::TextureFormat {
        self.target_format
    }

    /// Upload a changed grid. Cells are widened to `u32` for the shader.
    pub fn update_map(&mut self, grid: &WorldGrid) {
        if *grid == self.uploaded_grid {
            return;
        }
        if grid.cells().len() == self.uploaded_grid.cells().len() {
            let cells: Vec<u32> = grid.cells().iter().map(|&c| c as u32).collect();
            self.gpu.queue.write_buffer(&self.cells, 0, bytemuck::cast_slice(&cells));
        } else {
            self.cells = create_cells_buffer(&self.gpu.device, grid);
            self.rebuild_bind_groups();
        }
        self.uploaded_grid = grid.clone();
        tracing::debug!(width = grid.width(), height = grid.height(), "map uploaded");
    }

    fn update_palette(&mut self, palette: &MaterialPalette) {
        if *palette == self.uploaded_palette {
            return;
        }
        if palette.len() == self.uploaded_palette.len() {
            self.gpu
                .queue
                .write_buffer(&self.materials, 0, bytemuck::cast_slice(palette.colors()));
        } else {
            self.materials = create_materials_buffer(&self.gpu.device, palette);
            self.rebuild_bind_groups();
        }
        self.uploaded_palette = palette.clone();
    }

    fn rebuild_bind_groups(&mut self) {
        let (cast_group, draw_group) = create_bind_groups(
            &self.gpu.device,
            &self.cast_layout,
            &self.draw_layout,
            &self.uniforms,
            &self.cells,
            &self.materials,
            &self.columns,
        );
        self.cast_group = cast_group;
        self.draw_group = draw_group;
    }

    /// Record the compute pass and the column draw into `encoder`, drawing
    /// to `target`. Any target size works: columns are placed in clip space.
    pub fn encode_frame(&mut self, scene: &Scene, target: &wgpu::TextureView, encoder: &mut wgpu::CommandEncoder) {
        self.update_map(scene.grid());
        self.update_palette(scene.palette());
        let uniforms = CameraUniforms::new(scene, self.width, self.height);
        self.gpu.queue.write_buffer(&self.uniforms, 0, bytemuck::bytes_of(&uniforms));

        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("cast columns"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.cast_pipeline);
            pass.set_bind_group(0, &self.cast_group, &[]);
            pass.dispatch_workgroups(self.gpu.workgroup_size.dispatch_size(self.width as u32), 1, 1);
        }

        let (r, g, b) = crate::framebuffer::unpack_rgb(self.clear_color);
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("draw columns"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color {
                        r: r as f64 / 255.0,
                        g: g as f64 / 255.0,
                        b: b as f64 / 255.0,
                        a: 1.0,
                    }),
                    store: wgpu::StoreOp::Store,
                },
            })],
            ..Default::default()
        });
        pass.set_pipeline(&self.draw_pipeline);
        pass.set_bind_group(0, &self.draw_group, &[]);
        pass.draw(0..6, 0..self.width as u32);
    }

    /// Column records from the most recent frame.
    pub fn read_columns(&self) -> Result<Vec<GpuColumn>, GpuError> {
        let size = self.columns.size();
        let staging = self.gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("columns readback"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("columns readback") });
        encoder.copy_buffer_to_buffer(&self.columns, 0, &staging, 0, size);
        self.gpu.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        map_blocking(&self.gpu, slice, "column buffer")?;
        let records = bytemuck::cast_slice::<u8, GpuColumn>(&slice.get_mapped_range()).to_vec();
        staging.unmap();
        Ok(records)
    }

    /// The offscreen target for the current size, reusing the last one when
    /// it still fits. The caller puts it back into `self.offscreen`.
    fn take_offscreen(&mut self) -> Result<Offscreen, GpuError> {
        if let Some(off) = self.offscreen.take() {
            let size = off.texture.size();
            if size.width as usize == self.width && size.height as usize == self.height {
                return Ok(off);
            }
        }
        if !matches!(
            self.target_format,
            wgpu::TextureFormat::Rgba8Unorm | wgpu::TextureFormat::Bgra8Unorm
        ) {
            return Err(GpuError::UnsupportedFormat(self.target_format));
        }

        let texture = self.gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("offscreen frame"),
            size: wgpu::Extent3d {
                width: self.width as u32,
                height: self.height as u32,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.target_format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let padded_row = padded_bytes_per_row(self.width as u32);
        let readback = self.gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("offscreen readback"),
            size: padded_row as u64 * self.height as u64,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Ok(Offscreen {
            texture,
            view,
            readback,
            padded_row,
        })
    }
}

impl Renderer for GpuRenderer {
    fn strategy(&self) -> Strategy {
        Strategy::Device
    }

    fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    fn resize(&mut self, width: usize, height: usize) {
        if (width, height) == (self.width, self.height) {
            return;
        }
        if width != self.width {
            self.columns = create_columns_buffer(&self.gpu.device, width);
        }
        self.width = width;
        self.height = height;
        self.rebuild_bind_groups();
        self.framebuffer.resize(width, height);
    }

    fn render_frame(&mut self, scene: &Scene) -> Result<&FrameBuffer, Error> {
        let off = self.take_offscreen()?;
        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("offscreen frame") });
        self.encode_frame(scene, &off.view, &mut encoder);
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &off.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &off.readback,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(off.padded_row),
                    rows_per_image: Some(self.height as u32),
                },
            },
            off.texture.size(),
        );
        self.gpu.queue.submit(std::iter::once(encoder.finish()));

        let result = self.unpack_readback(&off);
        self.offscreen = Some(off);
        result?;
        Ok(&self.framebuffer)
    }
}

impl GpuRenderer {
    fn unpack_readback(&mut self, off: &Offscreen) -> Result<(), GpuError> {
        let slice = off.readback.slice(..);
        map_blocking(&self.gpu, slice, "offscreen frame")?;
        {
            let bytes = slice.get_mapped_range();
            let bgra = self.target_format == wgpu::TextureFormat::Bgra8Unorm;
            for (row, line) in bytes.chunks_exact(off.padded_row as usize).enumerate() {
                for (column, px) in line.chunks_exact(4).take(self.width).enumerate() {
                    let color = if bgra {
                        pack_rgb(px[2], px[1], px[0])
                    } else {
                        pack_rgb(px[0], px[1], px[2])
                    };
                    self.framebuffer.set_pixel(column, row, color);
                }
            }
        }
        off.readback.unmap();
        Ok(())
    }
}

/// Row pitch for texture copies, rounded up to wgpu's copy alignment.
fn padded_bytes_per_row(width: u32) -> u32 {
    let unpadded = width * 4;
    unpadded.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT) * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT
}

/// Map `slice` for reading and wait for it.
fn map_blocking(gpu: &GpuDevice, slice: wgpu::BufferSlice<'_>, what: &'static str) -> Result<(), GpuError> {
    let (tx, rx) = mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |r| {
        let _ = tx.send(r);
    });
    let _ = gpu.device.poll(wgpu::Maintain::Wait);
    rx.recv()
        .map_err(|_| GpuError::ReadbackDropped(what))?
        .map_err(|source| GpuError::Readback { what, source })
}

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn storage_entry(binding: u32, visibility: wgpu::ShaderStages, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn create_cells_buffer(device: &wgpu::Device, grid: &WorldGrid) -> wgpu::Buffer {
    let cells: Vec<u32> = grid.cells().iter().map(|&c| c as u32).collect();
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("map cells"),
        contents: bytemuck::cast_slice(&cells),
        usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
    })
}

fn create_materials_buffer(device: &wgpu::Device, palette: &MaterialPalette) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("materials"),
        contents: bytemuck::cast_slice(palette.colors()),
        usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
    })
}

fn create_columns_buffer(device: &wgpu::Device, width: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("columns"),
        size: (width * std::mem::size_of::<GpuColumn>()) as u64,
        usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
        mapped_at_creation: false,
    })
}

fn create_bind_groups(
    device: &wgpu::Device,
    cast_layout: &wgpu::BindGroupLayout,
    draw_layout: &wgpu::BindGroupLayout,
    uniforms: &wgpu::Buffer,
    cells: &wgpu::Buffer,
    materials: &wgpu::Buffer,
    columns: &wgpu::Buffer,
) -> (wgpu::BindGroup, wgpu::BindGroup) {
    let cast = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("cast columns BG"),
        layout: cast_layout,
        entries: &[
            wgpu::BindGroupEntry { binding: 0, resource: uniforms.as_entire_binding() },
            wgpu::BindGroupEntry { binding: 1, resource: cells.as_entire_binding() },
            wgpu::BindGroupEntry { binding: 2, resource: materials.as_entire_binding() },
            wgpu::BindGroupEntry { binding: 3, resource: columns.as_entire_binding() },
        ],
    });
    let draw = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("draw columns BG"),
        layout: draw_layout,
        entries: &[
            wgpu::BindGroupEntry { binding: 0, resource: uniforms.as_entire_binding() },
            wgpu::BindGroupEntry { binding: 1, resource: columns.as_entire_binding() },
        ],
    });
    (cast, draw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shader_structs_match_wgsl_layout() {
        assert_eq!(std::mem::size_of::<CameraUniforms>(), 48);
        assert_eq!(std::mem::size_of::<GpuColumn>(), 16);
    }

    #[test]
    fn uniforms_follow_scene() {
        let scene = Scene::demo(66.0).unwrap();
        let u = CameraUniforms::new(&scene, 320, 200);
        assert_eq!(u.position, [22.0, 12.0]);
        assert_eq!(u.map_size, [24, 24]);
        assert_eq!(u.screen_size, [320, 200]);
    }

    #[test]
    fn compute_shader_is_specialized() {
        let source = crate::gpu::WorkgroupSize { x: 32 }.specialize(RAYCAST_WGSL);
        assert!(source.contains("@workgroup_size(32)"));
        assert!(!source.contains("{{"));
    }

    #[test]
    fn row_pitch_is_aligned() {
        assert_eq!(padded_bytes_per_row(1), 256);
        assert_eq!(padded_bytes_per_row(64), 256);
        assert_eq!(padded_bytes_per_row(65), 512);
        assert_eq!(padded_bytes_per_row(640), 2560);
    }
}
