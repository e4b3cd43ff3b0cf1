//! Main renderer orchestrating everything

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use wgpu::util::DeviceExt;
use winit::window::Window;

use nimbus_raster::{SplatUniforms, QUAD_VERTICES, TEXTURE_WIDTH};
use nimbus_scene::{CovarianceTexture, SplatOrder};

use crate::camera::OrbitCamera;
use crate::pipeline::SplatPipeline;

/// GPU-side state for the currently bound scene.
struct SceneBinding {
    bind_group: wgpu::BindGroup,
    /// Sorted splat indices; replaced wholesale on each accepted sort.
    order_buffer: Option<wgpu::Buffer>,
    visible: u32,
    total: u32,
    // Keep the texture alive for the bind group's lifetime.
    _texture: wgpu::Texture,
}

pub struct Renderer {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,

    pipeline: SplatPipeline,
    uniform_buffer: wgpu::Buffer,
    quad_buffer: wgpu::Buffer,

    scene: Option<SceneBinding>,
    backend: wgpu::Backend,
}

impl Renderer {
    pub async fn new(window: Arc<Window>) -> Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance
            .create_surface(Arc::clone(&window))
            .context("creating window surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| anyhow!("no compatible GPU adapter found"))?;
        let backend = adapter.get_info().backend;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Nimbus Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await
            .context("requesting GPU device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .unwrap_or(surface_caps.formats[0]);

        // Under blending needs the destination alpha to survive composition.
        let alpha_mode = if surface_caps
            .alpha_modes
            .contains(&wgpu::CompositeAlphaMode::PreMultiplied)
        {
            wgpu::CompositeAlphaMode::PreMultiplied
        } else {
            tracing::warn!(
                modes = ?surface_caps.alpha_modes,
                "premultiplied surface alpha unavailable, composition may differ"
            );
            surface_caps.alpha_modes[0]
        };

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        tracing::info!(
            backend = ?backend,
            format = ?surface_format,
            alpha = ?alpha_mode,
            "renderer initialized at {}x{}",
            config.width,
            config.height
        );

        let pipeline = SplatPipeline::new(&device, surface_format);

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Splat Uniforms"),
            size: SplatUniforms::SIZE as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let quad_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Splat Quad"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });

        Ok(Self {
            surface,
            device,
            queue,
            config,
            pipeline,
            uniform_buffer,
            quad_buffer,
            scene: None,
            backend,
        })
    }

    pub fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
        }
    }

    /// Bind a freshly generated covariance texture; replaces any previous
    /// scene. An empty texture unbinds the scene.
    pub fn install_texture(&mut self, texture: &CovarianceTexture) {
        if texture.height == 0 {
            self.scene = None;
            return;
        }

        let gpu_texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Covariance Texture"),
            size: wgpu::Extent3d {
                width: texture.width,
                height: texture.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba32Uint,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        self.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &gpu_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bytemuck::cast_slice(&texture.data),
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(TEXTURE_WIDTH * 16),
                rows_per_image: Some(texture.height),
            },
            wgpu::Extent3d {
                width: texture.width,
                height: texture.height,
                depth_or_array_layers: 1,
            },
        );

        let view = gpu_texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Splat Bind Group"),
            layout: &self.pipeline.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
            ],
        });

        // Counts arrive with the first sorted order.
        self.scene = Some(SceneBinding {
            bind_group,
            order_buffer: None,
            visible: 0,
            total: 0,
            _texture: gpu_texture,
        });
    }

    /// Upload a sorted order; the previous buffer is dropped.
    pub fn apply_order(&mut self, order: &SplatOrder) {
        let Some(scene) = &mut self.scene else {
            return;
        };
        scene.total = order.total;
        scene.visible = order.visible;
        scene.order_buffer = if order.indices.is_empty() {
            None
        } else {
            Some(
                self.device
                    .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some("Splat Order"),
                        contents: bytemuck::cast_slice(&order.indices),
                        usage: wgpu::BufferUsages::VERTEX,
                    }),
            )
        };
    }

    pub fn render(&mut self, camera: &OrbitCamera) -> Result<()> {
        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let (width, height) = (self.config.width, self.config.height);
        let uniforms = SplatUniforms {
            projection: camera.projection_matrix(width, height).to_cols_array_2d(),
            view: camera.view_matrix().to_cols_array_2d(),
            focal: camera.focal(height).to_array(),
            viewport: [width as f32, height as f32],
        };
        self.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Splat Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        // Under blending needs both color and alpha at zero.
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            if let Some(scene) = &self.scene {
                if let (Some(order_buffer), true) = (&scene.order_buffer, scene.visible > 0) {
                    pass.set_pipeline(&self.pipeline.pipeline);
                    pass.set_bind_group(0, &scene.bind_group, &[]);
                    pass.set_vertex_buffer(0, self.quad_buffer.slice(..));
                    pass.set_vertex_buffer(1, order_buffer.slice(..));
                    pass.draw(0..4, 0..scene.visible);
                }
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }

    /// User-visible status line for the window title.
    pub fn status(&self) -> String {
        match &self.scene {
            Some(scene) => format!(
                "{} splats [{:?}] | {} visible",
                scene.total, self.backend, scene.visible
            ),
            None => format!("no scene [{:?}]", self.backend),
        }
    }
}
