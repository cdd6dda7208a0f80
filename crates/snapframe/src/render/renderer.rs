//! # Renderer — Drawing the Scene into a Frame Target
//!
//! The renderer owns everything that lives as long as the render thread: the
//! compiled program, the scene, one pipeline per drawable, and the uniform
//! buffer. [`Renderer::draw`] turns a pair of camera matrices into a filled
//! [`FrameTarget`].
//!
//! ## Per-Request Flow
//!
//! ```text
//! draw(camera, width, height)
//!   │
//!   ├─ 1. Frame target ─── fresh color + depth textures
//!   │
//!   ├─ 2. Uniforms ─── reset block, set projection + view once
//!   │     for each entry: set model + is_textured, copy block into slot i
//!   │     one write_buffer for all slots
//!   │
//!   ├─ 3. Render pass
//!   │     clear color + depth (1.0)
//!   │     for each entry: pipeline, uniform slot (dynamic offset),
//!   │     texture (or white), vertex + constant streams, draw
//!   │
//!   └─ 4. Submit
//! ```
//!
//! ## Uniform Slots
//!
//! Entries cannot share one uniform buffer region: every `write_buffer`
//! lands before the pass executes, so the last write would win for all
//! draws. Instead each entry gets its own slot in one buffer, at a stride
//! rounded up to `min_uniform_buffer_offset_alignment`, and the pass selects
//! it with a dynamic offset.
//!
//! Because the block is reset at the start of every request and every member
//! is set explicitly, no value carries over from one request to the next.

use crate::camera::CameraMatrices;
use crate::config::RenderConfig;
use crate::error::StartupError;
use crate::render3d::mesh::LayoutError;
use crate::render3d::scene::{Drawable, Scene, SceneError};
use crate::render3d::texture::Texture;
use crate::shader::{Program, ShaderError, UniformKind};

use super::frame::{COLOR_FORMAT, DEPTH_FORMAT, FrameError, FrameTarget, RawFrame};
use super::GpuContext;

/// Matrices every program must declare.
const REQUIRED_MATRICES: [&str; 3] = ["projection", "view", "model"];
/// Flag selecting texture sampling over vertex color. Optional.
const TEXTURED_FLAG: &str = "is_textured";

pub struct Renderer {
    program: Program,
    scene: Scene,
    pipelines: Vec<wgpu::RenderPipeline>,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    uniform_stride: u32,
    /// Per entry; empty when the program samples no texture.
    texture_bind_groups: Vec<wgpu::BindGroup>,
    clear_color: wgpu::Color,
}

impl Renderer {
    pub fn new(
        gpu: &GpuContext,
        program: Program,
        scene: Scene,
        config: &RenderConfig,
    ) -> Result<Self, StartupError> {
        let block = program
            .interface()
            .uniforms
            .as_ref()
            .ok_or_else(|| ShaderError::UnknownUniform(REQUIRED_MATRICES[0].to_owned()))?;
        for name in REQUIRED_MATRICES {
            let member = block
                .member(name)
                .ok_or_else(|| ShaderError::UnknownUniform(name.to_owned()))?;
            if member.kind != UniformKind::Mat4 {
                return Err(ShaderError::UniformType {
                    name: name.to_owned(),
                    expected: "mat4x4<f32>",
                    found: member.kind,
                }
                .into());
            }
        }
        if block.member(TEXTURED_FLAG).is_none() {
            log::trace!("program has no `{TEXTURED_FLAG}` uniform; entries draw untextured");
        }

        let device = gpu.device();
        let align = device.limits().min_uniform_buffer_offset_alignment;
        let uniform_stride = block.size.div_ceil(align) * align;
        let slots = scene.len().max(1) as u64;

        let white = Texture::white(gpu)?;
        let (built, error) = gpu.scoped(|| {
            let pipelines: Vec<_> = scene
                .entries()
                .iter()
                .map(|entry| create_pipeline(device, &program, &entry.name, &entry.drawable))
                .collect();

            let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("scene uniforms"),
                size: u64::from(uniform_stride) * slots,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("scene uniforms"),
                layout: program.uniform_layout(),
                entries: &[wgpu::BindGroupEntry {
                    binding: block.binding,
                    resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                        buffer: &uniform_buffer,
                        offset: 0,
                        size: wgpu::BufferSize::new(u64::from(block.size)),
                    }),
                }],
            });

            let texture_slot = &program.interface().texture;
            let texture_bind_groups = match (program.texture_layout(), texture_slot) {
                (Some(layout), Some(slot)) => scene
                    .entries()
                    .iter()
                    .map(|entry| {
                        let texture = entry.drawable.texture().unwrap_or(&white);
                        device.create_bind_group(&wgpu::BindGroupDescriptor {
                            label: Some(entry.name.as_str()),
                            layout,
                            entries: &[
                                wgpu::BindGroupEntry {
                                    binding: slot.texture_binding,
                                    resource: wgpu::BindingResource::TextureView(texture.view()),
                                },
                                wgpu::BindGroupEntry {
                                    binding: slot.sampler_binding,
                                    resource: wgpu::BindingResource::Sampler(texture.sampler()),
                                },
                            ],
                        })
                    })
                    .collect(),
                _ => Vec::new(),
            };

            (pipelines, uniform_buffer, uniform_bind_group, texture_bind_groups)
        });
        if let Some(err) = error {
            return Err(LayoutError::Pipeline(err.to_string()).into());
        }
        let (pipelines, uniform_buffer, uniform_bind_group, texture_bind_groups) = built;

        let [r, g, b, a] = config.clear_color;
        log::info!(
            "renderer ready: {} entries, uniform stride {uniform_stride} bytes",
            scene.len()
        );

        Ok(Self {
            program,
            scene,
            pipelines,
            uniform_buffer,
            uniform_bind_group,
            uniform_stride,
            texture_bind_groups,
            clear_color: wgpu::Color { r, g, b, a },
        })
    }

    /// Switch texture sampling for the named entry, effective from the next
    /// draw. Entries cannot be added once the renderer is built, since
    /// pipelines and uniform slots are sized for the scene it was given.
    pub fn set_textured(&mut self, name: &str, textured: bool) -> Result<(), SceneError> {
        self.scene.set_textured(name, textured)
    }

    /// Draw the scene and read the result back.
    pub fn render(
        &mut self,
        gpu: &GpuContext,
        camera: &CameraMatrices,
        width: u32,
        height: u32,
    ) -> Result<RawFrame, FrameError> {
        self.draw(gpu, camera, width, height)?.read_pixels(gpu)
    }

    pub fn draw(
        &mut self,
        gpu: &GpuContext,
        camera: &CameraMatrices,
        width: u32,
        height: u32,
    ) -> Result<FrameTarget, FrameError> {
        let target = FrameTarget::create(gpu, width, height)?;

        // ── Uniform slots ───────────────────────────────────────────────
        let stride = self.uniform_stride as usize;
        let mut slots = vec![0u8; stride * self.scene.len()];
        self.program.reset();
        self.program.set_matrix("projection", &camera.projection)?;
        self.program.set_matrix("view", &camera.view)?;
        for (i, entry) in self.scene.entries().iter().enumerate() {
            self.program.set_matrix("model", &entry.model)?;
            match self.program.set_bool(TEXTURED_FLAG, entry.textured) {
                Err(ShaderError::UnknownUniform(_)) => {
                    log::trace!("skipping `{TEXTURED_FLAG}` for `{}`", entry.name);
                }
                other => other?,
            }
            let bytes = self.program.uniform_bytes();
            slots[i * stride..i * stride + bytes.len()].copy_from_slice(bytes);
        }

        let ((), error) = gpu.scoped(|| {
            if !slots.is_empty() {
                gpu.queue().write_buffer(&self.uniform_buffer, 0, &slots);
            }

            let mut encoder = gpu
                .device()
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("scene encoder"),
                });
            {
                let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("scene pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: target.color_view(),
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(self.clear_color),
                            store: wgpu::StoreOp::Store,
                        },
                        depth_slice: None,
                    })],
                    depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                        view: target.depth_view(),
                        depth_ops: Some(wgpu::Operations {
                            load: wgpu::LoadOp::Clear(1.0),
                            store: wgpu::StoreOp::Discard,
                        }),
                        stencil_ops: None,
                    }),
                    timestamp_writes: None,
                    occlusion_query_set: None,
                });

                for (i, entry) in self.scene.entries().iter().enumerate() {
                    let drawable = &entry.drawable;
                    pass.set_pipeline(&self.pipelines[i]);
                    let offset = i as u32 * self.uniform_stride;
                    pass.set_bind_group(0, &self.uniform_bind_group, &[offset]);
                    if let Some(group) = self.texture_bind_groups.get(i) {
                        pass.set_bind_group(1, group, &[]);
                    }
                    pass.set_vertex_buffer(0, drawable.mesh().buffer().slice(..));
                    if let Some(constants) = drawable.constants() {
                        pass.set_vertex_buffer(1, constants.slice(..));
                    }
                    pass.draw(0..drawable.mesh().vertex_count(), 0..1);
                }
            }
            gpu.queue().submit(std::iter::once(encoder.finish()));
        });
        if let Some(err) = error {
            return Err(err.into());
        }

        log::debug!("drew {} entries into {width}x{height}", self.scene.len());
        Ok(target)
    }
}

fn create_pipeline(
    device: &wgpu::Device,
    program: &Program,
    label: &str,
    drawable: &Drawable,
) -> wgpu::RenderPipeline {
    let buffers = drawable.binding().buffer_layouts();
    let interface = program.interface();
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(program.pipeline_layout()),
        vertex: wgpu::VertexState {
            module: program.vertex_module(),
            entry_point: Some(interface.vertex_entry.as_str()),
            buffers: &buffers,
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: program.fragment_module(),
            entry_point: Some(interface.fragment_entry.as_str()),
            targets: &[Some(wgpu::ColorTargetState {
                format: COLOR_FORMAT,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            // Both sides of the triangle are visible.
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}
