use glam::Mat4;

use super::{ProgramInterface, ShaderError, UniformBlock};
use crate::render::GpuContext;

/// Bind group index of the uniform block.
pub(crate) const UNIFORM_GROUP: u32 = 0;
/// Bind group index of the texture + sampler pair.
pub(crate) const TEXTURE_GROUP: u32 = 1;

/// A compiled and linked vertex + fragment program.
///
/// Owns the shader modules, the bind group layouts derived from reflection,
/// and the CPU-side uniform block that [`set_matrix`](Self::set_matrix) and
/// [`set_bool`](Self::set_bool) write into.
pub struct Program {
    interface: ProgramInterface,
    vertex_module: wgpu::ShaderModule,
    fragment_module: wgpu::ShaderModule,
    uniform_layout: wgpu::BindGroupLayout,
    texture_layout: Option<wgpu::BindGroupLayout>,
    pipeline_layout: wgpu::PipelineLayout,
    uniforms: Option<UniformBlock>,
}

impl Program {
    pub fn compile(
        gpu: &GpuContext,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<Self, ShaderError> {
        let interface = ProgramInterface::reflect(vertex_source, fragment_source)?;

        if let Some(block) = &interface.uniforms
            && block.group != UNIFORM_GROUP
        {
            return Err(ShaderError::Link(format!(
                "uniform block must be bound at @group({UNIFORM_GROUP}), found @group({})",
                block.group
            )));
        }
        if let Some(slot) = &interface.texture
            && slot.group != TEXTURE_GROUP
        {
            return Err(ShaderError::Link(format!(
                "texture must be bound at @group({TEXTURE_GROUP}), found @group({})",
                slot.group
            )));
        }

        let device = gpu.device();
        let (built, error) = gpu.scoped(|| {
            let vertex_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("scene vertex stage"),
                source: wgpu::ShaderSource::Wgsl(vertex_source.into()),
            });
            let fragment_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("scene fragment stage"),
                source: wgpu::ShaderSource::Wgsl(fragment_source.into()),
            });

            let uniform_entries: Vec<_> = interface
                .uniforms
                .iter()
                .map(|block| wgpu::BindGroupLayoutEntry {
                    binding: block.binding,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        // One slot per drawable in a shared buffer.
                        has_dynamic_offset: true,
                        min_binding_size: wgpu::BufferSize::new(u64::from(block.size)),
                    },
                    count: None,
                })
                .collect();
            let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("uniform layout"),
                entries: &uniform_entries,
            });

            let texture_layout = interface.texture.map(|slot| {
                device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("texture layout"),
                    entries: &[
                        wgpu::BindGroupLayoutEntry {
                            binding: slot.texture_binding,
                            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                            ty: wgpu::BindingType::Texture {
                                multisampled: false,
                                view_dimension: wgpu::TextureViewDimension::D2,
                                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            },
                            count: None,
                        },
                        wgpu::BindGroupLayoutEntry {
                            binding: slot.sampler_binding,
                            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                            count: None,
                        },
                    ],
                })
            });

            let mut group_layouts = vec![&uniform_layout];
            group_layouts.extend(texture_layout.as_ref());
            let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("scene pipeline layout"),
                bind_group_layouts: &group_layouts,
                push_constant_ranges: &[],
            });

            (
                vertex_module,
                fragment_module,
                uniform_layout,
                texture_layout,
                pipeline_layout,
            )
        });
        if let Some(err) = error {
            return Err(ShaderError::Link(err.to_string()));
        }
        let (vertex_module, fragment_module, uniform_layout, texture_layout, pipeline_layout) =
            built;

        log::info!(
            "compiled program: {} vertex inputs, {} uniforms, textured: {}",
            interface.vertex_inputs.len(),
            interface.uniforms.as_ref().map_or(0, |b| b.members.len()),
            interface.texture.is_some()
        );

        let uniforms = interface.uniforms.clone().map(UniformBlock::new);
        Ok(Self {
            interface,
            vertex_module,
            fragment_module,
            uniform_layout,
            texture_layout,
            pipeline_layout,
            uniforms,
        })
    }

    pub fn interface(&self) -> &ProgramInterface {
        &self.interface
    }

    pub fn set_matrix(&mut self, name: &str, value: &Mat4) -> Result<(), ShaderError> {
        self.block_mut(name)?.set_matrix(name, value)
    }

    pub fn set_bool(&mut self, name: &str, value: bool) -> Result<(), ShaderError> {
        self.block_mut(name)?.set_bool(name, value)
    }

    /// Zero the whole uniform block.
    pub fn reset(&mut self) {
        if let Some(block) = &mut self.uniforms {
            block.reset();
        }
    }

    /// Current contents of the uniform block (empty if there is none).
    pub fn uniform_bytes(&self) -> &[u8] {
        self.uniforms.as_ref().map_or(&[], |b| b.bytes())
    }

    pub(crate) fn vertex_module(&self) -> &wgpu::ShaderModule {
        &self.vertex_module
    }

    pub(crate) fn fragment_module(&self) -> &wgpu::ShaderModule {
        &self.fragment_module
    }

    pub(crate) fn uniform_layout(&self) -> &wgpu::BindGroupLayout {
        &self.uniform_layout
    }

    pub(crate) fn texture_layout(&self) -> Option<&wgpu::BindGroupLayout> {
        self.texture_layout.as_ref()
    }

    pub(crate) fn pipeline_layout(&self) -> &wgpu::PipelineLayout {
        &self.pipeline_layout
    }

    fn block_mut(&mut self, name: &str) -> Result<&mut UniformBlock, ShaderError> {
        self.uniforms
            .as_mut()
            .ok_or_else(|| ShaderError::UnknownUniform(name.to_owned()))
    }
}
