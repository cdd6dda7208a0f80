//! Shader reflection with naga.
//!
//! Everything here is CPU-only: parse, validate, walk the module for entry
//! point varyings and resource bindings, then link the two stages.

use naga::valid::{Capabilities, ValidationFlags, Validator};

use super::{ShaderError, Stage};

/// A named vertex shader input the mesh layout binds against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexInput {
    pub name: String,
    pub location: u32,
    /// Number of `f32` components (1–4).
    pub components: u32,
}

impl VertexInput {
    pub fn format(&self) -> wgpu::VertexFormat {
        match self.components {
            1 => wgpu::VertexFormat::Float32,
            2 => wgpu::VertexFormat::Float32x2,
            3 => wgpu::VertexFormat::Float32x3,
            _ => wgpu::VertexFormat::Float32x4,
        }
    }
}

/// Type of a uniform block member, as far as the setters care.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformKind {
    Mat4,
    F32,
    U32,
    I32,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformMember {
    pub name: String,
    /// Byte offset inside the block.
    pub offset: u32,
    pub kind: UniformKind,
}

/// Byte layout of the program's `var<uniform>` struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformBlockLayout {
    pub group: u32,
    pub binding: u32,
    /// Size in bytes, including trailing padding.
    pub size: u32,
    pub members: Vec<UniformMember>,
}

impl UniformBlockLayout {
    pub fn member(&self, name: &str) -> Option<&UniformMember> {
        self.members.iter().find(|m| m.name == name)
    }
}

/// Bind group slots of the program's texture and its sampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureSlot {
    pub group: u32,
    pub texture_binding: u32,
    pub sampler_binding: u32,
}

/// The linked interface of a vertex + fragment program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramInterface {
    pub vertex_entry: String,
    pub fragment_entry: String,
    pub vertex_inputs: Vec<VertexInput>,
    pub uniforms: Option<UniformBlockLayout>,
    pub texture: Option<TextureSlot>,
}

impl ProgramInterface {
    /// Compile both stages on the CPU and link their interfaces.
    pub fn reflect(vertex_source: &str, fragment_source: &str) -> Result<Self, ShaderError> {
        let vertex = reflect_stage(vertex_source, Stage::Vertex)?;
        let fragment = reflect_stage(fragment_source, Stage::Fragment)?;
        link(vertex, fragment)
    }

    pub fn input(&self, name: &str) -> Option<&VertexInput> {
        self.vertex_inputs.iter().find(|i| i.name == name)
    }

    pub fn uniform(&self, name: &str) -> Option<&UniformMember> {
        self.uniforms.as_ref().and_then(|block| block.member(name))
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Varying {
    name: String,
    location: u32,
    components: u32,
    scalar: naga::ScalarKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ResourceSlot {
    group: u32,
    binding: u32,
}

#[derive(Debug)]
struct StageInterface {
    entry_point: String,
    inputs: Vec<Varying>,
    outputs: Vec<Varying>,
    uniforms: Option<UniformBlockLayout>,
    textures: Vec<ResourceSlot>,
    samplers: Vec<ResourceSlot>,
}

fn reflect_stage(source: &str, stage: Stage) -> Result<StageInterface, ShaderError> {
    let module = naga::front::wgsl::parse_str(source).map_err(|err| ShaderError::Compilation {
        stage,
        diagnostic: err.emit_to_string(source),
    })?;

    Validator::new(ValidationFlags::all(), Capabilities::all())
        .validate(&module)
        .map_err(|err| ShaderError::Compilation {
            stage,
            diagnostic: err.emit_to_string(source),
        })?;

    let naga_stage = match stage {
        Stage::Vertex => naga::ShaderStage::Vertex,
        Stage::Fragment => naga::ShaderStage::Fragment,
    };
    let mut candidates = module.entry_points.iter().filter(|ep| ep.stage == naga_stage);
    let entry = match (candidates.next(), candidates.next()) {
        (Some(entry), None) => entry,
        (None, _) => {
            return Err(ShaderError::Link(format!(
                "{stage} source has no @{stage} entry point"
            )));
        }
        (Some(_), Some(_)) => {
            return Err(ShaderError::Link(format!(
                "{stage} source has more than one @{stage} entry point"
            )));
        }
    };

    let mut inputs = Vec::new();
    for arg in &entry.function.arguments {
        collect_varyings(&module, arg.name.as_deref(), arg.ty, arg.binding.as_ref(), &mut inputs)?;
    }
    let mut outputs = Vec::new();
    if let Some(result) = &entry.function.result {
        collect_varyings(&module, None, result.ty, result.binding.as_ref(), &mut outputs)?;
    }

    let mut uniforms = None;
    let mut textures = Vec::new();
    let mut samplers = Vec::new();
    for (_, var) in module.global_variables.iter() {
        let Some(binding) = var.binding.as_ref() else {
            continue;
        };
        let slot = ResourceSlot {
            group: binding.group,
            binding: binding.binding,
        };
        let inner = &module.types[var.ty].inner;
        match var.space {
            naga::AddressSpace::Uniform => {
                if uniforms.is_some() {
                    return Err(ShaderError::Link(format!(
                        "{stage} source declares more than one uniform block"
                    )));
                }
                uniforms = Some(uniform_layout(&module, var.name.as_deref(), inner, slot)?);
            }
            naga::AddressSpace::Handle => match inner {
                naga::TypeInner::Image { .. } => textures.push(slot),
                naga::TypeInner::Sampler { .. } => samplers.push(slot),
                _ => {}
            },
            _ => {}
        }
    }

    Ok(StageInterface {
        entry_point: entry.name.clone(),
        inputs,
        outputs,
        uniforms,
        textures,
        samplers,
    })
}

/// Flatten an entry point argument or result into located varyings. Struct
/// arguments contribute one varying per located member; builtins are skipped.
fn collect_varyings(
    module: &naga::Module,
    name: Option<&str>,
    ty: naga::Handle<naga::Type>,
    binding: Option<&naga::Binding>,
    out: &mut Vec<Varying>,
) -> Result<(), ShaderError> {
    match binding {
        Some(naga::Binding::Location { location, .. }) => {
            let name = name.unwrap_or_default().to_owned();
            let (components, scalar) = match module.types[ty].inner {
                naga::TypeInner::Scalar(scalar) if scalar.width == 4 => (1, scalar.kind),
                naga::TypeInner::Vector { size, scalar } if scalar.width == 4 => {
                    (size as u32, scalar.kind)
                }
                _ => {
                    return Err(ShaderError::Link(format!(
                        "varying `{name}` at location {location} is not a 32-bit scalar or vector"
                    )));
                }
            };
            out.push(Varying {
                name,
                location: *location,
                components,
                scalar,
            });
        }
        Some(naga::Binding::BuiltIn(_)) => {}
        None => {
            if let naga::TypeInner::Struct { members, .. } = &module.types[ty].inner {
                for member in members {
                    collect_varyings(
                        module,
                        member.name.as_deref(),
                        member.ty,
                        member.binding.as_ref(),
                        out,
                    )?;
                }
            }
        }
    }
    Ok(())
}

fn uniform_layout(
    module: &naga::Module,
    var_name: Option<&str>,
    inner: &naga::TypeInner,
    slot: ResourceSlot,
) -> Result<UniformBlockLayout, ShaderError> {
    let naga::TypeInner::Struct { members, span } = inner else {
        return Err(ShaderError::Link(format!(
            "uniform `{}` must be a struct",
            var_name.unwrap_or("?")
        )));
    };

    let members = members
        .iter()
        .map(|member| UniformMember {
            name: member.name.clone().unwrap_or_default(),
            offset: member.offset,
            kind: uniform_kind(&module.types[member.ty].inner),
        })
        .collect();

    Ok(UniformBlockLayout {
        group: slot.group,
        binding: slot.binding,
        size: *span,
        members,
    })
}

fn uniform_kind(inner: &naga::TypeInner) -> UniformKind {
    match *inner {
        naga::TypeInner::Matrix {
            columns: naga::VectorSize::Quad,
            rows: naga::VectorSize::Quad,
            scalar,
        } if scalar == naga::Scalar::F32 => UniformKind::Mat4,
        naga::TypeInner::Scalar(scalar) if scalar == naga::Scalar::F32 => UniformKind::F32,
        naga::TypeInner::Scalar(scalar) if scalar == naga::Scalar::U32 => UniformKind::U32,
        naga::TypeInner::Scalar(scalar) if scalar == naga::Scalar::I32 => UniformKind::I32,
        _ => UniformKind::Other,
    }
}

fn link(vertex: StageInterface, fragment: StageInterface) -> Result<ProgramInterface, ShaderError> {
    for input in &fragment.inputs {
        let Some(output) = vertex.outputs.iter().find(|o| o.location == input.location) else {
            return Err(ShaderError::Link(format!(
                "fragment input `{}` at location {} is not written by the vertex stage",
                input.name, input.location
            )));
        };
        if output.components != input.components || output.scalar != input.scalar {
            return Err(ShaderError::Link(format!(
                "location {} is {}x{:?} in the vertex stage but {}x{:?} in the fragment stage",
                input.location, output.components, output.scalar, input.components, input.scalar
            )));
        }
    }

    let uniforms = match (vertex.uniforms, fragment.uniforms) {
        (Some(v), Some(f)) if v != f => {
            return Err(ShaderError::Link(
                "uniform block differs between the vertex and fragment stages".into(),
            ));
        }
        (Some(v), _) => Some(v),
        (None, f) => f,
    };

    let mut textures = vertex.textures;
    textures.extend(fragment.textures);
    textures.dedup();
    let mut samplers = vertex.samplers;
    samplers.extend(fragment.samplers);
    samplers.dedup();

    let texture = match (textures.as_slice(), samplers.as_slice()) {
        ([], []) => None,
        ([texture], [sampler]) if texture.group == sampler.group => Some(TextureSlot {
            group: texture.group,
            texture_binding: texture.binding,
            sampler_binding: sampler.binding,
        }),
        _ => {
            return Err(ShaderError::Link(format!(
                "expected at most one texture and one sampler in the same group, found {} textures and {} samplers",
                textures.len(),
                samplers.len()
            )));
        }
    };

    let mut vertex_inputs: Vec<VertexInput> = Vec::with_capacity(vertex.inputs.len());
    for input in vertex.inputs {
        if input.scalar != naga::ScalarKind::Float {
            return Err(ShaderError::Link(format!(
                "vertex input `{}` must be floating point",
                input.name
            )));
        }
        if vertex_inputs.iter().any(|i| i.name == input.name) {
            return Err(ShaderError::Link(format!(
                "vertex input `{}` is declared twice",
                input.name
            )));
        }
        vertex_inputs.push(VertexInput {
            name: input.name,
            location: input.location,
            components: input.components,
        });
    }

    Ok(ProgramInterface {
        vertex_entry: vertex.entry_point,
        fragment_entry: fragment.entry_point,
        vertex_inputs,
        uniforms,
        texture,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::{SCENE_FRAGMENT_SHADER, SCENE_VERTEX_SHADER};

    const PLAIN_VERTEX: &str = r#"
        struct Out {
            @builtin(position) pos: vec4<f32>,
            @location(0) color: vec3<f32>,
        }
        @vertex
        fn vs_main(@location(0) in_vert: vec3<f32>, @location(1) in_color: vec3<f32>) -> Out {
            var out: Out;
            out.pos = vec4<f32>(in_vert, 1.0);
            out.color = in_color;
            return out;
        }
    "#;

    const PLAIN_FRAGMENT: &str = r#"
        @fragment
        fn fs_main(@location(0) color: vec3<f32>) -> @location(0) vec4<f32> {
            return vec4<f32>(color, 1.0);
        }
    "#;

    #[test]
    fn scene_program_interface() {
        let iface = ProgramInterface::reflect(SCENE_VERTEX_SHADER, SCENE_FRAGMENT_SHADER).unwrap();
        assert_eq!(iface.vertex_entry, "vs_main");
        assert_eq!(iface.fragment_entry, "fs_main");

        let names: Vec<_> = iface.vertex_inputs.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["in_position", "in_color", "in_texcoord"]);
        assert_eq!(iface.input("in_texcoord").unwrap().components, 2);

        let block = iface.uniforms.as_ref().unwrap();
        assert_eq!((block.group, block.binding), (0, 0));
        assert_eq!(block.size, 208);
        assert_eq!(iface.uniform("projection").unwrap().offset, 0);
        assert_eq!(iface.uniform("view").unwrap().offset, 64);
        assert_eq!(iface.uniform("model").unwrap().offset, 128);
        let flag = iface.uniform("is_textured").unwrap();
        assert_eq!((flag.offset, flag.kind), (192, UniformKind::U32));

        assert_eq!(
            iface.texture,
            Some(TextureSlot {
                group: 1,
                texture_binding: 0,
                sampler_binding: 1,
            })
        );
    }

    #[test]
    fn program_without_uniforms_or_textures_links() {
        let iface = ProgramInterface::reflect(PLAIN_VERTEX, PLAIN_FRAGMENT).unwrap();
        assert!(iface.uniforms.is_none());
        assert!(iface.texture.is_none());
        assert_eq!(iface.input("in_vert").unwrap().location, 0);
    }

    #[test]
    fn syntax_error_reports_stage_and_diagnostic() {
        let broken = "@fragment fn fs_main( -> @location(0) vec4<f32> { }";
        let err = ProgramInterface::reflect(PLAIN_VERTEX, broken).unwrap_err();
        match err {
            ShaderError::Compilation { stage, diagnostic } => {
                assert_eq!(stage, Stage::Fragment);
                assert!(!diagnostic.is_empty());
            }
            other => panic!("expected a compilation error, got {other:?}"),
        }
    }

    #[test]
    fn type_error_is_a_compilation_error() {
        let broken = r#"
            @vertex
            fn vs_main(@location(0) p: vec3<f32>) -> @builtin(position) vec4<f32> {
                return p;
            }
        "#;
        let err = ProgramInterface::reflect(broken, PLAIN_FRAGMENT).unwrap_err();
        assert!(matches!(err, ShaderError::Compilation { stage: Stage::Vertex, .. }));
    }

    #[test]
    fn unmatched_fragment_input_fails_to_link() {
        let fragment = r#"
            @fragment
            fn fs_main(@location(3) uv: vec2<f32>) -> @location(0) vec4<f32> {
                return vec4<f32>(uv, 0.0, 1.0);
            }
        "#;
        let err = ProgramInterface::reflect(PLAIN_VERTEX, fragment).unwrap_err();
        assert!(matches!(err, ShaderError::Link(msg) if msg.contains("location 3")));
    }

    #[test]
    fn varying_type_mismatch_fails_to_link() {
        let fragment = r#"
            @fragment
            fn fs_main(@location(0) color: vec4<f32>) -> @location(0) vec4<f32> {
                return color;
            }
        "#;
        let err = ProgramInterface::reflect(PLAIN_VERTEX, fragment).unwrap_err();
        assert!(matches!(err, ShaderError::Link(_)));
    }

    #[test]
    fn disagreeing_uniform_blocks_fail_to_link() {
        let vertex = r#"
            struct U { model: mat4x4<f32> }
            @group(0) @binding(0) var<uniform> u: U;
            @vertex
            fn vs_main(@location(0) p: vec3<f32>) -> @builtin(position) vec4<f32> {
                return u.model * vec4<f32>(p, 1.0);
            }
        "#;
        let fragment = r#"
            struct U { tint: vec4<f32> }
            @group(0) @binding(0) var<uniform> u: U;
            @fragment
            fn fs_main() -> @location(0) vec4<f32> {
                return u.tint;
            }
        "#;
        let err = ProgramInterface::reflect(vertex, fragment).unwrap_err();
        assert!(matches!(err, ShaderError::Link(msg) if msg.contains("uniform block")));
    }

    #[test]
    fn missing_entry_point_fails_to_link() {
        let err = ProgramInterface::reflect(PLAIN_FRAGMENT, PLAIN_FRAGMENT).unwrap_err();
        assert!(matches!(err, ShaderError::Link(msg) if msg.contains("@vertex")));
    }

    #[test]
    fn vertex_formats_follow_component_count() {
        let input = VertexInput {
            name: "in_texcoord".into(),
            location: 2,
            components: 2,
        };
        assert_eq!(input.format(), wgpu::VertexFormat::Float32x2);
    }
}
