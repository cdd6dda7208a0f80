//! # Mesh — Vertex Buffers and Their Binding to a Program
//!
//! A mesh is a flat `f32` array made of fixed-width records, one per vertex,
//! plus a [`VertexLayout`] saying which columns of a record feed which named
//! shader input. The two meshes of the default scene look like this:
//!
//! ```text
//! triangle (stride 6)           cube (stride 8)
//! ┌──────────┬──────────┐       ┌──────────┬──────────┬──────────┐
//! │ position │ color    │       │ texcoord │ normal   │ position │
//! │ cols 0-2 │ cols 3-5 │       │ cols 0-1 │ cols 2-4 │ cols 5-7 │
//! └──────────┴──────────┘       └──────────┴──────────┴──────────┘
//!  in_position  in_color         in_texcoord  (skipped)  in_position
//! ```
//!
//! Columns no attribute names are skipped, the way the cube's normals are.
//!
//! ## Binding
//!
//! [`Mesh::bind`] matches the layout against the program's reflected inputs
//! once, at startup. Naming an input the program does not declare, or giving
//! it the wrong width, fails right there instead of producing garbage at draw
//! time.
//!
//! The reverse case is allowed: a program input the mesh does not supply is
//! read from a small constant stream (one record, instance step mode) holding
//! a default value. That is how the cube gets a flat `in_color` and the
//! triangle a zero `in_texcoord` out of the same program.

use wgpu::util::DeviceExt;

use thiserror::Error;

use crate::render::GpuContext;
use crate::shader::{Program, ProgramInterface, VertexInput};

/// Size of one constant attribute slot (a vec4 of f32).
const CONSTANT_SLOT_BYTES: u64 = 16;

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("vertex layout stride must be at least one column")]
    ZeroStride,
    #[error("mesh has no vertices")]
    Empty,
    #[error("{len} floats do not divide into records of {stride}")]
    Ragged { len: usize, stride: usize },
    #[error("attribute `{name}` needs columns {start}..{end} but records are {stride} wide", end = start + count)]
    ColumnRange {
        name: String,
        start: usize,
        count: usize,
        stride: usize,
    },
    #[error("attribute `{name}` has {count} columns, expected 1 to 4")]
    ComponentCount { name: String, count: usize },
    #[error("attribute `{0}` is listed twice")]
    Duplicate(String),
    #[error("attributes `{first}` and `{second}` share columns")]
    Overlap { first: String, second: String },
    #[error("program has no vertex input named `{0}`")]
    UnknownInput(String),
    #[error("attribute `{name}` has {layout} columns but the program input takes {program}")]
    ComponentMismatch {
        name: String,
        layout: usize,
        program: u32,
    },
    #[error("input `{0}` is already supplied by the vertex buffer")]
    AlreadySupplied(String),
    #[error("pipeline rejected the binding: {0}")]
    Pipeline(String),
}

/// Columns `start..start + count` of each record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeColumns {
    pub start: usize,
    pub count: usize,
}

/// Maps attribute names to column ranges within fixed-width records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexLayout {
    stride: usize,
    attributes: Vec<(String, AttributeColumns)>,
}

impl VertexLayout {
    /// Records of `stride` floats each.
    pub fn new(stride: usize) -> Self {
        Self {
            stride,
            attributes: Vec::new(),
        }
    }

    /// Bind columns `start..start + count` to the shader input `name`.
    pub fn attribute(mut self, name: impl Into<String>, start: usize, count: usize) -> Self {
        self.attributes
            .push((name.into(), AttributeColumns { start, count }));
        self
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn attributes(&self) -> &[(String, AttributeColumns)] {
        &self.attributes
    }

    pub fn validate(&self) -> Result<(), LayoutError> {
        if self.stride == 0 {
            return Err(LayoutError::ZeroStride);
        }
        for (i, (name, cols)) in self.attributes.iter().enumerate() {
            if !(1..=4).contains(&cols.count) {
                return Err(LayoutError::ComponentCount {
                    name: name.clone(),
                    count: cols.count,
                });
            }
            if cols.start + cols.count > self.stride {
                return Err(LayoutError::ColumnRange {
                    name: name.clone(),
                    start: cols.start,
                    count: cols.count,
                    stride: self.stride,
                });
            }
            for (other, other_cols) in &self.attributes[..i] {
                if other == name {
                    return Err(LayoutError::Duplicate(name.clone()));
                }
                let disjoint = cols.start + cols.count <= other_cols.start
                    || other_cols.start + other_cols.count <= cols.start;
                if !disjoint {
                    return Err(LayoutError::Overlap {
                        first: other.clone(),
                        second: name.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// An immutable vertex buffer on the GPU.
pub struct Mesh {
    buffer: wgpu::Buffer,
    layout: VertexLayout,
    vertex_count: u32,
}

impl Mesh {
    /// Validate `layout` against `records` and upload them in one shot.
    pub fn upload(
        gpu: &GpuContext,
        label: &str,
        records: &[f32],
        layout: VertexLayout,
    ) -> Result<Self, LayoutError> {
        layout.validate()?;
        if records.is_empty() {
            return Err(LayoutError::Empty);
        }
        if records.len() % layout.stride != 0 {
            return Err(LayoutError::Ragged {
                len: records.len(),
                stride: layout.stride,
            });
        }
        let vertex_count = u32::try_from(records.len() / layout.stride).map_err(|_| {
            LayoutError::Ragged {
                len: records.len(),
                stride: layout.stride,
            }
        })?;

        let buffer = gpu
            .device()
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(records),
                usage: wgpu::BufferUsages::VERTEX,
            });

        log::debug!("uploaded mesh `{label}`: {vertex_count} vertices");

        Ok(Self {
            buffer,
            layout,
            vertex_count,
        })
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub(crate) fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    /// Resolve this mesh's layout against `program`'s inputs.
    pub fn bind(&self, program: &Program) -> Result<VertexBinding, LayoutError> {
        VertexBinding::resolve(&self.layout, program.interface())
    }
}

/// Verified mapping from a mesh layout to a program's vertex inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexBinding {
    stride_bytes: u64,
    attributes: Vec<wgpu::VertexAttribute>,
    supplied: Vec<String>,
    /// Inputs fed from the constant stream, in slot order.
    constant_inputs: Vec<VertexInput>,
    constant_attributes: Vec<wgpu::VertexAttribute>,
    constants: Vec<[f32; 4]>,
}

impl VertexBinding {
    pub fn resolve(layout: &VertexLayout, program: &ProgramInterface) -> Result<Self, LayoutError> {
        layout.validate()?;

        let mut attributes = Vec::with_capacity(layout.attributes.len());
        for (name, cols) in &layout.attributes {
            let input = program
                .input(name)
                .ok_or_else(|| LayoutError::UnknownInput(name.clone()))?;
            if input.components as usize != cols.count {
                return Err(LayoutError::ComponentMismatch {
                    name: name.clone(),
                    layout: cols.count,
                    program: input.components,
                });
            }
            attributes.push(wgpu::VertexAttribute {
                format: input.format(),
                offset: (cols.start * size_of::<f32>()) as wgpu::BufferAddress,
                shader_location: input.location,
            });
        }

        let constant_inputs: Vec<VertexInput> = program
            .vertex_inputs
            .iter()
            .filter(|input| !layout.attributes.iter().any(|(name, _)| *name == input.name))
            .cloned()
            .collect();
        let constant_attributes = constant_inputs
            .iter()
            .enumerate()
            .map(|(slot, input)| wgpu::VertexAttribute {
                format: input.format(),
                offset: slot as u64 * CONSTANT_SLOT_BYTES,
                shader_location: input.location,
            })
            .collect();
        let constants = vec![[0.0; 4]; constant_inputs.len()];

        Ok(Self {
            stride_bytes: (layout.stride * size_of::<f32>()) as u64,
            attributes,
            supplied: layout.attributes.iter().map(|(name, _)| name.clone()).collect(),
            constant_inputs,
            constant_attributes,
            constants,
        })
    }

    /// Override the value an unsupplied input reads. Missing trailing
    /// components stay zero.
    pub fn with_default(mut self, name: &str, value: &[f32]) -> Result<Self, LayoutError> {
        let Some(slot) = self.constant_inputs.iter().position(|i| i.name == name) else {
            return Err(if self.supplied.iter().any(|s| s == name) {
                LayoutError::AlreadySupplied(name.to_owned())
            } else {
                LayoutError::UnknownInput(name.to_owned())
            });
        };
        let components = self.constant_inputs[slot].components;
        if value.len() != components as usize {
            return Err(LayoutError::ComponentMismatch {
                name: name.to_owned(),
                layout: value.len(),
                program: components,
            });
        }
        self.constants[slot] = [0.0; 4];
        self.constants[slot][..value.len()].copy_from_slice(value);
        Ok(self)
    }

    /// Names of the inputs read from the constant stream.
    pub fn defaulted_inputs(&self) -> impl Iterator<Item = &str> {
        self.constant_inputs.iter().map(|i| i.name.as_str())
    }

    pub fn constants(&self) -> &[[f32; 4]] {
        &self.constants
    }

    pub fn has_constant_stream(&self) -> bool {
        !self.constant_inputs.is_empty()
    }

    /// Buffer layouts for pipeline creation: slot 0 is the mesh, slot 1 (if
    /// any) the constant stream.
    pub(crate) fn buffer_layouts(&self) -> Vec<wgpu::VertexBufferLayout<'_>> {
        let mut layouts = vec![wgpu::VertexBufferLayout {
            array_stride: self.stride_bytes,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &self.attributes,
        }];
        if self.has_constant_stream() {
            layouts.push(wgpu::VertexBufferLayout {
                array_stride: self.constant_inputs.len() as u64 * CONSTANT_SLOT_BYTES,
                step_mode: wgpu::VertexStepMode::Instance,
                attributes: &self.constant_attributes,
            });
        }
        layouts
    }
}
