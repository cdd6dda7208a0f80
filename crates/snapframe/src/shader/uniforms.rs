use glam::Mat4;

use super::{ShaderError, UniformBlockLayout, UniformKind};

/// CPU-side mirror of a program's uniform block.
///
/// Setters write straight into a byte buffer laid out exactly like the WGSL
/// struct, so a snapshot of [`bytes`](Self::bytes) can be copied into a GPU
/// uniform buffer as-is.
#[derive(Debug, Clone)]
pub struct UniformBlock {
    layout: UniformBlockLayout,
    bytes: Vec<u8>,
}

impl UniformBlock {
    pub fn new(layout: UniformBlockLayout) -> Self {
        let bytes = vec![0; layout.size as usize];
        Self { layout, bytes }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Zero every member.
    pub fn reset(&mut self) {
        self.bytes.fill(0);
    }

    pub fn set_matrix(&mut self, name: &str, value: &Mat4) -> Result<(), ShaderError> {
        let offset = self.offset_of(name, "mat4x4<f32>", |kind| kind == UniformKind::Mat4)?;
        self.write(offset, bytemuck::cast_slice(&value.to_cols_array()));
        Ok(())
    }

    /// Write a flag. WGSL has no host-shareable `bool`, so the member may be
    /// any 32-bit scalar; it receives 1 or 0 in its own representation.
    pub fn set_bool(&mut self, name: &str, value: bool) -> Result<(), ShaderError> {
        let kind = self
            .layout
            .member(name)
            .map(|m| m.kind)
            .ok_or_else(|| ShaderError::UnknownUniform(name.to_owned()))?;
        let offset = self.offset_of(name, "a 32-bit flag", |kind| {
            matches!(kind, UniformKind::U32 | UniformKind::I32 | UniformKind::F32)
        })?;
        let word: [u8; 4] = match kind {
            UniformKind::F32 => (if value { 1.0f32 } else { 0.0 }).to_ne_bytes(),
            _ => u32::from(value).to_ne_bytes(),
        };
        self.write(offset, &word);
        Ok(())
    }

    fn offset_of(
        &self,
        name: &str,
        expected: &'static str,
        accepts: impl Fn(UniformKind) -> bool,
    ) -> Result<usize, ShaderError> {
        let member = self
            .layout
            .member(name)
            .ok_or_else(|| ShaderError::UnknownUniform(name.to_owned()))?;
        if !accepts(member.kind) {
            return Err(ShaderError::UniformType {
                name: name.to_owned(),
                expected,
                found: member.kind,
            });
        }
        Ok(member.offset as usize)
    }

    fn write(&mut self, offset: usize, data: &[u8]) {
        self.bytes[offset..offset + data.len()].copy_from_slice(data);
    }
}
