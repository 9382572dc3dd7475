use std::fmt;
use std::sync::Arc;

use crate::coords::Transform;
use crate::error::RenderError;

/// Shape of a uniform value.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum UniformKind {
    Float,
    Vec2,
    Vec3,
    Vec4,
    Mat3,
    Mat4,
    Texture,
}

impl UniformKind {
    /// Bytes written into the uniform block; textures occupy none.
    pub const fn byte_size(self) -> usize {
        match self {
            UniformKind::Float => 4,
            UniformKind::Vec2 => 8,
            UniformKind::Vec3 => 12,
            UniformKind::Vec4 => 16,
            // three 16-byte aligned columns
            UniformKind::Mat3 => 48,
            UniformKind::Mat4 => 64,
            UniformKind::Texture => 0,
        }
    }
}

impl fmt::Display for UniformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UniformKind::Float => "f32",
            UniformKind::Vec2 => "vec2<f32>",
            UniformKind::Vec3 => "vec3<f32>",
            UniformKind::Vec4 => "vec4<f32>",
            UniformKind::Mat3 => "mat3x3<f32>",
            UniformKind::Mat4 => "mat4x4<f32>",
            UniformKind::Texture => "texture_2d<f32>",
        };
        f.write_str(name)
    }
}

/// A value assigned to a named uniform.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Mat3(Transform),
    /// Column-major.
    Mat4([[f32; 4]; 4]),
    /// Sampler slot the texture is read from.
    Texture(u32),
}

impl UniformValue {
    pub const fn kind(&self) -> UniformKind {
        match self {
            UniformValue::Float(_) => UniformKind::Float,
            UniformValue::Vec2(_) => UniformKind::Vec2,
            UniformValue::Vec3(_) => UniformKind::Vec3,
            UniformValue::Vec4(_) => UniformKind::Vec4,
            UniformValue::Mat3(_) => UniformKind::Mat3,
            UniformValue::Mat4(_) => UniformKind::Mat4,
            UniformValue::Texture(_) => UniformKind::Texture,
        }
    }

    fn write(&self, out: &mut [u8]) {
        fn put(out: &mut [u8], at: usize, v: &[f32]) {
            out[at..at + v.len() * 4].copy_from_slice(bytemuck::cast_slice(v));
        }
        match self {
            UniformValue::Float(v) => put(out, 0, &[*v]),
            UniformValue::Vec2(v) => put(out, 0, v),
            UniformValue::Vec3(v) => put(out, 0, v),
            UniformValue::Vec4(v) => put(out, 0, v),
            UniformValue::Mat3(t) => {
                for (i, col) in t.to_mat3_columns().iter().enumerate() {
                    put(out, i * 16, col);
                }
            }
            UniformValue::Mat4(cols) => {
                for (i, col) in cols.iter().enumerate() {
                    put(out, i * 16, col);
                }
            }
            UniformValue::Texture(_) => {}
        }
    }
}

/// One member of the uniform block (`@group(0) @binding(0)`).
#[derive(Debug, Clone, PartialEq)]
pub struct UniformMember {
    pub name: String,
    pub offset: u32,
    pub kind: UniformKind,
}

/// A sampled texture declared at `@group(1) @binding(slot + 1)`.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureSlot {
    pub name: String,
    pub slot: u32,
}

/// Merged uniform interface of both stages of a program.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UniformLayout {
    pub members: Vec<UniformMember>,
    /// Byte size of the block; 0 when the program declares none.
    pub size: u32,
    pub textures: Vec<TextureSlot>,
}

impl UniformLayout {
    pub fn member(&self, name: &str) -> Option<&UniformMember> {
        self.members.iter().find(|m| m.name == name)
    }

    pub fn texture(&self, name: &str) -> Option<&TextureSlot> {
        self.textures.iter().find(|t| t.name == name)
    }

    #[inline]
    pub fn has_block(&self) -> bool {
        self.size > 0
    }

    #[inline]
    pub fn has_textures(&self) -> bool {
        !self.textures.is_empty()
    }
}

/// CPU copy of a program's uniform block.
///
/// Cloned into every model built against the program, so later writes never
/// affect models already submitted.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformCache {
    program: String,
    layout: Arc<UniformLayout>,
    bytes: Vec<u8>,
}

impl UniformCache {
    pub fn new(program: impl Into<String>, layout: Arc<UniformLayout>) -> Self {
        let bytes = vec![0; layout.size as usize];
        Self { program: program.into(), layout, bytes }
    }

    #[inline]
    pub fn layout(&self) -> &UniformLayout {
        &self.layout
    }

    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Writes `value` into the block after checking it against the layout.
    pub fn set(&mut self, name: &str, value: UniformValue) -> Result<(), RenderError> {
        if let UniformValue::Texture(slot) = value {
            let Some(texture) = self.layout.texture(name) else {
                return Err(self.unknown(name));
            };
            if texture.slot != slot {
                return Err(RenderError::AttributeContractViolation {
                    program: self.program.clone(),
                    detail: format!("texture '{name}' is bound at slot {}, not {slot}", texture.slot),
                });
            }
            return Ok(());
        }

        let Some(member) = self.layout.member(name) else {
            return Err(match self.layout.texture(name) {
                Some(_) => RenderError::UniformTypeMismatch {
                    program: self.program.clone(),
                    name: name.to_string(),
                    expected: UniformKind::Texture,
                    actual: value.kind(),
                },
                None => self.unknown(name),
            });
        };
        if member.kind != value.kind() {
            return Err(RenderError::UniformTypeMismatch {
                program: self.program.clone(),
                name: name.to_string(),
                expected: member.kind,
                actual: value.kind(),
            });
        }

        let start = member.offset as usize;
        let end = start + member.kind.byte_size();
        value.write(&mut self.bytes[start..end]);
        Ok(())
    }

    /// Writes `value` only if the block declares `name` with the same kind.
    pub fn set_if_declared(&mut self, name: &str, value: UniformValue) -> bool {
        let declared = self
            .layout
            .member(name)
            .is_some_and(|m| m.kind == value.kind());
        declared && self.set(name, value).is_ok()
    }

    fn unknown(&self, name: &str) -> RenderError {
        RenderError::UnknownUniform {
            program: self.program.clone(),
            name: name.to_string(),
        }
    }
}
