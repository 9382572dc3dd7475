bitflags::bitflags! {
    /// Attributes carried by a mesh's interleaved vertex stream.
    ///
    /// `POSITION` is always present. Layout per vertex, in order:
    /// position `vec2`, color `vec3` (if set), texcoord `vec2` (if set).
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct AttributeSet: u8 {
        const POSITION = 0b001;
        const COLOR    = 0b010;
        const TEXCOORD = 0b100;
    }
}

impl AttributeSet {
    /// Shader locations of the interleaved stream.
    pub const POSITION_SLOT: u32 = 0;
    pub const COLOR_SLOT: u32 = 1;
    pub const TEXCOORD_SLOT: u32 = 2;
    /// First location available to instance streams.
    pub const FIRST_INSTANCE_SLOT: u32 = 3;

    /// Same set with `POSITION` forced on.
    #[inline]
    pub fn with_position(self) -> Self {
        self | AttributeSet::POSITION
    }

    /// Floats per vertex.
    pub fn stride(self) -> usize {
        let mut stride = 2;
        if self.contains(AttributeSet::COLOR) {
            stride += 3;
        }
        if self.contains(AttributeSet::TEXCOORD) {
            stride += 2;
        }
        stride
    }

    /// Descriptors for the interleaved stream, in memory order.
    pub fn vertex_attributes(self) -> Vec<VertexAttribute> {
        let mut attrs = vec![VertexAttribute::per_vertex(Self::POSITION_SLOT, 2)];
        if self.contains(AttributeSet::COLOR) {
            attrs.push(VertexAttribute::per_vertex(Self::COLOR_SLOT, 3));
        }
        if self.contains(AttributeSet::TEXCOORD) {
            attrs.push(VertexAttribute::per_vertex(Self::TEXCOORD_SLOT, 2));
        }
        attrs
    }

    /// Components provided at `slot`, if the set covers it.
    pub fn components_at(self, slot: u32) -> Option<u32> {
        match slot {
            Self::POSITION_SLOT => Some(2),
            Self::COLOR_SLOT if self.contains(AttributeSet::COLOR) => Some(3),
            Self::TEXCOORD_SLOT if self.contains(AttributeSet::TEXCOORD) => Some(2),
            _ => None,
        }
    }
}

/// Scalar type of one attribute component. Only 32-bit floats are uploaded.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum ComponentType {
    #[default]
    Float32,
}

impl ComponentType {
    #[inline]
    pub const fn size_bytes(self) -> u64 {
        match self {
            ComponentType::Float32 => 4,
        }
    }
}

/// Advance rate of a vertex attribute.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum StepMode {
    #[default]
    PerVertex,
    PerInstance,
}

/// Describes one vertex attribute: `(slot, components, type, divisor)`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    pub slot: u32,
    pub components: u32,
    pub component_type: ComponentType,
    pub step: StepMode,
}

impl VertexAttribute {
    pub const fn per_vertex(slot: u32, components: u32) -> Self {
        Self {
            slot,
            components,
            component_type: ComponentType::Float32,
            step: StepMode::PerVertex,
        }
    }

    pub const fn per_instance(slot: u32, components: u32) -> Self {
        Self {
            slot,
            components,
            component_type: ComponentType::Float32,
            step: StepMode::PerInstance,
        }
    }

    /// 0 = advances per vertex, 1 = advances per instance.
    #[inline]
    pub const fn divisor(&self) -> u32 {
        match self.step {
            StepMode::PerVertex => 0,
            StepMode::PerInstance => 1,
        }
    }

    #[inline]
    pub const fn byte_size(&self) -> u64 {
        self.components as u64 * self.component_type.size_bytes()
    }
}
