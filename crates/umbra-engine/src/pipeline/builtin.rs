use crate::paint::Color;
use crate::shader::{ProgramId, ProgramRegistry, ShaderSource, UniformValue};

const SPRITE_VERT: &str = include_str!("shaders/sprite.vert.wgsl");
const SPRITE_FRAG: &str = include_str!("shaders/sprite.frag.wgsl");
const NORMAL_FRAG: &str = include_str!("shaders/normal.frag.wgsl");
const LIGHT_VERT: &str = include_str!("shaders/light.vert.wgsl");
const LIGHT_FRAG: &str = include_str!("shaders/light.frag.wgsl");
const COMPOSITE_VERT: &str = include_str!("shaders/composite.vert.wgsl");
const COMPOSITE_FRAG: &str = include_str!("shaders/composite.frag.wgsl");

// texture slots
pub const SPRITE_ALBEDO_SLOT: u32 = 0;
pub const NORMAL_ALBEDO_SLOT: u32 = 0;
pub const NORMAL_MAP_SLOT: u32 = 1;
pub const LIGHT_NORMAL_SLOT: u32 = 0;
pub const COMPOSITE_ALBEDO_SLOT: u32 = 0;
pub const COMPOSITE_LIGHT_SLOT: u32 = 1;

// light instance streams
pub const LIGHT_CENTER_SLOT: u32 = 3;
pub const LIGHT_PARAMS_SLOT: u32 = 4;
pub const LIGHT_COLOR_SLOT: u32 = 5;

/// Programs the pipeline's own passes draw with.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BuiltinPrograms {
    pub sprite: ProgramId,
    pub normal: ProgramId,
    pub light: ProgramId,
    pub composite: ProgramId,
}

impl BuiltinPrograms {
    pub fn register(registry: &mut ProgramRegistry) -> Self {
        let sprite = registry.create("sprite", ShaderSource::new(SPRITE_VERT, SPRITE_FRAG));
        let normal = registry.create("normal", ShaderSource::new(SPRITE_VERT, NORMAL_FRAG));
        let light = registry.create("light", ShaderSource::new(LIGHT_VERT, LIGHT_FRAG));
        let composite =
            registry.create("composite", ShaderSource::new(COMPOSITE_VERT, COMPOSITE_FRAG));

        // a zeroed tint would hide every sprite
        if let Ok(program) = registry.get_mut(sprite) {
            let _ = program.set_uniform("tint", UniformValue::Vec4(Color::WHITE.to_rgba()));
        }

        Self { sprite, normal, light, composite }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::{StageIo, UniformKind};

    fn registry() -> (ProgramRegistry, BuiltinPrograms) {
        let mut registry = ProgramRegistry::new();
        let builtin = BuiltinPrograms::register(&mut registry);
        (registry, builtin)
    }

    #[test]
    fn every_builtin_links() {
        let (registry, _) = registry();
        for program in registry.iter() {
            assert!(program.is_usable(), "{}: {:?}", program.label(), program.error());
        }
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn light_program_reads_three_instance_streams() {
        let (registry, builtin) = registry();
        let r = registry.get(builtin.light).unwrap().reflection().unwrap().clone();
        assert_eq!(
            r.vertex_inputs,
            vec![
                StageIo { location: 0, components: 2 },
                StageIo { location: LIGHT_CENTER_SLOT, components: 2 },
                StageIo { location: LIGHT_PARAMS_SLOT, components: 2 },
                StageIo { location: LIGHT_COLOR_SLOT, components: 3 },
            ]
        );
        assert_eq!(r.layout.texture("normal_buffer").unwrap().slot, LIGHT_NORMAL_SLOT);
        assert_eq!(r.layout.member("viewport").unwrap().kind, UniformKind::Vec2);
    }

    #[test]
    fn composite_layout_merges_both_stages() {
        let (registry, builtin) = registry();
        let layout = &registry.get(builtin.composite).unwrap().reflection().unwrap().layout;
        assert_eq!(layout.size, 80);
        assert_eq!(layout.member("ambient").unwrap().offset, 48);
        assert_eq!(layout.member("mode").unwrap().offset, 64);
        assert_eq!(layout.texture("light_buffer").unwrap().slot, COMPOSITE_LIGHT_SLOT);
    }

    #[test]
    fn sprite_and_normal_share_the_vertex_stage() {
        let (registry, builtin) = registry();
        let sprite = registry.get(builtin.sprite).unwrap();
        let normal = registry.get(builtin.normal).unwrap();
        assert_eq!(sprite.source().vertex, normal.source().vertex);
        let layout = &normal.reflection().unwrap().layout;
        assert_eq!(layout.texture("normal_map").unwrap().slot, NORMAL_MAP_SLOT);
        assert_eq!(layout.size, 48);
    }
}
