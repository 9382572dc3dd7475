use std::fmt;

use crate::coords::Viewport;
use crate::error::RenderError;
use crate::paint::Color;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(pub(crate) u32);

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "target#{}", self.0)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TargetFormat {
    /// 8-bit linear; G-buffer albedo and normals, normal maps.
    Rgba8Unorm,
    /// 8-bit, decoded from sRGB on sampling; color textures.
    Rgba8UnormSrgb,
    /// Half float; light accumulation, which exceeds 1.0 with overlapping lights.
    Rgba16Float,
}

impl TargetFormat {
    pub const fn bytes_per_pixel(self) -> u32 {
        match self {
            TargetFormat::Rgba8Unorm | TargetFormat::Rgba8UnormSrgb => 4,
            TargetFormat::Rgba16Float => 8,
        }
    }
}

/// How uploaded 8-bit pixels are interpreted.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum ColorSpace {
    #[default]
    Srgb,
    /// Raw data such as normal maps; never gamma-decoded.
    Linear,
}

impl ColorSpace {
    pub const fn format(self) -> TargetFormat {
        match self {
            ColorSpace::Srgb => TargetFormat::Rgba8UnormSrgb,
            ColorSpace::Linear => TargetFormat::Rgba8Unorm,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TargetState {
    Live,
    Destroyed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TargetInfo {
    pub label: String,
    pub size: Viewport,
    pub format: TargetFormat,
    /// Bumped on every reallocation.
    pub generation: u32,
    pub state: TargetState,
}

/// Storage change for the executor to apply.
#[derive(Debug, Clone, PartialEq)]
pub enum TargetCommand {
    Allocate {
        target: TargetId,
        generation: u32,
        size: Viewport,
        format: TargetFormat,
        label: String,
        /// Tightly packed RGBA8 rows; `None` leaves contents undefined.
        pixels: Option<Vec<u8>>,
    },
    Dispose {
        target: TargetId,
        generation: u32,
    },
}

impl TargetCommand {
    pub fn target(&self) -> TargetId {
        match self {
            TargetCommand::Allocate { target, .. } | TargetCommand::Dispose { target, .. } => *target,
        }
    }
}

/// Every render target's bookkeeping plus the storage changes not yet sent
/// to the GPU.
///
/// Ids are never reused. A disposed id keeps its record so any later use
/// reports [`RenderError::UseAfterDispose`] instead of aliasing a newer
/// target; the GPU storage itself is released. Creating and disposing a
/// fresh target every frame therefore grows the record list by one entry per
/// frame. Keep one target and [`reallocate`](Self::reallocate) or
/// [`upload_rgba`](Self::upload_rgba) into it instead.
#[derive(Debug, Default)]
pub struct TargetPool {
    targets: Vec<TargetInfo>,
    pending: Vec<TargetCommand>,
}

impl TargetPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a target with undefined contents.
    pub fn from_size(
        &mut self,
        label: impl Into<String>,
        width: u32,
        height: u32,
        format: TargetFormat,
    ) -> Result<TargetId, RenderError> {
        let size = checked_size(width, height)?;
        Ok(self.insert(label.into(), size, format, None))
    }

    /// 1×1 target filled with `color`, for unbound texture slots.
    pub fn placeholder(&mut self, label: impl Into<String>, color: Color) -> TargetId {
        let pixels = color.to_rgba8().to_vec();
        self.insert(label.into(), Viewport::new(1, 1), TargetFormat::Rgba8Unorm, Some(pixels))
    }

    /// Allocates a target holding `pixels` (RGBA8, row-major, no padding).
    pub fn from_pixels(
        &mut self,
        label: impl Into<String>,
        width: u32,
        height: u32,
        pixels: Vec<u8>,
        space: ColorSpace,
    ) -> Result<TargetId, RenderError> {
        let size = checked_size(width, height)?;
        check_pixels(size, &pixels)?;
        Ok(self.insert(label.into(), size, space.format(), Some(pixels)))
    }

    pub fn info(&self, id: TargetId) -> Result<&TargetInfo, RenderError> {
        self.targets
            .get(id.0 as usize)
            .ok_or(RenderError::UnknownTarget(id))
    }

    pub fn size(&self, id: TargetId) -> Result<Viewport, RenderError> {
        self.info(id).map(|info| info.size)
    }

    /// The target's info if it still has storage.
    pub fn ensure_live(&self, id: TargetId) -> Result<&TargetInfo, RenderError> {
        let info = self.info(id)?;
        match info.state {
            TargetState::Live => Ok(info),
            TargetState::Destroyed => Err(RenderError::UseAfterDispose { target: id }),
        }
    }

    pub fn is_live(&self, id: TargetId) -> bool {
        self.ensure_live(id).is_ok()
    }

    pub fn live_count(&self) -> usize {
        self.targets
            .iter()
            .filter(|t| t.state == TargetState::Live)
            .count()
    }

    /// Releases storage. The id stays reserved; any later use is an error.
    pub fn dispose(&mut self, id: TargetId) -> Result<(), RenderError> {
        let generation = self.ensure_live(id)?.generation;
        self.pending.push(TargetCommand::Dispose { target: id, generation });
        if let Some(info) = self.targets.get_mut(id.0 as usize) {
            info.state = TargetState::Destroyed;
            log::debug!("{id} '{}' disposed", info.label);
        }
        Ok(())
    }

    /// Replaces the storage with a new, differently sized generation.
    pub fn reallocate(&mut self, id: TargetId, width: u32, height: u32) -> Result<(), RenderError> {
        let size = checked_size(width, height)?;
        let format = self.ensure_live(id)?.format;
        self.replace(id, size, format, None);
        Ok(())
    }

    /// Replaces the storage with `pixels`, switching format to match `space`.
    pub fn upload_rgba(
        &mut self,
        id: TargetId,
        width: u32,
        height: u32,
        pixels: Vec<u8>,
        space: ColorSpace,
    ) -> Result<(), RenderError> {
        let size = checked_size(width, height)?;
        self.ensure_live(id)?;
        check_pixels(size, &pixels)?;
        self.replace(id, size, space.format(), Some(pixels));
        Ok(())
    }

    /// Drains queued storage changes in the order they were made.
    pub fn take_pending(&mut self) -> Vec<TargetCommand> {
        std::mem::take(&mut self.pending)
    }

    fn insert(
        &mut self,
        label: String,
        size: Viewport,
        format: TargetFormat,
        pixels: Option<Vec<u8>>,
    ) -> TargetId {
        let id = TargetId(self.targets.len() as u32);
        log::debug!("{id} '{label}' allocated {size} {format:?}");
        self.pending.push(TargetCommand::Allocate {
            target: id,
            generation: 0,
            size,
            format,
            label: label.clone(),
            pixels,
        });
        self.targets.push(TargetInfo {
            label,
            size,
            format,
            generation: 0,
            state: TargetState::Live,
        });
        id
    }

    fn replace(&mut self, id: TargetId, size: Viewport, format: TargetFormat, pixels: Option<Vec<u8>>) {
        let Some(info) = self.targets.get_mut(id.0 as usize) else {
            return;
        };
        self.pending.push(TargetCommand::Dispose {
            target: id,
            generation: info.generation,
        });
        info.generation += 1;
        info.size = size;
        info.format = format;
        log::debug!("{id} '{}' reallocated {size} (generation {})", info.label, info.generation);
        self.pending.push(TargetCommand::Allocate {
            target: id,
            generation: info.generation,
            size,
            format,
            label: info.label.clone(),
            pixels,
        });
    }
}

fn checked_size(width: u32, height: u32) -> Result<Viewport, RenderError> {
    let size = Viewport::new(width, height);
    if size.is_valid() {
        Ok(size)
    } else {
        Err(RenderError::InvalidSize { width, height })
    }
}

fn check_pixels(size: Viewport, pixels: &[u8]) -> Result<(), RenderError> {
    let expected = size.width as usize * size.height as usize * 4;
    if pixels.len() == expected {
        Ok(())
    } else {
        Err(RenderError::ImageDecode(format!(
            "{size} RGBA8 image needs {expected} bytes, got {}",
            pixels.len()
        )))
    }
}
