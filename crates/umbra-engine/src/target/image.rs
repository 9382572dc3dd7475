use crate::error::RenderError;

use super::{ColorSpace, TargetId, TargetPool};

/// Decodes PNG or JPEG bytes into tightly packed RGBA8.
pub fn decode_rgba(bytes: &[u8]) -> Result<(u32, u32, Vec<u8>), RenderError> {
    let img = image::load_from_memory(bytes)?.to_rgba8();
    let (w, h) = img.dimensions();
    Ok((w, h, img.into_raw()))
}

impl TargetPool {
    /// Decodes `bytes` and replaces `id`'s storage with the image.
    pub fn load_image(&mut self, id: TargetId, bytes: &[u8], space: ColorSpace) -> Result<(), RenderError> {
        self.ensure_live(id)?;
        let (w, h, pixels) = decode_rgba(bytes)?;
        self.upload_rgba(id, w, h, pixels, space)
    }

    /// Decodes `bytes` into a new target.
    pub fn from_image(
        &mut self,
        label: impl Into<String>,
        bytes: &[u8],
        space: ColorSpace,
    ) -> Result<TargetId, RenderError> {
        let (w, h, pixels) = decode_rgba(bytes)?;
        self.from_pixels(label, w, h, pixels, space)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paint::Color;
    use crate::target::TargetCommand;

    fn png_2x1() -> Vec<u8> {
        let img = image::RgbaImage::from_raw(2, 1, vec![255, 0, 0, 255, 0, 0, 255, 128]).unwrap();
        let mut out = std::io::Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn decodes_png_to_rgba() {
        let (w, h, px) = decode_rgba(&png_2x1()).unwrap();
        assert_eq!((w, h), (2, 1));
        assert_eq!(px, vec![255, 0, 0, 255, 0, 0, 255, 128]);
    }

    #[test]
    fn garbage_is_a_decode_error() {
        assert!(matches!(decode_rgba(b"not an image"), Err(RenderError::ImageDecode(_))));
    }

    #[test]
    fn load_image_replaces_storage() {
        let mut pool = TargetPool::new();
        let id = pool.placeholder("sprite", Color::WHITE);
        pool.take_pending();

        pool.load_image(id, &png_2x1(), ColorSpace::Srgb).unwrap();
        let cmds = pool.take_pending();
        assert!(matches!(cmds.last(), Some(TargetCommand::Allocate { pixels: Some(p), .. }) if p.len() == 8));
    }
}
