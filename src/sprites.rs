//! Fry sprite loading
//!
//! Sprites are optional. A source that fails to load is logged and skipped;
//! particles without a sprite keep drawing as vector fries, so a partial or
//! total failure never stops the field.

use std::path::Path;

use image::RgbaImage;
use thiserror::Error;

/// Height a sprite is drawn at for scale 1.0, matching the vector fry
pub const SPRITE_BASE_HEIGHT: f64 = 28.0;

/// Aspect ratio used when a sprite reports no natural size
pub const FALLBACK_ASPECT: f64 = 6.0 / 28.0;

/// Default sprite sources, relative to the page or project root
pub const DEFAULT_SOURCES: [&str; 2] = ["images/particles/fry1.png", "images/particles/fry2.png"];

#[derive(Debug, Error)]
pub enum SpriteError {
    #[error("failed to load sprite '{source_path}': {reason}")]
    Load { source_path: String, reason: String },
    #[error("sprite '{0}' has no pixels")]
    Empty(String),
}

/// A loaded sprite image with its natural size
#[derive(Debug, Clone)]
pub struct Sprite<I> {
    pub image: I,
    pub natural_width: f64,
    pub natural_height: f64,
}

impl<I> Sprite<I> {
    pub fn new(image: I, natural_width: f64, natural_height: f64) -> Self {
        Self { image, natural_width, natural_height }
    }

    /// Width over height, or [`FALLBACK_ASPECT`] when the size is unknown.
    pub fn aspect(&self) -> f64 {
        if self.natural_width > 0.0 && self.natural_height > 0.0 {
            self.natural_width / self.natural_height
        } else {
            FALLBACK_ASPECT
        }
    }

    /// Draw size for a particle of the given scale.
    pub fn draw_size(&self, scale: f64) -> (f64, f64) {
        let h = SPRITE_BASE_HEIGHT * scale;
        (h * self.aspect(), h)
    }
}

/// Something that can turn a source string into a sprite
pub trait SpriteLoader {
    type Image;

    fn load(&mut self, source: &str) -> Result<Sprite<Self::Image>, SpriteError>;
}

/// Load every source, keeping the successes in order.
pub fn load_sprites<L: SpriteLoader>(loader: &mut L, sources: &[String]) -> Vec<Sprite<L::Image>> {
    let mut sprites = Vec::with_capacity(sources.len());
    for source in sources {
        match loader.load(source) {
            Ok(sprite) => sprites.push(sprite),
            Err(e) => log::warn!("{}; falling back to vector fries", e),
        }
    }
    sprites
}

/// Loads sprites from image files, resolving relative paths against `root`
#[derive(Debug, Clone)]
pub struct FileSpriteLoader {
    root: std::path::PathBuf,
}

impl FileSpriteLoader {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
}

impl SpriteLoader for FileSpriteLoader {
    type Image = RgbaImage;

    fn load(&mut self, source: &str) -> Result<Sprite<RgbaImage>, SpriteError> {
        let path = self.root.join(source);
        let image = image::open(&path)
            .map_err(|e| SpriteError::Load {
                source_path: source.to_string(),
                reason: e.to_string(),
            })?
            .to_rgba8();
        if image.width() == 0 || image.height() == 0 {
            return Err(SpriteError::Empty(source.to_string()));
        }
        let (w, h) = image.dimensions();
        Ok(Sprite::new(image, w as f64, h as f64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use tempfile::TempDir;

    #[test]
    fn test_aspect_and_draw_size() {
        let sprite = Sprite::new((), 12.0, 56.0);
        let (w, h) = sprite.draw_size(2.0);
        assert_eq!(h, 56.0);
        assert!((w - 12.0).abs() < 1e-9);

        let unknown = Sprite::new((), 0.0, 0.0);
        assert_eq!(unknown.aspect(), FALLBACK_ASPECT);
    }

    #[test]
    fn test_file_loader_reads_png() {
        let temp = TempDir::new().expect("should create temp dir");
        let img = RgbaImage::from_pixel(3, 14, Rgba([248, 180, 0, 255]));
        img.save(temp.path().join("fry.png")).expect("should write png");

        let mut loader = FileSpriteLoader::new(temp.path());
        let sprite = loader.load("fry.png").expect("should load sprite");
        assert_eq!(sprite.natural_width, 3.0);
        assert_eq!(sprite.natural_height, 14.0);
    }

    #[test]
    fn test_load_sprites_skips_failures() {
        let temp = TempDir::new().expect("should create temp dir");
        RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 255]))
            .save(temp.path().join("ok.png"))
            .expect("should write png");

        let mut loader = FileSpriteLoader::new(temp.path());
        let sources = vec!["missing.png".to_string(), "ok.png".to_string()];
        let sprites = load_sprites(&mut loader, &sources);
        assert_eq!(sprites.len(), 1);
    }

    #[test]
    fn test_load_sprites_all_missing() {
        let temp = TempDir::new().expect("should create temp dir");
        let mut loader = FileSpriteLoader::new(temp.path());
        let sources: Vec<String> = DEFAULT_SOURCES.iter().map(|s| s.to_string()).collect();
        assert!(load_sprites(&mut loader, &sources).is_empty());
    }
}
