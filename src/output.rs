//! PNG output and output format selection

use image::RgbaImage;
use std::io;
use std::path::Path;
use thiserror::Error;

/// Error type for output operations
#[derive(Debug, Error)]
pub enum OutputError {
    /// IO error during file operations
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    /// Image encoding error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("unsupported output extension '{0}' (expected .gif or .png)")]
    UnsupportedFormat(String),
    #[error("no frames to write")]
    NoFrames,
}

/// What the renderer writes, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Every frame, as an animation
    Gif,
    /// The last frame only
    Png,
}

impl OutputFormat {
    pub fn from_path(path: &Path) -> Result<Self, OutputError> {
        let ext = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("gif") => Ok(Self::Gif),
            Some("png") => Ok(Self::Png),
            other => Err(OutputError::UnsupportedFormat(other.unwrap_or_default().to_string())),
        }
    }
}

pub(crate) fn ensure_parent(path: &Path) -> Result<(), OutputError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Save an RGBA image to a PNG file, creating parent directories.
pub fn save_png(image: &RgbaImage, path: &Path) -> Result<(), OutputError> {
    ensure_parent(path)?;
    image.save_with_format(path, image::ImageFormat::Png)?;
    Ok(())
}

/// Write rendered frames to `path` in the format its extension names.
pub fn write_frames(
    frames: &[RgbaImage],
    fps: u32,
    path: &Path,
) -> Result<OutputFormat, OutputError> {
    let format = OutputFormat::from_path(path)?;
    match format {
        OutputFormat::Gif => {
            if frames.is_empty() {
                return Err(OutputError::NoFrames);
            }
            let duration_ms = 1000 / fps.max(1);
            crate::gif::render_gif(frames, duration_ms, true, path)?;
        }
        OutputFormat::Png => {
            let last = frames.last().ok_or(OutputError::NoFrames)?;
            save_png(last, path)?;
        }
    }
    log::info!("wrote {} ({} frame(s))", path.display(), frames.len());
    Ok(format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use std::path::PathBuf;
    use tempfile::tempdir;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(OutputFormat::from_path(Path::new("a.gif")).unwrap(), OutputFormat::Gif);
        assert_eq!(OutputFormat::from_path(Path::new("a.PNG")).unwrap(), OutputFormat::Png);
        assert!(matches!(
            OutputFormat::from_path(Path::new("a.jpg")),
            Err(OutputError::UnsupportedFormat(ext)) if ext == "jpg"
        ));
        assert!(OutputFormat::from_path(&PathBuf::from("noext")).is_err());
    }

    #[test]
    fn test_save_png_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/out.png");
        let img = RgbaImage::from_pixel(4, 3, Rgba([248, 180, 0, 255]));

        save_png(&img, &path).unwrap();
        let back = image::open(&path).unwrap().to_rgba8();
        assert_eq!(back.dimensions(), (4, 3));
        assert_eq!(back.get_pixel(0, 0), &Rgba([248, 180, 0, 255]));
    }

    #[test]
    fn test_write_frames_png_keeps_last() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("last.png");
        let frames = vec![
            RgbaImage::from_pixel(2, 2, Rgba([255, 0, 0, 255])),
            RgbaImage::from_pixel(2, 2, Rgba([0, 0, 255, 255])),
        ];

        assert_eq!(write_frames(&frames, 30, &path).unwrap(), OutputFormat::Png);
        let back = image::open(&path).unwrap().to_rgba8();
        assert_eq!(back.get_pixel(1, 1), &Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn test_write_frames_requires_frames() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            write_frames(&[], 30, &dir.path().join("x.gif")),
            Err(OutputError::NoFrames)
        ));
        assert!(matches!(
            write_frames(&[], 30, &dir.path().join("x.png")),
            Err(OutputError::NoFrames)
        ));
    }
}
