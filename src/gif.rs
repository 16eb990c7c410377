//! GIF animation output

use crate::output::{ensure_parent, OutputError};
use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame, RgbaImage};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Encode `frames` as an animated GIF at `path`.
///
/// GIF delays are stored in centiseconds, so `duration_ms` is rounded down
/// to a multiple of 10 with a floor of 10.
pub fn render_gif(
    frames: &[RgbaImage],
    duration_ms: u32,
    loop_anim: bool,
    path: &Path,
) -> Result<(), OutputError> {
    if frames.is_empty() {
        return Ok(());
    }
    ensure_parent(path)?;

    let file = File::create(path)?;
    let mut encoder = GifEncoder::new(BufWriter::new(file));
    encoder.set_repeat(if loop_anim { Repeat::Infinite } else { Repeat::Finite(0) })?;

    let delay_cs = (duration_ms / 10).max(1);
    let delay = Delay::from_numer_denom_ms(delay_cs * 10, 1);
    for rgba_image in frames {
        encoder.encode_frame(Frame::from_parts(rgba_image.clone(), 0, 0, delay))?;
    }

    Ok(())
}
