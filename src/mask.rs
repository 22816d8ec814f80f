//! Rounded-rectangle opacity mask

use crate::error::*;
use imgref::*;
use rgb::*;
use tracing::warn;

/// Single-channel opacity mask that rounds the four corners of a frame.
///
/// It only depends on the frame size and radius, so one mask is built per run
/// and shared by all frames.
#[derive(Debug, Clone)]
pub struct AlphaMask {
    radius: usize,
    alpha: ImgVec<u8>,
}

impl AlphaMask {
    /// Opaque everywhere except outside of a quarter-disk of `radius` in each corner.
    ///
    /// Radius larger than half of the shorter side is reduced to fit.
    pub fn rounded_rect(width: usize, height: usize, radius: usize) -> Self {
        let max_radius = width.min(height) / 2;
        let radius = if radius > max_radius {
            warn!(radius, max_radius, "corner radius is too large for {}×{} frames", width, height);
            max_radius
        } else {
            radius
        };

        let mut alpha = ImgVec::new(vec![255_u8; width * height], width, height);
        if radius > 0 {
            let circle = disk(radius);
            let circle = circle.as_ref();
            let r = radius;
            paste(&mut alpha, circle.sub_image(0, 0, r, r), 0, 0);
            paste(&mut alpha, circle.sub_image(r, 0, r, r), width - r, 0);
            paste(&mut alpha, circle.sub_image(0, r, r, r), 0, height - r);
            paste(&mut alpha, circle.sub_image(r, r, r, r), width - r, height - r);
        }
        Self { radius, alpha }
    }

    /// Radius actually used, after clamping
    pub fn radius(&self) -> usize {
        self.radius
    }

    pub fn width(&self) -> usize {
        self.alpha.width()
    }

    pub fn height(&self) -> usize {
        self.alpha.height()
    }

    pub fn as_ref(&self) -> ImgRef<'_, u8> {
        self.alpha.as_ref()
    }

    /// Replaces (not multiplies) the frame's alpha channel with the mask
    pub fn apply(&self, frame: &mut ImgVec<RGBA8>) -> FrameResult<()> {
        if frame.width() != self.width() || frame.height() != self.height() {
            return Err(Error::WrongSize(format!("Frame is {}×{}, but the corner mask is {}×{}",
                frame.width(), frame.height(), self.width(), self.height())));
        }
        for (row, mask_row) in frame.rows_mut().zip(self.alpha.rows()) {
            for (px, &a) in row.iter_mut().zip(mask_row) {
                px.a = a;
            }
        }
        Ok(())
    }
}

/// Hard-edged disk of diameter `2 * radius`, 255 inside, 0 outside.
///
/// A pixel is inside when its center is within `radius` of the disk center.
fn disk(radius: usize) -> ImgVec<u8> {
    let size = radius * 2;
    let r2 = (size * size) as i64;
    let mut buf = Vec::with_capacity(size * size);
    for y in 0..size {
        // doubled coordinates keep pixel centers integral
        let dy = (2 * y + 1) as i64 - size as i64;
        for x in 0..size {
            let dx = (2 * x + 1) as i64 - size as i64;
            buf.push(if dx * dx + dy * dy <= r2 { 255 } else { 0 });
        }
    }
    ImgVec::new(buf, size, size)
}

fn paste(dst: &mut ImgVec<u8>, src: ImgRef<'_, u8>, left: usize, top: usize) {
    let mut dst = dst.sub_image_mut(left, top, src.width(), src.height());
    for (d, s) in dst.rows_mut().zip(src.rows()) {
        d.copy_from_slice(s);
    }
}
