//! Frame Compositor: rounded frames centered over a fixed background

use crate::error::*;
use crate::frames::FrameSequence;
use crate::mask::AlphaMask;
use crate::progress::{ProgressRange, ProgressReporter};
use imgref::*;
use rgb::*;
use tracing::debug;

/// Top-left corner that centers a `frame`-sized image over a `background`-sized one.
///
/// Rounds towards negative infinity, so frames larger than the background get negative offsets.
pub fn centered_offset(background: (usize, usize), frame: (usize, usize)) -> (isize, isize) {
    let (bw, bh) = (background.0 as isize, background.1 as isize);
    let (fw, fh) = (frame.0 as isize, frame.1 as isize);
    ((bw - fw).div_euclid(2), (bh - fh).div_euclid(2))
}

/// Porter-Duff "over" for non-premultiplied pixels
#[inline]
pub fn over(dst: RGBA8, src: RGBA8) -> RGBA8 {
    match src.a {
        255 => return src,
        0 => return dst,
        _ => {},
    }
    let sa = u32::from(src.a) * 255;
    let da = u32::from(dst.a) * (255 - u32::from(src.a));
    let total = sa + da;
    let blend = |s: u8, d: u8| ((u32::from(s) * sa + u32::from(d) * da + total / 2) / total) as u8;
    RGBA8 {
        r: blend(src.r, dst.r),
        g: blend(src.g, dst.g),
        b: blend(src.b, dst.b),
        a: ((total + 127) / 255) as u8,
    }
}

pub struct Compositor {
    background: ImgVec<RGBA8>,
    mask: AlphaMask,
    offset: (isize, isize),
    range: ProgressRange,
}

impl Compositor {
    /// `frame_size` is the size of every frame that will be composited
    pub fn new(background: ImgVec<RGBA8>, frame_size: (usize, usize), corner_radius: usize) -> Self {
        let mask = AlphaMask::rounded_rect(frame_size.0, frame_size.1, corner_radius);
        let offset = centered_offset((background.width(), background.height()), frame_size);
        debug!(radius = mask.radius(), x = offset.0, y = offset.1, "placing {}×{} frames on {}×{} background",
            frame_size.0, frame_size.1, background.width(), background.height());
        Self { background, mask, offset, range: ProgressRange::COMPOSITE }
    }

    /// Part of the overall progress bar this stage reports into
    pub fn with_progress_range(mut self, range: ProgressRange) -> Self {
        self.range = range;
        self
    }

    pub fn offset(&self) -> (isize, isize) {
        self.offset
    }

    pub fn background(&self) -> ImgRef<'_, RGBA8> {
        self.background.as_ref()
    }

    /// Rounds the corners of the frame and flattens it over a copy of the background.
    ///
    /// The result is always the size of the background. Parts of the frame outside of it are cut off.
    pub fn composite(&self, mut frame: ImgVec<RGBA8>) -> FrameResult<ImgVec<RGBA8>> {
        self.mask.apply(&mut frame)?;

        let mut out = self.background.clone();
        let (left, top) = self.offset;
        let x0 = left.max(0);
        let y0 = top.max(0);
        let x1 = (left + frame.width() as isize).min(out.width() as isize);
        let y1 = (top + frame.height() as isize).min(out.height() as isize);
        if x1 <= x0 || y1 <= y0 {
            return Ok(out);
        }

        let (width, height) = ((x1 - x0) as usize, (y1 - y0) as usize);
        let src = frame.sub_image((x0 - left) as usize, (y0 - top) as usize, width, height);
        let mut dst = out.sub_image_mut(x0 as usize, y0 as usize, width, height);
        for (dst_row, src_row) in dst.rows_mut().zip(src.rows()) {
            for (d, &s) in dst_row.iter_mut().zip(src_row) {
                *d = over(*d, s);
            }
        }
        Ok(out)
    }

    /// Composites every frame, in order
    pub fn composite_all(&self, frames: FrameSequence, reporter: &mut dyn ProgressReporter) -> FrameResult<Vec<ImgVec<RGBA8>>> {
        let total = frames.len();
        let mut out = Vec::with_capacity(total);
        for (i, frame) in frames.into_iter().enumerate() {
            out.push(self.composite(frame)?);
            reporter.on_progress(self.range.percent(i + 1, total));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: RGBA8 = RGBA8 { r: 255, g: 0, b: 0, a: 255 };
    const WHITE: RGBA8 = RGBA8 { r: 255, g: 255, b: 255, a: 255 };

    fn solid(width: usize, height: usize, px: RGBA8) -> ImgVec<RGBA8> {
        ImgVec::new(vec![px; width * height], width, height)
    }

    #[test]
    fn offsets_are_floored() {
        assert_eq!(centered_offset((400, 400), (100, 100)), (150, 150));
        assert_eq!(centered_offset((401, 400), (100, 99)), (150, 150));
        assert_eq!(centered_offset((10, 10), (13, 10)), (-2, 0));
    }

    #[test]
    fn over_extremes() {
        let bg = RGBA8::new(1, 2, 3, 200);
        assert_eq!(over(bg, RED), RED);
        assert_eq!(over(bg, RGBA8::new(9, 9, 9, 0)), bg);
    }

    #[test]
    fn over_blends_linearly() {
        let half_black = RGBA8::new(0, 0, 0, 128);
        let px = over(WHITE, half_black);
        assert_eq!(px.a, 255);
        assert!(px.r == 127 || px.r == 128, "{:?}", px);

        // onto fully transparent, color is kept as-is
        assert_eq!(over(RGBA8::new(0, 0, 0, 0), RGBA8::new(50, 60, 70, 90)), RGBA8::new(50, 60, 70, 90));
    }

    #[test]
    fn centers_rounded_frame() {
        let c = Compositor::new(solid(400, 400, WHITE), (100, 100), 20);
        assert_eq!(c.offset(), (150, 150));
        let out = c.composite(solid(100, 100, RED)).unwrap();
        assert_eq!((out.width(), out.height()), (400, 400));

        assert_eq!(out[(200_usize, 200_usize)], RED);
        assert_eq!(out[(150_usize, 200_usize)], RED);
        assert_eq!(out[(249_usize, 200_usize)], RED);
        // just outside of the frame
        assert_eq!(out[(149_usize, 200_usize)], WHITE);
        assert_eq!(out[(250_usize, 200_usize)], WHITE);
        assert_eq!(out[(200_usize, 149_usize)], WHITE);
        // cut corners
        assert_eq!(out[(150_usize, 150_usize)], WHITE);
        assert_eq!(out[(249_usize, 249_usize)], WHITE);
        assert_eq!(out[(160_usize, 160_usize)], RED);
    }

    #[test]
    fn transparent_background_shows_only_frame() {
        let c = Compositor::new(solid(20, 20, RGBA8::new(0, 0, 0, 0)), (10, 10), 0);
        let out = c.composite(solid(10, 10, RGBA8::new(0, 255, 0, 12))).unwrap();
        // mask makes the frame opaque
        assert_eq!(out[(5_usize, 5_usize)], RGBA8::new(0, 255, 0, 255));
        assert_eq!(out[(4_usize, 5_usize)].a, 0);
    }

    #[test]
    fn oversized_frames_are_clipped() {
        let c = Compositor::new(solid(10, 10, WHITE), (14, 6), 0);
        assert_eq!(c.offset(), (-2, 2));
        let out = c.composite(solid(14, 6, RED)).unwrap();
        assert_eq!((out.width(), out.height()), (10, 10));
        assert_eq!(out[(0_usize, 2_usize)], RED);
        assert_eq!(out[(9_usize, 7_usize)], RED);
        assert_eq!(out[(0_usize, 1_usize)], WHITE);
        assert_eq!(out[(9_usize, 8_usize)], WHITE);
    }

    #[test]
    fn composite_is_deterministic() {
        let c = Compositor::new(solid(50, 40, WHITE), (20, 20), 6);
        let mut frame = solid(20, 20, RED);
        frame[(3_usize, 4_usize)] = RGBA8::new(1, 2, 3, 4);
        assert_eq!(c.composite(frame.clone()).unwrap(), c.composite(frame).unwrap());
    }

    #[test]
    fn wrong_frame_size_fails() {
        let c = Compositor::new(solid(50, 40, WHITE), (20, 20), 6);
        assert!(matches!(c.composite(solid(21, 20, RED)), Err(Error::WrongSize(_))));
    }
}
