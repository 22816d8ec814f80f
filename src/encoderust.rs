use crate::error::*;
use crate::Settings;
use imgref::*;
use rgb::*;
use std::borrow::Cow;
use std::io::Write;

/// Writes full frames, one palette per frame. No inter-frame optimizations.
pub(crate) struct RustEncoder<W: Write> {
    writer: Option<W>,
    gif_enc: Option<gif::Encoder<W>>,
}

impl<W: Write> RustEncoder<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Some(writer),
            gif_enc: None,
        }
    }

    pub fn write_frame(&mut self, image: ImgRef<'_, RGBA8>, settings: &Settings) -> FrameResult<()> {
        let (width, height) = gif_dimensions(image)?;
        let writer = &mut self.writer;
        let enc = match self.gif_enc {
            None => {
                let w = writer.take().ok_or(Error::ThreadSend)?;
                let mut enc = gif::Encoder::new(w, width, height, &[])?;
                if !settings.once {
                    enc.set_repeat(gif::Repeat::Infinite)?;
                }
                self.gif_enc.get_or_insert(enc)
            },
            Some(ref mut enc) => enc,
        };

        let (pal, pixels) = quantize(binary_alpha(image))?;

        let mut transparent_index = None;
        let mut pal_rgb = Vec::with_capacity(3 * pal.len());
        for (i, p) in pal.iter().enumerate() {
            if p.a == 0 {
                transparent_index = Some(i as u8);
            }
            pal_rgb.extend_from_slice([p.rgb()].as_bytes());
        }

        enc.write_frame(&gif::Frame {
            delay: settings.gif_delay(),
            // every frame replaces the previous one completely
            dispose: gif::DisposalMethod::Background,
            transparent: transparent_index,
            width,
            height,
            palette: Some(pal_rgb),
            buffer: Cow::Owned(pixels),
            ..gif::Frame::default()
        })?;
        Ok(())
    }

    /// Writes the trailer and returns the writer
    pub fn finish(mut self) -> FrameResult<W> {
        match self.gif_enc.take() {
            Some(enc) => Ok(enc.into_inner()?),
            None => Err(Error::NoFrames),
        }
    }
}

fn gif_dimensions(image: ImgRef<'_, RGBA8>) -> FrameResult<(u16, u16)> {
    match (u16::try_from(image.width()), u16::try_from(image.height())) {
        (Ok(w), Ok(h)) if w > 0 && h > 0 => Ok((w, h)),
        _ => Err(Error::WrongSize(format!("{}×{} can't be stored in a GIF (max 65535×65535)",
            image.width(), image.height()))),
    }
}

fn quantize(image: ImgVec<RGBA8>) -> FrameResult<(Vec<RGBA8>, Vec<u8>)> {
    let mut liq = imagequant::new();
    liq.set_quality(0, 100)?;
    let (buf, width, height) = image.into_contiguous_buf();
    let has_transparency = buf.iter().any(|px| px.a == 0);
    let mut img = liq.new_image(&buf[..], width, height, 0.)?;
    if has_transparency {
        img.add_fixed_color(RGBA8::new(0, 0, 0, 0))?;
    }
    let mut res = liq.quantize(&mut img)?;
    res.set_dithering_level(0.5)?;

    let (pal, pixels) = res.remapped(&mut img)?;
    debug_assert_eq!(width * height, pixels.len());
    Ok((pal, pixels))
}

/// GIF has only on/off transparency
fn binary_alpha(image: ImgRef<'_, RGBA8>) -> ImgVec<RGBA8> {
    const DITHER: [u8; 64] = [
     0*2+8,48*2+8,12*2+8,60*2+8, 3*2+8,51*2+8,15*2+8,63*2+8,
    32*2+8,16*2+8,44*2+8,28*2+8,35*2+8,19*2+8,47*2+8,31*2+8,
     8*2+8,56*2+8, 4*2+8,52*2+8,11*2+8,59*2+8, 7*2+8,55*2+8,
    40*2+8,24*2+8,36*2+8,20*2+8,43*2+8,27*2+8,39*2+8,23*2+8,
     2*2+8,50*2+8,14*2+8,62*2+8, 1*2+8,49*2+8,13*2+8,61*2+8,
    34*2+8,18*2+8,46*2+8,30*2+8,33*2+8,17*2+8,45*2+8,29*2+8,
    10*2+8,58*2+8, 6*2+8,54*2+8, 9*2+8,57*2+8, 5*2+8,53*2+8,
    42*2+8,26*2+8,38*2+8,22*2+8,41*2+8,25*2+8,37*2+8,21*2+8];

    let mut image = image.map_buf(|b| b.to_vec());
    for (y, row) in image.rows_mut().enumerate() {
        for (x, px) in row.iter_mut().enumerate() {
            if px.a < 255 {
                *px = if px.a < DITHER[(y & 7) * 8 + (x & 7)] {
                    RGBA8::new(0, 0, 0, 0)
                } else {
                    RGBA8 { a: 255, ..*px }
                };
            }
        }
    }
    image
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alpha_becomes_binary() {
        let px = [RGBA8::new(9, 9, 9, 0), RGBA8::new(9, 9, 9, 3), RGBA8::new(9, 9, 9, 200), RGBA8::new(9, 9, 9, 255)];
        let img = binary_alpha(ImgRef::new(&px[..], 4, 1));
        assert_eq!(img.buf()[0], RGBA8::new(0, 0, 0, 0));
        assert_eq!(img.buf()[1], RGBA8::new(0, 0, 0, 0));
        assert_eq!(img.buf()[2], RGBA8::new(9, 9, 9, 255));
        assert_eq!(img.buf()[3], RGBA8::new(9, 9, 9, 255));
    }

    #[test]
    fn transparent_color_only_when_needed() {
        let opaque = ImgVec::new(vec![RGBA8::new(200, 100, 0, 255); 6 * 6], 6, 6);
        let (pal, _) = quantize(opaque).unwrap();
        assert!(pal.iter().all(|p| p.a == 255), "{:?}", pal);

        let mut holes = ImgVec::new(vec![RGBA8::new(200, 100, 0, 255); 6 * 6], 6, 6);
        holes[(0_usize, 0_usize)] = RGBA8::new(0, 0, 0, 0);
        let (pal, pixels) = quantize(holes).unwrap();
        assert_eq!(pal[usize::from(pixels[0])].a, 0);
        assert_eq!(pal[usize::from(pixels[35])].a, 255);
    }

    #[test]
    fn writes_a_looping_gif() {
        let frame = ImgVec::new(vec![RGBA8::new(255, 0, 0, 255); 8 * 4], 8, 4);
        let mut enc = RustEncoder::new(Vec::new());
        let settings = Settings::default();
        enc.write_frame(frame.as_ref(), &settings).unwrap();
        enc.write_frame(frame.as_ref(), &settings).unwrap();
        let out = enc.finish().unwrap();

        assert!(out.starts_with(b"GIF89a"));
        assert!(out.windows(11).any(|w| w == b"NETSCAPE2.0"));

        let mut opts = gif::DecodeOptions::new();
        opts.set_color_output(gif::ColorOutput::RGBA);
        let mut dec = opts.read_info(&out[..]).unwrap();
        let mut n = 0;
        while let Some(f) = dec.read_next_frame().unwrap() {
            assert_eq!((f.width, f.height, f.delay), (8, 4, 10));
            let px = &f.buffer[..4];
            assert!(px[0] > 250 && px[1] < 5 && px[2] < 5 && px[3] == 255, "{:?}", px);
            n += 1;
        }
        assert_eq!(n, 2);
    }

    #[test]
    fn once_has_no_loop_extension() {
        let frame = ImgVec::new(vec![RGBA8::new(0, 0, 255, 255); 4], 2, 2);
        let mut enc = RustEncoder::new(Vec::new());
        enc.write_frame(frame.as_ref(), &Settings { once: true, ..Settings::default() }).unwrap();
        let out = enc.finish().unwrap();
        assert!(!out.windows(11).any(|w| w == b"NETSCAPE2.0"));
    }

    #[test]
    fn nothing_written_is_an_error() {
        let enc = RustEncoder::new(Vec::new());
        assert!(matches!(enc.finish(), Err(Error::NoFrames)));
    }
}
