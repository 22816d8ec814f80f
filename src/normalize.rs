//! Turns source animations into frames of one fixed size

use crate::error::*;
use crate::frames::FrameSequence;
use crate::progress::{ProgressRange, ProgressReporter};
use crate::Settings;
use imgref::*;
use rgb::*;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Reads a GIF frame by frame, applying each frame's disposal,
/// so that every yielded image is the full screen as it would be displayed.
pub(crate) struct GifFrames<R: Read> {
    decoder: gif::Decoder<R>,
    screen: gif_dispose::Screen,
}

impl<R: Read> GifFrames<R> {
    pub fn new(input: R) -> FrameResult<Self> {
        let mut gif_opts = gif::DecodeOptions::new();
        // Important:
        gif_opts.set_color_output(gif::ColorOutput::Indexed);

        let decoder = gif_opts.read_info(input)?;
        let screen = gif_dispose::Screen::new_decoder(&decoder);
        Ok(Self { decoder, screen })
    }

    pub fn next_frame(&mut self) -> FrameResult<Option<ImgVec<RGBA8>>> {
        match self.decoder.read_next_frame()? {
            Some(frame) => {
                self.screen.blit_frame(frame)?;
                Ok(Some(self.screen.pixels_rgba().map_buf(|b| b.to_owned())))
            },
            None => Ok(None),
        }
    }
}

pub(crate) fn open_input(path: &Path) -> FrameResult<BufReader<File>> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|err| Error::Input(format!("Can't open {}: {}", path.display(), err)))
}

pub(crate) fn load_png(path: &Path) -> FrameResult<ImgVec<RGBA8>> {
    if !path.exists() {
        return Err(Error::Input(format!("{} does not exist", path.display())));
    }
    let image = lodepng::decode32_file(path)
        .map_err(|err| Error::Decode(format!("Can't load {}: {}", path.display(), err)))?;
    Ok(ImgVec::new(image.buffer, image.width, image.height))
}

/// Frame Normalizer
///
/// Every output frame is exactly `width`×`height`. Aspect ratio is not preserved.
pub struct Normalizer {
    width: usize,
    height: usize,
    range: ProgressRange,
}

impl Normalizer {
    pub fn new(settings: &Settings) -> Self {
        Self {
            width: settings.width as usize,
            height: settings.height as usize,
            range: ProgressRange::NORMALIZE,
        }
    }

    /// Part of the overall progress bar this stage reports into
    pub fn with_progress_range(mut self, range: ProgressRange) -> Self {
        self.range = range;
        self
    }

    /// Decodes all frames of an animated GIF and resizes them.
    ///
    /// The whole file is decoded first, because the frame count is needed for progress.
    pub fn normalize_gif_file(&self, path: &Path, reporter: &mut dyn ProgressReporter) -> FrameResult<FrameSequence> {
        let mut gif = GifFrames::new(open_input(path)?)?;
        let mut decoded = Vec::new();
        while let Some(frame) = gif.next_frame()? {
            decoded.push(frame);
        }
        debug!(frames = decoded.len(), path = %path.display(), "decoded GIF");
        self.normalize(decoded.into_iter().map(Ok), reporter)
    }

    /// Loads still PNG frames in the given order and resizes them
    pub fn normalize_png_files(&self, paths: &[PathBuf], reporter: &mut dyn ProgressReporter) -> FrameResult<FrameSequence> {
        self.normalize(paths.iter().map(|path| load_png(path)), reporter)
    }

    /// Resizes frames that have been decoded elsewhere
    pub fn normalize_frames(&self, frames: FrameSequence, reporter: &mut dyn ProgressReporter) -> FrameResult<FrameSequence> {
        self.normalize(frames.into_frames().into_iter().map(Ok), reporter)
    }

    fn normalize<I>(&self, frames: I, reporter: &mut dyn ProgressReporter) -> FrameResult<FrameSequence>
    where I: ExactSizeIterator<Item = FrameResult<ImgVec<RGBA8>>> {
        let total = frames.len();
        if total == 0 {
            return Err(Error::NoFrames);
        }

        let mut out = FrameSequence::with_capacity(total);
        for (i, frame) in frames.enumerate() {
            out.push(self.resized(frame?)?)?;
            reporter.on_progress(self.range.percent(i + 1, total));
        }
        Ok(out)
    }

    fn resized(&self, image: ImgVec<RGBA8>) -> FrameResult<ImgVec<RGBA8>> {
        let (buf, img_width, img_height) = image.into_contiguous_buf();
        if img_width == self.width && img_height == self.height {
            return Ok(ImgVec::new(buf, img_width, img_height));
        }
        if img_width == 0 || img_height == 0 {
            return Err(Error::Decode(format!("Frame has no pixels ({}×{})", img_width, img_height)));
        }

        let mut r = resize::new(img_width, img_height, self.width, self.height, resize::Pixel::RGBA8P, resize::Type::Lanczos3)?;
        let mut dst = vec![RGBA8::new(0, 0, 0, 0); self.width * self.height];
        r.resize(&buf, &mut dst)?;
        Ok(ImgVec::new(dst, self.width, self.height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;

    struct Recorder(Vec<u8>);
    impl ProgressReporter for Recorder {
        fn on_progress(&mut self, percent: u8) {
            self.0.push(percent);
        }
    }

    fn settings(width: u32, height: u32) -> Settings {
        Settings { width, height, ..Settings::default() }
    }

    fn solid(width: usize, height: usize, px: RGBA8) -> ImgVec<RGBA8> {
        ImgVec::new(vec![px; width * height], width, height)
    }

    #[test]
    fn stretches_to_exact_size() {
        let mut seq = FrameSequence::new();
        seq.push(solid(10, 30, RGBA8::new(200, 10, 10, 255))).unwrap();
        seq.push(solid(10, 30, RGBA8::new(200, 10, 10, 255))).unwrap();

        let out = Normalizer::new(&settings(25, 7)).normalize_frames(seq, &mut NoProgress {}).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out.dimensions(), Some((25, 7)));
        for px in out.iter().flat_map(|f| f.buf().iter()) {
            assert!(px.a >= 254, "{:?}", px);
            assert!(px.r >= 198 && px.g <= 12, "{:?}", px);
        }
    }

    #[test]
    fn reports_progress_per_frame() {
        let mut seq = FrameSequence::new();
        for _ in 0..4 {
            seq.push(solid(2, 2, RGBA8::new(0, 0, 0, 255))).unwrap();
        }
        let mut rec = Recorder(Vec::new());
        Normalizer::new(&settings(2, 2)).normalize_frames(seq, &mut rec).unwrap();
        assert_eq!(rec.0, vec![20, 30, 40, 50]);
    }

    #[test]
    fn custom_range() {
        let mut seq = FrameSequence::new();
        seq.push(solid(2, 2, RGBA8::new(0, 0, 0, 255))).unwrap();
        seq.push(solid(2, 2, RGBA8::new(0, 0, 0, 255))).unwrap();
        let mut rec = Recorder(Vec::new());
        Normalizer::new(&settings(2, 2))
            .with_progress_range(ProgressRange { start: 0, end: 50 })
            .normalize_frames(seq, &mut rec).unwrap();
        assert_eq!(rec.0, vec![25, 50]);
    }

    #[test]
    fn empty_source_is_an_error() {
        let res = Normalizer::new(&settings(2, 2)).normalize_frames(FrameSequence::new(), &mut NoProgress {});
        assert!(matches!(res, Err(Error::NoFrames)));
    }

    #[test]
    fn missing_files_are_input_errors() {
        let n = Normalizer::new(&settings(2, 2));
        let missing = Path::new("/nonexistent/framegif/in.gif");
        assert!(matches!(n.normalize_gif_file(missing, &mut NoProgress {}), Err(Error::Input(_))));
        let pngs = [PathBuf::from("/nonexistent/framegif/1.png")];
        assert!(matches!(n.normalize_png_files(&pngs, &mut NoProgress {}), Err(Error::Input(_))));
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let res = GifFrames::new(&b"definitely not a gif"[..]);
        assert!(matches!(res, Err(Error::Decode(_))));
    }
}
