/*
 framegif: animated GIFs inside device frames
 © 2026 framegif developers

 This program is free software: you can redistribute it and/or modify
 it under the terms of the GNU Affero General Public License as
 published by the Free Software Foundation, either version 3 of the
 License, or (at your option) any later version.

 This program is distributed in the hope that it will be useful,
 but WITHOUT ANY WARRANTY; without even the implied warranty of
 MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 GNU Affero General Public License for more details.

 You should have received a copy of the GNU Affero General Public License
 along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/
//! Puts an animation inside a still "device frame" image.
//!
//! Every source frame is stretched to a fixed size, gets rounded corners,
//! and is centered over the background. The result is written as a looping GIF.
//!
//! ```no_run
//! # fn main() -> Result<(), framegif::Error> {
//! use framegif::{CompositeJob, Settings, Source, progress::NoProgress};
//!
//! let job = CompositeJob {
//!     source: Source::Path("screen.gif".into()),
//!     background: "phone.png".into(),
//!     output: "framed.gif".into(),
//!     settings: Settings::default(),
//! };
//! framegif::run(job, &mut NoProgress {})?;
//! # Ok(()) }
//! ```

mod error;
pub use crate::error::*;
mod frames;
pub use crate::frames::FrameSequence;
pub mod progress;
use crate::progress::*;
pub mod mask;
pub mod normalize;
pub mod compose;
pub mod still;
mod encoderust;

use crate::compose::Compositor;
use crate::encoderust::RustEncoder;
use crate::normalize::Normalizer;
use imgref::*;
use rgb::*;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Instant;
use tracing::{debug, info};

/// Extensions of files that have to be converted to frames by an external tool first
const VIDEO_EXTENSIONS: [&str; 7] = ["mp4", "mov", "avi", "mkv", "wmv", "flv", "webm"];

/// Settings for a run. See `Default` for the stock device frame.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Every source frame is resized to exactly this width
    pub width: u32,
    /// Every source frame is resized to exactly this height. Note that aspect ratio is not preserved.
    pub height: u32,
    /// Radius of the rounded corners, in pixels of the resized frame
    pub corner_radius: u32,
    /// Display time of each output frame
    pub frame_duration_ms: u32,
    /// If true, looping is disabled
    pub once: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            width: 2257,
            height: 4854,
            corner_radius: 275,
            frame_duration_ms: 100,
            once: false,
        }
    }
}

impl Settings {
    /// Frame delay in GIF units (1/100th of a second), at least 1
    pub fn gif_delay(&self) -> u16 {
        (self.frame_duration_ms.saturating_add(5) / 10).clamp(1, u32::from(u16::MAX)) as u16
    }

    pub fn validate(&self) -> FrameResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::Input(format!("Frame size must not be zero ({}×{})", self.width, self.height)));
        }
        if self.width > u32::from(u16::MAX) || self.height > u32::from(u16::MAX) {
            return Err(Error::Input(format!("Frame size {}×{} is too large for GIF", self.width, self.height)));
        }
        Ok(())
    }
}

/// Where the frames come from
#[derive(Debug, Clone)]
pub enum Source {
    /// Animated GIF file
    Path(PathBuf),
    /// Still PNG frames, in display order
    PngFrames(Vec<PathBuf>),
    /// Frames decoded elsewhere, e.g. from a video
    Frames(FrameSequence),
}

impl Source {
    /// Sorts file names in natural order, so that `frame10.png` comes after `frame9.png`
    pub fn from_png_files(mut paths: Vec<PathBuf>) -> Self {
        paths.sort_by(|a, b| natord::compare(&a.to_string_lossy(), &b.to_string_lossy()));
        Source::PngFrames(paths)
    }
}

/// Everything needed for a single run
#[derive(Debug, Clone)]
pub struct CompositeJob {
    pub source: Source,
    /// The still device frame image
    pub background: PathBuf,
    pub output: PathBuf,
    pub settings: Settings,
}

/// Result of a successful run
#[derive(Debug, Clone, PartialEq)]
pub struct Finished {
    pub output_path: PathBuf,
    pub frames: usize,
    pub elapsed_seconds: f64,
}

/// Runs the whole pipeline on the current thread.
///
/// Errors are reported to `reporter.on_error()` and returned. Nothing is reported after an error.
pub fn run(job: CompositeJob, reporter: &mut dyn ProgressReporter) -> FrameResult<Finished> {
    match run_stages(job, reporter) {
        Ok(done) => {
            info!(output = %done.output_path.display(), frames = done.frames, elapsed = done.elapsed_seconds, "done");
            reporter.on_finished(&done.output_path, done.elapsed_seconds);
            Ok(done)
        },
        Err(err) => {
            reporter.on_error(err.to_string());
            Err(err)
        },
    }
}

/// Runs the pipeline on a new thread, so that a UI can stay responsive.
///
/// Use `ChannelReporter` to receive progress on the UI thread.
pub fn spawn<R>(job: CompositeJob, mut reporter: R) -> FrameResult<thread::JoinHandle<FrameResult<Finished>>>
where R: ProgressReporter + 'static {
    thread::Builder::new()
        .name("framegif-worker".into())
        .spawn(move || run(job, &mut reporter))
        .map_err(Error::Io)
}

/// Waits for a job started with `spawn`.
///
/// A worker that panicked is reported as `Error::ThreadSend`.
pub fn wait(handle: thread::JoinHandle<FrameResult<Finished>>) -> FrameResult<Finished> {
    handle.join().map_err(|_| Error::ThreadSend)?
}

fn run_stages(job: CompositeJob, reporter: &mut dyn ProgressReporter) -> FrameResult<Finished> {
    let start = Instant::now();
    let CompositeJob { source, background, output, settings } = job;
    settings.validate()?;

    reporter.on_progress(ProgressRange::NORMALIZE.start);
    reporter.on_status("Resizing frames...");
    let frames = normalize_source(source, &settings, reporter)?;

    reporter.on_status("Overlaying frames on background...");
    let background = still::load_rgba(&background)?;
    let frame_size = frames.dimensions().ok_or(Error::NoFrames)?;
    let composited = Compositor::new(background, frame_size, settings.corner_radius as usize)
        .composite_all(frames, reporter)?;

    reporter.on_status("Saving output GIF...");
    write_gif_file(&composited, &output, &settings)?;

    Ok(Finished {
        output_path: output,
        frames: composited.len(),
        elapsed_seconds: start.elapsed().as_secs_f64(),
    })
}

fn normalize_source(source: Source, settings: &Settings, reporter: &mut dyn ProgressReporter) -> FrameResult<FrameSequence> {
    let normalizer = Normalizer::new(settings);
    match source {
        Source::Path(path) => {
            if is_video_file(&path) {
                return Err(Error::ExternalTool(format!(
                    "{} is a video. Convert it to frames first, e.g. `ffmpeg -i {} frame%04d.png`, and use the PNG frames or a GIF instead",
                    path.display(), path.display())));
            }
            normalizer.normalize_gif_file(&path, reporter)
        },
        Source::PngFrames(paths) => normalizer.normalize_png_files(&paths, reporter),
        Source::Frames(frames) => normalizer.normalize_frames(frames, reporter),
    }
}

pub fn is_video_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| VIDEO_EXTENSIONS.iter().any(|v| v.eq_ignore_ascii_case(ext)))
}

/// Encodes frames as a GIF, in order, with uniform delay.
///
/// The file is first written next to `output` and renamed when complete,
/// so a failure never leaves a truncated file at `output`.
pub fn write_gif_file(frames: &[ImgVec<RGBA8>], output: &Path, settings: &Settings) -> FrameResult<()> {
    let tmp_path = temp_path_for(output);
    debug!(frames = frames.len(), tmp = %tmp_path.display(), "encoding");
    let res = write_gif_to(frames, &tmp_path, settings)
        .and_then(|_| fs::rename(&tmp_path, output).map_err(Error::from));
    if res.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    res
}

fn write_gif_to(frames: &[ImgVec<RGBA8>], path: &Path, settings: &Settings) -> FrameResult<()> {
    if frames.is_empty() {
        return Err(Error::NoFrames);
    }
    let file = File::create(path)
        .map_err(|err| Error::Io(std::io::Error::new(err.kind(), format!("Can't write to {}: {}", path.display(), err))))?;
    let mut enc = RustEncoder::new(BufWriter::new(file));
    for frame in frames {
        enc.write_frame(frame.as_ref(), settings)?;
    }
    let file = enc.finish()?
        .into_inner()
        .map_err(|err| Error::Io(err.into_error()))?;
    file.sync_all()?;
    Ok(())
}

fn temp_path_for(output: &Path) -> PathBuf {
    let mut name = output.file_name().map(|n| n.to_os_string()).unwrap_or_else(|| OsString::from("out.gif"));
    name.push(".tmp");
    output.with_file_name(name)
}
