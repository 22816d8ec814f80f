//! For tracking conversion progress and reporting the outcome of a run

use crossbeam_channel::{Receiver, Sender};
use std::path::{Path, PathBuf};

/// A trait that is used to report progress to some consumer, usually a UI.
///
/// Calls arrive on the thread that runs the pipeline. During one run
/// `on_progress` values never decrease, and either `on_finished` or
/// `on_error` is the last call.
pub trait ProgressReporter: Send {
    /// Overall completion, 0-100.
    fn on_progress(&mut self, _percent: u8) {}

    /// Human-readable description of the current stage
    fn on_status(&mut self, _message: &str) {}

    /// The output file has been written successfully
    fn on_finished(&mut self, _output_path: &Path, _elapsed_seconds: f64) {}

    /// The run has failed and has been abandoned
    #[cold]
    fn on_error(&mut self, _message: String) {}
}

/// No-op progress reporter
pub struct NoProgress {}

impl ProgressReporter for NoProgress {}

impl<T: ProgressReporter + ?Sized> ProgressReporter for &mut T {
    fn on_progress(&mut self, percent: u8) {
        (**self).on_progress(percent)
    }

    fn on_status(&mut self, message: &str) {
        (**self).on_status(message)
    }

    fn on_finished(&mut self, output_path: &Path, elapsed_seconds: f64) {
        (**self).on_finished(output_path, elapsed_seconds)
    }

    fn on_error(&mut self, message: String) {
        (**self).on_error(message)
    }
}

impl<T: ProgressReporter + ?Sized> ProgressReporter for Box<T> {
    fn on_progress(&mut self, percent: u8) {
        (**self).on_progress(percent)
    }

    fn on_status(&mut self, message: &str) {
        (**self).on_status(message)
    }

    fn on_finished(&mut self, output_path: &Path, elapsed_seconds: f64) {
        (**self).on_finished(output_path, elapsed_seconds)
    }

    fn on_error(&mut self, message: String) {
        (**self).on_error(message)
    }
}

/// Portion of the overall 0-100 progress owned by one stage.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ProgressRange {
    pub start: u8,
    pub end: u8,
}

impl ProgressRange {
    /// Reserved for converting a video into frames before the run (done outside of this crate)
    pub const CONVERSION: Self = Self { start: 0, end: 10 };
    /// Decoding and resizing of source frames
    pub const NORMALIZE: Self = Self { start: 10, end: 50 };
    /// Compositing frames onto the background
    pub const COMPOSITE: Self = Self { start: 50, end: 100 };

    /// `done` is 1-based, so the last item reports `end`.
    pub fn percent(&self, done: usize, total: usize) -> u8 {
        if total == 0 {
            return self.end;
        }
        let span = usize::from(self.end.saturating_sub(self.start));
        self.start + (done.min(total) * span / total) as u8
    }
}

/// Everything a `ProgressReporter` can be told, as a value
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Progress(u8),
    Status(String),
    Finished { output_path: PathBuf, elapsed_seconds: f64 },
    Error(String),
}

impl Event {
    /// Whether no further events will follow this one
    pub fn is_terminal(&self) -> bool {
        matches!(self, Event::Finished { .. } | Event::Error(_))
    }
}

/// Forwards progress to another thread, e.g. a UI event loop.
///
/// Events are dropped silently if the receiving side has gone away.
#[derive(Clone)]
pub struct ChannelReporter {
    sender: Sender<Event>,
}

impl ChannelReporter {
    pub fn new() -> (Self, Receiver<Event>) {
        let (sender, receiver) = crossbeam_channel::unbounded();
        (Self { sender }, receiver)
    }

    fn send(&self, event: Event) {
        let _ = self.sender.send(event);
    }
}

impl ProgressReporter for ChannelReporter {
    fn on_progress(&mut self, percent: u8) {
        self.send(Event::Progress(percent));
    }

    fn on_status(&mut self, message: &str) {
        self.send(Event::Status(message.to_owned()));
    }

    fn on_finished(&mut self, output_path: &Path, elapsed_seconds: f64) {
        self.send(Event::Finished { output_path: output_path.to_owned(), elapsed_seconds });
    }

    fn on_error(&mut self, message: String) {
        self.send(Event::Error(message));
    }
}
