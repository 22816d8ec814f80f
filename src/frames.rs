use crate::error::*;
use imgref::*;
use rgb::*;

/// Ordered frames of an animation, all of the same size.
///
/// Insertion order is display order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameSequence {
    frames: Vec<ImgVec<RGBA8>>,
}

impl FrameSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { frames: Vec::with_capacity(capacity) }
    }

    /// Appends a frame. Fails if its size differs from the frames already added.
    pub fn push(&mut self, frame: ImgVec<RGBA8>) -> FrameResult<()> {
        if let Some((width, height)) = self.dimensions() {
            if frame.width() != width || frame.height() != height {
                return Err(Error::WrongSize(format!("Frame {} has wrong size ({}×{}, expected {}×{})",
                    self.frames.len() + 1, frame.width(), frame.height(), width, height)));
            }
        }
        self.frames.push(frame);
        Ok(())
    }

    /// Size of every frame, or `None` if there are no frames
    pub fn dimensions(&self) -> Option<(usize, usize)> {
        self.frames.first().map(|f| (f.width(), f.height()))
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ImgVec<RGBA8>> {
        self.frames.iter()
    }

    pub fn into_frames(self) -> Vec<ImgVec<RGBA8>> {
        self.frames
    }
}

impl IntoIterator for FrameSequence {
    type Item = ImgVec<RGBA8>;
    type IntoIter = std::vec::IntoIter<ImgVec<RGBA8>>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.into_iter()
    }
}

impl<'a> IntoIterator for &'a FrameSequence {
    type Item = &'a ImgVec<RGBA8>;
    type IntoIter = std::slice::Iter<'a, ImgVec<RGBA8>>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.iter()
    }
}
