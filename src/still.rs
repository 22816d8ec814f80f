//! Loading of the still background image

use crate::error::*;
use crate::normalize::{load_png, open_input, GifFrames};
use imgref::*;
use rgb::*;
use std::io::Read;
use std::path::Path;

const PNG_MAGIC: &[u8] = b"\x89PNG";
const GIF_MAGIC: &[u8] = b"GIF8";

/// Loads an image as RGBA. Images without alpha are opaque.
///
/// PNG and GIF (first frame only) are decoded directly, other formats go through `image`.
pub fn load_rgba(path: &Path) -> FrameResult<ImgVec<RGBA8>> {
    let mut magic = [0_u8; 4];
    let mut file = open_input(path)?;
    let len = file.read(&mut magic)
        .map_err(|err| Error::Input(format!("Can't read {}: {}", path.display(), err)))?;
    let magic = &magic[..len];

    if magic.starts_with(PNG_MAGIC) {
        return load_png(path);
    }
    if magic.starts_with(GIF_MAGIC) {
        return GifFrames::new(open_input(path)?)?
            .next_frame()?
            .ok_or_else(|| Error::Decode(format!("{} has no frames", path.display())));
    }

    let image = image::ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|err| Error::Input(format!("Can't read {}: {}", path.display(), err)))?
        .decode()
        .map_err(|err| Error::Decode(format!("Can't load {}: {}", path.display(), err)))?
        .into_rgba8();
    let (width, height) = image.dimensions();
    let pixels = image.into_raw();
    Ok(ImgVec::new(pixels.as_rgba().to_vec(), width as usize, height as usize))
}
