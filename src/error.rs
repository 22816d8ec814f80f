use quick_error::quick_error;
use std::io;

quick_error! {
    #[derive(Debug)]
    pub enum Error {
        /// The worker thread panicked, or the encoder was used after it finished
        ThreadSend {
            display("Internal error; unexpectedly aborted")
        }
        /// Missing or unreadable input file
        Input(msg: String) {
            display("{}", msg)
        }
        /// The file exists, but isn't a usable image
        Decode(msg: String) {
            display("{}", msg)
        }
        NoFrames {
            display("Found no usable frames in the source")
        }
        WrongSize(msg: String) {
            display("{}", msg)
        }
        /// Video sources need an external decoder
        ExternalTool(msg: String) {
            display("{}", msg)
        }
        Encode(err: gif::EncodingError) {
            display("GIF encoding error: {}", err)
        }
        Io(err: io::Error) {
            from()
            display("I/O: {}", err)
        }
        Resize(err: resize::Error) {
            from()
            display("resize error: {}", err)
        }
        Quant(liq: imagequant::Error) {
            from()
            display("pngquant error: {}", liq)
        }
    }
}

pub type FrameResult<T, E = Error> = Result<T, E>;

impl From<gif::EncodingError> for Error {
    #[cold]
    fn from(err: gif::EncodingError) -> Self {
        match err {
            gif::EncodingError::Io(err) => err.into(),
            other => Error::Encode(other),
        }
    }
}

impl From<gif::DecodingError> for Error {
    #[cold]
    fn from(err: gif::DecodingError) -> Self {
        Error::Decode(format!("Invalid GIF: {}", err))
    }
}

impl From<gif_dispose::Error> for Error {
    #[cold]
    fn from(err: gif_dispose::Error) -> Self {
        Error::Decode(format!("Invalid GIF frame: {}", err))
    }
}
