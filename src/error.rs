#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("malformed {kind} descriptor: {reason}")]
    Format { kind: &'static str, reason: String },

    #[error("unexpected end of data")]
    UnexpectedEof,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bitmap error: {0}")]
    Bitmap(#[from] image::ImageError),

    #[error("bad pixel buffer for {name}: {len} bytes (expected {expected})")]
    PixelSize { name: String, len: usize, expected: usize },

    #[error("texture name too long: {name} ({len} bytes, max {max})")]
    TextureNameTooLong { name: String, len: usize, max: usize },

    #[error("compression error: {0}")]
    Compression(String),
}

impl Error {
    pub fn format(kind: &'static str, reason: impl Into<String>) -> Self {
        Error::Format { kind, reason: reason.into() }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
