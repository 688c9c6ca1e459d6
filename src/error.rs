//! Error type shared by every module of the crate.

use thiserror::Error;

/// Everything that can go wrong while building, updating or exporting a styled QR code.
///
/// Most of the live-editing path never surfaces these: the form layer logs them and
/// keeps the previous preview. They are returned so that callers such as the CLI can
/// decide for themselves.
#[derive(Debug, Error)]
pub enum Error {
    /// The content does not fit in any QR version at the chosen error correction level.
    #[error("failed to encode QR data: {0}")]
    Encode(#[from] qrcode::types::QrError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    /// The vector tree could not be parsed or drawn by the rasterizer.
    #[error("failed to rasterize SVG: {0}")]
    Raster(String),

    /// A control or option carried a value outside its vocabulary.
    #[error("invalid value {value:?} for {field}")]
    InvalidValue { field: &'static str, value: String },

    #[error("unknown control id {0:?}")]
    UnknownControl(String),

    #[error("object URL {0} is not live")]
    UnknownObjectUrl(String),
}

impl Error {
    pub(crate) fn invalid(field: &'static str, value: impl Into<String>) -> Self {
        Error::InvalidValue {
            field,
            value: value.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
