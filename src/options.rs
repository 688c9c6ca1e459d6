//! Styling options for a QR code and the partial updates applied to them.
//!
//! [`QrOptions`] is the full snapshot a [`crate::renderer::QrStyler`] draws from.
//! [`OptionsPatch`] mirrors it with every field optional, so a single control change
//! can be forwarded without restating the rest of the configuration.
use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Shape used for ordinary data modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DotType {
    #[default]
    Square,
    Rounded,
    Dots,
}

/// Shape of the 7x7 ring of each finder pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CornerSquareType {
    #[default]
    Square,
    ExtraRounded,
    Dot,
}

/// Shape of the 3x3 centre of each finder pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CornerDotType {
    Square,
    #[default]
    Dot,
}

/// Error correction level, from Low (~7% recovery) to High (~30%).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ErrorCorrection {
    L,
    M,
    #[default]
    Q,
    H,
}

impl ErrorCorrection {
    pub(crate) fn to_ec_level(self) -> qrcode::EcLevel {
        match self {
            ErrorCorrection::L => qrcode::EcLevel::L,
            ErrorCorrection::M => qrcode::EcLevel::M,
            ErrorCorrection::Q => qrcode::EcLevel::Q,
            ErrorCorrection::H => qrcode::EcLevel::H,
        }
    }
}

/// Output format of an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Extension {
    Svg,
    Png,
    Jpeg,
}

impl Extension {
    pub const ALL: [Extension; 3] = [Extension::Svg, Extension::Png, Extension::Jpeg];

    /// File extension without the leading dot.
    pub fn as_str(self) -> &'static str {
        match self {
            Extension::Svg => "svg",
            Extension::Png => "png",
            Extension::Jpeg => "jpeg",
        }
    }
}

macro_rules! wire_names {
    (
        $ty:ident,
        $field:literal,
        { $($variant:ident => $name:literal $(| $alias:literal)*),+ $(,)? }
    ) => {
        impl $ty {
            pub fn name(self) -> &'static str {
                match self {
                    $($ty::$variant => $name,)+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }

        impl FromStr for $ty {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim() {
                    $($name $(| $alias)* => Ok($ty::$variant),)+
                    other => Err(Error::invalid($field, other)),
                }
            }
        }
    };
}

wire_names!(DotType, "dot type", {
    Square => "square",
    Rounded => "rounded",
    Dots => "dots",
});

wire_names!(CornerSquareType, "corner square type", {
    Square => "square",
    ExtraRounded => "extra-rounded",
    Dot => "dot",
});

wire_names!(CornerDotType, "corner dot type", {
    Square => "square",
    Dot => "dot",
});

wire_names!(ErrorCorrection, "error correction level", {
    L => "L" | "l",
    M => "M" | "m",
    Q => "Q" | "q",
    H => "H" | "h",
});

impl fmt::Display for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Extension {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "svg" => Ok(Extension::Svg),
            "png" => Ok(Extension::Png),
            "jpeg" | "jpg" => Ok(Extension::Jpeg),
            other => Err(Error::invalid("extension", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DotsOptions {
    pub color: String,
    #[serde(rename = "type")]
    pub kind: DotType,
}

impl Default for DotsOptions {
    fn default() -> Self {
        DotsOptions {
            color: "#000000".to_string(),
            kind: DotType::Square,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackgroundOptions {
    pub color: String,
}

impl Default for BackgroundOptions {
    fn default() -> Self {
        BackgroundOptions {
            color: "#ffffff".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CornersSquareOptions {
    #[serde(rename = "type")]
    pub kind: CornerSquareType,
}

impl CornersSquareOptions {
    pub fn new(kind: CornerSquareType) -> Self {
        CornersSquareOptions { kind }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CornersDotOptions {
    #[serde(rename = "type")]
    pub kind: CornerDotType,
}

impl CornersDotOptions {
    pub fn new(kind: CornerDotType) -> Self {
        CornersDotOptions { kind }
    }
}

/// Placement of the embedded logo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageOptions {
    /// Empty space kept around the logo, in pixels.
    pub margin: u32,
    /// Largest share (0 to 1) of the symbol the logo may cover along either axis.
    pub image_size: f64,
    /// Skip data modules that would sit underneath the logo.
    pub hide_background_dots: bool,
}

impl Default for ImageOptions {
    fn default() -> Self {
        ImageOptions {
            margin: 0,
            image_size: 0.4,
            hide_background_dots: true,
        }
    }
}

/// Full option snapshot used to draw a QR code.
///
/// # Example
///
/// ```rust
/// use qistyle::options::{QrOptions, OptionsPatch, DotType};
///
/// let mut options = QrOptions::default();
/// options.apply(OptionsPatch {
///     width: Some(400),
///     dot_type: Some(DotType::Rounded),
///     ..OptionsPatch::default()
/// });
/// assert_eq!(options.width, 400);
/// assert_eq!(options.height, 320);
/// assert_eq!(options.dots.kind, DotType::Rounded);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QrOptions {
    pub width: u32,
    pub height: u32,
    pub data: String,
    /// Logo source: a `data:` URI, an object URL or a file path.
    pub image: Option<String>,
    pub margin: u32,
    pub error_correction: ErrorCorrection,
    pub dots: DotsOptions,
    pub background: BackgroundOptions,
    pub corners_square: CornersSquareOptions,
    pub corners_dot: CornersDotOptions,
    pub image_options: ImageOptions,
}

impl Default for QrOptions {
    fn default() -> Self {
        QrOptions {
            width: 320,
            height: 320,
            data: "https://example.com".to_string(),
            image: None,
            margin: 0,
            error_correction: ErrorCorrection::Q,
            dots: DotsOptions::default(),
            background: BackgroundOptions::default(),
            corners_square: CornersSquareOptions::new(CornerSquareType::Square),
            corners_dot: CornersDotOptions::new(CornerDotType::Dot),
            image_options: ImageOptions::default(),
        }
    }
}

/// A partial update: only the fields that are `Some` replace the current values.
///
/// The logo is doubly optional: `Some(None)` removes it, `None` leaves it alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OptionsPatch {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub data: Option<String>,
    pub image: Option<Option<String>>,
    pub margin: Option<u32>,
    pub error_correction: Option<ErrorCorrection>,
    pub dot_color: Option<String>,
    pub dot_type: Option<DotType>,
    pub background_color: Option<String>,
    pub corner_square_type: Option<CornerSquareType>,
    pub corner_dot_type: Option<CornerDotType>,
    pub image_margin: Option<u32>,
    pub image_size: Option<f64>,
    pub hide_background_dots: Option<bool>,
}

impl QrOptions {
    /// Merges `patch` into these options, leaving absent fields untouched.
    pub fn apply(&mut self, patch: OptionsPatch) {
        let OptionsPatch {
            width,
            height,
            data,
            image,
            margin,
            error_correction,
            dot_color,
            dot_type,
            background_color,
            corner_square_type,
            corner_dot_type,
            image_margin,
            image_size,
            hide_background_dots,
        } = patch;

        if let Some(v) = width {
            self.width = v;
        }
        if let Some(v) = height {
            self.height = v;
        }
        if let Some(v) = data {
            self.data = v;
        }
        if let Some(v) = image {
            self.image = v;
        }
        if let Some(v) = margin {
            self.margin = v;
        }
        if let Some(v) = error_correction {
            self.error_correction = v;
        }
        if let Some(v) = dot_color {
            self.dots.color = v;
        }
        if let Some(v) = dot_type {
            self.dots.kind = v;
        }
        if let Some(v) = background_color {
            self.background.color = v;
        }
        if let Some(v) = corner_square_type {
            self.corners_square.kind = v;
        }
        if let Some(v) = corner_dot_type {
            self.corners_dot.kind = v;
        }
        if let Some(v) = image_margin {
            self.image_options.margin = v;
        }
        if let Some(v) = image_size {
            self.image_options.image_size = v;
        }
        if let Some(v) = hide_background_dots {
            self.image_options.hide_background_dots = v;
        }
    }
}
