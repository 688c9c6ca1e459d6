//! Binding between form controls and the renderer.
//!
//! Controls are addressed by [`ControlId`] and read through [`FormSource`]. The
//! [`Configurator`] owns a renderer, turns each [`ControlEvent`] into a partial
//! update, and re-applies the logo rounding right after, so the tree it exposes
//! always carries the current mask.
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::export::{ExportRequest, DEFAULT_NAME};
use crate::logo::{LogoSlot, ObjectUrlStore};
use crate::mask::logo_rounding;
use crate::options::{
    BackgroundOptions, CornerDotType, CornerSquareType, CornersDotOptions, CornersSquareOptions,
    DotType, DotsOptions, ErrorCorrection, Extension, ImageOptions, OptionsPatch, QrOptions,
};
use crate::renderer::QrRenderer;

pub const DEFAULT_DATA: &str = "https://example.com";
pub const DEFAULT_SIZE: u32 = 320;
pub const DEFAULT_LOGO_SIZE: f64 = 0.4;
pub const DEFAULT_ROUNDNESS: f64 = 12.0;

/// Every control of the configurator form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlId {
    Url,
    DotColor,
    BackgroundColor,
    DotType,
    CornerType,
    Image,
    Width,
    Height,
    Margin,
    ErrorLevel,
    LogoSize,
    LogoRoundness,
    ResetSize,
}

impl ControlId {
    pub const ALL: [ControlId; 13] = [
        ControlId::Url,
        ControlId::DotColor,
        ControlId::BackgroundColor,
        ControlId::DotType,
        ControlId::CornerType,
        ControlId::Image,
        ControlId::Width,
        ControlId::Height,
        ControlId::Margin,
        ControlId::ErrorLevel,
        ControlId::LogoSize,
        ControlId::LogoRoundness,
        ControlId::ResetSize,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ControlId::Url => "url-input",
            ControlId::DotColor => "dot-color-input",
            ControlId::BackgroundColor => "bg-color-input",
            ControlId::DotType => "dot-type-select",
            ControlId::CornerType => "corner-type-select",
            ControlId::Image => "image-input",
            ControlId::Width => "width-range",
            ControlId::Height => "height-range",
            ControlId::Margin => "margin-range",
            ControlId::ErrorLevel => "error-level-select",
            ControlId::LogoSize => "logo-size-range",
            ControlId::LogoRoundness => "logo-roundness-range",
            ControlId::ResetSize => "reset-size",
        }
    }
}

impl fmt::Display for ControlId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ControlId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ControlId::ALL
            .into_iter()
            .find(|id| id.as_str() == s.trim())
            .ok_or_else(|| Error::UnknownControl(s.to_string()))
    }
}

/// Read access to the current value of each control.
pub trait FormSource {
    /// `None` when the control does not exist.
    fn value(&self, id: ControlId) -> Option<String>;
}

/// Control values keyed by control id, as loaded from a JSON form file.
///
/// ```rust
/// use qistyle::form::{ControlId, FormSource, FormValues};
///
/// let form = FormValues::from_json(r#"{"width-range": "400"}"#).unwrap();
/// assert_eq!(form.value(ControlId::Width).as_deref(), Some("400"));
/// assert_eq!(form.value(ControlId::Height), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct FormValues(HashMap<String, String>);

impl FormValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn set(&mut self, id: ControlId, value: impl Into<String>) {
        self.0.insert(id.as_str().to_string(), value.into());
    }

    /// Parses `id=value` and stores it.
    pub fn set_pair(&mut self, pair: &str) -> Result<ControlId> {
        let (id, value) = pair
            .split_once('=')
            .ok_or_else(|| Error::invalid("control assignment", pair))?;
        let id: ControlId = id.parse()?;
        self.set(id, value);
        Ok(id)
    }

    /// Controls present in this form that are not known to the configurator.
    pub fn unknown_ids(&self) -> Vec<&str> {
        self.0
            .keys()
            .map(String::as_str)
            .filter(|key| key.parse::<ControlId>().is_err())
            .collect()
    }
}

impl FormSource for FormValues {
    fn value(&self, id: ControlId) -> Option<String> {
        self.0.get(id.as_str()).cloned()
    }
}

/// Parses a range value the way number inputs report it, keeping the leading integer
/// (`"320.7"` is 320). Negative values are rejected.
pub fn parse_int(value: &str) -> Option<u32> {
    let value = value.trim();
    let digits = value
        .find(|c: char| !c.is_ascii_digit())
        .map_or(value, |end| &value[..end]);
    digits.parse().ok()
}

pub fn parse_float(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Initial values of the form, with defaults filled in for missing controls.
#[derive(Debug, Clone, PartialEq)]
pub struct FormState {
    pub data: String,
    pub dot_color: String,
    pub background_color: String,
    pub dot_type: DotType,
    pub width: u32,
    pub height: u32,
    pub margin: u32,
    pub error_correction: ErrorCorrection,
    pub logo_size: f64,
    pub logo_roundness: f64,
}

impl Default for FormState {
    fn default() -> Self {
        FormState {
            data: DEFAULT_DATA.to_string(),
            dot_color: "#000000".to_string(),
            background_color: "#ffffff".to_string(),
            dot_type: DotType::Square,
            width: DEFAULT_SIZE,
            height: DEFAULT_SIZE,
            margin: 0,
            error_correction: ErrorCorrection::Q,
            logo_size: DEFAULT_LOGO_SIZE,
            logo_roundness: DEFAULT_ROUNDNESS,
        }
    }
}

/// Reads one control and parses it, falling back to `default` (with a log line)
/// when the control is missing or its value does not parse.
fn read_control<T, F>(source: &dyn FormSource, id: ControlId, default: T, parse: F) -> T
where
    F: FnOnce(&str) -> Option<T>,
{
    let Some(raw) = source.value(id) else {
        debug!(control = %id, "control not present, using default");
        return default;
    };
    match parse(&raw) {
        Some(value) => value,
        None => {
            warn!(control = %id, value = %raw, "unparseable control value, using default");
            default
        }
    }
}

impl FormState {
    pub fn read(source: &dyn FormSource) -> Self {
        let d = FormState::default();
        FormState {
            data: read_control(source, ControlId::Url, d.data, |v| {
                let v = v.trim();
                Some(if v.is_empty() {
                    DEFAULT_DATA.to_string()
                } else {
                    v.to_string()
                })
            }),
            dot_color: read_control(source, ControlId::DotColor, d.dot_color, non_empty),
            background_color: read_control(
                source,
                ControlId::BackgroundColor,
                d.background_color,
                non_empty,
            ),
            dot_type: read_control(source, ControlId::DotType, d.dot_type, |v| v.parse().ok()),
            width: read_control(source, ControlId::Width, d.width, parse_int),
            height: read_control(source, ControlId::Height, d.height, parse_int),
            margin: read_control(source, ControlId::Margin, d.margin, parse_int),
            error_correction: read_control(
                source,
                ControlId::ErrorLevel,
                d.error_correction,
                |v| v.parse().ok(),
            ),
            logo_size: read_control(source, ControlId::LogoSize, d.logo_size, parse_float),
            logo_roundness: read_control(
                source,
                ControlId::LogoRoundness,
                d.logo_roundness,
                parse_float,
            ),
        }
    }

    /// Options for the first render. The corner types always start as square rings
    /// with dot centres; the corner control only applies on change.
    pub fn to_options(&self) -> QrOptions {
        QrOptions {
            width: self.width,
            height: self.height,
            data: self.data.clone(),
            image: None,
            margin: self.margin,
            error_correction: self.error_correction,
            dots: DotsOptions {
                color: self.dot_color.clone(),
                kind: self.dot_type,
            },
            background: BackgroundOptions {
                color: self.background_color.clone(),
            },
            corners_square: CornersSquareOptions::new(CornerSquareType::Square),
            corners_dot: CornersDotOptions::new(CornerDotType::Dot),
            image_options: ImageOptions {
                margin: 0,
                image_size: self.logo_size,
                hide_background_dots: true,
            },
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// One change coming from the form.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlEvent {
    Data(String),
    DotColor(String),
    BackgroundColor(String),
    DotType(DotType),
    CornerType(CornerSquareType),
    Logo(Vec<u8>),
    ClearLogo,
    Width(u32),
    Height(u32),
    Margin(u32),
    ErrorLevel(ErrorCorrection),
    LogoSize(f64),
    LogoRoundness(f64),
    ResetSize,
}

impl ControlEvent {
    /// Builds the event a control emits when its value becomes `value`.
    ///
    /// The image control carries a file path; its bytes are read here. An empty path
    /// means the file selection was cleared.
    pub fn parse(id: ControlId, value: &str) -> Result<Self> {
        let int =
            |field: &'static str| parse_int(value).ok_or_else(|| Error::invalid(field, value));
        let float =
            |field: &'static str| parse_float(value).ok_or_else(|| Error::invalid(field, value));
        Ok(match id {
            ControlId::Url => ControlEvent::Data(value.to_string()),
            ControlId::DotColor => ControlEvent::DotColor(value.to_string()),
            ControlId::BackgroundColor => ControlEvent::BackgroundColor(value.to_string()),
            ControlId::DotType => ControlEvent::DotType(value.parse()?),
            ControlId::CornerType => ControlEvent::CornerType(value.parse()?),
            ControlId::Image if value.trim().is_empty() => ControlEvent::ClearLogo,
            ControlId::Image => ControlEvent::Logo(std::fs::read(value)?),
            ControlId::Width => ControlEvent::Width(int("width")?),
            ControlId::Height => ControlEvent::Height(int("height")?),
            ControlId::Margin => ControlEvent::Margin(int("margin")?),
            ControlId::ErrorLevel => ControlEvent::ErrorLevel(value.parse()?),
            ControlId::LogoSize => ControlEvent::LogoSize(float("logo size")?),
            ControlId::LogoRoundness => ControlEvent::LogoRoundness(float("logo roundness")?),
            ControlId::ResetSize => ControlEvent::ResetSize,
        })
    }
}

/// Corner control mapping: `dot` rounds both the ring and its centre; any other
/// ring shape goes back to a square centre.
pub fn corner_patch(kind: CornerSquareType) -> OptionsPatch {
    let corner_dot_type = match kind {
        CornerSquareType::Dot => CornerDotType::Dot,
        CornerSquareType::Square | CornerSquareType::ExtraRounded => CornerDotType::Square,
    };
    OptionsPatch {
        corner_square_type: Some(kind),
        corner_dot_type: Some(corner_dot_type),
        ..OptionsPatch::default()
    }
}

pub fn size_label(value: u32) -> String {
    format!("{} px", value)
}

/// The configurator: a renderer plus the form-side state around it.
///
/// # Example
///
/// ```rust
/// use qistyle::form::{Configurator, ControlEvent, FormState};
/// use qistyle::renderer::QrStyler;
///
/// let state = FormState::default();
/// let renderer = QrStyler::new(state.to_options()).unwrap();
/// let mut configurator = Configurator::new(renderer, &state);
/// configurator.handle(ControlEvent::Width(400)).unwrap();
/// assert_eq!(configurator.width_label(), "400 px");
/// ```
pub struct Configurator<R: QrRenderer> {
    renderer: R,
    logo: LogoSlot,
    roundness: f64,
    width_label: String,
    height_label: String,
}

impl<R: QrRenderer> Configurator<R> {
    /// Wraps `renderer`. Logo URLs are created in the renderer's own store.
    pub fn new(renderer: R, state: &FormState) -> Self {
        let mut configurator = Configurator {
            renderer,
            logo: LogoSlot::new(),
            roundness: state.logo_roundness,
            width_label: size_label(state.width),
            height_label: size_label(state.height),
        };
        // Nothing to clip yet unless a logo was already configured.
        configurator.reapply_mask();
        configurator
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn object_urls(&self) -> &ObjectUrlStore {
        self.renderer.object_urls()
    }

    pub fn logo(&self) -> &LogoSlot {
        &self.logo
    }

    pub fn width_label(&self) -> &str {
        &self.width_label
    }

    pub fn height_label(&self) -> &str {
        &self.height_label
    }

    /// Applies one control change, then re-applies the logo mask to the new tree.
    pub fn handle(&mut self, event: ControlEvent) -> Result<()> {
        debug!(?event, "control changed");
        let patch = match event {
            ControlEvent::Data(data) => Some(OptionsPatch {
                data: Some(data),
                ..OptionsPatch::default()
            }),
            ControlEvent::DotColor(color) => Some(OptionsPatch {
                dot_color: Some(color),
                ..OptionsPatch::default()
            }),
            ControlEvent::BackgroundColor(color) => Some(OptionsPatch {
                background_color: Some(color),
                ..OptionsPatch::default()
            }),
            ControlEvent::DotType(kind) => Some(OptionsPatch {
                dot_type: Some(kind),
                ..OptionsPatch::default()
            }),
            ControlEvent::CornerType(kind) => Some(corner_patch(kind)),
            ControlEvent::Logo(bytes) => {
                self.logo.select(bytes, &mut self.renderer)?;
                None
            }
            ControlEvent::ClearLogo => {
                self.logo.clear(&mut self.renderer)?;
                None
            }
            ControlEvent::Width(width) => {
                self.width_label = size_label(width);
                Some(OptionsPatch {
                    width: Some(width),
                    ..OptionsPatch::default()
                })
            }
            ControlEvent::Height(height) => {
                self.height_label = size_label(height);
                Some(OptionsPatch {
                    height: Some(height),
                    ..OptionsPatch::default()
                })
            }
            ControlEvent::Margin(margin) => Some(OptionsPatch {
                margin: Some(margin),
                ..OptionsPatch::default()
            }),
            ControlEvent::ErrorLevel(level) => Some(OptionsPatch {
                error_correction: Some(level),
                ..OptionsPatch::default()
            }),
            ControlEvent::LogoSize(size) => Some(OptionsPatch {
                image_size: Some(size),
                ..OptionsPatch::default()
            }),
            ControlEvent::LogoRoundness(percent) => {
                self.roundness = percent;
                None
            }
            ControlEvent::ResetSize => {
                self.width_label = size_label(DEFAULT_SIZE);
                self.height_label = size_label(DEFAULT_SIZE);
                Some(OptionsPatch {
                    width: Some(DEFAULT_SIZE),
                    height: Some(DEFAULT_SIZE),
                    ..OptionsPatch::default()
                })
            }
        };

        if let Some(patch) = patch {
            self.renderer.update(patch)?;
        }
        self.reapply_mask();
        Ok(())
    }

    /// Swaps the installed extension for a fresh logo rounding at the current roundness.
    ///
    /// Registration failures do not interrupt editing; they are logged.
    pub fn reapply_mask(&mut self) {
        if let Err(err) = self.renderer.delete_extension() {
            warn!(error = %err, "failed to remove logo rounding");
        }
        if let Err(err) = self.renderer.apply_extension(logo_rounding(self.roundness)) {
            warn!(error = %err, "failed to apply logo rounding");
        }
    }

    /// Exports the current rendering as `<dir>/qrcode.<extension>`.
    pub fn download(&self, extension: Extension, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let request = ExportRequest::new(DEFAULT_NAME, extension, dir.as_ref());
        self.renderer.export(&request)
    }
}
