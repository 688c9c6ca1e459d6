//! Rounded-corner clipping for the embedded logo.
//!
//! After every render the logo `image` element is clipped to a rounded rectangle that
//! matches its placed box. The clip lives in `<defs>` under a reserved id, so applying
//! the mask again replaces the previous definition instead of stacking a new one.
use tracing::trace;

use crate::options::QrOptions;
use crate::renderer::ExtensionFn;
use crate::svg::{fmt_num, Element};

/// Reserved id of the logo clip path.
pub const LOGO_CLIP_ID: &str = "qr-logo-clip";

/// Placed position and size of the logo, in user units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    /// Reads `x`, `y`, `width` and `height` from an element; anything missing counts as 0.
    pub fn of(element: &Element) -> Self {
        Bounds {
            x: parse_length(element.attr("x")),
            y: parse_length(element.attr("y")),
            width: parse_length(element.attr("width")),
            height: parse_length(element.attr("height")),
        }
    }
}

/// The rounded rectangle derived from one logo placement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaskOverlay {
    pub roundness_percent: f64,
    pub bounds: Bounds,
    pub corner_radius: f64,
}

impl MaskOverlay {
    pub fn measure(image: &Element, roundness_percent: f64) -> Self {
        let bounds = Bounds::of(image);
        MaskOverlay {
            roundness_percent,
            bounds,
            corner_radius: corner_radius(bounds.width, bounds.height, roundness_percent),
        }
    }

    fn clip_path(&self) -> Element {
        let r = fmt_num(self.corner_radius);
        let rect = Element::new("rect")
            .with_attr("x", fmt_num(self.bounds.x))
            .with_attr("y", fmt_num(self.bounds.y))
            .with_attr("width", fmt_num(self.bounds.width))
            .with_attr("height", fmt_num(self.bounds.height))
            .with_attr("rx", r.clone())
            .with_attr("ry", r);
        Element::new("clipPath")
            .with_attr("id", LOGO_CLIP_ID)
            .with_child(rect)
    }
}

/// Corner radius for a `width` x `height` box rounded by `percent` (0 to 100).
///
/// Out-of-range percentages are clamped; negative or non-finite sizes yield 0.
///
/// # Example
///
/// ```rust
/// use qistyle::mask::corner_radius;
///
/// assert_eq!(corner_radius(80.0, 80.0, 25.0), 20.0);
/// assert_eq!(corner_radius(80.0, 40.0, 50.0), 20.0);
/// assert_eq!(corner_radius(80.0, 80.0, 0.0), 0.0);
/// ```
pub fn corner_radius(width: f64, height: f64, percent: f64) -> f64 {
    let percent = if percent.is_finite() { percent.clamp(0.0, 100.0) } else { 0.0 };
    let side = width.min(height);
    if !side.is_finite() || side <= 0.0 {
        return 0.0;
    }
    side * percent / 100.0
}

/// Parses an SVG length attribute, keeping only its leading number (`"80px"` is 80).
/// Missing or unparseable values are 0.
pub fn parse_length(value: Option<&str>) -> f64 {
    let Some(value) = value else {
        return 0.0;
    };
    let value = value.trim();
    let end = value
        .char_indices()
        .find(|&(i, c)| {
            let sign = (c == '-' || c == '+') && i == 0;
            !(c.is_ascii_digit() || c == '.' || sign || c == 'e' || c == 'E')
        })
        .map_or(value.len(), |(i, _)| i);
    // Shrink until the prefix parses, so "1e" or "3.5.2" still yield a number.
    (1..=end)
        .rev()
        .find_map(|len| value[..len].parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// Clips the first `image` in `svg` to a rounded rectangle of its own placed box.
///
/// Without an image the tree is left untouched. Calling this again replaces the
/// previous clip path, so the tree never holds more than one.
///
/// # Arguments
///
/// * `svg` - Root of the rendered vector tree.
/// * `percent` - Roundness from 0 (square corners) to 100 (radius equal to the shorter side).
///
/// # Example
///
/// ```rust
/// use qistyle::mask::{apply_logo_rounding, LOGO_CLIP_ID};
/// use qistyle::svg::Element;
///
/// let mut svg = Element::new("svg").with_child(
///     Element::new("image")
///         .with_attr("x", "10")
///         .with_attr("y", "10")
///         .with_attr("width", "80")
///         .with_attr("height", "80"),
/// );
/// apply_logo_rounding(&mut svg, 25.0);
/// let rect = svg.find_by_id(LOGO_CLIP_ID).and_then(|clip| clip.find("rect")).unwrap();
/// assert_eq!(rect.attr("rx"), Some("20"));
/// ```
pub fn apply_logo_rounding(svg: &mut Element, percent: f64) {
    let Some(image) = svg.find("image") else {
        return;
    };
    let overlay = MaskOverlay::measure(image, percent);
    trace!(?overlay, "clipping logo");

    svg.remove_by_id(LOGO_CLIP_ID);

    if svg.find("defs").is_none() {
        svg.prepend(Element::new("defs"));
    }
    if let Some(defs) = svg.find_mut("defs") {
        defs.append(overlay.clip_path());
    }

    if let Some(image) = svg.find_mut("image") {
        image.set_attr("clip-path", format!("url(#{LOGO_CLIP_ID})"));
    }
}

/// Packages [`apply_logo_rounding`] as a renderer extension.
pub fn logo_rounding(percent: f64) -> ExtensionFn {
    Box::new(move |svg: &mut Element, _options: &QrOptions| apply_logo_rounding(svg, percent))
}
