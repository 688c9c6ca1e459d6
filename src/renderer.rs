//! Styled QR drawing.
//!
//! [`QrStyler`] turns [`QrOptions`] into an SVG [`Element`] tree: background, data
//! modules in the chosen dot shape, the three finder patterns in their corner shapes,
//! and an optional centred logo. Symbol encoding itself is done by the `qrcode` crate.
//!
//! The rest of the crate talks to the styler through [`QrRenderer`], a narrow
//! capability interface: partial updates, a single post-processing extension,
//! export, and the object URL registry logos are loaded from.
use std::io::Cursor;
use std::path::PathBuf;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::ImageReader;
use qrcode::{Color, QrCode};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::export::{self, ExportRequest};
use crate::logo::{ObjectUrlStore, OBJECT_URL_SCHEME};
use crate::options::{
    CornerDotType, CornerSquareType, DotType, ErrorCorrection, OptionsPatch, QrOptions,
};
use crate::svg::{fmt_num, Element, SVG_NS, XLINK_NS};

/// Post-processor run against every freshly rendered tree.
pub type ExtensionFn = Box<dyn Fn(&mut Element, &QrOptions)>;

/// What the form layer needs from a renderer, and nothing more.
pub trait QrRenderer {
    /// Merges `patch` into the current options and re-renders.
    fn update(&mut self, patch: OptionsPatch) -> Result<()>;

    /// Installs `extension` (replacing any previous one) and runs it on the current tree.
    fn apply_extension(&mut self, extension: ExtensionFn) -> Result<()>;

    /// Removes the extension and restores the plain rendering.
    fn delete_extension(&mut self) -> Result<()>;

    /// Writes the current rendering to disk and returns the written path.
    fn export(&self, request: &ExportRequest) -> Result<PathBuf>;

    /// Registry that `blob:` logo sources are resolved against.
    fn object_urls(&self) -> &ObjectUrlStore;
}

/// Size of a finder pattern, in modules.
const FINDER: usize = 7;

/// Share of the symbol each error correction level can afford to lose.
fn recovery_share(level: ErrorCorrection) -> f64 {
    match level {
        ErrorCorrection::L => 0.07,
        ErrorCorrection::M => 0.15,
        ErrorCorrection::Q => 0.25,
        ErrorCorrection::H => 0.30,
    }
}

/// A decoded logo ready for embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct Logo {
    /// `data:` URI of the image bytes.
    pub href: String,
    pub width: u32,
    pub height: u32,
}

/// Logo size expressed in hidden modules and pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LogoFit {
    pub hide_x_dots: usize,
    pub hide_y_dots: usize,
    pub width: f64,
    pub height: f64,
}

/// Largest logo box that stays within the recoverable share of the symbol.
///
/// The box is snapped to an odd number of modules on each axis so that it stays
/// centred on the (always odd-sized) symbol, keeps the logo's aspect ratio, and never
/// reaches into the finder patterns.
///
/// # Arguments
///
/// * `logo_width`, `logo_height` - Natural size of the logo in pixels.
/// * `max_hidden_dots` - How many modules the logo may cover in total.
/// * `max_axis_dots` - How many modules it may span along either axis.
/// * `dot_size` - Size of one module in pixels.
pub fn fit_logo(
    logo_width: f64,
    logo_height: f64,
    max_hidden_dots: usize,
    max_axis_dots: usize,
    dot_size: f64,
) -> LogoFit {
    if logo_width <= 0.0 || logo_height <= 0.0 || max_hidden_dots == 0 || dot_size <= 0.0 {
        return LogoFit::default();
    }
    let ratio = logo_height / logo_width;
    let max_axis = max_axis_dots as f64;

    let mut hide_x = ((max_hidden_dots as f64 / ratio).sqrt().floor()).max(1.0);
    if max_axis_dots > 0 && max_axis < hide_x {
        hide_x = max_axis;
    }
    if hide_x % 2.0 == 0.0 {
        hide_x -= 1.0;
    }
    let mut width = hide_x * dot_size;
    let mut hide_y = 1.0 + 2.0 * ((hide_x * ratio - 1.0) / 2.0).ceil();
    let mut height = (hide_y * dot_size).round();

    if (max_axis_dots > 0 && max_axis < hide_y) || hide_y * hide_x > max_hidden_dots as f64 {
        if max_axis_dots > 0 && max_axis < hide_y {
            hide_y = max_axis;
            if hide_y % 2.0 == 0.0 {
                hide_y -= 1.0;
            }
        } else {
            hide_y -= 2.0;
        }
        height = hide_y * dot_size;
        hide_x = 1.0 + 2.0 * ((hide_y / ratio - 1.0) / 2.0).ceil();
        width = (hide_x * dot_size).round();
    }

    if hide_x < 1.0 || hide_y < 1.0 {
        return LogoFit::default();
    }
    LogoFit {
        hide_x_dots: hide_x as usize,
        hide_y_dots: hide_y as usize,
        width,
        height,
    }
}

/// Geometry shared by every drawing step of one render.
#[derive(Debug, Clone, Copy)]
struct Layout {
    count: usize,
    dot: f64,
    x0: f64,
    y0: f64,
}

impl Layout {
    fn new(options: &QrOptions, count: usize) -> Self {
        let min_side = options
            .width
            .min(options.height)
            .saturating_sub(options.margin.saturating_mul(2));
        let dot = (min_side as f64 / count as f64).floor();
        Layout {
            count,
            dot,
            x0: ((options.width as f64 - count as f64 * dot) / 2.0).floor(),
            y0: ((options.height as f64 - count as f64 * dot) / 2.0).floor(),
        }
    }

    fn module_origin(&self, col: usize, row: usize) -> (f64, f64) {
        (self.x0 + col as f64 * self.dot, self.y0 + row as f64 * self.dot)
    }

    /// Top-left module of each finder pattern.
    fn finders(&self) -> [(usize, usize); 3] {
        let far = self.count - FINDER;
        [(0, 0), (far, 0), (0, far)]
    }

    fn in_finder(&self, col: usize, row: usize) -> bool {
        self.finders()
            .iter()
            .any(|&(fc, fr)| col >= fc && col < fc + FINDER && row >= fr && row < fr + FINDER)
    }
}

/// Path of a rectangle whose corners are rounded individually (top-left, top-right,
/// bottom-right, bottom-left).
fn rounded_rect_path(x: f64, y: f64, w: f64, h: f64, radii: [f64; 4]) -> String {
    let [tl, tr, br, bl] = radii;
    let n = fmt_num;
    let mut d = format!("M{} {}H{}", n(x + tl), n(y), n(x + w - tr));
    if tr > 0.0 {
        d += &format!("A{r} {r} 0 0 1 {} {}", n(x + w), n(y + tr), r = n(tr));
    }
    d += &format!("V{}", n(y + h - br));
    if br > 0.0 {
        d += &format!("A{r} {r} 0 0 1 {} {}", n(x + w - br), n(y + h), r = n(br));
    }
    d += &format!("H{}", n(x + bl));
    if bl > 0.0 {
        d += &format!("A{r} {r} 0 0 1 {} {}", n(x), n(y + h - bl), r = n(bl));
    }
    d += &format!("V{}", n(y + tl));
    if tl > 0.0 {
        d += &format!("A{r} {r} 0 0 1 {} {}", n(x + tl), n(y), r = n(tl));
    }
    d.push('Z');
    d
}

fn circle_path(cx: f64, cy: f64, r: f64) -> String {
    let n = fmt_num;
    format!(
        "M{} {}a{r} {r} 0 1 0 {d} 0a{r} {r} 0 1 0 -{d} 0Z",
        n(cx - r),
        n(cy),
        r = n(r),
        d = n(2.0 * r)
    )
}

/// Draws styled QR codes as SVG trees.
///
/// # Example
///
/// ```rust
/// use qistyle::options::QrOptions;
/// use qistyle::renderer::QrStyler;
///
/// let styler = QrStyler::new(QrOptions::default()).unwrap();
/// let markup = styler.svg().to_svg_string();
/// assert!(markup.starts_with("<svg"));
/// ```
pub struct QrStyler {
    options: QrOptions,
    svg: Element,
    extension: Option<ExtensionFn>,
    object_urls: ObjectUrlStore,
    logo_cache: Option<(String, Logo)>,
}

impl QrStyler {
    /// Encodes and draws `options` right away.
    ///
    /// The styler owns a fresh [`ObjectUrlStore`]; `blob:` logo sources must be
    /// created in it, see [`QrRenderer::object_urls`].
    pub fn new(options: QrOptions) -> Result<Self> {
        let mut styler = QrStyler {
            options,
            svg: Element::new("svg"),
            extension: None,
            object_urls: ObjectUrlStore::new(),
            logo_cache: None,
        };
        styler.svg = styler.render()?;
        Ok(styler)
    }

    pub fn options(&self) -> &QrOptions {
        &self.options
    }

    /// The current tree, extension included.
    pub fn svg(&self) -> &Element {
        &self.svg
    }

    fn rerender(&mut self) -> Result<()> {
        let mut svg = self.render()?;
        if let Some(extension) = &self.extension {
            extension(&mut svg, &self.options);
        }
        self.svg = svg;
        Ok(())
    }

    fn render(&mut self) -> Result<Element> {
        let code = QrCode::with_error_correction_level(
            self.options.data.as_bytes(),
            self.options.error_correction.to_ec_level(),
        )?;
        let count = code.width();
        let layout = Layout::new(&self.options, count);
        debug!(count, dot = layout.dot, "rendering QR code");

        let (width, height) = (self.options.width, self.options.height);
        let mut svg = Element::new("svg")
            .with_attr("xmlns", SVG_NS)
            .with_attr("xmlns:xlink", XLINK_NS)
            .with_attr("width", width.to_string())
            .with_attr("height", height.to_string())
            .with_attr("viewBox", format!("0 0 {} {}", width, height));

        svg.append(
            Element::new("rect")
                .with_attr("x", "0")
                .with_attr("y", "0")
                .with_attr("width", width.to_string())
                .with_attr("height", height.to_string())
                .with_attr("fill", self.options.background.color.clone()),
        );

        let logo = self.logo();
        let fit = match &logo {
            Some(logo) => self.fit(logo, count, layout.dot),
            None => LogoFit::default(),
        };

        let colors = code.to_colors();
        let dark = |col: isize, row: isize| -> bool {
            if col < 0 || row < 0 || col as usize >= count || row as usize >= count {
                return false;
            }
            colors[row as usize * count + col as usize] == Color::Dark
        };
        let hidden = |col: usize, row: usize| -> bool {
            if !self.options.image_options.hide_background_dots || fit.hide_x_dots == 0 {
                return false;
            }
            let (c, r) = (col as f64, row as f64);
            let n = count as f64;
            let (hx, hy) = (fit.hide_x_dots as f64, fit.hide_y_dots as f64);
            c >= (n - hx) / 2.0 && c < (n + hx) / 2.0 && r >= (n - hy) / 2.0 && r < (n + hy) / 2.0
        };

        let mut dots = Element::new("g").with_attr("fill", self.options.dots.color.clone());
        if layout.dot > 0.0 {
            for row in 0..count {
                for col in 0..count {
                    let (c, r) = (col as isize, row as isize);
                    if !dark(c, r) || layout.in_finder(col, row) || hidden(col, row) {
                        continue;
                    }
                    let neighbours = [
                        dark(c, r - 1),
                        dark(c + 1, r),
                        dark(c, r + 1),
                        dark(c - 1, r),
                    ];
                    dots.append(self.dot(&layout, col, row, neighbours));
                }
            }
        }
        svg.append(dots);
        if layout.dot > 0.0 {
            svg.append(self.corners(&layout));
        }

        if let Some(logo) = logo {
            if fit.width > 0.0 && fit.height > 0.0 {
                svg.append(self.logo_element(&layout, &fit, &logo));
            }
        }
        Ok(svg)
    }

    /// One data module. `neighbours` are top, right, bottom, left.
    fn dot(&self, layout: &Layout, col: usize, row: usize, neighbours: [bool; 4]) -> Element {
        let (x, y) = layout.module_origin(col, row);
        let size = layout.dot;
        match self.options.dots.kind {
            DotType::Square => Element::new("rect")
                .with_attr("x", fmt_num(x))
                .with_attr("y", fmt_num(y))
                .with_attr("width", fmt_num(size))
                .with_attr("height", fmt_num(size)),
            DotType::Dots => Element::new("circle")
                .with_attr("cx", fmt_num(x + size / 2.0))
                .with_attr("cy", fmt_num(y + size / 2.0))
                .with_attr("r", fmt_num(size / 2.0)),
            DotType::Rounded => {
                // A corner is rounded only when neither module touching it is dark.
                let [top, right, bottom, left] = neighbours;
                let r = size / 2.0;
                let round = |a: bool, b: bool| if a || b { 0.0 } else { r };
                let radii = [
                    round(top, left),
                    round(top, right),
                    round(bottom, right),
                    round(bottom, left),
                ];
                Element::new("path").with_attr("d", rounded_rect_path(x, y, size, size, radii))
            }
        }
    }

    fn corners(&self, layout: &Layout) -> Element {
        let dot = layout.dot;
        let mut group = Element::new("g").with_attr("fill", self.options.dots.color.clone());
        for (col, row) in layout.finders() {
            let (x, y) = layout.module_origin(col, row);
            let outer = FINDER as f64 * dot;
            let inner = outer - 2.0 * dot;

            let ring = match self.options.corners_square.kind {
                CornerSquareType::Square => format!(
                    "{}{}",
                    rounded_rect_path(x, y, outer, outer, [0.0; 4]),
                    rounded_rect_path(x + dot, y + dot, inner, inner, [0.0; 4])
                ),
                CornerSquareType::ExtraRounded => format!(
                    "{}{}",
                    rounded_rect_path(x, y, outer, outer, [2.5 * dot; 4]),
                    rounded_rect_path(x + dot, y + dot, inner, inner, [1.5 * dot; 4])
                ),
                CornerSquareType::Dot => {
                    let (cx, cy) = (x + outer / 2.0, y + outer / 2.0);
                    let ring = circle_path(cx, cy, outer / 2.0);
                    format!("{}{}", ring, circle_path(cx, cy, inner / 2.0))
                }
            };
            group.append(
                Element::new("path")
                    .with_attr("class", "corner-square")
                    .with_attr("fill-rule", "evenodd")
                    .with_attr("d", ring),
            );

            let (cx, cy) = (x + 2.0 * dot, y + 2.0 * dot);
            let side = 3.0 * dot;
            let centre = match self.options.corners_dot.kind {
                CornerDotType::Square => Element::new("rect")
                    .with_attr("x", fmt_num(cx))
                    .with_attr("y", fmt_num(cy))
                    .with_attr("width", fmt_num(side))
                    .with_attr("height", fmt_num(side)),
                CornerDotType::Dot => Element::new("circle")
                    .with_attr("cx", fmt_num(cx + side / 2.0))
                    .with_attr("cy", fmt_num(cy + side / 2.0))
                    .with_attr("r", fmt_num(side / 2.0)),
            };
            group.append(centre.with_attr("class", "corner-dot"));
        }
        group
    }

    fn fit(&self, logo: &Logo, count: usize, dot: f64) -> LogoFit {
        let image_size = self.options.image_options.image_size.clamp(0.0, 1.0);
        let cover = image_size * recovery_share(self.options.error_correction);
        let max_hidden = (cover * (count * count) as f64).floor() as usize;
        fit_logo(logo.width as f64, logo.height as f64, max_hidden, count - 2 * FINDER, dot)
    }

    fn logo_element(&self, layout: &Layout, fit: &LogoFit, logo: &Logo) -> Element {
        let margin = self.options.image_options.margin as f64;
        let span = layout.count as f64 * layout.dot;
        let width = (fit.width - 2.0 * margin).max(0.0);
        let height = (fit.height - 2.0 * margin).max(0.0);
        let x = layout.x0 + margin + (span - fit.width) / 2.0;
        let y = layout.y0 + margin + (span - fit.height) / 2.0;
        Element::new("image")
            .with_attr("x", fmt_num(x))
            .with_attr("y", fmt_num(y))
            .with_attr("width", fmt_num(width))
            .with_attr("height", fmt_num(height))
            .with_attr("preserveAspectRatio", "xMidYMid meet")
            .with_attr("xlink:href", logo.href.clone())
    }

    /// Loads the logo named by the options, reusing the last one when the source is unchanged.
    /// Failures are logged and drawing goes on without a logo.
    fn logo(&mut self) -> Option<Logo> {
        let source = self.options.image.clone()?;
        if let Some((cached, logo)) = &self.logo_cache {
            if *cached == source {
                return Some(logo.clone());
            }
        }
        match load_logo(&source, &self.object_urls) {
            Ok(logo) => {
                self.logo_cache = Some((source, logo.clone()));
                Some(logo)
            }
            Err(err) => {
                warn!(%source, error = %err, "logo could not be loaded, drawing without it");
                None
            }
        }
    }
}

impl QrRenderer for QrStyler {
    fn update(&mut self, patch: OptionsPatch) -> Result<()> {
        let previous = self.options.clone();
        self.options.apply(patch);
        if let Err(err) = self.rerender() {
            self.options = previous;
            return Err(err);
        }
        Ok(())
    }

    fn apply_extension(&mut self, extension: ExtensionFn) -> Result<()> {
        extension(&mut self.svg, &self.options);
        self.extension = Some(extension);
        Ok(())
    }

    fn delete_extension(&mut self) -> Result<()> {
        if self.extension.take().is_some() {
            self.svg = self.render()?;
        }
        Ok(())
    }

    fn export(&self, request: &ExportRequest) -> Result<PathBuf> {
        export::write(&self.svg, request)
    }

    fn object_urls(&self) -> &ObjectUrlStore {
        &self.object_urls
    }
}

/// Reads a logo from a `data:` URI, a live object URL or a file path.
///
/// # Errors
///
/// Returns an error if the bytes cannot be found or are not an image the `image`
/// crate understands.
pub fn load_logo(source: &str, object_urls: &ObjectUrlStore) -> Result<Logo> {
    let bytes: Vec<u8> = if let Some(rest) = source.strip_prefix("data:") {
        let (_, payload) = rest
            .split_once(";base64,")
            .ok_or_else(|| Error::invalid("logo data URI", source))?;
        STANDARD
            .decode(payload.trim())
            .map_err(|_| Error::invalid("logo data URI", source))?
    } else if source.starts_with(OBJECT_URL_SCHEME) {
        object_urls
            .resolve(source)
            .map(|bytes| bytes.to_vec())
            .ok_or_else(|| Error::UnknownObjectUrl(source.to_string()))?
    } else {
        std::fs::read(source)?
    };

    let reader = ImageReader::new(Cursor::new(&bytes)).with_guessed_format()?;
    let format = reader
        .format()
        .ok_or_else(|| Error::invalid("logo image format", source))?;
    let (width, height) = reader.into_dimensions()?;
    Ok(Logo {
        href: format!("data:{};base64,{}", format.to_mime_type(), STANDARD.encode(&bytes)),
        width,
        height,
    })
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::mask::{logo_rounding, LOGO_CLIP_ID};
    use image::{ImageFormat, Rgba, RgbaImage};

    fn png_logo(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([200, 30, 30, 255]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png).unwrap();
        bytes
    }

    fn data_uri(bytes: &[u8]) -> String {
        format!("data:image/png;base64,{}", STANDARD.encode(bytes))
    }

    fn with_logo(width: u32, height: u32) -> QrOptions {
        QrOptions {
            image: Some(data_uri(&png_logo(width, height))),
            ..QrOptions::default()
        }
    }

    #[test]
    fn test_default_tree_shape() {
        let styler = QrStyler::new(QrOptions::default()).unwrap();
        let svg = styler.svg();
        assert_eq!(svg.attr("width"), Some("320"));
        assert_eq!(svg.attr("viewBox"), Some("0 0 320 320"));
        let background = svg.find("rect").unwrap();
        assert_eq!(background.attr("fill"), Some("#ffffff"));
        assert!(svg.find("image").is_none());
        assert_eq!(svg.count("path"), 3);
        assert_eq!(svg.count("circle"), 3);
    }

    #[test]
    fn test_layout_centres_symbol() {
        let options = QrOptions {
            width: 400,
            height: 300,
            margin: 10,
            ..QrOptions::default()
        };
        let layout = Layout::new(&options, 29);
        assert_eq!(layout.dot, 9.0);
        assert_eq!(layout.x0, ((400.0 - 29.0 * 9.0) / 2.0f64).floor());
        assert_eq!(layout.y0, ((300.0 - 29.0 * 9.0) / 2.0f64).floor());
        assert!(layout.in_finder(0, 0));
        assert!(layout.in_finder(28, 6));
        assert!(!layout.in_finder(7, 7));
        assert!(!layout.in_finder(28, 28));
    }

    #[test]
    fn test_dot_shapes() {
        let shapes = [
            (DotType::Square, "rect"),
            (DotType::Dots, "circle"),
            (DotType::Rounded, "path"),
        ];
        for (kind, tag) in shapes {
            let mut options = QrOptions::default();
            options.dots.kind = kind;
            options.dots.color = "#123456".into();
            let styler = QrStyler::new(options).unwrap();
            let group = styler.svg().child_elements().nth(1).unwrap();
            assert_eq!(group.attr("fill"), Some("#123456"));
            assert!(group.child_elements().count() > 0);
            assert!(group.child_elements().all(|el| el.name == tag), "{kind}");
        }
    }

    #[test]
    fn test_rounded_rect_path_square_when_no_radius() {
        assert_eq!(rounded_rect_path(0.0, 0.0, 10.0, 10.0, [0.0; 4]), "M0 0H10V10H0V0Z");
        let rounded = rounded_rect_path(0.0, 0.0, 10.0, 10.0, [5.0; 4]);
        assert_eq!(rounded.matches('A').count(), 4);
    }

    #[test]
    fn test_corner_styles() {
        let mut options = QrOptions::default();
        options.corners_square.kind = CornerSquareType::ExtraRounded;
        options.corners_dot.kind = CornerDotType::Square;
        let styler = QrStyler::new(options).unwrap();
        let corners = styler.svg().child_elements().nth(2).unwrap();
        let rings: Vec<_> = corners.child_elements().filter(|el| el.name == "path").collect();
        assert_eq!(rings.len(), 3);
        assert!(rings.iter().all(|el| el.attr("d").unwrap().contains('A')));
        assert_eq!(corners.child_elements().filter(|el| el.name == "rect").count(), 3);
    }

    #[test]
    fn test_fit_logo_square() {
        // 29 modules at level Q, image size 0.4: floor(0.1 * 841) = 84 hidden dots.
        let fit = fit_logo(100.0, 100.0, 84, 15, 10.0);
        assert_eq!(fit.hide_x_dots, 9);
        assert_eq!(fit.hide_y_dots, 9);
        assert_eq!((fit.width, fit.height), (90.0, 90.0));
    }

    #[test]
    fn test_fit_logo_wide_respects_axis_limit() {
        let fit = fit_logo(400.0, 100.0, 200, 15, 4.0);
        assert!(fit.hide_x_dots <= 15);
        assert_eq!(fit.hide_x_dots % 2, 1);
        assert_eq!(fit.hide_y_dots % 2, 1);
        assert!(fit.hide_x_dots * fit.hide_y_dots <= 200);
        assert!(fit.width > fit.height);
    }

    #[test]
    fn test_fit_logo_degenerate() {
        assert_eq!(fit_logo(0.0, 100.0, 84, 15, 10.0), LogoFit::default());
        assert_eq!(fit_logo(100.0, 100.0, 0, 15, 10.0), LogoFit::default());
        assert_eq!(fit_logo(100.0, 100.0, 84, 15, 0.0), LogoFit::default());
    }

    #[test]
    fn test_logo_is_placed_centred_and_hides_dots() {
        let plain = QrStyler::new(QrOptions::default()).unwrap();
        let styler = QrStyler::new(with_logo(64, 64)).unwrap();
        let image = styler.svg().find("image").expect("logo");
        let x: f64 = image.attr("x").unwrap().parse().unwrap();
        let w: f64 = image.attr("width").unwrap().parse().unwrap();
        assert!(w > 0.0);
        assert!((x + w / 2.0 - 160.0).abs() <= 1.0);
        assert!(image.attr("xlink:href").unwrap().starts_with("data:image/png;base64,"));
        assert!(styler.svg().count("rect") < plain.svg().count("rect"));
    }

    #[test]
    fn test_logo_margin_shrinks_image() {
        let plain = QrStyler::new(with_logo(64, 64)).unwrap();
        let mut options = with_logo(64, 64);
        options.image_options.margin = 5;
        let padded = QrStyler::new(options).unwrap();
        let width = |s: &QrStyler| -> f64 {
            let image = s.svg().find("image").unwrap();
            image.attr("width").unwrap().parse().unwrap()
        };
        assert_eq!(width(&plain) - width(&padded), 10.0);
    }

    #[test]
    fn test_unreadable_logo_is_skipped() {
        let options = QrOptions {
            image: Some("/definitely/not/here.png".into()),
            ..QrOptions::default()
        };
        let styler = QrStyler::new(options).unwrap();
        assert!(styler.svg().find("image").is_none());
    }

    #[test]
    fn test_object_url_logo() {
        let mut styler = QrStyler::new(QrOptions::default()).unwrap();
        let url = styler.object_urls().create(png_logo(32, 32));
        let patch = OptionsPatch {
            image: Some(Some(url.to_string())),
            ..OptionsPatch::default()
        };
        styler.update(patch).unwrap();
        assert!(styler.svg().find("image").is_some());
    }

    #[test]
    fn test_foreign_object_url_draws_without_logo() {
        let other = ObjectUrlStore::new();
        let url = other.create(png_logo(32, 32));
        let options = QrOptions {
            image: Some(url.to_string()),
            ..QrOptions::default()
        };
        let styler = QrStyler::new(options).unwrap();
        assert!(styler.svg().find("image").is_none());
    }

    #[test]
    fn test_load_logo_reads_dimensions() {
        let store = ObjectUrlStore::new();
        let logo = load_logo(&data_uri(&png_logo(40, 20)), &store).unwrap();
        assert_eq!((logo.width, logo.height), (40, 20));
        assert!(load_logo("data:image/png;base64,@@@", &store).is_err());
        assert!(matches!(
            load_logo("blob:qistyle/99", &store),
            Err(Error::UnknownObjectUrl(_))
        ));
    }

    #[test]
    fn test_update_rerenders_and_keeps_extension() {
        let mut styler = QrStyler::new(with_logo(64, 64)).unwrap();
        styler.apply_extension(logo_rounding(25.0)).unwrap();
        assert!(styler.svg().find_by_id(LOGO_CLIP_ID).is_some());

        styler
            .update(OptionsPatch {
                width: Some(500),
                height: Some(500),
                ..OptionsPatch::default()
            })
            .unwrap();
        assert_eq!(styler.svg().attr("width"), Some("500"));
        assert_eq!(styler.svg().count("clipPath"), 1);

        styler.delete_extension().unwrap();
        assert!(styler.svg().find_by_id(LOGO_CLIP_ID).is_none());
        styler
            .update(OptionsPatch {
                margin: Some(4),
                ..OptionsPatch::default()
            })
            .unwrap();
        assert!(styler.svg().find_by_id(LOGO_CLIP_ID).is_none());
    }

    #[test]
    fn test_failed_update_keeps_previous_state() {
        let mut styler = QrStyler::new(QrOptions::default()).unwrap();
        let before = styler.svg().clone();
        let too_long = "x".repeat(4000);
        let result = styler.update(OptionsPatch {
            data: Some(too_long),
            error_correction: Some(ErrorCorrection::H),
            ..OptionsPatch::default()
        });
        assert!(matches!(result, Err(Error::Encode(_))));
        assert_eq!(styler.svg(), &before);
        assert_eq!(styler.options().data, "https://example.com");
    }

    #[test]
    fn test_tiny_canvas_draws_nothing_but_background() {
        let options = QrOptions {
            width: 10,
            height: 10,
            ..QrOptions::default()
        };
        let styler = QrStyler::new(options).unwrap();
        assert_eq!(styler.svg().count("rect"), 1);
    }
}
