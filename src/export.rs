//! Writing a rendered QR code to disk as SVG, PNG or JPEG.
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use resvg::tiny_skia::{Pixmap, Transform};
use resvg::usvg;
use tracing::info;

use crate::error::{Error, Result};
use crate::options::Extension;
use crate::svg::Element;

/// Base name used by the download buttons.
pub const DEFAULT_NAME: &str = "qrcode";
/// Directory used when none is given.
pub const DEFAULT_DIR: &str = "generated";

const JPEG_QUALITY: u8 = 90;

/// Where and in which format to write an export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRequest {
    pub name: String,
    pub extension: Extension,
    pub dir: PathBuf,
}

impl ExportRequest {
    pub fn new(name: impl Into<String>, extension: Extension, dir: impl Into<PathBuf>) -> Self {
        ExportRequest {
            name: name.into(),
            extension,
            dir: dir.into(),
        }
    }

    /// `<dir>/<name>.<extension>`
    pub fn path(&self) -> PathBuf {
        self.dir.join(format!("{}.{}", self.name, self.extension))
    }
}

/// Renders `svg` into an RGBA buffer at its own pixel size.
///
/// # Errors
///
/// Returns [`Error::Raster`] if the markup cannot be parsed or has an empty size.
///
/// # Example
///
/// ```rust
/// use qistyle::export::rasterize;
/// use qistyle::options::QrOptions;
/// use qistyle::renderer::QrStyler;
///
/// let styler = QrStyler::new(QrOptions::default()).unwrap();
/// let img = rasterize(styler.svg()).unwrap();
/// assert_eq!(img.dimensions(), (320, 320));
/// ```
pub fn rasterize(svg: &Element) -> Result<RgbaImage> {
    let markup = svg.to_svg_string();
    let tree = usvg::Tree::from_str(&markup, &usvg::Options::default())
        .map_err(|e| Error::Raster(e.to_string()))?;
    let size = tree.size().to_int_size();
    let (width, height) = (size.width(), size.height());
    let mut pixmap = Pixmap::new(width, height)
        .ok_or_else(|| Error::Raster(format!("cannot allocate {width}x{height} pixmap")))?;
    resvg::render(&tree, Transform::default(), &mut pixmap.as_mut());

    let mut img = RgbaImage::new(width, height);
    for (src, dst) in pixmap.pixels().iter().zip(img.pixels_mut()) {
        let c = src.demultiply();
        *dst = Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
    }
    Ok(img)
}

/// Flattens transparency onto white; JPEG has no alpha channel.
fn flatten(img: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(img.width(), img.height(), |x, y| {
        let Rgba([r, g, b, a]) = *img.get_pixel(x, y);
        let blend = |c: u8| -> u8 {
            let (c, a) = (u16::from(c), u16::from(a));
            ((c * a + 255 * (255 - a) + 127) / 255) as u8
        };
        Rgb([blend(r), blend(g), blend(b)])
    })
}

/// Encodes `svg` in the requested format.
pub fn encode(svg: &Element, extension: Extension) -> Result<Vec<u8>> {
    match extension {
        Extension::Svg => Ok(svg.to_document().into_bytes()),
        Extension::Png => {
            let mut bytes = Vec::new();
            DynamicImage::ImageRgba8(rasterize(svg)?)
                .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
            Ok(bytes)
        }
        Extension::Jpeg => {
            let rgb = flatten(&rasterize(svg)?);
            let mut bytes = Vec::new();
            JpegEncoder::new_with_quality(&mut bytes, JPEG_QUALITY).encode_image(&rgb)?;
            Ok(bytes)
        }
    }
}

/// Encodes `svg` and saves it to the file named by `request`.
///
/// The target directory is created if it does not exist yet.
///
/// # Example
///
/// ```rust,no_run
/// use qistyle::export::{write, ExportRequest};
/// use qistyle::options::{Extension, QrOptions};
/// use qistyle::renderer::QrStyler;
///
/// let styler = QrStyler::new(QrOptions::default()).unwrap();
/// let request = ExportRequest::new("qrcode", Extension::Png, "images");
/// let path = write(styler.svg(), &request).unwrap();
/// assert!(path.ends_with("qrcode.png"));
/// ```
pub fn write(svg: &Element, request: &ExportRequest) -> Result<PathBuf> {
    let bytes = encode(svg, request.extension)?;
    if !Path::new(&request.dir).exists() {
        fs::create_dir_all(&request.dir)?;
    }
    let path = request.path();
    fs::write(&path, bytes)?;
    info!(path = %path.display(), format = %request.extension, "exported QR code");
    Ok(path)
}
