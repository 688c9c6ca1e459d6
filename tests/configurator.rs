use std::io::Cursor;

use image::{ImageFormat, Rgba, RgbaImage};
use qistyle::form::{Configurator, ControlEvent, FormState, FormValues};
use qistyle::mask::{corner_radius, parse_length, LOGO_CLIP_ID};
use qistyle::options::{CornerDotType, CornerSquareType, Extension};
use qistyle::renderer::{QrRenderer, QrStyler};
use qistyle::svg::Element;

fn logo_png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba([20, 90, 200, 255]));
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png).unwrap();
    bytes
}

fn configurator(state: &FormState) -> Configurator<QrStyler> {
    Configurator::new(QrStyler::new(state.to_options()).unwrap(), state)
}

fn clip_rect(svg: &Element) -> &Element {
    svg.find_by_id(LOGO_CLIP_ID)
        .and_then(|clip| clip.find("rect"))
        .expect("logo clip rect")
}

#[test]
fn test_without_logo_no_mask_is_ever_added() {
    let mut c = configurator(&FormState::default());
    for event in [
        ControlEvent::Data("hello".into()),
        ControlEvent::LogoRoundness(50.0),
        ControlEvent::Width(400),
    ] {
        c.handle(event).unwrap();
        assert!(c.renderer().svg().find("defs").is_none());
        assert!(c.renderer().svg().find("image").is_none());
    }
}

#[test]
fn test_logo_event_reaches_the_tree() {
    let state = FormState::default();
    let renderer = QrStyler::new(state.to_options()).unwrap();
    let mut c = Configurator::new(renderer, &state);
    c.handle(ControlEvent::Logo(logo_png(64, 64))).unwrap();

    let url = c.logo().current().cloned().unwrap();
    assert!(c.renderer().object_urls().is_live(&url));
    let image = c.renderer().svg().find("image").expect("logo image");
    assert_eq!(image.attr("clip-path"), Some("url(#qr-logo-clip)"));
}

#[test]
fn test_clearing_logo_removes_image_and_mask() {
    let mut c = configurator(&FormState::default());
    c.handle(ControlEvent::Logo(logo_png(64, 64))).unwrap();
    c.handle(ControlEvent::ClearLogo).unwrap();

    let svg = c.renderer().svg();
    assert!(svg.find("image").is_none());
    assert!(svg.find_by_id(LOGO_CLIP_ID).is_none());
    assert_eq!(c.object_urls().live_count(), 0);
}

#[test]
fn test_mask_tracks_logo_box() {
    let mut c = configurator(&FormState::default());
    c.handle(ControlEvent::Logo(logo_png(64, 64))).unwrap();

    let svg = c.renderer().svg();
    let image = svg.find("image").expect("logo image");
    let rect = clip_rect(svg);
    for attr in ["x", "y", "width", "height"] {
        assert_eq!(rect.attr(attr), image.attr(attr), "{attr}");
    }
    let w = parse_length(image.attr("width"));
    let h = parse_length(image.attr("height"));
    assert_eq!(parse_length(rect.attr("rx")), corner_radius(w, h, 12.0));
    assert_eq!(image.attr("clip-path"), Some("url(#qr-logo-clip)"));
}

#[test]
fn test_layout_changes_keep_a_single_fresh_mask() {
    let mut c = configurator(&FormState::default());
    c.handle(ControlEvent::Logo(logo_png(64, 32))).unwrap();
    c.handle(ControlEvent::LogoRoundness(50.0)).unwrap();
    c.handle(ControlEvent::Width(600)).unwrap();
    c.handle(ControlEvent::Height(600)).unwrap();
    c.handle(ControlEvent::LogoSize(0.2)).unwrap();

    let svg = c.renderer().svg();
    assert_eq!(svg.count("clipPath"), 1);
    assert_eq!(svg.count("defs"), 1);
    let image = svg.find("image").unwrap();
    let rect = clip_rect(svg);
    assert_eq!(rect.attr("width"), image.attr("width"));
    let w = parse_length(image.attr("width"));
    let h = parse_length(image.attr("height"));
    assert_eq!(parse_length(rect.attr("rx")), corner_radius(w, h, 50.0));
}

#[test]
fn test_replacing_logo_releases_previous_url() {
    let mut c = configurator(&FormState::default());
    c.handle(ControlEvent::Logo(logo_png(32, 32))).unwrap();
    let first = c.logo().current().cloned().unwrap();
    c.handle(ControlEvent::Logo(logo_png(48, 48))).unwrap();

    assert_eq!(c.object_urls().live_count(), 1);
    assert!(!c.object_urls().is_live(&first));
    let current = c.logo().current().map(|url| url.as_str());
    assert_eq!(c.renderer().options().image.as_deref(), current);
    assert!(c.renderer().svg().find("image").is_some());
}

#[test]
fn test_corner_control() {
    let mut c = configurator(&FormState::default());
    c.handle(ControlEvent::CornerType(CornerSquareType::Dot)).unwrap();
    assert_eq!(c.renderer().options().corners_dot.kind, CornerDotType::Dot);
    c.handle(ControlEvent::CornerType(CornerSquareType::ExtraRounded)).unwrap();
    let options = c.renderer().options();
    assert_eq!(options.corners_square.kind, CornerSquareType::ExtraRounded);
    assert_eq!(options.corners_dot.kind, CornerDotType::Square);
}

#[test]
fn test_initial_state_from_form_values() {
    let form = FormValues::from_json(
        r##"{"url-input": "https://rust-lang.org", "width-range": "256", "height-range": "256",
            "dot-color-input": "#224466", "error-level-select": "H", "margin-range": "8"}"##,
    )
    .unwrap();
    let state = FormState::read(&form);
    let c = configurator(&state);
    let options = c.renderer().options();
    assert_eq!(options.data, "https://rust-lang.org");
    assert_eq!(options.width, 256);
    assert_eq!(options.margin, 8);
    assert_eq!(options.dots.color, "#224466");
    assert_eq!(c.width_label(), "256 px");
    assert_eq!(c.renderer().svg().attr("width"), Some("256"));
}

#[test]
fn test_downloads_all_formats() {
    let tmp = tempfile::tempdir().unwrap();
    let mut c = configurator(&FormState::default());
    c.handle(ControlEvent::Logo(logo_png(40, 40))).unwrap();
    c.handle(ControlEvent::LogoRoundness(30.0)).unwrap();

    for extension in Extension::ALL {
        let path = c.download(extension, tmp.path()).unwrap();
        assert_eq!(path, tmp.path().join(format!("qrcode.{}", extension)));
        let bytes = std::fs::read(&path).unwrap();
        match extension {
            Extension::Svg => {
                let text = String::from_utf8(bytes).unwrap();
                assert!(text.contains("clip-path=\"url(#qr-logo-clip)\""));
            }
            Extension::Png => assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Png),
            Extension::Jpeg => assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Jpeg),
        }
    }
}
