//! # qistyle
//!
//! A Rust library for configuring and exporting styled QR codes.
//!
//! `qistyle` draws QR codes as SVG trees with custom colours, dot shapes and finder
//! pattern shapes, embeds a centred logo with rounded corners, and exports the result
//! as SVG, PNG or JPEG. Symbol encoding is delegated to the `qrcode` crate;
//! rasterization is done with `resvg`.
//!
//! ## Features
//!
//! - Dot shapes: square, rounded (neighbour-aware) and dots.
//! - Corner shapes: square, extra-rounded and dot rings, with square or dot centres.
//! - Four error correction levels: L, M, Q, H.
//! - Logos sized to what the error correction level can recover, clipped to a
//!   rounded rectangle whose roundness is a percentage of the logo's shorter side.
//! - Live editing: partial updates re-render the tree and re-apply the logo mask.
//! - Safe Rust implementation with no unsafe code.
//!
//! ## Example
//!
//! Render, round the logo, and save a PNG:
//!
//! ```rust,no_run
//! use qistyle::form::{Configurator, ControlEvent, FormState};
//! use qistyle::options::Extension;
//! use qistyle::renderer::QrStyler;
//!
//! let state = FormState::default();
//! let renderer = QrStyler::new(state.to_options()).unwrap();
//! let mut configurator = Configurator::new(renderer, &state);
//!
//! let logo = std::fs::read("logo.png").unwrap();
//! configurator.handle(ControlEvent::Logo(logo)).unwrap();
//! configurator.handle(ControlEvent::LogoRoundness(25.0)).unwrap();
//! configurator.download(Extension::Png, "output").unwrap();
//! ```
//!
//! ## Modules
//!
//! - [`options`]: Styling options and partial updates.
//! - [`svg`]: The SVG element tree.
//! - [`renderer`]: QR drawing and the renderer capability interface.
//! - [`mask`]: Rounded-corner clipping of the embedded logo.
//! - [`logo`]: Object URLs for user-chosen logos.
//! - [`form`]: Form controls, change events and downloads.
//! - [`export`]: SVG, PNG and JPEG output.
#![forbid(unsafe_code)]

pub mod error;
pub mod export;
pub mod form;
pub mod logo;
pub mod mask;
pub mod options;
pub mod renderer;
pub mod svg;

pub use error::{Error, Result};
